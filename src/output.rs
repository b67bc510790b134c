//! Result types returned by the generation entry points.

use crate::compiler::assemble::CompileReport;
use crate::document::StructuredDocument;
use serde::Serialize;

/// A finished study guide.
#[derive(Debug, Clone, Serialize)]
pub struct GuideOutput {
    /// Model output exactly as received, before sanitizing.
    pub raw_text: String,
    /// The compiled document.
    pub document: StructuredDocument,
    /// Suggested file name, derived from the title.
    pub file_name: String,
    /// PDF bytes. Left out of JSON output.
    #[serde(skip)]
    pub pdf: Vec<u8>,
    pub stats: GuideStats,
}

/// Counters and timings for one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GuideStats {
    /// Inputs sent to the generation service.
    pub input_files: usize,
    pub image_files: usize,
    pub audio_files: usize,
    /// Sum of raw input sizes.
    pub input_bytes: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Generation retries before the successful attempt.
    pub retries: u32,
    /// Blocks in the compiled document.
    pub blocks: usize,
    /// Body lines that produced no block.
    pub dropped_lines: usize,
    /// Whether the title fell back to the default.
    pub default_title: bool,
    /// Pages in the rendered PDF.
    pub pages: usize,
    pub pdf_bytes: usize,
    /// Balance after the debit, when a ledger was used.
    pub remaining_credits: Option<i64>,
    pub encode_duration_ms: u64,
    pub generation_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl GuideStats {
    pub(crate) fn apply_report(&mut self, report: &CompileReport) {
        self.blocks = report.blocks;
        self.dropped_lines = report.dropped_lines;
        self.default_title = report.default_title;
    }
}
