//! Document assembler: raw model output → [`StructuredDocument`].
//!
//! The model is told to put the guide title on line 1 and tagged content
//! below it. The assembler takes that at its word: the first non-empty line
//! becomes the title and every later line is sanitized and classified on its
//! own. Lines that do not survive contribute nothing; the relative order of
//! the rest is kept exactly.

use crate::compiler::classify::classify_line;
use crate::compiler::sanitize::{normalise_line_endings, strip_emphasis_markers, Sanitizer};
use crate::document::{RawDocument, StructuredDocument, DEFAULT_TITLE};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Counters describing one compilation, for logs and [`crate::GuideStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileReport {
    /// Body lines after the title line.
    pub body_lines: usize,
    /// Blocks produced.
    pub blocks: usize,
    /// Body lines that produced no block (blank, fence or preamble).
    pub dropped_lines: usize,
    /// Whether the title fell back to the default.
    pub default_title: bool,
}

/// Split model output into title and body.
///
/// Leading blank lines are skipped; the first non-empty line, trimmed and
/// stripped of emphasis markers, is the title and everything after it is
/// body. Empty output, or a title line made only of markers, falls back to
/// `default_title`.
pub fn split_raw(raw: &str, default_title: &str) -> RawDocument {
    let (title, body_lines) = split_title(raw);
    RawDocument {
        title: title.unwrap_or_else(|| default_title.to_string()),
        body_lines,
    }
}

fn split_title(raw: &str) -> (Option<String>, Vec<String>) {
    let raw = normalise_line_endings(raw);
    let mut lines = raw.lines();
    let mut title = None;

    for line in lines.by_ref() {
        let t = line.trim();
        if !t.is_empty() {
            title = Some(strip_emphasis_markers(t).trim().to_string());
            break;
        }
    }

    let title = title.filter(|t| !t.is_empty());
    (title, lines.map(str::to_string).collect())
}

/// Compile raw model output with the default title and sanitizer.
pub fn compile(raw: &str, author: &str) -> StructuredDocument {
    compile_with(raw, author, DEFAULT_TITLE, &Sanitizer::default()).0
}

/// Compile raw model output, also returning a [`CompileReport`].
pub fn compile_with(
    raw: &str,
    author: &str,
    default_title: &str,
    sanitizer: &Sanitizer,
) -> (StructuredDocument, CompileReport) {
    let (title, body_lines) = split_title(raw);
    let default_used = title.is_none();
    let raw_doc = RawDocument {
        title: title.unwrap_or_else(|| default_title.to_string()),
        body_lines,
    };

    let blocks: Vec<_> = raw_doc
        .body_lines
        .iter()
        .filter_map(|line| sanitizer.sanitize_line(line))
        .filter_map(|line| classify_line(&line))
        .collect();

    let report = CompileReport {
        body_lines: raw_doc.body_lines.len(),
        blocks: blocks.len(),
        dropped_lines: raw_doc.body_lines.len() - blocks.len(),
        default_title: default_used,
    };
    debug!(
        "Compiled '{}': {} blocks from {} body lines ({} dropped)",
        raw_doc.title, report.blocks, report.body_lines, report.dropped_lines
    );

    let doc = StructuredDocument {
        title: raw_doc.title,
        author: author.to_string(),
        blocks,
    };
    (doc, report)
}
