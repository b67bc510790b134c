//! The text-to-document compiler.
//!
//! Every stage here is a pure function: no I/O, no shared state, no errors
//! beyond what the PDF engine reports. Each stage can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! raw text ──▶ sanitize ──▶ classify ──▶ assemble ──▶ layout ──▶ pdf
//!             (per line)   (per line)   (+ title)    (styles)   (pages)
//! ```
//!
//! 1. [`sanitize`] — strip emphasis markers, drop blank lines, code fences
//!    and conversational preamble
//! 2. [`classify`] — map one line to one [`crate::document::Block`]
//! 3. [`assemble`] — split off the title and build the
//!    [`crate::document::StructuredDocument`]
//! 4. [`layout`]   — map every block to a fixed visual treatment from the
//!    [`layout::Theme`]; emits a flat element stream, no page breaks
//! 5. [`pdf`]      — flow engine: wraps text, breaks pages, paints boxes and
//!    the running footer, serialises PDF bytes

pub mod assemble;
pub mod classify;
pub mod layout;
pub mod pdf;
pub mod sanitize;

use crate::document::StructuredDocument;
use crate::error::GuideError;
pub use pdf::RenderedPdf;
use once_cell::sync::Lazy;
use regex::Regex;

/// Compile raw model output straight to a PDF with default settings.
pub fn compile_to_pdf(raw: &str, author: &str) -> Result<RenderedPdf, GuideError> {
    let doc = assemble::compile(raw, author);
    render_pdf(&doc, &layout::Theme::default())
}

/// Lay out and paginate a compiled document.
pub fn render_pdf(
    doc: &StructuredDocument,
    theme: &layout::Theme,
) -> Result<RenderedPdf, GuideError> {
    let tree = layout::layout(doc, theme);
    pdf::render(&tree)
}

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Output file name for a guide: whitespace runs become `_`, path separators
/// are neutralised, and `.pdf` is appended.
pub fn output_file_name(title: &str) -> String {
    let stem = RE_WHITESPACE.replace_all(title.trim(), "_");
    let stem: String = stem
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let stem = if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "guia".to_string()
    } else {
        stem
    };
    format!("{stem}.pdf")
}
