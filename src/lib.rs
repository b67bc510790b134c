//! # notes2guide
//!
//! Turn photos and voice notes of study material into a styled, paginated
//! study guide.
//!
//! A multimodal model is asked to write the guide as loosely tagged plain
//! text (`SECCIÓN:`, `CONTEXTO:`, `ANALOGÍA:`, `PREGUNTA:`/`RETO:`,
//! `NOTA:`). This crate's core is the compiler that turns that text into a
//! PDF: it strips stray markup, classifies each line into a closed set of
//! block kinds, and lays every kind out with its own visual treatment.
//!
//! ## Pipeline Overview
//!
//! ```text
//! photos / recordings
//!  │
//!  ├─ 1. Input     resolve local files or download URLs; check type and size
//!  ├─ 2. Encode    bytes → base64 inline parts (concurrent, order restored)
//!  ├─ 3. Gate      credit balance must be positive
//!  ├─ 4. Generate  one model call (retry + backoff + timeout)
//!  ├─ 5. Compile   sanitize → classify → assemble   (pure)
//!  ├─ 6. Render    layout → paginated PDF           (pure)
//!  └─ 7. Debit     take exactly one credit, atomically
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notes2guide::{generate, GuideConfig, MemoryLedger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = GuideConfig::builder().author("ana@example.com").build()?;
//!     let credits = MemoryLedger::new(3);
//!     let guide = generate(&["pizarra.jpg", "clase.m4a"], &config, Some(&credits)).await?;
//!     std::fs::write(&guide.file_name, &guide.pdf)?;
//!     eprintln!("{} blocks on {} page(s)", guide.stats.blocks, guide.stats.pages);
//!     Ok(())
//! }
//! ```
//!
//! Text you already have compiles without a model:
//!
//! ```rust
//! let doc = notes2guide::compile("Fotosíntesis\nSECCIÓN: Introducción", "ana");
//! assert_eq!(doc.title, "Fotosíntesis");
//! assert_eq!(doc.blocks.len(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `notes2guide` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compiler;
pub mod config;
pub mod credits;
pub mod document;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compiler::assemble::{compile, compile_with, split_raw, CompileReport};
pub use compiler::classify::classify_line;
pub use compiler::layout::{layout, LayoutDocument, Theme};
pub use compiler::sanitize::Sanitizer;
pub use compiler::{compile_to_pdf, output_file_name, render_pdf, RenderedPdf};
pub use config::{GuideConfig, GuideConfigBuilder};
pub use credits::{CreditLedger, MemoryLedger};
pub use document::{Block, RawDocument, StructuredDocument, DEFAULT_TITLE};
pub use error::GuideError;
pub use generate::{
    compile_text, generate, generate_to_file, generate_with, output_path, resolve_provider,
    write_pdf,
};
pub use output::{GuideOutput, GuideStats};
pub use pipeline::encode::MediaPart;
pub use pipeline::llm::{Generation, GenerationCollaborator, LlmCollaborator};
pub use progress::{GuideProgressCallback, NoopProgressCallback, ProgressCallback};
