//! Pipeline stages around the compiler: getting inputs to the generation
//! service and its answer back.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ (compiler)
//! (path/URL)  (base64)   (model)
//! ```
//!
//! 1. [`input`]  — read a local file or download a URL; decide its mime
//!    type and refuse anything that is not an accepted image or recording
//! 2. [`encode`] — base64-wrap the bytes as an inline [`encode::MediaPart`]
//! 3. [`llm`]    — the [`llm::GenerationCollaborator`] seam plus the
//!    retry/backoff/timeout loop; the only stage talking to a model

pub mod encode;
pub mod input;
pub mod llm;
