//! Progress-callback trait for guide generation events.
//!
//! Inject an [`Arc<dyn GuideProgressCallback>`] via
//! [`crate::config::GuideConfigBuilder::progress_callback`] to receive events
//! as the pipeline reads inputs, waits on the generation service and compiles
//! the result.
//!
//! # Example
//!
//! ```rust
//! use notes2guide::{GuideConfig, GuideProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     encoded: AtomicUsize,
//! }
//!
//! impl GuideProgressCallback for CountingCallback {
//!     fn on_input_encoded(&self, index: usize, total: usize, bytes: usize) {
//!         let done = self.encoded.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}/{total} inputs ready (#{index}, {bytes} bytes)");
//!     }
//! }
//!
//! let config = GuideConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { encoded: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the generation pipeline at each stage boundary.
///
/// Implementations must be `Send + Sync`: inputs are read and encoded
/// concurrently, so `on_input_encoded` and `on_input_failed` may be called
/// from different tasks at the same time. All methods default to no-ops.
pub trait GuideProgressCallback: Send + Sync {
    /// Called once before any input is read.
    fn on_encode_start(&self, total_inputs: usize) {
        let _ = total_inputs;
    }

    /// Called when one input has been read and encoded.
    ///
    /// # Arguments
    /// * `index` — 0-based position in the caller's input list
    /// * `total` — number of inputs
    /// * `bytes` — size of the raw file
    fn on_input_encoded(&self, index: usize, total: usize, bytes: usize) {
        let _ = (index, total, bytes);
    }

    /// Called when an input could not be read or is not acceptable.
    fn on_input_failed(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called just before the generation request is sent.
    fn on_generation_start(&self, parts: usize) {
        let _ = parts;
    }

    /// Called when the generation service has answered.
    ///
    /// `text_len` is the byte length of the raw model output.
    fn on_generation_complete(&self, text_len: usize, retries: u32) {
        let _ = (text_len, retries);
    }

    /// Called once the model output has been compiled into blocks.
    fn on_compile_complete(&self, blocks: usize, dropped_lines: usize) {
        let _ = (blocks, dropped_lines);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GuideProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GuideConfig`].
pub type ProgressCallback = Arc<dyn GuideProgressCallback>;
