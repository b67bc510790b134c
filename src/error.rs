//! Error types for the notes2guide library.
//!
//! Only the surrounding pipeline can fail. The compiler itself (sanitize,
//! classify, assemble, layout) recovers every odd input locally:
//!
//! * empty model output becomes an empty document with a placeholder,
//! * a tag without a colon keeps the whole line as its payload,
//! * an unknown prefix is plain paragraph text.
//!
//! What remains is [`GuideError`]: bad inputs, an exhausted credit balance,
//! a generation service that stayed unavailable after retries, and I/O on the
//! way out. [`GuideError::is_retryable`] tells callers which of these are
//! worth presenting as "try again".

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the notes2guide library.
#[derive(Debug, Error)]
pub enum GuideError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The input is neither an image nor an audio recording.
    #[error("Unsupported media '{source_name}' ({mime_type})\nOnly images (png, jpeg, webp) and audio (mp3, wav, m4a, ogg) are accepted.")]
    UnsupportedMedia {
        source_name: String,
        mime_type: String,
    },

    /// The input is larger than the inline transport allows.
    #[error("'{source_name}' is {size} bytes, above the {limit}-byte limit for inline media")]
    FileTooLarge {
        source_name: String,
        size: u64,
        limit: u64,
    },

    /// Generation was requested with nothing to look at.
    #[error("No inputs given: add at least one photo or audio recording")]
    NoInputs,

    // ── Credit errors ─────────────────────────────────────────────────────
    /// The caller's credit balance is zero or negative.
    #[error("No credits left (balance: {balance}).\nBuy more credits to keep generating guides.")]
    NoCredits { balance: i64 },

    /// The credit ledger could not be read or updated.
    #[error("Credit ledger unavailable: {0}")]
    LedgerUnavailable(String),

    // ── Generation errors ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The generation service failed on every attempt.
    #[error("The generation service is busy or unreachable after {attempts} attempt(s): {detail}\nPlease try again.")]
    GenerationFailed { attempts: u32, detail: String },

    /// The final generation attempt did not answer in time.
    #[error("The generation service did not answer within {secs}s.\nPlease try again.")]
    GenerationTimeout { secs: u64 },

    // ── Render errors ─────────────────────────────────────────────────────
    /// The PDF engine could not produce the document.
    #[error("Failed to render the study guide PDF: {0}")]
    RenderFailed(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GuideError {
    /// Whether repeating the same request later can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GuideError::GenerationFailed { .. }
                | GuideError::GenerationTimeout { .. }
                | GuideError::DownloadFailed { .. }
                | GuideError::DownloadTimeout { .. }
                | GuideError::LedgerUnavailable(_)
        )
    }
}
