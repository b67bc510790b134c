//! Configuration types for study-guide generation.
//!
//! Every knob lives in [`GuideConfig`], built via its [`GuideConfigBuilder`].
//! The compiler reads only the author, default title, preamble markers and
//! theme; everything else configures the surrounding pipeline (inputs, the
//! generation service and retries).

use crate::compiler::layout::Theme;
use crate::compiler::sanitize::{Sanitizer, DEFAULT_PREAMBLE_MARKERS};
use crate::document::DEFAULT_TITLE;
use crate::error::GuideError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Inline media above this size is refused before anything is sent.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 20 * 1024 * 1024;

/// Model used when only a Gemini key is available.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Configuration for one study-guide generation.
///
/// Built via [`GuideConfig::builder()`] or using [`GuideConfig::default()`].
///
/// # Example
/// ```rust
/// use notes2guide::GuideConfig;
///
/// let config = GuideConfig::builder()
///     .author("ana@example.com")
///     .model("gemini-2.5-flash")
///     .max_retries(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GuideConfig {
    /// Name shown in the guide's subtitle line. Default: "Estudiante".
    pub author: String,

    /// Title used when the model output has no usable first line.
    /// Default: "Guía de Aprendizaje".
    pub default_title: String,

    /// Case-insensitive substrings that mark a line as conversational
    /// preamble. Default: `["analizado"]`.
    pub preamble_markers: Vec<String>,

    /// Visual treatment of every block kind, header and footer.
    pub theme: Theme,

    /// Custom instruction. If None, uses [`crate::prompts::DEFAULT_INSTRUCTION`].
    pub instruction: Option<String>,

    /// LLM model identifier, e.g. "gemini-2.5-flash". If None, uses the
    /// provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.4.
    ///
    /// The guide asks for analogies and questions, so a little more freedom
    /// than a transcription task is useful.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 8192.
    ///
    /// A guide built from several photos and a recording runs well past
    /// 4 000 tokens; too low a cap cuts the last section mid-line.
    pub max_tokens: usize,

    /// Retries after the first failed generation attempt. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled after each attempt.
    /// Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-attempt timeout for the generation call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Number of inputs read and encoded at once. Default: 4.
    pub concurrency: usize,

    /// Largest accepted input in bytes. Default: 20 MiB.
    pub max_file_bytes: u64,

    /// Optional progress callback invoked at each stage boundary.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            author: "Estudiante".to_string(),
            default_title: DEFAULT_TITLE.to_string(),
            preamble_markers: DEFAULT_PREAMBLE_MARKERS.iter().map(|s| s.to_string()).collect(),
            theme: Theme::default(),
            instruction: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.4,
            max_tokens: 8192,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            download_timeout_secs: 120,
            concurrency: 4,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GuideConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuideConfig")
            .field("author", &self.author)
            .field("default_title", &self.default_title)
            .field("preamble_markers", &self.preamble_markers)
            .field("instruction", &self.instruction.as_ref().map(|s| s.len()))
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("max_file_bytes", &self.max_file_bytes)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn GuideProgressCallback>"),
            )
            .finish()
    }
}

impl GuideConfig {
    /// Create a new builder for `GuideConfig`.
    pub fn builder() -> GuideConfigBuilder {
        GuideConfigBuilder {
            config: Self::default(),
        }
    }

    /// Sanitizer configured with this config's preamble markers.
    pub fn sanitizer(&self) -> Sanitizer {
        Sanitizer::new(&self.preamble_markers)
    }

    /// The instruction to send, falling back to the built-in one.
    pub fn instruction_text(&self) -> &str {
        self.instruction
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_INSTRUCTION)
    }
}

/// Builder for [`GuideConfig`].
pub struct GuideConfigBuilder {
    config: GuideConfig,
}

impl fmt::Debug for GuideConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuideConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl GuideConfigBuilder {
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.config.author = author.into();
        self
    }

    pub fn default_title(mut self, title: impl Into<String>) -> Self {
        self.config.default_title = title.into();
        self
    }

    pub fn preamble_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.preamble_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.config.theme = theme;
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    /// Attach a progress callback.
    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GuideConfig, GuideError> {
        let c = &self.config;
        if c.default_title.trim().is_empty() {
            return Err(GuideError::InvalidConfig(
                "Default title must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(GuideError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(GuideError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_file_bytes == 0 {
            return Err(GuideError::InvalidConfig(
                "max_file_bytes must be ≥ 1".into(),
            ));
        }
        if c.instruction.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(GuideError::InvalidConfig(
                "Instruction override must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
