//! Generation entry points: inputs → study guide.
//!
//! [`generate`] runs the whole pipeline against a real provider;
//! [`generate_with`] takes any [`GenerationCollaborator`], which is how the
//! tests drive it. [`compile_text`] skips the service entirely and compiles
//! text the caller already has.
//!
//! A guide is paid for only once it exists: the credit gate runs before any
//! input is read, and the debit runs after the PDF has been rendered. If the
//! debit loses a race with another generation, the guide is discarded.

use crate::compiler::{self, assemble, output_file_name};
use crate::config::{GuideConfig, DEFAULT_GEMINI_MODEL};
use crate::credits::{self, CreditLedger};
use crate::error::GuideError;
use crate::output::{GuideOutput, GuideStats};
use crate::pipeline::encode::{encode_media, MediaPart};
use crate::pipeline::input::{resolve_media, MediaKind, ResolvedMedia};
use crate::pipeline::llm::{generate_with_retry, GenerationCollaborator, LlmCollaborator, RetryPolicy};
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Generate a study guide from photos and recordings.
///
/// # Arguments
/// * `inputs` — local paths or HTTP/HTTPS URLs, in the order the model
///   should see them
/// * `config` — generation configuration
/// * `ledger` — credit ledger to gate and debit; `None` generates for free
///
/// # Errors
/// Input errors ([`GuideError::FileNotFound`], [`GuideError::UnsupportedMedia`],
/// …), [`GuideError::NoCredits`], provider set-up errors, and
/// [`GuideError::GenerationFailed`] once every retry has failed.
pub async fn generate(
    inputs: &[impl AsRef<str>],
    config: &GuideConfig,
    ledger: Option<&dyn CreditLedger>,
) -> Result<GuideOutput, GuideError> {
    if inputs.is_empty() {
        return Err(GuideError::NoInputs);
    }
    let provider = resolve_provider(config)?;
    let collaborator = LlmCollaborator::new(provider, config);
    generate_with(&collaborator, inputs, config, ledger).await
}

/// [`generate`] with an explicit collaborator.
pub async fn generate_with(
    collaborator: &dyn GenerationCollaborator,
    inputs: &[impl AsRef<str>],
    config: &GuideConfig,
    ledger: Option<&dyn CreditLedger>,
) -> Result<GuideOutput, GuideError> {
    let total_start = Instant::now();
    if inputs.is_empty() {
        return Err(GuideError::NoInputs);
    }
    info!("Starting guide generation from {} input(s)", inputs.len());

    // ── Step 1: Credit gate ──────────────────────────────────────────────
    if let Some(ledger) = ledger {
        credits::check_gate(ledger).await?;
    }

    // ── Step 2: Resolve + encode inputs ──────────────────────────────────
    let encode_start = Instant::now();
    let media = resolve_all(inputs, config).await?;
    let parts: Vec<MediaPart> = media.iter().map(encode_media).collect();
    let encode_duration_ms = encode_start.elapsed().as_millis() as u64;

    let mut stats = GuideStats {
        input_files: media.len(),
        image_files: media.iter().filter(|m| m.kind() == MediaKind::Image).count(),
        audio_files: media.iter().filter(|m| m.kind() == MediaKind::Audio).count(),
        input_bytes: media.iter().map(|m| m.bytes.len() as u64).sum(),
        encode_duration_ms,
        ..Default::default()
    };
    drop(media);

    // ── Step 3: Generate ─────────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_start(parts.len());
    }
    let llm_start = Instant::now();
    let (generation, retries) = generate_with_retry(
        collaborator,
        &parts,
        config.instruction_text(),
        RetryPolicy::from(config),
    )
    .await?;
    stats.generation_duration_ms = llm_start.elapsed().as_millis() as u64;
    stats.input_tokens = generation.input_tokens;
    stats.output_tokens = generation.output_tokens;
    stats.retries = retries;
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(generation.text.len(), retries);
    }

    // ── Step 4: Compile + render ─────────────────────────────────────────
    let mut output = build_output(generation.text, config, stats)?;

    // ── Step 5: Debit ────────────────────────────────────────────────────
    if let Some(ledger) = ledger {
        match credits::debit_one(ledger).await {
            Ok(remaining) => output.stats.remaining_credits = Some(remaining),
            Err(e) => {
                warn!("Discarding generated guide: {}", e);
                return Err(e);
            }
        }
    }

    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Guide '{}' ready: {} blocks, {} page(s), {}ms total",
        output.document.title,
        output.stats.blocks,
        output.stats.pages,
        output.stats.total_duration_ms
    );
    Ok(output)
}

/// Compile model output the caller already has. No service, no credits.
pub fn compile_text(raw: &str, config: &GuideConfig) -> Result<GuideOutput, GuideError> {
    let start = Instant::now();
    let mut output = build_output(raw.to_string(), config, GuideStats::default())?;
    output.stats.total_duration_ms = start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Generate a guide and write the PDF.
///
/// `output` is either a `.pdf` path or a directory, in which case the file
/// name is derived from the guide title. Returns the written path.
pub async fn generate_to_file(
    inputs: &[impl AsRef<str>],
    output: impl AsRef<Path>,
    config: &GuideConfig,
    ledger: Option<&dyn CreditLedger>,
) -> Result<(PathBuf, GuideOutput), GuideError> {
    let guide = generate(inputs, config, ledger).await?;
    let path = output_path(output.as_ref(), &guide.file_name);
    write_pdf(&path, &guide.pdf).await?;
    Ok((path, guide))
}

/// Where a guide named `file_name` lands when the user asked for `output`.
pub fn output_path(output: &Path, file_name: &str) -> PathBuf {
    let is_pdf = output
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if output.is_dir() || !is_pdf {
        output.join(file_name)
    } else {
        output.to_path_buf()
    }
}

/// Write PDF bytes atomically: temp file in the target directory, then
/// rename over the destination.
pub async fn write_pdf(path: &Path, bytes: &[u8]) -> Result<(), GuideError> {
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
        .await
        .map_err(|e| GuideError::Internal(format!("write task: {e}")))?
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), GuideError> {
    let fail = |source: std::io::Error| GuideError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(fail)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    tmp.persist(path).map_err(|e| fail(e.error))?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn build_output(
    raw_text: String,
    config: &GuideConfig,
    mut stats: GuideStats,
) -> Result<GuideOutput, GuideError> {
    let (document, report) = assemble::compile_with(
        &raw_text,
        &config.author,
        &config.default_title,
        &config.sanitizer(),
    );
    stats.apply_report(&report);
    if let Some(ref cb) = config.progress_callback {
        cb.on_compile_complete(report.blocks, report.dropped_lines);
    }

    let pdf = compiler::render_pdf(&document, &config.theme)?;
    stats.pages = pdf.page_count;
    stats.pdf_bytes = pdf.bytes.len();

    Ok(GuideOutput {
        raw_text,
        file_name: output_file_name(&document.title),
        document,
        pdf: pdf.bytes,
        stats,
    })
}

/// Resolve every input concurrently, then restore the caller's order.
///
/// The first failing input (in input order) fails the whole run: the model
/// must see everything the caller gave it.
async fn resolve_all(
    inputs: &[impl AsRef<str>],
    config: &GuideConfig,
) -> Result<Vec<ResolvedMedia>, GuideError> {
    let total = inputs.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_encode_start(total);
    }

    let mut results: Vec<(usize, Result<ResolvedMedia, GuideError>)> =
        stream::iter(inputs.iter().enumerate().map(|(index, input)| {
            let input = input.as_ref().to_string();
            async move {
                let result = resolve_media(
                    index,
                    &input,
                    config.download_timeout_secs,
                    config.max_file_bytes,
                )
                .await;
                if let Some(ref cb) = config.progress_callback {
                    match &result {
                        Ok(m) => cb.on_input_encoded(index, total, m.bytes.len()),
                        Err(e) => cb.on_input_failed(index, total, &e.to_string()),
                    }
                }
                (index, result)
            }
        }))
        .buffer_unordered(config.concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(index, _)| *index);
    results.into_iter().map(|(_, r)| r).collect()
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, GuideError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        GuideError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

fn default_model(provider_name: &str) -> Option<&'static str> {
    match provider_name.to_ascii_lowercase().as_str() {
        "gemini" | "google" => Some(DEFAULT_GEMINI_MODEL),
        "openai" => Some("gpt-4.1-mini"),
        "anthropic" => Some("claude-sonnet-4-20250514"),
        _ => None,
    }
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`). The model falls
///    back to a per-provider default; unknown providers need one.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **`GEMINI_API_KEY`** with `gemini-2.5-flash` (or `config.model`).
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &GuideConfig) -> Result<Arc<dyn LLMProvider>, GuideError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = match config.model.as_deref().or_else(|| default_model(name)) {
            Some(m) => m,
            None => {
                return Err(GuideError::ProviderNotConfigured {
                    provider: name.clone(),
                    hint: "No default model for this provider; pass --model.".into(),
                })
            }
        };
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if std::env::var("GEMINI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        let model = config.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
        return create_provider("gemini", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| GuideError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_for_directory_uses_title() {
        let dir = tempfile::tempdir().unwrap();
        let p = output_path(dir.path(), "Fotosíntesis.pdf");
        assert_eq!(p, dir.path().join("Fotosíntesis.pdf"));
    }

    #[test]
    fn output_path_keeps_explicit_pdf() {
        let p = output_path(Path::new("/tmp/out/guia.PDF"), "x.pdf");
        assert_eq!(p, PathBuf::from("/tmp/out/guia.PDF"));
    }

    #[test]
    fn output_path_treats_missing_dir_as_dir() {
        let p = output_path(Path::new("guias/2026"), "x.pdf");
        assert_eq!(p, PathBuf::from("guias/2026/x.pdf"));
    }

    #[test]
    fn compile_text_renders_offline() {
        let config = GuideConfig::builder().author("ana@example.com").build().unwrap();
        let out = compile_text("Fotosíntesis\nSECCIÓN: Uno\nTexto", &config).unwrap();
        assert_eq!(out.file_name, "Fotosíntesis.pdf");
        assert_eq!(out.stats.blocks, 2);
        assert_eq!(out.stats.pages, 1);
        assert!(out.pdf.starts_with(b"%PDF"));
        assert_eq!(out.stats.remaining_credits, None);
    }

    #[tokio::test]
    async fn write_pdf_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/guia.pdf");
        write_pdf(&path, b"%PDF-1.3 test").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.3 test");
        let leftovers = std::fs::read_dir(dir.path().join("a/b")).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn named_provider_without_default_model_needs_one() {
        let config = GuideConfig::builder()
            .provider_name("some-local-thing")
            .build()
            .unwrap();
        let err = resolve_provider(&config).err().unwrap();
        assert!(matches!(err, GuideError::ProviderNotConfigured { .. }));
    }

    #[test]
    fn default_models() {
        assert_eq!(default_model("Gemini"), Some("gemini-2.5-flash"));
        assert_eq!(default_model("ollama"), None);
    }
}
