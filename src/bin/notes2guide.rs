//! CLI binary for notes2guide.
//!
//! A thin shim over the library crate that maps CLI flags to `GuideConfig`,
//! runs the pipeline and writes the PDF.

use anyhow::{Context, Result};
use clap::Parser;
use notes2guide::{
    compile_text, generate, output_path, write_pdf, CreditLedger, GuideConfig, GuideOutput,
    GuideProgressCallback, MemoryLedger, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a bar while inputs are read, then a spinner while the
/// model writes the guide.
struct CliProgressCallback {
    bar: ProgressBar,
    sources: Vec<String>,
}

impl CliProgressCallback {
    fn new(sources: Vec<String>) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar, sources })
    }

    fn source(&self, index: usize) -> &str {
        self.sources.get(index).map(String::as_str).unwrap_or("?")
    }
}

impl GuideProgressCallback for CliProgressCallback {
    fn on_encode_start(&self, total_inputs: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} inputs",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_inputs as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Reading");
    }

    fn on_input_encoded(&self, index: usize, _total: usize, bytes: usize) {
        self.bar.println(format!(
            "  {} {:<40}  {}",
            green("✓"),
            self.source(index),
            dim(&format!("{:.1} KiB", bytes as f64 / 1024.0)),
        ));
        self.bar.inc(1);
    }

    fn on_input_failed(&self, index: usize, _total: usize, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} {:<40}  {}",
            red("✗"),
            self.source(index),
            red(first_line),
        ));
        self.bar.inc(1);
    }

    fn on_generation_start(&self, parts: usize) {
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        self.bar.set_style(style);
        self.bar.set_prefix("Generating");
        self.bar.set_message(format!("study guide from {parts} input(s)…"));
    }

    fn on_generation_complete(&self, text_len: usize, retries: u32) {
        let retry_note = if retries > 0 {
            format!(" after {retries} retr{}", if retries == 1 { "y" } else { "ies" })
        } else {
            String::new()
        };
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Model answered ({text_len} chars){retry_note}"))
        ));
    }

    fn on_compile_complete(&self, blocks: usize, dropped_lines: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} blocks compiled  {}",
            green("✔"),
            bold(&blocks.to_string()),
            dim(&format!("({dropped_lines} lines dropped)")),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Photos of the whiteboard plus a voice note → PDF in the current directory
  notes2guide pizarra1.jpg pizarra2.jpg clase.m4a

  # Choose where the PDF goes (directory or .pdf path)
  notes2guide apuntes.png -o guias/
  notes2guide apuntes.png -o guias/celula.pdf

  # Put the student's name in the subtitle
  notes2guide --author "ana@example.com" apuntes.png

  # Keep the model's answer, then re-render it offline
  notes2guide apuntes.png --save-text respuesta.txt
  notes2guide --from-text respuesta.txt -o guia.pdf

  # Spend from a credit balance (refuses at 0)
  notes2guide --credits 3 apuntes.png

  # JSON output (compiled blocks + stats) instead of a PDF
  notes2guide --json apuntes.png > guia.json

ACCEPTED INPUTS:
  Images  png, jpg/jpeg, webp
  Audio   mp3, wav, m4a, ogg
  Local paths or http(s) URLs, up to --max-file-mb each.

TAGS THE MODEL IS ASKED TO USE:
  SECCIÓN:   section heading          CONTEXTO:  why it matters
  ANALOGÍA:  everyday comparison      PREGUNTA:  active-recall question
  RETO:      challenge                NOTA:      warning
  Any other line becomes a paragraph.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default model gemini-2.5-flash)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  NOTES2GUIDE_*           Every flag below, e.g. NOTES2GUIDE_AUTHOR
"#;

/// Turn photos and voice notes of study material into a study-guide PDF.
#[derive(Parser, Debug)]
#[command(
    name = "notes2guide",
    version,
    about = "Turn photos and voice notes of study material into a study-guide PDF",
    long_about = "Send photos and recordings of study material to a multimodal model, compile \
its tagged answer into sections, context notes, analogies, challenge questions and warnings, \
and lay the result out as a paginated PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Photos or recordings: local paths or HTTP/HTTPS URLs.
    #[arg(required_unless_present = "from_text")]
    inputs: Vec<String>,

    /// Output directory or .pdf path.
    #[arg(short, long, env = "NOTES2GUIDE_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// Compile an existing model answer instead of calling a model.
    #[arg(long, env = "NOTES2GUIDE_FROM_TEXT", conflicts_with = "inputs")]
    from_text: Option<PathBuf>,

    /// Also save the raw model answer to this file.
    #[arg(long, env = "NOTES2GUIDE_SAVE_TEXT")]
    save_text: Option<PathBuf>,

    /// Name shown under the title.
    #[arg(long, env = "NOTES2GUIDE_AUTHOR", default_value = "Estudiante")]
    author: String,

    /// Title used when the model gives none.
    #[arg(long, env = "NOTES2GUIDE_DEFAULT_TITLE")]
    default_title: Option<String>,

    /// Starting credit balance; one credit is spent per guide.
    #[arg(long, env = "NOTES2GUIDE_CREDITS")]
    credits: Option<i64>,

    /// LLM model ID (e.g. gemini-2.5-flash, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file with a custom instruction.
    #[arg(long, env = "NOTES2GUIDE_INSTRUCTION")]
    instruction: Option<PathBuf>,

    /// Max output tokens for the guide.
    #[arg(long, env = "NOTES2GUIDE_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "NOTES2GUIDE_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Retries on generation failure.
    #[arg(long, env = "NOTES2GUIDE_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Inputs read at once.
    #[arg(short, long, env = "NOTES2GUIDE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Largest accepted input, in MiB.
    #[arg(long, env = "NOTES2GUIDE_MAX_FILE_MB", default_value_t = 20)]
    max_file_mb: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "NOTES2GUIDE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-attempt generation timeout in seconds.
    #[arg(long, env = "NOTES2GUIDE_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Print the compiled guide and stats as JSON instead of writing a PDF.
    #[arg(long, env = "NOTES2GUIDE_JSON")]
    json: bool,

    /// Disable progress output.
    #[arg(long, env = "NOTES2GUIDE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NOTES2GUIDE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "NOTES2GUIDE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.from_text.is_none();
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new(cli.inputs.clone());
        Some(cb as Arc<dyn GuideProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let ledger = cli.credits.map(MemoryLedger::new);
    let guide = if let Some(ref path) = cli.from_text {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read model answer from {:?}", path))?;
        compile_text(&raw, &config).context("Compilation failed")?
    } else {
        let ledger_ref = ledger.as_ref().map(|l| l as &dyn CreditLedger);
        generate(&cli.inputs, &config, ledger_ref)
            .await
            .context("Guide generation failed")?
    };

    if let Some(ref path) = cli.save_text {
        tokio::fs::write(path, &guide.raw_text)
            .await
            .with_context(|| format!("Failed to save model answer to {:?}", path))?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&guide).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    let path = output_path(&cli.output, &guide.file_name);
    write_pdf(&path, &guide.pdf)
        .await
        .context("Failed to write PDF")?;

    if !cli.quiet {
        print_summary(&guide, &path);
    }
    Ok(())
}

fn print_summary(guide: &GuideOutput, path: &std::path::Path) {
    let s = &guide.stats;
    eprintln!(
        "{}  {}  {} blocks  {} page(s)  {}ms  →  {}",
        green("✔"),
        bold(&guide.document.title),
        s.blocks,
        s.pages,
        s.total_duration_ms,
        bold(&path.display().to_string()),
    );
    if s.input_files > 0 {
        eprintln!(
            "   {} tokens in  /  {} tokens out",
            dim(&s.input_tokens.to_string()),
            dim(&s.output_tokens.to_string()),
        );
    }
    if let Some(left) = s.remaining_credits {
        eprintln!("   {} credit(s) left", dim(&left.to_string()));
    }
    if s.default_title {
        eprintln!(
            "   {} the model gave no title; using '{}'",
            cyan("⚠"),
            guide.document.title
        );
    }
}

/// Map CLI args to `GuideConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GuideConfig> {
    let mut builder = GuideConfig::builder()
        .author(cli.author.clone())
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .concurrency(cli.concurrency)
        .max_file_bytes(cli.max_file_mb.saturating_mul(1024 * 1024))
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref path) = cli.instruction {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(text);
    }
    if let Some(ref title) = cli.default_title {
        builder = builder.default_title(title.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
