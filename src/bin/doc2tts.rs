//! CLI binary for edgequake-doc2tts.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `CleaningOptions` / `CleaningConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_doc2tts::{
    clean_document, preview_instructions, write_chapters, write_zip, CleanedDocument,
    CleaningConfig, CleaningOptions, CleaningProgressCallback, Credential, ProgressCallback,
    SplitStrategy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback. The model call is a single long request, so
/// this is a spinner with elapsed time rather than a bar.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl CleaningProgressCallback for CliProgressCallback {
    fn on_document_encoded(&self, bytes: usize, media_type: &str) {
        self.bar.println(format!(
            "{} {}  {}",
            cyan("◆"),
            bold("Document loaded"),
            dim(&format!("{} · {}", human_bytes(bytes), media_type)),
        ));
    }

    fn on_request_start(&self, model: &str) {
        self.bar.set_prefix("Cleaning");
        self.bar
            .set_message(format!("waiting for {model} (this can take minutes)"));
    }

    fn on_request_complete(&self, chapters: usize) {
        let elapsed = self.bar.elapsed();
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} chapters ready  {}",
            green("✔"),
            bold(&chapters.to_string()),
            dim(&format!("{:.1}s", elapsed.as_secs_f64())),
        );
    }

    fn on_error(&self, error: &str) {
        self.bar.finish_and_clear();

        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 100 {
            let head: String = error.chars().take(99).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };
        eprintln!("{} {}", red("✘"), red(&msg));
    }
}

fn human_bytes(n: usize) -> String {
    const KB: f64 = 1024.0;
    let n = n as f64;
    if n >= KB * KB {
        format!("{:.1} MB", n / (KB * KB))
    } else if n >= KB {
        format!("{:.1} KB", n / KB)
    } else {
        format!("{n} B")
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Clean a PDF, print chapters to stdout
  doc2tts book.pdf

  # One .txt file per chapter
  doc2tts book.pdf -o chapters/

  # Pages 10-42 only, as a zip archive
  doc2tts --start-page 10 --end-page 42 book.pdf --zip book.zip

  # Keep tables and page numbers, no chapter splitting
  doc2tts --keep-tables --keep-page-numbers --split none report.docx

  # Show the instruction that would be sent (no API key needed)
  doc2tts --print-prompt --split none notes.md

  # Structured output with stats and warnings
  doc2tts --json book.pdf > book.json

SUPPORTED INPUTS:
  .pdf .docx .txt .rtf .md .html .htm

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  API_KEY                 Fallback when GEMINI_API_KEY is unset
  DOC2TTS_MODEL           Override model ID (default gemini-2.5-pro)
  DOC2TTS_BASE_URL        Override the Gemini API base URL
  RUST_LOG                Override log filter (e.g. edgequake_doc2tts=debug)
"#;

/// Prepare documents for Text-to-Speech narration using Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "doc2tts",
    version,
    about = "Prepare documents for Text-to-Speech narration using Gemini",
    long_about = "Clean a document (PDF, DOCX, TXT, RTF, Markdown, HTML) for Text-to-Speech: \
strip headers, footers and page numbers, normalise whitespace, turn tables into prose and \
split the result into titled chapters. The whole document is sent to a Gemini model in a \
single schema-constrained request.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local document path.
    input: PathBuf,

    /// Keep running headers and footers.
    #[arg(long)]
    keep_headers_footers: bool,

    /// Keep page numbers.
    #[arg(long)]
    keep_page_numbers: bool,

    /// Keep original whitespace and line breaks.
    #[arg(long)]
    keep_whitespace: bool,

    /// Keep tables as-is instead of rewriting them as sentences.
    #[arg(long)]
    keep_tables: bool,

    /// First page to process (1-based, inclusive).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    start_page: Option<u32>,

    /// Last page to process (1-based, inclusive).
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    end_page: Option<u32>,

    /// Chapter splitting: auto (detect chapters) or none (one chapter).
    #[arg(long, value_enum, default_value = "auto")]
    split: SplitArg,

    /// Gemini model ID.
    #[arg(long, env = "DOC2TTS_MODEL")]
    model: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini API base URL.
    #[arg(long, env = "DOC2TTS_BASE_URL")]
    base_url: Option<String>,

    /// Path to a text file replacing the default instruction preamble.
    #[arg(long, env = "DOC2TTS_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Model temperature (0.0–2.0).
    #[arg(long, env = "DOC2TTS_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Model call timeout in seconds.
    #[arg(long, env = "DOC2TTS_API_TIMEOUT", default_value_t = 600)]
    api_timeout: u64,

    /// Write one .txt file per chapter into this directory.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write all chapters into this zip archive (or a directory).
    #[arg(long)]
    zip: Option<PathBuf>,

    /// Output structured JSON (CleanedDocument) instead of text.
    #[arg(long)]
    json: bool,

    /// Print the instruction that would be sent, then exit.
    #[arg(long)]
    print_prompt: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "DOC2TTS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2TTS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2TTS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum SplitArg {
    Auto,
    None,
}

impl From<SplitArg> for SplitStrategy {
    fn from(v: SplitArg) -> Self {
        match v {
            SplitArg::Auto => SplitStrategy::Auto,
            SplitArg::None => SplitStrategy::None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.print_prompt;
    let filter = log_filter(&cli, show_progress);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let options = build_options(&cli)?;
    let strategy = SplitStrategy::from(cli.split.clone());

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn CleaningProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Prompt preview ───────────────────────────────────────────────────
    if cli.print_prompt {
        println!("{}", preview_instructions(&options, strategy, &config));
        return Ok(());
    }

    // ── Run cleaning ─────────────────────────────────────────────────────
    let doc = clean_document(&cli.input, &options, strategy, &config)
        .await
        .context("Cleaning failed")?;

    if !cli.quiet {
        for w in &doc.warnings {
            eprintln!("{} {}", cyan("⚠"), w);
        }
    }

    let mut wrote_files = false;

    if let Some(ref dir) = cli.output {
        let paths = write_chapters(dir, &doc.chapters)
            .await
            .context("Failed to write chapter files")?;
        wrote_files = true;
        if !cli.quiet {
            eprintln!(
                "{}  {} files  →  {}",
                green("✔"),
                paths.len(),
                bold(&dir.display().to_string())
            );
        }
    }

    if let Some(ref zip_path) = cli.zip {
        let path = write_zip(zip_path, &doc.chapters)
            .await
            .context("Failed to write zip archive")?;
        wrote_files = true;
        if !cli.quiet {
            eprintln!(
                "{}  {} chapters  →  {}",
                green("✔"),
                doc.chapters.len(),
                bold(&path.display().to_string())
            );
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&doc).context("Failed to serialise output")?;
        println!("{json}");
    } else if !wrote_files {
        print_chapters(&doc)?;
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {} chars  /  {} tokens in  /  {} tokens out  ·  {}ms total",
            dim(&doc.total_chars().to_string()),
            dim(&token_count(doc.stats.prompt_tokens)),
            dim(&token_count(doc.stats.output_tokens)),
            doc.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Default tracing filter. The spinner replaces INFO-level library logs, but
/// warnings (truncated output, page-range fallback) still get through.
fn log_filter(cli: &Cli, show_progress: bool) -> &'static str {
    if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    }
}

/// Map the `--keep-*` and page flags to `CleaningOptions`.
fn build_options(cli: &Cli) -> Result<CleaningOptions> {
    let options = CleaningOptions {
        remove_headers_footers: !cli.keep_headers_footers,
        remove_page_numbers: !cli.keep_page_numbers,
        normalize_whitespace: !cli.keep_whitespace,
        linearize_tables: !cli.keep_tables,
        ..CleaningOptions::default()
    }
    .with_pages(cli.start_page, cli.end_page);

    options.validate().context("Invalid page range")?;
    Ok(options)
}

/// Map CLI args to `CleaningConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<CleaningConfig> {
    let mut builder = CleaningConfig::builder()
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    let key = cli.api_key.clone().or_else(|| std::env::var("API_KEY").ok());
    if let Some(credential) = Credential::from_optional(key) {
        builder = builder.credential(credential);
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Chapters as `# title` sections on stdout.
fn print_chapters(doc: &CleanedDocument) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for (i, chapter) in doc.chapters.iter().enumerate() {
        if i > 0 {
            writeln!(handle).context("Failed to write to stdout")?;
        }
        writeln!(handle, "# {}\n", chapter.title).context("Failed to write to stdout")?;
        handle
            .write_all(chapter.content.as_bytes())
            .context("Failed to write to stdout")?;
        if !chapter.content.ends_with('\n') {
            writeln!(handle).context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

fn token_count(n: Option<u32>) -> String {
    n.map(|n| n.to_string()).unwrap_or_else(|| "?".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_flags_invert_cleaning_options() {
        let cli = Cli::parse_from(["doc2tts", "a.pdf", "--keep-tables", "--keep-page-numbers"]);
        let opts = build_options(&cli).unwrap();
        assert!(opts.remove_headers_footers);
        assert!(!opts.remove_page_numbers);
        assert!(opts.normalize_whitespace);
        assert!(!opts.linearize_tables);
    }

    #[test]
    fn inverted_page_range_is_rejected() {
        let cli = Cli::parse_from(["doc2tts", "a.pdf", "--start-page", "9", "--end-page", "3"]);
        assert!(build_options(&cli).is_err());
    }

    #[test]
    fn split_none_maps_to_strategy() {
        let cli = Cli::parse_from(["doc2tts", "a.pdf", "--split", "none"]);
        assert_eq!(SplitStrategy::from(cli.split), SplitStrategy::None);
    }

    #[test]
    fn spinner_keeps_library_warnings_visible() {
        let cli = Cli::parse_from(["doc2tts", "a.pdf"]);
        assert_eq!(log_filter(&cli, true), "warn");
        assert_eq!(log_filter(&cli, false), "info");

        let quiet = Cli::parse_from(["doc2tts", "a.pdf", "-q"]);
        assert_eq!(log_filter(&quiet, false), "error");

        let verbose = Cli::parse_from(["doc2tts", "a.pdf", "-v"]);
        assert_eq!(log_filter(&verbose, true), "debug");
    }

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
