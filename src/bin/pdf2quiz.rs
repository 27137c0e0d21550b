//! CLI binary for edgequake-pdf2quiz.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2quiz::convert::write_atomic;
use edgequake_pdf2quiz::latex::{latex_document, latex_questions, readable_text};
use edgequake_pdf2quiz::{
    convert, export_docx, parse_transcript, ConversionConfig,
    ConversionProgressCallback, ExportOptions, ProgressCallback, Question,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::IpAddr;
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

/// Terminal progress callback: a single spinner whose message follows the
/// Mathpix job through upload, status checks and transcript download.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed_precise:.dim}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, input: &str) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(input.to_string());
    }

    fn on_uploaded(&self, pdf_id: &str) {
        self.bar.println(format!(
            "  {} Uploaded  {}",
            green("✓"),
            dim(&format!("pdf_id={pdf_id}"))
        ));
        self.bar.set_prefix("Processing");
        self.bar.set_message("waiting for Mathpix…");
    }

    fn on_poll(&self, attempt: u32, max_attempts: u32, status: &str) {
        self.bar
            .set_message(format!("{status}  {}", dim(&format!("check {attempt}/{max_attempts}"))));
    }

    fn on_transcript_ready(&self, transcript_len: usize) {
        self.bar.println(format!(
            "  {} Transcript  {}",
            green("✓"),
            dim(&format!("{transcript_len} chars"))
        ));
        self.bar.set_prefix("Segmenting");
        self.bar.set_message("");
    }

    fn on_conversion_complete(&self, question_count: usize, answered_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} questions  {}",
            green("✔"),
            bold(&question_count.to_string()),
            dim(&format!("({answered_count} with answers)"))
        );
    }

    fn on_conversion_error(&self, error: &str) {
        self.bar.finish_and_clear();
        let msg = error.lines().next().unwrap_or(error);
        eprintln!("{} {}", red("✘"), red(msg));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a paper and print the questions
  pdf2quiz paper.pdf

  # Full JSON result to a file, plus a DOCX import sheet
  pdf2quiz paper.pdf --format json -o paper.json --docx paper.docx

  # Standalone LaTeX document
  pdf2quiz https://example.com/mock-test.pdf --format document -o mock.tex

  # Segment an existing Mathpix transcript (no credentials needed)
  pdf2quiz --from-mmd paper.mmd --format json

  # Run the browser UI on http://127.0.0.1:4000
  pdf2quiz --serve

ENVIRONMENT VARIABLES:
  MATHPIX_APP_ID          Mathpix app id
  MATHPIX_APP_KEY         Mathpix app key
  MATHPIX_API_URL         Override the API endpoint (default https://api.mathpix.com)
  RUST_LOG                Override log filter (e.g. edgequake_pdf2quiz=debug)

SETUP:
  1. Set credentials: export MATHPIX_APP_ID=... MATHPIX_APP_KEY=...
  2. Convert:         pdf2quiz paper.pdf -o questions.txt
"#;

/// Extract multiple-choice questions from exam PDFs via Mathpix OCR.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2quiz",
    version,
    about = "Extract multiple-choice questions from exam PDFs via Mathpix OCR",
    long_about = "Upload an exam PDF (local file or URL) to Mathpix, wait for the math-aware \
transcript, and segment it into numbered questions with lettered options and answer-key \
entries. Output as readable text, JSON, LaTeX, or a DOCX table; or run the browser UI.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(required_unless_present_any = ["from_mmd", "serve"])]
    input: Option<String>,

    /// Output format.
    #[arg(long, env = "PDF2QUIZ_FORMAT", value_enum, default_value = "readable")]
    format: FormatArg,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "PDF2QUIZ_OUTPUT")]
    output: Option<PathBuf>,

    /// Also write a DOCX question table to this path.
    #[arg(long, env = "PDF2QUIZ_DOCX")]
    docx: Option<PathBuf>,

    /// Tag written into the DOCX `Tage` column.
    #[arg(long, env = "PDF2QUIZ_TAG", default_value = "NEET TEST -- 01 (2024)")]
    tag: String,

    /// Difficulty written into the DOCX `Medium` column.
    #[arg(long, env = "PDF2QUIZ_DIFFICULTY", default_value = "Easy")]
    difficulty: String,

    /// Segment an existing .mmd transcript instead of converting a PDF.
    #[arg(long, conflicts_with_all = ["input", "serve"])]
    from_mmd: Option<PathBuf>,

    /// Run the HTTP server with the browser UI.
    #[arg(long, conflicts_with = "input")]
    serve: bool,

    /// Address for --serve.
    #[arg(long, env = "PDF2QUIZ_BIND", default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Port for --serve.
    #[arg(long, env = "PDF2QUIZ_PORT", default_value_t = 4000)]
    port: u16,

    /// Directory for uploads spooled by --serve (default: system temp dir).
    #[arg(long, env = "PDF2QUIZ_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Mathpix app id.
    #[arg(long, env = "MATHPIX_APP_ID", hide_env_values = true)]
    app_id: Option<String>,

    /// Mathpix app key.
    #[arg(long, env = "MATHPIX_APP_KEY", hide_env_values = true)]
    app_key: Option<String>,

    /// Mathpix API base URL.
    #[arg(long, env = "MATHPIX_API_URL")]
    api_url: Option<String>,

    /// Maximum number of status checks while Mathpix processes the PDF.
    #[arg(long, env = "PDF2QUIZ_MAX_POLL_ATTEMPTS", default_value_t = 40,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_poll_attempts: u32,

    /// Base wait between status checks in milliseconds.
    #[arg(long, env = "PDF2QUIZ_POLL_INTERVAL", default_value_t = 1500)]
    poll_interval: u64,

    /// Per-request Mathpix timeout in seconds.
    #[arg(long, env = "PDF2QUIZ_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2QUIZ_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress spinner.
    #[arg(long, env = "PDF2QUIZ_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2QUIZ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2QUIZ_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    /// Exam-style text with answers.
    Readable,
    /// Full structured result.
    Json,
    /// `n. stem` / `a. option` blocks.
    Latex,
    /// Compilable LaTeX article.
    Document,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; it
    // provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.serve && cli.from_mmd.is_none();
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

    // ── Server mode ──────────────────────────────────────────────────────
    if cli.serve {
        return run_server(&cli).await;
    }

    // ── Produce questions ────────────────────────────────────────────────
    let (questions, answer_key, json) = if let Some(ref mmd_path) = cli.from_mmd {
        let raw = tokio::fs::read_to_string(mmd_path)
            .await
            .with_context(|| format!("Failed to read transcript {:?}", mmd_path))?;
        let parsed = parse_transcript(&raw);
        let json = serde_json::to_string_pretty(&parsed).context("Failed to serialise output")?;
        (parsed.questions, parsed.answer_key, json)
    } else {
        let input = cli
            .input
            .as_deref()
            .context("An input PDF path or URL is required")?;

        let progress_cb: Option<ProgressCallback> = if show_progress {
            Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
        } else {
            None
        };
        let config = build_config(&cli, progress_cb)?;

        let output = convert(input, &config).await.context("Conversion failed")?;
        if !cli.quiet && !show_progress {
            eprintln!(
                "Extracted {} questions ({} answered) in {}ms, {} status checks",
                output.stats.question_count,
                output.stats.answered_count,
                output.stats.total_duration_ms,
                output.stats.poll_attempts,
            );
        }
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        (output.questions, output.answer_key, json)
    };

    // ── Render ───────────────────────────────────────────────────────────
    let rendered = render(cli.format, &questions, json);

    if let Some(ref output_path) = cli.output {
        write_atomic(output_path, rendered.as_bytes())
            .await
            .context("Failed to write output")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} questions  →  {}",
                green("✔"),
                questions.len(),
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(rendered.as_bytes())
            .context("Failed to write to stdout")?;
        // Ensure a trailing newline on stdout.
        if !rendered.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    // ── DOCX export ──────────────────────────────────────────────────────
    if let Some(ref docx_path) = cli.docx {
        let options = ExportOptions {
            tag: cli.tag.clone(),
            difficulty: cli.difficulty.clone(),
        };
        let bytes =
            export_docx(&questions, &answer_key, &options).context("DOCX export failed")?;
        write_atomic(docx_path, &bytes)
            .await
            .context("Failed to write DOCX")?;
        if !cli.quiet {
            eprintln!(
                "{}  DOCX  →  {}",
                cyan("◆"),
                bold(&docx_path.display().to_string())
            );
        }
    }

    Ok(())
}

/// Render questions in the requested format. `json` is the pre-serialised
/// full result.
fn render(format: FormatArg, questions: &[Question], json: String) -> String {
    match format {
        FormatArg::Json => json,
        FormatArg::Readable => readable_text(questions),
        FormatArg::Latex => latex_questions(questions),
        FormatArg::Document => latex_document(&latex_questions(questions)),
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .max_poll_attempts(cli.max_poll_attempts)
        .poll_interval_ms(cli.poll_interval)
        .request_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let (Some(id), Some(key)) = (&cli.app_id, &cli.app_key) {
        builder = builder.credentials(id.clone(), key.clone());
    }
    if let Some(ref url) = cli.api_url {
        builder = builder.api_base_url(url.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(feature = "server")]
async fn run_server(cli: &Cli) -> Result<()> {
    use edgequake_pdf2quiz::server::{serve, ServerConfig};
    use std::net::SocketAddr;

    let config = build_config(cli, None)?;
    let server = ServerConfig {
        bind: SocketAddr::new(cli.bind, cli.port),
        upload_dir: cli.upload_dir.clone(),
        ..ServerConfig::default()
    };
    if !cli.quiet {
        eprintln!(
            "{} Serving on {}",
            cyan("◆"),
            bold(&format!("http://{}", server.bind))
        );
    }
    serve(server, config).await.context("Server failed")
}

#[cfg(not(feature = "server"))]
async fn run_server(_cli: &Cli) -> Result<()> {
    anyhow::bail!("This build was compiled without the `server` feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn from_mmd_needs_no_input() {
        let cli = Cli::try_parse_from(["pdf2quiz", "--from-mmd", "paper.mmd"]).unwrap();
        assert_eq!(cli.from_mmd, Some(PathBuf::from("paper.mmd")));
        assert!(cli.input.is_none());
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["pdf2quiz", "--serve"]).unwrap();
        assert!(cli.serve);
        assert_eq!(cli.port, 4000);
        assert_eq!(cli.bind, IpAddr::from([127, 0, 0, 1]));
    }

    #[test]
    fn render_formats() {
        let parsed = parse_transcript("1. Q\na. x");
        assert_eq!(render(FormatArg::Latex, &parsed.questions, String::new()), "1. Q\na. x");
        assert!(render(FormatArg::Document, &parsed.questions, String::new())
            .contains("\\begin{document}"));
        assert_eq!(render(FormatArg::Json, &parsed.questions, "{}".into()), "{}");
    }
}
