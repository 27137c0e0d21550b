//! Conversion entry points: PDF → Mathpix transcript → questions.
//!
//! ## Why split transcript parsing from conversion?
//!
//! Everything after the transcript download is pure text processing.
//! [`parse_transcript`] exposes that half on its own so callers holding an
//! existing `.mmd` file (or tests) can segment it without credentials or a
//! network. [`convert`] and friends wrap it with input resolution and the
//! Mathpix round-trip.

use crate::config::ConversionConfig;
use crate::error::Pdf2QuizError;
use crate::latex;
use crate::output::{ConversionOutput, ConversionStats, ParsedTranscript};
use crate::pipeline::input::{self, ResolvedInput};
use crate::pipeline::mathpix::MathpixClient;
use crate::pipeline::{answer_key, normalize, segment};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Segment a raw Mathpix transcript into questions with answers attached.
///
/// Runs the answer-key extractor on the *raw* text (normalisation deletes the
/// key section), then normalises, segments and attaches answers. Pure and
/// deterministic.
pub fn parse_transcript(raw_mmd: &str) -> ParsedTranscript {
    let answer_key = answer_key::extract_answer_key(raw_mmd);
    let cleaned_text = normalize::clean_transcript(raw_mmd);
    let mut questions = segment::segment_questions(&cleaned_text);
    segment::attach_answers(&mut questions, &answer_key);

    debug!(
        "Parsed transcript: {} questions, {} answer-key entries",
        questions.len(),
        answer_key.len()
    );

    ParsedTranscript {
        answer_key,
        cleaned_text,
        questions,
    }
}

/// Convert a PDF file or URL to segmented questions.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input` — Local file path or HTTP/HTTPS URL to a PDF
/// * `config` — Conversion configuration (must carry Mathpix credentials)
///
/// # Errors
/// Returns `Err(Pdf2QuizError)` for missing credentials, unreadable or
/// non-PDF input, and every Mathpix failure. There is no partial result.
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2QuizError> {
    let input_str = input_str.as_ref();
    // Credentials are checked before any download.
    let client = MathpixClient::new(config)?;
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    run(&client, &resolved, input_str, config).await
}

/// Convert an already-resolved input (used by the HTTP server for uploads).
///
/// The caller keeps ownership of `resolved`; its temporary file is removed
/// when the caller drops it.
pub async fn convert_with_input(
    resolved: &ResolvedInput,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2QuizError> {
    let client = MathpixClient::new(config)?;
    run(&client, resolved, &resolved.file_name(), config).await
}

/// Convert PDF bytes in memory.
///
/// Internally the library writes `bytes` to a managed [`tempfile`] which is
/// deleted when this function returns, whether it succeeds or fails.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2quiz::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("paper.pdf")?;
/// let config = ConversionConfig::from_env();
/// let output = convert_from_bytes(&bytes, &config).await?;
/// println!("{} questions", output.questions.len());
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2QuizError> {
    let client = MathpixClient::new(config)?;
    let resolved = ResolvedInput::spool(bytes, "document.pdf", None)?;
    // `resolved` is dropped (and the file deleted) when `run` returns
    run(&client, &resolved, "document.pdf", config).await
}

/// Convert a PDF and write the JSON output directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Pdf2QuizError> {
    let output = convert(input_str, config).await?;
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Pdf2QuizError::Internal(format!("JSON encoding: {e}")))?;
    write_atomic(output_path.as_ref(), json.as_bytes()).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2QuizError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2QuizError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Write `bytes` to `path` via a sibling temp file and rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Pdf2QuizError> {
    let write_err = |e: std::io::Error| Pdf2QuizError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Upload → poll → fetch → parse, reporting progress and errors.
async fn run(
    client: &MathpixClient,
    resolved: &ResolvedInput,
    label: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2QuizError> {
    let result = run_stages(client, resolved, label, config).await;
    if let (Err(e), Some(cb)) = (&result, config.progress_callback.as_ref()) {
        cb.on_conversion_error(&e.to_string());
    }
    result
}

async fn run_stages(
    client: &MathpixClient,
    resolved: &ResolvedInput,
    label: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Pdf2QuizError> {
    let total_start = Instant::now();
    info!("Starting conversion: {}", label);
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(label);
    }

    // ── Step 1: Upload ───────────────────────────────────────────────────
    let upload_start = Instant::now();
    let bytes = resolved.read_bytes().await?;
    let uploaded = client.upload(bytes, &resolved.file_name()).await?;
    let upload_ms = upload_start.elapsed().as_millis() as u64;
    if let Some(ref cb) = config.progress_callback {
        cb.on_uploaded(&uploaded.pdf_id);
    }

    // ── Step 2: Wait for processing ──────────────────────────────────────
    let processing_start = Instant::now();
    let outcome = client.poll_status(&uploaded.pdf_id).await?;
    let processing_ms = processing_start.elapsed().as_millis() as u64;
    info!(
        "Mathpix finished pdf_id={} after {} status checks ({}ms)",
        uploaded.pdf_id, outcome.attempts, processing_ms
    );

    // ── Step 3: Fetch transcript ─────────────────────────────────────────
    let fetch_start = Instant::now();
    let raw_mmd = client.fetch_mmd(&uploaded.pdf_id).await?;
    let fetch_ms = fetch_start.elapsed().as_millis() as u64;
    if let Some(ref cb) = config.progress_callback {
        cb.on_transcript_ready(raw_mmd.len());
    }

    // ── Step 4: Segment ──────────────────────────────────────────────────
    let parsed = parse_transcript(&raw_mmd);
    let latex_questions = latex::latex_questions(&parsed.questions);
    let latex_document = latex::latex_document(&latex_questions);

    let answered_count = parsed
        .questions
        .iter()
        .filter(|q| q.answer.is_some())
        .count();
    let stats = ConversionStats {
        poll_attempts: outcome.attempts,
        upload_ms,
        processing_ms,
        fetch_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        question_count: parsed.questions.len(),
        answered_count,
    };

    info!(
        "Conversion complete: {} questions ({} answered), {}ms total",
        stats.question_count, stats.answered_count, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(stats.question_count, stats.answered_count);
    }

    Ok(ConversionOutput {
        pdf_id: uploaded.pdf_id,
        questions: parsed.questions,
        answer_key: parsed.answer_key,
        cleaned_text: parsed.cleaned_text,
        raw_mmd,
        latex_questions,
        latex_document,
        status: outcome.status,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\\section*{Physics}\n\n\
        1. A body of mass $m$ moves with speed $$v$$.\n\
        Its kinetic energy is\n\
        (a) \\(mv\\)\n\
        (b) $\\frac{1}{2}mv^2$\n\
        (c) $mv^2$\n\
        (d) $2mv^2$\n\n\n\n\
        2. Unit of force is\n\
        a. joule\n\
        b. newton\n\n\
        Answer Key\n\
        1) B 2) b\n";

    #[test]
    fn parse_transcript_end_to_end() {
        let parsed = parse_transcript(SAMPLE);

        assert_eq!(parsed.questions.len(), 2);
        let q1 = &parsed.questions[0];
        assert_eq!(q1.number, 1);
        assert_eq!(
            q1.stem,
            "A body of mass \\(m\\) moves with speed \\(v\\). Its kinetic energy is"
        );
        assert_eq!(q1.options.len(), 4);
        assert_eq!(q1.options[1].text, "\\(\\frac{1}{2}mv^2\\)");
        assert_eq!(q1.answer, Some('b'));

        let q2 = &parsed.questions[1];
        assert_eq!(q2.option_text('b'), Some("newton"));
        assert_eq!(q2.answer, Some('b'));

        assert!(!parsed.cleaned_text.contains("Answer Key"));
        assert!(!parsed.cleaned_text.contains("\\section"));
        assert_eq!(parsed.answer_key.len(), 2);
    }

    #[test]
    fn parse_transcript_is_deterministic() {
        assert_eq!(parse_transcript(SAMPLE), parse_transcript(SAMPLE));
    }

    #[test]
    fn parse_transcript_without_questions() {
        let parsed = parse_transcript("Just a title\n\nSome prose.");
        assert!(parsed.questions.is_empty());
        assert!(parsed.answer_key.is_empty());
    }

    #[test]
    fn convert_requires_credentials() {
        let err = tokio_test::block_on(convert("paper.pdf", &ConversionConfig::default()));
        assert!(matches!(err, Err(Pdf2QuizError::MissingCredentials { .. })));
    }

    #[test]
    fn convert_from_bytes_rejects_non_pdf() {
        let config = ConversionConfig::builder()
            .credentials("id", "key")
            .build()
            .unwrap();
        let err = tokio_test::block_on(convert_from_bytes(b"<html>", &config));
        assert!(matches!(err, Err(Pdf2QuizError::NotAPdf { .. })));
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        tokio_test::block_on(write_atomic(&path, b"{}")).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
        assert!(!dir.path().join("nested/out.json.tmp").exists());
    }
}
