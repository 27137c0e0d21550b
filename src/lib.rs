//! # edgequake-pdf2quiz
//!
//! Turn exam-paper PDFs into structured multiple-choice questions using the
//! Mathpix OCR service.
//!
//! ## Why this crate?
//!
//! Generic PDF-to-text tools mangle mathematics: superscripts, fractions and
//! Greek letters come out as unreadable glyph soup. Mathpix returns a
//! math-aware Markdown transcript ("MMD") instead, but that transcript is
//! still a flat page of text. This crate recovers the exam structure from it:
//! numbered stems, lettered options and the trailing answer key, ready for
//! browser rendering, LaTeX, or a DOCX import sheet.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input       resolve local file, download URL, or spool bytes
//!  ├─ 2. Mathpix     upload → poll until processed → fetch .mmd
//!  ├─ 3. Answer key  number → letter map from the raw transcript
//!  ├─ 4. Normalize   canonical \( … \) math, strip headings + answer key
//!  ├─ 5. Segment     line classifier → Vec<Question>
//!  └─ 6. Output      JSON, readable text, LaTeX, DOCX
//! ```
//!
//! Steps 3–5 are pure and available on their own via [`parse_transcript`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2quiz::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials from MATHPIX_APP_ID / MATHPIX_APP_KEY
//!     let config = ConversionConfig::from_env();
//!     let output = convert("paper.pdf", &config).await?;
//!     for q in &output.questions {
//!         println!("{}. {} ({} options)", q.number, q.stem, q.options.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Offline, from an existing transcript:
//!
//! ```rust
//! use edgequake_pdf2quiz::parse_transcript;
//!
//! let parsed = parse_transcript("1. Unit of force?\na. joule\nb. newton\n\nAnswer Key\n1) B");
//! assert_eq!(parsed.questions[0].options.len(), 2);
//! assert_eq!(parsed.questions[0].answer, Some('b'));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdf2quiz` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | on      | Axum HTTP API with the embedded upload page |
//!
//! Disable both when using only the library:
//! ```toml
//! edgequake-pdf2quiz = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod latex;
pub mod output;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, MathpixOptions};
pub use convert::{
    convert, convert_from_bytes, convert_sync, convert_to_file, convert_with_input,
    parse_transcript,
};
pub use error::Pdf2QuizError;
pub use export::{export_docx, ExportOptions};
pub use output::{
    AnswerMap, ConversionOutput, ConversionStats, ParsedTranscript, Question, QuestionOption,
};
pub use pipeline::segment::segment_questions;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
