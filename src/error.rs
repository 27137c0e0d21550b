//! Error types for the edgequake-pdf2quiz library.
//!
//! Only the I/O side of the pipeline can fail. Transcript segmentation and
//! answer-key extraction are total over any input text: a line that fits no
//! pattern is absorbed or dropped, never reported.
//!
//! [`Pdf2QuizError`] is therefore the single fatal error type, returned as
//! `Err(Pdf2QuizError)` from the `convert*` entry points, the Mathpix client
//! and the DOCX exporter. Variants are grouped by the stage that raised them
//! so a caller (or the HTTP layer) can map them to a response without
//! string-matching messages.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2quiz library.
#[derive(Debug, Error)]
pub enum Pdf2QuizError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
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

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Credential errors ─────────────────────────────────────────────────
    /// Mathpix app id / app key were not supplied.
    #[error("Mathpix credentials are not configured.\n{hint}")]
    MissingCredentials { hint: String },

    /// Mathpix answered 401/403.
    #[error("Mathpix rejected the credentials ({status}): {detail}")]
    AuthError { status: u16, detail: String },

    // ── Mathpix errors ────────────────────────────────────────────────────
    /// A request to Mathpix could not be completed (DNS, TLS, connection reset…).
    #[error("Mathpix request failed during {stage}: {reason}")]
    RequestFailed { stage: &'static str, reason: String },

    /// A single Mathpix request exceeded the per-request timeout.
    #[error("Mathpix request timed out after {secs}s during {stage}")]
    RequestTimeout { stage: &'static str, secs: u64 },

    /// Mathpix answered with something that is not JSON.
    #[error("Mathpix returned non-JSON response: {snippet}")]
    NonJsonResponse { snippet: String },

    /// The upload succeeded at the HTTP level but no `pdf_id` came back.
    #[error("No pdf_id in Mathpix response: {response}")]
    UploadRejected { response: String },

    /// Mathpix reported `status: "error"` while processing the document.
    #[error("Mathpix processing failed for '{pdf_id}': {detail}")]
    ProcessingFailed { pdf_id: String, detail: String },

    /// The polling budget ran out before Mathpix reported `completed`.
    #[error("Timeout waiting for Mathpix processing of '{pdf_id}' after {attempts} status checks")]
    ProcessingTimeout { pdf_id: String, attempts: u32 },

    /// The `.mmd` transcript could not be downloaded.
    #[error("Failed to fetch MMD for '{pdf_id}': HTTP {status} {body}")]
    TranscriptFetchFailed {
        pdf_id: String,
        status: u16,
        body: String,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Building the DOCX archive failed.
    #[error("DOCX export failed: {0}")]
    ExportFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2QuizError {
    /// True when the failure originated on the Mathpix side rather than in
    /// the caller's input or the local machine.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Pdf2QuizError::AuthError { .. }
                | Pdf2QuizError::NonJsonResponse { .. }
                | Pdf2QuizError::UploadRejected { .. }
                | Pdf2QuizError::ProcessingFailed { .. }
                | Pdf2QuizError::ProcessingTimeout { .. }
                | Pdf2QuizError::TranscriptFetchFailed { .. }
        )
    }
}

impl From<zip::result::ZipError> for Pdf2QuizError {
    fn from(e: zip::result::ZipError) -> Self {
        Pdf2QuizError::ExportFailed(e.to_string())
    }
}
