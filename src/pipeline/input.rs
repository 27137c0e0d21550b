//! Input resolution: normalise a user-supplied path, URL or byte buffer to a
//! local PDF file.
//!
//! ## Why always a file?
//!
//! Every conversion job owns exactly one temporary resource when its input
//! did not already live on disk: a downloaded URL, bytes handed to
//! [`crate::convert::convert_from_bytes`], or a browser upload received by the
//! HTTP server. Holding it in a [`ResolvedInput`] ties its lifetime to the
//! job: the `TempDir` / `NamedTempFile` is deleted when the value is dropped,
//! on success, on error and on panic alike. We validate the PDF magic bytes
//! (`%PDF`) before returning so callers get a meaningful error instead of a
//! Mathpix rejection after a full upload.

use crate::error::Pdf2QuizError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The resolved input: a local path, a downloaded temp file or spooled bytes.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was a URL; PDF downloaded to a temp directory.
    /// The `TempDir` is kept alive to prevent cleanup until processing completes.
    Downloaded { path: PathBuf, _temp_dir: TempDir },
    /// Input arrived as bytes; written to a named temp file.
    Spooled { name: String, file: NamedTempFile },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Downloaded { path, .. } => path,
            ResolvedInput::Spooled { file, .. } => file.path(),
        }
    }

    /// File name to report to Mathpix in the multipart upload.
    pub fn file_name(&self) -> String {
        match self {
            ResolvedInput::Spooled { name, .. } => name.clone(),
            other => other
                .path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.pdf".to_string()),
        }
    }

    /// Write `bytes` to a temp file (in `dir`, or the system temp dir).
    ///
    /// Rejects buffers that do not start with `%PDF`.
    pub fn spool(
        bytes: &[u8],
        name: impl Into<String>,
        dir: Option<&Path>,
    ) -> Result<Self, Pdf2QuizError> {
        let name = name.into();
        if !has_pdf_magic(bytes) {
            return Err(Pdf2QuizError::NotAPdf {
                path: PathBuf::from(&name),
                magic: leading_magic(bytes),
            });
        }

        let mut file = match dir {
            Some(d) => NamedTempFile::new_in(d),
            None => NamedTempFile::new(),
        }
        .map_err(|e| Pdf2QuizError::Internal(format!("tempfile: {e}")))?;
        file.write_all(bytes)
            .map_err(|e| Pdf2QuizError::Internal(format!("tempfile write: {e}")))?;

        debug!("Spooled {} bytes to {}", bytes.len(), file.path().display());
        Ok(ResolvedInput::Spooled { name, file })
    }

    /// Read the whole PDF into memory for upload.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, Pdf2QuizError> {
        tokio::fs::read(self.path())
            .await
            .map_err(|e| Pdf2QuizError::Internal(format!("Failed to read PDF: {e}")))
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// True when `bytes` begins with the `%PDF` header.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[..4] == PDF_MAGIC
}

fn leading_magic(bytes: &[u8]) -> [u8; 4] {
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    magic
}

/// Resolve the input string to a local PDF file path.
///
/// If the input is a URL, download it to a temporary directory.
/// If the input is a local file, validate it exists and is readable.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2QuizError> {
    if input.trim().is_empty() {
        return Err(Pdf2QuizError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, Pdf2QuizError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Pdf2QuizError::FileNotFound { path });
    }

    // Check read permission by attempting to open
    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != PDF_MAGIC {
                return Err(Pdf2QuizError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Pdf2QuizError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(Pdf2QuizError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, Pdf2QuizError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Pdf2QuizError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2QuizError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Pdf2QuizError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Pdf2QuizError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url);

    let temp_dir = TempDir::new().map_err(|e| Pdf2QuizError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Pdf2QuizError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if !has_pdf_magic(&bytes) {
        return Err(Pdf2QuizError::NotAPdf {
            path: file_path,
            magic: leading_magic(&bytes),
        });
    }

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| Pdf2QuizError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded to: {}", file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        _temp_dir: temp_dir,
    })
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
