//! Mathpix interaction: upload a PDF, wait for processing, fetch the `.mmd`.
//!
//! Mathpix processes PDFs asynchronously. An upload returns a `pdf_id`
//! immediately; the document is then split, OCR'd and reassembled in the
//! background and we learn about completion only by asking. This module is
//! intentionally thin: it speaks HTTP and maps failures to
//! [`Pdf2QuizError`] variants. Everything that interprets the transcript
//! lives in the pure pipeline stages.
//!
//! ## Polling Strategy
//!
//! Status requests are spaced by a linearly growing wait
//! (`poll_interval_ms + attempt * poll_backoff_step_ms`). With the defaults
//! (1500 ms base, 100 ms step, 40 attempts) the wait sequence is
//! 1.5 s → 1.6 s → … → 5.4 s, roughly two minutes in total. Short papers
//! complete in the first few checks; long ones are not hammered.
//!
//! A reported `"error"` status is fatal and not retried: Mathpix will not
//! change its mind about a document it failed to read.

use crate::config::ConversionConfig;
use crate::error::Pdf2QuizError;
use crate::progress::ProgressCallback;
use reqwest::{multipart, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Longest response excerpt carried inside an error.
const SNIPPET_LEN: usize = 400;

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadResponse {
    /// Document id used by every later request.
    pub pdf_id: String,
    /// Full JSON body returned by Mathpix.
    pub raw: Value,
}

/// Result of a successful polling loop.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// Final status object (its `status` field is `"completed"`).
    pub status: Value,
    /// Number of status requests issued, including the final one.
    pub attempts: u32,
}

/// HTTP client for the Mathpix `v3/pdf` API.
///
/// Credentials and endpoint come from the [`ConversionConfig`] passed to
/// [`MathpixClient::new`]; the client never reads the environment.
pub struct MathpixClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_key: String,
    config: ConversionConfig,
}

impl MathpixClient {
    /// Build a client, failing fast when credentials are missing.
    pub fn new(config: &ConversionConfig) -> Result<Self, Pdf2QuizError> {
        let (app_id, app_key) = match (config.app_id.as_deref(), config.app_key.as_deref()) {
            (Some(id), Some(key)) if !id.trim().is_empty() && !key.trim().is_empty() => {
                (id.trim().to_string(), key.trim().to_string())
            }
            _ => {
                return Err(Pdf2QuizError::MissingCredentials {
                    hint: "Set MATHPIX_APP_ID and MATHPIX_APP_KEY, or pass --app-id / --app-key."
                        .into(),
                })
            }
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Pdf2QuizError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            app_id,
            app_key,
            config: config.clone(),
        })
    }

    fn progress(&self) -> Option<&ProgressCallback> {
        self.config.progress_callback.as_ref()
    }

    fn pdf_url(&self, suffix: &str) -> String {
        format!("{}/v3/pdf{}", self.base_url, suffix)
    }

    /// Upload PDF bytes and return the assigned `pdf_id`.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
    ) -> Result<UploadResponse, Pdf2QuizError> {
        const STAGE: &str = "upload";
        info!("Uploading '{}' ({} bytes) to Mathpix", file_name, bytes.len());

        let options_json = serde_json::to_string(&self.config.mathpix_options)
            .map_err(|e| Pdf2QuizError::Internal(format!("options_json: {e}")))?;

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| Pdf2QuizError::Internal(format!("multipart: {e}")))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("options_json", options_json);

        let response = self
            .http
            .post(self.pdf_url(""))
            .header("app_id", &self.app_id)
            .header("app_key", &self.app_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(STAGE, e))?;

        let body = self.read_json(STAGE, response).await?;

        match body.get("pdf_id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => {
                info!("Mathpix accepted upload: pdf_id={}", id);
                Ok(UploadResponse {
                    pdf_id: id.to_string(),
                    raw: body,
                })
            }
            _ => Err(Pdf2QuizError::UploadRejected {
                response: snippet(&body.to_string()),
            }),
        }
    }

    /// Poll the processing status until `"completed"`, `"error"` or the
    /// attempt budget runs out.
    pub async fn poll_status(&self, pdf_id: &str) -> Result<PollOutcome, Pdf2QuizError> {
        const STAGE: &str = "status";
        let max = self.config.max_poll_attempts;

        for attempt in 0..max {
            let response = self
                .http
                .get(self.pdf_url(&format!("/{pdf_id}")))
                .header("app_id", &self.app_id)
                .header("app_key", &self.app_key)
                .send()
                .await
                .map_err(|e| self.transport_error(STAGE, e))?;
            let status = self.read_json(STAGE, response).await?;

            let state = status
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            debug!(
                "pdf_id={} status check {}/{}: {}",
                pdf_id,
                attempt + 1,
                max,
                state
            );
            if let Some(cb) = self.progress() {
                cb.on_poll(attempt + 1, max, &state);
            }

            match state.as_str() {
                "completed" => {
                    return Ok(PollOutcome {
                        status,
                        attempts: attempt + 1,
                    })
                }
                "error" => {
                    let detail = status
                        .get("error")
                        .map(|e| match e.as_str() {
                            Some(s) => s.to_string(),
                            None => e.to_string(),
                        })
                        .unwrap_or_else(|| snippet(&status.to_string()));
                    warn!("Mathpix reported error for pdf_id={}: {}", pdf_id, detail);
                    return Err(Pdf2QuizError::ProcessingFailed {
                        pdf_id: pdf_id.to_string(),
                        detail,
                    });
                }
                _ => {}
            }

            if attempt + 1 < max {
                sleep(Duration::from_millis(self.config.poll_delay_ms(attempt))).await;
            }
        }

        warn!("pdf_id={} not completed after {} status checks", pdf_id, max);
        Err(Pdf2QuizError::ProcessingTimeout {
            pdf_id: pdf_id.to_string(),
            attempts: max,
        })
    }

    /// Download the processed transcript in Mathpix Markdown.
    pub async fn fetch_mmd(&self, pdf_id: &str) -> Result<String, Pdf2QuizError> {
        const STAGE: &str = "transcript download";

        let response = self
            .http
            .get(self.pdf_url(&format!("/{pdf_id}.mmd")))
            .header("app_id", &self.app_id)
            .header("app_key", &self.app_key)
            .header(reqwest::header::ACCEPT, "text/plain")
            .send()
            .await
            .map_err(|e| self.transport_error(STAGE, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(STAGE, e))?;

        if !status.is_success() {
            return Err(Pdf2QuizError::TranscriptFetchFailed {
                pdf_id: pdf_id.to_string(),
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        debug!("Fetched MMD for pdf_id={}: {} bytes", pdf_id, body.len());
        Ok(body)
    }

    /// Read a response body as JSON, mapping auth failures and non-JSON
    /// bodies to their own variants.
    async fn read_json(
        &self,
        stage: &'static str,
        response: reqwest::Response,
    ) -> Result<Value, Pdf2QuizError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(stage, e))?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Pdf2QuizError::AuthError {
                status: status.as_u16(),
                detail: snippet(&text),
            });
        }

        serde_json::from_str(&text).map_err(|_| Pdf2QuizError::NonJsonResponse {
            snippet: snippet(&text),
        })
    }

    fn transport_error(&self, stage: &'static str, e: reqwest::Error) -> Pdf2QuizError {
        if e.is_timeout() {
            Pdf2QuizError::RequestTimeout {
                stage,
                secs: self.config.request_timeout_secs,
            }
        } else {
            Pdf2QuizError::RequestFailed {
                stage,
                reason: e.to_string(),
            }
        }
    }
}

/// First [`SNIPPET_LEN`] characters of `text`.
fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_fail_fast() {
        let config = ConversionConfig::default();
        assert!(matches!(
            MathpixClient::new(&config),
            Err(Pdf2QuizError::MissingCredentials { .. })
        ));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let config = ConversionConfig::builder()
            .credentials("id", "")
            .build()
            .unwrap();
        assert!(matches!(
            MathpixClient::new(&config),
            Err(Pdf2QuizError::MissingCredentials { .. })
        ));
    }

    #[test]
    fn urls_are_built_from_base() {
        let config = ConversionConfig::builder()
            .credentials("id", "key")
            .api_base_url("http://127.0.0.1:9999/")
            .build()
            .unwrap();
        let client = MathpixClient::new(&config).unwrap();
        assert_eq!(client.pdf_url(""), "http://127.0.0.1:9999/v3/pdf");
        assert_eq!(client.pdf_url("/abc.mmd"), "http://127.0.0.1:9999/v3/pdf/abc.mmd");
    }

    #[test]
    fn snippet_is_char_bounded() {
        let long = "é".repeat(1000);
        let s = snippet(&long);
        assert_eq!(s.chars().count(), SNIPPET_LEN);
        assert_eq!(snippet("short"), "short");
    }
}
