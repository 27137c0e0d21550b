//! Configuration types for PDF-to-questions conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Credentials are plain fields of the
//! config and are handed to [`crate::pipeline::mathpix::MathpixClient`] at
//! construction time; nothing reads process-wide state after that point.
//! [`ConversionConfig::from_env`] is the one place that looks at the
//! environment.

use crate::error::Pdf2QuizError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default Mathpix API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.mathpix.com";

/// Environment variable holding the Mathpix app id.
pub const ENV_APP_ID: &str = "MATHPIX_APP_ID";
/// Environment variable holding the Mathpix app key.
pub const ENV_APP_KEY: &str = "MATHPIX_APP_KEY";
/// Environment variable overriding [`DEFAULT_API_BASE_URL`].
pub const ENV_API_URL: &str = "MATHPIX_API_URL";

/// Configuration for a PDF-to-questions conversion.
///
/// # Example
/// ```rust
/// use edgequake_pdf2quiz::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .credentials("my-app", "my-key")
///     .max_poll_attempts(60)
///     .poll_interval_ms(2000)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Mathpix `app_id` header value.
    pub app_id: Option<String>,

    /// Mathpix `app_key` header value. Redacted in `Debug` output.
    pub app_key: Option<String>,

    /// Base URL of the Mathpix API. Default: `https://api.mathpix.com`.
    ///
    /// Overridable so tests can point the client at a local mock server.
    pub api_base_url: String,

    /// Maximum number of status requests before giving up. Default: 40.
    ///
    /// With the default interval and step this is roughly two minutes of
    /// waiting, enough for a 30–40 page exam paper.
    pub max_poll_attempts: u32,

    /// Base wait between status requests in milliseconds. Default: 1500.
    pub poll_interval_ms: u64,

    /// Extra wait added per attempt (linear growth). Default: 100.
    ///
    /// Attempt `n` waits `poll_interval_ms + n * poll_backoff_step_ms`.
    pub poll_backoff_step_ms: u64,

    /// Per-request timeout for Mathpix calls in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Options sent to Mathpix with the upload.
    pub mathpix_options: MathpixOptions,

    /// Optional progress callback for stage-by-stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            max_poll_attempts: 40,
            poll_interval_ms: 1500,
            poll_backoff_step_ms: 100,
            request_timeout_secs: 60,
            download_timeout_secs: 120,
            mathpix_options: MathpixOptions::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("app_id", &self.app_id)
            .field("app_key", &self.app_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_backoff_step_ms", &self.poll_backoff_step_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("mathpix_options", &self.mathpix_options)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults plus credentials and endpoint read from
    /// `MATHPIX_APP_ID`, `MATHPIX_APP_KEY` and `MATHPIX_API_URL`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        config.app_id = non_empty(ENV_APP_ID);
        config.app_key = non_empty(ENV_APP_KEY);
        if let Some(url) = non_empty(ENV_API_URL) {
            config.api_base_url = url;
        }
        config
    }

    /// Wait before the status request following attempt `attempt` (0-based).
    pub fn poll_delay_ms(&self, attempt: u32) -> u64 {
        self.poll_interval_ms
            .saturating_add(u64::from(attempt).saturating_mul(self.poll_backoff_step_ms))
    }

    /// True when both credentials are present and non-empty.
    pub fn has_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.app_id) && present(&self.app_key)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn credentials(mut self, app_id: impl Into<String>, app_key: impl Into<String>) -> Self {
        self.config.app_id = Some(app_id.into());
        self.config.app_key = Some(app_key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn max_poll_attempts(mut self, n: u32) -> Self {
        self.config.max_poll_attempts = n.max(1);
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn poll_backoff_step_ms(mut self, ms: u64) -> Self {
        self.config.poll_backoff_step_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn mathpix_options(mut self, options: MathpixOptions) -> Self {
        self.config.mathpix_options = options;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Credentials are not required here: offline transcript parsing needs
    /// none. [`crate::pipeline::mathpix::MathpixClient::new`] checks them.
    pub fn build(self) -> Result<ConversionConfig, Pdf2QuizError> {
        let c = &self.config;
        if !c.api_base_url.starts_with("http://") && !c.api_base_url.starts_with("https://") {
            return Err(Pdf2QuizError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        if c.max_poll_attempts == 0 {
            return Err(Pdf2QuizError::InvalidConfig(
                "max_poll_attempts must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Upload options understood by the Mathpix `v3/pdf` endpoint.
///
/// Serialised verbatim into the `options_json` multipart field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathpixOptions {
    pub include_latex: bool,
    pub include_text_data: bool,
    pub formats: Vec<String>,
    pub math_inline_delimiters: [String; 2],
    pub math_display_delimiters: [String; 2],
    pub rm_spaces: bool,
    pub enable_tables_fallback: bool,
}

impl Default for MathpixOptions {
    fn default() -> Self {
        Self {
            include_latex: true,
            include_text_data: true,
            formats: vec!["text".into(), "math".into(), "mmd".into()],
            math_inline_delimiters: ["$".into(), "$".into()],
            math_display_delimiters: ["$$".into(), "$$".into()],
            rm_spaces: true,
            enable_tables_fallback: true,
        }
    }
}
