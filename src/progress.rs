//! Progress-callback trait for conversion stage events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as a document moves through upload, processing and transcript
//! download.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a broadcast channel, an HTTP log or a terminal spinner
//! without the library knowing anything about how the host application
//! communicates. Mathpix processing can take minutes; the poll event is what
//! keeps a user from assuming the tool has hung.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2quiz::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicU32, Ordering}};
//!
//! struct PollCounter {
//!     polls: AtomicU32,
//! }
//!
//! impl ConversionProgressCallback for PollCounter {
//!     fn on_poll(&self, attempt: u32, max_attempts: u32, status: &str) {
//!         self.polls.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("check {}/{}: {}", attempt, max_attempts, status);
//!     }
//! }
//!
//! let counter = Arc::new(PollCounter { polls: AtomicU32::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as each stage finishes.
///
/// Implementations must be `Send + Sync`: the HTTP server runs conversions on
/// the multi-threaded runtime. All methods have default no-op implementations
/// so callers only override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the PDF is uploaded.
    ///
    /// # Arguments
    /// * `input` — the path, URL or upload name being converted
    fn on_conversion_start(&self, input: &str) {
        let _ = input;
    }

    /// Called when Mathpix has accepted the upload.
    fn on_uploaded(&self, pdf_id: &str) {
        let _ = pdf_id;
    }

    /// Called after every status request.
    ///
    /// # Arguments
    /// * `attempt`      — 1-indexed status request number
    /// * `max_attempts` — configured polling budget
    /// * `status`       — status string reported by Mathpix (`"split"`, `"completed"`, …)
    fn on_poll(&self, attempt: u32, max_attempts: u32, status: &str) {
        let _ = (attempt, max_attempts, status);
    }

    /// Called when the `.mmd` transcript has been downloaded.
    ///
    /// # Arguments
    /// * `transcript_len` — byte length of the raw transcript
    fn on_transcript_ready(&self, transcript_len: usize) {
        let _ = transcript_len;
    }

    /// Called once after segmentation.
    ///
    /// # Arguments
    /// * `question_count` — questions recovered from the transcript
    /// * `answered_count` — questions that received an answer-key entry
    fn on_conversion_complete(&self, question_count: usize, answered_count: usize) {
        let _ = (question_count, answered_count);
    }

    /// Called when the conversion fails at any stage.
    fn on_conversion_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        polls: AtomicU32,
        last_status: Mutex<String>,
        transcript_len: AtomicUsize,
        answered: AtomicUsize,
        errors: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_poll(&self, _attempt: u32, _max_attempts: u32, status: &str) {
            self.polls.fetch_add(1, Ordering::SeqCst);
            *self.last_status.lock().unwrap() = status.to_string();
        }

        fn on_transcript_ready(&self, transcript_len: usize) {
            self.transcript_len.store(transcript_len, Ordering::SeqCst);
        }

        fn on_conversion_complete(&self, _question_count: usize, answered_count: usize) {
            self.answered.store(answered_count, Ordering::SeqCst);
        }

        fn on_conversion_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start("exam.pdf");
        cb.on_uploaded("2024_01_01_abc");
        cb.on_poll(1, 40, "split");
        cb.on_transcript_ready(1024);
        cb.on_conversion_complete(30, 28);
        cb.on_conversion_error("some error");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_poll(1, 40, "split");
        tracker.on_poll(2, 40, "completed");
        assert_eq!(tracker.polls.load(Ordering::SeqCst), 2);
        assert_eq!(*tracker.last_status.lock().unwrap(), "completed");

        tracker.on_transcript_ready(2048);
        assert_eq!(tracker.transcript_len.load(Ordering::SeqCst), 2048);

        tracker.on_conversion_complete(10, 7);
        assert_eq!(tracker.answered.load(Ordering::SeqCst), 7);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ConversionProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_conversion_start("https://example.com/paper.pdf");
        cb.on_poll(3, 40, "processing");
    }
}
