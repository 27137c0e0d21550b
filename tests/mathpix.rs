//! Mathpix client and full conversion against a local mock server.
//!
//! No credentials or network access needed: every test starts a `wiremock`
//! server and points `api_base_url` at it.

use edgequake_pdf2quiz::pipeline::input::ResolvedInput;
use edgequake_pdf2quiz::pipeline::mathpix::MathpixClient;
use edgequake_pdf2quiz::{
    convert, convert_with_input, ConversionConfig, ConversionProgressCallback, Pdf2QuizError,
};
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PDF_ID: &str = "2024_06_01_abc123";

const TRANSCRIPT: &str = "\\title{Physics Mock Test}\n\n\
    1. The SI unit of force is\n\
    (a) joule\n\
    (b) newton\n\
    (c) watt\n\
    (d) pascal\n\n\
    2. If $v = u + at$, then $a$ equals\n\
    (a) $\\frac{v-u}{t}$\n\
    (b) $v t$\n\n\
    Answer Key\n\
    1) B 2) A\n";

fn config_for(server: &MockServer) -> ConversionConfig {
    ConversionConfig::builder()
        .credentials("test-id", "test-key")
        .api_base_url(server.uri())
        .max_poll_attempts(5)
        .poll_interval_ms(1)
        .poll_backoff_step_ms(0)
        .build()
        .unwrap()
}

fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n% mock exam\n".to_vec()
}

async fn mount_upload_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v3/pdf"))
        .and(header("app_id", "test-id"))
        .and(header("app_key", "test-key"))
        .and(body_string_contains("options_json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pdf_id": PDF_ID })))
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, status: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v3/pdf/{PDF_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": status })))
        .mount(server)
        .await;
}

async fn mount_transcript(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/v3/pdf/{PDF_ID}.mmd")))
        .respond_with(ResponseTemplate::new(200).set_body_string(TRANSCRIPT))
        .mount(server)
        .await;
}

// ── Upload ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_returns_pdf_id() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;

    let client = MathpixClient::new(&config_for(&server)).unwrap();
    let uploaded = client.upload(pdf_bytes(), "exam.pdf").await.unwrap();

    assert_eq!(uploaded.pdf_id, PDF_ID);
    assert_eq!(uploaded.raw["pdf_id"], PDF_ID);
}

#[tokio::test]
async fn upload_without_pdf_id_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "error": "unsupported file" })),
        )
        .mount(&server)
        .await;

    let client = MathpixClient::new(&config_for(&server)).unwrap();
    match client.upload(pdf_bytes(), "exam.pdf").await {
        Err(Pdf2QuizError::UploadRejected { response }) => {
            assert!(response.contains("unsupported file"), "got: {response}")
        }
        other => panic!("expected UploadRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_response_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/pdf"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let client = MathpixClient::new(&config_for(&server)).unwrap();
    match client.upload(pdf_bytes(), "exam.pdf").await {
        Err(Pdf2QuizError::NonJsonResponse { snippet }) => {
            assert!(snippet.contains("Bad Gateway"))
        }
        other => panic!("expected NonJsonResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/pdf"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "invalid app_key" })))
        .mount(&server)
        .await;

    let client = MathpixClient::new(&config_for(&server)).unwrap();
    let err = client.upload(pdf_bytes(), "exam.pdf").await.unwrap_err();
    assert!(matches!(err, Pdf2QuizError::AuthError { status: 401, .. }));
}

#[tokio::test]
async fn slow_upload_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "pdf_id": PDF_ID }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.request_timeout_secs = 1;
    let client = MathpixClient::new(&config).unwrap();
    let err = client.upload(pdf_bytes(), "exam.pdf").await.unwrap_err();
    assert!(
        matches!(err, Pdf2QuizError::RequestTimeout { stage: "upload", secs: 1 }),
        "got {err:?}"
    );
}

// ── Polling ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn poll_waits_until_completed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/pdf/{PDF_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "split" })))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_status(&server, "completed").await;

    let client = MathpixClient::new(&config_for(&server)).unwrap();
    let outcome = client.poll_status(PDF_ID).await.unwrap();

    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.status["status"], "completed");
}

#[tokio::test]
async fn error_status_is_fatal_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/pdf/{PDF_ID}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "error", "error": "PDF is encrypted" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = MathpixClient::new(&config_for(&server)).unwrap();
    match client.poll_status(PDF_ID).await {
        Err(Pdf2QuizError::ProcessingFailed { pdf_id, detail }) => {
            assert_eq!(pdf_id, PDF_ID);
            assert_eq!(detail, "PDF is encrypted");
        }
        other => panic!("expected ProcessingFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn poll_budget_exhaustion_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/pdf/{PDF_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "processing" })))
        .expect(5)
        .mount(&server)
        .await;

    let client = MathpixClient::new(&config_for(&server)).unwrap();
    let err = client.poll_status(PDF_ID).await.unwrap_err();
    assert!(matches!(
        err,
        Pdf2QuizError::ProcessingTimeout { attempts: 5, .. }
    ));
}

// ── Transcript download ──────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_failure_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v3/pdf/{PDF_ID}.mmd")))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such document"))
        .mount(&server)
        .await;

    let client = MathpixClient::new(&config_for(&server)).unwrap();
    match client.fetch_mmd(PDF_ID).await {
        Err(Pdf2QuizError::TranscriptFetchFailed { status, body, .. }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such document");
        }
        other => panic!("expected TranscriptFetchFailed, got {other:?}"),
    }
}

// ── Full conversion ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Tracker {
    polls: AtomicU32,
    transcript_len: AtomicUsize,
    errors: AtomicUsize,
}

impl ConversionProgressCallback for Tracker {
    fn on_poll(&self, _attempt: u32, _max: u32, _status: &str) {
        self.polls.fetch_add(1, Ordering::SeqCst);
    }
    fn on_transcript_ready(&self, len: usize) {
        self.transcript_len.store(len, Ordering::SeqCst);
    }
    fn on_conversion_error(&self, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn convert_local_file_end_to_end() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    mount_status(&server, "completed").await;
    mount_transcript(&server).await;

    let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    file.write_all(&pdf_bytes()).unwrap();

    let tracker = Arc::new(Tracker::default());
    let mut config = config_for(&server);
    config.progress_callback = Some(tracker.clone());

    let output = convert(file.path().to_str().unwrap(), &config).await.unwrap();

    assert_eq!(output.pdf_id, PDF_ID);
    assert_eq!(output.raw_mmd, TRANSCRIPT);
    assert_eq!(output.questions.len(), 2);

    let q1 = &output.questions[0];
    assert_eq!(q1.stem, "The SI unit of force is");
    assert_eq!(q1.options.len(), 4);
    assert_eq!(q1.answer, Some('b'));

    let q2 = &output.questions[1];
    assert_eq!(q2.stem, "If \\(v = u + at\\), then \\(a\\) equals");
    assert_eq!(q2.option_text('a'), Some("\\(\\frac{v-u}{t}\\)"));
    assert_eq!(q2.answer, Some('a'));

    assert!(output.latex_document.contains("\\section*{Questions}"));
    assert!(output.latex_questions.starts_with("1. The SI unit of force is\na. joule"));
    assert_eq!(output.stats.poll_attempts, 1);
    assert_eq!(output.stats.question_count, 2);
    assert_eq!(output.stats.answered_count, 2);

    assert_eq!(tracker.polls.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.transcript_len.load(Ordering::SeqCst), TRANSCRIPT.len());
    assert_eq!(tracker.errors.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn spooled_upload_is_removed_after_success() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    mount_status(&server, "completed").await;
    mount_transcript(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let resolved = ResolvedInput::spool(&pdf_bytes(), "exam.pdf", Some(dir.path())).unwrap();
    let output = convert_with_input(&resolved, &config_for(&server))
        .await
        .unwrap();
    assert_eq!(output.questions.len(), 2);

    drop(resolved);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn spooled_upload_is_removed_after_failure() {
    let server = MockServer::start().await;
    mount_upload_ok(&server).await;
    mount_status(&server, "error").await;

    let dir = tempfile::tempdir().unwrap();
    let tracker = Arc::new(Tracker::default());
    let mut config = config_for(&server);
    config.progress_callback = Some(tracker.clone());

    let resolved = ResolvedInput::spool(&pdf_bytes(), "exam.pdf", Some(dir.path())).unwrap();
    let result = convert_with_input(&resolved, &config).await;
    assert!(matches!(result, Err(Pdf2QuizError::ProcessingFailed { .. })));
    assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

    drop(resolved);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
