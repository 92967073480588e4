//! End-to-end tests for the question answering pipeline.
//!
//! These tests run the real pipeline against PDFs generated on the fly,
//! using the deterministic hash embedding provider and an in-process HTTP
//! server standing in for the Ollama backend. No network access and no
//! model downloads are required.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use docqa::config::Config;
use docqa::embedding::create_provider;
use docqa::fingerprint::fingerprint_files;
use docqa::generate::{
    Generator, BACKEND_DOWN_MESSAGE, BACKEND_TIMEOUT_MESSAGE, EMPTY_RESPONSE_MESSAGE,
};
use docqa::pipeline::{RagPipeline, NO_DOCUMENTS_MESSAGE};
use docqa::prompt::AnswerStyle;
use docqa::store::VectorStore;

// ─── PDF fixture ────────────────────────────────────────────────────

fn pdf_escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Minimal valid PDF with one line of Helvetica text per page.
///
/// Builds the body first, then an xref table with correct byte offsets,
/// so `pdf-extract` can parse it. Content stream lengths are computed
/// from the actual bytes.
fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut offsets = Vec::new();

    out.extend_from_slice(b"%PDF-1.4\n");

    let kids = (0..pages.len())
        .map(|i| format!("{} 0 R", 4 + 2 * i))
        .collect::<Vec<_>>()
        .join(" ");

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
            kids,
            pages.len()
        )
        .as_bytes(),
    );
    offsets.push(out.len());
    out.extend_from_slice(
        b"3 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );

    for (i, text) in pages.iter().enumerate() {
        let page_obj = 4 + 2 * i;
        let content_obj = page_obj + 1;
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >> endobj\n",
                page_obj, content_obj
            )
            .as_bytes(),
        );
        let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", pdf_escape(text));
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                content_obj,
                stream.len(),
                stream
            )
            .as_bytes(),
        );
    }

    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer << /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            offsets.len() + 1,
            xref_start
        )
        .as_bytes(),
    );
    out
}

// ─── Backend stub ───────────────────────────────────────────────────

#[derive(Clone)]
enum BackendReply {
    Text(String),
    Blank,
    Status(u16),
    DelaySecs(u64),
}

#[derive(Clone)]
struct BackendState {
    requests: Arc<Mutex<Vec<Value>>>,
    reply: BackendReply,
}

async fn generate_handler(State(state): State<BackendState>, Json(body): Json<Value>) -> Response {
    state.requests.lock().unwrap().push(body);
    match state.reply {
        BackendReply::Text(ref text) => Json(json!({ "response": text })).into_response(),
        BackendReply::Blank => Json(json!({ "response": "   " })).into_response(),
        BackendReply::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
        BackendReply::DelaySecs(secs) => {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            Json(json!({ "response": "too late" })).into_response()
        }
    }
}

/// Serve a fake `/api/generate` endpoint on an ephemeral port, recording
/// every request body it receives.
async fn spawn_backend(reply: BackendReply) -> (String, Arc<Mutex<Vec<Value>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = BackendState {
        requests: requests.clone(),
        reply,
    };
    let app = Router::new()
        .route("/api/generate", post(generate_handler))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/api/generate", addr), requests)
}

/// URL of a port nothing is listening on.
fn unreachable_backend() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/generate", addr)
}

// ─── Config helper ──────────────────────────────────────────────────

fn test_config(tmp: &TempDir, backend_url: &str) -> Config {
    let content = format!(
        r#"
[chunking]
chunk_size = 300
chunk_overlap = 30

[retrieval]
top_k = 2
context_chunk_count = 1

[embedding]
provider = "hash"

[generation]
url = "{}"
model = "test-model"
timeout_secs = 1

[storage]
cache_dir = "{}"
history_path = "{}"
"#,
        backend_url,
        tmp.path().join("cache").display(),
        tmp.path().join("history.json").display()
    );
    toml::from_str(&content).unwrap()
}

fn two_page_pdf(tmp: &TempDir) -> std::path::PathBuf {
    let path = tmp.path().join("doc.pdf");
    fs::write(
        &path,
        minimal_pdf(&[
            "The capital of France is Paris. The Seine flows through the city.",
            "Bananas are rich in potassium and grow in warm climates.",
        ]),
    )
    .unwrap();
    path
}

// ─── Tests ──────────────────────────────────────────────────────────

/// Prove that a question retrieves the matching page and the answer comes
/// back with every retrieved source, best match first.
#[tokio::test]
async fn answer_cites_the_matching_page_first() {
    let tmp = TempDir::new().unwrap();
    let (url, _requests) =
        spawn_backend(BackendReply::Text("Paris is the capital.".to_string())).await;
    let pdf = two_page_pdf(&tmp);

    let pipeline = RagPipeline::new(test_config(&tmp, &url)).unwrap();
    let result = pipeline
        .answer(
            &[pdf.clone()],
            "What is the capital of France?",
            AnswerStyle::ShortAndConcise,
        )
        .await
        .unwrap();

    assert_eq!(result.answer, "Paris is the capital.");
    assert_eq!(result.sources.len(), 2, "top_k = 2 over two chunks");
    assert_eq!(result.sources[0].page, 1, "France page must rank first");
    assert!(result.sources[0].path.ends_with("doc.pdf"));
}

/// Prove that only the best chunk feeds the prompt while every retrieved
/// chunk is still reported as a source, and that the request carries the
/// full backend protocol fields.
#[tokio::test]
async fn prompt_context_is_narrower_than_sources() {
    let tmp = TempDir::new().unwrap();
    let (url, requests) = spawn_backend(BackendReply::Text("ok".to_string())).await;
    let pdf = two_page_pdf(&tmp);

    let pipeline = RagPipeline::new(test_config(&tmp, &url)).unwrap();
    let result = pipeline
        .answer(
            &[pdf],
            "What is the capital of France?",
            AnswerStyle::DetailedExplanation,
        )
        .await
        .unwrap();
    assert_eq!(result.sources.len(), 2);

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let body = &requests[0];
    let prompt = body["prompt"].as_str().unwrap();

    assert!(prompt.contains("capital of France"));
    assert!(
        !prompt.contains("Bananas"),
        "second-ranked chunk must not reach the prompt: {}",
        prompt
    );
    assert!(prompt.contains("User Question:"));
    assert!(prompt.contains("Answer style: Detailed explanation"));

    assert_eq!(body["model"], "test-model");
    assert_eq!(body["stream"], false);
    assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-9);
    assert_eq!(body["max_output_tokens"], 200);
}

/// Prove that a second pipeline over unchanged bytes reuses the persisted
/// index entry instead of creating another one.
#[tokio::test]
async fn unchanged_files_reuse_the_cache_entry() {
    let tmp = TempDir::new().unwrap();
    let (url, _requests) = spawn_backend(BackendReply::Text("ok".to_string())).await;
    let pdf = two_page_pdf(&tmp);

    let first = RagPipeline::new(test_config(&tmp, &url)).unwrap();
    first
        .answer(&[pdf.clone()], "capital of France", AnswerStyle::ShortAndConcise)
        .await
        .unwrap();

    let second = RagPipeline::new(test_config(&tmp, &url)).unwrap();
    let result = second
        .answer(&[pdf], "capital of France", AnswerStyle::ShortAndConcise)
        .await
        .unwrap();
    assert_eq!(result.answer, "ok");

    let entries: Vec<_> = fs::read_dir(tmp.path().join("cache"))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(entries.len(), 1, "one fingerprint, one entry");
    assert!(entries[0].path().join("meta.json").is_file());
    assert!(entries[0].path().join("vectors.bin").is_file());
}

/// Prove that empty retrieval short-circuits to the fixed answer without
/// ever contacting the generation backend.
#[tokio::test]
async fn empty_retrieval_never_contacts_the_backend() {
    let tmp = TempDir::new().unwrap();
    let (url, requests) = spawn_backend(BackendReply::Text("never".to_string())).await;
    let pdf = two_page_pdf(&tmp);

    // Seed an empty index entry under the files' fingerprint.
    let fingerprint = fingerprint_files(&[pdf.clone()]).unwrap();
    let entry_dir = tmp.path().join("cache").join(&fingerprint);
    fs::create_dir_all(&entry_dir).unwrap();
    fs::write(entry_dir.join("vectors.bin"), b"").unwrap();
    fs::write(
        entry_dir.join("meta.json"),
        json!({ "model": "hash", "dims": 384, "chunks": [] }).to_string(),
    )
    .unwrap();

    let pipeline = RagPipeline::new(test_config(&tmp, &url)).unwrap();
    let result = pipeline
        .answer(&[pdf], "What is the capital of France?", AnswerStyle::ShortAndConcise)
        .await
        .unwrap();

    assert_eq!(result.answer, NO_DOCUMENTS_MESSAGE);
    assert!(result.sources.is_empty());
    assert_eq!(requests.lock().unwrap().len(), 0, "backend must stay idle");
}

// ─── Generator seam ─────────────────────────────────────────────────

struct CountingGenerator {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Generator for CountingGenerator {
    async fn generate(&self, _prompt: &str) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        "counted".to_string()
    }
}

fn counting_pipeline(config: &Config, calls: &Arc<AtomicUsize>) -> RagPipeline {
    let provider = create_provider(&config.embedding).unwrap();
    let store = VectorStore::new(config.storage.cache_dir.clone(), provider);
    RagPipeline::with_backend(
        config.clone(),
        store,
        Box::new(CountingGenerator {
            calls: calls.clone(),
        }),
    )
}

/// Prove at the trait seam that empty retrieval skips the generator
/// entirely, while a normal question invokes it exactly once.
#[tokio::test]
async fn generator_runs_only_when_retrieval_finds_chunks() {
    let tmp = TempDir::new().unwrap();
    let pdf = two_page_pdf(&tmp);
    let config = test_config(&tmp, "http://127.0.0.1:1/api/generate");
    let calls = Arc::new(AtomicUsize::new(0));

    // Seed an empty index entry so retrieval has nothing to return.
    let fingerprint = fingerprint_files(&[pdf.clone()]).unwrap();
    let entry_dir = tmp.path().join("cache").join(&fingerprint);
    fs::create_dir_all(&entry_dir).unwrap();
    fs::write(entry_dir.join("vectors.bin"), b"").unwrap();
    fs::write(
        entry_dir.join("meta.json"),
        json!({ "model": "hash", "dims": 384, "chunks": [] }).to_string(),
    )
    .unwrap();

    let result = counting_pipeline(&config, &calls)
        .answer(&[pdf.clone()], "anything", AnswerStyle::ShortAndConcise)
        .await
        .unwrap();
    assert_eq!(result.answer, NO_DOCUMENTS_MESSAGE);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Drop the seeded entry; the next question builds a real index.
    fs::remove_dir_all(&entry_dir).unwrap();
    let result = counting_pipeline(&config, &calls)
        .answer(
            &[pdf],
            "What is the capital of France?",
            AnswerStyle::ShortAndConcise,
        )
        .await
        .unwrap();
    assert_eq!(result.answer, "counted");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Prove the context budget caps what reaches the prompt.
#[tokio::test]
async fn context_is_capped_by_the_context_budget() {
    let tmp = TempDir::new().unwrap();
    let (url, requests) = spawn_backend(BackendReply::Text("ok".to_string())).await;
    let pdf = two_page_pdf(&tmp);

    let mut config = test_config(&tmp, &url);
    config.retrieval.context_budget = 15;

    let pipeline = RagPipeline::new(config).unwrap();
    pipeline
        .answer(&[pdf], "What is the capital of France?", AnswerStyle::ShortAndConcise)
        .await
        .unwrap();

    let requests = requests.lock().unwrap();
    let prompt = requests[0]["prompt"].as_str().unwrap();
    assert!(
        !prompt.contains("Paris"),
        "context past the budget must be cut: {}",
        prompt
    );
    assert!(prompt.contains("Context (from the uploaded document):"));
}

/// Prove the request budget caps the rendered prompt itself.
#[tokio::test]
async fn prompt_is_capped_by_the_request_budget() {
    let tmp = TempDir::new().unwrap();
    let (url, requests) = spawn_backend(BackendReply::Text("ok".to_string())).await;
    let pdf = two_page_pdf(&tmp);

    let mut config = test_config(&tmp, &url);
    config.retrieval.request_budget = 150;

    let pipeline = RagPipeline::new(config).unwrap();
    pipeline
        .answer(&[pdf], "What is the capital of France?", AnswerStyle::ShortAndConcise)
        .await
        .unwrap();

    let requests = requests.lock().unwrap();
    let prompt = requests[0]["prompt"].as_str().unwrap();
    assert_eq!(prompt.chars().count(), 150);
}

// ─── Backend failure mapping ────────────────────────────────────────

/// A slow backend turns into the fixed timeout answer, not an error.
#[tokio::test]
async fn backend_timeout_becomes_answer_text() {
    let tmp = TempDir::new().unwrap();
    let (url, _requests) = spawn_backend(BackendReply::DelaySecs(3)).await;
    let pdf = two_page_pdf(&tmp);

    let pipeline = RagPipeline::new(test_config(&tmp, &url)).unwrap();
    let result = pipeline
        .answer(&[pdf], "What is the capital of France?", AnswerStyle::ShortAndConcise)
        .await
        .unwrap();

    assert_eq!(result.answer, BACKEND_TIMEOUT_MESSAGE);
    assert_eq!(result.sources.len(), 2, "sources survive backend failure");
}

/// An unreachable backend turns into the fixed down answer.
#[tokio::test]
async fn backend_down_becomes_answer_text() {
    let tmp = TempDir::new().unwrap();
    let pdf = two_page_pdf(&tmp);

    let pipeline = RagPipeline::new(test_config(&tmp, &unreachable_backend())).unwrap();
    let result = pipeline
        .answer(&[pdf], "What is the capital of France?", AnswerStyle::ShortAndConcise)
        .await
        .unwrap();

    assert_eq!(result.answer, BACKEND_DOWN_MESSAGE);
}

/// A non-200 status turns into the fixed status answer.
#[tokio::test]
async fn backend_error_status_becomes_answer_text() {
    let tmp = TempDir::new().unwrap();
    let (url, _requests) = spawn_backend(BackendReply::Status(500)).await;
    let pdf = two_page_pdf(&tmp);

    let pipeline = RagPipeline::new(test_config(&tmp, &url)).unwrap();
    let result = pipeline
        .answer(&[pdf], "What is the capital of France?", AnswerStyle::ShortAndConcise)
        .await
        .unwrap();

    assert_eq!(result.answer, "Error: the model backend returned status 500.");
}

/// A blank backend reply turns into the fixed fallback answer.
#[tokio::test]
async fn blank_backend_reply_becomes_fallback_text() {
    let tmp = TempDir::new().unwrap();
    let (url, _requests) = spawn_backend(BackendReply::Blank).await;
    let pdf = two_page_pdf(&tmp);

    let pipeline = RagPipeline::new(test_config(&tmp, &url)).unwrap();
    let result = pipeline
        .answer(&[pdf], "What is the capital of France?", AnswerStyle::ShortAndConcise)
        .await
        .unwrap();

    assert_eq!(result.answer, EMPTY_RESPONSE_MESSAGE);
}

// ─── Ingest failures ────────────────────────────────────────────────

/// A corrupt PDF aborts the whole operation before any network traffic.
#[tokio::test]
async fn corrupt_pdf_aborts_the_question() {
    let tmp = TempDir::new().unwrap();
    let (url, requests) = spawn_backend(BackendReply::Text("never".to_string())).await;
    let bad = tmp.path().join("bad.pdf");
    fs::write(&bad, b"not a pdf").unwrap();

    let pipeline = RagPipeline::new(test_config(&tmp, &url)).unwrap();
    let err = pipeline
        .answer(&[bad], "anything", AnswerStyle::ShortAndConcise)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("bad.pdf"));
    assert_eq!(requests.lock().unwrap().len(), 0);
    assert!(
        !tmp.path().join("cache").exists(),
        "failed ingest must not create cache entries"
    );
}

/// Building an index up front warms the cache a later question reuses.
#[tokio::test]
async fn build_index_warms_the_cache() {
    let tmp = TempDir::new().unwrap();
    let (url, _requests) = spawn_backend(BackendReply::Text("ok".to_string())).await;
    let pdf = two_page_pdf(&tmp);

    let pipeline = RagPipeline::new(test_config(&tmp, &url)).unwrap();
    let (fingerprint, chunk_count) = pipeline.build_index(&[pdf.clone()]).await.unwrap();

    assert_eq!(chunk_count, 2, "one chunk per page at this chunk size");
    let entry_dir = tmp.path().join("cache").join(&fingerprint);
    assert!(entry_dir.join("meta.json").is_file());

    let result = pipeline
        .answer(&[pdf], "What is the capital of France?", AnswerStyle::ShortAndConcise)
        .await
        .unwrap();
    assert_eq!(result.answer, "ok");
}
