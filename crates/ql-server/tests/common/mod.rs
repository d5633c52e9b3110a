#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;

use ql_server::bootstrap;
use ql_server::config::{
    AppConfig, BackendConfig, BackendSpecConfig, LedgerConfig, RefinementConfig, SelectionConfig,
};
use ql_server::handler::{router, AppState};
use ql_server::server;

// ---------------------------------------------------------------------------
// MockLlmServer — an OpenAI-compatible backend that writes and reviews
// ---------------------------------------------------------------------------

struct MockConfig {
    review_reply: String,
    status_code: u16,
    writes: AtomicUsize,
    reviews: AtomicUsize,
}

pub struct MockLlmServer {
    addr: SocketAddr,
    config: Arc<MockConfig>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockLlmServer {
    /// Backend whose reviewer answers with `review_reply` verbatim.
    pub async fn start(review_reply: &str) -> Self {
        Self::start_with_status(review_reply, 200).await
    }

    pub async fn start_with_status(review_reply: &str, status: u16) -> Self {
        let config = Arc::new(MockConfig {
            review_reply: review_reply.to_owned(),
            status_code: status,
            writes: AtomicUsize::new(0),
            reviews: AtomicUsize::new(0),
        });

        let app = axum::Router::new()
            .route("/v1/chat/completions", post(mock_completion_handler))
            .with_state(Arc::clone(&config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            config,
            _handle: handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn writes(&self) -> usize {
        self.config.writes.load(Ordering::SeqCst)
    }

    pub fn reviews(&self) -> usize {
        self.config.reviews.load(Ordering::SeqCst)
    }
}

impl Drop for MockLlmServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

async fn mock_completion_handler(State(config): State<Arc<MockConfig>>, body: Bytes) -> Response {
    let status =
        StatusCode::from_u16(config.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if !status.is_success() {
        return (status, "backend unavailable").into_response();
    }

    let request: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
    let system = request["messages"][0]["content"].as_str().unwrap_or_default();

    let text = if system.contains("reviewer") {
        config.reviews.fetch_add(1, Ordering::SeqCst);
        config.review_reply.clone()
    } else {
        let n = config.writes.fetch_add(1, Ordering::SeqCst) + 1;
        format!("Refined draft {n}")
    };

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        completion_body(&text),
    )
        .into_response()
}

fn completion_body(text: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "model": TEST_MODEL,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

// ---------------------------------------------------------------------------
// TestServer — the real quill API against a mock backend
// ---------------------------------------------------------------------------

pub struct TestServer {
    pub addr: SocketAddr,
    pub data_dir: tempfile::TempDir,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start(mock_url: &str) -> Self {
        Self::start_with(mock_url, |_| {}).await
    }

    /// Starts a server after letting the caller adjust the configuration.
    pub async fn start_with(mock_url: &str, adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let data_dir = tempfile::tempdir().expect("create ledger dir");

        let mut config = AppConfig {
            refinement: RefinementConfig {
                max_iterations: 3,
                max_iterations_limit: 5,
                quality_threshold: 8.0,
                default_style: "engaging".to_owned(),
                use_learned_defaults: true,
            },
            selection: SelectionConfig {
                exploration_rate: 0.0,
                variants: 3,
                max_variants: 10,
            },
            ledger: LedgerConfig {
                data_dir: data_dir.path().to_path_buf(),
            },
            generator: mock_backend("writer", mock_url),
            reviewer: mock_backend("critic", mock_url),
            ..AppConfig::default()
        };
        adjust(&mut config);

        let runtime = bootstrap::into_runtime(config).expect("valid test config");
        let service = server::build_service(&runtime).expect("build service");
        let app = router(Arc::new(AppState { service }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            data_dir,
            _handle: handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

fn mock_backend(id: &str, url: &str) -> BackendConfig {
    BackendConfig {
        id: id.to_owned(),
        base_url: url.to_owned(),
        api_key: Some("test-key".to_owned()),
        spec: BackendSpecConfig::OpenaiChat,
        model: TEST_MODEL.to_owned(),
        temperature: 0.7,
        max_tokens: None,
        timeout_ms: 5_000,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const TEST_MODEL: &str = "mock-model";

pub fn review_json(quality: f64, ready: bool) -> String {
    serde_json::json!({
        "quality_score": quality,
        "clarity_score": 8,
        "engagement_score": 7,
        "accuracy_score": 9,
        "improvements_needed": ["tighten the opening"],
        "ready_for_human": ready,
        "overall_feedback": "Solid draft."
    })
    .to_string()
}

pub async fn post_json(
    client: &reqwest::Client,
    url: String,
    body: serde_json::Value,
) -> reqwest::Response {
    client
        .post(url)
        .json(&body)
        .send()
        .await
        .expect("request should succeed")
}
