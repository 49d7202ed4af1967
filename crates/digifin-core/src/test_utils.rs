//! Test utilities for digifin-core
//!
//! A mock model server that speaks enough of the Gemini and OpenAI chat
//! completion APIs for backend and integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

#[derive(Clone)]
struct MockState {
    reply: String,
    fail: bool,
    prompts: Arc<Mutex<Vec<String>>>,
}

/// Mock Gemini / OpenAI-compatible server for testing
pub struct MockModelServer {
    addr: SocketAddr,
    prompts: Arc<Mutex<Vec<String>>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockModelServer {
    /// Start a server that answers every prompt with `reply`
    pub async fn start(reply: &str) -> Self {
        Self::spawn(reply, false).await
    }

    /// Start a server that answers every generation request with a 500
    pub async fn start_failing() -> Self {
        Self::spawn("", true).await
    }

    async fn spawn(reply: &str, fail: bool) -> Self {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            reply: reply.to_string(),
            fail,
            prompts: prompts.clone(),
        };

        let app = Router::new()
            .route(
                "/v1beta/models/:target",
                get(handle_gemini_model).post(handle_gemini_generate),
            )
            .route("/v1/models", get(handle_openai_models))
            .route("/v1/chat/completions", post(handle_openai_chat))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            prompts,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockModelServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Accepts connections and never answers, for exercising client timeouts
pub struct SilentServer {
    addr: SocketAddr,
    task: tokio::task::JoinHandle<()>,
}

impl SilentServer {
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                // Keep the socket open without reading or writing
                open.push(stream);
            }
        });

        Self { addr, task }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for SilentServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn has_gemini_key(headers: &HeaderMap) -> bool {
    headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.is_empty())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"code": 401, "message": "API key not valid"}})),
    )
        .into_response()
}

/// Gemini model metadata (health check)
async fn handle_gemini_model(Path(target): Path<String>, headers: HeaderMap) -> Response {
    if !has_gemini_key(&headers) {
        return unauthorized();
    }
    Json(json!({"name": format!("models/{}", target)})).into_response()
}

/// Gemini `{model}:generateContent`
async fn handle_gemini_generate(
    State(state): State<MockState>,
    Path(target): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !target.ends_with(":generateContent") {
        return StatusCode::NOT_FOUND.into_response();
    }
    if !has_gemini_key(&headers) {
        return unauthorized();
    }

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    state.prompts.lock().unwrap().push(prompt);

    if state.fail {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": {"code": 500, "message": "internal"}})),
        )
            .into_response();
    }

    Json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": state.reply}]},
            "finishReason": "STOP"
        }]
    }))
    .into_response()
}

async fn handle_openai_models() -> Json<Value> {
    Json(json!({"object": "list", "data": [{"id": "test-model", "object": "model"}]}))
}

async fn handle_openai_chat(State(state): State<MockState>, Json(body): Json<Value>) -> Response {
    let prompt = body["messages"][0]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    state.prompts.lock().unwrap().push(prompt);

    if state.fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }

    Json(json!({
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": state.reply},
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}
