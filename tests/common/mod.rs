//! Local stand-ins for the hosted services, served by axum on 127.0.0.1.
//!
//! One router answers the Azure OpenAI embedding and chat routes and the
//! Azure AI Search document routes, recording every request it sees.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const INDEX_NAME: &str = "handbook";
pub const EMBED_DEPLOYMENT: &str = "embed";
pub const CHAT_DEPLOYMENT: &str = "chat";
pub const API_KEY: &str = "test-key";
pub const REPLY: &str = "有給は年10日です。";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub route: &'static str,
    pub api_key: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
pub struct StubState {
    pub requests: Mutex<Vec<Recorded>>,
    /// Documents received through `docs/index`, in arrival order.
    pub documents: Mutex<Vec<Value>>,
    /// Status returned by every route when set.
    pub fail_with: Mutex<Option<u16>>,
}

impl StubState {
    pub fn requests(&self, route: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.route == route)
            .cloned()
            .collect()
    }

    pub fn fail_with(&self, status: u16) {
        *self.fail_with.lock().unwrap() = Some(status);
    }

    fn record(&self, route: &'static str, headers: &HeaderMap, body: &Value) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.requests.lock().unwrap().push(Recorded {
            route,
            api_key: header("api-key"),
            authorization: header("authorization"),
            body: body.clone(),
        });
    }

    fn failure(&self) -> Option<(StatusCode, Json<Value>)> {
        let status = (*self.fail_with.lock().unwrap())?;
        Some((
            StatusCode::from_u16(status).unwrap(),
            Json(json!({"error": {"message": "stub failure"}})),
        ))
    }
}

pub struct Stub {
    pub base_url: String,
    pub state: Arc<StubState>,
}

/// Deterministic embedding: character count, then a constant.
pub fn fake_vector(text: &str) -> Vec<f32> {
    vec![text.chars().count() as f32, 1.0]
}

type Reply = (StatusCode, Json<Value>);

async fn embeddings(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.record("embeddings", &headers, &body);
    if let Some(failure) = state.failure() {
        return failure;
    }
    let input = body["input"].as_str().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": fake_vector(input)}]
        })),
    )
}

async fn chat_completions(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.record("chat", &headers, &body);
    if let Some(failure) = state.failure() {
        return failure;
    }
    (
        StatusCode::OK,
        Json(json!({
            "choices": [{
                "index": 0,
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": REPLY}
            }]
        })),
    )
}

async fn docs_index(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.record("docs/index", &headers, &body);
    if let Some(failure) = state.failure() {
        return failure;
    }
    let docs = body["value"].as_array().cloned().unwrap_or_default();
    let results: Vec<Value> = docs
        .iter()
        .map(|d| json!({"key": d["id"], "status": true, "statusCode": 200}))
        .collect();
    state.documents.lock().unwrap().extend(docs);
    (StatusCode::OK, Json(json!({ "value": results })))
}

async fn docs_search(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.record("docs/search", &headers, &body);
    if let Some(failure) = state.failure() {
        return failure;
    }
    let top = body["top"].as_u64().unwrap_or(50) as usize;
    let hits: Vec<Value> = state
        .documents
        .lock()
        .unwrap()
        .iter()
        .take(top)
        .enumerate()
        .map(|(rank, d)| {
            json!({
                "@search.score": 1.0 / (rank as f64 + 1.0),
                "id": d["id"],
                "content": d["content"]
            })
        })
        .collect();
    (StatusCode::OK, Json(json!({ "value": hits })))
}

async fn create_index(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.record("index", &headers, &body);
    if let Some(failure) = state.failure() {
        return failure;
    }
    (StatusCode::CREATED, Json(body))
}

/// Start the stub on an ephemeral port. It lives until the runtime stops.
pub async fn start() -> Stub {
    let state = Arc::new(StubState::default());
    let app = Router::new()
        .route(
            &format!("/openai/deployments/{}/embeddings", EMBED_DEPLOYMENT),
            post(embeddings),
        )
        .route("/v1/embeddings", post(embeddings))
        .route(
            &format!("/openai/deployments/{}/chat/completions", CHAT_DEPLOYMENT),
            post(chat_completions),
        )
        .route("/v1/chat/completions", post(chat_completions))
        .route(&format!("/indexes/{}", INDEX_NAME), put(create_index))
        .route(
            &format!("/indexes/{}/docs/index", INDEX_NAME),
            post(docs_index),
        )
        .route(
            &format!("/indexes/{}/docs/search", INDEX_NAME),
            post(docs_search),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Stub {
        base_url: format!("http://{}", addr),
        state,
    }
}

/// Config file text pointing both services at `base_url` with inline keys.
pub fn config_toml(base_url: &str) -> String {
    format!(
        r#"[search]
endpoint = "{base}"
index_name = "{index}"
api_key = "{key}"
top_k = 5

[openai]
provider = "azure"
endpoint = "{base}"
api_key = "{key}"
embedding_deployment = "{embed}"
chat_deployment = "{chat}"
timeout_secs = 10

[chunking]
max_chars = 30
overlap_chars = 5
"#,
        base = base_url,
        index = INDEX_NAME,
        key = API_KEY,
        embed = EMBED_DEPLOYMENT,
        chat = CHAT_DEPLOYMENT,
    )
}
