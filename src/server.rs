//! Chat HTTP server.
//!
//! Serves a single-page chat UI and the JSON endpoint it talks to. Each
//! `POST /api/chat` is one stateless turn of [`RagPipeline::respond`]; the
//! transcript lives in the browser.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Chat page |
//! | `POST` | `/api/chat` | `{ "message", "history" }` → `{ "answer" }` |
//! | `GET`  | `/health` | Status, version and collection record count |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "message must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400, also used for bodies that are not valid
//! chat JSON), `internal` (500). Pipeline failures are not HTTP errors: they
//! come back as a normal answer carrying the apology text.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, ServerConfig};
use crate::models::ChatTurn;
use crate::rag::RagPipeline;

const CHAT_PAGE: &str = include_str!("chat.html");

#[derive(Clone)]
struct AppState {
    pipeline: RagPipeline,
    page: Arc<String>,
}

/// Starts the chat server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config, pipeline: RagPipeline) -> anyhow::Result<()> {
    let count = pipeline.collection().count().await?;
    tracing::info!(
        collection = pipeline.collection().name(),
        records = count,
        "collection loaded"
    );
    println!(
        "Collection '{}' loaded with {} documents.",
        pipeline.collection().name(),
        count
    );

    let bind_addr = config.server.bind.clone();
    let app = build_router(config, pipeline);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Chat server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router with all routes and layers, ready to serve.
pub fn build_router(config: &Config, pipeline: RagPipeline) -> Router {
    let state = AppState {
        pipeline,
        page: Arc::new(render_page(&config.server)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_page))
        .route("/api/chat", post(handle_chat))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn render_page(server: &ServerConfig) -> String {
    // `</` would close the script element the examples are embedded in.
    let examples = serde_json::to_string(&server.examples)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/");

    CHAT_PAGE
        .replace("{{TITLE}}", &escape_html(&server.title))
        .replace("{{DESCRIPTION}}", &escape_html(&server.description))
        .replace("{{EXAMPLES_JSON}}", &examples)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET / ============

async fn handle_page(State(state): State<AppState>) -> Html<String> {
    Html(state.page.as_ref().clone())
}

// ============ POST /api/chat ============

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
    /// Transcript held by the page. Accepted and not consulted.
    #[serde(default)]
    history: Vec<ChatTurn>,
}

#[derive(Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    if req.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }

    let answer = state.pipeline.respond(&req.message, &req.history).await;
    Ok(Json(ChatResponse { answer }))
}

// ============ GET /health ============

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub collection: String,
    pub records: usize,
}

async fn handle_health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let collection = state.pipeline.collection();
    let records = collection
        .count()
        .await
        .map_err(|e| internal(format!("failed to count records: {}", e)))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        collection: collection.name().to_string(),
        records,
    }))
}
