//! HTTP analyze proxy (`resonnet serve`).
//!
//! Lets browser front-ends analyze prompts without holding the model API key
//! themselves. The response carries raw issues; locating them in the content
//! is left to the caller, which already has the content.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/analyze` | `{ "content": "..." }` → `{ "result": [RawIssue] }` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": "Rate limit exceeded. Please try again later." }
//! ```
//!
//! Remote 401 and 429 are passed through with their status. Everything else
//! is a 500 with a `details` field.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use resonnet_core::models::RawIssue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::client::{AnalyzeClient, AnalyzeError};
use crate::config::Config;

#[derive(Clone)]
struct AppState {
    client: Arc<dyn AnalyzeClient>,
    min_content_length: usize,
}

/// Bind to `[server].bind` and serve until the process is terminated.
pub async fn run_server(config: &Config, client: Arc<dyn AnalyzeClient>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(client, config.analysis.min_content_length);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "analyze proxy listening");
    println!("Analyze proxy listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the proxy's routes.
pub fn router(client: Arc<dyn AnalyzeClient>, min_content_length: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/analyze", post(handle_analyze))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState {
            client,
            min_content_length,
        })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

struct AppError {
    status: StatusCode,
    body: ErrorBody,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AnalyzeError> for AppError {
    fn from(err: AnalyzeError) -> Self {
        match err.status() {
            Some(401) => AppError {
                status: StatusCode::UNAUTHORIZED,
                body: ErrorBody {
                    error: "Invalid API key".to_string(),
                    details: None,
                },
            },
            Some(429) => AppError {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: ErrorBody {
                    error: "Rate limit exceeded. Please try again later.".to_string(),
                    details: None,
                },
            },
            _ => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: ErrorBody {
                    error: "Internal server error".to_string(),
                    details: Some(err.to_string()),
                },
            },
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /analyze ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    result: Vec<RawIssue>,
}

async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if resonnet_core::trimmed_len(&req.content) < state.min_content_length {
        return Ok(Json(AnalyzeResponse { result: Vec::new() }));
    }

    let result = state.client.analyze(&req.content).await.map_err(|err| {
        warn!(error = %err, "proxied analysis failed");
        AppError::from(err)
    })?;

    Ok(Json(AnalyzeResponse { result }))
}
