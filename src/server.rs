//! HTTP server: print views and the snapshot read path.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/posts/{slug}/print` | Print view consumed by the snapshot browser |
//! | `GET`  | `/posts/{slug}/snapshot` | Cached artifact, or redirect to on-demand generation |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! The snapshot path is a two-tier arbiter with no retries between tiers:
//! serve the pre-generated artifact when a valid one exists, otherwise
//! redirect (307, method-preserving) to the backend's on-demand endpoint.
//! This server never generates synchronously — it stays stateless and fast,
//! and a reader who arrives before the batch has run is transparently
//! handed to live generation instead of seeing a failure.
//!
//! # Error Contract
//!
//! Error responses use a JSON envelope:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no post with slug: x" } }
//! ```
//!
//! Codes: `bad_request` (400), `not_found` (404), `config_error` (500),
//! `internal` (500), `upstream` (502).

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::backend::{on_demand_snapshot_url, BackendClient};
use crate::config::Config;
use crate::models::is_valid_slug;
use crate::rewrite::{RenderContext, Resolver};
use crate::store::ArtifactStore;
use crate::view::render_print_view;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Arc<ArtifactStore>,
    backend: Arc<BackendClient>,
    /// Built once at startup; absent when no public base is configured, in
    /// which case print views answer with a `config_error`.
    resolver: Option<Arc<Resolver>>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> anyhow::Result<Self> {
        let store = Arc::new(ArtifactStore::new(config.artifacts.dir.clone()));
        let backend = Arc::new(BackendClient::new(&config)?);
        let resolver = config.resolver().ok().map(Arc::new);
        Ok(Self {
            config,
            store,
            backend,
            resolver,
        })
    }
}

/// Builds the router; separated from [`run_server`] so tests can drive the
/// HTTP surface in-process.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/posts/{slug}/print", get(handle_print_view))
        .route("/posts/{slug}/snapshot", get(handle_snapshot))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState::new(Arc::new(config.clone()))?;
    let app = router(state);

    println!("snapshot server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
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

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// The process cannot construct a required address. Fail fast; there is
/// no degraded mode for a missing public base.
fn config_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "config_error".to_string(),
        message: message.into(),
    }
}

fn upstream_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream".to_string(),
        message: message.into(),
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
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

// ============ GET /posts/{slug}/print ============

#[derive(Deserialize)]
struct PrintQuery {
    /// `public` (default) or `internal`. Internal is only useful when the
    /// viewer runs on the same network as the backend.
    context: Option<String>,
}

async fn handle_print_view(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PrintQuery>,
) -> Result<Html<String>, AppError> {
    if !is_valid_slug(&slug) {
        return Err(bad_request(format!("invalid slug: {slug:?}")));
    }

    let context = match query.context.as_deref() {
        None | Some("public") => RenderContext::Public,
        Some("internal") => RenderContext::Internal,
        Some(other) => {
            return Err(bad_request(format!(
                "unknown context: {other:?} (expected public or internal)"
            )))
        }
    };

    // AppState::new leaves the resolver unset only when the public base is
    // missing; report it the same way the generator does.
    let resolver = state.resolver.as_deref().ok_or_else(|| {
        config_error("public base address not configured: set [api].public_base or PUBLIC_API_BASE")
    })?;

    let post = state
        .backend
        .get_post(&slug)
        .await
        .map_err(|e| upstream_error(e.to_string()))?
        .ok_or_else(|| not_found(format!("no post with slug: {slug}")))?;

    Ok(Html(render_print_view(&post, &resolver, context)))
}

// ============ GET /posts/{slug}/snapshot ============

async fn handle_snapshot(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    if !is_valid_slug(&slug) {
        return Err(bad_request(format!("invalid slug: {slug:?}")));
    }

    // Tier 1: a pre-generated artifact with the right content type.
    if let Some(artifact) = state
        .store
        .load(&slug)
        .await
        .map_err(|e| internal_error(e.to_string()))?
    {
        let headers = [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{slug}.pdf\""),
            ),
        ];
        return Ok((headers, artifact.bytes).into_response());
    }

    // Tier 2: hand off to the backend's on-demand generation endpoint.
    let public_base = state
        .config
        .api
        .require_public_base()
        .map_err(|e| config_error(e.to_string()))?;
    let location = on_demand_snapshot_url(public_base, &slug);
    Ok(Redirect::temporary(&location).into_response())
}
