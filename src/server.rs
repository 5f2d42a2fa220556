//! HTTP API for research queries and spreadsheet export.
//!
//! ## Endpoints
//!
//! - `GET /health`: liveness probe
//! - `POST /api/research?daily_only=bool`: research one query
//! - `POST /api/research/multi?daily_only=bool`: research several queries
//! - `GET /api/research/{slug}/excel?daily_only=bool`: cached result as `.xlsx`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ResearchError, Result};
use crate::export::{Workbook, XLSX_CONTENT_TYPE, filename};
use crate::research::ResearchService;
use crate::schema::{MultiResearchRequest, ResearchParams, ResearchRequest, ResearchResponse};

const NOT_CACHED: &str =
    "Research result not found or expired. Run search first (check daily_only flag).";

#[derive(Clone)]
struct AppState {
    service: Arc<ResearchService>,
    production: bool,
}

/// Build the API router with CORS and request tracing.
pub fn router(service: Arc<ResearchService>, config: &ServerConfig) -> Router {
    let state = AppState {
        service,
        production: config.production,
    };
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/research", post(handle_research))
        .route("/api/research/multi", post(handle_research_multi))
        .route("/api/research/{slug}/excel", get(handle_export))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.allowed_origins))
}

/// CORS for the configured origins, with credentials. No origins allows any
/// origin without credentials.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        if !allowed_origins.is_empty() {
            tracing::warn!("ALLOWED_ORIGINS contains no valid origins, allowing any");
        }
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!(count = origins.len(), "CORS restricted to configured origins");
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// The research API server.
pub struct ResearchServer {
    /// The address the server is listening on.
    addr: SocketAddr,
    /// Handle to the background server task.
    handle: JoinHandle<()>,
}

impl ResearchServer {
    /// Start the server.
    ///
    /// Binds to `{config.host}:{config.port}` (use port `0` for auto-assign)
    /// and begins serving in a background tokio task.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(service: Arc<ResearchService>, config: &ServerConfig) -> Result<Self> {
        let app = router(service, config);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        let addr = listener.local_addr()?;

        info!("research API listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("research API server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for ResearchServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn handle_research(
    State(state): State<AppState>,
    Query(params): Query<ResearchParams>,
    Json(body): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>> {
    let response = state
        .service
        .research(&body.query, params.daily_only)
        .await?;
    Ok(Json(response))
}

async fn handle_research_multi(
    State(state): State<AppState>,
    Query(params): Query<ResearchParams>,
    Json(body): Json<MultiResearchRequest>,
) -> Result<Json<ResearchResponse>> {
    let response = state
        .service
        .research_multi(&body.queries, body.max_results, params.daily_only)
        .await?;
    Ok(Json(response))
}

async fn handle_export(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<ResearchParams>,
) -> Result<Response> {
    let cached = state
        .service
        .cached(&slug, params.daily_only)
        .ok_or_else(|| ResearchError::NotFound(NOT_CACHED.into()))?;

    let bytes = Workbook::from_results(&cached.results)
        .to_xlsx()
        .map_err(|e| public_error(e, state.production))?;

    let disposition = format!("attachment; filename=\"{}\"", filename(&slug));
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// In production, internal errors reach clients without detail.
fn public_error(err: ResearchError, production: bool) -> ResearchError {
    if production && err.status().is_server_error() {
        tracing::error!(error = %err, "internal error");
        ResearchError::Export("spreadsheet export failed".into())
    } else {
        err
    }
}
