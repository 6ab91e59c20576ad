//! HTTP API over the index.
//!
//! Read endpoints expose the persisted records (connection status,
//! modules, architecture summary) to the rest of the system. The two
//! `POST` endpoints start a run in a background task and return
//! immediately; callers poll `GET /connections/{id}` for progress.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/connections` | All connections |
//! | `GET`  | `/connections/{id}` | One connection with status and counters |
//! | `GET`  | `/connections/{id}/modules` | Modules, filtered by `module_type`, `q`, `limit` |
//! | `POST` | `/connections/{id}/index` | Start a full index (`?force=true` to override a stuck run) |
//! | `POST` | `/connections/{id}/resync` | Start a resync |
//! | `GET`  | `/workspaces/{id}/architecture` | Architecture summary |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "already_syncing", "message": "connection c1 is already syncing" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `already_syncing` (409),
//! `internal` (500).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::RunError;
use crate::indexer::Pipeline;
use crate::migrate;
use crate::models::{ArchitectureSummary, Connection, Module, ModuleType};
use crate::store::{ModuleQuery, Store};

#[derive(Clone)]
struct AppState {
    pipeline: Pipeline,
}

impl AppState {
    fn store(&self) -> &Store {
        &self.pipeline.store
    }
}

/// Migrate the database, build the production pipeline and serve on
/// `[server].bind` until the process is terminated.
pub async fn run_server(config: &Config, store: Store) -> anyhow::Result<()> {
    migrate::run_migrations(store.pool()).await?;
    let pipeline = Pipeline::from_config(config, store)?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(addr = %config.server.bind, "HTTP server listening");
    axum::serve(listener, router(pipeline)).await?;

    Ok(())
}

pub fn router(pipeline: Pipeline) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/connections", get(handle_list_connections))
        .route("/connections/{id}", get(handle_get_connection))
        .route("/connections/{id}/modules", get(handle_list_modules))
        .route("/connections/{id}/index", post(handle_start_index))
        .route("/connections/{id}/resync", post(handle_start_resync))
        .route("/workspaces/{id}/architecture", get(handle_get_architecture))
        .layer(cors)
        .with_state(AppState { pipeline })
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
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<RunError>() {
            Some(RunError::ConnectionNotFound(_)) => not_found(err.to_string()),
            Some(RunError::AlreadySyncing(_)) => AppError {
                status: StatusCode::CONFLICT,
                code: "already_syncing",
                message: err.to_string(),
            },
            Some(RunError::InvalidRepoName(_)) => bad_request(err.to_string()),
            None => {
                tracing::error!(error = %format!("{:#}", err), "Request failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message: err.to_string(),
                }
            }
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

async fn require_connection(state: &AppState, id: &str) -> Result<Connection, AppError> {
    state
        .store()
        .get_connection(id)
        .await?
        .ok_or_else(|| not_found(format!("connection {} not found", id)))
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

// ============ Connections ============

#[derive(Serialize)]
struct ConnectionListResponse {
    connections: Vec<Connection>,
}

async fn handle_list_connections(
    State(state): State<AppState>,
) -> Result<Json<ConnectionListResponse>, AppError> {
    let connections = state.store().list_connections().await?;
    Ok(Json(ConnectionListResponse { connections }))
}

async fn handle_get_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Connection>, AppError> {
    Ok(Json(require_connection(&state, &id).await?))
}

// ============ GET /connections/{id}/modules ============

#[derive(Deserialize)]
struct ModulesParams {
    module_type: Option<String>,
    q: Option<String>,
    limit: Option<i64>,
}

#[derive(Serialize)]
struct ModuleListResponse {
    modules: Vec<Module>,
}

async fn handle_list_modules(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<ModulesParams>,
) -> Result<Json<ModuleListResponse>, AppError> {
    require_connection(&state, &id).await?;

    let module_type = params
        .module_type
        .as_deref()
        .map(str::parse::<ModuleType>)
        .transpose()
        .map_err(|e| bad_request(e.to_string()))?;
    if params.limit.is_some_and(|limit| limit < 1) {
        return Err(bad_request("limit must be >= 1"));
    }

    let modules = state
        .store()
        .query_modules(&ModuleQuery {
            connection_id: id,
            module_type,
            text: params.q.filter(|q| !q.trim().is_empty()),
            limit: params.limit,
        })
        .await?;

    Ok(Json(ModuleListResponse { modules }))
}

// ============ POST /connections/{id}/index|resync ============

#[derive(Deserialize)]
struct RunParams {
    #[serde(default)]
    force: bool,
}

#[derive(Serialize)]
struct RunAccepted {
    connection_id: String,
    run: &'static str,
    status: &'static str,
}

#[derive(Clone, Copy)]
enum RunKind {
    Index,
    Resync,
}

impl RunKind {
    fn as_str(&self) -> &'static str {
        match self {
            RunKind::Index => "index",
            RunKind::Resync => "resync",
        }
    }
}

async fn handle_start_index(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<RunParams>,
) -> Result<(StatusCode, Json<RunAccepted>), AppError> {
    start_run(state, id, params.force, RunKind::Index).await
}

async fn handle_start_resync(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<RunParams>,
) -> Result<(StatusCode, Json<RunAccepted>), AppError> {
    start_run(state, id, params.force, RunKind::Resync).await
}

/// Claim the connection before answering so a concurrent request sees
/// `409`, then run in the background.
async fn start_run(
    state: AppState,
    id: String,
    force: bool,
    kind: RunKind,
) -> Result<(StatusCode, Json<RunAccepted>), AppError> {
    let connection = state.pipeline.begin_run(&id, force).await?;

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        let result = match kind {
            RunKind::Index => pipeline.run_claimed_index(connection).await,
            RunKind::Resync => pipeline.run_claimed_resync(connection).await,
        };
        if let Ok(report) = result {
            tracing::info!(
                module_count = report.module_count,
                failed = report.failed,
                run = kind.as_str(),
                "Background run finished"
            );
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(RunAccepted {
            connection_id: id,
            run: kind.as_str(),
            status: "syncing",
        }),
    ))
}

// ============ GET /workspaces/{id}/architecture ============

async fn handle_get_architecture(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> Result<Json<ArchitectureSummary>, AppError> {
    state
        .store()
        .get_architecture_summary(&workspace_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            not_found(format!(
                "no architecture summary for workspace {}",
                workspace_id
            ))
        })
}
