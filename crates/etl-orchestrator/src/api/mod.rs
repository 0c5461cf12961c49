//! HTTP trigger surface
//!
//! - `POST /events` - process one notification batch; any non-2xx response
//!   tells the delivery substrate to redeliver the batch
//! - `GET /health` - liveness and active configuration
//! - `GET /records/:file_id` - one ingestion record
//! - `GET /records?status=FAILED` - records by status

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use etl_common::types::S3Event;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    config::Backend,
    error::AppError,
    ingest::{BatchReport, IngestOrchestrator, IngestionRecord, ProcessingStatus},
    middleware,
};

pub mod response;

pub use response::{ApiResponse, ErrorEnvelope};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<IngestOrchestrator>,
    pub backend: Backend,
}

impl AppState {
    pub fn new(orchestrator: IngestOrchestrator, backend: Backend) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            backend,
        }
    }
}

/// Build the router with all routes and middleware
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events", post(handle_events))
        .route("/records", get(list_records))
        .route("/records/:file_id", get(get_record))
        .with_state(state)
        .layer(middleware::tracing_layer())
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "backend": state.backend.to_string(),
        "target_suffix": state.orchestrator.filter().suffix(),
    }))
}

async fn handle_events(
    State(state): State<AppState>,
    Json(event): Json<S3Event>,
) -> Result<ApiResponse<BatchReport>, AppError> {
    let report = state.orchestrator.process_batch(&event).await?;
    Ok(ApiResponse::ok(report))
}

#[derive(Debug, Deserialize)]
struct ListRecordsQuery {
    status: Option<String>,
}

async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<ApiResponse<Vec<IngestionRecord>>, AppError> {
    let status: ProcessingStatus = query
        .status
        .ok_or_else(|| AppError::BadRequest("status query parameter is required".to_string()))?
        .parse()
        .map_err(|e: anyhow::Error| AppError::BadRequest(e.to_string()))?;

    let records = state.orchestrator.store().list_by_status(status).await?;
    let count = records.len();

    Ok(ApiResponse::ok(records).with_meta(json!({ "status": status, "count": count })))
}

async fn get_record(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<ApiResponse<IngestionRecord>, AppError> {
    let file_id = Uuid::parse_str(&file_id)
        .map_err(|_| AppError::BadRequest(format!("Invalid file id: {}", file_id)))?;

    state
        .orchestrator
        .store()
        .get(file_id)
        .await?
        .map(ApiResponse::ok)
        .ok_or_else(|| AppError::NotFound(format!("No ingestion record for {}", file_id)))
}
