//! Matrix endpoints: read, replace, CSV import/export, refresh

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fpt_common::csv;
use fpt_common::matrix::embedded::EMBEDDED_ROW_COUNT;
use fpt_common::matrix::MatrixState;
use fpt_common::model::table_columns;
use fpt_common::store::{ReplaceOutcome, SourceKind};
use fpt_common::time::to_iso;
use fpt_common::{Row, Table};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Matrix currently in effect
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixResponse {
    pub success: bool,
    pub data: Table,
    pub last_updated: Option<String>,
    pub source: SourceKind,
    pub row_count: usize,
    pub column_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl MatrixResponse {
    fn from_state(state: &MatrixState, success: bool, diagnostic: Option<String>) -> Self {
        Self {
            success,
            data: state.rows.as_ref().clone(),
            last_updated: state.last_modified.map(to_iso),
            source: state.source,
            row_count: state.rows.len(),
            column_count: table_columns(&state.rows).len(),
            diagnostic,
        }
    }
}

/// Result of a replace
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceResponse {
    pub success: bool,
    pub last_updated: String,
    pub source: SourceKind,
    pub row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

fn replace_response(outcome: ReplaceOutcome, row_count: usize) -> Response {
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    let body = ReplaceResponse {
        success: outcome.success,
        last_updated: to_iso(outcome.last_modified),
        source: outcome.source,
        row_count,
        warning: outcome.warning,
        diagnostic: outcome.diagnostic,
    };
    (status, Json(body)).into_response()
}

async fn apply_replace(state: &AppState, table: Table) -> ApiResult<Response> {
    let row_count = table.len();
    let outcome = state.matrix.replace(table).await?;
    if let Some(warning) = &outcome.warning {
        warn!("Matrix replaced with warning: {}", warning);
    }
    Ok(replace_response(outcome, row_count))
}

/// GET /api/matrix
///
/// Resolves again on every read so writes made through another instance
/// show up here.
pub async fn get_matrix(State(state): State<AppState>) -> Json<MatrixResponse> {
    let result = state.matrix.refresh().await;
    let snapshot = state.matrix.snapshot().await;
    let diagnostic = result.diagnostic.or_else(|| snapshot.diagnostic.clone());
    Json(MatrixResponse::from_state(&snapshot, true, diagnostic))
}

/// POST /api/matrix/refresh
///
/// Re-runs source resolution. On failure the previous table stays in
/// effect and is returned with `success: false`.
pub async fn refresh_matrix(State(state): State<AppState>) -> Json<MatrixResponse> {
    let result = state.matrix.refresh().await;
    let snapshot = state.matrix.snapshot().await;
    Json(MatrixResponse::from_state(
        &snapshot,
        result.success,
        result.diagnostic,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReplaceRequest {
    #[serde(default)]
    pub data: Option<Vec<IndexMap<String, Value>>>,
}

/// Cell text for a JSON value; null becomes empty
fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn table_from_request(request: ReplaceRequest) -> ApiResult<Table> {
    let rows = request
        .data
        .ok_or_else(|| ApiError::BadRequest("`data` must be an array of rows".to_string()))?;

    if rows.is_empty() {
        return Err(ApiError::BadRequest(
            "`data` must contain at least one row".to_string(),
        ));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(col, value)| (col, cell_text(value)))
                .collect::<Row>()
        })
        .collect())
}

/// POST /api/matrix
///
/// Replaces the matrix with `{"data": [ {column: value, ...}, ... ]}`.
pub async fn replace_matrix(
    State(state): State<AppState>,
    payload: Result<Json<ReplaceRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let table = table_from_request(request)?;
    info!("Replacing matrix with {} rows", table.len());
    apply_replace(&state, table).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvUpload {
    pub csv: String,
    #[serde(default)]
    pub force_load: bool,
}

/// POST /api/matrix/csv
pub async fn upload_csv(
    State(state): State<AppState>,
    payload: Result<Json<CsvUpload>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(upload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let table = csv::ingest(&upload.csv, upload.force_load)?;
    apply_replace(&state, table).await
}

/// GET /api/matrix/csv
pub async fn export_csv(State(state): State<AppState>) -> impl IntoResponse {
    let table = state.matrix.current_table().await;
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"feature-matrix.csv\"",
            ),
        ],
        csv::to_csv(&table),
    )
}

/// POST /api/matrix/seed
///
/// Replaces the matrix with the embedded defaults.
pub async fn seed_matrix(State(state): State<AppState>) -> ApiResult<Response> {
    let outcome = state.matrix.seed_defaults().await?;
    let row_count = EMBEDDED_ROW_COUNT;
    info!("Matrix reseeded from embedded defaults");
    Ok(replace_response(outcome, row_count))
}
