//! Saved feature endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fpt_common::features::{Feature, FeaturePatch, FeatureSource};
use fpt_common::matrix::query::explain;
use fpt_common::matrix::{FeatureQuery, Tier};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{status_for, ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureListResponse {
    pub success: bool,
    pub features: Vec<Feature>,
    pub source: FeatureSource,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

/// GET /api/features
pub async fn list_features(State(state): State<AppState>) -> Json<FeatureListResponse> {
    let listing = state.features.list().await;
    Json(FeatureListResponse {
        success: true,
        count: listing.features.len(),
        features: listing.features,
        source: listing.source,
        diagnostic: listing.diagnostic,
    })
}

/// Outcome of a feature write
#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub success: bool,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn write_response(result: fpt_common::Result<usize>) -> Response {
    match result {
        Ok(count) => Json(WriteResponse {
            success: true,
            count,
            error: None,
        })
        .into_response(),
        Err(e) => {
            warn!("Feature write failed: {}", e);
            let status = status_for(&e);
            let body = WriteResponse {
                success: false,
                count: 0,
                error: Some(e.to_string()),
            };
            (status, Json(body)).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub features: Vec<Feature>,
}

/// POST /api/features
///
/// Replaces the whole saved set.
pub async fn save_features(
    State(state): State<AppState>,
    payload: Result<Json<SaveRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(write_response(state.features.replace_all(request.features).await))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub query: FeatureQuery,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub feature: Feature,
    pub methods: Vec<String>,
    pub tier: Option<Tier>,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /api/features/analyze
///
/// Runs the engine on a named feature and appends the result to the saved
/// set. The analysis is returned even when saving fails; `error` then says
/// why and the status reflects the failure.
pub async fn analyze_feature(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut missing = request.query.missing_fields();
    if request.name.trim().is_empty() {
        missing.insert(0, "name");
    }
    if !missing.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let table = state.matrix.current_table().await;
    let (feature, outcome) = Feature::analyze(&request.name, &request.query, &table);
    let explanation = explain(&feature.query(), &outcome.methods);
    info!("Analysed feature '{}': {}", feature.name, feature.recommendation);

    let (status, error) = match state.features.append(feature.clone()).await {
        Ok(_) => (StatusCode::OK, None),
        Err(e) => {
            warn!("Could not save analysed feature '{}': {}", feature.name, e);
            (status_for(&e), Some(e.to_string()))
        }
    };

    let body = AnalyzeResponse {
        success: error.is_none(),
        feature,
        methods: outcome.methods,
        tier: outcome.tier,
        explanation,
        error,
    };
    Ok((status, Json(body)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct BulkEditRequest {
    pub names: Vec<String>,
    pub patch: FeaturePatch,
}

/// POST /api/features/bulk-edit
pub async fn bulk_edit_features(
    State(state): State<AppState>,
    payload: Result<Json<BulkEditRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(write_response(
        state.features.bulk_edit(&request.names, &request.patch).await,
    ))
}

/// POST /api/features/seed
///
/// Replaces the saved set with the sample features.
pub async fn seed_features(State(state): State<AppState>) -> Response {
    write_response(state.features.seed_samples().await)
}
