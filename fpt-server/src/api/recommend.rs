//! Recommendation queries and the option lists that feed them

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use fpt_common::matrix::embedded::{method_description, METHOD_DESCRIPTIONS};
use fpt_common::matrix::query::{
    explain, is_data_option_valid, is_no_data, priority_label, priority_score, NO_RESEARCH,
};
use fpt_common::matrix::{unique_values, FeatureQuery, Tier};
use fpt_common::model;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendResponse {
    pub methods: Vec<String>,
    pub tier: Option<Tier>,
    pub row_index: Option<usize>,
    pub explanation: String,
    pub priority_score: u8,
    pub priority_label: String,
    /// Descriptions of the recommended methods that have one
    pub descriptions: Vec<MethodInfo>,
}

/// POST /api/recommend
///
/// Any well-formed query gets an answer: an unmatched one yields the "no
/// recommendation" sentinel rather than an error.
pub async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<FeatureQuery>, JsonRejection>,
) -> ApiResult<Json<RecommendResponse>> {
    let Json(query) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let query = query.normalized();
    let outcome = state.matrix.recommend(&query).await;
    debug!("Recommendation {:?} via {:?}", outcome.methods, outcome.tier);

    let score = priority_score(&query);
    let descriptions = outcome
        .methods
        .iter()
        .filter_map(|m| {
            method_description(m).map(|d| MethodInfo {
                method: m.clone(),
                description: d.to_string(),
            })
        })
        .collect();

    Ok(Json(RecommendResponse {
        explanation: explain(&query, &outcome.methods),
        methods: outcome.methods,
        tier: outcome.tier,
        row_index: outcome.row_index,
        priority_score: score,
        priority_label: priority_label(score).to_string(),
        descriptions,
    }))
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodInfo {
    pub method: String,
    pub description: String,
}

/// GET /api/methods
pub async fn list_methods() -> Json<Vec<MethodInfo>> {
    Json(
        METHOD_DESCRIPTIONS
            .iter()
            .map(|(method, description)| MethodInfo {
                method: method.to_string(),
                description: description.to_string(),
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
pub struct OptionsQuery {
    /// Restrict evidence-type options to those valid for this confidence
    pub confidence: Option<String>,
}

/// Distinct values per attribute column of the current matrix
#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub priority: Vec<String>,
    pub risk: Vec<String>,
    pub confidence: Vec<String>,
    pub data: Vec<String>,
    pub size: Vec<String>,
    pub timing: Vec<String>,
}

/// GET /api/matrix/options
pub async fn matrix_options(
    State(state): State<AppState>,
    Query(params): Query<OptionsQuery>,
) -> Json<OptionsResponse> {
    let table = state.matrix.current_table().await;

    let data = match params.confidence.as_deref() {
        Some(confidence) if is_no_data(confidence) => vec![NO_RESEARCH.to_string()],
        Some(confidence) => unique_values(&table, model::DATA)
            .into_iter()
            .filter(|option| is_data_option_valid(confidence, option))
            .collect(),
        None => unique_values(&table, model::DATA),
    };

    Json(OptionsResponse {
        priority: unique_values(&table, model::PRIORITY),
        risk: unique_values(&table, model::RISK),
        confidence: unique_values(&table, model::CONFIDENCE),
        data,
        size: unique_values(&table, model::SIZE),
        timing: unique_values(&table, model::TIMING),
    })
}
