//! Admin password gate
//!
//! Write routes require the configured admin password in the
//! `X-Admin-Password` header. An empty configured password disables the
//! check entirely.

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    middleware::Next,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::AppState;

/// Header carrying the admin password
pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";

fn password_matches(state: &AppState, provided: &str) -> bool {
    !state.auth_enabled() || provided == &*state.admin_password
}

/// Admin middleware
///
/// Returns 401 Unauthorized when the header is missing or wrong.
pub async fn admin_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.auth_enabled() {
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(ADMIN_PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    match provided {
        Some(password) if password_matches(&state, &password) => Ok(next.run(request).await),
        Some(_) => {
            warn!("Rejected admin request to {}: wrong password", request.uri().path());
            Err(ApiError::Unauthorized("Invalid admin password".to_string()))
        }
        None => Err(ApiError::Unauthorized(format!(
            "Missing {} header",
            ADMIN_PASSWORD_HEADER
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
}

/// POST /api/admin/login
///
/// Lets a client check a password before using it on admin routes.
pub async fn admin_login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if password_matches(&state, &request.password) {
        info!("Admin login accepted");
        Ok(Json(LoginResponse { success: true }))
    } else {
        warn!("Admin login rejected");
        Err(ApiError::Unauthorized("Invalid admin password".to_string()))
    }
}
