//! fpt-server library - HTTP surface of the Feature Prioritization Tool
//!
//! Public routes answer queries against the matrix in effect; admin routes
//! (behind the admin password) replace the matrix and edit saved features.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use fpt_common::events::EventBus;
use fpt_common::features::{FeatureService, FeatureStore};
use fpt_common::matrix::MatrixService;
use fpt_common::store::{LocalCache, RemoteStore, Resolver};

pub mod api;
pub mod error;

/// Largest accepted request body (CSV uploads included)
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub matrix: Arc<MatrixService>,
    pub features: Arc<FeatureService>,
    /// Admin password; empty disables the check
    pub admin_password: Arc<str>,
}

impl AppState {
    pub fn new(
        matrix: Arc<MatrixService>,
        features: Arc<FeatureService>,
        admin_password: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            matrix,
            features,
            admin_password: admin_password.into(),
        }
    }

    /// Wire services over the given stores, sharing one event bus
    pub fn from_stores(
        remote: Arc<dyn RemoteStore>,
        feature_store: Arc<dyn FeatureStore>,
        cache: Arc<dyn LocalCache>,
        timeout: Duration,
        admin_password: impl Into<Arc<str>>,
    ) -> Self {
        let events = EventBus::new(100);
        let matrix = MatrixService::new(Resolver::new(remote, cache, timeout), events.clone());
        let features = FeatureService::new(feature_store, timeout, events);
        Self::new(Arc::new(matrix), Arc::new(features), admin_password)
    }

    pub fn auth_enabled(&self) -> bool {
        !self.admin_password.is_empty()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::middleware;
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    // Admin routes (require the admin password)
    let protected = Router::new()
        .route("/api/matrix", post(api::replace_matrix))
        .route("/api/matrix/csv", post(api::upload_csv))
        .route("/api/matrix/seed", post(api::seed_matrix))
        .route("/api/features/bulk-edit", post(api::bulk_edit_features))
        .route("/api/features/seed", post(api::seed_features))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::admin_middleware,
        ));

    // Public routes
    let public = Router::new()
        .route("/api/matrix", get(api::get_matrix))
        .route("/api/matrix/csv", get(api::export_csv))
        .route("/api/matrix/refresh", post(api::refresh_matrix))
        .route("/api/matrix/options", get(api::matrix_options))
        .route("/api/methods", get(api::list_methods))
        .route("/api/recommend", post(api::recommend))
        .route("/api/features", get(api::list_features).post(api::save_features))
        .route("/api/features/analyze", post(api::analyze_feature))
        .route("/api/admin/login", post(api::admin_login))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
