//! HTTP API handlers for fpt-server

pub mod auth;
pub mod features;
pub mod health;
pub mod matrix;
pub mod recommend;

pub use auth::{admin_login, admin_middleware};
pub use features::{
    analyze_feature, bulk_edit_features, list_features, save_features, seed_features,
};
pub use health::health_routes;
pub use matrix::{
    export_csv, get_matrix, refresh_matrix, replace_matrix, seed_matrix, upload_csv,
};
pub use recommend::{list_methods, matrix_options, recommend};
