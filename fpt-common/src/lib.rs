//! # FPT Common Library
//!
//! Shared code for the Feature Prioritization Tool:
//! - Row/table model for the decision matrix
//! - Recommendation matching engine
//! - Tiered table resolution (remote store, local cache, embedded defaults)
//! - CSV ingestion and export
//! - Saved feature records
//! - Configuration loading and event bus

pub mod config;
pub mod csv;
pub mod db;
pub mod error;
pub mod events;
pub mod features;
pub mod matrix;
pub mod model;
pub mod store;
pub mod time;

pub use error::{Error, Result};
pub use model::{Row, Table};
