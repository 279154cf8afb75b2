//! Decision matrix: column resolution, matching, embedded defaults and the
//! service holding the table in effect

pub mod columns;
pub mod embedded;
pub mod engine;
pub mod query;
pub mod service;

pub use columns::{resolve_column, ColumnMap};
pub use engine::{recommend, recommend_detailed, unique_values, MatchOutcome, Tier};
pub use query::FeatureQuery;
pub use service::{MatrixService, MatrixState};
