//! Row and table model for the decision matrix
//!
//! A row is a flat, ordered string → string mapping. Column order is kept as
//! inserted so CSV headers survive a round trip and column resolution can
//! prefer the leftmost candidate.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Canonical column names, in the order they are stored and exported
pub const PRIORITY: &str = "Priority";
pub const RISK: &str = "Risk";
pub const CONFIDENCE: &str = "Confidence";
pub const DATA: &str = "Data";
pub const SIZE: &str = "Size";
pub const TIMING: &str = "Timing";
pub const RECOMMENDATION: &str = "Recommendation";

/// All canonical columns (six attributes plus the recommendation)
pub const CANONICAL_COLUMNS: [&str; 7] =
    [PRIORITY, RISK, CONFIDENCE, DATA, SIZE, TIMING, RECOMMENDATION];

/// One matrix row: a combination of attributes mapped to a recommendation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(IndexMap<String, String>);

/// The full ordered set of rows currently in effect
pub type Table = Vec<Row>;

impl Row {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Build a row from `(column, value)` pairs, keeping their order
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a row holding the seven canonical columns
    pub fn canonical(
        priority: &str,
        risk: &str,
        confidence: &str,
        data: &str,
        size: &str,
        timing: &str,
        recommendation: &str,
    ) -> Self {
        Self::from_pairs([
            (PRIORITY, priority),
            (RISK, risk),
            (CONFIDENCE, confidence),
            (DATA, data),
            (SIZE, size),
            (TIMING, timing),
            (RECOMMENDATION, recommendation),
        ])
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Cell value, with a missing column read as the empty string
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Column names of a table, taken from its first row
pub fn table_columns(table: &[Row]) -> Vec<String> {
    table
        .first()
        .map(|row| row.columns().map(str::to_string).collect())
        .unwrap_or_default()
}
