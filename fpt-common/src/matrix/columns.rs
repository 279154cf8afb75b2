//! Canonical column resolution
//!
//! Uploaded matrices drift in naming ("priority_level", "RISK", "Recommended
//! method"). Matching never fails on that drift: each canonical name is
//! resolved once per table to the actual column carrying it.

use crate::model::{self, Row};

/// Resolve a canonical field name to the table's actual column name.
///
/// Candidates come from the first row, in column order. An exact
/// case-insensitive match wins over substring containment. `Data` only
/// accepts an exact match, since "data" appears inside other headers
/// (e.g. "Confidence data"). `Recommendation` also accepts any column
/// containing "recommend".
pub fn resolve_column(table: &[Row], canonical: &str) -> Option<String> {
    let first = table.first()?;
    let wanted = canonical.to_lowercase();

    if let Some(exact) = first.columns().find(|c| c.trim().to_lowercase() == wanted) {
        return Some(exact.to_string());
    }

    if canonical == model::DATA {
        return None;
    }

    let needle = if canonical == model::RECOMMENDATION {
        "recommend".to_string()
    } else {
        wanted
    };

    first
        .columns()
        .find(|c| c.to_lowercase().contains(&needle))
        .map(str::to_string)
}

/// Actual column names for every canonical field of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub priority: String,
    pub risk: String,
    pub confidence: String,
    pub data: String,
    pub size: String,
    pub timing: String,
    pub recommendation: String,
}

impl ColumnMap {
    /// Resolve all canonical fields, falling back to the canonical name
    /// (which then simply reads as empty) when nothing matches.
    pub fn resolve(table: &[Row]) -> Self {
        let pick = |canonical: &str| {
            resolve_column(table, canonical).unwrap_or_else(|| canonical.to_string())
        };

        Self {
            priority: pick(model::PRIORITY),
            risk: pick(model::RISK),
            confidence: pick(model::CONFIDENCE),
            data: pick(model::DATA),
            size: pick(model::SIZE),
            timing: pick(model::TIMING),
            recommendation: pick(model::RECOMMENDATION),
        }
    }
}
