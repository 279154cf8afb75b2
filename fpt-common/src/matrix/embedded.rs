//! Compiled-in matrix used when no other source has data
//!
//! This table is the floor of the resolution chain: with no network and no
//! cache the service still answers every query from it.

use crate::model::{Row, Table};

/// Number of embedded rows
pub const EMBEDDED_ROW_COUNT: usize = EMBEDDED_ROWS.len();

/// Priority, Risk, Confidence, Data, Size, Timing, Recommendation
const EMBEDDED_ROWS: [[&str; 7]; 27] = [
    [
        "Must have",
        "High",
        "No data",
        "N/A",
        "L",
        "Start",
        "UX research & A/B test",
    ],
    [
        "Must have",
        "High",
        "Inconclusive data",
        "Qualitative and/or Quantitative Data",
        "L",
        "Start",
        "UX research & A/B test",
    ],
    [
        "Must have",
        "High",
        "Conclusive data",
        "Quantitative data",
        "L",
        "Start",
        "Monitor with Analytics",
    ],
    [
        "Must have",
        "Medium",
        "No data",
        "N/A",
        "M",
        "Middle",
        "Exploratory research",
    ],
    [
        "Must have",
        "Medium",
        "Inconclusive data",
        "Qualitative and/or Quantitative Data",
        "M",
        "Middle",
        "UX research & A/B test",
    ],
    [
        "Must have",
        "Medium",
        "Conclusive data",
        "Quantitative data",
        "M",
        "Middle",
        "Monitor with Analytics",
    ],
    [
        "Must have",
        "Low",
        "No data",
        "N/A",
        "S",
        "End",
        "Exploratory research",
    ],
    [
        "Must have",
        "Low",
        "Inconclusive data",
        "Qualitative and/or Quantitative Research",
        "S",
        "End",
        "Unmoderated test",
    ],
    [
        "Must have",
        "Low",
        "Conclusive data",
        "Quantitative data",
        "S",
        "End",
        "Monitor with Analytics",
    ],
    [
        "Should have",
        "High",
        "No data",
        "N/A",
        "L",
        "Start",
        "UX research & A/B test",
    ],
    [
        "Should have",
        "High",
        "Inconclusive data",
        "Qualitative and/or Quantitative Research",
        "L",
        "Start",
        "UX research & A/B test",
    ],
    [
        "Should have",
        "High",
        "Conclusive data",
        "Quantitative data",
        "L",
        "Start",
        "Pre-post analysis",
    ],
    [
        "Should have",
        "Medium",
        "No data",
        "N/A",
        "M",
        "Middle",
        "Exploratory research",
    ],
    [
        "Should have",
        "Medium",
        "Inconclusive data",
        "Qualitative and/or Quantitative Research",
        "M",
        "Middle",
        "Unmoderated test",
    ],
    [
        "Should have",
        "Medium",
        "Conclusive data",
        "Quantitative data",
        "M",
        "Middle",
        "Monitor with Analytics",
    ],
    [
        "Should have",
        "Low",
        "No data",
        "N/A",
        "S",
        "End",
        "Exploratory research",
    ],
    [
        "Should have",
        "Low",
        "Inconclusive data",
        "Qualitative and/or Quantitative Research",
        "S",
        "End",
        "Unmoderated test",
    ],
    [
        "Should have",
        "Low",
        "Conclusive data",
        "Quantitative data",
        "S",
        "End",
        "Monitor with Analytics",
    ],
    [
        "Nice to have",
        "High",
        "No data",
        "N/A",
        "L",
        "Start",
        "Exploratory research",
    ],
    [
        "Nice to have",
        "High",
        "Inconclusive data",
        "Qualitative and/or Quantitative Data",
        "L",
        "Start",
        "Pre-post analysis",
    ],
    [
        "Nice to have",
        "High",
        "Conclusive data",
        "Quantitative data",
        "L",
        "Start",
        "Monitor with Analytics",
    ],
    [
        "Nice to have",
        "Medium",
        "No data",
        "N/A",
        "M",
        "Middle",
        "Exploratory research",
    ],
    [
        "Nice to have",
        "Medium",
        "Inconclusive data",
        "Qualitative and/or Quantitative Research",
        "M",
        "Middle",
        "Unmoderated test",
    ],
    [
        "Nice to have",
        "Medium",
        "Conclusive data",
        "Quantitative data",
        "M",
        "Middle",
        "Monitor with Analytics",
    ],
    [
        "Nice to have",
        "Low",
        "No data",
        "N/A",
        "S",
        "End",
        "Proceed without Testing",
    ],
    [
        "Nice to have",
        "Low",
        "Inconclusive data",
        "Qualitative and/or Quantitative Data",
        "S",
        "End",
        "Monitor with Analytics",
    ],
    [
        "Nice to have",
        "Low",
        "Conclusive data",
        "Quantitative data",
        "S",
        "End",
        "Monitor with Analytics",
    ],
];

/// Short descriptions of the recommended methods
pub const METHOD_DESCRIPTIONS: [(&str, &str); 6] = [
    (
        "Unmoderated test",
        "Remote testing without a moderator, allowing users to complete tasks at their own pace",
    ),
    (
        "Pre-post analysis",
        "Comparing metrics before and after a feature launch to measure impact",
    ),
    (
        "Monitor with Analytics",
        "Using analytics tools to track user behavior and feature performance",
    ),
    (
        "Exploratory research",
        "Open-ended research to discover user needs and pain points",
    ),
    (
        "UX research & A/B test",
        "In-depth user research combined with comparing two versions of a feature to determine which performs better",
    ),
    (
        "Proceed without Testing",
        "Move forward with implementation without additional research or testing",
    ),
];

/// Fresh copy of the embedded matrix
pub fn embedded_table() -> Table {
    EMBEDDED_ROWS
        .iter()
        .map(|[p, r, c, d, s, t, rec]| Row::canonical(p, r, c, d, s, t, rec))
        .collect()
}

/// Description of a method, if it is one of the known ones
pub fn method_description(method: &str) -> Option<&'static str> {
    METHOD_DESCRIPTIONS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(method.trim()))
        .map(|(_, description)| *description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::engine::recommend;
    use crate::matrix::query::FeatureQuery;
    use crate::model::CANONICAL_COLUMNS;

    #[test]
    fn test_embedded_table_is_complete() {
        let table = embedded_table();
        assert_eq!(table.len(), EMBEDDED_ROW_COUNT);
        for row in &table {
            let cols: Vec<&str> = row.columns().collect();
            assert_eq!(cols, CANONICAL_COLUMNS.to_vec());
            assert!(!row.value("Recommendation").is_empty());
        }
    }

    #[test]
    fn test_every_recommendation_has_a_description() {
        for row in embedded_table() {
            let method = row.value("Recommendation");
            assert!(
                method_description(method).is_some(),
                "missing description for {}",
                method
            );
        }
    }

    #[test]
    fn test_embedded_answers_a_known_query() {
        let table = embedded_table();
        let q = FeatureQuery::new("Nice to have", "Low", "No data", "", "S", "End");
        assert_eq!(recommend(&table, &q), vec!["Proceed without Testing".to_string()]);
    }
}
