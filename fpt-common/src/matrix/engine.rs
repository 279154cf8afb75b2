//! Recommendation matching engine
//!
//! Three-tier cascading match over the matrix, each tier looser than the
//! last. Within a tier the first row in table order wins; a lower tier is
//! only consulted when the higher one found nothing usable.

use serde::Serialize;

use super::columns::ColumnMap;
use super::query::FeatureQuery;
use crate::model::Row;

/// Result when the table has no rows at all
pub const NO_MATRIX_DATA: &str = "No matrix data loaded";

/// Result when every tier came up empty
pub const NO_RECOMMENDATION: &str = "No recommendation found";

/// Matching tier that produced a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// All six attributes (evidence type exempt for "no data")
    Full,
    /// Priority, risk and confidence (same evidence-type rule)
    PriorityRiskConfidence,
    /// Size and timing only
    SizeTiming,
}

/// Detailed outcome of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutcome {
    /// Recommended methods; never empty
    pub methods: Vec<String>,
    /// Tier that matched, `None` for the sentinels
    pub tier: Option<Tier>,
    /// Table index of the matched row
    pub row_index: Option<usize>,
}

impl MatchOutcome {
    fn sentinel(text: &str) -> Self {
        Self {
            methods: vec![text.to_string()],
            tier: None,
            row_index: None,
        }
    }
}

/// Case-insensitive, trimmed equality
fn same(cell: &str, wanted: &str) -> bool {
    cell.trim().to_lowercase() == wanted.trim().to_lowercase()
}

/// A query bound to one table's resolved columns
struct Matcher<'a> {
    cols: &'a ColumnMap,
    query: &'a FeatureQuery,
    no_data: bool,
}

impl Matcher<'_> {
    fn prc(&self, row: &Row) -> bool {
        same(row.value(&self.cols.priority), &self.query.priority)
            && same(row.value(&self.cols.risk), &self.query.risk)
            && same(row.value(&self.cols.confidence), &self.query.confidence)
            && (self.no_data || same(row.value(&self.cols.data), &self.query.data_type))
    }

    fn size_timing(&self, row: &Row) -> bool {
        same(row.value(&self.cols.size), &self.query.size)
            && same(row.value(&self.cols.timing), &self.query.timing)
    }

    fn matches(&self, tier: Tier, row: &Row) -> bool {
        match tier {
            Tier::Full => self.prc(row) && self.size_timing(row),
            Tier::PriorityRiskConfidence => self.prc(row),
            Tier::SizeTiming => self.size_timing(row),
        }
    }
}

/// Recommend with full detail on which tier and row fired
pub fn recommend_detailed(table: &[Row], query: &FeatureQuery) -> MatchOutcome {
    if table.is_empty() {
        return MatchOutcome::sentinel(NO_MATRIX_DATA);
    }

    let cols = ColumnMap::resolve(table);
    let matcher = Matcher {
        cols: &cols,
        query,
        no_data: query.is_no_data(),
    };

    for tier in [Tier::Full, Tier::PriorityRiskConfidence, Tier::SizeTiming] {
        let hit = table
            .iter()
            .enumerate()
            .find(|(_, row)| matcher.matches(tier, row));

        if let Some((index, row)) = hit {
            let recommendation = row.value(&cols.recommendation);
            // An empty cell is not a recommendation; fall through to the next tier.
            // Whitespace is still a (blank) recommendation.
            if !recommendation.is_empty() {
                return MatchOutcome {
                    methods: vec![recommendation.to_string()],
                    tier: Some(tier),
                    row_index: Some(index),
                };
            }
        }
    }

    MatchOutcome::sentinel(NO_RECOMMENDATION)
}

/// Recommended methods for a feature; never empty
pub fn recommend(table: &[Row], query: &FeatureQuery) -> Vec<String> {
    recommend_detailed(table, query).methods
}

/// Distinct trimmed values of a column, in first-seen order
///
/// The column name is resolved the same way the engine resolves it, so
/// "size" finds "Size estimate".
pub fn unique_values(table: &[Row], column: &str) -> Vec<String> {
    let actual = super::columns::resolve_column(table, column).unwrap_or_else(|| column.to_string());

    let mut seen = Vec::new();
    for row in table {
        let value = row.value(&actual).trim();
        if !value.is_empty() && !seen.iter().any(|s: &String| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(p: &str, r: &str, c: &str, d: &str, s: &str, t: &str, rec: &str) -> Row {
        Row::canonical(p, r, c, d, s, t, rec)
    }

    #[test]
    fn test_empty_table_sentinel() {
        let q = FeatureQuery::new("Must have", "High", "No data", "", "L", "Start");
        assert_eq!(recommend(&[], &q), vec![NO_MATRIX_DATA.to_string()]);
    }

    #[test]
    fn test_no_match_sentinel() {
        let table = vec![row("Must have", "High", "No data", "N/A", "L", "Start", "A")];
        let q = FeatureQuery::new("Could have", "Low", "Conclusive data", "X", "S", "End");
        let outcome = recommend_detailed(&table, &q);
        assert_eq!(outcome.methods, vec![NO_RECOMMENDATION.to_string()]);
        assert_eq!(outcome.tier, None);
    }

    #[test]
    fn test_full_match_takes_first_in_table_order() {
        let table = vec![
            row("Must have", "High", "Conclusive data", "Q", "S", "End", "st-only"),
            row("Must have", "High", "Conclusive data", "Q", "L", "Start", "first"),
            row("Must have", "High", "Conclusive data", "Q", "L", "Start", "second"),
        ];
        let q = FeatureQuery::new("must have", " HIGH ", "conclusive data", "q", "l", "start");
        let outcome = recommend_detailed(&table, &q);
        assert_eq!(outcome.methods, vec!["first".to_string()]);
        assert_eq!(outcome.tier, Some(Tier::Full));
        assert_eq!(outcome.row_index, Some(1));
    }

    #[test]
    fn test_full_match_preferred_over_earlier_prc_row() {
        let table = vec![
            row("Must have", "High", "Conclusive data", "Q", "M", "End", "prc"),
            row("Must have", "High", "Conclusive data", "Q", "L", "Start", "full"),
        ];
        let q = FeatureQuery::new("Must have", "High", "Conclusive data", "Q", "L", "Start");
        assert_eq!(recommend(&table, &q), vec!["full".to_string()]);
    }

    #[test]
    fn test_data_type_matters_without_no_data() {
        let table = vec![
            row("Must have", "High", "Conclusive data", "Quantitative data", "L", "Start", "quant"),
            row("Must have", "High", "Conclusive data", "Qualitative", "L", "Start", "qual"),
        ];
        let q = FeatureQuery::new("Must have", "High", "Conclusive data", "Qualitative", "L", "Start");
        assert_eq!(recommend(&table, &q), vec!["qual".to_string()]);
    }

    #[test]
    fn test_prc_keeps_data_conditional() {
        let table = vec![
            row("Must have", "High", "Conclusive data", "Quantitative data", "S", "End", "wrong data"),
            row("Must have", "High", "Conclusive data", "Qualitative", "S", "End", "prc"),
        ];
        let q = FeatureQuery::new("Must have", "High", "Conclusive data", "Qualitative", "L", "Start");
        let outcome = recommend_detailed(&table, &q);
        assert_eq!(outcome.methods, vec!["prc".to_string()]);
        assert_eq!(outcome.tier, Some(Tier::PriorityRiskConfidence));
    }

    #[test]
    fn test_empty_recommendation_falls_through() {
        let table = vec![
            row("Must have", "High", "No data", "N/A", "M", "End", ""),
            row("Should have", "Low", "Conclusive data", "Q", "L", "Start", "st"),
        ];
        let q = FeatureQuery::new("Must have", "High", "No data", "", "L", "Start");
        let outcome = recommend_detailed(&table, &q);
        assert_eq!(outcome.methods, vec!["st".to_string()]);
        assert_eq!(outcome.tier, Some(Tier::SizeTiming));
    }

    #[test]
    fn test_whitespace_recommendation_is_returned() {
        let table = vec![
            row("Must have", "High", "No data", "N/A", "L", "Start", " "),
            row("Must have", "High", "No data", "N/A", "L", "Start", "later"),
        ];
        let q = FeatureQuery::new("Must have", "High", "No data", "", "L", "Start");
        let outcome = recommend_detailed(&table, &q);
        assert_eq!(outcome.methods, vec![" ".to_string()]);
        assert_eq!(outcome.tier, Some(Tier::Full));
        assert_eq!(outcome.row_index, Some(0));
    }

    #[test]
    fn test_drifted_column_names_still_match() {
        let table = vec![Row::from_pairs([
            ("priority_level", "Must have"),
            ("RISK", "High"),
            ("Confidence", "No data"),
            ("Size (t-shirt)", "L"),
            ("timing", "Start"),
            ("Recommended method", "A/B Test"),
            ("Notes", "ignored"),
        ])];
        let q = FeatureQuery::new("Must have", "High", "No data", "", "L", "Start");
        let outcome = recommend_detailed(&table, &q);
        assert_eq!(outcome.methods, vec!["A/B Test".to_string()]);
        assert_eq!(outcome.tier, Some(Tier::Full));
    }

    #[test]
    fn test_unique_values_first_seen_order() {
        let table = vec![
            row("Must have", "High", "", "", "L", "", ""),
            row("Should have", "Low", "", "", "M", "", ""),
            row(" Must have ", "High", "", "", "", "", ""),
        ];
        assert_eq!(
            unique_values(&table, "priority"),
            vec!["Must have".to_string(), "Should have".to_string()]
        );
        assert_eq!(
            unique_values(&table, "Size"),
            vec!["L".to_string(), "M".to_string()]
        );
        assert!(unique_values(&[], "Size").is_empty());
    }
}
