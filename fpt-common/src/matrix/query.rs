//! Feature queries and the attribute rules around them

use serde::{Deserialize, Serialize};

/// Evidence-type sentinel forced when confidence indicates "no data"
pub const NO_RESEARCH: &str = "No Research";

/// Evidence types accepted with "Inconclusive data" confidence
const INCONCLUSIVE_DATA_OPTIONS: [&str; 2] = [
    "Qualitative and/or Quantitative Data",
    "Qualitative and/or Quantitative Research",
];

/// Evidence types accepted with "Conclusive data" confidence
const CONCLUSIVE_DATA_OPTIONS: [&str; 3] = [
    "Quantitative data",
    "Qualitative and/or Quantitative Research",
    "Qualitative and/or Quantitative Data",
];

/// The six categorical attributes describing a feature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureQuery {
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub confidence: String,
    /// Evidence type; named `data` on the wire
    #[serde(default, rename = "data")]
    pub data_type: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub timing: String,
}

/// True when a confidence value means "no data" (any case)
pub fn is_no_data(confidence: &str) -> bool {
    confidence.to_lowercase().contains("no data")
}

impl FeatureQuery {
    pub fn new(
        priority: impl Into<String>,
        risk: impl Into<String>,
        confidence: impl Into<String>,
        data_type: impl Into<String>,
        size: impl Into<String>,
        timing: impl Into<String>,
    ) -> Self {
        Self {
            priority: priority.into(),
            risk: risk.into(),
            confidence: confidence.into(),
            data_type: data_type.into(),
            size: size.into(),
            timing: timing.into(),
        }
    }

    pub fn is_no_data(&self) -> bool {
        is_no_data(&self.confidence)
    }

    /// Query with the evidence type forced to the sentinel when confidence
    /// is "no data"
    pub fn normalized(&self) -> Self {
        let mut query = self.clone();
        if query.is_no_data() {
            query.data_type = NO_RESEARCH.to_string();
        }
        query
    }

    /// Names of attributes that must still be filled in before analysis.
    /// The evidence type is optional when confidence is "no data".
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let checks = [
            ("priority", &self.priority),
            ("risk", &self.risk),
            ("confidence", &self.confidence),
            ("size", &self.size),
            ("timing", &self.timing),
        ];
        for (name, value) in checks {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }
        if !self.is_no_data() && self.data_type.trim().is_empty() {
            missing.push("data");
        }
        missing
    }
}

/// Whether an evidence-type option is selectable for a confidence value
pub fn is_data_option_valid(confidence: &str, option: &str) -> bool {
    if confidence.trim().is_empty() {
        return true;
    }

    let lowered = confidence.to_lowercase();
    if is_no_data(confidence) {
        option == NO_RESEARCH
    } else if lowered.contains("inconclusive") {
        INCONCLUSIVE_DATA_OPTIONS.contains(&option)
    } else if lowered.contains("conclusive") {
        CONCLUSIVE_DATA_OPTIONS.contains(&option)
    } else {
        true
    }
}

/// Urgency score (3..=9) from priority, risk and size
pub fn priority_score(query: &FeatureQuery) -> u8 {
    let priority = match query.priority.as_str() {
        "Must have" => 3,
        "Should have" => 2,
        _ => 1,
    };
    let risk = match query.risk.as_str() {
        "High" => 3,
        "Medium" => 2,
        _ => 1,
    };
    let size = match query.size.as_str() {
        "Large" | "L" => 3,
        "Medium" | "M" => 2,
        _ => 1,
    };
    priority + risk + size
}

/// Label for a priority score
pub fn priority_label(score: u8) -> &'static str {
    if score >= 10 {
        "High Priority"
    } else if score >= 7 {
        "Medium Priority"
    } else {
        "Low Priority"
    }
}

/// Human-readable sentence explaining a recommendation
pub fn explain(query: &FeatureQuery, methods: &[String]) -> String {
    let recommended = methods.join(" or ");
    if query.is_no_data() {
        format!(
            "Based on {} priority, {} risk, and {} confidence, with {} size and {} timing, we recommend {}.",
            query.priority, query.risk, query.confidence, query.size, query.timing, recommended
        )
    } else {
        format!(
            "Based on {} priority, {} risk, {} confidence, {} data type, with {} size and {} timing, we recommend {}.",
            query.priority,
            query.risk,
            query.confidence,
            query.data_type,
            query.size,
            query.timing,
            recommended
        )
    }
}
