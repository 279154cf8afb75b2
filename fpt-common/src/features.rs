//! Saved feature analyses
//!
//! Features are persisted wholesale: every write deletes the stored set and
//! inserts the new one. Reads fall back to built-in sample features when
//! the store is unreachable or empty, so listings always show something.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::events::{EventBus, MatrixEvent};
use crate::matrix::{engine, FeatureQuery, MatchOutcome};
use crate::model::Row;
use crate::store::{bounded, ReconnectingStore, SqlStore, UnconfiguredRemote};
use crate::{Error, Result};

/// One analysed feature: its attributes plus the recommendation it got
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub risk: String,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub timing: String,
    #[serde(default)]
    pub recommendation: String,
}

impl Feature {
    pub fn query(&self) -> FeatureQuery {
        FeatureQuery::new(
            &self.priority,
            &self.risk,
            &self.confidence,
            &self.data,
            &self.size,
            &self.timing,
        )
    }

    /// Run a query through the engine and record the result as a feature
    pub fn analyze(name: &str, query: &FeatureQuery, table: &[Row]) -> (Feature, MatchOutcome) {
        let query = query.normalized();
        let outcome = engine::recommend_detailed(table, &query);

        let feature = Feature {
            name: name.trim().to_string(),
            priority: query.priority,
            risk: query.risk,
            confidence: query.confidence,
            data: query.data_type,
            size: query.size,
            timing: query.timing,
            recommendation: outcome.methods.join(", "),
        };
        (feature, outcome)
    }
}

/// Sparse update: only present, non-blank fields overwrite
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub timing: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

fn overwrite(target: &mut String, value: &Option<String>) {
    if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
        *target = value.to_string();
    }
}

impl FeaturePatch {
    pub fn apply(&self, feature: &mut Feature) {
        overwrite(&mut feature.name, &self.name);
        overwrite(&mut feature.priority, &self.priority);
        overwrite(&mut feature.risk, &self.risk);
        overwrite(&mut feature.confidence, &self.confidence);
        overwrite(&mut feature.data, &self.data);
        overwrite(&mut feature.size, &self.size);
        overwrite(&mut feature.timing, &self.timing);
        overwrite(&mut feature.recommendation, &self.recommendation);
    }

    /// True when applying the patch could not change anything
    pub fn is_empty(&self) -> bool {
        [
            &self.name,
            &self.priority,
            &self.risk,
            &self.confidence,
            &self.data,
            &self.size,
            &self.timing,
            &self.recommendation,
        ]
        .iter()
        .all(|v| v.as_deref().map_or(true, |v| v.trim().is_empty()))
    }
}

/// Apply `patch` to every record whose name is in `names`; returns how many
/// records were touched
pub fn bulk_edit(records: &mut [Feature], names: &[String], patch: &FeaturePatch) -> usize {
    let mut touched = 0;
    for record in records.iter_mut().filter(|r| names.contains(&r.name)) {
        patch.apply(record);
        touched += 1;
    }
    touched
}

/// Built-in example features shown when nothing is stored
pub fn sample_features() -> Vec<Feature> {
    let sample = |name: &str, fields: [&str; 7]| {
        let [priority, risk, confidence, data, size, timing, recommendation] = fields;
        Feature {
            name: name.to_string(),
            priority: priority.to_string(),
            risk: risk.to_string(),
            confidence: confidence.to_string(),
            data: data.to_string(),
            size: size.to_string(),
            timing: timing.to_string(),
            recommendation: recommendation.to_string(),
        }
    };

    vec![
        sample(
            "Search Functionality",
            [
                "Must have",
                "Medium",
                "Conclusive data",
                "Qualitative and/or Quantitative Data",
                "M",
                "Start",
                "Quantitative A/B Test and/or Deep Qualitative Research",
            ],
        ),
        sample(
            "User Profile Management",
            [
                "Should have",
                "Low",
                "Inconclusive data",
                "Qualitative and/or Quantitative Data",
                "S",
                "Half",
                "Optional Validation (Quantitative or Qualitative)",
            ],
        ),
        sample(
            "Payment Integration",
            [
                "Must have",
                "High",
                "No data",
                "No Research",
                "L",
                "End",
                "Quantitative A/B Test and/or Deep Qualitative Research",
            ],
        ),
        sample(
            "Social Sharing",
            [
                "Could have",
                "Low",
                "Conclusive data",
                "Qualitative and/or Quantitative Data",
                "XS",
                "Half",
                "Optional Validation + Focus groups",
            ],
        ),
        sample(
            "Notification System",
            [
                "Should have",
                "Medium",
                "Inconclusive data",
                "Qualitative and/or Quantitative Data",
                "M",
                "Start",
                "Targeted Qualitative Research",
            ],
        ),
    ]
}

/// Where a feature listing came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSource {
    Remote,
    /// Store reachable but empty, or not configured
    SampleData,
    /// Store failed unexpectedly
    SampleDataFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureListing {
    pub features: Vec<Feature>,
    pub source: FeatureSource,
    pub diagnostic: Option<String>,
}

/// Replace-all persistence of feature records
#[async_trait]
pub trait FeatureStore: Send + Sync {
    /// All records, ordered by name
    async fn list(&self) -> Result<Vec<Feature>>;

    async fn replace_all(&self, features: &[Feature]) -> Result<()>;
}

type FeatureRecord = (String, String, String, String, String, String, String, String);

#[async_trait]
impl FeatureStore for SqlStore {
    async fn list(&self) -> Result<Vec<Feature>> {
        let records: Vec<FeatureRecord> = sqlx::query_as(
            r#"
            SELECT name, priority, risk, confidence, data, size, timing, recommendation
            FROM features
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(records
            .into_iter()
            .map(
                |(name, priority, risk, confidence, data, size, timing, recommendation)| Feature {
                    name,
                    priority,
                    risk,
                    confidence,
                    data,
                    size,
                    timing,
                    recommendation,
                },
            )
            .collect())
    }

    async fn replace_all(&self, features: &[Feature]) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM features").execute(&mut *tx).await?;

        for feature in features {
            sqlx::query(
                r#"
                INSERT INTO features
                    (name, priority, risk, confidence, data, size, timing, recommendation)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&feature.name)
            .bind(&feature.priority)
            .bind(&feature.risk)
            .bind(&feature.confidence)
            .bind(&feature.data)
            .bind(&feature.size)
            .bind(&feature.timing)
            .bind(&feature.recommendation)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl FeatureStore for UnconfiguredRemote {
    async fn list(&self) -> Result<Vec<Feature>> {
        Err(Error::SourceUnavailable("remote store not configured".to_string()))
    }

    async fn replace_all(&self, _features: &[Feature]) -> Result<()> {
        Err(Error::SourceUnavailable("remote store not configured".to_string()))
    }
}

#[async_trait]
impl FeatureStore for ReconnectingStore {
    async fn list(&self) -> Result<Vec<Feature>> {
        FeatureStore::list(self.connect().await?).await
    }

    async fn replace_all(&self, features: &[Feature]) -> Result<()> {
        FeatureStore::replace_all(self.connect().await?, features).await
    }
}

/// Feature operations with timeouts, fallbacks and change events
pub struct FeatureService {
    store: Arc<dyn FeatureStore>,
    timeout: Duration,
    events: EventBus,
    write_lock: Mutex<()>,
}

impl FeatureService {
    pub fn new(store: Arc<dyn FeatureStore>, timeout: Duration, events: EventBus) -> Self {
        Self {
            store,
            timeout,
            events,
            write_lock: Mutex::new(()),
        }
    }

    /// Stored features, or the samples when there are none to show
    pub async fn list(&self) -> FeatureListing {
        match bounded(self.timeout, self.store.list()).await {
            Ok(features) if !features.is_empty() => FeatureListing {
                features,
                source: FeatureSource::Remote,
                diagnostic: None,
            },
            Ok(_) => {
                debug!("No stored features; serving samples");
                FeatureListing {
                    features: sample_features(),
                    source: FeatureSource::SampleData,
                    diagnostic: None,
                }
            }
            Err(e) if e.is_unavailable() => {
                debug!("Feature store unavailable: {}", e);
                FeatureListing {
                    features: sample_features(),
                    source: FeatureSource::SampleData,
                    diagnostic: Some(e.to_string()),
                }
            }
            Err(e) => {
                warn!("Failed to read features: {}", e);
                FeatureListing {
                    features: sample_features(),
                    source: FeatureSource::SampleDataFallback,
                    diagnostic: Some(e.to_string()),
                }
            }
        }
    }

    /// Replace the stored set
    pub async fn replace_all(&self, features: Vec<Feature>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        self.write(&features).await
    }

    async fn write(&self, features: &[Feature]) -> Result<usize> {
        if let Some(blank) = features.iter().position(|f| f.name.trim().is_empty()) {
            return Err(Error::InvalidInput(format!("feature {} has no name", blank + 1)));
        }

        bounded(self.timeout, self.store.replace_all(features)).await?;

        info!("Saved {} features", features.len());
        self.events.emit_lossy(MatrixEvent::FeaturesReplaced {
            count: features.len(),
        });
        Ok(features.len())
    }

    /// Append one record to the stored set
    pub async fn append(&self, feature: Feature) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut features = bounded(self.timeout, self.store.list()).await?;
        features.push(feature);
        self.write(&features).await
    }

    /// Patch every stored record named in `names`, then write the set back.
    /// Returns the number of records changed.
    pub async fn bulk_edit(&self, names: &[String], patch: &FeaturePatch) -> Result<usize> {
        if names.is_empty() {
            return Err(Error::InvalidInput("no features selected".to_string()));
        }
        if patch.is_empty() {
            return Err(Error::InvalidInput("patch has no values".to_string()));
        }

        let _guard = self.write_lock.lock().await;
        let mut features = bounded(self.timeout, self.store.list()).await?;
        let touched = bulk_edit(&mut features, names, patch);
        if touched == 0 {
            return Err(Error::NotFound(format!("none of {} selected features exist", names.len())));
        }

        self.write(&features).await?;
        info!("Bulk-edited {} features", touched);
        Ok(touched)
    }

    /// Replace the stored set with the samples
    pub async fn seed_samples(&self) -> Result<usize> {
        self.replace_all(sample_features()).await
    }
}
