//! Resolution strategy
//!
//! Produces the table currently in effect and persists replacements. Every
//! store error is absorbed here and reported as a tag, warning or
//! diagnostic on the result.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::cache::{self, LocalCache};
use super::remote::RemoteStore;
use super::sources::{CacheSource, EmbeddedSource, RemoteSource, TableSource};
use super::{bounded, ReplaceOutcome, ResolutionResult, SourceKind};
use crate::model::Row;

pub struct Resolver {
    sources: Vec<Arc<dyn TableSource>>,
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn LocalCache>,
    timeout: Duration,
}

impl Resolver {
    /// Standard chain: remote, then local cache, then embedded defaults
    pub fn new(remote: Arc<dyn RemoteStore>, cache: Arc<dyn LocalCache>, timeout: Duration) -> Self {
        let sources: Vec<Arc<dyn TableSource>> = vec![
            Arc::new(RemoteSource::new(Arc::clone(&remote), timeout)),
            Arc::new(CacheSource::new(Arc::clone(&cache))),
            Arc::new(EmbeddedSource),
        ];

        Self {
            sources,
            remote,
            cache,
            timeout,
        }
    }

    /// Replace the provider chain, keeping the write sinks
    pub fn with_sources(mut self, sources: Vec<Arc<dyn TableSource>>) -> Self {
        self.sources = sources;
        self
    }

    /// Current table from the first source that has one
    pub async fn resolve(&self) -> ResolutionResult {
        let mut notes: Vec<String> = Vec::new();
        let mut failed = false;

        for source in &self.sources {
            let kind = source.kind();
            match source.try_fetch().await {
                Ok(Some(snapshot)) if !snapshot.rows.is_empty() => {
                    if kind == SourceKind::Remote {
                        self.mirror_to_cache(&snapshot.rows, snapshot.last_modified)
                            .await;
                    }

                    let source = if kind == SourceKind::EmbeddedDefault && failed {
                        SourceKind::EmbeddedDefaultFallback
                    } else {
                        kind
                    };

                    info!("Matrix resolved from {}: {} rows", source, snapshot.rows.len());
                    return ResolutionResult {
                        rows: snapshot.rows,
                        success: true,
                        source,
                        last_modified: snapshot.last_modified,
                        diagnostic: (!notes.is_empty()).then(|| notes.join("; ")),
                    };
                }
                Ok(_) => {
                    debug!("{} has no rows, trying next source", kind);
                }
                Err(e) if e.is_unavailable() => {
                    debug!("{} unavailable: {}", kind, e);
                    notes.push(format!("{kind} unavailable: {e}"));
                }
                Err(e) => {
                    warn!("{} failed: {}", kind, e);
                    notes.push(format!("{kind} failed: {e}"));
                    failed = true;
                }
            }
        }

        error!("No table source produced data");
        ResolutionResult {
            rows: Vec::new(),
            success: false,
            source: SourceKind::EmbeddedDefaultFallback,
            last_modified: None,
            diagnostic: Some(if notes.is_empty() {
                "no source produced data".to_string()
            } else {
                notes.join("; ")
            }),
        }
    }

    /// Best-effort copy of a remote table into the cache. A cached table
    /// stamped later than the remote one is kept.
    async fn mirror_to_cache(&self, rows: &[Row], last_modified: Option<DateTime<Utc>>) {
        if let Ok(Some(cached)) = cache::load_stamp(self.cache.as_ref()).await {
            if last_modified.map_or(true, |remote| remote < cached) {
                debug!("Local cache holds a newer table; not mirroring the remote one");
                return;
            }
        }

        let stamp = last_modified.unwrap_or_else(crate::time::now);
        if let Err(e) = cache::store_snapshot(self.cache.as_ref(), rows, stamp).await {
            warn!("Failed to mirror remote table into local cache: {}", e);
        }
    }

    /// Persist a whole table: local cache first, then the remote store.
    ///
    /// A remote failure downgrades the outcome instead of failing it; only
    /// when neither sink accepted the write is `success` false.
    pub async fn replace(&self, rows: &[Row], stamp: DateTime<Utc>) -> ReplaceOutcome {
        let cached = cache::store_snapshot(self.cache.as_ref(), rows, stamp).await;
        if let Err(e) = &cached {
            error!("Local cache write failed: {}", e);
        }

        let remote = bounded(self.timeout, self.remote.replace_all(rows, stamp)).await;
        if let Err(e) = &remote {
            warn!("Remote write failed ({}): {}", self.remote.describe(), e);
        }

        let outcome = |success, source, warning, diagnostic| ReplaceOutcome {
            success,
            source,
            last_modified: stamp,
            warning,
            diagnostic,
        };

        match (cached, remote) {
            (Ok(()), Ok(())) => outcome(true, SourceKind::Remote, None, None),
            (Ok(()), Err(e)) => outcome(
                true,
                SourceKind::LocalCache,
                Some(format!(
                    "Could not save to remote store ({e}); data is saved in the local cache only"
                )),
                None,
            ),
            (Err(e), Ok(())) => outcome(
                true,
                SourceKind::Remote,
                Some(format!("Saved to remote store but the local cache write failed ({e})")),
                None,
            ),
            (Err(cache_err), Err(remote_err)) => outcome(
                false,
                SourceKind::LocalCache,
                None,
                Some(format!(
                    "Nothing was saved: local cache write failed ({cache_err}); remote write failed ({remote_err})"
                )),
            ),
        }
    }
}
