//! Matrix service
//!
//! Owns the table currently in effect. Reads are cheap snapshots of an
//! `Arc<Table>`. Refreshes and replaces are serialized on one lock, so
//! modification stamps strictly increase within the process and a slow
//! resolution can never land on top of a newer replace.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use super::embedded;
use super::engine::{self, MatchOutcome};
use super::query::FeatureQuery;
use crate::events::{EventBus, MatrixEvent};
use crate::model::Table;
use crate::store::{ReplaceOutcome, ResolutionResult, Resolver, SourceKind};
use crate::time;
use crate::{Error, Result};

/// Table in effect plus where it came from
#[derive(Debug, Clone)]
pub struct MatrixState {
    pub rows: Arc<Table>,
    pub source: SourceKind,
    pub last_modified: Option<DateTime<Utc>>,
    pub diagnostic: Option<String>,
}

impl MatrixState {
    fn embedded() -> Self {
        Self {
            rows: Arc::new(embedded::embedded_table()),
            source: SourceKind::EmbeddedDefault,
            last_modified: None,
            diagnostic: None,
        }
    }
}

/// How long a resolved table is served before reads resolve again
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5);

/// Whether a resolved table is older than the one already in effect.
/// An unstamped table never displaces a stamped one.
fn is_stale(resolved: Option<DateTime<Utc>>, current: Option<DateTime<Utc>>) -> bool {
    match (resolved, current) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(resolved), Some(current)) => resolved < current,
    }
}

pub struct MatrixService {
    resolver: Resolver,
    state: RwLock<MatrixState>,
    write_lock: Mutex<()>,
    resolved_at: RwLock<Option<Instant>>,
    max_age: Duration,
    events: EventBus,
}

impl MatrixService {
    /// Start out serving the embedded defaults; call `refresh` to resolve
    pub fn new(resolver: Resolver, events: EventBus) -> Self {
        Self {
            resolver,
            state: RwLock::new(MatrixState::embedded()),
            write_lock: Mutex::new(()),
            resolved_at: RwLock::new(None),
            max_age: DEFAULT_MAX_AGE,
            events,
        }
    }

    /// Re-resolve on read once the table in effect is older than `max_age`
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MatrixEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> MatrixState {
        self.state.read().await.clone()
    }

    pub async fn table(&self) -> Arc<Table> {
        Arc::clone(&self.state.read().await.rows)
    }

    /// Table in effect, resolved again first if it has gone stale
    pub async fn current_table(&self) -> Arc<Table> {
        self.refresh_if_stale().await;
        self.table().await
    }

    /// Refresh when nothing was resolved within `max_age`
    pub async fn refresh_if_stale(&self) {
        let due = match *self.resolved_at.read().await {
            Some(at) => at.elapsed() >= self.max_age,
            None => true,
        };
        if due {
            self.refresh().await;
        }
    }

    /// Re-run resolution and swap in whatever it produced.
    ///
    /// A resolved table stamped older than the one in effect is not swapped
    /// in; it is what another writer (or this one, before a downgraded
    /// replace) left behind.
    pub async fn refresh(&self) -> ResolutionResult {
        let _guard = self.write_lock.lock().await;

        let result = self.resolver.resolve().await;
        *self.resolved_at.write().await = Some(Instant::now());

        if !result.success {
            warn!("Refresh produced no table; keeping the current one");
            return result;
        }

        let mut state = self.state.write().await;
        if is_stale(result.last_modified, state.last_modified) {
            debug!(
                "Resolved table from {} is older than the one in effect; keeping it",
                result.source
            );
            return result;
        }

        *state = MatrixState {
            rows: Arc::new(result.rows.clone()),
            source: result.source,
            last_modified: result.last_modified,
            diagnostic: result.diagnostic.clone(),
        };
        drop(state);

        self.events.emit_lossy(MatrixEvent::TableRefreshed {
            row_count: result.rows.len(),
            source: result.source,
            last_modified: result.last_modified,
        });

        result
    }

    /// Replace the whole table.
    ///
    /// Empty tables are rejected before anything is written. Otherwise the
    /// outcome always comes back, downgraded rather than failed when the
    /// remote store is down.
    pub async fn replace(&self, rows: Table) -> Result<ReplaceOutcome> {
        if rows.is_empty() {
            return Err(Error::InvalidInput("matrix must contain at least one row".to_string()));
        }

        let _guard = self.write_lock.lock().await;

        let previous = self.state.read().await.last_modified;
        let stamp = time::next_stamp(previous);

        let outcome = self.resolver.replace(&rows, stamp).await;
        if !outcome.success {
            warn!("Matrix replace persisted nowhere; in-memory table unchanged");
            return Ok(outcome);
        }

        let row_count = rows.len();
        *self.state.write().await = MatrixState {
            rows: Arc::new(rows),
            source: outcome.source,
            last_modified: Some(outcome.last_modified),
            diagnostic: outcome.warning.clone(),
        };

        info!(
            "Matrix replaced: {} rows, stored in {}, stamped {}",
            row_count,
            outcome.source,
            time::to_iso(outcome.last_modified)
        );

        self.events.emit_lossy(MatrixEvent::TableReplaced {
            row_count,
            source: outcome.source,
            last_modified: outcome.last_modified,
            warning: outcome.warning.clone(),
        });

        Ok(outcome)
    }

    /// Replace the table with the embedded defaults
    pub async fn seed_defaults(&self) -> Result<ReplaceOutcome> {
        self.replace(embedded::embedded_table()).await
    }

    /// Match a query against the table in effect
    pub async fn recommend(&self, query: &FeatureQuery) -> MatchOutcome {
        let table = self.current_table().await;
        engine::recommend_detailed(&table, query)
    }
}
