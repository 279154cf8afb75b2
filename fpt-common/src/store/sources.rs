//! Table providers tried by the resolver
//!
//! `try_fetch` returns:
//! - `Ok(Some(snapshot))` when the source has a table
//! - `Ok(None)` when it is reachable but empty
//! - `Err(e)` with `e.is_unavailable()` when it cannot be reached (skip quietly)
//! - any other `Err` when it answered with something unusable

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::cache::{self, LocalCache};
use super::remote::RemoteStore;
use super::{bounded, Snapshot, SourceKind};
use crate::matrix::embedded;
use crate::{Error, Result};

#[async_trait]
pub trait TableSource: Send + Sync {
    fn kind(&self) -> SourceKind;
    async fn try_fetch(&self) -> Result<Option<Snapshot>>;
}

/// Remote store, consulted only after its liveness probe answers in time
pub struct RemoteSource {
    store: Arc<dyn RemoteStore>,
    timeout: Duration,
}

impl RemoteSource {
    pub fn new(store: Arc<dyn RemoteStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }
}

#[async_trait]
impl TableSource for RemoteSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }

    async fn try_fetch(&self) -> Result<Option<Snapshot>> {
        // A failed probe means "not there", whatever the underlying error
        let count = bounded(self.timeout, self.store.probe())
            .await
            .map_err(|e| match e {
                Error::Timeout(ms) => Error::Timeout(ms),
                other => Error::SourceUnavailable(format!("probe failed: {other}")),
            })?;

        if count == 0 {
            return Ok(None);
        }

        let rows = bounded(self.timeout, self.store.fetch_all()).await?;

        let last_modified = match bounded(self.timeout, self.store.last_modified()).await {
            Ok(stamp) => stamp,
            Err(e) => {
                warn!("Remote table read without a modification stamp: {}", e);
                None
            }
        };

        Ok(Some(Snapshot {
            rows,
            last_modified,
        }))
    }
}

/// Last known-good snapshot in the local cache
pub struct CacheSource {
    cache: Arc<dyn LocalCache>,
}

impl CacheSource {
    pub fn new(cache: Arc<dyn LocalCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl TableSource for CacheSource {
    fn kind(&self) -> SourceKind {
        SourceKind::LocalCache
    }

    async fn try_fetch(&self) -> Result<Option<Snapshot>> {
        cache::load_snapshot(self.cache.as_ref()).await
    }
}

/// Compiled-in defaults; never fails
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedSource;

#[async_trait]
impl TableSource for EmbeddedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::EmbeddedDefault
    }

    async fn try_fetch(&self) -> Result<Option<Snapshot>> {
        Ok(Some(Snapshot {
            rows: embedded::embedded_table(),
            last_modified: None,
        }))
    }
}
