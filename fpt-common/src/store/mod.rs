//! Table storage and tiered resolution
//!
//! The matrix can come from three places, tried in order:
//! 1. Remote relational store (only when its liveness probe answers in time)
//! 2. Local cache (last known-good snapshot)
//! 3. Embedded defaults (compiled in, always present)
//!
//! Store failures are values here, never panics, and they stop at the
//! resolver boundary: callers only see a tagged result.

pub mod cache;
pub mod remote;
pub mod resolver;
pub mod sources;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Table;
use crate::{Error, Result};

pub use cache::{FileCache, LocalCache, MemoryCache};
pub use remote::{ReconnectingStore, RemoteStore, SqlStore, UnconfiguredRemote};
pub use resolver::Resolver;
pub use sources::{CacheSource, EmbeddedSource, RemoteSource, TableSource};

/// Which backing store supplied a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Remote,
    LocalCache,
    EmbeddedDefault,
    /// Embedded defaults served because an upstream source failed outright
    EmbeddedDefaultFallback,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Remote => "remote",
            SourceKind::LocalCache => "local_cache",
            SourceKind::EmbeddedDefault => "embedded_default",
            SourceKind::EmbeddedDefaultFallback => "embedded_default_fallback",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table as read from one source
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub rows: Table,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Outcome of resolving the current table
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub rows: Table,
    /// True whenever any table was returned
    pub success: bool,
    pub source: SourceKind,
    pub last_modified: Option<DateTime<Utc>>,
    /// Why higher-priority sources were passed over, if any were
    pub diagnostic: Option<String>,
}

/// Outcome of a whole-table replace
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceOutcome {
    pub success: bool,
    /// `Remote` when the remote write landed, `LocalCache` when downgraded
    pub source: SourceKind,
    pub last_modified: DateTime<Utc>,
    /// Partial-write notice (one sink failed, the other held)
    pub warning: Option<String>,
    /// Set only when nothing could be persisted
    pub diagnostic: Option<String>,
}

/// Run a remote call under a latency ceiling; expiry becomes `Error::Timeout`
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(timeout.as_millis() as u64)),
    }
}
