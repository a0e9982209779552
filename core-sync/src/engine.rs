//! The synchronization surface exposed to callers.

use crate::error::Result;
use crate::report::{PullReport, SyncReport, SynchronizeReport};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Observable synchronization status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncState {
    pub is_syncing: bool,
    /// When the last push or pull finished
    pub last_synced_at: Option<DateTime<Utc>>,
    /// Error or per-song failure summary of the last run, cleared by a clean run
    pub last_error: Option<String>,
}

/// Reconciles the local library with the remote backend.
///
/// Only one operation runs at a time per engine; overlapping calls fail with
/// [`SyncError::SyncInProgress`](crate::SyncError::SyncInProgress).
#[async_trait]
pub trait SyncEngine: Send + Sync {
    /// Push every song whose status is not `Synced`.
    ///
    /// Per-song failures are reported, not returned: the song keeps its status
    /// and is retried by the next call.
    async fn sync_pending_changes(&self) -> Result<SyncReport>;

    /// Fetch the remote library and merge it into the store.
    ///
    /// # Errors
    /// Fails as a whole, with the store untouched, if the fetch fails.
    async fn pull_remote_data(&self) -> Result<PullReport>;

    /// Push pending changes, then pull (unless pulling after a push is disabled).
    async fn synchronize(&self) -> Result<SynchronizeReport>;

    async fn status(&self) -> SyncState;
}
