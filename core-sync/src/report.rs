//! Outcome records returned by sync operations.

use core_library::{RemoteApplyOutcome, SongId};
use std::fmt;
use std::time::Duration;

/// Remote operation attempted for one song
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Upload,
    Delete,
    /// Merging a pulled snapshot into the store
    Apply,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::Upload => "upload",
            SyncOperation::Delete => "delete",
            SyncOperation::Apply => "apply",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single song that could not be synchronized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub song_id: SongId,
    pub operation: SyncOperation,
    pub message: String,
    /// Whether the next sync is expected to retry successfully
    pub recoverable: bool,
}

/// Result of pushing pending local changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Uploads acknowledged and marked `Synced`
    pub pushed: Vec<SongId>,
    /// Remote deletions acknowledged and purged locally
    pub deleted: Vec<SongId>,
    /// Uploads or deletes acknowledged after a local edit superseded them;
    /// these stay pending for the next sync
    pub superseded: Vec<SongId>,
    pub failures: Vec<SyncFailure>,
    pub duration: Duration,
}

impl SyncReport {
    pub fn attempted(&self) -> usize {
        self.pushed.len() + self.deleted.len() + self.superseded.len() + self.failures.len()
    }

    /// True when every pending song was settled.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.superseded.is_empty()
    }
}

/// Result of merging the remote library into the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    pub fetched: usize,
    pub created: usize,
    pub replaced: usize,
    pub unchanged: usize,
    /// Remote songs ignored because the local copy has pending changes
    pub skipped_pending: usize,
    /// Remote songs that could not be applied
    pub failures: Vec<SyncFailure>,
}

impl PullReport {
    pub(crate) fn record(&mut self, outcome: RemoteApplyOutcome) {
        match outcome {
            RemoteApplyOutcome::Created => self.created += 1,
            RemoteApplyOutcome::Replaced => self.replaced += 1,
            RemoteApplyOutcome::Unchanged => self.unchanged += 1,
            RemoteApplyOutcome::SkippedPending => self.skipped_pending += 1,
        }
    }
}

/// Push followed by an optional pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynchronizeReport {
    pub push: SyncReport,
    /// `None` when pulling after a push is disabled
    pub pull: Option<PullReport>,
}
