//! # Sync Coordinator
//!
//! Reconciles the [`LibraryStore`] with the remote backend.
//!
//! ## Workflow
//!
//! ### Push (`sync_pending_changes`)
//! 1. Read `songs_needing_sync()` from the store
//! 2. `PendingUpload`: push the song and its tags, then `acknowledge_upload`
//!    with the revision that was pushed
//! 3. `PendingDelete`: delete remotely, then `acknowledge_delete`
//! 4. Record per-song failures and keep going
//!
//! ### Pull (`pull_remote_data`)
//! 1. Fetch the full remote library; a failed fetch aborts before any write
//! 2. Convert each snapshot and merge it with `apply_remote_song`
//!
//! An acknowledgment for a revision that was edited while the push was in
//! flight is refused by the store, so the song stays pending and the next
//! push carries the newer state.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncCoordinator, SyncEngine};
//!
//! let coordinator = SyncCoordinator::new(store, remote, event_bus, clock, settings);
//! let report = coordinator.synchronize().await?;
//! println!("pushed {} songs", report.push.pushed.len());
//! ```

use crate::engine::{SyncEngine, SyncState};
use crate::error::{Result, SyncError};
use crate::merge::{song_from_remote, tags_from_remote, to_remote_snapshot};
use crate::report::{PullReport, SyncFailure, SyncOperation, SyncReport, SynchronizeReport};
use async_trait::async_trait;
use bridge_traits::{BridgeError, Clock, RemoteSyncClient};
use core_library::{LibrarySong, LibraryStore, SongId, SyncStatus};
use core_runtime::config::SyncSettings;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// Marks the coordinator busy for the lifetime of one operation.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SyncError::SyncInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Push/pull orchestration over a shared [`LibraryStore`].
pub struct SyncCoordinator {
    store: Arc<LibraryStore>,
    remote: Arc<dyn RemoteSyncClient>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    settings: SyncSettings,
    running: AtomicBool,
    state: RwLock<SyncState>,
}

impl SyncCoordinator {
    pub fn new(
        store: Arc<LibraryStore>,
        remote: Arc<dyn RemoteSyncClient>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            store,
            remote,
            event_bus,
            clock,
            settings,
            running: AtomicBool::new(false),
            state: RwLock::new(SyncState::default()),
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        self.event_bus.emit(CoreEvent::Sync(event)).ok();
    }

    /// Run one remote call under the request timeout.
    async fn call_remote<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, BridgeError>>,
    {
        let secs = self.settings.request_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(secs), call).await {
            Ok(result) => result.map_err(SyncError::from),
            Err(_) => Err(SyncError::Timeout { operation, secs }),
        }
    }

    async fn finish(&self, last_error: Option<String>) {
        let mut state = self.state.write().await;
        state.last_synced_at = Some(self.clock.now());
        state.last_error = last_error;
    }

    async fn upload(&self, entry: &LibrarySong) -> Result<bool> {
        let snapshot = to_remote_snapshot(entry);
        self.call_remote("push_song", self.remote.push_song(&snapshot))
            .await?;
        Ok(self.store.acknowledge_upload(entry.id(), entry.revision).await?)
    }

    async fn delete(&self, id: &SongId) -> Result<bool> {
        self.call_remote("delete_song_remote", self.remote.delete_song_remote(id.as_str()))
            .await?;
        Ok(self.store.acknowledge_delete(id).await?)
    }

    fn record_failure(
        &self,
        failures: &mut Vec<SyncFailure>,
        song_id: &SongId,
        operation: SyncOperation,
        error: SyncError,
    ) {
        let recoverable = error.is_recoverable();
        let message = error.to_string();
        warn!(song_id = %song_id, %operation, recoverable, error = %message, "Song sync failed");

        if operation != SyncOperation::Apply {
            self.emit(SyncEvent::SongFailed {
                song_id: song_id.to_string(),
                message: message.clone(),
                recoverable,
            });
        }
        failures.push(SyncFailure {
            song_id: song_id.clone(),
            operation,
            message,
            recoverable,
        });
    }

    async fn push(&self) -> SyncReport {
        let started = Instant::now();
        let pending = self.store.songs_needing_sync().await;
        let mut report = SyncReport::default();

        info!(pending = pending.len(), "Pushing pending changes");
        self.emit(SyncEvent::PushStarted {
            pending: pending.len() as u64,
        });

        for entry in &pending {
            let id = entry.id();
            match entry.status {
                SyncStatus::PendingUpload => match self.upload(entry).await {
                    Ok(true) => {
                        debug!(song_id = %id, revision = entry.revision, "Upload acknowledged");
                        self.emit(SyncEvent::SongPushed {
                            song_id: id.to_string(),
                        });
                        report.pushed.push(id.clone());
                    }
                    Ok(false) => {
                        debug!(song_id = %id, "Song changed during upload; left pending");
                        report.superseded.push(id.clone());
                    }
                    Err(e) => self.record_failure(&mut report.failures, id, SyncOperation::Upload, e),
                },
                SyncStatus::PendingDelete => match self.delete(id).await {
                    Ok(true) => {
                        debug!(song_id = %id, "Delete acknowledged");
                        self.emit(SyncEvent::SongDeleted {
                            song_id: id.to_string(),
                        });
                        report.deleted.push(id.clone());
                    }
                    Ok(false) => {
                        debug!(song_id = %id, "Song restored during delete; left pending");
                        report.superseded.push(id.clone());
                    }
                    Err(e) => self.record_failure(&mut report.failures, id, SyncOperation::Delete, e),
                },
                SyncStatus::Synced => {}
            }
        }

        report.duration = started.elapsed();
        info!(
            pushed = report.pushed.len(),
            deleted = report.deleted.len(),
            superseded = report.superseded.len(),
            failed = report.failures.len(),
            duration_ms = report.duration.as_millis() as u64,
            "Push completed"
        );
        self.emit(SyncEvent::PushCompleted {
            pushed: report.pushed.len() as u64,
            deleted: report.deleted.len() as u64,
            failed: report.failures.len() as u64,
            duration_ms: report.duration.as_millis() as u64,
        });

        report
    }

    async fn pull(&self) -> Result<PullReport> {
        let remote_songs = match self
            .call_remote("fetch_all_remote", self.remote.fetch_all_remote())
            .await
        {
            Ok(songs) => songs,
            Err(e) => {
                warn!(error = %e, "Remote fetch failed; library left untouched");
                self.emit(SyncEvent::PullFailed {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let mut report = PullReport {
            fetched: remote_songs.len(),
            ..PullReport::default()
        };
        let date_added = self.clock.unix_timestamp();

        for remote in &remote_songs {
            let song = song_from_remote(remote, date_added);
            let id = song.id.clone();
            let tags = tags_from_remote(&remote.tags);

            match self.store.apply_remote_song(song, tags).await {
                Ok(outcome) => {
                    debug!(song_id = %id, ?outcome, "Remote song applied");
                    report.record(outcome);
                }
                Err(e) => {
                    self.record_failure(&mut report.failures, &id, SyncOperation::Apply, e.into())
                }
            }
        }

        info!(
            fetched = report.fetched,
            created = report.created,
            replaced = report.replaced,
            unchanged = report.unchanged,
            skipped = report.skipped_pending,
            failed = report.failures.len(),
            "Remote library merged"
        );
        self.emit(SyncEvent::PullCompleted {
            fetched: report.fetched as u64,
            created: report.created as u64,
            replaced: report.replaced as u64,
            skipped: report.skipped_pending as u64,
        });

        Ok(report)
    }
}

fn failure_summary(failures: &[SyncFailure]) -> Option<String> {
    let first = failures.first()?;
    Some(format!(
        "{} song(s) failed to sync; first {} {}: {}",
        failures.len(),
        first.operation,
        first.song_id,
        first.message
    ))
}

#[async_trait]
impl SyncEngine for SyncCoordinator {
    #[instrument(skip(self))]
    async fn sync_pending_changes(&self) -> Result<SyncReport> {
        let _guard = RunGuard::acquire(&self.running)?;
        let report = self.push().await;
        self.finish(failure_summary(&report.failures)).await;
        Ok(report)
    }

    #[instrument(skip(self))]
    async fn pull_remote_data(&self) -> Result<PullReport> {
        let _guard = RunGuard::acquire(&self.running)?;
        match self.pull().await {
            Ok(report) => {
                self.finish(failure_summary(&report.failures)).await;
                Ok(report)
            }
            Err(e) => {
                self.state.write().await.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    async fn synchronize(&self) -> Result<SynchronizeReport> {
        let _guard = RunGuard::acquire(&self.running)?;
        let push = self.push().await;

        if !self.settings.pull_after_push {
            self.finish(failure_summary(&push.failures)).await;
            return Ok(SynchronizeReport { push, pull: None });
        }

        match self.pull().await {
            Ok(pull) => {
                let last_error =
                    failure_summary(&push.failures).or_else(|| failure_summary(&pull.failures));
                self.finish(last_error).await;
                Ok(SynchronizeReport {
                    push,
                    pull: Some(pull),
                })
            }
            Err(e) => {
                // The push half did complete.
                self.finish(Some(e.to_string())).await;
                Err(e)
            }
        }
    }

    async fn status(&self) -> SyncState {
        let mut state = self.state.read().await.clone();
        state.is_syncing = self.running.load(Ordering::Acquire);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{FixedClock, RemoteSongSyncInfo};
    use chrono::{TimeZone, Utc};
    use core_library::{Song, Tag};
    use mockall::mock;

    mock! {
        Remote {}

        #[async_trait]
        impl RemoteSyncClient for Remote {
            async fn push_song(&self, song: &RemoteSongSyncInfo) -> bridge_traits::error::Result<()>;
            async fn delete_song_remote(&self, song_id: &str) -> bridge_traits::error::Result<()>;
            async fn fetch_all_remote(&self) -> bridge_traits::error::Result<Vec<RemoteSongSyncInfo>>;
        }
    }

    fn coordinator(remote: MockRemote, store: Arc<LibraryStore>) -> SyncCoordinator {
        let clock = FixedClock(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap());
        SyncCoordinator::new(
            store,
            Arc::new(remote),
            EventBus::new(16),
            Arc::new(clock),
            SyncSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_guard_rejects_second_holder() {
        let flag = AtomicBool::new(false);
        let guard = RunGuard::acquire(&flag).unwrap();
        assert!(matches!(RunGuard::acquire(&flag), Err(SyncError::SyncInProgress)));
        drop(guard);
        assert!(RunGuard::acquire(&flag).is_ok());
    }

    #[tokio::test]
    async fn test_status_records_clock_time() {
        let store = Arc::new(LibraryStore::in_memory());
        store
            .upsert_song(Song::new("s1", "Teardrop", "Massive Attack"), vec![Tag::user("dark")])
            .await
            .unwrap();

        let mut remote = MockRemote::new();
        remote.expect_push_song().times(1).returning(|_| Ok(()));
        let coordinator = coordinator(remote, store);

        assert_eq!(coordinator.status().await, SyncState::default());
        coordinator.sync_pending_changes().await.unwrap();

        let status = coordinator.status().await;
        assert!(!status.is_syncing);
        assert_eq!(
            status.last_synced_at,
            Some(Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(status.last_error, None);
    }

    #[test]
    fn test_failure_summary() {
        assert_eq!(failure_summary(&[]), None);

        let failures = vec![SyncFailure {
            song_id: SongId::from("s9"),
            operation: SyncOperation::Delete,
            message: "boom".to_string(),
            recoverable: true,
        }];
        let summary = failure_summary(&failures).unwrap();
        assert!(summary.starts_with("1 song(s) failed"));
        assert!(summary.contains("delete s9: boom"));
    }
}
