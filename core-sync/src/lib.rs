//! # Library Sync
//!
//! Keeps the local library and the remote backend in agreement.
//!
//! ## Components
//!
//! - **Engine** (`engine`): the [`SyncEngine`] trait and observable [`SyncState`]
//! - **Coordinator** (`coordinator`): push/pull orchestration over a
//!   `LibraryStore` and a `RemoteSyncClient`
//! - **Merge** (`merge`): conversion between library values and remote snapshots
//! - **Reports** (`report`): per-run outcomes and per-song failures
//!
//! Local pending intent always wins: pulling never overwrites or deletes a
//! song that still has changes waiting to be pushed.

pub mod coordinator;
pub mod engine;
pub mod error;
pub mod merge;
pub mod report;

pub use coordinator::SyncCoordinator;
pub use engine::{SyncEngine, SyncState};
pub use error::{Result, SyncError};
pub use report::{PullReport, SyncFailure, SyncOperation, SyncReport, SynchronizeReport};
