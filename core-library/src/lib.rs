//! # Library Module
//!
//! Owns the on-device music library: songs, mood/vibe tags and each song's
//! synchronization status.
//!
//! ## Overview
//!
//! - [`models`] - `Song`, `Tag`, `SyncStatus` and the other domain values
//! - [`dedup`] - name-based tag deduplication
//! - [`store`] - `LibraryStore`, the authoritative state and its status machine
//! - [`db`] / [`repositories`] - SQLite persistence with embedded migrations

pub mod db;
pub mod dedup;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use dedup::{contains_name, dedup_by_name, Named};
pub use error::{LibraryError, Result};
pub use models::{LibrarySong, Song, SongId, SyncStatus, Tag, TagColor, TagId, TagKind};
pub use repositories::{LibraryRepository, SqliteLibraryRepository};
pub use store::{LibraryStore, RemoteApplyOutcome};
