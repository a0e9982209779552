//! # Host Bridge Traits
//!
//! Port traits the library engine consumes but never implements itself.
//!
//! ## Overview
//!
//! This crate defines the contract between the core and the collaborators that
//! live outside it: the AI vibe classifier, the remote backend that stores the
//! user's library, and the text sanitizer applied before free text reaches a
//! prompt. Host applications (or tests) provide concrete implementations and
//! inject them through `core_runtime::config::CoreConfig`.
//!
//! ## Traits
//!
//! ### Remote collaborators
//! - [`VibeClassifier`](classifier::VibeClassifier) - Mood/vibe tagging for songs and free-text prompts
//! - [`RemoteSyncClient`](remote::RemoteSyncClient) - Push, delete and fetch song snapshots on the backend
//!
//! ### Utilities
//! - [`TextSanitizer`](sanitizer::TextSanitizer) - Normalize text before it is embedded in a prompt
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should map transport or upstream failures onto the matching variant so the
//! core can tell a retryable transport failure from a malformed classifier
//! response.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`; the core shares implementations across
//! async tasks behind `Arc<dyn Trait>`.
//!
//! ## Examples
//!
//! ### Implementing RemoteSyncClient
//!
//! ```ignore
//! use async_trait::async_trait;
//! use bridge_traits::error::Result;
//! use bridge_traits::remote::{RemoteSongSyncInfo, RemoteSyncClient};
//!
//! pub struct BackendClient {
//!     http: reqwest::Client,
//!     base_url: String,
//! }
//!
//! #[async_trait]
//! impl RemoteSyncClient for BackendClient {
//!     async fn push_song(&self, song: &RemoteSongSyncInfo) -> Result<()> {
//!         // PUT {base_url}/songs/{id}
//!         todo!()
//!     }
//!
//!     async fn delete_song_remote(&self, song_id: &str) -> Result<()> {
//!         todo!()
//!     }
//!
//!     async fn fetch_all_remote(&self) -> Result<Vec<RemoteSongSyncInfo>> {
//!         todo!()
//!     }
//! }
//! ```

pub mod classifier;
pub mod error;
pub mod remote;
pub mod sanitizer;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use classifier::{AnalyzedTag, VibeClassifier};
pub use remote::{RemoteSongSyncInfo, RemoteSyncClient, RemoteTagSyncInfo};
pub use sanitizer::{IdentitySanitizer, TextSanitizer};
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
