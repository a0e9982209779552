//! # Core Configuration Module
//!
//! Provides configuration management for the library engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding every collaborator and setting the engine needs. It enforces
//! fail-fast validation: the remote sync client and the vibe classifier have
//! no sensible default and must be injected before the core can start.
//!
//! ## Required Dependencies
//!
//! - `RemoteSyncClient` - Backend that stores the user's songs and tags
//! - `VibeClassifier` - AI port producing vibe tags
//!
//! ## Optional Dependencies
//!
//! - `TextSanitizer` - Prompt sanitizer (the composition layer supplies a default)
//! - `Clock` - Time source (defaults to `SystemClock`)
//! - Database path - Persist the library to SQLite (in-memory when absent)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, SyncSettings};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/library.db")
//!     .remote_client(Arc::new(MyBackendClient::new()))
//!     .classifier(Arc::new(MyVibeClassifier::new()))
//!     .sync_settings(SyncSettings::default().with_request_timeout_secs(15))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! The builder returns [`Error::CapabilityMissing`] with an actionable message
//! when a required collaborator is absent, and [`Error::InvalidSetting`] when
//! a numeric setting is out of range.

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, RemoteSyncClient, SystemClock, TextSanitizer, VibeClassifier};
use std::path::PathBuf;
use std::sync::Arc;

/// Settings for the sync coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Upper bound for a single remote call (push, delete or fetch), in seconds
    pub request_timeout_secs: u64,

    /// Whether a full synchronization pulls remote data after pushing
    pub pull_after_push: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            pull_after_push: true,
        }
    }
}

impl SyncSettings {
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_pull_after_push(mut self, enabled: bool) -> Self {
        self.pull_after_push = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(Error::InvalidSetting {
                setting: "request_timeout_secs",
                message: "must be greater than 0 seconds".to_string(),
            });
        }

        if self.request_timeout_secs > 3600 {
            return Err(Error::InvalidSetting {
                setting: "request_timeout_secs",
                message: "exceeds maximum of 1 hour (3600 seconds)".to_string(),
            });
        }

        Ok(())
    }
}

/// Settings for the analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// Maximum number of classifier tags attached to one song per run
    pub max_tags_per_song: usize,

    /// Maximum characters of free text forwarded to the classifier
    pub max_prompt_chars: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_tags_per_song: 8,
            max_prompt_chars: 500,
        }
    }
}

impl AnalysisSettings {
    pub fn with_max_tags_per_song(mut self, max: usize) -> Self {
        self.max_tags_per_song = max;
        self
    }

    pub fn with_max_prompt_chars(mut self, max: usize) -> Self {
        self.max_prompt_chars = max;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tags_per_song == 0 {
            return Err(Error::InvalidSetting {
                setting: "max_tags_per_song",
                message: "must allow at least one tag".to_string(),
            });
        }

        if self.max_prompt_chars == 0 {
            return Err(Error::InvalidSetting {
                setting: "max_prompt_chars",
                message: "must allow at least one character".to_string(),
            });
        }

        Ok(())
    }
}

/// Core configuration for the library engine.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// SQLite database file; `None` keeps the library in memory only
    pub database_path: Option<PathBuf>,

    /// Remote backend client (required)
    pub remote_client: Arc<dyn RemoteSyncClient>,

    /// AI vibe classifier (required)
    pub classifier: Arc<dyn VibeClassifier>,

    /// Prompt sanitizer; the composition layer falls back to its default
    pub sanitizer: Option<Arc<dyn TextSanitizer>>,

    /// Time source
    pub clock: Arc<dyn Clock>,

    pub sync: SyncSettings,

    pub analysis: AnalysisSettings,

    /// Event bus channel capacity
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("remote_client", &"RemoteSyncClient { ... }")
            .field("classifier", &"VibeClassifier { ... }")
            .field(
                "sanitizer",
                &self.sanitizer.as_ref().map(|_| "TextSanitizer { ... }"),
            )
            .field("sync", &self.sync)
            .field("analysis", &self.analysis)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Create a new configuration builder
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validate settings that were set directly on the struct.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(Error::InvalidSetting {
                setting: "event_buffer_size",
                message: "must be greater than 0".to_string(),
            });
        }

        self.sync.validate()?;
        self.analysis.validate()?;

        Ok(())
    }
}

fn remote_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "RemoteSyncClient".to_string(),
        message: "A RemoteSyncClient implementation is required to push and pull the library. \
                 Inject the host's backend client with .remote_client()."
            .to_string(),
    }
}

fn classifier_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "VibeClassifier".to_string(),
        message: "A VibeClassifier implementation is required for library analysis. \
                 Inject the host's AI client with .classifier()."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`]
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    remote_client: Option<Arc<dyn RemoteSyncClient>>,
    classifier: Option<Arc<dyn VibeClassifier>>,
    sanitizer: Option<Arc<dyn TextSanitizer>>,
    clock: Option<Arc<dyn Clock>>,
    sync: SyncSettings,
    analysis: AnalysisSettings,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn remote_client(mut self, client: Arc<dyn RemoteSyncClient>) -> Self {
        self.remote_client = Some(client);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn VibeClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn sanitizer(mut self, sanitizer: Arc<dyn TextSanitizer>) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn sync_settings(mut self, settings: SyncSettings) -> Self {
        self.sync = settings;
        self
    }

    pub fn analysis_settings(mut self, settings: AnalysisSettings) -> Self {
        self.analysis = settings;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a required collaborator is missing or a setting is
    /// out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let remote_client = self.remote_client.ok_or_else(remote_client_missing_error)?;
        let classifier = self.classifier.ok_or_else(classifier_missing_error)?;

        let config = CoreConfig {
            database_path: self.database_path,
            remote_client,
            classifier,
            sanitizer: self.sanitizer,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            sync: self.sync,
            analysis: self.analysis,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
