//! Engine façade and bootstrap.
//!
//! [`VibeCore::bootstrap`] turns a validated [`CoreConfig`] into a running
//! engine: the library store (SQLite-backed when a database path is set,
//! in-memory otherwise), the event bus, the sync coordinator and the analysis
//! pipeline, all sharing one store.
//!
//! ```rust,ignore
//! use core_service::{CoreConfig, VibeCore};
//!
//! let config = CoreConfig::builder()
//!     .database_path("library.db")
//!     .remote_client(remote)
//!     .classifier(classifier)
//!     .build()?;
//!
//! let core = VibeCore::bootstrap(config).await?;
//! core.analysis().analyze_library().await?;
//! core.sync().synchronize().await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_analysis::{AnalysisState, AnalysisSummary, LibraryActionService, PromptSanitizer};
pub use core_library::{LibrarySong, LibraryStore, Song, SongId, SyncStatus, Tag, TagKind};
pub use core_runtime::config::{AnalysisSettings, CoreConfig, SyncSettings};
pub use core_runtime::events::{CoreEvent, EventBus, EventStream};
pub use core_sync::{SyncEngine, SyncState};

use bridge_traits::TextSanitizer;
use core_analysis::AnalysisPipeline;
use core_library::db::{create_pool, DatabaseConfig};
use core_library::SqliteLibraryRepository;
use core_sync::SyncCoordinator;
use std::sync::Arc;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct VibeCore {
    store: Arc<LibraryStore>,
    event_bus: EventBus,
    sync: Arc<SyncCoordinator>,
    analysis: Arc<AnalysisPipeline>,
}

impl VibeCore {
    /// Open the library and wire every component from `config`.
    ///
    /// # Errors
    ///
    /// Fails when the config is invalid or the persisted library cannot be
    /// opened.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let store = match &config.database_path {
            Some(path) => {
                let pool = create_pool(DatabaseConfig::new(path)).await?;
                let repository = Arc::new(SqliteLibraryRepository::new(pool));
                Arc::new(LibraryStore::open(repository).await?)
            }
            None => Arc::new(LibraryStore::in_memory()),
        };

        let event_bus = EventBus::new(config.event_buffer_size);
        let sanitizer: Arc<dyn TextSanitizer> = match config.sanitizer {
            Some(sanitizer) => sanitizer,
            None => Arc::new(PromptSanitizer::from_settings(&config.analysis)),
        };

        let sync = Arc::new(SyncCoordinator::new(
            store.clone(),
            config.remote_client,
            event_bus.clone(),
            config.clock,
            config.sync,
        ));
        let analysis = Arc::new(AnalysisPipeline::new(
            store.clone(),
            config.classifier,
            sanitizer,
            event_bus.clone(),
            config.analysis,
        ));

        info!(
            persistent = config.database_path.is_some(),
            songs = store.len().await,
            "Engine ready"
        );

        Ok(Self {
            store,
            event_bus,
            sync,
            analysis,
        })
    }

    pub fn sync(&self) -> Arc<dyn SyncEngine> {
        self.sync.clone()
    }

    pub fn analysis(&self) -> Arc<dyn LibraryActionService> {
        self.analysis.clone()
    }

    /// Shared library store, for reads and local edits.
    pub fn library(&self) -> Arc<LibraryStore> {
        self.store.clone()
    }

    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }
}
