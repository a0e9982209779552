use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote error: {0}")]
    Remote(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Remote call {operation} timed out after {secs} seconds")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("Sync already in progress")]
    SyncInProgress,
}

impl SyncError {
    /// Whether the next sync can reasonably succeed where this one failed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            SyncError::Remote(e) => e.is_retryable(),
            SyncError::Timeout { .. } | SyncError::SyncInProgress => true,
            SyncError::Library(LibraryError::Database(_)) => true,
            SyncError::Library(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
