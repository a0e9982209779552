use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Classifier error: {0}")]
    Classifier(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Analysis already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
