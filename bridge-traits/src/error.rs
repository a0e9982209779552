use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Classifier error: {0}")]
    Classification(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::Transport(_) | BridgeError::Io(_) | BridgeError::NotAvailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
