use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Host context unavailable: {0}")]
    HostUnavailable(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
