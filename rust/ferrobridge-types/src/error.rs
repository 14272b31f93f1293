use thiserror::Error;

/// Unified error taxonomy for the bridge. Each crate boundary defines its
/// own narrower error where useful, but every public, fallible API in the
/// workspace ultimately returns (or converts into) one of these variants.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("queue full: {0}")]
    QueueFull(String),

    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("pattern rejected as unsafe: {0}")]
    PatternUnsafe(String),

    #[error("pattern compilation exceeded deadline: {0}")]
    PatternCompileTimeout(String),

    #[error("operation cancelled: {0}")]
    Cancelled(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
