//! Error types for the PetCare core.

/// Top-level error type for the data layer and reminder core.
#[derive(Debug, thiserror::Error)]
pub enum PetCareError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A command was issued without an active user session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// User input rejected before reaching the document store.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced document does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Document store failure.
    #[error("document store error: {0}")]
    Store(String),

    /// Blob storage failure (photo upload/download).
    #[error("storage error: {0}")]
    Storage(String),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PetCareError>;
