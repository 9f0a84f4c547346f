//! Error taxonomy for the engine.
//!
//! Administrative operations surface `ReflexError` directly; background
//! work (stream extraction, cascades, audit writes nested in a
//! resolution) catches and logs instead of propagating.

mod storage_error;

pub use storage_error::StorageError;

/// Convenience alias used across the workspace.
pub type ReflexResult<T> = Result<T, ReflexError>;

/// Top-level error for all engine operations.
#[derive(Debug, thiserror::Error)]
pub enum ReflexError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("quota exceeded: {current} of {limit} {resource}")]
    QuotaExceeded {
        resource: &'static str,
        current: u64,
        limit: u64,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {message}")]
    Config { message: String },
}

impl ReflexError {
    /// Shorthand for an `InvalidArgument` with a formatted message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for a `NotFound` on a named entity.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a `Conflict` with a formatted message.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}
