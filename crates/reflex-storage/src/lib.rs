//! # reflex-storage
//!
//! SQLite persistence for the consequence engine: a single-writer
//! connection plus a read pool, versioned migrations, and per-entity
//! query modules. Implements `IReflexStorage` from reflex-core.

pub mod engine;
pub mod migrations;
pub mod pool;
pub mod queries;

pub use engine::StorageEngine;

use reflex_core::errors::{ReflexError, StorageError};

/// Wrap a low-level SQLite failure into the engine error type.
pub(crate) fn to_storage_err(message: impl Into<String>) -> ReflexError {
    ReflexError::Storage(StorageError::SqliteError {
        message: message.into(),
    })
}
