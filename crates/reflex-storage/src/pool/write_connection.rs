//! The single writer connection. All mutations are serialized here.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use rusqlite::Connection;

use reflex_core::errors::ReflexResult;

use crate::to_storage_err;

use super::pragmas;

/// Serialized write access to the database.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    /// Open the writer for a file-backed database.
    pub fn open(path: &Path) -> ReflexResult<Self> {
        let conn =
            Connection::open(path).map_err(|e| to_storage_err(format!("open writer: {e}")))?;
        pragmas::apply(&conn, true)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory writer (for testing).
    pub fn open_in_memory() -> ReflexResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| to_storage_err(format!("open in-memory writer: {e}")))?;
        pragmas::apply(&conn, false)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a closure against the writer connection.
    pub fn with_conn_sync<F, T>(&self, f: F) -> ReflexResult<T>
    where
        F: FnOnce(&Connection) -> ReflexResult<T>,
    {
        let guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}
