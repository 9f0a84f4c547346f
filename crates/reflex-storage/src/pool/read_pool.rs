//! Round-robin pool of read-only connections.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rusqlite::{Connection, OpenFlags};

use reflex_core::errors::ReflexResult;

use crate::to_storage_err;

use super::pragmas;

/// Fixed-size pool of readers, rotated with an atomic cursor.
pub struct ReadPool {
    connections: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
}

impl ReadPool {
    /// Open `size` read-only connections against a file-backed database.
    pub fn open(path: &Path, size: usize) -> ReflexResult<Self> {
        let mut connections = Vec::with_capacity(size.max(1));
        for _ in 0..size.max(1) {
            let conn = Connection::open_with_flags(
                path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| to_storage_err(format!("open reader: {e}")))?;
            pragmas::apply(&conn, true)?;
            connections.push(Mutex::new(conn));
        }
        Ok(Self {
            connections,
            cursor: AtomicUsize::new(0),
        })
    }

    /// In-memory pool. Note: each in-memory connection is an isolated
    /// database; the storage engine routes reads through the writer in
    /// in-memory mode instead of using this pool.
    pub fn open_in_memory(size: usize) -> ReflexResult<Self> {
        let mut connections = Vec::with_capacity(size.max(1));
        for _ in 0..size.max(1) {
            let conn = Connection::open_in_memory()
                .map_err(|e| to_storage_err(format!("open in-memory reader: {e}")))?;
            pragmas::apply(&conn, false)?;
            connections.push(Mutex::new(conn));
        }
        Ok(Self {
            connections,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Run a closure against the next reader in rotation.
    pub fn with_conn<F, T>(&self, f: F) -> ReflexResult<T>
    where
        F: FnOnce(&Connection) -> ReflexResult<T>,
    {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        let guard = self.connections[idx]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}
