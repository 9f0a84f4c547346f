//! SQLite connection handling, split into a serialized writer and a
//! round-robin reader pool. The engine composes the two directly; there
//! is no combined pool object.

pub mod pragmas;
pub mod read_pool;
pub mod write_connection;

pub use read_pool::ReadPool;
pub use write_connection::WriteConnection;
