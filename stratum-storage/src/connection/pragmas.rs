//! SQLite pragmas for bundle files.
//!
//! Bundles are written once inside a single transaction and then
//! immutable, so the write side trades journal durability for speed:
//! the all-or-nothing file contract (failed builds are deleted) is what
//! guarantees readers never see a partial bundle.

use rusqlite::Connection;
use stratum_core::errors::StorageError;

/// Pragmas for the single build connection of a new bundle.
pub fn apply_build_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "PRAGMA journal_mode = MEMORY;
         PRAGMA synchronous = OFF;
         PRAGMA temp_store = MEMORY;
         PRAGMA cache_size = -32000;",
    )?;
    Ok(())
}

/// Pragmas for read-only query connections.
pub fn apply_read_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "PRAGMA query_only = ON;
         PRAGMA cache_size = -32000;",
    )?;
    Ok(())
}
