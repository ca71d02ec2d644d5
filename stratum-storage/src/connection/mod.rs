//! Connection management for bundle files.
//!
//! The write path is `with_connection`: one connection, one
//! `BEGIN IMMEDIATE` transaction around the whole bundle build, and on
//! any failure the file is removed so a partial bundle is never
//! observable. At most one writer per path is the caller's contract
//! (uploads for distinct commits never share a path).

pub mod pragmas;

use std::path::Path;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use stratum_core::errors::StorageError;

use self::pragmas::{apply_build_pragmas, apply_read_pragmas};
use crate::schema;

/// Build a bundle file at `path` inside one transaction.
///
/// Opens a fresh connection, applies pragmas, creates the bundle
/// schema, then runs `f` inside a `BEGIN IMMEDIATE` transaction.
/// Commits on `Ok`. On `Err` the transaction is rolled back and the
/// file is removed; the error is returned unchanged.
pub fn with_connection<T, E, F>(path: &Path, f: F) -> Result<T, E>
where
    E: From<StorageError>,
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
{
    let result = build_bundle(path, f);
    if result.is_err() {
        // No partial bundle may survive a failed build.
        tracing::warn!(path = %path.display(), "bundle build failed, removing partial file");
        let _ = std::fs::remove_file(path);
    }
    result
}

fn build_bundle<T, E, F>(path: &Path, f: F) -> Result<T, E>
where
    E: From<StorageError>,
    F: FnOnce(&Transaction<'_>) -> Result<T, E>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(StorageError::from)?;
    }

    let conn = Connection::open(path).map_err(StorageError::from)?;
    apply_build_pragmas(&conn)?;
    schema::create_bundle_schema(&conn)?;

    // One BEGIN IMMEDIATE for the whole build, acquiring the write
    // lock up front; the Transaction wrapper gives rollback-on-drop.
    let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)
        .map_err(StorageError::from)?;

    let value = f(&tx)?;

    tx.commit().map_err(StorageError::from)?;
    tracing::debug!(path = %path.display(), "bundle committed");
    Ok(value)
}

/// Open an existing bundle file read-only, for the query layer.
pub fn open_readonly(path: &Path) -> Result<Connection, StorageError> {
    let conn = Connection::open_with_flags(
        path,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    apply_read_pragmas(&conn)?;
    Ok(conn)
}
