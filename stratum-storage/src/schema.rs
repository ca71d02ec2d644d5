//! Per-commit bundle schema.
//!
//! `meta` holds the version tag and the fixed result-chunk count so a
//! reader knows how many shard rows to expect without a lookup.
//! `documents` and `result_chunks` store encoded payloads; the
//! `definitions` and `refs` tables are flat denormalized symbol rows
//! keyed by (scheme, identifier). (`refs`, because `references` is a
//! reserved word.)

use rusqlite::Connection;
use stratum_core::errors::StorageError;

pub const BUNDLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    dump_version TEXT NOT NULL,
    importer_version TEXT NOT NULL,
    num_result_chunks INTEGER NOT NULL
) STRICT;

CREATE TABLE IF NOT EXISTS documents (
    path TEXT PRIMARY KEY,
    data BLOB NOT NULL
) STRICT;

CREATE TABLE IF NOT EXISTS result_chunks (
    id INTEGER PRIMARY KEY,
    data BLOB NOT NULL
) STRICT;

CREATE TABLE IF NOT EXISTS definitions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scheme TEXT NOT NULL,
    identifier TEXT NOT NULL,
    document_path TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    start_character INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_character INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_definitions_moniker
    ON definitions(scheme, identifier);

CREATE TABLE IF NOT EXISTS refs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scheme TEXT NOT NULL,
    identifier TEXT NOT NULL,
    document_path TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    start_character INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_character INTEGER NOT NULL
) STRICT;

CREATE INDEX IF NOT EXISTS idx_refs_moniker
    ON refs(scheme, identifier);
"#;

/// Create the bundle tables on a fresh connection.
pub fn create_bundle_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(BUNDLE_SCHEMA)?;
    Ok(())
}
