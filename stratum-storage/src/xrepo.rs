//! Cross-repository index.
//!
//! A single process-wide SQLite file mapping package triples to the
//! repositories/commits that export them (`packages`) and the
//! identifier sets imported from them (`package_refs`). All concurrent
//! uploads funnel their manifest through this store, so writes are
//! serialized behind one connection.
//!
//! The absent-version case is stored as the empty string: SQLite treats
//! NULLs as distinct in UNIQUE constraints, which would break the
//! one-row-per-triple invariant.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use stratum_core::errors::StorageError;

const XREPO_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scheme TEXT NOT NULL,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    repository TEXT NOT NULL,
    commit_hash TEXT NOT NULL,
    UNIQUE (scheme, name, version, repository, commit_hash)
) STRICT;

CREATE INDEX IF NOT EXISTS idx_packages_triple
    ON packages(scheme, name, version);

CREATE TABLE IF NOT EXISTS package_refs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scheme TEXT NOT NULL,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    repository TEXT NOT NULL,
    commit_hash TEXT NOT NULL,
    identifiers TEXT NOT NULL,
    UNIQUE (scheme, name, version, repository, commit_hash)
) STRICT;

CREATE INDEX IF NOT EXISTS idx_package_refs_triple
    ON package_refs(scheme, name, version);
"#;

/// A (repository, commit) pair that provides or references a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub repository: String,
    pub commit: String,
}

/// One repository/commit's imported identifiers for a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    pub repository: String,
    pub commit: String,
    pub identifiers: Vec<String>,
}

/// The shared cross-repository store. Writes are serialized behind a
/// mutex; re-uploads for the same (repository, commit) replace rows.
pub struct XrepoStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl XrepoStore {
    /// Open (or create) the index at the given path.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        conn.execute_batch(XREPO_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory index (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(XREPO_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Index file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record that (repository, commit) exports the given package.
    pub fn add_package(
        &self,
        scheme: &str,
        name: &str,
        version: Option<&str>,
        repository: &str,
        commit: &str,
    ) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO packages
                 (scheme, name, version, repository, commit_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![scheme, name, version.unwrap_or(""), repository, commit],
            )?;
            Ok(())
        })
    }

    /// Record the identifiers (repository, commit) imports from the
    /// given package. `identifiers` should be sorted and deduplicated
    /// by the caller; it is stored as a JSON array.
    pub fn add_reference(
        &self,
        scheme: &str,
        name: &str,
        version: Option<&str>,
        repository: &str,
        commit: &str,
        identifiers: &[String],
    ) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(identifiers).map_err(|e| StorageError::Encoding {
            message: e.to_string(),
        })?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO package_refs
                 (scheme, name, version, repository, commit_hash, identifiers)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![scheme, name, version.unwrap_or(""), repository, commit, encoded],
            )?;
            Ok(())
        })
    }

    /// All (repository, commit) pairs exporting the given package.
    pub fn providers_of(
        &self,
        scheme: &str,
        name: &str,
        version: Option<&str>,
    ) -> Result<Vec<CommitRef>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT repository, commit_hash FROM packages
                 WHERE scheme = ?1 AND name = ?2 AND version = ?3
                 ORDER BY repository, commit_hash",
            )?;
            let rows = stmt.query_map(params![scheme, name, version.unwrap_or("")], |row| {
                Ok(CommitRef {
                    repository: row.get(0)?,
                    commit: row.get(1)?,
                })
            })?;
            let mut result = Vec::new();
            for row in rows {
                result.push(row?);
            }
            Ok(result)
        })
    }

    /// All recorded imports of the given package.
    pub fn references_to(
        &self,
        scheme: &str,
        name: &str,
        version: Option<&str>,
    ) -> Result<Vec<ReferenceRecord>, StorageError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT repository, commit_hash, identifiers FROM package_refs
                 WHERE scheme = ?1 AND name = ?2 AND version = ?3
                 ORDER BY repository, commit_hash",
            )?;
            let rows = stmt.query_map(params![scheme, name, version.unwrap_or("")], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;
            let mut result = Vec::new();
            for row in rows {
                let (repository, commit, encoded) = row?;
                let identifiers =
                    serde_json::from_str(&encoded).map_err(|e| StorageError::Encoding {
                        message: e.to_string(),
                    })?;
                result.push(ReferenceRecord {
                    repository,
                    commit,
                    identifiers,
                });
            }
            Ok(result)
        })
    }

    /// The providers of a package, if any (convenience for callers that
    /// only care about the newest row).
    pub fn any_provider(
        &self,
        scheme: &str,
        name: &str,
        version: Option<&str>,
    ) -> Result<Option<CommitRef>, StorageError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT repository, commit_hash FROM packages
                 WHERE scheme = ?1 AND name = ?2 AND version = ?3
                 ORDER BY id DESC LIMIT 1",
                params![scheme, name, version.unwrap_or("")],
                |row| {
                    Ok(CommitRef {
                        repository: row.get(0)?,
                        commit: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(StorageError::from)
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let guard = self.conn.lock().map_err(|_| StorageError::Sqlite {
            message: "xrepo lock poisoned".to_string(),
        })?;
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_package_is_idempotent() {
        let store = XrepoStore::open_in_memory().unwrap();
        store
            .add_package("npm", "left-pad", Some("1.0.0"), "acme/lib", "c1")
            .unwrap();
        store
            .add_package("npm", "left-pad", Some("1.0.0"), "acme/lib", "c1")
            .unwrap();

        let providers = store.providers_of("npm", "left-pad", Some("1.0.0")).unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].repository, "acme/lib");
    }

    #[test]
    fn reupload_replaces_reference_identifiers() {
        let store = XrepoStore::open_in_memory().unwrap();
        store
            .add_reference("npm", "left-pad", None, "acme/app", "c1", &["a".into()])
            .unwrap();
        store
            .add_reference(
                "npm",
                "left-pad",
                None,
                "acme/app",
                "c1",
                &["a".into(), "b".into()],
            )
            .unwrap();

        let refs = store.references_to("npm", "left-pad", None).unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].identifiers, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn absent_version_collapses_to_one_row() {
        let store = XrepoStore::open_in_memory().unwrap();
        store
            .add_package("npm", "left-pad", None, "acme/lib", "c1")
            .unwrap();
        store
            .add_package("npm", "left-pad", None, "acme/lib", "c1")
            .unwrap();
        assert_eq!(store.providers_of("npm", "left-pad", None).unwrap().len(), 1);
    }
}
