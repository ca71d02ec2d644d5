//! Upload orchestration.
//!
//! [`Backend::insert_dump`] runs the whole pipeline for one
//! (repository, commit): parse, correlate, canonicalize, extract the
//! package manifest, write the bundle inside one transaction, then
//! record the manifest in the cross-repository index. Any failure
//! before the commit leaves no bundle file, so a commit either has a
//! complete bundle or reads as never uploaded.

use std::fmt;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use stratum_core::config::{StorageConfig, StratumConfig};
use stratum_core::errors::{ImportError, ParseError, StorageError};
use stratum_core::protocol::Element;
use stratum_storage::encoding::{decode, encode};
use stratum_storage::paths::{bundle_path, find_bundle};
use stratum_storage::{open_readonly, with_connection, BatchInserter, XrepoStore};

use crate::canonicalize::canonicalize_all;
use crate::chunks::{chunk_results, ResultChunkData, NUM_RESULT_CHUNKS};
use crate::correlator::Correlator;
use crate::document::{assemble, DocumentData};
use crate::packages::{extract_packages, extract_references};
use crate::rows::{project_rows, SymbolRow};

/// Version tag written into every bundle's meta row, bumped on any
/// incompatible change to the bundle layout.
pub const BUNDLE_FORMAT_VERSION: &str = "0.1.0";

const SYMBOL_COLUMNS: &[&str] = &[
    "scheme",
    "identifier",
    "document_path",
    "start_line",
    "start_character",
    "end_line",
    "end_character",
];

/// Row counts for one completed upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub documents: usize,
    pub result_chunks: usize,
    pub definitions: usize,
    pub references: usize,
    pub packages: usize,
    pub package_references: usize,
}

enum UploadState {
    Streaming,
    Canonicalizing,
    Writing,
    Indexing,
    Committed,
    Aborted,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UploadState::Streaming => "streaming",
            UploadState::Canonicalizing => "canonicalizing",
            UploadState::Writing => "writing",
            UploadState::Indexing => "indexing",
            UploadState::Committed => "committed",
            UploadState::Aborted => "aborted",
        })
    }
}

/// The upload entry point. One backend serves many uploads; the
/// cross-repository store behind it is shared and internally
/// serialized.
pub struct Backend {
    storage: StorageConfig,
    xrepo: Arc<XrepoStore>,
}

impl Backend {
    /// Open a backend rooted at the configured storage directory.
    pub fn new(config: &StratumConfig) -> Result<Self, StorageError> {
        let xrepo = XrepoStore::open(&config.storage.xrepo_path())?;
        Ok(Self {
            storage: config.storage.clone(),
            xrepo: Arc::new(xrepo),
        })
    }

    /// Build a backend around an existing store. Used when several
    /// backends (or tests) share one index.
    pub fn with_store(storage: StorageConfig, xrepo: Arc<XrepoStore>) -> Self {
        Self { storage, xrepo }
    }

    pub fn xrepo(&self) -> &XrepoStore {
        &self.xrepo
    }

    /// Path the bundle for (repository, commit) would occupy.
    pub fn bundle_path(&self, repository: &str, commit: &str) -> PathBuf {
        bundle_path(&self.storage.root, repository, commit)
    }

    /// Import one dump stream for (repository, commit).
    ///
    /// Re-uploading a commit replaces its bundle and its manifest rows.
    /// On any error the bundle file is absent afterwards, including the
    /// case where a previous upload for the same commit had succeeded.
    pub fn insert_dump<R: BufRead>(
        &self,
        repository: &str,
        commit: &str,
        reader: R,
    ) -> Result<UploadStats, ImportError> {
        let span = tracing::info_span!("insert_dump", repository, commit);
        let _guard = span.enter();

        let result = self.run_upload(repository, commit, reader);
        match &result {
            Ok(stats) => {
                tracing::info!(
                    state = %UploadState::Committed,
                    documents = stats.documents,
                    definitions = stats.definitions,
                    references = stats.references,
                    packages = stats.packages,
                    "upload complete"
                );
            }
            Err(error) => {
                tracing::warn!(state = %UploadState::Aborted, %error, "upload aborted");
            }
        }
        result
    }

    fn run_upload<R: BufRead>(
        &self,
        repository: &str,
        commit: &str,
        reader: R,
    ) -> Result<UploadStats, ImportError> {
        // A re-upload replaces the previous bundle up front: after any
        // failure, successful or prior upload notwithstanding, the
        // commit reads as never uploaded.
        let path = self.bundle_path(repository, commit);
        if path.exists() {
            std::fs::remove_file(&path).map_err(StorageError::from)?;
        }

        tracing::debug!(state = %UploadState::Streaming, "upload state");
        let mut correlator = Correlator::new();
        for (index, line) in reader.lines().enumerate() {
            let line_number = index + 1;
            let line = line.map_err(StorageError::from)?;
            if line.trim().is_empty() {
                continue;
            }
            let element: Element = serde_json::from_str(&line)
                .map_err(|e| classify_parse_error(line_number, &line, &e))?;
            correlator.insert(element);
        }
        correlator.finalize()?;

        tracing::debug!(state = %UploadState::Canonicalizing, "upload state");
        canonicalize_all(&mut correlator)?;

        // Manifest extraction can fail structurally, so it runs before
        // any file is touched.
        let packages = extract_packages(&correlator)?;
        let references = extract_references(&correlator)?;

        tracing::debug!(state = %UploadState::Writing, "upload state");
        let mut stats = with_connection(&path, |tx| write_bundle(tx, &correlator))?;

        tracing::debug!(state = %UploadState::Indexing, "upload state");
        stats.packages = packages.len();
        stats.package_references = references.len();
        for package in &packages {
            self.xrepo
                .add_package(
                    &package.scheme,
                    &package.name,
                    package.version.as_deref(),
                    repository,
                    commit,
                )
                .map_err(ImportError::from)?;
        }
        for (package, identifiers) in &references {
            let identifiers: Vec<String> = identifiers.iter().cloned().collect();
            self.xrepo
                .add_reference(
                    &package.scheme,
                    &package.name,
                    package.version.as_deref(),
                    repository,
                    commit,
                    &identifiers,
                )
                .map_err(ImportError::from)?;
        }

        Ok(stats)
    }

    /// Open the bundle for (repository, commit) read-only. Absence of
    /// the file means the commit was never successfully uploaded.
    pub fn open_bundle(
        &self,
        repository: &str,
        commit: &str,
    ) -> Result<BundleHandle, StorageError> {
        let path = find_bundle(&self.storage.root, repository, commit)?;
        let conn = open_readonly(&path)?;
        Ok(BundleHandle { conn })
    }
}

fn write_bundle(tx: &Transaction<'_>, correlator: &Correlator) -> Result<UploadStats, ImportError> {
    let mut stats = UploadStats::default();

    // finalize() guarantees the version is present by now.
    let dump_version = correlator.dump_version.as_deref().unwrap_or_default();
    tx.execute(
        "INSERT INTO meta (id, dump_version, importer_version, num_result_chunks)
         VALUES (1, ?1, ?2, ?3)",
        params![dump_version, BUNDLE_FORMAT_VERSION, NUM_RESULT_CHUNKS as i64],
    )
    .map_err(StorageError::from)?;

    // Documents, in path order. Two document vertices with the same
    // path collapse to the first by id.
    let mut by_path: Vec<(&String, &stratum_core::protocol::Id)> = correlator
        .document_paths
        .iter()
        .map(|(id, path)| (path, id))
        .collect();
    by_path.sort();

    let mut documents = BatchInserter::new(tx, "documents", &["path", "data"]);
    let mut last_path: Option<&String> = None;
    for (path, document_id) in by_path {
        if last_path == Some(path) {
            continue;
        }
        last_path = Some(path);
        let data = assemble(correlator, document_id)?;
        documents.insert(vec![
            Value::Text(path.clone()),
            Value::Blob(encode(&data)?),
        ])?;
    }
    stats.documents = documents.flush()?;

    let chunks = chunk_results(correlator, NUM_RESULT_CHUNKS)?;
    let mut chunk_rows = BatchInserter::new(tx, "result_chunks", &["id", "data"]);
    for (index, chunk) in chunks.iter().enumerate() {
        chunk_rows.insert(vec![
            Value::Integer(index as i64),
            Value::Blob(encode(chunk)?),
        ])?;
    }
    stats.result_chunks = chunk_rows.flush()?;

    let (definitions, references) = project_rows(correlator)?;
    let mut definition_rows = BatchInserter::new(tx, "definitions", SYMBOL_COLUMNS);
    for row in &definitions {
        definition_rows.insert(symbol_values(row))?;
    }
    stats.definitions = definition_rows.flush()?;

    let mut reference_rows = BatchInserter::new(tx, "refs", SYMBOL_COLUMNS);
    for row in &references {
        reference_rows.insert(symbol_values(row))?;
    }
    stats.references = reference_rows.flush()?;

    Ok(stats)
}

fn symbol_values(row: &SymbolRow) -> Vec<Value> {
    vec![
        Value::Text(row.scheme.clone()),
        Value::Text(row.identifier.clone()),
        Value::Text(row.document_path.clone()),
        Value::Integer(row.start_line as i64),
        Value::Integer(row.start_character as i64),
        Value::Integer(row.end_line as i64),
        Value::Integer(row.end_character as i64),
    ]
}

fn classify_parse_error(line: usize, raw: &str, err: &serde_json::Error) -> ParseError {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
        if let Some(label) = value.get("label").and_then(|v| v.as_str()) {
            if err.to_string().contains("unknown variant") {
                return ParseError::UnknownLabel {
                    line,
                    label: label.to_string(),
                };
            }
        }
    }
    ParseError::InvalidLine {
        line,
        message: err.to_string(),
    }
}

/// A read-only view over one committed bundle.
#[derive(Debug)]
pub struct BundleHandle {
    conn: Connection,
}

/// The bundle's meta row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleMeta {
    pub dump_version: String,
    pub importer_version: String,
    pub num_result_chunks: usize,
}

impl BundleHandle {
    pub fn meta(&self) -> Result<BundleMeta, StorageError> {
        let meta = self.conn.query_row(
            "SELECT dump_version, importer_version, num_result_chunks FROM meta WHERE id = 1",
            [],
            |row| {
                Ok(BundleMeta {
                    dump_version: row.get(0)?,
                    importer_version: row.get(1)?,
                    num_result_chunks: row.get::<_, i64>(2)? as usize,
                })
            },
        )?;
        Ok(meta)
    }

    pub fn document(&self, path: &str) -> Result<Option<DocumentData>, StorageError> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT data FROM documents WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        blob.map(|bytes| decode(&bytes)).transpose()
    }

    pub fn document_paths(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT path FROM documents ORDER BY path")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut paths = Vec::new();
        for row in rows {
            paths.push(row?);
        }
        Ok(paths)
    }

    pub fn result_chunk(&self, index: usize) -> Result<Option<ResultChunkData>, StorageError> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT data FROM result_chunks WHERE id = ?1",
                params![index as i64],
                |row| row.get(0),
            )
            .optional()?;
        blob.map(|bytes| decode(&bytes)).transpose()
    }

    pub fn definitions(&self, scheme: &str, identifier: &str) -> Result<Vec<SymbolRow>, StorageError> {
        self.symbol_rows("definitions", scheme, identifier)
    }

    pub fn references(&self, scheme: &str, identifier: &str) -> Result<Vec<SymbolRow>, StorageError> {
        self.symbol_rows("refs", scheme, identifier)
    }

    fn symbol_rows(
        &self,
        table: &str,
        scheme: &str,
        identifier: &str,
    ) -> Result<Vec<SymbolRow>, StorageError> {
        let sql = format!(
            "SELECT scheme, identifier, document_path,
                    start_line, start_character, end_line, end_character
             FROM {table}
             WHERE scheme = ?1 AND identifier = ?2
             ORDER BY document_path, start_line, start_character"
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(params![scheme, identifier], |row| {
            Ok(SymbolRow {
                scheme: row.get(0)?,
                identifier: row.get(1)?,
                document_path: row.get(2)?,
                start_line: row.get::<_, i64>(3)? as u32,
                start_character: row.get::<_, i64>(4)? as u32,
                end_line: row.get::<_, i64>(5)? as u32,
                end_character: row.get::<_, i64>(6)? as u32,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Clone)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured_upload(input: &str) -> String {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = Capture(buffer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let dir = tempfile::tempdir().unwrap();
            let storage = StorageConfig {
                root: dir.path().to_path_buf(),
                ..Default::default()
            };
            let backend =
                Backend::with_store(storage, Arc::new(XrepoStore::open_in_memory().unwrap()));
            let _ = backend.insert_dump("acme/lib", "c1", Cursor::new(input.as_bytes().to_vec()));
        });

        let bytes = buffer.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn successful_upload_logs_committed_state() {
        let output =
            captured_upload(r#"{"id":1,"type":"vertex","label":"metaData","version":"0.4.3"}"#);
        assert!(output.contains("committed"), "log output: {output}");
        assert!(!output.contains("aborted"));
    }

    #[test]
    fn failed_upload_logs_aborted_state() {
        let output = captured_upload("not json");
        assert!(output.contains("aborted"), "log output: {output}");
        assert!(!output.contains("committed"));
    }
}
