//! Parameter-bounded batch inserts.
//!
//! SQLite caps the number of bound parameters per statement, so the
//! batch size for each table is the cap divided by the row's field
//! count. Full batches share one prepared statement; the final partial
//! batch compiles a second one.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use stratum_core::errors::StorageError;

/// Maximum bound parameters per statement (SQLITE_MAX_VARIABLE_NUMBER
/// on older builds; kept at the conservative historical value).
pub const MAX_BOUND_PARAMETERS: usize = 999;

/// Buffers rows for one table and flushes them as multi-row INSERTs.
///
/// Rows buffered but not flushed die with the enclosing transaction:
/// call [`BatchInserter::flush`] once all rows are inserted.
pub struct BatchInserter<'conn> {
    conn: &'conn Connection,
    table: &'static str,
    columns: &'static [&'static str],
    max_rows_per_batch: usize,
    buffer: Vec<Value>,
    inserted: usize,
}

impl<'conn> BatchInserter<'conn> {
    pub fn new(
        conn: &'conn Connection,
        table: &'static str,
        columns: &'static [&'static str],
    ) -> Self {
        debug_assert!(!columns.is_empty());
        Self {
            conn,
            table,
            columns,
            max_rows_per_batch: MAX_BOUND_PARAMETERS / columns.len(),
            buffer: Vec::new(),
            inserted: 0,
        }
    }

    /// Buffer one row, flushing if the batch is full.
    pub fn insert(&mut self, row: Vec<Value>) -> Result<(), StorageError> {
        debug_assert_eq!(row.len(), self.columns.len());
        self.buffer.extend(row);
        if self.buffered_rows() >= self.max_rows_per_batch {
            self.flush_buffer()?;
        }
        Ok(())
    }

    /// Flush any remaining rows; returns the total row count inserted
    /// through this inserter.
    pub fn flush(&mut self) -> Result<usize, StorageError> {
        self.flush_buffer()?;
        Ok(self.inserted)
    }

    /// Rows per full batch (exposed for tests).
    pub fn max_rows_per_batch(&self) -> usize {
        self.max_rows_per_batch
    }

    fn buffered_rows(&self) -> usize {
        self.buffer.len() / self.columns.len()
    }

    fn flush_buffer(&mut self) -> Result<(), StorageError> {
        let rows = self.buffered_rows();
        if rows == 0 {
            return Ok(());
        }

        let row_placeholders = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table,
            self.columns.join(", "),
            vec![row_placeholders.as_str(); rows].join(", ")
        );

        let mut stmt = self.conn.prepare_cached(&sql)?;
        stmt.execute(params_from_iter(self.buffer.drain(..)))?;
        self.inserted += rows;
        Ok(())
    }
}
