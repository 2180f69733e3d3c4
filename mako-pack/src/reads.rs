use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use config::{MAX_BOUND_PARAMS, READS_TABLE, READ_COLUMNS};
use log::{debug, info};
use rusqlite::types::Value as SqlValue;

use crate::{column_names, open_read_only, DataSourceError, Layout, ReadRecord};

/// a source of non-ignored reads for a batch of identifiers at one position
#[cfg_attr(test, mockall::automock)]
pub trait ReadBackend {
    fn fetch(&self, rnames: &[String], position: i64) -> Result<Vec<ReadRecord>, DataSourceError>;
}

/// `reads` table in a SQLite file; every fetch opens and releases its own connection
#[derive(Debug, Clone)]
pub struct SqliteReads {
    path: PathBuf,
}

impl SqliteReads {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DataSourceError> {
        let path = path.as_ref().to_path_buf();

        let conn = open_read_only(&path)?;
        let stmt = conn.prepare(&format!("SELECT * FROM {READS_TABLE} LIMIT 0"))?;
        Layout::new(READS_TABLE, column_names(&stmt), &READ_COLUMNS)?;

        Ok(Self { path })
    }
}

impl ReadBackend for SqliteReads {
    fn fetch(&self, rnames: &[String], position: i64) -> Result<Vec<ReadRecord>, DataSourceError> {
        let conn = open_read_only(&self.path)?;

        // identifiers are always bound, never spliced into the statement
        let placeholders = vec!["?"; rnames.len()].join(", ");
        let query = format!(
            "SELECT * FROM {READS_TABLE}
             WHERE rname IN ({placeholders})
               AND transcript_position = ?"
        );

        let mut params: Vec<SqlValue> = rnames.iter().cloned().map(SqlValue::Text).collect();
        params.push(SqlValue::Integer(position));

        let mut stmt = conn.prepare(&query)?;
        let layout = Layout::new(READS_TABLE, column_names(&stmt), &READ_COLUMNS)?;

        let mut reads = Vec::new();
        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
        while let Some(row) = rows.next()? {
            // `ignored` may be stored as 0/1 or as 'true'/'false' text
            let read = ReadRecord::from_row(row, &layout)?;
            if !read.ignored {
                reads.push(read);
            }
        }

        Ok(reads)
    }
}

/// Read-only access to per-read measurements.
#[derive(Debug, Clone)]
pub struct ReadStore<B: ReadBackend = SqliteReads> {
    backend: B,
}

impl ReadStore<SqliteReads> {
    /// Opens the read database at `path`.
    ///
    /// Fails with [`DataSourceError::NotFound`] on a missing file and with
    /// [`DataSourceError::MissingColumn`] if the `reads` table lacks a
    /// required column.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DataSourceError> {
        Ok(Self::with_backend(SqliteReads::open(path)?))
    }
}

impl<B: ReadBackend> ReadStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// Non-ignored reads whose `rname` is in `rnames` at `position`.
    ///
    /// An empty identifier set returns an empty result without touching the
    /// backend. Large sets are split into several bound queries, issued in
    /// sorted identifier order.
    pub fn matching_reads(
        &self,
        rnames: &BTreeSet<String>,
        position: i64,
    ) -> Result<Vec<ReadRecord>, DataSourceError> {
        if rnames.is_empty() {
            debug!("No read identifiers for position {}; skipping query", position);
            return Ok(Vec::new());
        }

        debug!(
            "Querying {} read identifiers at position {}",
            rnames.len(),
            position
        );

        let rnames = rnames.iter().cloned().collect::<Vec<_>>();
        let mut reads = Vec::new();
        for chunk in rnames.chunks(MAX_BOUND_PARAMS) {
            reads.extend(self.backend.fetch(chunk, position)?);
        }

        info!("Reads fetched: {}", reads.len());
        Ok(reads)
    }
}
