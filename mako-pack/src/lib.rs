//! Table access for makoview
//!
//! Two read-only SQLite tables back every lookup. The `sites` table holds
//! precomputed per-site statistics and is loaded once into a [`SiteIndex`];
//! the `reads` table holds per-read measurements and is queried on demand
//! through a [`ReadStore`], one connection per query.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use config::{get_progress_bar, SITES_TABLE, SITE_COLUMNS};
use hashbrown::HashMap;
use log::{info, warn};
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

pub mod reads;
pub mod record;
pub use reads::{ReadBackend, ReadStore, SqliteReads};
pub use record::{Columns, Layout, LongRow, ReadRecord, SiteRecord};

/// error handling for both stores
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("Database not found: {0:?}")]
    NotFound(PathBuf),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },
    #[error("Table '{table}' has an invalid value in column '{column}': {value}")]
    InvalidValue {
        table: String,
        column: String,
        value: String,
    },
}

/// open a read-only connection, failing early on a missing file
pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Connection, DataSourceError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(DataSourceError::NotFound(path.to_path_buf()));
    }

    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Ok(Connection::open_with_flags(path, flags)?)
}

/// column names reported by a prepared statement
pub fn column_names(stmt: &rusqlite::Statement) -> Vec<String> {
    stmt.column_names().into_iter().map(String::from).collect()
}

/// In-memory site table indexed by transcript and position.
///
/// Several rows may share a (transcript_id, transcript_position) pair, one
/// per contributing read. The index is immutable once built and can be
/// shared read-only between sessions.
#[derive(Debug, Clone, Default)]
pub struct SiteIndex {
    columns: Vec<String>,
    records: Vec<SiteRecord>,
    index: HashMap<String, BTreeMap<i64, Vec<usize>>>,
}

impl SiteIndex {
    /// Reads the whole `sites` table into memory.
    ///
    /// # Errors
    ///
    /// [`DataSourceError::NotFound`] when `path` is not a file, a SQLite error
    /// when the table cannot be read, and [`DataSourceError::MissingColumn`]
    /// when one of `transcript_id`, `transcript_position` or `rname` is absent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DataSourceError> {
        let path = path.as_ref();
        info!("Loading sites from {:?}...", path);

        let conn = open_read_only(path)?;
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {SITES_TABLE}"),
            [],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!("SELECT * FROM {SITES_TABLE}"))?;
        let layout = Layout::new(SITES_TABLE, column_names(&stmt), &SITE_COLUMNS)?;

        let pb = get_progress_bar(total.max(0) as u64, "Indexing sites");
        let mut records = Vec::with_capacity(total.max(0) as usize);
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            records.push(SiteRecord::from_row(row, &layout)?);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let sites = Self::from_records(layout.names().to_vec(), records);
        if sites.is_empty() {
            warn!("Site table in {:?} has no rows", path);
        }
        info!(
            "Sites loaded: {} rows across {} transcripts",
            sites.len(),
            sites.transcripts()
        );

        Ok(sites)
    }

    pub fn from_records(columns: Vec<String>, records: Vec<SiteRecord>) -> Self {
        let mut index: HashMap<String, BTreeMap<i64, Vec<usize>>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            index
                .entry(record.transcript_id.clone())
                .or_default()
                .entry(record.transcript_position)
                .or_default()
                .push(idx);
        }

        Self {
            columns,
            records,
            index,
        }
    }

    /// Sorted, deduplicated positions recorded for a transcript.
    ///
    /// Blank or unknown ids yield an empty list.
    pub fn positions_for(&self, transcript_id: &str) -> Vec<i64> {
        let transcript_id = transcript_id.trim();
        if transcript_id.is_empty() {
            return Vec::new();
        }

        self.index
            .get(transcript_id)
            .map(|positions| positions.keys().copied().collect())
            .unwrap_or_default()
    }

    /// All rows for the exact pair in long (column, value) form.
    pub fn site_row(&self, transcript_id: &str, position: i64) -> Vec<LongRow> {
        let matching = self.matching(transcript_id, position);
        if matching.is_empty() {
            return Vec::new();
        }

        record::melt(&matching, &self.columns)
    }

    pub fn rnames_for(&self, transcript_id: &str, position: i64) -> BTreeSet<String> {
        self.matching(transcript_id, position)
            .into_iter()
            .map(|record| record.rname.clone())
            .collect()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn transcripts(&self) -> usize {
        self.index.len()
    }

    fn matching(&self, transcript_id: &str, position: i64) -> Vec<&SiteRecord> {
        self.index
            .get(transcript_id.trim())
            .and_then(|positions| positions.get(&position))
            .map(|idxs| idxs.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }
}
