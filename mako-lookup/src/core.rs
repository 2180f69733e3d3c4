use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use mako_pack::{
    DataSourceError, LongRow, ReadBackend, ReadRecord, ReadStore, SiteIndex, SqliteReads,
};
use serde::Serialize;

use crate::utils::{summarize, Summary};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub transcript_id: String,
    pub position: i64,
    pub site_rows: Vec<LongRow>,
    pub reads: Vec<ReadRecord>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.site_rows.is_empty() && self.reads.is_empty()
    }
}

/// outcome of a lookup; a blank transcript id never reaches the stores
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    NoQuery,
    Resolved(Arc<SearchResult>),
}

/// Joins the in-memory site table with the on-disk read table.
pub struct MatchResolver<B: ReadBackend = SqliteReads> {
    sites: Arc<SiteIndex>,
    store: ReadStore<B>,
}

impl MatchResolver<SqliteReads> {
    pub fn open<S, R>(sites: S, reads: R) -> Result<Self, DataSourceError>
    where
        S: AsRef<Path>,
        R: AsRef<Path>,
    {
        let sites = Arc::new(SiteIndex::load(sites)?);
        let store = ReadStore::open(reads)?;

        Ok(Self::new(sites, store))
    }
}

impl<B: ReadBackend> MatchResolver<B> {
    pub fn new(sites: Arc<SiteIndex>, store: ReadStore<B>) -> Self {
        Self { sites, store }
    }

    pub fn positions_for(&self, transcript_id: &str) -> Vec<i64> {
        self.sites.positions_for(transcript_id)
    }

    /// Looks up the site rows and the matching reads for one pair.
    ///
    /// The site rows and the reads are independent lookups: a site with no
    /// reads is a normal result. Store failures are passed through without
    /// retrying.
    pub fn resolve(
        &self,
        transcript_id: &str,
        position: i64,
    ) -> Result<Resolution, DataSourceError> {
        let transcript_id = transcript_id.trim();
        if transcript_id.is_empty() {
            return Ok(Resolution::NoQuery);
        }

        let rnames = self.sites.rnames_for(transcript_id, position);
        let reads = if rnames.is_empty() {
            Vec::new()
        } else {
            self.store.matching_reads(&rnames, position)?
        };

        let site_rows = self.sites.site_row(transcript_id, position);
        if site_rows.is_empty() {
            warn!("No site found for {}:{}", transcript_id, position);
        }

        Ok(Resolution::Resolved(Arc::new(SearchResult {
            transcript_id: transcript_id.to_string(),
            position,
            site_rows,
            reads,
        })))
    }
}

/// Search state of a single user.
///
/// Holds the selected transcript, its position choices and the cached result
/// of the last search. Every successful search replaces the cache and bumps
/// `generation`, so consumers can poll for changes instead of being pushed.
pub struct Session<B: ReadBackend = SqliteReads> {
    resolver: MatchResolver<B>,
    threshold: f64,
    transcript_id: Option<String>,
    positions: Vec<i64>,
    cache: Option<Arc<SearchResult>>,
    generation: u64,
}

impl<B: ReadBackend> Session<B> {
    pub fn new(resolver: MatchResolver<B>, threshold: f64) -> Self {
        Self {
            resolver,
            threshold,
            transcript_id: None,
            positions: Vec::new(),
            cache: None,
            generation: 0,
        }
    }

    /// Refreshes the position choices; the cached reads stay until the next search.
    pub fn select_transcript(&mut self, transcript_id: &str) -> &[i64] {
        let transcript_id = transcript_id.trim();

        if transcript_id.is_empty() {
            self.transcript_id = None;
            self.positions.clear();
        } else {
            self.positions = self.resolver.positions_for(transcript_id);
            self.transcript_id = Some(transcript_id.to_string());
        }

        &self.positions
    }

    /// Resolves `position` on the selected transcript.
    ///
    /// Without a selected transcript nothing is queried and the state is left
    /// untouched. On error the previous cache is kept.
    pub fn search(&mut self, position: i64) -> Result<Resolution, DataSourceError> {
        let transcript_id = match &self.transcript_id {
            Some(id) => id.clone(),
            None => return Ok(Resolution::NoQuery),
        };

        let resolution = self.resolver.resolve(&transcript_id, position)?;
        if let Resolution::Resolved(result) = &resolution {
            info!(
                "Search {}:{} -> {} site rows, {} reads",
                result.transcript_id,
                result.position,
                result.site_rows.len(),
                result.reads.len()
            );

            self.cache = Some(Arc::clone(result));
            self.generation += 1;
        }

        Ok(resolution)
    }

    pub fn summary(&self) -> Summary {
        summarize(
            self.cache.as_ref().map(|result| result.reads.as_slice()),
            self.threshold,
        )
    }

    pub fn cached(&self) -> Option<&Arc<SearchResult>> {
        self.cache.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
