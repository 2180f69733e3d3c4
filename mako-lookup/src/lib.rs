//! Per-site lookup for makoview
//!
//! Resolves a (transcript_id, transcript_position) pair to the rows of the
//! differential-results table and to the non-ignored reads stored for the
//! same site, then summarises those reads as binarised modification calls
//! per sample and group.
//!
//! The site table is loaded once and shared; the read table is queried on
//! demand. A `Session` holds what one user has selected and searched, so the
//! counts and the distribution are always computed from the last search.

use std::io::Write;
use std::sync::Arc;

use config::ArgCheck;
use log::info;
use mako_pack::{ReadStore, SiteIndex};

pub mod cli;
pub mod core;
pub mod report;
pub mod utils;

use crate::core::{MatchResolver, Resolution, Session};
use crate::utils::Summary;

pub fn lib_mako_lookup(args: Vec<String>) -> anyhow::Result<Summary> {
    let args = cli::Args::from(args)?;
    args.check()?;

    run(&args)
}

/// Runs one lookup and prints or writes its outcome.
///
/// Without `--position` the known positions of the transcript are printed
/// and no read query is issued.
pub fn run(args: &cli::Args) -> anyhow::Result<Summary> {
    let sites = Arc::new(SiteIndex::load(&args.sites)?);
    let store = ReadStore::open(&args.reads)?;
    let mut session = Session::new(MatchResolver::new(sites, store), args.threshold);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    let positions = session.select_transcript(&args.transcript_id);
    let position = match args.position {
        Some(position) => position,
        None => {
            info!(
                "{} positions for {}",
                positions.len(),
                args.transcript_id.trim()
            );
            report::print_positions(&mut out, positions)?;
            out.flush()?;
            return Ok(Summary::NoData);
        }
    };

    let rows = match session.search(position)? {
        Resolution::NoQuery => {
            info!("Blank transcript id; nothing to search");
            return Ok(Summary::NoData);
        }
        Resolution::Resolved(result) => result.site_rows.clone(),
    };

    let summary = session.summary();
    if !summary.has_data() {
        info!("No reads for {}:{}", args.transcript_id.trim(), position);
    }

    match &args.outdir {
        Some(outdir) => {
            report::write_reports(outdir, &rows, &summary)?;
        }
        None => {
            report::print_summary(
                &mut out,
                args.transcript_id.trim(),
                position,
                &rows,
                &summary,
                args.json,
            )?;
            out.flush()?;
        }
    }

    Ok(summary)
}
