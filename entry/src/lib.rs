use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use config::{ArgCheck, BINARIZE_THRESHOLD, READS_DB_ENV, SITES_DB_ENV};
use log::{error, info};
use mako_lookup::core::{MatchResolver, Resolution, Session};
use mako_lookup::report::{print_positions, print_summary};
use mako_pack::{ReadBackend, ReadStore, SiteIndex};

const EXIT: [&str; 2] = ["quit", "exit"];

#[derive(Debug, Parser)]
#[command(name = "makoview")]
#[command(about = "makoview: look up per-site modification calls and their reads")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the recorded positions of a transcript
    #[command(name = "positions")]
    Positions(PositionsArgs),
    /// Resolve one transcript position and summarise its reads
    #[command(name = "search")]
    Search(mako_lookup::cli::Args),
    /// Interactive session over stdin
    #[command(name = "explore")]
    Explore(ExploreArgs),
}

#[derive(Debug, Clone, Args)]
pub struct PositionsArgs {
    #[arg(
        short = 'd',
        long = "differential-results",
        required = true,
        value_name = "PATH",
        env = SITES_DB_ENV,
        help = "Path to the SQLite file holding the 'sites' table"
    )]
    pub sites: PathBuf,

    #[arg(
        short = 'i',
        long = "transcript-id",
        required = true,
        value_name = "ID",
        help = "Transcript to list positions for"
    )]
    pub transcript_id: String,
}

impl ArgCheck for PositionsArgs {
    fn get_dbs(&self) -> Vec<(&'static str, &PathBuf)> {
        vec![("--differential-results", &self.sites)]
    }
}

#[derive(Debug, Clone, Args)]
pub struct ExploreArgs {
    #[arg(
        short = 'd',
        long = "differential-results",
        required = true,
        value_name = "PATH",
        env = SITES_DB_ENV,
        help = "Path to the SQLite file holding the 'sites' table"
    )]
    pub sites: PathBuf,

    #[arg(
        short = 'm',
        long = "modification-db",
        required = true,
        value_name = "PATH",
        env = READS_DB_ENV,
        help = "Path to the SQLite file holding the 'reads' table"
    )]
    pub reads: PathBuf,

    #[arg(
        short = 'T',
        long = "threshold",
        value_name = "FLOAT",
        default_value_t = BINARIZE_THRESHOLD,
        help = "Probability at or above which a read counts as modified"
    )]
    pub threshold: f64,
}

impl ArgCheck for ExploreArgs {
    fn get_threshold(&self) -> Option<f64> {
        Some(self.threshold)
    }

    fn get_dbs(&self) -> Vec<(&'static str, &PathBuf)> {
        vec![
            ("--differential-results", &self.sites),
            ("--modification-db", &self.reads),
        ]
    }
}

/// one parsed line of an explore session
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Skip,
    Quit,
    Select(String),
    Search(String, i64),
    Malformed(String),
}

pub fn parse_command(line: &str) -> Command {
    let mut fields = line.split_whitespace();

    match (fields.next(), fields.next(), fields.next()) {
        (None, _, _) => Command::Skip,
        (Some(word), None, _) if EXIT.contains(&word) => Command::Quit,
        (Some(id), None, _) => Command::Select(id.to_string()),
        (Some(id), Some(position), None) => match position.parse::<i64>() {
            Ok(position) => Command::Search(id.to_string(), position),
            Err(_) => Command::Malformed(format!("invalid position '{}'", position)),
        },
        (Some(_), Some(_), Some(_)) => {
            Command::Malformed(format!("expected '<transcript_id> [position]', got '{}'", line.trim()))
        }
    }
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Positions(args) => {
            args.check()?;
            let stdout = std::io::stdout();
            positions(&args, &mut stdout.lock())
        }
        Commands::Search(args) => {
            args.check()?;
            mako_lookup::run(&args).map(|_| ())
        }
        Commands::Explore(args) => {
            args.check()?;

            let sites = Arc::new(SiteIndex::load(&args.sites)?);
            let store = ReadStore::open(&args.reads)?;
            let mut session = Session::new(MatchResolver::new(sites, store), args.threshold);

            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            explore(&mut session, stdin.lock(), &mut stdout.lock())
        }
    }
}

pub fn positions<W: Write>(args: &PositionsArgs, out: &mut W) -> anyhow::Result<()> {
    let sites = SiteIndex::load(&args.sites)?;
    let positions = sites.positions_for(&args.transcript_id);
    info!(
        "{} positions for {}",
        positions.len(),
        args.transcript_id.trim()
    );

    print_positions(out, &positions)?;
    out.flush()?;
    Ok(())
}

/// Drives a session from line input until EOF or `quit`.
///
/// Store failures end the current search only; the session keeps its
/// previous cache and continues reading.
pub fn explore<R, W, B>(session: &mut Session<B>, input: R, out: &mut W) -> anyhow::Result<()>
where
    R: BufRead,
    W: Write,
    B: ReadBackend,
{
    for line in input.lines() {
        let line = line?;

        match parse_command(&line) {
            Command::Skip => continue,
            Command::Quit => break,
            Command::Malformed(msg) => writeln!(out, "error: {}", msg)?,
            Command::Select(id) => {
                let positions = session.select_transcript(&id);
                if positions.is_empty() {
                    writeln!(out, "no positions for {}", id)?;
                } else {
                    print_positions(out, positions)?;
                }
            }
            Command::Search(id, position) => {
                session.select_transcript(&id);
                match session.search(position) {
                    Ok(Resolution::NoQuery) => continue,
                    Ok(Resolution::Resolved(result)) if result.is_empty() => {
                        writeln!(out, "no data for {}:{}", id, position)?
                    }
                    Ok(Resolution::Resolved(result)) => print_summary(
                        out,
                        &result.transcript_id,
                        position,
                        &result.site_rows,
                        &session.summary(),
                        false,
                    )?,
                    Err(e) => {
                        error!("{}", e);
                        writeln!(out, "error: {}", e)?;
                    }
                }
            }
        }

        out.flush()?;
    }

    Ok(())
}
