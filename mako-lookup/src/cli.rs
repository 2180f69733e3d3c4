use clap::Parser;
use config::{ArgCheck, BINARIZE_THRESHOLD, READS_DB_ENV, SITES_DB_ENV};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
pub struct Args {
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
        short = 'i',
        long = "transcript-id",
        required = true,
        value_name = "ID",
        help = "Transcript to look up"
    )]
    pub transcript_id: String,

    #[arg(
        short = 'p',
        long = "position",
        required = false,
        value_name = "POSITION",
        help = "Transcript position to search; lists the known positions when absent"
    )]
    pub position: Option<i64>,

    #[arg(
        short = 'T',
        long = "threshold",
        value_name = "FLOAT",
        default_value_t = BINARIZE_THRESHOLD,
        help = "Probability at or above which a read counts as modified"
    )]
    pub threshold: f64,

    #[arg(
        short = 'o',
        long = "outdir",
        required = false,
        value_name = "DIR",
        help = "Write site.tsv, counts.tsv and distribution.json here instead of stdout"
    )]
    pub outdir: Option<PathBuf>,

    #[arg(
        long = "json",
        help = "Print a single JSON document to stdout",
        default_value = "false"
    )]
    pub json: bool,
}

impl Args {
    pub fn from(args: Vec<String>) -> Result<Self, clap::Error> {
        let mut full_args = vec![env!("CARGO_PKG_NAME").to_string()];
        full_args.extend(args);

        Args::try_parse_from(full_args)
    }
}

impl ArgCheck for Args {
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
