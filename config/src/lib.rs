use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

mod fns;
pub use fns::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// numeric values
pub const BINARIZE_THRESHOLD: f64 = 0.5;
pub const RATIO_DIGITS: i32 = 3;
pub const MAX_BOUND_PARAMS: usize = 900; // SQLite caps host parameters per statement
pub const PLOT_Y_RANGE: (f64, f64) = (-0.05, 1.05);

// tables and columns
pub const SITES_TABLE: &str = "sites";
pub const READS_TABLE: &str = "reads";
pub const TRANSCRIPT_ID: &str = "transcript_id";
pub const TRANSCRIPT_POSITION: &str = "transcript_position";
pub const RNAME: &str = "rname";
pub const SAMPLE_NAME: &str = "sample_name";
pub const GROUP_NAME: &str = "group_name";
pub const PROBABILITY_MODIFIED: &str = "probability_modified";
pub const IGNORED: &str = "ignored";

pub const SITE_COLUMNS: [&str; 3] = [TRANSCRIPT_ID, TRANSCRIPT_POSITION, RNAME];
pub const READ_COLUMNS: [&str; 6] = [
    RNAME,
    TRANSCRIPT_POSITION,
    SAMPLE_NAME,
    GROUP_NAME,
    PROBABILITY_MODIFIED,
    IGNORED,
];

// environment
pub const SITES_DB_ENV: &str = "MAKO_DIFFERENTIAL_DB";
pub const READS_DB_ENV: &str = "MAKO_MODIFICATION_DB";

// file names
pub const SITE_REPORT: &str = "site.tsv";
pub const COUNTS_REPORT: &str = "counts.tsv";
pub const DISTRIBUTION_REPORT: &str = "distribution.json";

// chart annotations
pub const X_LABEL: &str = "Sample (Group)";
pub const Y_LABEL: &str = "Binarised Probability Modified";
pub const PLOT_TITLE: &str = "Violin Plot of Binarised Probability Modified for each Sample";

// os
#[cfg(not(windows))]
const TICK_SETTINGS: (&str, u64) = ("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ", 80);
#[cfg(windows)]
const TICK_SETTINGS: (&str, u64) = (r"+-x| ", 200);

/// return a pre-configured progress bar
pub fn get_progress_bar(length: u64, msg: &str) -> ProgressBar {
    let progressbar_style = ProgressStyle::default_spinner()
        .tick_chars(TICK_SETTINGS.0)
        .template(" {spinner} {msg:<30} {wide_bar} ETA {eta_precise} ")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let progress_bar = ProgressBar::new(length);

    progress_bar.set_style(progressbar_style);
    progress_bar.enable_steady_tick(Duration::from_millis(TICK_SETTINGS.1));
    progress_bar.set_message(msg.to_owned());

    progress_bar
}

/// argument checker for all subcommands
pub trait ArgCheck {
    fn check(&self) -> Result<(), ConfigurationError> {
        self.validate_args()
    }

    fn validate_args(&self) -> Result<(), ConfigurationError> {
        self.check_dbs()?;

        if let Some(threshold) = self.get_threshold() {
            check_threshold(threshold)?;
        }

        Ok(())
    }

    fn check_dbs(&self) -> Result<(), ConfigurationError> {
        let dbs = self.get_dbs();
        if dbs.is_empty() {
            return Err(ConfigurationError::InvalidInput(
                "No database files provided".to_string(),
            ));
        }

        for (name, db) in dbs {
            if db.as_os_str().is_empty() {
                return Err(ConfigurationError::MissingPath(name.to_string()));
            }
            validate(db)?;
            log::info!("Using {} database: {:?}", name, db);
        }

        Ok(())
    }

    fn get_threshold(&self) -> Option<f64> {
        None
    }

    fn get_dbs(&self) -> Vec<(&'static str, &PathBuf)>;
}

/// error handling for startup configuration
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Missing required path: {0}")]
    MissingPath(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// argument validation
pub fn validate(arg: &PathBuf) -> Result<(), ConfigurationError> {
    if !arg.exists() {
        return Err(ConfigurationError::InvalidInput(format!(
            "{:?} does not exist",
            arg
        )));
    }

    if !arg.is_file() {
        return Err(ConfigurationError::InvalidInput(format!(
            "{:?} is not a file",
            arg
        )));
    }

    match std::fs::metadata(arg) {
        Ok(metadata) if metadata.len() == 0 => Err(ConfigurationError::InvalidInput(format!(
            "file {:?} is empty",
            arg
        ))),
        Ok(_) => Ok(()),
        Err(e) => Err(ConfigurationError::IoError(e)),
    }
}

pub fn check_threshold(threshold: f64) -> Result<(), ConfigurationError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(ConfigurationError::InvalidInput(format!(
            "threshold {} is outside [0, 1]",
            threshold
        )));
    }

    Ok(())
}
