use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use config::{COUNTS_REPORT, DISTRIBUTION_REPORT, SITE_REPORT};
use log::info;
use mako_pack::LongRow;
use serde::Serialize;
use serde_json::Value;

use crate::utils::{Distribution, GroupCount, Summary};

const SITE_HEADER: &str = "column\tvalue";
const COUNTS_HEADER: &str = "sample_name\tgroup_name\tsuccesses\tfailures";

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    transcript_id: &'a str,
    position: i64,
    site: &'a [LongRow],
    counts: &'a [GroupCount],
    distribution: Option<&'a Distribution>,
}

/// strings are written raw, null as an empty cell
fn fmt_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn write_site<W: Write>(writer: &mut W, rows: &[LongRow]) -> std::io::Result<()> {
    writeln!(writer, "{SITE_HEADER}")?;
    for row in rows {
        writeln!(writer, "{}\t{}", row.column, fmt_cell(&row.value))?;
    }

    Ok(())
}

pub fn write_counts<W: Write>(writer: &mut W, counts: &[GroupCount]) -> std::io::Result<()> {
    writeln!(writer, "{COUNTS_HEADER}")?;
    for count in counts {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            count.sample_name, count.group_name, count.successes, count.failures
        )?;
    }

    Ok(())
}

pub fn write_distribution<W: Write>(
    writer: &mut W,
    distribution: &Distribution,
) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, distribution)?;
    writeln!(writer)?;

    Ok(())
}

/// Writes the three report files into `outdir`.
///
/// `distribution.json` is only written when there is data to plot.
pub fn write_reports(
    outdir: &Path,
    rows: &[LongRow],
    summary: &Summary,
) -> anyhow::Result<Vec<PathBuf>> {
    create_dir_all(outdir)?;
    let mut written = Vec::new();

    let path = outdir.join(SITE_REPORT);
    let mut writer = BufWriter::new(File::create(&path)?);
    write_site(&mut writer, rows)?;
    writer.flush()?;
    written.push(path);

    let counts: &[GroupCount] = match summary {
        Summary::Data { counts, .. } => counts,
        Summary::NoData => &[],
    };
    let path = outdir.join(COUNTS_REPORT);
    let mut writer = BufWriter::new(File::create(&path)?);
    write_counts(&mut writer, counts)?;
    writer.flush()?;
    written.push(path);

    if let Summary::Data { distribution, .. } = summary {
        let path = outdir.join(DISTRIBUTION_REPORT);
        let mut writer = BufWriter::new(File::create(&path)?);
        write_distribution(&mut writer, distribution)?;
        writer.flush()?;
        written.push(path);
    }

    info!("Reports written to {:?}", outdir);
    Ok(written)
}

/// Prints a search outcome to `writer`, either as two TSV blocks or as one
/// JSON document.
pub fn print_summary<W: Write>(
    writer: &mut W,
    transcript_id: &str,
    position: i64,
    rows: &[LongRow],
    summary: &Summary,
    json: bool,
) -> anyhow::Result<()> {
    let (counts, distribution) = match summary {
        Summary::Data {
            counts,
            distribution,
        } => (counts.as_slice(), Some(distribution)),
        Summary::NoData => (&[][..], None),
    };

    if json {
        let report = JsonReport {
            transcript_id,
            position,
            site: rows,
            counts,
            distribution,
        };
        serde_json::to_writer_pretty(&mut *writer, &report)?;
        writeln!(writer)?;
    } else {
        write_site(writer, rows)?;
        writeln!(writer)?;
        write_counts(writer, counts)?;
    }

    Ok(())
}

pub fn print_positions<W: Write>(writer: &mut W, positions: &[i64]) -> std::io::Result<()> {
    for position in positions {
        writeln!(writer, "{position}")?;
    }

    Ok(())
}
