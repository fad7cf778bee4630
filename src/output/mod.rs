//! Export of normalized records to a file.
//!
//! Three formats are supported:
//!
//! - **text** - one block of `dotted.path: value` lines per record, blocks
//!   separated by a blank line
//! - **csv** - one column per flattened dotted path seen in any record, one row
//!   per record, empty cells where a record lacks a column
//! - **json** - a pretty-printed array of the nested records
//!
//! Records are written in the order given. Records without any field are
//! skipped by the text and CSV writers and kept as `{}` in JSON. The destination
//! is replaced, never appended to, and only appears once the write has completed.

mod tabular;
mod text;

pub use tabular::{column_set, write_csv};
pub use text::write_text;

use crate::audit::types::NormalizedRecord;
use crate::error::{ExportError, Result};
use crate::utils::writer::OutputFile;
use log::{info, warn};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    /// `path: value` lines, one block per record
    #[default]
    Text,
    /// Flattened columns, one row per record
    Csv,
    /// Pretty-printed JSON array
    Json,
}

impl ExportFormat {
    /// Map the classic `csv_mode` switch onto a format
    pub fn from_csv_mode(csv_mode: bool) -> Self {
        if csv_mode {
            Self::Csv
        } else {
            Self::Text
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Csv => "csv",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// Where and how an export is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub path: PathBuf,
    pub format: ExportFormat,
}

impl ExportTarget {
    pub fn new(path: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }
}

/// Serialize `records` into `writer` using `format`.
pub fn write_records_to<W: Write>(
    writer: &mut W,
    records: &[NormalizedRecord],
    format: ExportFormat,
) -> io::Result<()> {
    match format {
        ExportFormat::Text => write_text(writer, records),
        ExportFormat::Csv => write_csv(writer, records),
        ExportFormat::Json => write_json(writer, records),
    }
}

/// Write every record to `target`, replacing whatever was there.
///
/// Returns the path written.
pub fn write_records(records: &[NormalizedRecord], target: &ExportTarget) -> Result<PathBuf> {
    let path: &Path = &target.path;

    let empty = records.iter().filter(|r| r.is_empty()).count();
    if empty > 0 && target.format != ExportFormat::Json {
        warn!("Skipping {} records with no fields in {} output", empty, target.format);
    }

    let mut out = OutputFile::create(path).map_err(|e| ExportError::output(path, e))?;

    write_records_to(&mut out, records, target.format)
        .map_err(|e| ExportError::output(path, e))?;
    let written = out.commit().map_err(|e| ExportError::output(path, e))?;

    info!(
        "Wrote {} records as {} to {}",
        records.len(),
        target.format,
        written.display()
    );
    Ok(written)
}

fn write_json<W: Write>(writer: &mut W, records: &[NormalizedRecord]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, records)?;
    writeln!(writer)
}
