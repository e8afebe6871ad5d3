//! Persisting match results.
//!
//! Two flat files per run, both headerless `id,value` CSV:
//!
//! - assignments: `citation_id,segment_id`
//! - audit: `citation_id,DECISION_KIND`
//!
//! In append mode repeated runs accumulate; when read back, the last line
//! for an id wins.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use segment_match_matcher_models::{MatchDecision, WriteMode};

use crate::resolver::Resolution;

/// Destination for resolution output.
pub trait ResultSink {
    /// Records one citation → segment assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn write_assignment(&mut self, citation_id: &str, segment_id: &str) -> Result<(), SinkError>;

    /// Records one citation → decision audit entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn write_decision(
        &mut self,
        citation_id: &str,
        decision: MatchDecision,
    ) -> Result<(), SinkError>;

    /// Flushes buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&mut self) -> Result<(), SinkError>;
}

/// Writes a whole [`Resolution`] to `sink` and flushes it.
///
/// Returns the number of assignment lines written.
///
/// # Errors
///
/// Returns the first write error.
pub fn write_resolution(
    sink: &mut dyn ResultSink,
    resolution: &Resolution,
) -> Result<u64, SinkError> {
    let mut written = 0u64;
    for (citation_id, segment_id) in &resolution.assignments {
        sink.write_assignment(citation_id, segment_id)?;
        written += 1;
    }
    for (citation_id, decision) in &resolution.decisions {
        sink.write_decision(citation_id, *decision)?;
    }
    sink.flush()?;
    Ok(written)
}

/// CSV file sink for assignments and audit decisions.
pub struct CsvResultSink {
    assignments: csv::Writer<File>,
    assignments_path: PathBuf,
    audit: csv::Writer<File>,
    audit_path: PathBuf,
}

impl CsvResultSink {
    /// Opens both output files, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be opened.
    pub fn open(
        assignments_path: &Path,
        audit_path: &Path,
        mode: WriteMode,
    ) -> Result<Self, SinkError> {
        log::info!(
            "Writing assignments to {} and audit to {} ({mode})",
            assignments_path.display(),
            audit_path.display()
        );

        Ok(Self {
            assignments: open_writer(assignments_path, mode)?,
            assignments_path: assignments_path.to_path_buf(),
            audit: open_writer(audit_path, mode)?,
            audit_path: audit_path.to_path_buf(),
        })
    }
}

impl ResultSink for CsvResultSink {
    fn write_assignment(&mut self, citation_id: &str, segment_id: &str) -> Result<(), SinkError> {
        self.assignments
            .write_record([citation_id, segment_id])
            .map_err(|e| SinkError::Csv {
                path: self.assignments_path.display().to_string(),
                source: e,
            })
    }

    fn write_decision(
        &mut self,
        citation_id: &str,
        decision: MatchDecision,
    ) -> Result<(), SinkError> {
        self.audit
            .write_record([citation_id, decision.as_ref()])
            .map_err(|e| SinkError::Csv {
                path: self.audit_path.display().to_string(),
                source: e,
            })
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.assignments.flush().map_err(|e| SinkError::Io {
            path: self.assignments_path.display().to_string(),
            source: e,
        })?;
        self.audit.flush().map_err(|e| SinkError::Io {
            path: self.audit_path.display().to_string(),
            source: e,
        })
    }
}

fn open_writer(path: &Path, mode: WriteMode) -> Result<csv::Writer<File>, SinkError> {
    let io_err = |e| SinkError::Io {
        path: path.display().to_string(),
        source: e,
    };

    crate::paths::ensure_parent(path).map_err(io_err)?;

    let mut options = OpenOptions::new();
    match mode {
        WriteMode::Append => options.create(true).append(true),
        WriteMode::Overwrite => options.create(true).write(true).truncate(true),
    };
    let file = options.open(path).map_err(io_err)?;

    Ok(csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file))
}

/// Reads an assignments file back into a map.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line does not have
/// two fields.
pub fn read_assignments(path: &Path) -> Result<BTreeMap<String, String>, SinkError> {
    read_pairs(path, |value| Ok(value.to_string()))
}

/// Reads an audit file back into a map.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds an unknown
/// decision kind.
pub fn read_decisions(path: &Path) -> Result<BTreeMap<String, MatchDecision>, SinkError> {
    read_pairs(path, |value| {
        MatchDecision::from_str(value).map_err(|_| value.to_string())
    })
}

fn read_pairs<T>(
    path: &Path,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<BTreeMap<String, T>, SinkError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| SinkError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;

    let mut pairs = BTreeMap::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| SinkError::Csv {
            path: path.display().to_string(),
            source: e,
        })?;

        let (Some(key), Some(value)) = (record.get(0), record.get(1)) else {
            return Err(SinkError::Malformed {
                path: path.display().to_string(),
                line: line + 1,
                reason: format!("expected 2 fields, found {}", record.len()),
            });
        };

        let value = parse(value).map_err(|bad| SinkError::Malformed {
            path: path.display().to_string(),
            line: line + 1,
            reason: format!("unrecognized value {bad:?}"),
        })?;
        pairs.insert(key.to_string(), value);
    }

    Ok(pairs)
}

/// Errors from writing or reading result files.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// CSV read/write error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Output file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// I/O error opening or flushing a file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Output file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A line in a result file could not be interpreted.
    #[error("Malformed line {line} in {path}: {reason}")]
    Malformed {
        /// Result file.
        path: String,
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },
}
