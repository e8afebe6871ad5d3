//! CSV readers for citation and road-network tables.
//!
//! Both tables are read by header name, so column order in the export
//! does not matter. Records are streamed to a callback rather than
//! collected, keeping memory flat on multi-million-row citation files.

use std::io::Read;
use std::path::Path;

use segment_match_matcher_models::{
    CitationColumns, CitationRecord, RoadColumns, RoadSegmentRecord,
};

/// Reads citation rows from a CSV file.
///
/// Stops after `limit` rows when set. Rows without a citation id are
/// skipped; blank street names and house numbers are passed through as
/// `None` so the grouper can count them.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, a configured column is
/// missing from the header, or a row cannot be parsed as CSV.
pub fn read_citations(
    path: &Path,
    columns: &CitationColumns,
    limit: Option<u64>,
    on_record: impl FnMut(CitationRecord),
) -> Result<u64, LoadError> {
    let file = open(path)?;
    log::info!("Reading citations from {}", path.display());
    read_citations_from(file, &path.display().to_string(), columns, limit, on_record)
}

/// Reads citation rows from any reader. `source` names the input in
/// error messages.
///
/// # Errors
///
/// Returns an error if the header cannot be read, lacks a configured
/// column, or a row cannot be parsed as CSV.
pub fn read_citations_from(
    reader: impl Read,
    source: &str,
    columns: &CitationColumns,
    limit: Option<u64>,
    mut on_record: impl FnMut(CitationRecord),
) -> Result<u64, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = headers(&mut rdr, source)?;

    let id_idx = column_index(&headers, &columns.citation_id, source)?;
    let street_idx = column_index(&headers, &columns.street_name, source)?;
    let number_idx = column_index(&headers, &columns.house_number, source)?;

    let mut count = 0u64;
    let mut lossy = 0u64;
    for result in rdr.byte_records() {
        if limit.is_some_and(|limit| count >= limit) {
            break;
        }

        let record = result.map_err(|e| LoadError::Csv {
            path: source.to_string(),
            source: e,
        })?;
        if std::str::from_utf8(record.as_slice()).is_err() {
            lossy += 1;
        }

        let Some(citation_id) = field(&record, id_idx) else {
            log::trace!("  skipping citation row without id: {record:?}");
            continue;
        };

        on_record(CitationRecord {
            citation_id,
            street_name: field(&record, street_idx),
            house_number: field(&record, number_idx),
        });
        count += 1;

        if count.is_multiple_of(1_000_000) {
            log::info!("  read {count} citations...");
        }
    }

    warn_lossy(lossy, source);
    log::debug!("  read {count} citation rows from {source}");
    Ok(count)
}

/// Reads road-network rows from a CSV file.
///
/// Rows without a segment id or street name are skipped. Geometry and
/// any other extra columns are ignored.
///
/// # Errors
///
/// Returns an error if the file cannot be opened, a configured column is
/// missing from the header, or a row cannot be parsed as CSV.
pub fn read_road_network(
    path: &Path,
    columns: &RoadColumns,
    on_record: impl FnMut(RoadSegmentRecord),
) -> Result<u64, LoadError> {
    let file = open(path)?;
    log::info!("Reading road network from {}", path.display());
    read_road_network_from(file, &path.display().to_string(), columns, on_record)
}

/// Reads road-network rows from any reader. `source` names the input in
/// error messages.
///
/// # Errors
///
/// Returns an error if the header cannot be read, lacks a configured
/// column, or a row cannot be parsed as CSV.
pub fn read_road_network_from(
    reader: impl Read,
    source: &str,
    columns: &RoadColumns,
    mut on_record: impl FnMut(RoadSegmentRecord),
) -> Result<u64, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = headers(&mut rdr, source)?;

    let id_idx = column_index(&headers, &columns.segment_id, source)?;
    let street_idx = column_index(&headers, &columns.street_name, source)?;
    let right_low_idx = column_index(&headers, &columns.right_low, source)?;
    let right_high_idx = column_index(&headers, &columns.right_high, source)?;
    let left_low_idx = column_index(&headers, &columns.left_low, source)?;
    let left_high_idx = column_index(&headers, &columns.left_high, source)?;

    let mut count = 0u64;
    let mut lossy = 0u64;
    for result in rdr.byte_records() {
        let record = result.map_err(|e| LoadError::Csv {
            path: source.to_string(),
            source: e,
        })?;
        if std::str::from_utf8(record.as_slice()).is_err() {
            lossy += 1;
        }

        let (Some(segment_id), Some(street_name)) =
            (field(&record, id_idx), field(&record, street_idx))
        else {
            log::trace!("  skipping road row without id or street: {record:?}");
            continue;
        };

        on_record(RoadSegmentRecord {
            segment_id,
            street_name,
            right_low: field(&record, right_low_idx),
            right_high: field(&record, right_high_idx),
            left_low: field(&record, left_low_idx),
            left_high: field(&record, left_high_idx),
        });
        count += 1;
    }

    warn_lossy(lossy, source);
    log::debug!("  read {count} road rows from {source}");
    Ok(count)
}

fn open(path: &Path) -> Result<std::fs::File, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound(path.display().to_string()));
    }
    std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn headers<R: Read>(rdr: &mut csv::Reader<R>, source: &str) -> Result<Vec<String>, LoadError> {
    let headers = rdr.byte_headers().map_err(|e| LoadError::Csv {
        path: source.to_string(),
        source: e,
    })?;
    Ok(headers
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect())
}

fn warn_lossy(lossy: u64, source: &str) {
    if lossy > 0 {
        log::warn!("  {lossy} rows in {source} were not valid UTF-8; invalid bytes replaced");
    }
}

/// Finds a column by header name, falling back to a case-insensitive
/// match.
fn column_index(headers: &[String], name: &str, source: &str) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|h| h == name)
        .or_else(|| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
        .ok_or_else(|| LoadError::MissingColumn {
            path: source.to_string(),
            column: name.to_string(),
        })
}

/// Returns the trimmed value at `idx`, or `None` if it is absent or blank.
///
/// Latin-1 exports are common, so invalid UTF-8 is replaced rather than
/// rejected and the row still reaches the missing-field checks.
fn field(record: &csv::ByteRecord, idx: usize) -> Option<String> {
    let raw = String::from_utf8_lossy(record.get(idx)?);
    let value = raw.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Errors from reading input tables.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// CSV parsing error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path to the CSV file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// I/O error opening the file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configured column is not in the header row.
    #[error("Column {column:?} not found in {path}")]
    MissingColumn {
        /// Path to the CSV file.
        path: String,
        /// The configured header name.
        column: String,
    },

    /// The input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),
}
