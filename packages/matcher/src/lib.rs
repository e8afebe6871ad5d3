#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Links traffic citations to street-centerline segments by address range.
//!
//! Citations carry a street name and house number but no coordinates.
//! The road network carries house-number ranges per segment. This crate
//! joins the two.
//!
//! # Architecture
//!
//! - **Normalize**: street names on both sides go through the same
//!   [`normalize::StreetNormalizer`] (suffix synonyms, `west 56th` →
//!   `w 56`), backed by a [`suffixes::SuffixTable`] loaded once.
//! - **Index**: road rows become per-street house-number ranges
//!   ([`road_index::RoadRangeIndex`]); streets with missing bounds are
//!   flagged incomplete.
//! - **Group**: citations collapse into distinct `(street, number)`
//!   addresses ([`grouper::CitationGroups`]), optionally checkpointed.
//! - **Resolve**: each address gets a segment and a
//!   [`MatchDecision`] ([`resolver`]), with non-exact fallbacks chosen by
//!   a [`picker::SegmentPicker`].
//! - **Sink**: assignments and audit decisions are written as flat CSV
//!   ([`sink`]).
//!
//! # Usage
//!
//! ```rust,no_run
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use segment_match_matcher::{MatchConfig, RunOptions, run};
//!
//! let config = MatchConfig::default();
//! let report = run(&config, &RunOptions::default())?;
//! println!("Match performance: {:.2} %", report.match_rate());
//! # Ok(())
//! # }
//! ```

pub mod grouper;
pub mod house_number;
pub mod input;
pub mod inspect;
pub mod normalize;
pub mod paths;
pub mod picker;
pub mod progress;
pub mod resolver;
pub mod road_index;
pub mod sink;
pub mod suffixes;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

pub use segment_match_matcher_models::{
    CitationColumns, CitationRecord, DecisionCounts, FallbackPolicy, HouseNumberRange,
    MatchConfig, MatchDecision, MatchReport, RoadColumns, RoadSegmentRecord, WriteMode,
};

use grouper::{CitationGrouper, CitationGroups};
use normalize::StreetNormalizer;
use paths::RunPaths;
use progress::{ProgressCallback, null_progress};
use road_index::{RoadRangeIndex, RoadRangeIndexBuilder};
use sink::CsvResultSink;
use suffixes::SuffixTable;

/// Errors from a matching run.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// Suffix table could not be loaded.
    #[error("Suffix table error: {0}")]
    Suffixes(#[from] suffixes::SuffixTableError),

    /// An input table could not be read.
    #[error("Input error: {0}")]
    Load(#[from] input::LoadError),

    /// The road network could not be indexed.
    #[error("Index error: {0}")]
    Index(#[from] road_index::IndexError),

    /// Grouping or checkpoint I/O failed.
    #[error("Grouping error: {0}")]
    Group(#[from] grouper::GroupError),

    /// Results could not be written or read.
    #[error("Output error: {0}")]
    Sink(#[from] sink::SinkError),

    /// The config file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Config file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`MatchConfig`].
    #[error("Config error in {path}: {source}")]
    Config {
        /// Config file path.
        path: String,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}

/// Loads a [`MatchConfig`] from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<MatchConfig, MatchError> {
    let content = std::fs::read_to_string(path).map_err(|e| MatchError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let config = toml::from_str(&content).map_err(|e| MatchError::Config {
        path: path.display().to_string(),
        source: e,
    })?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Per-invocation options that are not part of the persisted config.
#[derive(Default)]
pub struct RunOptions {
    /// Read grouped citations from the checkpoint instead of the citation
    /// CSV.
    pub from_checkpoint: bool,
    /// Write the grouped citations to the checkpoint before resolving.
    pub save_checkpoint: bool,
    /// Progress reporting for the resolution phase.
    pub progress: Option<Arc<dyn ProgressCallback>>,
}

/// Reads and groups citations.
///
/// # Errors
///
/// Returns an error if the citation CSV cannot be read or, in strict
/// mode, a citation id conflicts.
pub fn load_groups(
    config: &MatchConfig,
    path: &Path,
    normalizer: StreetNormalizer<'_>,
) -> Result<CitationGroups, MatchError> {
    let mut grouper = CitationGrouper::new(normalizer, config.strict_citation_ids);
    input::read_citations(
        path,
        &config.citation_columns,
        config.row_limit,
        |record| grouper.push(record),
    )?;
    Ok(grouper.finish()?)
}

/// Reads the road network and builds the range index.
///
/// # Errors
///
/// Returns an error if the road CSV cannot be read or has no usable rows.
pub fn load_index(
    config: &MatchConfig,
    path: &Path,
    normalizer: StreetNormalizer<'_>,
) -> Result<RoadRangeIndex, MatchError> {
    let mut builder = RoadRangeIndexBuilder::new(normalizer);
    input::read_road_network(path, &config.road_columns, |row| builder.push(&row))?;
    Ok(builder.finish()?)
}

/// Groups citations and writes the JSON checkpoint, without matching.
///
/// # Errors
///
/// Returns an error if any input cannot be read or the checkpoint cannot
/// be written.
pub fn group_to_checkpoint(config: &MatchConfig) -> Result<CitationGroups, MatchError> {
    let paths = RunPaths::from_config(config);
    let suffixes = SuffixTable::load(&paths.suffixes)?;
    let normalizer = StreetNormalizer::new(&suffixes);

    let groups = load_groups(config, &paths.citations, normalizer)?;
    groups.save(&paths.checkpoint)?;
    Ok(groups)
}

/// Runs a full batch: load, group, resolve, write, report.
///
/// The road network is indexed before citations are read, so an empty or
/// unreadable road file fails the run before any citation work.
///
/// # Errors
///
/// Returns an error if any input cannot be read, the road network is
/// empty, or results cannot be written.
pub fn run(config: &MatchConfig, options: &RunOptions) -> Result<MatchReport, MatchError> {
    let start = Instant::now();
    let paths = RunPaths::from_config(config);
    let progress = options.progress.clone().unwrap_or_else(null_progress);

    let suffixes = SuffixTable::load(&paths.suffixes)?;
    let normalizer = StreetNormalizer::new(&suffixes);

    let index = load_index(config, &paths.roads, normalizer)?;

    let groups = if options.from_checkpoint {
        CitationGroups::load(&paths.checkpoint)?
    } else {
        load_groups(config, &paths.citations, normalizer)?
    };
    if options.save_checkpoint && !options.from_checkpoint {
        groups.save(&paths.checkpoint)?;
    }

    let mut picker = picker::picker_for(config.fallback);
    let resolution = resolver::resolve(&groups, &index, picker.as_mut(), progress.as_ref());

    let mut sink = CsvResultSink::open(&paths.assignments, &paths.audit, config.write_mode)?;
    sink::write_resolution(&mut sink, &resolution)?;

    let report = MatchReport {
        citations_read: groups.stats.rows,
        dropped_missing_fields: groups.stats.dropped_missing_fields,
        dropped_conflicting_ids: groups.stats.dropped_conflicting_ids,
        citations_grouped: groups.stats.grouped,
        groups: groups.len() as u64,
        road_rows: index.row_count(),
        indexed_streets: index.indexed_street_count() as u64,
        incomplete_streets: index.incomplete_streets().len() as u64,
        assigned_citations: resolution.assignments.len() as u64,
        decisions: resolution.counts,
        elapsed_secs: start.elapsed().as_secs_f64(),
    };

    log::info!(
        "Match performance: {:.2} % ({} of {} citations) in {:.1}s",
        report.match_rate(),
        report.assigned_citations,
        report.citations_grouped,
        report.elapsed_secs
    );

    Ok(report)
}
