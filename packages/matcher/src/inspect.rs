//! Spot-checking finished runs.
//!
//! Picks one assignment at random and gathers what a person needs to
//! verify it by hand: the assigned segment, the audit decision, and
//! optionally the raw street names on both sides of the join.

use std::path::Path;

use rand::Rng;
use segment_match_matcher_models::{CitationColumns, MatchDecision, RoadColumns};

use crate::input::{self, LoadError};
use crate::sink::{self, SinkError};

/// One sampled assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledMatch {
    /// The sampled citation.
    pub citation_id: String,
    /// Segment it was assigned to.
    pub segment_id: String,
    /// Audit decision, if the audit file has one for this citation.
    pub decision: Option<MatchDecision>,
}

/// Picks a random assignment from the result files.
///
/// Returns `None` if the assignments file is empty.
///
/// # Errors
///
/// Returns an error if either file cannot be read.
pub fn sample_match(
    assignments_path: &Path,
    audit_path: &Path,
    rng: &mut impl Rng,
) -> Result<Option<SampledMatch>, SinkError> {
    let assignments = sink::read_assignments(assignments_path)?;
    if assignments.is_empty() {
        return Ok(None);
    }

    let pick = rng.gen_range(0..assignments.len());
    let Some((citation_id, segment_id)) = assignments.into_iter().nth(pick) else {
        return Ok(None);
    };

    let decision = if audit_path.exists() {
        sink::read_decisions(audit_path)?.get(&citation_id).copied()
    } else {
        log::warn!("Audit file not found: {}", audit_path.display());
        None
    };

    Ok(Some(SampledMatch {
        citation_id,
        segment_id,
        decision,
    }))
}

/// Finds the raw street name written on a citation.
///
/// # Errors
///
/// Returns an error if the citation file cannot be read.
pub fn citation_street(
    citations_path: &Path,
    columns: &CitationColumns,
    citation_id: &str,
) -> Result<Option<String>, LoadError> {
    let mut found = None;
    input::read_citations(citations_path, columns, None, |record| {
        if found.is_none() && record.citation_id == citation_id {
            found = record.street_name;
        }
    })?;
    Ok(found)
}

/// Finds the raw street name of a road segment.
///
/// # Errors
///
/// Returns an error if the road file cannot be read.
pub fn segment_street(
    roads_path: &Path,
    columns: &RoadColumns,
    segment_id: &str,
) -> Result<Option<String>, LoadError> {
    let mut found = None;
    input::read_road_network(roads_path, columns, |record| {
        if found.is_none() && record.segment_id == segment_id {
            found = Some(record.street_name);
        }
    })?;
    Ok(found)
}
