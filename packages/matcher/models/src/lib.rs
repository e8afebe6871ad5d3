#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for citation-to-segment matching.
//!
//! This crate contains only data types, configuration structs, and simple
//! conversions. It has no I/O and no matching logic.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A raw citation row as read from the source table.
///
/// Street name and house number are optional because the source data
/// regularly leaves them blank; such rows are dropped before grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    /// Opaque citation identifier (summons number).
    pub citation_id: String,
    /// Free-text street name as written on the citation.
    pub street_name: Option<String>,
    /// House number as written on the citation.
    pub house_number: Option<String>,
}

/// A raw road-network row (one street-centerline segment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadSegmentRecord {
    /// Segment identifier (e.g. the centerline `PHYSICALID`).
    pub segment_id: String,
    /// Street name of the segment.
    pub street_name: String,
    /// Lowest house number on the right side.
    pub right_low: Option<String>,
    /// Highest house number on the right side.
    pub right_high: Option<String>,
    /// Lowest house number on the left side.
    pub left_low: Option<String>,
    /// Highest house number on the left side.
    pub left_high: Option<String>,
}

impl RoadSegmentRecord {
    /// Returns the right and left `(low, high)` bounds if all four are
    /// present and non-blank.
    #[must_use]
    pub fn bounds(&self) -> Option<[(&str, &str); 2]> {
        Some([
            (present(&self.right_low)?, present(&self.right_high)?),
            (present(&self.left_low)?, present(&self.left_high)?),
        ])
    }
}

/// Returns the trimmed value if it is present and non-blank.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// One side of one road segment's house-number range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseNumberRange {
    /// Lower bound (inclusive), as it appears in the source.
    pub low: String,
    /// Upper bound (inclusive), as it appears in the source.
    pub high: String,
    /// Segment this range belongs to.
    pub segment_id: String,
}

/// How a citation was (or was not) linked to a segment.
///
/// Recorded per citation id for auditing only.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchDecision {
    /// The house number fell inside a range of the street.
    ExactRange,
    /// The street has no usable ranges; a segment of the street was picked.
    RandomNoNumberStreet,
    /// The house number is outside every range; a segment of the street
    /// was picked.
    RandomAnySegmentOfStreet,
    /// The street does not exist in the road network.
    StreetNotFound,
}

impl MatchDecision {
    /// Returns `true` if this decision produces a segment assignment.
    #[must_use]
    pub const fn is_matched(self) -> bool {
        !matches!(self, Self::StreetNotFound)
    }
}

/// Whether output files are appended to or truncated at the start of a run.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WriteMode {
    /// Append to existing output files, creating them if missing.
    #[default]
    Append,
    /// Truncate output files before writing.
    Overwrite,
}

/// How a segment is chosen when no exact range match exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Uniform random choice. A fixed `seed` makes runs reproducible.
    Random {
        /// Seed for the pseudo-random generator. `None` uses OS entropy.
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Always the smallest segment id among the candidates.
    FirstSegment,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::Random { seed: None }
    }
}

/// Header names of the citation columns that the matcher reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationColumns {
    /// Citation identifier column.
    pub citation_id: String,
    /// Street name column.
    pub street_name: String,
    /// House number column.
    pub house_number: String,
}

impl Default for CitationColumns {
    fn default() -> Self {
        Self {
            citation_id: "Summons Number".to_string(),
            street_name: "Street Name".to_string(),
            house_number: "House Number".to_string(),
        }
    }
}

/// Header names of the road-network columns that the matcher reads.
///
/// Defaults follow the NYC street centerline (CSCL) export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadColumns {
    /// Segment identifier column.
    pub segment_id: String,
    /// Street name column.
    pub street_name: String,
    /// Right-side low house number column.
    pub right_low: String,
    /// Right-side high house number column.
    pub right_high: String,
    /// Left-side low house number column.
    pub left_low: String,
    /// Left-side high house number column.
    pub left_high: String,
}

impl Default for RoadColumns {
    fn default() -> Self {
        Self {
            segment_id: "PHYSICALID".to_string(),
            street_name: "FULL_STREE".to_string(),
            right_low: "R_LOW_HN".to_string(),
            right_high: "R_HIGH_HN".to_string(),
            left_low: "L_LOW_HN".to_string(),
            left_high: "L_HIGH_HN".to_string(),
        }
    }
}

/// Configuration for a matching run.
///
/// Every field has a default, so an empty TOML file is a valid config.
/// Unset paths are resolved against the `data/` directory by the matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Citation CSV file.
    pub citations_path: Option<PathBuf>,
    /// Road-network CSV file.
    pub roads_path: Option<PathBuf>,
    /// Tab-separated suffix synonym table.
    pub suffixes_path: Option<PathBuf>,
    /// Output file for `citation_id,segment_id` pairs.
    pub assignments_path: Option<PathBuf>,
    /// Output file for `citation_id,decision` audit pairs.
    pub audit_path: Option<PathBuf>,
    /// Optional JSON checkpoint of grouped citations.
    pub checkpoint_path: Option<PathBuf>,
    /// Append to or overwrite the output files.
    pub write_mode: WriteMode,
    /// Maximum number of citation rows to read.
    pub row_limit: Option<u64>,
    /// Segment choice when no exact range matches.
    pub fallback: FallbackPolicy,
    /// Fail instead of dropping when a citation id appears at two
    /// different addresses.
    pub strict_citation_ids: bool,
    /// Citation CSV header names.
    pub citation_columns: CitationColumns,
    /// Road CSV header names.
    pub road_columns: RoadColumns,
}

/// Per-decision citation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    /// Citations matched by an exact range.
    pub exact_range: u64,
    /// Citations on streets without usable ranges.
    pub random_no_number_street: u64,
    /// Citations with out-of-range house numbers.
    pub random_any_segment_of_street: u64,
    /// Citations whose street is not in the road network.
    pub street_not_found: u64,
}

impl DecisionCounts {
    /// Adds `count` citations to the bucket for `decision`.
    pub const fn record(&mut self, decision: MatchDecision, count: u64) {
        match decision {
            MatchDecision::ExactRange => self.exact_range += count,
            MatchDecision::RandomNoNumberStreet => self.random_no_number_street += count,
            MatchDecision::RandomAnySegmentOfStreet => {
                self.random_any_segment_of_street += count;
            }
            MatchDecision::StreetNotFound => self.street_not_found += count,
        }
    }

    /// Returns the number of citations that received a segment.
    #[must_use]
    pub const fn matched(&self) -> u64 {
        self.exact_range + self.random_no_number_street + self.random_any_segment_of_street
    }
}

/// Summary of a completed matching run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// Citation rows read from the source.
    pub citations_read: u64,
    /// Rows dropped for a missing street name or house number.
    pub dropped_missing_fields: u64,
    /// Occurrences dropped because their id was already grouped at a
    /// different address.
    pub dropped_conflicting_ids: u64,
    /// Rows that made it into a group.
    pub citations_grouped: u64,
    /// Distinct `(street, house number)` groups.
    pub groups: u64,
    /// Road rows read.
    pub road_rows: u64,
    /// Streets with usable ranges.
    pub indexed_streets: u64,
    /// Streets with at least one row missing a bound.
    pub incomplete_streets: u64,
    /// Distinct citation ids with a segment assignment.
    pub assigned_citations: u64,
    /// Breakdown by decision kind (per citation occurrence).
    pub decisions: DecisionCounts,
    /// Wall-clock duration of the run in seconds.
    pub elapsed_secs: f64,
}

impl MatchReport {
    /// Match rate in percent: assigned citation ids over grouped rows.
    ///
    /// Rows dropped for missing fields are excluded from the denominator.
    /// Returns `0.0` when nothing was grouped.
    #[must_use]
    pub fn match_rate(&self) -> f64 {
        if self.citations_grouped == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.assigned_citations as f64 / self.citations_grouped as f64;
        rate * 100.0
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn decision_round_trips_through_strings() {
        assert_eq!(MatchDecision::ExactRange.to_string(), "EXACT_RANGE");
        assert_eq!(
            MatchDecision::RandomAnySegmentOfStreet.as_ref(),
            "RANDOM_ANY_SEGMENT_OF_STREET"
        );
        assert_eq!(
            MatchDecision::from_str("RANDOM_NO_NUMBER_STREET").unwrap(),
            MatchDecision::RandomNoNumberStreet
        );
        assert!(MatchDecision::from_str("address_range").is_err());
    }

    #[test]
    fn only_street_not_found_is_unmatched() {
        assert!(MatchDecision::ExactRange.is_matched());
        assert!(MatchDecision::RandomNoNumberStreet.is_matched());
        assert!(MatchDecision::RandomAnySegmentOfStreet.is_matched());
        assert!(!MatchDecision::StreetNotFound.is_matched());
    }

    #[test]
    fn bounds_require_all_four_values() {
        let mut row = RoadSegmentRecord {
            segment_id: "1".to_string(),
            street_name: "main st".to_string(),
            right_low: Some("2".to_string()),
            right_high: Some("10".to_string()),
            left_low: Some("1".to_string()),
            left_high: Some("9".to_string()),
        };
        assert_eq!(row.bounds(), Some([("2", "10"), ("1", "9")]));

        row.left_high = Some("  ".to_string());
        assert_eq!(row.bounds(), None);

        row.left_high = None;
        assert_eq!(row.bounds(), None);
    }

    #[test]
    fn match_rate_excludes_dropped_rows() {
        let report = MatchReport {
            citations_read: 10,
            dropped_missing_fields: 2,
            citations_grouped: 8,
            assigned_citations: 6,
            ..MatchReport::default()
        };
        assert!((report.match_rate() - 75.0).abs() < f64::EPSILON);
        assert!(MatchReport::default().match_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn decision_counts_sum_matched() {
        let mut counts = DecisionCounts::default();
        counts.record(MatchDecision::ExactRange, 3);
        counts.record(MatchDecision::RandomAnySegmentOfStreet, 2);
        counts.record(MatchDecision::StreetNotFound, 4);
        assert_eq!(counts.matched(), 5);
        assert_eq!(counts.street_not_found, 4);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: MatchConfig = toml::from_str("").unwrap();
        assert_eq!(config, MatchConfig::default());
        assert_eq!(config.write_mode, WriteMode::Append);
        assert_eq!(config.fallback, FallbackPolicy::Random { seed: None });
        assert_eq!(config.road_columns.segment_id, "PHYSICALID");
    }

    #[test]
    fn parses_config_overrides() {
        let config: MatchConfig = toml::from_str(
            r#"
            roads_path = "centerline.csv"
            write_mode = "overwrite"
            row_limit = 1000

            [fallback]
            policy = "random"
            seed = 7

            [citation_columns]
            street_name = "street"
            "#,
        )
        .unwrap();

        assert_eq!(config.roads_path, Some(PathBuf::from("centerline.csv")));
        assert_eq!(config.write_mode, WriteMode::Overwrite);
        assert_eq!(config.row_limit, Some(1000));
        assert_eq!(config.fallback, FallbackPolicy::Random { seed: Some(7) });
        assert_eq!(config.citation_columns.street_name, "street");
        assert_eq!(config.citation_columns.citation_id, "Summons Number");
    }

    #[test]
    fn parses_first_segment_policy() {
        let config: MatchConfig = toml::from_str(
            r#"
            [fallback]
            policy = "first_segment"
            "#,
        )
        .unwrap();
        assert_eq!(config.fallback, FallbackPolicy::FirstSegment);
    }
}
