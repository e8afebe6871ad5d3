//! House-number range index over the road network.
//!
//! Each complete road row contributes two ranges (right side, then left
//! side) under its canonical street name. A street with even one row
//! missing a bound is flagged incomplete: its ranges are discarded and it
//! can only be matched by name.

use std::collections::{BTreeMap, BTreeSet};

use segment_match_matcher_models::{HouseNumberRange, RoadSegmentRecord};

use crate::house_number::HouseNumber;
use crate::normalize::StreetNormalizer;

/// What the index knows about one street.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreetLookup<'a> {
    /// The street is not in the road network.
    NotFound,
    /// The street exists but has no usable ranges. Carries every segment
    /// id of the street.
    Incomplete(&'a [String]),
    /// The street has ranges, in index order.
    Ranged(&'a [HouseNumberRange]),
}

/// Canonical street name → house-number ranges, plus incomplete streets.
#[derive(Debug, Clone, Default)]
pub struct RoadRangeIndex {
    ranges: BTreeMap<String, Vec<HouseNumberRange>>,
    incomplete: BTreeSet<String>,
    segments: BTreeMap<String, Vec<String>>,
    rows: u64,
}

impl RoadRangeIndex {
    /// Builds an index from a complete set of road rows.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::EmptyRoadNetwork`] if `rows` yields nothing
    /// usable.
    pub fn build<'r>(
        rows: impl IntoIterator<Item = &'r RoadSegmentRecord>,
        normalizer: StreetNormalizer<'_>,
    ) -> Result<Self, IndexError> {
        let mut builder = RoadRangeIndexBuilder::new(normalizer);
        for row in rows {
            builder.push(row);
        }
        builder.finish()
    }

    /// Looks up a canonical street name.
    #[must_use]
    pub fn lookup(&self, street: &str) -> StreetLookup<'_> {
        if let Some(ranges) = self.ranges.get(street) {
            return StreetLookup::Ranged(ranges);
        }
        if self.incomplete.contains(street) {
            return StreetLookup::Incomplete(self.street_segments(street));
        }
        StreetLookup::NotFound
    }

    /// Returns the first range of `street` containing `house_number`.
    ///
    /// Overlapping ranges resolve to the earliest in index order, which is
    /// the order rows were read (right side before left side per row).
    #[must_use]
    pub fn find_range(&self, street: &str, house_number: &str) -> Option<&HouseNumberRange> {
        let number = HouseNumber::parse(house_number);
        self.ranges
            .get(street)?
            .iter()
            .find(|range| number.within(&range.low, &range.high))
    }

    /// Ranges of `street`, if it has any.
    #[must_use]
    pub fn ranges(&self, street: &str) -> Option<&[HouseNumberRange]> {
        self.ranges.get(street).map(Vec::as_slice)
    }

    /// Every distinct segment id seen for `street`, in row order.
    #[must_use]
    pub fn street_segments(&self, street: &str) -> &[String] {
        self.segments.get(street).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if `street` is flagged incomplete.
    #[must_use]
    pub fn is_incomplete(&self, street: &str) -> bool {
        self.incomplete.contains(street)
    }

    /// The incomplete street set.
    #[must_use]
    pub const fn incomplete_streets(&self) -> &BTreeSet<String> {
        &self.incomplete
    }

    /// Number of streets with ranges.
    #[must_use]
    pub fn indexed_street_count(&self) -> usize {
        self.ranges.len()
    }

    /// Number of road rows that went into the index.
    #[must_use]
    pub const fn row_count(&self) -> u64 {
        self.rows
    }
}

/// Incremental builder so rows can be streamed straight from the reader.
pub struct RoadRangeIndexBuilder<'n> {
    normalizer: StreetNormalizer<'n>,
    index: RoadRangeIndex,
}

impl<'n> RoadRangeIndexBuilder<'n> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(normalizer: StreetNormalizer<'n>) -> Self {
        Self {
            normalizer,
            index: RoadRangeIndex::default(),
        }
    }

    /// Adds one road row.
    ///
    /// The street name is normalized here with the same normalizer used
    /// for citations.
    pub fn push(&mut self, row: &RoadSegmentRecord) {
        let street = self.normalizer.normalize(&row.street_name);
        let segment_id = row.segment_id.trim();
        if street.is_empty() || segment_id.is_empty() {
            log::trace!("  skipping road row without street or id: {row:?}");
            return;
        }

        let index = &mut self.index;
        index.rows += 1;

        let segments = index.segments.entry(street.clone()).or_default();
        if !segments.iter().any(|s| s == segment_id) {
            segments.push(segment_id.to_string());
        }

        if index.incomplete.contains(&street) {
            return;
        }

        let Some(sides) = row.bounds() else {
            log::trace!("  street {street:?} incomplete (segment {segment_id})");
            index.ranges.remove(&street);
            index.incomplete.insert(street);
            return;
        };

        let ranges = index.ranges.entry(street).or_default();
        for (low, high) in sides {
            ranges.push(HouseNumberRange {
                low: low.to_string(),
                high: high.to_string(),
                segment_id: segment_id.to_string(),
            });
        }
    }

    /// Finishes the index.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::EmptyRoadNetwork`] if no rows were pushed.
    pub fn finish(self) -> Result<RoadRangeIndex, IndexError> {
        let index = self.index;
        if index.rows == 0 {
            return Err(IndexError::EmptyRoadNetwork);
        }

        log::info!(
            "Indexed {} road rows: {} streets with ranges, {} incomplete",
            index.rows,
            index.ranges.len(),
            index.incomplete.len()
        );
        Ok(index)
    }
}

/// Errors from building the range index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// No usable road rows were supplied.
    #[error("Road network is empty")]
    EmptyRoadNetwork,
}
