//! Resolves grouped addresses to road segments.
//!
//! Every group ends in exactly one [`MatchDecision`], shared by all of its
//! citation ids:
//!
//! 1. Street unknown → `STREET_NOT_FOUND`, no assignment.
//! 2. Street incomplete → a segment of the street, `RANDOM_NO_NUMBER_STREET`.
//! 3. First range containing the number → `EXACT_RANGE`.
//! 4. Number outside all ranges → a segment from the street's ranges,
//!    `RANDOM_ANY_SEGMENT_OF_STREET`.
//!
//! Nothing here fails; every outcome is classified.

use std::collections::BTreeMap;

use segment_match_matcher_models::{DecisionCounts, MatchDecision};

use crate::grouper::CitationGroups;
use crate::house_number::HouseNumber;
use crate::picker::SegmentPicker;
use crate::progress::ProgressCallback;
use crate::road_index::{RoadRangeIndex, StreetLookup};

/// Outcome for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressMatch {
    /// How the address was resolved.
    pub decision: MatchDecision,
    /// Assigned segment, `None` only for `STREET_NOT_FOUND`.
    pub segment_id: Option<String>,
}

/// Assignments and audit decisions for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// citation id → segment id.
    pub assignments: BTreeMap<String, String>,
    /// citation id → decision.
    pub decisions: BTreeMap<String, MatchDecision>,
    /// Per-decision counts over citation occurrences.
    pub counts: DecisionCounts,
}

/// Resolves a single canonical address.
pub fn resolve_address(
    street: &str,
    house_number: &str,
    index: &RoadRangeIndex,
    picker: &mut dyn SegmentPicker,
) -> AddressMatch {
    match index.lookup(street) {
        StreetLookup::NotFound => AddressMatch {
            decision: MatchDecision::StreetNotFound,
            segment_id: None,
        },
        StreetLookup::Incomplete(segments) => {
            let candidates: Vec<&str> = segments.iter().map(String::as_str).collect();
            AddressMatch {
                decision: MatchDecision::RandomNoNumberStreet,
                segment_id: picker.pick(&candidates).map(ToString::to_string),
            }
        }
        StreetLookup::Ranged(ranges) => {
            let number = HouseNumber::parse(house_number);
            if let Some(range) = ranges.iter().find(|r| number.within(&r.low, &r.high)) {
                return AddressMatch {
                    decision: MatchDecision::ExactRange,
                    segment_id: Some(range.segment_id.clone()),
                };
            }

            let mut candidates: Vec<&str> = Vec::with_capacity(ranges.len());
            for range in ranges {
                if !candidates.contains(&range.segment_id.as_str()) {
                    candidates.push(&range.segment_id);
                }
            }
            AddressMatch {
                decision: MatchDecision::RandomAnySegmentOfStreet,
                segment_id: picker.pick(&candidates).map(ToString::to_string),
            }
        }
    }
}

/// Resolves every group against the index.
///
/// The loop runs once per distinct address, not per citation.
pub fn resolve(
    groups: &CitationGroups,
    index: &RoadRangeIndex,
    picker: &mut dyn SegmentPicker,
    progress: &dyn ProgressCallback,
) -> Resolution {
    let mut resolution = Resolution::default();
    progress.set_total(groups.len() as u64);
    progress.set_message("Resolving addresses".to_string());

    for group in groups.iter() {
        let matched = resolve_address(&group.street, &group.house_number, index, picker);

        for citation_id in &group.citation_ids {
            if let Some(segment_id) = &matched.segment_id {
                resolution
                    .assignments
                    .insert(citation_id.clone(), segment_id.clone());
            }
            resolution
                .decisions
                .insert(citation_id.clone(), matched.decision);
        }
        resolution
            .counts
            .record(matched.decision, group.citation_ids.len() as u64);

        progress.inc(1);
    }

    log::info!(
        "Resolved {} addresses: {} exact, {} no-number street, {} out of range, {} street not found",
        groups.len(),
        resolution.counts.exact_range,
        resolution.counts.random_no_number_street,
        resolution.counts.random_any_segment_of_street,
        resolution.counts.street_not_found
    );
    progress.finish(format!("{} citations assigned", resolution.assignments.len()));

    resolution
}

#[cfg(test)]
mod tests {
    use segment_match_matcher_models::{CitationRecord, RoadSegmentRecord};

    use super::*;
    use crate::grouper::group_citations;
    use crate::normalize::StreetNormalizer;
    use crate::picker::{FirstSegmentPicker, RandomPicker};
    use crate::progress::NullProgress;
    use crate::suffixes::SuffixTable;

    fn road(id: &str, street: &str, bounds: [Option<&str>; 4]) -> RoadSegmentRecord {
        let [right_low, right_high, left_low, left_high] = bounds.map(|b| b.map(String::from));
        RoadSegmentRecord {
            segment_id: id.to_string(),
            street_name: street.to_string(),
            right_low,
            right_high,
            left_low,
            left_high,
        }
    }

    fn citation(id: &str, street: &str, number: &str) -> CitationRecord {
        CitationRecord {
            citation_id: id.to_string(),
            street_name: Some(street.to_string()),
            house_number: Some(number.to_string()),
        }
    }

    fn fixture(table: &SuffixTable) -> RoadRangeIndex {
        let rows = [
            road("seg1", "main st", [Some("10"), Some("20"), Some("10"), Some("20")]),
            road("seg2", "main st", [Some("21"), Some("30"), Some("21"), Some("30")]),
            road("q1", "jamaica av", [Some("12-010"), Some("12-040"), Some("12-011"), Some("12-041")]),
            road("n1", "oak st", [Some("1"), Some("9"), Some("2"), Some("10")]),
            road("n2", "oak st", [None, None, Some("11"), Some("19")]),
        ];
        RoadRangeIndex::build(&rows, StreetNormalizer::new(table)).unwrap()
    }

    fn table() -> SuffixTable {
        SuffixTable::from_pairs([("street", "st"), ("avenue", "av")])
    }

    #[test]
    fn exact_range_matches() {
        let table = table();
        let index = fixture(&table);
        let mut picker = RandomPicker::seeded(0);

        let m = resolve_address("main st", "15", &index, &mut picker);
        assert_eq!(m.decision, MatchDecision::ExactRange);
        assert_eq!(m.segment_id.as_deref(), Some("seg1"));

        let m = resolve_address("main st", "25", &index, &mut picker);
        assert_eq!(m.decision, MatchDecision::ExactRange);
        assert_eq!(m.segment_id.as_deref(), Some("seg2"));
    }

    #[test]
    fn out_of_range_picks_any_segment_of_street() {
        let table = table();
        let index = fixture(&table);
        let mut picker = RandomPicker::seeded(3);

        for _ in 0..20 {
            let m = resolve_address("main st", "99", &index, &mut picker);
            assert_eq!(m.decision, MatchDecision::RandomAnySegmentOfStreet);
            let seg = m.segment_id.unwrap();
            assert!(seg == "seg1" || seg == "seg2", "unexpected {seg}");
        }
    }

    #[test]
    fn unknown_street_is_not_found() {
        let table = table();
        let index = fixture(&table);
        let m = resolve_address("nonexistent blvd", "5", &index, &mut FirstSegmentPicker);
        assert_eq!(m.decision, MatchDecision::StreetNotFound);
        assert_eq!(m.segment_id, None);
    }

    #[test]
    fn incomplete_street_never_matches_exactly() {
        let table = table();
        let index = fixture(&table);
        let mut picker = RandomPicker::seeded(9);

        // 5 lies inside n1's complete-looking range, but oak st is incomplete.
        for number in ["5", "15", "500"] {
            let m = resolve_address("oak st", number, &index, &mut picker);
            assert_eq!(m.decision, MatchDecision::RandomNoNumberStreet);
            let seg = m.segment_id.unwrap();
            assert!(seg == "n1" || seg == "n2");
        }
    }

    #[test]
    fn hyphenated_numbers_match_lexically() {
        let table = table();
        let index = fixture(&table);
        let m = resolve_address("jamaica av", "12-034", &index, &mut FirstSegmentPicker);
        assert_eq!(m.decision, MatchDecision::ExactRange);
        assert_eq!(m.segment_id.as_deref(), Some("q1"));

        let m = resolve_address("jamaica av", "15", &index, &mut FirstSegmentPicker);
        assert_eq!(m.decision, MatchDecision::RandomAnySegmentOfStreet);
    }

    #[test]
    fn resolves_groups_for_every_citation() {
        let table = table();
        let index = fixture(&table);
        let groups = group_citations(
            [
                citation("c1", "Main Street", "15"),
                citation("c2", "MAIN ST", "15"),
                citation("c3", "main st", "99"),
                citation("c4", "Nonexistent Blvd", "1"),
                citation("c5", "Oak Street", "5"),
            ],
            StreetNormalizer::new(&table),
            false,
        )
        .unwrap();

        let resolution = resolve(&groups, &index, &mut FirstSegmentPicker, &NullProgress);

        assert_eq!(resolution.assignments.get("c1").map(String::as_str), Some("seg1"));
        assert_eq!(resolution.assignments.get("c2").map(String::as_str), Some("seg1"));
        assert_eq!(resolution.assignments.get("c3").map(String::as_str), Some("seg1"));
        assert_eq!(resolution.assignments.get("c4"), None);
        assert_eq!(resolution.assignments.get("c5").map(String::as_str), Some("n1"));

        assert_eq!(resolution.decisions["c1"], MatchDecision::ExactRange);
        assert_eq!(resolution.decisions["c3"], MatchDecision::RandomAnySegmentOfStreet);
        assert_eq!(resolution.decisions["c4"], MatchDecision::StreetNotFound);
        assert_eq!(resolution.decisions["c5"], MatchDecision::RandomNoNumberStreet);

        assert_eq!(resolution.counts.exact_range, 2);
        assert_eq!(resolution.counts.matched(), 4);
        assert_eq!(resolution.assignments.len(), 4);
        assert_eq!(resolution.decisions.len(), 5);
    }

    #[test]
    fn seeded_resolution_is_reproducible() {
        let table = table();
        let index = fixture(&table);
        let groups = group_citations(
            (0..50).map(|i| citation(&format!("c{i}"), "main st", &format!("{}", 100 + i))),
            StreetNormalizer::new(&table),
            false,
        )
        .unwrap();

        let a = resolve(&groups, &index, &mut RandomPicker::seeded(11), &NullProgress);
        let b = resolve(&groups, &index, &mut RandomPicker::seeded(11), &NullProgress);
        assert_eq!(a, b);
    }
}
