//! Groups citations by canonical address.
//!
//! Millions of citations collapse into far fewer distinct
//! `(street, house number)` pairs, and each pair is resolved once. The
//! grouped form can be saved as a JSON checkpoint and reloaded later, so
//! grouping and matching can run in separate processes.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use segment_match_matcher_models::CitationRecord;
use serde::{Deserialize, Serialize};

use crate::normalize::StreetNormalizer;

/// All citation ids recorded at one canonical address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationGroup {
    /// Canonical street name.
    pub street: String,
    /// House number as written (trimmed).
    pub house_number: String,
    /// Citation ids in insertion order. Repeated ids are kept.
    pub citation_ids: Vec<String>,
}

/// Counters collected while grouping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Rows offered to the grouper.
    pub rows: u64,
    /// Rows dropped for a blank street name or house number.
    pub dropped_missing_fields: u64,
    /// Rows dropped because their id was already grouped elsewhere.
    pub dropped_conflicting_ids: u64,
    /// Rows that landed in a group.
    pub grouped: u64,
}

/// Grouped citations, sorted by `(street, house_number)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationGroups {
    /// The groups.
    pub groups: Vec<CitationGroup>,
    /// How the groups were produced.
    #[serde(default)]
    pub stats: GroupStats,
}

impl CitationGroups {
    /// Number of distinct addresses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if there are no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates over the groups.
    pub fn iter(&self) -> std::slice::Iter<'_, CitationGroup> {
        self.groups.iter()
    }

    /// Writes the groups as a JSON checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), GroupError> {
        crate::paths::ensure_parent(path).map_err(|e| GroupError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let file = std::fs::File::create(path).map_err(|e| GroupError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::to_writer(std::io::BufWriter::new(file), self).map_err(|e| {
            GroupError::Json {
                path: path.display().to_string(),
                source: e,
            }
        })?;

        log::info!(
            "Saved {} citation groups to {}",
            self.groups.len(),
            path.display()
        );
        Ok(())
    }

    /// Reads a JSON checkpoint written by [`Self::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, GroupError> {
        let file = std::fs::File::open(path).map_err(|e| GroupError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let groups: Self = serde_json::from_reader(std::io::BufReader::new(file)).map_err(
            |e| GroupError::Json {
                path: path.display().to_string(),
                source: e,
            },
        )?;

        log::info!(
            "Loaded {} citation groups from {}",
            groups.groups.len(),
            path.display()
        );
        Ok(groups)
    }
}

/// Streaming grouper: feed rows with [`Self::push`], then [`Self::finish`].
pub struct CitationGrouper<'n> {
    normalizer: StreetNormalizer<'n>,
    strict_ids: bool,
    groups: BTreeMap<(String, String), Vec<String>>,
    owners: HashMap<String, (String, String)>,
    stats: GroupStats,
    conflict: Option<GroupError>,
}

impl<'n> CitationGrouper<'n> {
    /// Creates a grouper.
    ///
    /// With `strict_ids`, a citation id seen at two different addresses
    /// fails [`Self::finish`] instead of being dropped.
    #[must_use]
    pub fn new(normalizer: StreetNormalizer<'n>, strict_ids: bool) -> Self {
        Self {
            normalizer,
            strict_ids,
            groups: BTreeMap::new(),
            owners: HashMap::new(),
            stats: GroupStats::default(),
            conflict: None,
        }
    }

    /// Adds one citation row.
    pub fn push(&mut self, record: CitationRecord) {
        self.stats.rows += 1;
        if self.conflict.is_some() {
            return;
        }

        let street = record
            .street_name
            .as_deref()
            .map(|s| self.normalizer.normalize(s))
            .unwrap_or_default();
        let house_number = record
            .house_number
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();

        if street.is_empty() || house_number.is_empty() {
            self.stats.dropped_missing_fields += 1;
            log::trace!("  dropping citation {} with missing field", record.citation_id);
            return;
        }

        let key = (street, house_number.to_string());

        match self.owners.get(&record.citation_id) {
            Some(owner) if *owner != key => {
                if self.strict_ids {
                    self.conflict = Some(GroupError::ConflictingCitationId {
                        citation_id: record.citation_id,
                        first: format!("{} {}", owner.1, owner.0),
                        second: format!("{} {}", key.1, key.0),
                    });
                } else {
                    log::warn!(
                        "Citation {} already grouped at {} {}; dropping occurrence at {} {}",
                        record.citation_id,
                        owner.1,
                        owner.0,
                        key.1,
                        key.0
                    );
                    self.stats.dropped_conflicting_ids += 1;
                }
                return;
            }
            Some(_) => {}
            None => {
                self.owners.insert(record.citation_id.clone(), key.clone());
            }
        }

        self.groups.entry(key).or_default().push(record.citation_id);
        self.stats.grouped += 1;
    }

    /// Finishes grouping.
    ///
    /// # Errors
    ///
    /// Returns [`GroupError::ConflictingCitationId`] in strict mode if an
    /// id was seen at two different addresses.
    pub fn finish(self) -> Result<CitationGroups, GroupError> {
        if let Some(conflict) = self.conflict {
            return Err(conflict);
        }

        let groups: Vec<CitationGroup> = self
            .groups
            .into_iter()
            .map(|((street, house_number), citation_ids)| CitationGroup {
                street,
                house_number,
                citation_ids,
            })
            .collect();

        log::info!(
            "Grouped {} citations into {} addresses ({} missing fields, {} conflicting ids dropped)",
            self.stats.grouped,
            groups.len(),
            self.stats.dropped_missing_fields,
            self.stats.dropped_conflicting_ids
        );

        Ok(CitationGroups {
            groups,
            stats: self.stats,
        })
    }
}

/// Groups a complete set of citations.
///
/// # Errors
///
/// See [`CitationGrouper::finish`].
pub fn group_citations(
    records: impl IntoIterator<Item = CitationRecord>,
    normalizer: StreetNormalizer<'_>,
    strict_ids: bool,
) -> Result<CitationGroups, GroupError> {
    let mut grouper = CitationGrouper::new(normalizer, strict_ids);
    for record in records {
        grouper.push(record);
    }
    grouper.finish()
}

/// Errors from grouping citations or reading/writing checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// A citation id appeared at two different addresses (strict mode).
    #[error("Citation {citation_id} appears at both {first:?} and {second:?}")]
    ConflictingCitationId {
        /// The repeated id.
        citation_id: String,
        /// Address of the first occurrence.
        first: String,
        /// Address of the conflicting occurrence.
        second: String,
    },

    /// Checkpoint I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Checkpoint path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Checkpoint (de)serialization error.
    #[error("JSON error in {path}: {source}")]
    Json {
        /// Checkpoint path.
        path: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suffixes::SuffixTable;

    fn citation(id: &str, street: Option<&str>, number: Option<&str>) -> CitationRecord {
        CitationRecord {
            citation_id: id.to_string(),
            street_name: street.map(String::from),
            house_number: number.map(String::from),
        }
    }

    fn suffixes() -> SuffixTable {
        SuffixTable::from_pairs([("street", "st")])
    }

    #[test]
    fn groups_by_canonical_street_and_number() {
        let table = suffixes();
        let groups = group_citations(
            [
                citation("1", Some("West 56th Street"), Some("115")),
                citation("2", Some("W 56 ST"), Some("115")),
                citation("3", Some("w 56 st"), Some("117")),
            ],
            StreetNormalizer::new(&table),
            false,
        )
        .unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.groups[0].street, "w 56 st");
        assert_eq!(groups.groups[0].house_number, "115");
        assert_eq!(groups.groups[0].citation_ids, ["1", "2"]);
        assert_eq!(groups.groups[1].citation_ids, ["3"]);
        assert_eq!(groups.stats.grouped, 3);
    }

    #[test]
    fn drops_missing_fields_and_continues() {
        let table = suffixes();
        let groups = group_citations(
            [
                citation("1", None, Some("5")),
                citation("2", Some("jay st"), None),
                citation("3", Some("   "), Some("5")),
                citation("4", Some("jay st"), Some(" ")),
                citation("5", Some("jay st"), Some("5")),
            ],
            StreetNormalizer::new(&table),
            false,
        )
        .unwrap();

        assert_eq!(groups.stats.rows, 5);
        assert_eq!(groups.stats.dropped_missing_fields, 4);
        assert_eq!(groups.stats.grouped, 1);
        assert_eq!(groups.groups[0].citation_ids, ["5"]);
    }

    #[test]
    fn keeps_repeated_ids_at_same_address() {
        let table = suffixes();
        let groups = group_citations(
            [
                citation("9", Some("jay st"), Some("5")),
                citation("9", Some("jay street"), Some("5")),
            ],
            StreetNormalizer::new(&table),
            true,
        )
        .unwrap();

        assert_eq!(groups.groups[0].citation_ids, ["9", "9"]);
        assert_eq!(groups.stats.dropped_conflicting_ids, 0);
    }

    #[test]
    fn drops_conflicting_ids_by_default() {
        let table = suffixes();
        let groups = group_citations(
            [
                citation("9", Some("jay st"), Some("5")),
                citation("9", Some("main st"), Some("7")),
            ],
            StreetNormalizer::new(&table),
            false,
        )
        .unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups.groups[0].street, "jay st");
        assert_eq!(groups.stats.dropped_conflicting_ids, 1);
    }

    #[test]
    fn strict_mode_rejects_conflicting_ids() {
        let table = suffixes();
        let err = group_citations(
            [
                citation("9", Some("jay st"), Some("5")),
                citation("9", Some("main st"), Some("7")),
            ],
            StreetNormalizer::new(&table),
            true,
        )
        .unwrap_err();

        assert!(
            matches!(err, GroupError::ConflictingCitationId { ref citation_id, .. } if citation_id == "9")
        );
    }

    #[test]
    fn checkpoint_survives_save_and_load() {
        let tmp = std::env::temp_dir().join("segment_match_group_checkpoint");
        let _ = std::fs::remove_dir_all(&tmp);

        let table = suffixes();
        let groups = group_citations(
            [
                citation("1", Some("jay street"), Some("5")),
                citation("2", Some("jay st"), Some("12-034")),
            ],
            StreetNormalizer::new(&table),
            false,
        )
        .unwrap();

        let path = tmp.join("nested").join("groups.json");
        groups.save(&path).unwrap();
        let loaded = CitationGroups::load(&path).unwrap();
        assert_eq!(loaded, groups);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
