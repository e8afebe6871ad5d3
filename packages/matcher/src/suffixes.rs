//! Street suffix synonym table.
//!
//! Maps suffix variants found in citation data ("street", "str", "ave")
//! to the canonical form used by the road network ("st", "av"). Every
//! canonical value also maps to itself, so either spelling of a pair
//! resolves to the same token.
//!
//! The table is loaded once per process and never mutated afterwards.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Immutable variant → canonical suffix lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuffixTable {
    canonical: BTreeMap<String, String>,
}

impl SuffixTable {
    /// Builds a table from `(variant, canonical)` pairs.
    ///
    /// Values are trimmed and lowercased. Pairs are applied in order, so a
    /// later row wins when a token appears twice. Chains such as
    /// `str → street` followed by `street → st` are collapsed so that
    /// every lookup result maps to itself.
    #[must_use]
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: AsRef<str>,
        B: AsRef<str>,
    {
        let mut canonical = BTreeMap::new();

        for (variant, target) in pairs {
            let variant = variant.as_ref().trim().to_lowercase();
            let target = target.as_ref().trim().to_lowercase();
            if variant.is_empty() || target.is_empty() {
                continue;
            }
            canonical.insert(variant, target.clone());
            canonical.insert(target.clone(), target);
        }

        Self {
            canonical: collapse_chains(canonical),
        }
    }

    /// Loads a tab-separated `variant<TAB>canonical` table.
    ///
    /// The first line is a header and is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is malformed, or
    /// contains no usable rows.
    pub fn load(path: &Path) -> Result<Self, SuffixTableError> {
        let file = std::fs::File::open(path).map_err(|e| SuffixTableError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let table = Self::from_reader(file, &path.display().to_string())?;
        log::info!(
            "Loaded {} suffix mappings from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parses a suffix table from any reader. `source` names the input in
    /// error messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is malformed or has no usable rows.
    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self, SuffixTableError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut pairs = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| SuffixTableError::Csv {
                path: source.to_string(),
                source: e,
            })?;

            match (record.get(0), record.get(1)) {
                (Some(variant), Some(target)) if !variant.is_empty() && !target.is_empty() => {
                    pairs.push((variant.to_string(), target.to_string()));
                }
                _ => log::trace!("  skipping incomplete suffix row: {record:?}"),
            }
        }

        let table = Self::from_pairs(pairs);
        if table.is_empty() {
            return Err(SuffixTableError::Empty(source.to_string()));
        }
        Ok(table)
    }

    /// Returns the canonical form of `token`, if it is a known suffix.
    #[must_use]
    pub fn canonical(&self, token: &str) -> Option<&str> {
        self.canonical.get(token).map(String::as_str)
    }

    /// Number of known tokens (variants plus canonical forms).
    #[must_use]
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    /// Returns `true` if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    /// Iterates over `(token, canonical)` entries in token order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.canonical
            .iter()
            .map(|(token, target)| (token.as_str(), target.as_str()))
    }
}

/// Follows `a → b → c` chains until each value is a fixed point.
fn collapse_chains(map: BTreeMap<String, String>) -> BTreeMap<String, String> {
    let limit = map.len();

    map.iter()
        .map(|(token, target)| {
            let mut current = target;
            for _ in 0..limit {
                match map.get(current) {
                    Some(next) if next != current => current = next,
                    _ => break,
                }
            }
            (token.clone(), current.clone())
        })
        .collect()
}

/// Errors from loading a suffix table.
#[derive(Debug, thiserror::Error)]
pub enum SuffixTableError {
    /// Malformed TSV.
    #[error("TSV error in {path}: {source}")]
    Csv {
        /// Path to the table.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// The file could not be opened.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path to the table.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file had no usable rows.
    #[error("Suffix table is empty: {0}")]
    Empty(String),
}
