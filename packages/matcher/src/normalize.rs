//! Street name normalization.
//!
//! Produces the canonical street name used as the join key between
//! citations and road-network rows. The same pipeline runs on both sides,
//! so "West 56th Street" on a citation and "W 56 ST" in the centerline
//! data meet at `"w 56 st"`.

use regex::Regex;
use std::sync::LazyLock;

use crate::suffixes::SuffixTable;

/// Leading `east`/`west` followed by a house-style number
/// ("east 4 st", not "eastchester rd").
static NUMBERED_DIRECTIONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(east|west) (\d)").expect("valid regex"));

/// Ordinal suffix directly after a digit ("56th", "1st", "22nd").
static ORDINAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)(?:st|nd|rd|th)\b").expect("valid regex"));

/// Canonicalizes street names against a fixed [`SuffixTable`].
#[derive(Debug, Clone, Copy)]
pub struct StreetNormalizer<'a> {
    suffixes: &'a SuffixTable,
}

impl<'a> StreetNormalizer<'a> {
    /// Creates a normalizer borrowing the process-wide suffix table.
    #[must_use]
    pub const fn new(suffixes: &'a SuffixTable) -> Self {
        Self { suffixes }
    }

    /// Normalizes a raw street name.
    ///
    /// The pipeline:
    /// 1. Lowercase, trim, collapse whitespace
    /// 2. Replace the last token with its canonical suffix, if known
    /// 3. Contract a leading `east`/`west` to `e`/`w` on numbered streets
    /// 4. Strip ordinal suffixes following a digit
    ///
    /// Idempotent. Never fails: unknown suffixes pass through unchanged.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let lower = raw.to_lowercase();
        let mut tokens: Vec<&str> = lower.split_whitespace().collect();

        if let Some(last) = tokens.last_mut()
            && let Some(canonical) = self.suffixes.canonical(last)
        {
            *last = canonical;
        }

        let joined = tokens.join(" ");
        let contracted = contract_numbered_directional(&joined);
        ORDINAL_RE.replace_all(&contracted, "${1}").into_owned()
    }
}

/// Rewrites "east 4 st" → "e 4 st" and "west 56th st" → "w 56th st".
fn contract_numbered_directional(name: &str) -> std::borrow::Cow<'_, str> {
    NUMBERED_DIRECTIONAL_RE.replace(name, |caps: &regex::Captures<'_>| {
        let short = if &caps[1] == "east" { "e" } else { "w" };
        format!("{short} {}", &caps[2])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SuffixTable {
        SuffixTable::from_pairs([
            ("street", "st"),
            ("str", "st"),
            ("avenue", "av"),
            ("ave", "av"),
            ("boulevard", "blvd"),
            ("place", "pl"),
            ("road", "rd"),
        ])
    }

    #[test]
    fn lowercases_and_standardizes_suffix() {
        let table = table();
        let n = StreetNormalizer::new(&table);
        assert_eq!(n.normalize("BROADWAY"), "broadway");
        assert_eq!(n.normalize("Jay Street"), "jay st");
        assert_eq!(n.normalize("lexington ave"), "lexington av");
    }

    #[test]
    fn rewrites_numbered_directional_streets() {
        let table = table();
        let n = StreetNormalizer::new(&table);
        assert_eq!(n.normalize("West 56th Street"), "w 56 st");
        assert_eq!(n.normalize("EAST 4 ST"), "e 4 st");
        assert_eq!(n.normalize("east 181st street"), "e 181 st");
    }

    #[test]
    fn leaves_named_directional_streets_alone() {
        let table = table();
        let n = StreetNormalizer::new(&table);
        assert_eq!(n.normalize("Eastchester Road"), "eastchester rd");
        assert_eq!(n.normalize("west end avenue"), "west end av");
        assert_eq!(n.normalize("westminster rd"), "westminster rd");
    }

    #[test]
    fn strips_ordinals_anywhere() {
        let table = table();
        let n = StreetNormalizer::new(&table);
        assert_eq!(n.normalize("2nd avenue"), "2 av");
        assert_eq!(n.normalize("beach 73rd st"), "beach 73 st");
        assert_eq!(n.normalize("1st place"), "1 pl");
    }

    #[test]
    fn ordinal_strip_requires_word_end() {
        let table = table();
        let n = StreetNormalizer::new(&table);
        assert_eq!(n.normalize("21street"), "21street");
    }

    #[test]
    fn collapses_whitespace() {
        let table = table();
        let n = StreetNormalizer::new(&table);
        assert_eq!(n.normalize("  west   56th    street "), "w 56 st");
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   "), "");
    }

    #[test]
    fn unknown_suffix_passes_through() {
        let table = table();
        let n = StreetNormalizer::new(&table);
        assert_eq!(n.normalize("Grand Concourse"), "grand concourse");
    }

    #[test]
    fn is_idempotent() {
        let table = table();
        let n = StreetNormalizer::new(&table);
        for raw in [
            "West 56th Street",
            "east 4 st",
            "Eastchester Road",
            "2nd avenue",
            "  BEACH   73RD  STR ",
            "Broadway",
            "w 56 st",
            "21street",
            "east 5th",
            "",
        ] {
            let once = n.normalize(raw);
            assert_eq!(n.normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn is_suffix_symmetric() {
        let table = table();
        let n = StreetNormalizer::new(&table);
        for (variant, canonical) in table.iter() {
            assert_eq!(
                n.normalize(&format!("1 main {variant}")),
                n.normalize(&format!("1 main {canonical}")),
                "asymmetric for {variant:?}"
            );
        }
    }
}
