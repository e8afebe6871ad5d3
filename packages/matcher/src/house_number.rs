//! House-number comparison.
//!
//! Plain numbers ("115") are compared as integers against integer range
//! bounds. Anything else, most notably the hyphenated Queens style
//! ("12-034"), is compared as a string and never coerced to a number, so
//! "12-034" is never treated as 12. Digit strings too long for `u64` are
//! also compared as strings.

/// A citation house number in the form used for comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HouseNumber<'a> {
    /// Only ASCII digits and fits in a `u64`; compared numerically.
    Numeric(u64),
    /// Hyphenated, otherwise non-numeric, or too long for `u64`;
    /// compared as-is.
    Lexical(&'a str),
}

impl<'a> HouseNumber<'a> {
    /// Classifies a raw (trimmed) house number.
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            match raw.parse::<u64>() {
                Ok(n) => Self::Numeric(n),
                Err(_) => Self::Lexical(raw),
            }
        } else {
            Self::Lexical(raw)
        }
    }

    /// Returns `true` if this number lies in `[low, high]`, inclusive.
    ///
    /// For numeric house numbers both bounds must parse as integers;
    /// a non-integer bound never contains a numeric house number.
    #[must_use]
    pub fn within(self, low: &str, high: &str) -> bool {
        let (low, high) = (low.trim(), high.trim());
        match self {
            Self::Numeric(n) => match (low.parse::<u64>(), high.parse::<u64>()) {
                (Ok(low), Ok(high)) => low <= n && n <= high,
                _ => false,
            },
            Self::Lexical(s) => low <= s && s <= high,
        }
    }
}
