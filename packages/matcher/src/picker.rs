//! Segment choice for addresses without an exact range match.
//!
//! When a street has no usable ranges, or the house number falls outside
//! all of them, the resolver still assigns some segment of the street.
//! Which one is delegated to a [`SegmentPicker`] so that runs can be
//! random, seeded, or fully deterministic.

use std::cmp::Ordering;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use segment_match_matcher_models::FallbackPolicy;

/// Chooses one segment id from a non-empty candidate list.
pub trait SegmentPicker {
    /// Returns one of `candidates`, or `None` if it is empty.
    fn pick<'a>(&mut self, candidates: &[&'a str]) -> Option<&'a str>;
}

/// Uniform random choice from a pseudo-random generator.
pub struct RandomPicker {
    rng: StdRng,
}

impl RandomPicker {
    /// A reproducible picker.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A picker seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl SegmentPicker for RandomPicker {
    fn pick<'a>(&mut self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates.choose(&mut self.rng).copied()
    }
}

/// Always picks the smallest segment id.
///
/// Integer ids compare numerically ("9" < "10") and come before any
/// non-integer id, which compare as strings.
pub struct FirstSegmentPicker;

impl SegmentPicker for FirstSegmentPicker {
    fn pick<'a>(&mut self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates.iter().copied().min_by(|a, b| compare_ids(a, b))
    }
}

/// Integer ids sort before all other ids, by value; ties and non-integer
/// ids fall back to the string.
fn id_key(id: &str) -> (bool, Option<u64>, &str) {
    let number = id.parse::<u64>().ok();
    (number.is_none(), number, id)
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    id_key(a).cmp(&id_key(b))
}

/// Builds the picker configured by `policy`.
#[must_use]
pub fn picker_for(policy: FallbackPolicy) -> Box<dyn SegmentPicker> {
    match policy {
        FallbackPolicy::Random { seed: Some(seed) } => {
            log::debug!("Using seeded random fallback (seed {seed})");
            Box::new(RandomPicker::seeded(seed))
        }
        FallbackPolicy::Random { seed: None } => Box::new(RandomPicker::from_entropy()),
        FallbackPolicy::FirstSegment => Box::new(FirstSegmentPicker),
    }
}
