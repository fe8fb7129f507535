//! Pluggable formality scoring.
//!
//! Aggregation only ever sees a score in `[0.0, 1.0]`; how that score is
//! derived from a message lives behind [`FormalityScorer`].

use tracing::warn;

use crate::models::Message;

/// Score reported when no scorer is configured.
pub const DEFAULT_FORMALITY: f64 = 1.0;

/// Assigns a formality score to a message.
///
/// Any `Fn(&Message) -> f64` is a scorer, so ad-hoc heuristics can be passed
/// as closures.
pub trait FormalityScorer {
    fn score(&self, message: &Message) -> f64;
}

impl<F> FormalityScorer for F
where
    F: Fn(&Message) -> f64,
{
    fn score(&self, message: &Message) -> f64 {
        self(message)
    }
}

/// Gives every message the same score.
#[derive(Debug, Clone, Copy)]
pub struct ConstantScorer(pub f64);

impl Default for ConstantScorer {
    fn default() -> Self {
        Self(DEFAULT_FORMALITY)
    }
}

impl FormalityScorer for ConstantScorer {
    fn score(&self, _message: &Message) -> f64 {
        self.0
    }
}

/// Clamp a raw score into `[0.0, 1.0]`.  NaN becomes `0.0`.
pub fn normalize_score(raw: f64) -> f64 {
    if raw.is_nan() {
        warn!("Formality scorer returned NaN, treating as 0.0");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&raw) {
        warn!("Formality score {} outside [0, 1], clamping", raw);
        return raw.clamp(0.0, 1.0);
    }
    raw
}
