use crate::core::{HumanFeedback, ReviewVerdict, RewardScorer};

/// Neutral prior used when nothing is known about a piece of content.
pub const NEUTRAL_PRIOR: f64 = 0.5;

/// Weight of the human rating when both signals are present.
pub const HUMAN_WEIGHT: f64 = 0.7;

/// Weight of the automated baseline when both signals are present.
pub const AUTOMATED_WEIGHT: f64 = 0.3;

/// Clamps to [0, 1]. NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Mean of the set verdict scores rescaled to [0, 1], or the neutral prior
/// when the reviewer set none of them.
pub fn automated_baseline(review: &ReviewVerdict) -> f64 {
    let set: Vec<f64> = review
        .scores()
        .into_iter()
        .filter(|s| s.is_finite() && *s > 0.0)
        .collect();

    if set.is_empty() {
        return NEUTRAL_PRIOR;
    }

    let mean = set.iter().sum::<f64>() / set.len() as f64;
    clamp_unit(mean / 10.0)
}

/// Blends the automated baseline with a human rating when one is given.
pub fn blended_reward(review: &ReviewVerdict, human_feedback: Option<&HumanFeedback>) -> f64 {
    let baseline = automated_baseline(review);
    match human_feedback.and_then(|h| h.rating) {
        Some(rating) => {
            clamp_unit(HUMAN_WEIGHT * clamp_unit(rating) + AUTOMATED_WEIGHT * baseline)
        }
        None => baseline,
    }
}

// ---------------------------------------------------------------------------
// VerdictScorer — history-free scorer
// ---------------------------------------------------------------------------

/// Scores candidates from their verdicts alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct VerdictScorer;

impl RewardScorer for VerdictScorer {
    fn calculate_reward(
        &self,
        _content: &str,
        review: &ReviewVerdict,
        human_feedback: Option<&HumanFeedback>,
    ) -> f64 {
        blended_reward(review, human_feedback)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
