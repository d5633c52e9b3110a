use serde::{Deserialize, Serialize};

use crate::core::ReviewError;

/// Improvement note attached to a substituted verdict.
pub const FALLBACK_IMPROVEMENT: &str = "Error parsing AI response";

// ---------------------------------------------------------------------------
// ReviewVerdict — structured output of the Reviewer capability
// ---------------------------------------------------------------------------

/// Automated evaluation of a candidate text.
///
/// Scores use the reviewer's 1–10 scale. A score of `0` means the reviewer
/// left it unset; reward computation skips such scores.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    #[serde(default)]
    pub quality_score: f64,
    #[serde(default)]
    pub clarity_score: f64,
    #[serde(default)]
    pub engagement_score: f64,
    #[serde(default)]
    pub accuracy_score: f64,
    #[serde(default)]
    pub improvements_needed: Vec<String>,
    #[serde(default)]
    pub ready_for_human: bool,
    #[serde(default)]
    pub overall_feedback: String,
}

impl ReviewVerdict {
    /// Conservative verdict used when an evaluation cannot be obtained.
    ///
    /// Mid-range scores with `ready_for_human = true`, so a refinement loop
    /// that keeps seeing fallbacks still stops on its iteration budget and a
    /// human gets to look at the result.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            quality_score: 7.0,
            clarity_score: 7.0,
            engagement_score: 7.0,
            accuracy_score: 8.0,
            improvements_needed: vec![FALLBACK_IMPROVEMENT.to_owned()],
            ready_for_human: true,
            overall_feedback: reason.into(),
        }
    }

    /// Parses reviewer output that should contain a single JSON object,
    /// possibly wrapped in prose or a markdown fence.
    ///
    /// Everything between the first `{` and the last `}` is decoded.
    pub fn parse_lenient(text: &str) -> Result<Self, ReviewError> {
        let start = text.find('{');
        let end = text.rfind('}');
        let json = match (start, end) {
            (Some(start), Some(end)) if end > start => &text[start..=end],
            _ => {
                return Err(ReviewError::Malformed(
                    "no JSON object found in reviewer output".to_owned(),
                ))
            }
        };

        serde_json::from_str(json).map_err(|e| ReviewError::Malformed(e.to_string()))
    }

    pub fn scores(&self) -> [f64; 4] {
        [
            self.quality_score,
            self.clarity_score,
            self.engagement_score,
            self.accuracy_score,
        ]
    }

    /// Named scores, in the shape stored on feedback entries.
    pub fn named_scores(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("quality_score", self.quality_score),
            ("clarity_score", self.clarity_score),
            ("engagement_score", self.engagement_score),
            ("accuracy_score", self.accuracy_score),
        ]
    }

    /// True when the reviewer cleared the text for a human and its quality
    /// reaches `threshold`.
    pub fn satisfies(&self, threshold: f64) -> bool {
        self.ready_for_human && self.quality_score >= threshold
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
