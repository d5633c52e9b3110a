use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::{
    review_or_fallback, Generator, HumanFeedback, ReviewVerdict, Reviewer, RewardScorer,
    SelectionError, Style, VARIANT_STYLES,
};

pub const DEFAULT_EXPLORATION_RATE: f64 = 0.1;

// ---------------------------------------------------------------------------
// CandidateVariant — one independently generated rewrite
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateVariant {
    pub content: String,
    pub style: Style,
    pub ai_review: ReviewVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_feedback: Option<HumanFeedback>,
}

/// How a variant was chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    Explore,
    Exploit,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub mode: SelectionMode,
    /// Reward of the chosen variant. `None` when it was picked by exploration.
    pub reward: Option<f64>,
}

// ---------------------------------------------------------------------------
// CandidateSelectionEngine — single-step epsilon-greedy choice
// ---------------------------------------------------------------------------

pub struct CandidateSelectionEngine<'a> {
    generator: &'a dyn Generator,
    reviewer: &'a dyn Reviewer,
    scorer: &'a dyn RewardScorer,
    exploration_rate: f64,
}

impl<'a> CandidateSelectionEngine<'a> {
    pub fn new(
        generator: &'a dyn Generator,
        reviewer: &'a dyn Reviewer,
        scorer: &'a dyn RewardScorer,
    ) -> Self {
        Self {
            generator,
            reviewer,
            scorer,
            exploration_rate: DEFAULT_EXPLORATION_RATE,
        }
    }

    /// Sets the exploration probability, clamped to [0, 1].
    pub fn with_exploration_rate(self, rate: f64) -> Self {
        Self {
            exploration_rate: if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) },
            ..self
        }
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    /// Generates `n` variants of `content`, each in a style drawn uniformly
    /// from [`VARIANT_STYLES`]. Rounds run in order, so the result is
    /// reproducible for a seeded `rng`.
    pub async fn generate_variants<R: Rng + Send>(
        &self,
        content: &str,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<CandidateVariant>, SelectionError> {
        if n == 0 {
            return Err(SelectionError::NoVariantsRequested);
        }

        let mut variants = Vec::with_capacity(n.min(VARIANT_STYLES.len()));
        for round in 0..n {
            let style = Style::new(*VARIANT_STYLES.choose(rng).unwrap_or(&VARIANT_STYLES[0]));
            let generation = self.generator.write(content, &style).await?;
            let (ai_review, substituted) =
                review_or_fallback(self.reviewer, content, &generation.text).await;
            tracing::debug!(
                round,
                style = %style,
                quality = ai_review.quality_score,
                substituted,
                "variant generated"
            );
            variants.push(CandidateVariant {
                content: generation.text,
                style,
                ai_review,
                human_feedback: None,
            });
        }
        Ok(variants)
    }

    /// Picks one variant: uniformly at random with probability
    /// `exploration_rate`, otherwise the highest-reward one (first wins ties).
    pub fn select_best<R: Rng>(
        &self,
        variants: &[CandidateVariant],
        rng: &mut R,
    ) -> Result<Selection, SelectionError> {
        if variants.is_empty() {
            return Err(SelectionError::NoCandidates);
        }

        if rng.random::<f64>() < self.exploration_rate {
            let index = rng.random_range(0..variants.len());
            tracing::debug!(index, "exploring random variant");
            return Ok(Selection {
                index,
                mode: SelectionMode::Explore,
                reward: None,
            });
        }

        let mut best_index = 0;
        let mut best_reward = f64::NEG_INFINITY;
        for (index, variant) in variants.iter().enumerate() {
            let reward = self.scorer.calculate_reward(
                &variant.content,
                &variant.ai_review,
                variant.human_feedback.as_ref(),
            );
            if reward > best_reward {
                best_index = index;
                best_reward = reward;
            }
        }

        tracing::debug!(index = best_index, reward = best_reward, "exploiting best variant");
        Ok(Selection {
            index: best_index,
            mode: SelectionMode::Exploit,
            reward: Some(best_reward),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
