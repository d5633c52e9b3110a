use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ql_core::core::{
    blended_reward, clamp_unit, HumanFeedback, ReviewVerdict, RewardScorer, Style, VersionId,
    DEFAULT_STYLE, NEUTRAL_PRIOR, UNKNOWN_STYLE,
};

use crate::models::{
    BestParameters, FeedbackEntry, FeedbackMetadata, FeedbackStatistics, StyleStatistic,
};
use crate::store::{LedgerError, LedgerStore};

/// Iteration count recommended before any feedback exists.
pub const DEFAULT_BEST_ITERATIONS: u32 = 2;

// ---------------------------------------------------------------------------
// RewardModel — append-only feedback ledger with derived statistics
// ---------------------------------------------------------------------------

/// Learns which styles and iteration budgets humans rate highly.
///
/// All statistics are recomputed from the complete history after each
/// append, so they can always be reproduced from the persisted ledger alone.
/// Writers must be serialized by the owner: every save rewrites the whole
/// ledger.
pub struct RewardModel {
    store: Box<dyn LedgerStore>,
    history: Vec<FeedbackEntry>,
    style_stats: BTreeMap<Style, StyleStatistic>,
    iteration_stats: BTreeMap<u32, StyleStatistic>,
}

impl RewardModel {
    /// Opens the model over `store`.
    ///
    /// A ledger that cannot be read is treated as empty history. Loaded
    /// ratings are clamped to [0, 1] and iteration counts raised to 1.
    pub fn open(store: impl LedgerStore + 'static) -> Self {
        let history = match store.load() {
            Ok(mut history) => {
                for entry in &mut history {
                    normalize_loaded(entry);
                }
                history
            }
            Err(err) => {
                tracing::warn!(
                    ledger = %store.describe(),
                    error = %err,
                    "feedback ledger unreadable, starting from empty history"
                );
                Vec::new()
            }
        };
        tracing::debug!(ledger = %store.describe(), entries = history.len(), "feedback ledger opened");

        let mut model = Self {
            store: Box::new(store),
            history,
            style_stats: BTreeMap::new(),
            iteration_stats: BTreeMap::new(),
        };
        model.update_statistics();
        model
    }

    pub fn history(&self) -> &[FeedbackEntry] {
        &self.history
    }

    /// Mean human rating per style.
    pub fn style_preferences(&self) -> &BTreeMap<Style, StyleStatistic> {
        &self.style_stats
    }

    /// Records one human rating and persists the full history.
    ///
    /// The rating is clamped to [0, 1]. If the ledger write fails the entry
    /// is dropped again, so memory and storage never diverge.
    pub fn record_feedback(
        &mut self,
        version_id: &VersionId,
        content: &str,
        metadata: &FeedbackMetadata,
        human_rating: f64,
        human_feedback: Option<&str>,
    ) -> Result<&FeedbackEntry, LedgerError> {
        self.record_feedback_at(
            version_id,
            content,
            metadata,
            human_rating,
            human_feedback,
            Utc::now(),
        )
    }

    pub fn record_feedback_at(
        &mut self,
        version_id: &VersionId,
        content: &str,
        metadata: &FeedbackMetadata,
        human_rating: f64,
        human_feedback: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> Result<&FeedbackEntry, LedgerError> {
        let entry = FeedbackEntry {
            version_id: version_id.clone(),
            timestamp,
            content_length: content.chars().count(),
            style: metadata.style.clone().unwrap_or_else(Style::unknown),
            ai_scores: metadata.ai_scores.clone(),
            human_rating: clamp_unit(human_rating),
            human_feedback: human_feedback.map(str::to_owned),
            iteration_count: metadata.iteration_count.unwrap_or(1).max(1),
        };

        self.history.push(entry);
        if let Err(err) = self.store.save(&self.history) {
            self.history.pop();
            return Err(err);
        }
        self.update_statistics();

        let entry = &self.history[self.history.len() - 1];
        tracing::info!(
            version_id = %entry.version_id,
            style = %entry.style,
            rating = entry.human_rating,
            iterations = entry.iteration_count,
            total = self.history.len(),
            "feedback recorded"
        );
        Ok(entry)
    }

    /// Reward in [0, 1]: the mean of the set verdict scores over 10, blended
    /// `0.7 * rating + 0.3 * baseline` when a human rating is present.
    pub fn calculate_reward(
        &self,
        _content: &str,
        ai_review: &ReviewVerdict,
        human_feedback: Option<&HumanFeedback>,
    ) -> f64 {
        blended_reward(ai_review, human_feedback)
    }

    /// Historical mean rating of the metadata's style, or the neutral prior
    /// when that style has never been rated.
    pub fn predict_quality(&self, _content: &str, metadata: &FeedbackMetadata) -> f64 {
        let unknown = Style::unknown();
        let style = metadata.style.as_ref().unwrap_or(&unknown);
        self.style_stats
            .get(style)
            .map(|stat| stat.average)
            .unwrap_or(NEUTRAL_PRIOR)
    }

    /// Best-rated style and iteration count.
    ///
    /// Ties go to the bucket with more ratings, then to the lexically
    /// smallest style or the smallest iteration count.
    pub fn get_best_parameters(&self) -> BestParameters {
        let best_style = best_bucket(&self.style_stats);
        let best_iterations = best_bucket(&self.iteration_stats);

        match (best_style, best_iterations) {
            (Some((style, stat)), Some((iterations, _))) => BestParameters {
                style: style.clone(),
                iterations: *iterations,
                avg_score: stat.average,
            },
            _ => BestParameters {
                style: Style::new(DEFAULT_STYLE),
                iterations: DEFAULT_BEST_ITERATIONS,
                avg_score: 0.0,
            },
        }
    }

    pub fn get_statistics(&self) -> FeedbackStatistics {
        let total_feedback = self.history.len();
        let average_rating = if total_feedback == 0 {
            0.0
        } else {
            self.history.iter().map(|e| e.human_rating).sum::<f64>() / total_feedback as f64
        };
        let best_style = best_bucket(&self.style_stats)
            .map(|(style, _)| style.clone())
            .unwrap_or_else(|| Style::new(UNKNOWN_STYLE));

        FeedbackStatistics {
            total_feedback,
            average_rating,
            best_style,
            styles_tested: self.style_stats.len(),
            style_details: self.style_stats.clone(),
            iteration_details: self.iteration_stats.clone(),
        }
    }

    fn update_statistics(&mut self) {
        self.style_stats = aggregate(&self.history, |e| e.style.clone());
        self.iteration_stats = aggregate(&self.history, |e| e.iteration_count);
    }
}

impl RewardScorer for RewardModel {
    fn calculate_reward(
        &self,
        content: &str,
        review: &ReviewVerdict,
        human_feedback: Option<&HumanFeedback>,
    ) -> f64 {
        RewardModel::calculate_reward(self, content, review, human_feedback)
    }
}

fn aggregate<K: Ord>(
    entries: &[FeedbackEntry],
    key: impl Fn(&FeedbackEntry) -> K,
) -> BTreeMap<K, StyleStatistic> {
    let mut sums: BTreeMap<K, (usize, f64)> = BTreeMap::new();
    for entry in entries {
        let slot = sums.entry(key(entry)).or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += entry.human_rating;
    }
    sums.into_iter()
        .map(|(k, (count, sum))| {
            (
                k,
                StyleStatistic {
                    count,
                    average: sum / count as f64,
                },
            )
        })
        .collect()
}

/// Highest mean; then highest count; then smallest key.
fn best_bucket<K: Ord>(stats: &BTreeMap<K, StyleStatistic>) -> Option<(&K, &StyleStatistic)> {
    let mut best: Option<(&K, &StyleStatistic)> = None;
    for (key, stat) in stats {
        let better = match best {
            None => true,
            Some((_, current)) => {
                stat.average > current.average
                    || (stat.average == current.average && stat.count > current.count)
            }
        };
        if better {
            best = Some((key, stat));
        }
    }
    best
}

/// Brings a stored entry back within the bounds `record_feedback` enforces.
fn normalize_loaded(entry: &mut FeedbackEntry) {
    let rating = clamp_unit(entry.human_rating);
    let iterations = entry.iteration_count.max(1);
    if rating != entry.human_rating || iterations != entry.iteration_count {
        tracing::warn!(
            version_id = %entry.version_id,
            stored_rating = entry.human_rating,
            stored_iterations = entry.iteration_count,
            "ledger entry out of range, normalizing"
        );
        entry.human_rating = rating;
        entry.iteration_count = iterations;
    }
}
