use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ql_core::core::{ReviewVerdict, Style, VersionId};
use serde::{Deserialize, Serialize};

/// One human-rated version, as persisted in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub version_id: VersionId,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub content_length: usize,
    pub style: Style,
    #[serde(default)]
    pub ai_scores: BTreeMap<String, f64>,
    /// Always within [0, 1].
    pub human_rating: f64,
    #[serde(default)]
    pub human_feedback: Option<String>,
    #[serde(default = "default_iteration_count")]
    pub iteration_count: u32,
}

fn default_iteration_count() -> u32 {
    1
}

/// Generation parameters attached to a rating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackMetadata {
    #[serde(default)]
    pub style: Option<Style>,
    #[serde(default)]
    pub ai_scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub iteration_count: Option<u32>,
}

impl FeedbackMetadata {
    pub fn for_style(style: Style) -> Self {
        Self {
            style: Some(style),
            ..Self::default()
        }
    }

    /// Metadata for a refined version: its style, round count and the
    /// scores of its last review.
    pub fn from_review(style: Style, review: &ReviewVerdict, iteration_count: u32) -> Self {
        Self {
            style: Some(style),
            ai_scores: review
                .named_scores()
                .into_iter()
                .map(|(name, score)| (name.to_owned(), score))
                .collect(),
            iteration_count: Some(iteration_count),
        }
    }
}

/// Count and mean human rating of one bucket (a style or an iteration count).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleStatistic {
    pub count: usize,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestParameters {
    pub style: Style,
    pub iterations: u32,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStatistics {
    pub total_feedback: usize,
    pub average_rating: f64,
    pub best_style: Style,
    pub styles_tested: usize,
    pub style_details: BTreeMap<Style, StyleStatistic>,
    pub iteration_details: BTreeMap<u32, StyleStatistic>,
}

/// RFC 3339 on output; on input also accepts naive ISO-8601 timestamps,
/// which are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
