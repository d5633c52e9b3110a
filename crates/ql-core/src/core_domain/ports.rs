use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::core::{GenerationError, HumanFeedback, ReviewError, ReviewVerdict, Style};

/// Boxed future returned by capability ports (object-safe async).
pub type PortFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ---------------------------------------------------------------------------
// Generation — output of a write or edit call
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub model: String,
    pub temperature: Option<f64>,
    pub processing_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub metadata: GenerationMetadata,
}

// ---------------------------------------------------------------------------
// Generator — produces and revises content
// ---------------------------------------------------------------------------

pub trait Generator: Send + Sync {
    /// Rewrites `content` in the given style.
    fn write<'a>(
        &'a self,
        content: &'a str,
        style: &'a Style,
    ) -> PortFuture<'a, Result<Generation, GenerationError>>;

    /// Revises `content` using a previous review and optional human notes.
    fn edit<'a>(
        &'a self,
        content: &'a str,
        review: &'a ReviewVerdict,
        human_feedback: Option<&'a str>,
    ) -> PortFuture<'a, Result<Generation, GenerationError>>;
}

// ---------------------------------------------------------------------------
// Reviewer — evaluates a candidate against its source
// ---------------------------------------------------------------------------

pub trait Reviewer: Send + Sync {
    fn review<'a>(
        &'a self,
        original: &'a str,
        candidate: &'a str,
    ) -> PortFuture<'a, Result<ReviewVerdict, ReviewError>>;
}

// ---------------------------------------------------------------------------
// RewardScorer — scalar reward for ranking candidates
// ---------------------------------------------------------------------------

pub trait RewardScorer: Send + Sync {
    /// Reward in [0, 1].
    fn calculate_reward(
        &self,
        content: &str,
        review: &ReviewVerdict,
        human_feedback: Option<&HumanFeedback>,
    ) -> f64;
}

// ---------------------------------------------------------------------------
// Clock — injectable time source for deterministic testing
// ---------------------------------------------------------------------------

pub trait Clock: Send + Sync {
    fn now(&self) -> std::time::Instant;

    fn elapsed_ms(&self, since: std::time::Instant) -> u64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }

    fn elapsed_ms(&self, since: std::time::Instant) -> u64 {
        since.elapsed().as_millis() as u64
    }
}
