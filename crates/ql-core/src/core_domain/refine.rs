use serde::{Deserialize, Serialize};

use crate::core::{
    Clock, Generation, GenerationError, Generator, RefineError, ReviewVerdict, Reviewer, Style,
    SystemClock,
};

// ---------------------------------------------------------------------------
// RefinementPolicy — termination knobs for one run
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefinementPolicy {
    pub max_iterations: u32,
    /// Minimum `quality_score` (1–10 scale) that ends the run early.
    pub quality_threshold: f64,
}

impl Default for RefinementPolicy {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
        }
    }
}

impl RefinementPolicy {
    pub fn validate(&self) -> Result<(), RefineError> {
        if self.max_iterations == 0 {
            return Err(RefineError::InvalidPolicy(
                "max_iterations must be at least 1".to_owned(),
            ));
        }
        if !self.quality_threshold.is_finite() {
            return Err(RefineError::InvalidPolicy(format!(
                "quality_threshold must be finite, got {}",
                self.quality_threshold
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Run input and output
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefinementRequest {
    pub source_content: String,
    pub style: Style,
    /// Human notes forwarded to every edit round.
    #[serde(default)]
    pub human_feedback: Option<String>,
}

impl RefinementRequest {
    pub fn new(source_content: impl Into<String>, style: Style) -> Self {
        Self {
            source_content: source_content.into(),
            style,
            human_feedback: None,
        }
    }
}

/// One write/edit + review round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based round index.
    pub iteration: u32,
    pub content: String,
    pub review: ReviewVerdict,
    /// True when `review` is the fallback verdict.
    pub review_substituted: bool,
    pub processing_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    QualityReached,
    BudgetExhausted,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RefinementOutcome {
    pub style: Style,
    pub final_content: String,
    pub final_review: ReviewVerdict,
    pub termination: Termination,
    pub iterations: Vec<IterationRecord>,
}

impl RefinementOutcome {
    pub fn iteration_count(&self) -> u32 {
        self.iterations.len() as u32
    }
}

// ---------------------------------------------------------------------------
// RefinementOrchestrator — write → review → (edit → review)* state machine
// ---------------------------------------------------------------------------

enum Step {
    Generating {
        iteration: u32,
    },
    Reviewing {
        iteration: u32,
        content: String,
        started: std::time::Instant,
    },
    Done {
        termination: Termination,
        content: String,
        review: ReviewVerdict,
    },
}

pub struct RefinementOrchestrator<'a> {
    generator: &'a dyn Generator,
    reviewer: &'a dyn Reviewer,
    clock: &'a dyn Clock,
    policy: RefinementPolicy,
}

impl<'a> RefinementOrchestrator<'a> {
    pub fn new(
        generator: &'a dyn Generator,
        reviewer: &'a dyn Reviewer,
        policy: RefinementPolicy,
    ) -> Self {
        Self {
            generator,
            reviewer,
            clock: &SystemClock,
            policy,
        }
    }

    pub fn with_clock(self, clock: &'a dyn Clock) -> Self {
        Self { clock, ..self }
    }

    pub fn policy(&self) -> &RefinementPolicy {
        &self.policy
    }

    /// Runs one refinement to completion.
    ///
    /// Stops after the first round whose verdict is ready for a human with
    /// `quality_score >= quality_threshold`, or after `max_iterations`
    /// rounds. A generator failure ends the run with an error; a reviewer
    /// failure is replaced by [`ReviewVerdict::fallback`].
    pub async fn run(&self, request: &RefinementRequest) -> Result<RefinementOutcome, RefineError> {
        self.policy.validate()?;
        if request.source_content.trim().is_empty() {
            return Err(RefineError::EmptySource);
        }

        let mut trace: Vec<IterationRecord> = Vec::new();
        let mut step = Step::Generating { iteration: 1 };

        let (termination, final_content, final_review) = loop {
            step = match step {
                Step::Generating { iteration } => {
                    let started = self.clock.now();
                    let generation = self
                        .generate(iteration, request, trace.last())
                        .await
                        .map_err(|source| RefineError::Generation { iteration, source })?;
                    tracing::debug!(
                        iteration,
                        model = %generation.metadata.model,
                        generation_ms = generation.metadata.processing_ms,
                        "content generated"
                    );
                    Step::Reviewing {
                        iteration,
                        content: generation.text,
                        started,
                    }
                }
                Step::Reviewing {
                    iteration,
                    content,
                    started,
                } => {
                    let (review, review_substituted) =
                        self.review(&request.source_content, &content).await;
                    let satisfied = review.satisfies(self.policy.quality_threshold);
                    tracing::debug!(
                        iteration,
                        quality = review.quality_score,
                        ready = review.ready_for_human,
                        satisfied,
                        "content reviewed"
                    );

                    trace.push(IterationRecord {
                        iteration,
                        content: content.clone(),
                        review: review.clone(),
                        review_substituted,
                        processing_ms: self.clock.elapsed_ms(started),
                    });

                    if satisfied {
                        Step::Done {
                            termination: Termination::QualityReached,
                            content,
                            review,
                        }
                    } else if iteration >= self.policy.max_iterations {
                        Step::Done {
                            termination: Termination::BudgetExhausted,
                            content,
                            review,
                        }
                    } else {
                        Step::Generating {
                            iteration: iteration + 1,
                        }
                    }
                }
                Step::Done {
                    termination,
                    content,
                    review,
                } => break (termination, content, review),
            };
        };

        tracing::info!(
            style = %request.style,
            iterations = trace.len(),
            ?termination,
            quality = final_review.quality_score,
            "refinement run finished"
        );

        Ok(RefinementOutcome {
            style: request.style.clone(),
            final_content,
            final_review,
            termination,
            iterations: trace,
        })
    }

    async fn generate(
        &self,
        iteration: u32,
        request: &RefinementRequest,
        previous: Option<&IterationRecord>,
    ) -> Result<Generation, GenerationError> {
        match previous {
            Some(previous) if iteration > 1 => {
                self.generator
                    .edit(
                        &previous.content,
                        &previous.review,
                        request.human_feedback.as_deref(),
                    )
                    .await
            }
            _ => {
                self.generator
                    .write(&request.source_content, &request.style)
                    .await
            }
        }
    }

    async fn review(&self, original: &str, candidate: &str) -> (ReviewVerdict, bool) {
        review_or_fallback(self.reviewer, original, candidate).await
    }
}

/// Reviews `candidate`, substituting the fallback verdict on failure.
/// The flag is true when the fallback was used.
pub async fn review_or_fallback(
    reviewer: &dyn Reviewer,
    original: &str,
    candidate: &str,
) -> (ReviewVerdict, bool) {
    match reviewer.review(original, candidate).await {
        Ok(verdict) => (verdict, false),
        Err(err) => {
            tracing::warn!(error = %err, "review failed, substituting default verdict");
            (ReviewVerdict::fallback(err.to_string()), true)
        }
    }
}
