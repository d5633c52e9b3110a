use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use ql_core::core::{
    CandidateSelectionEngine, CandidateVariant, Generator, RefineError, RefinementOrchestrator,
    RefinementOutcome, RefinementPolicy, RefinementRequest, ReviewVerdict, Reviewer,
    SelectionError, SelectionMode, Style, UNKNOWN_STYLE, VerdictScorer, VersionId,
};
use ql_feedback::{
    BestParameters, FeedbackEntry, FeedbackMetadata, FeedbackStatistics, LedgerError, RewardModel,
};

use crate::bootstrap::RuntimeConfig;

/// Versions kept for later rating; the oldest are forgotten first.
pub const MAX_TRACKED_VERSIONS: usize = 10_000;

// ---------------------------------------------------------------------------
// ServiceError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Refine(#[from] RefineError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("failed to persist feedback: {0}")]
    Ledger(#[from] LedgerError),
    #[error("unknown version: {0}")]
    UnknownVersion(VersionId),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Version registry — produced content awaiting a human rating
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionRecord {
    pub content: String,
    pub style: Style,
    pub iteration_count: u32,
    pub review: ReviewVerdict,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct VersionTable {
    records: HashMap<VersionId, VersionRecord>,
    order: VecDeque<VersionId>,
}

pub struct VersionRegistry {
    table: RwLock<VersionTable>,
    capacity: usize,
}

impl VersionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            table: RwLock::new(VersionTable::default()),
            capacity: capacity.max(1),
        }
    }

    pub async fn register(&self, record: VersionRecord) -> VersionId {
        let id = VersionId::new(Uuid::new_v4().to_string());
        let mut table = self.table.write().await;
        while table.order.len() >= self.capacity {
            match table.order.pop_front() {
                Some(oldest) => {
                    table.records.remove(&oldest);
                }
                None => break,
            }
        }
        table.order.push_back(id.clone());
        table.records.insert(id.clone(), record);
        id
    }

    pub async fn get(&self, id: &VersionId) -> Option<VersionRecord> {
        self.table.read().await.records.get(id).cloned()
    }

    pub async fn tracked_count(&self) -> usize {
        self.table.read().await.records.len()
    }
}

// ---------------------------------------------------------------------------
// Request and result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RefineParams {
    pub content: String,
    pub style: Option<Style>,
    pub max_iterations: Option<u32>,
    pub human_feedback: Option<String>,
}

/// Where the style and budget of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSource {
    Request,
    Learned,
    Configured,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefineResult {
    pub version_id: VersionId,
    pub style_source: ParameterSource,
    pub iterations_source: ParameterSource,
    pub max_iterations: u32,
    pub outcome: RefinementOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProducedVariant {
    pub version_id: VersionId,
    #[serde(flatten)]
    pub variant: CandidateVariant,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariantsResult {
    pub variants: Vec<ProducedVariant>,
    pub selected_index: usize,
    pub mode: SelectionMode,
    pub reward: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FeedbackParams {
    pub version_id: VersionId,
    pub rating: f64,
    pub comment: Option<String>,
    /// Used when the version is not tracked by this process.
    pub content: Option<String>,
    pub metadata: Option<FeedbackMetadata>,
}

// ---------------------------------------------------------------------------
// RefinementService — the operations exposed over HTTP and the CLI
// ---------------------------------------------------------------------------

pub struct RefinementService {
    generator: Arc<dyn Generator>,
    reviewer: Arc<dyn Reviewer>,
    model: Arc<Mutex<RewardModel>>,
    versions: VersionRegistry,
    rng: Mutex<StdRng>,
    policy: RefinementPolicy,
    max_iterations_limit: u32,
    default_style: Style,
    use_learned_defaults: bool,
    exploration_rate: f64,
    variants: usize,
    max_variants: usize,
}

impl RefinementService {
    pub fn new(
        runtime: &RuntimeConfig,
        generator: Arc<dyn Generator>,
        reviewer: Arc<dyn Reviewer>,
        model: RewardModel,
    ) -> Self {
        Self {
            generator,
            reviewer,
            model: Arc::new(Mutex::new(model)),
            versions: VersionRegistry::new(MAX_TRACKED_VERSIONS),
            rng: Mutex::new(StdRng::from_os_rng()),
            policy: runtime.policy,
            max_iterations_limit: runtime.max_iterations_limit,
            default_style: runtime.default_style.clone(),
            use_learned_defaults: runtime.use_learned_defaults,
            exploration_rate: runtime.exploration_rate,
            variants: runtime.variants,
            max_variants: runtime.max_variants,
        }
    }

    /// Replaces the random source, for reproducible selection.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn versions(&self) -> &VersionRegistry {
        &self.versions
    }

    /// Runs one refinement and registers its final content for rating.
    pub async fn refine(&self, params: RefineParams) -> Result<RefineResult, ServiceError> {
        let learned = self.learned_parameters().await?;

        let learned_style = learned
            .as_ref()
            .map(|best| &best.style)
            .filter(|style| style.as_str() != UNKNOWN_STYLE);
        let (style, style_source) = match (params.style, learned_style) {
            (Some(style), _) => (style, ParameterSource::Request),
            (None, Some(style)) => (style.clone(), ParameterSource::Learned),
            (None, None) => (self.default_style.clone(), ParameterSource::Configured),
        };
        let (max_iterations, iterations_source) = match (params.max_iterations, &learned) {
            (Some(n), _) => (n, ParameterSource::Request),
            (None, Some(best)) => (
                best.iterations.clamp(1, self.max_iterations_limit),
                ParameterSource::Learned,
            ),
            (None, None) => (self.policy.max_iterations, ParameterSource::Configured),
        };
        if max_iterations > self.max_iterations_limit {
            return Err(ServiceError::InvalidRequest(format!(
                "max_iterations must not exceed {}, got {max_iterations}",
                self.max_iterations_limit
            )));
        }

        let policy = RefinementPolicy {
            max_iterations,
            ..self.policy
        };
        let request = RefinementRequest {
            source_content: params.content,
            style,
            human_feedback: params.human_feedback,
        };

        let orchestrator =
            RefinementOrchestrator::new(self.generator.as_ref(), self.reviewer.as_ref(), policy);
        let outcome = orchestrator.run(&request).await?;

        let version_id = self
            .versions
            .register(VersionRecord {
                content: outcome.final_content.clone(),
                style: outcome.style.clone(),
                iteration_count: outcome.iteration_count(),
                review: outcome.final_review.clone(),
                created_at: Utc::now(),
            })
            .await;

        tracing::info!(
            version_id = %version_id,
            style = %outcome.style,
            iterations = outcome.iteration_count(),
            termination = ?outcome.termination,
            "refinement finished"
        );

        Ok(RefineResult {
            version_id,
            style_source,
            iterations_source,
            max_iterations,
            outcome,
        })
    }

    /// Generates variants and picks one epsilon-greedily.
    pub async fn variants(
        &self,
        content: &str,
        count: Option<usize>,
    ) -> Result<VariantsResult, ServiceError> {
        if content.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("content is empty".to_owned()));
        }
        let count = count.unwrap_or(self.variants);
        if count > self.max_variants {
            return Err(ServiceError::InvalidRequest(format!(
                "count must not exceed {}, got {count}",
                self.max_variants
            )));
        }
        let mut rng = self.fork_rng();

        let generating = CandidateSelectionEngine::new(
            self.generator.as_ref(),
            self.reviewer.as_ref(),
            &VerdictScorer,
        );
        let variants = generating.generate_variants(content, count, &mut rng).await?;

        let selection = {
            let generator = Arc::clone(&self.generator);
            let reviewer = Arc::clone(&self.reviewer);
            let exploration_rate = self.exploration_rate;
            let candidates = variants.clone();
            self.with_model(move |model| {
                CandidateSelectionEngine::new(generator.as_ref(), reviewer.as_ref(), &*model)
                    .with_exploration_rate(exploration_rate)
                    .select_best(&candidates, &mut rng)
            })
            .await??
        };

        let mut produced = Vec::with_capacity(variants.len());
        for variant in variants {
            let version_id = self
                .versions
                .register(VersionRecord {
                    content: variant.content.clone(),
                    style: variant.style.clone(),
                    iteration_count: 1,
                    review: variant.ai_review.clone(),
                    created_at: Utc::now(),
                })
                .await;
            produced.push(ProducedVariant {
                version_id,
                variant,
            });
        }

        tracing::info!(
            count = produced.len(),
            selected = selection.index,
            mode = ?selection.mode,
            "variants generated"
        );

        Ok(VariantsResult {
            variants: produced,
            selected_index: selection.index,
            mode: selection.mode,
            reward: selection.reward,
        })
    }

    /// Records a human rating for a produced version.
    pub async fn record_feedback(
        &self,
        params: FeedbackParams,
    ) -> Result<FeedbackEntry, ServiceError> {
        if !params.rating.is_finite() {
            return Err(ServiceError::InvalidRequest(
                "rating must be a finite number".to_owned(),
            ));
        }

        let (content, metadata) = match self.versions.get(&params.version_id).await {
            Some(record) => {
                let metadata =
                    FeedbackMetadata::from_review(record.style, &record.review, record.iteration_count);
                (record.content, metadata)
            }
            None => match params.content {
                Some(content) => (content, params.metadata.unwrap_or_default()),
                None => return Err(ServiceError::UnknownVersion(params.version_id)),
            },
        };

        let version_id = params.version_id;
        let rating = params.rating;
        let comment = params.comment;
        let entry = self
            .with_model(move |model| {
                model
                    .record_feedback(&version_id, &content, &metadata, rating, comment.as_deref())
                    .cloned()
            })
            .await??;
        Ok(entry)
    }

    pub async fn statistics(&self) -> Result<FeedbackStatistics, ServiceError> {
        self.with_model(|model| model.get_statistics()).await
    }

    pub async fn best_parameters(&self) -> Result<BestParameters, ServiceError> {
        self.with_model(|model| model.get_best_parameters()).await
    }

    pub async fn history(&self) -> Result<Vec<FeedbackEntry>, ServiceError> {
        self.with_model(|model| model.history().to_vec()).await
    }

    /// Best parameters when learning is enabled and some feedback exists.
    async fn learned_parameters(&self) -> Result<Option<BestParameters>, ServiceError> {
        if !self.use_learned_defaults {
            return Ok(None);
        }
        self.with_model(|model| {
            if model.history().is_empty() {
                None
            } else {
                Some(model.get_best_parameters())
            }
        })
        .await
    }

    /// Runs `f` against the reward model on the blocking pool. Ledger writes
    /// are whole-file rewrites, so callers are serialized by the mutex.
    async fn with_model<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&mut RewardModel) -> T + Send + 'static,
    {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let mut guard = model.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut guard)
        })
        .await
        .map_err(|err| ServiceError::Internal(format!("reward model task failed: {err}")))
    }

    fn fork_rng(&self) -> StdRng {
        let mut master = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        StdRng::from_rng(&mut *master)
    }
}
