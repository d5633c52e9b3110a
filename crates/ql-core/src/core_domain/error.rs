// ---------------------------------------------------------------------------
// Capability errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generator returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("generator connection failed: {0}")]
    Connection(String),
    #[error("generator timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("generator returned no text")]
    EmptyOutput,
    #[error("generator response malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("reviewer output malformed: {0}")]
    Malformed(String),
    #[error("reviewer call failed: {0}")]
    Upstream(String),
}

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RefineError {
    #[error("source content is empty")]
    EmptySource,
    #[error("invalid refinement policy: {0}")]
    InvalidPolicy(String),
    #[error("AI generation failed in round {iteration}: {source}")]
    Generation {
        iteration: u32,
        #[source]
        source: GenerationError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("at least one variant must be requested")]
    NoVariantsRequested,
    #[error("no candidates to select from")]
    NoCandidates,
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
