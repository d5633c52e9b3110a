use std::sync::Arc;

use anyhow::Context;
use ql_feedback::{JsonFileLedger, RewardModel};

use crate::bootstrap::RuntimeConfig;
use crate::handler::{router, AppState};
use crate::llm::{ChatClient, LlmGenerator, LlmReviewer};
use crate::outbound::ChatWireRegistry;
use crate::service::RefinementService;

/// Opens the reward model over the configured ledger directory.
pub fn open_reward_model(runtime: &RuntimeConfig) -> Result<RewardModel, anyhow::Error> {
    let ledger = JsonFileLedger::in_dir(&runtime.data_dir).with_context(|| {
        format!(
            "failed to prepare ledger directory {}",
            runtime.data_dir.display()
        )
    })?;
    Ok(RewardModel::open(ledger))
}

/// Wires the configured backends and ledger into a service.
pub fn build_service(runtime: &RuntimeConfig) -> Result<RefinementService, anyhow::Error> {
    let registry = ChatWireRegistry::new();
    let generator = LlmGenerator::new(ChatClient::new(runtime.generator.clone(), &registry)?);
    let reviewer = LlmReviewer::new(ChatClient::new(runtime.reviewer.clone(), &registry)?);
    let model = open_reward_model(runtime)?;

    Ok(RefinementService::new(
        runtime,
        Arc::new(generator),
        Arc::new(reviewer),
        model,
    ))
}

/// Serves the HTTP API until Ctrl-C.
pub async fn serve(runtime: RuntimeConfig) -> Result<(), anyhow::Error> {
    let service = build_service(&runtime)?;
    let app = router(Arc::new(AppState { service }));

    let listener = tokio::net::TcpListener::bind(&runtime.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", runtime.listen_addr))?;
    tracing::info!(
        listen = %listener.local_addr()?,
        generator = %runtime.generator.id,
        reviewer = %runtime.reviewer.id,
        ledger = %runtime.data_dir.display(),
        "quill listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("quill stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
