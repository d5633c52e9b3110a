use std::sync::Arc;
use std::time::{Duration, Instant};

use ql_core::core::{
    Generation, GenerationError, GenerationMetadata, Generator, PortFuture, ReviewError,
    ReviewVerdict, Reviewer, Style,
};

use crate::bootstrap::BackendInfo;
use crate::outbound::{ChatCall, ChatWire, ChatWireRegistry};
use crate::prompts::{self, ChatPrompt};

// ---------------------------------------------------------------------------
// ChatClient — one configured chat backend over HTTP
// ---------------------------------------------------------------------------

pub struct ChatClient {
    http: reqwest::Client,
    backend: BackendInfo,
    wire: Arc<dyn ChatWire>,
}

/// Text returned by a backend, with the model that produced it.
#[derive(Debug, Clone)]
pub struct ChatOutput {
    pub text: String,
    pub model: String,
    pub processing_ms: u64,
}

impl ChatClient {
    pub fn new(backend: BackendInfo, registry: &ChatWireRegistry) -> Result<Self, anyhow::Error> {
        let wire = registry
            .get(backend.spec)
            .ok_or_else(|| anyhow::anyhow!("no wire adapter for backend {}", backend.id))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(backend.timeout_ms))
            .build()?;
        Ok(Self {
            http,
            backend,
            wire,
        })
    }

    pub fn backend(&self) -> &BackendInfo {
        &self.backend
    }

    pub async fn complete(&self, prompt: &ChatPrompt) -> Result<ChatOutput, GenerationError> {
        let started = Instant::now();
        let call = ChatCall {
            model: &self.backend.model,
            prompt,
            temperature: self.backend.temperature,
            max_tokens: self.backend.max_tokens,
        };
        let body = self.wire.build_request_body(&call)?;
        let url = format!("{}{}", self.backend.base_url, self.wire.inference_path());

        let mut request = self.http.post(&url).body(body);
        for (k, v) in self.wire.extra_headers(self.backend.api_key.as_deref()) {
            request = request.header(k, v);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::HttpStatus { status, body });
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let reply = self.wire.parse_response(&bytes)?;

        let text = reply.text.trim();
        if text.is_empty() {
            return Err(GenerationError::EmptyOutput);
        }

        let processing_ms = started.elapsed().as_millis() as u64;
        tracing::debug!(
            backend = %self.backend.id,
            model = %reply.model,
            processing_ms,
            chars = text.len(),
            "chat completion finished"
        );

        Ok(ChatOutput {
            text: text.to_owned(),
            model: if reply.model.is_empty() {
                self.backend.model.clone()
            } else {
                reply.model
            },
            processing_ms,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout {
                timeout_ms: self.backend.timeout_ms,
            }
        } else {
            GenerationError::Connection(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// LlmGenerator — Generator port backed by a chat model
// ---------------------------------------------------------------------------

pub struct LlmGenerator {
    client: ChatClient,
}

impl LlmGenerator {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    async fn generate(&self, prompt: ChatPrompt) -> Result<Generation, GenerationError> {
        let output = self.client.complete(&prompt).await?;
        Ok(Generation {
            text: output.text,
            metadata: GenerationMetadata {
                model: output.model,
                temperature: Some(self.client.backend().temperature),
                processing_ms: output.processing_ms,
            },
        })
    }
}

impl Generator for LlmGenerator {
    fn write<'a>(
        &'a self,
        content: &'a str,
        style: &'a Style,
    ) -> PortFuture<'a, Result<Generation, GenerationError>> {
        Box::pin(self.generate(prompts::write_prompt(content, style)))
    }

    fn edit<'a>(
        &'a self,
        content: &'a str,
        review: &'a ReviewVerdict,
        human_feedback: Option<&'a str>,
    ) -> PortFuture<'a, Result<Generation, GenerationError>> {
        Box::pin(self.generate(prompts::edit_prompt(content, review, human_feedback)))
    }
}

// ---------------------------------------------------------------------------
// LlmReviewer — Reviewer port backed by a chat model
// ---------------------------------------------------------------------------

pub struct LlmReviewer {
    client: ChatClient,
}

impl LlmReviewer {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

impl Reviewer for LlmReviewer {
    fn review<'a>(
        &'a self,
        original: &'a str,
        candidate: &'a str,
    ) -> PortFuture<'a, Result<ReviewVerdict, ReviewError>> {
        Box::pin(async move {
            let prompt = prompts::review_prompt(original, candidate);
            let output = self
                .client
                .complete(&prompt)
                .await
                .map_err(|e| ReviewError::Upstream(e.to_string()))?;
            ReviewVerdict::parse_lenient(&output.text)
        })
    }
}
