pub mod ollama;
pub mod openai_chat;

use std::sync::Arc;

use ql_core::core::GenerationError;

use crate::prompts::ChatPrompt;

/// Wire format spoken by a chat backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendSpec {
    OpenAiChat,
    Ollama,
}

/// One non-streaming chat completion call.
#[derive(Debug, Clone)]
pub struct ChatCall<'a> {
    pub model: &'a str,
    pub prompt: &'a ChatPrompt,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub model: String,
    pub text: String,
}

/// Translates chat calls to and from one backend's HTTP wire format.
pub trait ChatWire: Send + Sync {
    fn backend_spec(&self) -> BackendSpec;

    fn build_request_body(&self, call: &ChatCall<'_>) -> Result<Vec<u8>, GenerationError>;

    fn parse_response(&self, body: &[u8]) -> Result<ChatReply, GenerationError>;

    fn extra_headers(&self, api_key: Option<&str>) -> Vec<(String, String)>;

    fn inference_path(&self) -> &str;
}

/// Registry of all available wire adapters, keyed by backend spec.
pub struct ChatWireRegistry {
    wires: Vec<(BackendSpec, Arc<dyn ChatWire>)>,
}

impl ChatWireRegistry {
    pub fn new() -> Self {
        let wires: Vec<(BackendSpec, Arc<dyn ChatWire>)> = vec![
            (BackendSpec::OpenAiChat, Arc::new(openai_chat::OpenAiChatWire)),
            (BackendSpec::Ollama, Arc::new(ollama::OllamaWire)),
        ];
        Self { wires }
    }

    pub fn get(&self, spec: BackendSpec) -> Option<Arc<dyn ChatWire>> {
        self.wires
            .iter()
            .find(|(s, _)| *s == spec)
            .map(|(_, wire)| Arc::clone(wire))
    }
}

impl Default for ChatWireRegistry {
    fn default() -> Self {
        Self::new()
    }
}
