use ql_core::core::GenerationError;

use super::{BackendSpec, ChatCall, ChatReply, ChatWire};

pub struct OllamaWire;

impl ChatWire for OllamaWire {
    fn backend_spec(&self) -> BackendSpec {
        BackendSpec::Ollama
    }

    fn build_request_body(&self, call: &ChatCall<'_>) -> Result<Vec<u8>, GenerationError> {
        // Ollama nests generation parameters under "options" and calls the
        // token cap "num_predict".
        let body = serde_json::json!({
            "model": call.model,
            "messages": [
                {"role": "system", "content": call.prompt.system},
                {"role": "user", "content": call.prompt.user},
            ],
            "stream": false,
            "options": {
                "temperature": call.temperature,
                "num_predict": call.max_tokens,
            },
        });

        serde_json::to_vec(&body).map_err(|e| GenerationError::Malformed(e.to_string()))
    }

    fn parse_response(&self, body: &[u8]) -> Result<ChatReply, GenerationError> {
        let resp: OllamaResponseWire =
            serde_json::from_slice(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;

        Ok(ChatReply {
            model: resp.model,
            text: resp.message.content.unwrap_or_default(),
        })
    }

    fn extra_headers(&self, api_key: Option<&str>) -> Vec<(String, String)> {
        api_key
            .map(|key| vec![("Authorization".to_owned(), format!("Bearer {key}"))])
            .unwrap_or_default()
    }

    fn inference_path(&self) -> &str {
        "/api/chat"
    }
}

// ---------------------------------------------------------------------------
// Response wire types (Deserialize only)
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
struct OllamaResponseWire {
    #[serde(default)]
    model: String,
    message: OllamaMessageWire,
}

#[derive(serde::Deserialize)]
struct OllamaMessageWire {
    content: Option<String>,
}
