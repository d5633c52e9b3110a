use ql_core::core::GenerationError;

use super::{BackendSpec, ChatCall, ChatReply, ChatWire};

pub struct OpenAiChatWire;

impl ChatWire for OpenAiChatWire {
    fn backend_spec(&self) -> BackendSpec {
        BackendSpec::OpenAiChat
    }

    fn build_request_body(&self, call: &ChatCall<'_>) -> Result<Vec<u8>, GenerationError> {
        let body = serde_json::json!({
            "model": call.model,
            "messages": [
                {"role": "system", "content": call.prompt.system},
                {"role": "user", "content": call.prompt.user},
            ],
            "temperature": call.temperature,
            "max_tokens": call.max_tokens,
            "stream": false,
        });

        serde_json::to_vec(&body).map_err(|e| GenerationError::Malformed(e.to_string()))
    }

    fn parse_response(&self, body: &[u8]) -> Result<ChatReply, GenerationError> {
        let resp: OaiResponseWire =
            serde_json::from_slice(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::Malformed("response has no choices".to_owned()))?;

        Ok(ChatReply {
            model: resp.model,
            text: choice.message.content.unwrap_or_default(),
        })
    }

    fn extra_headers(&self, api_key: Option<&str>) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_owned(), "application/json".to_owned())];
        if let Some(key) = api_key {
            headers.push(("Authorization".to_owned(), format!("Bearer {key}")));
        }
        headers
    }

    fn inference_path(&self) -> &str {
        "/v1/chat/completions"
    }
}

// ---------------------------------------------------------------------------
// Response wire types (Deserialize only)
// ---------------------------------------------------------------------------

#[derive(serde::Deserialize)]
struct OaiResponseWire {
    #[serde(default)]
    model: String,
    choices: Vec<OaiChoiceWire>,
}

#[derive(serde::Deserialize)]
struct OaiChoiceWire {
    message: OaiMessageWire,
}

#[derive(serde::Deserialize)]
struct OaiMessageWire {
    content: Option<String>,
}

#[cfg(test)]
mod tests;
