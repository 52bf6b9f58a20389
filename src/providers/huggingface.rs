//! Hugging Face Inference API adapter.
//!
//! Targets `text-generation` models that expose no chat endpoint: the
//! conversation is rendered into a single role-labelled prompt ending in
//! `Assistant:` and sent to `/models/{model}`. Text-only, so queries fall
//! through to the deterministic fallback path.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::LibrarianConfig;
use crate::error::{ConfigError, ProviderError};
use crate::message::{ChatMessage, assistant_message, user_message};
use crate::provider::{ProviderAdapter, ProviderResponse, Session};
use crate::tool::ToolSpec;

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
const ERROR_BODY_LIMIT: usize = 200;

/// Renders system instruction plus history into one completion prompt.
///
/// The trailing `Assistant:` cue prompts the model to continue in the
/// assistant role.
fn render_prompt(system: &str, history: &[ChatMessage]) -> String {
    let mut prompt = String::new();
    prompt.push_str(system);
    prompt.push_str("\n\n");
    for message in history {
        prompt.push_str(message.role.label());
        prompt.push_str(": ");
        prompt.push_str(&message.content);
        prompt.push('\n');
    }
    prompt.push_str("Assistant:");
    prompt
}

/// Hugging Face text-generation adapter.
pub struct HuggingFaceAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl HuggingFaceAdapter {
    /// Creates the adapter from configuration.
    ///
    /// Uses `LLM_BASE_URL` when set (self-hosted TGI or vLLM endpoints),
    /// otherwise the hosted Inference API. An API key is optional: public
    /// models serve unauthenticated requests.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ClientUnavailable`] if the HTTP client cannot
    /// be constructed.
    pub fn new(config: &LibrarianConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::ClientUnavailable {
                provider: "huggingface",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    async fn round_trip(
        &self,
        system: &str,
        history: &mut Vec<ChatMessage>,
    ) -> Result<ProviderResponse, ProviderError> {
        let mut parameters = json!({
            "temperature": self.temperature,
            "return_full_text": false,
        });
        if let Some(max_tokens) = self.max_tokens {
            parameters["max_new_tokens"] = json!(max_tokens);
        }
        let body = json!({
            "inputs": render_prompt(system, history),
            "parameters": parameters,
        });

        let mut request = self
            .client
            .post(format!("{}/models/{}", self.base_url, self.model))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| ProviderError::Request {
            provider: "huggingface",
            message: e.to_string(),
        })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transport {
                status: status.as_u16(),
                message: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse {
                provider: "huggingface",
                message: e.to_string(),
            })?;

        let text = generated_text(&parsed);
        if !text.is_empty() {
            history.push(assistant_message(&text, Vec::new()));
        }

        Ok(ProviderResponse::HuggingFace(parsed))
    }
}

/// Pulls the generated text out of either response shape the Inference API
/// uses (`[{"generated_text": …}]` or a bare object).
fn generated_text(body: &Value) -> String {
    let slot = match body {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    slot.and_then(|v| v.get("generated_text"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

impl std::fmt::Debug for HuggingFaceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceAdapter")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderAdapter for HuggingFaceAdapter {
    fn name(&self) -> &'static str {
        "huggingface"
    }

    fn start_chat(&self, system_instruction: &str, _tools: &[ToolSpec]) -> Session {
        Session::HuggingFace {
            system: system_instruction.to_string(),
            history: Vec::new(),
        }
    }

    async fn send_user_message(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let Session::HuggingFace { system, history } = session else {
            return Err(ProviderError::SessionMismatch {
                provider: "huggingface",
            });
        };
        history.push(user_message(text));
        self.round_trip(system, history).await
    }

    async fn send_tool_result(
        &self,
        _session: &mut Session,
        _tool_name: &str,
        _result_text: &str,
        _call_id: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::ToolsUnsupported {
            provider: "huggingface",
        })
    }

    fn extract_text(&self, response: &ProviderResponse) -> String {
        let ProviderResponse::HuggingFace(body) = response else {
            return String::new();
        };
        generated_text(body)
    }
}
