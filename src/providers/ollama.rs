//! Ollama `/api/chat` adapter.
//!
//! Text-only: no tool declarations are registered and `extract_tool_calls`
//! keeps the trait default of no calls, so the orchestration loop always
//! answers Ollama-backed queries through the deterministic fallback path.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::LibrarianConfig;
use crate::error::{ConfigError, ProviderError};
use crate::message::{ChatMessage, system_message, user_message};
use crate::provider::{ProviderAdapter, ProviderResponse, Session};
use crate::tool::ToolSpec;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const ERROR_BODY_LIMIT: usize = 200;

/// Local Ollama serving adapter.
pub struct OllamaAdapter {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaAdapter {
    /// Creates the adapter from configuration.
    ///
    /// Uses `LLM_BASE_URL` when set, otherwise the standard local endpoint.
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
                provider: "ollama",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    async fn round_trip(
        &self,
        messages: &mut Vec<ChatMessage>,
    ) -> Result<ProviderResponse, ProviderError> {
        let wire: Vec<Value> = messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();
        let body = json!({
            "model": self.model,
            "messages": wire,
            "stream": false,
            "options": {"temperature": self.temperature},
        });

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                provider: "ollama",
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
                provider: "ollama",
                message: e.to_string(),
            })?;

        if let Some(content) = parsed
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
        {
            messages.push(crate::message::assistant_message(content, Vec::new()));
        }

        Ok(ProviderResponse::Ollama(parsed))
    }
}

impl std::fmt::Debug for OllamaAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaAdapter")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn start_chat(&self, system_instruction: &str, _tools: &[ToolSpec]) -> Session {
        Session::Ollama {
            messages: vec![system_message(system_instruction)],
        }
    }

    async fn send_user_message(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let Session::Ollama { messages } = session else {
            return Err(ProviderError::SessionMismatch { provider: "ollama" });
        };
        messages.push(user_message(text));
        self.round_trip(messages).await
    }

    async fn send_tool_result(
        &self,
        _session: &mut Session,
        _tool_name: &str,
        _result_text: &str,
        _call_id: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        Err(ProviderError::ToolsUnsupported { provider: "ollama" })
    }

    fn extract_text(&self, response: &ProviderResponse) -> String {
        let ProviderResponse::Ollama(body) = response else {
            return String::new();
        };
        body.get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::tool::catalog;

    fn adapter() -> OllamaAdapter {
        let config = LibrarianConfig::builder()
            .mode("open_source")
            .provider("ollama")
            .model("llama3")
            .build()
            .unwrap_or_else(|_| unreachable!());
        OllamaAdapter::new(&config).unwrap_or_else(|e| panic!("adapter: {e}"))
    }

    #[test]
    fn test_default_base_url() {
        assert_eq!(adapter().base_url, "http://localhost:11434");
    }

    #[test]
    fn test_no_tool_support() {
        let adapter = adapter();
        assert!(!adapter.supports_tools());
        let session = adapter.start_chat("Librarian.", &catalog());
        let Session::Ollama { messages } = session else {
            panic!("expected Ollama session");
        };
        // Catalog is ignored: only the system turn seeds the conversation.
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_tool_result_rejected() {
        let adapter = adapter();
        let mut session = adapter.start_chat("Librarian.", &[]);
        let err = adapter
            .send_tool_result(&mut session, "list_recent_traces", "result", None)
            .await;
        assert!(matches!(
            err,
            Err(ProviderError::ToolsUnsupported { provider: "ollama" })
        ));
    }

    #[test]
    fn test_extract_text_reads_message_content() {
        let body = serde_json::json!({
            "model": "llama3",
            "message": {"role": "assistant", "content": "There are 4 traces."},
            "done": true
        });
        assert_eq!(
            adapter().extract_text(&ProviderResponse::Ollama(body)),
            "There are 4 traces."
        );
    }

    #[test]
    fn test_extract_tool_calls_default_empty() {
        let body = serde_json::json!({"message": {"content": "hi"}});
        assert!(
            adapter()
                .extract_tool_calls(&ProviderResponse::Ollama(body))
                .is_empty()
        );
    }
}
