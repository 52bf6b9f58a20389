//! Anthropic Messages API adapter.
//!
//! Speaks the Messages wire protocol directly over `reqwest`. The catalog's
//! `parameters` schema converts to `input_schema` blocks unchanged; tool
//! results travel back as `tool_result` content blocks inside user turns,
//! correlated by `tool_use_id`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LibrarianConfig;
use crate::error::{ConfigError, ProviderError};
use crate::provider::{ProviderAdapter, ProviderResponse, Session, coerce_args};
use crate::tool::{ToolCall, ToolSpec};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
/// Fallback response budget when no `LLM_MAX_TOKENS` is configured;
/// the Messages API makes `max_tokens` mandatory.
const FALLBACK_MAX_TOKENS: u32 = 512;
/// Truncation bound for error bodies echoed into [`ProviderError`].
const ERROR_BODY_LIMIT: usize = 200;

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// One content block inside a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Natural-language text.
    Text {
        /// Block text.
        text: String,
    },
    /// A tool invocation requested by the model.
    ToolUse {
        /// Correlation id echoed back in the matching `tool_result`.
        id: String,
        /// Tool name.
        name: String,
        /// Argument payload.
        input: Value,
    },
    /// A tool result delivered back to the model.
    ToolResult {
        /// Id of the `tool_use` block this answers.
        tool_use_id: String,
        /// Rendered tool output.
        content: String,
    },
    /// Any block type this adapter does not interpret.
    #[serde(other)]
    Unknown,
}

/// One wire-format conversation turn.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    /// `"user"` or `"assistant"`.
    pub role: &'static str,
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [Turn],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
    temperature: f32,
}

/// Messages API response body.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    /// Assistant content blocks.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    /// Why generation stopped (`"end_turn"`, `"tool_use"`, …).
    #[serde(default)]
    pub stop_reason: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Adapter
// ─────────────────────────────────────────────────────────────────────────────

/// Anthropic Messages API adapter.
pub struct AnthropicAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicAdapter {
    /// Creates the adapter from configuration.
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
                provider: "anthropic",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().unwrap_or_default(),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
        })
    }

    async fn round_trip(
        &self,
        system: &str,
        turns: &mut Vec<Turn>,
        tools: &[ToolSpec],
    ) -> Result<ProviderResponse, ProviderError> {
        let request = ApiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: turns,
            tools: tools
                .iter()
                .map(|spec| ApiTool {
                    name: &spec.name,
                    description: &spec.description,
                    input_schema: &spec.parameters,
                })
                .collect(),
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                provider: "anthropic",
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

        let parsed: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: "anthropic",
                    message: e.to_string(),
                })?;

        // Replay the assistant turn (text and tool_use blocks) so the next
        // request carries the full conversation.
        let assistant_blocks: Vec<ContentBlock> = parsed
            .content
            .iter()
            .filter(|block| !matches!(block, ContentBlock::Unknown))
            .cloned()
            .collect();
        turns.push(Turn {
            role: "assistant",
            content: assistant_blocks,
        });

        Ok(ProviderResponse::Anthropic(parsed))
    }
}

impl std::fmt::Debug for AnthropicAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicAdapter")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn start_chat(&self, system_instruction: &str, tools: &[ToolSpec]) -> Session {
        Session::Anthropic {
            system: system_instruction.to_string(),
            turns: Vec::new(),
            tools: tools.to_vec(),
        }
    }

    async fn send_user_message(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let Session::Anthropic {
            system,
            turns,
            tools,
        } = session
        else {
            return Err(ProviderError::SessionMismatch {
                provider: "anthropic",
            });
        };
        turns.push(Turn {
            role: "user",
            content: vec![ContentBlock::Text {
                text: text.to_string(),
            }],
        });
        self.round_trip(system, turns, tools).await
    }

    async fn send_tool_result(
        &self,
        session: &mut Session,
        _tool_name: &str,
        result_text: &str,
        call_id: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        let Session::Anthropic {
            system,
            turns,
            tools,
        } = session
        else {
            return Err(ProviderError::SessionMismatch {
                provider: "anthropic",
            });
        };
        turns.push(Turn {
            role: "user",
            content: vec![ContentBlock::ToolResult {
                tool_use_id: call_id.unwrap_or_default().to_string(),
                content: result_text.to_string(),
            }],
        });
        self.round_trip(system, turns, tools).await
    }

    fn extract_text(&self, response: &ProviderResponse) -> String {
        let ProviderResponse::Anthropic(response) = response else {
            return String::new();
        };
        let mut out = String::new();
        for block in &response.content {
            if let ContentBlock::Text { text } = block {
                out.push_str(text);
            }
        }
        out.trim().to_string()
    }

    fn extract_tool_calls(&self, response: &ProviderResponse) -> Vec<ToolCall> {
        let ProviderResponse::Anthropic(response) = response else {
            return Vec::new();
        };
        response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolCall {
                    name: name.clone(),
                    args: coerce_args(Some(input.clone())),
                    id: Some(id.clone()),
                }),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::tool::catalog;
    use serde_json::json;

    fn adapter() -> AnthropicAdapter {
        let config = LibrarianConfig::builder()
            .provider("anthropic")
            .api_key("test-key")
            .model("claude-sonnet-4-20250514")
            .build()
            .unwrap_or_else(|_| unreachable!());
        AnthropicAdapter::new(&config).unwrap_or_else(|e| panic!("adapter: {e}"))
    }

    #[test]
    fn test_start_chat_shape() {
        let session = adapter().start_chat("Librarian.", &catalog());
        let Session::Anthropic {
            system,
            turns,
            tools,
        } = session
        else {
            panic!("expected Anthropic session");
        };
        assert_eq!(system, "Librarian.");
        assert!(turns.is_empty());
        assert_eq!(tools.len(), 5);
    }

    #[test]
    fn test_response_deserializes_mixed_blocks() {
        let body = json!({
            "content": [
                {"type": "text", "text": "Let me check."},
                {"type": "tool_use", "id": "toolu_01", "name": "list_recent_traces",
                 "input": {"limit": 5}},
                {"type": "thinking", "thinking": "hmm"}
            ],
            "stop_reason": "tool_use"
        });
        let parsed: MessagesResponse = serde_json::from_value(body)
            .unwrap_or_else(|e| panic!("deserialize failed: {e}"));
        assert_eq!(parsed.content.len(), 3);
        assert!(matches!(parsed.content[2], ContentBlock::Unknown));
    }

    #[test]
    fn test_extract_text_concatenates_blocks() {
        let response = ProviderResponse::Anthropic(MessagesResponse {
            content: vec![
                ContentBlock::Text {
                    text: "Found ".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "toolu_01".to_string(),
                    name: "get_trace_details".to_string(),
                    input: json!({}),
                },
                ContentBlock::Text {
                    text: "2 traces.".to_string(),
                },
            ],
            stop_reason: None,
        });
        assert_eq!(adapter().extract_text(&response), "Found 2 traces.");
    }

    #[test]
    fn test_extract_tool_calls_carries_correlation_id() {
        let response = ProviderResponse::Anthropic(MessagesResponse {
            content: vec![ContentBlock::ToolUse {
                id: "toolu_01".to_string(),
                name: "get_trace_details".to_string(),
                input: json!({"trace_id": "abc"}),
            }],
            stop_reason: Some("tool_use".to_string()),
        });
        let calls = adapter().extract_tool_calls(&response);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id.as_deref(), Some("toolu_01"));
        assert_eq!(calls[0].args["trace_id"], "abc");
    }

    #[test]
    fn test_extract_tool_calls_coerces_malformed_input() {
        let response = ProviderResponse::Anthropic(MessagesResponse {
            content: vec![ContentBlock::ToolUse {
                id: "toolu_01".to_string(),
                name: "list_recent_traces".to_string(),
                input: json!("not-an-object"),
            }],
            stop_reason: None,
        });
        let calls = adapter().extract_tool_calls(&response);
        assert_eq!(calls[0].args, json!({}));
    }

    #[test]
    fn test_tool_result_turn_serialization() {
        let turn = Turn {
            role: "user",
            content: vec![ContentBlock::ToolResult {
                tool_use_id: "toolu_01".to_string(),
                content: "No traces found in the database.".to_string(),
            }],
        };
        let encoded = serde_json::to_value(&turn).unwrap_or_default();
        assert_eq!(encoded["content"][0]["type"], "tool_result");
        assert_eq!(encoded["content"][0]["tool_use_id"], "toolu_01");
    }
}
