//! Gemini `generateContent` adapter.
//!
//! Speaks the REST wire protocol directly over `reqwest`. Function
//! declarations are rebuilt from the catalog at `start_chat` with the
//! platform's parameter-type reduction: declared types collapse to
//! `INTEGER` or `STRING` only — anything else coerces to `STRING`.
//! Gemini does not correlate call→result, so extracted tool calls carry
//! no call id and results are routed back by function name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::LibrarianConfig;
use crate::error::{ConfigError, ProviderError};
use crate::provider::{ProviderAdapter, ProviderResponse, Session, coerce_args};
use crate::tool::{ToolCall, ToolSpec};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const ERROR_BODY_LIMIT: usize = 200;

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

/// A model-requested function invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name.
    pub name: String,
    /// Argument payload.
    #[serde(default)]
    pub args: Option<Value>,
}

/// A function result delivered back to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Function name the result answers (Gemini's correlation key).
    pub name: String,
    /// Result payload.
    pub response: Value,
}

/// One part of a content turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Natural-language text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Function invocation requested by the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    /// Function result sent back to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

/// One conversation turn (`"user"` or `"model"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Turn role.
    #[serde(default)]
    pub role: String,
    /// Ordered parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One response candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    /// Candidate content, absent on safety blocks.
    #[serde(default)]
    pub content: Option<Content>,
}

/// `generateContent` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    /// Ranked candidates; the adapter only reads the first.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// Rebuilds one catalog entry as a Gemini function declaration.
///
/// Parameter types reduce to `INTEGER` for declared integers and `STRING`
/// for everything else.
fn declaration(spec: &ToolSpec) -> Value {
    let mut properties = Map::new();
    if let Some(props) = spec.parameters.get("properties").and_then(Value::as_object) {
        for (key, field) in props {
            let declared = field.get("type").and_then(Value::as_str);
            let reduced = if declared == Some("integer") {
                "INTEGER"
            } else {
                "STRING"
            };
            properties.insert(
                key.clone(),
                json!({
                    "type": reduced,
                    "description": field.get("description").and_then(Value::as_str).unwrap_or(""),
                }),
            );
        }
    }

    json!({
        "name": spec.name,
        "description": spec.description,
        "parameters": {
            "type": "OBJECT",
            "properties": properties,
            "required": spec.parameters.get("required").cloned().unwrap_or_else(|| json!([])),
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Adapter
// ─────────────────────────────────────────────────────────────────────────────

/// Gemini REST adapter.
pub struct GeminiAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl GeminiAdapter {
    /// Creates the adapter from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] when no API key is resolved
    /// (`GEMINI_API_KEY` or `LLM_API_KEY`), or
    /// [`ConfigError::ClientUnavailable`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &LibrarianConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .resolved_api_key()
            .ok_or(ConfigError::MissingSetting {
                provider: "gemini",
                setting: "GEMINI_API_KEY or LLM_API_KEY",
            })?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::ClientUnavailable {
                provider: "gemini",
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    async fn round_trip(
        &self,
        system: &str,
        contents: &mut Vec<Content>,
        declarations: &[Value],
    ) -> Result<ProviderResponse, ProviderError> {
        let mut body = json!({
            "systemInstruction": {"parts": [{"text": system}]},
            "contents": &*contents,
            "generationConfig": {"temperature": self.temperature},
        });
        if let Some(max_tokens) = self.max_tokens {
            body["generationConfig"]["maxOutputTokens"] = json!(max_tokens);
        }
        if !declarations.is_empty() {
            body["tools"] = json!([{"functionDeclarations": declarations}]);
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                provider: "gemini",
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

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse {
                    provider: "gemini",
                    message: e.to_string(),
                })?;

        // Replay the model turn so the stateless REST API sees the full
        // conversation on the next request.
        let model_turn = parsed
            .candidates
            .first()
            .and_then(|c| c.content.clone())
            .unwrap_or(Content {
                role: "model".to_string(),
                parts: Vec::new(),
            });
        contents.push(model_turn);

        Ok(ProviderResponse::Gemini(parsed))
    }
}

impl std::fmt::Debug for GeminiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiAdapter")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn start_chat(&self, system_instruction: &str, tools: &[ToolSpec]) -> Session {
        Session::Gemini {
            system: system_instruction.to_string(),
            contents: Vec::new(),
            declarations: tools.iter().map(declaration).collect(),
        }
    }

    async fn send_user_message(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let Session::Gemini {
            system,
            contents,
            declarations,
        } = session
        else {
            return Err(ProviderError::SessionMismatch { provider: "gemini" });
        };
        contents.push(Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: Some(text.to_string()),
                ..Part::default()
            }],
        });
        self.round_trip(system, contents, declarations).await
    }

    async fn send_tool_result(
        &self,
        session: &mut Session,
        tool_name: &str,
        result_text: &str,
        _call_id: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        let Session::Gemini {
            system,
            contents,
            declarations,
        } = session
        else {
            return Err(ProviderError::SessionMismatch { provider: "gemini" });
        };
        contents.push(Content {
            role: "user".to_string(),
            parts: vec![Part {
                function_response: Some(FunctionResponse {
                    name: tool_name.to_string(),
                    response: json!({"result": result_text}),
                }),
                ..Part::default()
            }],
        });
        self.round_trip(system, contents, declarations).await
    }

    fn extract_text(&self, response: &ProviderResponse) -> String {
        let ProviderResponse::Gemini(response) = response else {
            return String::new();
        };
        response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }

    fn extract_tool_calls(&self, response: &ProviderResponse) -> Vec<ToolCall> {
        let ProviderResponse::Gemini(response) = response else {
            return Vec::new();
        };
        response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.function_call.as_ref())
                    .map(|call| ToolCall {
                        name: call.name.clone(),
                        args: coerce_args(call.args.clone()),
                        id: None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::tool::catalog;

    fn adapter() -> GeminiAdapter {
        let config = LibrarianConfig::builder()
            .provider("gemini")
            .gemini_api_key("g-key")
            .model("gemini-2.0-flash")
            .build()
            .unwrap_or_else(|_| unreachable!());
        GeminiAdapter::new(&config).unwrap_or_else(|e| panic!("adapter: {e}"))
    }

    #[test]
    fn test_construction_requires_api_key() {
        let config = LibrarianConfig::builder()
            .provider("gemini")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(GeminiAdapter::new(&config).is_err());
    }

    #[test]
    fn test_declaration_reduces_types() {
        let spec = ToolSpec {
            name: "list_recent_traces".to_string(),
            description: "List traces.".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "limit": {"type": "integer", "description": "max results"},
                    "keyword": {"type": "string", "description": "needle"},
                    "verbose": {"type": "boolean", "description": "coerces to STRING"}
                },
                "required": ["keyword"]
            }),
        };
        let decl = declaration(&spec);
        assert_eq!(decl["parameters"]["properties"]["limit"]["type"], "INTEGER");
        assert_eq!(
            decl["parameters"]["properties"]["keyword"]["type"],
            "STRING"
        );
        assert_eq!(
            decl["parameters"]["properties"]["verbose"]["type"],
            "STRING"
        );
        assert_eq!(decl["parameters"]["required"][0], "keyword");
    }

    #[test]
    fn test_start_chat_prebuilds_declarations() {
        let session = adapter().start_chat("Librarian.", &catalog());
        let Session::Gemini { declarations, .. } = session else {
            panic!("expected Gemini session");
        };
        assert_eq!(declarations.len(), 5);
        assert_eq!(declarations[0]["name"], "list_recent_traces");
    }

    #[test]
    fn test_extract_tool_calls_have_no_id() {
        let body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"functionCall": {"name": "get_trace_details",
                                          "args": {"trace_id": "abc"}}}
                    ]
                }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(body)
            .unwrap_or_else(|e| panic!("deserialize failed: {e}"));
        let calls = adapter().extract_tool_calls(&ProviderResponse::Gemini(parsed));
        assert_eq!(calls.len(), 1);
        assert!(calls[0].id.is_none());
        assert_eq!(calls[0].args["trace_id"], "abc");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"text": "Two traces "}, {"text": "found."}]
                }
            }]
        });
        let parsed: GenerateContentResponse = serde_json::from_value(body)
            .unwrap_or_else(|e| panic!("deserialize failed: {e}"));
        assert_eq!(
            adapter().extract_text(&ProviderResponse::Gemini(parsed)),
            "Two traces found."
        );
    }

    #[test]
    fn test_extract_text_empty_on_blocked_candidate() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({"candidates": []}))
            .unwrap_or_else(|e| panic!("deserialize failed: {e}"));
        assert_eq!(adapter().extract_text(&ProviderResponse::Gemini(parsed)), "");
    }
}
