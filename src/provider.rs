//! Pluggable LLM provider adapter trait.
//!
//! Implementations translate one conversation/tool-calling contract into
//! provider-specific protocols. This keeps the orchestrator decoupled from
//! any particular LLM vendor: it drives every provider through the same
//! five operations and treats [`Session`] and [`ProviderResponse`] as
//! fully opaque.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ProviderError;
use crate::message::ChatMessage;
use crate::providers::{anthropic, gemini};
use crate::tool::{ToolCall, ToolSpec};

/// Adapter-owned conversation state.
///
/// A tagged union with one variant per session shape; each adapter creates
/// and mutates only its own variant. Exactly one session exists per query
/// and it is never shared across concurrent queries.
#[derive(Debug, Clone)]
pub enum Session {
    /// Message list plus registered tool catalog (OpenAI-compatible family).
    Messages {
        /// Ordered role-tagged conversation.
        messages: Vec<ChatMessage>,
        /// Tool catalog registered at `start_chat`.
        tools: Vec<ToolSpec>,
    },
    /// System string plus native content-block turns (Anthropic).
    Anthropic {
        /// System instruction, sent out-of-band per the Messages API.
        system: String,
        /// Ordered wire-format turns.
        turns: Vec<anthropic::Turn>,
        /// Tool catalog registered at `start_chat`.
        tools: Vec<ToolSpec>,
    },
    /// System instruction plus native content history (Gemini).
    Gemini {
        /// System instruction, sent out-of-band per request.
        system: String,
        /// Ordered wire-format contents.
        contents: Vec<gemini::Content>,
        /// Pre-reduced function declarations built at `start_chat`.
        declarations: Vec<Value>,
    },
    /// Plain message list, no tool declarations (Ollama).
    Ollama {
        /// Ordered role-tagged conversation.
        messages: Vec<ChatMessage>,
    },
    /// System string plus role/text history for manual prompt templating
    /// (Hugging Face).
    HuggingFace {
        /// System instruction prepended to every templated prompt.
        system: String,
        /// Ordered role-tagged history.
        history: Vec<ChatMessage>,
    },
}

/// Opaque provider-native response payload.
///
/// Only accessed through [`ProviderAdapter::extract_text`] and
/// [`ProviderAdapter::extract_tool_calls`].
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    /// Chat completion from the OpenAI-compatible family.
    OpenAi(async_openai::types::CreateChatCompletionResponse),
    /// Messages API response from Anthropic.
    Anthropic(anthropic::MessagesResponse),
    /// `generateContent` response from Gemini.
    Gemini(gemini::GenerateContentResponse),
    /// Raw `/api/chat` body from Ollama.
    Ollama(Value),
    /// Raw inference API body from Hugging Face.
    HuggingFace(Value),
}

/// Capability set implemented by every provider variant.
///
/// Unsupported operations fail explicitly with [`ProviderError`] rather
/// than silently degrading; in practice the orchestration loop never
/// reaches `send_tool_result` for adapters whose `extract_tool_calls`
/// always returns empty.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name (e.g. `"openai"`, `"anthropic"`).
    fn name(&self) -> &'static str;

    /// Whether this adapter can register tools and route results back.
    fn supports_tools(&self) -> bool {
        false
    }

    /// Initializes conversation state and registers the tool catalog in the
    /// provider's native declaration format. Providers without tool support
    /// ignore `tools`.
    fn start_chat(&self, system_instruction: &str, tools: &[ToolSpec]) -> Session;

    /// Appends the user turn, invokes the provider, appends the assistant
    /// turn to session state, and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport failures, HTTP status ≥ 400,
    /// or a session that belongs to a different adapter.
    async fn send_user_message(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Appends a tool-result turn correlated by `call_id` where the
    /// provider requires correlation, re-invokes the provider, and returns
    /// the new response.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ToolsUnsupported`] for adapters without
    /// tool support, and the same failures as `send_user_message` otherwise.
    async fn send_tool_result(
        &self,
        session: &mut Session,
        tool_name: &str,
        result_text: &str,
        call_id: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Unwraps the assistant's natural-language content; empty string if
    /// none (including responses from a different adapter).
    fn extract_text(&self, response: &ProviderResponse) -> String;

    /// Parses provider-native tool invocations, in provider order.
    ///
    /// Malformed argument payloads are tolerated by substituting an empty
    /// argument mapping. Default: no tool calls.
    fn extract_tool_calls(&self, response: &ProviderResponse) -> Vec<ToolCall> {
        let _ = response;
        Vec::new()
    }
}

/// Coerces a parsed argument payload into an object mapping.
///
/// Anything that is not a JSON object — including parse failures upstream —
/// becomes an empty mapping rather than failing the loop.
#[must_use]
pub(crate) fn coerce_args(value: Option<Value>) -> Value {
    match value {
        Some(v) if v.is_object() => v,
        _ => Value::Object(serde_json::Map::new()),
    }
}
