//! Trace and span data model.
//!
//! A trace is one complete agent execution: an ordered sequence of spans
//! (LLM inference and tool execution events) plus open attributes and
//! optional user feedback. The librarian only reads these; ownership lives
//! with the external trace store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute key vocabulary used on spans.
pub mod attr {
    /// Span classification: `"llm_inference"` or `"tool_execution"`.
    pub const SPAN_TYPE: &str = "span.type";
    /// Model reasoning captured on an inference span.
    pub const LLM_THOUGHT: &str = "llm.thought";
    /// Tool-call code emitted by the model on an inference span.
    pub const LLM_TOOL_CODE: &str = "llm.tool_code";
    /// Final answer emitted on an inference span.
    pub const LLM_FINAL_ANSWER: &str = "llm.final_answer";
    /// Tool name on an execution span.
    pub const TOOL_NAME: &str = "tool.name";
    /// Tool input on an execution span.
    pub const TOOL_INPUT: &str = "tool.input";
    /// Tool output on an execution span.
    pub const TOOL_OUTPUT: &str = "tool.output";
    /// Status code on an execution span (`"OK"` or `"ERROR"`).
    pub const STATUS_CODE: &str = "status.code";
    /// Human-readable status detail when `STATUS_CODE` is `"ERROR"`.
    pub const STATUS_DESCRIPTION: &str = "status.description";
}

/// Span type value for LLM inference events.
pub const SPAN_TYPE_LLM_INFERENCE: &str = "llm_inference";
/// Span type value for tool execution events.
pub const SPAN_TYPE_TOOL_EXECUTION: &str = "tool_execution";

/// User feedback attached to a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Optional free-text comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// One unit of work within a trace.
///
/// Spans form a forest per trace via parent links; sequence order is
/// insertion order, not guaranteed to be a topological sort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    /// 16-character hex identifier, unique within its trace.
    pub span_id: String,
    /// Parent span identifier; absent for root spans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Human-readable span name.
    pub name: String,
    /// Start timestamp (ISO-8601 UTC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// End timestamp (ISO-8601 UTC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Open attribute mapping; keys drawn from [`attr`].
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Span {
    /// Returns a string attribute by key, if present and a string.
    #[must_use]
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Returns the span type, defaulting to `"unknown"`.
    #[must_use]
    pub fn span_type(&self) -> &str {
        self.attr_str(attr::SPAN_TYPE).unwrap_or("unknown")
    }

    /// Whether this span records a tool execution.
    #[must_use]
    pub fn is_tool_execution(&self) -> bool {
        self.span_type() == SPAN_TYPE_TOOL_EXECUTION
    }
}

/// One complete agent execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// 32-character lowercase hex identifier, globally unique.
    pub id: String,
    /// Open attribute mapping; includes `system_prompt` when present.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Ordered span sequence.
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Optional user feedback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Trace {
    /// Returns the system prompt attribute, if recorded.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.attributes.get("system_prompt").and_then(Value::as_str)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn span_with(key: &str, value: Value) -> Span {
        let mut attributes = Map::new();
        attributes.insert(key.to_string(), value);
        Span {
            span_id: "a1b2c3d4e5f60718".to_string(),
            parent_id: None,
            name: "step".to_string(),
            start_time: None,
            end_time: None,
            attributes,
        }
    }

    #[test]
    fn test_span_type_defaults_to_unknown() {
        let span = span_with(attr::TOOL_NAME, json!("search"));
        assert_eq!(span.span_type(), "unknown");
        assert!(!span.is_tool_execution());
    }

    #[test]
    fn test_span_type_tool_execution() {
        let span = span_with(attr::SPAN_TYPE, json!(SPAN_TYPE_TOOL_EXECUTION));
        assert!(span.is_tool_execution());
    }

    #[test]
    fn test_trace_system_prompt() {
        let mut attributes = Map::new();
        attributes.insert("system_prompt".to_string(), json!("You are helpful."));
        let trace = Trace {
            id: "0123456789abcdef0123456789abcdef".to_string(),
            attributes,
            spans: Vec::new(),
            feedback: None,
            created_at: Utc::now(),
        };
        assert_eq!(trace.system_prompt(), Some("You are helpful."));
    }

    #[test]
    fn test_trace_round_trips_through_json() {
        let trace = Trace {
            id: "0123456789abcdef0123456789abcdef".to_string(),
            attributes: Map::new(),
            spans: vec![span_with(attr::SPAN_TYPE, json!(SPAN_TYPE_LLM_INFERENCE))],
            feedback: Some(Feedback {
                rating: 4,
                comment: Some("useful".to_string()),
            }),
            created_at: Utc::now(),
        };
        let encoded = serde_json::to_string(&trace).unwrap_or_default();
        let decoded: Trace = serde_json::from_str(&encoded)
            .unwrap_or_else(|e| panic!("decode failed: {e}"));
        assert_eq!(decoded.id, trace.id);
        assert_eq!(decoded.spans.len(), 1);
        assert_eq!(decoded.feedback.map(|f| f.rating), Some(4));
    }
}
