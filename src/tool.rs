//! Tool catalog for trace store queries.
//!
//! Provides provider-agnostic types for tool specifications and calls,
//! plus the fixed five-entry catalog the librarian registers with every
//! provider. Descriptions are consumed by the model for routing.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A tool specification sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name (must match the dispatch table in the executor).
    pub name: String,
    /// Natural-language description; the model uses it for routing.
    pub description: String,
    /// JSON-Schema-like object naming required/optional typed fields.
    pub parameters: Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the tool to invoke.
    pub name: String,
    /// Argument mapping. Malformed provider payloads are tolerated by
    /// substituting an empty object.
    pub args: Value,
    /// Opaque call identifier for providers that correlate call→result.
    /// Absent for providers without correlation (Gemini).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Returns the fixed five-entry tool catalog.
///
/// The catalog is identical across providers; each adapter translates it
/// into its native declaration format at `start_chat`.
#[must_use]
pub fn catalog() -> Vec<ToolSpec> {
    vec![
        spec_list_recent_traces(),
        spec_get_trace_details(),
        spec_search_traces_by_prompt(),
        spec_get_tool_usage_stats(),
        spec_get_database_statistics(),
    ]
}

fn spec_list_recent_traces() -> ToolSpec {
    ToolSpec {
        name: "list_recent_traces".to_string(),
        description: "Retrieves a list of the most recent agent execution traces from the \
                      trace store. Use this when users ask for recent traces, latest traces, \
                      or want to see what traces exist."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of traces to retrieve (default: 5, max: 20)"
                }
            }
        }),
    }
}

fn spec_get_trace_details() -> ToolSpec {
    ToolSpec {
        name: "get_trace_details".to_string(),
        description: "Retrieves detailed information about a specific trace, including all \
                      spans and their attributes. Use this when users ask for details about a \
                      specific trace ID or want to understand what happened in a particular \
                      trace."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "trace_id": {
                    "type": "string",
                    "description": "The unique identifier of the trace (32-character hexadecimal string)"
                }
            },
            "required": ["trace_id"]
        }),
    }
}

fn spec_search_traces_by_prompt() -> ToolSpec {
    ToolSpec {
        name: "search_traces_by_prompt".to_string(),
        description: "Searches for traces that contain a specific keyword in their system \
                      prompt. Use this when users want to find traces related to a specific \
                      topic or keyword."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "keyword": {
                    "type": "string",
                    "description": "The keyword to search for in system prompts"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of results to return (default: 10)"
                }
            },
            "required": ["keyword"]
        }),
    }
}

fn spec_get_tool_usage_stats() -> ToolSpec {
    ToolSpec {
        name: "get_tool_usage_stats".to_string(),
        description: "Retrieves statistics about which tools are being used most frequently \
                      across all traces. Use this when users ask about tool usage, most used \
                      tools, or tool statistics."
            .to_string(),
        parameters: json!({"type": "object", "properties": {}}),
    }
}

fn spec_get_database_statistics() -> ToolSpec {
    ToolSpec {
        name: "get_database_statistics".to_string(),
        description: "Retrieves overall database statistics including total traces, spans, \
                      feedback counts, and other metrics. Use this when users ask 'how many \
                      traces', 'how many spans', or general database statistics."
            .to_string(),
        parameters: json!({"type": "object", "properties": {}}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_five_tools() {
        let specs = catalog();
        assert_eq!(specs.len(), 5);
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&"list_recent_traces"));
        assert!(names.contains(&"get_trace_details"));
        assert!(names.contains(&"search_traces_by_prompt"));
        assert!(names.contains(&"get_tool_usage_stats"));
        assert!(names.contains(&"get_database_statistics"));
    }

    #[test]
    fn test_catalog_names_unique() {
        let specs = catalog();
        let mut names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_all_specs_have_object_schemas() {
        for spec in catalog() {
            assert!(!spec.name.is_empty());
            assert!(!spec.description.is_empty());
            assert!(spec.parameters.is_object());
            assert_eq!(spec.parameters["type"], "object");
        }
    }

    #[test]
    fn test_required_fields() {
        let specs = catalog();
        let details = specs
            .iter()
            .find(|s| s.name == "get_trace_details")
            .map(|s| &s.parameters);
        assert_eq!(
            details.and_then(|p| p["required"][0].as_str()),
            Some("trace_id")
        );
    }

    #[test]
    fn test_tool_call_serialization_omits_absent_id() {
        let call = ToolCall {
            name: "get_trace_details".to_string(),
            args: json!({"trace_id": "abc"}),
            id: None,
        };
        let encoded = serde_json::to_string(&call).unwrap_or_default();
        assert!(!encoded.contains("\"id\""));
    }
}
