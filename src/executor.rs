//! Tool executor that dispatches tool calls to trace store queries.
//!
//! Maps the five catalog tool names to direct read-only queries against a
//! [`TraceStore`]. Every tool is individually fault-contained: store
//! failures are rendered as `"Error …"` strings for the model to consume,
//! never propagated. Unknown tool names resolve to a literal
//! `"Unknown tool: <name>"` string rather than failing the loop.

use std::collections::HashMap;
use std::fmt::Write;

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::store::TraceStore;
use crate::trace::{SPAN_TYPE_LLM_INFERENCE, SPAN_TYPE_TOOL_EXECUTION, Span, Trace, attr};

/// Default number of traces returned by `list_recent_traces`.
const DEFAULT_LIST_LIMIT: i64 = 5;
/// Upper clamp for `list_recent_traces`.
const MAX_LIST_LIMIT: i64 = 20;
/// Default search window for `search_traces_by_prompt`.
const DEFAULT_SEARCH_LIMIT: i64 = 10;
/// Characters of system prompt shown per trace in listings.
const PROMPT_PREVIEW_CHARS: usize = 80;
/// Rows in the tool usage leaderboard.
const TOP_TOOLS: usize = 10;

/// Executes catalog tool calls against a trace store.
///
/// Each invocation opens and closes its own scoped store access; nothing
/// is held across the tool-calling loop boundary.
pub struct ToolExecutor<'a> {
    store: &'a dyn TraceStore,
}

impl<'a> ToolExecutor<'a> {
    /// Creates a new executor backed by the given store.
    #[must_use]
    pub const fn new(store: &'a dyn TraceStore) -> Self {
        Self { store }
    }

    /// Dispatches a tool call by name.
    ///
    /// Always returns a string: tool output on success, an `"Error …"`
    /// message on internal failure, or `"Unknown tool: <name>"` for names
    /// outside the catalog.
    #[must_use]
    pub fn dispatch(&self, name: &str, args: &Value) -> String {
        debug!(tool = name, "dispatching tool call");
        match name {
            "list_recent_traces" => self.list_recent_traces(args),
            "get_trace_details" => self.get_trace_details(args),
            "search_traces_by_prompt" => self.search_traces_by_prompt(args),
            "get_tool_usage_stats" => self.get_tool_usage_stats(),
            "get_database_statistics" => self.get_database_statistics(),
            other => format!("Unknown tool: {other}"),
        }
    }

    /// Lists the N most recent traces with a one-block summary each.
    #[must_use]
    pub fn list_recent_traces(&self, args: &Value) -> String {
        let limit = args
            .get("limit")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);

        match self.store.list_traces(limit as usize, true) {
            Ok(traces) if traces.is_empty() => "No traces found in the database.".to_string(),
            Ok(traces) => {
                let mut out = format!("Found {} recent traces:\n\n", traces.len());
                for (i, trace) in traces.iter().enumerate() {
                    let _ = writeln!(out, "{}. Trace ID: {}", i + 1, trace.id);
                    let _ = writeln!(out, "   Created: {}", trace.created_at.to_rfc3339());
                    let _ = writeln!(out, "   Spans: {}", trace.spans.len());
                    let _ = writeln!(
                        out,
                        "   System Prompt: {}...",
                        prompt_preview(trace, PROMPT_PREVIEW_CHARS)
                    );
                    if let Some(ref feedback) = trace.feedback {
                        let _ = writeln!(out, "   Feedback: Rating {}/5", feedback.rating);
                    }
                    out.push('\n');
                }
                out
            }
            Err(e) => tool_error("Error retrieving traces", &e),
        }
    }

    /// Dumps a full formatted breakdown of one trace.
    #[must_use]
    pub fn get_trace_details(&self, args: &Value) -> String {
        let trace_id = args
            .get("trace_id")
            .and_then(Value::as_str)
            .unwrap_or_default();

        match self.store.get_trace(trace_id) {
            Ok(None) => format!("Trace with ID '{trace_id}' not found."),
            Ok(Some(trace)) => format_trace_details(&trace),
            Err(e) => tool_error("Error retrieving trace details", &e),
        }
    }

    /// Case-insensitive substring search over system prompts.
    #[must_use]
    pub fn search_traces_by_prompt(&self, args: &Value) -> String {
        let keyword = args
            .get("keyword")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let limit = args
            .get("limit")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .max(1);

        match self.store.list_traces(limit as usize, true) {
            Ok(traces) => {
                let needle = keyword.to_lowercase();
                let matching: Vec<&Trace> = traces
                    .iter()
                    .filter(|t| {
                        t.system_prompt()
                            .unwrap_or_default()
                            .to_lowercase()
                            .contains(&needle)
                    })
                    .collect();

                if matching.is_empty() {
                    return format!(
                        "No traces found with keyword '{keyword}' in system prompt."
                    );
                }

                let mut out =
                    format!("Found {} trace(s) matching '{keyword}':\n\n", matching.len());
                for (i, trace) in matching.iter().enumerate() {
                    let _ = writeln!(out, "{}. Trace ID: {}", i + 1, trace.id);
                    let _ = writeln!(
                        out,
                        "   System Prompt: {}",
                        trace.system_prompt().unwrap_or("N/A")
                    );
                    let _ = writeln!(out, "   Spans: {}\n", trace.spans.len());
                }
                out
            }
            Err(e) => tool_error("Error searching traces", &e),
        }
    }

    /// Aggregates execution-span counts by tool name across the store.
    #[must_use]
    pub fn get_tool_usage_stats(&self) -> String {
        match self.store.tool_execution_spans() {
            Ok(spans) if spans.is_empty() => {
                "No tool execution data found in the database.".to_string()
            }
            Ok(spans) => format_tool_usage(&spans),
            Err(e) => tool_error("Error retrieving tool usage stats", &e),
        }
    }

    /// Reports store-wide counts and averages.
    #[must_use]
    pub fn get_database_statistics(&self) -> String {
        match self.database_statistics() {
            Ok(report) => report,
            Err(e) => tool_error("Error retrieving database statistics", &e),
        }
    }

    fn database_statistics(&self) -> Result<String, StoreError> {
        let total_traces = self.store.count_traces()?;
        let total_spans = self.store.count_spans()?;
        let with_feedback = self.store.count_traces_with_feedback()?;
        let last_24h = self
            .store
            .count_traces_since(Utc::now() - Duration::hours(24))?;

        #[allow(clippy::cast_precision_loss)]
        let avg_spans = if total_traces > 0 {
            total_spans as f64 / total_traces as f64
        } else {
            0.0
        };

        let mut out = String::from("Database Statistics:\n\n");
        let _ = writeln!(out, "Total Traces: {total_traces}");
        let _ = writeln!(out, "Total Spans: {total_spans}");
        let _ = writeln!(out, "Average Spans per Trace: {avg_spans:.1}");
        let _ = writeln!(out, "Traces with Feedback: {with_feedback}");
        let _ = writeln!(out, "Traces created in last 24h: {last_24h}");
        Ok(out)
    }
}

/// Renders a store failure as a tool-visible error string.
fn tool_error(prefix: &str, err: &StoreError) -> String {
    format!("{prefix}: {err}")
}

/// First `max_chars` characters of the trace's system prompt, or `"N/A"`.
fn prompt_preview(trace: &Trace, max_chars: usize) -> String {
    trace.system_prompt().map_or_else(
        || "N/A".to_string(),
        |p| p.chars().take(max_chars).collect(),
    )
}

fn format_trace_details(trace: &Trace) -> String {
    let mut out = format!("Trace Details: {}\n", trace.id);
    out.push_str(&"=".repeat(70));
    out.push_str("\n\n");

    let _ = writeln!(
        out,
        "System Prompt: {}",
        trace.system_prompt().unwrap_or("N/A")
    );
    let _ = writeln!(out, "Created: {}", trace.created_at.to_rfc3339());

    if let Some(ref feedback) = trace.feedback {
        let _ = write!(out, "Feedback: Rating {}/5", feedback.rating);
        if let Some(ref comment) = feedback.comment {
            let _ = write!(out, " - {comment}");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "\nTotal Spans: {}", trace.spans.len());
    out.push('\n');
    out.push_str(&"-".repeat(70));
    out.push_str("\n\n");

    for (i, span) in trace.spans.iter().enumerate() {
        format_span(&mut out, i + 1, span);
        out.push('\n');
    }

    out
}

fn format_span(out: &mut String, index: usize, span: &Span) {
    let _ = writeln!(out, "Span {index}: {}", span.name);
    let _ = writeln!(out, "  ID: {}", span.span_id);
    let _ = writeln!(
        out,
        "  Parent: {}",
        span.parent_id.as_deref().unwrap_or("None (root)")
    );
    let _ = writeln!(
        out,
        "  Time: {} -> {}",
        span.start_time
            .map_or_else(|| "N/A".to_string(), |t| t.to_rfc3339()),
        span.end_time
            .map_or_else(|| "N/A".to_string(), |t| t.to_rfc3339())
    );

    let span_type = span.span_type();
    let _ = writeln!(out, "  Type: {span_type}");

    if span_type == SPAN_TYPE_LLM_INFERENCE {
        if let Some(thought) = span.attr_str(attr::LLM_THOUGHT) {
            let _ = writeln!(out, "  Thought: {thought}");
        }
        if let Some(tool_code) = span.attr_str(attr::LLM_TOOL_CODE) {
            let _ = writeln!(out, "  Tool Call: {tool_code}");
        }
        if let Some(final_answer) = span.attr_str(attr::LLM_FINAL_ANSWER) {
            let _ = writeln!(out, "  Final Answer: {final_answer}");
        }
    } else if span_type == SPAN_TYPE_TOOL_EXECUTION {
        let _ = writeln!(
            out,
            "  Tool: {}",
            span.attr_str(attr::TOOL_NAME).unwrap_or("unknown")
        );
        let _ = writeln!(
            out,
            "  Input: {}",
            span.attr_str(attr::TOOL_INPUT).unwrap_or("N/A")
        );
        let _ = writeln!(
            out,
            "  Output: {}",
            span.attr_str(attr::TOOL_OUTPUT).unwrap_or("N/A")
        );
        if span.attr_str(attr::STATUS_CODE) == Some("ERROR") {
            let _ = writeln!(
                out,
                "  Error: {}",
                span.attr_str(attr::STATUS_DESCRIPTION)
                    .unwrap_or("Unknown error")
            );
        }
    }
}

fn format_tool_usage(spans: &[Span]) -> String {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for span in spans {
        let name = span.attr_str(attr::TOOL_NAME).unwrap_or("unknown");
        *counts.entry(name).or_insert(0) += 1;
    }

    let total: u64 = counts.values().sum();
    let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
    // Count descending, name ascending for a stable leaderboard
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut out = String::from("Tool Usage Statistics:\n\n");
    let _ = writeln!(out, "Total tool calls: {total}");
    let _ = writeln!(out, "Unique tools used: {}\n", ranked.len());
    out.push_str("Most used tools:\n");

    #[allow(clippy::cast_precision_loss)]
    for (i, (name, count)) in ranked.iter().take(TOP_TOOLS).enumerate() {
        let percentage = (*count as f64 / total as f64) * 100.0;
        let _ = writeln!(out, "{}. {name}: {count} calls ({percentage:.1}%)", i + 1);
    }

    out
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;
    use crate::store::testing::{FailingStore, tool_span, trace_with};

    const ID_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const ID_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert(trace_with(
            ID_A,
            "Weather Assistant",
            vec![
                tool_span("1111111111111111", "get_weather"),
                tool_span("2222222222222222", "get_weather"),
            ],
            30,
            Some(4),
        ));
        store.insert(trace_with(
            ID_B,
            "Code reviewer",
            vec![tool_span("3333333333333333", "run_tests")],
            2,
            None,
        ));
        store
    }

    #[test]
    fn test_list_recent_traces_empty_store() {
        let store = MemoryStore::new();
        let executor = ToolExecutor::new(&store);
        let out = executor.list_recent_traces(&json!({}));
        assert_eq!(out, "No traces found in the database.");
    }

    #[test]
    fn test_list_recent_traces_formats_entries() {
        let store = seeded();
        let executor = ToolExecutor::new(&store);
        let out = executor.list_recent_traces(&json!({}));
        assert!(out.starts_with("Found 2 recent traces:"));
        assert!(out.contains(ID_A));
        assert!(out.contains(ID_B));
        assert!(out.contains("Feedback: Rating 4/5"));
    }

    #[test]
    fn test_list_recent_traces_clamps_limit() {
        let store = seeded();
        let executor = ToolExecutor::new(&store);
        // Zero and enormous limits both clamp into [1, 20]
        let out = executor.list_recent_traces(&json!({"limit": 0}));
        assert!(out.starts_with("Found 1 recent traces:"));
        let out = executor.list_recent_traces(&json!({"limit": 9999}));
        assert!(out.starts_with("Found 2 recent traces:"));
    }

    #[test]
    fn test_get_trace_details_not_found() {
        let store = seeded();
        let executor = ToolExecutor::new(&store);
        let out =
            executor.get_trace_details(&json!({"trace_id": "nonexistent0000000000000000000"}));
        assert!(out.contains("not found"));
    }

    #[test]
    fn test_get_trace_details_formats_spans() {
        let store = seeded();
        let executor = ToolExecutor::new(&store);
        let out = executor.get_trace_details(&json!({"trace_id": ID_A}));
        assert!(out.starts_with(&format!("Trace Details: {ID_A}")));
        assert!(out.contains("System Prompt: Weather Assistant"));
        assert!(out.contains("Total Spans: 2"));
        assert!(out.contains("Tool: get_weather"));
        assert!(out.contains("Type: tool_execution"));
    }

    #[test]
    fn test_search_matches_case_insensitively() {
        let store = seeded();
        let executor = ToolExecutor::new(&store);
        let out = executor.search_traces_by_prompt(&json!({"keyword": "weather"}));
        assert!(out.contains("Found 1 trace(s) matching 'weather':"));
        assert!(out.contains(ID_A));
    }

    #[test]
    fn test_search_no_match() {
        let store = seeded();
        let executor = ToolExecutor::new(&store);
        let out = executor.search_traces_by_prompt(&json!({"keyword": "payments"}));
        assert_eq!(
            out,
            "No traces found with keyword 'payments' in system prompt."
        );
    }

    #[test]
    fn test_tool_usage_stats_leaderboard() {
        let store = seeded();
        let executor = ToolExecutor::new(&store);
        let out = executor.get_tool_usage_stats();
        assert!(out.contains("Total tool calls: 3"));
        assert!(out.contains("Unique tools used: 2"));
        assert!(out.contains("1. get_weather: 2 calls (66.7%)"));
        assert!(out.contains("2. run_tests: 1 calls (33.3%)"));
    }

    #[test]
    fn test_tool_usage_stats_empty() {
        let store = MemoryStore::new();
        let executor = ToolExecutor::new(&store);
        let out = executor.get_tool_usage_stats();
        assert_eq!(out, "No tool execution data found in the database.");
    }

    #[test]
    fn test_database_statistics() {
        let store = seeded();
        let executor = ToolExecutor::new(&store);
        let out = executor.get_database_statistics();
        assert!(out.contains("Total Traces: 2"));
        assert!(out.contains("Total Spans: 3"));
        assert!(out.contains("Average Spans per Trace: 1.5"));
        assert!(out.contains("Traces with Feedback: 1"));
        assert!(out.contains("Traces created in last 24h: 1"));
    }

    #[test]
    fn test_dispatch_unknown_tool() {
        let store = MemoryStore::new();
        let executor = ToolExecutor::new(&store);
        let out = executor.dispatch("drop_all_traces", &json!({}));
        assert_eq!(out, "Unknown tool: drop_all_traces");
    }

    #[test]
    fn test_every_tool_contains_store_failures() {
        let store = FailingStore;
        let executor = ToolExecutor::new(&store);
        let calls = [
            ("list_recent_traces", json!({})),
            ("get_trace_details", json!({"trace_id": ID_A})),
            ("search_traces_by_prompt", json!({"keyword": "x"})),
            ("get_tool_usage_stats", json!({})),
            ("get_database_statistics", json!({})),
        ];
        for (name, args) in &calls {
            let out = executor.dispatch(name, args);
            assert!(
                out.starts_with("Error"),
                "{name} should contain the failure, got: {out}"
            );
        }
    }
}
