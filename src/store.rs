//! Trace store collaborator contract.
//!
//! The persistence engine itself (embedded or client-server) lives outside
//! this crate; the librarian consumes it through the read-only [`TraceStore`]
//! trait. Each trait call is one scoped store access — no handle is held
//! across the tool-calling loop boundary.
//!
//! [`MemoryStore`] is a reference implementation used by tests and by
//! callers that embed the librarian without a database.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::trace::{Span, Trace};

/// Read-only query surface over the trace store.
pub trait TraceStore: Send + Sync {
    /// Returns up to `limit` traces, most recent first.
    ///
    /// When `include_spans` is false, implementations may return traces
    /// with empty span sequences to avoid loading span payloads.
    fn list_traces(&self, limit: usize, include_spans: bool) -> Result<Vec<Trace>, StoreError>;

    /// Returns the trace with the given id, or `None` if absent.
    fn get_trace(&self, trace_id: &str) -> Result<Option<Trace>, StoreError>;

    /// Total number of traces in the store.
    fn count_traces(&self) -> Result<u64, StoreError>;

    /// Total number of spans across all traces.
    fn count_spans(&self) -> Result<u64, StoreError>;

    /// Number of traces carrying a feedback record.
    fn count_traces_with_feedback(&self) -> Result<u64, StoreError>;

    /// Number of traces created at or after `cutoff`.
    fn count_traces_since(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;

    /// All spans classified as tool executions, across the entire store.
    fn tool_execution_spans(&self) -> Result<Vec<Span>, StoreError>;
}

/// In-memory [`TraceStore`] backed by a `RwLock<Vec<Trace>>`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    traces: RwLock<Vec<Trace>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a trace.
    pub fn insert(&self, trace: Trace) {
        if let Ok(mut guard) = self.traces.write() {
            guard.push(trace);
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Trace>>, StoreError> {
        self.traces
            .read()
            .map_err(|_| StoreError::Backend("trace store lock poisoned".to_string()))
    }
}

impl TraceStore for MemoryStore {
    fn list_traces(&self, limit: usize, include_spans: bool) -> Result<Vec<Trace>, StoreError> {
        let guard = self.read()?;
        let mut traces: Vec<Trace> = guard.clone();
        traces.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        traces.truncate(limit);
        if !include_spans {
            for trace in &mut traces {
                trace.spans.clear();
            }
        }
        Ok(traces)
    }

    fn get_trace(&self, trace_id: &str) -> Result<Option<Trace>, StoreError> {
        let guard = self.read()?;
        Ok(guard.iter().find(|t| t.id == trace_id).cloned())
    }

    fn count_traces(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.len() as u64)
    }

    fn count_spans(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.iter().map(|t| t.spans.len() as u64).sum())
    }

    fn count_traces_with_feedback(&self) -> Result<u64, StoreError> {
        Ok(self.read()?.iter().filter(|t| t.feedback.is_some()).count() as u64)
    }

    fn count_traces_since(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        Ok(self
            .read()?
            .iter()
            .filter(|t| t.created_at >= cutoff)
            .count() as u64)
    }

    fn tool_execution_spans(&self) -> Result<Vec<Span>, StoreError> {
        Ok(self
            .read()?
            .iter()
            .flat_map(|t| t.spans.iter())
            .filter(|s| s.is_tool_execution())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod testing {
    //! Shared fixtures for store-backed tests.

    use chrono::Duration;
    use serde_json::{Map, Value, json};

    use super::*;
    use crate::trace::{Feedback, SPAN_TYPE_TOOL_EXECUTION, attr};

    /// A store whose every query fails, for fault-containment tests.
    #[derive(Debug, Default)]
    pub struct FailingStore;

    impl TraceStore for FailingStore {
        fn list_traces(&self, _: usize, _: bool) -> Result<Vec<Trace>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        fn get_trace(&self, _: &str) -> Result<Option<Trace>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        fn count_traces(&self) -> Result<u64, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        fn count_spans(&self) -> Result<u64, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        fn count_traces_with_feedback(&self) -> Result<u64, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        fn count_traces_since(&self, _: DateTime<Utc>) -> Result<u64, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }

        fn tool_execution_spans(&self) -> Result<Vec<Span>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
    }

    /// Builds a tool-execution span invoking `tool_name`.
    pub fn tool_span(span_id: &str, tool_name: &str) -> Span {
        let mut attributes = Map::new();
        attributes.insert(attr::SPAN_TYPE.to_string(), json!(SPAN_TYPE_TOOL_EXECUTION));
        attributes.insert(attr::TOOL_NAME.to_string(), json!(tool_name));
        attributes.insert(attr::TOOL_INPUT.to_string(), json!("{}"));
        attributes.insert(attr::TOOL_OUTPUT.to_string(), json!("ok"));
        Span {
            span_id: span_id.to_string(),
            parent_id: None,
            name: format!("tool:{tool_name}"),
            start_time: Some(Utc::now()),
            end_time: Some(Utc::now()),
            attributes,
        }
    }

    /// Builds a trace with the given id, system prompt, spans, and age.
    pub fn trace_with(
        id: &str,
        system_prompt: &str,
        spans: Vec<Span>,
        age_hours: i64,
        rating: Option<u8>,
    ) -> Trace {
        let mut attributes = Map::new();
        attributes.insert(
            "system_prompt".to_string(),
            Value::String(system_prompt.to_string()),
        );
        Trace {
            id: id.to_string(),
            attributes,
            spans,
            feedback: rating.map(|rating| Feedback {
                rating,
                comment: None,
            }),
            created_at: Utc::now() - Duration::hours(age_hours),
        }
    }
}
