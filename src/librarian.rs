//! Natural-language query agent over stored execution traces.
//!
//! [`Librarian::query`] drives a bounded tool-calling loop against the
//! configured provider adapter and never returns an error: provider or
//! store failures surface as an apologetic answer instead. Providers
//! without tool support are served by a deterministic keyword fallback
//! that routes the query to a catalog tool directly.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use crate::config::LibrarianConfig;
use crate::executor::ToolExecutor;
use crate::provider::ProviderAdapter;
use crate::select::select_provider;
use crate::store::TraceStore;
use crate::tool::{ToolSpec, catalog};

/// Upper bound on tool-calling rounds per query.
const MAX_TOOL_ROUNDS: usize = 5;

/// Answer returned when no provider could be constructed.
const UNAVAILABLE_ANSWER: &str =
    "Librarian is not available. Check provider configuration and API keys.";

/// System instruction framing the model as a trace librarian.
const SYSTEM_INSTRUCTION: &str = "\
You are the TraceStore Librarian, an expert AI assistant specialized in helping users explore and understand agent execution traces.

Your role:
- Help users find and analyze traces stored in the trace database
- Use the provided functions to query the database
- Provide clear, well-formatted summaries of trace data
- Explain what happened during agent execution based on span data
- Answer statistical questions about the database

Guidelines:
- Always use functions to fetch data; never make up trace information
- When showing trace details, highlight important attributes like thoughts, tool calls, and outputs
- If a user asks for \"recent traces\" or \"latest traces\", use list_recent_traces
- If a user asks \"how many traces\" or statistics, use get_database_statistics
- If a user asks about tool usage or \"what tools are used\", use get_tool_usage_stats
- If a user provides a specific trace ID, use get_trace_details
- Format your responses clearly with proper structure
- Be concise but informative

Remember: You are a helpful librarian. Be informative, accurate, and user-friendly!";

/// Matches a lowercase 32-hex trace identifier.
static TRACE_ID: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new("[a-f0-9]{32}").expect("literal pattern is valid")
});

/// The result of one librarian query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryAnswer {
    /// Natural-language answer text.
    pub answer: String,
    /// Trace IDs cited in the answer, when any were found.
    pub sources: Option<BTreeSet<String>>,
}

/// Query agent bound to one trace store and one provider adapter.
pub struct Librarian {
    store: Arc<dyn TraceStore>,
    provider: Option<Box<dyn ProviderAdapter>>,
    tools: Vec<ToolSpec>,
    debug: bool,
}

impl Librarian {
    /// Creates a librarian over `store` with the provider selected from
    /// `config`.
    ///
    /// Never fails: if no provider can be constructed the librarian comes
    /// up unavailable and every query answers with a configuration hint.
    #[must_use]
    pub fn new(store: Arc<dyn TraceStore>, config: &LibrarianConfig) -> Self {
        let provider = match select_provider(config) {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!(error = %e, "librarian unavailable");
                None
            }
        };
        Self {
            store,
            provider,
            tools: catalog(),
            debug: config.debug,
        }
    }

    /// Creates a librarian with an explicitly constructed adapter.
    #[must_use]
    pub fn with_provider(
        store: Arc<dyn TraceStore>,
        provider: Box<dyn ProviderAdapter>,
        debug: bool,
    ) -> Self {
        Self {
            store,
            provider: Some(provider),
            tools: catalog(),
            debug,
        }
    }

    /// Whether a provider was successfully constructed for this instance.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Answers a natural-language question about the stored traces.
    ///
    /// Total: every failure mode is converted into an answer. An
    /// unavailable provider yields a configuration hint; any error during
    /// the conversation yields an apology carrying the error text.
    pub async fn query(&self, user_query: &str) -> QueryAnswer {
        let Some(provider) = self.provider.as_deref() else {
            return QueryAnswer {
                answer: UNAVAILABLE_ANSWER.to_string(),
                sources: None,
            };
        };

        match self.run(provider, user_query).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "librarian query failed");
                QueryAnswer {
                    answer: format!(
                        "Sorry, I encountered an error processing your query: {e}\n\n\
                         Please try rephrasing your question."
                    ),
                    sources: None,
                }
            }
        }
    }

    async fn run(
        &self,
        provider: &dyn ProviderAdapter,
        user_query: &str,
    ) -> Result<QueryAnswer, crate::error::ProviderError> {
        let executor = ToolExecutor::new(self.store.as_ref());
        let mut session = provider.start_chat(SYSTEM_INSTRUCTION, &self.tools);
        let mut response = provider.send_user_message(&mut session, user_query).await?;

        if self.debug {
            debug!(
                provider = provider.name(),
                text = %provider.extract_text(&response),
                "initial response"
            );
        }

        let mut invoked_any = false;
        for round in 0..MAX_TOOL_ROUNDS {
            let tool_calls = provider.extract_tool_calls(&response);
            if tool_calls.is_empty() {
                break;
            }
            invoked_any = true;
            debug!(round, calls = tool_calls.len(), "tool round");

            for call in tool_calls {
                let result = executor.dispatch(&call.name, &call.args);
                response = provider
                    .send_tool_result(&mut session, &call.name, &result, call.id.as_deref())
                    .await?;
            }
        }

        // Keyword fallback, only when the model never invoked a tool at
        // all. Models that did call tools have real data in context and
        // their final text stands on its own.
        if !invoked_any {
            if let Some((name, args)) = fallback_tool_for_query(user_query) {
                if self.debug {
                    debug!(tool = name, "fallback tool used");
                }
                let answer = executor.dispatch(name, &args);
                let sources = extract_sources(&answer);
                return Ok(QueryAnswer { answer, sources });
            }
        }

        let answer = provider.extract_text(&response);
        let sources = extract_sources(&answer);
        Ok(QueryAnswer { answer, sources })
    }
}

impl std::fmt::Debug for Librarian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Librarian")
            .field("available", &self.is_available())
            .finish_non_exhaustive()
    }
}

/// Collects the distinct 32-hex trace IDs cited in `answer`.
fn extract_sources(answer: &str) -> Option<BTreeSet<String>> {
    let ids: BTreeSet<String> = TRACE_ID
        .find_iter(answer)
        .map(|m| m.as_str().to_string())
        .collect();
    if ids.is_empty() { None } else { Some(ids) }
}

/// Routes a query to a catalog tool by keyword when the model produced no
/// tool calls.
///
/// Checked in order: an embedded trace ID wins, then recency phrasing,
/// then database statistics, then tool-usage phrasing.
fn fallback_tool_for_query(user_query: &str) -> Option<(&'static str, Value)> {
    let query = user_query.to_lowercase();

    if let Some(found) = TRACE_ID.find(&query) {
        return Some(("get_trace_details", json!({"trace_id": found.as_str()})));
    }

    if query.contains("recent") || query.contains("latest") {
        return Some(("list_recent_traces", json!({"limit": 5})));
    }

    if query.contains("how many") || query.contains("stats") || query.contains("statistics") {
        return Some(("get_database_statistics", json!({})));
    }

    if query.contains("tool usage")
        || query.contains("most used tools")
        || query.contains("tool stats")
        || (query.contains("tools") && query.contains("used"))
    {
        return Some(("get_tool_usage_stats", json!({})));
    }

    None
}
