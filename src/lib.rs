//! Natural-language query agent over AI agent execution traces.
//!
//! Five structurally different LLM provider protocols are unified behind
//! one [`provider::ProviderAdapter`] contract; the [`librarian::Librarian`]
//! drives a bounded tool-calling loop over a [`store::TraceStore`] and
//! always produces an answer, whatever fails underneath.
//!
//! # Architecture
//!
//! ```text
//! User query → Librarian
//!   ├── select_provider (mode × provider decision table)
//!   ├── start_chat (system instruction + tool catalog)
//!   ├── Tool loop (≤ 5 rounds)
//!   │   └── extract_tool_calls → ToolExecutor → send_tool_result
//!   ├── Keyword fallback (providers that never called a tool)
//!   └── QueryAnswer { answer, sources }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use trace_librarian::config::LibrarianConfig;
//! use trace_librarian::librarian::Librarian;
//! use trace_librarian::store::MemoryStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = LibrarianConfig::from_env()?;
//! let librarian = Librarian::new(Arc::new(MemoryStore::new()), &config);
//! let result = librarian.query("how many traces are stored?").await;
//! println!("{}", result.answer);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod librarian;
pub mod message;
pub mod provider;
pub mod providers;
pub mod select;
pub mod store;
pub mod tool;
pub mod trace;

pub use config::{LibrarianConfig, Mode};
pub use error::{ConfigError, ProviderError, StoreError};
pub use librarian::{Librarian, QueryAnswer};
pub use provider::{ProviderAdapter, ProviderResponse, Session};
pub use select::{is_available, select_provider};
pub use store::{MemoryStore, TraceStore};
pub use tool::{ToolCall, ToolSpec, catalog};
pub use trace::{Feedback, Span, Trace};
