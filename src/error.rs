//! Error types for the librarian crate.
//!
//! Errors are split by layer: [`ConfigError`] covers provider selection and
//! adapter construction, [`ProviderError`] covers live round-trips to an LLM
//! provider, and [`StoreError`] covers trace store access. Tool functions
//! never surface [`StoreError`] to callers — they render failures as
//! `"Error …"` strings consumed by the model.

use thiserror::Error;

/// Errors raised at provider selection or adapter construction time.
///
/// These are permanent for a given configuration and are never retried:
/// the librarian reports itself unavailable instead of raising on every
/// query.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The (mode, provider) pair is outside the selector decision table.
    #[error("unsupported provider configuration: {mode} / {provider}")]
    UnsupportedProvider {
        /// Configured librarian mode (`api` or `open_source`).
        mode: String,
        /// Configured provider identifier.
        provider: String,
    },

    /// A provider-specific mandatory credential or setting is missing.
    #[error("{setting} is required for {provider}")]
    MissingSetting {
        /// Provider that demands the setting.
        provider: &'static str,
        /// Name of the missing credential or setting.
        setting: &'static str,
    },

    /// The adapter's backing HTTP client or SDK could not be constructed.
    #[error("{provider} client unavailable: {message}")]
    ClientUnavailable {
        /// Provider whose client failed to build.
        provider: &'static str,
        /// Construction failure detail.
        message: String,
    },

    /// A configuration value failed to parse.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Configuration option name.
        name: &'static str,
        /// The offending value.
        value: String,
    },
}

/// Errors raised during a provider round-trip.
///
/// The orchestrator's top-level handler converts these into a user-visible
/// apology answer; they are not retried automatically.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider returned an HTTP error status.
    #[error("provider error {status}: {message}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        message: String,
    },

    /// The HTTP request itself failed (connect, timeout, TLS).
    #[error("request to {provider} failed: {message}")]
    Request {
        /// Provider name.
        provider: &'static str,
        /// Underlying transport error.
        message: String,
    },

    /// The provider SDK reported a failure.
    #[error("{provider} API error: {message}")]
    Api {
        /// Provider name.
        provider: &'static str,
        /// SDK error message.
        message: String,
    },

    /// The response body did not match the provider's wire format.
    #[error("{provider} returned an unexpected response: {message}")]
    InvalidResponse {
        /// Provider name.
        provider: &'static str,
        /// Parse failure detail.
        message: String,
    },

    /// Tool-result delivery was attempted on an adapter without tool support.
    ///
    /// Unreachable in normal operation: adapters without tool support never
    /// emit tool calls, so the loop never routes results back to them.
    #[error("{provider} provider does not support tool calling")]
    ToolsUnsupported {
        /// Provider name.
        provider: &'static str,
    },

    /// A session created by one adapter was handed to another.
    #[error("session does not belong to the {provider} provider")]
    SessionMismatch {
        /// Provider that rejected the session.
        provider: &'static str,
    },
}

/// Errors raised by a [`crate::store::TraceStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend failed to execute a read.
    #[error("trace store error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_provider_names_pair() {
        let err = ConfigError::UnsupportedProvider {
            mode: "api".to_string(),
            provider: "mystery".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("api"));
        assert!(msg.contains("mystery"));
    }

    #[test]
    fn test_transport_error_display() {
        let err = ProviderError::Transport {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "provider error 429: rate limited");
    }

    #[test]
    fn test_tools_unsupported_display() {
        let err = ProviderError::ToolsUnsupported { provider: "ollama" };
        assert!(err.to_string().contains("ollama"));
        assert!(err.to_string().contains("does not support tool calling"));
    }
}
