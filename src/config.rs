//! Librarian configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::time::Duration;

use crate::error::ConfigError;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Default maximum tokens per provider response.
const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Default provider identifier.
const DEFAULT_PROVIDER: &str = "openai";
/// Default model identifier.
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Which family of providers the librarian selects from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Hosted provider APIs (OpenAI, Azure, Anthropic, Gemini).
    #[default]
    Api,
    /// Self-hosted / open-source serving stacks (Hugging Face, vLLM, Ollama).
    OpenSource,
}

impl Mode {
    /// Parses a mode string (`"api"` or `"open_source"`), case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for any other string.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "open_source" => Ok(Self::OpenSource),
            other => Err(ConfigError::InvalidValue {
                name: "LIBRARIAN_MODE",
                value: other.to_string(),
            }),
        }
    }

    /// Name used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::OpenSource => "open_source",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the librarian and its provider adapters.
#[derive(Debug, Clone)]
pub struct LibrarianConfig {
    /// Provider family to select from.
    pub mode: Mode,
    /// Provider identifier (e.g. `"openai"`, `"anthropic"`, `"ollama"`).
    pub provider: String,
    /// Model identifier passed to the provider.
    pub model: String,
    /// API key for the provider, if any.
    pub api_key: Option<String>,
    /// Gemini-specific API key, consulted when `api_key` is unset.
    pub gemini_api_key: Option<String>,
    /// Base URL override (Azure endpoint, local serving stack, proxy).
    pub base_url: Option<String>,
    /// API version (required by the Azure variant).
    pub api_version: Option<String>,
    /// Per-round-trip request timeout.
    pub timeout: Duration,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens per provider response.
    pub max_tokens: Option<u32>,
    /// Emit extra debug logging of provider text and fallback routing.
    pub debug: bool,
}

impl LibrarianConfig {
    /// Creates a new builder for `LibrarianConfig`.
    #[must_use]
    pub fn builder() -> LibrarianConfigBuilder {
        LibrarianConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `LIBRARIAN_MODE` is set to
    /// an unknown value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env().build()
    }

    /// Resolves the API key for the configured provider.
    ///
    /// For `gemini`, `GEMINI_API_KEY` is consulted when `LLM_API_KEY` is
    /// unset; every other provider uses `api_key` directly.
    #[must_use]
    pub fn resolved_api_key(&self) -> Option<&str> {
        if self.provider.eq_ignore_ascii_case("gemini") {
            self.api_key
                .as_deref()
                .or(self.gemini_api_key.as_deref())
        } else {
            self.api_key.as_deref()
        }
    }
}

/// Builder for [`LibrarianConfig`].
#[derive(Debug, Clone, Default)]
pub struct LibrarianConfigBuilder {
    mode: Option<String>,
    provider: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    gemini_api_key: Option<String>,
    base_url: Option<String>,
    api_version: Option<String>,
    timeout: Option<Duration>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    debug: Option<bool>,
}

impl LibrarianConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.mode.is_none() {
            self.mode = std::env::var("LIBRARIAN_MODE").ok();
        }
        if self.provider.is_none() {
            self.provider = std::env::var("LLM_PROVIDER").ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("LLM_MODEL").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("LLM_API_KEY").ok();
        }
        if self.gemini_api_key.is_none() {
            self.gemini_api_key = std::env::var("GEMINI_API_KEY").ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("LLM_BASE_URL").ok();
        }
        if self.api_version.is_none() {
            self.api_version = std::env::var("LLM_API_VERSION").ok();
        }
        if self.timeout.is_none() {
            self.timeout = std::env::var("LLM_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.temperature.is_none() {
            self.temperature = std::env::var("LLM_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.max_tokens.is_none() {
            self.max_tokens = std::env::var("LLM_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.debug.is_none() {
            self.debug = std::env::var("LLM_DEBUG")
                .ok()
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));
        }
        self
    }

    /// Sets the librarian mode.
    #[must_use]
    pub fn mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Sets the provider identifier.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini-specific API key.
    #[must_use]
    pub fn gemini_api_key(mut self, key: impl Into<String>) -> Self {
        self.gemini_api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the API version (Azure).
    #[must_use]
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the maximum tokens per response.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Enables or disables debug logging.
    #[must_use]
    pub const fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Builds the [`LibrarianConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the mode string is unknown.
    pub fn build(self) -> Result<LibrarianConfig, ConfigError> {
        let mode = match self.mode {
            Some(ref raw) => Mode::parse(raw)?,
            None => Mode::default(),
        };

        Ok(LibrarianConfig {
            mode,
            provider: self.provider.unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: self.api_key,
            gemini_api_key: self.gemini_api_key,
            base_url: self.base_url,
            api_version: self.api_version,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: self.max_tokens.or(Some(DEFAULT_MAX_TOKENS)),
            debug: self.debug.unwrap_or(false),
        })
    }
}
