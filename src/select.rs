//! Provider selection.
//!
//! Maps a `(mode, provider)` pair to a concrete adapter. Selection is
//! evaluated per librarian instance; a failure here makes that instance
//! report itself unavailable rather than raising on every query.

use tracing::warn;

use crate::config::{LibrarianConfig, Mode};
use crate::error::ConfigError;
use crate::provider::ProviderAdapter;
use crate::providers::{
    AnthropicAdapter, GeminiAdapter, HuggingFaceAdapter, OllamaAdapter, OpenAiAdapter,
};

/// Default endpoint for self-hosted OpenAI-compatible stacks (vLLM, TGI,
/// LM Studio).
const DEFAULT_OPENAI_COMPAT_URL: &str = "http://localhost:8000";

/// Selects and constructs the adapter for the configured `(mode, provider)`
/// pair.
///
/// | mode          | provider                                    | adapter        |
/// |---------------|---------------------------------------------|----------------|
/// | `api`         | `gemini`                                    | Gemini         |
/// | `api`         | `openai`, `openai_compatible`               | OpenAI         |
/// | `api`         | `azure_openai`                              | Azure OpenAI   |
/// | `api`         | `anthropic`                                 | Anthropic      |
/// | `open_source` | `huggingface`, `hf`, `gemini` (downgraded)  | Hugging Face   |
/// | `open_source` | `openai_compatible`, `vllm`, `tgi`, `lmstudio` | OpenAI      |
/// | `open_source` | `ollama`                                    | Ollama         |
///
/// # Errors
///
/// Returns [`ConfigError::UnsupportedProvider`] for pairs outside the
/// table, plus any adapter-specific construction error (missing API key,
/// missing Azure endpoint settings).
pub fn select_provider(
    config: &LibrarianConfig,
) -> Result<Box<dyn ProviderAdapter>, ConfigError> {
    let provider = config.provider.to_ascii_lowercase();
    match config.mode {
        Mode::Api => match provider.as_str() {
            "gemini" => Ok(Box::new(GeminiAdapter::new(config)?)),
            "openai" | "openai_compatible" => {
                Ok(Box::new(OpenAiAdapter::new(config, config.base_url.as_deref())))
            }
            "azure_openai" => Ok(Box::new(OpenAiAdapter::azure(config)?)),
            "anthropic" => Ok(Box::new(AnthropicAdapter::new(config)?)),
            _ => Err(unsupported(config, &provider)),
        },
        Mode::OpenSource => match provider.as_str() {
            "huggingface" | "hf" | "gemini" => {
                if provider == "gemini" {
                    warn!("open_source mode uses Hugging Face by default");
                }
                Ok(Box::new(HuggingFaceAdapter::new(config)?))
            }
            "openai_compatible" | "vllm" | "tgi" | "lmstudio" => {
                let base_url = config
                    .base_url
                    .as_deref()
                    .unwrap_or(DEFAULT_OPENAI_COMPAT_URL);
                Ok(Box::new(OpenAiAdapter::new(config, Some(base_url))))
            }
            "ollama" => Ok(Box::new(OllamaAdapter::new(config)?)),
            _ => Err(unsupported(config, &provider)),
        },
    }
}

/// Whether the configuration selects a constructible provider.
///
/// Evaluated against the given configuration, never cached globally.
#[must_use]
pub fn is_available(config: &LibrarianConfig) -> bool {
    select_provider(config).is_ok()
}

fn unsupported(config: &LibrarianConfig, provider: &str) -> ConfigError {
    ConfigError::UnsupportedProvider {
        mode: config.mode.to_string(),
        provider: provider.to_string(),
    }
}
