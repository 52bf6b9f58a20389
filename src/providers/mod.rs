//! Provider adapter implementations.
//!
//! One module per wire protocol; the OpenAI-compatible adapter also covers
//! Azure OpenAI and OpenAI-compatible local stacks (vLLM and friends) via
//! base-URL override.

pub mod anthropic;
pub mod gemini;
pub mod huggingface;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicAdapter;
pub use gemini::GeminiAdapter;
pub use huggingface::HuggingFaceAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;
