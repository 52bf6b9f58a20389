//! OpenAI-compatible adapter using the `async-openai` crate.
//!
//! One implementation covers the official API, the Azure variant, and any
//! endpoint that follows the OpenAI chat completion spec (vLLM, TGI,
//! LM Studio, self-hosted gateways) via the base URL override.

use async_openai::Client;
use async_openai::config::{AzureConfig, OpenAIConfig};
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessage,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestToolMessage, ChatCompletionRequestUserMessage, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequest, CreateChatCompletionResponse,
    FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use serde_json::Value;

use crate::config::LibrarianConfig;
use crate::error::{ConfigError, ProviderError};
use crate::message::{ChatMessage, Role, assistant_message, system_message, tool_message, user_message};
use crate::provider::{ProviderAdapter, ProviderResponse, Session, coerce_args};
use crate::tool::{ToolCall, ToolSpec};

/// Client handle for the two wire-compatible configurations.
enum ApiClient {
    Standard(Client<OpenAIConfig>),
    Azure(Client<AzureConfig>),
}

impl ApiClient {
    async fn create(
        &self,
        request: CreateChatCompletionRequest,
    ) -> Result<CreateChatCompletionResponse, OpenAIError> {
        match self {
            Self::Standard(client) => client.chat().create(request).await,
            Self::Azure(client) => client.chat().create(request).await,
        }
    }
}

/// OpenAI-compatible LLM adapter with full JSON-schema tool passthrough.
pub struct OpenAiAdapter {
    client: ApiClient,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    label: &'static str,
}

impl OpenAiAdapter {
    /// Creates an adapter against the official API or any compatible
    /// endpoint. `base_url` overrides the SDK default when set.
    #[must_use]
    pub fn new(config: &LibrarianConfig, base_url: Option<&str>) -> Self {
        let mut openai_config =
            OpenAIConfig::new().with_api_key(config.api_key.clone().unwrap_or_default());
        if let Some(url) = base_url {
            openai_config = openai_config.with_api_base(url);
        }

        Self {
            client: ApiClient::Standard(Client::with_config(openai_config)),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            label: "openai",
        }
    }

    /// Creates the Azure variant.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] unless both the endpoint
    /// (`LLM_BASE_URL`) and `LLM_API_VERSION` are configured.
    pub fn azure(config: &LibrarianConfig) -> Result<Self, ConfigError> {
        let endpoint = config
            .base_url
            .as_deref()
            .ok_or(ConfigError::MissingSetting {
                provider: "azure_openai",
                setting: "LLM_BASE_URL",
            })?;
        let api_version = config
            .api_version
            .as_deref()
            .ok_or(ConfigError::MissingSetting {
                provider: "azure_openai",
                setting: "LLM_API_VERSION",
            })?;

        let azure_config = AzureConfig::new()
            .with_api_base(endpoint)
            .with_api_version(api_version)
            .with_deployment_id(config.model.clone())
            .with_api_key(config.api_key.clone().unwrap_or_default());

        Ok(Self {
            client: ApiClient::Azure(Client::with_config(azure_config)),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            label: "azure_openai",
        })
    }

    /// Converts our message type to the OpenAI SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: async_openai::types::ChatCompletionRequestSystemMessageContent::Text(
                        msg.content.clone(),
                    ),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: async_openai::types::ChatCompletionRequestUserMessageContent::Text(
                    msg.content.clone(),
                ),
                name: None,
            }),
            Role::Assistant => {
                let tool_calls = if msg.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        msg.tool_calls
                            .iter()
                            .map(|tc| ChatCompletionMessageToolCall {
                                id: tc.id.clone().unwrap_or_default(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: tc.name.clone(),
                                    arguments: serde_json::to_string(&tc.args)
                                        .unwrap_or_else(|_| "{}".to_string()),
                                },
                            })
                            .collect(),
                    )
                };

                let content = if msg.content.is_empty() {
                    None
                } else {
                    Some(
                        async_openai::types::ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        ),
                    )
                };

                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content,
                    name: None,
                    tool_calls,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
            Role::Tool => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                content: async_openai::types::ChatCompletionRequestToolMessageContent::Text(
                    msg.content.clone(),
                ),
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
            }),
        }
    }

    /// Builds a chat completion request from the session state.
    fn build_request(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> CreateChatCompletionRequest {
        let messages: Vec<_> = messages.iter().map(Self::convert_message).collect();

        let tools = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|spec| ChatCompletionTool {
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionObject {
                            name: spec.name.clone(),
                            description: Some(spec.description.clone()),
                            parameters: Some(spec.parameters.clone()),
                            strict: None,
                        },
                    })
                    .collect(),
            )
        };

        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(self.temperature),
            max_completion_tokens: self.max_tokens,
            tools,
            ..Default::default()
        }
    }

    /// Parses tool calls out of a wire response, tolerating malformed
    /// argument payloads.
    fn parse_tool_calls(response: &CreateChatCompletionResponse) -> Vec<ToolCall> {
        response
            .choices
            .first()
            .and_then(|c| c.message.tool_calls.as_ref())
            .map(|calls| {
                calls
                    .iter()
                    .map(|tc| ToolCall {
                        name: tc.function.name.clone(),
                        args: coerce_args(
                            serde_json::from_str::<Value>(&tc.function.arguments).ok(),
                        ),
                        id: Some(tc.id.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn round_trip(
        &self,
        messages: &mut Vec<ChatMessage>,
        tools: &[ToolSpec],
    ) -> Result<ProviderResponse, ProviderError> {
        let request = self.build_request(messages, tools);
        let response = self
            .client
            .create(request)
            .await
            .map_err(|e| ProviderError::Api {
                provider: self.label,
                message: e.to_string(),
            })?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        messages.push(assistant_message(&text, Self::parse_tool_calls(&response)));

        Ok(ProviderResponse::OpenAi(response))
    }
}

impl std::fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("label", &self.label)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        self.label
    }

    fn supports_tools(&self) -> bool {
        true
    }

    fn start_chat(&self, system_instruction: &str, tools: &[ToolSpec]) -> Session {
        Session::Messages {
            messages: vec![system_message(system_instruction)],
            tools: tools.to_vec(),
        }
    }

    async fn send_user_message(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<ProviderResponse, ProviderError> {
        let Session::Messages { messages, tools } = session else {
            return Err(ProviderError::SessionMismatch {
                provider: self.label,
            });
        };
        messages.push(user_message(text));
        self.round_trip(messages, tools).await
    }

    async fn send_tool_result(
        &self,
        session: &mut Session,
        _tool_name: &str,
        result_text: &str,
        call_id: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        let Session::Messages { messages, tools } = session else {
            return Err(ProviderError::SessionMismatch {
                provider: self.label,
            });
        };
        messages.push(tool_message(call_id, result_text));
        self.round_trip(messages, tools).await
    }

    fn extract_text(&self, response: &ProviderResponse) -> String {
        let ProviderResponse::OpenAi(response) = response else {
            return String::new();
        };
        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default()
    }

    fn extract_tool_calls(&self, response: &ProviderResponse) -> Vec<ToolCall> {
        let ProviderResponse::OpenAi(response) = response else {
            return Vec::new();
        };
        Self::parse_tool_calls(response)
    }
}
