//! Generic OpenAI-compatible LLM client
//!
//! Non-streaming `/v1/chat/completions` with function-style tool calls.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use viewforge_core::{LlmRequest, LlmResponse, Message, Role, ToolCall, ToolCallingLlm, ToolSpec, ViewforgeError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(240);

/// Request body for chat completions endpoint
#[derive(Serialize, Debug, Clone)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

#[derive(Serialize, Debug, Clone)]
struct WireMessage {
    role: Role,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Serialize, Debug, Clone)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionSpec,
}

#[derive(Serialize, Debug, Clone)]
struct WireFunctionSpec {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct WireFunctionCall {
    name: String,
    /// JSON-encoded arguments, as the API sends them.
    arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Deserialize, Debug, Clone)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug, Clone)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug, Clone)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

/// OpenAI-style error response
#[derive(Deserialize, Debug, Clone)]
struct OpenAiError {
    error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
struct ErrorDetail {
    message: String,
    code: Option<String>,
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        Self {
            role: message.role,
            content: message.content,
            tool_call_id: message.tool_call_id,
            tool_calls: message
                .tool_calls
                .into_iter()
                .map(|call| WireToolCall {
                    id: call.id,
                    kind: function_kind(),
                    function: WireFunctionCall {
                        name: call.name,
                        arguments: call.args.to_string(),
                    },
                })
                .collect(),
        }
    }
}

impl From<ToolSpec> for WireTool {
    fn from(spec: ToolSpec) -> Self {
        Self {
            kind: "function",
            function: WireFunctionSpec {
                name: spec.name,
                description: spec.description,
                parameters: spec.parameters,
            },
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(call: WireToolCall) -> Self {
        // Unparseable arguments are passed through as a string so the tool
        // can report them back to the model.
        let args = serde_json::from_str(&call.function.arguments)
            .unwrap_or(Value::String(call.function.arguments));
        Self {
            id: call.id,
            name: call.function.name,
            args,
        }
    }
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    default_model: String,
    temperature: Option<f32>,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("base_url", &self.base_url.as_str())
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct OpenAiCompatibleBuilder {
    base_url: Option<Url>,
    api_key: Option<SecretString>,
    default_model: String,
    temperature: Option<f32>,
    timeout: Duration,
}

impl Default for OpenAiCompatibleBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            default_model: DEFAULT_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn parse_base_url(base_url: &str) -> Result<Url, ViewforgeError> {
    Url::parse(base_url).map_err(|error| {
        ViewforgeError::InvalidConfig(format!("invalid base url '{base_url}': {error}"))
    })
}

impl OpenAiCompatibleBuilder {
    pub fn base_url(mut self, base_url: impl AsRef<str>) -> Result<Self, ViewforgeError> {
        self.base_url = Some(parse_base_url(base_url.as_ref())?);
        Ok(self)
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// `None` leaves the provider's default in place.
    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, ViewforgeError> {
        if self.default_model.trim().is_empty() {
            return Err(ViewforgeError::InvalidConfig(
                "default model must not be empty".to_string(),
            ));
        }
        let base_url = match self.base_url {
            Some(base_url) => base_url,
            None => parse_base_url(DEFAULT_BASE_URL)?,
        };
        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|error| ViewforgeError::LlmProvider(error.to_string()))?;
        Ok(OpenAiCompatibleClient {
            http,
            base_url,
            api_key: self.api_key,
            default_model: self.default_model,
            temperature: self.temperature,
            timeout: self.timeout,
        })
    }
}

impl OpenAiCompatibleClient {
    pub fn builder() -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder::default()
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn set_default_model(&mut self, model: impl Into<String>) {
        self.default_model = model.into();
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    fn map_transport_error(&self, error: reqwest::Error) -> ViewforgeError {
        if error.is_timeout() {
            ViewforgeError::Timeout(self.timeout)
        } else {
            ViewforgeError::LlmProvider(error.to_string())
        }
    }
}

fn classify_error_body(status: reqwest::StatusCode, body: &str) -> ViewforgeError {
    let Ok(parsed) = serde_json::from_str::<OpenAiError>(body) else {
        return ViewforgeError::LlmProvider(format!("{status}: {body}"));
    };
    let detail = parsed.error;
    let context_exhausted = detail.code.as_deref() == Some("context_length_exceeded")
        || detail.message.contains("maximum context length");
    if context_exhausted {
        ViewforgeError::ContextLengthExceeded(detail.message)
    } else {
        ViewforgeError::LlmProvider(format!("{status}: {}", detail.message))
    }
}

#[async_trait::async_trait]
impl ToolCallingLlm for OpenAiCompatibleClient {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, ViewforgeError> {
        let LlmRequest {
            model,
            messages,
            tools,
        } = input;
        let model = if model.trim().is_empty() {
            self.default_model.clone()
        } else {
            model
        };
        let request = ChatCompletionRequest {
            model,
            messages: messages.into_iter().map(WireMessage::from).collect(),
            tools: tools.into_iter().map(WireTool::from).collect(),
            temperature: self.temperature,
            stream: false,
        };

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion request"
        );

        let mut builder = self.http.post(self.completions_url()).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }
        let response = builder
            .send()
            .await
            .map_err(|error| self.map_transport_error(error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|error| self.map_transport_error(error))?;
            return Err(classify_error_body(status, &body));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| ViewforgeError::LlmProvider(error.to_string()))?;
        let Some(choice) = completion.choices.into_iter().next() else {
            return Err(ViewforgeError::LlmProvider(
                "chat completion returned no choices".to_string(),
            ));
        };

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(ToolCall::from)
                .collect(),
        })
    }
}
