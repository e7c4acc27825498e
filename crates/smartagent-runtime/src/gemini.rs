//! Gemini LLM Provider
//!
//! Implementation of `LlmProvider` over the Gemini `generateContent` REST API.
//! Requests are built from the provider-neutral [`Content`] list; the response
//! body is handed back untouched for the core normalizer to read.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Value, json};

use smartagent_core::{
    error::{AgentError, Result},
    provider::{Content, ContentRole, GenerationOptions, LlmProvider, Part, ProviderResponse},
    tool::ToolSchema,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`
    pub api_key: String,

    /// Model identifier
    pub model: String,

    /// API host, without trailing slash
    pub base_url: String,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// Read `GOOGLE_API_KEY`, `GEMINI_MODEL` and `GEMINI_BASE_URL`
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Build from `(name, value)` pairs. Names match case-insensitively and
    /// empty values count as unset.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(name, value)| (name.to_ascii_uppercase(), value.trim().to_string()))
            .collect();

        let api_key = vars
            .get("GOOGLE_API_KEY")
            .cloned()
            .ok_or_else(|| AgentError::Config("GOOGLE_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);
        if let Some(model) = vars.get("GEMINI_MODEL") {
            config.model.clone_from(model);
        }
        if let Some(base_url) = vars.get("GEMINI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }
}

/// Gemini LLM provider
pub struct GeminiProvider {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.config.base_url
        )
    }

    /// Convert provider-neutral contents to Gemini format
    fn convert_contents(contents: &[Content]) -> Vec<WireContent> {
        contents
            .iter()
            .map(|c| WireContent {
                role: match c.role {
                    ContentRole::User | ContentRole::Tool => "user",
                    ContentRole::Model => "model",
                },
                parts: c.parts.iter().map(Self::convert_part).collect(),
            })
            .collect()
    }

    fn convert_part(part: &Part) -> Value {
        match part {
            Part::Text(text) => json!({ "text": text }),
            Part::FunctionCall(call) => json!({
                "functionCall": { "name": call.name, "args": call.arguments }
            }),
            Part::FunctionResponse(result) => json!({
                "functionResponse": { "name": result.name, "response": result.payload() }
            }),
        }
    }

    fn convert_tools(tools: &[ToolSchema]) -> Vec<WireTool> {
        if tools.is_empty() {
            return Vec::new();
        }

        let declarations = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters_json(),
                })
            })
            .collect();

        vec![WireTool {
            function_declarations: declarations,
        }]
    }

    fn build_request(
        contents: &[Content],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> GenerateRequest {
        GenerateRequest {
            contents: Self::convert_contents(contents),
            system_instruction: options.system_prompt.as_deref().map(|text| WireSystem {
                parts: vec![json!({ "text": text })],
            }),
            tools: Self::convert_tools(tools),
            generation_config: WireGenerationConfig {
                temperature: options.temperature,
            },
        }
    }

    /// Map a non-2xx reply to an error, preferring the body's `error.message`
    fn status_error(status: StatusCode, body: &str) -> AgentError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(message),
            StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(message),
            _ => AgentError::Provider(format!("{status} {message}")),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireSystem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    generation_config: WireGenerationConfig,
}

#[derive(Serialize)]
struct WireContent {
    role: &'static str,
    parts: Vec<Value>,
}

#[derive(Serialize)]
struct WireSystem {
    parts: Vec<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<Value>,
}

#[derive(Serialize)]
struct WireGenerationConfig {
    temperature: f32,
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(
        &self,
        contents: &[Content],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<ProviderResponse> {
        let request = Self::build_request(contents, tools, options);

        tracing::debug!(
            model = %options.model,
            contents = contents.len(),
            tools = tools.len(),
            "Gemini generateContent"
        );

        let response = self
            .http
            .post(self.endpoint(&options.model))
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(%status, "Gemini returned an error");
            return Err(Self::status_error(status, &body));
        }

        let value: Value = serde_json::from_str(&body)?;
        Ok(ProviderResponse(value))
    }
}
