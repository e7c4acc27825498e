//! Tool System
//!
//! Tools are registered by name at startup and invoked by the orchestration
//! loop whenever the model requests them. [`ToolRegistry::invoke`] is the
//! only entry point the loop uses and it never fails: unknown tools, bad
//! arguments, execution errors and panics all come back as a failed
//! [`ToolResult`] whose text starts with `error:`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{AgentError, Result};

/// Named arguments of a tool call
pub type Arguments = Map<String, Value>;

/// Tool call request from the model
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: Arguments,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Arguments) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Successful tool output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Text(String),
    Structured(Map<String, Value>),
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Either a tool's output or the stringified reason it failed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(ToolOutput),
    /// Full message, already prefixed with `error: `
    Failure(String),
}

/// Result from tool execution
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    pub outcome: ToolOutcome,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<ToolOutput>) -> Self {
        Self {
            name: name.into(),
            outcome: ToolOutcome::Success(output.into()),
        }
    }

    /// Failed result; `message` is rendered as `error: <message>`
    pub fn failure(name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            name: name.into(),
            outcome: ToolOutcome::Failure(format!("error: {message}")),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Failure(_))
    }

    /// Plain-text view of the result, if it has one
    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            ToolOutcome::Success(ToolOutput::Text(text)) | ToolOutcome::Failure(text) => {
                Some(text)
            }
            ToolOutcome::Success(ToolOutput::Structured(_)) => None,
        }
    }

    /// Structured payload sent back to the provider.
    ///
    /// Plain strings (including errors) are wrapped as `{"text": ...}` so every
    /// tool response has the same object shape on the wire.
    pub fn payload(&self) -> Value {
        match &self.outcome {
            ToolOutcome::Success(ToolOutput::Structured(map)) => Value::Object(map.clone()),
            ToolOutcome::Success(ToolOutput::Text(text)) | ToolOutcome::Failure(text) => {
                json!({ "text": text })
            }
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, integer, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }
}

/// Tool descriptor advertised to the model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the model)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// JSON-schema object describing the parameters:
    /// `{"type": "object", "properties": {...}, "required": [...]}`
    pub fn parameters_json(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({ "type": p.param_type, "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with named arguments
    async fn execute(&self, args: &Arguments) -> Result<ToolOutput>;

    /// Check argument names against the schema before execution
    fn validate(&self, args: &Arguments) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !args.contains_key(&param.name) {
                return Err(AgentError::ToolValidation(format!(
                    "missing required argument '{}'",
                    param.name
                )));
            }
        }

        if let Some(unexpected) = args
            .keys()
            .find(|key| !schema.parameters.iter().any(|p| &p.name == *key))
        {
            return Err(AgentError::ToolValidation(format!(
                "unexpected argument '{unexpected}'"
            )));
        }

        Ok(())
    }
}

/// Fetch a required string argument
pub fn str_arg<'a>(args: &'a Arguments, name: &str) -> Result<&'a str> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(AgentError::ToolValidation(format!(
            "argument '{name}' must be a string, got {other}"
        ))),
        None => Err(AgentError::ToolValidation(format!(
            "missing required argument '{name}'"
        ))),
    }
}

/// Registry for available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let schema = tool.schema();
        self.tools.insert(schema.name, Arc::new(tool));
    }

    /// Get a tool by exact name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute one requested call. Never fails; see module docs.
    pub async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            tracing::warn!(tool = %call.name, "Model requested unknown tool");
            return ToolResult::failure(&call.name, AgentError::ToolNotFound(call.name.clone()));
        };

        if let Err(e) = tool.validate(&call.arguments) {
            tracing::warn!(tool = %call.name, error = %e, "Rejected tool arguments");
            return Self::failure_for(&call.name, &e);
        }

        match AssertUnwindSafe(tool.execute(&call.arguments))
            .catch_unwind()
            .await
        {
            Ok(Ok(output)) => ToolResult::success(&call.name, output),
            Ok(Err(e)) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool failed");
                Self::failure_for(&call.name, &e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(tool = %call.name, %message, "Tool panicked");
                ToolResult::failure(&call.name, format!("tool panicked: {message}"))
            }
        }
    }

    fn failure_for(name: &str, error: &AgentError) -> ToolResult {
        match error {
            AgentError::ToolValidation(msg) => {
                ToolResult::failure(name, format!("bad args for {name}: {msg}"))
            }
            other => ToolResult::failure(name, other),
        }
    }

    /// All tool schemas, sorted by name
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<_> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}
