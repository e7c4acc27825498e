//! Orchestration Loop
//!
//! Drives one chat turn: ask the model, run whatever tools it requests, feed
//! the results back and repeat until it answers in plain text or the hop
//! budget runs out.
//!
//! ```text
//!            ┌──────────────────────────────────────────┐
//!            ▼                                          │
//!     AwaitingModel ──calls──▶ HaveCalls ──results──────┘
//!       │      │
//!       │      └──text──▶ HaveFinalText
//!       └──error──▶ UpstreamFailed        (hop budget spent: BudgetExhausted)
//! ```
//!
//! Only the user message and the final reply are written to the persisted
//! history. The model-call and tool-result entries built along the way exist
//! in the working contents of this turn only.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

use crate::content::build_contents;
use crate::error::{AgentError, Result};
use crate::message::{Conversation, Turn};
use crate::normalize::{extract_calls, extract_final_text};
use crate::provider::{Content, GenerationOptions, LlmProvider, ProviderResponse};
use crate::tool::{ToolCall, ToolRegistry, ToolResult, ToolSchema};

/// Reply when the model answers with neither text nor calls
pub const EMPTY_REPLY_FALLBACK: &str = "Sorry, I couldn't produce a response.";

/// Reply when the hop budget runs out
pub const BUDGET_EXHAUSTED_REPLY: &str =
    "Sorry, I couldn't complete that with the available tools.";

pub const DEFAULT_SYSTEM_PROMPT: &str = r"You are SmartAgent, a concise and helpful assistant.

Use the calc tool for any arithmetic instead of computing in your head.
Use the time_in_timezone tool for current times; it takes IANA zone names such as
'Europe/London'. Indian cities (Mumbai, Delhi, Chennai, Bengaluru, ...) are in Asia/Kolkata.
Use web_search when the answer depends on recent or external facts.
If a tool result starts with 'error:', say briefly what went wrong and how to fix it.
When a timezone is ambiguous, suggest a valid IANA zone.";

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum provider calls per chat turn
    pub max_hops: usize,

    /// Generation options, including the system prompt
    pub generation: GenerationOptions,

    /// Deadline for one provider call
    pub provider_timeout: Duration,

    /// Deadline for one tool invocation
    pub tool_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_hops: 5,
            generation: GenerationOptions {
                system_prompt: Some(DEFAULT_SYSTEM_PROMPT.into()),
                ..GenerationOptions::default()
            },
            provider_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(30),
        }
    }
}

/// Why a chat turn ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model answered without requesting tools
    FinalText,
    /// The provider call failed; not retried
    UpstreamFailed,
    /// `max_hops` provider calls all requested tools
    BudgetExhausted,
}

/// Result of one chat turn
#[derive(Clone, Debug)]
pub struct TurnOutcome {
    pub reply: String,

    /// Persisted history: the input history plus the user turn and the reply
    pub history: Conversation,

    pub stop: StopReason,

    /// Provider calls made
    pub hops: usize,
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Run one chat turn on top of `history`.
    ///
    /// Never fails: upstream errors and an exhausted hop budget end in an
    /// apologetic reply that is persisted like any other.
    pub async fn run_turn(&self, history: &Conversation, message: &str) -> TurnOutcome {
        let mut history = history.clone();
        history.push(Turn::user(message));

        let mut contents = build_contents(&history);
        let tools = self.tools.schemas();

        for hop in 1..=self.config.max_hops {
            tracing::debug!(hop, entries = contents.len(), "Requesting model response");

            let response = match self.generate(&contents, &tools).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(hop, error = %e, "Provider call failed");
                    let reply = format!("Upstream error from {}: {}", self.provider.name(), e);
                    return Self::finish(history, reply, StopReason::UpstreamFailed, hop);
                }
            };

            let calls = extract_calls(&response);
            if calls.is_empty() {
                let text = extract_final_text(&response);
                let reply = match text.trim() {
                    "" => EMPTY_REPLY_FALLBACK.to_string(),
                    trimmed => trimmed.to_string(),
                };
                return Self::finish(history, reply, StopReason::FinalText, hop);
            }

            tracing::debug!(
                hop,
                tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "Model requested tools"
            );

            contents.push(Content::model_calls(&calls));
            let results = self.invoke_all(&calls).await;
            contents.push(Content::tool_results(results));
        }

        Self::finish(
            history,
            BUDGET_EXHAUSTED_REPLY.to_string(),
            StopReason::BudgetExhausted,
            self.config.max_hops,
        )
    }

    fn finish(
        mut history: Conversation,
        reply: String,
        stop: StopReason,
        hops: usize,
    ) -> TurnOutcome {
        tracing::info!(?stop, hops, "Chat turn finished");
        history.push(Turn::assistant(reply.clone()));
        TurnOutcome {
            reply,
            history,
            stop,
            hops,
        }
    }

    async fn generate(
        &self,
        contents: &[Content],
        tools: &[ToolSchema],
    ) -> Result<ProviderResponse> {
        let call = self
            .provider
            .generate(contents, tools, &self.config.generation);

        tokio::time::timeout(self.config.provider_timeout, call)
            .await
            .map_err(|_| AgentError::Timeout(self.config.provider_timeout))?
    }

    /// Run every call of one hop concurrently; results keep request order.
    async fn invoke_all(&self, calls: &[ToolCall]) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.invoke(call))).await
    }

    async fn invoke(&self, call: &ToolCall) -> ToolResult {
        let limit = self.config.tool_timeout;
        match tokio::time::timeout(limit, self.tools.invoke(call)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(tool = %call.name, "Tool timed out");
                ToolResult::failure(
                    &call.name,
                    format!("tool {} timed out after {limit:?}", call.name),
                )
            }
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: crate::tool::Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.generation.system_prompt = Some(prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub const fn max_hops(mut self, max: usize) -> Self {
        self.config.max_hops = max;
        self
    }

    pub const fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.config.provider_timeout = timeout;
        self
    }

    pub const fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        if self.config.max_hops == 0 {
            return Err(AgentError::Config("max_hops must be at least 1".into()));
        }

        Ok(Agent::new(provider, Arc::new(self.tools), self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use crate::provider::{ContentRole, Part};
    use crate::tool::{Arguments, ParameterSchema, Tool, ToolOutput, str_arg};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records every request it receives
    #[derive(Default)]
    struct ScriptedProvider {
        script: Mutex<VecDeque<Result<ProviderResponse>>>,
        repeat: Option<Value>,
        requests: Mutex<Vec<Vec<Content>>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<Value>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().map(|r| r.map(Into::into)).collect()),
                ..Self::default()
            }
        }

        fn repeating(response: Value) -> Self {
            Self {
                repeat: Some(response),
                ..Self::default()
            }
        }

        fn requests(&self) -> Vec<Vec<Content>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "Gemini"
        }

        async fn generate(
            &self,
            contents: &[Content],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> Result<ProviderResponse> {
            self.requests.lock().unwrap().push(contents.to_vec());
            if let Some(response) = &self.repeat {
                return Ok(response.clone().into());
            }
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(text_response("script exhausted").into()))
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "echo".into(),
                description: "Echo text".into(),
                parameters: vec![ParameterSchema::required("text", "string", "Text")],
            }
        }

        async fn execute(&self, args: &Arguments) -> Result<ToolOutput> {
            Ok(format!("echo: {}", str_arg(args, "text")?).into())
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "slow".into(),
                description: "Never finishes in time".into(),
                parameters: vec![],
            }
        }

        async fn execute(&self, _args: &Arguments) -> Result<ToolOutput> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".into())
        }
    }

    fn text_response(text: &str) -> Value {
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]})
    }

    fn call_response(calls: &[(&str, Value)]) -> Value {
        let parts: Vec<Value> = calls
            .iter()
            .map(|(name, args)| json!({"functionCall": {"name": name, "args": args}}))
            .collect();
        json!({"candidates": [{"content": {"role": "model", "parts": parts}}]})
    }

    fn agent(provider: Arc<ScriptedProvider>) -> Agent {
        AgentBuilder::new()
            .provider(provider)
            .tool(EchoTool)
            .tool(SlowTool)
            .tool_timeout(Duration::from_millis(50))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_direct_answer_makes_one_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(text_response("  Hello!  "))]));
        let outcome = agent(provider.clone()).run_turn(&Conversation::new(), "hi").await;

        assert_eq!(outcome.reply, "Hello!");
        assert_eq!(outcome.stop, StopReason::FinalText);
        assert_eq!(outcome.hops, 1);
        assert_eq!(provider.requests().len(), 1);

        let turns = outcome.history.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!((turns[0].role, turns[0].content.as_str()), (Role::User, "hi"));
        assert_eq!((turns[1].role, turns[1].content.as_str()), (Role::Assistant, "Hello!"));
    }

    #[tokio::test]
    async fn test_prior_history_is_sent_first() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(text_response("6"))]));
        let history: Conversation = [Turn::user("2+2?"), Turn::assistant("4")]
            .into_iter()
            .collect();

        let outcome = agent(provider.clone()).run_turn(&history, "3+3?").await;

        let sent = &provider.requests()[0];
        let roles: Vec<_> = sent.iter().map(|c| c.role).collect();
        assert_eq!(
            roles,
            vec![ContentRole::User, ContentRole::Model, ContentRole::User]
        );
        assert_eq!(sent[2].parts, vec![Part::Text("3+3?".into())]);
        assert_eq!(outcome.history.len(), 4);
    }

    #[tokio::test]
    async fn test_two_tool_hops_keep_only_user_and_reply() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(call_response(&[
                ("echo", json!({"text": "a"})),
                ("missing_tool", json!({})),
                ("echo", json!({"text": "b"})),
            ])),
            Ok(call_response(&[("echo", json!({"text": "c"}))])),
            Ok(text_response("done")),
        ]));

        let outcome = agent(provider.clone()).run_turn(&Conversation::new(), "go").await;

        assert_eq!(outcome.reply, "done");
        assert_eq!(outcome.hops, 3);
        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.history.turns()[0].content, "go");
        assert_eq!(outcome.history.turns()[1].content, "done");

        let last = provider.requests().pop().unwrap();
        // user, model-call, tool-result, model-call, tool-result
        assert_eq!(last.len(), 5);
        for pair in last[1..].chunks(2) {
            let calls: Vec<_> = pair[0].function_calls().collect();
            let results: Vec<_> = pair[1].function_responses().collect();
            assert_eq!(pair[0].role, ContentRole::Model);
            assert_eq!(pair[1].role, ContentRole::Tool);
            assert_eq!(calls.len(), results.len());
            for (call, result) in calls.iter().zip(&results) {
                assert_eq!(call.name, result.name);
            }
        }

        let first_results: Vec<_> = last[2].function_responses().collect();
        assert_eq!(first_results[0].payload(), json!({"text": "echo: a"}));
        assert_eq!(
            first_results[1].payload(),
            json!({"text": "error: unknown tool missing_tool"})
        );
        assert_eq!(first_results[2].payload(), json!({"text": "echo: b"}));
    }

    #[tokio::test]
    async fn test_model_call_turn_mirrors_request() {
        let args = json!({"text": "x"});
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(json!({"candidates": [{"content": {"parts": [
                {"function_call": {"name": "echo", "arguments": args.to_string()}},
            ]}}]})),
            Ok(text_response("ok")),
        ]));

        agent(provider.clone()).run_turn(&Conversation::new(), "go").await;

        let second = &provider.requests()[1];
        let mirrored: Vec<_> = second[1].function_calls().cloned().collect();
        assert_eq!(
            mirrored,
            vec![ToolCall::new("echo", args.as_object().cloned().unwrap())]
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_is_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(AgentError::Provider(
            "429 quota exceeded".into(),
        ))]));
        let history: Conversation = [Turn::user("earlier"), Turn::assistant("reply")]
            .into_iter()
            .collect();

        let outcome = agent(provider.clone()).run_turn(&history, "hi").await;

        assert_eq!(outcome.reply, "Upstream error from Gemini: 429 quota exceeded");
        assert_eq!(outcome.stop, StopReason::UpstreamFailed);
        assert_eq!(provider.requests().len(), 1);
        assert_eq!(outcome.history.len(), 4);
        let last = outcome.history.last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, outcome.reply);
    }

    #[tokio::test]
    async fn test_budget_exhausted_after_five_hops() {
        let provider = Arc::new(ScriptedProvider::repeating(call_response(&[(
            "echo",
            json!({"text": "again"}),
        )])));

        let outcome = agent(provider.clone()).run_turn(&Conversation::new(), "loop").await;

        assert_eq!(outcome.reply, BUDGET_EXHAUSTED_REPLY);
        assert_eq!(outcome.stop, StopReason::BudgetExhausted);
        assert_eq!(provider.requests().len(), 5);
        assert_eq!(outcome.history.len(), 2);
        assert_eq!(outcome.history.last().unwrap().content, BUDGET_EXHAUSTED_REPLY);
    }

    #[tokio::test]
    async fn test_empty_text_uses_fallback() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(json!({
            "candidates": [{"content": {"parts": [{"text": "   "}]}}]
        }))]));

        let outcome = agent(provider).run_turn(&Conversation::new(), "hi").await;

        assert_eq!(outcome.reply, EMPTY_REPLY_FALLBACK);
        assert_eq!(outcome.stop, StopReason::FinalText);
    }

    #[tokio::test]
    async fn test_malformed_response_falls_through_to_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(json!({"unexpected": [1, 2]}))]));

        let outcome = agent(provider.clone()).run_turn(&Conversation::new(), "hi").await;

        assert_eq!(outcome.reply, EMPTY_REPLY_FALLBACK);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_slow_tool_times_out() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(call_response(&[("slow", json!({})), ("echo", json!({"text": "fast"}))])),
            Ok(text_response("ok")),
        ]));

        agent(provider.clone()).run_turn(&Conversation::new(), "go").await;

        let second = &provider.requests()[1];
        let results: Vec<_> = second[2].function_responses().collect();
        assert_eq!(
            results[0].text(),
            Some("error: tool slow timed out after 50ms")
        );
        assert_eq!(results[1].text(), Some("echo: fast"));
    }

    #[tokio::test]
    async fn test_builder_requires_provider() {
        assert!(AgentBuilder::new().build().is_err());

        let provider = Arc::new(ScriptedProvider::default());
        assert!(AgentBuilder::new().provider(provider).max_hops(0).build().is_err());
    }
}
