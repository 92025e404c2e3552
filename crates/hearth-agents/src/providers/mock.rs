use async_trait::async_trait;
use hearth_common::{Error, Message, Result, ToolCall};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::{LlmProvider, LlmRequest, LlmResponse};

/// One scripted model reply.
#[derive(Debug, Clone)]
pub enum ScriptedStep {
    /// A plain text answer, ending the tool loop.
    Text(String),
    /// An assistant message requesting these tool calls.
    ToolCalls(Vec<ToolCall>),
    /// A model failure.
    Fail(String),
}

impl ScriptedStep {
    pub fn text(content: impl Into<String>) -> Self {
        ScriptedStep::Text(content.into())
    }

    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        ScriptedStep::ToolCalls(vec![ToolCall::new(id, name, arguments)])
    }
}

/// Deterministic provider for tests and offline runs: replies come from a
/// scripted queue, and every request is recorded for inspection.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ScriptedStep>>,
    requests: Mutex<Vec<LlmRequest>>,
    latency: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<ScriptedStep>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
            latency: None,
        }
    }

    /// Sleep this long before every reply. Used by concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn push_step(&self, step: ScriptedStep) {
        lock_clean(&self.script).push_back(step);
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        lock_clean(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock_clean(&self.requests).len()
    }
}

fn lock_clean<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        lock_clean(&self.requests).push(request.clone());

        let step = lock_clean(&self.script)
            .pop_front()
            .ok_or_else(|| Error::ModelUnavailable("script exhausted".to_string()))?;

        let message = match step {
            ScriptedStep::Text(content) => Message::assistant(content),
            ScriptedStep::ToolCalls(calls) => Message::assistant_with_tools("", calls),
            ScriptedStep::Fail(reason) => return Err(Error::ModelUnavailable(reason)),
        };

        Ok(LlmResponse {
            message,
            model: request.model.clone(),
            usage: None,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
