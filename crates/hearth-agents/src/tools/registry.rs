use futures::future::join_all;
use hearth_common::{Error, Message, Result, ToolCall};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{Tool, ToolContext};
use crate::providers::ToolDefinition;

/// The tool catalogue. Registration order is the order tools are
/// advertised to the model.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. A second tool under the same name is a
    /// configuration bug, fatal at startup.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        if self.tools.iter().any(|t| t.name() == tool.name()) {
            return Err(Error::DuplicateTool(tool.name().to_string()));
        }
        info!("registered tool: {}", tool.name());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.input_schema(),
            })
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run a batch of requested calls concurrently and join the results
    /// in request order. Every call gets its own timeout; a failure or
    /// timeout becomes that call's result text and never disturbs the
    /// rest of the batch.
    pub async fn dispatch(&self, context: &ToolContext, calls: &[ToolCall]) -> Vec<Message> {
        join_all(calls.iter().map(|call| self.dispatch_one(context, call))).await
    }

    async fn dispatch_one(&self, context: &ToolContext, call: &ToolCall) -> Message {
        let Some(tool) = self.get(&call.name) else {
            warn!(tool = %call.name, "model requested unknown tool");
            return Message::tool(&call.id, Error::UnknownTool(call.name.clone()).to_string());
        };

        let started = Instant::now();
        let content = match tokio::time::timeout(
            tool.timeout(),
            tool.execute(context, call.arguments.clone()),
        )
        .await
        {
            Ok(Ok(output)) => {
                if output.is_error {
                    warn!(tool = %call.name, "tool reported an error");
                }
                output.content
            }
            Ok(Err(e)) => {
                warn!(tool = %call.name, error = %e, "tool failed");
                e.to_string()
            }
            Err(_) => {
                warn!(tool = %call.name, timeout_secs = tool.timeout().as_secs(), "tool timed out");
                format!(
                    "tool {} timed out after {} seconds",
                    call.name,
                    tool.timeout().as_secs()
                )
            }
        };
        debug!(
            tool = %call.name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool finished"
        );
        Message::tool(&call.id, content)
    }
}
