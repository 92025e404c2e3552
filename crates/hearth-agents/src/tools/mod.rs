use async_trait::async_trait;
use hearth_common::Result;
use std::time::Duration;

pub mod registry;

pub use registry::ToolRegistry;

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-invocation context handed to tools.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub session_id: String,
}

impl ToolContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

/// Result of a tool invocation. Errors are ordinary content with the
/// flag set; the model reads them like any other result.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A capability the model can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, as advertised to the model.
    fn name(&self) -> &str;

    /// What this tool does, for the model's benefit.
    fn description(&self) -> &str;

    /// JSON schema describing the arguments object.
    fn input_schema(&self) -> serde_json::Value;

    /// Upper bound for one invocation. Slow integrations override this.
    fn timeout(&self) -> Duration {
        DEFAULT_TOOL_TIMEOUT
    }

    /// Run the tool with the model-supplied arguments.
    async fn execute(&self, context: &ToolContext, args: serde_json::Value) -> Result<ToolOutput>;
}
