use async_trait::async_trait;
use hearth_agents::{Tool, ToolContext, ToolOutput};
use hearth_common::{Error, Result};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const PYTHON_TIMEOUT: Duration = Duration::from_secs(15);

/// Runs short Python snippets in a subprocess. The interpreter is
/// swappable so tests can run without a Python installation.
pub struct PythonReplTool {
    interpreter: String,
}

impl Default for PythonReplTool {
    fn default() -> Self {
        Self::new()
    }
}

impl PythonReplTool {
    pub fn new() -> Self {
        Self::with_interpreter("python3")
    }

    pub fn with_interpreter(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

#[async_trait]
impl Tool for PythonReplTool {
    fn name(&self) -> &str {
        "python_repl"
    }

    fn description(&self) -> &str {
        "A Python shell. Use this to execute python commands. Input should \
         be a valid python command. Always print the last line or the value \
         you want with `print(...)`."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "A valid python command."
                }
            },
            "required": ["command"]
        })
    }

    fn timeout(&self) -> Duration {
        PYTHON_TIMEOUT
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let command = args
            .get("command")
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Tool("missing required 'command'".to_string()))?;

        debug!(bytes = command.len(), "running python snippet");
        let output = Command::new(&self.interpreter)
            .arg("-c")
            .arg(command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::Tool(format!("failed to run {}: {e}", self.interpreter)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let mut report = format!("execution failed ({})", output.status);
            if !stderr.trim().is_empty() {
                report.push('\n');
                report.push_str(stderr.trim());
            }
            return Ok(ToolOutput::error(report));
        }

        if stdout.trim().is_empty() {
            return Ok(ToolOutput::success(
                "(no output; use print() to produce output)",
            ));
        }
        Ok(ToolOutput::success(stdout.into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ToolContext {
        ToolContext::new("test-session")
    }

    #[tokio::test]
    async fn captures_stdout() {
        let tool = PythonReplTool::with_interpreter("sh");
        let out = tool
            .execute(&context(), json!({"command": "echo 42"}))
            .await
            .expect("run should succeed");

        assert!(!out.is_error);
        assert_eq!(out.content, "42\n");
    }

    #[tokio::test]
    async fn silent_snippets_get_a_hint() {
        let tool = PythonReplTool::with_interpreter("sh");
        let out = tool
            .execute(&context(), json!({"command": "true"}))
            .await
            .unwrap();

        assert!(out.content.contains("no output"));
    }

    #[tokio::test]
    async fn failures_surface_stderr() {
        let tool = PythonReplTool::with_interpreter("sh");
        let out = tool
            .execute(&context(), json!({"command": "echo broken >&2; exit 3"}))
            .await
            .unwrap();

        assert!(out.is_error);
        assert!(out.content.contains("execution failed"));
        assert!(out.content.contains("broken"));
    }

    #[tokio::test]
    async fn missing_command_is_rejected() {
        let tool = PythonReplTool::new();
        let err = tool.execute(&context(), json!({})).await.unwrap_err();
        assert!(err.to_string().contains("missing required 'command'"));
    }
}
