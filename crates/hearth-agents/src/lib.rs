pub mod compressor;
pub mod prompt;
pub mod providers;
pub mod runtime;
pub mod session;
pub mod tools;

pub use compressor::{ContextCompressor, SUMMARIZE_INSTRUCTION};
pub use prompt::{DEFAULT_PERSONA, build_system_prompt};
pub use providers::{
    LlmProvider, LlmRequest, LlmResponse, OpenAiProvider, ScriptedProvider, ScriptedStep,
    ToolDefinition, Usage,
};
pub use runtime::{AgentRuntime, AgentSettings, DEFAULT_MAX_TOOL_ROUNDS, FALLBACK_ANSWER};
pub use session::{SessionDirectory, SessionRecord};
pub use tools::{DEFAULT_TOOL_TIMEOUT, Tool, ToolContext, ToolOutput, ToolRegistry};
