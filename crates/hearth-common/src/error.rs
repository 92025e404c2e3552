use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy of the turn engine. Variants map to how a failure is
/// handled: some abort the turn, some are folded back into the
/// conversation, some are only logged.
#[derive(Error, Debug)]
pub enum Error {
    /// Model call failed (transport, status, or unparseable reply).
    /// Aborts the turn; surfaced to the user as an apology answer.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// A tool invocation failed. Recovered: the text becomes the content
    /// of that call's tool message.
    #[error("{0}")]
    Tool(String),

    /// The model kept requesting tools past the configured round limit.
    #[error("tool loop exceeded {0} rounds without a final answer")]
    ToolLoopExceeded(usize),

    /// The model requested a tool that is not registered. Recovered like
    /// a tool failure.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Two tools registered under the same name. Fatal at startup.
    #[error("duplicate tool registration: {0}")]
    DuplicateTool(String),

    /// Durable store failure. Logged by the caller, never shown to the
    /// user.
    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Agent(String),
}
