use anyhow::Context;
use clap::{Parser, Subcommand};
use hearth_agents::{AgentRuntime, AgentSettings, DEFAULT_PERSONA, OpenAiProvider};
use hearth_config::{AppConfig, ConfigLoader};
use hearth_db::SessionStore;
use hearth_gateway::scheduler::run_scheduler;
use hearth_gateway::{AppState, GatewayServer};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "hearth")]
#[command(version, about = "Hearth - personal smart-home assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to HEARTH_CONFIG or the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway and the action scheduler (default)
    Serve,

    /// Chat interactively from the terminal
    Chat {
        /// Continue an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
    },

    /// Ask a single question and print the answer
    Ask {
        question: Vec<String>,

        /// Session to ask under; a fresh one is used when omitted
        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = ConfigLoader::load(cli.config.as_deref())?;
    let (runtime, store) = build_runtime(&config)?;

    match cli.command {
        None | Some(Commands::Serve) => serve(runtime, store, config).await,
        Some(Commands::Chat { session }) => chat(runtime, session).await,
        Some(Commands::Ask { question, session }) => ask(runtime, question, session).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_target(false)
        .init();
}

fn build_runtime(
    config: &AppConfig,
) -> anyhow::Result<(Arc<AgentRuntime>, Arc<Mutex<SessionStore>>)> {
    let db_path = config.storage.resolved_db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let store = Arc::new(Mutex::new(SessionStore::open(&db_path)?));

    let tools = hearth_tools::build_catalog(config, Arc::clone(&store))?;
    info!(tools = tools.len(), db = %db_path.display(), "catalog ready");

    let api_key = config.llm.api_key.clone().context(
        "no LLM API key: set OPENAI_API_KEY or GROQ_API_KEY, or [llm].api_key in the config file",
    )?;
    let provider = Arc::new(OpenAiProvider::new(
        api_key,
        config.llm.base_url.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    )?);

    let timezone = config
        .agent
        .timezone
        .parse::<chrono_tz::Tz>()
        .map_err(|e| anyhow::anyhow!("invalid timezone '{}': {e}", config.agent.timezone))?;
    let settings = AgentSettings {
        model: config.llm.model.clone(),
        max_tool_rounds: config.agent.max_tool_rounds,
        temperature: Some(config.llm.temperature),
        max_tokens: config.llm.max_tokens,
        persona: config
            .agent
            .persona
            .clone()
            .unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
        timezone,
        resummarize_every_turns: config.agent.resummarize_every_turns,
    };

    let runtime = Arc::new(AgentRuntime::new(
        provider,
        tools,
        Arc::clone(&store),
        settings,
    ));
    Ok((runtime, store))
}

async fn serve(
    runtime: Arc<AgentRuntime>,
    store: Arc<Mutex<SessionStore>>,
    config: AppConfig,
) -> anyhow::Result<()> {
    let poll = Duration::from_secs(config.gateway.scheduler_poll_secs);
    tokio::spawn(run_scheduler(Arc::clone(&runtime), store, poll));

    let server = GatewayServer::new(Arc::new(AppState::new(runtime, config)));
    server.run().await?;
    Ok(())
}

async fn chat(runtime: Arc<AgentRuntime>, session: Option<String>) -> anyhow::Result<()> {
    let session_id = session.unwrap_or_else(|| Uuid::new_v4().to_string());
    println!("session {session_id} (exit with ctrl-d or 'exit')");

    loop {
        let line = match dialoguer::Input::<String>::new()
            .with_prompt("you")
            .interact_text()
        {
            Ok(line) => line,
            Err(_) => break,
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }
        let answer = runtime.run_turn(&session_id, question).await;
        println!("{answer}");
    }
    Ok(())
}

async fn ask(
    runtime: Arc<AgentRuntime>,
    question: Vec<String>,
    session: Option<String>,
) -> anyhow::Result<()> {
    let question = question.join(" ");
    if question.trim().is_empty() {
        anyhow::bail!("nothing to ask");
    }
    let session_id = session.unwrap_or_else(|| Uuid::new_v4().to_string());
    let answer = runtime.try_run_turn(&session_id, question.trim()).await?;
    println!("{answer}");
    Ok(())
}
