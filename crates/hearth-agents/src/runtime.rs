use hearth_common::{Error, Message, Result};
use hearth_db::SessionStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::compressor::ContextCompressor;
use crate::prompt::{DEFAULT_PERSONA, build_system_prompt};
use crate::providers::{LlmProvider, LlmRequest};
use crate::session::SessionDirectory;
use crate::tools::{ToolContext, ToolRegistry};

pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 25;

/// What the user hears when a turn fails outright.
pub const FALLBACK_ANSWER: &str = "Sorry, I can't do that right now.";

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub model: String,
    /// Model calls allowed per turn. A turn still requesting tools on
    /// the last round fails with `ToolLoopExceeded`.
    pub max_tool_rounds: usize,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub persona: String,
    pub timezone: chrono_tz::Tz,
    pub resummarize_every_turns: Option<u32>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            temperature: Some(0.0),
            max_tokens: None,
            persona: DEFAULT_PERSONA.to_string(),
            timezone: chrono_tz::America::Sao_Paulo,
            resummarize_every_turns: None,
        }
    }
}

/// The turn engine. One instance serves every session of the process;
/// per-session locks serialize turns within a session while distinct
/// sessions run in parallel.
pub struct AgentRuntime {
    provider: Arc<dyn LlmProvider>,
    tools: ToolRegistry,
    store: Arc<Mutex<SessionStore>>,
    sessions: SessionDirectory,
    compressor: ContextCompressor,
    settings: AgentSettings,
}

impl AgentRuntime {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: ToolRegistry,
        store: Arc<Mutex<SessionStore>>,
        settings: AgentSettings,
    ) -> Self {
        let compressor =
            ContextCompressor::new(&settings.model, settings.resummarize_every_turns);
        Self {
            provider,
            tools,
            store,
            sessions: SessionDirectory::new(),
            compressor,
            settings,
        }
    }

    /// Run one conversational turn and return the answer text. Never
    /// fails: unrecovered errors are logged and become a short apology.
    pub async fn run_turn(&self, session_id: &str, question: &str) -> String {
        match self.try_run_turn(session_id, question).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(session_id, error = %e, "turn failed");
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    /// Like `run_turn`, but surfaces the failure for callers that need
    /// to distinguish outcomes (the scheduler, tests).
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn try_run_turn(&self, session_id: &str, question: &str) -> Result<String> {
        let session = self.sessions.get_or_create(session_id);
        let mut record = session.lock().await;

        let stored = match self.store.lock().await.load_history(session_id) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "failed to load history, starting empty");
                Vec::new()
            }
        };
        if !record.seeded {
            record.live_messages = stored.clone();
            record.seeded = true;
        }

        let summary = self
            .compressor
            .context_for(self.provider.as_ref(), &mut record, &stored)
            .await?;
        let now = chrono::Utc::now().with_timezone(&self.settings.timezone);
        let mut context = vec![build_system_prompt(&self.settings.persona, now)];
        context.extend(summary);

        // The turn works on a staged copy; the record only advances when
        // the turn completes, so a failed turn leaves no half-applied
        // state behind.
        let mut live = record.live_messages.clone();
        live.push(Message::user(question));

        let definitions = self.tools.definitions();
        let tool_context = ToolContext::new(session_id);
        let mut answered = false;

        for round in 0..self.settings.max_tool_rounds {
            let mut messages = context.clone();
            messages.extend(live.iter().cloned());
            let request = LlmRequest {
                model: self.settings.model.clone(),
                messages,
                max_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
                tools: definitions.clone(),
            };

            let response = self.provider.complete(&request).await?;
            let assistant = response.message;
            let calls = assistant.tool_calls.clone();
            live.push(assistant);

            if calls.is_empty() {
                answered = true;
                debug!(rounds = round + 1, "turn reached a final answer");
                break;
            }

            debug!(round = round + 1, calls = calls.len(), "dispatching tool batch");
            let results = self.tools.dispatch(&tool_context, &calls).await;
            live.extend(results);
        }

        if !answered {
            return Err(Error::ToolLoopExceeded(self.settings.max_tool_rounds));
        }

        let answer = live.last().map(|m| m.content.clone()).unwrap_or_default();
        record.live_messages = live;
        record.turns_since_summary += 1;

        if let Err(e) = self
            .store
            .lock()
            .await
            .append_history(session_id, &record.live_messages)
        {
            warn!(error = %e, "failed to persist history");
        }

        info!(live_len = record.live_messages.len(), "turn finished");
        Ok(answer)
    }

    /// Drop a session's in-process state. Durable history remains.
    pub fn reset_session(&self, session_id: &str) -> bool {
        self.sessions.reset(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.names()
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.provider.health_check().await
    }
}
