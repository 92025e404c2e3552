use std::sync::Arc;
use std::time::Duration;

use hearth_agents::AgentRuntime;
use hearth_common::Result;
use hearth_db::SessionStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Due actions fetched per polling pass.
const SCHEDULER_BATCH: usize = 10;

/// Polls the store for due actions and feeds each one back through the
/// engine. Runs until the process stops.
pub async fn run_scheduler(
    runtime: Arc<AgentRuntime>,
    store: Arc<Mutex<SessionStore>>,
    poll_interval: Duration,
) {
    info!(interval_secs = poll_interval.as_secs(), "scheduler running");
    loop {
        tokio::time::sleep(poll_interval).await;
        if let Err(e) = tick(&runtime, &store).await {
            warn!(error = %e, "scheduler tick failed");
        }
    }
}

/// One polling pass. Returns how many due actions were processed.
pub async fn tick(runtime: &AgentRuntime, store: &Mutex<SessionStore>) -> Result<usize> {
    let due = { store.lock().await.poll_due_actions(SCHEDULER_BATCH)? };

    let processed = due.len();
    for action in due {
        // Each action enters the engine under its own session so it
        // cannot block a live conversation.
        let session_id = format!("scheduled-{}", action.id);
        info!(action_id = %action.id, "running scheduled action");

        match runtime.try_run_turn(&session_id, &action.instructions).await {
            Ok(answer) => {
                debug!(action_id = %action.id, %answer, "scheduled action finished");
                store.lock().await.complete_action(&action.id)?;
            }
            Err(e) => {
                warn!(action_id = %action.id, error = %e, "scheduled action failed");
                store.lock().await.fail_action(&action.id, &e.to_string())?;
            }
        }
    }
    Ok(processed)
}
