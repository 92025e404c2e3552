use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_agents::{Tool, ToolContext, ToolOutput};
use hearth_common::{Error, Result};
use hearth_db::SessionStore;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Maximum pending actions per session.
const MAX_PENDING_PER_SESSION: i64 = 20;

/// Schedules a set of instructions to run later. The gateway's scheduler
/// picks due actions up and feeds the instructions back through a turn.
pub struct ScheduleActionTool {
    store: Arc<Mutex<SessionStore>>,
}

impl ScheduleActionTool {
    pub fn new(store: Arc<Mutex<SessionStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ScheduleActionTool {
    fn name(&self) -> &str {
        "schedule_action"
    }

    fn description(&self) -> &str {
        "Use this when you want to schedule any action to be executed in the \
         future by setting a timer and running a set of instructions.\n\
         Provide complete instructions to execute the entire task as if it's \
         time to execute it.\n\
         For example, when the user request to \"set an alarm for 4p.m.\", \
         the instructions should be \"notify user their alarm has expired\"\n\
         and when the user request to \"at 4p.m, send a message to John \
         saying wake up\", the instructions should be \"send a message to \
         John: wake up\"."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "moment": {
                    "type": "string",
                    "description": "At which time the action should be executed (RFC3339 timestamp with mandatory time zone offset, e.g., 2011-06-03T10:00:00-07:00, 2011-06-03T10:00:00Z). Required."
                },
                "instructions": {
                    "type": "string",
                    "description": "Complete instructions to execute the entire task as if it's time to execute it."
                }
            },
            "required": ["moment", "instructions"]
        })
    }

    async fn execute(&self, context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let moment = require_str(&args, "moment")?;
        let instructions = require_str(&args, "instructions")?;
        let execute_at = parse_future_moment(&moment)?;

        insert_action(&self.store, &context.session_id, &instructions, execute_at).await?;

        Ok(ToolOutput::success(format!(
            "The action \"{instructions}\" has been scheduled to run at {moment}."
        )))
    }
}

/// An alarm. Rides the same scheduled-actions table; when it fires, the
/// engine is asked to announce the message on Alexa.
pub struct TimerTool {
    store: Arc<Mutex<SessionStore>>,
}

impl TimerTool {
    pub fn new(store: Arc<Mutex<SessionStore>>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for TimerTool {
    fn name(&self) -> &str {
        "home_assistant_timer"
    }

    fn description(&self) -> &str {
        "Useful when you want to set an alarm at some time."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The timer description"
                },
                "moment": {
                    "type": "string",
                    "description": "At which time the timer should trigger (RFC3339 timestamp with mandatory time zone offset, e.g., 2011-06-03T10:00:00-07:00, 2011-06-03T10:00:00Z). Required."
                }
            },
            "required": ["message", "moment"]
        })
    }

    async fn execute(&self, context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let message = require_str(&args, "message")?;
        let moment = require_str(&args, "moment")?;
        let execute_at = parse_future_moment(&moment)?;

        let instructions =
            format!("The timer \"{message}\" is going off. Announce it on Alexa.");
        insert_action(&self.store, &context.session_id, &instructions, execute_at).await?;

        Ok(ToolOutput::success("Done."))
    }
}

fn require_str(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Tool(format!("missing required '{key}'")))
}

fn parse_future_moment(moment: &str) -> Result<DateTime<Utc>> {
    let execute_at: DateTime<Utc> = DateTime::parse_from_rfc3339(moment)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            Error::Tool(format!(
                "invalid moment '{moment}': use an RFC3339 timestamp with a time zone \
                 offset, e.g. 2011-06-03T10:00:00-07:00"
            ))
        })?;
    if execute_at <= Utc::now() {
        return Err(Error::Tool("moment must be in the future".to_string()));
    }
    Ok(execute_at)
}

async fn insert_action(
    store: &Mutex<SessionStore>,
    session_id: &str,
    instructions: &str,
    execute_at: DateTime<Utc>,
) -> Result<String> {
    let store = store.lock().await;
    let pending = store.count_pending_actions(session_id)?;
    if pending >= MAX_PENDING_PER_SESSION {
        return Err(Error::Tool(format!(
            "this session already has {pending} pending actions (max {MAX_PENDING_PER_SESSION})"
        )));
    }

    let action_id = store.schedule_action(session_id, instructions, execute_at)?;
    info!(%action_id, %execute_at, "action scheduled");
    Ok(action_id)
}
