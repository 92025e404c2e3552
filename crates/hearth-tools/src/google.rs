use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hearth_agents::{Tool, ToolContext, ToolOutput};
use hearth_common::{Error, Result};
use hearth_config::GoogleConfig;
use reqwest::Url;
use serde_json::{Value, json};
use std::sync::Arc;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/calendars";
const GOOGLE_TASKS_API_BASE: &str = "https://tasks.googleapis.com/tasks/v1/lists";
const EVENTS_MAX_RESULTS: usize = 10;

const RFC3339_HINT: &str = "RFC3339 timestamp with mandatory time zone offset, e.g., 2011-06-03T10:00:00-07:00, 2011-06-03T10:00:00Z";

#[derive(Debug, serde::Deserialize)]
struct GoogleTokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct CalendarEventsResponse {
    items: Option<Vec<CalendarEvent>>,
}

#[derive(Debug, serde::Deserialize)]
struct CalendarEvent {
    summary: Option<String>,
    status: Option<String>,
    location: Option<String>,
    start: Option<CalendarEventTime>,
    end: Option<CalendarEventTime>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarEventTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct TasksResponse {
    items: Option<Vec<TaskItem>>,
}

#[derive(Debug, serde::Deserialize)]
struct TaskItem {
    title: Option<String>,
    due: Option<String>,
    status: Option<String>,
    notes: Option<String>,
}

/// Shared Google API handle. Exchanges the long-lived refresh token for
/// an access token on every call; Google rotates those hourly anyway.
pub struct GoogleApi {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_url: String,
    calendar_base: String,
    tasks_base: String,
}

impl GoogleApi {
    pub fn new(config: &GoogleConfig) -> Self {
        Self::with_endpoints(
            config,
            GOOGLE_TOKEN_URL,
            GOOGLE_CALENDAR_API_BASE,
            GOOGLE_TASKS_API_BASE,
        )
    }

    pub fn with_endpoints(
        config: &GoogleConfig,
        token_url: impl Into<String>,
        calendar_base: impl Into<String>,
        tasks_base: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            token_url: token_url.into(),
            calendar_base: calendar_base.into(),
            tasks_base: tasks_base.into(),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| Error::Tool(format!("google token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Tool(format!(
                "google token exchange failed ({status}): {body}"
            )));
        }

        let token = resp
            .json::<GoogleTokenResponse>()
            .await
            .map_err(|e| Error::Tool(format!("failed to parse google token response: {e}")))?;
        token
            .access_token
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Tool("google token response missing access_token".to_string()))
    }

    async fn get(&self, url: Url) -> Result<Value> {
        let access_token = self.access_token().await?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("google request failed: {e}")))?;
        Self::read_json(resp).await
    }

    async fn post(&self, url: Url, body: &Value) -> Result<Value> {
        let access_token = self.access_token().await?;
        let resp = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("google request failed: {e}")))?;
        Self::read_json(resp).await
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Tool(format!("google call failed ({status}): {body}")));
        }
        resp.json()
            .await
            .map_err(|e| Error::Tool(format!("failed to parse google response: {e}")))
    }

    fn calendar_events_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.calendar_base)
            .map_err(|e| Error::Tool(format!("bad calendar url: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Tool("failed to build calendar url path".to_string()))?;
            segments.push("primary");
            segments.push("events");
        }
        Ok(url)
    }

    fn tasks_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.tasks_base)
            .map_err(|e| Error::Tool(format!("bad tasks url: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Tool("failed to build tasks url path".to_string()))?;
            segments.push("@default");
            segments.push("tasks");
        }
        Ok(url)
    }
}

#[derive(Debug)]
struct ListEventsInput {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

#[derive(Debug)]
struct CreateEventInput {
    summary: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    location: Option<String>,
}

#[derive(Debug)]
struct ListTasksInput {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    show_completed: bool,
    show_deleted: bool,
    show_hidden: bool,
}

#[derive(Debug)]
struct CreateTaskInput {
    title: String,
    due: DateTime<Utc>,
}

/// Lists events from the primary calendar.
pub struct CalendarListEventsTool {
    api: Arc<GoogleApi>,
}

impl CalendarListEventsTool {
    pub fn new(api: Arc<GoogleApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for CalendarListEventsTool {
    fn name(&self) -> &str {
        "google_calendar_tool"
    }

    fn description(&self) -> &str {
        "List all events on Google Calendar for a specific time range"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "from_datetime": {
                    "type": "string",
                    "description": format!("From which timestamp you want the events ({RFC3339_HINT}). Required.")
                },
                "to_datetime": {
                    "type": "string",
                    "description": format!("To which timestamp you want the events ({RFC3339_HINT}). Required.")
                }
            },
            "required": ["from_datetime", "to_datetime"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let input = parse_list_events_input(&args)?;

        let mut url = self.api.calendar_events_url()?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("singleEvents", "true");
            qp.append_pair("orderBy", "startTime");
            qp.append_pair("maxResults", &EVENTS_MAX_RESULTS.to_string());
            qp.append_pair("timeMin", &input.from.to_rfc3339());
            qp.append_pair("timeMax", &input.to.to_rfc3339());
        }

        let payload: CalendarEventsResponse = serde_json::from_value(self.api.get(url).await?)
            .map_err(|e| Error::Tool(format!("failed to parse calendar events: {e}")))?;

        let events: Vec<Value> = payload
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|event| {
                json!({
                    "summary": event.summary,
                    "status": event.status,
                    "location": event.location,
                    "start": event_time(event.start),
                    "end": event_time(event.end),
                })
            })
            .collect();

        Ok(ToolOutput::success(
            serde_json::to_string_pretty(&json!({
                "count": events.len(),
                "events": events,
            }))
            .unwrap_or_else(|_| "{\"error\":\"failed to serialize events\"}".to_string()),
        ))
    }
}

/// Creates an event on the primary calendar.
pub struct CalendarCreateEventTool {
    api: Arc<GoogleApi>,
}

impl CalendarCreateEventTool {
    pub fn new(api: Arc<GoogleApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for CalendarCreateEventTool {
    fn name(&self) -> &str {
        "create_google_calendar_event_tool"
    }

    fn description(&self) -> &str {
        "Create an event on Google Calendar"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "Summary of the event. Required."
                },
                "start_datetime": {
                    "type": "string",
                    "description": "The start timestamp, as a combined date-time value (formatted according to RFC3339). Required."
                },
                "end_datetime": {
                    "type": "string",
                    "description": "The end timestamp, as a combined date-time value (formatted according to RFC3339). Required."
                },
                "location": {
                    "type": "string",
                    "description": "Geographic location of the event as free-form text. Optional."
                }
            },
            "required": ["summary", "start_datetime", "end_datetime"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let input = parse_create_event_input(&args)?;

        let mut body = json!({
            "summary": input.summary,
            "start": {"dateTime": input.start.to_rfc3339(), "timeZone": "UTC"},
            "end": {"dateTime": input.end.to_rfc3339(), "timeZone": "UTC"},
        });
        if let Some(location) = &input.location {
            body["location"] = json!(location);
        }

        let url = self.api.calendar_events_url()?;
        let created = self.api.post(url, &body).await?;

        Ok(ToolOutput::success(
            serde_json::to_string_pretty(&json!({
                "summary": created["summary"],
                "start": created["start"],
                "end": created["end"],
                "status": created["status"],
            }))
            .unwrap_or_else(|_| "{\"error\":\"failed to serialize event\"}".to_string()),
        ))
    }
}

/// Lists tasks from the default task list.
pub struct TasksListTool {
    api: Arc<GoogleApi>,
}

impl TasksListTool {
    pub fn new(api: Arc<GoogleApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for TasksListTool {
    fn name(&self) -> &str {
        "google_list_tasks_tool"
    }

    fn description(&self) -> &str {
        "List tasks using Google Tasks API"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "from_datetime": {
                    "type": "string",
                    "description": format!("From which timestamp you want to list tasks ({RFC3339_HINT}). Optional.")
                },
                "to_datetime": {
                    "type": "string",
                    "description": format!("To which timestamp you want to list tasks ({RFC3339_HINT}). Optional.")
                },
                "show_completed": {
                    "type": "boolean",
                    "description": "Whether to show completed tasks. Optional.",
                    "default": false
                },
                "show_deleted": {
                    "type": "boolean",
                    "description": "Whether to show deleted tasks. Optional.",
                    "default": false
                },
                "show_hidden": {
                    "type": "boolean",
                    "description": "Whether to show hidden tasks. Optional.",
                    "default": false
                }
            },
            "required": []
        })
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let input = parse_list_tasks_input(&args)?;

        let mut url = self.api.tasks_url()?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("showCompleted", bool_str(input.show_completed));
            qp.append_pair("showDeleted", bool_str(input.show_deleted));
            qp.append_pair("showHidden", bool_str(input.show_hidden));
            if let Some(from) = input.from {
                qp.append_pair("dueMin", &from.to_rfc3339());
            }
            if let Some(to) = input.to {
                qp.append_pair("dueMax", &to.to_rfc3339());
            }
        }

        let payload: TasksResponse = serde_json::from_value(self.api.get(url).await?)
            .map_err(|e| Error::Tool(format!("failed to parse tasks: {e}")))?;

        let tasks: Vec<Value> = payload
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|task| {
                json!({
                    "title": task.title,
                    "due": task.due,
                    "status": task.status,
                    "notes": task.notes,
                })
            })
            .collect();

        Ok(ToolOutput::success(
            serde_json::to_string_pretty(&json!({
                "count": tasks.len(),
                "tasks": tasks,
            }))
            .unwrap_or_else(|_| "{\"error\":\"failed to serialize tasks\"}".to_string()),
        ))
    }
}

/// Adds a task to the default task list.
pub struct TasksCreateTool {
    api: Arc<GoogleApi>,
}

impl TasksCreateTool {
    pub fn new(api: Arc<GoogleApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for TasksCreateTool {
    fn name(&self) -> &str {
        "google_create_task_tool"
    }

    fn description(&self) -> &str {
        "Create a task using Google Tasks API"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "task_title": {
                    "type": "string",
                    "description": "Title of the task. Required."
                },
                "due_datetime": {
                    "type": "string",
                    "description": format!("Due timestamp of the task ({RFC3339_HINT}). Required.")
                }
            },
            "required": ["task_title", "due_datetime"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let input = parse_create_task_input(&args)?;

        let body = json!({
            "title": input.title,
            "due": input.due.to_rfc3339(),
        });

        let url = self.api.tasks_url()?;
        let created = self.api.post(url, &body).await?;

        Ok(ToolOutput::success(
            serde_json::to_string_pretty(&json!({
                "title": created["title"],
                "due": created["due"],
                "status": created["status"],
            }))
            .unwrap_or_else(|_| "{\"error\":\"failed to serialize task\"}".to_string()),
        ))
    }
}

fn parse_list_events_input(args: &Value) -> Result<ListEventsInput> {
    let from = require_rfc3339(args, "from_datetime")?;
    let to = require_rfc3339(args, "to_datetime")?;
    if to <= from {
        return Err(Error::Tool(
            "to_datetime must be greater than from_datetime".to_string(),
        ));
    }
    Ok(ListEventsInput { from, to })
}

fn parse_create_event_input(args: &Value) -> Result<CreateEventInput> {
    let summary = require_str(args, "summary")?;
    let start = require_rfc3339(args, "start_datetime")?;
    let end = require_rfc3339(args, "end_datetime")?;
    if end <= start {
        return Err(Error::Tool(
            "end_datetime must be after start_datetime".to_string(),
        ));
    }
    let location = args
        .get("location")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    Ok(CreateEventInput {
        summary,
        start,
        end,
        location,
    })
}

fn parse_list_tasks_input(args: &Value) -> Result<ListTasksInput> {
    Ok(ListTasksInput {
        from: optional_rfc3339(args, "from_datetime")?,
        to: optional_rfc3339(args, "to_datetime")?,
        show_completed: optional_bool(args, "show_completed"),
        show_deleted: optional_bool(args, "show_deleted"),
        show_hidden: optional_bool(args, "show_hidden"),
    })
}

fn parse_create_task_input(args: &Value) -> Result<CreateTaskInput> {
    Ok(CreateTaskInput {
        title: require_str(args, "task_title")?,
        due: require_rfc3339(args, "due_datetime")?,
    })
}

fn require_str(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Tool(format!("missing required '{key}'")))
}

fn require_rfc3339(args: &Value, key: &str) -> Result<DateTime<Utc>> {
    optional_rfc3339(args, key)?
        .ok_or_else(|| Error::Tool(format!("missing required '{key}'")))
}

fn optional_rfc3339(args: &Value, key: &str) -> Result<Option<DateTime<Utc>>> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| {
                    Error::Tool(format!(
                        "invalid '{key}': use an RFC3339 timestamp like 2026-08-22T16:00:00Z"
                    ))
                })
        })
        .transpose()
}

fn optional_bool(args: &Value, key: &str) -> bool {
    args.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn event_time(value: Option<CalendarEventTime>) -> Option<String> {
    let time = value?;
    if let Some(date_time) = time.date_time {
        return Some(date_time);
    }
    time.date
}
