use async_trait::async_trait;
use hearth_agents::{Tool, ToolContext, ToolOutput};
use hearth_common::{Error, Result};
use serde_json::{Value, json};
use std::sync::Arc;

/// Entity domains worth showing the model. Everything else (automations,
/// zones, weather internals) is noise in a states dump.
const LISTED_DOMAINS: [&str; 3] = ["light", "switch", "sensor"];

/// Shared Home Assistant REST handle. One per process; every HA tool
/// holds an `Arc` to it.
pub struct HomeAssistantApi {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HomeAssistantApi {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("home assistant request failed: {e}")))?;
        Self::read_json(resp).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("home assistant request failed: {e}")))?;
        Self::read_json(resp).await
    }

    async fn read_json(resp: reqwest::Response) -> Result<Value> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(Error::Tool(format!(
                "Sorry, I can't do that (got error {status})"
            )));
        }
        resp.json()
            .await
            .map_err(|e| Error::Tool(format!("failed to parse home assistant response: {e}")))
    }
}

/// Lists lights, switches and sensors with their current state.
pub struct ListEntitiesTool {
    api: Arc<HomeAssistantApi>,
}

impl ListEntitiesTool {
    pub fn new(api: Arc<HomeAssistantApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for ListEntitiesTool {
    fn name(&self) -> &str {
        "home_assistant_get_all_entities_state"
    }

    fn description(&self) -> &str {
        "Get an overview of all entities, including their IDs and state. \
         States can also contain useful attributes about said entity."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, _context: &ToolContext, _args: Value) -> Result<ToolOutput> {
        let states = self.api.get("/api/states").await?;
        let entities: Vec<&Value> = states
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter(|entry| {
                        entry["entity_id"]
                            .as_str()
                            .is_some_and(|id| LISTED_DOMAINS.iter().any(|d| id.starts_with(d)))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ToolOutput::success(
            serde_json::to_string_pretty(&entities)
                .unwrap_or_else(|_| "{\"error\":\"failed to serialize states\"}".to_string()),
        ))
    }
}

/// Reads one entity's full state.
pub struct GetEntityStateTool {
    api: Arc<HomeAssistantApi>,
}

impl GetEntityStateTool {
    pub fn new(api: Arc<HomeAssistantApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for GetEntityStateTool {
    fn name(&self) -> &str {
        "home_assistant_get_entity_state"
    }

    fn description(&self) -> &str {
        "Get the current state of a single entity. States can also contain \
         useful attributes about said entity."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entity": {
                    "type": "string",
                    "description": "The entity ID to retrieve the current state, e.g. switch.office_switch_1, light.bedroom_light, or sensor.pixel_7_pro_battery_level. Use only entities you know exist."
                }
            },
            "required": ["entity"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let entity = require_str(&args, "entity")?;
        let state = self.api.get(&format!("/api/states/{entity}")).await?;
        Ok(ToolOutput::success(
            serde_json::to_string_pretty(&state)
                .unwrap_or_else(|_| "{\"error\":\"failed to serialize state\"}".to_string()),
        ))
    }
}

/// Turns entities on or off, or toggles them, in one batch.
pub struct ControlEntitiesTool {
    api: Arc<HomeAssistantApi>,
}

impl ControlEntitiesTool {
    pub fn new(api: Arc<HomeAssistantApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for ControlEntitiesTool {
    fn name(&self) -> &str {
        "control_entities"
    }

    fn description(&self) -> &str {
        "Useful when you want to control (e.g. turn on or off) one or more \
         Home Assistant entities."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "enum": ["turn_on", "turn_off", "toggle"],
                    "description": "The command to execute on entities, e.g. turn_on, turn_off, toggle"
                },
                "entities": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "The entity IDs of devices (e.g. lights or switches) to control, e.g. switch.office_switch_1, light.bedroom_light"
                }
            },
            "required": ["command", "entities"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let command = require_str(&args, "command")?;
        if !matches!(command.as_str(), "turn_on" | "turn_off" | "toggle") {
            return Err(Error::Tool(format!(
                "unknown command '{command}': use turn_on, turn_off or toggle"
            )));
        }
        let entities = require_string_array(&args, "entities")?;

        self.api
            .post(
                &format!("/api/services/homeassistant/{command}"),
                &json!({ "entity_id": entities }),
            )
            .await?;

        Ok(ToolOutput::success("Ok"))
    }
}

/// Turns lights on with optional brightness, color and transition.
pub struct TurnOnLightsTool {
    api: Arc<HomeAssistantApi>,
}

impl TurnOnLightsTool {
    pub fn new(api: Arc<HomeAssistantApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for TurnOnLightsTool {
    fn name(&self) -> &str {
        "home_assistant_turn_on_lights"
    }

    fn description(&self) -> &str {
        "Turn on one or more lights, controlling their attributes, like \
         color, brightness and transition duration."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "entities": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "One or more lights to turn on, e.g. light.bedroom_light"
                },
                "transition": {
                    "type": "number",
                    "description": "Duration in seconds it takes to turn on."
                },
                "rgbw_color": {
                    "type": "array",
                    "items": {"type": "integer"},
                    "description": "The color in RGBW format. A list of four integers between 0 and 255 representing the values of red, green, blue, and white."
                },
                "brightness_pct": {
                    "type": "integer",
                    "description": "Number indicating the percentage of full brightness, where 0 turns the light off, 1 is the minimum brightness, and 100 is the maximum brightness."
                }
            },
            "required": ["entities"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let entities = require_string_array(&args, "entities")?;

        let mut body = json!({ "entity_id": entities });
        if let Some(transition) = args["transition"].as_f64() {
            body["transition"] = json!(transition);
        }
        if let Some(color) = args["rgbw_color"].as_array() {
            body["rgbw_color"] = json!(color);
        }
        if let Some(brightness) = args["brightness_pct"].as_i64() {
            body["brightness_pct"] = json!(brightness);
        }

        self.api.post("/api/services/light/turn_on", &body).await?;

        Ok(ToolOutput::success("Ok"))
    }
}

/// Plays a chime and speaks a message on an Alexa media player.
pub struct NotifyAlexaTool {
    api: Arc<HomeAssistantApi>,
}

impl NotifyAlexaTool {
    pub fn new(api: Arc<HomeAssistantApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for NotifyAlexaTool {
    fn name(&self) -> &str {
        "home_assistant_notify_alexa"
    }

    fn description(&self) -> &str {
        "Useful when you want to send/display/ring notification using Alexa, \
         notify in real time."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message of the notification"
                },
                "target": {
                    "type": "string",
                    "description": "The entity IDs of target device to send the notification to, e.g. media_player.kitchen_echo"
                }
            },
            "required": ["message", "target"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let message = require_str(&args, "message")?;
        let target = require_str(&args, "target")?;

        // Chime first; a failed bell never blocks the announcement itself.
        let _ = self
            .api
            .post(
                "/api/services/media_player/play_media",
                &json!({
                    "entity_id": target,
                    "media_content_type": "sound",
                    "media_content_id": "bell_02",
                }),
            )
            .await;

        let response = self
            .api
            .post(
                "/api/services/notify/alexa_media",
                &json!({ "message": message, "target": target }),
            )
            .await?;

        Ok(ToolOutput::success(
            serde_json::to_string_pretty(&response)
                .unwrap_or_else(|_| "{\"error\":\"failed to serialize response\"}".to_string()),
        ))
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

fn require_string_array(args: &Value, key: &str) -> Result<Vec<String>> {
    let items = args
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::Tool(format!("'{key}' must be an array of entity IDs")))?;

    let mut values = Vec::with_capacity(items.len());
    for item in items {
        let raw = item
            .as_str()
            .ok_or_else(|| Error::Tool(format!("'{key}' must contain only strings")))?;
        values.push(raw.to_string());
    }
    if values.is_empty() {
        return Err(Error::Tool(format!("'{key}' cannot be empty")));
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> Arc<HomeAssistantApi> {
        Arc::new(HomeAssistantApi::new(server.uri(), "ha-token"))
    }

    fn context() -> ToolContext {
        ToolContext::new("test-session")
    }

    #[tokio::test]
    async fn control_entities_posts_the_service_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/homeassistant/turn_on"))
            .and(body_partial_json(json!({"entity_id": ["light.kitchen"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let tool = ControlEntitiesTool::new(api_for(&server));
        let out = tool
            .execute(
                &context(),
                json!({"command": "turn_on", "entities": ["light.kitchen"]}),
            )
            .await
            .expect("service call should succeed");

        assert!(!out.is_error);
        assert_eq!(out.content, "Ok");
    }

    #[tokio::test]
    async fn control_entities_rejects_unknown_commands() {
        let server = MockServer::start().await;
        let tool = ControlEntitiesTool::new(api_for(&server));

        let err = tool
            .execute(
                &context(),
                json!({"command": "explode", "entities": ["light.kitchen"]}),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("unknown command"));
    }

    #[tokio::test]
    async fn error_status_becomes_a_spoken_apology() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/homeassistant/turn_off"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let tool = ControlEntitiesTool::new(api_for(&server));
        let err = tool
            .execute(
                &context(),
                json!({"command": "turn_off", "entities": ["switch.heater"]}),
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Sorry, I can't do that (got error 503)");
    }

    #[tokio::test]
    async fn listing_filters_out_unrelated_domains() {
        let server = MockServer::start().await;
        let states = json!([
            {"entity_id": "light.kitchen", "state": "off", "attributes": {"friendly_name": "Kitchen"}},
            {"entity_id": "sensor.bedroom_temp", "state": "21.5", "attributes": {"friendly_name": "Bedroom Temp"}},
            {"entity_id": "automation.morning", "state": "on", "attributes": {}},
            {"entity_id": "switch.heater", "state": "on", "attributes": {"friendly_name": "Heater"}}
        ]);
        Mock::given(method("GET"))
            .and(path("/api/states"))
            .respond_with(ResponseTemplate::new(200).set_body_json(states))
            .mount(&server)
            .await;

        let tool = ListEntitiesTool::new(api_for(&server));
        let out = tool.execute(&context(), json!({})).await.unwrap();

        assert!(out.content.contains("light.kitchen"));
        assert!(out.content.contains("switch.heater"));
        assert!(out.content.contains("Bedroom Temp"));
        assert!(!out.content.contains("automation.morning"));
    }

    #[tokio::test]
    async fn turn_on_lights_omits_absent_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/light/turn_on"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let tool = TurnOnLightsTool::new(api_for(&server));
        tool.execute(
            &context(),
            json!({"entities": ["light.bedroom"], "brightness_pct": 40}),
        )
        .await
        .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["entity_id"][0], "light.bedroom");
        assert_eq!(body["brightness_pct"], 40);
        assert!(body.get("rgbw_color").is_none());
        assert!(body.get("transition").is_none());
    }

    #[tokio::test]
    async fn turn_on_lights_forwards_all_attributes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/light/turn_on"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let tool = TurnOnLightsTool::new(api_for(&server));
        let out = tool
            .execute(
                &context(),
                json!({
                    "entities": ["light.bedroom"],
                    "transition": 2.5,
                    "rgbw_color": [255, 180, 120, 0],
                    "brightness_pct": 80
                }),
            )
            .await
            .unwrap();

        assert_eq!(out.content, "Ok");
        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["transition"], 2.5);
        assert_eq!(body["rgbw_color"], json!([255, 180, 120, 0]));
        assert_eq!(body["brightness_pct"], 80);
    }

    #[tokio::test]
    async fn notify_alexa_chimes_before_speaking() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/services/media_player/play_media"))
            .and(body_partial_json(json!({"media_content_id": "bell_02"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(null)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/services/notify/alexa_media"))
            .and(body_partial_json(
                json!({"message": "Dinner is ready", "target": "media_player.kitchen_echo"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let tool = NotifyAlexaTool::new(api_for(&server));
        let out = tool
            .execute(
                &context(),
                json!({"message": "Dinner is ready", "target": "media_player.kitchen_echo"}),
            )
            .await
            .unwrap();

        assert_eq!(out.content, "[]");
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].url.path().ends_with("play_media"));
    }
}
