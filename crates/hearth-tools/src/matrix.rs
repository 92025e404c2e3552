use async_trait::async_trait;
use hearth_agents::{Tool, ToolContext, ToolOutput};
use hearth_common::{Error, Result};
use hearth_config::MatrixConfig;
use reqwest::Url;
use serde_json::{Value, json};
use std::collections::HashMap;
use tracing::debug;

/// Sends text messages to Matrix rooms. Rooms are addressed by their
/// configured name, never by raw room ID.
pub struct MatrixSendMessageTool {
    http: reqwest::Client,
    homeserver: String,
    access_token: String,
    rooms: HashMap<String, String>,
}

impl MatrixSendMessageTool {
    pub fn new(config: &MatrixConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            homeserver: config.homeserver.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            rooms: config.rooms.clone(),
        }
    }

    fn resolve_room(&self, room_name: &str) -> Option<&String> {
        self.rooms.get(room_name).or_else(|| {
            self.rooms
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(room_name))
                .map(|(_, id)| id)
        })
    }

    fn send_url(&self, room_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.homeserver)
            .map_err(|e| Error::Tool(format!("bad homeserver url: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Tool("failed to build matrix url path".to_string()))?;
            segments.extend(["_matrix", "client", "v3", "rooms", room_id, "send"]);
            segments.push("m.room.message");
            segments.push(&uuid::Uuid::new_v4().to_string());
        }
        Ok(url)
    }
}

#[async_trait]
impl Tool for MatrixSendMessageTool {
    fn name(&self) -> &str {
        "matrix_send_message"
    }

    fn description(&self) -> &str {
        "Send a message to a room, group or person."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "room_name": {
                    "type": "string",
                    "description": "Name of the room, group or person you want to send the message to."
                },
                "message": {
                    "type": "string",
                    "description": "Message content."
                }
            },
            "required": ["room_name", "message"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let room_name = args
            .get("room_name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Tool("missing required 'room_name'".to_string()))?;
        let message = args
            .get("message")
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Tool("missing required 'message'".to_string()))?;

        let Some(room_id) = self.resolve_room(room_name) else {
            let mut known: Vec<&str> = self.rooms.keys().map(String::as_str).collect();
            known.sort_unstable();
            return Ok(ToolOutput::error(format!(
                "unknown room '{room_name}'. Known rooms: {}",
                known.join(", ")
            )));
        };

        debug!(room = room_name, "sending matrix message");
        let url = self.send_url(room_id)?;
        let resp = self
            .http
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "msgtype": "m.text", "body": message }))
            .send()
            .await
            .map_err(|e| Error::Tool(format!("matrix request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            debug!(%status, "matrix send rejected");
            return Err(Error::Tool("Sorry, I can't do that.".to_string()));
        }

        Ok(ToolOutput::success("Message sent successfully."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tool_for(server: &MockServer) -> MatrixSendMessageTool {
        let config = MatrixConfig {
            homeserver: server.uri(),
            access_token: "mx-token".to_string(),
            rooms: HashMap::from([
                ("Family".to_string(), "!family:example.org".to_string()),
                ("Ana".to_string(), "!ana:example.org".to_string()),
            ]),
        };
        MatrixSendMessageTool::new(&config)
    }

    fn context() -> ToolContext {
        ToolContext::new("test-session")
    }

    #[tokio::test]
    async fn sends_to_the_room_behind_the_name() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(
                r"^/_matrix/client/v3/rooms/!family:example\.org/send/m\.room\.message/.+$",
            ))
            .and(body_partial_json(
                json!({"msgtype": "m.text", "body": "Dinner at eight"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"event_id": "$e1"})))
            .mount(&server)
            .await;

        let tool = tool_for(&server);
        let out = tool
            .execute(
                &context(),
                json!({"room_name": "Family", "message": "Dinner at eight"}),
            )
            .await
            .expect("send should succeed");

        assert_eq!(out.content, "Message sent successfully.");
    }

    #[tokio::test]
    async fn room_names_match_case_insensitively() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/_matrix/client/v3/rooms/!ana:example\.org/send/.+$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"event_id": "$e2"})))
            .mount(&server)
            .await;

        let tool = tool_for(&server);
        let out = tool
            .execute(&context(), json!({"room_name": "ana", "message": "hi"}))
            .await
            .unwrap();

        assert!(!out.is_error);
    }

    #[tokio::test]
    async fn unknown_room_lists_the_known_ones() {
        let server = MockServer::start().await;
        let tool = tool_for(&server);

        let out = tool
            .execute(&context(), json!({"room_name": "Garage", "message": "hi"}))
            .await
            .unwrap();

        assert!(out.is_error);
        assert!(out.content.contains("unknown room 'Garage'"));
        assert!(out.content.contains("Ana, Family"));
    }

    #[tokio::test]
    async fn server_rejection_becomes_an_apology() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/_matrix/client/v3/rooms/.+$"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let tool = tool_for(&server);
        let err = tool
            .execute(
                &context(),
                json!({"room_name": "Family", "message": "hi"}),
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Sorry, I can't do that.");
    }
}
