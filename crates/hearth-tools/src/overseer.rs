use async_trait::async_trait;
use hearth_agents::{Tool, ToolContext, ToolOutput};
use hearth_common::{Error, Result};
use hearth_config::OverseerrConfig;
use reqwest::Url;
use serde_json::{Value, json};
use std::sync::Arc;

/// Shared Overseerr handle. Overseerr authenticates with a static
/// `X-Api-Key` header rather than a bearer token.
pub struct OverseerrApi {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OverseerrApi {
    pub fn new(config: &OverseerrConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    async fn get(&self, url: Url) -> Result<Value> {
        let resp = self
            .http
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("overseerr request failed: {e}")))?;
        Self::read_json(resp).await
    }

    async fn post(&self, url: Url, body: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(url)
            .header("X-Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Tool(format!("overseerr request failed: {e}")))?;
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
            .map_err(|e| Error::Tool(format!("failed to parse overseerr response: {e}")))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Tool(format!("bad overseerr url: {e}")))?;
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|_| Error::Tool("failed to build overseerr url path".to_string()))?;
            parts.extend(["api", "v1"]);
            parts.extend(segments);
        }
        Ok(url)
    }
}

/// Searches the media library for movies and series.
pub struct OverseerSearchTool {
    api: Arc<OverseerrApi>,
}

impl OverseerSearchTool {
    pub fn new(api: Arc<OverseerrApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for OverseerSearchTool {
    fn name(&self) -> &str {
        "overseer_search"
    }

    fn description(&self) -> &str {
        "Returns a list of movies or TV shows and their information given a search query."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Tool("missing required 'query'".to_string()))?;

        let mut url = self.api.endpoint(&["search"])?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("page", "1")
            .append_pair("language", "en");

        let payload = self.api.get(url).await?;
        let results: Vec<Value> = payload["results"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        json!({
                            "id": item["id"],
                            // Movies carry "title", series carry "name".
                            "title": item["title"].as_str().or(item["name"].as_str()),
                            "overview": item["overview"],
                            "popularity": item["popularity"],
                            "releaseDate": item["releaseDate"]
                                .as_str()
                                .or(item["firstAirDate"].as_str()),
                            "voteAverage": item["voteAverage"],
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ToolOutput::success(
            serde_json::to_string_pretty(&results)
                .unwrap_or_else(|_| "{\"error\":\"failed to serialize results\"}".to_string()),
        ))
    }
}

/// Requests a movie or series for download.
pub struct OverseerDownloadTool {
    api: Arc<OverseerrApi>,
}

impl OverseerDownloadTool {
    pub fn new(api: Arc<OverseerrApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for OverseerDownloadTool {
    fn name(&self) -> &str {
        "overseer_download"
    }

    fn description(&self) -> &str {
        "Download a movie or TV series by its ID."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "media_id": {
                    "type": "integer",
                    "description": "The movie or TV series ID. To discover it, use overseer_search."
                },
                "media_type": {
                    "type": "string",
                    "enum": ["movie", "tv"],
                    "description": "If it's a movie or TV series."
                }
            },
            "required": ["media_id", "media_type"]
        })
    }

    async fn execute(&self, _context: &ToolContext, args: Value) -> Result<ToolOutput> {
        let media_id = args
            .get("media_id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| Error::Tool("missing required 'media_id'".to_string()))?;
        let media_type = args
            .get("media_type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Tool("missing required 'media_type'".to_string()))?;
        if !matches!(media_type, "movie" | "tv") {
            return Err(Error::Tool(format!(
                "unknown media_type '{media_type}': use 'movie' or 'tv'"
            )));
        }

        let mut body = json!({ "mediaId": media_id, "mediaType": media_type });
        if media_type == "tv" {
            // Season one only; further seasons are requested on demand.
            body["seasons"] = json!([1]);
        }

        let url = self.api.endpoint(&["request"])?;
        self.api.post(url, &body).await?;

        Ok(ToolOutput::success("OK, it will be downloaded"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api_for(server: &MockServer) -> Arc<OverseerrApi> {
        Arc::new(OverseerrApi::new(&OverseerrConfig {
            base_url: server.uri(),
            api_key: "ov-key".to_string(),
        }))
    }

    fn context() -> ToolContext {
        ToolContext::new("test-session")
    }

    #[tokio::test]
    async fn search_maps_movies_and_series() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .and(query_param("query", "dune"))
            .and(query_param("page", "1"))
            .and(query_param("language", "en"))
            .and(header("X-Api-Key", "ov-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": 438631, "mediaType": "movie", "title": "Dune", "releaseDate": "2021-09-15", "overview": "Desert planet.", "popularity": 120.5, "voteAverage": 7.8},
                    {"id": 90228, "mediaType": "tv", "name": "Dune: Prophecy", "firstAirDate": "2024-11-17", "overview": "Sisterhood origins.", "popularity": 88.2, "voteAverage": 7.1}
                ]
            })))
            .mount(&server)
            .await;

        let tool = OverseerSearchTool::new(api_for(&server));
        let out = tool
            .execute(&context(), json!({"query": "dune"}))
            .await
            .expect("search should succeed");

        let parsed: Value = serde_json::from_str(&out.content).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        assert_eq!(parsed[0]["title"], "Dune");
        assert_eq!(parsed[0]["voteAverage"], 7.8);
        // The series entry falls back to "name" and "firstAirDate".
        assert_eq!(parsed[1]["title"], "Dune: Prophecy");
        assert_eq!(parsed[1]["releaseDate"], "2024-11-17");
        assert_eq!(parsed[1]["popularity"], 88.2);
    }

    #[tokio::test]
    async fn error_status_becomes_a_spoken_apology() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let tool = OverseerSearchTool::new(api_for(&server));
        let err = tool
            .execute(&context(), json!({"query": "dune"}))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Sorry, I can't do that (got error 502)");
    }

    #[tokio::test]
    async fn download_requests_season_one_for_series() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/request"))
            .and(body_partial_json(
                json!({"mediaId": 90228, "mediaType": "tv", "seasons": [1]}),
            ))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
            .mount(&server)
            .await;

        let tool = OverseerDownloadTool::new(api_for(&server));
        let out = tool
            .execute(&context(), json!({"media_id": 90228, "media_type": "tv"}))
            .await
            .unwrap();

        assert_eq!(out.content, "OK, it will be downloaded");
    }

    #[tokio::test]
    async fn movie_downloads_carry_no_season_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/request"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 8})))
            .mount(&server)
            .await;

        let tool = OverseerDownloadTool::new(api_for(&server));
        tool.execute(&context(), json!({"media_id": 438631, "media_type": "movie"}))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["mediaId"], 438631);
        assert!(body.get("seasons").is_none());
    }

    #[tokio::test]
    async fn unknown_media_type_is_rejected() {
        let server = MockServer::start().await;
        let tool = OverseerDownloadTool::new(api_for(&server));

        let err = tool
            .execute(&context(), json!({"media_id": 1, "media_type": "podcast"}))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("unknown media_type"));
    }
}
