use async_trait::async_trait;
use hearth_agents::{Tool, ToolContext, ToolOutput};
use hearth_common::{Error, Result};
use serde_json::{Value, json};
use std::collections::HashMap;

const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
const RESULT_LIMIT: usize = 3;

#[derive(Debug, serde::Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, serde::Deserialize)]
struct SearchQuery {
    pages: Option<HashMap<String, SearchPage>>,
}

#[derive(Debug, serde::Deserialize)]
struct SearchPage {
    title: Option<String>,
    extract: Option<String>,
    /// Search rank within the result set; the pages map itself is unordered.
    index: Option<i64>,
}

/// Looks up article summaries on Wikipedia.
pub struct WikipediaTool {
    http: reqwest::Client,
    base_url: String,
}

impl Default for WikipediaTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WikipediaTool {
    pub fn new() -> Self {
        Self::with_base_url(WIKIPEDIA_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn description(&self) -> &str {
        "A wrapper around Wikipedia. Useful for when you need to answer \
         general questions about people, places, companies, facts, \
         historical events, or other subjects. Input should be a search \
         query."
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

        let resp = self
            .http
            .get(&self.base_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrlimit", &RESULT_LIMIT.to_string()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
            ])
            .send()
            .await
            .map_err(|e| Error::Tool(format!("wikipedia request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::Tool(format!(
                "wikipedia call failed ({})",
                resp.status()
            )));
        }

        let payload: SearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::Tool(format!("failed to parse wikipedia response: {e}")))?;

        let mut pages: Vec<SearchPage> = payload
            .query
            .and_then(|q| q.pages)
            .map(|pages| pages.into_values().collect())
            .unwrap_or_default();
        if pages.is_empty() {
            return Ok(ToolOutput::success("No good Wikipedia Search Result was found"));
        }
        pages.sort_by_key(|page| page.index.unwrap_or(i64::MAX));

        let blocks: Vec<String> = pages
            .into_iter()
            .map(|page| {
                format!(
                    "Page: {}\nSummary: {}",
                    page.title.unwrap_or_default(),
                    page.extract.unwrap_or_default().trim()
                )
            })
            .collect();

        Ok(ToolOutput::success(blocks.join("\n\n")))
    }
}
