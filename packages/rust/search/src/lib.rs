//! Web search provider for salary evidence gathering.
//!
//! [`SearchProvider`] is the narrow collaborator contract the pipeline
//! core depends on: a query in, a ranked list of title/snippet/link
//! triples out. A per-query failure is returned as an error; the caller
//! decides whether that is fatal (the web-evidence stage treats it as an
//! empty result set for the affected query).

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use payscope_shared::{PayscopeError, Result};

/// One raw search result, before salary extraction.
#[derive(Debug, Clone)]
pub struct RawHit {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

/// Narrow search contract consumed by the web-evidence stage.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one query, requesting up to `count` results.
    async fn search(&self, query: &str, count: u32) -> Result<Vec<RawHit>>;
}

// ---------------------------------------------------------------------------
// Custom-search HTTP client
// ---------------------------------------------------------------------------

/// Client for a Google-Custom-Search-style JSON API.
pub struct CseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    engine_id: String,
}

impl CseClient {
    /// Build a client against `base_url` (no trailing slash).
    pub fn new(base_url: &str, api_key: &str, engine_id: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("Payscope/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| PayscopeError::Search(format!("client build: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            engine_id: engine_id.to_string(),
        })
    }
}

/// Response body shape of the custom-search API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Vec<ApiItem>,
}

#[derive(Debug, Deserialize)]
struct ApiItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

#[async_trait]
impl SearchProvider for CseClient {
    async fn search(&self, query: &str, count: u32) -> Result<Vec<RawHit>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.engine_id.as_str()),
                ("q", query),
                ("num", &count.to_string()),
            ])
            .send()
            .await
            .map_err(|e| PayscopeError::Search(format!("'{query}': {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PayscopeError::Search(format!("'{query}': HTTP {status}")));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| PayscopeError::Search(format!("'{query}': invalid response: {e}")))?;

        Ok(body
            .items
            .into_iter()
            .map(|item| RawHit {
                title: item.title,
                snippet: item.snippet,
                link: item.link,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_search_results() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "items": [
                {
                    "title": "Senior Software Engineer Salary in San Francisco",
                    "snippet": "The average total compensation is $340,000 per year.",
                    "link": "https://www.levels.fyi/t/software-engineer"
                },
                {
                    "title": "Engineer pay report",
                    "snippet": "Salaries range from 150k-200k.",
                    "link": "https://www.glassdoor.com/Salaries"
                }
            ]
        });

        Mock::given(method("GET"))
            .and(query_param("q", "senior engineer salary"))
            .and(query_param("num", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let client = CseClient::new(&server.uri(), "test-key", "test-cx").expect("client");
        let hits = client
            .search("senior engineer salary", 5)
            .await
            .expect("search");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].link, "https://www.levels.fyi/t/software-engineer");
        assert!(hits[1].snippet.contains("150k-200k"));
    }

    #[tokio::test]
    async fn missing_items_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = CseClient::new(&server.uri(), "k", "cx").unwrap();
        let hits = client.search("anything", 5).await.expect("search");
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = CseClient::new(&server.uri(), "k", "cx").unwrap();
        let result = client.search("anything", 5).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("403"));
    }
}
