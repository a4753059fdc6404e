//! Web search capability and the Serper adapter.

use std::time::Duration;

use async_trait::async_trait;
use outreach_shared::{Result, SearchHit};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::http::{build_client, ensure_success, network_error, read_json};

/// Runs a web search and returns organic results.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `query`, returning at most `num_results` organic hits.
    async fn search(&self, query: &str, num_results: u32) -> Result<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// Serper
// ---------------------------------------------------------------------------

/// Google search through the Serper API.
pub struct SerperSearch {
    api_key: String,
    base_url: String,
    client: Client,
}

impl SerperSearch {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: u32,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SearchHit>,
}

#[async_trait]
impl SearchProvider for SerperSearch {
    #[instrument(skip_all, fields(query = %query))]
    async fn search(&self, query: &str, num_results: u32) -> Result<Vec<SearchHit>> {
        let endpoint = format!("{}/search", self.base_url);

        let response = self
            .client
            .post(&endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SerperRequest {
                q: query,
                num: num_results,
            })
            .send()
            .await
            .map_err(|e| network_error(&endpoint, e))?;

        let response = ensure_success(&endpoint, response).await?;
        let parsed: SerperResponse = read_json(&endpoint, response).await?;

        debug!(hits = parsed.organic.len(), "search complete");
        Ok(parsed.organic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outreach_shared::OutreachError;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn serper(server: &MockServer) -> SerperSearch {
        SerperSearch::new("test-key", server.uri(), Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn search_returns_organic_hits() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-API-KEY", "test-key"))
            .and(body_json(serde_json::json!({"q": "rucking blogs", "num": 100})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "searchParameters": {"q": "rucking blogs"},
                "organic": [
                    {"title": "Ruck Life", "link": "https://rucklife.example/post", "snippet": "All about rucking", "position": 1},
                    {"title": "No snippet", "link": "https://other.example/", "position": 2}
                ]
            })))
            .mount(&server)
            .await;

        let hits = serper(&server).search("rucking blogs", 100).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].link, "https://rucklife.example/post");
        assert_eq!(hits[1].snippet, "");
        assert_eq!(hits[1].position, 2);
    }

    #[tokio::test]
    async fn missing_organic_is_empty() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let hits = serper(&server).search("anything", 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn server_error_is_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = serper(&server).search("anything", 10).await.unwrap_err();
        assert!(matches!(err, OutreachError::Provider(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = serper(&server).search("anything", 10).await.unwrap_err();
        assert!(matches!(err, OutreachError::Parse { .. }));
    }
}
