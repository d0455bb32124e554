//! Manticore Search backend over its HTTP JSON API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SearchIndexConfig;
use crate::metrics;

use super::{IndexQuery, SearchError, SearchIndex};

/// Manticore HTTP client.
pub struct ManticoreIndex {
    client: Client,
    config: SearchIndexConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Hits,
}

#[derive(Debug, Default, Deserialize)]
struct Hits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: Value,
}

impl Hit {
    /// Document id; newer servers send it as a string.
    fn release_id(&self) -> Option<i64> {
        match &self.id {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

fn map_send_error(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout
    } else if e.is_connect() {
        SearchError::ConnectionFailed(e.to_string())
    } else {
        SearchError::ApiError(e.to_string())
    }
}

fn result_label(result: &Result<(), SearchError>) -> &'static str {
    match result {
        Ok(()) => "ok",
        Err(SearchError::Timeout) => "timeout",
        Err(_) => "error",
    }
}

impl ManticoreIndex {
    pub fn new(config: SearchIndexConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .build()
            .map_err(|e| SearchError::ConnectionFailed(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<reqwest::Response, SearchError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(response)
    }

    async fn run_search(&self, query: &IndexQuery) -> Result<Vec<i64>, SearchError> {
        if !query.has_terms() {
            return Ok(Vec::new());
        }
        let query_string = query.to_query_string()?;

        let index = if query.index.is_empty() {
            self.config.index.as_str()
        } else {
            query.index.as_str()
        };
        let limit = match query.limit {
            0 => self.config.max_matches,
            n => n.min(self.config.max_matches),
        };

        debug!(index = index, query = %query_string, "Searching Manticore");

        let body = json!({
            "index": index,
            "query": { "query_string": query_string },
            "limit": limit,
            "max_matches": limit,
            "_source": false,
        });

        let response: SearchResponse = self
            .post("search", &body)
            .await?
            .json()
            .await
            .map_err(|e| SearchError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(response
            .hits
            .hits
            .iter()
            .filter_map(Hit::release_id)
            .collect())
    }
}

#[async_trait]
impl SearchIndex for ManticoreIndex {
    async fn search(&self, query: &IndexQuery) -> Result<Vec<i64>, SearchError> {
        let result = self.run_search(query).await;

        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        metrics::SEARCH_INDEX_REQUESTS
            .with_label_values(&[result_label(&outcome)])
            .inc();

        match &result {
            Ok(ids) => debug!(matches = ids.len(), "Manticore search finished"),
            Err(e) => warn!(error = %e, "Manticore search failed"),
        }
        result
    }

    async fn delete_document(&self, release_id: i64) -> Result<(), SearchError> {
        let body = json!({
            "index": self.config.index,
            "id": release_id,
        });
        let result = self.post("delete", &body).await.map(|_| ());
        metrics::SEARCH_INDEX_REQUESTS
            .with_label_values(&[result_label(&result)])
            .inc();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_ids_accept_numbers_and_strings() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"took":1,"timed_out":false,"hits":{"total":3,"hits":[
                {"_id":12,"_score":1},
                {"_id":"7","_score":1},
                {"_id":"x","_score":1}
            ]}}"#,
        )
        .unwrap();
        let ids: Vec<i64> = response.hits.hits.iter().filter_map(Hit::release_id).collect();
        assert_eq!(ids, vec![12, 7]);
    }

    #[test]
    fn test_empty_response_body() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.hits.hits.is_empty());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let index = ManticoreIndex::new(SearchIndexConfig {
            url: "http://127.0.0.1:9308/".to_string(),
            ..SearchIndexConfig::default()
        })
        .unwrap();
        assert_eq!(index.endpoint("search"), "http://127.0.0.1:9308/search");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let index = ManticoreIndex::new(SearchIndexConfig {
            url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 2,
            ..SearchIndexConfig::default()
        })
        .unwrap();
        let result = index
            .search(&IndexQuery::text("releases_rt", "ubuntu", &["searchname"], 10))
            .await;
        assert!(matches!(
            result,
            Err(SearchError::ConnectionFailed(_)) | Err(SearchError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_blank_query_skips_request() {
        let index = ManticoreIndex::new(SearchIndexConfig {
            url: "http://127.0.0.1:1".to_string(),
            ..SearchIndexConfig::default()
        })
        .unwrap();
        let ids = index
            .search(&IndexQuery::text("releases_rt", "  ", &[], 10))
            .await
            .unwrap();
        assert!(ids.is_empty());
    }
}
