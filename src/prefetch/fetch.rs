//! Resource fetching
//!
//! The network side of a cache miss: GET a URL and parse its JSON body.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::{CacheError, Result};

/// Fetches a URL and returns its parsed JSON body.
///
/// Non-success statuses and unparseable bodies are errors.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value>;
}

// == HTTP Fetcher ==
/// [`ResourceFetcher`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a client with the given transport timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Internal(format!("HTTP client error: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| CacheError::Request(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| CacheError::Request(format!("{}: {}", url, e)))?;
        debug!(url, bytes = body.len(), "Fetched resource");

        serde_json::from_slice(&body).map_err(|e| CacheError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_json_success() {
        let base = serve(Router::new().route(
            "/videos",
            get(|| async { Json(json!([{"id": 1, "title": "Torts 101"}])) }),
        ))
        .await;

        let value = fetcher().fetch_json(&format!("{}/videos", base)).await.unwrap();
        assert_eq!(value[0]["title"], "Torts 101");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let base = serve(Router::new().route(
            "/gone",
            get(|| async { (StatusCode::NOT_FOUND, "missing") }),
        ))
        .await;

        let err = fetcher().fetch_json(&format!("{}/gone", base)).await.unwrap_err();
        assert!(matches!(err, CacheError::UpstreamStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let base = serve(Router::new().route("/html", get(|| async { "<html></html>" }))).await;

        let err = fetcher().fetch_json(&format!("{}/html", base)).await.unwrap_err();
        assert!(matches!(err, CacheError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = fetcher()
            .fetch_json(&format!("http://{}/x", addr))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Request(_)));
    }
}
