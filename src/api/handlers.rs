//! API Handlers
//!
//! HTTP request handlers for each cache service endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::Value;

use crate::cache::{DurableStore, FileStore, MultiLayerCache, DEFAULT_PRIORITY};
use crate::config::Config;
use crate::connection::{ConnectionMonitor, ConnectionSignal};
use crate::error::{CacheError, Result};
use crate::models::{
    ConnectionResponse, ConnectionUpdate, FetchQuery, FetchResponse, HealthResponse,
    HistoryRequest, HistoryResponse, HoverRequest, KeyQuery, MessageResponse, PrefetchRequest,
    PrefetchResponse, SetRequest, StatsResponse,
};
use crate::prefetch::{
    HttpFetcher, PrefetchEngine, ResourceFetcher, HISTORY_PRIORITY, HOVER_PRIORITY,
};

/// Application state shared across all handlers.
///
/// One cache, one prefetch engine and one connection monitor per process,
/// all sharing the same durable store.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<MultiLayerCache>,
    pub prefetch: PrefetchEngine,
    pub fetcher: Arc<dyn ResourceFetcher>,
    pub connection: Arc<ConnectionMonitor>,
    pub default_ttl: Duration,
}

impl AppState {
    /// Wires the services around an existing store and fetcher.
    pub fn new(
        store: Arc<dyn DurableStore>,
        fetcher: Arc<dyn ResourceFetcher>,
        connection: Arc<ConnectionMonitor>,
        config: &Config,
    ) -> Self {
        let cache = Arc::new(MultiLayerCache::new(store.clone()));
        let prefetch = PrefetchEngine::with_config(
            store,
            fetcher.clone(),
            connection.clone(),
            config.prefetch_config(),
        );

        Self {
            cache,
            prefetch,
            fetcher,
            connection,
            default_ttl: config.default_ttl(),
        }
    }

    /// Opens the file store and builds the HTTP fetcher from configuration.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = FileStore::open(&config.cache_dir, config.durable_capacity).await?;
        let fetcher = HttpFetcher::new(config.fetch_timeout())?;
        let connection = ConnectionMonitor::new(config.connection_type.clone());

        Ok(Self::new(
            Arc::new(store),
            Arc::new(fetcher),
            Arc::new(connection),
            config,
        ))
    }
}

fn check(error: Option<String>) -> Result<()> {
    match error {
        Some(message) => Err(CacheError::InvalidRequest(message)),
        None => Ok(()),
    }
}

/// Handler for GET /fetch?url=
///
/// Read-through: fast layer, durable store, then the upstream URL.
pub async fn fetch_handler(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<FetchResponse>> {
    check(query.validate())?;

    let fetcher = state.fetcher.clone();
    let target = query.url.clone();
    let value: Value = state
        .cache
        .get_with_ttl(&query.url, state.default_ttl, move || async move {
            fetcher.fetch_json(&target).await
        })
        .await?;

    Ok(Json(FetchResponse::new(query.url, value)))
}

/// Handler for PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<MessageResponse>> {
    check(req.validate())?;

    let ttl = req
        .ttl_ms
        .map(Duration::from_millis)
        .unwrap_or(state.default_ttl);
    let priority = req.priority.unwrap_or(DEFAULT_PRIORITY);
    state.cache.set_with(&req.key, &req.value, ttl, priority).await?;

    Ok(Json(MessageResponse::set(req.key)))
}

/// Handler for DELETE /invalidate?key=
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<MessageResponse>> {
    check(query.validate())?;
    state.cache.invalidate(&query.key).await?;

    Ok(Json(MessageResponse::invalidated(query.key)))
}

/// Handler for DELETE /clear
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    state.cache.clear().await?;
    Ok(Json(MessageResponse::cleared()))
}

/// Handler for POST /prefetch
pub async fn prefetch_handler(
    State(state): State<AppState>,
    Json(req): Json<PrefetchRequest>,
) -> Result<Json<PrefetchResponse>> {
    check(req.validate())?;

    let priority = req.priority.unwrap_or(HISTORY_PRIORITY);
    let queued = state.prefetch.add(req.url.clone(), priority);

    Ok(Json(PrefetchResponse {
        url: req.url,
        priority,
        queued,
    }))
}

/// Handler for POST /prefetch/hover
pub async fn hover_handler(
    State(state): State<AppState>,
    Json(req): Json<HoverRequest>,
) -> Result<Json<PrefetchResponse>> {
    check(req.validate())?;

    let queued = state.prefetch.on_hover(req.url.clone());

    Ok(Json(PrefetchResponse {
        url: req.url,
        priority: HOVER_PRIORITY,
        queued,
    }))
}

/// Handler for POST /prefetch/history
pub async fn history_handler(
    State(state): State<AppState>,
    Json(req): Json<HistoryRequest>,
) -> Result<Json<HistoryResponse>> {
    check(req.validate())?;

    let total = req.urls.len();
    let queued = state.prefetch.prefetch_from_history(req.urls);

    Ok(Json(HistoryResponse {
        queued,
        dropped: total - queued,
    }))
}

/// Handler for GET /connection
pub async fn connection_handler(State(state): State<AppState>) -> Json<ConnectionResponse> {
    Json(ConnectionResponse {
        effective_type: state.connection.effective_type(),
        quality: state.connection.quality(),
    })
}

/// Handler for PUT /connection
///
/// The host app reports network changes here; prefetch gating picks them
/// up on the next enqueue.
pub async fn update_connection_handler(
    State(state): State<AppState>,
    Json(update): Json<ConnectionUpdate>,
) -> Json<ConnectionResponse> {
    state.connection.report(update.effective_type);
    connection_handler(State(state)).await
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.stats(),
        state.cache.fast_len(),
        state.prefetch.stats(),
        state.prefetch.queue_len(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::connection::ConnectionQuality;
    use async_trait::async_trait;
    use serde_json::json;

    /// Echoes the URL back, or fails for URLs containing "fail".
    struct EchoFetcher;

    #[async_trait]
    impl ResourceFetcher for EchoFetcher {
        async fn fetch_json(&self, url: &str) -> Result<Value> {
            if url.contains("fail") {
                return Err(CacheError::UpstreamStatus {
                    url: url.to_string(),
                    status: 500,
                });
            }
            Ok(json!({ "echo": url }))
        }
    }

    fn test_state() -> AppState {
        AppState::new(
            Arc::new(MemoryStore::new(100)),
            Arc::new(EchoFetcher),
            Arc::new(ConnectionMonitor::default()),
            &Config::default(),
        )
    }

    #[tokio::test]
    async fn test_fetch_handler_reads_through() {
        let state = test_state();
        let url = "https://api.example.com/videos".to_string();

        let response = fetch_handler(State(state.clone()), Query(FetchQuery { url: url.clone() }))
            .await
            .unwrap();

        assert_eq!(response.value["echo"], url.as_str());
        assert!(state.cache.contains_fast(&url));
    }

    #[tokio::test]
    async fn test_fetch_handler_upstream_failure() {
        let state = test_state();
        let query = FetchQuery {
            url: "https://api.example.com/fail".into(),
        };

        let result = fetch_handler(State(state.clone()), Query(query)).await;

        assert!(matches!(result, Err(CacheError::UpstreamStatus { status: 500, .. })));
        assert_eq!(state.cache.fast_len(), 0);
    }

    #[tokio::test]
    async fn test_set_then_fetch_uses_cache() {
        let state = test_state();
        let url = "https://api.example.com/fail/but/cached".to_string();
        let req = SetRequest {
            key: url.clone(),
            value: json!({"cached": true}),
            ttl_ms: None,
            priority: Some(3),
        };
        set_handler(State(state.clone()), Json(req)).await.unwrap();

        let response = fetch_handler(State(state), Query(FetchQuery { url })).await.unwrap();
        assert_eq!(response.value, json!({"cached": true}));
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state();
        let req = SetRequest {
            key: "".to_string(),
            value: json!("value"),
            ttl_ms: None,
            priority: None,
        };

        let result = set_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_invalidate_clears_fast_layer() {
        let state = test_state();
        state.cache.set("a", &1).await.unwrap();
        state.cache.set("b", &2).await.unwrap();

        invalidate_handler(State(state.clone()), Query(KeyQuery { key: "a".into() }))
            .await
            .unwrap();

        assert_eq!(state.cache.fast_len(), 0);
        assert!(state.cache.durable().get("a").await.unwrap().is_none());
        assert!(state.cache.durable().get("b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_history_handler_counts_dropped_on_slow_link() {
        let state = test_state();
        update_connection_handler(
            State(state.clone()),
            Json(ConnectionUpdate {
                effective_type: Some("2g".into()),
            }),
        )
        .await;

        let req = HistoryRequest {
            urls: vec!["https://a.example/1".into(), "https://a.example/2".into()],
        };
        let response = history_handler(State(state), Json(req)).await.unwrap();

        assert_eq!(response.queued, 0);
        assert_eq!(response.dropped, 2);
    }

    #[tokio::test]
    async fn test_hover_handler_queues() {
        let state = test_state();
        let req = HoverRequest {
            url: "https://api.example.com/articles/3".into(),
        };

        let response = hover_handler(State(state.clone()), Json(req)).await.unwrap();
        assert!(response.queued);
        assert_eq!(response.priority, HOVER_PRIORITY);

        state.prefetch.wait_idle().await;
        assert_eq!(state.prefetch.stats().stored, 1);
    }

    #[tokio::test]
    async fn test_connection_handler_default_medium() {
        let response = connection_handler(State(test_state())).await;
        assert_eq!(response.quality, ConnectionQuality::Medium);
        assert!(response.effective_type.is_none());
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let response = stats_handler(State(test_state())).await;
        assert_eq!(response.cache.fetches, 0);
        assert_eq!(response.prefetch_queued, 0);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
