//! Live station-search client with a short-TTL response cache.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::geo::Coordinate;

use super::StationSearch;
use super::error::SearchError;
use super::types::{LocationsResponse, Station, validate_stations};

/// Default base URL of the locations endpoint.
const DEFAULT_BASE_URL: &str = "https://transport.opendata.ch/v1/locations";

/// Configuration for the search client.
#[derive(Debug, Clone)]
pub struct SearchClientConfig {
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// TTL for cached responses.
    pub cache_ttl: Duration,
    /// Maximum number of cached responses.
    pub cache_capacity: u64,
}

impl Default for SearchClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            cache_ttl: Duration::from_secs(60),
            cache_capacity: 256,
        }
    }
}

impl SearchClientConfig {
    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Client for the station-search API.
///
/// The suggestion pipeline confirms several candidates per keystroke, so
/// identical queries within a short window are served from a moka cache.
#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    cache: MokaCache<String, Arc<Vec<Station>>>,
}

impl SearchClient {
    /// Create a new search client.
    pub fn new(config: SearchClientConfig) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let cache = MokaCache::builder()
            .time_to_live(config.cache_ttl)
            .max_capacity(config.cache_capacity)
            .build();

        Ok(Self {
            http,
            base_url: config.base_url,
            cache,
        })
    }

    async fn fetch(&self, query_pairs: &[(&str, String)]) -> Result<Vec<Station>, SearchError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(query_pairs)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let parsed: LocationsResponse =
            serde_json::from_str(&body).map_err(|e| SearchError::Json {
                message: e.to_string(),
            })?;

        Ok(validate_stations(parsed))
    }
}

impl StationSearch for SearchClient {
    async fn search(&self, query: &str) -> Result<Vec<Station>, SearchError> {
        let key = format!("q:{}", query);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached.as_ref().clone());
        }

        let stations = self
            .fetch(&[
                ("query", query.to_string()),
                ("type", "station".to_string()),
            ])
            .await?;

        self.cache.insert(key, Arc::new(stations.clone())).await;
        Ok(stations)
    }

    async fn nearby(&self, origin: Coordinate, limit: u16) -> Result<Vec<Station>, SearchError> {
        let key = format!("xy:{:.6},{:.6},{}", origin.lon, origin.lat, limit);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached.as_ref().clone());
        }

        // The API takes longitude as x and latitude as y.
        let stations = self
            .fetch(&[
                ("x", origin.lon.to_string()),
                ("y", origin.lat.to_string()),
                ("limit", limit.to_string()),
                ("type", "station".to_string()),
            ])
            .await?;

        self.cache.insert(key, Arc::new(stations.clone())).await;
        Ok(stations)
    }
}
