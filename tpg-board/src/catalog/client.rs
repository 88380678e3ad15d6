//! HTTP client for the raw stop-catalog feed.

use super::error::CatalogError;

/// Default URL of the published stop catalog.
const DEFAULT_FEED_URL: &str =
    "https://raw.githubusercontent.com/rohanod/arrets/refs/heads/main/arrets.csv";

/// Source of raw catalog feed text. Implemented by the HTTP client and by
/// in-memory stubs in cache tests.
pub trait CatalogFeed: Send + Sync {
    fn fetch_raw(&self) -> impl Future<Output = Result<String, CatalogError>> + Send;
}

/// Configuration for the catalog feed client.
#[derive(Debug, Clone)]
pub struct CatalogClientConfig {
    /// URL of the feed.
    pub url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl CatalogClientConfig {
    /// Set a custom feed URL (for testing).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Client fetching the catalog feed as plain text.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    url: String,
}

impl CatalogClient {
    /// Create a new feed client.
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            url: config.url,
        })
    }
}

impl CatalogFeed for CatalogClient {
    async fn fetch_raw(&self) -> Result<String, CatalogError> {
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Feed {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = CatalogClientConfig::default();
        assert_eq!(config.url, DEFAULT_FEED_URL);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn config_with_url() {
        let config = CatalogClientConfig::default().with_url("http://localhost:8080/feed.csv");
        assert_eq!(config.url, "http://localhost:8080/feed.csv");
    }
}
