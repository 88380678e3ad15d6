//! Mock station-search client for testing without API access.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::geo::Coordinate;

use super::StationSearch;
use super::error::SearchError;
use super::types::Station;

/// In-memory search client serving canned responses.
///
/// Queries are matched case-insensitively; unknown queries return an empty
/// list. An optional artificial delay makes in-flight cancellation
/// observable in pipeline tests.
#[derive(Clone, Default)]
pub struct MockSearchClient {
    by_query: Arc<HashMap<String, Vec<Station>>>,
    nearby: Arc<Vec<Station>>,
    delay: Option<Duration>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockSearchClient {
    /// Create a mock with responses keyed by query text.
    pub fn new(responses: impl IntoIterator<Item = (String, Vec<Station>)>) -> Self {
        let by_query = responses
            .into_iter()
            .map(|(q, stations)| (q.to_lowercase(), stations))
            .collect();

        Self {
            by_query: Arc::new(by_query),
            ..Self::default()
        }
    }

    /// Set the response for coordinate queries.
    pub fn with_nearby(mut self, stations: Vec<Station>) -> Self {
        self.nearby = Arc::new(stations);
        self
    }

    /// Delay every request by the given duration.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every request with an API error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of requests served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Convenience constructor for a station without coordinates.
    pub fn station(id: &str, name: &str) -> Station {
        Station {
            id: id.to_string(),
            name: name.to_string(),
            coordinate: None,
        }
    }

    /// Convenience constructor for a station with coordinates.
    pub fn station_at(id: &str, name: &str, lat: f64, lon: f64) -> Station {
        Station {
            id: id.to_string(),
            name: name.to_string(),
            coordinate: Coordinate::new(lat, lon),
        }
    }
}

impl StationSearch for MockSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<Station>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(SearchError::Api {
                status: 503,
                message: "mock failure".to_string(),
            });
        }

        Ok(self
            .by_query
            .get(&query.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn nearby(&self, _origin: Coordinate, limit: u16) -> Result<Vec<Station>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(SearchError::Api {
                status: 503,
                message: "mock failure".to_string(),
            });
        }

        Ok(self.nearby.iter().take(limit as usize).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_canned_responses_case_insensitively() {
        let mock = MockSearchClient::new([(
            "cornavin".to_string(),
            vec![MockSearchClient::station("1", "Genève, Cornavin")],
        )]);

        let hits = mock.search("Cornavin").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Genève, Cornavin");
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_query_is_empty() {
        let mock = MockSearchClient::default();
        assert!(mock.search("nothing").await.unwrap().is_empty());
    }
}
