//! Live stationboard HTTP client.

use chrono::DateTime;
use chrono_tz::Tz;

use super::DepartureBoard;
use super::convert::{Departure, convert_board};
use super::error::BoardError;
use super::types::StationboardResponse;

/// Default base URL of the stationboard endpoint.
const DEFAULT_BASE_URL: &str = "https://search.ch/timetable/api/stationboard.fr.json";

/// How many connections to request per board.
const DEFAULT_LIMIT: u16 = 300;

/// Configuration for the stationboard client.
#[derive(Debug, Clone)]
pub struct BoardClientConfig {
    /// Base URL for the API.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Number of connections to request.
    pub limit: u16,
}

impl Default for BoardClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl BoardClientConfig {
    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Client for the departure-board API.
#[derive(Debug, Clone)]
pub struct BoardClient {
    http: reqwest::Client,
    base_url: String,
    limit: u16,
}

impl BoardClient {
    /// Create a new stationboard client.
    pub fn new(config: BoardClientConfig) -> Result<Self, BoardError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            limit: config.limit,
        })
    }
}

impl DepartureBoard for BoardClient {
    async fn departures(
        &self,
        stop_name: &str,
        now: DateTime<Tz>,
    ) -> Result<Vec<Departure>, BoardError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("stop", stop_name.to_string()),
                ("limit", self.limit.to_string()),
                ("show_delays", "1".to_string()),
                ("transportation_types", "tram,bus".to_string()),
                ("mode", "depart".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BoardError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let board: StationboardResponse =
            serde_json::from_str(&body).map_err(|e| BoardError::Json {
                message: e.to_string(),
            })?;

        Ok(convert_board(&board, now))
    }
}
