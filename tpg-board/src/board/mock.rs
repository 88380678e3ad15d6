//! Mock departure-board client for testing without API access.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;

use super::DepartureBoard;
use super::convert::{Departure, convert_board};
use super::error::BoardError;
use super::types::StationboardResponse;

/// In-memory board client serving canned stationboard responses.
///
/// Boards are keyed by lower-cased stop name; unknown stops serve an empty
/// board. An optional delay makes the single-flight fetch guard observable
/// in session tests.
#[derive(Clone, Default)]
pub struct MockBoardClient {
    boards: Arc<HashMap<String, StationboardResponse>>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockBoardClient {
    /// Create a mock from stationboard JSON bodies keyed by stop name.
    pub fn from_json(
        boards: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, BoardError> {
        let mut parsed = HashMap::new();
        for (stop, json) in boards {
            let board: StationboardResponse =
                serde_json::from_str(&json).map_err(|e| BoardError::Json {
                    message: format!("mock board for {stop:?}: {e}"),
                })?;
            parsed.insert(stop.to_lowercase(), board);
        }

        Ok(Self {
            boards: Arc::new(parsed),
            ..Self::default()
        })
    }

    /// Delay every request by the given duration.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of board fetches served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DepartureBoard for MockBoardClient {
    async fn departures(
        &self,
        stop_name: &str,
        now: DateTime<Tz>,
    ) -> Result<Vec<Departure>, BoardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self
            .boards
            .get(&stop_name.to_lowercase())
            .map(|board| convert_board(board, now))
            .unwrap_or_default())
    }
}
