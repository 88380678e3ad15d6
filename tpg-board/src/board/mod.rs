//! Departure-board client (search.ch `stationboard` endpoint).
//!
//! Key characteristics of the feed:
//! - Times are local Europe/Zurich wall-clock timestamps, except for a
//!   literal "départ" marker on vehicles leaving right now.
//! - Line colours arrive as an optional `"bg~fg"` hex pair.
//! - Departures are computed fresh on every fetch and never persisted;
//!   the fast display tick recomputes countdown minutes from the original
//!   timestamps without touching the network.

mod client;
mod convert;
mod error;
pub mod mock;
mod types;

pub use client::{BoardClient, BoardClientConfig};
pub use convert::{Departure, VehicleType, convert_board, filter_by_lines, recompute_minutes};
pub use error::BoardError;
pub use types::{ConnectionDto, StationboardResponse, TerminalDto};

use chrono::DateTime;
use chrono_tz::Tz;

/// All departure times are interpreted in this timezone.
pub const TIMEZONE: Tz = chrono_tz::Europe::Zurich;

/// Seam between the live stationboard client and test mocks.
pub trait DepartureBoard: Send + Sync {
    /// Fetch the departure board for a resolved stop name. `now` anchors
    /// the countdown computation.
    fn departures(
        &self,
        stop_name: &str,
        now: DateTime<Tz>,
    ) -> impl Future<Output = Result<Vec<Departure>, BoardError>> + Send;
}
