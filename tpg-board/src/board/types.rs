//! Stationboard API response DTOs.
//!
//! `Option` everywhere: the feed omits fields freely. Records that lack a
//! time or a terminal name are dropped during conversion instead of
//! propagating half-empty departures inward.

use serde::Deserialize;

/// Response from the `stationboard` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StationboardResponse {
    #[serde(default)]
    pub connections: Vec<ConnectionDto>,
}

/// One raw connection on the board.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionDto {
    /// Departure time: a local timestamp, or a literal containing "départ"
    /// for vehicles leaving now.
    pub time: Option<String>,

    /// Line identifier (e.g. "12", "18").
    pub line: Option<String>,

    /// Terminal the vehicle is heading to.
    pub terminal: Option<TerminalDto>,

    /// Transport type ("tram", "bus", ...).
    #[serde(rename = "type")]
    pub kind: Option<String>,

    /// Line colours as a `"bg~fg"` hex pair.
    pub color: Option<String>,
}

/// Destination terminal.
#[derive(Debug, Clone, Deserialize)]
pub struct TerminalDto {
    pub name: Option<String>,
}
