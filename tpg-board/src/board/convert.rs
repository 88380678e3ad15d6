//! Conversion of raw stationboard connections into departures.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use super::TIMEZONE;
use super::types::{ConnectionDto, StationboardResponse};

/// Fallback line colours when the feed omits or truncates the pair.
const DEFAULT_BG: &str = "#FF6600";
const DEFAULT_FG: &str = "#FFFFFF";

/// Kind of vehicle serving a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleType {
    Bus,
    Tram,
}

impl VehicleType {
    pub fn label(self) -> &'static str {
        match self {
            VehicleType::Bus => "Bus",
            VehicleType::Tram => "Tram",
        }
    }
}

/// One upcoming departure. Computed fresh on every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub vehicle_type: VehicleType,
    pub line: String,
    pub destination: String,
    /// Absolute departure instant; for immediate departures this is the
    /// fetch time itself.
    pub departure: DateTime<Tz>,
    /// Countdown at the time of the last (re)computation, ceiled to whole
    /// minutes. Negative when the vehicle is overdue.
    pub minutes_until_departure: i64,
    /// The feed flagged this vehicle as leaving right now.
    pub is_immediate: bool,
    pub bg_color: String,
    pub fg_color: String,
}

/// Convert a whole response, dropping records without a usable time,
/// terminal name, or line.
pub fn convert_board(response: &StationboardResponse, now: DateTime<Tz>) -> Vec<Departure> {
    response
        .connections
        .iter()
        .filter_map(|c| convert_connection(c, now))
        .collect()
}

fn convert_connection(dto: &ConnectionDto, now: DateTime<Tz>) -> Option<Departure> {
    let time = dto.time.as_deref()?;
    let destination = dto.terminal.as_ref()?.name.as_deref()?;
    let line = dto.line.as_deref()?;

    // The only accent normalization in the whole pipeline: the feed spells
    // the immediate marker "départ".
    let normalized = time.to_lowercase().replace('é', "e");
    let is_immediate = normalized.contains("depart");

    let departure = if is_immediate {
        now
    } else {
        parse_local_time(time)?
    };

    let vehicle_type = match dto.kind.as_deref() {
        Some("tram") => VehicleType::Tram,
        _ => VehicleType::Bus,
    };

    let (bg_color, fg_color) = parse_colors(dto.color.as_deref());

    Some(Departure {
        vehicle_type,
        line: line.to_string(),
        destination: destination.to_string(),
        departure,
        minutes_until_departure: ceil_minutes(departure - now),
        is_immediate,
        bg_color,
        fg_color,
    })
}

/// Parse a "YYYY-MM-DD HH:MM:SS" local timestamp in the board timezone.
fn parse_local_time(time: &str) -> Option<DateTime<Tz>> {
    let naive = NaiveDateTime::parse_from_str(time.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
    TIMEZONE.from_local_datetime(&naive).earliest()
}

/// Minutes until departure, rounded up (90 s away shows as 2 min, 30 s
/// overdue shows as 0).
fn ceil_minutes(until: Duration) -> i64 {
    let secs = until.num_seconds();
    if secs >= 0 { (secs + 59) / 60 } else { -(-secs / 60) }
}

/// Split a `"bg~fg"` colour pair, prefixing `#` and falling back to the
/// defaults for missing halves.
fn parse_colors(color: Option<&str>) -> (String, String) {
    let Some((bg, rest)) = color.and_then(|c| c.split_once('~')) else {
        return (DEFAULT_BG.to_string(), DEFAULT_FG.to_string());
    };

    let fg = rest.split('~').next().unwrap_or("");

    let bg = match bg.trim() {
        "" => DEFAULT_BG.to_string(),
        hex => format!("#{hex}"),
    };
    let fg = match fg.trim() {
        "" => DEFAULT_FG.to_string(),
        hex => format!("#{hex}"),
    };

    (bg, fg)
}

/// Recompute the countdown of already-fetched departures against a new
/// `now`, without network access. Used by the fast display tick.
pub fn recompute_minutes(departures: &[Departure], now: DateTime<Tz>) -> Vec<Departure> {
    departures
        .iter()
        .map(|d| Departure {
            minutes_until_departure: ceil_minutes(d.departure - now),
            ..d.clone()
        })
        .collect()
}

/// Keep departures whose line matches one of the filters
/// (case-insensitive). An empty filter list keeps everything.
pub fn filter_by_lines(departures: Vec<Departure>, filters: &[String]) -> Vec<Departure> {
    if filters.is_empty() {
        return departures;
    }

    departures
        .into_iter()
        .filter(|d| filters.iter().any(|f| f.eq_ignore_ascii_case(&d.line)))
        .collect()
}
