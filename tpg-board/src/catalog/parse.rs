//! Parser for the semicolon-delimited stop feed.

use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// One stop record from the catalog feed.
///
/// Only active entries participate in matching. Entries are recreated
/// wholesale on every cache refresh, never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub stop_name: String,
    pub municipality: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinate: Option<Coordinate>,
    pub active: bool,
}

impl CatalogEntry {
    /// "municipality, stopName" form used for display and API confirmation.
    pub fn full_name(&self) -> String {
        format!("{}, {}", self.municipality, self.stop_name)
    }
}

/// Parse the raw feed text into catalog entries.
///
/// The feed has a header row (skipped) and semicolon-delimited records.
/// Columns used, 0-indexed: [1] stop name, [2] municipality, [5] "lat,lon",
/// [6] "Y" for active. Anything past index 6 is ignored. Records with fewer
/// than 7 columns, or with an empty name or municipality, are dropped.
pub fn parse_catalog(raw: &str) -> Vec<CatalogEntry> {
    raw.lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_record)
        .collect()
}

fn parse_record(line: &str) -> Option<CatalogEntry> {
    let parts: Vec<&str> = line.split(';').collect();
    if parts.len() < 7 {
        return None;
    }

    let stop_name = parts[1].trim();
    let municipality = parts[2].trim();
    if stop_name.is_empty() || municipality.is_empty() {
        return None;
    }

    Some(CatalogEntry {
        stop_name: stop_name.to_string(),
        municipality: municipality.to_string(),
        coordinate: parse_coordinate(parts[5]),
        active: parts[6].trim() == "Y",
    })
}

/// Parse a "lat,lon" pair; anything that does not yield two finite numbers
/// leaves the entry coordinate-less rather than failing the record.
fn parse_coordinate(field: &str) -> Option<Coordinate> {
    let mut nums = field.split(',');
    let lat: f64 = nums.next()?.trim().parse().ok()?;
    let lon: f64 = nums.next()?.trim().parse().ok()?;
    Coordinate::new(lat, lon)
}
