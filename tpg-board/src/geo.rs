//! Great-circle distance and proximity ranking over catalog entries.

use crate::catalog::CatalogEntry;

/// Mean Earth radius in kilometres. No ellipsoid correction.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite components.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        if lat.is_finite() && lon.is_finite() {
            Some(Self { lat, lon })
        } else {
            None
        }
    }
}

/// Haversine distance between two coordinates in kilometres.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Rank catalog entries by proximity to `origin`, ascending.
///
/// Entries without a coordinate are excluded before ranking. Ties on exactly
/// equal distance keep the original catalog order (the sort is stable).
/// Returns at most `k` entries.
pub fn nearest<'a>(
    origin: Coordinate,
    entries: impl IntoIterator<Item = &'a CatalogEntry>,
    k: usize,
) -> Vec<(&'a CatalogEntry, f64)> {
    let mut ranked: Vec<(&CatalogEntry, f64)> = entries
        .into_iter()
        .filter_map(|e| {
            let coord = e.coordinate?;
            Some((e, distance_km(origin, coord)))
        })
        .collect();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked.truncate(k);
    ranked
}
