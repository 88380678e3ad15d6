//! Search API response DTOs and the validated station type.
//!
//! The DTOs use `Option` liberally because the API omits fields rather than
//! guaranteeing them; validation happens once, at the boundary.

use serde::Deserialize;

use crate::geo::Coordinate;

/// Response from the `locations` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationsResponse {
    #[serde(default)]
    pub stations: Vec<StationDto>,
}

/// One raw station record.
#[derive(Debug, Clone, Deserialize)]
pub struct StationDto {
    pub id: Option<String>,
    pub name: Option<String>,
    pub coordinate: Option<CoordinateDto>,
}

/// Raw coordinate pair. The API puts longitude in `x` and latitude in `y`.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinateDto {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// A validated station: id and name are guaranteed present and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub id: String,
    pub name: String,
    pub coordinate: Option<Coordinate>,
}

impl Station {
    /// Validate a raw record, dropping it if id or name is missing.
    pub fn from_dto(dto: StationDto) -> Option<Self> {
        let id = dto.id.filter(|s| !s.is_empty())?;
        let name = dto.name.filter(|s| !s.is_empty())?;
        let coordinate = dto
            .coordinate
            .and_then(|c| Coordinate::new(c.y?, c.x?));

        Some(Self {
            id,
            name,
            coordinate,
        })
    }
}

/// Validate a whole response, keeping API order.
pub fn validate_stations(response: LocationsResponse) -> Vec<Station> {
    response
        .stations
        .into_iter()
        .filter_map(Station::from_dto)
        .collect()
}
