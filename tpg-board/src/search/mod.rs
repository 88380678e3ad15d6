//! Station-search API client (transport.opendata.ch `locations` endpoint).
//!
//! Supports query-by-text and query-by-coordinate. Responses are validated
//! at the boundary: records without an id or a name are dropped rather than
//! propagated. The live client keeps a short-TTL response cache because the
//! suggestion pipeline confirms several candidates per keystroke.

mod client;
mod error;
pub mod mock;
mod types;

pub use client::{SearchClient, SearchClientConfig};
pub use error::SearchError;
pub use types::{LocationsResponse, Station, StationDto};

use crate::geo::Coordinate;

/// Seam between the live search client and test mocks.
pub trait StationSearch: Send + Sync {
    /// Search stations by free-text query.
    fn search(&self, query: &str)
    -> impl Future<Output = Result<Vec<Station>, SearchError>> + Send;

    /// Search stations near a coordinate. Ranking is the API's own; callers
    /// re-rank locally when precise ordering matters.
    fn nearby(
        &self,
        origin: Coordinate,
        limit: u16,
    ) -> impl Future<Output = Result<Vec<Station>, SearchError>> + Send;
}
