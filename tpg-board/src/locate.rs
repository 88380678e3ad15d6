//! Position-based stop discovery.
//!
//! Two complementary flows. [`nearest_stops`] ranks the local catalog by
//! great-circle distance and works even when the search API is down, with
//! the API used only to prettify names. [`nearest_station`] asks the
//! search API for stations around a coordinate, re-ranks them by actual
//! distance (the API's own ordering is unreliable for this) and picks the
//! closest one the catalog recognises.

use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tracing::debug;

use crate::catalog::{CatalogCache, CatalogError, CatalogFeed};
use crate::geo::{self, Coordinate};
use crate::resolve::{CanonicalStop, canonicalize, confirm, is_known_stop};
use crate::search::{SearchError, StationSearch};

/// How long to wait for a position fix.
pub const GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Size of the nearest-stops list.
pub const NEARBY_LIST_SIZE: usize = 5;

/// Stations requested from the search API around a coordinate.
const NEARBY_API_LIMIT: u16 = 10;

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("timed out waiting for a position fix")]
    Timeout,
    #[error("position unavailable: {message}")]
    Unavailable { message: String },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Source of the user's current position.
pub trait LocationProvider: Send + Sync {
    fn position(&self) -> impl Future<Output = Result<Coordinate, LocateError>> + Send;
}

/// A stop ranked by distance from the user.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyStop {
    pub name: String,
    pub distance_km: f64,
}

/// Resolve the current position, bounding the wait.
pub async fn current_position<L: LocationProvider>(provider: &L) -> Result<Coordinate, LocateError> {
    tokio::time::timeout(GEOLOCATION_TIMEOUT, provider.position())
        .await
        .map_err(|_| LocateError::Timeout)?
}

/// The closest active catalog stops to `origin`, nearest first.
///
/// Names are confirmed against the search API so the list shows the
/// authoritative display form; when confirmation fails for an entry, its
/// catalog form is shown instead rather than dropping the stop.
pub async fn nearest_stops<S, C>(
    search: &S,
    catalog: &CatalogCache<C>,
    origin: Coordinate,
    limit: usize,
) -> Result<Vec<NearbyStop>, LocateError>
where
    S: StationSearch,
    C: CatalogFeed,
{
    let catalog = catalog.get().await?;
    let ranked = geo::nearest(origin, catalog.active_entries(), limit);
    debug!(count = ranked.len(), "ranked catalog stops by proximity");

    let stops = join_all(ranked.into_iter().map(|(entry, distance_km)| async move {
        let full_name = entry.full_name();
        let name = match confirm(search, &full_name).await {
            Ok(Some(stop)) => stop.name,
            _ => full_name,
        };
        NearbyStop { name, distance_km }
    }))
    .await;

    Ok(stops)
}

/// The closest search-API station around `origin` that the catalog
/// recognises as an active stop, or `None` when nothing nearby qualifies.
pub async fn nearest_station<S, C>(
    search: &S,
    catalog: &CatalogCache<C>,
    origin: Coordinate,
) -> Result<Option<CanonicalStop>, LocateError>
where
    S: StationSearch,
    C: CatalogFeed,
{
    let catalog = catalog.get().await?;
    let mut stations = search.nearby(origin, NEARBY_API_LIMIT).await?;

    // Stations without a coordinate sort last, keeping their API order.
    stations.sort_by(|a, b| {
        let da = a.coordinate.map_or(f64::INFINITY, |c| geo::distance_km(origin, c));
        let db = b.coordinate.map_or(f64::INFINITY, |c| geo::distance_km(origin, c));
        da.total_cmp(&db)
    });

    for station in &stations {
        if !is_known_stop(&station.name, &catalog) {
            continue;
        }
        let canonical = canonicalize(&station.name, &catalog);
        if let Some(stop) = confirm(search, &canonical).await? {
            return Ok(Some(stop));
        }
    }

    Ok(None)
}
