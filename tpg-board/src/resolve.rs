//! Fuzzy resolution of free-text stop names against the catalog, plus
//! confirmation against the live search API.
//!
//! The matching predicate is deliberately permissive: a query matches a
//! catalog stop name when either is a substring of the other (lower-cased).
//! That tolerates truncated input as well as catalog entries carrying extra
//! qualifiers like a platform suffix. Iteration is in catalog order and the
//! first hit wins, so results are deterministic but not "best" by any
//! distance metric; this mirrors the upstream behavior on purpose.
//!
//! Matching is case-insensitive but not accent-insensitive.

use crate::catalog::Catalog;
use crate::search::{SearchError, StationSearch};

/// The authoritative identity of a stop as returned by the search API.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalStop {
    /// Opaque API-assigned identifier.
    pub id: String,
    /// Authoritative display name, used for departure-board queries.
    pub name: String,
}

/// Bidirectional substring match between a free-text name and a catalog
/// stop name, both lower-cased.
fn name_matches(query: &str, stop_name: &str) -> bool {
    let q = query.to_lowercase();
    let s = stop_name.to_lowercase();
    q.contains(&s) || s.contains(&q)
}

/// True iff at least one active catalog entry matches the candidate name.
pub fn is_known_stop(candidate: &str, catalog: &Catalog) -> bool {
    catalog
        .active_entries()
        .any(|e| name_matches(candidate, &e.stop_name))
}

/// Expand a candidate name to its "municipality, stopName" catalog form.
///
/// The first active match in catalog order wins. Returns the input
/// unchanged when nothing matches.
pub fn canonicalize(candidate: &str, catalog: &Catalog) -> String {
    catalog
        .active_entries()
        .find(|e| name_matches(candidate, &e.stop_name))
        .map(|e| e.full_name())
        .unwrap_or_else(|| candidate.to_string())
}

/// Confirm a canonical name against the search API.
///
/// Prefers an exact case-insensitive name match; falls back to the top
/// search result. Returns `None` when the API knows no such station.
pub async fn confirm<S: StationSearch>(
    search: &S,
    canonical_name: &str,
) -> Result<Option<CanonicalStop>, SearchError> {
    let stations = search.search(canonical_name).await?;

    let wanted = canonical_name.to_lowercase();
    let station = stations
        .iter()
        .find(|s| s.name.to_lowercase() == wanted)
        .or_else(|| stations.first());

    Ok(station.map(|s| CanonicalStop {
        id: s.id.clone(),
        name: s.name.clone(),
    }))
}

/// Full resolution: catalog membership check, canonical expansion, then API
/// confirmation. Unknown names short-circuit to `None` without any search
/// call; that is an expected outcome, not an error.
pub async fn resolve<S: StationSearch>(
    search: &S,
    candidate: &str,
    catalog: &Catalog,
) -> Result<Option<CanonicalStop>, SearchError> {
    if !is_known_stop(candidate, catalog) {
        return Ok(None);
    }

    let canonical = canonicalize(candidate, catalog);
    confirm(search, &canonical).await
}
