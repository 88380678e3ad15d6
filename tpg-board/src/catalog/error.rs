//! Catalog error types.

/// Errors from fetching, caching, or parsing the stop catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The feed could not be fetched or parsed and no valid cached copy
    /// exists. Callers must retry; no stale fallback is served.
    #[error("catalog unavailable: {message}")]
    Unavailable { message: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed endpoint returned an error status
    #[error("feed error {status}: {message}")]
    Feed { status: u16, message: String },

    /// Cache file operation failed
    #[error("cache error: {message}")]
    Cache { message: String },
}
