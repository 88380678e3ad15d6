//! The TPG stop catalog: feed client, disk cache, and record parsing.
//!
//! The catalog is a semicolon-delimited open-data feed of every stop in the
//! network, with an activity flag and an optional coordinate per record.
//! It changes rarely, so one raw copy is kept on disk for up to 30 days and
//! re-parsed on each access; refresh replaces the record atomically.

mod cache;
mod client;
mod error;
mod parse;

pub use cache::{Catalog, CatalogCache, CatalogCacheConfig};
pub use client::{CatalogClient, CatalogClientConfig, CatalogFeed};
pub use error::CatalogError;
pub use parse::{CatalogEntry, parse_catalog};
