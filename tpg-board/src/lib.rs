//! Geneva tram and bus departure board.
//!
//! Resolves free-text stop names against the TPG stop catalog, confirms
//! them with the transport.opendata.ch search API, and keeps a live
//! departure board from search.ch refreshed on wall-clock-aligned timers.

pub mod board;
pub mod catalog;
pub mod format;
pub mod geo;
pub mod locate;
pub mod prefs;
pub mod resolve;
pub mod sched;
pub mod search;
pub mod session;
pub mod suggest;
