//! Session context: current stop(s), fetch-and-render cycle, rotation.
//!
//! All mutable display state lives here rather than in ambient globals:
//! the rotation list, the single-flight fetch guard, and the last fetched
//! board (kept so the fast tick can recompute countdowns without network
//! access). Rendering is a downstream consumer behind [`BoardSink`]; the
//! session hands it already-computed data and semantic notices only.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::board::{Departure, DepartureBoard, TIMEZONE, filter_by_lines, recompute_minutes};
use crate::catalog::{CatalogCache, CatalogFeed};
use crate::resolve;
use crate::search::StationSearch;

/// Refresh interval in single-stop mode.
pub const NORMAL_MODE_INTERVAL: Duration = Duration::from_secs(30);

/// Refresh interval in rotation mode.
pub const ROTATION_MODE_INTERVAL: Duration = Duration::from_secs(20);

/// Period of the countdown re-render tick.
pub const COUNTDOWN_TICK: Duration = Duration::from_secs(5);

/// Debounce window for the line-filter field. Shorter than the stop-name
/// window since nothing here touches the network.
pub const FILTER_DEBOUNCE: Duration = Duration::from_millis(200);

/// One stop in the rotation list: a name (rewritten to its canonical form
/// as refreshes resolve it) and optional line filters.
#[derive(Debug, Clone, PartialEq)]
pub struct StopConfig {
    pub stop_name: String,
    pub vehicle_filters: Vec<String>,
}

impl StopConfig {
    pub fn new(stop_name: impl Into<String>, vehicle_filters: Vec<String>) -> Self {
        Self {
            stop_name: stop_name.into(),
            vehicle_filters,
        }
    }

    /// Parse a comma-separated filter list from a stop spec: trimmed,
    /// empties dropped. Lettered lines (F, G, ...) pass through.
    pub fn parse_filters(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Normalize raw text from the interactive filter field. Stricter than
    /// [`Self::parse_filters`]: non-numeric tokens are dropped too.
    pub fn normalize_filter_input(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
            .map(str::to_string)
            .collect()
    }
}

/// Semantic events for the rendering layer. Wording and localization are
/// the sink's concern.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// No stop name configured.
    EmptyStopName,
    /// The name does not denote a known active stop.
    UnknownStop { name: String },
    /// The stop resolved but its board is empty.
    NoDepartures,
    /// Departures exist but none match the configured line filters.
    NoMatchingLines,
    /// A network or data failure; no new data this cycle.
    FetchFailed,
}

/// Consumer of computed boards and notices.
pub trait BoardSink: Send + Sync {
    fn departures(&self, stop_name: &str, departures: &[Departure]);
    fn notice(&self, notice: Notice);
}

/// What a refresh cycle did. Mostly useful for tests; user-visible effects
/// go through the sink.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Board fetched and rendered.
    Refreshed { count: usize },
    /// A cycle was already in flight; this call was a no-op.
    Skipped,
    /// A notice was emitted instead of a board.
    Notified(Notice),
}

/// The last successfully fetched board, unfiltered. Filters apply at
/// render time so the filter field works without a refetch.
struct FetchedBoard {
    stop_name: String,
    departures: Vec<Departure>,
}

/// A display session over one stop or a rotation list.
pub struct Session<S, B, C, K> {
    search: S,
    board: B,
    catalog: CatalogCache<C>,
    sink: K,
    stops: Mutex<RotationState>,
    fetching: AtomicBool,
    filter_generation: AtomicU64,
    last_board: Mutex<Option<FetchedBoard>>,
}

struct RotationState {
    stops: Vec<StopConfig>,
    current: usize,
}

impl<S, B, C, K> Session<S, B, C, K>
where
    S: StationSearch,
    B: DepartureBoard,
    C: CatalogFeed,
    K: BoardSink,
{
    /// Create a session over a non-empty stop list. Index starts at 0.
    pub fn new(search: S, board: B, catalog: CatalogCache<C>, sink: K, stops: Vec<StopConfig>) -> Self {
        Self {
            search,
            board,
            catalog,
            sink,
            stops: Mutex::new(RotationState { stops, current: 0 }),
            fetching: AtomicBool::new(false),
            filter_generation: AtomicU64::new(0),
            last_board: Mutex::new(None),
        }
    }

    /// The active stop config.
    pub fn current(&self) -> Option<StopConfig> {
        let state = self.lock_stops();
        state.stops.get(state.current).cloned()
    }

    /// Advance the rotation index, wrapping at the end of the list.
    pub fn advance(&self) {
        let mut state = self.lock_stops();
        if !state.stops.is_empty() {
            state.current = (state.current + 1) % state.stops.len();
        }
    }

    /// Handle one keystroke of the interactive line-filter field.
    ///
    /// Debounces, normalizes the text to numeric tokens, applies the
    /// result, and re-renders from the cached board. Never touches the
    /// network. Returns `false` when newer input superseded this one
    /// before the window closed.
    pub async fn filter_input(&self, raw: &str) -> bool {
        let generation = self.filter_generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(FILTER_DEBOUNCE).await;
        if self.filter_generation.load(Ordering::SeqCst) != generation {
            return false;
        }

        self.set_filters(StopConfig::normalize_filter_input(raw));
        true
    }

    /// Replace the active stop's line filters and re-render the cached
    /// board. No network access.
    pub fn set_filters(&self, filters: Vec<String>) {
        {
            let mut state = self.lock_stops();
            let current = state.current;
            if let Some(stop) = state.stops.get_mut(current) {
                stop.vehicle_filters = filters;
            }
        }
        self.rerender_at(Utc::now().with_timezone(&TIMEZONE));
    }

    /// Run one fetch-and-render cycle anchored at the current time.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.refresh_at(Utc::now().with_timezone(&TIMEZONE)).await
    }

    /// Run one fetch-and-render cycle.
    ///
    /// Re-entrant calls while a cycle is in flight are no-ops, so an
    /// overlapping scheduled refresh can never render out of order. All
    /// failures degrade to a notice; nothing here is fatal and the
    /// scheduler keeps ticking.
    pub async fn refresh_at(&self, now: DateTime<Tz>) -> RefreshOutcome {
        if self
            .fetching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        }

        let outcome = self.refresh_inner(now).await;
        self.fetching.store(false, Ordering::SeqCst);
        outcome
    }

    async fn refresh_inner(&self, now: DateTime<Tz>) -> RefreshOutcome {
        let Some(stop) = self.current() else {
            return self.notify(Notice::EmptyStopName);
        };

        let name = stop.stop_name.trim().to_string();
        if name.is_empty() {
            return self.notify(Notice::EmptyStopName);
        }

        let catalog = match self.catalog.get().await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "catalog unavailable");
                return self.notify(Notice::FetchFailed);
            }
        };

        // Unknown names short-circuit before any search-API call.
        if !resolve::is_known_stop(&name, &catalog) {
            return self.notify(Notice::UnknownStop { name });
        }

        let canonical = resolve::canonicalize(&name, &catalog);
        let station = match resolve::confirm(&self.search, &canonical).await {
            Ok(Some(station)) => station,
            Ok(None) => {
                return self.notify(Notice::UnknownStop { name });
            }
            Err(e) => {
                warn!(error = %e, "stop confirmation failed");
                return self.notify(Notice::FetchFailed);
            }
        };

        // Write the authoritative name back so drift in the configured
        // name does not accumulate across refreshes.
        {
            let mut state = self.lock_stops();
            let current = state.current;
            if let Some(entry) = state.stops.get_mut(current) {
                entry.stop_name = station.name.clone();
            }
        }

        let departures = match self.board.departures(&station.name, now).await {
            Ok(departures) => departures,
            Err(e) => {
                warn!(error = %e, stop = %station.name, "board fetch failed");
                return self.notify(Notice::FetchFailed);
            }
        };

        if departures.is_empty() {
            return self.notify(Notice::NoDepartures);
        }

        let filtered = filter_by_lines(departures.clone(), &stop.vehicle_filters);

        *self.lock_board() = Some(FetchedBoard {
            stop_name: station.name.clone(),
            departures,
        });

        if filtered.is_empty() {
            return self.notify(Notice::NoMatchingLines);
        }

        let count = filtered.len();
        self.sink.departures(&station.name, &filtered);
        RefreshOutcome::Refreshed { count }
    }

    /// Re-render the cached board with countdowns recomputed against the
    /// current time. Used by the fast tick; no network access.
    pub fn rerender(&self) {
        self.rerender_at(Utc::now().with_timezone(&TIMEZONE));
    }

    /// Re-render the cached board against an explicit time anchor.
    pub fn rerender_at(&self, now: DateTime<Tz>) {
        let filters = self.current().map(|s| s.vehicle_filters).unwrap_or_default();
        let board = self.lock_board();
        if let Some(board) = board.as_ref() {
            let updated = filter_by_lines(recompute_minutes(&board.departures, now), &filters);
            self.sink.departures(&board.stop_name, &updated);
        }
    }

    fn notify(&self, notice: Notice) -> RefreshOutcome {
        self.sink.notice(notice.clone());
        RefreshOutcome::Notified(notice)
    }

    fn lock_stops(&self) -> std::sync::MutexGuard<'_, RotationState> {
        self.stops.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_board(&self) -> std::sync::MutexGuard<'_, Option<FetchedBoard>> {
        self.last_board.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::board::mock::MockBoardClient;
    use crate::catalog::{CatalogCacheConfig, CatalogError};
    use crate::search::mock::MockSearchClient;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const FEED: &str = "\
id;stop;municipality;code;zone;coords;active
1;gare cornavin;geneve;GC;10;46.2102,6.1422;Y
2;bel-air;geneve;BA;10;46.2043,6.1411;Y
";

    #[derive(Clone)]
    struct StaticFeed;

    impl CatalogFeed for StaticFeed {
        async fn fetch_raw(&self) -> Result<String, CatalogError> {
            Ok(FEED.to_string())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Board { stop: String, minutes: Vec<i64> },
        Notice(Notice),
    }

    #[derive(Clone, Default)]
    struct TestSink {
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl TestSink {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl BoardSink for TestSink {
        fn departures(&self, stop_name: &str, departures: &[Departure]) {
            self.events.lock().unwrap().push(Event::Board {
                stop: stop_name.to_string(),
                minutes: departures.iter().map(|d| d.minutes_until_departure).collect(),
            });
        }

        fn notice(&self, notice: Notice) {
            self.events.lock().unwrap().push(Event::Notice(notice));
        }
    }

    const BOARD_JSON: &str = r#"{
        "connections": [
            {"time": "2026-08-24 12:05:00", "line": "12",
             "terminal": {"name": "Moillesulaz"}, "type": "tram"},
            {"time": "2026-08-24 12:09:30", "line": "18",
             "terminal": {"name": "CERN"}, "type": "tram"}
        ]
    }"#;

    fn noon() -> DateTime<Tz> {
        TIMEZONE.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap()
    }

    fn search_mock() -> MockSearchClient {
        MockSearchClient::new([(
            "geneve, gare cornavin".to_string(),
            vec![MockSearchClient::station("8587057", "Genève, gare Cornavin")],
        )])
    }

    fn board_mock() -> MockBoardClient {
        MockBoardClient::from_json([(
            "Genève, gare Cornavin".to_string(),
            BOARD_JSON.to_string(),
        )])
        .unwrap()
    }

    fn session(
        dir: &TempDir,
        search: MockSearchClient,
        board: MockBoardClient,
        sink: TestSink,
        stops: Vec<StopConfig>,
    ) -> Session<MockSearchClient, MockBoardClient, StaticFeed, TestSink> {
        let catalog = CatalogCache::new(
            CatalogCacheConfig::new(dir.path().join("arrets.json")),
            StaticFeed,
        );
        Session::new(search, board, catalog, sink, stops)
    }

    #[tokio::test]
    async fn refresh_renders_and_writes_back_canonical_name() {
        let dir = TempDir::new().unwrap();
        let sink = TestSink::default();
        let session = session(
            &dir,
            search_mock(),
            board_mock(),
            sink.clone(),
            vec![StopConfig::new("Cornavin", vec![])],
        );

        let outcome = session.refresh_at(noon()).await;
        assert_eq!(outcome, RefreshOutcome::Refreshed { count: 2 });

        // Configured name was replaced by the API's authoritative form.
        assert_eq!(session.current().unwrap().stop_name, "Genève, gare Cornavin");

        assert_eq!(
            sink.events(),
            vec![Event::Board {
                stop: "Genève, gare Cornavin".to_string(),
                minutes: vec![5, 10],
            }]
        );
    }

    #[tokio::test]
    async fn unknown_stop_short_circuits_without_search_call() {
        let dir = TempDir::new().unwrap();
        let sink = TestSink::default();
        let search = MockSearchClient::default();
        let session = session(
            &dir,
            search.clone(),
            board_mock(),
            sink.clone(),
            vec![StopConfig::new("XYZ-not-a-stop", vec![])],
        );

        let outcome = session.refresh_at(noon()).await;
        assert_eq!(
            outcome,
            RefreshOutcome::Notified(Notice::UnknownStop {
                name: "XYZ-not-a-stop".to_string()
            })
        );
        assert_eq!(search.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reentrant_refresh_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let sink = TestSink::default();
        let board = board_mock().with_delay(Duration::from_millis(200));
        let session = Arc::new(session(
            &dir,
            search_mock(),
            board.clone(),
            sink,
            vec![StopConfig::new("Cornavin", vec![])],
        ));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.refresh_at(noon()).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = session.refresh_at(noon()).await;

        assert_eq!(second, RefreshOutcome::Skipped);
        assert_eq!(first.await.unwrap(), RefreshOutcome::Refreshed { count: 2 });
        assert_eq!(board.call_count(), 1);
    }

    #[tokio::test]
    async fn line_filters_apply_and_report_empty_matches() {
        let dir = TempDir::new().unwrap();
        let sink = TestSink::default();
        let session = session(
            &dir,
            search_mock(),
            board_mock(),
            sink.clone(),
            vec![StopConfig::new("Cornavin", vec!["18".to_string()])],
        );

        let outcome = session.refresh_at(noon()).await;
        assert_eq!(outcome, RefreshOutcome::Refreshed { count: 1 });

        // Filter nothing matches.
        let session2_sink = TestSink::default();
        let session2 = self::session(
            &dir,
            search_mock(),
            board_mock(),
            session2_sink.clone(),
            vec![StopConfig::new("Cornavin", vec!["99".to_string()])],
        );
        let outcome = session2.refresh_at(noon()).await;
        assert_eq!(outcome, RefreshOutcome::Notified(Notice::NoMatchingLines));
    }

    #[tokio::test]
    async fn empty_board_notifies_no_departures() {
        let dir = TempDir::new().unwrap();
        let sink = TestSink::default();
        let session = session(
            &dir,
            search_mock(),
            MockBoardClient::default(),
            sink.clone(),
            vec![StopConfig::new("Cornavin", vec![])],
        );

        let outcome = session.refresh_at(noon()).await;
        assert_eq!(outcome, RefreshOutcome::Notified(Notice::NoDepartures));
    }

    #[tokio::test]
    async fn confirmation_failure_degrades_to_a_notice() {
        let dir = TempDir::new().unwrap();
        let sink = TestSink::default();
        let session = session(
            &dir,
            MockSearchClient::failing(),
            board_mock(),
            sink.clone(),
            vec![StopConfig::new("Cornavin", vec![])],
        );

        let outcome = session.refresh_at(noon()).await;
        assert_eq!(outcome, RefreshOutcome::Notified(Notice::FetchFailed));
    }

    #[tokio::test]
    async fn rotation_advances_and_wraps() {
        let dir = TempDir::new().unwrap();
        let session = session(
            &dir,
            search_mock(),
            board_mock(),
            TestSink::default(),
            vec![
                StopConfig::new("Cornavin", vec![]),
                StopConfig::new("Bel-Air", vec![]),
            ],
        );

        assert_eq!(session.current().unwrap().stop_name, "Cornavin");
        session.advance();
        assert_eq!(session.current().unwrap().stop_name, "Bel-Air");
        session.advance();
        assert_eq!(session.current().unwrap().stop_name, "Cornavin");
    }

    #[tokio::test]
    async fn fast_tick_recomputes_countdowns_without_refetch() {
        let dir = TempDir::new().unwrap();
        let sink = TestSink::default();
        let board = board_mock();
        let session = session(
            &dir,
            search_mock(),
            board.clone(),
            sink.clone(),
            vec![StopConfig::new("Cornavin", vec![])],
        );

        session.refresh_at(noon()).await;
        session.rerender_at(TIMEZONE.with_ymd_and_hms(2026, 8, 24, 12, 3, 0).unwrap());

        assert_eq!(board.call_count(), 1, "rerender must not refetch");
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            Event::Board {
                stop: "Genève, gare Cornavin".to_string(),
                minutes: vec![2, 7],
            }
        );
    }

    #[test]
    fn stop_spec_filters_keep_letter_lines() {
        assert_eq!(
            StopConfig::parse_filters(" 12, F , ,18 "),
            vec!["12".to_string(), "F".to_string(), "18".to_string()]
        );
        assert!(StopConfig::parse_filters("").is_empty());
    }

    #[test]
    fn interactive_filter_input_is_numeric_only() {
        assert_eq!(
            StopConfig::normalize_filter_input(" 12, 18 , F, , 7 "),
            vec!["12".to_string(), "18".to_string(), "7".to_string()]
        );
    }

    #[tokio::test]
    async fn letter_line_filter_narrows_the_board() {
        let json = r#"{
            "connections": [
                {"time": "2026-08-24 12:05:00", "line": "F",
                 "terminal": {"name": "Ferney-Voltaire"}, "type": "bus"},
                {"time": "2026-08-24 12:07:00", "line": "12",
                 "terminal": {"name": "Moillesulaz"}, "type": "tram"}
            ]
        }"#;
        let board = MockBoardClient::from_json([(
            "Genève, gare Cornavin".to_string(),
            json.to_string(),
        )])
        .unwrap();

        let dir = TempDir::new().unwrap();
        let sink = TestSink::default();
        let session = session(
            &dir,
            search_mock(),
            board,
            sink.clone(),
            vec![StopConfig::new("Cornavin", StopConfig::parse_filters("F"))],
        );

        let outcome = session.refresh_at(noon()).await;
        assert_eq!(outcome, RefreshOutcome::Refreshed { count: 1 });
        assert_eq!(
            sink.events(),
            vec![Event::Board {
                stop: "Genève, gare Cornavin".to_string(),
                minutes: vec![5],
            }]
        );
    }

    #[tokio::test]
    async fn set_filters_rerenders_without_refetch() {
        let dir = TempDir::new().unwrap();
        let sink = TestSink::default();
        let board = board_mock();
        let session = session(
            &dir,
            search_mock(),
            board.clone(),
            sink.clone(),
            vec![StopConfig::new("Cornavin", vec![])],
        );

        session.refresh_at(noon()).await;
        session.set_filters(vec!["18".to_string()]);

        assert_eq!(board.call_count(), 1, "filter change must not refetch");
        let events = sink.events();
        assert_eq!(events.len(), 2);
        let Event::Board { stop, minutes } = &events[1] else {
            panic!("expected a board event, got {:?}", events[1]);
        };
        assert_eq!(stop, "Genève, gare Cornavin");
        assert_eq!(minutes.len(), 1, "only line 18 should remain");
    }

    #[tokio::test(start_paused = true)]
    async fn filter_field_debounces_and_newer_input_wins() {
        let dir = TempDir::new().unwrap();
        let sink = TestSink::default();
        let board = board_mock();
        let session = Arc::new(session(
            &dir,
            search_mock(),
            board.clone(),
            sink,
            vec![StopConfig::new("Cornavin", vec![])],
        ));

        session.refresh_at(noon()).await;

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.filter_input("12").await })
        };
        // Let the first keystroke enter its window, then supersede it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = session.filter_input("18").await;

        assert!(!first.await.unwrap(), "superseded input must not apply");
        assert!(second);
        assert_eq!(
            session.current().unwrap().vehicle_filters,
            vec!["18".to_string()]
        );
        assert_eq!(board.call_count(), 1, "filter input must not refetch");
    }
}
