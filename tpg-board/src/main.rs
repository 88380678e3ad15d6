use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tpg_board::board::{BoardClient, BoardClientConfig, Departure};
use tpg_board::catalog::{CatalogCache, CatalogCacheConfig, CatalogClient, CatalogClientConfig};
use tpg_board::format;
use tpg_board::geo::Coordinate;
use tpg_board::locate;
use tpg_board::prefs::{Language, Preferences, TimeFormat};
use tpg_board::sched::{TimerGroup, run_aligned, run_tick};
use tpg_board::search::{SearchClient, SearchClientConfig};
use tpg_board::session::{
    BoardSink, COUNTDOWN_TICK, NORMAL_MODE_INTERVAL, Notice, ROTATION_MODE_INTERVAL, Session,
    StopConfig,
};

/// Live TPG departure board for the terminal.
#[derive(Debug, Parser)]
#[command(name = "tpg-board", about = "Geneva tram and bus departure board")]
struct Cli {
    /// Stops to display, as "Name" or "Name=12,18" to filter lines.
    /// More than one stop enables rotation.
    #[arg(value_name = "STOP", required_unless_present_any = ["near", "locate"])]
    stops: Vec<String>,

    /// List the closest stops to "lat,lon" and exit.
    #[arg(long, value_name = "LAT,LON")]
    near: Option<String>,

    /// Add the closest recognised stop to "lat,lon" to the display list.
    #[arg(long, value_name = "LAT,LON")]
    locate: Option<String>,

    /// Fetch each board once and exit instead of running the timers.
    #[arg(long)]
    once: bool,

    /// Directory for the catalog cache and preferences.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Override the display language.
    #[arg(long, value_enum)]
    language: Option<CliLanguage>,

    /// Show clock times instead of minute countdowns.
    #[arg(long)]
    clock: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliLanguage {
    En,
    Fr,
}

/// Renders boards and notices to stdout.
struct ConsoleSink {
    language: Language,
    time_format: TimeFormat,
}

impl BoardSink for ConsoleSink {
    fn departures(&self, stop_name: &str, departures: &[Departure]) {
        println!("\n== {stop_name} ==");
        for group in format::group_by_line(departures) {
            println!("{}", group.key);
            for direction in &group.directions {
                let cells: Vec<String> = direction
                    .departures
                    .iter()
                    .map(|d| format::format_departure(d, self.time_format, self.language))
                    .collect();
                println!(
                    "  {}  {}",
                    format::direction_header(&direction.destination, self.language),
                    cells.join(" | ")
                );
            }
        }
    }

    fn notice(&self, notice: Notice) {
        println!("{}", format::notice_text(&notice, self.language));
    }
}

fn parse_stop_arg(arg: &str) -> StopConfig {
    match arg.split_once('=') {
        Some((name, filters)) => StopConfig::new(name.trim(), StopConfig::parse_filters(filters)),
        None => StopConfig::new(arg.trim(), Vec::new()),
    }
}

fn parse_coordinate_arg(arg: &str) -> Option<Coordinate> {
    let (lat, lon) = arg.split_once(',')?;
    Coordinate::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut prefs = Preferences::load(&Preferences::default_path(&cli.data_dir));
    if let Some(language) = cli.language {
        prefs.language = match language {
            CliLanguage::En => Language::En,
            CliLanguage::Fr => Language::Fr,
        };
    }
    if cli.clock {
        prefs.time_format = TimeFormat::Time;
    }

    let catalog_client =
        CatalogClient::new(CatalogClientConfig::default()).expect("failed to create catalog client");
    let catalog = CatalogCache::new(
        CatalogCacheConfig::new(cli.data_dir.join("arrets_cache.json")),
        catalog_client,
    );
    let search =
        SearchClient::new(SearchClientConfig::default()).expect("failed to create search client");
    let board = BoardClient::new(BoardClientConfig::default()).expect("failed to create board client");

    if let Some(near) = &cli.near {
        let Some(origin) = parse_coordinate_arg(near) else {
            eprintln!("--near expects \"lat,lon\", got {near:?}");
            std::process::exit(2);
        };
        let stops = locate::nearest_stops(&search, &catalog, origin, locate::NEARBY_LIST_SIZE)
            .await
            .expect("failed to rank nearby stops");
        for stop in stops {
            println!("{:>6.2} km  {}", stop.distance_km, stop.name);
        }
        return;
    }

    let mut stops: Vec<StopConfig> = cli.stops.iter().map(|s| parse_stop_arg(s)).collect();

    if let Some(locate_arg) = &cli.locate {
        let Some(origin) = parse_coordinate_arg(locate_arg) else {
            eprintln!("--locate expects \"lat,lon\", got {locate_arg:?}");
            std::process::exit(2);
        };
        match locate::nearest_station(&search, &catalog, origin)
            .await
            .expect("failed to look up nearby stops")
        {
            Some(stop) => {
                info!(stop = %stop.name, "resolved nearest stop");
                stops.push(StopConfig::new(stop.name, Vec::new()));
            }
            None => {
                eprintln!("no recognised stop near {locate_arg}");
                std::process::exit(1);
            }
        }
    }

    let rotate = stops.len() > 1;
    let stop_count = stops.len();

    let sink = ConsoleSink {
        language: prefs.language,
        time_format: prefs.time_format,
    };
    let session = Arc::new(Session::new(search, board, catalog, sink, stops));

    if cli.once {
        for _ in 0..stop_count {
            session.refresh().await;
            session.advance();
        }
        return;
    }

    session.refresh().await;

    let interval = if rotate {
        ROTATION_MODE_INTERVAL
    } else {
        NORMAL_MODE_INTERVAL
    };
    info!(interval_secs = interval.as_secs(), rotate, "starting timers");

    let mut timers = TimerGroup::new();

    let refresh_session = session.clone();
    let rx = timers.subscribe();
    timers.spawn(async move {
        run_aligned(
            || {
                let session = refresh_session.clone();
                async move {
                    if rotate {
                        session.advance();
                    }
                    session.refresh().await;
                }
            },
            interval,
            rx,
        )
        .await;
    });

    let tick_session = session.clone();
    let rx = timers.subscribe();
    timers.spawn(async move {
        run_tick(
            || {
                let session = tick_session.clone();
                async move {
                    session.rerender();
                }
            },
            COUNTDOWN_TICK,
            rx,
        )
        .await;
    });

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl-c");
    info!("shutting down");
    timers.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_arg_with_filters() {
        let stop = parse_stop_arg("Cornavin=12, 18");
        assert_eq!(stop.stop_name, "Cornavin");
        assert_eq!(stop.vehicle_filters, vec!["12".to_string(), "18".to_string()]);
    }

    #[test]
    fn stop_arg_keeps_letter_line_filters() {
        let stop = parse_stop_arg("Genève-Plage=F, 12");
        assert_eq!(stop.vehicle_filters, vec!["F".to_string(), "12".to_string()]);
    }

    #[test]
    fn stop_arg_without_filters() {
        let stop = parse_stop_arg(" Bel-Air ");
        assert_eq!(stop.stop_name, "Bel-Air");
        assert!(stop.vehicle_filters.is_empty());
    }

    #[test]
    fn coordinate_arg_parses() {
        let coord = parse_coordinate_arg("46.2102, 6.1422").unwrap();
        assert!((coord.lat - 46.2102).abs() < 1e-9);
        assert!(parse_coordinate_arg("not-a-coord").is_none());
    }
}
