//! Text rendering of departures, line groups, and status messages.
//!
//! Everything here is pure: it maps already-computed data plus display
//! preferences to strings, so sinks stay trivial and the rules are easy to
//! pin down in tests.

use std::collections::BTreeMap;

use crate::board::Departure;
use crate::prefs::{Language, TimeFormat};
use crate::session::Notice;

/// Departure cells shown per direction in the detailed view.
pub const MAX_DEPARTURES_SHOWN: usize = 6;

/// Render one departure cell.
///
/// "Leaving" and "At Stop" take precedence over the clock-time format; a
/// negative countdown renders with a warning marker since it means the
/// feed is showing a departure that should already have left.
pub fn format_departure(departure: &Departure, format: TimeFormat, language: Language) -> String {
    if departure.is_immediate {
        return match language {
            Language::En => "Leaving".to_string(),
            Language::Fr => "Départ".to_string(),
        };
    }

    let minutes = departure.minutes_until_departure;
    if minutes < 0 {
        return format!("{} min ⚠️", minutes.abs());
    }
    if minutes == 0 {
        return match language {
            Language::En => "At Stop".to_string(),
            Language::Fr => "À l'arrêt".to_string(),
        };
    }
    match format {
        TimeFormat::Time => departure.departure.format("%H:%M").to_string(),
        TimeFormat::Minutes => format!("{minutes} min"),
    }
}

/// Departures for one line toward one terminus, in feed order.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionGroup {
    pub destination: String,
    pub departures: Vec<Departure>,
}

/// Departures for one "vehicle line" badge, e.g. "Tram 12".
#[derive(Debug, Clone, PartialEq)]
pub struct LineGroup {
    /// Badge label: vehicle type followed by the line number.
    pub key: String,
    pub bg_color: String,
    pub fg_color: String,
    pub directions: Vec<DirectionGroup>,
}

/// Group departures by line badge and destination.
///
/// Groups and directions come out sorted lexicographically by their label;
/// within a direction the feed order is preserved and truncated to
/// [`MAX_DEPARTURES_SHOWN`]. Colors are taken from the first departure of
/// each group.
pub fn group_by_line(departures: &[Departure]) -> Vec<LineGroup> {
    let mut groups: BTreeMap<String, BTreeMap<String, Vec<Departure>>> = BTreeMap::new();
    for departure in departures {
        let key = format!("{} {}", departure.vehicle_type.label(), departure.line);
        groups
            .entry(key)
            .or_default()
            .entry(departure.destination.clone())
            .or_default()
            .push(departure.clone());
    }

    groups
        .into_iter()
        .map(|(key, directions)| {
            let first = directions
                .values()
                .flat_map(|list| list.first())
                .next()
                .cloned();
            let (bg_color, fg_color) = first
                .map(|d| (d.bg_color, d.fg_color))
                .unwrap_or_default();

            LineGroup {
                key,
                bg_color,
                fg_color,
                directions: directions
                    .into_iter()
                    .map(|(destination, mut departures)| {
                        departures.truncate(MAX_DEPARTURES_SHOWN);
                        DirectionGroup {
                            destination,
                            departures,
                        }
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Direction header for the detailed view.
pub fn direction_header(destination: &str, language: Language) -> String {
    match language {
        Language::En => format!("To: {destination}"),
        Language::Fr => format!("Vers : {destination}"),
    }
}

/// Localized text for a session notice.
pub fn notice_text(notice: &Notice, language: Language) -> String {
    match (notice, language) {
        (Notice::EmptyStopName, Language::En) => "Please enter a stop name.".to_string(),
        (Notice::EmptyStopName, Language::Fr) => "Veuillez entrer un nom d'arrêt.".to_string(),
        (Notice::UnknownStop { name }, Language::En) => {
            format!("No upcoming buses or trams departing from \"{name}\" were found.")
        }
        (Notice::UnknownStop { name }, Language::Fr) => {
            format!("Aucun bus ou tram au départ de \"{name}\" n'a été trouvé.")
        }
        (Notice::NoDepartures, Language::En) => "No upcoming buses or trams found.".to_string(),
        (Notice::NoDepartures, Language::Fr) => {
            "Aucun bus ou tram à venir n'a été trouvé.".to_string()
        }
        (Notice::NoMatchingLines, Language::En) => {
            "No buses or trams found for the specified numbers.".to_string()
        }
        (Notice::NoMatchingLines, Language::Fr) => {
            "Aucun bus ou tram trouvé pour les numéros spécifiés.".to_string()
        }
        (Notice::FetchFailed, Language::En) => {
            "An error occurred while fetching bus or tram information.".to_string()
        }
        (Notice::FetchFailed, Language::Fr) => {
            "Une erreur s'est produite lors de la récupération des informations de bus ou de tram."
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{TIMEZONE, VehicleType};
    use chrono::TimeZone;

    fn departure(line: &str, destination: &str, minutes: i64) -> Departure {
        let now = TIMEZONE.with_ymd_and_hms(2026, 8, 24, 12, 0, 0).unwrap();
        Departure {
            vehicle_type: VehicleType::Tram,
            line: line.to_string(),
            destination: destination.to_string(),
            departure: now + chrono::Duration::minutes(minutes),
            minutes_until_departure: minutes,
            is_immediate: false,
            bg_color: "#FF9900".to_string(),
            fg_color: "#000000".to_string(),
        }
    }

    #[test]
    fn countdown_formats_in_both_languages() {
        let d = departure("12", "Moillesulaz", 7);
        assert_eq!(
            format_departure(&d, TimeFormat::Minutes, Language::En),
            "7 min"
        );
        assert_eq!(
            format_departure(&d, TimeFormat::Minutes, Language::Fr),
            "7 min"
        );
    }

    #[test]
    fn clock_format_uses_departure_time() {
        let d = departure("12", "Moillesulaz", 7);
        assert_eq!(
            format_departure(&d, TimeFormat::Time, Language::En),
            "12:07"
        );
    }

    #[test]
    fn immediate_departure_wins_over_clock_format() {
        let mut d = departure("12", "Moillesulaz", 0);
        d.is_immediate = true;
        assert_eq!(
            format_departure(&d, TimeFormat::Time, Language::En),
            "Leaving"
        );
        assert_eq!(
            format_departure(&d, TimeFormat::Time, Language::Fr),
            "Départ"
        );
    }

    #[test]
    fn zero_minutes_is_at_stop() {
        let d = departure("12", "Moillesulaz", 0);
        assert_eq!(
            format_departure(&d, TimeFormat::Time, Language::En),
            "At Stop"
        );
        assert_eq!(
            format_departure(&d, TimeFormat::Minutes, Language::Fr),
            "À l'arrêt"
        );
    }

    #[test]
    fn overdue_departure_carries_a_warning() {
        let d = departure("12", "Moillesulaz", -3);
        assert_eq!(
            format_departure(&d, TimeFormat::Minutes, Language::En),
            "3 min ⚠️"
        );
    }

    #[test]
    fn groups_sort_by_badge_and_destination() {
        let departures = vec![
            departure("18", "CERN", 9),
            departure("12", "Moillesulaz", 5),
            departure("12", "Palettes", 8),
            departure("12", "Moillesulaz", 15),
        ];

        let groups = group_by_line(&departures);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "Tram 12");
        assert_eq!(groups[1].key, "Tram 18");

        let tram12 = &groups[0];
        assert_eq!(tram12.bg_color, "#FF9900");
        assert_eq!(tram12.directions.len(), 2);
        assert_eq!(tram12.directions[0].destination, "Moillesulaz");
        assert_eq!(tram12.directions[0].departures.len(), 2);
        assert_eq!(tram12.directions[1].destination, "Palettes");
    }

    #[test]
    fn direction_departures_truncate_to_the_display_limit() {
        let departures: Vec<_> = (1..=10)
            .map(|i| departure("12", "Moillesulaz", i))
            .collect();

        let groups = group_by_line(&departures);
        assert_eq!(
            groups[0].directions[0].departures.len(),
            MAX_DEPARTURES_SHOWN
        );
        // Feed order preserved within the direction.
        assert_eq!(groups[0].directions[0].departures[0].minutes_until_departure, 1);
    }

    #[test]
    fn notice_text_localizes() {
        let notice = Notice::UnknownStop {
            name: "Nowhere".to_string(),
        };
        assert!(notice_text(&notice, Language::En).contains("\"Nowhere\""));
        assert!(notice_text(&notice, Language::Fr).contains("n'a été trouvé"));
        assert_eq!(
            notice_text(&Notice::EmptyStopName, Language::Fr),
            "Veuillez entrer un nom d'arrêt."
        );
    }
}
