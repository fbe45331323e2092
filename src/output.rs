//! Output formatting for the CLI.
//!
//! Resolves station names and direction labels for watched stops and renders
//! snapshots as JSON or log lines.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use tracing::{debug, info, warn};

use crate::aggregate::ArrivalEntry;
use crate::refresh::DataSnapshot;
use crate::stations::{Direction, base_stop_id};

/// What a display shows for one watched stop.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StopSummary {
    pub stop_id: String,
    /// e.g. `MTA: Van Cortlandt Park Uptown`.
    pub name: Option<String>,
    pub station_name: Option<String>,
    pub direction_label: Option<String>,
    pub next_arrival: Option<DateTime<Utc>>,
    pub minutes_until_next: Option<i64>,
    pub arrivals: Vec<ArrivalEntry>,
}

/// Builds the summary for `stop_id`. Name and label stay `None` when the stop
/// is unknown or its suffix is not a direction.
pub fn summarize(snapshot: &DataSnapshot, stop_id: &str) -> StopSummary {
    let arrivals = snapshot.arrivals.get(stop_id).cloned().unwrap_or_default();
    let station = base_stop_id(stop_id).and_then(|base| snapshot.stations.get(base));
    let direction = Direction::from_stop_id(stop_id);

    if direction.is_none() {
        warn!(stop_id, "Stop id has no N/S direction suffix");
    }

    let (name, direction_label) = match (station, direction) {
        (Some(station), Some(direction)) => (
            Some(format!("MTA: {} {}", station.stop_name, direction.generic_label())),
            Some(station.direction_label(direction).to_string()),
        ),
        _ => (None, None),
    };

    let next = arrivals.first();
    StopSummary {
        stop_id: stop_id.to_string(),
        name,
        station_name: station.map(|s| s.stop_name.clone()),
        direction_label,
        next_arrival: next.and_then(|a| DateTime::from_timestamp(a.arrival_epoch_secs, 0)),
        minutes_until_next: next.map(|a| a.minutes_until_arrival),
        arrivals,
    }
}

/// Logs one line per summary.
pub fn log_summaries(summaries: &[StopSummary]) {
    for summary in summaries {
        let routes: Vec<String> = summary
            .arrivals
            .iter()
            .map(|a| format!("{}:{}m", a.route_id, a.minutes_until_arrival))
            .collect();
        info!(
            stop_id = %summary.stop_id,
            name = summary.name.as_deref().unwrap_or("unknown"),
            direction = summary.direction_label.as_deref().unwrap_or(""),
            next_min = ?summary.minutes_until_next,
            upcoming = %routes.join(" "),
            "Arrivals"
        );
    }
}

/// Logs a snapshot using Rust's debug pretty-print format.
pub fn print_pretty(snapshot: &DataSnapshot) {
    debug!("{:#?}", snapshot);
}

/// Writes `value` as pretty-printed JSON followed by a newline.
pub fn write_json(mut out: impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ArrivalsSnapshot;
    use crate::stations::{StationDirectory, StationRecord};

    fn snapshot() -> DataSnapshot {
        let mut stations = StationDirectory::new();
        stations.insert(
            "A02".to_string(),
            StationRecord {
                base_stop_id: "A02".to_string(),
                stop_name: "Inwood-207 St".to_string(),
                north_direction_label: "".to_string(),
                south_direction_label: "Manhattan".to_string(),
                complex_id: "146".to_string(),
            },
        );
        let mut arrivals = ArrivalsSnapshot::new();
        arrivals.insert(
            "A02S".to_string(),
            vec![
                ArrivalEntry {
                    arrival_epoch_secs: 1_700_000_120,
                    route_id: "A".to_string(),
                    feed_timestamp: 1_700_000_000,
                    minutes_until_arrival: 2,
                },
                ArrivalEntry {
                    arrival_epoch_secs: 1_700_000_600,
                    route_id: "A".to_string(),
                    feed_timestamp: 1_700_000_000,
                    minutes_until_arrival: 10,
                },
            ],
        );
        DataSnapshot {
            stations,
            arrivals,
            generated_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_summarize_known_stop() {
        let summary = summarize(&snapshot(), "A02S");

        assert_eq!(summary.name.as_deref(), Some("MTA: Inwood-207 St Downtown"));
        assert_eq!(summary.station_name.as_deref(), Some("Inwood-207 St"));
        assert_eq!(summary.direction_label.as_deref(), Some("Manhattan"));
        assert_eq!(summary.minutes_until_next, Some(2));
        assert_eq!(summary.next_arrival.unwrap().timestamp(), 1_700_000_120);
        assert_eq!(summary.arrivals.len(), 2);
    }

    #[test]
    fn test_summarize_empty_label_falls_back() {
        let summary = summarize(&snapshot(), "A02N");

        assert_eq!(summary.direction_label.as_deref(), Some("Uptown"));
        assert!(summary.arrivals.is_empty());
        assert_eq!(summary.minutes_until_next, None);
    }

    #[test]
    fn test_summarize_unknown_or_undirected_stop() {
        assert_eq!(summarize(&snapshot(), "999N").name, None);
        let summary = summarize(&snapshot(), "A02X");
        assert_eq!(summary.name, None);
        assert_eq!(summary.station_name.as_deref(), Some("Inwood-207 St"));
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&snapshot());
    }

    #[test]
    fn test_write_json() {
        let mut out = Vec::new();
        write_json(&mut out, &snapshot()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["arrivals"]["A02S"][0]["route_id"], "A");
        assert_eq!(value["arrivals"]["A02S"][0]["minutes_until_arrival"], 2);
        assert_eq!(value["stations"]["A02"]["stop_name"], "Inwood-207 St");
    }
}
