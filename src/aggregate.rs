//! Arrival Aggregator: filters decoded trips down to the watched stops and
//! orders the upcoming arrivals per stop.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::parser::DecodedFeed;
use crate::stations::{StationDirectory, base_stop_id};

/// One upcoming train at a watched stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrivalEntry {
    pub arrival_epoch_secs: i64,
    pub route_id: String,
    pub feed_timestamp: u64,
    /// Whole minutes until arrival, rounded up. Negative once the train is due.
    pub minutes_until_arrival: i64,
}

/// Direction-suffixed stop id to its arrivals, ascending by arrival time.
///
/// Stops without arrivals are absent rather than mapped to an empty list.
pub type ArrivalsSnapshot = BTreeMap<String, Vec<ArrivalEntry>>;

/// `ceil((arrival - now) / 60)` in integer arithmetic. Out-of-range feed
/// times saturate instead of overflowing.
pub fn minutes_until(arrival_epoch_secs: i64, now: i64) -> i64 {
    let delta = arrival_epoch_secs.saturating_sub(now);
    delta.div_euclid(60) + i64::from(delta.rem_euclid(60) != 0)
}

/// Builds the arrivals map for `watched` stops from every decoded feed.
///
/// A stop-time update is kept only if its exact stop id is watched and its
/// base id (the stop id minus its final character) is a known station. Entries
/// within a stop are stably sorted by arrival time, so ties keep feed order.
pub fn aggregate(
    directory: &StationDirectory,
    feeds: &[DecodedFeed],
    watched: &BTreeSet<String>,
    now: i64,
) -> ArrivalsSnapshot {
    let mut arrivals = ArrivalsSnapshot::new();

    for feed in feeds {
        for trip in &feed.trip_updates {
            for stop in &trip.stops {
                if !watched.contains(&stop.stop_id) {
                    continue;
                }
                let Some(base) = base_stop_id(&stop.stop_id) else {
                    continue;
                };
                if !directory.contains_key(base) {
                    continue;
                }

                arrivals
                    .entry(stop.stop_id.clone())
                    .or_default()
                    .push(ArrivalEntry {
                        arrival_epoch_secs: stop.arrival_epoch_secs,
                        route_id: trip.route_id.clone(),
                        feed_timestamp: trip.feed_timestamp,
                        minutes_until_arrival: minutes_until(stop.arrival_epoch_secs, now),
                    });
            }
        }
    }

    for entries in arrivals.values_mut() {
        entries.sort_by_key(|e| e.arrival_epoch_secs);
    }

    arrivals
}
