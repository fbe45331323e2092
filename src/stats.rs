use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::ArrivalsSnapshot;
use crate::fetch::FetchResult;
use crate::parser::DecodedFeed;

/// Counters for one refresh cycle, logged when the cycle completes.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RefreshReport {
    pub started_at: DateTime<Utc>,
    pub stations: usize,

    // fetch
    pub endpoints: usize,
    pub fetched: usize,
    pub fetch_failures: usize,

    // decode
    pub decoded: usize,
    pub decode_failures: usize,
    pub trip_updates: usize,
    pub stop_time_updates: usize,

    // aggregate
    pub watched_stops: usize,
    pub stops_with_arrivals: usize,
    pub arrivals: usize,
}

impl RefreshReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        RefreshReport {
            started_at,
            ..Default::default()
        }
    }

    pub fn record_fetch(&mut self, results: &[FetchResult]) {
        self.endpoints = results.len();
        self.fetched = results.iter().filter(|r| r.is_ok()).count();
        self.fetch_failures = self.endpoints - self.fetched;
    }

    pub fn record_decoded(&mut self, feed: &DecodedFeed) {
        self.decoded += 1;
        self.trip_updates += feed.trip_updates.len();
        self.stop_time_updates += feed
            .trip_updates
            .iter()
            .map(|t| t.stops.len())
            .sum::<usize>();
    }

    pub fn record_decode_failure(&mut self) {
        self.decode_failures += 1;
    }

    pub fn record_arrivals(&mut self, watched_stops: usize, arrivals: &ArrivalsSnapshot) {
        self.watched_stops = watched_stops;
        self.stops_with_arrivals = arrivals.len();
        self.arrivals = arrivals.values().map(Vec::len).sum();
    }

    /// Share of endpoints that produced a usable feed, in percent.
    pub fn feed_success_pct(&self) -> f64 {
        Self::pct(self.decoded, self.endpoints)
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ArrivalEntry;
    use crate::error::FetchError;
    use crate::parser::{DecodedTripUpdate, StopArrival};
    use bytes::Bytes;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(RefreshReport::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(RefreshReport::pct(50, 100), 50.0);
        assert_eq!(RefreshReport::pct(1, 4), 25.0);
    }

    #[test]
    fn test_record_fetch_counts_failures() {
        let mut report = RefreshReport::default();
        let results = vec![
            FetchResult {
                endpoint: "a".to_string(),
                outcome: Ok(Bytes::from_static(b"x")),
            },
            FetchResult {
                endpoint: "b".to_string(),
                outcome: Err(FetchError::Timeout {
                    endpoint: "b".to_string(),
                }),
            },
        ];

        report.record_fetch(&results);

        assert_eq!(report.endpoints, 2);
        assert_eq!(report.fetched, 1);
        assert_eq!(report.fetch_failures, 1);
    }

    #[test]
    fn test_record_decoded_and_arrivals() {
        let mut report = RefreshReport::default();
        report.endpoints = 2;
        report.record_decoded(&DecodedFeed {
            header_timestamp: 1,
            trip_updates: vec![DecodedTripUpdate {
                route_id: "1".to_string(),
                feed_timestamp: 1,
                stops: vec![
                    StopArrival {
                        stop_id: "101N".to_string(),
                        arrival_epoch_secs: 5,
                    },
                    StopArrival {
                        stop_id: "103N".to_string(),
                        arrival_epoch_secs: 6,
                    },
                ],
            }],
        });
        report.record_decode_failure();

        let mut arrivals = ArrivalsSnapshot::new();
        arrivals.insert(
            "101N".to_string(),
            vec![ArrivalEntry {
                arrival_epoch_secs: 5,
                route_id: "1".to_string(),
                feed_timestamp: 1,
                minutes_until_arrival: 0,
            }],
        );
        report.record_arrivals(3, &arrivals);

        assert_eq!(report.trip_updates, 1);
        assert_eq!(report.stop_time_updates, 2);
        assert_eq!(report.decode_failures, 1);
        assert_eq!(report.feed_success_pct(), 50.0);
        assert_eq!(report.watched_stops, 3);
        assert_eq!(report.stops_with_arrivals, 1);
        assert_eq!(report.arrivals, 1);
    }
}
