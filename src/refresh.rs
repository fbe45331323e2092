//! Throttled Refresh Controller.
//!
//! Owns the published [`DataSnapshot`] with its [`RefreshReport`], and the
//! time the last successful refresh started. [`RefreshController::request`] is the only way new data
//! enters the system: it either hands back the current snapshot untouched
//! (called within `min_interval` of the last refresh start) or runs the whole
//! pipeline and atomically swaps in the result.
//!
//! Concurrent callers are serialized on an async mutex. A caller arriving
//! while a refresh is running waits for it, then finds the controller fresh
//! and receives the snapshot that refresh published.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::aggregate::{ArrivalsSnapshot, aggregate};
use crate::config::Config;
use crate::error::RefreshError;
use crate::fetch::{FetchOptions, FetchResult, HttpClient, fetch_all};
use crate::parser::{DecodedFeed, decode_feed};
use crate::stations::{StationDirectory, load_directory};
use crate::stats::RefreshReport;

/// Result of one successful refresh. Never mutated after publication.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DataSnapshot {
    pub stations: StationDirectory,
    pub arrivals: ArrivalsSnapshot,
    pub generated_at: DateTime<Utc>,
}

/// Everything a refresh cycle needs besides its HTTP clients.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub stations_url: String,
    pub endpoints: Vec<String>,
    pub watched_stops: BTreeSet<String>,
    pub min_interval: Duration,
    pub fetch: FetchOptions,
}

impl From<&Config> for RefreshSettings {
    fn from(config: &Config) -> Self {
        RefreshSettings {
            stations_url: config.stations_url.clone(),
            endpoints: config.endpoints(),
            watched_stops: config.watched_stops.clone(),
            min_interval: config.min_interval(),
            fetch: config.fetch_options(),
        }
    }
}

pub struct RefreshController {
    stations_client: Arc<dyn HttpClient>,
    feed_client: Arc<dyn HttpClient>,
    settings: RefreshSettings,
    /// Start time of the last successful refresh; the lock serializes refreshes.
    last_started: Mutex<Option<Instant>>,
    /// Snapshot and the report of the cycle that produced it, swapped as one.
    published: RwLock<Option<(Arc<DataSnapshot>, RefreshReport)>>,
}

impl RefreshController {
    pub fn new(
        stations_client: Arc<dyn HttpClient>,
        feed_client: Arc<dyn HttpClient>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            stations_client,
            feed_client,
            settings,
            last_started: Mutex::new(None),
            published: RwLock::new(None),
        }
    }

    /// The currently published snapshot, if any refresh has succeeded yet.
    pub fn snapshot(&self) -> Option<Arc<DataSnapshot>> {
        self.published().map(|(snapshot, _)| snapshot)
    }

    /// Counters of the last successful refresh.
    pub fn last_report(&self) -> Option<RefreshReport> {
        self.published().map(|(_, report)| report)
    }

    /// The current snapshot together with the report of the refresh that
    /// produced it.
    pub fn published(&self) -> Option<(Arc<DataSnapshot>, RefreshReport)> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the current snapshot if it is still fresh, otherwise refreshes.
    ///
    /// # Errors
    ///
    /// Fails only when the station directory cannot be loaded. No snapshot is
    /// published in that case and the previous one stays current.
    pub async fn request(&self) -> Result<Arc<DataSnapshot>, RefreshError> {
        let mut last_started = self.last_started.lock().await;

        if let (Some(started), Some(snapshot)) = (*last_started, self.snapshot()) {
            let age = started.elapsed();
            if age < self.settings.min_interval {
                debug!(age_ms = age.as_millis() as u64, "Snapshot still fresh, skipping refresh");
                return Ok(snapshot);
            }
        }

        self.run(&mut last_started).await
    }

    /// Refreshes regardless of the throttle. Still waits for any refresh
    /// already in flight.
    pub async fn force_refresh(&self) -> Result<Arc<DataSnapshot>, RefreshError> {
        let mut last_started = self.last_started.lock().await;
        self.run(&mut last_started).await
    }

    async fn run(&self, last_started: &mut Option<Instant>) -> Result<Arc<DataSnapshot>, RefreshError> {
        let started = Instant::now();
        let (snapshot, report) = self.refresh(Utc::now()).await?;

        *self.published.write().unwrap_or_else(PoisonError::into_inner) = Some((snapshot.clone(), report));
        *last_started = Some(started);

        Ok(snapshot)
    }

    #[tracing::instrument(skip(self), fields(endpoints = self.settings.endpoints.len()))]
    async fn refresh(
        &self,
        started_at: DateTime<Utc>,
    ) -> Result<(Arc<DataSnapshot>, RefreshReport), RefreshError> {
        let mut report = RefreshReport::new(started_at);

        let stations = load_directory(&self.stations_client, &self.settings.stations_url)
            .await
            .inspect_err(|e| error!(error = %e, "Station directory load failed, keeping previous snapshot"))?;
        report.stations = stations.len();

        let results = fetch_all(
            self.feed_client.clone(),
            &self.settings.endpoints,
            self.settings.fetch,
        )
        .await;
        report.record_fetch(&results);

        let feeds = decode_all(&results, &mut report);

        let generated_at = Utc::now();
        let arrivals = aggregate(
            &stations,
            &feeds,
            &self.settings.watched_stops,
            generated_at.timestamp(),
        );
        report.record_arrivals(self.settings.watched_stops.len(), &arrivals);

        info!(
            stations = report.stations,
            fetched = report.fetched,
            fetch_failures = report.fetch_failures,
            decode_failures = report.decode_failures,
            trip_updates = report.trip_updates,
            arrivals = report.arrivals,
            "Refresh complete"
        );

        let snapshot = Arc::new(DataSnapshot {
            stations,
            arrivals,
            generated_at,
        });
        Ok((snapshot, report))
    }
}

/// Decodes every successful fetch, skipping bodies that fail to decode.
fn decode_all(results: &[FetchResult], report: &mut RefreshReport) -> Vec<DecodedFeed> {
    let mut feeds = Vec::with_capacity(results.len());

    for result in results {
        let Ok(body) = &result.outcome else {
            continue;
        };
        match decode_feed(body) {
            Ok(feed) => {
                report.record_decoded(&feed);
                feeds.push(feed);
            }
            Err(e) => {
                warn!(endpoint = %result.endpoint, bytes = body.len(), error = %e, "Failed to decode feed");
                report.record_decode_failure();
            }
        }
    }

    feeds
}
