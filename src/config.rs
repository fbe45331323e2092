//! Runtime configuration.
//!
//! Loaded from an optional JSON file; every field has a default, and the CLI
//! overrides individual values after loading. The access key normally comes
//! from the `MTA_API_KEY` environment variable rather than the file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::fetch::auth::{ApiKey, InvalidApiKey, UrlParam};
use crate::fetch::{BasicClient, FetchOptions, HttpClient};
use crate::stations::DEFAULT_STATIONS_URL;

/// Feed ids served by the legacy datamine endpoint.
pub const LEGACY_FEED_IDS: [u32; 9] = [1, 26, 16, 21, 2, 11, 31, 36, 51];

const LEGACY_FEED_URL: &str = "http://datamine.mta.info/mta_esi.php";

const MODERN_FEED_BASE_URL: &str = "https://api-endpoint.mta.info/Dataservice/mtagtfsfeeds/nyct%2Fgtfs";

/// One feed per line group: 1-6/GS, ACE, BDFM, G, JZ, NQRW, L, 7, SIR.
pub const MODERN_FEED_SUFFIXES: [&str; 9] = ["", "-ace", "-bdfm", "-g", "-jz", "-nqrw", "-l", "-7", "-si"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid API key: {0}")]
    ApiKey(#[from] InvalidApiKey),
}

/// Which set of realtime endpoints to poll, and how the key is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FeedSet {
    /// `datamine.mta.info`, key as the `key` query parameter.
    Legacy,
    /// `api-endpoint.mta.info`, key in the `x-api-key` header.
    #[default]
    Modern,
}

impl FeedSet {
    /// The static endpoint list, without credentials.
    pub fn endpoints(self) -> Vec<String> {
        match self {
            FeedSet::Legacy => LEGACY_FEED_IDS
                .iter()
                .map(|id| format!("{LEGACY_FEED_URL}?feed_id={id}"))
                .collect(),
            FeedSet::Modern => MODERN_FEED_SUFFIXES
                .iter()
                .map(|suffix| format!("{MODERN_FEED_BASE_URL}{suffix}"))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Direction-suffixed stop ids, e.g. `101N`.
    pub watched_stops: BTreeSet<String>,
    pub feed_set: FeedSet,
    pub stations_url: String,
    /// Minimum time between two refreshes that hit the network.
    pub min_interval_secs: u64,
    pub request_timeout_secs: u64,
    /// Maximum concurrent feed requests.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: String::new(),
            watched_stops: BTreeSet::new(),
            feed_set: FeedSet::default(),
            stations_url: DEFAULT_STATIONS_URL.to_string(),
            min_interval_secs: 20,
            request_timeout_secs: 10,
            concurrency: LEGACY_FEED_IDS.len(),
        }
    }
}

impl Config {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be at least 1".into()));
        }
        if let Some(stop) = self.watched_stops.iter().find(|s| s.chars().count() < 2) {
            return Err(ConfigError::Invalid(format!(
                "watched stop {stop:?} needs a base id and a direction suffix"
            )));
        }
        Ok(())
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            concurrency: self.concurrency,
            timeout: self.request_timeout(),
        }
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.feed_set.endpoints()
    }

    /// Unauthenticated client, used for the station table.
    pub fn plain_client(&self) -> Result<Arc<dyn HttpClient>, ConfigError> {
        let client: Arc<dyn HttpClient> = Arc::new(self.basic_client()?);
        Ok(client)
    }

    /// Client for the realtime feeds with the access key attached the way the
    /// configured [`FeedSet`] expects.
    pub fn feed_client(&self) -> Result<Arc<dyn HttpClient>, ConfigError> {
        let inner = self.basic_client()?;
        let client: Arc<dyn HttpClient> = match self.feed_set {
            FeedSet::Legacy => Arc::new(UrlParam::mta_legacy(inner, self.api_key.clone())),
            FeedSet::Modern => Arc::new(ApiKey::mta(inner, &self.api_key)?),
        };
        Ok(client)
    }

    fn basic_client(&self) -> Result<BasicClient, ConfigError> {
        Ok(BasicClient::new(self.request_timeout())?)
    }
}
