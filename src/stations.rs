//! Station Directory Loader.
//!
//! Parses the MTA station reference table (`Stations.csv`) into a map keyed by
//! base GTFS stop id, i.e. without the `N`/`S` direction suffix.

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::DirectoryError;
use crate::fetch::{HttpClient, fetch_bytes};

/// Default location of the station reference table.
pub const DEFAULT_STATIONS_URL: &str = "http://web.mta.info/developers/data/nyct/subway/Stations.csv";

const COL_STOP_ID: &str = "GTFS Stop ID";
const COL_STOP_NAME: &str = "Stop Name";
const COL_NORTH_LABEL: &str = "North Direction Label";
const COL_SOUTH_LABEL: &str = "South Direction Label";
const COL_COMPLEX_ID: &str = "Complex ID";

const REQUIRED_COLUMNS: [&str; 5] = [
    COL_STOP_ID,
    COL_STOP_NAME,
    COL_NORTH_LABEL,
    COL_SOUTH_LABEL,
    COL_COMPLEX_ID,
];

/// One row of the station table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRecord {
    #[serde(rename(deserialize = "GTFS Stop ID"))]
    pub base_stop_id: String,
    #[serde(rename(deserialize = "Stop Name"))]
    pub stop_name: String,
    #[serde(rename(deserialize = "North Direction Label"))]
    pub north_direction_label: String,
    #[serde(rename(deserialize = "South Direction Label"))]
    pub south_direction_label: String,
    #[serde(rename(deserialize = "Complex ID"))]
    pub complex_id: String,
}

/// Base stop id to station metadata.
pub type StationDirectory = BTreeMap<String, StationRecord>;

/// Travel direction encoded in a stop id's final character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    North,
    South,
}

impl Direction {
    /// Reads the direction suffix; `None` for anything other than `N` or `S`.
    pub fn from_stop_id(stop_id: &str) -> Option<Self> {
        match stop_id.chars().last()? {
            'N' => Some(Direction::North),
            'S' => Some(Direction::South),
            _ => None,
        }
    }

    /// Generic label used when the station row leaves its label empty.
    pub fn generic_label(self) -> &'static str {
        match self {
            Direction::North => "Uptown",
            Direction::South => "Downtown",
        }
    }
}

impl StationRecord {
    /// The station's label for `direction`, falling back to the generic one.
    pub fn direction_label(&self, direction: Direction) -> &str {
        let label = match direction {
            Direction::North => &self.north_direction_label,
            Direction::South => &self.south_direction_label,
        };
        if label.trim().is_empty() {
            direction.generic_label()
        } else {
            label
        }
    }
}

/// Splits a direction-suffixed stop id into its base id by dropping the final
/// character, whatever it is. Returns `None` for an empty id.
pub fn base_stop_id(stop_id: &str) -> Option<&str> {
    let (idx, _) = stop_id.char_indices().last()?;
    Some(&stop_id[..idx])
}

/// Parses the station table. Either every row parses or the call fails.
///
/// # Errors
///
/// [`DirectoryError::MissingColumn`] if a required header is absent,
/// [`DirectoryError::Parse`] for any malformed row.
pub fn parse_directory(bytes: &[u8]) -> Result<StationDirectory, DirectoryError> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(bytes);

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DirectoryError::MissingColumn(column.to_string()));
        }
    }

    let mut directory = StationDirectory::new();
    for row in reader.deserialize::<StationRecord>() {
        let record = row?;
        directory.insert(record.base_stop_id.clone(), record);
    }

    debug!(stations = directory.len(), "Station directory parsed");
    Ok(directory)
}

/// Fetches and parses the station table.
///
/// # Errors
///
/// [`DirectoryError::Fetch`] when the request fails or returns a non-success
/// status, otherwise the errors of [`parse_directory`].
#[tracing::instrument(skip(client))]
pub async fn load_directory<C: HttpClient + ?Sized>(
    client: &C,
    url: &str,
) -> Result<StationDirectory, DirectoryError> {
    debug!("Fetching station information");
    let body = fetch_bytes(client, url).await?;
    let directory = parse_directory(&body)?;
    info!(stations = directory.len(), "Station directory loaded");
    Ok(directory)
}
