//! Feed Decoder: protobuf GTFS Realtime messages into trip/stop records.

use prost::Message;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::DecodeError;
use crate::gtfs_rt::{FeedMessage, TripUpdate};

/// One predicted stop event of a trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopArrival {
    /// Direction-suffixed stop id as published by the feed (e.g. `101N`).
    pub stop_id: String,
    pub arrival_epoch_secs: i64,
}

/// One upstream trip with its remaining stops, in feed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedTripUpdate {
    pub route_id: String,
    /// Header timestamp of the feed this trip came from.
    pub feed_timestamp: u64,
    pub stops: Vec<StopArrival>,
}

/// A decoded feed message. Zero trip updates is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecodedFeed {
    pub header_timestamp: u64,
    pub trip_updates: Vec<DecodedTripUpdate>,
}

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, DecodeError> {
    Ok(FeedMessage::decode(bytes)?)
}

/// Decodes a feed body and flattens its trip updates.
///
/// Entities without a trip update (vehicle positions, deletions) are ignored.
/// A stop-time update contributes its arrival time, or its departure time
/// when no arrival is published; updates with neither or with no stop id are
/// dropped.
pub fn decode_feed(bytes: &[u8]) -> Result<DecodedFeed, DecodeError> {
    let message = parse_feed(bytes)?;
    let header_timestamp = message.header.timestamp.unwrap_or_default();

    let trip_updates: Vec<DecodedTripUpdate> = message
        .entity
        .into_iter()
        .filter(|e| !e.is_deleted.unwrap_or(false))
        .filter_map(|e| e.trip_update)
        .map(|tu| flatten_trip(tu, header_timestamp))
        .collect();

    debug!(
        header_timestamp,
        trip_updates = trip_updates.len(),
        "Feed decoded"
    );

    Ok(DecodedFeed {
        header_timestamp,
        trip_updates,
    })
}

fn flatten_trip(trip_update: TripUpdate, feed_timestamp: u64) -> DecodedTripUpdate {
    let route_id = trip_update.trip.route_id.unwrap_or_default();

    let stops = trip_update
        .stop_time_update
        .into_iter()
        .filter_map(|stu| {
            let time = stu
                .arrival
                .and_then(|a| a.time)
                .or_else(|| stu.departure.and_then(|d| d.time));
            match (stu.stop_id, time) {
                (Some(stop_id), Some(arrival_epoch_secs)) => Some(StopArrival {
                    stop_id,
                    arrival_epoch_secs,
                }),
                (stop_id, _) => {
                    trace!(?stop_id, route_id = %route_id, "Skipping stop-time update without time or stop");
                    None
                }
            }
        })
        .collect();

    DecodedTripUpdate {
        route_id,
        feed_timestamp,
        stops,
    }
}
