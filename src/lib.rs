//! Upcoming subway arrivals per watched stop, aggregated from the MTA's GTFS
//! Realtime feeds and station reference table.
//!
//! [`refresh::RefreshController`] is the entry point: it loads the station
//! directory, fetches every feed concurrently, decodes and aggregates them
//! into an immutable [`refresh::DataSnapshot`], and throttles how often that
//! happens.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod refresh;
pub mod stations;
pub mod stats;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
