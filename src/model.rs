//! Core record types shared by the extractor, aggregator and significance tester

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A single stop event from a trip block of the stop-event report.
///
/// Built once by the extractor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopEvent {
    pub trip_id: String,
    pub vehicle_id: i64,
    /// Reference date plus the arrival offset of the row
    pub timestamp: NaiveDateTime,
    pub location_id: i64,
    /// Passengers boarding ("ons")
    pub boardings: u32,
    /// Passengers alighting ("offs")
    pub alightings: u32,
}

impl StopEvent {
    /// True when at least one passenger boarded at this stop
    pub fn has_boarding(&self) -> bool {
        self.boardings >= 1
    }
}

/// Result of running the extractor over a report.
///
/// Rows that matched the row layout but failed integer parsing are not
/// returned, only counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Events in document order
    pub events: Vec<StopEvent>,
    /// Rows dropped because a used field was not a valid integer
    pub skipped_rows: usize,
}

/// One relative-position GPS measurement for a vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsReading {
    #[serde(rename = "TIMESTAMP", default)]
    pub timestamp: Option<String>,
    #[serde(rename = "VEHICLE_NUMBER")]
    pub vehicle_id: i64,
    #[serde(rename = "RELPOS")]
    pub relpos: f64,
}

/// Categorical key used to partition events for per-group comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Vehicle,
    Location,
}

impl GroupBy {
    /// Group key of an event under this partitioning
    pub fn key(self, event: &StopEvent) -> i64 {
        match self {
            GroupBy::Vehicle => event.vehicle_id,
            GroupBy::Location => event.location_id,
        }
    }

    /// Column label used in reports
    pub fn label(self) -> &'static str {
        match self {
            GroupBy::Vehicle => "Vehicle",
            GroupBy::Location => "Location",
        }
    }
}
