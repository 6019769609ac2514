//! Per-group aggregation of stop events
//!
//! Computes the system-wide boarding baseline, per-vehicle or per-location
//! rates, the descriptive summary, and single-group lookups.

use crate::model::{GroupBy, StopEvent};
use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Statistics for a single group of stop events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub group_key: i64,
    /// Number of stop events in the group
    pub total_events: usize,
    /// Stop events with at least one boarding
    pub boarding_events: usize,
    /// boarding_events / total_events
    pub rate: f64,
    /// Total passengers boarding (ons)
    pub boardings: u64,
    /// Total passengers alighting (offs)
    pub alightings: u64,
}

#[derive(Debug, Default)]
struct GroupAccumulator {
    total_events: usize,
    boarding_events: usize,
    boardings: u64,
    alightings: u64,
}

impl GroupAccumulator {
    fn record(&mut self, event: &StopEvent) {
        self.total_events += 1;
        if event.has_boarding() {
            self.boarding_events += 1;
        }
        self.boardings += u64::from(event.boardings);
        self.alightings += u64::from(event.alightings);
    }
}

/// Share of events with at least one boarding
///
/// Returns `None` for an empty event set instead of dividing by zero.
pub fn baseline_rate(events: &[StopEvent]) -> Option<f64> {
    if events.is_empty() {
        return None;
    }
    let boarding = events.iter().filter(|e| e.has_boarding()).count();
    Some(boarding as f64 / events.len() as f64)
}

/// Compute one `GroupStat` per distinct key, in ascending key order
///
/// No smoothing and no minimum sample size: a group with a single event
/// still gets a rate.
pub fn group_stats(events: &[StopEvent], group_by: GroupBy) -> Vec<GroupStat> {
    let mut groups: BTreeMap<i64, GroupAccumulator> = BTreeMap::new();
    for event in events {
        groups.entry(group_by.key(event)).or_default().record(event);
    }

    groups
        .into_iter()
        .map(|(group_key, acc)| GroupStat {
            group_key,
            total_events: acc.total_events,
            boarding_events: acc.boarding_events,
            rate: acc.boarding_events as f64 / acc.total_events as f64,
            boardings: acc.boardings,
            alightings: acc.alightings,
        })
        .collect()
}

/// System-wide passenger totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassengerTotals {
    pub boardings: u64,
    pub alightings: u64,
}

pub fn passenger_totals(events: &[StopEvent]) -> PassengerTotals {
    events.iter().fold(
        PassengerTotals {
            boardings: 0,
            alightings: 0,
        },
        |acc, e| PassengerTotals {
            boardings: acc.boardings + u64::from(e.boardings),
            alightings: acc.alightings + u64::from(e.alightings),
        },
    )
}

/// Descriptive overview of an extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_events: usize,
    pub vehicles: usize,
    pub locations: usize,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    pub boarding_events: usize,
    /// Percentage of events with a boarding, `None` when there are no events
    pub boarding_pct: Option<f64>,
}

impl Summary {
    pub fn from_events(events: &[StopEvent]) -> Self {
        let vehicles: BTreeSet<i64> = events.iter().map(|e| e.vehicle_id).collect();
        let locations: BTreeSet<i64> = events.iter().map(|e| e.location_id).collect();
        let boarding_events = events.iter().filter(|e| e.has_boarding()).count();

        Self {
            total_events: events.len(),
            vehicles: vehicles.len(),
            locations: locations.len(),
            first_timestamp: events.iter().map(|e| e.timestamp).min(),
            last_timestamp: events.iter().map(|e| e.timestamp).max(),
            boarding_events,
            boarding_pct: baseline_rate(events).map(|r| r * 100.0),
        }
    }

    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        report.push_str("Basic Analysis\n");
        report.push_str(&format!("Total events: {}\n\n", self.total_events));
        report.push_str(&format!("Vehicles in data: {}\n", self.vehicles));
        report.push_str(&format!("Unique locations: {}\n", self.locations));
        report.push_str("Time range:\n");
        report.push_str(&format!("   Min: {}\n", fmt_timestamp(self.first_timestamp)));
        report.push_str(&format!("   Max: {}\n", fmt_timestamp(self.last_timestamp)));
        report.push_str(&format!("Events with boarding: {}\n", self.boarding_events));
        report.push_str(&format!(
            "Boarding percentage: {}\n",
            fmt_pct(self.boarding_pct)
        ));
        report
    }
}

/// Lookup result for a single vehicle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VehicleLookup {
    Found {
        vehicle_id: i64,
        stops: usize,
        boarded: u64,
        alighted: u64,
        boarding_pct: f64,
    },
    NotFound {
        vehicle_id: i64,
        /// First few vehicle ids present in the data, ascending
        available: Vec<i64>,
    },
}

/// Lookup result for a single location
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LocationLookup {
    Found {
        location_id: i64,
        stops: usize,
        vehicles: usize,
        boarding_pct: f64,
    },
    NotFound {
        location_id: i64,
        available: Vec<i64>,
    },
}

const AVAILABLE_PREVIEW: usize = 5;

fn first_keys(events: &[StopEvent], group_by: GroupBy) -> Vec<i64> {
    let keys: BTreeSet<i64> = events.iter().map(|e| group_by.key(e)).collect();
    keys.into_iter().take(AVAILABLE_PREVIEW).collect()
}

pub fn lookup_vehicle(events: &[StopEvent], vehicle_id: i64) -> VehicleLookup {
    let matching: Vec<&StopEvent> = events
        .iter()
        .filter(|e| e.vehicle_id == vehicle_id)
        .collect();

    if matching.is_empty() {
        return VehicleLookup::NotFound {
            vehicle_id,
            available: first_keys(events, GroupBy::Vehicle),
        };
    }

    let boarding = matching.iter().filter(|e| e.has_boarding()).count();
    VehicleLookup::Found {
        vehicle_id,
        stops: matching.len(),
        boarded: matching.iter().map(|e| u64::from(e.boardings)).sum(),
        alighted: matching.iter().map(|e| u64::from(e.alightings)).sum(),
        boarding_pct: boarding as f64 / matching.len() as f64 * 100.0,
    }
}

pub fn lookup_location(events: &[StopEvent], location_id: i64) -> LocationLookup {
    let matching: Vec<&StopEvent> = events
        .iter()
        .filter(|e| e.location_id == location_id)
        .collect();

    if matching.is_empty() {
        return LocationLookup::NotFound {
            location_id,
            available: first_keys(events, GroupBy::Location),
        };
    }

    let vehicles: BTreeSet<i64> = matching.iter().map(|e| e.vehicle_id).collect();
    let boarding = matching.iter().filter(|e| e.has_boarding()).count();
    LocationLookup::Found {
        location_id,
        stops: matching.len(),
        vehicles: vehicles.len(),
        boarding_pct: boarding as f64 / matching.len() as f64 * 100.0,
    }
}

impl VehicleLookup {
    pub fn to_report_string(&self) -> String {
        match self {
            VehicleLookup::Found {
                vehicle_id,
                stops,
                boarded,
                alighted,
                boarding_pct,
            } => format!(
                "Vehicle {}:\n  Total stops: {}\n  Total boarded: {}\n  Total alighted: {}\n  Boarding percentage: {:.1}%\n",
                vehicle_id, stops, boarded, alighted, boarding_pct
            ),
            VehicleLookup::NotFound {
                vehicle_id,
                available,
            } => format!(
                "Vehicle {}:\n  Not found in data\n  Available vehicles: {:?} ...\n",
                vehicle_id, available
            ),
        }
    }
}

impl LocationLookup {
    pub fn to_report_string(&self) -> String {
        match self {
            LocationLookup::Found {
                location_id,
                stops,
                vehicles,
                boarding_pct,
            } => format!(
                "Location {}:\n  Stops at location: {}\n  Different buses: {}\n  Boarding percentage: {:.1}%\n",
                location_id, stops, vehicles, boarding_pct
            ),
            LocationLookup::NotFound {
                location_id,
                available,
            } => format!(
                "Location {}:\n  Not found in data\n  Available locations: {:?} ...\n",
                location_id, available
            ),
        }
    }
}

/// Pick the first `head` events plus `random` events drawn without replacement
pub fn sample_events<'a, R: Rng + ?Sized>(
    events: &'a [StopEvent],
    head: usize,
    random: usize,
    rng: &mut R,
) -> (Vec<&'a StopEvent>, Vec<&'a StopEvent>) {
    let first = events.iter().take(head).collect();
    let drawn = events.choose_multiple(rng, random).collect();
    (first, drawn)
}

/// Render events as a fixed-width table
pub fn format_event_table(events: &[&StopEvent]) -> String {
    let mut out = String::from("trip_id      vehicle  tstamp               location  ons  offs\n");
    for e in events {
        out.push_str(&format!(
            "{:<12} {:<8} {:<20} {:<9} {:<4} {}\n",
            e.trip_id,
            e.vehicle_id,
            e.timestamp.format("%Y-%m-%d %H:%M:%S"),
            e.location_id,
            e.boardings,
            e.alightings
        ));
    }
    out
}

fn fmt_timestamp(ts: Option<NaiveDateTime>) -> String {
    ts.map_or_else(|| "n/a".to_string(), |t| t.to_string())
}

fn fmt_pct(pct: Option<f64>) -> String {
    pct.map_or_else(|| "n/a".to_string(), |p| format!("{:.1}%", p))
}
