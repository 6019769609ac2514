//! End-to-end analysis run and the combined report it produces
//!
//! `BiasReport::build` drives the whole pipeline: extraction, aggregation,
//! the three significance analyses, lookups and the optional breadcrumb
//! inspection. The result renders as text here, or as JSON/CSV through
//! `json_output` and `csv_output`.

use crate::breadcrumbs::{inspect_breadcrumbs, BreadcrumbSummary};
use crate::config::AnalysisConfig;
use crate::extract::StopEventExtractor;
use crate::gps::{load_gps, GpsLoadSummary};
use crate::model::{GroupBy, StopEvent};
use crate::significance::{
    assess_boarding_bias, assess_gps_bias, assess_offs_ons_bias, Assessment, BoardingAssessment,
    GpsAssessment, OffsOnsAssessment, TestResult,
};
use crate::stats::{
    format_event_table, lookup_location, lookup_vehicle, sample_events, LocationLookup, Summary,
    VehicleLookup,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// Inputs of a single run that do not come from the config file
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub report: PathBuf,
    pub gps: Option<PathBuf>,
    pub breadcrumbs: Option<PathBuf>,
    /// Leading events shown in the sample section
    pub sample: usize,
    /// Randomly drawn events shown in the sample section
    pub random_sample: usize,
    pub seed: Option<u64>,
}

impl RunInputs {
    pub fn new(report: impl Into<PathBuf>) -> Self {
        Self {
            report: report.into(),
            gps: None,
            breadcrumbs: None,
            sample: 5,
            random_sample: 3,
            seed: None,
        }
    }
}

/// Outcome of the breadcrumb inspection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BreadcrumbOutcome {
    Inspected(BreadcrumbSummary),
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct EventSample {
    pub head: Vec<StopEvent>,
    pub random: Vec<StopEvent>,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct BiasReport {
    pub report_path: String,
    pub reference_date: NaiveDate,
    pub group_by: GroupBy,
    pub summary: Summary,
    /// Rows that matched the row layout but failed to parse
    pub skipped_rows: usize,
    pub sample: EventSample,
    pub vehicle_lookups: Vec<VehicleLookup>,
    pub location_lookups: Vec<LocationLookup>,
    pub boarding_bias: BoardingAssessment,
    pub offs_ons_bias: OffsOnsAssessment,
    /// Present when a GPS file was loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_data: Option<GpsLoadSummary>,
    pub gps_bias: GpsAssessment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breadcrumbs: Option<BreadcrumbOutcome>,
}

impl BiasReport {
    /// Run the full pipeline
    ///
    /// The stop-event report must be readable. Missing GPS or breadcrumb
    /// files only skip their section.
    pub fn build(config: &AnalysisConfig, inputs: &RunInputs) -> Result<Self> {
        config.validate()?;

        let html = fs::read_to_string(&inputs.report)
            .with_context(|| format!("Failed to read stop-event report {}", inputs.report.display()))?;
        let extraction = StopEventExtractor::new(config.reference_date)?.extract(&html);
        let events = &extraction.events;

        let summary = Summary::from_events(events);

        let mut rng = match inputs.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (head, random) = sample_events(events, inputs.sample, inputs.random_sample, &mut rng);
        let sample = EventSample {
            head: head.into_iter().cloned().collect(),
            random: random.into_iter().cloned().collect(),
        };

        let vehicle_lookups = config
            .lookup
            .vehicles
            .iter()
            .map(|&id| lookup_vehicle(events, id))
            .collect();
        let location_lookups = config
            .lookup
            .locations
            .iter()
            .map(|&id| lookup_location(events, id))
            .collect();

        tracing::info!("Running boarding and offs/ons analyses");
        let boarding_bias = assess_boarding_bias(events, config.group_by, &config.significance)?;
        let offs_ons_bias = assess_offs_ons_bias(events, config.group_by, &config.significance)?;

        let (gps_data, gps_bias) = match &inputs.gps {
            None => (
                None,
                GpsAssessment::skipped("no GPS CSV given", &config.significance),
            ),
            Some(path) => match load_gps(path)? {
                Some(data) => (
                    Some(data.summary()),
                    assess_gps_bias(&data.readings, &config.significance)?,
                ),
                None => (
                    None,
                    GpsAssessment::skipped(
                        format!("GPS CSV file not found: {}", path.display()),
                        &config.significance,
                    ),
                ),
            },
        };

        let breadcrumbs = match &inputs.breadcrumbs {
            None => None,
            Some(path) => Some(
                match inspect_breadcrumbs(path, &config.breadcrumbs.drop_columns)? {
                    Some(summary) => BreadcrumbOutcome::Inspected(summary),
                    None => BreadcrumbOutcome::Skipped {
                        reason: format!("breadcrumb CSV file not found: {}", path.display()),
                    },
                },
            ),
        };

        Ok(Self {
            report_path: inputs.report.display().to_string(),
            reference_date: config.reference_date,
            group_by: config.group_by,
            summary,
            skipped_rows: extraction.skipped_rows,
            sample,
            vehicle_lookups,
            location_lookups,
            boarding_bias,
            offs_ons_bias,
            gps_data,
            gps_bias,
            breadcrumbs,
        })
    }

    /// Per-group results of every analysis, in analysis then key order
    pub fn test_results(&self) -> Vec<TestResult> {
        let mut results = self.boarding_bias.test_results();
        results.extend(self.offs_ons_bias.test_results());
        results.extend(self.gps_bias.test_results());
        results
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();

        out.push_str("Sample data:\n");
        let head: Vec<&StopEvent> = self.sample.head.iter().collect();
        out.push_str(&format_event_table(&head));
        out.push_str("\nRandom sample:\n");
        let random: Vec<&StopEvent> = self.sample.random.iter().collect();
        out.push_str(&format_event_table(&random));
        out.push('\n');

        out.push_str(&self.summary.to_report_string());
        out.push_str(&format!("Skipped rows: {}\n\n", self.skipped_rows));

        if !self.vehicle_lookups.is_empty() || !self.location_lookups.is_empty() {
            out.push_str("Lookups\n");
            for lookup in &self.vehicle_lookups {
                out.push_str(&lookup.to_report_string());
            }
            for lookup in &self.location_lookups {
                out.push_str(&lookup.to_report_string());
            }
            out.push('\n');
        }

        out.push_str(&self.boarding_bias.to_report_string());
        out.push('\n');
        out.push_str(&self.offs_ons_bias.to_report_string());
        out.push('\n');
        if let Some(gps_data) = &self.gps_data {
            out.push_str(&gps_data.to_report_string());
            out.push('\n');
        }
        out.push_str(&self.gps_bias.to_report_string());

        match &self.breadcrumbs {
            Some(BreadcrumbOutcome::Inspected(summary)) => {
                out.push('\n');
                out.push_str(&summary.to_report_string());
            }
            Some(BreadcrumbOutcome::Skipped { reason }) => {
                out.push_str(&format!("\nBreadcrumb Summary\nSkipped: {}\n", reason));
            }
            None => {}
        }

        out
    }
}
