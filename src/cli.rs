//! CLI argument parsing for stopbias

use crate::config::AnalysisConfig;
use crate::model::GroupBy;
use crate::report::RunInputs;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for bias reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "stopbias")]
#[command(version)]
#[command(
    about = "Detect per-vehicle and per-location bias in transit stop-event reports",
    long_about = None
)]
pub struct Cli {
    /// HTML stop-event report to analyze
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// GPS relative-position CSV (TIMESTAMP, VEHICLE_NUMBER, RELPOS)
    #[arg(long = "gps", value_name = "CSV")]
    pub gps: Option<PathBuf>,

    /// Breadcrumb CSV to inspect
    #[arg(long = "breadcrumbs", value_name = "CSV")]
    pub breadcrumbs: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Service date the arrival offsets are counted from (YYYY-MM-DD)
    #[arg(long = "reference-date", value_name = "DATE")]
    pub reference_date: Option<NaiveDate>,

    /// Partition for the boarding and offs/ons analyses
    #[arg(long = "group-by", value_enum)]
    pub group_by: Option<GroupBy>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Number of leading events shown in the sample section
    #[arg(long = "sample", value_name = "N", default_value = "5")]
    pub sample: usize,

    /// Number of randomly drawn events shown in the sample section
    #[arg(long = "random-sample", value_name = "N", default_value = "3")]
    pub random_sample: usize,

    /// Seed for the random sample
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Vehicle id to report on individually (repeatable)
    #[arg(long = "vehicle", value_name = "ID")]
    pub vehicles: Vec<i64>,

    /// Location id to report on individually (repeatable)
    #[arg(long = "location", value_name = "ID")]
    pub locations: Vec<i64>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded config
    pub fn apply_overrides(&self, config: &mut AnalysisConfig) {
        if let Some(date) = self.reference_date {
            config.reference_date = date;
        }
        if let Some(group_by) = self.group_by {
            config.group_by = group_by;
        }
        config.lookup.vehicles.extend(&self.vehicles);
        config.lookup.locations.extend(&self.locations);
    }

    pub fn run_inputs(&self) -> RunInputs {
        RunInputs {
            report: self.report.clone(),
            gps: self.gps.clone(),
            breadcrumbs: self.breadcrumbs.clone(),
            sample: self.sample,
            random_sample: self.random_sample,
            seed: self.seed,
        }
    }
}
