//! Analysis configuration loaded from `stopbias.toml`
//!
//! Every setting has a default, so an empty file (or no file) is valid.
//!
//! # Example stopbias.toml
//!
//! ```toml
//! reference_date = "2022-12-07"
//! group_by = "vehicle"
//!
//! [significance]
//! boarding_alpha = 0.05
//! offs_ons_alpha = 0.05
//! gps_alpha = 0.005
//!
//! [lookup]
//! vehicles = [4062]
//! locations = [6913]
//!
//! [breadcrumbs]
//! drop_columns = ["EVENT_NO_STOP", "GPS_SATELLITES", "GPS_HDOP"]
//! ```

use crate::model::GroupBy;
use crate::significance::SignificanceConfig;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Service date of the stop-event report the tool was written against
pub const DEFAULT_REFERENCE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(2022, 12, 7) {
    Some(date) => date,
    None => panic!("invalid default reference date"),
};

/// Groups to report on individually
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub vehicles: Vec<i64>,
    pub locations: Vec<i64>,
}

/// Breadcrumb CSV handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreadcrumbConfig {
    /// Columns removed before the breadcrumb summary is printed
    pub drop_columns: Vec<String>,
}

impl Default for BreadcrumbConfig {
    fn default() -> Self {
        Self {
            drop_columns: ["EVENT_NO_STOP", "GPS_SATELLITES", "GPS_HDOP"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Date that arrival offsets in the report are counted from
    pub reference_date: NaiveDate,
    /// Partitioning for the boarding and offs/ons analyses
    pub group_by: GroupBy,
    pub significance: SignificanceConfig,
    pub lookup: LookupConfig,
    pub breadcrumbs: BreadcrumbConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_date: DEFAULT_REFERENCE_DATE,
            group_by: GroupBy::default(),
            significance: SignificanceConfig::default(),
            lookup: LookupConfig::default(),
            breadcrumbs: BreadcrumbConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a TOML file
    ///
    /// ```no_run
    /// use stopbias::config::AnalysisConfig;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = AnalysisConfig::from_file("stopbias.toml")?;
    /// println!("Reference date: {}", config.reference_date);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.significance
            .validate()
            .map_err(|e| anyhow::anyhow!("[significance] {}", e))
    }
}
