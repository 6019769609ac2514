//! GPS relative-position CSV input
//!
//! Expected header: `TIMESTAMP,VEHICLE_NUMBER,RELPOS`. Extra columns are
//! ignored. The file is optional: when it does not exist the GPS analysis is
//! skipped and the rest of the run continues.

use crate::model::GpsReading;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Rows shown in the head of the load summary
const HEAD_ROWS: usize = 5;

/// Parsed GPS file
#[derive(Debug, Clone, PartialEq)]
pub struct GpsData {
    /// Header columns in file order
    pub columns: Vec<String>,
    pub readings: Vec<GpsReading>,
}

/// What was loaded, printed before the GPS analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsLoadSummary {
    pub records: usize,
    pub vehicles: usize,
    pub columns: Vec<String>,
    pub head: Vec<GpsReading>,
}

impl GpsData {
    pub fn summary(&self) -> GpsLoadSummary {
        let vehicles: BTreeSet<i64> = self.readings.iter().map(|r| r.vehicle_id).collect();
        GpsLoadSummary {
            records: self.readings.len(),
            vehicles: vehicles.len(),
            columns: self.columns.clone(),
            head: self.readings.iter().take(HEAD_ROWS).cloned().collect(),
        }
    }
}

impl GpsLoadSummary {
    pub fn to_report_string(&self) -> String {
        let mut report = String::from("GPS Data Summary\n");
        report.push_str(&format!("Number of GPS records: {}\n", self.records));
        report.push_str(&format!("Vehicles with GPS data: {}\n", self.vehicles));
        report.push_str(&format!("Columns: {}\n", self.columns.join(", ")));
        report.push_str("TIMESTAMP            VEHICLE_NUMBER  RELPOS\n");
        for r in &self.head {
            report.push_str(&format!(
                "{:<20} {:<15} {}\n",
                r.timestamp.as_deref().unwrap_or("-"),
                r.vehicle_id,
                r.relpos
            ));
        }
        report
    }
}

/// Load GPS data, or `None` if the file does not exist
///
/// Any other I/O or CSV error is returned.
pub fn load_gps<P: AsRef<Path>>(path: P) -> Result<Option<GpsData>> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!("GPS file {} not found", path.display());
            return Ok(None);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open GPS CSV {}", path.display()))
        }
    };

    let data =
        read_gps(file).with_context(|| format!("Failed to read GPS CSV {}", path.display()))?;
    tracing::info!(
        "Loaded {} GPS readings from {}",
        data.readings.len(),
        path.display()
    );
    Ok(Some(data))
}

/// Parse GPS data from any CSV source
pub fn read_gps<R: Read>(source: R) -> Result<GpsData> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let columns = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut readings = Vec::new();
    for (idx, record) in reader.deserialize::<GpsReading>().enumerate() {
        // Line numbers are 1-based and the header is line 1
        let reading = record.with_context(|| format!("Invalid GPS row at line {}", idx + 2))?;
        readings.push(reading);
    }
    Ok(GpsData { columns, readings })
}
