//! Breadcrumb CSV inspection
//!
//! Breadcrumbs are the raw per-ping vehicle positions behind a trip. This
//! module counts records and reports which columns remain once the
//! configured noise columns are dropped.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreadcrumbSummary {
    pub records: usize,
    pub original_columns: Vec<String>,
    /// Columns left after dropping, in file order
    pub kept_columns: Vec<String>,
    /// Requested drop columns that were not in the header
    pub missing_drop_columns: Vec<String>,
}

impl BreadcrumbSummary {
    pub fn to_report_string(&self) -> String {
        let mut report = String::from("Breadcrumb Summary\n");
        report.push_str(&format!("Number of breadcrumb records: {}\n", self.records));
        report.push_str(&format!(
            "Original number of columns: {}\n",
            self.original_columns.len()
        ));
        report.push_str(&format!(
            "Number of columns after dropping: {}\n",
            self.kept_columns.len()
        ));
        report.push_str(&format!("Columns: {}\n", self.kept_columns.join(", ")));
        if !self.missing_drop_columns.is_empty() {
            report.push_str(&format!(
                "Drop columns not present: {}\n",
                self.missing_drop_columns.join(", ")
            ));
        }
        report
    }
}

/// Summarize a breadcrumb file, or `None` if it does not exist
pub fn inspect_breadcrumbs<P: AsRef<Path>>(
    path: P,
    drop_columns: &[String],
) -> Result<Option<BreadcrumbSummary>> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!("Breadcrumb file {} not found", path.display());
            return Ok(None);
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to open breadcrumb CSV {}", path.display()))
        }
    };

    summarize_breadcrumbs(file, drop_columns)
        .with_context(|| format!("Failed to read breadcrumb CSV {}", path.display()))
        .map(Some)
}

/// Summarize breadcrumbs from any CSV source
pub fn summarize_breadcrumbs<R: Read>(
    source: R,
    drop_columns: &[String],
) -> Result<BreadcrumbSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let original_columns: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = 0;
    for record in reader.records() {
        record.with_context(|| format!("Invalid breadcrumb record {}", records + 1))?;
        records += 1;
    }

    let kept_columns = original_columns
        .iter()
        .filter(|c| !drop_columns.contains(c))
        .cloned()
        .collect();
    let missing_drop_columns = drop_columns
        .iter()
        .filter(|c| !original_columns.contains(c))
        .cloned()
        .collect();

    Ok(BreadcrumbSummary {
        records,
        original_columns,
        kept_columns,
        missing_drop_columns,
    })
}
