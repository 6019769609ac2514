//! JSON output format for bias reports

use crate::report::BiasReport;
use crate::significance::{Analysis, Assessment, BiasVerdict};
use anyhow::{Context, Result};
use serde::Serialize;

/// Verdict of one analysis, repeated at the top level for quick inspection
#[derive(Debug, Clone, Serialize)]
pub struct JsonVerdict {
    pub analysis: Analysis,
    pub alpha: f64,
    pub verdict: BiasVerdict,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Crate version that produced the output
    pub version: String,
    /// Format name
    pub format: String,
    pub verdicts: Vec<JsonVerdict>,
    pub report: &'a BiasReport,
}

impl<'a> JsonOutput<'a> {
    pub fn new(report: &'a BiasReport) -> Self {
        let verdicts = vec![
            verdict_of(&report.boarding_bias),
            verdict_of(&report.offs_ons_bias),
            verdict_of(&report.gps_bias),
        ];

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "stopbias-json-v1".to_string(),
            verdicts,
            report,
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report to JSON")
    }
}

fn verdict_of(assessment: &dyn Assessment) -> JsonVerdict {
    JsonVerdict {
        analysis: assessment.analysis(),
        alpha: assessment.alpha(),
        verdict: assessment.verdict().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::extract::write_report;
    use crate::model::StopEvent;
    use crate::report::RunInputs;
    use chrono::NaiveDate;
    use std::io::Write;

    fn build_report() -> BiasReport {
        let date = NaiveDate::from_ymd_opt(2022, 12, 7).unwrap();
        let events: Vec<StopEvent> = (0..6)
            .map(|i| StopEvent {
                trip_id: "900".to_string(),
                vehicle_id: 100 + i % 2,
                timestamp: date.and_hms_opt(6, i as u32, 0).unwrap(),
                location_id: 7,
                boardings: (i % 3) as u32,
                alightings: 1,
            })
            .collect();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(write_report(&events, date).as_bytes()).unwrap();
        let mut inputs = RunInputs::new(file.path());
        inputs.seed = Some(1);
        BiasReport::build(&AnalysisConfig::default(), &inputs).unwrap()
    }

    #[test]
    fn test_json_top_level_fields() {
        let report = build_report();
        let json = JsonOutput::new(&report).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["format"], "stopbias-json-v1");
        assert_eq!(value["verdicts"].as_array().unwrap().len(), 3);
        assert_eq!(value["verdicts"][0]["analysis"], "boarding_bias");
        assert_eq!(value["verdicts"][2]["verdict"]["kind"], "skipped");
        assert_eq!(value["report"]["summary"]["total_events"], 6);
        assert_eq!(value["report"]["skipped_rows"], 0);
    }

    #[test]
    fn test_json_omits_absent_breadcrumbs() {
        let report = build_report();
        let json = JsonOutput::new(&report).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["report"].get("breadcrumbs").is_none());
    }

    #[test]
    fn test_json_group_by_lowercase() {
        let report = build_report();
        let json = JsonOutput::new(&report).to_json().unwrap();
        assert!(json.contains("\"group_by\": \"vehicle\""));
    }
}
