//! CSV output format for bias test results
//!
//! One row per tested group across all analyses, for spreadsheet analysis
//! and machine parsing.

use crate::significance::TestResult;
use anyhow::{Context, Result};

/// Column header row
pub const HEADER: [&str; 5] = ["analysis", "group_key", "statistic", "p_value", "flagged"];

/// CSV output formatter
#[derive(Debug, Default)]
pub struct CsvOutput {
    results: Vec<TestResult>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, result: TestResult) {
        self.results.push(result);
    }

    pub fn extend<I: IntoIterator<Item = TestResult>>(&mut self, results: I) {
        self.results.extend(results);
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(HEADER)?;

        for r in &self.results {
            writer.write_record([
                r.analysis.name().to_string(),
                r.group_key.to_string(),
                r.statistic.to_string(),
                r.p_value.to_string(),
                r.flagged.to_string(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e))?;
        String::from_utf8(bytes).context("CSV output is not valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::significance::Analysis;

    fn result(analysis: Analysis, group_key: i64, p_value: f64, flagged: bool) -> TestResult {
        TestResult {
            analysis,
            group_key,
            statistic: 1.5,
            p_value,
            flagged,
        }
    }

    #[test]
    fn test_csv_header_only_when_empty() {
        let output = CsvOutput::new();
        assert_eq!(
            output.to_csv().unwrap(),
            "analysis,group_key,statistic,p_value,flagged\n"
        );
    }

    #[test]
    fn test_csv_rows() {
        let mut output = CsvOutput::new();
        output.add_result(result(Analysis::BoardingBias, 4062, 0.01, true));
        output.add_result(result(Analysis::GpsBias, 3011, 0.5, false));

        let csv = output.to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "boarding_bias,4062,1.5,0.01,true");
        assert_eq!(lines[2], "gps_bias,3011,1.5,0.5,false");
    }

    #[test]
    fn test_csv_parses_back() {
        let mut output = CsvOutput::new();
        output.extend(vec![
            result(Analysis::OffsOnsBias, 1, 0.2, false),
            result(Analysis::OffsOnsBias, 2, 0.001, true),
        ]);

        let csv = output.to_csv().unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let flagged: Vec<String> = reader
            .records()
            .map(|r| r.unwrap()[4].to_string())
            .collect();
        assert_eq!(flagged, vec!["false", "true"]);
    }

    #[test]
    fn test_infinite_statistic_written() {
        let mut output = CsvOutput::new();
        let mut r = result(Analysis::GpsBias, 9, 0.0, true);
        r.statistic = f64::INFINITY;
        output.add_result(r);
        assert!(output.to_csv().unwrap().contains("gps_bias,9,inf,0,true"));
    }
}
