// Bias verdicts for the three per-group analyses
//
// Each analysis runs one hypothesis test per group, flags the groups whose
// p-value falls below that analysis' alpha, and renders a tabular report.
// Groups are always listed in ascending key order, never by significance.

use crate::model::{GpsReading, GroupBy, StopEvent};
use crate::significance::config::SignificanceConfig;
use crate::significance::statistics::{
    binomial_test, chi_square_2x2, describe, mean, one_sample_t_test, Describe,
};
use crate::stats::{baseline_rate, group_stats, passenger_totals, PassengerTotals};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// The independent analyses the tester can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Analysis {
    /// Binomial test of boarding-event share against the system baseline
    BoardingBias,
    /// Chi-square test of the offs/ons split against the rest of the system
    OffsOnsBias,
    /// One-sample t-test of mean GPS relative position against the global mean
    GpsBias,
}

impl Analysis {
    pub fn name(self) -> &'static str {
        match self {
            Analysis::BoardingBias => "boarding_bias",
            Analysis::OffsOnsBias => "offs_ons_bias",
            Analysis::GpsBias => "gps_bias",
        }
    }
}

/// Final verdict for one analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BiasVerdict {
    /// Groups were tested and none fell below alpha
    NoBias,

    /// At least one group fell below alpha
    Bias {
        /// Flagged group keys, ascending
        flagged_groups: Vec<i64>,
    },

    /// Input was present but no group could be tested
    InsufficientData { reason: String },

    /// Input for this analysis was not available
    Skipped { reason: String },
}

/// Per-group outcome shared by all analyses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub analysis: Analysis,
    pub group_key: i64,
    pub statistic: f64,
    pub p_value: f64,
    /// `p_value < alpha`
    pub flagged: bool,
}

/// Common surface of the three assessments, used by the output formats
pub trait Assessment {
    fn analysis(&self) -> Analysis;
    fn alpha(&self) -> f64;
    fn verdict(&self) -> &BiasVerdict;
    fn test_results(&self) -> Vec<TestResult>;
    fn to_report_string(&self) -> String;
}

fn decide(flagged: Vec<i64>, tested: usize, empty_reason: impl FnOnce() -> String) -> BiasVerdict {
    if tested == 0 {
        BiasVerdict::InsufficientData {
            reason: empty_reason(),
        }
    } else if flagged.is_empty() {
        BiasVerdict::NoBias
    } else {
        BiasVerdict::Bias {
            flagged_groups: flagged,
        }
    }
}

fn verdict_note(verdict: &BiasVerdict) -> Option<String> {
    match verdict {
        BiasVerdict::InsufficientData { reason } => Some(format!("Insufficient data: {}\n", reason)),
        BiasVerdict::Skipped { reason } => Some(format!("Skipped: {}\n", reason)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Boarding bias (binomial)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardingRow {
    pub group_key: i64,
    pub total_events: usize,
    pub boarding_events: usize,
    pub rate: f64,
    pub p_value: f64,
    pub flagged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardingAssessment {
    pub group_by: GroupBy,
    pub alpha: f64,
    /// System-wide share of events with a boarding, `None` without events
    pub baseline: Option<f64>,
    pub boarding_events: usize,
    pub total_events: usize,
    pub rows: Vec<BoardingRow>,
    pub verdict: BiasVerdict,
}

/// Run the exact binomial test for every group against the system baseline
///
/// # Example
/// ```
/// use stopbias::model::GroupBy;
/// use stopbias::significance::{assess_boarding_bias, BiasVerdict, SignificanceConfig};
///
/// let assessment = assess_boarding_bias(&[], GroupBy::Vehicle, &SignificanceConfig::default()).unwrap();
/// assert!(matches!(assessment.verdict, BiasVerdict::InsufficientData { .. }));
/// ```
pub fn assess_boarding_bias(
    events: &[StopEvent],
    group_by: GroupBy,
    config: &SignificanceConfig,
) -> Result<BoardingAssessment> {
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let alpha = config.boarding_alpha;
    let baseline = baseline_rate(events);
    let boarding_events = events.iter().filter(|e| e.has_boarding()).count();
    let mut rows = Vec::new();

    if let Some(p0) = baseline {
        for group in group_stats(events, group_by) {
            match binomial_test(
                group.boarding_events as u64,
                group.total_events as u64,
                p0,
            ) {
                Ok(test) => rows.push(BoardingRow {
                    group_key: group.group_key,
                    total_events: group.total_events,
                    boarding_events: group.boarding_events,
                    rate: group.rate,
                    p_value: test.pvalue,
                    flagged: test.pvalue < alpha,
                }),
                Err(e) => {
                    tracing::warn!("Binomial test failed for group {}: {}", group.group_key, e);
                }
            }
        }
    }

    let flagged = rows.iter().filter(|r| r.flagged).map(|r| r.group_key).collect();
    let verdict = decide(flagged, rows.len(), || {
        "no stop events, baseline boarding rate is undefined".to_string()
    });

    Ok(BoardingAssessment {
        group_by,
        alpha,
        baseline,
        boarding_events,
        total_events: events.len(),
        rows,
        verdict,
    })
}

impl Assessment for BoardingAssessment {
    fn analysis(&self) -> Analysis {
        Analysis::BoardingBias
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn verdict(&self) -> &BiasVerdict {
        &self.verdict
    }

    fn test_results(&self) -> Vec<TestResult> {
        self.rows
            .iter()
            .map(|r| TestResult {
                analysis: Analysis::BoardingBias,
                group_key: r.group_key,
                statistic: r.rate,
                p_value: r.p_value,
                flagged: r.flagged,
            })
            .collect()
    }

    fn to_report_string(&self) -> String {
        let label = self.group_by.label();
        let mut report = String::from("Bias Detection Analysis\n\n");

        match self.baseline {
            Some(rate) => report.push_str(&format!(
                "System-wide boarding rate: {:.3} ({}/{})\n\n",
                rate, self.boarding_events, self.total_events
            )),
            None => report.push_str("System-wide boarding rate: n/a (0/0)\n\n"),
        }
        if let Some(note) = verdict_note(&self.verdict) {
            report.push_str(&note);
            return report;
        }

        report.push_str(&format!("{} Analysis Results:\n", label));
        report.push_str(&format!(
            "{:<8} {:<6} {:<14} {:<7} P_Value\n",
            label, "Stops", "Boarding_Stops", "Rate"
        ));
        for r in &self.rows {
            report.push_str(&format!(
                "{:<8} {:<6} {:<14} {:.3}   {:.4}\n",
                r.group_key, r.total_events, r.boarding_events, r.rate, r.p_value
            ));
        }

        report.push_str(&format!(
            "\n{}s with significant bias (p < {}):\n",
            label, self.alpha
        ));
        let flagged: Vec<&BoardingRow> = self.rows.iter().filter(|r| r.flagged).collect();
        if flagged.is_empty() {
            report.push_str("None found\n");
        } else {
            report.push_str(&format!("{:<10}  P_Value\n", format!("{}_ID", label)));
            for r in flagged {
                report.push_str(&format!("{:<10}  {:.4}\n", r.group_key, r.p_value));
            }
        }

        report
    }
}

// ---------------------------------------------------------------------------
// Offs/ons bias (chi-square)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OffsOnsRow {
    pub group_key: i64,
    pub offs: u64,
    pub ons: u64,
    pub total: u64,
    pub offs_prop: f64,
    pub ons_prop: f64,
    pub chi2: f64,
    pub p_value: f64,
    pub flagged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OffsOnsAssessment {
    pub group_by: GroupBy,
    pub alpha: f64,
    pub totals: PassengerTotals,
    pub rows: Vec<OffsOnsRow>,
    /// Groups with passenger activity whose table could not be tested
    pub untestable_groups: Vec<i64>,
    pub verdict: BiasVerdict,
}

/// Compare each group's offs/ons split with the rest of the system
///
/// Groups with no passenger activity are left out. A group whose 2x2 table
/// has a zero expected frequency is recorded in `untestable_groups`.
pub fn assess_offs_ons_bias(
    events: &[StopEvent],
    group_by: GroupBy,
    config: &SignificanceConfig,
) -> Result<OffsOnsAssessment> {
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let alpha = config.offs_ons_alpha;
    let totals = passenger_totals(events);
    let system_total = totals.alightings + totals.boardings;
    let mut rows = Vec::new();
    let mut untestable_groups = Vec::new();

    if system_total > 0 {
        for group in group_stats(events, group_by) {
            let (offs, ons) = (group.alightings, group.boardings);
            let total = offs + ons;
            if total == 0 {
                tracing::debug!("Group {} has no passenger activity", group.group_key);
                continue;
            }

            let table = [
                [offs, ons],
                [totals.alightings - offs, totals.boardings - ons],
            ];
            match chi_square_2x2(table) {
                Ok(test) => rows.push(OffsOnsRow {
                    group_key: group.group_key,
                    offs,
                    ons,
                    total,
                    offs_prop: offs as f64 / total as f64,
                    ons_prop: ons as f64 / total as f64,
                    chi2: test.statistic,
                    p_value: test.pvalue,
                    flagged: test.pvalue < alpha,
                }),
                Err(e) => {
                    tracing::warn!("Chi-square test failed for group {}: {}", group.group_key, e);
                    untestable_groups.push(group.group_key);
                }
            }
        }
    }

    let flagged = rows.iter().filter(|r| r.flagged).map(|r| r.group_key).collect();
    let verdict = decide(flagged, rows.len(), || {
        if system_total == 0 {
            "no passenger activity in the system".to_string()
        } else {
            format!(
                "no group produced a testable contingency table (untestable={})",
                untestable_groups.len()
            )
        }
    });

    Ok(OffsOnsAssessment {
        group_by,
        alpha,
        totals,
        rows,
        untestable_groups,
        verdict,
    })
}

impl Assessment for OffsOnsAssessment {
    fn analysis(&self) -> Analysis {
        Analysis::OffsOnsBias
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn verdict(&self) -> &BiasVerdict {
        &self.verdict
    }

    fn test_results(&self) -> Vec<TestResult> {
        self.rows
            .iter()
            .map(|r| TestResult {
                analysis: Analysis::OffsOnsBias,
                group_key: r.group_key,
                statistic: r.chi2,
                p_value: r.p_value,
                flagged: r.flagged,
            })
            .collect()
    }

    fn to_report_string(&self) -> String {
        let label = self.group_by.label();
        let offs = self.totals.alightings;
        let ons = self.totals.boardings;
        let total = offs + ons;
        let mut report = String::from("Offs/Ons Ratio Bias Detection Analysis\n\n");

        report.push_str("System-wide statistics:\n");
        report.push_str(&format!("  Total offs: {}\n", offs));
        report.push_str(&format!("  Total ons:  {}\n", ons));
        report.push_str(&format!("  Total:      {}\n", total));
        if total > 0 {
            report.push_str(&format!(
                "  Offs proportion: {:.4}\n",
                offs as f64 / total as f64
            ));
            report.push_str(&format!(
                "  Ons proportion:  {:.4}\n",
                ons as f64 / total as f64
            ));
        }
        report.push('\n');

        if let Some(note) = verdict_note(&self.verdict) {
            report.push_str(&note);
            return report;
        }

        report.push_str(&format!("{} Offs/Ons Analysis Results:\n", label));
        report.push_str(&format!(
            "{:<8} Offs   Ons    Total  Offs_Prop  Ons_Prop   Chi2_Stat  P_Value\n",
            label
        ));
        for r in &self.rows {
            report.push_str(&format!(
                "{:<8} {:<6} {:<6} {:<6} {:.3}      {:.3}      {:.3}      {:.6}\n",
                r.group_key, r.offs, r.ons, r.total, r.offs_prop, r.ons_prop, r.chi2, r.p_value
            ));
        }

        if !self.untestable_groups.is_empty() {
            report.push_str(&format!(
                "\nUntestable {}s (zero expected frequency): {:?}\n",
                label.to_lowercase(),
                self.untestable_groups
            ));
        }

        report.push_str(&format!(
            "\n{}s with significant offs/ons bias (p < {}):\n",
            label, self.alpha
        ));
        let flagged: Vec<&OffsOnsRow> = self.rows.iter().filter(|r| r.flagged).collect();
        if flagged.is_empty() {
            report.push_str("None found\n");
        } else {
            report.push_str(&format!(
                "{:<10}  P_Value     Offs_Prop  Ons_Prop\n",
                format!("{}_ID", label)
            ));
            report.push_str(&format!("{}\n", "-".repeat(40)));
            for r in &flagged {
                report.push_str(&format!(
                    "{:<10}  {:.6}  {:.3}      {:.3}\n",
                    r.group_key, r.p_value, r.offs_prop, r.ons_prop
                ));
            }
        }
        report.push_str(&format!(
            "\nTotal {}s with significant offs/ons bias: {}\n",
            label.to_lowercase(),
            flagged.len()
        ));

        report
    }
}

// ---------------------------------------------------------------------------
// GPS bias (one-sample t-test)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsRow {
    pub vehicle_id: i64,
    pub measurements: usize,
    pub mean: f64,
    /// Population standard deviation of the vehicle's readings
    pub std_dev: f64,
    pub t_statistic: f64,
    pub p_value: f64,
    pub flagged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GpsAssessment {
    pub alpha: f64,
    /// RELPOS statistics over every reading
    pub overall: Option<Describe>,
    pub rows: Vec<GpsRow>,
    pub verdict: BiasVerdict,
}

impl GpsAssessment {
    /// Assessment for a run where the GPS input was not available
    pub fn skipped(reason: impl Into<String>, config: &SignificanceConfig) -> Self {
        Self {
            alpha: config.gps_alpha,
            overall: None,
            rows: Vec::new(),
            verdict: BiasVerdict::Skipped {
                reason: reason.into(),
            },
        }
    }
}

/// Test each vehicle's mean relative position against the global mean
///
/// Vehicles with fewer than `min_gps_samples` readings are not tested.
pub fn assess_gps_bias(
    readings: &[GpsReading],
    config: &SignificanceConfig,
) -> Result<GpsAssessment> {
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let alpha = config.gps_alpha;
    let all: Vec<f64> = readings.iter().map(|r| r.relpos).collect();
    let overall = describe(&all);
    let global_mean = mean(&all);

    let mut by_vehicle: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for reading in readings {
        by_vehicle
            .entry(reading.vehicle_id)
            .or_default()
            .push(reading.relpos);
    }

    let mut rows = Vec::new();
    for (vehicle_id, values) in &by_vehicle {
        if values.len() < config.min_gps_samples {
            tracing::debug!(
                "Vehicle {} has {} GPS readings, need {}",
                vehicle_id,
                values.len(),
                config.min_gps_samples
            );
            continue;
        }

        match one_sample_t_test(values, global_mean) {
            Ok(test) => rows.push(GpsRow {
                vehicle_id: *vehicle_id,
                measurements: values.len(),
                mean: test.mean,
                std_dev: describe(values).map_or(0.0, |d| d.std_dev),
                t_statistic: test.statistic,
                p_value: test.pvalue,
                flagged: test.pvalue < alpha,
            }),
            Err(e) => {
                tracing::warn!("t-test failed for vehicle {}: {}", vehicle_id, e);
            }
        }
    }

    let flagged = rows.iter().filter(|r| r.flagged).map(|r| r.vehicle_id).collect();
    let verdict = decide(flagged, rows.len(), || {
        format!(
            "no vehicle has at least {} GPS readings ({} readings, {} vehicles)",
            config.min_gps_samples,
            readings.len(),
            by_vehicle.len()
        )
    });

    Ok(GpsAssessment {
        alpha,
        overall,
        rows,
        verdict,
    })
}

impl Assessment for GpsAssessment {
    fn analysis(&self) -> Analysis {
        Analysis::GpsBias
    }

    fn alpha(&self) -> f64 {
        self.alpha
    }

    fn verdict(&self) -> &BiasVerdict {
        &self.verdict
    }

    fn test_results(&self) -> Vec<TestResult> {
        self.rows
            .iter()
            .map(|r| TestResult {
                analysis: Analysis::GpsBias,
                group_key: r.vehicle_id,
                statistic: r.t_statistic,
                p_value: r.p_value,
                flagged: r.flagged,
            })
            .collect()
    }

    fn to_report_string(&self) -> String {
        let mut report = String::from("GPS Bias Detection Analysis\n\n");

        if let Some(overall) = &self.overall {
            report.push_str("Overall RELPOS statistics:\n");
            report.push_str(&format!("  Mean: {:.6}\n", overall.mean));
            report.push_str(&format!("  Std:  {:.6}\n", overall.std_dev));
            report.push_str(&format!("  Min:  {:.6}\n", overall.min));
            report.push_str(&format!("  Max:  {:.6}\n", overall.max));
            report.push_str(&format!("  Total measurements: {}\n\n", overall.count));
        }

        if let Some(note) = verdict_note(&self.verdict) {
            report.push_str(&note);
            return report;
        }

        report.push_str("GPS Vehicle Analysis Results:\n");
        report.push_str("Vehicle  Measurements  Mean_RELPOS  Std_RELPOS   T_Stat   P_Value\n");
        for r in &self.rows {
            report.push_str(&format!(
                "{:<8} {:<12} {:<11.4} {:<11.4} {:<8.3} {:.6}\n",
                r.vehicle_id, r.measurements, r.mean, r.std_dev, r.t_statistic, r.p_value
            ));
        }

        report.push_str(&format!(
            "\nVehicles with significant GPS bias (p < {}):\n",
            self.alpha
        ));
        let flagged: Vec<&GpsRow> = self.rows.iter().filter(|r| r.flagged).collect();
        if flagged.is_empty() {
            report.push_str("None found\n");
        } else {
            report.push_str("Vehicle_ID  P_Value     Mean_RELPOS\n");
            report.push_str(&format!("{}\n", "-".repeat(35)));
            for r in &flagged {
                report.push_str(&format!(
                    "{:<10}  {:.6}  {:.6}\n",
                    r.vehicle_id, r.p_value, r.mean
                ));
            }
        }
        report.push_str(&format!(
            "\nTotal vehicles with significant GPS bias: {}\n",
            flagged.len()
        ));

        report
    }
}
