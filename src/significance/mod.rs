// Per-group bias detection with hypothesis testing
//
// Three independent analyses compare each group against a system-wide
// reference and flag groups whose p-value falls below the analysis' alpha:
//
// - boarding bias: exact binomial test of the share of stops with a boarding
//   against the system baseline rate
// - offs/ons bias: 2x2 chi-square (Yates) of the group's offs/ons split
//   against the rest of the system
// - GPS bias: one-sample t-test of the vehicle's mean relative position
//   against the mean over all readings
//
// Every function is stateless given its inputs.

mod config;
mod statistics;
mod verdict;

pub use config::SignificanceConfig;
pub use statistics::{
    binomial_test, chi_square_2x2, describe, mean, one_sample_t_test, BinomialTest,
    ChiSquareTest, Describe, StatsError, TTest,
};
pub use verdict::{
    assess_boarding_bias, assess_gps_bias, assess_offs_ons_bias, Analysis, Assessment,
    BiasVerdict, BoardingAssessment, BoardingRow, GpsAssessment, GpsRow, OffsOnsAssessment,
    OffsOnsRow, TestResult,
};
