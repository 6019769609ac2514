//! stopbias - bias detection for transit stop-event reports
//!
//! Extracts stop events from the HTML stop-event report, aggregates them per
//! vehicle or per location, and tests each group against the system-wide
//! baseline with binomial, chi-square and one-sample t-tests.

pub mod breadcrumbs;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod extract;
pub mod gps;
pub mod json_output;
pub mod model;
pub mod report;
pub mod significance;
pub mod stats;
