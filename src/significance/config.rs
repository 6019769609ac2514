// Significance cutoffs for the three bias analyses
//
// Each analysis compares its own p-values against its own alpha. The GPS
// analysis uses a stricter default because it runs one t-test per vehicle
// over many noisy position samples.

use serde::{Deserialize, Serialize};

/// Significance levels and sample-size floor for the bias analyses
///
/// # Example
/// ```
/// use stopbias::significance::SignificanceConfig;
///
/// let config = SignificanceConfig::default();
/// assert_eq!(config.boarding_alpha, 0.05);
/// assert_eq!(config.gps_alpha, 0.005);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceConfig {
    /// Cutoff for the per-group binomial test on boarding events
    pub boarding_alpha: f64,

    /// Cutoff for the per-group chi-square test on the offs/ons split
    pub offs_ons_alpha: f64,

    /// Cutoff for the per-vehicle t-test on GPS relative position
    pub gps_alpha: f64,

    /// Minimum readings a vehicle needs before its GPS mean is tested
    ///
    /// The t-test is undefined below 2.
    pub min_gps_samples: usize,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            boarding_alpha: 0.05,
            offs_ons_alpha: 0.05,
            gps_alpha: 0.005,
            min_gps_samples: 2,
        }
    }
}

impl SignificanceConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, alpha) in [
            ("boarding_alpha", self.boarding_alpha),
            ("offs_ons_alpha", self.offs_ons_alpha),
            ("gps_alpha", self.gps_alpha),
        ] {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(format!("{} must be in [0, 1], got {}", name, alpha));
            }
        }

        if self.min_gps_samples < 2 {
            return Err(format!(
                "min_gps_samples must be >= 2 for t-test, got {}",
                self.min_gps_samples
            ));
        }

        Ok(())
    }
}
