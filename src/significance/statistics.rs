// Hypothesis tests used by the bias analyses
//
// - Exact two-sided binomial test (boarding-event share vs. system baseline)
// - Pearson chi-square on a 2x2 contingency table with Yates correction
//   (offs/ons split of one group vs. the rest of the system)
// - One-sample Student's t-test (group mean vs. global mean)
//
// Distributions come from statrs; the test statistics are computed here.

use serde::Serialize;
use statrs::distribution::{Binomial, ChiSquared, ContinuousCDF, Discrete, StudentsT};
use thiserror::Error;

/// Relative tolerance when collecting outcomes "no more likely" than the
/// observed one in the two-sided binomial test
const BINOM_RELATIVE_TOLERANCE: f64 = 1e-7;

/// Absolute tolerance for treating observed successes as equal to n * p
const BINOM_EXACT_TOLERANCE: f64 = 1e-7;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("probability must be in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("successes ({successes}) exceed trials ({trials})")]
    SuccessesExceedTrials { successes: u64, trials: u64 },

    #[error("need at least {required} samples, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("contingency table has a zero expected frequency")]
    ZeroExpectedFrequency,

    #[error("distribution error: {0}")]
    Distribution(String),
}

/// Result of the exact binomial test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BinomialTest {
    pub successes: u64,
    pub trials: u64,
    /// Null-hypothesis success probability
    pub p0: f64,
    /// Two-sided p-value
    pub pvalue: f64,
}

/// Exact two-sided binomial test
///
/// The p-value is the total probability of every outcome whose probability
/// does not exceed that of the observed count. When the observed count equals
/// `trials * p0` the p-value is exactly 1.0.
pub fn binomial_test(successes: u64, trials: u64, p0: f64) -> Result<BinomialTest, StatsError> {
    if !(0.0..=1.0).contains(&p0) {
        return Err(StatsError::InvalidProbability(p0));
    }
    if successes > trials {
        return Err(StatsError::SuccessesExceedTrials { successes, trials });
    }

    let expected = p0 * trials as f64;
    let pvalue = if (successes as f64 - expected).abs() <= BINOM_EXACT_TOLERANCE {
        1.0
    } else {
        let dist =
            Binomial::new(p0, trials).map_err(|e| StatsError::Distribution(e.to_string()))?;
        let cutoff = dist.pmf(successes) * (1.0 + BINOM_RELATIVE_TOLERANCE);
        (0..=trials)
            .map(|k| dist.pmf(k))
            .filter(|&d| d <= cutoff)
            .sum::<f64>()
            .min(1.0)
    };

    Ok(BinomialTest {
        successes,
        trials,
        p0,
        pvalue,
    })
}

/// Result of a 2x2 chi-square contingency test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChiSquareTest {
    pub statistic: f64,
    pub pvalue: f64,
    pub dof: u32,
    pub expected: [[f64; 2]; 2],
}

/// Pearson chi-square test of independence on a 2x2 table
///
/// Applies the Yates continuity correction: each observed cell moves toward
/// its expected value by at most 0.5. Fails when any expected frequency is
/// zero, e.g. when a whole row or column is empty.
pub fn chi_square_2x2(observed: [[u64; 2]; 2]) -> Result<ChiSquareTest, StatsError> {
    let row_sums = [
        (observed[0][0] + observed[0][1]) as f64,
        (observed[1][0] + observed[1][1]) as f64,
    ];
    let col_sums = [
        (observed[0][0] + observed[1][0]) as f64,
        (observed[0][1] + observed[1][1]) as f64,
    ];
    let total = row_sums[0] + row_sums[1];

    let mut expected = [[0.0; 2]; 2];
    for (i, row) in expected.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = if total > 0.0 {
                row_sums[i] * col_sums[j] / total
            } else {
                0.0
            };
            if *cell <= 0.0 {
                return Err(StatsError::ZeroExpectedFrequency);
            }
        }
    }

    let mut statistic = 0.0;
    for i in 0..2 {
        for j in 0..2 {
            let e = expected[i][j];
            let o = observed[i][j] as f64;
            let diff = e - o;
            let corrected = o + diff.signum() * diff.abs().min(0.5);
            statistic += (corrected - e).powi(2) / e;
        }
    }

    let pvalue = if statistic <= 0.0 {
        1.0
    } else {
        let dist = ChiSquared::new(1.0).map_err(|e| StatsError::Distribution(e.to_string()))?;
        dist.sf(statistic).clamp(0.0, 1.0)
    };

    Ok(ChiSquareTest {
        statistic,
        pvalue,
        dof: 1,
        expected,
    })
}

/// Result of a one-sample t-test
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TTest {
    pub statistic: f64,
    pub pvalue: f64,
    pub df: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std_dev: f64,
}

/// Two-sided one-sample t-test of `sample` against `popmean`
///
/// A sample with zero variance has no t distribution to consult: it gets
/// t = 0, p = 1 when its mean equals `popmean`, and t = ±inf, p = 0 otherwise.
pub fn one_sample_t_test(sample: &[f64], popmean: f64) -> Result<TTest, StatsError> {
    if sample.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            required: 2,
            actual: sample.len(),
        });
    }

    let n = sample.len() as f64;
    let mean = mean(sample);
    let variance = sample.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    let df = n - 1.0;
    let diff = mean - popmean;

    let (statistic, pvalue) = if std_dev == 0.0 {
        if diff == 0.0 {
            (0.0, 1.0)
        } else {
            (f64::INFINITY.copysign(diff), 0.0)
        }
    } else {
        let t = diff / (std_dev / n.sqrt());
        let dist =
            StudentsT::new(0.0, 1.0, df).map_err(|e| StatsError::Distribution(e.to_string()))?;
        (t, (2.0 * dist.sf(t.abs())).min(1.0))
    };

    Ok(TTest {
        statistic,
        pvalue,
        df,
        mean,
        std_dev,
    })
}

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Descriptive statistics of a measurement column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation (n denominator)
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> Option<Describe> {
    if values.is_empty() {
        return None;
    }
    let mean = mean(values);
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / values.len() as f64;

    Some(Describe {
        count: values.len(),
        mean,
        std_dev: variance.sqrt(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binomial_equal_to_baseline_is_one() {
        let result = binomial_test(5, 10, 0.5).unwrap();
        assert_eq!(result.pvalue, 1.0);

        // 2/3 observed against a 2/3 baseline computed from other counts
        let baseline = 40.0 / 60.0;
        let result = binomial_test(2, 3, baseline).unwrap();
        assert_eq!(result.pvalue, 1.0);
    }

    #[test]
    fn test_binomial_known_value() {
        // Two-sided exact test, 3 successes in 10 at p=0.5:
        // P(X<=3) + P(X>=7) = 2 * 176/1024
        let result = binomial_test(3, 10, 0.5).unwrap();
        assert!((result.pvalue - 0.34375).abs() < 1e-9, "{}", result.pvalue);
    }

    #[test]
    fn test_binomial_extreme_is_significant() {
        let result = binomial_test(0, 50, 0.5).unwrap();
        assert!(result.pvalue < 1e-10);
    }

    #[test]
    fn test_binomial_zero_trials() {
        assert_eq!(binomial_test(0, 0, 0.3).unwrap().pvalue, 1.0);
    }

    #[test]
    fn test_binomial_rejects_bad_input() {
        assert_eq!(
            binomial_test(1, 2, 1.5),
            Err(StatsError::InvalidProbability(1.5))
        );
        assert!(matches!(
            binomial_test(3, 2, 0.5),
            Err(StatsError::SuccessesExceedTrials { .. })
        ));
    }

    #[test]
    fn test_chi_square_matching_split_is_one() {
        // Group 10 offs / 30 ons, rest 20 offs / 60 ons: identical 1:3 split
        let result = chi_square_2x2([[10, 30], [20, 60]]).unwrap();
        assert!(result.statistic.abs() < 1e-12);
        assert!((result.pvalue - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_chi_square_yates_known_value() {
        // Expected = 15 everywhere; |o - e| = 5, corrected 4.5 -> 4 * 4.5^2 / 15 = 5.4
        let result = chi_square_2x2([[20, 10], [10, 20]]).unwrap();
        assert!((result.statistic - 5.4).abs() < 1e-9);
        assert!((result.pvalue - 0.020136).abs() < 1e-4, "{}", result.pvalue);
    }

    #[test]
    fn test_chi_square_zero_expected_fails() {
        assert_eq!(
            chi_square_2x2([[0, 5], [0, 7]]),
            Err(StatsError::ZeroExpectedFrequency)
        );
        assert_eq!(
            chi_square_2x2([[0, 0], [0, 0]]),
            Err(StatsError::ZeroExpectedFrequency)
        );
    }

    #[test]
    fn test_t_test_known_value() {
        // mean 3, s = sqrt(2.5), n = 5, popmean 1 -> t = 2 / (1.5811 / 2.2361) = 2.8284
        let result = one_sample_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0], 1.0).unwrap();
        assert!((result.statistic - 2.828427).abs() < 1e-5);
        assert_eq!(result.df, 4.0);
        assert!((result.pvalue - 0.04742).abs() < 1e-4, "{}", result.pvalue);
    }

    #[test]
    fn test_t_test_at_population_mean() {
        let result = one_sample_t_test(&[1.0, 2.0, 3.0], 2.0).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert!((result.pvalue - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_t_test_zero_variance() {
        let same = one_sample_t_test(&[0.5, 0.5, 0.5], 0.5).unwrap();
        assert_eq!(same.pvalue, 1.0);

        let shifted = one_sample_t_test(&[0.7, 0.7, 0.7], 0.5).unwrap();
        assert_eq!(shifted.pvalue, 0.0);
        assert!(shifted.statistic.is_infinite() && shifted.statistic > 0.0);
    }

    #[test]
    fn test_t_test_needs_two_samples() {
        assert_eq!(
            one_sample_t_test(&[1.0], 0.0),
            Err(StatsError::InsufficientSamples {
                required: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_describe() {
        let d = describe(&[2.0, 4.0, 6.0, 8.0]).unwrap();
        assert_eq!(d.count, 4);
        assert_eq!(d.mean, 5.0);
        assert!((d.std_dev - 5.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(d.min, 2.0);
        assert_eq!(d.max, 8.0);
        assert!(describe(&[]).is_none());
    }
}
