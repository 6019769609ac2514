//! Property-based tests for extraction and the significance tests
//!
//! Properties covered:
//! 1. Extractor never panics and never reports more rows than it saw
//! 2. write_report then extract reproduces well-formed events
//! 3. Aggregated group sizes add up to the event count
//! 4. p-values stay within [0, 1]

use chrono::{NaiveDate, TimeDelta};
use proptest::prelude::*;
use stopbias::extract::{write_report, StopEventExtractor};
use stopbias::model::{GroupBy, StopEvent};
use stopbias::significance::{binomial_test, chi_square_2x2, one_sample_t_test};
use stopbias::stats::{baseline_rate, group_stats};

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 12, 7).unwrap()
}

fn arb_event() -> impl Strategy<Value = StopEvent> {
    (
        "[0-9A-Za-z]{1,12}",
        0i64..100_000,
        0i64..200_000,
        0i64..20_000,
        0u32..60,
        0u32..60,
    )
        .prop_map(|(trip_id, vehicle_id, offset, location_id, ons, offs)| {
            let midnight = reference_date().and_hms_opt(0, 0, 0).unwrap();
            StopEvent {
                trip_id,
                vehicle_id,
                timestamp: midnight + TimeDelta::seconds(offset),
                location_id,
                boardings: ons,
                alightings: offs,
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_extract_never_panics(input in ".{0,2000}") {
        let extractor = StopEventExtractor::new(reference_date()).unwrap();
        let extraction = extractor.extract(&input);
        // Random text essentially never forms a 24-cell row
        prop_assert!(extraction.events.len() + extraction.skipped_rows <= input.len());
    }

    #[test]
    fn prop_write_then_extract_is_identity(events in prop::collection::vec(arb_event(), 0..40)) {
        let html = write_report(&events, reference_date());
        let extraction = StopEventExtractor::new(reference_date()).unwrap().extract(&html);

        prop_assert_eq!(extraction.skipped_rows, 0);
        prop_assert_eq!(extraction.events, events);
    }

    #[test]
    fn prop_group_sizes_sum_to_total(events in prop::collection::vec(arb_event(), 0..60)) {
        for group_by in [GroupBy::Vehicle, GroupBy::Location] {
            let stats = group_stats(&events, group_by);
            let total: usize = stats.iter().map(|g| g.total_events).sum();
            prop_assert_eq!(total, events.len());
            prop_assert!(stats.windows(2).all(|w| w[0].group_key < w[1].group_key));
            prop_assert!(stats.iter().all(|g| (0.0..=1.0).contains(&g.rate)));
        }
        prop_assert_eq!(baseline_rate(&events).is_none(), events.is_empty());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_binomial_pvalue_in_unit_interval(
        trials in 1u64..500,
        frac in 0.0f64..=1.0,
        p0 in 0.0f64..=1.0,
    ) {
        let successes = ((trials as f64) * frac).floor() as u64;
        let test = binomial_test(successes, trials, p0).unwrap();
        prop_assert!((0.0..=1.0).contains(&test.pvalue), "p = {}", test.pvalue);
    }

    #[test]
    fn prop_chi_square_pvalue_in_unit_interval(
        a in 1u64..1000, b in 1u64..1000, c in 1u64..1000, d in 1u64..1000,
    ) {
        let test = chi_square_2x2([[a, b], [c, d]]).unwrap();
        prop_assert!(test.statistic >= 0.0);
        prop_assert!((0.0..=1.0).contains(&test.pvalue), "p = {}", test.pvalue);
    }

    #[test]
    fn prop_t_test_pvalue_in_unit_interval(
        sample in prop::collection::vec(-10.0f64..10.0, 2..50),
        popmean in -10.0f64..10.0,
    ) {
        let test = one_sample_t_test(&sample, popmean).unwrap();
        prop_assert!((0.0..=1.0).contains(&test.pvalue), "p = {}", test.pvalue);
    }
}
