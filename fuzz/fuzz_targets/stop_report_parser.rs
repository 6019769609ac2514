#![no_main]

use chrono::NaiveDate;
use libfuzzer_sys::fuzz_target;
use stopbias::extract::StopEventExtractor;

fuzz_target!(|data: &[u8]| {
    // Malformed reports must be counted or ignored, never panic
    if let Ok(input) = std::str::from_utf8(data) {
        if let Some(date) = NaiveDate::from_ymd_opt(2022, 12, 7) {
            if let Ok(extractor) = StopEventExtractor::new(date) {
                let _ = extractor.extract(input);
            }
        }
    }
});
