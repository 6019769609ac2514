//! Stop-event extraction from the HTML stop-event report
//!
//! The report is a sequence of trip blocks. Each block starts with an
//! `<h2>Stop events for PDX_TRIP <id></h2>` header and is followed by a table
//! whose data rows carry 24 positional `<td>` cells.
//!
//! Used cells (0-indexed):
//! - 0: vehicle number
//! - 8: arrival time, seconds after midnight of the service date
//! - 10: location id
//! - 13: ons (boardings)
//! - 14: offs (alightings)

use crate::model::{Extraction, StopEvent};
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use regex::{Captures, Regex};
use thiserror::Error;

/// Number of positional cells in a stop-event row
pub const ROW_FIELDS: usize = 24;

const FIELD_VEHICLE: usize = 0;
const FIELD_ARRIVE_TIME: usize = 8;
const FIELD_LOCATION: usize = 10;
const FIELD_ONS: usize = 13;
const FIELD_OFFS: usize = 14;

const BLOCK_HEADER_PATTERN: &str = r"<h2>Stop events for PDX_TRIP\s+([^<]+)</h2>";

/// Why a matched row was dropped
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RowError {
    #[error("field {index} is not a valid integer: {value:?}")]
    InvalidInteger { index: usize, value: String },

    #[error("arrival offset {0}s does not produce a representable timestamp")]
    TimestampOutOfRange(i64),
}

/// Regex-driven extractor for stop-event reports
#[derive(Debug, Clone)]
pub struct StopEventExtractor {
    block_header: Regex,
    row: Regex,
    reference_date: NaiveDate,
}

impl StopEventExtractor {
    /// Build an extractor that anchors arrival offsets on `reference_date`
    pub fn new(reference_date: NaiveDate) -> Result<Self> {
        let block_header =
            Regex::new(BLOCK_HEADER_PATTERN).context("Failed to compile block header pattern")?;

        let mut row_pattern = String::from(r"<tr>\s*");
        for _ in 0..ROW_FIELDS {
            row_pattern.push_str(r"<td>([^<]+)</td>\s*");
        }
        row_pattern.push_str("</tr>");
        let row = Regex::new(&row_pattern).context("Failed to compile row pattern")?;

        Ok(Self {
            block_header,
            row,
            reference_date,
        })
    }

    /// Extract every well-formed stop event, in document order
    ///
    /// Text before the first block header is ignored. Rows that match the
    /// 24-cell layout but fail integer parsing are counted in
    /// `Extraction::skipped_rows` and otherwise dropped.
    pub fn extract(&self, text: &str) -> Extraction {
        let headers: Vec<Captures<'_>> = self.block_header.captures_iter(text).collect();
        let mut extraction = Extraction::default();

        for (i, caps) in headers.iter().enumerate() {
            let (Some(header), Some(trip)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let trip_id = trip.as_str().trim();
            let body_end = headers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let body = &text[header.end()..body_end];

            // A blank trip id cannot be written back as a block header
            if trip_id.is_empty() {
                let rows = self.row.captures_iter(body).count();
                tracing::debug!("Skipping {} rows under a block with a blank trip id", rows);
                extraction.skipped_rows += rows;
                continue;
            }

            for row in self.row.captures_iter(body) {
                match self.parse_row(trip_id, &row) {
                    Ok(event) => extraction.events.push(event),
                    Err(e) => {
                        tracing::debug!("Skipping malformed row in trip {}: {}", trip_id, e);
                        extraction.skipped_rows += 1;
                    }
                }
            }
        }

        if extraction.skipped_rows > 0 {
            tracing::warn!(
                "Dropped {} malformed stop-event rows (kept {})",
                extraction.skipped_rows,
                extraction.events.len()
            );
        }
        tracing::info!(
            "Extracted {} stop events from {} trip blocks",
            extraction.events.len(),
            headers.len()
        );

        extraction
    }

    fn parse_row(&self, trip_id: &str, row: &Captures<'_>) -> Result<StopEvent, RowError> {
        let arrive_offset: i64 = parse_field(row, FIELD_ARRIVE_TIME)?;

        Ok(StopEvent {
            trip_id: trip_id.to_string(),
            vehicle_id: parse_field(row, FIELD_VEHICLE)?,
            timestamp: self.timestamp_at(arrive_offset)?,
            location_id: parse_field(row, FIELD_LOCATION)?,
            boardings: parse_field(row, FIELD_ONS)?,
            alightings: parse_field(row, FIELD_OFFS)?,
        })
    }

    fn timestamp_at(&self, offset_secs: i64) -> Result<NaiveDateTime, RowError> {
        TimeDelta::try_seconds(offset_secs)
            .and_then(|delta| {
                self.reference_date
                    .and_time(chrono::NaiveTime::MIN)
                    .checked_add_signed(delta)
            })
            .ok_or(RowError::TimestampOutOfRange(offset_secs))
    }
}

fn parse_field<T: std::str::FromStr>(row: &Captures<'_>, index: usize) -> Result<T, RowError> {
    // Capture group 0 is the whole row, cell `index` is group `index + 1`
    let raw = row.get(index + 1).map_or("", |m| m.as_str());
    raw.trim()
        .parse::<T>()
        .map_err(|_| RowError::InvalidInteger {
            index,
            value: raw.to_string(),
        })
}

/// Render events back into the stop-event report layout
///
/// Consecutive events sharing a trip id go under one block header. Cells the
/// extractor does not read are written as `0`. Extracting the output with the
/// same reference date reproduces `events`.
pub fn write_report(events: &[StopEvent], reference_date: NaiveDate) -> String {
    let midnight = reference_date.and_time(chrono::NaiveTime::MIN);
    let mut out = String::from("<html><body>\n");
    let mut current_trip: Option<&str> = None;

    for event in events {
        if current_trip != Some(event.trip_id.as_str()) {
            if current_trip.is_some() {
                out.push_str("</table>\n");
            }
            out.push_str(&format!(
                "<h2>Stop events for PDX_TRIP {}</h2>\n<table>\n",
                event.trip_id
            ));
            current_trip = Some(event.trip_id.as_str());
        }

        let mut cells = vec![String::from("0"); ROW_FIELDS];
        cells[FIELD_VEHICLE] = event.vehicle_id.to_string();
        cells[FIELD_ARRIVE_TIME] = (event.timestamp - midnight).num_seconds().to_string();
        cells[FIELD_LOCATION] = event.location_id.to_string();
        cells[FIELD_ONS] = event.boardings.to_string();
        cells[FIELD_OFFS] = event.alightings.to_string();

        out.push_str("<tr>");
        for cell in &cells {
            out.push_str(&format!("<td>{}</td>", cell));
        }
        out.push_str("</tr>\n");
    }

    if current_trip.is_some() {
        out.push_str("</table>\n");
    }
    out.push_str("</body></html>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 12, 7).unwrap()
    }

    /// Build a 24-cell row with the used cells set and the rest filled in
    fn row(vehicle: &str, arrive: &str, location: &str, ons: &str, offs: &str) -> String {
        let mut cells: Vec<String> = (0..ROW_FIELDS).map(|i| format!("x{}", i)).collect();
        cells[FIELD_VEHICLE] = vehicle.to_string();
        cells[FIELD_ARRIVE_TIME] = arrive.to_string();
        cells[FIELD_LOCATION] = location.to_string();
        cells[FIELD_ONS] = ons.to_string();
        cells[FIELD_OFFS] = offs.to_string();
        let tds: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
        format!("<tr>{}</tr>", tds)
    }

    fn extractor() -> StopEventExtractor {
        StopEventExtractor::new(reference_date()).unwrap()
    }

    #[test]
    fn test_extracts_single_block() {
        let html = format!(
            "<h2>Stop events for PDX_TRIP 259172515</h2><table>{}{}</table>",
            row("4062", "21600", "6913", "2", "0"),
            row("4062", "21660", "6914", "0", "1"),
        );

        let extraction = extractor().extract(&html);

        assert_eq!(extraction.skipped_rows, 0);
        assert_eq!(extraction.events.len(), 2);
        let first = &extraction.events[0];
        assert_eq!(first.trip_id, "259172515");
        assert_eq!(first.vehicle_id, 4062);
        assert_eq!(first.location_id, 6913);
        assert_eq!(first.boardings, 2);
        assert_eq!(first.alightings, 0);
        assert_eq!(
            first.timestamp,
            reference_date().and_hms_opt(6, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_rows_keep_document_order_across_blocks() {
        let html = format!(
            "<h2>Stop events for PDX_TRIP 2</h2>{}<h2>Stop events for PDX_TRIP 1</h2>{}{}",
            row("20", "300", "1", "0", "0"),
            row("10", "200", "2", "0", "0"),
            row("10", "100", "3", "0", "0"),
        );

        let events = extractor().extract(&html).events;
        let trips: Vec<&str> = events.iter().map(|e| e.trip_id.as_str()).collect();
        let locations: Vec<i64> = events.iter().map(|e| e.location_id).collect();

        assert_eq!(trips, vec!["2", "1", "1"]);
        assert_eq!(locations, vec![1, 2, 3]);
    }

    #[test]
    fn test_malformed_row_is_counted_not_raised() {
        let html = format!(
            "<h2>Stop events for PDX_TRIP 7</h2>{}{}{}",
            row("4062", "100", "1", "1", "0"),
            row("40x2", "100", "1", "1", "0"),
            row("4062", "100", "1", "-3", "0"),
        );

        let extraction = extractor().extract(&html);

        assert_eq!(extraction.events.len(), 1);
        assert_eq!(extraction.skipped_rows, 2);
    }

    #[test]
    fn test_text_before_first_header_is_ignored() {
        let html = format!(
            "{}<h2>Stop events for PDX_TRIP 9</h2>{}",
            row("1", "0", "1", "1", "1"),
            row("2", "0", "1", "1", "1"),
        );

        let events = extractor().extract(&html).events;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].vehicle_id, 2);
    }

    #[test]
    fn test_short_rows_do_not_match() {
        let html = "<h2>Stop events for PDX_TRIP 9</h2><tr><td>1</td><td>2</td></tr>";
        let extraction = extractor().extract(html);
        assert!(extraction.events.is_empty());
        assert_eq!(extraction.skipped_rows, 0);
    }

    #[test]
    fn test_empty_input() {
        let extraction = extractor().extract("");
        assert!(extraction.events.is_empty());
        assert_eq!(extraction.skipped_rows, 0);
    }

    #[test]
    fn test_offset_past_midnight_rolls_date() {
        let html = format!(
            "<h2>Stop events for PDX_TRIP 1</h2>{}",
            row("1", "90000", "1", "0", "0")
        );
        let events = extractor().extract(&html).events;
        assert_eq!(
            events[0].timestamp,
            NaiveDate::from_ymd_opt(2022, 12, 8)
                .unwrap()
                .and_hms_opt(1, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_cells_are_trimmed() {
        let html = format!(
            "<h2>Stop events for PDX_TRIP  42 </h2>{}",
            row(" 4062 ", "60", " 6913", "1 ", "0")
        );
        let events = extractor().extract(&html).events;
        assert_eq!(events[0].trip_id, "42");
        assert_eq!(events[0].vehicle_id, 4062);
        assert_eq!(events[0].location_id, 6913);
    }

    #[test]
    fn test_write_then_extract_is_identity() {
        let html = format!(
            "<h2>Stop events for PDX_TRIP 1</h2>{}{}<h2>Stop events for PDX_TRIP 2</h2>{}",
            row("4062", "21600", "6913", "2", "0"),
            row("4062", "21660", "6914", "0", "1"),
            row("3011", "86500", "100", "5", "3"),
        );
        let first = extractor().extract(&html).events;

        let written = write_report(&first, reference_date());
        let second = extractor().extract(&written);

        assert_eq!(second.skipped_rows, 0);
        assert_eq!(second.events, first);
    }

    #[test]
    fn test_blank_trip_id_block_is_skipped() {
        let html = format!(
            "<h2>Stop events for PDX_TRIP  </h2>{}<h2>Stop events for PDX_TRIP 5</h2>{}",
            row("4062", "21600", "6913", "2", "0"),
            row("3011", "21700", "100", "1", "1"),
        );
        let first = extractor().extract(&html);

        assert_eq!(first.skipped_rows, 1);
        assert_eq!(first.events.len(), 1);
        assert_eq!(first.events[0].trip_id, "5");

        let written = write_report(&first.events, reference_date());
        let second = extractor().extract(&written);
        assert_eq!(second.skipped_rows, 0);
        assert_eq!(second.events, first.events);
    }

    #[test]
    fn test_write_report_empty() {
        let written = write_report(&[], reference_date());
        assert!(extractor().extract(&written).events.is_empty());
    }
}
