//! User-facing inputs and output.
//!
//! Holds the default query, the result line, and the interactive loop that
//! re-evaluates each line read from the user.

use crate::query::{AreaError, AreaQueryClient};
use chrono::NaiveDate;
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::{debug, warn};
use waterbox_ee::GeoService;
use waterbox_geo::{BoundingBox, DateRange, GeoError};

pub const DEFAULT_START: &str = "2021-04-02";
pub const DEFAULT_END: &str = "2021-04-03";
pub const DEFAULT_MIN_LON: f64 = 20.0;
pub const DEFAULT_MIN_LAT: f64 = 52.0;
pub const DEFAULT_MAX_LON: f64 = 21.0;
pub const DEFAULT_MAX_LAT: f64 = 53.0;

const FIELD_NAMES: [&str; 6] = ["start", "end", "min_lon", "min_lat", "max_lon", "max_lat"];

/// Word that ends the interactive loop.
pub const QUIT_COMMAND: &str = "quit";

/// Errors in a line of interactive input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Expected at most 6 fields, got {0}")]
    TooManyFields(usize),

    #[error("Invalid date for {field}: '{value}' (expected YYYY-MM-DD)")]
    InvalidDate {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Invalid number for {field}: '{value}'")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}

/// The six values a query is made of, before validation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryInputs {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Default for QueryInputs {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2021, 4, 2).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2021, 4, 3).unwrap_or_default(),
            min_lon: DEFAULT_MIN_LON,
            min_lat: DEFAULT_MIN_LAT,
            max_lon: DEFAULT_MAX_LON,
            max_lat: DEFAULT_MAX_LAT,
        }
    }
}

impl QueryInputs {
    /// Check the inputs and build the query values.
    pub fn validate(&self) -> Result<(DateRange, BoundingBox), GeoError> {
        let range = DateRange::new(self.start, self.end)?;
        let bbox = BoundingBox::new(self.min_lon, self.min_lat, self.max_lon, self.max_lat)?;
        Ok((range, bbox))
    }
}

/// The result line shown to the user.
pub fn format_area_line(square_kilometers: f64) -> String {
    format!(
        "Total water area for the selected date range: {:.2} km^2",
        square_kilometers
    )
}

/// An error and its causes, one per line.
///
/// Causes whose text already appears in the report are skipped, so errors that
/// embed their source in their own message are not repeated.
pub fn error_report(err: &dyn std::error::Error) -> String {
    let mut report = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !report.contains(&text) {
            report.push_str("\n  caused by: ");
            report.push_str(&text);
        }
        source = cause.source();
    }
    report
}

/// A parsed line of interactive input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Query(QueryInputs),
    Quit,
    /// Blank line.
    Empty,
}

/// Parse one line of `start end min_lon min_lat max_lon max_lat`.
///
/// Missing trailing fields and fields given as `-` keep their value from
/// `previous`.
pub fn parse_line(line: &str, previous: &QueryInputs) -> Result<Command, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }
    if line.eq_ignore_ascii_case(QUIT_COMMAND) {
        return Ok(Command::Quit);
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() > FIELD_NAMES.len() {
        return Err(InputError::TooManyFields(fields.len()));
    }

    let mut inputs = *previous;
    for (index, value) in fields.into_iter().enumerate() {
        if value == "-" {
            continue;
        }
        let field = FIELD_NAMES[index];
        match index {
            0 => inputs.start = parse_date(field, value)?,
            1 => inputs.end = parse_date(field, value)?,
            2 => inputs.min_lon = parse_number(field, value)?,
            3 => inputs.min_lat = parse_number(field, value)?,
            4 => inputs.max_lon = parse_number(field, value)?,
            _ => inputs.max_lat = parse_number(field, value)?,
        }
    }
    Ok(Command::Query(inputs))
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, InputError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| InputError::InvalidDate {
        field,
        value: value.to_string(),
        source,
    })
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, InputError> {
    value.parse().map_err(|source| InputError::InvalidNumber {
        field,
        value: value.to_string(),
        source,
    })
}

/// Counts from an interactive session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Lines that produced an area.
    pub answered: usize,
    /// Lines that produced an error.
    pub failed: usize,
}

/// Read queries from `input` until end of input or `quit`.
///
/// Each line is evaluated synchronously against `client`; errors are written
/// to `output` and the loop continues.
pub fn run_interactive<S, R, W>(
    client: &AreaQueryClient<S>,
    initial: QueryInputs,
    input: R,
    mut output: W,
) -> std::io::Result<SessionSummary>
where
    S: GeoService,
    R: BufRead,
    W: Write,
{
    let mut current = initial;
    let mut summary = SessionSummary::default();

    writeln!(
        output,
        "Enter: start end min_lon min_lat max_lon max_lat ('-' keeps a value, '{}' exits)",
        QUIT_COMMAND
    )?;

    for line in input.lines() {
        let line = line?;
        let inputs = match parse_line(&line, &current) {
            Ok(Command::Query(inputs)) => inputs,
            Ok(Command::Empty) => continue,
            Ok(Command::Quit) => break,
            Err(e) => {
                writeln!(output, "Error: {}", error_report(&e))?;
                summary.failed += 1;
                continue;
            }
        };
        debug!("Interactive query {:?}", inputs);

        // Rejected values are not kept for the next line.
        let result = match inputs.validate() {
            Ok((range, bbox)) => {
                current = inputs;
                client.water_area(&range, &bbox)
            }
            Err(e) => Err(AreaError::from(e)),
        };
        match result {
            Ok(area) => {
                writeln!(output, "{}", format_area_line(area.square_kilometers))?;
                summary.answered += 1;
            }
            Err(e) => {
                warn!("Query failed: {}", e);
                writeln!(output, "Error: {}", error_report(&e))?;
                summary.failed += 1;
            }
        }
        output.flush()?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_area_line() {
        assert_eq!(
            format_area_line(5.0),
            "Total water area for the selected date range: 5.00 km^2"
        );
        assert_eq!(
            format_area_line(123.456),
            "Total water area for the selected date range: 123.46 km^2"
        );
    }

    #[test]
    fn test_default_inputs() {
        let inputs = QueryInputs::default();
        assert_eq!(inputs.start.to_string(), DEFAULT_START);
        assert_eq!(inputs.end.to_string(), DEFAULT_END);

        let (range, bbox) = inputs.validate().unwrap();
        assert_eq!(range.end_iso(), "2021-04-03");
        assert_eq!(bbox.coords(), [20.0, 52.0, 21.0, 53.0]);
    }

    #[test]
    fn test_validate_rejects_bad_inputs() {
        let inverted = QueryInputs {
            min_lon: 21.0,
            max_lon: 20.0,
            ..QueryInputs::default()
        };
        assert!(inverted.validate().is_err());

        let backwards = QueryInputs {
            start: NaiveDate::from_ymd_opt(2021, 4, 5).unwrap(),
            ..QueryInputs::default()
        };
        assert!(matches!(
            backwards.validate(),
            Err(GeoError::InvertedDateRange { .. })
        ));
    }

    #[test]
    fn test_parse_full_line() {
        let cmd = parse_line("2022-01-01 2022-02-01 -1.5 50 0.5 51", &QueryInputs::default()).unwrap();
        let Command::Query(inputs) = cmd else {
            panic!("expected a query, got {:?}", cmd);
        };
        assert_eq!(inputs.start, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(inputs.end, NaiveDate::from_ymd_opt(2022, 2, 1).unwrap());
        assert_eq!(inputs.min_lon, -1.5);
        assert_eq!(inputs.max_lat, 51.0);
    }

    #[test]
    fn test_parse_keeps_previous_values() {
        let previous = QueryInputs::default();
        let cmd = parse_line("- 2021-04-10 20.5", &previous).unwrap();
        assert_eq!(
            cmd,
            Command::Query(QueryInputs {
                end: NaiveDate::from_ymd_opt(2021, 4, 10).unwrap(),
                min_lon: 20.5,
                ..previous
            })
        );
    }

    #[test]
    fn test_parse_special_lines() {
        let previous = QueryInputs::default();
        assert_eq!(parse_line("   ", &previous).unwrap(), Command::Empty);
        assert_eq!(parse_line("quit", &previous).unwrap(), Command::Quit);
        assert_eq!(parse_line(" QUIT ", &previous).unwrap(), Command::Quit);
    }

    #[test]
    fn test_error_report_skips_repeated_causes() {
        let err = AreaError::from(GeoError::InvertedDateRange {
            start: NaiveDate::from_ymd_opt(2021, 4, 5).unwrap(),
            end: NaiveDate::from_ymd_opt(2021, 4, 3).unwrap(),
        });
        let inner = GeoError::InvertedDateRange {
            start: NaiveDate::from_ymd_opt(2021, 4, 5).unwrap(),
            end: NaiveDate::from_ymd_opt(2021, 4, 3).unwrap(),
        }
        .to_string();

        let report = error_report(&err);
        assert_eq!(report.matches(&inner).count(), 1);
        assert!(!report.contains("caused by"));
    }

    #[test]
    fn test_error_report_appends_new_causes() {
        let err = parse_line("2021-13-01", &QueryInputs::default()).unwrap_err();
        let report = error_report(&err);

        let mut lines = report.lines();
        assert_eq!(
            lines.next(),
            Some("Invalid date for start: '2021-13-01' (expected YYYY-MM-DD)")
        );
        assert!(lines.next().unwrap().starts_with("  caused by: "));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_parse_errors() {
        let previous = QueryInputs::default();
        assert!(matches!(
            parse_line("2021-13-01", &previous),
            Err(InputError::InvalidDate { field: "start", .. })
        ));
        assert!(matches!(
            parse_line("- - abc", &previous),
            Err(InputError::InvalidNumber { field: "min_lon", .. })
        ));
        assert!(matches!(
            parse_line("a b c d e f g", &previous),
            Err(InputError::TooManyFields(7))
        ));
    }
}
