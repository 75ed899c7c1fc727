//! Date and amount parsers for statement cells

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

/// Why a single cell could not be parsed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("empty date")]
    EmptyDate,

    #[error("date out of range (got year {year}): {raw}")]
    DateOutOfRange { year: i32, raw: String },

    #[error("unparseable date: {0}")]
    UnparseableDate(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Datetime layouts tried after RFC 3339, in priority order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f", // 2024-03-14T10:30:00(.123), no zone
    "%Y-%m-%d %H:%M:%S%.f", // 2024-03-14 10:30:00
    "%d-%m-%Y %H:%M:%S",    // 14-03-2024 10:30:00
];

/// Date-only layouts, in priority order
const DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y", // 14-03-2024
    "%d/%m/%Y", // 14/03/2024
    "%d %b %Y", // 14 Mar 2024
    "%d-%b-%Y", // 14-Mar-2024
    "%Y-%m-%d", // 2024-03-14
];

/// First serial after the phantom 1900-02-29 of the 1900 date system
const LEAP_BUG_SERIAL: f64 = 61.0;

/// Day zero of the 1900 spreadsheet date system.
///
/// Serials from 61 on count one phantom leap day, so they are offset from
/// 1899-12-30; earlier serials count from 1899-12-31 (serial 1 is 1900-01-01).
fn serial_epoch(serial: f64) -> NaiveDate {
    let day = if serial < LEAP_BUG_SERIAL { 31 } else { 30 };
    NaiveDate::from_ymd_opt(1899, 12, day).unwrap_or(NaiveDate::MIN)
}

/// Parse a date cell.
///
/// Textual layouts are tried first; zoned timestamps keep the calendar date
/// as written. A plain number falls back to a spreadsheet serial day, which is
/// rejected when it resolves before `serial_min_year` so that stray small
/// integers (a day-of-month typed into the date column) are not read as
/// 1900-era dates.
pub fn parse_date(raw: &str, serial_min_year: i32) -> Result<NaiveDate, FieldError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(FieldError::EmptyDate);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    if let Ok(serial) = s.parse::<f64>() {
        if serial.is_finite() && serial > 0.0 {
            let date = serial_epoch(serial)
                .checked_add_days(Days::new(serial.trunc() as u64))
                .ok_or_else(|| FieldError::UnparseableDate(s.to_string()))?;
            if date.year() < serial_min_year {
                return Err(FieldError::DateOutOfRange {
                    year: date.year(),
                    raw: s.to_string(),
                });
            }
            return Ok(date);
        }
    }

    Err(FieldError::UnparseableDate(s.to_string()))
}

fn amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:\d+(?:\.\d*)?|\.\d+)$").expect("amount pattern is valid")
    })
}

/// Parse an amount cell as a non-negative magnitude.
///
/// Comma thousands separators are stripped. Sign is never read from this
/// column, so anything other than digits and one decimal point is rejected.
pub fn parse_amount(raw: &str) -> Result<f64, FieldError> {
    let cleaned = raw.trim().replace(',', "");
    if !amount_pattern().is_match(&cleaned) {
        return Err(FieldError::InvalidAmount(raw.trim().to_string()));
    }
    cleaned
        .parse::<f64>()
        .map_err(|_| FieldError::InvalidAmount(raw.trim().to_string()))
}
