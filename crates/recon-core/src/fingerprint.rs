//! Content fingerprints for statement rows
//!
//! The fingerprint is the natural key of a statement transaction: two rows
//! with the same fingerprint are the same transaction no matter which upload
//! introduced them. It only covers user-visible identity (date, amount,
//! direction, description) so re-uploading an overlapping statement is a
//! no-op for the overlapping rows.

use chrono::{NaiveDate, NaiveTime, SecondsFormat};
use sha2::{Digest, Sha256};

use crate::models::Direction;

/// Field delimiter inside the hashed canonical form
const DELIMITER: char = '|';

/// Canonical text form that gets hashed.
///
/// The date is rendered as a fully-qualified midnight UTC timestamp and the
/// amount through [`format_amount`].
pub fn canonical_form(
    date: NaiveDate,
    amount: f64,
    direction: Direction,
    description: &str,
) -> String {
    let date = date
        .and_time(NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        "{date}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{description}",
        format_amount(amount),
        direction.as_str()
    )
}

/// Two decimal places, widened only when that would lose precision.
///
/// `12.5` and `12.50` both render `12.50`; `12.501` renders `12.501` so it
/// never collides with `12.50`.
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount);
    if fixed.parse::<f64>().ok() == Some(amount) {
        fixed
    } else {
        amount.to_string()
    }
}

/// SHA-256 of the canonical form, hex encoded
pub fn fingerprint(date: NaiveDate, amount: f64, direction: Direction, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_form(date, amount, direction, description).as_bytes());
    hex::encode(hasher.finalize())
}
