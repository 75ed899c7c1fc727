//! Row translation
//!
//! Maps one raw row onto a [`ParsedTransactionRow`] or a [`ParseError`].
//! Translation is pure: it never touches storage and never fails the upload.

use serde_json::json;

use crate::cells::cell;
use crate::config::IngestConfig;
use crate::fields::{parse_amount, parse_date};
use crate::fingerprint::fingerprint;
use crate::models::{ParseError, ParsedTransactionRow};

fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn cell_error(row_number: u32, reason: impl Into<String>, raw: &str) -> ParseError {
    ParseError {
        row_number,
        reason: reason.into(),
        payload: json!({ "cell": raw }),
    }
}

/// Translate one data row.
///
/// Checks run in column order (width, date, amount, direction) and the first
/// failure is reported. Upload and account ids are left unset.
pub fn translate_row(
    row: &[String],
    row_number: u32,
    config: &IngestConfig,
) -> Result<ParsedTransactionRow, ParseError> {
    let columns = &config.columns;

    if row.len() < columns.required_width() {
        return Err(ParseError {
            row_number,
            reason: "insufficient columns".to_string(),
            payload: json!({ "cells": row }),
        });
    }

    let raw_date = cell(row, columns.date);
    let transaction_date = parse_date(raw_date, config.dates.serial_min_year)
        .map_err(|e| cell_error(row_number, e.to_string(), raw_date))?;

    let raw_amount = cell(row, columns.amount);
    let amount =
        parse_amount(raw_amount).map_err(|e| cell_error(row_number, e.to_string(), raw_amount))?;

    let raw_direction = cell(row, columns.direction);
    let direction = config
        .directions
        .resolve(raw_direction)
        .ok_or_else(|| cell_error(row_number, "invalid direction marker", raw_direction))?;

    let description = optional_text(cell(row, columns.description));
    let raw_row_hash = fingerprint(
        transaction_date,
        amount,
        direction,
        description.as_deref().unwrap_or(""),
    );

    Ok(ParsedTransactionRow {
        upload_id: None,
        account_id: None,
        transaction_date,
        description,
        amount,
        direction,
        reference_number: optional_text(cell(row, columns.reference)),
        raw_row_hash,
        row_number,
        is_duplicate: None,
    })
}
