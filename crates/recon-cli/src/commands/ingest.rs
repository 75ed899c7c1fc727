//! Statement ingestion command

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use recon_core::{
    Database, IngestConfig, IngestResult, StatementFormat, StatementIngestor, UploadRequest,
};
use tracing::debug;

use super::truncate;

/// Arguments of `recon ingest`
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub file: PathBuf,
    pub account: String,
    pub user: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub json: bool,
}

/// Ingest one statement file and report the summary
pub fn cmd_ingest(
    db: &Database,
    config: &IngestConfig,
    opts: &IngestOptions,
) -> Result<IngestResult> {
    if opts.from > opts.to {
        bail!(
            "Statement period start {} is after its end {}",
            opts.from,
            opts.to
        );
    }

    let file_name = opts
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Not a file: {}", opts.file.display()))?;

    // Reject unsupported formats before anything is written
    StatementFormat::from_file_name(&file_name).map_err(|e| anyhow!("Statement rejected: {}", e))?;

    let account_id = db
        .upsert_account(&opts.account)
        .context("Failed to resolve account")?;
    debug!("Account '{}' is #{}", opts.account, account_id);

    let request = UploadRequest {
        user_id: opts.user.clone(),
        account_id,
        file_name,
        statement_period_start: opts.from,
        statement_period_end: opts.to,
        file_size_bytes: None,
    };

    if !opts.json {
        println!("📥 Ingesting {}...", opts.file.display());
    }

    let result = StatementIngestor::new(db, config)
        .ingest_file(&request, &opts.file)
        .map_err(|e| {
            if e.is_file_level() {
                anyhow!("Statement rejected: {}", e)
            } else {
                anyhow!(e).context("Failed to store statement")
            }
        })?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result);
    }

    print_summary(&result);
    Ok(result)
}

fn print_summary(result: &IngestResult) {
    let summary = &result.summary;

    match result.upload_id {
        Some(id) => println!("✅ Upload {} complete!", id),
        None => {
            println!("ℹ️  No rows found after the header; nothing was stored.");
            return;
        }
    }
    println!("   Rows:       {}", summary.total_rows);
    println!("   New:        {}", summary.valid_rows);
    println!("   Duplicates: {}", summary.duplicate_rows);
    println!("   Errors:     {}", summary.error_rows);

    let duplicates: Vec<_> = result
        .rows
        .iter()
        .filter(|r| r.is_duplicate == Some(true))
        .collect();
    if !duplicates.is_empty() {
        println!();
        println!("🔁 Already recorded:");
        for row in duplicates {
            println!(
                "   row {:>4}: {} {:>12.2} {:<6} {}",
                row.row_number,
                row.transaction_date,
                row.amount,
                row.direction.as_str(),
                truncate(row.description.as_deref().unwrap_or(""), 40)
            );
        }
    }

    if !summary.errors.is_empty() {
        println!();
        println!("⚠️  Rows that could not be read:");
        for error in &summary.errors {
            println!("   row {:>4}: {} {}", error.row_number, error.reason, error.payload);
        }
    }
}
