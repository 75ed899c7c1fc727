//! Upload listing, inspection and deletion commands

use anyhow::{bail, Result};
use recon_core::Database;

use super::truncate;

pub fn cmd_uploads_list(db: &Database, user: &str) -> Result<()> {
    let uploads = db.list_uploads_by_user(user)?;

    if uploads.is_empty() {
        println!("No uploads found for {}. Ingest a statement with:", user);
        println!("  recon ingest --file statement.xlsx --account NAME --user {} --from DATE --to DATE", user);
        return Ok(());
    }

    println!();
    println!("📄 Uploads for {}", user);
    println!("   ─────────────────────────────");

    for upload in uploads {
        println!(
            "   #{:<5} {:<30} {} → {}  [{}]",
            upload.id,
            truncate(&upload.file_name, 30),
            upload.statement_period_start,
            upload.statement_period_end,
            upload.upload_status
        );
    }

    Ok(())
}

pub fn cmd_uploads_show(db: &Database, id: i64, user: &str, show_rows: bool) -> Result<()> {
    let Some(detail) = db.get_upload(id, user)? else {
        bail!("Upload {} not found", id);
    };
    let upload = &detail.upload;

    println!();
    println!("📄 Upload #{}", upload.id);
    println!("   ─────────────────────────────");
    println!("   File:    {}", upload.file_name);
    if let Some(ref file_type) = upload.file_type {
        println!("   Type:    {}", file_type);
    }
    if let Some(size) = upload.file_size_bytes {
        println!("   Size:    {} bytes", size);
    }
    println!(
        "   Period:  {} → {}",
        upload.statement_period_start, upload.statement_period_end
    );
    println!("   Status:  {}", upload.upload_status);
    println!("   Rows:    {}", detail.row_count);
    println!("   Created: {}", upload.created_at.format("%Y-%m-%d %H:%M"));

    if show_rows {
        let rows = db.list_upload_rows(id)?;
        println!();
        for row in rows {
            println!(
                "   {:>4}  {}  {:>12.2} {:<6} {}",
                row.row_number,
                row.transaction_date,
                row.amount,
                row.direction.as_str(),
                truncate(row.description.as_deref().unwrap_or(""), 40)
            );
        }
    }

    Ok(())
}

pub fn cmd_uploads_delete(db: &Database, id: i64, user: &str) -> Result<()> {
    if !db.delete_upload(id, user)? {
        bail!("Upload {} not found", id);
    }
    println!("🗑️  Deleted upload {}", id);
    Ok(())
}
