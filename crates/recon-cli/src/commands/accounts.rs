//! Account commands

use anyhow::Result;
use recon_core::Database;

pub fn cmd_accounts(db: &Database) -> Result<()> {
    let accounts = db.list_accounts()?;

    if accounts.is_empty() {
        println!("No accounts found. Accounts are created on first ingest:");
        println!("  recon ingest --file statement.xlsx --account NAME ...");
        return Ok(());
    }

    println!();
    println!("📁 Accounts");
    println!("   ─────────────────────────────");

    for account in accounts {
        println!("   #{:<5} {}", account.id, account.name);
    }

    Ok(())
}
