//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Recon - Bank statement ingestion for reconciliation
#[derive(Parser)]
#[command(name = "recon")]
#[command(about = "Ingest bank statements and flag duplicate transactions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "recon.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set RECON_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Ingestion config file (column layout, direction tokens)
    ///
    /// Falls back to ~/.local/share/recon/config/ingest.toml, then to the
    /// built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Ingest a bank statement (.xlsx or .csv)
    Ingest {
        /// Statement file to ingest
        #[arg(short, long)]
        file: PathBuf,

        /// Account name (created if it does not exist)
        #[arg(short, long)]
        account: String,

        /// Uploading user
        #[arg(short, long)]
        user: String,

        /// Statement period start (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Statement period end (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage statement uploads
    Uploads {
        #[command(subcommand)]
        action: UploadsAction,
    },

    /// List accounts
    Accounts,
}

#[derive(Subcommand)]
pub enum UploadsAction {
    /// List a user's uploads, newest first
    List {
        /// Uploading user
        #[arg(short, long)]
        user: String,
    },

    /// Show one upload
    Show {
        /// Upload ID
        id: i64,

        /// Uploading user
        #[arg(short, long)]
        user: String,

        /// Also list the rows this upload persisted
        #[arg(long)]
        rows: bool,
    },

    /// Delete an upload and the rows it persisted
    Delete {
        /// Upload ID
        id: i64,

        /// Uploading user
        #[arg(short, long)]
        user: String,
    },
}
