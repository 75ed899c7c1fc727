//! Recon CLI - Bank statement ingestion for reconciliation
//!
//! Usage:
//!   recon init                                Initialize database
//!   recon ingest --file F --account A --user U --from D --to D
//!                                             Ingest an .xlsx or .csv statement
//!   recon uploads list --user U               List uploads
//!   recon accounts                            List accounts

mod cli;
mod commands;


use anyhow::{Context, Result};
use clap::Parser;
use recon_core::IngestConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Ingest {
            file,
            account,
            user,
            from,
            to,
            json,
        } => {
            let config = IngestConfig::load(cli.config.as_deref())
                .context("Failed to load ingest config")?;
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let opts = commands::IngestOptions {
                file,
                account,
                user,
                from,
                to,
                json,
            };
            commands::cmd_ingest(&db, &config, &opts).map(|_| ())
        }
        Commands::Uploads { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                UploadsAction::List { user } => commands::cmd_uploads_list(&db, &user),
                UploadsAction::Show { id, user, rows } => {
                    commands::cmd_uploads_show(&db, id, &user, rows)
                }
                UploadsAction::Delete { id, user } => {
                    commands::cmd_uploads_delete(&db, id, &user)
                }
            }
        }
        Commands::Accounts => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_accounts(&db)
        }
    }
}
