//! Recon Core Library
//!
//! Bank statement ingestion for reconciliation:
//! - Format-specific extractors for .xlsx and .csv statements
//! - Date and amount parsers with fallback chains
//! - Content fingerprints for cross-upload deduplication
//! - Upload orchestration with per-row error reporting
//! - Database access (SQLCipher) and migrations

pub mod cells;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fields;
pub mod fingerprint;
pub mod ingest;
pub mod models;
pub mod store;
pub mod translate;

/// Statement fixture builders for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::IngestConfig;
pub use db::Database;
pub use error::{Error, Result};
pub use extract::{RowStream, StatementFormat};
pub use fingerprint::fingerprint;
pub use ingest::{IngestStage, StatementIngestor, UploadRequest};
pub use models::*;
pub use store::{MemoryStore, StatementStore, UploadWriter};
