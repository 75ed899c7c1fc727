//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db)
//! - `ingest` - Statement ingestion
//! - `uploads` - Upload listing, inspection and deletion
//! - `accounts` - Account listing

pub mod accounts;
pub mod core;
pub mod ingest;
pub mod uploads;

// Re-export command functions for main.rs
pub use accounts::*;
pub use core::*;
pub use ingest::*;
pub use uploads::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
