//! Error types for recon

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Carries the user-facing message naming the rejected format
    #[error("{0}")]
    UnsupportedFormat(String),

    #[error("No sheet found in workbook")]
    NoSheet,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether this error rejects the uploaded file itself, as opposed to a
    /// storage or infrastructure failure.
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            Self::Csv(_) | Self::Spreadsheet(_) | Self::Io(_) | Self::UnsupportedFormat(_) | Self::NoSheet
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
