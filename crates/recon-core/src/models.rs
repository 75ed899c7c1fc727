//! Domain models for statement ingestion

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A financial account that statements are uploaded against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Upload status of a statement upload header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    #[default]
    Processing,
    Uploaded,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Uploaded => "uploaded",
        }
    }
}

impl std::str::FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(Self::Processing),
            "uploaded" => Ok(Self::Uploaded),
            _ => Err(format!("Unknown upload status: {}", s)),
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a statement movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "CREDIT",
            Self::Debit => "DEBIT",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREDIT" => Ok(Self::Credit),
            "DEBIT" => Ok(Self::Debit),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// New statement upload header for creation
#[derive(Debug, Clone)]
pub struct NewStatementUpload {
    pub user_id: String,
    pub account_id: i64,
    pub file_name: String,
    /// Normalized extension of the uploaded file (e.g. `xlsx`)
    pub file_type: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub statement_period_start: NaiveDate,
    pub statement_period_end: NaiveDate,
}

/// One uploaded statement file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementUpload {
    pub id: i64,
    pub user_id: String,
    pub account_id: i64,
    pub file_name: String,
    pub file_type: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub statement_period_start: NaiveDate,
    pub statement_period_end: NaiveDate,
    pub upload_status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upload header together with the number of rows it persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDetail {
    #[serde(flatten)]
    pub upload: StatementUpload,
    pub row_count: i64,
}

/// Canonical record for one statement row that passed validation.
///
/// `upload_id` and `account_id` stay empty until the upload header exists;
/// `is_duplicate` stays empty until the batch insert has been attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransactionRow {
    pub upload_id: Option<i64>,
    pub account_id: Option<i64>,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    pub amount: f64,
    pub direction: Direction,
    pub reference_number: Option<String>,
    pub raw_row_hash: String,
    /// 1-based line in the source file; the header is line 1
    pub row_number: u32,
    pub is_duplicate: Option<bool>,
}

/// A source row that failed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseError {
    pub row_number: u32,
    pub reason: String,
    /// The offending cell value(s)
    pub payload: serde_json::Value,
}

/// Counts for one upload. `total_rows = valid_rows + duplicate_rows + error_rows`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub total_rows: usize,
    pub duplicate_rows: usize,
    pub error_rows: usize,
    pub valid_rows: usize,
    pub errors: Vec<ParseError>,
}

/// What a caller of the ingestion pipeline receives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResult {
    /// `None` when nothing was parsed and no header was created
    pub upload_id: Option<i64>,
    pub summary: UploadSummary,
    pub rows: Vec<ParsedTransactionRow>,
}

/// Persisted projection of a statement row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementTransaction {
    pub id: i64,
    pub upload_id: i64,
    pub account_id: i64,
    pub transaction_date: NaiveDate,
    pub description: Option<String>,
    pub amount: f64,
    pub direction: Direction,
    pub reference_number: Option<String>,
    pub raw_row_hash: String,
    pub row_number: u32,
    pub created_at: DateTime<Utc>,
}
