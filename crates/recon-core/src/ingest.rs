//! Statement upload orchestration
//!
//! One upload moves through `Opened → Extracted → Translated → Persisted →
//! Summarized`. File-level failures (unsupported extension, unreadable
//! stream, workbook without sheets) end in `Rejected` before storage is
//! touched. Row-level failures are collected as [`ParseError`]s and never stop
//! the upload.
//!
//! Creating the header, inserting the rows and marking the header uploaded
//! happen in one storage transaction: either the upload and its rows are all
//! visible or none of them are.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::cells::{is_blank, RawRow};
use crate::config::IngestConfig;
use crate::error::Result;
use crate::extract::{RowStream, StatementFormat};
use crate::models::{
    IngestResult, NewStatementUpload, ParseError, ParsedTransactionRow, UploadStatus, UploadSummary,
};
use crate::store::StatementStore;
use crate::translate::translate_row;

/// Stage of one upload, used in log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Opened,
    Extracted,
    Translated,
    Persisted,
    Summarized,
    Rejected,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Extracted => "extracted",
            Self::Translated => "translated",
            Self::Persisted => "persisted",
            Self::Summarized => "summarized",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for IngestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who is uploading what, and for which statement period
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub user_id: String,
    pub account_id: i64,
    /// Original file name; its extension selects the extractor
    pub file_name: String,
    pub statement_period_start: NaiveDate,
    pub statement_period_end: NaiveDate,
    pub file_size_bytes: Option<i64>,
}

/// Runs uploads against a [`StatementStore`]
pub struct StatementIngestor<'a, S: StatementStore> {
    store: &'a S,
    config: &'a IngestConfig,
}

impl<'a, S: StatementStore> StatementIngestor<'a, S> {
    pub fn new(store: &'a S, config: &'a IngestConfig) -> Self {
        Self { store, config }
    }

    /// Open `path` and ingest it.
    ///
    /// The file size is taken from the file system when the request does not
    /// carry one.
    pub fn ingest_file(&self, request: &UploadRequest, path: &Path) -> Result<IngestResult> {
        // Extension is checked before the file is opened
        if let Err(e) = StatementFormat::from_file_name(&request.file_name) {
            warn!("{} {}: {}", IngestStage::Rejected, request.file_name, e);
            return Err(e);
        }

        let file = File::open(path).inspect_err(|e| {
            warn!("{} {}: {}", IngestStage::Rejected, request.file_name, e);
        })?;

        let mut request = request.clone();
        if request.file_size_bytes.is_none() {
            request.file_size_bytes = file.metadata().ok().map(|m| m.len() as i64);
        }

        self.ingest(&request, BufReader::new(file))
    }

    /// Ingest one statement read from `reader`
    pub fn ingest<R>(&self, request: &UploadRequest, reader: R) -> Result<IngestResult>
    where
        R: Read + Seek + 'static,
    {
        let file_name = request.file_name.as_str();

        let format = StatementFormat::from_file_name(file_name).inspect_err(|e| {
            warn!("{} {}: {}", IngestStage::Rejected, file_name, e);
        })?;
        let stream = format.open(reader).inspect_err(|e| {
            warn!("{} {}: {}", IngestStage::Rejected, file_name, e);
        })?;
        debug!("{} {} as {}", IngestStage::Opened, file_name, format);

        let (mut rows, errors) = translate_rows(stream, self.config).inspect_err(|e| {
            warn!("{} {}: {}", IngestStage::Rejected, file_name, e);
        })?;
        debug!(
            "{} {}: {} rows, {} errors",
            IngestStage::Translated,
            file_name,
            rows.len(),
            errors.len()
        );
        if !errors.is_empty() {
            warn!("{}: {} rows could not be read", file_name, errors.len());
        }

        if rows.is_empty() && errors.is_empty() {
            info!("{} {}: nothing parsed", IngestStage::Summarized, file_name);
            return Ok(IngestResult {
                upload_id: None,
                summary: UploadSummary::default(),
                rows,
            });
        }

        let header = NewStatementUpload {
            user_id: request.user_id.clone(),
            account_id: request.account_id,
            file_name: request.file_name.clone(),
            file_type: Some(format.as_str().to_string()),
            file_size_bytes: request.file_size_bytes,
            statement_period_start: request.statement_period_start,
            statement_period_end: request.statement_period_end,
        };

        let (upload_id, inserted) = self
            .store
            .in_transaction(|writer| {
                let upload_id = writer.create_upload_header(&header)?;
                for row in rows.iter_mut() {
                    row.upload_id = Some(upload_id);
                    row.account_id = Some(request.account_id);
                }
                let inserted = writer.insert_rows_batch(&rows)?;
                writer.set_upload_status(upload_id, UploadStatus::Uploaded)?;
                Ok((upload_id, inserted))
            })
            .inspect_err(|e| {
                warn!("Storage failed for {}: {}", file_name, e);
            })?;
        debug!(
            "{} {}: upload {}, {} new rows",
            IngestStage::Persisted,
            file_name,
            upload_id,
            inserted.len()
        );

        mark_duplicates(&mut rows, &inserted);
        let summary = summarize(&rows, errors);
        info!(
            "{} {}: upload {}, {} total, {} valid, {} duplicate, {} errors",
            IngestStage::Summarized,
            file_name,
            upload_id,
            summary.total_rows,
            summary.valid_rows,
            summary.duplicate_rows,
            summary.error_rows
        );

        Ok(IngestResult {
            upload_id: Some(upload_id),
            summary,
            rows,
        })
    }
}

/// Translate every data row of a stream.
///
/// The first non-blank row is the header. Row numbers are source lines, so
/// the first row after a header on line 1 is row 2. Blank rows between data
/// rows are translated like any other row and so become parse errors; blank
/// rows before the header or at the end of the file are padding and are
/// skipped. A read error mid-stream fails the whole file.
pub fn translate_rows(
    stream: RowStream,
    config: &IngestConfig,
) -> Result<(Vec<ParsedTransactionRow>, Vec<ParseError>)> {
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut seen_header = false;
    // Blank rows held back until a later data row shows they are not padding
    let mut pending_blank: Vec<(u32, RawRow)> = Vec::new();

    let mut translate = |raw: &[String], row_number: u32| {
        match translate_row(raw, row_number, config) {
            Ok(row) => rows.push(row),
            Err(e) => {
                debug!("Row {} rejected: {}", row_number, e.reason);
                errors.push(e);
            }
        }
    };

    for (index, raw) in stream.enumerate() {
        let raw = raw?;
        let row_number = (index + 1) as u32;

        if !seen_header {
            seen_header = !is_blank(&raw);
            continue;
        }
        if is_blank(&raw) {
            pending_blank.push((row_number, raw));
            continue;
        }

        for (blank_number, blank) in pending_blank.drain(..) {
            translate(&blank, blank_number);
        }
        translate(&raw, row_number);
    }
    if !pending_blank.is_empty() {
        debug!("Skipped {} trailing blank rows", pending_blank.len());
    }
    debug!(
        "{} {} rows",
        IngestStage::Extracted,
        rows.len() + errors.len()
    );

    Ok((rows, errors))
}

/// Flag every row whose fingerprint the store did not newly insert.
///
/// When the same fingerprint appears more than once in one batch, only its
/// first occurrence is the inserted one.
pub fn mark_duplicates(rows: &mut [ParsedTransactionRow], inserted: &HashSet<String>) {
    let mut claimed = HashSet::new();
    for row in rows.iter_mut() {
        let is_new =
            inserted.contains(&row.raw_row_hash) && claimed.insert(row.raw_row_hash.clone());
        row.is_duplicate = Some(!is_new);
    }
}

/// Counts for a set of marked rows plus the parse errors
pub fn summarize(rows: &[ParsedTransactionRow], errors: Vec<ParseError>) -> UploadSummary {
    let duplicate_rows = rows
        .iter()
        .filter(|r| r.is_duplicate.unwrap_or(false))
        .count();
    UploadSummary {
        total_rows: rows.len() + errors.len(),
        duplicate_rows,
        error_rows: errors.len(),
        valid_rows: rows.len() - duplicate_rows,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryStore;
    use crate::test_utils::{statement_csv, statement_xlsx, xlsx_workbook};
    use std::io::Cursor;

    fn request(file_name: &str) -> UploadRequest {
        UploadRequest {
            user_id: "user-1".into(),
            account_id: 7,
            file_name: file_name.into(),
            statement_period_start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            statement_period_end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            file_size_bytes: None,
        }
    }

    fn ingest_csv(store: &MemoryStore, rows: &[&[&str]]) -> Result<IngestResult> {
        let config = IngestConfig::default();
        let data = statement_csv(rows).into_bytes();
        StatementIngestor::new(store, &config).ingest(&request("march.csv"), Cursor::new(data))
    }

    #[test]
    fn test_xlsx_scenario_with_one_bad_amount() {
        let store = MemoryStore::new();
        let config = IngestConfig::default();
        let data = statement_xlsx(&[
            &["14-03-2024", "COFFEE", "", "4.50", "DR"],
            &["15-03-2024", "GROCER", "", "twelve", "DR"],
            &["45367", "SALARY", "PAY-03", "2,500.00", "CR"],
        ]);

        let result = StatementIngestor::new(&store, &config)
            .ingest(&request("march.xlsx"), Cursor::new(data))
            .unwrap();

        assert!(result.upload_id.is_some());
        assert_eq!(result.summary.total_rows, 3);
        assert_eq!(result.summary.error_rows, 1);
        assert_eq!(result.summary.duplicate_rows, 0);
        assert_eq!(result.summary.valid_rows, 2);
        assert_eq!(result.summary.errors[0].row_number, 3);
        assert_eq!(result.rows[0].row_number, 2);
        assert_eq!(result.rows[1].row_number, 4);
        assert_eq!(
            result.rows[1].transaction_date,
            NaiveDate::from_ymd_opt(2024, 3, 16).unwrap()
        );

        let persisted = store.rows();
        assert_eq!(persisted.len(), 2);
        assert_ne!(persisted[0].raw_row_hash, persisted[1].raw_row_hash);
        assert!(persisted.iter().all(|r| r.upload_id == result.upload_id));
        assert!(persisted.iter().all(|r| r.account_id == Some(7)));

        let uploads = store.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].upload_status, UploadStatus::Uploaded);
        assert_eq!(uploads[0].file_type.as_deref(), Some("xlsx"));
    }

    #[test]
    fn test_reupload_marks_every_row_duplicate() {
        let store = MemoryStore::new();
        let rows: &[&[&str]] = &[
            &["2024-03-14", "COFFEE", "", "4.50", "DR"],
            &["2024-03-15", "REFUND", "", "10", "CR"],
        ];

        let first = ingest_csv(&store, rows).unwrap();
        assert_eq!(first.summary.valid_rows, 2);

        let second = ingest_csv(&store, rows).unwrap();
        assert_eq!(second.summary.duplicate_rows, 2);
        assert_eq!(second.summary.valid_rows, 0);
        assert!(second.rows.iter().all(|r| r.is_duplicate == Some(true)));
        assert_ne!(first.upload_id, second.upload_id);
        assert_eq!(store.rows().len(), 2);
        assert_eq!(store.uploads().len(), 2);
    }

    #[test]
    fn test_partial_failure_isolation() {
        let store = MemoryStore::new();
        let result = ingest_csv(
            &store,
            &[
                &["2024-03-14", "A", "", "1.00", "DR"],
                &["14", "B", "", "1.00", "DR"],
                &["2024-03-14", "C", "", "1.00", "XX"],
                &["2024-03-14", "D", ""],
                &["2024-03-15", "E", "", "2.00", "CR"],
            ],
        )
        .unwrap();

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.summary.error_rows, 3);
        assert_eq!(result.summary.total_rows, 5);
        let error_rows: Vec<u32> = result.summary.errors.iter().map(|e| e.row_number).collect();
        assert_eq!(error_rows, vec![3, 4, 5]);
        assert_eq!(store.rows().len(), 2);
    }

    #[test]
    fn test_same_row_twice_in_one_upload() {
        let store = MemoryStore::new();
        let result = ingest_csv(
            &store,
            &[
                &["2024-03-14", "COFFEE", "", "4.50", "DR"],
                &["2024-03-14", "COFFEE", "REF-2", "4.5", "dr"],
            ],
        )
        .unwrap();

        assert_eq!(result.rows[0].is_duplicate, Some(false));
        assert_eq!(result.rows[1].is_duplicate, Some(true));
        assert_eq!(result.summary.valid_rows, 1);
        assert_eq!(result.summary.duplicate_rows, 1);
        assert_eq!(store.rows().len(), 1);
    }

    #[test]
    fn test_header_only_creates_nothing() {
        let store = MemoryStore::new();
        let result = ingest_csv(&store, &[]).unwrap();
        assert!(result.upload_id.is_none());
        assert_eq!(result.summary, UploadSummary::default());
        assert!(result.rows.is_empty());
        assert!(store.uploads().is_empty());
    }

    #[test]
    fn test_only_errors_still_creates_header() {
        let store = MemoryStore::new();
        let result = ingest_csv(&store, &[&["bad", "X", "", "1", "DR"]]).unwrap();
        assert!(result.upload_id.is_some());
        assert_eq!(result.summary.error_rows, 1);
        assert_eq!(store.uploads().len(), 1);
        assert!(store.rows().is_empty());
    }

    #[test]
    fn test_storage_failure_rolls_back_header() {
        let store = MemoryStore::new();
        store.fail_inserts(true);
        let result = ingest_csv(&store, &[&["2024-03-14", "A", "", "1.00", "DR"]]);
        assert!(result.is_err());
        assert!(!result.unwrap_err().is_file_level());
        assert!(store.uploads().is_empty());
        assert!(store.rows().is_empty());
    }

    #[test]
    fn test_unsupported_formats_rejected_before_storage() {
        let store = MemoryStore::new();
        let config = IngestConfig::default();
        let ingestor = StatementIngestor::new(&store, &config);

        let err = ingestor
            .ingest(&request("march.xls"), Cursor::new(Vec::new()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported statement format: .xls. Please upload .xlsx or .csv"
        );

        let err = ingestor
            .ingest(&request("march.pdf"), Cursor::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
        assert!(store.uploads().is_empty());
    }

    #[test]
    fn test_empty_workbook_rejected() {
        let store = MemoryStore::new();
        let config = IngestConfig::default();
        let err = StatementIngestor::new(&store, &config)
            .ingest(&request("empty.xlsx"), Cursor::new(xlsx_workbook(&[], 1)))
            .unwrap_err();
        assert!(matches!(err, Error::NoSheet));
        assert!(store.uploads().is_empty());
    }

    #[test]
    fn test_leading_blank_rows_keep_line_numbers() {
        let store = MemoryStore::new();
        let config = IngestConfig::default();
        let data = xlsx_workbook(
            &[&[
                &["Date", "Description", "Reference", "Amount", "Direction"],
                &["2024-03-14", "A", "", "oops", "DR"],
            ]],
            3,
        );
        let result = StatementIngestor::new(&store, &config)
            .ingest(&request("march.xlsx"), Cursor::new(data))
            .unwrap();
        assert_eq!(result.summary.errors[0].row_number, 4);
    }

    #[test]
    fn test_blank_row_between_data_rows_is_an_error() {
        let store = MemoryStore::new();
        let result = ingest_csv(
            &store,
            &[
                &["2024-03-14", "A", "", "1", "DR"],
                &["", "", "", "", ""],
                &["2024-03-15", "B", "", "2", "CR"],
            ],
        )
        .unwrap();

        assert_eq!(result.summary.total_rows, 3);
        assert_eq!(result.summary.error_rows, 1);
        assert_eq!(result.summary.errors[0].row_number, 3);
        assert_eq!(result.summary.errors[0].reason, "empty date");
        assert_eq!(result.rows[1].row_number, 4);
    }

    #[test]
    fn test_trailing_blank_rows_are_padding() {
        let store = MemoryStore::new();
        let result = ingest_csv(
            &store,
            &[
                &["2024-03-14", "A", "", "1", "DR"],
                &["", "", "", "", ""],
                &["", "", "", "", ""],
            ],
        )
        .unwrap();

        assert_eq!(result.summary.total_rows, 1);
        assert_eq!(result.summary.error_rows, 0);
    }

    #[test]
    fn test_blank_sheet_row_between_data_rows() {
        let store = MemoryStore::new();
        let config = IngestConfig::default();
        let data = statement_xlsx(&[
            &["2024-03-14", "A", "", "1", "DR"],
            &[],
            &["2024-03-15", "B", "", "2", "CR"],
        ]);
        let result = StatementIngestor::new(&store, &config)
            .ingest(&request("march.xlsx"), Cursor::new(data))
            .unwrap();

        assert_eq!(result.summary.total_rows, 3);
        assert_eq!(result.summary.errors[0].row_number, 3);
        assert_eq!(result.summary.errors[0].reason, "insufficient columns");
    }

    #[test]
    fn test_legacy_encoded_csv_is_ingested() {
        let store = MemoryStore::new();
        let config = IngestConfig::default();
        let mut data = statement_csv(&[]).into_bytes();
        data.extend_from_slice(b"2024-03-14,CAF\xC9,,4.50,DR\n2024-03-15,RENT,,900,DR\n");

        let result = StatementIngestor::new(&store, &config)
            .ingest(&request("march.csv"), Cursor::new(data))
            .unwrap();

        assert_eq!(result.summary.valid_rows, 2);
        assert_eq!(result.summary.error_rows, 0);
        assert_eq!(result.rows[0].description.as_deref(), Some("CAF\u{FFFD}"));
        assert_eq!(store.rows().len(), 2);
    }

    #[test]
    fn test_ingest_file_records_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("march.csv");
        let data = statement_csv(&[&["2024-03-14", "A", "", "1.00", "DR"]]);
        std::fs::write(&path, &data).unwrap();

        let store = MemoryStore::new();
        let config = IngestConfig::default();
        StatementIngestor::new(&store, &config)
            .ingest_file(&request("march.csv"), &path)
            .unwrap();
        assert_eq!(store.uploads()[0].file_size_bytes, Some(data.len() as i64));
    }

    #[test]
    fn test_missing_file_is_file_level() {
        let store = MemoryStore::new();
        let config = IngestConfig::default();
        let err = StatementIngestor::new(&store, &config)
            .ingest_file(&request("gone.csv"), Path::new("/nonexistent/gone.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_file_level());
    }

    #[test]
    fn test_summarize_counts() {
        let store = MemoryStore::new();
        let result = ingest_csv(&store, &[&["2024-03-14", "A", "", "1.00", "DR"]]).unwrap();
        let mut rows = result.rows.clone();
        mark_duplicates(&mut rows, &HashSet::new());
        let summary = summarize(&rows, Vec::new());
        assert_eq!(summary.total_rows, 1);
        assert_eq!(summary.duplicate_rows, 1);
        assert_eq!(summary.valid_rows, 0);
    }
}
