//! Storage seam for the ingestion pipeline
//!
//! The ingestor only needs three writes (create header, insert rows, mark
//! the header uploaded) and they must land together or not at all.
//! [`StatementStore::in_transaction`] runs a body under one transaction and
//! hands it an [`UploadWriter`] bound to that transaction; the body never
//! looks the transaction up from ambient state.
//!
//! [`crate::Database`] is the SQLite implementation. [`MemoryStore`] keeps
//! everything in process and is used by tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use crate::error::{Error, Result};
use crate::models::{NewStatementUpload, ParsedTransactionRow, StatementUpload, UploadStatus};

/// Writes available inside one storage transaction
pub trait UploadWriter {
    /// Insert an upload header with status `processing`, returning its id
    fn create_upload_header(&self, upload: &NewStatementUpload) -> Result<i64>;

    /// Insert rows keyed by fingerprint. Rows whose fingerprint already
    /// exists are skipped without error. Returns the fingerprints that were
    /// newly inserted by this call.
    fn insert_rows_batch(&self, rows: &[ParsedTransactionRow]) -> Result<HashSet<String>>;

    fn set_upload_status(&self, upload_id: i64, status: UploadStatus) -> Result<()>;
}

/// Transaction scope provider
pub trait StatementStore {
    /// Run `body` in a transaction. Commits when it returns `Ok`, rolls back
    /// when it returns `Err`.
    fn in_transaction<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce(&dyn UploadWriter) -> Result<T>;
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    uploads: Vec<StatementUpload>,
    rows: Vec<ParsedTransactionRow>,
    hashes: HashSet<String>,
}

/// In-process store with the same conflict and rollback semantics as the
/// database. Transactions are serialized.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent batch insert fail
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Committed upload headers
    pub fn uploads(&self) -> Vec<StatementUpload> {
        self.state
            .lock()
            .map(|s| s.uploads.clone())
            .unwrap_or_default()
    }

    /// Committed rows, in insertion order
    pub fn rows(&self) -> Vec<ParsedTransactionRow> {
        self.state.lock().map(|s| s.rows.clone()).unwrap_or_default()
    }
}

impl StatementStore for MemoryStore {
    fn in_transaction<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce(&dyn UploadWriter) -> Result<T>,
    {
        let mut committed = self
            .state
            .lock()
            .map_err(|_| Error::InvalidData("memory store lock poisoned".into()))?;

        let tx = MemoryTransaction {
            staged: RefCell::new(committed.clone()),
            fail_inserts: self.fail_inserts.load(Ordering::SeqCst),
        };
        let value = body(&tx)?;
        *committed = tx.staged.into_inner();
        Ok(value)
    }
}

struct MemoryTransaction {
    staged: RefCell<MemoryState>,
    fail_inserts: bool,
}

impl UploadWriter for MemoryTransaction {
    fn create_upload_header(&self, upload: &NewStatementUpload) -> Result<i64> {
        let mut state = self.staged.borrow_mut();
        let id = state.uploads.len() as i64 + 1;
        let now = Utc::now();
        state.uploads.push(StatementUpload {
            id,
            user_id: upload.user_id.clone(),
            account_id: upload.account_id,
            file_name: upload.file_name.clone(),
            file_type: upload.file_type.clone(),
            file_size_bytes: upload.file_size_bytes,
            statement_period_start: upload.statement_period_start,
            statement_period_end: upload.statement_period_end,
            upload_status: UploadStatus::Processing,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    fn insert_rows_batch(&self, rows: &[ParsedTransactionRow]) -> Result<HashSet<String>> {
        if self.fail_inserts {
            return Err(Error::InvalidData("batch insert rejected".into()));
        }
        let mut state = self.staged.borrow_mut();
        let mut inserted = HashSet::new();
        for row in rows {
            if state.hashes.insert(row.raw_row_hash.clone()) {
                inserted.insert(row.raw_row_hash.clone());
                state.rows.push(row.clone());
            }
        }
        Ok(inserted)
    }

    fn set_upload_status(&self, upload_id: i64, status: UploadStatus) -> Result<()> {
        let mut state = self.staged.borrow_mut();
        let upload = state
            .uploads
            .iter_mut()
            .find(|u| u.id == upload_id)
            .ok_or_else(|| Error::NotFound(format!("upload {}", upload_id)))?;
        upload.upload_status = status;
        upload.updated_at = Utc::now();
        Ok(())
    }
}
