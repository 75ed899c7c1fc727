//! Statement upload operations

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{
    Direction, NewStatementUpload, ParsedTransactionRow, StatementTransaction, StatementUpload,
    UploadDetail, UploadStatus,
};
use crate::store::{StatementStore, UploadWriter};

const UPLOAD_COLUMNS: &str = "id, user_id, account_id, file_name, file_type, file_size_bytes, \
     statement_period_start, statement_period_end, upload_status, created_at, updated_at";

impl StatementStore for Database {
    /// Runs `body` under `BEGIN IMMEDIATE`, so concurrent uploads take the
    /// write lock one at a time and each sees the rows the previous one
    /// committed.
    fn in_transaction<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce(&dyn UploadWriter) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Dropping `tx` on the error path rolls back
        let value = body(&SqliteWriter { conn: &tx })?;
        tx.commit()?;
        Ok(value)
    }
}

/// Upload writes bound to an open transaction
struct SqliteWriter<'a> {
    conn: &'a Connection,
}

impl UploadWriter for SqliteWriter<'_> {
    fn create_upload_header(&self, upload: &NewStatementUpload) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO statement_uploads
                (user_id, account_id, file_name, file_type, file_size_bytes,
                 statement_period_start, statement_period_end, upload_status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                upload.user_id,
                upload.account_id,
                upload.file_name,
                upload.file_type,
                upload.file_size_bytes,
                upload.statement_period_start.to_string(),
                upload.statement_period_end.to_string(),
                UploadStatus::Processing.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_rows_batch(&self, rows: &[ParsedTransactionRow]) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare_cached(
            r#"
            INSERT INTO statement_transactions
                (upload_id, account_id, transaction_date, description, amount, direction,
                 reference_number, raw_row_hash, row_number)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(raw_row_hash) DO NOTHING
            "#,
        )?;

        let mut inserted = HashSet::new();
        for row in rows {
            let (upload_id, account_id) = match (row.upload_id, row.account_id) {
                (Some(upload_id), Some(account_id)) => (upload_id, account_id),
                _ => {
                    return Err(Error::InvalidData(format!(
                        "row {} is not stamped with an upload and account",
                        row.row_number
                    )))
                }
            };

            let changed = stmt.execute(params![
                upload_id,
                account_id,
                row.transaction_date.to_string(),
                row.description,
                row.amount,
                row.direction.as_str(),
                row.reference_number,
                row.raw_row_hash,
                row.row_number,
            ])?;
            if changed > 0 {
                inserted.insert(row.raw_row_hash.clone());
            }
        }

        debug!("Inserted {} of {} statement rows", inserted.len(), rows.len());
        Ok(inserted)
    }

    fn set_upload_status(&self, upload_id: i64, status: UploadStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE statement_uploads SET upload_status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![status.as_str(), upload_id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("upload {}", upload_id)));
        }
        Ok(())
    }
}

impl Database {
    /// List a user's uploads, newest first
    pub fn list_uploads_by_user(&self, user_id: &str) -> Result<Vec<StatementUpload>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM statement_uploads WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            UPLOAD_COLUMNS
        ))?;

        let uploads = stmt
            .query_map(params![user_id], Self::map_upload_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(uploads)
    }

    /// Get one upload owned by `user_id`, with its persisted row count
    pub fn get_upload(&self, id: i64, user_id: &str) -> Result<Option<UploadDetail>> {
        let conn = self.conn()?;

        let upload = conn
            .query_row(
                &format!(
                    "SELECT {} FROM statement_uploads WHERE id = ? AND user_id = ?",
                    UPLOAD_COLUMNS
                ),
                params![id, user_id],
                Self::map_upload_row,
            )
            .optional()?;

        let Some(upload) = upload else {
            return Ok(None);
        };

        let row_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM statement_transactions WHERE upload_id = ?",
            params![id],
            |row| row.get(0),
        )?;

        Ok(Some(UploadDetail { upload, row_count }))
    }

    /// Rows first persisted by an upload, in source order.
    ///
    /// Rows the upload saw as duplicates belong to the upload that inserted
    /// them first.
    pub fn list_upload_rows(&self, upload_id: i64) -> Result<Vec<StatementTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, upload_id, account_id, transaction_date, description, amount, direction,
                   reference_number, raw_row_hash, row_number, created_at
            FROM statement_transactions
            WHERE upload_id = ?
            ORDER BY row_number, id
            "#,
        )?;

        let rows = stmt
            .query_map(params![upload_id], |row| {
                let date_str: String = row.get(3)?;
                let direction_str: String = row.get(6)?;
                let created_at_str: String = row.get(10)?;
                Ok(StatementTransaction {
                    id: row.get(0)?,
                    upload_id: row.get(1)?,
                    account_id: row.get(2)?,
                    transaction_date: parse_date(&date_str),
                    description: row.get(4)?,
                    amount: row.get(5)?,
                    direction: direction_str.parse().unwrap_or(Direction::Debit),
                    reference_number: row.get(7)?,
                    raw_row_hash: row.get(8)?,
                    row_number: row.get(9)?,
                    created_at: parse_datetime(&created_at_str),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    /// Delete an upload owned by `user_id` together with its rows.
    ///
    /// Returns `false` when no such upload exists for that user; nothing is
    /// deleted in that case.
    pub fn delete_upload(&self, id: i64, user_id: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let owned: Option<i64> = tx
            .query_row(
                "SELECT id FROM statement_uploads WHERE id = ? AND user_id = ?",
                params![id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Ok(false);
        }

        let rows = tx.execute(
            "DELETE FROM statement_transactions WHERE upload_id = ?",
            params![id],
        )?;
        tx.execute("DELETE FROM statement_uploads WHERE id = ?", params![id])?;
        tx.commit()?;

        debug!("Deleted upload {} and {} rows", id, rows);
        Ok(true)
    }

    fn map_upload_row(row: &rusqlite::Row) -> rusqlite::Result<StatementUpload> {
        let start_str: String = row.get(6)?;
        let end_str: String = row.get(7)?;
        let status_str: String = row.get(8)?;
        let created_at_str: String = row.get(9)?;
        let updated_at_str: String = row.get(10)?;

        Ok(StatementUpload {
            id: row.get(0)?,
            user_id: row.get(1)?,
            account_id: row.get(2)?,
            file_name: row.get(3)?,
            file_type: row.get(4)?,
            file_size_bytes: row.get(5)?,
            statement_period_start: parse_date(&start_str),
            statement_period_end: parse_date(&end_str),
            upload_status: status_str.parse().unwrap_or_default(),
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }
}
