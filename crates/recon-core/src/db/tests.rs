//! Database tests

use super::*;
use crate::models::*;
use crate::store::StatementStore;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rusqlite::params;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn header(account_id: i64, user_id: &str) -> NewStatementUpload {
        NewStatementUpload {
            user_id: user_id.to_string(),
            account_id,
            file_name: "march.xlsx".to_string(),
            file_type: Some("xlsx".to_string()),
            file_size_bytes: Some(2048),
            statement_period_start: date(2024, 3, 1),
            statement_period_end: date(2024, 3, 31),
        }
    }

    fn row(upload_id: i64, account_id: i64, hash: &str, row_number: u32) -> ParsedTransactionRow {
        ParsedTransactionRow {
            upload_id: Some(upload_id),
            account_id: Some(account_id),
            transaction_date: date(2024, 3, 14),
            description: Some("COFFEE".to_string()),
            amount: 4.5,
            direction: Direction::Debit,
            reference_number: None,
            raw_row_hash: hash.to_string(),
            row_number,
            is_duplicate: None,
        }
    }

    /// Create a header and insert `hashes` under it in one transaction
    fn upload(db: &Database, account_id: i64, user_id: &str, hashes: &[&str]) -> i64 {
        db.in_transaction(|w| {
            let id = w.create_upload_header(&header(account_id, user_id))?;
            let rows: Vec<_> = hashes
                .iter()
                .enumerate()
                .map(|(i, h)| row(id, account_id, h, i as u32 + 2))
                .collect();
            w.insert_rows_batch(&rows)?;
            w.set_upload_status(id, UploadStatus::Uploaded)?;
            Ok(id)
        })
        .unwrap()
    }

    #[test]
    fn test_in_memory_db() {
        let db = Database::in_memory().unwrap();
        let accounts = db.list_accounts().unwrap();
        assert!(accounts.is_empty());
        // Unencrypted regardless of RECON_DB_KEY
        assert!(!db.is_encrypted());
    }

    #[test]
    fn test_foreign_keys_enabled_on_every_connection() {
        let db = Database::in_memory().unwrap();
        let a = db.conn().unwrap();
        let b = db.conn().unwrap();
        for conn in [&a, &b] {
            let on: i64 = conn
                .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                .unwrap();
            assert_eq!(on, 1);
        }
    }

    #[test]
    fn test_account_upsert() {
        let db = Database::in_memory().unwrap();

        let id = db.upsert_account("Checking").unwrap();
        assert!(id > 0);

        // Upsert same account returns same ID
        let id2 = db.upsert_account("Checking").unwrap();
        assert_eq!(id, id2);

        db.upsert_account("Savings").unwrap();
        let accounts = db.list_accounts().unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].name, "Checking");

        assert_eq!(db.get_account(id).unwrap().unwrap().name, "Checking");
        assert!(db.get_account(999).unwrap().is_none());
    }

    #[test]
    fn test_insert_reports_only_new_fingerprints() {
        let db = Database::in_memory().unwrap();
        let account_id = db.upsert_account("Checking").unwrap();

        let first = upload(&db, account_id, "u1", &["a", "b"]);
        let inserted = db
            .in_transaction(|w| {
                let id = w.create_upload_header(&header(account_id, "u1"))?;
                w.insert_rows_batch(&[row(id, account_id, "b", 2), row(id, account_id, "c", 3)])
            })
            .unwrap();

        assert_eq!(inserted.len(), 1);
        assert!(inserted.contains("c"));
        assert_eq!(db.list_upload_rows(first).unwrap().len(), 2);
    }

    #[test]
    fn test_unstamped_rows_rejected() {
        let db = Database::in_memory().unwrap();
        let mut unstamped = row(1, 1, "a", 2);
        unstamped.upload_id = None;

        let result = db.in_transaction(|w| w.insert_rows_batch(&[unstamped.clone()]));
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_failed_body_rolls_back_header() {
        let db = Database::in_memory().unwrap();
        let account_id = db.upsert_account("Checking").unwrap();

        let result: Result<()> = db.in_transaction(|w| {
            w.create_upload_header(&header(account_id, "u1"))?;
            Err(Error::InvalidData("abort".into()))
        });
        assert!(result.is_err());
        assert!(db.list_uploads_by_user("u1").unwrap().is_empty());
    }

    #[test]
    fn test_header_requires_existing_account() {
        let db = Database::in_memory().unwrap();
        let result = db.in_transaction(|w| w.create_upload_header(&header(42, "u1")));
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[test]
    fn test_upload_status_transition() {
        let db = Database::in_memory().unwrap();
        let account_id = db.upsert_account("Checking").unwrap();
        let id = upload(&db, account_id, "u1", &["a"]);

        let detail = db.get_upload(id, "u1").unwrap().unwrap();
        assert_eq!(detail.upload.upload_status, UploadStatus::Uploaded);
        assert_eq!(detail.upload.file_type.as_deref(), Some("xlsx"));
        assert_eq!(detail.upload.file_size_bytes, Some(2048));
        assert_eq!(detail.upload.statement_period_start, date(2024, 3, 1));
        assert_eq!(detail.upload.statement_period_end, date(2024, 3, 31));
        assert_eq!(detail.row_count, 1);

        let missing = db.in_transaction(|w| w.set_upload_status(999, UploadStatus::Uploaded));
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_uploads_are_scoped_to_user() {
        let db = Database::in_memory().unwrap();
        let account_id = db.upsert_account("Checking").unwrap();
        let mine = upload(&db, account_id, "u1", &["a"]);
        upload(&db, account_id, "u1", &["b"]);
        upload(&db, account_id, "u2", &["c"]);

        let listed = db.list_uploads_by_user("u1").unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|u| u.user_id == "u1"));
        // Newest first
        assert!(listed[0].id > listed[1].id);

        assert!(db.get_upload(mine, "u2").unwrap().is_none());
        assert!(db.list_uploads_by_user("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_list_upload_rows_round_trip() {
        let db = Database::in_memory().unwrap();
        let account_id = db.upsert_account("Checking").unwrap();
        let id = upload(&db, account_id, "u1", &["h1", "h2"]);

        let rows = db.list_upload_rows(id).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].raw_row_hash, "h1");
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].transaction_date, date(2024, 3, 14));
        assert_eq!(rows[0].direction, Direction::Debit);
        assert_eq!(rows[0].description.as_deref(), Some("COFFEE"));
        assert_eq!(rows[0].amount, 4.5);
        assert_eq!(rows[1].row_number, 3);
    }

    #[test]
    fn test_delete_upload_removes_rows() {
        let db = Database::in_memory().unwrap();
        let account_id = db.upsert_account("Checking").unwrap();
        let id = upload(&db, account_id, "u1", &["a", "b"]);

        // Another user cannot delete it
        assert!(!db.delete_upload(id, "u2").unwrap());
        assert_eq!(db.list_upload_rows(id).unwrap().len(), 2);

        assert!(db.delete_upload(id, "u1").unwrap());
        assert!(db.get_upload(id, "u1").unwrap().is_none());

        let conn = db.conn().unwrap();
        let remaining: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM statement_transactions WHERE upload_id = ?",
                params![id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);

        // Fingerprints are free again once their upload is gone
        let again = upload(&db, account_id, "u1", &["a"]);
        assert_eq!(db.list_upload_rows(again).unwrap().len(), 1);

        assert!(!db.delete_upload(id, "u1").unwrap());
    }

    #[test]
    fn test_encrypted_database_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enc.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::new_with_key(path, Some("correct horse")).unwrap();
            db.upsert_account("Checking").unwrap();
        }

        let db = Database::new_with_key(path, Some("correct horse")).unwrap();
        assert_eq!(db.list_accounts().unwrap().len(), 1);
        assert!(db.is_encrypted());

        assert!(Database::new_with_key(path, Some("wrong")).is_err());
    }
}
