//! Comma-separated statement extractor

use std::io::Read;

use csv::{ByteRecordsIntoIter, ReaderBuilder};

use crate::cells::RawRow;
use crate::error::Result;

/// Lazy rows of a CSV statement. Owns the reader until dropped.
///
/// Cells are decoded as UTF-8 with invalid bytes replaced, so a statement
/// exported in a legacy code page still yields every row.
pub struct CsvRows<R: Read> {
    records: ByteRecordsIntoIter<R>,
}

impl<R: Read> CsvRows<R> {
    pub fn open(reader: R) -> Self {
        // Header handling and column checks belong to the caller
        let records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
            .into_byte_records();
        Self { records }
    }
}

impl<R: Read> Iterator for CsvRows<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        Some(
            record
                .map(|r| {
                    r.iter()
                        .map(|cell| String::from_utf8_lossy(cell).into_owned())
                        .collect()
                })
                .map_err(Into::into),
        )
    }
}
