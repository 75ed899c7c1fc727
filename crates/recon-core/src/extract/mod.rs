//! Format-specific statement extractors
//!
//! Each supported format turns an open byte stream into a lazy, forward-only
//! sequence of raw rows. The extractor is picked from the normalized file
//! extension; rejected formats fail before any extractor is opened.
//!
//! Extractors yield every row, header included. Dropping the [`RowStream`]
//! releases the underlying reader on every path (exhaustion, error or
//! abandonment).

mod csv;
mod xlsx;

use std::io::{Read, Seek};
use std::path::Path;

use crate::cells::RawRow;
use crate::error::{Error, Result};

pub use self::csv::CsvRows;
pub use self::xlsx::{cell_text, SheetRows};

/// Message returned for legacy binary workbooks
pub const LEGACY_XLS_MESSAGE: &str =
    "Unsupported statement format: .xls. Please upload .xlsx or .csv";

/// Message returned for any other unsupported extension
pub const UNSUPPORTED_MESSAGE: &str = "Unsupported statement format. Please upload .xlsx or .csv";

/// Supported statement formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    /// Office Open XML workbook
    Xlsx,
    /// Comma-separated text
    Csv,
}

impl StatementFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }

    /// Resolve the format from a file name's extension (case-insensitive)
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            "xls" => Err(Error::UnsupportedFormat(LEGACY_XLS_MESSAGE.to_string())),
            _ => Err(Error::UnsupportedFormat(UNSUPPORTED_MESSAGE.to_string())),
        }
    }

    /// Open the stream with this format's extractor
    pub fn open<R>(&self, reader: R) -> Result<RowStream>
    where
        R: Read + Seek + 'static,
    {
        match self {
            Self::Xlsx => Ok(RowStream::new(SheetRows::open(reader)?)),
            Self::Csv => Ok(RowStream::new(CsvRows::open(reader))),
        }
    }
}

impl std::fmt::Display for StatementFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lazy sequence of raw rows from one statement file
pub struct RowStream {
    inner: Box<dyn Iterator<Item = Result<RawRow>>>,
}

impl RowStream {
    pub fn new<I>(rows: I) -> Self
    where
        I: Iterator<Item = Result<RawRow>> + 'static,
    {
        Self {
            inner: Box::new(rows),
        }
    }
}

impl Iterator for RowStream {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}
