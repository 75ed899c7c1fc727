//! Workbook statement extractor
//!
//! Reads the first worksheet of an .xlsx workbook. Rows are yielded from the
//! top of the sheet so that leading blank rows keep their line positions, and
//! trailing empty cells are dropped the way spreadsheet tools store them.
//!
//! The sheet's cell range is loaded eagerly when the stream opens; rows are
//! then rendered to text one at a time as the stream is consumed. Memory use
//! therefore scales with sheet size, unlike the CSV extractor.

use std::io::{Read, Seek};

use calamine::{Data, Range, Reader, Xlsx};
use tracing::debug;

use crate::cells::RawRow;
use crate::error::{Error, Result};

/// Lazy rows of the first worksheet
pub struct SheetRows {
    range: Range<Data>,
    first_row: u32,
    first_col: usize,
    next_row: u32,
    end_row: u32,
}

impl SheetRows {
    /// Open a workbook and select its first sheet.
    ///
    /// The workbook handle (and the reader it owns) is released as soon as
    /// the sheet range has been loaded.
    pub fn open<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut workbook: Xlsx<R> = Xlsx::new(reader)?;

        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(Error::NoSheet)?;
        debug!("Selected sheet '{}'", sheet);

        let range = workbook.worksheet_range(&sheet)?;
        let (first_row, first_col) = range.start().unwrap_or((0, 0));
        let end_row = range
            .end()
            .map(|(row, _)| row + 1)
            .unwrap_or(first_row);

        Ok(Self {
            range,
            first_row,
            first_col: first_col as usize,
            next_row: 0,
            end_row,
        })
    }
}

impl Iterator for SheetRows {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row >= self.end_row {
            return None;
        }
        let row = self.next_row;
        self.next_row += 1;

        if row < self.first_row {
            return Some(Ok(Vec::new()));
        }

        let offset = (row - self.first_row) as usize;
        let mut cells = vec![String::new(); self.first_col];
        cells.extend(
            (0..self.range.width())
                .map(|col| self.range.get((offset, col)).map(cell_text).unwrap_or_default()),
        );
        while cells.last().is_some_and(|c| c.is_empty()) {
            cells.pop();
        }
        Some(Ok(cells))
    }
}

/// Render one workbook cell as the text the translator sees.
///
/// Date-formatted cells come back as their serial day number, which the date
/// parser resolves through its serial fallback.
pub fn cell_text(data: &Data) -> String {
    match data {
        Data::Empty => String::new(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::String(s) => s.clone(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        other => other.to_string(),
    }
}
