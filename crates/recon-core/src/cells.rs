//! Bounds-safe access into raw statement rows

/// One raw row as produced by an extractor
pub type RawRow = Vec<String>;

/// Cell at `index`, or an empty string when the row is shorter.
///
/// Spreadsheet tools commonly omit trailing empty cells, so rows may be
/// narrower than the header.
pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Whether every cell in the row is blank
pub fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}
