//! Test utilities for recon-core
//!
//! Builders for in-memory statement fixtures: minimal .xlsx workbooks and
//! CSV documents with the default column layout.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

/// Header row in the default column layout
pub const HEADER: [&str; 5] = ["Date", "Description", "Reference", "Amount", "Direction"];

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Column letter for a 0-based index (A..Z)
fn col_name(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Build a minimal workbook with one worksheet per entry in `sheets`.
///
/// Cells that parse as numbers become numeric cells, everything else goes
/// through the shared string table, and empty cells are omitted. `start_row`
/// is the 1-based sheet row of the first fixture row.
pub fn xlsx_workbook(sheets: &[&[&[&str]]], start_row: usize) -> Vec<u8> {
    let mut strings: Vec<String> = Vec::new();
    let mut sheet_xml = Vec::new();

    for rows in sheets {
        let mut xml = format!(r#"{XML_DECL}<worksheet xmlns="{MAIN_NS}"><sheetData>"#);
        for (r, row) in rows.iter().enumerate() {
            let line = start_row + r;
            xml.push_str(&format!(r#"<row r="{}">"#, line));
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let cell_ref = format!("{}{}", col_name(c), line);
                if value.parse::<f64>().is_ok() {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, value));
                } else {
                    strings.push(escape(value));
                    xml.push_str(&format!(
                        r#"<c r="{}" t="s"><v>{}</v></c>"#,
                        cell_ref,
                        strings.len() - 1
                    ));
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData></worksheet>");
        sheet_xml.push(xml);
    }

    let mut sheets_decl = String::new();
    let mut rels = String::new();
    let mut overrides = String::new();
    for i in 1..=sheet_xml.len() {
        sheets_decl.push_str(&format!(
            r#"<sheet name="Sheet{i}" sheetId="{i}" r:id="rId{i}"/>"#
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ));
        overrides.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }

    let content_types = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>{overrides}</Types>"#
    );
    let root_rels = format!(
        r#"{XML_DECL}<Relationships xmlns="{PKG_REL_NS}"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    );
    let sheets_elem = if sheets_decl.is_empty() {
        "<sheets/>".to_string()
    } else {
        format!("<sheets>{sheets_decl}</sheets>")
    };
    let workbook_xml = format!(
        r#"{XML_DECL}<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}">{sheets_elem}</workbook>"#
    );
    let workbook_rels = format!(r#"{XML_DECL}<Relationships xmlns="{PKG_REL_NS}">{rels}</Relationships>"#);
    let mut shared = format!(
        r#"{XML_DECL}<sst xmlns="{MAIN_NS}" count="{0}" uniqueCount="{0}">"#,
        strings.len()
    );
    for s in &strings {
        shared.push_str(&format!("<si><t>{}</t></si>", s));
    }
    shared.push_str("</sst>");

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let mut add = |name: &str, body: &str| {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    };
    add("[Content_Types].xml", &content_types);
    add("_rels/.rels", &root_rels);
    add("xl/workbook.xml", &workbook_xml);
    add("xl/_rels/workbook.xml.rels", &workbook_rels);
    add("xl/sharedStrings.xml", &shared);
    for (i, xml) in sheet_xml.iter().enumerate() {
        add(&format!("xl/worksheets/sheet{}.xml", i + 1), xml);
    }
    zip.finish().unwrap().into_inner()
}

/// Single-sheet statement workbook: [`HEADER`] followed by `rows`
pub fn statement_xlsx(rows: &[&[&str]]) -> Vec<u8> {
    let mut all: Vec<&[&str]> = vec![&HEADER[..]];
    all.extend_from_slice(rows);
    xlsx_workbook(&[&all[..]], 1)
}

/// CSV statement: [`HEADER`] followed by `rows`, quoting cells with commas
pub fn statement_csv(rows: &[&[&str]]) -> String {
    let line = |cells: &[&str]| {
        cells
            .iter()
            .map(|c| {
                if c.contains(',') || c.contains('"') {
                    format!("\"{}\"", c.replace('"', "\"\""))
                } else {
                    c.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(",")
    };
    let mut out = line(&HEADER[..]);
    out.push('\n');
    for row in rows {
        out.push_str(&line(*row));
        out.push('\n');
    }
    out
}
