//! Builds small `.xlsx` packages for tests.

use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::cell::column_letter;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Fluent builder for a minimal workbook with shared strings.
#[derive(Debug, Default)]
pub(crate) struct XlsxBuilder {
    rows: Vec<Vec<String>>,
    second: Option<Vec<String>>,
    active_tab: usize,
    styles: bool,
    raw_sheet: Option<String>,
}

impl XlsxBuilder {
    pub(crate) fn new() -> Self {
        Self {
            styles: true,
            ..Default::default()
        }
    }

    /// Appends a row of text cells. Empty strings leave the cell out.
    pub(crate) fn row(mut self, values: &[&str]) -> Self {
        self.rows.push(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Adds a second sheet holding a single row.
    pub(crate) fn second_sheet(mut self, values: &[&str]) -> Self {
        self.second = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub(crate) fn active_tab(mut self, tab: usize) -> Self {
        self.active_tab = tab;
        self
    }

    pub(crate) fn without_styles(mut self) -> Self {
        self.styles = false;
        self
    }

    /// Replaces the first sheet's XML verbatim.
    pub(crate) fn raw_sheet(mut self, xml: &str) -> Self {
        self.raw_sheet = Some(xml.to_string());
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut strings: Vec<String> = Vec::new();
        let mut sheet_xml = |rows: &[Vec<String>]| {
            let mut body = String::new();
            for (r, row) in rows.iter().enumerate() {
                body.push_str(&format!(r#"<row r="{}">"#, r + 1));
                for (c, value) in row.iter().enumerate() {
                    if value.is_empty() {
                        continue;
                    }
                    let index = strings.iter().position(|s| s == value).unwrap_or_else(|| {
                        strings.push(value.clone());
                        strings.len() - 1
                    });
                    body.push_str(&format!(
                        r#"<c r="{}{}" t="s"><v>{index}</v></c>"#,
                        column_letter(c as u32 + 1),
                        r + 1
                    ));
                }
                body.push_str("</row>");
            }
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetData>{body}</sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#
            )
        };

        // Rows still feed the shared strings when the sheet XML is replaced
        let generated = sheet_xml(&self.rows);
        let first = self.raw_sheet.clone().unwrap_or(generated);
        let second = self.second.as_ref().map(|row| sheet_xml(&[row.clone()]));

        let escaped: String = strings
            .iter()
            .map(|s| {
                let s = s
                    .replace('&', "&amp;")
                    .replace('<', "&lt;")
                    .replace('>', "&gt;");
                format!(r#"<si><t xml:space="preserve">{s}</t></si>"#)
            })
            .collect();
        let shared = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{n}" uniqueCount="{n}">{escaped}</sst>"#,
            n = strings.len()
        );

        let mut sheets = String::from(r#"<sheet name="Sheet1" sheetId="1" r:id="rId1"/>"#);
        let mut workbook_rels = String::from(
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
        );
        let mut overrides = String::from(
            r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
        );
        if second.is_some() {
            sheets.push_str(r#"<sheet name="Sheet2" sheetId="2" r:id="rId2"/>"#);
            workbook_rels.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/>"#);
            overrides.push_str(r#"<Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#);
        }
        workbook_rels.push_str(r#"<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#);
        overrides.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
        if self.styles {
            workbook_rels.push_str(r#"<Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
            overrides.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
        }

        let workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="{}"/></bookViews><sheets>{sheets}</sheets></workbook>"#,
            self.active_tab
        );

        let mut parts: Vec<(&str, String)> = vec![
            (
                "[Content_Types].xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{overrides}</Types>"#
                ),
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                    .to_string(),
            ),
            ("xl/workbook.xml", workbook),
            (
                "xl/_rels/workbook.xml.rels",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{workbook_rels}</Relationships>"#
                ),
            ),
            ("xl/worksheets/sheet1.xml", first),
            ("xl/sharedStrings.xml", shared),
        ];
        if let Some(second) = second {
            parts.push(("xl/worksheets/sheet2.xml", second));
        }
        if self.styles {
            parts.push(("xl/styles.xml", STYLES.to_string()));
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in parts {
            zip.start_file(name, options).expect("start zip entry");
            zip.write_all(content.as_bytes()).expect("write zip entry");
        }
        zip.finish().expect("finish zip").into_inner()
    }

    /// Builds the package and writes it to `path`.
    pub(crate) fn write(self, path: &Path) {
        std::fs::write(path, self.build()).expect("write workbook fixture");
    }
}
