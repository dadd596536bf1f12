//! Spreadsheet package access.
//!
//! A [`Workbook`] keeps every part of the `.xlsx`/`.xlsm` package in memory,
//! decodes the active worksheet into a [`Worksheet`] grid and, on save,
//! patches only the parts that hyperlink conversion touches: the worksheet,
//! its relationships and the styles part. Everything else is written back
//! byte for byte, which keeps macros, charts and formatting intact.

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

mod cell;
mod content_types;
mod error;
mod rels;
mod shared_strings;
mod sheet;
mod sheet_xml;
mod styles;
#[cfg(test)]
#[allow(clippy::expect_used)]
pub(crate) mod test_utils;
mod xml;

pub use cell::{column_index, column_letter, Cell, CellRef, CellValue, HyperlinkStyle};
pub use error::{Result, WorkbookError};
pub use sheet::Worksheet;

use content_types::{CONTENT_TYPES_PART, STYLES_CONTENT_TYPE};
use rels::{RelIdAllocator, Relationship, HYPERLINK_REL_TYPE, STYLES_REL_TYPE};
use sheet_xml::{DecodeContext, NewHyperlink};
use styles::StyleSheet;

const ROOT_RELS: &str = "_rels/.rels";
const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

/// Largest part accepted when reading a package.
const MAX_PART_SIZE: u64 = 256 * 1024 * 1024;

/// Styles part written into packages that ship without one.
const DEFAULT_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

/// Sheet entry listed in the workbook part.
#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    rel_id: String,
}

/// Facts read from the workbook part.
#[derive(Debug, Default)]
struct WorkbookInfo {
    sheets: Vec<SheetEntry>,
    active_tab: usize,
    date1904: bool,
}

/// An opened spreadsheet package with its active sheet decoded.
#[derive(Debug)]
pub struct Workbook {
    parts: Vec<(String, Vec<u8>)>,
    workbook_part: String,
    sheet_part: String,
    styles_part: Option<String>,
    styles: Option<StyleSheet>,
    sheet: Worksheet,
}

impl Workbook {
    /// Opens a workbook from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening workbook");
        let file = fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Reads a workbook package from any seekable source.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let content = read_part(&mut entry, &name, MAX_PART_SIZE)?;
            parts.push((name, content));
        }

        let mut workbook = Self {
            parts,
            workbook_part: String::new(),
            sheet_part: String::new(),
            styles_part: None,
            styles: None,
            sheet: Worksheet::default(),
        };
        workbook.load_active_sheet()?;
        Ok(workbook)
    }

    fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(part, _)| part == name)
            .map(|(_, content)| content.as_slice())
    }

    fn part_text(&self, name: &str) -> Result<Option<&str>> {
        match self.part(name) {
            Some(bytes) => std::str::from_utf8(bytes)
                .map(Some)
                .map_err(|e| WorkbookError::malformed(name, e.to_string())),
            None => Ok(None),
        }
    }

    fn required_text(&self, name: &str) -> Result<&str> {
        self.part_text(name)?
            .ok_or_else(|| WorkbookError::MissingPart(name.to_string()))
    }

    fn workbook_part(&self) -> Result<String> {
        let Some(content) = self.part_text(ROOT_RELS)? else {
            return Ok(DEFAULT_WORKBOOK_PART.to_string());
        };
        Ok(rels::parse(content)?
            .into_iter()
            .find(|r| r.is_kind("officeDocument"))
            .map(|r| xml::resolve_target("", &r.target))
            .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string()))
    }

    fn load_active_sheet(&mut self) -> Result<()> {
        let workbook_part = self.workbook_part()?;
        let info = parse_workbook(self.required_text(&workbook_part)?)?;
        let workbook_rels = match self.part_text(&xml::rels_path_for(&workbook_part))? {
            Some(content) => rels::parse(content)?,
            None => Vec::new(),
        };
        let base_dir = xml::part_dir(&workbook_part);

        let entry = info
            .sheets
            .get(info.active_tab)
            .or_else(|| info.sheets.first())
            .ok_or_else(|| WorkbookError::malformed(&workbook_part, "workbook has no sheets"))?;
        let sheet_rel = workbook_rels
            .iter()
            .find(|r| r.id == entry.rel_id)
            .ok_or_else(|| {
                WorkbookError::malformed(
                    &workbook_part,
                    format!("sheet '{}' has no relationship {}", entry.name, entry.rel_id),
                )
            })?;
        let sheet_part = xml::resolve_target(base_dir, &sheet_rel.target);

        let shared_strings = match workbook_rels.iter().find(|r| r.is_kind("sharedStrings")) {
            Some(rel) => match self.part_text(&xml::resolve_target(base_dir, &rel.target))? {
                Some(content) => shared_strings::parse(content)?,
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        let styles_part = workbook_rels
            .iter()
            .find(|r| r.is_kind("styles"))
            .map(|r| xml::resolve_target(base_dir, &r.target))
            .filter(|part| self.part(part).is_some());
        let styles = match &styles_part {
            Some(part) => Some(StyleSheet::parse(self.required_text(part)?)?),
            None => None,
        };

        let ctx = DecodeContext {
            shared_strings: &shared_strings,
            styles: styles.as_ref(),
            date1904: info.date1904,
        };
        let (mut sheet, links) =
            sheet_xml::parse(self.required_text(&sheet_part)?, &entry.name, &ctx)?;

        if !links.is_empty() {
            let sheet_rels = match self.part_text(&xml::rels_path_for(&sheet_part))? {
                Some(content) => rels::parse(content)?,
                None => Vec::new(),
            };
            for link in links {
                let target = match (&link.rel_id, &link.location) {
                    (Some(id), _) => sheet_rels
                        .iter()
                        .find(|r| &r.id == id)
                        .map(|r| r.target.clone()),
                    (None, Some(location)) => Some(format!("#{location}")),
                    (None, None) => None,
                };
                let first = link.reference.split(':').next().unwrap_or_default();
                match (target, CellRef::parse(first)) {
                    (Some(target), Ok(reference)) => {
                        if let Some(cell) = sheet.cell_mut(reference) {
                            cell.hyperlink = Some(target);
                        }
                    }
                    _ => warn!(reference = %link.reference, "Skipping unresolvable hyperlink"),
                }
            }
        }

        debug!(
            sheet = %entry.name,
            part = %sheet_part,
            rows = sheet.max_row(),
            columns = sheet.max_column(),
            "Loaded active sheet"
        );

        self.workbook_part = workbook_part;
        self.sheet_part = sheet_part;
        self.styles_part = styles_part;
        self.styles = styles;
        self.sheet = sheet;
        Ok(())
    }

    /// The sheet that was active when the workbook was saved.
    pub fn active_sheet(&self) -> &Worksheet {
        &self.sheet
    }

    /// Mutable access to the active sheet.
    pub fn active_sheet_mut(&mut self) -> &mut Worksheet {
        &mut self.sheet
    }

    /// Writes the workbook to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path.as_ref(), bytes)?;
        debug!(path = %path.as_ref().display(), "Saved workbook");
        Ok(())
    }

    /// Serialises the package with pending hyperlinks applied.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut replaced: HashMap<String, Vec<u8>> = HashMap::new();
        let mut added: Vec<(String, Vec<u8>)> = Vec::new();

        let pending: Vec<&Cell> = self
            .sheet
            .pending_hyperlinks()
            .filter(|c| c.hyperlink.is_some())
            .collect();

        if !pending.is_empty() {
            let created;
            let (styles, styles_source, styles_part) = match (&self.styles, &self.styles_part) {
                (Some(styles), Some(part)) => (styles, self.required_text(part)?, Some(part)),
                _ => {
                    created = StyleSheet::parse(DEFAULT_STYLES)?;
                    (&created, DEFAULT_STYLES, None)
                }
            };
            let default_style = HyperlinkStyle::default();
            let requests = pending.iter().map(|c| {
                (
                    c.style_index.unwrap_or(0),
                    c.hyperlink_style.as_ref().unwrap_or(&default_style),
                )
            });
            let plan = styles.plan(requests)?;

            let mut cell_styles = HashMap::new();
            for cell in &pending {
                let style = cell.hyperlink_style.as_ref().unwrap_or(&default_style);
                if let Some(xf) = plan.style_for(cell.style_index.unwrap_or(0), style) {
                    cell_styles.insert(cell.reference(), xf);
                }
            }

            let rels_part = xml::rels_path_for(&self.sheet_part);
            let existing_rels = self.part_text(&rels_part)?;
            let known = match existing_rels {
                Some(content) => rels::parse(content)?,
                None => Vec::new(),
            };
            let mut ids = RelIdAllocator::new(&known);
            let mut relationships = Vec::with_capacity(pending.len());
            let mut links = Vec::with_capacity(pending.len());
            for cell in &pending {
                let Some(target) = &cell.hyperlink else {
                    continue;
                };
                let id = ids.allocate();
                relationships.push(Relationship {
                    id: id.clone(),
                    rel_type: HYPERLINK_REL_TYPE.to_string(),
                    target: target.clone(),
                    external: true,
                });
                links.push(NewHyperlink {
                    reference: cell.reference(),
                    rel_id: id,
                });
            }

            let sheet = sheet_xml::patch(
                self.required_text(&self.sheet_part)?,
                &cell_styles,
                &links,
            )?;
            replaced.insert(self.sheet_part.clone(), sheet);

            let rels_bytes = rels::append(existing_rels, &relationships)?;
            if existing_rels.is_some() {
                replaced.insert(rels_part, rels_bytes);
            } else {
                added.push((rels_part, rels_bytes));
            }

            match styles_part {
                Some(part) => {
                    if !plan.is_empty() {
                        replaced.insert(part.clone(), styles.render(styles_source, &plan)?);
                    }
                }
                None => {
                    let part = self.register_styles_part(&mut replaced, &mut added)?;
                    added.push((part, styles.render(styles_source, &plan)?));
                }
            }
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            let body = replaced.get(name).unwrap_or(content);
            zip.write_all(body)?;
        }
        for (name, content) in &added {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(content)?;
        }
        Ok(zip.finish()?.into_inner())
    }

    /// Links a new styles part from the workbook and the content types.
    /// Returns the part name.
    fn register_styles_part(
        &self,
        replaced: &mut HashMap<String, Vec<u8>>,
        added: &mut Vec<(String, Vec<u8>)>,
    ) -> Result<String> {
        let base_dir = xml::part_dir(&self.workbook_part);
        let mut file_name = "styles.xml".to_string();
        let mut counter = 1;
        while self.part(&xml::resolve_target(base_dir, &file_name)).is_some() {
            counter += 1;
            file_name = format!("styles{counter}.xml");
        }
        let part = xml::resolve_target(base_dir, &file_name);

        let rels_part = xml::rels_path_for(&self.workbook_part);
        let existing = self.part_text(&rels_part)?;
        let known = match existing {
            Some(content) => rels::parse(content)?,
            None => Vec::new(),
        };
        let relationship = Relationship {
            id: RelIdAllocator::new(&known).allocate(),
            rel_type: STYLES_REL_TYPE.to_string(),
            target: file_name,
            external: false,
        };
        let rels_bytes = rels::append(existing, &[relationship])?;
        if existing.is_some() {
            replaced.insert(rels_part, rels_bytes);
        } else {
            added.push((rels_part, rels_bytes));
        }

        let types = content_types::add_override(
            self.required_text(CONTENT_TYPES_PART)?,
            &part,
            STYLES_CONTENT_TYPE,
        )?;
        replaced.insert(CONTENT_TYPES_PART.to_string(), types);

        debug!(part = %part, "Created styles part");
        Ok(part)
    }
}

/// Reads one package entry, refusing parts larger than `limit`.
///
/// The size declared in the archive is not trusted.
fn read_part(entry: impl Read, name: &str, limit: u64) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    entry.take(limit + 1).read_to_end(&mut content)?;
    if content.len() as u64 > limit {
        return Err(WorkbookError::malformed(
            name,
            format!("part is larger than {limit} bytes"),
        ));
    }
    Ok(content)
}

fn parse_workbook(content: &str) -> Result<WorkbookInfo> {
    let mut reader = Reader::from_str(content);
    let mut info = WorkbookInfo::default();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) => match e.local_name().as_ref() {
                b"sheet" => {
                    let name = xml::attr(e, "name")?.unwrap_or_default();
                    let rel_id = xml::attr_local(e, "id")?.ok_or_else(|| {
                        WorkbookError::malformed("workbook", format!("sheet '{name}' has no id"))
                    })?;
                    info.sheets.push(SheetEntry { name, rel_id });
                }
                b"workbookView" if info.active_tab == 0 => {
                    info.active_tab = xml::attr(e, "activeTab")?
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                }
                b"workbookPr" => {
                    info.date1904 =
                        matches!(xml::attr(e, "date1904")?.as_deref(), Some("1" | "true"));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(info)
}
