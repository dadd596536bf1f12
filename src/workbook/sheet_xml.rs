//! Worksheet part reader and hyperlink patcher.

use std::collections::HashMap;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::cell::{Cell, CellRef, CellValue};
use super::error::{Result, WorkbookError};
use super::rels::OFFICE_REL_NS;
use super::sheet::Worksheet;
use super::styles::{serial_to_datetime, StyleSheet};
use super::xml;

/// Worksheet children that must come after `<hyperlinks>`.
const AFTER_HYPERLINKS: &[&[u8]] = &[
    b"printOptions",
    b"pageMargins",
    b"pageSetup",
    b"headerFooter",
    b"rowBreaks",
    b"colBreaks",
    b"customProperties",
    b"cellWatches",
    b"ignoredErrors",
    b"smartTags",
    b"drawing",
    b"legacyDrawing",
    b"legacyDrawingHF",
    b"drawingHF",
    b"picture",
    b"oleObjects",
    b"controls",
    b"webPublishItems",
    b"tableParts",
    b"extLst",
];

/// Lookups needed to decode cell values.
pub(crate) struct DecodeContext<'a> {
    pub shared_strings: &'a [String],
    pub styles: Option<&'a StyleSheet>,
    pub date1904: bool,
}

/// A `<hyperlink>` element found in the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetHyperlink {
    pub reference: String,
    pub rel_id: Option<String>,
    pub location: Option<String>,
}

/// Tracks the implicit position of rows and cells that omit `r`.
#[derive(Debug, Default)]
struct CellCursor {
    row: u32,
    column: u32,
}

impl CellCursor {
    fn enter_row(&mut self, start: &BytesStart<'_>) -> Result<()> {
        self.row = match xml::attr(start, "r")? {
            Some(r) => r
                .parse()
                .map_err(|_| WorkbookError::malformed("worksheet", format!("row number '{r}'")))?,
            None => self.row + 1,
        };
        self.column = 0;
        Ok(())
    }

    fn next_cell(&mut self, start: &BytesStart<'_>) -> Result<CellRef> {
        let reference = match xml::attr(start, "r")? {
            Some(r) => CellRef::parse(&r)?,
            None => CellRef::new(self.row.max(1), self.column + 1),
        };
        self.row = reference.row;
        self.column = reference.column;
        Ok(reference)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Buffer {
    None,
    Value,
    Formula,
    Inline,
}

struct PendingCell {
    reference: CellRef,
    cell_type: Option<String>,
    style: Option<u32>,
    value: String,
    formula: String,
    inline: String,
}

impl PendingCell {
    fn new(reference: CellRef, start: &BytesStart<'_>) -> Result<Self> {
        let style = match xml::attr(start, "s")? {
            Some(s) => Some(s.parse().map_err(|_| {
                WorkbookError::malformed("worksheet", format!("style index '{s}' at {reference}"))
            })?),
            None => None,
        };
        Ok(Self {
            reference,
            cell_type: xml::attr(start, "t")?,
            style,
            value: String::new(),
            formula: String::new(),
            inline: String::new(),
        })
    }

    fn build(self, ctx: &DecodeContext<'_>) -> Result<Cell> {
        let reference = self.reference;
        let value = if !self.formula.is_empty() {
            CellValue::Formula(self.formula)
        } else {
            match self.cell_type.as_deref() {
                Some("s") => {
                    if self.value.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        let index: usize = self.value.trim().parse().map_err(|_| {
                            WorkbookError::malformed(
                                "worksheet",
                                format!("shared string index '{}' at {reference}", self.value),
                            )
                        })?;
                        let text = ctx.shared_strings.get(index).ok_or_else(|| {
                            WorkbookError::malformed(
                                "worksheet",
                                format!("shared string {index} at {reference} does not exist"),
                            )
                        })?;
                        CellValue::Text(text.clone())
                    }
                }
                Some("inlineStr") => CellValue::Text(self.inline),
                Some("str") | Some("d") => CellValue::Text(self.value),
                Some("b") => CellValue::Bool(self.value.trim() == "1"),
                Some("e") => CellValue::Error(self.value),
                _ if self.value.trim().is_empty() => CellValue::Empty,
                _ => {
                    let number: f64 = self.value.trim().parse().map_err(|_| {
                        WorkbookError::malformed(
                            "worksheet",
                            format!("number '{}' at {reference}", self.value),
                        )
                    })?;
                    let is_date = self
                        .style
                        .zip(ctx.styles)
                        .is_some_and(|(s, styles)| styles.is_date_format(s));
                    match is_date.then(|| serial_to_datetime(number, ctx.date1904)).flatten() {
                        Some(date) => CellValue::Date(date),
                        None => CellValue::Number(number),
                    }
                }
            }
        };

        let mut cell = Cell::new(reference.row, reference.column, value);
        cell.style_index = self.style;
        Ok(cell)
    }
}

/// Reads the cells and hyperlinks of a worksheet part.
pub(crate) fn parse(
    content: &str,
    name: &str,
    ctx: &DecodeContext<'_>,
) -> Result<(Worksheet, Vec<SheetHyperlink>)> {
    let mut reader = Reader::from_str(content);
    let mut sheet = Worksheet::new(name);
    let mut links = Vec::new();
    let mut cursor = CellCursor::default();
    let mut pending: Option<PendingCell> = None;
    let mut buffer = Buffer::None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"row" => cursor.enter_row(e)?,
                b"c" => pending = Some(PendingCell::new(cursor.next_cell(e)?, e)?),
                b"v" => buffer = Buffer::Value,
                b"f" => buffer = Buffer::Formula,
                b"t" if pending.is_some() => buffer = Buffer::Inline,
                b"rPh" => buffer = Buffer::None,
                b"hyperlink" => links.push(read_hyperlink(e)?),
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"row" => cursor.enter_row(e)?,
                b"c" => {
                    let cell = PendingCell::new(cursor.next_cell(e)?, e)?.build(ctx)?;
                    sheet.insert(cell);
                }
                b"hyperlink" => links.push(read_hyperlink(e)?),
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some(cell) = pending.take() {
                        sheet.insert(cell.build(ctx)?);
                    }
                    buffer = Buffer::None;
                }
                b"v" | b"f" | b"t" => buffer = Buffer::None,
                _ => {}
            },
            Event::Text(ref t) => push_text(&mut pending, buffer, &xml::text(t)?),
            Event::CData(ref t) => push_text(&mut pending, buffer, &String::from_utf8_lossy(t)),
            Event::GeneralRef(ref r) => push_text(&mut pending, buffer, &xml::entity(r)?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((sheet, links))
}

fn push_text(pending: &mut Option<PendingCell>, buffer: Buffer, text: &str) {
    let Some(cell) = pending.as_mut() else {
        return;
    };
    match buffer {
        Buffer::Value => cell.value.push_str(text),
        Buffer::Formula => cell.formula.push_str(text),
        Buffer::Inline => cell.inline.push_str(text),
        Buffer::None => {}
    }
}

fn read_hyperlink(e: &BytesStart<'_>) -> Result<SheetHyperlink> {
    Ok(SheetHyperlink {
        reference: xml::attr(e, "ref")?.unwrap_or_default(),
        rel_id: xml::attr_local(e, "id")?,
        location: xml::attr(e, "location")?,
    })
}

/// New hyperlink to write into the sheet.
#[derive(Debug, Clone)]
pub(crate) struct NewHyperlink {
    pub reference: CellRef,
    pub rel_id: String,
}

/// Rewrites a worksheet part: converted cells get their new style index and
/// the `<hyperlinks>` block is created or extended.
pub(crate) fn patch(
    content: &str,
    styles: &HashMap<CellRef, u32>,
    links: &[NewHyperlink],
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Vec::new());
    let mut cursor = CellCursor::default();
    let mut depth = 0usize;
    let mut inserted = links.is_empty();
    let mut existing: Option<Vec<BytesStart<'static>>> = None;

    loop {
        let event = reader.read_event()?;
        if let Some(kept) = existing.as_mut() {
            match event {
                Event::Start(ref e) | Event::Empty(ref e)
                    if e.local_name().as_ref() == b"hyperlink" =>
                {
                    kept.push(e.clone().into_owned());
                    if matches!(event, Event::Start(_)) {
                        depth += 1;
                    }
                }
                Event::Start(_) => depth += 1,
                Event::End(ref e) if e.local_name().as_ref() == b"hyperlinks" => {
                    depth = depth.saturating_sub(1);
                    let kept = existing.take().unwrap_or_default();
                    write_hyperlinks(&mut writer, kept, links)?;
                    inserted = true;
                }
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(ref e) => {
                let level = depth;
                depth += 1;
                match e.local_name().as_ref() {
                    b"worksheet" if level == 0 && !inserted => {
                        writer.write_event(Event::Start(with_rel_namespace(e)?))?;
                        continue;
                    }
                    b"hyperlinks" if level == 1 && !inserted => {
                        existing = Some(Vec::new());
                        continue;
                    }
                    name if level == 1 && !inserted && AFTER_HYPERLINKS.contains(&name) => {
                        write_hyperlinks(&mut writer, Vec::new(), links)?;
                        inserted = true;
                    }
                    b"row" => cursor.enter_row(e)?,
                    b"c" => {
                        let reference = cursor.next_cell(e)?;
                        if let Some(style) = styles.get(&reference) {
                            let patched = xml::with_attributes(e, &[("s", &style.to_string())])?;
                            writer.write_event(Event::Start(patched))?;
                            continue;
                        }
                    }
                    _ => {}
                }
                writer.write_event(event)?;
            }
            Event::Empty(ref e) => {
                match e.local_name().as_ref() {
                    b"hyperlinks" if depth == 1 && !inserted => {
                        write_hyperlinks(&mut writer, Vec::new(), links)?;
                        inserted = true;
                        continue;
                    }
                    name if depth == 1 && !inserted && AFTER_HYPERLINKS.contains(&name) => {
                        write_hyperlinks(&mut writer, Vec::new(), links)?;
                        inserted = true;
                    }
                    b"row" => cursor.enter_row(e)?,
                    b"c" => {
                        let reference = cursor.next_cell(e)?;
                        if let Some(style) = styles.get(&reference) {
                            let patched = xml::with_attributes(e, &[("s", &style.to_string())])?;
                            writer.write_event(Event::Empty(patched))?;
                            continue;
                        }
                    }
                    _ => {}
                }
                writer.write_event(event)?;
            }
            Event::End(ref e) => {
                depth = depth.saturating_sub(1);
                if depth == 0 && !inserted && e.local_name().as_ref() == b"worksheet" {
                    write_hyperlinks(&mut writer, Vec::new(), links)?;
                    inserted = true;
                }
                writer.write_event(event)?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    if !inserted {
        return Err(WorkbookError::malformed(
            "worksheet",
            "no place to insert hyperlinks",
        ));
    }

    Ok(writer.into_inner())
}

fn with_rel_namespace(start: &BytesStart<'_>) -> Result<BytesStart<'static>> {
    if xml::attr(start, "xmlns:r")?.is_some() {
        return Ok(start.clone().into_owned());
    }
    xml::with_attributes(start, &[("xmlns:r", OFFICE_REL_NS)])
}

fn write_hyperlinks(
    writer: &mut Writer<Vec<u8>>,
    kept: Vec<BytesStart<'static>>,
    links: &[NewHyperlink],
) -> Result<()> {
    let replaced: Vec<String> = links.iter().map(|l| l.reference.to_string()).collect();

    writer.write_event(Event::Start(BytesStart::new("hyperlinks")))?;
    for element in kept {
        let reference = xml::attr(&element, "ref")?.unwrap_or_default();
        if !replaced.contains(&reference) {
            writer.write_event(Event::Empty(element))?;
        }
    }
    for link in links {
        let mut element = BytesStart::new("hyperlink");
        element.push_attribute(("ref", link.reference.to_string().as_str()));
        element.push_attribute(("r:id", link.rel_id.as_str()));
        writer.write_event(Event::Empty(element))?;
    }
    writer.write_event(Event::End(BytesEnd::new("hyperlinks")))?;
    Ok(())
}
