//! Styles part (`xl/styles.xml`): date detection and hyperlink font cloning.
//!
//! Converted cells keep their original cell format. A copy of that format is
//! appended to `cellXfs` pointing at a copy of its font with the hyperlink
//! colour and underline applied, so number formats, fills and borders survive.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::cell::HyperlinkStyle;
use super::error::{Result, WorkbookError};
use super::xml;

type Fragment = Vec<Event<'static>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Fonts,
    CellXfs,
    NumFmts,
    Other,
}

impl Section {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"fonts" => Section::Fonts,
            b"cellXfs" => Section::CellXfs,
            b"numFmts" => Section::NumFmts,
            _ => Section::Other,
        }
    }
}

#[derive(Debug, Clone)]
struct CellFormat {
    events: Fragment,
    font_id: u32,
    num_fmt_id: u32,
}

/// Parsed view of the parts of the styles part this crate cares about.
#[derive(Debug, Clone, Default)]
pub(crate) struct StyleSheet {
    fonts: Vec<Fragment>,
    cell_formats: Vec<CellFormat>,
    num_fmts: HashMap<u32, String>,
}

/// Formats and fonts to append, and where each converted cell should point.
#[derive(Debug, Default)]
pub(crate) struct StylePlan {
    fonts: Vec<Fragment>,
    cell_formats: Vec<Fragment>,
    mapping: HashMap<(u32, HyperlinkStyle), u32>,
}

impl StylePlan {
    /// New cell format index for a cell whose original format is `base`.
    pub fn style_for(&self, base: u32, style: &HyperlinkStyle) -> Option<u32> {
        self.mapping.get(&(base, style.clone())).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.cell_formats.is_empty()
    }
}

impl StyleSheet {
    /// Parses the styles part.
    pub fn parse(content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        let mut sheet = StyleSheet::default();
        let mut depth = 0usize;
        let mut section = Section::Other;
        let mut capture: Option<Fragment> = None;

        loop {
            let event = reader.read_event()?;
            match event {
                Event::Start(ref e) => {
                    depth += 1;
                    if depth == 2 {
                        section = Section::from_name(e.local_name().as_ref());
                    } else if depth == 3 && capture.is_none() && sheet.is_captured(section, e) {
                        capture = Some(vec![event.clone().into_owned()]);
                        continue;
                    } else if depth == 3 && section == Section::NumFmts {
                        sheet.record_num_fmt(e)?;
                    }
                    if let Some(fragment) = capture.as_mut() {
                        fragment.push(event.into_owned());
                    }
                }
                Event::End(ref e) => {
                    if let Some(fragment) = capture.as_mut() {
                        fragment.push(Event::End(e.clone().into_owned()));
                        if depth == 3 {
                            if let Some(done) = capture.take() {
                                sheet.finish(section, done)?;
                            }
                        }
                    }
                    depth = depth.saturating_sub(1);
                    if depth < 2 {
                        section = Section::Other;
                    }
                }
                Event::Empty(ref e) => {
                    if depth == 2 && sheet.is_captured(section, e) {
                        sheet.finish(section, vec![event.clone().into_owned()])?;
                    } else if depth == 2 && section == Section::NumFmts {
                        sheet.record_num_fmt(e)?;
                    } else if let Some(fragment) = capture.as_mut() {
                        fragment.push(event.into_owned());
                    }
                }
                Event::Eof => break,
                other => {
                    if let Some(fragment) = capture.as_mut() {
                        fragment.push(other.into_owned());
                    }
                }
            }
        }

        Ok(sheet)
    }

    fn is_captured(&self, section: Section, e: &BytesStart<'_>) -> bool {
        matches!(
            (section, e.local_name().as_ref()),
            (Section::Fonts, b"font") | (Section::CellXfs, b"xf")
        )
    }

    fn record_num_fmt(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if e.local_name().as_ref() != b"numFmt" {
            return Ok(());
        }
        let id = xml::attr(e, "numFmtId")?.and_then(|v| v.parse().ok());
        let code = xml::attr(e, "formatCode")?;
        if let (Some(id), Some(code)) = (id, code) {
            self.num_fmts.insert(id, code);
        }
        Ok(())
    }

    fn finish(&mut self, section: Section, fragment: Fragment) -> Result<()> {
        match section {
            Section::Fonts => self.fonts.push(fragment),
            Section::CellXfs => {
                let (font_id, num_fmt_id) = match fragment.first() {
                    Some(Event::Start(e)) | Some(Event::Empty(e)) => (
                        xml::attr(e, "fontId")?.and_then(|v| v.parse().ok()).unwrap_or(0),
                        xml::attr(e, "numFmtId")?.and_then(|v| v.parse().ok()).unwrap_or(0),
                    ),
                    _ => (0, 0),
                };
                self.cell_formats.push(CellFormat {
                    events: fragment,
                    font_id,
                    num_fmt_id,
                });
            }
            Section::NumFmts | Section::Other => {}
        }
        Ok(())
    }

    /// Number of fonts in the part.
    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Number of cell formats in the part.
    pub fn cell_format_count(&self) -> usize {
        self.cell_formats.len()
    }

    /// Returns true when the cell format renders numbers as dates.
    pub fn is_date_format(&self, xf_index: u32) -> bool {
        let Some(format) = self.cell_formats.get(xf_index as usize) else {
            return false;
        };
        match format.num_fmt_id {
            14..=22 | 27..=36 | 45..=47 | 50..=58 => true,
            id => self
                .num_fmts
                .get(&id)
                .is_some_and(|code| is_date_format_code(code)),
        }
    }

    /// Plans the fonts and formats needed for the given (base format, style) pairs.
    pub fn plan<'a>(
        &self,
        requests: impl IntoIterator<Item = (u32, &'a HyperlinkStyle)>,
    ) -> Result<StylePlan> {
        let mut plan = StylePlan::default();
        let mut font_map: HashMap<(u32, HyperlinkStyle), u32> = HashMap::new();

        for (base, style) in requests {
            let key = (base, style.clone());
            if plan.mapping.contains_key(&key) {
                continue;
            }

            let base_format = self
                .cell_formats
                .get(base as usize)
                .or_else(|| self.cell_formats.first())
                .ok_or_else(|| WorkbookError::malformed("styles", "no cell formats"))?;

            let font_key = (base_format.font_id, style.clone());
            let font_id = match font_map.get(&font_key) {
                Some(id) => *id,
                None => {
                    let base_font = self
                        .fonts
                        .get(base_format.font_id as usize)
                        .or_else(|| self.fonts.first())
                        .ok_or_else(|| WorkbookError::malformed("styles", "no fonts"))?;
                    let id = (self.fonts.len() + plan.fonts.len()) as u32;
                    plan.fonts.push(hyperlink_font(base_font, style));
                    font_map.insert(font_key, id);
                    id
                }
            };

            let xf_id = (self.cell_formats.len() + plan.cell_formats.len()) as u32;
            plan.cell_formats
                .push(cell_format_with_font(&base_format.events, font_id)?);
            plan.mapping.insert(key, xf_id);
        }

        Ok(plan)
    }

    /// Rewrites the styles part with the planned fonts and formats appended.
    pub fn render(&self, content: &str, plan: &StylePlan) -> Result<Vec<u8>> {
        let font_total = (self.fonts.len() + plan.fonts.len()).to_string();
        let xf_total = (self.cell_formats.len() + plan.cell_formats.len()).to_string();

        let mut reader = Reader::from_str(content);
        let mut writer = Writer::new(Vec::new());
        let mut depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    depth += 1;
                    let section = Section::from_name(e.local_name().as_ref());
                    match (depth, section) {
                        (2, Section::Fonts) => writer.write_event(Event::Start(
                            xml::with_attributes(&e, &[("count", &font_total)])?,
                        ))?,
                        (2, Section::CellXfs) => writer.write_event(Event::Start(
                            xml::with_attributes(&e, &[("count", &xf_total)])?,
                        ))?,
                        _ => writer.write_event(Event::Start(e))?,
                    }
                }
                Event::End(e) => {
                    let section = Section::from_name(e.local_name().as_ref());
                    match (depth, section) {
                        (2, Section::Fonts) => write_fragments(&mut writer, &plan.fonts)?,
                        (2, Section::CellXfs) => write_fragments(&mut writer, &plan.cell_formats)?,
                        _ => {}
                    }
                    depth = depth.saturating_sub(1);
                    writer.write_event(Event::End(e))?;
                }
                Event::Empty(e) if depth == 1 => {
                    let (count, added) = match Section::from_name(e.local_name().as_ref()) {
                        Section::Fonts => (&font_total, &plan.fonts),
                        Section::CellXfs => (&xf_total, &plan.cell_formats),
                        Section::NumFmts | Section::Other => {
                            writer.write_event(Event::Empty(e))?;
                            continue;
                        }
                    };
                    let start = xml::with_attributes(&e, &[("count", count)])?;
                    let end = BytesEnd::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
                    writer.write_event(Event::Start(start))?;
                    write_fragments(&mut writer, added)?;
                    writer.write_event(Event::End(end))?;
                }
                Event::Eof => break,
                event => writer.write_event(event)?,
            }
        }

        Ok(writer.into_inner())
    }
}

fn write_fragments(writer: &mut Writer<Vec<u8>>, fragments: &[Fragment]) -> Result<()> {
    for fragment in fragments {
        for event in fragment {
            writer.write_event(event.clone())?;
        }
    }
    Ok(())
}

/// Copies a `<font>` fragment, replacing its underline and colour children.
fn hyperlink_font(base: &[Event<'static>], style: &HyperlinkStyle) -> Fragment {
    let mut overrides: Fragment = Vec::new();
    if style.underline {
        overrides.push(Event::Empty(BytesStart::new("u")));
    }
    let mut color = BytesStart::new("color");
    color.push_attribute(("rgb", style.argb().as_str()));
    overrides.push(Event::Empty(color.into_owned()));

    let mut out = Vec::with_capacity(base.len() + overrides.len());
    let mut depth = 0usize;
    let mut skipping: Option<usize> = None;

    for event in base {
        match event {
            Event::Empty(e) if depth == 0 => {
                out.push(Event::Start(e.clone()));
                out.extend(overrides.iter().cloned());
                out.push(Event::End(e.to_end().into_owned()));
                return out;
            }
            Event::Start(e) => {
                depth += 1;
                if skipping.is_none() && depth == 2 && is_overridden(e) {
                    skipping = Some(depth);
                } else if skipping.is_none() {
                    out.push(event.clone());
                }
            }
            Event::End(_) => {
                if skipping == Some(depth) {
                    skipping = None;
                } else if skipping.is_none() {
                    if depth == 1 {
                        out.extend(overrides.iter().cloned());
                    }
                    out.push(event.clone());
                }
                depth = depth.saturating_sub(1);
            }
            Event::Empty(e) if depth == 1 && is_overridden(e) => {}
            _ if skipping.is_some() => {}
            other => out.push(other.clone()),
        }
    }

    out
}

fn is_overridden(e: &BytesStart<'_>) -> bool {
    matches!(e.local_name().as_ref(), b"u" | b"color")
}

/// Copies an `<xf>` fragment pointing it at another font.
fn cell_format_with_font(base: &[Event<'static>], font_id: u32) -> Result<Fragment> {
    let font_id = font_id.to_string();
    let replacements = [("fontId", font_id.as_str()), ("applyFont", "1")];

    base.iter()
        .enumerate()
        .map(|(i, event)| match event {
            Event::Start(e) if i == 0 => Ok(Event::Start(xml::with_attributes(e, &replacements)?)),
            Event::Empty(e) if i == 0 => Ok(Event::Empty(xml::with_attributes(e, &replacements)?)),
            other => Ok(other.clone()),
        })
        .collect()
}

/// Returns true for custom number format codes that render dates or times.
pub(crate) fn is_date_format_code(code: &str) -> bool {
    let mut cleaned = String::with_capacity(code.len());
    let mut chars = code.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '[' => {
                for q in chars.by_ref() {
                    if q == ']' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            other => cleaned.push(other),
        }
    }

    let lowered = cleaned.to_lowercase().replace("general", "");
    lowered.chars().any(|c| matches!(c, 'd' | 'm' | 'y' | 'h' | 's'))
}

/// Converts a serial date number into a timestamp.
pub(crate) fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let (epoch, serial) = if date1904 {
        (NaiveDate::from_ymd_opt(1904, 1, 1)?, serial)
    } else if serial < 60.0 {
        // Serials before the phantom 1900-02-29 are one day behind
        (NaiveDate::from_ymd_opt(1899, 12, 31)?, serial)
    } else {
        (NaiveDate::from_ymd_opt(1899, 12, 30)?, serial)
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::milliseconds(millis))
}
