//! `[Content_Types].xml` bookkeeping for parts added on save.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::error::Result;
use super::xml;

pub(crate) const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub(crate) const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";

fn override_element<'a>(part_name: &'a str, content_type: &'a str) -> BytesStart<'a> {
    let mut element = BytesStart::new("Override");
    element.push_attribute(("PartName", part_name));
    element.push_attribute(("ContentType", content_type));
    element
}

/// Registers `part` (a package path without the leading slash) under
/// `content_type`. An existing override for the same part is left alone.
pub(crate) fn add_override(content: &str, part: &str, content_type: &str) -> Result<Vec<u8>> {
    let part_name = format!("/{part}");
    if has_override(content, &part_name)? {
        return Ok(content.as_bytes().to_vec());
    }

    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Vec::new());
    loop {
        match reader.read_event()? {
            Event::End(e) if e.local_name().as_ref() == b"Types" => {
                writer.write_event(Event::Empty(override_element(&part_name, content_type)))?;
                writer.write_event(Event::End(e))?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"Types" => {
                let start = e.into_owned();
                writer.write_event(Event::Start(start.clone()))?;
                writer.write_event(Event::Empty(override_element(&part_name, content_type)))?;
                writer.write_event(Event::End(start.to_end().into_owned()))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }
    Ok(writer.into_inner())
}

fn has_override(content: &str, part_name: &str) -> Result<bool> {
    let mut reader = Reader::from_str(content);
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"Override" =>
            {
                if xml::attr(e, "PartName")?.as_deref() == Some(part_name) {
                    return Ok(true);
                }
            }
            Event::Eof => return Ok(false),
            _ => {}
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#;

    #[test]
    fn appends_override_before_closing_tag() {
        let patched =
            String::from_utf8(add_override(TYPES, "xl/styles.xml", STYLES_CONTENT_TYPE).unwrap())
                .unwrap();
        assert!(patched.ends_with(
            r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#
        ));
        assert!(patched.starts_with(r#"<?xml version="1.0""#));
    }

    #[test]
    fn keeps_existing_override() {
        let patched = add_override(TYPES, "xl/workbook.xml", "text/plain").unwrap();
        assert_eq!(patched, TYPES.as_bytes());
    }
}
