//! Shared strings table (`xl/sharedStrings.xml`).

use quick_xml::events::Event;
use quick_xml::Reader;

use super::error::Result;
use super::xml;

/// Parses the shared strings part into a list indexed by string id.
///
/// Rich text runs are concatenated; phonetic runs (`<rPh>`) are skipped.
pub(crate) fn parse(content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(content);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" => in_text = phonetic_depth == 0,
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(ref t) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&xml::text(t)?);
                }
            }
            Event::CData(ref t) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&String::from_utf8_lossy(t));
                }
            }
            Event::GeneralRef(ref r) if in_text => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&xml::entity(r)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}
