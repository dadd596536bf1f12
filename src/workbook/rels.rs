//! Package relationship parts (`*.rels`).

use std::collections::HashSet;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::error::Result;
use super::xml;

pub(crate) const RELATIONSHIPS_NS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
pub(crate) const OFFICE_REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub(crate) const HYPERLINK_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
pub(crate) const STYLES_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

/// One `<Relationship>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Returns true when the relationship type ends with the given kind
    /// (`worksheet`, `sharedStrings`, `styles`, `hyperlink`).
    pub fn is_kind(&self, kind: &str) -> bool {
        self.rel_type.rsplit('/').next() == Some(kind)
    }
}

/// Parses a relationships part.
pub(crate) fn parse(content: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut relationships = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"Relationship" => {
                relationships.push(Relationship {
                    id: xml::attr(e, "Id")?.unwrap_or_default(),
                    rel_type: xml::attr(e, "Type")?.unwrap_or_default(),
                    target: xml::attr(e, "Target")?.unwrap_or_default(),
                    external: xml::attr(e, "TargetMode")?.as_deref() == Some("External"),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(relationships)
}

/// Hands out relationship ids that do not collide with existing ones.
#[derive(Debug, Default)]
pub(crate) struct RelIdAllocator {
    used: HashSet<String>,
    next: usize,
}

impl RelIdAllocator {
    pub fn new(existing: &[Relationship]) -> Self {
        Self {
            used: existing.iter().map(|r| r.id.clone()).collect(),
            next: 1,
        }
    }

    pub fn allocate(&mut self) -> String {
        loop {
            let candidate = format!("rId{}", self.next);
            self.next += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

fn relationship_element(rel: &Relationship) -> BytesStart<'static> {
    let mut element = BytesStart::new("Relationship");
    element.push_attribute(("Id", rel.id.as_str()));
    element.push_attribute(("Type", rel.rel_type.as_str()));
    element.push_attribute(("Target", rel.target.as_str()));
    if rel.external {
        element.push_attribute(("TargetMode", "External"));
    }
    element
}

/// Appends relationships to an existing part, or builds a new part when
/// `existing` is `None`.
pub(crate) fn append(existing: Option<&str>, added: &[Relationship]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());

    match existing {
        Some(content) => {
            let mut reader = Reader::from_str(content);
            loop {
                match reader.read_event()? {
                    Event::End(e) if e.local_name().as_ref() == b"Relationships" => {
                        for rel in added {
                            writer.write_event(Event::Empty(relationship_element(rel)))?;
                        }
                        writer.write_event(Event::End(e))?;
                    }
                    Event::Empty(e) if e.local_name().as_ref() == b"Relationships" => {
                        let start = e.into_owned();
                        writer.write_event(Event::Start(start.clone()))?;
                        for rel in added {
                            writer.write_event(Event::Empty(relationship_element(rel)))?;
                        }
                        writer.write_event(Event::End(start.to_end().into_owned()))?;
                    }
                    Event::Eof => break,
                    event => writer.write_event(event)?,
                }
            }
        }
        None => {
            writer.write_event(Event::Decl(BytesDecl::new(
                "1.0",
                Some("UTF-8"),
                Some("yes"),
            )))?;
            let mut root = BytesStart::new("Relationships");
            root.push_attribute(("xmlns", RELATIONSHIPS_NS));
            writer.write_event(Event::Start(root))?;
            for rel in added {
                writer.write_event(Event::Empty(relationship_element(rel)))?;
            }
            writer.write_event(Event::End(BytesEnd::new("Relationships")))?;
        }
    }

    Ok(writer.into_inner())
}
