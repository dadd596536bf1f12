//! Small helpers shared by the part readers and patchers.

use std::borrow::Cow;

use quick_xml::events::{BytesRef, BytesStart, BytesText};

use super::error::Result;

/// Looks up an attribute by its qualified name and returns the unescaped value.
pub(crate) fn attr(start: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Looks up an attribute by local name, ignoring any namespace prefix.
pub(crate) fn attr_local(start: &BytesStart<'_>, local: &str) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Copies `start`, replacing (or adding) the given attributes.
pub(crate) fn with_attributes(
    start: &BytesStart<'_>,
    replacements: &[(&str, &str)],
) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);

    for attr in start.attributes() {
        let attr = attr?;
        if replacements
            .iter()
            .any(|(key, _)| attr.key.as_ref() == key.as_bytes())
        {
            continue;
        }
        out.push_attribute(attr);
    }
    for (key, value) in replacements {
        out.push_attribute((*key, *value));
    }

    Ok(out.into_owned())
}

/// Decodes a text node.
pub(crate) fn text(t: &BytesText<'_>) -> Result<String> {
    let decoded = t.decode().map_err(quick_xml::Error::from)?;
    Ok(decoded.into_owned())
}

/// Resolves a character or predefined entity reference such as `&amp;`.
pub(crate) fn entity(r: &BytesRef<'_>) -> Result<String> {
    if let Some(ch) = r.resolve_char_ref()? {
        return Ok(ch.to_string());
    }
    let name: Cow<'_, str> = r.decode().map_err(quick_xml::Error::from)?;
    Ok(quick_xml::escape::resolve_predefined_entity(&name)
        .map(str::to_string)
        .unwrap_or_else(|| format!("&{name};")))
}

/// Joins a relationship target onto the directory of its source part.
///
/// Absolute targets (`/xl/...`) are taken from the package root.
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Directory part of a package path (`xl/worksheets/sheet1.xml` → `xl/worksheets`).
pub(crate) fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Relationships part that belongs to a package part.
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_targets() {
        assert_eq!(
            resolve_target("xl", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets", "../drawings/drawing1.xml"),
            "xl/drawings/drawing1.xml"
        );
        assert_eq!(
            resolve_target("xl", "/xl/worksheets/sheet2.xml"),
            "xl/worksheets/sheet2.xml"
        );
    }

    #[test]
    fn rels_paths() {
        assert_eq!(
            rels_path_for("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
        assert_eq!(rels_path_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(part_dir("xl/workbook.xml"), "xl");
    }

    #[test]
    fn replaces_attributes_in_place() {
        let start = BytesStart::from_content(r#"c r="A1" s="3" t="s""#, 1);
        let patched = with_attributes(&start, &[("s", "7")]).unwrap();
        assert_eq!(attr(&patched, "s").unwrap().as_deref(), Some("7"));
        assert_eq!(attr(&patched, "r").unwrap().as_deref(), Some("A1"));
        assert_eq!(attr(&patched, "t").unwrap().as_deref(), Some("s"));
    }
}
