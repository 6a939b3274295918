//! Package navigation: which parts of the template hold the sheet and styles.

use std::io::{Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::{CertprintError, Result};
use crate::export::zip_patcher::read_optional;
use crate::xml_helpers::attr_string;

/// Worksheet part used when the workbook does not name one.
pub(crate) const DEFAULT_SHEET_PATH: &str = "xl/worksheets/sheet1.xml";

/// Stylesheet part used when the workbook relationships do not name one.
pub(crate) const DEFAULT_STYLES_PATH: &str = "xl/styles.xml";

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";

/// One `<Relationship>` entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    /// Match on the last segment of the type URI (`worksheet`, `styles`, ...).
    fn is_kind(&self, kind: &str) -> bool {
        self.rel_type.rsplit('/').next() == Some(kind)
    }
}

/// Every relationship declared in a `.rels` part, in document order.
pub(crate) fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr_string(e, b"Id"), attr_string(e, b"Target")) {
                    relationships.push(Relationship {
                        id,
                        rel_type: attr_string(e, b"Type").unwrap_or_default(),
                        target,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CertprintError::malformed("relationships", e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(relationships)
}

/// Relationship id of the first `<sheet>` in the workbook.
fn first_sheet_rel_id(workbook_xml: &[u8]) -> Result<Option<String>> {
    let mut reader = Reader::from_reader(workbook_xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) if e.local_name().as_ref() == b"sheet" => {
                // r:id, under whatever prefix the workbook binds
                let id = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.local_name().as_ref() == b"id")
                    .and_then(|a| String::from_utf8(a.value.into_owned()).ok());
                return Ok(id);
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(CertprintError::malformed("workbook", e)),
            _ => {}
        }
        buf.clear();
    }
}

/// Resolve a relationship target against the directory of its source part.
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Paths of the first worksheet and of the stylesheet.
///
/// Packages with missing or unreadable workbook metadata fall back to the
/// conventional part names; only the parts themselves are required.
pub(crate) fn locate_parts<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<(String, String)> {
    let relationships = match read_optional(archive, WORKBOOK_RELS_PATH)? {
        Some(xml) => parse_relationships(&xml).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable {WORKBOOK_RELS_PATH}: {e}");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let sheet_id = match read_optional(archive, WORKBOOK_PATH)? {
        Some(xml) => first_sheet_rel_id(&xml).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable {WORKBOOK_PATH}: {e}");
            None
        }),
        None => None,
    };

    let sheet_path = sheet_id
        .and_then(|id| relationships.iter().find(|r| r.id == id && r.is_kind("worksheet")))
        .or_else(|| relationships.iter().find(|r| r.is_kind("worksheet")))
        .map_or_else(|| DEFAULT_SHEET_PATH.to_string(), |r| resolve_target("xl", &r.target));
    let styles_path = relationships
        .iter()
        .find(|r| r.is_kind("styles"))
        .map_or_else(|| DEFAULT_STYLES_PATH.to_string(), |r| resolve_target("xl", &r.target));

    Ok((sheet_path, styles_path))
}
