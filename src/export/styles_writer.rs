//! Adds bold variants of existing cell formats to a stylesheet.
//!
//! A cell that must be emphasized keeps every other property of its template
//! format. For each such format the writer appends a copy of its font with
//! `<b/>` set and a copy of the `<xf>` pointing at that font, then reports
//! which new index replaces which old one.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{CertprintError, Result};
use crate::xml_helpers::{attr_string, attr_u32};

/// An element captured with its full content.
#[derive(Debug, Clone)]
struct Captured {
    start: BytesStart<'static>,
    children: Vec<Event<'static>>,
}

impl Captured {
    fn is_bold_font(&self) -> bool {
        self.children.iter().any(|event| match event {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"b" => {
                !matches!(attr_string(e, b"val").as_deref(), Some("0" | "false"))
            }
            _ => false,
        })
    }
}

#[derive(Debug, Default)]
struct Collected {
    fonts: Vec<Captured>,
    cell_xfs: Vec<Captured>,
    has_fonts: bool,
    has_cell_xfs: bool,
}

/// Result of [`add_bold_styles`].
#[derive(Debug, Clone, Default)]
pub(crate) struct BoldStyles {
    pub xml: Vec<u8>,
    /// Old cell format index -> bold cell format index.
    pub mapping: HashMap<u32, u32>,
}

/// Append bold variants of the cell formats in `bases`.
///
/// Formats whose font is already bold map to themselves. A stylesheet
/// without `<fonts>` or `<cellXfs>` children is returned unchanged with an
/// empty mapping.
pub(crate) fn add_bold_styles(styles_xml: &[u8], bases: &BTreeSet<u32>) -> Result<BoldStyles> {
    if bases.is_empty() {
        return Ok(BoldStyles {
            xml: styles_xml.to_vec(),
            mapping: HashMap::new(),
        });
    }

    let collected = collect(styles_xml)?;
    if !collected.has_fonts || !collected.has_cell_xfs || collected.cell_xfs.is_empty() {
        log::warn!("stylesheet has no font or cell format table; bold formatting skipped");
        return Ok(BoldStyles {
            xml: styles_xml.to_vec(),
            mapping: HashMap::new(),
        });
    }

    let mut mapping = HashMap::new();
    // font id -> index of its bold copy
    let mut bold_fonts: BTreeMap<u32, u32> = BTreeMap::new();
    let mut new_fonts = Vec::new();
    let mut new_xfs = Vec::new();

    for &base in bases {
        let Some(xf) = collected.cell_xfs.get(base as usize) else {
            log::warn!("cell format {base} does not exist; bold formatting skipped");
            continue;
        };
        let font_id = attr_u32(&xf.start, b"fontId").unwrap_or(0);
        let Some(font) = collected.fonts.get(font_id as usize) else {
            log::warn!("font {font_id} does not exist; bold formatting skipped");
            continue;
        };
        if font.is_bold_font() {
            mapping.insert(base, base);
            continue;
        }

        let bold_id = match bold_fonts.get(&font_id) {
            Some(&id) => id,
            None => {
                let id = index_u32(collected.fonts.len() + new_fonts.len());
                new_fonts.push(bold_copy(font));
                bold_fonts.insert(font_id, id);
                id
            }
        };

        let new_index = index_u32(collected.cell_xfs.len() + new_xfs.len());
        new_xfs.push(Captured {
            start: with_attrs(
                &xf.start,
                &[("fontId", &bold_id.to_string()), ("applyFont", "1")],
            ),
            children: xf.children.clone(),
        });
        mapping.insert(base, new_index);
    }

    if new_xfs.is_empty() {
        return Ok(BoldStyles {
            xml: styles_xml.to_vec(),
            mapping,
        });
    }

    let font_count = collected.fonts.len() + new_fonts.len();
    let xf_count = collected.cell_xfs.len() + new_xfs.len();
    let xml = rewrite(styles_xml, &new_fonts, font_count, &new_xfs, xf_count)?;
    log::debug!(
        "added {} bold font(s) and {} cell format(s)",
        new_fonts.len(),
        new_xfs.len()
    );
    Ok(BoldStyles { xml, mapping })
}

fn collect(styles_xml: &[u8]) -> Result<Collected> {
    let mut collected = Collected::default();
    let mut reader = Reader::from_reader(styles_xml);
    let mut buf = Vec::new();

    let mut in_fonts = false;
    let mut in_cell_xfs = false;
    let mut current: Option<Captured> = None;
    let mut depth = 0usize;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| CertprintError::malformed("styles XML", e))?
            .into_owned();
        buf.clear();

        if let Some(mut captured) = current.take() {
            match event {
                Event::End(_) if depth == 0 => {
                    push_captured(&mut collected, in_fonts, captured);
                }
                Event::Eof => break,
                other => {
                    match other {
                        Event::Start(_) => depth += 1,
                        Event::End(_) => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    captured.children.push(other);
                    current = Some(captured);
                }
            }
            continue;
        }

        match event {
            Event::Start(ref e) if e.local_name().as_ref() == b"fonts" => {
                collected.has_fonts = true;
                in_fonts = true;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"fonts" => in_fonts = false,
            Event::Start(ref e) if e.local_name().as_ref() == b"cellXfs" => {
                collected.has_cell_xfs = true;
                in_cell_xfs = true;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Start(e) if is_entry(&e, in_fonts, in_cell_xfs) => {
                depth = 0;
                current = Some(Captured {
                    start: e,
                    children: Vec::new(),
                });
            }
            Event::Empty(e) if is_entry(&e, in_fonts, in_cell_xfs) => {
                push_captured(
                    &mut collected,
                    in_fonts,
                    Captured {
                        start: e,
                        children: Vec::new(),
                    },
                );
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(collected)
}

fn is_entry(e: &BytesStart<'_>, in_fonts: bool, in_cell_xfs: bool) -> bool {
    let name = e.local_name();
    (in_fonts && name.as_ref() == b"font") || (in_cell_xfs && name.as_ref() == b"xf")
}

fn push_captured(collected: &mut Collected, in_fonts: bool, captured: Captured) {
    if in_fonts {
        collected.fonts.push(captured);
    } else {
        collected.cell_xfs.push(captured);
    }
}

fn bold_copy(font: &Captured) -> Captured {
    let mut children = vec![Event::Empty(BytesStart::new("b"))];
    let mut skip = 0usize;
    for event in &font.children {
        match event {
            Event::Empty(e) if skip == 0 && e.local_name().as_ref() == b"b" => {}
            Event::Start(e) if skip == 0 && e.local_name().as_ref() == b"b" => skip = 1,
            Event::Start(_) if skip > 0 => skip += 1,
            Event::End(_) if skip > 0 => skip -= 1,
            _ if skip > 0 => {}
            other => children.push(other.clone()),
        }
    }
    Captured {
        start: font.start.clone(),
        children,
    }
}

/// Copy of `e` with the given attributes set, replacing existing values.
fn with_attrs(e: &BytesStart<'_>, overrides: &[(&str, &str)]) -> BytesStart<'static> {
    let kept: Vec<(Vec<u8>, Vec<u8>)> = e
        .attributes()
        .flatten()
        .filter(|a| !overrides.iter().any(|(key, _)| a.key.as_ref() == key.as_bytes()))
        .map(|a| (a.key.as_ref().to_vec(), a.value.to_vec()))
        .collect();

    let mut copy = e.clone().into_owned();
    copy.clear_attributes();
    for (key, value) in &kept {
        copy.push_attribute((key.as_slice(), value.as_slice()));
    }
    for (key, value) in overrides {
        copy.push_attribute((*key, *value));
    }
    copy
}

fn rewrite(
    styles_xml: &[u8],
    new_fonts: &[Captured],
    font_count: usize,
    new_xfs: &[Captured],
    xf_count: usize,
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(styles_xml);
    let mut writer = Writer::new(Vec::with_capacity(styles_xml.len() + 1024));
    let mut buf = Vec::new();
    let fail = |e: quick_xml::Error| CertprintError::write_failed("writing styles XML", e);

    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|e| CertprintError::malformed("styles XML", e))?
        {
            Event::Eof => break,
            Event::Start(ref e) if e.local_name().as_ref() == b"fonts" => {
                let start = with_attrs(e, &[("count", &font_count.to_string())]);
                writer.write_event(Event::Start(start)).map_err(fail)?;
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"cellXfs" => {
                let start = with_attrs(e, &[("count", &xf_count.to_string())]);
                writer.write_event(Event::Start(start)).map_err(fail)?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"fonts" => {
                write_all_captured(&mut writer, new_fonts).map_err(fail)?;
                writer.write_event(Event::End(e.borrow())).map_err(fail)?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"cellXfs" => {
                write_all_captured(&mut writer, new_xfs).map_err(fail)?;
                writer.write_event(Event::End(e.borrow())).map_err(fail)?;
            }
            other => writer.write_event(other).map_err(fail)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner())
}

fn write_all_captured(
    writer: &mut Writer<Vec<u8>>,
    entries: &[Captured],
) -> std::result::Result<(), quick_xml::Error> {
    for entry in entries {
        if entry.children.is_empty() {
            writer.write_event(Event::Empty(entry.start.borrow()))?;
            continue;
        }
        writer.write_event(Event::Start(entry.start.borrow()))?;
        for child in &entry.children {
            writer.write_event(child.borrow())?;
        }
        let name = String::from_utf8_lossy(entry.start.name().as_ref()).into_owned();
        writer.write_event(Event::End(BytesEnd::new(name)))?;
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn index_u32(index: usize) -> u32 {
    index.min(u32::MAX as usize) as u32
}
