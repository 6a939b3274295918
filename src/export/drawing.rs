//! Background picture parts for the workbook target.
//!
//! The picture becomes a one-cell anchor at A1 in a new drawing part. Adding
//! it touches five parts: the media file, the drawing, the drawing's
//! relationships, the sheet's relationships and the content type list.

use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::{CertprintError, Result};
use crate::layout::Layout;
use crate::namespaces::{
    image_content_type, CONTENT_TYPES_PART, CT_DRAWING, NS_DRAWING, NS_DRAWING_SPREADSHEET,
    NS_PACKAGE_RELATIONSHIPS, NS_RELATIONSHIPS, REL_DRAWING, REL_IMAGE,
};
use crate::render::ImagePlacement;
use crate::template::relationships::parse_relationships;
use crate::units::mm_to_emu;
use crate::xml_helpers::{attr_string, xml_escape};

use super::zip_patcher::read_optional;

/// Encoded picture plus where the fitter put it on the page.
#[derive(Debug, Clone)]
pub(crate) struct BackgroundPicture {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
    pub placement: ImagePlacement,
}

/// Parts to write and the relationship id the worksheet must reference.
#[derive(Debug, Default)]
pub(crate) struct DrawingParts {
    pub rel_id: String,
    pub files: BTreeMap<String, Vec<u8>>,
}

/// Build every part needed to show `picture` behind the sheet at `sheet_path`.
pub(crate) fn background_parts<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_path: &str,
    layout: &Layout,
    picture: &BackgroundPicture,
) -> Result<DrawingParts> {
    let names: HashSet<String> = archive.file_names().map(String::from).collect();
    let media_path = next_free(&names, |n| format!("xl/media/image{n}.{}", picture.extension));
    let drawing_path = next_free(&names, |n| format!("xl/drawings/drawing{n}.xml"));
    let drawing_name = file_name(&drawing_path);
    let drawing_rels_path = format!("xl/drawings/_rels/{drawing_name}.rels");

    let (sheet_dir, sheet_file) = sheet_path.rsplit_once('/').unwrap_or(("", sheet_path));
    let sheet_rels_path = if sheet_dir.is_empty() {
        format!("_rels/{sheet_file}.rels")
    } else {
        format!("{sheet_dir}/_rels/{sheet_file}.rels")
    };

    let existing_rels = read_optional(archive, &sheet_rels_path)?;
    let rel_id = next_rel_id(existing_rels.as_deref())?;
    let drawing_target = relative_target(sheet_dir, &drawing_path);
    let sheet_rels = add_relationship(existing_rels, &rel_id, REL_DRAWING, &drawing_target)?;

    let content_types = read_optional(archive, CONTENT_TYPES_PART)?.ok_or_else(|| {
        CertprintError::TemplateMalformed(format!("{CONTENT_TYPES_PART} is missing"))
    })?;
    let content_types = add_content_types(&content_types, picture.extension, &drawing_path)?;

    let media_target = relative_target("xl/drawings", &media_path);
    let drawing_rels = add_relationship(None, "rId1", REL_IMAGE, &media_target)?;

    let mut files = BTreeMap::new();
    files.insert(media_path, picture.bytes.clone());
    files.insert(drawing_path, drawing_xml(layout, picture.placement, "rId1").into_bytes());
    files.insert(drawing_rels_path, drawing_rels);
    files.insert(sheet_rels_path, sheet_rels);
    files.insert(CONTENT_TYPES_PART.to_string(), content_types);

    Ok(DrawingParts { rel_id, files })
}

fn next_free(names: &HashSet<String>, candidate: impl Fn(u32) -> String) -> String {
    (1..)
        .map(&candidate)
        .find(|name| !names.contains(name))
        .unwrap_or_else(|| candidate(0))
}

fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

/// Relative path from a part directory to another part.
pub(crate) fn relative_target(from_dir: &str, to_path: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = to_path.split('/').filter(|s| !s.is_empty()).collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(to.iter().skip(common));
    parts.join("/")
}

fn next_rel_id(rels_xml: Option<&[u8]>) -> Result<String> {
    let used: HashSet<String> = match rels_xml {
        Some(xml) => parse_relationships(xml)?.into_iter().map(|r| r.id).collect(),
        None => HashSet::new(),
    };
    Ok((1..)
        .map(|n| format!("rId{n}"))
        .find(|id| !used.contains(id))
        .unwrap_or_else(|| "rId1".to_string()))
}

/// Append a relationship to an existing `.rels` part, or start a new one.
fn add_relationship(
    existing: Option<Vec<u8>>,
    id: &str,
    rel_type: &str,
    target: &str,
) -> Result<Vec<u8>> {
    let entry = format!(
        r#"<Relationship Id="{}" Type="{rel_type}" Target="{}"/>"#,
        xml_escape(id),
        xml_escape(target)
    );
    let Some(existing) = existing else {
        return Ok(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{NS_PACKAGE_RELATIONSHIPS}">{entry}</Relationships>"#
        )
        .into_bytes());
    };
    insert_before_close(existing, "</Relationships>", &entry, "sheet relationships")
}

fn insert_before_close(xml: Vec<u8>, close: &str, entry: &str, what: &str) -> Result<Vec<u8>> {
    let mut text = String::from_utf8(xml).map_err(|e| CertprintError::malformed(what, e))?;
    let Some(pos) = text.rfind(close) else {
        return Err(CertprintError::TemplateMalformed(format!(
            "{what}: no closing {close}"
        )));
    };
    text.insert_str(pos, entry);
    Ok(text.into_bytes())
}

/// Register the image extension and the drawing part.
fn add_content_types(xml: &[u8], extension: &str, drawing_path: &str) -> Result<Vec<u8>> {
    let mut has_default = false;
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) if e.local_name().as_ref() == b"Default" => {
                if attr_string(e, b"Extension").is_some_and(|ext| ext.eq_ignore_ascii_case(extension)) {
                    has_default = true;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(CertprintError::malformed(CONTENT_TYPES_PART, e)),
            _ => {}
        }
        buf.clear();
    }

    let mut entries = String::new();
    if !has_default {
        entries.push_str(&format!(
            r#"<Default Extension="{extension}" ContentType="{}"/>"#,
            image_content_type(extension)
        ));
    }
    entries.push_str(&format!(
        r#"<Override PartName="/{drawing_path}" ContentType="{CT_DRAWING}"/>"#
    ));
    insert_before_close(xml.to_vec(), "</Types>", &entries, CONTENT_TYPES_PART)
}

/// Drawing part holding a single picture anchored at A1.
///
/// Placement is in page millimeters; the sheet itself is laid out unscaled,
/// so the offset from the content origin and the size are divided by the
/// print scale. Offsets that would fall left of or above A1 are clamped.
fn drawing_xml(layout: &Layout, placement: ImagePlacement, image_rel: &str) -> String {
    let scale = if layout.scale > 0.0 { layout.scale } else { 1.0 };
    let col_off = mm_to_emu((placement.x - layout.margins.left) / scale);
    let row_off = mm_to_emu((placement.y - layout.margins.top) / scale);
    let cx = mm_to_emu(placement.width / scale);
    let cy = mm_to_emu(placement.height / scale);

    let mut xml = String::with_capacity(1024);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(&format!(
        r#"<xdr:wsDr xmlns:xdr="{NS_DRAWING_SPREADSHEET}" xmlns:a="{NS_DRAWING}">"#
    ));
    xml.push_str("<xdr:oneCellAnchor>");
    xml.push_str(&format!(
        "<xdr:from><xdr:col>0</xdr:col><xdr:colOff>{col_off}</xdr:colOff><xdr:row>0</xdr:row><xdr:rowOff>{row_off}</xdr:rowOff></xdr:from>"
    ));
    xml.push_str(&format!(r#"<xdr:ext cx="{cx}" cy="{cy}"/>"#));
    xml.push_str("<xdr:pic>");
    xml.push_str(r#"<xdr:nvPicPr><xdr:cNvPr id="2" name="Background"/><xdr:cNvPicPr><a:picLocks noChangeAspect="1"/></xdr:cNvPicPr></xdr:nvPicPr>"#);
    xml.push_str(&format!(
        r#"<xdr:blipFill><a:blip xmlns:r="{NS_RELATIONSHIPS}" r:embed="{image_rel}"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill>"#
    ));
    xml.push_str(&format!(
        r#"<xdr:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></xdr:spPr>"#
    ));
    xml.push_str("</xdr:pic>");
    xml.push_str(r#"<xdr:clientData fPrintsWithSheet="1"/>"#);
    xml.push_str("</xdr:oneCellAnchor>");
    xml.push_str("</xdr:wsDr>");
    xml
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::layout::Margins;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    const TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

    fn archive(entries: &[(&str, &str)]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        let data = writer.finish().unwrap().into_inner();
        ZipArchive::new(Cursor::new(data)).unwrap()
    }

    fn picture() -> BackgroundPicture {
        BackgroundPicture {
            bytes: vec![1, 2, 3],
            extension: "png",
            placement: ImagePlacement {
                x: 0.0,
                y: 0.0,
                width: 210.0,
                height: 297.0,
            },
        }
    }

    fn text(parts: &DrawingParts, name: &str) -> String {
        String::from_utf8(parts.files[name].clone()).unwrap()
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(relative_target("xl/worksheets", "xl/drawings/drawing1.xml"), "../drawings/drawing1.xml");
        assert_eq!(relative_target("xl/drawings", "xl/media/image1.png"), "../media/image1.png");
        assert_eq!(relative_target("xl", "xl/drawings/drawing1.xml"), "drawings/drawing1.xml");
    }

    #[test]
    fn test_new_parts_for_sheet_without_rels() {
        let mut zip = archive(&[
            ("[Content_Types].xml", TYPES),
            ("xl/worksheets/sheet1.xml", "<worksheet/>"),
            ("xl/media/image1.png", "taken"),
        ]);
        let parts = background_parts(&mut zip, "xl/worksheets/sheet1.xml", &Layout::default(), &picture()).unwrap();

        assert_eq!(parts.rel_id, "rId1");
        assert_eq!(parts.files["xl/media/image2.png"], vec![1, 2, 3]);
        assert!(text(&parts, "xl/worksheets/_rels/sheet1.xml.rels")
            .contains(r#"Target="../drawings/drawing1.xml""#));
        assert!(text(&parts, "xl/drawings/_rels/drawing1.xml.rels")
            .contains(r#"Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image2.png""#));

        let types = text(&parts, "[Content_Types].xml");
        assert!(types.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(types.contains(r#"<Override PartName="/xl/drawings/drawing1.xml""#));
        assert!(types.ends_with("</Types>"));
    }

    #[test]
    fn test_appends_to_existing_rels() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="x" Target="y"/><Relationship Id="rId2" Type="x" Target="z"/></Relationships>"#;
        let types = TYPES.replace("</Types>", r#"<Default Extension="PNG" ContentType="image/png"/></Types>"#);
        let mut zip = archive(&[
            ("[Content_Types].xml", types.as_str()),
            ("xl/worksheets/_rels/sheet1.xml.rels", rels),
        ]);
        let parts = background_parts(&mut zip, "xl/worksheets/sheet1.xml", &Layout::default(), &picture()).unwrap();

        assert_eq!(parts.rel_id, "rId3");
        let sheet_rels = text(&parts, "xl/worksheets/_rels/sheet1.xml.rels");
        assert!(sheet_rels.contains(r#"Target="z"/><Relationship Id="rId3""#));
        // extension already registered, case-insensitively
        assert_eq!(text(&parts, "[Content_Types].xml").matches("Extension=\"").count(), 2);
    }

    #[test]
    fn test_missing_content_types() {
        let mut zip = archive(&[("xl/worksheets/sheet1.xml", "<worksheet/>")]);
        let err = background_parts(&mut zip, "xl/worksheets/sheet1.xml", &Layout::default(), &picture()).unwrap_err();
        assert!(err.is_template_error());
    }

    #[test]
    fn test_drawing_extent_undoes_print_scale() {
        let layout = Layout {
            scale: 0.5,
            margins: Margins {
                left: 10.0,
                right: 10.0,
                top: 20.0,
                bottom: 10.0,
            },
            ..Layout::default()
        };
        let placement = ImagePlacement {
            x: 15.0,
            y: 10.0,
            width: 100.0,
            height: 50.0,
        };
        let xml = drawing_xml(&layout, placement, "rId1");
        assert!(xml.contains("<xdr:colOff>360000</xdr:colOff>"));
        // above the content origin, clamped
        assert!(xml.contains("<xdr:rowOff>0</xdr:rowOff>"));
        assert!(xml.contains(r#"<xdr:ext cx="7200000" cy="3600000"/>"#));
        assert!(xml.contains(r#"r:embed="rId1""#));
    }
}
