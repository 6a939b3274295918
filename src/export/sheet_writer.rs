//! Streams a worksheet through quick-xml, writing cell values into it.
//!
//! Values are written as inline strings (`t="inlineStr"`) so the shared string
//! table never has to be rebuilt. Everything not being edited passes through
//! unchanged, including formatting the parser does not understand.

use std::collections::BTreeMap;
use std::io::Write;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::cell_ref::{parse_cell_ref_bytes, CellRef};
use crate::error::{CertprintError, Result};
use crate::namespaces::NS_RELATIONSHIPS;
use crate::xml_helpers::{attr_u32, has_attr, xml_escape};

/// New content for one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CellWrite {
    pub text: String,
    /// Style index replacing the cell's own; `None` keeps what the template has.
    pub style: Option<u32>,
}

/// Children of `<worksheet>` that a `<drawing>` must precede.
const AFTER_DRAWING: &[&[u8]] = &[
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

type RowEdits = BTreeMap<u32, CellWrite>;

struct Patcher<'a> {
    writer: Writer<Vec<u8>>,
    pending: BTreeMap<u32, RowEdits>,
    row_edits: RowEdits,
    current_row: u32,
    current_col: u32,
    drawing_rid: Option<&'a str>,
}

/// Write `cells` into `sheet_xml`. With `drawing_rid`, a `<drawing>` element
/// referencing that relationship is added as well.
pub(crate) fn patch_sheet(
    sheet_xml: &[u8],
    cells: &BTreeMap<CellRef, CellWrite>,
    drawing_rid: Option<&str>,
) -> Result<Vec<u8>> {
    let mut pending: BTreeMap<u32, RowEdits> = BTreeMap::new();
    for (cell, write) in cells {
        pending
            .entry(cell.row)
            .or_default()
            .insert(cell.col, write.clone());
    }

    let mut patcher = Patcher {
        writer: Writer::new(Vec::with_capacity(sheet_xml.len() + 4096)),
        pending,
        row_edits: RowEdits::new(),
        current_row: 0,
        current_col: 0,
        drawing_rid,
    };

    let mut reader = Reader::from_reader(sheet_xml);
    let mut buf = Vec::new();
    let mut in_sheet_data = false;
    let mut in_row = false;
    // Depth inside a replaced `<c>` whose original content is dropped
    let mut skip_depth: usize = 0;
    // Open elements, `<worksheet>` included
    let mut depth: usize = 0;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| CertprintError::malformed("worksheet XML", e))?;
        let parent_depth = depth;
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }

        match event {
            Event::Eof => break,
            Event::Start(_) if skip_depth > 0 => skip_depth += 1,
            Event::End(_) if skip_depth > 0 => skip_depth -= 1,
            _ if skip_depth > 0 => {}
            Event::Start(ref e) if e.local_name().as_ref() == b"worksheet" => {
                patcher.write_root(e)?;
            }
            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                in_sheet_data = true;
                patcher.write(Event::Start(e.borrow()))?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                patcher.write_raw(b"<sheetData>")?;
                patcher.flush_rows_before(u32::MAX)?;
                patcher.write_raw(b"</sheetData>")?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                in_sheet_data = false;
                patcher.flush_rows_before(u32::MAX)?;
                patcher.write(Event::End(e.borrow()))?;
            }
            Event::Start(ref e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                in_row = true;
                patcher.begin_row(e)?;
                patcher.write(Event::Start(e.borrow()))?;
            }
            Event::Empty(ref e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                patcher.begin_row(e)?;
                if patcher.row_edits.is_empty() {
                    patcher.write(Event::Empty(e.borrow()))?;
                } else {
                    patcher.write(Event::Start(e.borrow()))?;
                    patcher.flush_cells_before(u32::MAX)?;
                    patcher.write_raw(b"</row>")?;
                }
            }
            Event::End(ref e) if in_row && e.local_name().as_ref() == b"row" => {
                in_row = false;
                patcher.flush_cells_before(u32::MAX)?;
                patcher.write(Event::End(e.borrow()))?;
            }
            Event::Start(ref e) if in_row && e.local_name().as_ref() == b"c" => {
                if patcher.visit_cell(e)? {
                    skip_depth = 1;
                } else {
                    patcher.write(Event::Start(e.borrow()))?;
                }
            }
            Event::Empty(ref e) if in_row && e.local_name().as_ref() == b"c" => {
                if !patcher.visit_cell(e)? {
                    patcher.write(Event::Empty(e.borrow()))?;
                }
            }
            ref event @ (Event::Start(ref e) | Event::Empty(ref e))
                if parent_depth == 1 && AFTER_DRAWING.contains(&e.local_name().as_ref()) =>
            {
                patcher.write_drawing()?;
                patcher.write(event.borrow())?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"worksheet" => {
                patcher.write_drawing()?;
                patcher.write(Event::End(e.borrow()))?;
            }
            other => patcher.write(other)?,
        }
        buf.clear();
    }

    if !patcher.pending.is_empty() {
        return Err(CertprintError::TemplateMalformed(
            "worksheet has no <sheetData> to write into".to_string(),
        ));
    }

    Ok(patcher.writer.into_inner())
}

impl Patcher<'_> {
    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| CertprintError::write_failed("writing worksheet XML", e))
    }

    fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .get_mut()
            .write_all(bytes)
            .map_err(|e| CertprintError::write_failed("writing worksheet XML", e))
    }

    /// Root element, with the relationships namespace declared when a drawing
    /// reference will need it.
    fn write_root(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if self.drawing_rid.is_some() && !has_attr(e, b"xmlns:r") {
            let mut root = e.clone();
            root.push_attribute(("xmlns:r", NS_RELATIONSHIPS));
            return self.write(Event::Start(root));
        }
        self.write(Event::Start(e.borrow()))
    }

    fn write_drawing(&mut self) -> Result<()> {
        if let Some(rid) = self.drawing_rid.take() {
            let element = format!("<drawing r:id=\"{}\"/>", xml_escape(rid));
            self.write_raw(element.as_bytes())?;
        }
        Ok(())
    }

    /// Handle a `<row>` start: emit any brand-new rows that sort before it and
    /// pick up the edits for this one.
    fn begin_row(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let row = attr_u32(e, b"r").unwrap_or(self.current_row.saturating_add(1));
        self.flush_rows_before(row)?;
        self.current_row = row;
        self.current_col = 0;
        self.row_edits = self.pending.remove(&row).unwrap_or_default();
        Ok(())
    }

    /// Returns `true` when the cell was replaced and its original body must
    /// be skipped.
    fn visit_cell(&mut self, e: &BytesStart<'_>) -> Result<bool> {
        let col = e
            .attributes()
            .flatten()
            .find(|a| a.key.as_ref() == b"r")
            .and_then(|a| parse_cell_ref_bytes(&a.value))
            .map_or(self.current_col.saturating_add(1), |cell| cell.col);
        self.current_col = col;

        self.flush_cells_before(col)?;
        let Some(write) = self.row_edits.remove(&col) else {
            return Ok(false);
        };
        let style = write.style.or_else(|| attr_u32(e, b"s"));
        self.write_cell(self.current_row, col, &write.text, style)?;
        Ok(true)
    }

    fn flush_cells_before(&mut self, col: u32) -> Result<()> {
        let later = self.row_edits.split_off(&col);
        let earlier = std::mem::replace(&mut self.row_edits, later);
        for (c, write) in earlier {
            self.write_cell(self.current_row, c, &write.text, write.style)?;
        }
        Ok(())
    }

    fn flush_rows_before(&mut self, row: u32) -> Result<()> {
        let later = self.pending.split_off(&row);
        let earlier = std::mem::replace(&mut self.pending, later);
        for (r, cells) in earlier {
            self.write_raw(format!("<row r=\"{r}\">").as_bytes())?;
            for (c, write) in cells {
                self.write_cell(r, c, &write.text, write.style)?;
            }
            self.write_raw(b"</row>")?;
        }
        Ok(())
    }

    fn write_cell(&mut self, row: u32, col: u32, text: &str, style: Option<u32>) -> Result<()> {
        let Some(cell) = CellRef::new(col, row) else {
            return Ok(());
        };
        let style_attr = style.map(|s| format!(" s=\"{s}\"")).unwrap_or_default();
        let xml = format!(
            "<c r=\"{cell}\"{style_attr} t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
            xml_escape(text)
        );
        self.write_raw(xml.as_bytes())
    }
}

/// Whether the worksheet already references a drawing part.
pub(crate) fn sheet_has_drawing(sheet_xml: &[u8]) -> bool {
    let mut reader = Reader::from_reader(sheet_xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) if e.local_name().as_ref() == b"drawing" => {
                return true;
            }
            Ok(Event::Eof) | Err(_) => return false,
            _ => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn edits(entries: &[(&str, &str, Option<u32>)]) -> BTreeMap<CellRef, CellWrite> {
        entries
            .iter()
            .map(|(r, text, style)| {
                (
                    CellRef::parse(r).unwrap(),
                    CellWrite {
                        text: (*text).to_string(),
                        style: *style,
                    },
                )
            })
            .collect()
    }

    fn patch(xml: &str, entries: &[(&str, &str, Option<u32>)], rid: Option<&str>) -> String {
        String::from_utf8(patch_sheet(xml.as_bytes(), &edits(entries), rid).unwrap()).unwrap()
    }

    const SHEET: &str = r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="2"><c r="B2" s="3"><v>old</v></c><c r="D2" s="1"/></row><row r="5" ht="20"/></sheetData><pageMargins left="0.5" right="0.5" top="0.5" bottom="0.5" header="0" footer="0"/></worksheet>"#;

    #[test]
    fn test_replace_existing_cell_keeps_style() {
        let out = patch(SHEET, &[("B2", "нова", None)], None);
        assert!(out.contains(
            r#"<c r="B2" s="3" t="inlineStr"><is><t xml:space="preserve">нова</t></is></c>"#
        ));
        assert!(!out.contains("<v>old</v>"));
        assert!(out.contains(r#"<c r="D2" s="1"/>"#));
    }

    #[test]
    fn test_insert_cells_and_rows_in_order() {
        let out = patch(
            SHEET,
            &[("A1", "first", None), ("C2", "mid", None), ("E2", "end", Some(9)), ("A5", "x", None), ("A9", "last", None)],
            None,
        );
        let a1 = out.find(r#"<row r="1"><c r="A1""#).unwrap();
        let b2 = out.find(r#"<c r="B2""#).unwrap();
        let c2 = out.find(r#"<c r="C2""#).unwrap();
        let d2 = out.find(r#"<c r="D2""#).unwrap();
        let e2 = out.find(r#"<c r="E2" s="9""#).unwrap();
        let row5 = out.find(r#"<row r="5" ht="20"><c r="A5""#).unwrap();
        let row9 = out.find(r#"<row r="9"><c r="A9""#).unwrap();
        assert!(a1 < b2 && b2 < c2 && c2 < d2 && d2 < e2 && e2 < row5 && row5 < row9);
        assert!(row9 < out.find("</sheetData>").unwrap());
    }

    #[test]
    fn test_escapes_text() {
        let out = patch(SHEET, &[("B2", "a < b & \"c\"", None)], None);
        assert!(out.contains("a &lt; b &amp; &quot;c&quot;"));
    }

    #[test]
    fn test_empty_sheet_data() {
        let xml = r#"<worksheet><sheetData/></worksheet>"#;
        let out = patch(xml, &[("C3", "v", None)], None);
        assert!(out.contains(r#"<sheetData><row r="3"><c r="C3" t="inlineStr">"#));
    }

    #[test]
    fn test_drawing_inserted_before_trailing_parts() {
        let xml = r#"<worksheet><sheetData/><pageMargins left="0" right="0" top="0" bottom="0" header="0" footer="0"/><tableParts count="0"/></worksheet>"#;
        let out = patch(xml, &[], Some("rId7"));
        let drawing = out.find(r#"<drawing r:id="rId7"/>"#).unwrap();
        assert!(drawing < out.find("<tableParts").unwrap());
        assert!(drawing > out.find("<pageMargins").unwrap());
        assert!(out.contains("xmlns:r="));
        assert!(!sheet_has_drawing(SHEET.as_bytes()));
        assert!(sheet_has_drawing(out.as_bytes()));
    }

    #[test]
    fn test_drawing_ignores_nested_ext_lists() {
        let xml = r#"<worksheet><sheetData/><conditionalFormatting sqref="A1:A5"><cfRule type="dataBar" priority="1"><dataBar><cfvo type="min"/><cfvo type="max"/><color rgb="FF638EC6"/></dataBar><extLst><ext uri="{B025F937-C7B1-47D3-B67F-A62EFF666E3E}"/></extLst></cfRule></conditionalFormatting><pageMargins left="0" right="0" top="0" bottom="0" header="0" footer="0"/><extLst><ext uri="{78C0D931-6437-407d-A8EE-F0AAD7539E65}"/></extLst></worksheet>"#;
        let out = patch(xml, &[], Some("rId2"));
        let drawing = out.find(r#"<drawing r:id="rId2"/>"#).unwrap();
        assert!(drawing > out.find("</conditionalFormatting>").unwrap());
        assert!(drawing > out.find("<pageMargins").unwrap());
        assert!(drawing < out.rfind("<extLst>").unwrap());
        assert_eq!(out.matches("<drawing ").count(), 1);
    }

    #[test]
    fn test_drawing_at_end_without_trailing_parts() {
        let out = patch(SHEET, &[], Some("rId1"));
        assert!(out.ends_with(r#"<drawing r:id="rId1"/></worksheet>"#));
    }

    #[test]
    fn test_missing_sheet_data_is_error() {
        let err = patch_sheet(b"<worksheet/>", &edits(&[("A1", "x", None)]), None).unwrap_err();
        assert!(err.is_template_error());
    }
}
