//! Worksheet geometry parsing: only the parts of the sheet XML that affect
//! where text lands on the page.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::cell_ref::{parse_cell_ref_bytes, parse_range, CellRef, RangeBounds};
use crate::error::{CertprintError, Result};
use crate::xml_helpers::{attr_f64, attr_string, attr_u32};

/// Last column a worksheet can address (XFD).
const MAX_COLUMN_INDEX: u32 = 16_384;

/// Last row a worksheet can address.
const MAX_ROW_INDEX: u32 = 1_048_576;

/// A `<col>` declaration: inclusive 1-based range with a width in characters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ColSpec {
    pub min: u32,
    pub max: u32,
    pub width: f64,
}

/// A populated cell and its style index into `cellXfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StyledCell {
    pub cell: CellRef,
    pub style_idx: Option<u32>,
}

/// Page margins in inches as declared by `<pageMargins>`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct RawMargins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Raw geometry read from a worksheet, still in spreadsheet units.
#[derive(Debug, Default)]
pub(crate) struct SheetGeometry {
    pub default_col_width: Option<f64>,
    pub default_row_height: Option<f64>,
    pub cols: Vec<ColSpec>,
    /// `(row, height_pt)` for rows declaring a positive `ht`.
    pub row_heights: Vec<(u32, f64)>,
    pub max_row_seen: u32,
    pub max_col_seen: u32,
    pub cells: Vec<StyledCell>,
    pub dimension: Option<RangeBounds>,
    pub margins: Option<RawMargins>,
    pub print_scale: Option<f64>,
}

/// Parse worksheet XML into [`SheetGeometry`].
///
/// Any markup error, an unbalanced document or a missing `<worksheet>` root is
/// reported as [`CertprintError::TemplateMalformed`].
#[allow(clippy::too_many_lines)]
pub(crate) fn parse_sheet_geometry(data: &[u8]) -> Result<SheetGeometry> {
    let mut xml = Reader::from_reader(data);
    xml.trim_text(true);

    let mut geometry = SheetGeometry::default();
    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut saw_root = false;
    let mut in_sheet_data = false;
    let mut current_row: u32 = 0;
    let mut current_col: u32 = 0;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_start = matches!(event, Event::Start(_));
                if is_start {
                    depth += 1;
                }
                match e.local_name().as_ref() {
                    b"worksheet" => saw_root = true,
                    b"dimension" => {
                        geometry.dimension = attr_string(e, b"ref").and_then(|r| parse_range(&r));
                        if let Some(d) = geometry.dimension {
                            check_sheet_limits("dimension", d.max_col, d.max_row)?;
                        }
                    }
                    b"sheetFormatPr" => {
                        geometry.default_col_width = attr_f64(e, b"defaultColWidth");
                        geometry.default_row_height = attr_f64(e, b"defaultRowHeight");
                    }
                    b"col" => {
                        let min = attr_u32(e, b"min").unwrap_or(0);
                        let max = attr_u32(e, b"max").unwrap_or(min);
                        if min >= 1 && max >= min {
                            geometry.cols.push(ColSpec {
                                min,
                                max: max.min(MAX_COLUMN_INDEX),
                                width: attr_f64(e, b"width").unwrap_or(0.0),
                            });
                        }
                    }
                    b"sheetData" => in_sheet_data = is_start,
                    b"row" if in_sheet_data => {
                        // `r` is optional; rows without it follow the previous one
                        current_row = attr_u32(e, b"r").unwrap_or(current_row.saturating_add(1));
                        current_col = 0;
                        check_sheet_limits("row", 1, current_row)?;
                        geometry.max_row_seen = geometry.max_row_seen.max(current_row);
                        if let Some(ht) = attr_f64(e, b"ht") {
                            if ht > 0.0 {
                                geometry.row_heights.push((current_row, ht));
                            }
                        }
                    }
                    b"c" if in_sheet_data => {
                        let cell = e
                            .attributes()
                            .flatten()
                            .find(|a| a.key.as_ref() == b"r")
                            .and_then(|a| parse_cell_ref_bytes(&a.value))
                            .or_else(|| CellRef::new(current_col.saturating_add(1), current_row.max(1)));
                        if let Some(cell) = cell {
                            check_sheet_limits("cell", cell.col, cell.row)?;
                            current_col = cell.col;
                            geometry.max_col_seen = geometry.max_col_seen.max(cell.col);
                            geometry.cells.push(StyledCell {
                                cell,
                                style_idx: attr_u32(e, b"s"),
                            });
                        }
                    }
                    b"pageMargins" => {
                        geometry.margins = Some(RawMargins {
                            left: attr_f64(e, b"left").unwrap_or(0.0),
                            right: attr_f64(e, b"right").unwrap_or(0.0),
                            top: attr_f64(e, b"top").unwrap_or(0.0),
                            bottom: attr_f64(e, b"bottom").unwrap_or(0.0),
                        });
                    }
                    b"pageSetup" => {
                        geometry.print_scale = attr_f64(e, b"scale");
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                if e.local_name().as_ref() == b"sheetData" {
                    in_sheet_data = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CertprintError::malformed(
                    &format!("worksheet XML at byte {}", xml.buffer_position()),
                    e,
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(CertprintError::TemplateMalformed(
            "worksheet XML has no <worksheet> root".to_string(),
        ));
    }
    if depth != 0 {
        return Err(CertprintError::TemplateMalformed(
            "worksheet XML ends with unclosed elements".to_string(),
        ));
    }

    Ok(geometry)
}

/// Reject addresses past the last column or row a worksheet can hold.
fn check_sheet_limits(what: &str, col: u32, row: u32) -> Result<()> {
    if col > MAX_COLUMN_INDEX || row > MAX_ROW_INDEX {
        return Err(CertprintError::TemplateMalformed(format!(
            "{what} reaches column {col}, row {row}, beyond the worksheet limits"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <dimension ref="A1:M66"/>
  <sheetFormatPr defaultColWidth="9.5" defaultRowHeight="15"/>
  <cols><col min="2" max="4" width="12.5" customWidth="1"/></cols>
  <sheetData>
    <row r="1" ht="24"><c r="C1" s="2"><v>0</v></c></row>
    <row r="9"><c r="C9" s="1"/><c s="3"/></row>
    <row><c r="A10"/></row>
  </sheetData>
  <pageMargins left="0.25" right="0.25" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>
  <pageSetup paperSize="9" scale="85" orientation="portrait"/>
</worksheet>"#;

    #[test]
    fn test_parse_geometry() {
        let g = parse_sheet_geometry(SHEET.as_bytes()).unwrap();
        assert_eq!(g.default_col_width, Some(9.5));
        assert_eq!(g.default_row_height, Some(15.0));
        assert_eq!(
            g.cols,
            vec![ColSpec {
                min: 2,
                max: 4,
                width: 12.5
            }]
        );
        assert_eq!(g.row_heights, vec![(1, 24.0)]);
        assert_eq!(g.max_row_seen, 10);
        assert_eq!(g.max_col_seen, 4);
        assert_eq!(g.print_scale, Some(85.0));
        assert_eq!(g.margins.unwrap().left, 0.25);
        assert_eq!(g.dimension.unwrap().max_col, 13);
    }

    #[test]
    fn test_cells_without_ref_follow_previous() {
        let g = parse_sheet_geometry(SHEET.as_bytes()).unwrap();
        let refs: Vec<String> = g.cells.iter().map(|c| c.cell.to_string()).collect();
        assert_eq!(refs, vec!["C1", "C9", "D9", "A10"]);
        assert_eq!(g.cells[1].style_idx, Some(1));
        assert_eq!(g.cells[3].style_idx, None);
    }

    #[test]
    fn test_malformed_markup() {
        let err = parse_sheet_geometry(b"<worksheet><sheetData></row></worksheet>").unwrap_err();
        assert!(err.is_template_error());

        let err = parse_sheet_geometry(b"<worksheet><sheetData>").unwrap_err();
        assert!(err.is_template_error());

        let err = parse_sheet_geometry(b"").unwrap_err();
        assert!(err.is_template_error());
    }

    #[test]
    fn test_addresses_beyond_sheet_limits() {
        for sheet in [
            r#"<worksheet><dimension ref="A1:A400000000"/><sheetData/></worksheet>"#,
            r#"<worksheet><dimension ref="A1:XFE1"/><sheetData/></worksheet>"#,
            r#"<worksheet><sheetData><row r="1048577"/></sheetData></worksheet>"#,
            r#"<worksheet><sheetData><row r="1"><c r="ZZZZ1"/></row></sheetData></worksheet>"#,
        ] {
            let err = parse_sheet_geometry(sheet.as_bytes()).unwrap_err();
            assert!(err.is_template_error(), "{sheet}");
        }

        let g = parse_sheet_geometry(
            br#"<worksheet><dimension ref="A1:XFD1048576"/><sheetData/></worksheet>"#,
        )
        .unwrap();
        let d = g.dimension.unwrap();
        assert_eq!((d.max_col, d.max_row), (MAX_COLUMN_INDEX, MAX_ROW_INDEX));
    }
}
