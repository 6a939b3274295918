//! Template loading: XLSX container → [`Layout`].
//!
//! The loader opens the package, locates the worksheet and the stylesheet
//! through the workbook relationships, and converts their geometry into
//! millimeters. Either document missing or malformed fails the whole load.

mod cache;
pub(crate) mod relationships;
mod styles;
mod worksheet;

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::cell_ref::CellRef;
use crate::error::{CertprintError, Result};
use crate::export::zip_patcher::read_optional;
use crate::layout::{Layout, Margins, FALLBACK_MAX_COL, FALLBACK_MAX_ROW};
use crate::units::{col_width_to_mm, inches_to_mm, row_height_to_mm};

pub use cache::LayoutCache;
pub(crate) use styles::{parse_style_table, StyleTable};
pub(crate) use worksheet::{parse_sheet_geometry, SheetGeometry};

/// The two documents the renderer needs from a template package, plus where
/// they live inside it.
#[derive(Debug, Clone)]
pub(crate) struct TemplateParts {
    pub sheet_path: String,
    pub styles_path: String,
    pub sheet_xml: Vec<u8>,
    pub styles_xml: Vec<u8>,
}

impl TemplateParts {
    /// Read the first worksheet and the stylesheet out of an XLSX archive.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| CertprintError::malformed("template is not a readable archive", e))?;
        Self::from_archive(&mut archive)
    }

    pub fn from_archive<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self> {
        let (sheet_path, styles_path) = relationships::locate_parts(archive)?;
        let sheet_xml = read_part(archive, &sheet_path, "worksheet")?;
        let styles_xml = read_part(archive, &styles_path, "stylesheet")?;

        Ok(Self {
            sheet_path,
            styles_path,
            sheet_xml,
            styles_xml,
        })
    }
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
    what: &str,
) -> Result<Vec<u8>> {
    read_optional(archive, path)?.ok_or_else(|| {
        CertprintError::TemplateMalformed(format!("{what} document {path} is missing"))
    })
}

/// Load a template from disk and resolve its layout.
pub fn load_layout(path: impl AsRef<Path>) -> Result<Layout> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        CertprintError::malformed(&format!("cannot read template {}", path.display()), e)
    })?;
    load_layout_from_bytes(&data)
}

/// Resolve a layout from in-memory template bytes.
pub fn load_layout_from_bytes(data: &[u8]) -> Result<Layout> {
    let parts = TemplateParts::from_bytes(data)?;
    layout_from_parts(&parts)
}

pub(crate) fn layout_from_parts(parts: &TemplateParts) -> Result<Layout> {
    let geometry = parse_sheet_geometry(&parts.sheet_xml)?;
    let styles = parse_style_table(&parts.styles_xml)?;
    let layout = build_layout(&geometry, &styles);
    log::debug!(
        "loaded layout from {}: {}x{} cells, content {:.1}x{:.1} mm, scale {}",
        parts.sheet_path,
        layout.max_col,
        layout.max_row,
        layout.content_width,
        layout.content_height,
        layout.scale
    );
    Ok(layout)
}

/// Convert raw sheet geometry and the style table into a millimeter layout.
pub(crate) fn build_layout(geometry: &SheetGeometry, styles: &StyleTable) -> Layout {
    let mut layout = Layout::default();

    if let Some(width) = geometry.default_col_width.filter(|w| *w > 0.0) {
        layout.default_col_width = col_width_to_mm(width);
    }
    if let Some(height) = geometry.default_row_height.filter(|h| *h > 0.0) {
        layout.default_row_height = row_height_to_mm(height);
    }

    for col in &geometry.cols {
        let width = if col.width > 0.0 {
            col_width_to_mm(col.width)
        } else {
            layout.default_col_width
        };
        for index in col.min..=col.max {
            layout.col_widths.insert(index, width);
        }
    }

    for &(row, height) in &geometry.row_heights {
        layout.row_heights.insert(row, row_height_to_mm(height));
    }

    layout.scale = geometry
        .print_scale
        .filter(|pct| *pct > 0.0)
        .map_or(1.0, |pct| pct / 100.0);

    if let Some(m) = geometry.margins {
        layout.margins = Margins {
            left: inches_to_mm(m.left),
            right: inches_to_mm(m.right),
            top: inches_to_mm(m.top),
            bottom: inches_to_mm(m.bottom),
        };
    }

    let mut cell_styles = HashMap::with_capacity(geometry.cells.len());
    for styled in &geometry.cells {
        cell_styles.insert(styled.cell, styles.resolve(styled.style_idx));
    }
    layout.cell_styles = cell_styles;

    let (max_col, max_row) = match geometry.dimension {
        Some(d) if d.max_col > 0 && d.max_row > 0 => (d.max_col, d.max_row),
        _ => (geometry.max_col_seen, geometry.max_row_seen),
    };
    layout.max_col = if max_col == 0 { FALLBACK_MAX_COL } else { max_col };
    layout.max_row = if max_row == 0 { FALLBACK_MAX_ROW } else { max_row };

    layout.update_content_size();
    layout
}

/// Style index of `cell` as declared in the raw sheet, used when the
/// workbook target clones a cell format.
pub(crate) fn declared_style_index(geometry: &SheetGeometry, cell: CellRef) -> Option<u32> {
    geometry
        .cells
        .iter()
        .find(|c| c.cell == cell)
        .and_then(|c| c.style_idx)
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
    use crate::layout::DEFAULT_FONT_SIZE_PT;
    use crate::units::FALLBACK_COL_WIDTH_CHARS;

    const STYLES: &[u8] = br#"<styleSheet><fonts><font><sz val="12"/></font></fonts>
<cellXfs><xf fontId="0"><alignment wrapText="1"/></xf></cellXfs></styleSheet>"#;

    #[test]
    fn test_build_layout_defaults() {
        let geometry = parse_sheet_geometry(b"<worksheet><sheetData/></worksheet>").unwrap();
        let styles = parse_style_table(STYLES).unwrap();
        let layout = build_layout(&geometry, &styles);
        assert_eq!(layout.default_col_width, col_width_to_mm(FALLBACK_COL_WIDTH_CHARS));
        assert_eq!(layout.scale, 1.0);
        assert_eq!(layout.max_col, FALLBACK_MAX_COL);
        assert_eq!(layout.max_row, FALLBACK_MAX_ROW);
        assert!(layout.content_width > 0.0);
    }

    #[test]
    fn test_build_layout_from_sheet() {
        let sheet = br#"<worksheet><sheetFormatPr defaultRowHeight="20"/>
<cols><col min="1" max="3" width="10"/><col min="4" max="4" width="0"/></cols>
<sheetData><row r="2" ht="30"><c r="B2" s="0"/><c r="E2" s="7"/></row></sheetData>
<pageMargins left="1" right="0.5" top="0.25" bottom="0.25"/>
<pageSetup scale="0"/></worksheet>"#;
        let geometry = parse_sheet_geometry(sheet).unwrap();
        let styles = parse_style_table(STYLES).unwrap();
        let layout = build_layout(&geometry, &styles);

        assert_eq!(layout.col_widths.len(), 4);
        assert_eq!(layout.col_widths[&2], col_width_to_mm(10.0));
        assert_eq!(layout.col_widths[&4], layout.default_col_width);
        assert_eq!(layout.row_heights[&2], row_height_to_mm(30.0));
        assert_eq!(layout.default_row_height, row_height_to_mm(20.0));
        // non-positive print scale falls back to 1.0
        assert_eq!(layout.scale, 1.0);
        assert_eq!(layout.margins.left, 25.4);
        // bounds come from the populated cells
        assert_eq!((layout.max_col, layout.max_row), (5, 2));

        let b2 = layout.style(CellRef::parse("B2").unwrap()).unwrap();
        assert_eq!(b2.font_size, 12.0);
        assert!(b2.wrap_text);
        let e2 = layout.style(CellRef::parse("E2").unwrap()).unwrap();
        assert_eq!(e2.font_size, DEFAULT_FONT_SIZE_PT);
        assert!(!e2.wrap_text);
    }

    #[test]
    fn test_not_an_archive() {
        let err = load_layout_from_bytes(b"definitely not a zip").unwrap_err();
        assert!(err.is_template_error());
    }
}
