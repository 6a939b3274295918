//! Parsing of xl/styles.xml
//!
//! Only font sizes and the `wrapText` alignment flag matter for placement, so
//! fills, borders and number formats are skipped.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{CertprintError, Result};
use crate::layout::{CellStyle, DEFAULT_FONT_SIZE_PT};
use crate::xml_helpers::{attr_bool, attr_u32, attr_val_f64};

/// A `cellXfs/xf` entry reduced to what placement needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct XfEntry {
    pub font_id: Option<u32>,
    pub wrap: bool,
}

/// Font and cell-format tables from the stylesheet.
#[derive(Debug, Default)]
pub(crate) struct StyleTable {
    /// Font size in points per font index; missing `<sz>` resolves to 10pt.
    pub font_sizes: Vec<f64>,
    pub cell_xfs: Vec<XfEntry>,
}

impl StyleTable {
    /// Resolve a cell's style index. Out-of-range or absent indices get the
    /// default font size and no wrap.
    pub fn resolve(&self, style_idx: Option<u32>) -> CellStyle {
        let Some(xf) = style_idx
            .and_then(|idx| usize::try_from(idx).ok())
            .and_then(|idx| self.cell_xfs.get(idx))
        else {
            return CellStyle::default();
        };

        let font_size = xf
            .font_id
            .and_then(|id| usize::try_from(id).ok())
            .and_then(|id| self.font_sizes.get(id))
            .copied()
            .filter(|sz| *sz > 0.0)
            .unwrap_or(DEFAULT_FONT_SIZE_PT);

        CellStyle {
            font_size,
            wrap_text: xf.wrap,
        }
    }
}

/// Parse styles.xml content.
pub(crate) fn parse_style_table(data: &[u8]) -> Result<StyleTable> {
    let mut xml = Reader::from_reader(data);
    xml.trim_text(true);

    let mut table = StyleTable::default();
    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut saw_root = false;

    let mut in_fonts = false;
    let mut in_cell_xfs = false;
    let mut current_font: Option<f64> = None;
    let mut current_xf: Option<XfEntry> = None;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(ref e) | Event::Empty(ref e))) => {
                let is_empty = matches!(event, Event::Empty(_));
                if !is_empty {
                    depth += 1;
                }
                match e.local_name().as_ref() {
                    b"styleSheet" => saw_root = true,
                    b"fonts" => in_fonts = !is_empty,
                    b"cellXfs" => in_cell_xfs = !is_empty,
                    b"font" if in_fonts => {
                        if is_empty {
                            table.font_sizes.push(DEFAULT_FONT_SIZE_PT);
                        } else {
                            current_font = Some(DEFAULT_FONT_SIZE_PT);
                        }
                    }
                    b"sz" if current_font.is_some() => {
                        if let Some(size) = attr_val_f64(e).filter(|s| *s > 0.0) {
                            current_font = Some(size);
                        }
                    }
                    b"xf" if in_cell_xfs => {
                        let xf = XfEntry {
                            font_id: attr_u32(e, b"fontId"),
                            wrap: false,
                        };
                        if is_empty {
                            table.cell_xfs.push(xf);
                        } else {
                            current_xf = Some(xf);
                        }
                    }
                    b"alignment" => {
                        if let Some(ref mut xf) = current_xf {
                            xf.wrap = attr_bool(e, b"wrapText").unwrap_or(false);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                match e.local_name().as_ref() {
                    b"fonts" => in_fonts = false,
                    b"cellXfs" => in_cell_xfs = false,
                    b"font" => {
                        if let Some(size) = current_font.take() {
                            table.font_sizes.push(size);
                        }
                    }
                    b"xf" => {
                        if let Some(xf) = current_xf.take() {
                            table.cell_xfs.push(xf);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CertprintError::malformed(
                    &format!("styles XML at byte {}", xml.buffer_position()),
                    e,
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(CertprintError::TemplateMalformed(
            "styles XML has no <styleSheet> root".to_string(),
        ));
    }
    if depth != 0 {
        return Err(CertprintError::TemplateMalformed(
            "styles XML ends with unclosed elements".to_string(),
        ));
    }

    Ok(table)
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

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="3">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><name val="Arial"/></font>
    <font><sz val="14"/></font>
  </fonts>
  <cellStyleXfs count="1"><xf fontId="2"><alignment wrapText="1"/></xf></cellStyleXfs>
  <cellXfs count="3">
    <xf fontId="0"/>
    <xf fontId="2" applyAlignment="1"><alignment wrapText="1" vertical="top"/></xf>
    <xf fontId="1"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn test_parse_fonts_and_xfs() {
        let t = parse_style_table(STYLES.as_bytes()).unwrap();
        assert_eq!(t.font_sizes, vec![11.0, 10.0, 14.0]);
        // cellStyleXfs entries are not part of the cell format table
        assert_eq!(t.cell_xfs.len(), 3);
        assert!(t.cell_xfs[1].wrap);
        assert!(!t.cell_xfs[0].wrap);
    }

    #[test]
    fn test_resolve_style() {
        let t = parse_style_table(STYLES.as_bytes()).unwrap();
        assert_eq!(
            t.resolve(Some(1)),
            CellStyle {
                font_size: 14.0,
                wrap_text: true
            }
        );
        assert_eq!(t.resolve(Some(2)).font_size, 10.0);
        assert_eq!(t.resolve(Some(0)).font_size, 11.0);
        assert_eq!(t.resolve(Some(99)), CellStyle::default());
        assert_eq!(t.resolve(None), CellStyle::default());
    }

    #[test]
    fn test_malformed_styles() {
        assert!(parse_style_table(b"<styleSheet><fonts></styleSheet>").is_err());
        assert!(parse_style_table(b"<other/>").is_err());
    }
}
