//! XLSX export pipeline.
//!
//! Produces the filled workbook by patching the template's ZIP archive. The
//! worksheet is streamed with the new values written in, the stylesheet gains
//! bold formats when a cell needs emphasis, and an optional background adds a
//! drawing part. Every other entry passes through byte-identical.

pub(crate) mod drawing;
pub(crate) mod sheet_writer;
pub(crate) mod styles_writer;
pub(crate) mod zip_patcher;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Cursor;

use zip::ZipArchive;

use crate::cell_ref::CellRef;
use crate::error::{CertprintError, Result};
use crate::layout::Layout;
use crate::template::{declared_style_index, parse_sheet_geometry, TemplateParts};

pub(crate) use drawing::BackgroundPicture;
use sheet_writer::{patch_sheet, sheet_has_drawing, CellWrite};
use styles_writer::add_bold_styles;

/// A value to write into one template cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEdit {
    pub cell: CellRef,
    pub text: String,
    pub bold: bool,
}

/// Write `edits` (and optionally a background picture) into a copy of the
/// template workbook.
pub(crate) fn write_workbook(
    template: &[u8],
    layout: &Layout,
    edits: &[CellEdit],
    picture: Option<&BackgroundPicture>,
) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(template))
        .map_err(|e| CertprintError::malformed("template is not a readable archive", e))?;
    let parts = TemplateParts::from_archive(&mut archive)?;

    let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();

    let bold_cells: Vec<CellRef> = edits.iter().filter(|e| e.bold).map(|e| e.cell).collect();
    let mut base_styles: BTreeMap<CellRef, u32> = BTreeMap::new();
    let mut bold_mapping: HashMap<u32, u32> = HashMap::new();
    if !bold_cells.is_empty() {
        let geometry = parse_sheet_geometry(&parts.sheet_xml)?;
        for cell in bold_cells {
            base_styles.insert(cell, declared_style_index(&geometry, cell).unwrap_or(0));
        }
        let bases: BTreeSet<u32> = base_styles.values().copied().collect();
        let styles = add_bold_styles(&parts.styles_xml, &bases)?;
        if styles.xml != parts.styles_xml {
            files.insert(parts.styles_path.clone(), styles.xml);
        }
        bold_mapping = styles.mapping;
    }

    let cells: BTreeMap<CellRef, CellWrite> = edits
        .iter()
        .map(|edit| {
            let style = base_styles
                .get(&edit.cell)
                .and_then(|base| bold_mapping.get(base))
                .copied();
            (
                edit.cell,
                CellWrite {
                    text: edit.text.clone(),
                    style,
                },
            )
        })
        .collect();

    let mut drawing_rid = None;
    if let Some(picture) = picture {
        if sheet_has_drawing(&parts.sheet_xml) {
            log::warn!(
                "{} already has a drawing; background picture not added",
                parts.sheet_path
            );
        } else {
            let drawing = drawing::background_parts(&mut archive, &parts.sheet_path, layout, picture)?;
            files.extend(drawing.files);
            drawing_rid = Some(drawing.rel_id);
        }
    }

    let sheet_xml = patch_sheet(&parts.sheet_xml, &cells, drawing_rid.as_deref())?;
    files.insert(parts.sheet_path.clone(), sheet_xml);

    log::debug!(
        "writing {} cell(s) into {}, {} part(s) replaced or added",
        cells.len(),
        parts.sheet_path,
        files.len()
    );
    zip_patcher::patch_zip(template, &files)
}
