//! Workbook target: values written back into a copy of the template.
//!
//! Each field lands in its own cell with the template's formatting intact, so
//! positions, offsets and wrap decisions are left to the spreadsheet
//! application. Emphasized cells get a bold clone of their format.

use super::background::{BackgroundImage, ImagePlacement};
use super::placement::PlacedText;
use super::{RenderTarget, TargetKind};
use crate::error::Result;
use crate::export::{write_workbook, BackgroundPicture, CellEdit};
use crate::layout::Layout;

pub struct WorkbookTarget {
    template: Vec<u8>,
    edits: Vec<CellEdit>,
    picture: Option<BackgroundPicture>,
}

impl WorkbookTarget {
    /// Start from the raw template package.
    #[must_use]
    pub fn new(template: Vec<u8>) -> Self {
        Self {
            template,
            edits: Vec::new(),
            picture: None,
        }
    }

    /// Cell values collected so far, in placement order.
    #[must_use]
    pub fn edits(&self) -> &[CellEdit] {
        &self.edits
    }

    #[must_use]
    pub fn has_background(&self) -> bool {
        self.picture.is_some()
    }

    /// Produce the filled workbook.
    pub fn finish(self, layout: &Layout) -> Result<Vec<u8>> {
        write_workbook(&self.template, layout, &self.edits, self.picture.as_ref())
    }
}

impl RenderTarget for WorkbookTarget {
    fn kind(&self) -> TargetKind {
        TargetKind::Workbook
    }

    fn draw_background(
        &mut self,
        _layout: &Layout,
        image: &BackgroundImage,
        placement: ImagePlacement,
    ) -> Result<()> {
        self.picture = Some(BackgroundPicture {
            bytes: image.encoded.clone(),
            extension: image.extension,
            placement,
        });
        Ok(())
    }

    fn place_text(&mut self, _layout: &Layout, placed: &PlacedText) -> Result<()> {
        self.edits.push(CellEdit {
            cell: placed.cell,
            text: placed.text.clone(),
            bold: placed.bold,
        });
        Ok(())
    }
}
