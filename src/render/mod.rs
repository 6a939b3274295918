//! Rendering engine with pluggable output targets.
//!
//! [`render`] maps the record through the profile, plans every field into a
//! [`PlacedText`] and hands the result to a [`RenderTarget`]. The PDF and
//! workbook targets differ only in how they emit that tuple.

pub mod background;
pub mod pdf;
pub mod placement;
pub mod workbook;
pub mod wrap;

pub use background::{fit_background, BackgroundImage, BackgroundPolicy, ImagePlacement, PageSize};
pub use pdf::PdfTarget;
pub use placement::{FontSizing, PlacedText, WrapBox};
pub use workbook::WorkbookTarget;
pub use wrap::{wrap_text, TextMeasure};

use serde::Serialize;

use crate::cell_ref::CellRef;
use crate::error::Result;
use crate::fields::FieldValues;
use crate::layout::Layout;
use crate::profile::TemplateProfile;
use crate::record::BaptismRecord;

/// What kind of document a target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Positioned text runs on a fixed page.
    Page,
    /// Values written into the template's own cells.
    Workbook,
}

/// Trait for output targets.
///
/// Implementations receive fully planned text and never make placement
/// decisions of their own beyond how to express the plan in their format.
pub trait RenderTarget {
    fn kind(&self) -> TargetKind;

    /// Draw the background image at `placement`. Called at most once, before
    /// any text.
    fn draw_background(
        &mut self,
        layout: &Layout,
        image: &BackgroundImage,
        placement: ImagePlacement,
    ) -> Result<()>;

    /// Emit one field.
    fn place_text(&mut self, layout: &Layout, text: &PlacedText) -> Result<()>;
}

/// Background request for a single render.
#[derive(Debug, Clone, Copy)]
pub struct BackgroundSpec<'a> {
    pub image: &'a BackgroundImage,
    pub policy: BackgroundPolicy,
}

/// Non-fatal outcomes of a render.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderReport {
    /// Cells that were emitted, in emit order.
    pub placed_cells: Vec<CellRef>,
    /// References in the draw order that could not be resolved.
    pub skipped_cells: Vec<String>,
    pub background_applied: bool,
}

/// Render `record` into `target`.
pub fn render<T: RenderTarget + ?Sized>(
    target: &mut T,
    layout: &Layout,
    profile: &TemplateProfile,
    record: &BaptismRecord,
    background: Option<BackgroundSpec<'_>>,
    page: PageSize,
) -> Result<RenderReport> {
    let mut report = RenderReport::default();
    let mut values = FieldValues::from_record(record, profile.cells);

    if let Some(requested) = background {
        let placement = fit_background(requested.policy, layout, page, Some(requested.image.dimensions()));
        log::debug!("background {:?} at {placement:?}", requested.policy);
        target.draw_background(layout, requested.image, placement)?;
        report.background_applied = true;
    }

    let (order, sizing) = match target.kind() {
        TargetKind::Page => {
            values.apply(profile.page_compositions);
            let order: Vec<std::result::Result<CellRef, String>> = profile
                .page_order
                .iter()
                .map(|r| CellRef::parse(r).ok_or_else(|| (*r).to_string()))
                .collect();
            let size = placement::page_font_size(layout, profile);
            (order, FontSizing::Uniform(size))
        }
        TargetKind::Workbook => {
            let order = values.iter().map(|(cell, _)| Ok(cell)).collect();
            (order, FontSizing::PerCell)
        }
    };

    for entry in order {
        let cell = match entry {
            Ok(cell) => cell,
            Err(reference) => {
                log::warn!("skipping unresolvable cell reference {reference:?}");
                report.skipped_cells.push(reference);
                continue;
            }
        };
        let Some(text) = values.get(cell) else {
            continue;
        };
        let placed = placement::place(layout, profile, sizing, cell, text);
        log::trace!("{cell}: {:?} at {:?}", placed.text, placed.rect);
        target.place_text(layout, &placed)?;
        report.placed_cells.push(cell);
    }

    log::debug!(
        "placed {} cells, skipped {}",
        report.placed_cells.len(),
        report.skipped_cells.len()
    );
    Ok(report)
}
