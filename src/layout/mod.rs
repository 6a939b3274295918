//! Resolved template geometry.
//!
//! A [`Layout`] is the millimeter-based model of one template sheet: column
//! widths, row heights, print scale, page margins and the per-cell font/wrap
//! styling. It is produced by [`crate::template::load_layout`] and is read-only
//! afterwards.

mod geometry;

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::cell_ref::CellRef;
use crate::units::{col_width_to_mm, row_height_to_mm, FALLBACK_COL_WIDTH_CHARS, FALLBACK_ROW_HEIGHT_PT};

pub use geometry::Rect;

/// Font size used when a style has no explicit `<sz>`.
pub const DEFAULT_FONT_SIZE_PT: f64 = 10.0;

/// Column count assumed when the template declares no usable bounds.
pub const FALLBACK_MAX_COL: u32 = 13;

/// Row count assumed when the template declares no usable bounds.
pub const FALLBACK_MAX_ROW: u32 = 66;

/// Page margins in millimeters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Margins {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Styling a template cell declares for its text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellStyle {
    /// Font size in points.
    pub font_size: f64,
    /// Whether the cell format enables text wrapping.
    pub wrap_text: bool,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE_PT,
            wrap_text: false,
        }
    }
}

/// Millimeter geometry of a template sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub default_col_width: f64,
    pub default_row_height: f64,
    /// Sparse per-column overrides keyed by 1-based column index.
    pub col_widths: BTreeMap<u32, f64>,
    /// Sparse per-row overrides keyed by 1-based row index.
    pub row_heights: BTreeMap<u32, f64>,
    /// Print scale as a fraction; always `> 0`.
    pub scale: f64,
    pub margins: Margins,
    #[serde(serialize_with = "serialize_styles")]
    pub cell_styles: HashMap<CellRef, CellStyle>,
    pub max_col: u32,
    pub max_row: u32,
    pub content_width: f64,
    pub content_height: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            default_col_width: col_width_to_mm(FALLBACK_COL_WIDTH_CHARS),
            default_row_height: row_height_to_mm(FALLBACK_ROW_HEIGHT_PT),
            col_widths: BTreeMap::new(),
            row_heights: BTreeMap::new(),
            scale: 1.0,
            margins: Margins::default(),
            cell_styles: HashMap::new(),
            max_col: FALLBACK_MAX_COL,
            max_row: FALLBACK_MAX_ROW,
            content_width: 0.0,
            content_height: 0.0,
        }
    }
}

impl Layout {
    /// Style declared for `cell`, if the template populated it.
    #[must_use]
    pub fn style(&self, cell: CellRef) -> Option<&CellStyle> {
        self.cell_styles.get(&cell)
    }

    /// Style declared for `cell`, or the default (10pt, no wrap).
    #[must_use]
    pub fn style_or_default(&self, cell: CellRef) -> CellStyle {
        self.style(cell).copied().unwrap_or_default()
    }

    /// Recompute `content_width`/`content_height` from the current bounds.
    pub fn update_content_size(&mut self) {
        self.content_width = self.span_width(1, self.max_col);
        self.content_height = self.span_height(1, self.max_row);
    }

    /// Content box scaled by the print scale: `(width, height)`.
    #[must_use]
    pub fn scaled_content_size(&self) -> (f64, f64) {
        (
            self.content_width * self.scale,
            self.content_height * self.scale,
        )
    }
}

/// Serialize the cell style map with string keys in row-major order so the
/// JSON dump is stable.
fn serialize_styles<S: serde::Serializer>(
    styles: &HashMap<CellRef, CellStyle>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let ordered: BTreeMap<CellRef, &CellStyle> = styles.iter().map(|(k, v)| (*k, v)).collect();
    serializer.collect_map(ordered.into_iter().map(|(k, v)| (k.to_string(), v)))
}
