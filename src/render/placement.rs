//! Text placement: effective font size, wrap decision and page coordinates.

use serde::Serialize;

use crate::cell_ref::CellRef;
use crate::layout::{Layout, Rect, DEFAULT_FONT_SIZE_PT};
use crate::profile::{Offset, TemplateProfile};
use crate::units::MM_PER_POINT;

/// Inner padding between the cell edge and its text, in mm.
pub const CELL_PADDING_MM: f64 = 0.6;

/// Fraction of the cell height where a single line's baseline sits.
pub const BASELINE_FACTOR: f64 = 0.68;

/// Minimum line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Page text is set larger than the template's nominal point size.
pub const PAGE_FONT_SCALE: f64 = 4.0 / 3.0;

/// One field ready to be emitted by a target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedText {
    pub cell: CellRef,
    /// Cell rectangle relative to the content origin.
    pub rect: Rect,
    pub text: String,
    /// Effective font size in points, print scale already applied.
    pub font_size: f64,
    pub wrap: bool,
    pub offset: Offset,
    pub bold: bool,
}

/// How a target sizes its text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FontSizing {
    /// Each cell keeps its own template font size.
    PerCell,
    /// Every cell uses one size in points.
    Uniform(f64),
}

/// Uniform page size: the anchor cell's font size times [`PAGE_FONT_SCALE`].
#[must_use]
pub fn page_font_size(layout: &Layout, profile: &TemplateProfile) -> f64 {
    let base = profile
        .anchor()
        .and_then(|cell| layout.style(cell))
        .map(|style| style.font_size)
        .filter(|size| *size > 0.0)
        .unwrap_or(DEFAULT_FONT_SIZE_PT);
    base * PAGE_FONT_SCALE
}

/// Apply the print scale to a font size; sizes that would drop below 1pt
/// stay unscaled.
#[must_use]
pub fn scaled_font_size(size: f64, scale: f64) -> f64 {
    let scaled = size * scale;
    if scaled < 1.0 {
        size
    } else {
        scaled
    }
}

/// Build the placement for one cell's text.
#[must_use]
pub fn place(
    layout: &Layout,
    profile: &TemplateProfile,
    sizing: FontSizing,
    cell: CellRef,
    text: &str,
) -> PlacedText {
    let style = layout.style_or_default(cell);
    let base_size = match sizing {
        FontSizing::PerCell => style.font_size,
        FontSizing::Uniform(size) => size,
    };

    let mut offset = profile.offset(cell);
    if let Some((reference, shift)) = profile.year_shift {
        if CellRef::parse(reference) == Some(cell) && text.trim().chars().count() == 4 {
            offset.dx += shift;
        }
    }

    PlacedText {
        cell,
        rect: layout.cell_rect(cell),
        text: text.to_string(),
        font_size: scaled_font_size(base_size, layout.scale),
        wrap: style.wrap_text || profile.is_forced_wrap(cell),
        offset,
        bold: profile.is_bold(cell),
    }
}

/// Page position of a single-line run: left edge and baseline, in mm from
/// the top-left page corner.
#[must_use]
pub fn baseline_origin(layout: &Layout, placed: &PlacedText) -> (f64, f64) {
    let scale = layout.scale;
    let rect = placed.rect;
    let baseline = rect.height * BASELINE_FACTOR + CELL_PADDING_MM;
    let x = layout.margins.left + (rect.x + CELL_PADDING_MM) * scale + placed.offset.dx * scale;
    let y = layout.margins.top + (rect.y + baseline) * scale + placed.offset.dy * scale;
    (x, y)
}

/// Block a wrapped cell is set into, in page mm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WrapBox {
    pub x: f64,
    /// Top of the first line.
    pub y: f64,
    pub width: f64,
    pub line_height: f64,
}

#[must_use]
pub fn wrap_box(layout: &Layout, placed: &PlacedText) -> WrapBox {
    let scale = layout.scale;
    let rect = placed.rect;
    let padding = CELL_PADDING_MM * scale;

    let x = layout.margins.left + (rect.x + CELL_PADDING_MM) * scale + placed.offset.dx * scale;
    let y = layout.margins.top + rect.y * scale + padding + placed.offset.dy * scale;
    let mut width = rect.width * scale - 2.0 * padding;
    if width <= 0.0 {
        width = rect.width * scale;
    }
    let line_height = (rect.height * scale).max(placed.font_size * MM_PER_POINT * LINE_HEIGHT_FACTOR);

    WrapBox {
        x,
        y,
        width,
        line_height,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use crate::layout::{CellStyle, Margins};
    use crate::profile::TemplateVariant;

    const EPS: f64 = 1e-9;

    fn layout() -> Layout {
        let mut layout = Layout {
            default_col_width: 20.0,
            default_row_height: 6.0,
            scale: 0.5,
            margins: Margins {
                left: 10.0,
                right: 10.0,
                top: 8.0,
                bottom: 8.0,
            },
            ..Layout::default()
        };
        layout.cell_styles.insert(
            CellRef::parse("C9").unwrap(),
            CellStyle {
                font_size: 12.0,
                wrap_text: false,
            },
        );
        layout.cell_styles.insert(
            CellRef::parse("B2").unwrap(),
            CellStyle {
                font_size: 9.0,
                wrap_text: true,
            },
        );
        layout.update_content_size();
        layout
    }

    #[test]
    fn test_page_font_size_from_anchor() {
        let profile = TemplateVariant::Classic.profile();
        assert!((page_font_size(&layout(), profile) - 16.0).abs() < EPS);
        assert!((page_font_size(&Layout::default(), profile) - 10.0 * PAGE_FONT_SCALE).abs() < EPS);
    }

    #[test]
    fn test_scaled_font_size_floor() {
        assert_eq!(scaled_font_size(10.0, 0.5), 5.0);
        // would fall below 1pt, keep the unscaled size
        assert_eq!(scaled_font_size(1.5, 0.5), 1.5);
    }

    #[test]
    fn test_place_uses_profile_tables() {
        let l = layout();
        let profile = TemplateVariant::Classic.profile();
        let f27 = CellRef::parse("F27").unwrap();
        let placed = place(&l, profile, FontSizing::Uniform(16.0), f27, "Петровић");
        assert!(placed.bold);
        assert!(!placed.wrap);
        assert_eq!(placed.font_size, 8.0);
        assert_eq!(placed.offset, Offset::new(12.0, -8.0));

        let b2 = CellRef::parse("B2").unwrap();
        let placed = place(&l, profile, FontSizing::PerCell, b2, "x");
        assert!(placed.wrap);
        assert_eq!(placed.font_size, 4.5);
        assert_eq!(placed.offset, profile.default_offset);

        let c58 = CellRef::parse("C58").unwrap();
        assert!(place(&l, profile, FontSizing::PerCell, c58, "x").wrap);
    }

    #[test]
    fn test_year_shift_only_for_four_digits() {
        let l = layout();
        let profile = TemplateVariant::Classic.profile();
        let n10 = CellRef::parse("N10").unwrap();
        let short = place(&l, profile, FontSizing::PerCell, n10, "06");
        let long = place(&l, profile, FontSizing::PerCell, n10, "1987");
        assert_eq!(short.offset.dx, 2.0);
        assert_eq!(long.offset.dx, -6.0);
    }

    #[test]
    fn test_baseline_origin() {
        let l = layout();
        let profile = TemplateVariant::Classic.profile();
        let b2 = CellRef::parse("B2").unwrap();
        let mut placed = place(&l, profile, FontSizing::PerCell, b2, "x");
        placed.offset = Offset::new(2.0, -1.0);
        let (x, y) = baseline_origin(&l, &placed);
        // rect: x=20, y=6, h=6
        assert!((x - (10.0 + (20.0 + 0.6) * 0.5 + 1.0)).abs() < EPS);
        let baseline = 6.0 * BASELINE_FACTOR + CELL_PADDING_MM;
        assert!((y - (8.0 + (6.0 + baseline) * 0.5 - 0.5)).abs() < EPS);
    }

    #[test]
    fn test_wrap_box() {
        let l = layout();
        let profile = TemplateVariant::Classic.profile();
        let b2 = CellRef::parse("B2").unwrap();
        let mut placed = place(&l, profile, FontSizing::PerCell, b2, "x");
        placed.offset = Offset::default();
        let b = wrap_box(&l, &placed);
        assert!((b.width - (20.0 * 0.5 - 2.0 * 0.3)).abs() < EPS);
        assert!((b.y - (8.0 + 3.0 + 0.3)).abs() < EPS);
        // row is 3mm after scaling; 4.5pt * 1.2 is smaller
        assert!((b.line_height - 3.0).abs() < EPS);

        placed.font_size = 20.0;
        let b = wrap_box(&l, &placed);
        assert!((b.line_height - 20.0 * MM_PER_POINT * LINE_HEIGHT_FACTOR).abs() < EPS);
    }
}
