//! Cell rectangle resolution by prefix summation over column widths and row
//! heights.

use serde::Serialize;

use super::Layout;
use crate::cell_ref::CellRef;

/// Rectangle in millimeters relative to the content origin (margins not applied).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    /// X position (left edge)
    pub x: f64,
    /// Y position (top edge)
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Layout {
    /// Width of a 1-based column: the override if present and positive, else the default.
    #[must_use]
    pub fn col_width(&self, col: u32) -> f64 {
        match self.col_widths.get(&col) {
            Some(&w) if w > 0.0 => w,
            _ => self.default_col_width,
        }
    }

    /// Height of a 1-based row: the override if present and positive, else the default.
    #[must_use]
    pub fn row_height(&self, row: u32) -> f64 {
        match self.row_heights.get(&row) {
            Some(&h) if h > 0.0 => h,
            _ => self.default_row_height,
        }
    }

    /// Sum of column widths over `from..=to`.
    #[must_use]
    pub fn span_width(&self, from: u32, to: u32) -> f64 {
        (from.max(1)..=to).map(|c| self.col_width(c)).sum()
    }

    /// Sum of row heights over `from..=to`.
    #[must_use]
    pub fn span_height(&self, from: u32, to: u32) -> f64 {
        (from.max(1)..=to).map(|r| self.row_height(r)).sum()
    }

    /// Absolute rectangle of `cell`.
    #[must_use]
    pub fn cell_rect(&self, cell: CellRef) -> Rect {
        Rect {
            x: self.span_width(1, cell.col.saturating_sub(1)),
            y: self.span_height(1, cell.row.saturating_sub(1)),
            width: self.col_width(cell.col),
            height: self.row_height(cell.row),
        }
    }

    /// Resolve a textual reference. Returns `None` when it does not name a
    /// cell with positive column and row indices.
    #[must_use]
    pub fn resolve(&self, reference: &str) -> Option<Rect> {
        CellRef::parse(reference).map(|cell| self.cell_rect(cell))
    }
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

    fn layout() -> Layout {
        let mut layout = Layout {
            default_col_width: 10.0,
            default_row_height: 5.0,
            max_col: 4,
            max_row: 4,
            ..Layout::default()
        };
        layout.col_widths.insert(2, 20.0);
        layout.col_widths.insert(3, 0.0);
        layout.row_heights.insert(3, 8.0);
        layout.update_content_size();
        layout
    }

    #[test]
    fn test_cell_rect_prefix_sums() {
        let l = layout();
        let r = l.resolve("C3").unwrap();
        assert_eq!(r.x, 30.0);
        assert_eq!(r.y, 10.0);
        // zero override falls back to the default width
        assert_eq!(r.width, 10.0);
        assert_eq!(r.height, 8.0);

        let a1 = l.resolve("A1").unwrap();
        assert_eq!(a1, Rect { x: 0.0, y: 0.0, width: 10.0, height: 5.0 });
    }

    #[test]
    fn test_resolve_invalid() {
        let l = layout();
        assert!(l.resolve("A0").is_none());
        assert!(l.resolve("12").is_none());
        assert!(l.resolve("").is_none());
    }

    #[test]
    fn test_adjacent_rows_are_contiguous() {
        let l = layout();
        for row in 1..20 {
            let upper = l.cell_rect(CellRef::new(2, row).unwrap());
            let lower = l.cell_rect(CellRef::new(2, row + 1).unwrap());
            assert!((lower.y - (upper.y + upper.height)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_content_size() {
        let l = layout();
        assert_eq!(l.content_width, 10.0 + 20.0 + 10.0 + 10.0);
        assert_eq!(l.content_height, 5.0 + 5.0 + 8.0 + 5.0);
    }
}
