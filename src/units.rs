//! Conversion of spreadsheet engineering units into millimeters.
//!
//! Column widths are stored in "characters" of the default font, row heights in
//! points and page margins in inches. All conversions are total: non-positive
//! (or NaN) input yields `0.0`.

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Millimeters per typographic point.
pub const MM_PER_POINT: f64 = MM_PER_INCH / 72.0;

/// Screen resolution used by the column width formula.
pub const PX_PER_INCH: f64 = 96.0;

/// Maximum digit width (px) of the default 11pt Calibri font at 96 DPI.
const MAX_DIGIT_WIDTH_PX: f64 = 7.0;

/// Fallback column width in characters when the sheet declares none.
pub const FALLBACK_COL_WIDTH_CHARS: f64 = 8.43;

/// Fallback row height in points when the sheet declares none.
pub const FALLBACK_ROW_HEIGHT_PT: f64 = 18.55;

/// Convert a column width in characters to whole pixels.
///
/// Widths below one character are rounded linearly (12px per character);
/// wider columns use Excel's truncation formula including the 5px padding.
#[must_use]
pub fn col_width_to_px(width: f64) -> f64 {
    if width.is_nan() || width <= 0.0 {
        return 0.0;
    }
    if width < 1.0 {
        (width * 12.0 + 0.5).floor()
    } else {
        ((256.0 * width + (128.0 / MAX_DIGIT_WIDTH_PX).floor()) / 256.0 * MAX_DIGIT_WIDTH_PX)
            .floor()
    }
}

/// Convert a column width in characters to millimeters.
#[must_use]
pub fn col_width_to_mm(width: f64) -> f64 {
    col_width_to_px(width) * MM_PER_INCH / PX_PER_INCH
}

/// Convert a row height in points to millimeters.
#[must_use]
pub fn row_height_to_mm(points: f64) -> f64 {
    if points.is_nan() || points <= 0.0 {
        return 0.0;
    }
    points * MM_PER_POINT
}

/// Convert a page margin in inches to millimeters.
#[must_use]
pub fn inches_to_mm(inches: f64) -> f64 {
    if inches.is_nan() || inches <= 0.0 {
        return 0.0;
    }
    inches * MM_PER_INCH
}

/// Convert a font size in points to millimeters.
#[must_use]
pub fn points_to_mm(points: f64) -> f64 {
    row_height_to_mm(points)
}

/// Convert millimeters to EMUs (English Metric Units) used by drawing anchors.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn mm_to_emu(mm: f64) -> i64 {
    if mm.is_nan() || mm <= 0.0 {
        return 0;
    }
    (mm * 36_000.0).round() as i64
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test_case(8.43, 59.0 ; "default column")]
    #[test_case(1.0, 7.0 ; "one character")]
    #[test_case(0.5, 6.0 ; "half character rounds linearly")]
    #[test_case(10.0, 70.0 ; "ten characters")]
    #[test_case(0.0, 0.0 ; "zero")]
    #[test_case(-3.0, 0.0 ; "negative")]
    fn test_col_width_to_px(width: f64, expected: f64) {
        assert_eq!(col_width_to_px(width), expected);
    }

    #[test]
    fn test_default_width_is_deterministic() {
        let first = col_width_to_mm(8.43);
        for _ in 0..10 {
            assert_eq!(col_width_to_mm(8.43), first);
        }
        assert!(approx(first, 59.0 * 25.4 / 96.0));
    }

    #[test]
    fn test_col_width_monotonic() {
        // The sub-character branch and the truncation branch are each monotonic.
        let mut prev = 0.0;
        let mut w = 0.0;
        while w < 1.0 {
            let mm = col_width_to_mm(w);
            assert!(mm >= prev, "width {w} produced {mm} < {prev}");
            prev = mm;
            w += 0.01;
        }
        prev = 0.0;
        let mut w = 1.0;
        while w < 60.0 {
            let mm = col_width_to_mm(w);
            assert!(mm >= prev, "width {w} produced {mm} < {prev}");
            prev = mm;
            w += 0.07;
        }
    }

    #[test]
    fn test_row_height_monotonic() {
        let mut prev = 0.0;
        for i in 0..500 {
            let mm = row_height_to_mm(f64::from(i) * 0.25);
            assert!(mm >= prev);
            prev = mm;
        }
    }

    #[test]
    fn test_row_height_and_margins() {
        assert!(approx(row_height_to_mm(72.0), 25.4));
        assert!(approx(row_height_to_mm(18.55), 18.55 * 25.4 / 72.0));
        assert_eq!(row_height_to_mm(0.0), 0.0);
        assert_eq!(row_height_to_mm(f64::NAN), 0.0);
        assert!(approx(inches_to_mm(0.75), 19.05));
        assert_eq!(inches_to_mm(-1.0), 0.0);
    }

    #[test]
    fn test_mm_to_emu() {
        assert_eq!(mm_to_emu(1.0), 36_000);
        assert_eq!(mm_to_emu(210.0), 7_560_000);
        assert_eq!(mm_to_emu(-5.0), 0);
    }
}
