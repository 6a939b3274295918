//! Background image fitting and loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::layout::Layout;

/// How a background image is fitted onto the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundPolicy {
    /// Aspect-preserving cover of the whole page, centered on the overflowing axis.
    FillPage,
    /// Stretch over the scaled content box, anchored at the margin origin.
    FillContentBox,
}

/// Where the image lands, in page millimeters from the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ImagePlacement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Page dimensions in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const A4: Self = Self {
        width: 210.0,
        height: 297.0,
    };
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

/// Compute the placement of an image of `image_px` pixels (if known).
#[must_use]
pub fn fit_background(
    policy: BackgroundPolicy,
    layout: &Layout,
    page: PageSize,
    image_px: Option<(u32, u32)>,
) -> ImagePlacement {
    match policy {
        BackgroundPolicy::FillPage => fill_page(page, image_px),
        BackgroundPolicy::FillContentBox => fill_content_box(layout, page),
    }
}

fn fill_page(page: PageSize, image_px: Option<(u32, u32)>) -> ImagePlacement {
    let mut placement = ImagePlacement {
        x: 0.0,
        y: 0.0,
        width: page.width,
        height: page.height,
    };

    let Some((w, h)) = image_px.filter(|(w, h)| *w > 0 && *h > 0) else {
        return placement;
    };
    if page.width <= 0.0 || page.height <= 0.0 {
        return placement;
    }

    let image_ratio = f64::from(w) / f64::from(h);
    let page_ratio = page.width / page.height;
    if image_ratio > page_ratio {
        placement.height = page.height;
        placement.width = page.height * image_ratio;
        placement.x = (page.width - placement.width) / 2.0;
    } else {
        placement.width = page.width;
        placement.height = page.width / image_ratio;
        placement.y = (page.height - placement.height) / 2.0;
    }
    placement
}

fn fill_content_box(layout: &Layout, page: PageSize) -> ImagePlacement {
    let (mut width, mut height) = layout.scaled_content_size();
    let margins = layout.margins;

    if width <= 0.0 {
        width = page.width - margins.left - margins.right;
    }
    if height <= 0.0 {
        height = page.height - margins.top - margins.bottom;
    }
    if width <= 0.0 {
        width = page.width;
    }
    if height <= 0.0 {
        height = page.height;
    }

    ImagePlacement {
        x: margins.left,
        y: margins.top,
        width,
        height,
    }
}

/// A decoded background image as 8-bit RGB.
#[derive(Clone)]
pub struct BackgroundImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
    /// Original file bytes, embedded as-is by the workbook target.
    pub encoded: Vec<u8>,
    /// Lowercase file extension of the encoded bytes (`png`, `jpeg`).
    pub extension: &'static str,
}

impl std::fmt::Debug for BackgroundImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

impl BackgroundImage {
    /// Decode an image from memory. Returns `None` when the format is not
    /// recognized or decoding fails.
    #[must_use]
    pub fn decode(encoded: Vec<u8>) -> Option<Self> {
        let format = image::guess_format(&encoded).ok()?;
        let extension = match format {
            image::ImageFormat::Png => "png",
            image::ImageFormat::Jpeg => "jpeg",
            other => {
                log::warn!("background image format {other:?} is not supported");
                return None;
            }
        };
        let decoded = match image::load_from_memory_with_format(&encoded, format) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("background image could not be decoded: {e}");
                return None;
            }
        };
        let rgb = decoded.to_rgb8();
        Some(Self {
            width: rgb.width(),
            height: rgb.height(),
            rgb: rgb.into_raw(),
            encoded,
            extension,
        })
    }

    /// Read and decode an image file. A missing or undecodable file yields
    /// `None` and is logged; the render continues without a background.
    #[must_use]
    pub fn load(path: &Path) -> Option<Self> {
        match std::fs::read(path) {
            Ok(bytes) => Self::decode(bytes),
            Err(e) => {
                log::warn!("background image {} unavailable: {e}", path.display());
                None
            }
        }
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
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
    use crate::layout::Margins;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_fill_page_wide_image() {
        // 2:1 image on a portrait page overflows horizontally
        let p = fit_background(
            BackgroundPolicy::FillPage,
            &Layout::default(),
            PageSize::A4,
            Some((2000, 1000)),
        );
        assert_eq!(p.height, 297.0);
        assert!((p.width - 594.0).abs() < EPS);
        assert!((p.x - (210.0 - 594.0) / 2.0).abs() < EPS);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn test_fill_page_tall_image() {
        let p = fit_background(
            BackgroundPolicy::FillPage,
            &Layout::default(),
            PageSize::A4,
            Some((1000, 2000)),
        );
        assert_eq!(p.width, 210.0);
        assert!((p.height - 420.0).abs() < EPS);
        assert!((p.y - (297.0 - 420.0) / 2.0).abs() < EPS);
        assert_eq!(p.x, 0.0);
    }

    #[test]
    fn test_fill_page_unknown_size_stretches() {
        let p = fit_background(BackgroundPolicy::FillPage, &Layout::default(), PageSize::A4, None);
        assert_eq!(
            p,
            ImagePlacement {
                x: 0.0,
                y: 0.0,
                width: 210.0,
                height: 297.0
            }
        );
    }

    #[test]
    fn test_fill_page_ratio_property() {
        let page = PageSize::A4;
        let page_ratio = page.width / page.height;
        for (w, h) in [(1, 1), (3, 4), (210, 297), (1654, 2339), (5, 1), (1, 9)] {
            let p = fit_background(BackgroundPolicy::FillPage, &Layout::default(), page, Some((w, h)));
            let r = f64::from(w) / f64::from(h);
            if r > page_ratio {
                assert_eq!(p.height, page.height);
                assert!((p.width - p.height * r).abs() < EPS);
            } else {
                assert_eq!(p.width, page.width);
                assert!((p.height - p.width / r).abs() < EPS);
            }
            // cover: the page is never left partly uncovered
            assert!(p.width >= page.width - EPS && p.height >= page.height - EPS);
        }
    }

    #[test]
    fn test_fill_content_box_scaled() {
        let mut layout = Layout {
            scale: 0.5,
            margins: Margins {
                left: 10.0,
                right: 10.0,
                top: 5.0,
                bottom: 5.0,
            },
            ..Layout::default()
        };
        layout.update_content_size();
        let p = fit_background(
            BackgroundPolicy::FillContentBox,
            &layout,
            PageSize::A4,
            Some((100, 100)),
        );
        assert_eq!(p.x, 10.0);
        assert_eq!(p.y, 5.0);
        assert!((p.width - layout.content_width * 0.5).abs() < EPS);
        assert!((p.height - layout.content_height * 0.5).abs() < EPS);
    }

    #[test]
    fn test_fill_content_box_fallbacks() {
        let layout = Layout {
            margins: Margins {
                left: 10.0,
                right: 20.0,
                top: 5.0,
                bottom: 300.0,
            },
            ..Layout::default()
        };
        // content size was never computed, so it is zero
        let p = fit_background(BackgroundPolicy::FillContentBox, &layout, PageSize::A4, None);
        assert_eq!(p.width, 180.0);
        // page minus margins is negative, so the full page height applies
        assert_eq!(p.height, 297.0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(BackgroundImage::decode(b"not an image".to_vec()).is_none());
        assert!(BackgroundImage::load(Path::new("/nonexistent/background.jpg")).is_none());
    }
}
