//! Page target: positioned text runs on a single PDF page.
//!
//! Placement works in millimeters from the top-left corner; PDF user space
//! starts bottom-left, so every y coordinate is flipped on emission.

use std::borrow::Cow;
use std::io::{BufWriter, Cursor};

use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, IndirectFontRef, Mm,
    PdfDocument, PdfDocumentReference, PdfLayerReference, Px,
};

use super::background::{BackgroundImage, ImagePlacement, PageSize};
use super::placement::{baseline_origin, wrap_box, PlacedText};
use super::wrap::wrap_text;
use super::{RenderTarget, TargetKind};
use crate::error::{CertprintError, Result};
use crate::fonts::FontFamily;
use crate::layout::Layout;
use crate::units::{points_to_mm, MM_PER_INCH};

/// Resolution images are registered at before being scaled to their box.
const IMAGE_DPI: f64 = 300.0;

/// Baseline position inside a wrapped line, as a fraction of the font size
/// below the line's vertical center.
const WRAPPED_BASELINE_DROP: f64 = 0.3;

pub struct PdfTarget {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    family: FontFamily,
    page: PageSize,
}

impl PdfTarget {
    /// Start a one-page document of `page` size set in `family`.
    pub fn new(title: &str, page: PageSize, family: FontFamily) -> Result<Self> {
        let (doc, page_idx, layer_idx) =
            PdfDocument::new(title, mm(page.width), mm(page.height), "Layer 1");
        let layer = doc.get_page(page_idx).get_layer(layer_idx);

        let (regular, bold) = match (family.face_bytes(false), family.face_bytes(true)) {
            (Some(regular), Some(bold)) => {
                let regular = doc
                    .add_external_font(Cursor::new(regular))
                    .map_err(|e| CertprintError::write_failed("embedding font", e))?;
                let bold = if family.has_bold_face() {
                    doc.add_external_font(Cursor::new(bold))
                        .map_err(|e| CertprintError::write_failed("embedding bold font", e))?
                } else {
                    log::debug!("font family {} has no bold face", family.name());
                    regular.clone()
                };
                (regular, bold)
            }
            _ => {
                let regular = doc
                    .add_builtin_font(BuiltinFont::Helvetica)
                    .map_err(|e| CertprintError::write_failed("registering Helvetica", e))?;
                let bold = doc
                    .add_builtin_font(BuiltinFont::HelveticaBold)
                    .map_err(|e| CertprintError::write_failed("registering Helvetica-Bold", e))?;
                (regular, bold)
            }
        };

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            family,
            page,
        })
    }

    /// Serialize the document.
    pub fn finish(self) -> Result<Vec<u8>> {
        let mut writer = BufWriter::new(Vec::new());
        self.doc
            .save(&mut writer)
            .map_err(|e| CertprintError::write_failed("serializing PDF", e))?;
        writer
            .into_inner()
            .map_err(|e| CertprintError::write_failed("flushing PDF", e.error()))
    }

    fn font(&self, bold: bool) -> &IndirectFontRef {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }

    /// Emit `text` with its left edge at `x` and baseline at `y` (top-down mm).
    fn text_run(&self, text: &str, font_size: f64, bold: bool, x: f64, y: f64) {
        let text = if self.family.is_builtin() {
            latin1_only(text)
        } else {
            Cow::Borrowed(text)
        };
        self.layer.use_text(
            text,
            to_f32(font_size),
            mm(x),
            mm(self.page.height - y),
            self.font(bold),
        );
    }
}

impl RenderTarget for PdfTarget {
    fn kind(&self) -> TargetKind {
        TargetKind::Page
    }

    fn draw_background(
        &mut self,
        _layout: &Layout,
        image: &BackgroundImage,
        placement: ImagePlacement,
    ) -> Result<()> {
        if image.width == 0 || image.height == 0 {
            return Ok(());
        }
        let natural_width = f64::from(image.width) / IMAGE_DPI * MM_PER_INCH;
        let natural_height = f64::from(image.height) / IMAGE_DPI * MM_PER_INCH;

        let xobject = Image::from(ImageXObject {
            width: Px(image.width as usize),
            height: Px(image.height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: image.rgb.clone(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });

        xobject.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(mm(placement.x)),
                translate_y: Some(mm(self.page.height - placement.y - placement.height)),
                scale_x: Some(to_f32(placement.width / natural_width)),
                scale_y: Some(to_f32(placement.height / natural_height)),
                dpi: Some(to_f32(IMAGE_DPI)),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn place_text(&mut self, layout: &Layout, placed: &PlacedText) -> Result<()> {
        if !placed.wrap {
            let (x, y) = baseline_origin(layout, placed);
            self.text_run(&placed.text, placed.font_size, placed.bold, x, y);
            return Ok(());
        }

        let block = wrap_box(layout, placed);
        let lines = wrap_text(
            &self.family,
            &placed.text,
            block.width,
            placed.font_size,
            placed.bold,
        );
        let font_mm = points_to_mm(placed.font_size);
        for (i, line) in lines.iter().enumerate() {
            let top = block.y + block.line_height * i as f64;
            let baseline = top + block.line_height / 2.0 + WRAPPED_BASELINE_DROP * font_mm;
            self.text_run(line, placed.font_size, placed.bold, block.x, baseline);
        }
        Ok(())
    }
}

/// The built-in fonts only encode Latin-1; anything else becomes `?`.
fn latin1_only(text: &str) -> Cow<'_, str> {
    if text.chars().all(|c| u32::from(c) < 0x100) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| if u32::from(c) < 0x100 { c } else { '?' })
            .collect(),
    )
}

fn mm(value: f64) -> Mm {
    Mm(to_f32(value))
}

#[allow(clippy::cast_possible_truncation)]
fn to_f32(value: f64) -> f32 {
    value as f32
}
