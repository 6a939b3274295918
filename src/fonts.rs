//! Fonts for the page target: loading, validation and text measurement.

use std::path::Path;

use ttf_parser::Face;

use crate::error::{CertprintError, Result};
use crate::render::TextMeasure;
use crate::units::MM_PER_POINT;

/// A regular/bold pair of TrueType faces, or the built-in Helvetica when no
/// font files are configured.
#[derive(Clone)]
pub struct FontFamily {
    name: String,
    regular: Option<Vec<u8>>,
    bold: Option<Vec<u8>>,
}

impl std::fmt::Debug for FontFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontFamily")
            .field("name", &self.name)
            .field("embedded", &self.regular.is_some())
            .field("bold", &self.bold.is_some())
            .finish()
    }
}

impl FontFamily {
    /// The PDF base-14 Helvetica family. Covers Latin text only.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            name: "Helvetica".to_string(),
            regular: None,
            bold: None,
        }
    }

    /// Build a family from in-memory TrueType data. Both faces are parsed
    /// once up front so a broken font fails here, not mid-render.
    pub fn from_bytes(name: &str, regular: Vec<u8>, bold: Option<Vec<u8>>) -> Result<Self> {
        validate_face(name, &regular)?;
        if let Some(ref bold) = bold {
            validate_face(name, bold)?;
        }
        Ok(Self {
            name: name.to_string(),
            regular: Some(regular),
            bold,
        })
    }

    /// Load a family from font files.
    pub fn from_files(name: &str, regular: &Path, bold: Option<&Path>) -> Result<Self> {
        let read = |path: &Path| {
            std::fs::read(path).map_err(|e| {
                CertprintError::Config(format!("font {name}: cannot read {}: {e}", path.display()))
            })
        };
        let regular = read(regular)?;
        let bold = bold.map(read).transpose()?;
        Self::from_bytes(name, regular, bold)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.regular.is_none()
    }

    /// TrueType bytes for the requested weight. Bold falls back to regular
    /// when the family has no bold face.
    #[must_use]
    pub fn face_bytes(&self, bold: bool) -> Option<&[u8]> {
        if bold {
            self.bold.as_deref().or(self.regular.as_deref())
        } else {
            self.regular.as_deref()
        }
    }

    #[must_use]
    pub fn has_bold_face(&self) -> bool {
        self.bold.is_some() || self.regular.is_none()
    }
}

fn validate_face(name: &str, data: &[u8]) -> Result<()> {
    Face::parse(data, 0)
        .map(|_| ())
        .map_err(|e| CertprintError::Config(format!("font {name}: {e}")))
}

impl TextMeasure for FontFamily {
    fn text_width(&self, text: &str, font_size_pt: f64, bold: bool) -> f64 {
        let em_units = self
            .face_bytes(bold)
            .and_then(|data| Face::parse(data, 0).ok())
            .map_or_else(|| helvetica_em_width(text, bold), |face| face_em_width(&face, text));
        em_units * font_size_pt * MM_PER_POINT
    }
}

/// Advance width of `text` in ems. Missing glyphs count half an em.
fn face_em_width(face: &Face<'_>, text: &str) -> f64 {
    let units_per_em = f64::from(face.units_per_em().max(1));
    let total: f64 = text
        .chars()
        .map(|c| {
            face.glyph_index(c)
                .and_then(|gid| face.glyph_hor_advance(gid))
                .map_or(units_per_em / 2.0, f64::from)
        })
        .sum();
    total / units_per_em
}

/// Approximate Helvetica advance widths in ems.
fn helvetica_em_width(text: &str, bold: bool) -> f64 {
    let total: f64 = text
        .chars()
        .map(|c| match c {
            ' ' => 278.0,
            '0'..='9' => 556.0,
            'I' | 'J' => 278.0,
            'M' | 'W' => 833.0,
            'A'..='Z' => 667.0,
            'f' | 'i' | 'j' | 'l' | 't' => 278.0,
            'm' | 'w' => 833.0,
            '!'..='/' | ':'..='@' | '['..='`' => 333.0,
            _ => 556.0,
        })
        .sum();
    let weight = if bold { 1.06 } else { 1.0 };
    total * weight / 1000.0
}
