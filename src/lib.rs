//! certprint - template-driven baptism certificate renderer
//!
//! Fills a certificate record into an XLSX template and produces either the
//! filled workbook or a single PDF page laid out from the template's own
//! geometry:
//! - Column widths, row heights, margins and print scale converted to millimeters
//! - Per-cell font size and wrap flags from the stylesheet
//! - Record fields mapped to cells, with per-template composition rules
//! - Background image fitted under two policies
//!
//! # Usage
//!
//! ```no_run
//! use certprint::{BaptismRecord, OutputFormat, RenderConfig, RenderRequest, Renderer};
//!
//! # fn main() -> certprint::Result<()> {
//! let renderer = Renderer::new(RenderConfig::from_env());
//! let record = BaptismRecord::from_json(r#"{"first_name": "Марко"}"#.as_bytes())?;
//! let request = RenderRequest {
//!     format: OutputFormat::Pdf,
//!     ..RenderRequest::default()
//! };
//! let document = renderer.render(&record, &request)?;
//! std::fs::write(document.filename, &document.bytes)?;
//! # Ok(())
//! # }
//! ```

// Template parsing
pub mod cell_ref;
pub mod error;
pub mod layout;
pub(crate) mod namespaces;
pub mod template;
pub mod units;
pub(crate) mod xml_helpers;

// Record mapping
pub mod fields;
pub mod profile;
pub mod record;

// Output
mod export;
pub mod fonts;
pub mod render;

// Request plumbing
pub mod config;
pub mod service;

pub use cell_ref::CellRef;
pub use config::RenderConfig;
pub use error::{CertprintError, Result};
pub use export::CellEdit;
pub use fields::{Field, FieldValues};
pub use fonts::FontFamily;
pub use layout::{CellStyle, Layout, Margins, Rect};
pub use profile::{TemplateProfile, TemplateVariant};
pub use record::BaptismRecord;
pub use render::{
    fit_background, render, BackgroundImage, BackgroundPolicy, BackgroundSpec, ImagePlacement,
    PageSize, PdfTarget, PlacedText, RenderReport, RenderTarget, TargetKind, WorkbookTarget,
};
pub use service::{
    render_certificate, OutputFormat, RenderRequest, RenderedDocument, Renderer,
};
pub use template::{load_layout, load_layout_from_bytes, LayoutCache};

/// Get the library version
#[must_use]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
