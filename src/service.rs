//! Request-level entry point: record + request parameters → document bytes.
//!
//! A render picks the template (blank or preview), resolves its layout, loads
//! the background the variant calls for, drives the chosen target and stages
//! the result in a private temporary directory before handing the bytes back.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::config::RenderConfig;
use crate::error::{CertprintError, Result};
use crate::layout::Layout;
use crate::profile::TemplateVariant;
use crate::record::BaptismRecord;
use crate::render::{
    render, BackgroundImage, BackgroundPolicy, BackgroundSpec, PdfTarget, RenderReport,
    WorkbookTarget,
};
use crate::template::LayoutCache;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Title embedded in generated PDF documents.
const PDF_TITLE: &str = "Krstenica";

/// Output document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xlsx,
    Pdf,
}

impl OutputFormat {
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Xlsx => XLSX_CONTENT_TYPE,
            Self::Pdf => PDF_CONTENT_TYPE,
        }
    }

    /// Suggested download name.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Xlsx => "krstenica.xlsx",
            Self::Pdf => "krstenica.pdf",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = CertprintError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "xlsx" => Ok(Self::Xlsx),
            "pdf" => Ok(Self::Pdf),
            other => Err(CertprintError::Config(format!("unknown output format {other:?}"))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Xlsx => "xlsx",
            Self::Pdf => "pdf",
        })
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderRequest {
    pub format: OutputFormat,
    pub variant: TemplateVariant,
    /// Use the preview template instead of the blank one.
    pub preview: bool,
    /// Background image replacing the variant's default.
    pub background: Option<PathBuf>,
    /// Fitting policy replacing the variant's default.
    pub background_policy: Option<BackgroundPolicy>,
    /// Font family for page output; `None` uses the configured default.
    pub font_family: Option<String>,
}

/// A finished document.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: &'static str,
    pub report: RenderReport,
}

/// Renders certificates against a configuration, caching template layouts.
#[derive(Debug, Default)]
pub struct Renderer {
    config: RenderConfig,
    layouts: LayoutCache,
}

impl Renderer {
    #[must_use]
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            layouts: LayoutCache::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Render using the template the configuration points at.
    pub fn render(&self, record: &BaptismRecord, request: &RenderRequest) -> Result<RenderedDocument> {
        let path = self.config.template_path(request.preview);
        log::info!(
            "rendering {} ({}) from {}",
            request.format,
            request.variant,
            path.display()
        );
        let template = read_template(&path)?;
        self.render_template(&template, record, request)
    }

    /// Render against in-memory template bytes.
    pub fn render_template(
        &self,
        template: &[u8],
        record: &BaptismRecord,
        request: &RenderRequest,
    ) -> Result<RenderedDocument> {
        let layout = self.layouts.get_or_load(template)?;
        render_with_layout(&self.config, template, &layout, record, request)
    }
}

/// Render without a cache: the layout is resolved from `template` each call.
pub fn render_certificate(
    config: &RenderConfig,
    template: &[u8],
    record: &BaptismRecord,
    request: &RenderRequest,
) -> Result<RenderedDocument> {
    let layout = crate::template::load_layout_from_bytes(template)?;
    render_with_layout(config, template, &layout, record, request)
}

fn read_template(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        CertprintError::malformed(&format!("cannot read template {}", path.display()), e)
    })
}

fn render_with_layout(
    config: &RenderConfig,
    template: &[u8],
    layout: &Layout,
    record: &BaptismRecord,
    request: &RenderRequest,
) -> Result<RenderedDocument> {
    let profile = request.variant.profile();

    let background_path = request.background.clone().or_else(|| {
        if profile.uses_default_background {
            config.background_path()
        } else {
            None
        }
    });
    let image = background_path.as_deref().and_then(BackgroundImage::load);
    let policy = request.background_policy.unwrap_or(profile.background_policy);
    let background = image.as_ref().map(|image| BackgroundSpec { image, policy });

    let (bytes, report) = match request.format {
        OutputFormat::Pdf => {
            let family = config.font_family(request.font_family.as_deref())?;
            let mut target = PdfTarget::new(PDF_TITLE, config.page, family)?;
            let report = render(&mut target, layout, profile, record, background, config.page)?;
            (target.finish()?, report)
        }
        OutputFormat::Xlsx => {
            let mut target = WorkbookTarget::new(template.to_vec());
            let report = render(&mut target, layout, profile, record, background, config.page)?;
            (target.finish(layout)?, report)
        }
    };

    let bytes = stage(request.format, &bytes)?;
    Ok(RenderedDocument {
        bytes,
        content_type: request.format.content_type(),
        filename: request.format.file_name(),
        report,
    })
}

/// Write the document into a private temporary directory and read it back,
/// so only a completely written file is ever returned. The directory is
/// removed when this returns, on success or failure.
fn stage(format: OutputFormat, bytes: &[u8]) -> Result<Vec<u8>> {
    let dir = tempfile::Builder::new()
        .prefix("krstenica")
        .tempdir()
        .map_err(|e| CertprintError::write_failed("creating staging directory", e))?;
    let path = dir.path().join(format.file_name());
    std::fs::write(&path, bytes)
        .map_err(|e| CertprintError::write_failed(&format!("writing {}", path.display()), e))?;
    let staged = std::fs::read(&path)
        .map_err(|e| CertprintError::write_failed(&format!("reading {}", path.display()), e))?;
    if staged.len() != bytes.len() {
        return Err(CertprintError::OutputWriteFailed(format!(
            "incomplete write: {} of {} bytes",
            staged.len(),
            bytes.len()
        )));
    }
    log::debug!("staged {} bytes at {}", staged.len(), path.display());
    Ok(staged)
}
