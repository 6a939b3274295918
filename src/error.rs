//! Structured error types for certprint.
//!
//! Only fatal conditions are represented here. Cells that fail to resolve and
//! background images that cannot be read are logged and reported through
//! [`crate::render::RenderReport`] instead of aborting a render.

/// All errors that can occur while loading templates and rendering certificates.
#[derive(Debug, thiserror::Error)]
pub enum CertprintError {
    /// The template container is unreadable, or its sheet or style document is
    /// missing or not well-formed markup.
    #[error("Template malformed: {0}")]
    TemplateMalformed(String),

    /// Staging or writing the rendered output failed.
    #[error("Output write failed: {0}")]
    OutputWriteFailed(String),

    /// Invalid cell reference.
    #[error("Invalid cell reference: {0}")]
    InvalidCellRef(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration: {0}")]
    Config(String),

    /// The input record could not be decoded.
    #[error("Record: {0}")]
    Record(String),

    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON (de)serialization error.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CertprintError>;

impl CertprintError {
    /// Wrap any displayable failure as a malformed-template error.
    pub(crate) fn malformed(context: &str, err: impl std::fmt::Display) -> Self {
        Self::TemplateMalformed(format!("{context}: {err}"))
    }

    /// Wrap any displayable failure as an output write failure.
    pub(crate) fn write_failed(context: &str, err: impl std::fmt::Display) -> Self {
        Self::OutputWriteFailed(format!("{context}: {err}"))
    }

    /// True for errors that mean the template itself cannot be used.
    #[must_use]
    pub fn is_template_error(&self) -> bool {
        matches!(self, Self::TemplateMalformed(_))
    }
}
