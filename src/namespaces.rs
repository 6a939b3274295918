//! Namespace, relationship type and content type constants for the parts the
//! workbook writer adds to a template package.

/// Package relationships namespace, used by every `.rels` part
pub const NS_PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";

/// Office document relationships namespace, bound to the `r:` prefix
pub const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// DrawingML main namespace
pub const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

/// DrawingML spreadsheet drawing namespace
pub const NS_DRAWING_SPREADSHEET: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";

// =============================================================================
// Relationship types
// =============================================================================

/// Worksheet -> drawing part
pub const REL_DRAWING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";

/// Drawing -> image media
pub const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

// =============================================================================
// Content types
// =============================================================================

/// Package part listing content types
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Drawing part content type
pub const CT_DRAWING: &str = "application/vnd.openxmlformats-officedocument.drawing+xml";

/// Content type for an image file extension.
pub fn image_content_type(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "image/png",
    }
}
