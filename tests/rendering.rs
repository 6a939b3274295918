//! End-to-end rendering tests for certprint
//!
//! Drives `render_certificate` and `Renderer` for both output formats and
//! inspects the produced packages and documents.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

mod fixtures;

use std::path::PathBuf;

use certprint::{
    render_certificate, BackgroundPolicy, BaptismRecord, OutputFormat, RenderConfig,
    RenderRequest, Renderer, TemplateVariant,
};
use fixtures::{certificate_template, entry_names, png_bytes, read_entry, TemplateBuilder};

const SHEET: &str = "xl/worksheets/sheet1.xml";

fn record() -> BaptismRecord {
    BaptismRecord {
        book: "7".to_string(),
        page: 112,
        first_name: "Марија".to_string(),
        last_name: "Петровић".to_string(),
        comment: "Крштена у <капели> & храму".to_string(),
        ..BaptismRecord::default()
    }
}

/// Configuration that never touches fonts or images outside the test.
fn isolated_config() -> RenderConfig {
    RenderConfig {
        background: None,
        default_font: "Helvetica".to_string(),
        ..RenderConfig::default()
    }
}

fn write_png(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("pozadina.png");
    std::fs::write(&path, png_bytes(40, 60)).unwrap();
    path
}

#[test]
fn test_xlsx_contains_values_as_inline_strings() {
    let doc = render_certificate(
        &isolated_config(),
        &certificate_template(),
        &record(),
        &RenderRequest::default(),
    )
    .unwrap();

    assert_eq!(doc.filename, "krstenica.xlsx");
    assert_eq!(doc.content_type, OutputFormat::Xlsx.content_type());
    assert!(!doc.report.background_applied);

    let sheet = read_entry(&doc.bytes, SHEET).unwrap();
    assert!(sheet.contains(r#"<c r="C1" t="inlineStr"><is><t xml:space="preserve">7</t></is></c>"#));
    assert!(sheet.contains(r#"<t xml:space="preserve">112</t>"#));
    assert!(sheet.contains(r#"<t xml:space="preserve">Марија</t>"#));
    assert!(sheet.contains("Крштена у &lt;капели&gt; &amp; храму"));
    // template text outside the mapped cells is kept
    assert!(sheet.contains("Књига"));
    // page-only merges do not happen in the workbook
    assert!(!sheet.contains("Марија Петровић"));
}

#[test]
fn test_xlsx_keeps_untouched_parts() {
    let template = certificate_template();
    let doc = render_certificate(&isolated_config(), &template, &record(), &RenderRequest::default())
        .unwrap();

    for name in ["xl/workbook.xml", "xl/_rels/workbook.xml.rels", "_rels/.rels"] {
        assert_eq!(read_entry(&doc.bytes, name), read_entry(&template, name), "{name}");
    }
}

#[test]
fn test_xlsx_bold_cell_gets_cloned_format() {
    let doc = render_certificate(
        &isolated_config(),
        &certificate_template(),
        &record(),
        &RenderRequest::default(),
    )
    .unwrap();

    // F27 uses format 1 (12pt); its bold clone is appended as format 3
    let sheet = read_entry(&doc.bytes, SHEET).unwrap();
    assert!(sheet.contains(r#"<c r="F27" s="3" t="inlineStr">"#), "{sheet}");

    let styles = read_entry(&doc.bytes, "xl/styles.xml").unwrap();
    assert!(styles.contains(r#"<fonts count="4">"#));
    assert!(styles.contains(r#"<cellXfs count="4">"#));
    assert!(styles.contains(r#"<font><b/><sz val="12"/><name val="Times New Roman"/></font>"#));
}

#[test]
fn test_xlsx_background_adds_drawing() {
    let dir = tempfile::tempdir().unwrap();
    let request = RenderRequest {
        background: Some(write_png(&dir)),
        ..RenderRequest::default()
    };
    let doc = render_certificate(&isolated_config(), &certificate_template(), &record(), &request)
        .unwrap();

    assert!(doc.report.background_applied);
    let names = entry_names(&doc.bytes);
    for part in [
        "xl/media/image1.png",
        "xl/drawings/drawing1.xml",
        "xl/drawings/_rels/drawing1.xml.rels",
        "xl/worksheets/_rels/sheet1.xml.rels",
    ] {
        assert!(names.iter().any(|n| n == part), "missing {part}: {names:?}");
    }

    let sheet = read_entry(&doc.bytes, SHEET).unwrap();
    assert!(sheet.contains(r#"<drawing r:id="rId1"/></worksheet>"#), "{sheet}");
    let types = read_entry(&doc.bytes, "[Content_Types].xml").unwrap();
    assert!(types.contains(r#"Extension="png""#));
    assert!(types.contains("/xl/drawings/drawing1.xml"));
}

#[test]
fn test_xlsx_existing_drawing_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let request = RenderRequest {
        background: Some(write_png(&dir)),
        ..RenderRequest::default()
    };
    let template = TemplateBuilder::new().dimension("A1:N60").with_drawing().build();
    let doc = render_certificate(&isolated_config(), &template, &record(), &request).unwrap();

    assert!(!entry_names(&doc.bytes).iter().any(|n| n.starts_with("xl/media/")));
    let sheet = read_entry(&doc.bytes, SHEET).unwrap();
    assert_eq!(sheet.matches("<drawing ").count(), 1);
}

#[test]
fn test_pdf_with_missing_background() {
    let request = RenderRequest {
        format: OutputFormat::Pdf,
        background: Some(PathBuf::from("/nonexistent/krstenica_obrada.jpg")),
        ..RenderRequest::default()
    };
    let doc = render_certificate(&isolated_config(), &certificate_template(), &record(), &request)
        .unwrap();

    assert!(doc.bytes.starts_with(b"%PDF"));
    assert_eq!(doc.filename, "krstenica.pdf");
    assert_eq!(doc.content_type, "application/pdf");
    assert!(!doc.report.background_applied);
    assert!(!doc.report.placed_cells.is_empty());
}

#[test]
fn test_pdf_with_background_under_both_policies() {
    let dir = tempfile::tempdir().unwrap();
    for policy in [BackgroundPolicy::FillPage, BackgroundPolicy::FillContentBox] {
        let request = RenderRequest {
            format: OutputFormat::Pdf,
            background: Some(write_png(&dir)),
            background_policy: Some(policy),
            ..RenderRequest::default()
        };
        let doc =
            render_certificate(&isolated_config(), &certificate_template(), &record(), &request)
                .unwrap();
        assert!(doc.bytes.starts_with(b"%PDF"), "{policy:?}");
        assert!(doc.report.background_applied);
    }
}

#[test]
fn test_form_variant_skips_default_background() {
    let dir = tempfile::tempdir().unwrap();
    let config = RenderConfig {
        background: Some(write_png(&dir)),
        ..isolated_config()
    };

    let classic = render_certificate(&config, &certificate_template(), &record(), &RenderRequest::default())
        .unwrap();
    assert!(classic.report.background_applied);

    let request = RenderRequest {
        variant: TemplateVariant::Form,
        ..RenderRequest::default()
    };
    let form = render_certificate(&config, &certificate_template(), &record(), &request).unwrap();
    assert!(!form.report.background_applied);
}

#[test]
fn test_unknown_requested_font_is_a_config_error() {
    let request = RenderRequest {
        format: OutputFormat::Pdf,
        font_family: Some("NoSuchFamily".to_string()),
        ..RenderRequest::default()
    };
    let err = render_certificate(&isolated_config(), &certificate_template(), &record(), &request)
        .unwrap_err();
    assert!(matches!(err, certprint::CertprintError::Config(_)), "{err}");
}

#[test]
fn test_malformed_template_fails_both_formats() {
    let template = TemplateBuilder::new().without_sheet().build();
    for format in [OutputFormat::Xlsx, OutputFormat::Pdf] {
        let request = RenderRequest {
            format,
            ..RenderRequest::default()
        };
        let err = render_certificate(&isolated_config(), &template, &record(), &request).unwrap_err();
        assert!(err.is_template_error(), "{format}: {err}");
    }
}

#[test]
fn test_renderer_reads_configured_templates() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("krstenica-template.xlsx"), certificate_template()).unwrap();
    let preview = TemplateBuilder::new().dimension("A1:N60").text_cell("A1", "Преглед").build();
    std::fs::write(dir.path().join("krstenica-template-empty.xlsx"), preview).unwrap();

    let renderer = Renderer::new(RenderConfig {
        template_dir: dir.path().to_path_buf(),
        ..isolated_config()
    });

    let blank = renderer.render(&record(), &RenderRequest::default()).unwrap();
    assert!(read_entry(&blank.bytes, SHEET).unwrap().contains("Књига"));

    let request = RenderRequest {
        preview: true,
        ..RenderRequest::default()
    };
    let preview = renderer.render(&record(), &request).unwrap();
    assert!(read_entry(&preview.bytes, SHEET).unwrap().contains("Преглед"));
}
