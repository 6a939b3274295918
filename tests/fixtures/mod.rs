//! Builders for certificate templates created in memory.
//!
//! `TemplateBuilder` produces a minimal but valid XLSX package with one
//! worksheet: column widths, row heights, styled cells, page margins and a
//! print scale. Parts can be left out to exercise malformed templates.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]

use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

// ============================================================================
// Style Builder
// ============================================================================

/// Cell format: font size, wrap and weight.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFormat {
    pub font_size: f64,
    pub wrap: bool,
    pub bold: bool,
}

impl CellFormat {
    #[must_use]
    pub fn sized(font_size: f64) -> Self {
        Self {
            font_size,
            wrap: false,
            bold: false,
        }
    }

    #[must_use]
    pub fn wrap(mut self) -> Self {
        self.wrap = true;
        self
    }

    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

// ============================================================================
// Template Builder
// ============================================================================

#[derive(Debug, Clone)]
struct TemplateCell {
    cell_ref: String,
    value: Option<String>,
    format: Option<usize>,
}

/// Builder for a single-sheet template workbook.
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    default_col_width: Option<f64>,
    default_row_height: Option<f64>,
    col_widths: Vec<(u32, u32, f64)>,
    row_heights: Vec<(u32, f64)>,
    formats: Vec<CellFormat>,
    cells: Vec<TemplateCell>,
    margins: Option<(f64, f64, f64, f64)>,
    print_scale: Option<u32>,
    dimension: Option<String>,
    include_sheet: bool,
    include_styles: bool,
    with_drawing: bool,
}

impl Default for TemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_col_width: None,
            default_row_height: None,
            col_widths: Vec::new(),
            row_heights: Vec::new(),
            // format 0 is the workbook default
            formats: vec![CellFormat::sized(11.0)],
            cells: Vec::new(),
            margins: None,
            print_scale: None,
            dimension: None,
            include_sheet: true,
            include_styles: true,
            with_drawing: false,
        }
    }

    #[must_use]
    pub fn default_col_width(mut self, width: f64) -> Self {
        self.default_col_width = Some(width);
        self
    }

    #[must_use]
    pub fn default_row_height(mut self, height: f64) -> Self {
        self.default_row_height = Some(height);
        self
    }

    #[must_use]
    pub fn col_width(mut self, min: u32, max: u32, width: f64) -> Self {
        self.col_widths.push((min, max, width));
        self
    }

    #[must_use]
    pub fn row_height(mut self, row: u32, height: f64) -> Self {
        self.row_heights.push((row, height));
        self
    }

    /// Register a cell format and return the builder plus its index.
    #[must_use]
    pub fn format(mut self, format: CellFormat) -> (Self, usize) {
        self.formats.push(format);
        let index = self.formats.len() - 1;
        (self, index)
    }

    /// An empty cell carrying format `format`.
    #[must_use]
    pub fn styled_cell(mut self, cell_ref: &str, format: usize) -> Self {
        self.cells.push(TemplateCell {
            cell_ref: cell_ref.to_string(),
            value: None,
            format: Some(format),
        });
        self
    }

    /// A cell with template text (as an inline string).
    #[must_use]
    pub fn text_cell(mut self, cell_ref: &str, text: &str) -> Self {
        self.cells.push(TemplateCell {
            cell_ref: cell_ref.to_string(),
            value: Some(text.to_string()),
            format: None,
        });
        self
    }

    /// Margins in inches: left, right, top, bottom.
    #[must_use]
    pub fn margins(mut self, left: f64, right: f64, top: f64, bottom: f64) -> Self {
        self.margins = Some((left, right, top, bottom));
        self
    }

    #[must_use]
    pub fn print_scale(mut self, percent: u32) -> Self {
        self.print_scale = Some(percent);
        self
    }

    #[must_use]
    pub fn dimension(mut self, range: &str) -> Self {
        self.dimension = Some(range.to_string());
        self
    }

    #[must_use]
    pub fn without_sheet(mut self) -> Self {
        self.include_sheet = false;
        self
    }

    #[must_use]
    pub fn without_styles(mut self) -> Self {
        self.include_styles = false;
        self
    }

    /// Pretend the sheet already has a drawing part.
    #[must_use]
    pub fn with_drawing(mut self) -> Self {
        self.with_drawing = true;
        self
    }

    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut buf);
            let options = FileOptions::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(CONTENT_TYPES.as_bytes()).unwrap();

            zip.start_file("_rels/.rels", options).unwrap();
            zip.write_all(ROOT_RELS.as_bytes()).unwrap();

            zip.start_file("xl/workbook.xml", options).unwrap();
            zip.write_all(WORKBOOK.as_bytes()).unwrap();

            zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
            zip.write_all(WORKBOOK_RELS.as_bytes()).unwrap();

            if self.include_sheet {
                zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
                zip.write_all(self.sheet_xml().as_bytes()).unwrap();
            }

            if self.include_styles {
                zip.start_file("xl/styles.xml", options).unwrap();
                zip.write_all(self.styles_xml().as_bytes()).unwrap();
            }

            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    fn sheet_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );
        if let Some(ref range) = self.dimension {
            xml.push_str(&format!(r#"<dimension ref="{range}"/>"#));
        }

        let mut format_pr = String::new();
        if let Some(width) = self.default_col_width {
            format_pr.push_str(&format!(r#" defaultColWidth="{width}""#));
        }
        if let Some(height) = self.default_row_height {
            format_pr.push_str(&format!(r#" defaultRowHeight="{height}""#));
        }
        if !format_pr.is_empty() {
            xml.push_str(&format!("<sheetFormatPr{format_pr}/>"));
        }

        if !self.col_widths.is_empty() {
            xml.push_str("<cols>");
            for (min, max, width) in &self.col_widths {
                xml.push_str(&format!(
                    r#"<col min="{min}" max="{max}" width="{width}" customWidth="1"/>"#
                ));
            }
            xml.push_str("</cols>");
        }

        xml.push_str("<sheetData>");
        let mut rows: Vec<u32> = self
            .cells
            .iter()
            .map(|c| row_of(&c.cell_ref))
            .chain(self.row_heights.iter().map(|(r, _)| *r))
            .collect();
        rows.sort_unstable();
        rows.dedup();
        for row in rows {
            match self.row_heights.iter().find(|(r, _)| *r == row) {
                Some((_, height)) => {
                    xml.push_str(&format!(r#"<row r="{row}" ht="{height}" customHeight="1">"#));
                }
                None => xml.push_str(&format!(r#"<row r="{row}">"#)),
            }
            let mut cells: Vec<&TemplateCell> =
                self.cells.iter().filter(|c| row_of(&c.cell_ref) == row).collect();
            cells.sort_by_key(|c| col_of(&c.cell_ref));
            for cell in cells {
                let style = cell.format.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
                match cell.value {
                    Some(ref text) => xml.push_str(&format!(
                        r#"<c r="{}"{style} t="inlineStr"><is><t>{text}</t></is></c>"#,
                        cell.cell_ref
                    )),
                    None => xml.push_str(&format!(r#"<c r="{}"{style}/>"#, cell.cell_ref)),
                }
            }
            xml.push_str("</row>");
        }
        xml.push_str("</sheetData>");

        if let Some((left, right, top, bottom)) = self.margins {
            xml.push_str(&format!(
                r#"<pageMargins left="{left}" right="{right}" top="{top}" bottom="{bottom}" header="0.3" footer="0.3"/>"#
            ));
        }
        if let Some(scale) = self.print_scale {
            xml.push_str(&format!(r#"<pageSetup paperSize="9" scale="{scale}" orientation="portrait"/>"#));
        }
        if self.with_drawing {
            xml.push_str(r#"<drawing r:id="rId9"/>"#);
        }
        xml.push_str("</worksheet>");
        xml
    }

    fn styles_xml(&self) -> String {
        let mut fonts = String::new();
        let mut xfs = String::new();
        for (i, format) in self.formats.iter().enumerate() {
            let bold = if format.bold { "<b/>" } else { "" };
            fonts.push_str(&format!(
                r#"<font>{bold}<sz val="{}"/><name val="Times New Roman"/></font>"#,
                format.font_size
            ));
            if format.wrap {
                xfs.push_str(&format!(
                    r#"<xf numFmtId="0" fontId="{i}" fillId="0" borderId="0" xfId="0" applyAlignment="1"><alignment wrapText="1"/></xf>"#
                ));
            } else {
                xfs.push_str(&format!(
                    r#"<xf numFmtId="0" fontId="{i}" fillId="0" borderId="0" xfId="0"/>"#
                ));
            }
        }
        let count = self.formats.len();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="{count}">{fonts}</fonts>
<fills count="1"><fill><patternFill patternType="none"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="{count}">{xfs}</cellXfs>
</styleSheet>"#
        )
    }
}

fn split_ref(cell_ref: &str) -> (String, u32) {
    let letters: String = cell_ref.chars().take_while(char::is_ascii_alphabetic).collect();
    let row = cell_ref[letters.len()..].parse().unwrap();
    (letters, row)
}

fn row_of(cell_ref: &str) -> u32 {
    split_ref(cell_ref).1
}

fn col_of(cell_ref: &str) -> u32 {
    split_ref(cell_ref)
        .0
        .bytes()
        .fold(0, |acc, b| acc * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1))
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Krstenica" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// A template shaped like the real certificate: 14 columns, 60 rows, an
/// anchor font of 12pt at C9 and a wrapped comment cell.
#[must_use]
pub fn certificate_template() -> Vec<u8> {
    let builder = TemplateBuilder::new()
        .default_col_width(9.0)
        .default_row_height(15.0)
        .col_width(1, 1, 4.0)
        .row_height(58, 45.0)
        .margins(0.3, 0.3, 0.4, 0.4)
        .print_scale(90)
        .dimension("A1:N60");
    let (builder, anchor) = builder.format(CellFormat::sized(12.0));
    let (builder, wrapped) = builder.format(CellFormat::sized(10.0).wrap());
    builder
        .styled_cell("C9", anchor)
        .styled_cell("F27", anchor)
        .styled_cell("C58", wrapped)
        .text_cell("A1", "Књига")
        .build()
}

// ============================================================================
// Package inspection
// ============================================================================

/// Read one entry of a package, if present.
#[must_use]
pub fn read_entry(data: &[u8], name: &str) -> Option<String> {
    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut file = archive.by_name(name).ok()?;
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    Some(text)
}

/// Names of all entries in a package.
#[must_use]
pub fn entry_names(data: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(data)).unwrap();
    archive.file_names().map(String::from).collect()
}

/// A small solid-color PNG.
#[must_use]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([240, 230, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}
