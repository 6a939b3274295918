//! Record → cell mapping tests for certprint
//!
//! Runs full records through both target kinds and checks which cells end up
//! holding which text.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

mod fixtures;

use certprint::{
    load_layout_from_bytes, render, BackgroundImage, BaptismRecord, CellRef, FieldValues,
    ImagePlacement, Layout, PageSize, PlacedText, RenderTarget, TargetKind, TemplateVariant,
    WorkbookTarget,
};
use fixtures::certificate_template;

/// Page target that keeps everything it is given.
struct PageRecorder {
    texts: Vec<PlacedText>,
}

impl RenderTarget for PageRecorder {
    fn kind(&self) -> TargetKind {
        TargetKind::Page
    }

    fn draw_background(
        &mut self,
        _: &Layout,
        _: &BackgroundImage,
        _: ImagePlacement,
    ) -> certprint::Result<()> {
        Ok(())
    }

    fn place_text(&mut self, _: &Layout, text: &PlacedText) -> certprint::Result<()> {
        self.texts.push(text.clone());
        Ok(())
    }
}

impl PageRecorder {
    fn at(&self, reference: &str) -> Option<&PlacedText> {
        let cell = CellRef::parse(reference).unwrap();
        self.texts.iter().find(|t| t.cell == cell)
    }
}

fn full_record() -> BaptismRecord {
    BaptismRecord::from_json(
        r#"{
            "book": "12",
            "page": 47,
            "current_number": 5,
            "eparhija_name": "Епархија бачка",
            "tample_name": "Храм Св. Георгија",
            "tample_city": "Нови Сад",
            "parent_first_name": "Петар",
            "parent_last_name": "Петровић",
            "parent_occupation": "столар",
            "parent_city": "Суботица",
            "parent_religion": "православна",
            "godfather_first_name": "Милан",
            "godfather_last_name": "Милић",
            "godfather_city": "Сомбор",
            "priest_first_name": "Сава",
            "priest_last_name": "Савић",
            "priest_title": "протојереј",
            "first_name": "Марија",
            "last_name": "Петровић",
            "gender": "z",
            "birth_date": "2023-04-02T10:30:00Z",
            "place_of_birthday": "Нови Сад",
            "municipality_of_birthday": "Нови Сад",
            "baptism": "1998-05-10T11:00:00Z",
            "number_of_certificate": 301,
            "certificate": "2024-01-15",
            "town_of_certificate": "Нови Сад"
        }"#
        .as_bytes(),
    )
    .unwrap()
}

fn page_render(record: &BaptismRecord) -> PageRecorder {
    let layout = load_layout_from_bytes(&certificate_template()).unwrap();
    let mut target = PageRecorder { texts: Vec::new() };
    render(
        &mut target,
        &layout,
        TemplateVariant::Classic.profile(),
        record,
        None,
        PageSize::A4,
    )
    .unwrap();
    target
}

#[test]
fn test_zero_page_is_not_drawn() {
    let record = BaptismRecord {
        page: 0,
        first_name: "Марко".to_string(),
        ..BaptismRecord::default()
    };
    let target = page_render(&record);
    assert!(target.at("C2").is_none());
    assert_eq!(target.at("D27").unwrap().text, "Марко");
}

#[test]
fn test_equal_place_and_municipality_collapse() {
    let target = page_render(&full_record());
    assert!(target.at("E16").is_none());
    assert_eq!(target.at("G16").unwrap().text, "Нови Сад");
}

#[test]
fn test_distinct_place_and_municipality_both_drawn() {
    let record = BaptismRecord {
        place_of_birth: "Каћ".to_string(),
        municipality_of_birth: "Нови Сад".to_string(),
        ..BaptismRecord::default()
    };
    let target = page_render(&record);
    assert_eq!(target.at("E16").unwrap().text, "Каћ");
    assert_eq!(target.at("G16").unwrap().text, "Нови Сад");
}

#[test]
fn test_page_compositions() {
    let target = page_render(&full_record());

    assert_eq!(target.at("F8").unwrap().text, "Епархија бачка");
    assert_eq!(target.at("G24").unwrap().text, "Нови Сад, Храм Св. Георгија");
    assert!(target.at("I24").is_none());
    assert_eq!(target.at("F30").unwrap().text, "Петар Петровић, столар");
    assert_eq!(target.at("F31").unwrap().text, "из Суботица");
    assert_eq!(target.at("I31").unwrap().text, "православна ");
    assert_eq!(target.at("F43").unwrap().text, "Сава Савић, протојереј");
    assert_eq!(target.at("E48").unwrap().text, "Милан Милић,");
    assert_eq!(target.at("E49").unwrap().text, "из Сомбора");
    assert_eq!(target.at("I27").unwrap().text, "Женско");
    assert_eq!(target.at("F19").unwrap().text, "1998, 05, 10, 11:00");
    assert_eq!(target.at("N10").unwrap().text, "1998");
    assert_eq!(target.at("B63").unwrap().text, "15.01.");
    assert_eq!(target.at("C63").unwrap().text, "24");
}

#[test]
fn test_page_text_is_uniform_and_bold_where_marked() {
    let target = page_render(&full_record());
    let size = target.texts[0].font_size;
    assert!(target.texts.iter().all(|t| (t.font_size - size).abs() < 1e-9));
    // 12pt anchor, enlarged for the page, then print scale 0.9
    assert!((size - 12.0 * 4.0 / 3.0 * 0.9).abs() < 1e-9);

    assert!(target.at("F27").unwrap().bold);
    assert!(!target.at("D27").unwrap().bold);
}

#[test]
fn test_page_order_is_followed() {
    let target = page_render(&full_record());
    let order: Vec<String> = target.texts.iter().map(|t| t.cell.to_string()).collect();
    let profile = TemplateVariant::Classic.profile();
    let expected: Vec<&str> = profile
        .page_order
        .iter()
        .copied()
        .filter(|r| order.iter().any(|o| o == r))
        .collect();
    assert_eq!(order, expected);
}

#[test]
fn test_workbook_target_receives_raw_values() {
    let bytes = certificate_template();
    let layout = load_layout_from_bytes(&bytes).unwrap();
    let mut target = WorkbookTarget::new(bytes);
    let report = render(
        &mut target,
        &layout,
        TemplateVariant::Classic.profile(),
        &full_record(),
        None,
        PageSize::A4,
    )
    .unwrap();

    let text = |reference: &str| {
        let cell = CellRef::parse(reference).unwrap();
        target
            .edits()
            .iter()
            .find(|e| e.cell == cell)
            .map(|e| e.text.clone())
    };
    assert_eq!(text("C8").as_deref(), Some("Епархија бачка"));
    assert_eq!(text("F30").as_deref(), Some("Петар"));
    assert_eq!(text("I30").as_deref(), Some("Петровић"));
    assert_eq!(text("F31").as_deref(), Some("Суботица"));
    assert!(text("E16").is_none());
    assert_eq!(report.placed_cells.len(), target.edits().len());
    assert!(report.skipped_cells.is_empty());
}

#[test]
fn test_field_values_drop_blank_fields() {
    let record = BaptismRecord {
        comment: "  \t ".to_string(),
        anagrafa: String::new(),
        ..BaptismRecord::default()
    };
    let values = FieldValues::from_record(&record, TemplateVariant::Form.profile().cells);
    assert!(values.get_ref("C54").is_none());
    assert!(values.get_ref("E51").is_none());
    assert!(values.iter().all(|(_, text)| !text.trim().is_empty()));
}
