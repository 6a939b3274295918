//! Static per-variant template tables.
//!
//! Each [`TemplateProfile`] bundles everything that differs between template
//! revisions: the field → cell map, the page-target composition rules and draw
//! order, the manual text offsets, the forced-wrap/bold sets and the
//! background defaults. A profile is chosen once per render and passed down;
//! nothing below the entry point branches on the variant.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::cell_ref::CellRef;
use crate::error::CertprintError;
use crate::fields::{Composition, Field};
use crate::render::BackgroundPolicy;

/// Manual `(dx, dy)` correction in millimeters, applied before print scaling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Offset {
    #[must_use]
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

/// Template revision selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateVariant {
    /// Original certificate form printed over the scanned background.
    #[default]
    Classic,
    /// Pre-printed form: no default background, content-box fitting.
    Form,
}

impl TemplateVariant {
    #[must_use]
    pub fn profile(self) -> &'static TemplateProfile {
        match self {
            Self::Classic => &CLASSIC,
            Self::Form => &FORM,
        }
    }
}

impl FromStr for TemplateVariant {
    type Err = CertprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "1" | "v1" | "classic" => Ok(Self::Classic),
            "2" | "v2" | "verzija2" | "version2" | "form" => Ok(Self::Form),
            other => Err(CertprintError::Config(format!(
                "unknown template variant {other:?}"
            ))),
        }
    }
}

impl fmt::Display for TemplateVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Classic => "classic",
            Self::Form => "form",
        })
    }
}

/// Immutable rendering configuration for one template revision.
#[derive(Debug)]
pub struct TemplateProfile {
    pub variant: TemplateVariant,
    /// Field → cell assignments shared by both output targets.
    pub cells: &'static [(Field, &'static str)],
    /// Merges applied before drawing on a page.
    pub page_compositions: &'static [Composition],
    /// Cells drawn on a page, in draw order. Values elsewhere are not drawn.
    pub page_order: &'static [&'static str],
    pub offsets: &'static [(&'static str, Offset)],
    pub default_offset: Offset,
    pub forced_wrap: &'static [&'static str],
    pub bold: &'static [&'static str],
    /// Cell whose font size sets the uniform page text size.
    pub anchor_cell: &'static str,
    /// Cell that shifts left by the given amount when it holds a four-digit year.
    pub year_shift: Option<(&'static str, f64)>,
    /// Whether the configured background image is used when the request
    /// names none.
    pub uses_default_background: bool,
    pub background_policy: BackgroundPolicy,
}

impl TemplateProfile {
    /// Manual offset for `cell`, or the profile default.
    #[must_use]
    pub fn offset(&self, cell: CellRef) -> Offset {
        self.offsets
            .iter()
            .find(|(reference, _)| CellRef::parse(reference) == Some(cell))
            .map_or(self.default_offset, |(_, offset)| *offset)
    }

    #[must_use]
    pub fn is_forced_wrap(&self, cell: CellRef) -> bool {
        contains(self.forced_wrap, cell)
    }

    #[must_use]
    pub fn is_bold(&self, cell: CellRef) -> bool {
        contains(self.bold, cell)
    }

    #[must_use]
    pub fn anchor(&self) -> Option<CellRef> {
        CellRef::parse(self.anchor_cell)
    }
}

fn contains(set: &[&str], cell: CellRef) -> bool {
    set.iter().any(|reference| CellRef::parse(reference) == Some(cell))
}

const CELLS: &[(Field, &str)] = &[
    (Field::Book, "C1"),
    (Field::Page, "C2"),
    (Field::CurrentNumber, "C3"),
    (Field::EparchyName, "C8"),
    (Field::TempleName, "C10"),
    (Field::TempleCity, "I10"),
    (Field::BaptismYear, "N10"),
    (Field::BirthDate, "F13"),
    (Field::PlaceOfBirth, "E16"),
    (Field::MunicipalityOfBirth, "G16"),
    (Field::BaptismDate, "E19"),
    (Field::TempleCity, "G24"),
    (Field::TempleName, "I24"),
    (Field::FirstName, "D27"),
    (Field::LastName, "F27"),
    (Field::Gender, "I27"),
    (Field::ParentFirstName, "F30"),
    (Field::ParentLastName, "I30"),
    (Field::ParentOccupation, "K30"),
    (Field::ParentCity, "F31"),
    (Field::ParentReligion, "I31"),
    (Field::BirthOrder, "I32"),
    (Field::ChurchMarried, "E36"),
    (Field::Twin, "E38"),
    (Field::PhysicalDisability, "I41"),
    (Field::PriestFirstName, "F43"),
    (Field::PriestLastName, "H43"),
    (Field::PriestTitle, "K43"),
    (Field::GodparentFirstName, "E48"),
    (Field::GodparentLastName, "G48"),
    (Field::GodparentOccupation, "I48"),
    (Field::GodparentCity, "E49"),
    (Field::GodparentReligion, "G49"),
    (Field::Anagrafa, "E51"),
    (Field::Comment, "C54"),
    (Field::CertificateNumber, "B62"),
    (Field::CertificateDayMonth, "B63"),
    (Field::CertificateYear, "C63"),
    (Field::CertificateTown, "B65"),
];

const PAGE_COMPOSITIONS: &[Composition] = &[
    Composition::Relocate { from: "C8", to: "F8" },
    Composition::Relocate { from: "E19", to: "F19" },
    Composition::Relocate { from: "E36", to: "I36" },
    Composition::Relocate { from: "E38", to: "I38" },
    Composition::NameWithQualifier {
        first: "F43",
        last: "H43",
        qualifier: "K43",
    },
    Composition::NameWithQualifier {
        first: "F30",
        last: "I30",
        qualifier: "K30",
    },
    Composition::Godparent {
        first: "E48",
        last: "G48",
        occupation: "I48",
    },
    Composition::Temple {
        city: "G24",
        name: "I24",
    },
    Composition::CityPreposition("F31"),
    Composition::TrailingSpace("I31"),
    Composition::CityPreposition("E49"),
    Composition::TrailingSpace("G49"),
];

const PAGE_ORDER: &[&str] = &[
    "C1", "C2", "C3", "F8", "C10", "I10", "N10", "F13", "E16", "F16", "G16", "F19", "G24", "I24",
    "D27", "F27", "I27", "F30", "I30", "K30", "F31", "I31", "I32", "K32", "I36", "I38", "I41",
    "F43", "H43", "K43", "E48", "G48", "E49", "G49", "E51", "C54", "B62", "B63", "C63", "B65",
];

const OFFSETS: &[(&str, Offset)] = &[
    ("C1", Offset::new(0.0, -8.0)),
    ("C2", Offset::new(0.0, -7.0)),
    ("C3", Offset::new(0.0, -3.5)),
    ("F8", Offset::new(12.0, -5.0)),
    ("C10", Offset::new(0.0, -6.0)),
    ("I10", Offset::new(10.6, -6.0)),
    ("N10", Offset::new(2.0, -6.0)),
    ("F13", Offset::new(12.0, -5.0)),
    ("E16", Offset::new(12.0, -3.0)),
    ("F16", Offset::new(12.0, -3.0)),
    ("G16", Offset::new(12.0, -3.0)),
    ("F19", Offset::new(12.0, 3.0)),
    ("G24", Offset::new(12.0, -6.0)),
    ("I24", Offset::new(12.0, -6.0)),
    ("D27", Offset::new(12.0, -8.0)),
    ("F27", Offset::new(12.0, -8.0)),
    ("I27", Offset::new(0.0, -8.0)),
    ("F30", Offset::new(12.0, -8.0)),
    ("I30", Offset::new(0.0, -8.0)),
    ("K30", Offset::new(0.0, -8.0)),
    ("F31", Offset::new(12.0, -7.0)),
    ("I31", Offset::new(0.0, -7.0)),
    ("I32", Offset::new(-10.0, 7.0)),
    ("I36", Offset::new(-10.0, -3.0)),
    ("I38", Offset::new(-10.0, 3.0)),
    ("I41", Offset::new(5.0, 1.0)),
    ("F43", Offset::new(12.0, 9.0)),
    ("H43", Offset::new(10.0, 9.0)),
    ("K43", Offset::new(0.0, 9.0)),
    ("E48", Offset::new(10.0, -2.0)),
    ("G48", Offset::new(10.0, -2.0)),
    ("E49", Offset::new(10.0, 0.0)),
    ("G49", Offset::new(10.0, 0.0)),
    ("E51", Offset::new(30.0, 7.0)),
    ("C54", Offset::new(20.0, 1.0)),
    ("B62", Offset::new(10.0, -2.0)),
    ("B63", Offset::new(0.0, 4.0)),
    ("C63", Offset::new(8.0, 4.0)),
    ("B65", Offset::new(2.0, 2.0)),
];

const DEFAULT_OFFSET: Offset = Offset::new(0.0, -0.9);

const FORCED_WRAP: &[&str] = &["C58"];

const BOLD: &[&str] = &["F27"];

const ANCHOR_CELL: &str = "C9";

const YEAR_SHIFT: Option<(&str, f64)> = Some(("N10", -8.0));

static CLASSIC: TemplateProfile = TemplateProfile {
    variant: TemplateVariant::Classic,
    cells: CELLS,
    page_compositions: PAGE_COMPOSITIONS,
    page_order: PAGE_ORDER,
    offsets: OFFSETS,
    default_offset: DEFAULT_OFFSET,
    forced_wrap: FORCED_WRAP,
    bold: BOLD,
    anchor_cell: ANCHOR_CELL,
    year_shift: YEAR_SHIFT,
    uses_default_background: true,
    background_policy: BackgroundPolicy::FillPage,
};

static FORM: TemplateProfile = TemplateProfile {
    variant: TemplateVariant::Form,
    cells: CELLS,
    page_compositions: PAGE_COMPOSITIONS,
    page_order: PAGE_ORDER,
    offsets: OFFSETS,
    default_offset: DEFAULT_OFFSET,
    forced_wrap: FORCED_WRAP,
    bold: BOLD,
    anchor_cell: ANCHOR_CELL,
    year_shift: YEAR_SHIFT,
    uses_default_background: false,
    background_policy: BackgroundPolicy::FillContentBox,
};
