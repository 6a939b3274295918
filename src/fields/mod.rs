//! Record → cell value mapping.
//!
//! A [`crate::profile::TemplateProfile`] lists which [`Field`] goes into which
//! cell. [`FieldValues::from_record`] formats every mapped field and drops the
//! empty ones; [`FieldValues::apply`] then runs the target-specific
//! [`Composition`] rules that merge neighbouring cells into one string.

pub mod compose;
pub mod format;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cell_ref::CellRef;
use crate::record::BaptismRecord;

/// A displayable value derived from a [`BaptismRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Book,
    Page,
    CurrentNumber,
    EparchyName,
    TempleName,
    TempleCity,
    BirthDate,
    PlaceOfBirth,
    MunicipalityOfBirth,
    BaptismDate,
    BaptismYear,
    FirstName,
    LastName,
    Gender,
    ParentFirstName,
    ParentLastName,
    ParentOccupation,
    ParentCity,
    ParentReligion,
    BirthOrder,
    ChurchMarried,
    Twin,
    PhysicalDisability,
    PriestFirstName,
    PriestLastName,
    PriestTitle,
    GodparentFirstName,
    GodparentLastName,
    GodparentOccupation,
    GodparentCity,
    GodparentReligion,
    Anagrafa,
    Comment,
    CertificateNumber,
    CertificateDayMonth,
    CertificateYear,
    CertificateTown,
}

impl Field {
    /// Formatted text of this field. The place-of-birth pair is handled by
    /// [`FieldValues::from_record`] because each half depends on the other.
    #[must_use]
    pub fn text(self, record: &BaptismRecord) -> String {
        use format::{
            format_date_time, format_day_month, format_int, format_year, gender_cyrillic,
            yes_no_cyrillic,
        };

        match self {
            Self::Book => record.book.clone(),
            Self::Page => format_int(record.page),
            Self::CurrentNumber => format_int(record.current_number),
            Self::EparchyName => record.eparchy_name.clone(),
            Self::TempleName => record.temple_name.clone(),
            Self::TempleCity => record.temple_city.clone(),
            Self::BirthDate => format_date_time(record.birth_date),
            Self::PlaceOfBirth => record.place_of_birth.clone(),
            Self::MunicipalityOfBirth => record.municipality_of_birth.clone(),
            Self::BaptismDate => format_date_time(record.baptism_date),
            Self::BaptismYear => format_year(record.baptism_date),
            Self::FirstName => record.first_name.clone(),
            Self::LastName => record.last_name.clone(),
            Self::Gender => gender_cyrillic(&record.gender),
            Self::ParentFirstName => record.parent_first_name.clone(),
            Self::ParentLastName => record.parent_last_name.clone(),
            Self::ParentOccupation => record.parent_occupation.clone(),
            Self::ParentCity => record.parent_city.clone(),
            Self::ParentReligion => record.parent_religion.clone(),
            Self::BirthOrder => record.birth_order.trim().to_string(),
            Self::ChurchMarried => record.is_church_married.trim().to_string(),
            Self::Twin => record.is_twin.trim().to_string(),
            Self::PhysicalDisability => yes_no_cyrillic(record.has_physical_disability).to_string(),
            Self::PriestFirstName => record.priest_first_name.clone(),
            Self::PriestLastName => record.priest_last_name.clone(),
            Self::PriestTitle => record.priest_title.clone(),
            Self::GodparentFirstName => record.godparent_first_name.clone(),
            Self::GodparentLastName => record.godparent_last_name.clone(),
            Self::GodparentOccupation => record.godparent_occupation.clone(),
            Self::GodparentCity => record.godparent_city.clone(),
            Self::GodparentReligion => record.godparent_religion.clone(),
            Self::Anagrafa => record.anagrafa.clone(),
            Self::Comment => record.comment.clone(),
            Self::CertificateNumber => format_int(record.certificate_number),
            Self::CertificateDayMonth => format_day_month(record.certificate_date),
            Self::CertificateYear => format_year(record.certificate_date),
            Self::CertificateTown => record.certificate_town.clone(),
        }
    }
}

/// A rule that rewrites cell values after mapping. Cells are static
/// references from a profile table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    /// `first last, qualifier` into `first`; `last` and `qualifier` cleared.
    NameWithQualifier {
        first: &'static str,
        last: &'static str,
        qualifier: &'static str,
    },
    /// As `NameWithQualifier`, with a trailing comma when there is no occupation.
    Godparent {
        first: &'static str,
        last: &'static str,
        occupation: &'static str,
    },
    /// `city, name` into `city`; `name` cleared.
    Temple {
        city: &'static str,
        name: &'static str,
    },
    /// Prefix the city preposition and fix the ending.
    CityPreposition(&'static str),
    /// Append a single space to a non-empty value.
    TrailingSpace(&'static str),
    /// Move a value to another cell.
    Relocate {
        from: &'static str,
        to: &'static str,
    },
}

/// Cell → display text. Blank strings are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldValues {
    values: BTreeMap<CellRef, String>,
}

impl FieldValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a record through a cell table. Table entries whose reference does
    /// not parse are skipped.
    #[must_use]
    pub fn from_record(record: &BaptismRecord, cells: &[(Field, &str)]) -> Self {
        let (place, municipality) =
            compose::place_of_birth(&record.place_of_birth, &record.municipality_of_birth);

        let mut values = Self::new();
        for &(field, reference) in cells {
            let Some(cell) = CellRef::parse(reference) else {
                log::warn!("field {field:?} mapped to invalid cell reference {reference:?}");
                continue;
            };
            let text = match field {
                Field::PlaceOfBirth => place.clone().unwrap_or_default(),
                Field::MunicipalityOfBirth => municipality.clone().unwrap_or_default(),
                other => other.text(record),
            };
            values.set(cell, text);
        }
        values
    }

    /// Store `text` at `cell`, or remove the entry if `text` is blank.
    pub fn set(&mut self, cell: CellRef, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            self.values.remove(&cell);
        } else {
            self.values.insert(cell, text);
        }
    }

    #[must_use]
    pub fn get(&self, cell: CellRef) -> Option<&str> {
        self.values.get(&cell).map(String::as_str)
    }

    /// Look up by textual reference.
    #[must_use]
    pub fn get_ref(&self, reference: &str) -> Option<&str> {
        CellRef::parse(reference).and_then(|cell| self.get(cell))
    }

    pub fn remove(&mut self, cell: CellRef) -> Option<String> {
        self.values.remove(&cell)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellRef, &str)> {
        self.values.iter().map(|(cell, text)| (*cell, text.as_str()))
    }

    /// Apply composition rules in order.
    pub fn apply(&mut self, rules: &[Composition]) {
        for rule in rules {
            self.apply_one(*rule);
        }
    }

    fn text_at(&self, reference: &str) -> String {
        self.get_ref(reference).unwrap_or_default().to_string()
    }

    fn set_ref(&mut self, reference: &str, text: impl Into<String>) {
        if let Some(cell) = CellRef::parse(reference) {
            self.set(cell, text);
        }
    }

    fn apply_one(&mut self, rule: Composition) {
        match rule {
            Composition::NameWithQualifier {
                first,
                last,
                qualifier,
            } => {
                let text = compose::name_with_qualifier(
                    &self.text_at(first),
                    &self.text_at(last),
                    &self.text_at(qualifier),
                );
                self.merge_into(first, &[last, qualifier], text);
            }
            Composition::Godparent {
                first,
                last,
                occupation,
            } => {
                let text = compose::godparent_line(
                    &self.text_at(first),
                    &self.text_at(last),
                    &self.text_at(occupation),
                );
                self.merge_into(first, &[last, occupation], text);
            }
            Composition::Temple { city, name } => {
                let text = compose::temple_line(&self.text_at(city), &self.text_at(name));
                self.merge_into(city, &[name], text);
            }
            Composition::CityPreposition(cell) => {
                let text = compose::city_with_preposition(&self.text_at(cell));
                self.set_ref(cell, text);
            }
            Composition::TrailingSpace(cell) => {
                let text = self.text_at(cell);
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    self.set_ref(cell, format!("{trimmed} "));
                }
            }
            Composition::Relocate { from, to } => {
                if let Some(text) = CellRef::parse(from).and_then(|cell| self.remove(cell)) {
                    self.set_ref(to, text);
                }
            }
        }
    }

    /// Write a merged string into `target` and clear the source cells. Nothing
    /// changes when the merge is empty.
    fn merge_into(&mut self, target: &str, sources: &[&str], text: String) {
        if text.trim().is_empty() {
            return;
        }
        self.set_ref(target, text);
        for source in sources {
            if let Some(cell) = CellRef::parse(source) {
                self.remove(cell);
            }
        }
    }
}
