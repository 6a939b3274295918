//! The baptism record as handed over by the persistence layer.
//!
//! Field names follow the JSON the record service emits; the older
//! transliterated names (`tample_*`, `godfather_*`, ...) are accepted as aliases.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CertprintError, Result};

/// A single baptism register entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaptismRecord {
    pub book: String,
    pub page: i64,
    pub current_number: i64,

    #[serde(alias = "eparhija_name")]
    pub eparchy_name: String,
    #[serde(alias = "tample_name")]
    pub temple_name: String,
    #[serde(alias = "tample_city")]
    pub temple_city: String,

    pub parent_first_name: String,
    pub parent_last_name: String,
    pub parent_occupation: String,
    pub parent_city: String,
    pub parent_religion: String,

    #[serde(alias = "godfather_first_name")]
    pub godparent_first_name: String,
    #[serde(alias = "godfather_last_name")]
    pub godparent_last_name: String,
    #[serde(alias = "godfather_occupation")]
    pub godparent_occupation: String,
    #[serde(alias = "godfather_city")]
    pub godparent_city: String,
    #[serde(alias = "godfather_religion")]
    pub godparent_religion: String,

    /// Parish priest keeping the register.
    #[serde(alias = "paroh_first_name")]
    pub parish_priest_first_name: String,
    #[serde(alias = "paroh_last_name")]
    pub parish_priest_last_name: String,

    /// Officiating priest.
    pub priest_first_name: String,
    pub priest_last_name: String,
    pub priest_title: String,

    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub city: String,
    pub country: String,

    #[serde(deserialize_with = "de_datetime")]
    pub birth_date: Option<NaiveDateTime>,
    pub birth_order: String,
    #[serde(alias = "place_of_birthday")]
    pub place_of_birth: String,
    #[serde(alias = "municipality_of_birthday")]
    pub municipality_of_birth: String,
    #[serde(alias = "baptism", deserialize_with = "de_datetime")]
    pub baptism_date: Option<NaiveDateTime>,

    pub is_church_married: String,
    pub is_twin: String,
    pub has_physical_disability: bool,

    pub anagrafa: String,
    #[serde(alias = "number_of_certificate")]
    pub certificate_number: i64,
    #[serde(alias = "town_of_certificate")]
    pub certificate_town: String,
    #[serde(alias = "certificate", deserialize_with = "de_datetime")]
    pub certificate_date: Option<NaiveDateTime>,

    pub comment: String,
    pub status: String,
}

impl BaptismRecord {
    /// Decode a record from JSON.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| CertprintError::Record(e.to_string()))
    }
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS`/`YYYY-MM-DD HH:MM:SS`
/// and bare dates. Null, empty strings and year-1 timestamps mean "no date".
fn de_datetime<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let parsed = parse_datetime(raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized date-time: {raw}")))?;
    // Zero timestamps serialized by the record service stand for "unset"
    if parsed.year() <= 1 {
        return Ok(None);
    }
    Ok(Some(parsed))
}

pub(crate) fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
