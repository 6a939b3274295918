//! Display formatting for individual record values.

use chrono::{Datelike, NaiveDateTime};

/// Years before this render with all four digits on year-only fields.
pub const FOUR_DIGIT_YEAR_BEFORE: i32 = 2000;

/// Integers render empty when zero, since zero means "not recorded".
#[must_use]
pub fn format_int(value: i64) -> String {
    if value == 0 {
        String::new()
    } else {
        value.to_string()
    }
}

/// `YYYY, MM, DD, HH:MM`
#[must_use]
pub fn format_date_time(value: Option<NaiveDateTime>) -> String {
    value.map_or_else(String::new, |dt| dt.format("%Y, %m, %d, %H:%M").to_string())
}

/// `DD.MM.` part of a split certificate date.
#[must_use]
pub fn format_day_month(value: Option<NaiveDateTime>) -> String {
    value.map_or_else(String::new, |dt| dt.format("%d.%m.").to_string())
}

/// Year-only rendering: two digits, or four for years before 2000.
#[must_use]
pub fn format_year(value: Option<NaiveDateTime>) -> String {
    match value {
        None => String::new(),
        Some(dt) if dt.year() < FOUR_DIGIT_YEAR_BEFORE => format!("{:04}", dt.year()),
        Some(dt) => dt.format("%y").to_string(),
    }
}

#[must_use]
pub fn gender_cyrillic(gender: &str) -> String {
    match gender.trim().to_lowercase().as_str() {
        "m" | "musko" | "muško" | "male" => "Мушко".to_string(),
        "z" | "ž" | "zensko" | "žensko" | "female" => "Женско".to_string(),
        _ => gender.to_string(),
    }
}

#[must_use]
pub fn yes_no_cyrillic(value: bool) -> &'static str {
    if value {
        "Да"
    } else {
        "Не"
    }
}
