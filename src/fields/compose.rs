//! Composition rules that merge several record values into one display string.

/// Preposition prefixed to a city of origin.
const CITY_PREPOSITION: &str = "из";

/// Join the non-empty parts of a person's name with a space.
fn join_name(first: &str, last: &str) -> String {
    [first.trim(), last.trim()]
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `first last, qualifier`. An empty name leaves only the qualifier; an empty
/// qualifier leaves only the name.
#[must_use]
pub fn name_with_qualifier(first: &str, last: &str, qualifier: &str) -> String {
    let name = join_name(first, last);
    let qualifier = qualifier.trim();
    match (name.is_empty(), qualifier.is_empty()) {
        (_, true) => name,
        (true, false) => qualifier.to_string(),
        (false, false) => format!("{name}, {qualifier}"),
    }
}

/// Godparent line: like [`name_with_qualifier`], but a name without an
/// occupation keeps a trailing comma so the printed form reads on.
#[must_use]
pub fn godparent_line(first: &str, last: &str, occupation: &str) -> String {
    let name = join_name(first, last);
    if !name.is_empty() && occupation.trim().is_empty() {
        return format!("{name},");
    }
    name_with_qualifier(first, last, occupation)
}

/// `city, temple name` with any trailing comma on the city normalized.
#[must_use]
pub fn temple_line(city: &str, name: &str) -> String {
    let city = city.trim().trim_end_matches(',').trim();
    let name = name.trim();
    match (city.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => format!("{city},"),
        (false, false) => format!("{city}, {name}"),
    }
}

/// Prefix a city with the preposition and put its last letter in the
/// genitive: a Latin `a` becomes Cyrillic `а`, a Cyrillic `а` stays, anything
/// else gets `а` appended.
#[must_use]
pub fn city_with_preposition(city: &str) -> String {
    let city = city.trim();
    if city.is_empty() {
        return String::new();
    }
    let mut text = format!("{CITY_PREPOSITION} {city}");
    match text.chars().last() {
        Some('а') => {}
        Some('a') => {
            text.pop();
            text.push('а');
        }
        _ => text.push('а'),
    }
    text
}

/// Split a place of birth over its two cells.
///
/// Returns `(place, municipality)`. Equal parts (ignoring case) collapse into
/// the municipality cell only; otherwise each non-empty part keeps its own cell.
#[must_use]
pub fn place_of_birth(place: &str, municipality: &str) -> (Option<String>, Option<String>) {
    let place = place.trim();
    let municipality = municipality.trim();
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

    if !place.is_empty() && place.to_lowercase() == municipality.to_lowercase() {
        return (None, Some(municipality.to_string()));
    }
    (non_empty(place), non_empty(municipality))
}
