//! Shared XML attribute parsing utilities for template parsing and patching.
//!
//! All functions match attributes by their full (possibly prefixed) key and
//! handle UTF-8 conversion safely.

use quick_xml::events::BytesStart;

/// Extract a string attribute value by key.
///
/// Returns `None` if the attribute is missing or not valid UTF-8.
pub fn attr_string(e: &BytesStart, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return std::str::from_utf8(&attr.value).ok().map(|s| s.to_string());
        }
    }
    None
}

/// Extract a `u32` attribute value by key.
pub fn attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract an `f64` attribute value by key.
pub fn attr_f64(e: &BytesStart, key: &[u8]) -> Option<f64> {
    attr_string(e, key).and_then(|s| s.trim().parse().ok())
}

/// Extract a boolean attribute value by key.
///
/// Returns `None` if missing. Recognizes `"1"`, `"true"` as true.
pub fn attr_bool(e: &BytesStart, key: &[u8]) -> Option<bool> {
    attr_string(e, key).map(|s| matches!(s.as_str(), "1" | "true"))
}

/// Extract the `val` attribute as `f64`. Very common in style XML.
pub fn attr_val_f64(e: &BytesStart) -> Option<f64> {
    attr_f64(e, b"val")
}

/// True if the element carries the attribute at all.
pub fn has_attr(e: &BytesStart, key: &[u8]) -> bool {
    e.attributes().flatten().any(|a| a.key.as_ref() == key)
}

/// Minimal XML escaping for attribute/text content.
pub fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]
mod tests {
    use super::*;

    fn make_start(xml: &str) -> BytesStart<'_> {
        let content = xml
            .trim_start_matches('<')
            .trim_end_matches('>')
            .trim_end_matches('/')
            .trim_end();
        BytesStart::from_content(content, content.find(' ').unwrap_or(content.len()))
    }

    #[test]
    fn test_attr_string() {
        let e = make_start(r#"<col min="2" max="4" />"#);
        assert_eq!(attr_string(&e, b"min"), Some("2".to_string()));
        assert_eq!(attr_string(&e, b"width"), None);
    }

    #[test]
    fn test_numeric_attrs() {
        let e = make_start(r#"<row r="12" ht="18.55" />"#);
        assert_eq!(attr_u32(&e, b"r"), Some(12));
        let ht = attr_f64(&e, b"ht").unwrap();
        assert!((ht - 18.55).abs() < f64::EPSILON);
        assert_eq!(attr_u32(&e, b"ht"), None);
    }

    #[test]
    fn test_attr_bool_and_presence() {
        let e = make_start(r#"<alignment wrapText="1" shrinkToFit="0" />"#);
        assert_eq!(attr_bool(&e, b"wrapText"), Some(true));
        assert_eq!(attr_bool(&e, b"shrinkToFit"), Some(false));
        assert_eq!(attr_bool(&e, b"vertical"), None);
        assert!(has_attr(&e, b"wrapText"));
        assert!(!has_attr(&e, b"vertical"));
    }

    #[test]
    fn test_attr_val_f64() {
        let e = make_start(r#"<sz val="11" />"#);
        assert_eq!(attr_val_f64(&e), Some(11.0));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
        assert_eq!(xml_escape("Мушко"), "Мушко");
    }
}
