//! Cell reference algebra: "F27" style addresses and "A1:M66" style ranges.
//!
//! Unlike raw XLSX attribute parsing, every index here is 1-based, matching the
//! way template cells are named in the certificate tables.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::CertprintError;

/// A validated cell address. Column and row are both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    /// 1-based row number.
    pub row: u32,
    /// 1-based column index (A = 1).
    pub col: u32,
}

impl CellRef {
    /// Build a reference from 1-based indices. Returns `None` for index 0.
    #[must_use]
    pub fn new(col: u32, row: u32) -> Option<Self> {
        if col == 0 || row == 0 {
            return None;
        }
        Some(Self { row, col })
    }

    /// Parse a textual reference such as `"F27"` or `"$f$27"`.
    ///
    /// Letters are case-insensitive. Returns `None` when the letter run or the
    /// digit run is empty, when characters follow the digits, or when the row
    /// number is zero or overflows.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (letters, digits) = split_cell_ref(text)?;
        let col = column_index(&letters)?;
        let row: u32 = digits.parse().ok()?;
        Self::new(col, row)
    }

    /// Column letters for this reference (`"AA"` for column 27).
    #[must_use]
    pub fn column_letters(&self) -> String {
        column_letters(self.col)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

impl FromStr for CellRef {
    type Err = CertprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CertprintError::InvalidCellRef(s.to_string()))
    }
}

impl Serialize for CellRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Inclusive bounding box of a range reference, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RangeBounds {
    pub min_col: u32,
    pub min_row: u32,
    pub max_col: u32,
    pub max_row: u32,
}

/// Split a reference into its uppercased letter run and its digit run.
///
/// `$` markers are ignored. Returns `None` if either run is empty or the
/// characters are not letters-then-digits.
#[must_use]
pub fn split_cell_ref(text: &str) -> Option<(String, String)> {
    let mut letters = String::new();
    let mut digits = String::new();

    for ch in text.trim().chars() {
        if ch == '$' {
            continue;
        }
        if ch.is_ascii_alphabetic() {
            if !digits.is_empty() {
                return None;
            }
            letters.push(ch.to_ascii_uppercase());
        } else if ch.is_ascii_digit() {
            digits.push(ch);
        } else {
            return None;
        }
    }

    if letters.is_empty() || digits.is_empty() {
        return None;
    }
    Some((letters, digits))
}

/// Convert column letters to a 1-based index using bijective base-26
/// (A = 1, Z = 26, AA = 27). Returns `None` for empty input, non-letters or
/// overflow.
#[must_use]
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index)
}

/// Convert a 1-based column index to letters. Index 0 yields an empty string.
#[must_use]
pub fn column_letters(index: u32) -> String {
    let mut n = index;
    let mut out = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        // rem < 26, so the cast cannot truncate
        #[allow(clippy::cast_possible_truncation)]
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Parse a range like `"A1:C10"` (or a single cell) into its bounding box.
///
/// Endpoints may be given in any order; the result is normalized.
#[must_use]
pub fn parse_range(range: &str) -> Option<RangeBounds> {
    let mut parts = range.trim().split(':');
    let first = CellRef::parse(parts.next()?)?;
    let second = match parts.next() {
        Some(part) => CellRef::parse(part)?,
        None => first,
    };
    if parts.next().is_some() {
        return None;
    }

    Some(RangeBounds {
        min_col: first.col.min(second.col),
        min_row: first.row.min(second.row),
        max_col: first.col.max(second.col),
        max_row: first.row.max(second.row),
    })
}

/// Parse a reference from raw attribute bytes (as read from quick-xml).
#[must_use]
pub fn parse_cell_ref_bytes(ref_bytes: &[u8]) -> Option<CellRef> {
    std::str::from_utf8(ref_bytes).ok().and_then(CellRef::parse)
}
