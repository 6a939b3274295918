//! Greedy word wrapping against a text measurer.

/// Measures rendered text width.
pub trait TextMeasure {
    /// Width in millimeters of `text` set at `font_size_pt`.
    fn text_width(&self, text: &str, font_size_pt: f64, bold: bool) -> f64;
}

/// Wrap `text` into lines no wider than `max_width` mm.
///
/// Explicit newlines always break. Words wider than the line are broken
/// character-wise; every line holds at least one character.
pub fn wrap_text(
    measure: &dyn TextMeasure,
    text: &str,
    max_width: f64,
    font_size_pt: f64,
    bold: bool,
) -> Vec<String> {
    let width = |s: &str| measure.text_width(s, font_size_pt, bold);
    let mut lines: Vec<String> = Vec::new();

    for paragraph in text.lines() {
        let mut current_line = String::new();

        for word in paragraph.split_whitespace() {
            if !current_line.is_empty() {
                let test_line = format!("{current_line} {word}");
                if width(&test_line) <= max_width {
                    current_line = test_line;
                    continue;
                }
                // Current line is full, start a new one
                lines.push(std::mem::take(&mut current_line));
            }

            if width(word) > max_width {
                let mut parts = break_word(&width, word, max_width);
                // Last part becomes the current line
                current_line = parts.pop().unwrap_or_default();
                lines.extend(parts);
            } else {
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    lines
}

/// Split a word wider than the line, summing per-character advances so each
/// character is measured once.
fn break_word(width: &dyn Fn(&str) -> f64, word: &str, max_width: f64) -> Vec<String> {
    let mut parts = Vec::new();
    let mut part = String::new();
    let mut part_width = 0.0;
    let mut utf8 = [0u8; 4];

    for ch in word.chars() {
        let advance = width(ch.encode_utf8(&mut utf8));
        if !part.is_empty() && part_width + advance > max_width {
            parts.push(std::mem::take(&mut part));
            part_width = 0.0;
        }
        part.push(ch);
        part_width += advance;
    }
    if !part.is_empty() {
        parts.push(part);
    }

    parts
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// One millimeter per character regardless of size.
    struct Monospace;

    impl TextMeasure for Monospace {
        fn text_width(&self, text: &str, _font_size_pt: f64, _bold: bool) -> f64 {
            text.chars().count() as f64
        }
    }

    #[test]
    fn test_wrap_words() {
        let lines = wrap_text(&Monospace, "one two three four", 9.0, 10.0, false);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn test_wrap_long_word() {
        let lines = wrap_text(&Monospace, "ab abcdefghij", 4.0, 10.0, false);
        assert_eq!(lines, vec!["ab", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_newlines_and_blank() {
        let lines = wrap_text(&Monospace, "first\n\nsecond", 20.0, 10.0, false);
        assert_eq!(lines, vec!["first", "second"]);
        assert!(wrap_text(&Monospace, "   ", 20.0, 10.0, false).is_empty());
    }

    #[test]
    fn test_narrow_width_still_progresses() {
        let lines = wrap_text(&Monospace, "abc", 0.1, 10.0, false);
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    /// Monospace measure that counts how often it is asked.
    struct Counting(Cell<usize>);

    impl TextMeasure for Counting {
        fn text_width(&self, text: &str, _font_size_pt: f64, _bold: bool) -> f64 {
            self.0.set(self.0.get() + 1);
            text.chars().count() as f64
        }
    }

    #[test]
    fn test_long_word_measured_once_per_character() {
        let word = "ж".repeat(2000);
        let measure = Counting(Cell::new(0));
        let lines = wrap_text(&measure, &word, 50.0, 10.0, false);

        assert_eq!(lines.len(), 40);
        assert!(lines.iter().all(|l| l.chars().count() == 50));
        // one whole-word check plus one per character
        assert_eq!(measure.0.get(), 2001);
    }
}
