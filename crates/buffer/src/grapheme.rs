//! Grapheme cluster helpers over character slices.
//!
//! The buffer stores `char`s, but a caret should never land inside what a
//! reader perceives as one character: ZWJ emoji sequences, a base letter
//! followed by combining marks, regional indicator pairs and Hangul jamo runs
//! all span several `char`s. Layout also measures whole clusters, so a wide
//! base character followed by combining marks occupies one cell pair.

use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

/// Splits `chars` into grapheme clusters, returned as char ranges.
pub fn clusters(chars: &[char]) -> Vec<Range<usize>> {
    // normalized text has no CR, so ASCII is one char per cluster
    if chars.iter().all(char::is_ascii) {
        return (0..chars.len()).map(|i| i..i + 1).collect();
    }

    let s: String = chars.iter().collect();
    let mut ranges = Vec::with_capacity(chars.len());
    let mut start = 0;
    for grapheme in s.graphemes(true) {
        let len = grapheme.chars().count();
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Returns the grapheme boundary immediately before `char_offset`.
///
/// At the start of a cluster this is the start of the previous cluster; inside
/// a cluster it is the start of that cluster. Returns 0 at offset 0.
pub fn grapheme_boundary_left(chars: &[char], char_offset: usize) -> usize {
    if char_offset == 0 || chars.is_empty() {
        return 0;
    }
    let char_offset = char_offset.min(chars.len());

    if chars[char_offset - 1].is_ascii() {
        return char_offset - 1;
    }

    clusters(chars)
        .into_iter()
        .map(|r| r.start)
        .take_while(|&start| start < char_offset)
        .last()
        .unwrap_or(0)
}

/// Returns the grapheme boundary immediately after `char_offset`.
///
/// Returns `chars.len()` at or past the end.
pub fn grapheme_boundary_right(chars: &[char], char_offset: usize) -> usize {
    if char_offset >= chars.len() {
        return chars.len();
    }

    let current = chars[char_offset];
    if current.is_ascii() && chars.get(char_offset + 1).map_or(true, char::is_ascii) {
        return char_offset + 1;
    }

    clusters(chars)
        .into_iter()
        .map(|r| r.end)
        .find(|&end| end > char_offset)
        .unwrap_or(chars.len())
}

/// Returns true if `char_offset` falls on a cluster boundary.
pub fn is_grapheme_boundary(chars: &[char], char_offset: usize) -> bool {
    if char_offset == 0 || char_offset >= chars.len() {
        return true;
    }
    clusters(chars).iter().any(|r| r.start == char_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAMILY: &str = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}\u{200D}\u{1F466}";
    const FLAG_US: &str = "\u{1F1FA}\u{1F1F8}";

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    // ==================== ASCII Tests ====================

    #[test]
    fn test_ascii_boundaries() {
        let c = chars("hello");
        assert_eq!(grapheme_boundary_left(&c, 0), 0);
        assert_eq!(grapheme_boundary_left(&c, 3), 2);
        assert_eq!(grapheme_boundary_right(&c, 0), 1);
        assert_eq!(grapheme_boundary_right(&c, 4), 5);
        assert_eq!(grapheme_boundary_right(&c, 5), 5);
    }

    #[test]
    fn test_ascii_clusters() {
        assert_eq!(clusters(&chars("ab")), vec![0..1, 1..2]);
        assert!(clusters(&[]).is_empty());
    }

    // ==================== ZWJ Emoji Tests ====================

    #[test]
    fn test_zwj_emoji() {
        let c = chars(&format!("a{FAMILY}b"));
        assert_eq!(c.len(), 9);
        assert_eq!(grapheme_boundary_left(&c, 8), 1);
        assert_eq!(grapheme_boundary_left(&c, 1), 0);
        assert_eq!(grapheme_boundary_right(&c, 1), 8);
        assert_eq!(grapheme_boundary_right(&c, 4), 8);
        assert_eq!(clusters(&c), vec![0..1, 1..8, 8..9]);
    }

    // ==================== Combining Character Tests ====================

    #[test]
    fn test_combining_mark_after_ascii() {
        // e + combining acute
        let c = chars("ae\u{0301}b");
        assert_eq!(grapheme_boundary_right(&c, 1), 3);
        assert_eq!(grapheme_boundary_left(&c, 3), 1);
        assert!(!is_grapheme_boundary(&c, 2));
        assert!(is_grapheme_boundary(&c, 3));
    }

    // ==================== Regional Indicator Tests ====================

    #[test]
    fn test_regional_indicators() {
        let c = chars(&format!("a{FLAG_US}b"));
        assert_eq!(grapheme_boundary_left(&c, 3), 1);
        assert_eq!(grapheme_boundary_right(&c, 1), 3);
    }

    // ==================== Hangul Tests ====================

    #[test]
    fn test_hangul_jamo() {
        // conjoining jamo: choseong + jungseong + jongseong
        let c = chars("\u{1100}\u{1161}\u{11A8}x");
        assert_eq!(clusters(&c), vec![0..3, 3..4]);
        assert_eq!(grapheme_boundary_left(&c, 3), 0);
    }
}
