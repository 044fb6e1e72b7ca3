//! Display width of a single grapheme cluster.
//!
//! Every column computation in the workspace goes through [`egc_width`] so
//! tabs are the only special case callers deal with (see [`crate::column`]).

use unicode_width::UnicodeWidthStr;

/// Terminal cell width of a grapheme cluster.
///
/// Control characters other than tab display as `^X` (two cells). A
/// cluster that carries an emoji presentation selector is forced wide.
pub fn egc_width(g: &str) -> u16 {
    let mut chars = g.chars();
    let Some(first) = chars.next() else {
        return 0;
    };
    if first.is_control() {
        return if first == '\u{7f}' || (first as u32) < 0x20 {
            2
        } else {
            // C1 controls display as <xx>
            4
        };
    }
    if g.contains('\u{FE0F}') && g.chars().count() > 1 {
        return 2;
    }
    let w = UnicodeWidthStr::width(g);
    w.clamp(1, u16::MAX as usize) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_and_wide() {
        assert_eq!(egc_width("a"), 1);
        assert_eq!(egc_width("漢"), 2);
        assert_eq!(egc_width(""), 0);
    }

    #[test]
    fn combining_sequence_is_one_cell() {
        assert_eq!(egc_width("e\u{301}"), 1);
    }

    #[test]
    fn control_chars_use_caret_notation() {
        assert_eq!(egc_width("\u{1}"), 2);
        assert_eq!(egc_width("\u{7f}"), 2);
    }

    #[test]
    fn emoji_presentation_is_wide() {
        assert_eq!(egc_width("\u{2699}\u{FE0F}"), 2);
    }
}
