//! Virtual (screen) columns with tab expansion.
//!
//! A virtual column counts display cells from the start of the line. A tab
//! occupies the cells up to the next multiple of `tabstop`.

use unicode_segmentation::UnicodeSegmentation;

use crate::width::egc_width;

/// Cells taken by cluster `g` when it starts at virtual column `vcol`.
pub fn cells(g: &str, vcol: usize, tabstop: usize) -> usize {
    if g == "\t" {
        let ts = tabstop.max(1);
        ts - vcol % ts
    } else {
        egc_width(g) as usize
    }
}

/// First and last virtual column of the cluster at `byte`.
///
/// At or past the end of the line both are the column just after the last
/// cell.
pub fn vcol_range(line: &str, byte: usize, tabstop: usize) -> (usize, usize) {
    let mut vcol = 0;
    for (idx, g) in line.grapheme_indices(true) {
        let w = cells(g, vcol, tabstop);
        if idx + g.len() > byte {
            return (vcol, vcol + w.max(1) - 1);
        }
        vcol += w;
    }
    (vcol, vcol)
}

/// Start column of the cluster at `byte`.
pub fn vcol_of(line: &str, byte: usize, tabstop: usize) -> usize {
    vcol_range(line, byte, tabstop).0
}

/// Total display width of a line.
pub fn line_width(line: &str, tabstop: usize) -> usize {
    let mut vcol = 0;
    for g in line.graphemes(true) {
        vcol += cells(g, vcol, tabstop);
    }
    vcol
}

/// Byte offset of the cluster covering virtual column `want`, or the line
/// length when `want` lies past the end.
pub fn byte_at_vcol(line: &str, want: usize, tabstop: usize) -> usize {
    let mut vcol = 0;
    for (idx, g) in line.grapheme_indices(true) {
        let w = cells(g, vcol, tabstop);
        if vcol + w > want {
            return idx;
        }
        vcol += w;
    }
    line.len()
}

/// Byte offset of the first character that is not a space or tab.
pub fn first_nonblank(line: &str) -> usize {
    line.find(|c: char| c != ' ' && c != '\t').unwrap_or(line.len())
}

/// Width of the leading whitespace.
pub fn indent_width(line: &str, tabstop: usize) -> usize {
    line_width(&line[..first_nonblank(line)], tabstop)
}

/// Whitespace that spans `width` cells: tabs first unless `expandtab`.
pub fn make_indent(width: usize, tabstop: usize, expandtab: bool) -> String {
    let ts = tabstop.max(1);
    if expandtab {
        return " ".repeat(width);
    }
    let mut s = "\t".repeat(width / ts);
    s.push_str(&" ".repeat(width % ts));
    s
}

/// Replace the indent of `line` with one of `width` cells.
pub fn set_indent(line: &str, width: usize, tabstop: usize, expandtab: bool) -> String {
    let rest = &line[first_nonblank(line)..];
    let mut s = make_indent(width, tabstop, expandtab);
    s.push_str(rest);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tab_expands_to_next_stop() {
        let s = "a\tb";
        assert_eq!(vcol_range(s, 0, 8), (0, 0));
        assert_eq!(vcol_range(s, 1, 8), (1, 7));
        assert_eq!(vcol_range(s, 2, 8), (8, 8));
        assert_eq!(line_width(s, 8), 9);
        assert_eq!(vcol_range(s, 3, 8), (9, 9));
    }

    #[test]
    fn byte_at_vcol_inside_tab() {
        let s = "\tx";
        assert_eq!(byte_at_vcol(s, 0, 4), 0);
        assert_eq!(byte_at_vcol(s, 3, 4), 0);
        assert_eq!(byte_at_vcol(s, 4, 4), 1);
        assert_eq!(byte_at_vcol(s, 40, 4), 2);
    }

    #[test]
    fn wide_chars_count_two() {
        let s = "漢x";
        assert_eq!(vcol_range(s, 0, 8), (0, 1));
        assert_eq!(vcol_of(s, 3, 8), 2);
    }

    #[test]
    fn indent_helpers() {
        assert_eq!(first_nonblank("  \tfoo"), 3);
        assert_eq!(first_nonblank("   "), 3);
        assert_eq!(indent_width("  \tfoo", 8), 8);
        assert_eq!(make_indent(10, 8, false), "\t  ");
        assert_eq!(make_indent(3, 8, true), "   ");
        assert_eq!(set_indent("\tfoo", 4, 8, false), "    foo");
    }

    proptest::proptest! {
        #[test]
        fn byte_at_vcol_inverts_vcol_of(line in "[a-c \t漢]{0,12}", ts in 1usize..9) {
            for (idx, _) in line.grapheme_indices(true) {
                proptest::prop_assert_eq!(byte_at_vcol(&line, vcol_of(&line, idx, ts), ts), idx);
            }
        }

        #[test]
        fn made_indent_has_requested_width(width in 0usize..40, ts in 1usize..9, expandtab: bool) {
            proptest::prop_assert_eq!(indent_width(&make_indent(width, ts, expandtab), ts), width);
        }
    }
}
