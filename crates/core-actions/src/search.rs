//! Pattern search for `/`, `?`, `n`, `N`, `*`, `#` and `gd`.
//!
//! Patterns use the `regex` crate syntax. The Vi word anchors `\<` and `\>`
//! are accepted and mean a word boundary. `'ignorecase'` and `'smartcase'`
//! select case folding per pattern.

use core_text::motion::Direction;
use core_text::{LineAccess, Position, grapheme};
use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::error::CommandError;

/// Last pattern and direction, shared by `n` and `N`.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub last_pattern: Option<String>,
    pub last_dir: Direction,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            last_pattern: None,
            last_dir: Direction::Forward,
        }
    }
}

/// A successful search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found {
    pub pos: Position,
    /// The search went past one end of the buffer and continued at the other.
    pub wrapped: bool,
}

pub fn compile(pattern: &str, ignorecase: bool, smartcase: bool) -> Result<Regex, CommandError> {
    let translated = pattern.replace("\\<", "\\b").replace("\\>", "\\b");
    let fold = ignorecase && !(smartcase && pattern.chars().any(char::is_uppercase));
    RegexBuilder::new(&translated)
        .case_insensitive(fold)
        .build()
        .map_err(|e| CommandError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })
}

fn last_match_before(re: &Regex, line: &str, limit: usize) -> Option<usize> {
    re.find_iter(line).map(|m| m.start()).filter(|&s| s < limit).last()
}

fn first_match_after(re: &Regex, line: &str, limit: Option<usize>) -> Option<usize> {
    re.find_iter(line)
        .map(|m| m.start())
        .find(|&s| limit.is_none_or(|l| s > l))
}

fn find_once<L: LineAccess + ?Sized>(
    text: &L,
    re: &Regex,
    from: Position,
    dir: Direction,
    wrapscan: bool,
) -> Option<Found> {
    let count = text.line_count();
    match dir {
        Direction::Forward => {
            let line = text.line_text(from.line);
            if let Some(b) = first_match_after(re, &line, Some(from.byte)) {
                return Some(Found { pos: Position::new(from.line, b), wrapped: false });
            }
            for l in from.line + 1..count {
                if let Some(b) = first_match_after(re, &text.line_text(l), None) {
                    return Some(Found { pos: Position::new(l, b), wrapped: false });
                }
            }
            if !wrapscan {
                return None;
            }
            for l in 0..=from.line {
                let line = text.line_text(l);
                if let Some(b) = first_match_after(re, &line, None)
                    && (l < from.line || b <= from.byte)
                {
                    return Some(Found { pos: Position::new(l, b), wrapped: true });
                }
            }
            None
        }
        Direction::Backward => {
            let line = text.line_text(from.line);
            if let Some(b) = last_match_before(re, &line, from.byte) {
                return Some(Found { pos: Position::new(from.line, b), wrapped: false });
            }
            for l in (0..from.line).rev() {
                let line = text.line_text(l);
                if let Some(b) = last_match_before(re, &line, usize::MAX) {
                    return Some(Found { pos: Position::new(l, b), wrapped: false });
                }
            }
            if !wrapscan {
                return None;
            }
            for l in (from.line..count).rev() {
                let line = text.line_text(l);
                if let Some(b) = last_match_before(re, &line, usize::MAX)
                    && (l > from.line || b >= from.byte)
                {
                    return Some(Found { pos: Position::new(l, b), wrapped: true });
                }
            }
            None
        }
    }
}

/// Find the `count`-th match of `re` from `from` in direction `dir`.
pub fn find<L: LineAccess + ?Sized>(
    text: &L,
    re: &Regex,
    from: Position,
    dir: Direction,
    count: usize,
    wrapscan: bool,
) -> Option<Found> {
    let mut pos = from;
    let mut wrapped = false;
    for _ in 0..count.max(1) {
        let found = find_once(text, re, pos, dir, wrapscan)?;
        wrapped |= found.wrapped;
        pos = found.pos;
    }
    debug!(target: "engine.search", line = pos.line, byte = pos.byte, wrapped, "search_match");
    Some(Found { pos, wrapped })
}

/// Identifier for `*`, `#`, `gd` and `CTRL-]`: the keyword under or after
/// the cursor, else the non-blank run there. Returns the text and whether
/// it is a keyword.
pub fn ident_under_cursor(line: &str, byte: usize) -> Option<(String, bool)> {
    let clusters: Vec<(usize, &str)> = grapheme::iter(line)
        .scan(0usize, |off, g| {
            let start = *off;
            *off += g.len();
            Some((start, g))
        })
        .collect();
    let cur = clusters.iter().position(|&(s, g)| s + g.len() > byte)?;
    let pick = |pred: &dyn Fn(&str) -> bool| -> Option<String> {
        let first = (cur..clusters.len()).find(|&i| pred(clusters[i].1))?;
        let mut start = first;
        while start > 0 && pred(clusters[start - 1].1) {
            start -= 1;
        }
        let mut end = first;
        while end + 1 < clusters.len() && pred(clusters[end + 1].1) {
            end += 1;
        }
        Some(clusters[start..=end].iter().map(|&(_, g)| g).collect())
    };
    if let Some(word) = pick(&|g| grapheme::is_word(g)) {
        return Some((word, true));
    }
    pick(&|g| g.chars().next().is_some_and(|c| !grapheme::is_blank(c))).map(|s| (s, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn buf(text: &str) -> Buffer {
        Buffer::from_str("t", text).unwrap()
    }

    #[test]
    fn forward_wraps_to_top() {
        let b = buf("foo\nbar\nfoo bar");
        let re = compile("foo", false, false).unwrap();
        let f = find(&b, &re, Position::new(2, 0), Direction::Forward, 1, true).unwrap();
        assert_eq!(f, Found { pos: Position::new(0, 0), wrapped: true });
        assert!(find(&b, &re, Position::new(2, 0), Direction::Forward, 1, false).is_none());
    }

    #[test]
    fn backward_with_count() {
        let b = buf("ab ab\nab");
        let re = compile("ab", false, false).unwrap();
        let f = find(&b, &re, Position::new(1, 0), Direction::Backward, 2, true).unwrap();
        assert_eq!(f.pos, Position::new(0, 0));
        assert!(!f.wrapped);
    }

    #[test]
    fn smartcase_respects_uppercase() {
        let b = buf("Foo foo");
        let re = compile("foo", true, true).unwrap();
        assert_eq!(find(&b, &re, Position::new(0, 6), Direction::Forward, 1, true).unwrap().pos.byte, 0);
        let re = compile("Foo", true, true).unwrap();
        assert!(!re.is_match("foo"));
    }

    #[test]
    fn word_anchors_and_bad_patterns() {
        let re = compile("\\<ab\\>", false, false).unwrap();
        assert!(re.is_match("x ab y"));
        assert!(!re.is_match("xaby"));
        assert!(matches!(compile("(", false, false), Err(CommandError::InvalidPattern { .. })));
    }

    #[test]
    fn identifier_under_or_after_cursor() {
        assert_eq!(ident_under_cursor("  foo_bar(x)", 5), Some(("foo_bar".to_string(), true)));
        assert_eq!(ident_under_cursor("  foo bar", 0), Some(("foo".to_string(), true)));
        assert_eq!(ident_under_cursor("a ++ b", 2), Some(("b".to_string(), true)));
        assert_eq!(ident_under_cursor("++", 0), Some(("++".to_string(), false)));
        assert_eq!(ident_under_cursor("   ", 1), None);
    }
}
