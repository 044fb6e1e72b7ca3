//! Primitive cursor motions.
//!
//! These operate on any [`LineAccess`] plus a [`Position`] and carry no editor
//! state. Counts, operators and jump bookkeeping live in the engine; this
//! module only answers "where does the cursor go".
//!
//! Stepping functions follow Vi's conventions: the position after the last
//! character of a line (`byte == line_len`) is that line's NUL, and word
//! motions treat it as blank.

use crate::{LineAccess, Position, column, grapheme};

/// Direction of a search-like motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// Result of a single character step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Moved within the line.
    Within,
    /// Moved onto the NUL after the last character.
    OntoNul,
    /// Crossed into another line.
    NewLine,
    /// Already at the buffer boundary; nothing moved.
    Stuck,
}

impl Step {
    fn crossed(self) -> bool {
        matches!(self, Step::OntoNul | Step::NewLine)
    }
}

/// Move forward one character, possibly onto the NUL or into the next line.
pub fn inc<L: LineAccess + ?Sized>(text: &L, pos: &mut Position) -> Step {
    let line = text.line_text(pos.line);
    if pos.byte < line.len() {
        pos.byte = grapheme::next_boundary(&line, pos.byte);
        return if pos.byte < line.len() {
            Step::Within
        } else {
            Step::OntoNul
        };
    }
    if pos.line + 1 < text.line_count() {
        pos.line += 1;
        pos.byte = 0;
        return Step::NewLine;
    }
    Step::Stuck
}

/// Like [`inc`], but never rests on a NUL of a non-empty line.
pub fn incl<L: LineAccess + ?Sized>(text: &L, pos: &mut Position) -> Step {
    let r = inc(text, pos);
    if r.crossed() && pos.byte > 0 {
        return inc(text, pos);
    }
    r
}

/// Move backward one character; crossing a line boundary lands on the NUL of
/// the previous line.
pub fn dec<L: LineAccess + ?Sized>(text: &L, pos: &mut Position) -> Step {
    if pos.byte > 0 {
        let line = text.line_text(pos.line);
        pos.byte = grapheme::prev_boundary(&line, pos.byte.min(line.len()));
        return Step::Within;
    }
    if pos.line > 0 {
        pos.line -= 1;
        pos.byte = text.line_len(pos.line);
        return Step::NewLine;
    }
    Step::Stuck
}

/// Like [`dec`], but skips over the NUL of a non-empty previous line.
pub fn decl<L: LineAccess + ?Sized>(text: &L, pos: &mut Position) -> Step {
    let r = dec(text, pos);
    if r == Step::NewLine && pos.byte > 0 {
        return dec(text, pos);
    }
    r
}

/// Character class used by word motions: 0 blank (and NUL), 1 punctuation,
/// 2 word characters. With `bigword` every non-blank is class 1.
pub fn cls<L: LineAccess + ?Sized>(text: &L, pos: Position, bigword: bool) -> u8 {
    let line = text.line_text(pos.line);
    let g = grapheme::cluster_at(&line, pos.byte);
    class_of(g, bigword)
}

pub fn class_of(g: &str, bigword: bool) -> u8 {
    match g.chars().next() {
        None => 0,
        Some(c) if grapheme::is_blank(c) => 0,
        Some(_) if bigword => 1,
        Some(_) if grapheme::is_word(g) => 2,
        Some(_) => 1,
    }
}

fn at_empty_line<L: LineAccess + ?Sized>(text: &L, pos: Position) -> bool {
    pos.byte == 0 && text.line_is_empty(pos.line)
}

/// `w` / `W`. With `eol` (used under an operator) the last word stops at the
/// end of its line instead of wrapping. Returns false when no word could be
/// reached at all.
pub fn fwd_word<L: LineAccess + ?Sized>(
    text: &L,
    pos: &mut Position,
    count: usize,
    bigword: bool,
    eol: bool,
) -> bool {
    let mut remaining = count;
    while remaining > 0 {
        remaining -= 1;
        let last_round = remaining == 0;
        let sclass = cls(text, *pos, bigword);
        let last_line = pos.line + 1 == text.line_count();
        let step = inc(text, pos);
        if step == Step::Stuck || (step.crossed() && last_line) {
            return false;
        }
        if step.crossed() && eol && last_round {
            return true;
        }
        if sclass != 0 {
            while cls(text, *pos, bigword) == sclass {
                let step = inc(text, pos);
                if step == Step::Stuck || (step.crossed() && eol && last_round) {
                    return true;
                }
            }
        }
        while cls(text, *pos, bigword) == 0 {
            if at_empty_line(text, *pos) {
                break;
            }
            let step = inc(text, pos);
            if step == Step::Stuck || (step.crossed() && eol && last_round) {
                return true;
            }
        }
    }
    true
}

/// Skip characters of class `class`. Returns true when the buffer boundary was hit.
fn skip_class<L: LineAccess + ?Sized>(
    text: &L,
    pos: &mut Position,
    class: u8,
    bigword: bool,
    dir: Direction,
) -> bool {
    while cls(text, *pos, bigword) == class {
        let step = match dir {
            Direction::Forward => inc(text, pos),
            Direction::Backward => dec(text, pos),
        };
        if step == Step::Stuck {
            return true;
        }
    }
    false
}

/// `b` / `B`. `stop` keeps the cursor inside the current word when it is
/// not at its start (used by `cw` style callers).
pub fn bck_word<L: LineAccess + ?Sized>(
    text: &L,
    pos: &mut Position,
    count: usize,
    bigword: bool,
    mut stop: bool,
) -> bool {
    for _ in 0..count {
        let sclass = cls(text, *pos, bigword);
        if dec(text, pos) == Step::Stuck {
            return false;
        }
        let mut finished = false;
        if !stop || sclass == cls(text, *pos, bigword) || sclass == 0 {
            while cls(text, *pos, bigword) == 0 {
                if at_empty_line(text, *pos) {
                    finished = true;
                    break;
                }
                if dec(text, pos) == Step::Stuck {
                    return true;
                }
            }
            if !finished {
                let c = cls(text, *pos, bigword);
                if skip_class(text, pos, c, bigword, Direction::Backward) {
                    return true;
                }
            }
        }
        if !finished {
            inc(text, pos);
        }
        stop = false;
    }
    true
}

/// `e` / `E`. `empty` stops on empty lines.
pub fn end_word<L: LineAccess + ?Sized>(
    text: &L,
    pos: &mut Position,
    count: usize,
    bigword: bool,
    mut stop: bool,
    empty: bool,
) -> bool {
    for _ in 0..count {
        let sclass = cls(text, *pos, bigword);
        if inc(text, pos) == Step::Stuck {
            return false;
        }
        let mut finished = false;
        if cls(text, *pos, bigword) == sclass && sclass != 0 {
            if skip_class(text, pos, sclass, bigword, Direction::Forward) {
                return false;
            }
        } else if !stop || sclass == 0 {
            while cls(text, *pos, bigword) == 0 {
                if empty && at_empty_line(text, *pos) {
                    finished = true;
                    break;
                }
                if inc(text, pos) == Step::Stuck {
                    return false;
                }
            }
            if !finished {
                let c = cls(text, *pos, bigword);
                if skip_class(text, pos, c, bigword, Direction::Forward) {
                    return false;
                }
            }
        }
        if !finished {
            dec(text, pos);
        }
        stop = false;
    }
    true
}

/// `ge` / `gE`: backward to the end of the previous word.
pub fn bckend_word<L: LineAccess + ?Sized>(
    text: &L,
    pos: &mut Position,
    count: usize,
    bigword: bool,
    eol: bool,
) -> bool {
    for _ in 0..count {
        let sclass = cls(text, *pos, bigword);
        let step = dec(text, pos);
        if step == Step::Stuck {
            return false;
        }
        if eol && step == Step::NewLine {
            return true;
        }
        if sclass != 0 {
            while cls(text, *pos, bigword) == sclass {
                let step = dec(text, pos);
                if step == Step::Stuck || (eol && step == Step::NewLine) {
                    return true;
                }
            }
        }
        while cls(text, *pos, bigword) == 0 {
            if at_empty_line(text, *pos) {
                break;
            }
            let step = dec(text, pos);
            if step == Step::Stuck || (eol && step == Step::NewLine) {
                return true;
            }
        }
    }
    true
}

/// Byte offset of the first non-blank, or of the last character when the
/// line is all blank and `fix` is set.
pub fn first_nonblank(line: &str, fix: bool) -> usize {
    let b = column::first_nonblank(line);
    if fix && b == line.len() && b > 0 {
        grapheme::last_start(line)
    } else {
        b
    }
}

const PARAGRAPH_MACROS: &str = "IPLPPPQPP TPHPLIPpLpItpplpipbp";
const SECTION_MACROS: &str = "SHNHH HUnhsh";

fn macro_listed(list: &str, name: &[char]) -> bool {
    let mut chars = list.chars();
    loop {
        let a = chars.next();
        let b = chars.next();
        match (a, b) {
            (Some(a), b) => {
                let b = b.unwrap_or(' ');
                let n0 = name.first().copied().unwrap_or(' ');
                let n1 = name.get(1).copied().unwrap_or(' ');
                if a == n0 && (b == n1 || (b == ' ' && name.len() < 2)) {
                    return true;
                }
            }
            (None, _) => return false,
        }
    }
}

/// Line starts a paragraph or section: empty, form feed, `what` (`{`/`}` for
/// sections) or an nroff macro.
fn starts_paragraph(line: &str, what: Option<char>, both: bool) -> bool {
    let mut chars = line.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if Some(first) == what || first == '\u{c}' || (both && first == '}') {
        return true;
    }
    if first == '.' {
        let name: Vec<char> = chars.take(2).collect();
        let list = if what.is_some() {
            SECTION_MACROS
        } else {
            PARAGRAPH_MACROS
        };
        return macro_listed(list, &name);
    }
    false
}

/// `{` / `}` (and section-style searches when `what` is given). Returns the
/// new position and whether the motion became inclusive (end of the last
/// line), or `None` when the count could not be satisfied.
pub fn paragraph<L: LineAccess + ?Sized>(
    text: &L,
    pos: Position,
    count: usize,
    dir: Direction,
    what: Option<char>,
    both: bool,
) -> Option<(Position, bool)> {
    let line_count = text.line_count();
    let mut curr = pos.line;
    let mut remaining = count;
    while remaining > 0 {
        remaining -= 1;
        let mut did_skip = false;
        let mut first = true;
        loop {
            if !text.line_is_empty(curr) {
                did_skip = true;
            }
            if !first && did_skip && starts_paragraph(&text.line_text(curr), what, both) {
                break;
            }
            first = false;
            let next = match dir {
                Direction::Forward => curr.checked_add(1).filter(|&n| n < line_count),
                Direction::Backward => curr.checked_sub(1),
            };
            match next {
                Some(n) => curr = n,
                None => {
                    if remaining > 0 {
                        return None;
                    }
                    break;
                }
            }
        }
    }
    if both && text.line_text(curr).starts_with('}') && curr + 1 < line_count {
        curr += 1;
    }
    if curr + 1 == line_count && what != Some('}') && dir == Direction::Forward {
        let line = text.line_text(curr);
        if line.is_empty() {
            return Some((Position::new(curr, 0), false));
        }
        return Some((Position::new(curr, grapheme::last_start(&line)), true));
    }
    Some((Position::new(curr, 0), false))
}

/// `f` `F` `t` `T` within one line. `skip_adjacent` implements the `;`
/// repeat of `t`/`T` stepping over a match right next to the cursor.
pub fn find_char(
    line: &str,
    byte: usize,
    target: &str,
    dir: Direction,
    till: bool,
    count: usize,
    skip_adjacent: bool,
) -> Option<usize> {
    if target.is_empty() {
        return None;
    }
    let mut col = byte.min(line.len());
    let mut stop = !skip_adjacent;
    for _ in 0..count.max(1) {
        loop {
            match dir {
                Direction::Forward => {
                    col = grapheme::next_boundary(line, col);
                    if col >= line.len() {
                        return None;
                    }
                }
                Direction::Backward => {
                    if col == 0 {
                        return None;
                    }
                    col = grapheme::prev_boundary(line, col);
                }
            }
            if grapheme::cluster_at(line, col) == target && stop {
                break;
            }
            stop = true;
        }
    }
    if till {
        col = match dir {
            Direction::Forward => grapheme::prev_boundary(line, col),
            Direction::Backward => grapheme::next_boundary(line, col),
        };
    }
    Some(col)
}

const PAIRS: [(char, char); 3] = [('(', ')'), ('[', ']'), ('{', '}')];

/// `%`: find the first bracket at or after the cursor in the line and jump
/// to its partner, honoring nesting across lines.
pub fn match_pair<L: LineAccess + ?Sized>(text: &L, pos: Position) -> Option<Position> {
    let line = text.line_text(pos.line);
    let (start_byte, c) = line
        .char_indices()
        .filter(|&(i, _)| i >= pos.byte)
        .find(|&(_, c)| PAIRS.iter().any(|&(o, cl)| c == o || c == cl))?;
    let (open, close, dir) = PAIRS.iter().find_map(|&(o, cl)| {
        if c == o {
            Some((o, cl, Direction::Forward))
        } else if c == cl {
            Some((o, cl, Direction::Backward))
        } else {
            None
        }
    })?;
    let mut depth = 0usize;
    let mut cur = Position::new(pos.line, start_byte);
    loop {
        let l = text.line_text(cur.line);
        if let Some(ch) = grapheme::char_at(&l, cur.byte) {
            if ch == open {
                match dir {
                    Direction::Forward => depth += 1,
                    Direction::Backward => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(cur);
                        }
                    }
                }
            } else if ch == close {
                match dir {
                    Direction::Backward => depth += 1,
                    Direction::Forward => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(cur);
                        }
                    }
                }
            }
        }
        let step = match dir {
            Direction::Forward => inc(text, &mut cur),
            Direction::Backward => dec(text, &mut cur),
        };
        if step == Step::Stuck {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn inc_reports_nul_and_line_crossing() {
        let t = lines(&["ab", "c"]);
        let t = t.as_slice();
        let mut p = Position::new(0, 0);
        assert_eq!(inc(t, &mut p), Step::Within);
        assert_eq!(inc(t, &mut p), Step::OntoNul);
        assert_eq!(p, Position::new(0, 2));
        assert_eq!(inc(t, &mut p), Step::NewLine);
        assert_eq!(inc(t, &mut p), Step::OntoNul);
        assert_eq!(inc(t, &mut p), Step::Stuck);
    }

    #[test]
    fn dec_lands_on_previous_nul() {
        let t = lines(&["ab", "c"]);
        let mut p = Position::new(1, 0);
        assert_eq!(dec(t.as_slice(), &mut p), Step::NewLine);
        assert_eq!(p, Position::new(0, 2));
        let mut p = Position::new(1, 0);
        decl(t.as_slice(), &mut p);
        assert_eq!(p, Position::new(0, 1));
    }

    #[test]
    fn word_forward_counts() {
        let t = lines(&["alpha beta gamma"]);
        let mut p = Position::origin();
        assert!(fwd_word(t.as_slice(), &mut p, 2, false, false));
        assert_eq!(p, Position::new(0, 11));
    }

    #[test]
    fn word_forward_punctuation_is_its_own_word() {
        let t = lines(&["foo.bar baz"]);
        let mut p = Position::origin();
        fwd_word(t.as_slice(), &mut p, 1, false, false);
        assert_eq!(p.byte, 3);
        let mut p = Position::origin();
        fwd_word(t.as_slice(), &mut p, 1, true, false);
        assert_eq!(p.byte, 8);
    }

    #[test]
    fn word_forward_stops_on_empty_line() {
        let t = lines(&["one", "", "two"]);
        let mut p = Position::origin();
        fwd_word(t.as_slice(), &mut p, 1, false, false);
        assert_eq!(p, Position::new(1, 0));
    }

    #[test]
    fn word_forward_eol_stops_at_line_end() {
        let t = lines(&["one two", "three"]);
        let mut p = Position::new(0, 4);
        fwd_word(t.as_slice(), &mut p, 1, false, true);
        assert_eq!(p, Position::new(0, 7));
    }

    #[test]
    fn word_forward_fails_on_last_word_of_buffer() {
        let t = lines(&["one"]);
        let mut p = Position::new(0, 2);
        assert!(!fwd_word(t.as_slice(), &mut p, 1, false, false));
    }

    #[test]
    fn word_backward_and_end() {
        let t = lines(&["alpha beta", "gamma"]);
        let mut p = Position::new(1, 2);
        bck_word(t.as_slice(), &mut p, 1, false, false);
        assert_eq!(p, Position::new(1, 0));
        bck_word(t.as_slice(), &mut p, 1, false, false);
        assert_eq!(p, Position::new(0, 6));
        let mut p = Position::origin();
        end_word(t.as_slice(), &mut p, 1, false, false, false);
        assert_eq!(p, Position::new(0, 4));
        end_word(t.as_slice(), &mut p, 2, false, false, false);
        assert_eq!(p, Position::new(1, 4));
    }

    #[test]
    fn backward_end_of_word() {
        let t = lines(&["alpha beta"]);
        let mut p = Position::new(0, 7);
        bckend_word(t.as_slice(), &mut p, 1, false, false);
        assert_eq!(p, Position::new(0, 4));
    }

    #[test]
    fn paragraph_forward_and_back() {
        let t = lines(&["a", "b", "", "c", "d"]);
        let (p, incl) = paragraph(t.as_slice(), Position::origin(), 1, Direction::Forward, None, false).unwrap();
        assert_eq!((p, incl), (Position::new(2, 0), false));
        let (p, incl) = paragraph(t.as_slice(), Position::origin(), 2, Direction::Forward, None, false).unwrap();
        assert_eq!((p, incl), (Position::new(4, 0), true));
        let (p, _) = paragraph(t.as_slice(), Position::new(4, 0), 1, Direction::Backward, None, false).unwrap();
        assert_eq!(p, Position::new(2, 0));
        assert!(paragraph(t.as_slice(), Position::origin(), 5, Direction::Forward, None, false).is_none());
    }

    #[test]
    fn find_char_variants() {
        let s = "a,b,c,d";
        assert_eq!(find_char(s, 0, ",", Direction::Forward, false, 2, false), Some(3));
        assert_eq!(find_char(s, 0, ",", Direction::Forward, true, 1, false), Some(0));
        assert_eq!(find_char(s, 0, ",", Direction::Forward, true, 1, true), Some(2));
        assert_eq!(find_char(s, 6, ",", Direction::Backward, false, 1, false), Some(5));
        assert_eq!(find_char(s, 0, "x", Direction::Forward, false, 1, false), None);
    }

    #[test]
    fn match_pair_across_lines() {
        let t = lines(&["f(a, {", "  b[1]", "})"]);
        let p = match_pair(t.as_slice(), Position::origin()).unwrap();
        assert_eq!(p, Position::new(2, 1));
        let back = match_pair(t.as_slice(), p).unwrap();
        assert_eq!(back, Position::new(0, 1));
        assert_eq!(match_pair(t.as_slice(), Position::new(1, 0)), Some(Position::new(1, 5)));
    }

    #[test]
    fn first_nonblank_with_fix() {
        assert_eq!(first_nonblank("  x", false), 2);
        assert_eq!(first_nonblank("   ", false), 3);
        assert_eq!(first_nonblank("   ", true), 2);
        assert_eq!(first_nonblank("", true), 0);
    }
}
