//! Character-range edits on top of the line-oriented [`TextStore`].
//!
//! Ranges are half-open: `end` is the first position not included. An end of
//! `(line + 1, 0)` includes the newline of `line`.

use std::ops::Range;

use core_state::TextStore;
use core_text::{LineAccess, Position};

use crate::error::CommandError;

/// Snapshot `lines` before changing them.
pub(crate) fn save_undo(
    text: &mut dyn TextStore,
    lines: Range<usize>,
    cursor: Position,
) -> Result<(), CommandError> {
    if !text.is_modifiable() {
        return Err(CommandError::NotAllowedInContext);
    }
    text.save_for_undo(lines, cursor)?;
    Ok(())
}

/// Clamp an exclusive end that points past the last line.
fn clamp_end<L: LineAccess + ?Sized>(text: &L, end: Position) -> Position {
    let count = text.line_count();
    if end.line >= count {
        let last = count.saturating_sub(1);
        return Position::new(last, text.line_len(last));
    }
    Position::new(end.line, end.byte.min(text.line_len(end.line)))
}

/// Text in `[start, end)`, one entry per line.
pub(crate) fn get_chars<L: LineAccess + ?Sized>(text: &L, start: Position, end: Position) -> Vec<String> {
    let end = clamp_end(text, end);
    if end.line == start.line {
        let line = text.line_text(start.line);
        let s = start.byte.min(line.len());
        let e = end.byte.clamp(s, line.len());
        return vec![line[s..e].to_string()];
    }
    let mut out = Vec::with_capacity(end.line - start.line + 1);
    let first = text.line_text(start.line);
    out.push(first[start.byte.min(first.len())..].to_string());
    for l in start.line + 1..end.line {
        out.push(text.line_text(l));
    }
    let last = text.line_text(end.line);
    out.push(last[..end.byte.min(last.len())].to_string());
    out
}

/// Remove `[start, end)`, joining the surrounding lines.
pub(crate) fn delete_chars(text: &mut dyn TextStore, start: Position, end: Position) -> Result<(), CommandError> {
    let count = text.line_count();
    let past_last = end.line >= count;
    let end = clamp_end(&*text, end);
    let first = text.line_text(start.line);
    let head = &first[..start.byte.min(first.len())];
    if end.line == start.line && !past_last {
        let tail = &first[end.byte.max(start.byte).min(first.len())..];
        let joined = format!("{head}{tail}");
        text.replace_line(start.line, &joined)?;
        return Ok(());
    }
    let last = text.line_text(end.line);
    let tail = if past_last { "" } else { &last[end.byte.min(last.len())..] };
    let joined = format!("{head}{tail}");
    text.replace_line(start.line, &joined)?;
    if end.line > start.line {
        text.delete_lines(start.line + 1..end.line + 1)?;
    }
    Ok(())
}

/// Insert `s` (which may contain newlines) at `pos`. Returns the position
/// just after the inserted text.
pub(crate) fn insert_text(text: &mut dyn TextStore, pos: Position, s: &str) -> Result<Position, CommandError> {
    let line = text.line_text(pos.line);
    let at = pos.byte.min(line.len());
    let (head, tail) = line.split_at(at);
    let parts: Vec<&str> = s.split('\n').collect();
    if let [only] = parts.as_slice() {
        text.replace_line(pos.line, &format!("{head}{only}{tail}"))?;
        return Ok(Position::new(pos.line, at + only.len()));
    }
    let tail = tail.to_string();
    text.replace_line(pos.line, &format!("{head}{}", parts[0]))?;
    let mut l = pos.line;
    for mid in &parts[1..parts.len() - 1] {
        l += 1;
        text.insert_line(l, mid)?;
    }
    l += 1;
    let last = parts[parts.len() - 1];
    text.insert_line(l, &format!("{last}{tail}"))?;
    Ok(Position::new(l, last.len()))
}

/// Replace bytes `range` of line `line` with `with`.
pub(crate) fn replace_bytes(
    text: &mut dyn TextStore,
    line: usize,
    range: Range<usize>,
    with: &str,
) -> Result<(), CommandError> {
    let mut s = text.line_text(line);
    let end = range.end.min(s.len());
    let start = range.start.min(end);
    s.replace_range(start..end, with);
    text.replace_line(line, &s)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::EditorState;
    use pretty_assertions::assert_eq;

    fn state(t: &str) -> EditorState {
        EditorState::from_text("t", t).unwrap()
    }

    #[test]
    fn get_and_delete_across_lines() {
        let mut st = state("one\ntwo\nthree");
        let (s, e) = (Position::new(0, 1), Position::new(2, 2));
        assert_eq!(get_chars(&st, s, e), vec!["ne", "two", "th"]);
        delete_chars(&mut st, s, e).unwrap();
        assert_eq!(st.contents(), "oree");
    }

    #[test]
    fn delete_through_newline_of_last_line() {
        let mut st = state("ab\ncd");
        delete_chars(&mut st, Position::new(1, 0), Position::new(2, 0)).unwrap();
        assert_eq!(st.line_text(1), "");
        assert_eq!(st.line_count(), 2);
    }

    #[test]
    fn insert_multiline_text() {
        let mut st = state("abcd");
        let end = insert_text(&mut st, Position::new(0, 2), "X\nYY\nZ").unwrap();
        assert_eq!(end, Position::new(2, 1));
        assert_eq!(st.contents(), "abX\nYY\nZcd");
    }
}
