//! Text objects: `iw aw iW aW`, `ip ap`, quoted strings and bracket blocks.
//!
//! After an operator an object sets the operator range; in Visual mode it
//! sets the selection. A Visual selection that already covers an object
//! grows to the next one.

use core_state::TextStore;
use core_text::motion::{Direction, Step, class_of, dec, decl, inc, incl};
use core_text::{Position, grapheme};
use tracing::debug;

use crate::engine::{Engine, EngineContext};
use crate::error::CommandError;
use crate::state::{CommandArg, MotionType, VisualKind};

/// Range found by a text object. `end` is inclusive unless `inclusive` is
/// false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ObjectSpan {
    start: Position,
    end: Position,
    inclusive: bool,
    linewise: bool,
}

impl Engine {
    /// `i{object}` and `a{object}`.
    pub(crate) fn nv_object(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let include = cap.cmd_is('a');
        let c = cap.nchar.as_char().ok_or(CommandError::UnknownCommand(cap.nchar))?;
        let text = &*cx.text;
        let count = cap.count1;
        let span = match c {
            'w' => self.current_word(text, count, include, false),
            'W' => self.current_word(text, count, include, true),
            'b' | '(' | ')' => self.current_block(text, count, include, '(', ')'),
            'B' | '{' | '}' => self.current_block(text, count, include, '{', '}'),
            '[' | ']' => self.current_block(text, count, include, '[', ']'),
            '<' | '>' => self.current_block(text, count, include, '<', '>'),
            'p' => self.current_par(text, count, include),
            '"' | '\'' | '`' => current_quote(text, self.cursor, count, include, c),
            _ => return Err(CommandError::UnknownCommand(cap.nchar)),
        };
        let Some(span) = span else {
            debug!(target: "engine.motion", object = %c, include, "text_object_not_found");
            return Err(CommandError::OutOfRangeMotion);
        };
        debug!(
            target: "engine.motion",
            object = %c,
            include,
            start_line = span.start.line,
            end_line = span.end.line,
            "text_object"
        );

        if self.visual.active {
            self.visual.anchor = span.start;
            self.cursor = span.end;
            if span.linewise {
                self.visual.kind = VisualKind::Line;
            } else if self.visual.kind == VisualKind::Line {
                self.visual.kind = VisualKind::Char;
            }
        } else {
            self.oap.start = span.start;
            self.cursor = span.end;
            self.oap.motion_type = if span.linewise { MotionType::Line } else { MotionType::Char };
            self.oap.inclusive = span.inclusive;
        }
        self.set_curswant = true;
        Ok(())
    }

    /// `iw` and friends. Inner objects count runs of blanks as objects too;
    /// `aw` takes trailing blanks, or leading blanks when there are none.
    fn current_word(&self, text: &dyn TextStore, count: usize, include: bool, bigword: bool) -> Option<ObjectSpan> {
        let class_at = |p: Position| class_of(grapheme::cluster_at(&text.line_text(p.line), p.byte), bigword);
        let mut remaining = count;
        let mut include_white = false;
        let (start, mut end);
        if self.visual.active && self.visual.anchor < self.cursor {
            start = self.visual.anchor;
            end = self.cursor;
        } else {
            let line = text.line_text(self.cursor.line);
            let b = grapheme::floor_boundary(&line, self.cursor.byte.min(line.len()));
            let class = class_of(grapheme::cluster_at(&line, b), bigword);
            start = Position::new(self.cursor.line, run_start(&line, b, bigword));
            end = Position::new(self.cursor.line, run_last(&line, start.byte, bigword));
            if (class == 0) == include {
                // On blanks for `aw`: the blanks and the following word.
                if class == 0 && end.byte < line.len() {
                    let after = grapheme::next_boundary(&line, end.byte);
                    if after < line.len() {
                        end.byte = run_last(&line, after, bigword);
                    }
                }
            } else if include {
                // On a word for `aw`: the word and the blanks after it.
                include_white = true;
                let after = grapheme::next_boundary(&line, end.byte);
                if after < line.len() && class_of(grapheme::cluster_at(&line, after), bigword) == 0 {
                    end.byte = run_last(&line, after, bigword);
                }
            }
            remaining -= 1;
        }

        while remaining > 0 {
            remaining -= 1;
            let mut next = end;
            if incl(text, &mut next) == Step::Stuck {
                return None;
            }
            let line = text.line_text(next.line);
            let class = class_at(next);
            end = Position::new(next.line, run_last(&line, next.byte, bigword));
            if !include {
                continue;
            }
            let after = grapheme::next_boundary(&line, end.byte);
            if after < line.len() {
                let white_after = class_of(grapheme::cluster_at(&line, after), bigword) == 0;
                // Blanks take the following word, a word its trailing blanks.
                if (class == 0) != white_after {
                    end.byte = run_last(&line, after, bigword);
                }
            }
        }

        let mut start = start;
        if include_white && class_at(end) != 0 && start.byte > 0 {
            // No trailing blanks: take the blanks before the word, unless
            // they are the indent.
            let line = text.line_text(start.line);
            let before = grapheme::prev_boundary(&line, start.byte);
            if class_of(grapheme::cluster_at(&line, before), bigword) == 0 {
                let white = run_start(&line, before, bigword);
                if white > 0 {
                    start.byte = white;
                }
            }
        }
        Some(ObjectSpan {
            start,
            end,
            inclusive: true,
            linewise: false,
        })
    }

    /// `i(`, `a{` and the other bracket pairs. An inner block whose closing
    /// bracket starts its line ends with the line before.
    fn current_block(
        &self,
        text: &dyn TextStore,
        count: usize,
        include: bool,
        open: char,
        close: char,
    ) -> Option<ObjectSpan> {
        let visual_range = self.visual.active && self.visual.anchor != self.cursor;
        let (old_start, old_end) = if !visual_range {
            (self.cursor, self.cursor)
        } else if self.visual.anchor < self.cursor {
            (self.visual.anchor, self.cursor)
        } else {
            (self.cursor, self.visual.anchor)
        };

        let mut from = old_start;
        if !visual_range {
            if open == '{' {
                while in_indent_incl(text, from) {
                    if inc(text, &mut from) != Step::Within {
                        break;
                    }
                }
            }
            let line = text.line_text(from.line);
            if grapheme::char_at(&line, from.byte) == Some(open) {
                from.byte = grapheme::next_boundary(&line, from.byte);
            }
        }

        let mut start = find_unmatched(text, from, open, close, Direction::Backward)?;
        for _ in 1..count {
            match find_unmatched(text, start, open, close, Direction::Backward) {
                Some(p) => start = p,
                None => break,
            }
        }
        let mut end = find_unmatched(text, start, close, open, Direction::Forward)?;

        let mut sol = false;
        if !include {
            loop {
                let mut s = start;
                incl(text, &mut s);
                let mut e = end;
                sol = e.byte == 0;
                decl(text, &mut e);
                while in_indent_incl(text, e) {
                    sol = true;
                    if decl(text, &mut e) != Step::Within {
                        break;
                    }
                }
                if self.visual.active && s >= old_start && e <= old_end && s != e {
                    // Nothing new would be selected: go one block out.
                    let mut p = old_start;
                    decl(text, &mut p);
                    start = find_unmatched(text, p, open, close, Direction::Backward)?;
                    end = find_unmatched(text, start, close, open, Direction::Forward)?;
                    continue;
                }
                start = s;
                end = e;
                break;
            }
        }

        let mut inclusive = true;
        if self.visual.active {
            let line = text.line_text(end.line);
            if sol && end.byte < line.len() {
                inc(text, &mut end);
            }
        } else if sol {
            incl(text, &mut end);
            inclusive = false;
        } else if end < start {
            // Nothing between the brackets.
            end = start;
            inclusive = false;
        }
        Some(ObjectSpan {
            start,
            end,
            inclusive,
            linewise: false,
        })
    }

    /// `ip` and `ap`. Runs of blank lines count as paragraphs for `ip`;
    /// `ap` takes the blank lines after the paragraph, or before it when
    /// there are none after.
    fn current_par(&self, text: &dyn TextStore, count: usize, include: bool) -> Option<ObjectSpan> {
        let n = text.line_count();
        let white = |l: usize| text.line_text(l).chars().all(|c| c == ' ' || c == '\t');
        let starts_par = |l: usize| text.line_text(l).starts_with('\u{c}');

        let extend = self.visual.active && self.visual.anchor.line < self.cursor.line;
        let mut start = if extend { self.cursor.line + 1 } else { self.cursor.line };
        if start >= n {
            return None;
        }
        let white_in_front = white(start);
        if !extend {
            while start > 0 {
                if white_in_front {
                    if !white(start - 1) {
                        break;
                    }
                } else if white(start - 1) || starts_par(start) {
                    break;
                }
                start -= 1;
            }
        }

        // Lines `start..stop` are part of the object.
        let mut stop = start;
        while stop < n && white(stop) {
            stop += 1;
        }
        let mut i = count;
        if !include && white_in_front {
            i -= 1;
        }
        while i > 0 {
            i -= 1;
            if stop == n {
                return None;
            }
            let do_white = !include && white(stop);
            if include || !do_white {
                stop += 1;
                while stop < n && !white(stop) && !starts_par(stop) {
                    stop += 1;
                }
            }
            if i == 0 && white_in_front && include {
                break;
            }
            if include || do_white {
                while stop < n && white(stop) {
                    stop += 1;
                }
            }
        }
        if !white_in_front && !white(stop - 1) && include && !extend {
            while start > 0 && white(start - 1) {
                start -= 1;
            }
        }
        let first = if extend { self.visual.anchor.line } else { start };
        Some(ObjectSpan {
            start: Position::new(first, 0),
            end: Position::new(stop - 1, 0),
            inclusive: true,
            linewise: true,
        })
    }
}

/// Start byte of the run of same-class clusters containing `byte`.
fn run_start(line: &str, byte: usize, bigword: bool) -> usize {
    let class = class_of(grapheme::cluster_at(line, byte), bigword);
    let mut b = byte;
    while b > 0 {
        let p = grapheme::prev_boundary(line, b);
        if class_of(grapheme::cluster_at(line, p), bigword) != class {
            break;
        }
        b = p;
    }
    b
}

/// Start byte of the last cluster of the run containing `byte`.
fn run_last(line: &str, byte: usize, bigword: bool) -> usize {
    if byte >= line.len() {
        return byte.min(line.len());
    }
    let class = class_of(grapheme::cluster_at(line, byte), bigword);
    let mut b = byte;
    loop {
        let n = grapheme::next_boundary(line, b);
        if n >= line.len() || class_of(grapheme::cluster_at(line, n), bigword) != class {
            return b;
        }
        b = n;
    }
}

/// Only blanks up to and including the character at `pos`.
fn in_indent_incl(text: &dyn TextStore, pos: Position) -> bool {
    let line = text.line_text(pos.line);
    pos.byte < line.len() && line[..grapheme::next_boundary(&line, pos.byte)].chars().all(|c| c == ' ' || c == '\t')
}

/// The `target` bracket not matched by an `other` bracket, searching from
/// (and excluding) `from`.
fn find_unmatched(
    text: &dyn TextStore,
    from: Position,
    target: char,
    other: char,
    dir: Direction,
) -> Option<Position> {
    let mut pos = from;
    let mut depth = 0usize;
    loop {
        let step = match dir {
            Direction::Forward => inc(text, &mut pos),
            Direction::Backward => dec(text, &mut pos),
        };
        if step == Step::Stuck {
            return None;
        }
        match grapheme::char_at(&text.line_text(pos.line), pos.byte) {
            Some(c) if c == other => depth += 1,
            Some(c) if c == target => {
                if depth == 0 {
                    return Some(pos);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
}

/// `i"` and `a"`: quotes pair up from the start of the line; a quote after
/// a backslash does not count. Outside any pair the next quoted string is
/// used.
fn current_quote(text: &dyn TextStore, cursor: Position, count: usize, include: bool, quote: char) -> Option<ObjectSpan> {
    let line = text.line_text(cursor.line);
    let mut quotes = Vec::new();
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            quotes.push(i);
        }
    }
    let before = quotes.iter().filter(|&&q| q < cursor.byte).count();
    let on_quote = quotes.get(before) == Some(&cursor.byte);
    let first = if on_quote {
        if before % 2 == 0 { before } else { before - 1 }
    } else if before % 2 == 1 {
        before - 1
    } else {
        before
    };
    let (&open, &close) = (quotes.get(first)?, quotes.get(first + 1)?);

    let blank = |c: char| c == ' ' || c == '\t';
    let (mut start, mut end, mut inclusive) = (open, close, true);
    if include {
        let trailing = line[close + 1..].len() - line[close + 1..].trim_start_matches(blank).len();
        if trailing > 0 {
            end = close + trailing;
        } else {
            let leading = line[..open].len() - line[..open].trim_end_matches(blank).len();
            if leading < open {
                start = open - leading;
            }
        }
    } else if count < 2 {
        start = open + 1;
        if close == open + 1 {
            end = start;
            inclusive = false;
        } else {
            end = grapheme::prev_boundary(&line, close);
        }
    }
    Some(ObjectSpan {
        start: Position::new(cursor.line, start),
        end: Position::new(cursor.line, end),
        inclusive,
        linewise: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::EngineOptions;
    use core_state::EditorState;
    use pretty_assertions::assert_eq;

    fn engine_at(line: usize, byte: usize) -> Engine {
        let mut e = Engine::new(EngineOptions::default());
        e.cursor = Position::new(line, byte);
        e
    }

    fn span(start: (usize, usize), end: (usize, usize), inclusive: bool, linewise: bool) -> Option<ObjectSpan> {
        Some(ObjectSpan {
            start: Position::new(start.0, start.1),
            end: Position::new(end.0, end.1),
            inclusive,
            linewise,
        })
    }

    #[test]
    fn inner_and_a_word() {
        let st = EditorState::from_text("t", "one two. three").unwrap();
        let e = engine_at(0, 5);
        assert_eq!(e.current_word(&st, 1, false, false), span((0, 4), (0, 6), true, false));
        // No blanks after "two": the blank before it is taken.
        assert_eq!(e.current_word(&st, 1, true, false), span((0, 3), (0, 6), true, false));
        let first = engine_at(0, 0);
        assert_eq!(first.current_word(&st, 1, true, false), span((0, 0), (0, 3), true, false));
        assert_eq!(first.current_word(&st, 3, false, false), span((0, 0), (0, 6), true, false));
    }

    #[test]
    fn big_word_spans_punctuation() {
        let st = EditorState::from_text("t", "a foo.bar b").unwrap();
        let e = engine_at(0, 4);
        assert_eq!(e.current_word(&st, 1, false, true), span((0, 2), (0, 8), true, false));
    }

    #[test]
    fn blocks_nest_and_count() {
        let st = EditorState::from_text("t", "f(a, (b), c)").unwrap();
        let e = engine_at(0, 6);
        assert_eq!(e.current_block(&st, 1, false, '(', ')'), span((0, 6), (0, 6), true, false));
        assert_eq!(e.current_block(&st, 1, true, '(', ')'), span((0, 5), (0, 7), true, false));
        assert_eq!(e.current_block(&st, 2, false, '(', ')'), span((0, 2), (0, 10), true, false));
        let empty = EditorState::from_text("t", "x()").unwrap();
        let on_open = engine_at(0, 1);
        assert_eq!(on_open.current_block(&empty, 1, false, '(', ')'), span((0, 2), (0, 2), false, false));
    }

    #[test]
    fn inner_brace_block_over_lines_stops_before_closing_line() {
        let st = EditorState::from_text("t", "fn x() {\n    body\n}").unwrap();
        let e = engine_at(1, 6);
        // Exclusive at the start of the `}` line.
        assert_eq!(e.current_block(&st, 1, false, '{', '}'), span((1, 0), (2, 0), false, false));
        let none = EditorState::from_text("t", "no brackets").unwrap();
        assert_eq!(engine_at(0, 3).current_block(&none, 1, false, '(', ')'), None);
    }

    #[test]
    fn quotes_pair_from_line_start() {
        let st = EditorState::from_text("t", r#"say "hi \" there" now"#).unwrap();
        let inside = current_quote(&st, Position::new(0, 6), 1, false, '"');
        assert_eq!(inside, span((0, 5), (0, 15), true, false));
        let around = current_quote(&st, Position::new(0, 6), 1, true, '"');
        assert_eq!(around, span((0, 4), (0, 17), true, false));
        // Before any quote: the next quoted string.
        let ahead = current_quote(&st, Position::new(0, 0), 1, false, '"');
        assert_eq!(ahead, inside);
        assert_eq!(current_quote(&st, Position::new(0, 0), 1, false, '\''), None);
    }

    #[test]
    fn paragraphs_with_and_without_blank_lines() {
        let st = EditorState::from_text("t", "a\nb\n\n\nc\nd").unwrap();
        let e = engine_at(1, 0);
        assert_eq!(e.current_par(&st, 1, false), span((0, 0), (1, 0), true, true));
        assert_eq!(e.current_par(&st, 1, true), span((0, 0), (3, 0), true, true));
        // Last paragraph: `ap` takes the blank lines before it.
        let last = engine_at(5, 0);
        assert_eq!(last.current_par(&st, 1, true), span((2, 0), (5, 0), true, true));
        assert_eq!(e.current_par(&st, 2, false), span((0, 0), (3, 0), true, true));
        assert_eq!(last.current_par(&st, 2, false), None);
    }
}
