//! Insert and Replace mode text, applied when the host resumes the engine.
//!
//! The host collects keys until `<Esc>` and hands them back. Keys understood
//! here: printable characters, `<CR>`/`<NL>`, `<Tab>`, `<BS>`/`CTRL-H`
//! (never past the insert start; Replace mode restores the overwritten
//! character), `CTRL-W` and `CTRL-U`. Other special keys are ignored.

use core_events::Key;
use core_state::{RegisterContent, TextStore};
use core_text::motion::{Direction, class_of};
use core_text::{LineAccess, Position, column, grapheme};
use tracing::debug;

use crate::buffer_ops::{get_chars, replace_bytes, save_undo};
use crate::engine::{
    DispatchStatus, Engine, EngineContext, InsertSession, Phase, SubModeKind, SubModeOutcome,
    SubModeRequest, SubModeStart, Suspension,
};
use crate::error::CommandError;
use crate::state::CommandArg;

/// Cursor and undo information while keys are applied.
struct InsertRun {
    start: Position,
    cursor: Position,
    replace: bool,
    /// Per typed character: what it overwrote in Replace mode.
    replaced: Vec<Option<String>>,
}

impl Engine {
    /// Ask for Insert mode once the current command ends.
    pub(crate) fn request_insert(&mut self, session: InsertSession) {
        self.start_request = Some(SubModeStart::Insert(session));
    }

    /// Record `keys` (with `count`) as the start of a repeatable insert.
    pub(crate) fn prep_insert_redo(&mut self, count: usize, keys: &str) {
        let keys: Vec<Key> = keys.chars().map(Key::from_char).collect();
        self.redo.prep(None, if count > 1 { count } else { 0 }, &keys);
    }

    pub(crate) fn enter_insert(&mut self, session: InsertSession) -> DispatchStatus {
        let kind = if session.replace {
            SubModeKind::Replace
        } else {
            SubModeKind::Insert
        };
        let request = SubModeRequest {
            kind,
            token: self.new_token(),
            initial_text: String::new(),
        };
        debug!(target: "engine.fsm", kind = ?kind, line = self.cursor.line, byte = self.cursor.byte, "suspend_insert");
        self.suspended = Some(Suspension::Insert {
            request: request.clone(),
            session,
            start: self.cursor,
        });
        self.phase = Phase::Suspended;
        DispatchStatus::EnteredSubMode(request)
    }

    pub(crate) fn finish_insert(
        &mut self,
        cx: &mut EngineContext<'_>,
        session: InsertSession,
        start: Position,
        keys: &[Key],
    ) -> DispatchStatus {
        if let Err(e) = self.apply_insert(cx, &session, start, keys) {
            return self.abort_with(cx, CommandArg::default(), e);
        }
        self.adjust_cursor_for_normal(cx);
        DispatchStatus::Complete
    }

    fn apply_insert(
        &mut self,
        cx: &mut EngineContext<'_>,
        session: &InsertSession,
        start: Position,
        keys: &[Key],
    ) -> Result<(), CommandError> {
        let mut run = InsertRun {
            start,
            cursor: start,
            replace: session.replace,
            replaced: Vec::new(),
        };
        if !keys.is_empty() {
            save_undo(cx.text, start.line..start.line + 1, start)?;
        }
        for &key in keys {
            self.insert_key(cx.text, &mut run, key)?;
        }
        let net = get_chars(&*cx.text, run.start, run.cursor).join("\n");

        for _ in 1..session.count {
            if session.open_line.is_some() {
                let l = run.cursor.line;
                let indent = self.auto_indent(&cx.text.line_text(l));
                cx.text.insert_line(l + 1, &indent)?;
                self.marks.adjust(l + 1, 1);
                run.cursor = Position::new(l + 1, indent.len());
            }
            for c in net.chars() {
                if c == '\n' {
                    self.split_line(cx.text, &mut run, false)?;
                } else {
                    put_char(cx.text, &mut run, c.encode_utf8(&mut [0; 4]))?;
                }
            }
        }

        let mut final_cursor = None;
        if let Some(b) = session.block
            && !net.is_empty()
            && !net.contains('\n')
        {
            let ts = self.options.tabstop;
            let last = b.last_line.min(cx.text.line_count().saturating_sub(1));
            for l in b.first_line + 1..=last {
                let line = cx.text.line_text(l);
                let width = column::line_width(&line, ts);
                let updated = if b.append && b.to_eol {
                    format!("{line}{net}")
                } else if width < b.vcol {
                    if !b.append {
                        continue;
                    }
                    format!("{line}{}{net}", " ".repeat(b.vcol - width))
                } else {
                    let at = column::byte_at_vcol(&line, b.vcol, ts);
                    format!("{}{net}{}", &line[..at], &line[at..])
                };
                cx.text.replace_line(l, &updated)?;
            }
            final_cursor = Some(run.start);
            debug!(target: "engine.visual", lines = last - b.first_line + 1, append = b.append, "block_insert_replicated");
        }

        self.marks.last_insert = Some(run.cursor);
        self.marks.last_change = Some(run.cursor);
        self.marks.change_start = Some(run.start);
        self.marks.change_end = Some(run.cursor);
        cx.registers.set_read_only('.', RegisterContent::charwise(&net))?;
        self.redo.append(keys);
        self.redo.append_key(Key::ESC);

        self.cursor = final_cursor.unwrap_or_else(|| {
            let mut c = run.cursor;
            if c.byte > 0 {
                let line = cx.text.line_text(c.line);
                c.byte = grapheme::prev_boundary(&line, c.byte.min(line.len()));
            }
            c
        });
        self.set_curswant = true;
        debug!(target: "engine.fsm", bytes = net.len(), count = session.count, replace = session.replace, "insert_finished");
        Ok(())
    }

    /// Indent copied to a new line under `'autoindent'`.
    pub(crate) fn auto_indent(&self, line: &str) -> String {
        if self.options.autoindent {
            line[..column::first_nonblank(line)].to_string()
        } else {
            String::new()
        }
    }

    fn insert_key(&mut self, text: &mut dyn TextStore, run: &mut InsertRun, key: Key) -> Result<(), CommandError> {
        if key == Key::CR || key == Key::NL {
            return self.split_line(text, run, true);
        }
        if key == Key::BS || key == Key::K_BS {
            backspace(text, run)?;
            return Ok(());
        }
        if key == Key::TAB {
            if self.options.expandtab {
                let line = text.line_text(run.cursor.line);
                let ts = self.options.tabstop.max(1);
                let vcol = column::vcol_of(&line, run.cursor.byte, ts);
                for _ in 0..ts - vcol % ts {
                    put_char(text, run, " ")?;
                }
                return Ok(());
            }
            return put_char(text, run, "\t");
        }
        if key == Key::ctrl('w') || key == Key::ctrl('u') {
            let target = erase_target(text, run, key == Key::ctrl('w'));
            while run.cursor.byte > target {
                backspace(text, run)?;
            }
            return Ok(());
        }
        if let Some(c) = key.as_char()
            && !c.is_control()
        {
            return put_char(text, run, c.encode_utf8(&mut [0; 4]));
        }
        Ok(())
    }

    fn split_line(&mut self, text: &mut dyn TextStore, run: &mut InsertRun, indent: bool) -> Result<(), CommandError> {
        let l = run.cursor.line;
        let line = text.line_text(l);
        let at = run.cursor.byte.min(line.len());
        let (head, tail) = line.split_at(at);
        let (indent, tail) = if indent && self.options.autoindent {
            (self.auto_indent(&line), tail.trim_start_matches([' ', '\t']))
        } else {
            (String::new(), tail)
        };
        let new_line = format!("{indent}{tail}");
        text.replace_line(l, head)?;
        text.insert_line(l + 1, &new_line)?;
        self.marks.adjust(l + 1, 1);
        run.cursor = Position::new(l + 1, indent.len());
        run.replaced.push(None);
        Ok(())
    }

    /// Finish the pending sub-mode from keys that are already queued (a
    /// repeat, a register being executed, a key script). Returns `None` and
    /// leaves the queue as it was when the keys run out first.
    pub fn complete_from_queue(&mut self) -> Option<SubModeOutcome> {
        let request = self.pending_sub_mode()?.clone();
        let mut taken: Vec<(Key, bool, bool)> = Vec::new();
        let mut line = request.initial_text.clone();
        loop {
            let Some((key, typed)) = self.next_key() else {
                for &(k, typed, stuffed) in taken.iter().rev() {
                    if stuffed {
                        self.stuff.push_front(k);
                    } else {
                        self.unget_key(k, typed);
                    }
                }
                return None;
            };
            taken.push((key, typed, self.key_stuffed));
            match request.kind {
                SubModeKind::Insert | SubModeKind::Replace => {
                    if key == Key::ESC || key == Key::ctrl('c') {
                        let keys = taken[..taken.len() - 1].iter().map(|&(k, _, _)| k).collect();
                        return Some(SubModeOutcome::Inserted(keys));
                    }
                }
                SubModeKind::CommandLine | SubModeKind::Search(_) => {
                    if key == Key::CR || key == Key::NL {
                        return Some(SubModeOutcome::CommandLine(Some(line)));
                    }
                    if key == Key::ESC || key == Key::ctrl('c') {
                        return Some(SubModeOutcome::CommandLine(None));
                    }
                    if key == Key::BS || key == Key::K_BS {
                        if line.pop().is_none() {
                            return Some(SubModeOutcome::CommandLine(None));
                        }
                    } else if key == Key::ctrl('u') {
                        line.clear();
                    } else if let Some(c) = key.as_char()
                        && !c.is_control()
                    {
                        line.push(c);
                    }
                }
            }
        }
    }
}

fn put_char(text: &mut dyn TextStore, run: &mut InsertRun, s: &str) -> Result<(), CommandError> {
    let l = run.cursor.line;
    let line = text.line_text(l);
    let at = run.cursor.byte.min(line.len());
    let composing = s.chars().next().is_some_and(grapheme::is_composing);
    if run.replace && at < line.len() && !composing {
        let next = grapheme::next_boundary(&line, at);
        run.replaced.push(Some(line[at..next].to_string()));
        replace_bytes(text, l, at..next, s)?;
    } else {
        run.replaced.push(None);
        replace_bytes(text, l, at..at, s)?;
    }
    run.cursor.byte = at + s.len();
    Ok(())
}

/// Delete the character before the cursor if it was inserted in this run.
fn backspace(text: &mut dyn TextStore, run: &mut InsertRun) -> Result<bool, CommandError> {
    let c = run.cursor;
    if c.line < run.start.line || (c.line == run.start.line && c.byte <= run.start.byte) {
        return Ok(false);
    }
    let restore = run.replaced.pop().flatten();
    if c.byte == 0 {
        let prev = text.line_text(c.line - 1);
        let cur = text.line_text(c.line);
        text.replace_line(c.line - 1, &format!("{prev}{cur}"))?;
        text.delete_lines(c.line..c.line + 1)?;
        run.cursor = Position::new(c.line - 1, prev.len());
        return Ok(true);
    }
    let line = text.line_text(c.line);
    let prev = grapheme::prev_boundary(&line, c.byte.min(line.len()));
    let with = if run.replace { restore.unwrap_or_default() } else { String::new() };
    replace_bytes(text, c.line, prev..c.byte, &with)?;
    run.cursor.byte = prev;
    Ok(true)
}

/// Byte `CTRL-W` (word) or `CTRL-U` (line) erases back to, never before
/// the insert start.
fn erase_target<L: LineAccess + ?Sized>(text: &L, run: &InsertRun, word: bool) -> usize {
    let limit = if run.cursor.line == run.start.line {
        run.start.byte
    } else {
        0
    };
    if !word {
        return limit;
    }
    let line = text.line_text(run.cursor.line);
    let mut b = run.cursor.byte.min(line.len());
    let before = |b: usize| {
        let p = grapheme::prev_boundary(&line, b);
        (p, class_of(&line[p..b], false))
    };
    while b > limit && before(b).1 == 0 {
        b = before(b).0;
    }
    if b > limit {
        let cls = before(b).1;
        while b > limit && before(b).1 == cls {
            b = before(b).0;
        }
    }
    b.max(limit)
}

impl InsertSession {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            replace: false,
            count: count.max(1),
            open_line: None,
            block: None,
        }
    }

    pub(crate) fn replacing(count: usize) -> Self {
        Self {
            replace: true,
            ..Self::new(count)
        }
    }

    pub(crate) fn opening(count: usize, dir: Direction) -> Self {
        Self {
            open_line: Some(dir),
            ..Self::new(count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::EditorState;
    use pretty_assertions::assert_eq;

    fn run_at(line: usize, byte: usize, replace: bool) -> InsertRun {
        InsertRun {
            start: Position::new(line, byte),
            cursor: Position::new(line, byte),
            replace,
            replaced: Vec::new(),
        }
    }

    #[test]
    fn backspace_stops_at_insert_start() {
        let mut st = EditorState::from_text("t", "abc").unwrap();
        let mut run = run_at(0, 1, false);
        put_char(&mut st, &mut run, "X").unwrap();
        assert!(backspace(&mut st, &mut run).unwrap());
        assert!(!backspace(&mut st, &mut run).unwrap());
        assert_eq!(st.line_text(0), "abc");
    }

    #[test]
    fn replace_backspace_restores() {
        let mut st = EditorState::from_text("t", "abc").unwrap();
        let mut run = run_at(0, 0, true);
        put_char(&mut st, &mut run, "X").unwrap();
        put_char(&mut st, &mut run, "Y").unwrap();
        assert_eq!(st.line_text(0), "XYc");
        backspace(&mut st, &mut run).unwrap();
        assert_eq!(st.line_text(0), "Xbc");
    }

    #[test]
    fn ctrl_w_erases_one_word() {
        let st = EditorState::from_text("t", "foo bar  ").unwrap();
        let mut run = run_at(0, 0, false);
        run.cursor = Position::new(0, 9);
        assert_eq!(erase_target(&st, &run, true), 4);
        run.start = Position::new(0, 6);
        assert_eq!(erase_target(&st, &run, true), 6);
        assert_eq!(erase_target(&st, &run, false), 6);
    }
}
