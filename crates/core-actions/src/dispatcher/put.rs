//! `p`, `P`, `gp`, `gP`.
//!
//! Characterwise text goes after (before) the cursor character, linewise
//! text below (above) the cursor line and blockwise text into the columns
//! at the cursor, padding short lines. In Visual mode the selection is
//! deleted first and the register text takes its place.

use core_keymap::arg;
use core_state::{RegisterContent, RegisterKind};
use core_text::motion::Direction;
use core_text::{Position, column, grapheme};
use tracing::debug;

use crate::buffer_ops::{insert_text, save_undo};
use crate::engine::{Engine, EngineContext};
use crate::error::CommandError;
use crate::registers::read_register;
use crate::state::{CommandArg, OperatorKind, VisualKind};

/// Most bytes a single put may add to the text.
pub(crate) const MAX_PUT_BYTES: usize = 1 << 24;
/// Most lines a single put may add.
pub(crate) const MAX_PUT_LINES: usize = 1 << 20;

/// Bytes that putting `content` `count` times adds, `None` on overflow.
/// Block lines count at least their block width, newlines one byte each.
fn put_size(content: &RegisterContent, count: usize) -> Option<usize> {
    let width = match content.kind {
        RegisterKind::Block(width) => width,
        _ => 0,
    };
    let once = content
        .lines
        .iter()
        .try_fold(0usize, |acc, l| acc.checked_add(l.len().max(width))?.checked_add(1))?;
    once.checked_mul(count)
}

fn put_too_long(content: &RegisterContent, count: usize) -> bool {
    let lines = match content.kind {
        RegisterKind::Char | RegisterKind::Block(_) if content.lines.len() == 1 => Some(0),
        _ => content.lines.len().checked_mul(count),
    };
    put_size(content, count).is_none_or(|n| n > MAX_PUT_BYTES) || lines.is_none_or(|n| n > MAX_PUT_LINES)
}

#[derive(Debug, Clone, Copy, Default)]
struct PutFlags {
    /// `gp`, `gP`: leave the cursor just after the new text.
    cursor_end: bool,
    /// Put as lines whatever the register holds.
    as_lines: bool,
    /// Linewise text over a characterwise selection: split the line.
    split_line: bool,
    /// Linewise text over a block selection: below the block.
    below_block: bool,
}

impl Engine {
    pub(super) fn nv_put(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if self.oap.op.is_some() {
            return Err(CommandError::NotAllowedInContext);
        }
        let prefix_g = cap.cmd_is('g');
        let upper = if prefix_g { cap.nchar_is('P') } else { cap.cmd_is('P') };
        let mut dir = if upper { Direction::Backward } else { Direction::Forward };
        let mut flags = PutFlags {
            cursor_end: prefix_g,
            ..PutFlags::default()
        };
        let regname = self.oap.regname;
        let content = read_register(&*cx.registers, regname)?;
        if put_too_long(&content, cap.count1) {
            debug!(target: "engine.operator", count = cap.count1, lines = content.lines.len(), "put_too_long");
            return Err(CommandError::TextTooLong);
        }
        self.redo.prep(regname, cap.count0, &[cap.cmdchar, cap.nchar]);

        let mut emptied = false;
        let was_visual = self.visual.active;
        if was_visual {
            let kind = self.visual.kind;
            let redo = self.redo.clone();
            // `P` keeps the registers as they were.
            let mut del = CommandArg {
                cmdchar: core_events::Key::from_char('d'),
                ..CommandArg::default()
            };
            self.oap.op = Some(OperatorKind::Delete);
            self.oap.start = self.cursor;
            self.oap.regname = if upper { Some('_') } else { None };
            self.do_pending_operator(cx, &mut del)?;
            self.redo = redo;
            self.oap.regname = regname;
            emptied = cx.text.line_count() == 1 && cx.text.line_is_empty(0);

            match kind {
                VisualKind::Line => flags.as_lines = true,
                VisualKind::Char if content.kind == RegisterKind::Line => flags.split_line = true,
                VisualKind::Block if dir == Direction::Forward => flags.below_block = true,
                _ => {}
            }
            let op_start = self.marks.change_start.unwrap_or(self.cursor);
            let past_end = match kind {
                VisualKind::Line => self.cursor.line < op_start.line,
                _ => self.cursor.byte < op_start.byte,
            };
            dir = if past_end { Direction::Forward } else { Direction::Backward };
            if emptied {
                dir = Direction::Backward;
            }
        }

        self.do_put(cx, &content, dir, cap.count1, flags)?;

        // `gv` selects the text that replaced the selection.
        if was_visual {
            self.marks.visual_start = self.marks.change_start;
            self.marks.visual_end = self.marks.change_end;
        }
        if emptied && cx.text.line_count() > 1 {
            let last = cx.text.line_count() - 1;
            if cx.text.line_is_empty(last) {
                cx.text.delete_lines(last..last + 1)?;
                if self.cursor.line >= last {
                    self.cursor.line = last - 1;
                    self.coladvance(&*cx.text, crate::state::MAXCOL);
                }
            }
        }
        Ok(())
    }

    fn do_put(
        &mut self,
        cx: &mut EngineContext<'_>,
        content: &RegisterContent,
        mut dir: Direction,
        count: usize,
        flags: PutFlags,
    ) -> Result<(), CommandError> {
        let kind = if flags.as_lines { RegisterKind::Line } else { content.kind };
        let l = self.cursor.line;
        save_undo(cx.text, l..l + 1, self.cursor)?;
        debug!(target: "engine.operator", kind = ?kind, ?dir, count, "put");
        match kind {
            RegisterKind::Line => {
                if flags.split_line {
                    let line = cx.text.line_text(l);
                    let mut at = self.cursor.byte.min(line.len());
                    if dir == Direction::Forward && at < line.len() {
                        at = grapheme::next_boundary(&line, at);
                    }
                    cx.text.insert_line(l + 1, &line[at..])?;
                    cx.text.replace_line(l, &line[..at])?;
                    self.marks.adjust(l + 1, 1);
                    dir = Direction::Forward;
                }
                if flags.below_block
                    && let Some(end) = self.marks.visual_end
                {
                    self.cursor = end;
                    dir = Direction::Forward;
                }
                self.put_lines(cx, &content.lines, dir, count, flags.cursor_end)
            }
            RegisterKind::Char => self.put_chars(cx, &content.lines.join("\n"), dir, count, flags.cursor_end),
            RegisterKind::Block(width) => self.put_block(cx, &content.lines, width, dir, count, flags.cursor_end),
        }
    }

    fn put_lines(
        &mut self,
        cx: &mut EngineContext<'_>,
        lines: &[String],
        dir: Direction,
        count: usize,
        cursor_end: bool,
    ) -> Result<(), CommandError> {
        let at = match dir {
            Direction::Forward => self.cursor.line + 1,
            Direction::Backward => self.cursor.line,
        };
        let mut n = 0;
        for _ in 0..count {
            for s in lines {
                cx.text.insert_line(at + n, s)?;
                n += 1;
            }
        }
        if n == 0 {
            return Ok(());
        }
        self.marks.adjust(at, n as isize);
        let last = at + n - 1;
        self.marks.change_start = Some(Position::new(at, 0));
        let last_len = cx.text.line_len(last);
        self.marks.change_end = Some(Position::new(last, last_len.saturating_sub(1)));
        self.marks.last_change = Some(Position::new(at, 0));
        if cursor_end {
            self.cursor = Position::new((last + 1).min(cx.text.line_count() - 1), 0);
            self.set_curswant = true;
        } else {
            self.cursor.line = at;
            self.beginline(&*cx.text, arg::BL_WHITE | arg::BL_FIX);
        }
        self.report_lines(cx, n, "more lines");
        Ok(())
    }

    fn put_chars(
        &mut self,
        cx: &mut EngineContext<'_>,
        s: &str,
        dir: Direction,
        count: usize,
        cursor_end: bool,
    ) -> Result<(), CommandError> {
        let l = self.cursor.line;
        let line = cx.text.line_text(l);
        let mut col = self.cursor.byte.min(line.len());
        if dir == Direction::Forward && col < line.len() {
            col = grapheme::next_boundary(&line, col);
        }
        let text = s.repeat(count);
        let start = Position::new(l, col);
        let end = insert_text(cx.text, start, &text)?;
        let added = end.line - l;
        if added > 0 {
            self.marks.adjust(l + 1, added as isize);
        }
        let end_line = cx.text.line_text(end.line);
        let last_char = Position::new(end.line, grapheme::prev_boundary(&end_line, end.byte));
        self.marks.change_start = Some(start);
        self.marks.change_end = Some(last_char);
        self.marks.last_change = Some(last_char);
        self.cursor = if cursor_end {
            end
        } else if added == 0 {
            last_char
        } else {
            start
        };
        self.set_curswant = true;
        self.report_lines(cx, added, "more lines");
        Ok(())
    }

    fn put_block(
        &mut self,
        cx: &mut EngineContext<'_>,
        lines: &[String],
        width: usize,
        dir: Direction,
        count: usize,
        cursor_end: bool,
    ) -> Result<(), CommandError> {
        let ts = self.options.tabstop;
        let l = self.cursor.line;
        let line = cx.text.line_text(l);
        let (first, last) = column::vcol_range(&line, self.cursor.byte, ts);
        let vcol = if dir == Direction::Forward && self.cursor.byte < line.len() {
            last + 1
        } else {
            first
        };
        let mut appended = 0;
        let mut first_byte = 0;
        let mut end = Position::new(l, 0);
        for (i, piece) in lines.iter().enumerate() {
            let target = l + i;
            if target >= cx.text.line_count() {
                cx.text.insert_line(target, "")?;
                appended += 1;
            }
            let cur = cx.text.line_text(target);
            let cur_width = column::line_width(&cur, ts);
            let (at, lead) = if cur_width < vcol {
                (cur.len(), " ".repeat(vcol - cur_width))
            } else {
                (column::byte_at_vcol(&cur, vcol, ts), String::new())
            };
            let piece_width = column::line_width(piece, ts);
            let pad = " ".repeat(width.saturating_sub(piece_width));
            let lead_len = lead.len();
            let mut insert = lead;
            for n in 0..count {
                insert.push_str(piece);
                if n + 1 < count || at < cur.len() {
                    insert.push_str(&pad);
                }
            }
            let updated = format!("{}{insert}{}", &cur[..at], &cur[at..]);
            cx.text.replace_line(target, &updated)?;
            if i == 0 {
                first_byte = at + lead_len;
            }
            end = Position::new(target, at + insert.len());
        }
        if appended > 0 {
            self.marks.adjust(l + lines.len() - appended, appended as isize);
        }
        let start = Position::new(l, first_byte);
        self.marks.change_start = Some(start);
        let end_line = cx.text.line_text(end.line);
        self.marks.change_end = Some(Position::new(end.line, grapheme::prev_boundary(&end_line, end.byte)));
        self.marks.last_change = self.marks.change_end;
        self.cursor = if cursor_end { end } else { start };
        self.set_curswant = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;
    use core_config::EngineOptions;
    use core_state::{EditorState, Registers};
    use pretty_assertions::assert_eq;

    fn put(text: &str, cursor: Position, content: RegisterContent, dir: Direction, count: usize) -> (String, Position) {
        let mut st = EditorState::from_text("t", text).unwrap();
        let mut regs = Registers::new();
        let mut host = NullHost;
        let mut cx = EngineContext { text: &mut st, registers: &mut regs, host: &mut host };
        let mut e = Engine::new(EngineOptions::default());
        e.cursor = cursor;
        e.do_put(&mut cx, &content, dir, count, PutFlags::default()).unwrap();
        (st.contents(), e.cursor)
    }

    #[test]
    fn charwise_after_cursor_lands_on_last_char() {
        let (text, cur) = put("abc", Position::new(0, 0), RegisterContent::charwise("XY"), Direction::Forward, 2);
        assert_eq!(text, "aXYXYbc");
        assert_eq!(cur, Position::new(0, 4));
    }

    #[test]
    fn linewise_above_goes_to_first_nonblank() {
        let (text, cur) = put(
            "one\ntwo",
            Position::new(1, 2),
            RegisterContent::linewise(["  new"]),
            Direction::Backward,
            1,
        );
        assert_eq!(text, "one\n  new\ntwo");
        assert_eq!(cur, Position::new(1, 2));
    }

    #[test]
    fn block_pads_short_lines() {
        let content = RegisterContent::new(vec!["X".into(), "YY".into()], RegisterKind::Block(2));
        let (text, cur) = put("abcd\na", Position::new(0, 1), content, Direction::Forward, 1);
        // The short line only gets the padding it needs.
        assert_eq!(text, "abX cd\na YY");
        assert_eq!(cur, Position::new(0, 2));
    }

    #[test]
    fn oversized_puts_are_refused() {
        let line = RegisterContent::charwise(&"x".repeat(72));
        assert!(put_too_long(&line, 999_999_999));
        assert!(!put_too_long(&line, 1000));
        assert!(put_too_long(&RegisterContent::charwise("x"), usize::MAX));
        assert!(put_too_long(&RegisterContent::linewise([""]), MAX_PUT_LINES + 1));
        assert!(!put_too_long(&RegisterContent::linewise([""]), MAX_PUT_LINES));
        let block = RegisterContent::new(vec!["a".into()], RegisterKind::Block(usize::MAX));
        assert!(put_too_long(&block, 1));
    }
}
