//! Simple changes that do not wait for a motion: `x X D C s S Y` (through
//! their operator form), `r`, `~`, `J`, Insert and Replace entry, `o`/`O`
//! and `CTRL-A`/`CTRL-X`.

use core_events::Key;
use core_keymap::arg;
use core_state::RegisterContent;
use core_text::motion::Direction;
use core_text::{Position, grapheme};
use tracing::debug;

use crate::buffer_ops::{delete_chars, replace_bytes, save_undo};
use crate::engine::{Engine, EngineContext, InsertSession};
use crate::error::CommandError;
use crate::operators::map_case;
use crate::state::{CommandArg, MAXCOL, OperatorKind, VisualKind};

impl Engine {
    /// `x X D C s S Y` and `<Del>` stuff their operator equivalent, so the
    /// count and register go through the normal path.
    pub(super) fn nv_abbrev(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if cap.cmdchar == Key::DEL || cap.cmdchar == Key::DEL_CHAR {
            cap.cmdchar = Key::from_char('x');
        }
        if self.visual.active {
            if cap.cmd_is('s') || cap.cmd_is('S') {
                if cap.cmd_is('S') {
                    self.force_linewise_visual();
                }
                cap.cmdchar = Key::from_char('c');
                cap.nchar = Key::NUL;
                return self.nv_operator(cx, cap);
            }
            return self.v_visop(cx, cap);
        }
        self.check_clear_opq()?;
        let keys = match cap.cmdchar.as_char() {
            Some('x') => "dl",
            Some('X') => "dh",
            Some('D') => "d$",
            Some('C') => "c$",
            Some('s') => "cl",
            Some('S') => "cc",
            Some('Y') => "yy",
            _ => return Err(CommandError::UnknownCommand(cap.cmdchar)),
        };
        if cap.count0 > 0 {
            self.stuff_str(&cap.count0.to_string());
        }
        self.stuff_str(keys);
        cap.opcount = 0;
        Ok(())
    }

    /// Remember the user's Visual kind and switch to linewise, for `R`, `S`
    /// and the uppercase operators.
    pub(crate) fn force_linewise_visual(&mut self) {
        if self.visual.kind != VisualKind::Line {
            self.visual.mode_before_override = Some(self.visual.kind);
        }
        self.visual.kind = VisualKind::Line;
    }

    /// Visual mode `Y D C x X A I`: operators on the selection. Uppercase
    /// ones work on lines, except in block mode where `D` and `C` extend to
    /// the end of each line.
    pub(super) fn v_visop(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let c = cap.cmdchar.as_char().ok_or(CommandError::UnknownCommand(cap.cmdchar))?;
        if c.is_ascii_uppercase() {
            if self.visual.kind != VisualKind::Block {
                self.force_linewise_visual();
            } else if c == 'C' || c == 'D' {
                self.curswant = MAXCOL;
                self.set_curswant = false;
            }
        }
        let op = match c {
            'Y' => 'y',
            'D' | 'x' | 'X' => 'd',
            'C' => 'c',
            'A' | 'I' => c,
            _ => return Err(CommandError::UnknownCommand(cap.cmdchar)),
        };
        cap.cmdchar = Key::from_char(op);
        cap.nchar = Key::NUL;
        self.nv_operator(cx, cap)
    }

    /// `r{char}`: replace `count` characters. `r<CR>` replaces them with a
    /// single line break.
    pub(super) fn nv_replace(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_op()?;
        let is_break = cap.nchar == Key::CR || cap.nchar == Key::NL;
        if cap.nchar.is_special() || cap.nchar.as_char().is_none() {
            return Err(CommandError::OutOfRangeMotion);
        }
        if self.visual.active {
            if is_break {
                return Err(CommandError::NotAllowedInContext);
            }
            cap.cmdchar = Key::from_char('r');
            return self.nv_operator(cx, cap);
        }
        let l = self.cursor.line;
        let line = cx.text.line_text(l);
        let clusters: Vec<&str> = grapheme::iter(&line[self.cursor.byte.min(line.len())..]).collect();
        if clusters.len() < cap.count1 {
            return Err(CommandError::OutOfRangeMotion);
        }
        if cap.nchar == Key::TAB && self.options.expandtab {
            self.stuff_str(&cap.count1.to_string());
            self.stuff_keys([Key::from_char('R'), Key::TAB, Key::ESC]);
            return Ok(());
        }
        save_undo(cx.text, l..l + 1, self.cursor)?;
        let start = self.cursor;
        let width: usize = clusters[..cap.count1].iter().map(|g| g.len()).sum();
        if is_break {
            delete_chars(cx.text, start, Position::new(l, start.byte + width))?;
            let line = cx.text.line_text(l);
            let (head, tail) = line.split_at(start.byte.min(line.len()));
            let indent = self.auto_indent(&line);
            let tail = if self.options.autoindent {
                tail.trim_start_matches([' ', '\t'])
            } else {
                tail
            };
            let new_line = format!("{indent}{tail}");
            let head = head.trim_end_matches([' ', '\t']).to_string();
            cx.text.replace_line(l, &head)?;
            cx.text.insert_line(l + 1, &new_line)?;
            self.marks.adjust(l + 1, 1);
            self.cursor = Position::new(l + 1, indent.len());
            self.redo.prep(None, if cap.count1 > 1 { cap.count1 } else { 0 }, &[Key::from_char('r'), Key::CR]);
            self.marks.change_start = Some(start);
            self.marks.change_end = Some(self.cursor);
            self.marks.last_change = Some(self.cursor);
            cx.registers.set_read_only('.', RegisterContent::charwise("\n"))?;
            self.set_curswant = true;
            return Ok(());
        }
        self.redo.prep(self.oap.regname, cap.count1, &[Key::from_char('r'), cap.nchar]);
        let with = cap.nchar_text().ok_or(CommandError::OutOfRangeMotion)?;
        let replacement = with.repeat(cap.count1);
        replace_bytes(cx.text, l, start.byte..start.byte + width, &replacement)?;
        self.cursor.byte = start.byte + replacement.len() - with.len();
        self.set_curswant = true;
        self.marks.change_start = Some(start);
        self.marks.change_end = Some(self.cursor);
        self.marks.last_change = Some(self.cursor);
        cx.registers.set_read_only('.', RegisterContent::charwise(&with))?;
        Ok(())
    }

    /// `~`: an operator with `'tildeop'`, else switch the case of `count`
    /// characters and move past them.
    pub(super) fn nv_tilde(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if !self.options.tildeop && !self.visual.active && self.oap.op != Some(OperatorKind::Tilde) {
            return self.n_swapchar(cx, cap);
        }
        self.nv_operator(cx, cap)
    }

    fn n_swapchar(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_opq()?;
        let l = self.cursor.line;
        let line = cx.text.line_text(l);
        if line.is_empty() {
            return Err(CommandError::OutOfRangeMotion);
        }
        self.redo.prep(self.oap.regname, cap.count0, &[cap.cmdchar]);
        save_undo(cx.text, l..l + 1, self.cursor)?;
        let start = self.cursor.byte.min(line.len());
        let mut end = start;
        for _ in 0..cap.count1 {
            if end >= line.len() {
                break;
            }
            end = grapheme::next_boundary(&line, end);
        }
        let swapped = map_case(OperatorKind::Tilde, &line[start..end]);
        let changed = swapped != line[start..end];
        replace_bytes(cx.text, l, start..end, &swapped)?;
        self.cursor.byte = start + swapped.len();
        self.set_curswant = true;
        if changed {
            self.marks.change_start = Some(Position::new(l, start));
            let last = grapheme::prev_boundary(&cx.text.line_text(l), self.cursor.byte);
            self.marks.change_end = Some(Position::new(l, last));
            self.marks.last_change = Some(Position::new(l, last));
        }
        Ok(())
    }

    /// `J` and `gJ` with a count of lines (at least two).
    pub(super) fn nv_join(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if self.visual.active {
            return self.nv_operator(cx, cap);
        }
        self.check_clear_op()?;
        let mut count = cap.count0.max(2);
        let lines = cx.text.line_count();
        if self.cursor.line + count > lines {
            if count <= 2 {
                return Err(CommandError::OutOfRangeMotion);
            }
            count = lines - self.cursor.line;
        }
        let insert_space = cap.nchar == Key::NUL;
        self.redo.prep(self.oap.regname, count, &[cap.cmdchar, cap.nchar]);
        self.do_join(cx, self.cursor.line, count, insert_space)
    }

    /// Join `count` lines starting at `first`. With `insert_space` leading
    /// white space of the joined lines is dropped and one space (two after
    /// a sentence end with `'joinspaces'`) separates the parts.
    pub(crate) fn do_join(
        &mut self,
        cx: &mut EngineContext<'_>,
        first: usize,
        count: usize,
        insert_space: bool,
    ) -> Result<(), CommandError> {
        let count = count.min(cx.text.line_count() - first);
        if count < 2 {
            return Err(CommandError::OutOfRangeMotion);
        }
        save_undo(cx.text, first..first + count, self.cursor)?;
        let mut joined = String::new();
        let mut col = 0;
        let mut prev_end: (Option<char>, Option<char>) = (None, None);
        for t in 0..count {
            let raw = cx.text.line_text(first + t);
            let mut part = raw.as_str();
            let mut spaces = 0;
            if insert_space && t > 0 {
                part = part.trim_start_matches([' ', '\t']);
                let (mut end1, end2) = prev_end;
                if !part.is_empty() && !part.starts_with(')') && !joined.is_empty() && end1 != Some('\t') {
                    if end1 == Some(' ') {
                        end1 = end2;
                    } else {
                        spaces += 1;
                    }
                    let sentence_end = end1 == Some('.')
                        || (!self.options.cpo('j') && matches!(end1, Some('?' | '!')));
                    if self.options.joinspaces && sentence_end {
                        spaces += 1;
                    }
                }
            }
            col = joined.len();
            joined.extend(std::iter::repeat_n(' ', spaces));
            joined.push_str(part);
            let mut tail = part.chars().rev();
            prev_end = if insert_space { (tail.next(), tail.next()) } else { (None, None) };
        }
        cx.text.replace_line(first, &joined)?;
        cx.text.delete_lines(first + 1..first + count)?;
        self.marks.adjust(first + 1, -((count - 1) as isize));
        self.cursor = Position::new(first, col.min(joined.len()));
        self.set_curswant = true;
        self.marks.change_start = Some(Position::new(first, 0));
        self.marks.change_end = Some(Position::new(first, joined.len()));
        self.marks.last_change = Some(self.cursor);
        debug!(target: "engine.operator", line = first, count, insert_space, "join");
        Ok(())
    }

    /// `i a I A gI`, and the text objects after an operator or in Visual.
    pub(super) fn nv_edit(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if cap.cmdchar == Key::INSERT {
            cap.cmdchar = Key::from_char('i');
        }
        let c = cap.cmdchar.as_char().unwrap_or('i');
        if self.visual.active && (c == 'A' || c == 'I') {
            return self.v_visop(cx, cap);
        }
        if (c == 'a' || c == 'i') && (self.oap.op.is_some() || self.visual.active) {
            return self.nv_object(cx, cap);
        }
        if !cx.text.is_modifiable() {
            self.clearop();
            return Err(CommandError::NotAllowedInContext);
        }
        self.check_clear_opq()?;
        let text = &*cx.text;
        match c {
            'A' => self.cursor.byte = text.line_len(self.cursor.line),
            'I' => {
                let flags = if self.options.cpo('i') {
                    arg::BL_WHITE | arg::BL_FIX
                } else {
                    arg::BL_WHITE
                };
                self.beginline(text, flags);
            }
            'a' => {
                let line = text.line_text(self.cursor.line);
                if self.cursor.byte < line.len() {
                    self.cursor.byte = grapheme::next_boundary(&line, self.cursor.byte);
                }
            }
            _ => {}
        }
        self.start_insert_command(cx, cap, &c.to_string())
    }

    /// Record the redo prefix and ask for Insert mode.
    pub(super) fn start_insert_command(
        &mut self,
        cx: &mut EngineContext<'_>,
        cap: &mut CommandArg,
        keys: &str,
    ) -> Result<(), CommandError> {
        if !cx.text.is_modifiable() {
            return Err(CommandError::NotAllowedInContext);
        }
        self.prep_insert_redo(cap.count1, keys);
        self.request_insert(InsertSession::new(cap.count1));
        Ok(())
    }

    /// `o` and `O`; in Visual mode they move to the other corner.
    pub(super) fn nv_open(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if self.visual.active {
            return self.v_swap_corners(cx, cap);
        }
        self.check_clear_opq()?;
        let above = cap.cmd_is('O');
        let l = self.cursor.line;
        let first = if above { l.saturating_sub(1) } else { l };
        save_undo(cx.text, first..l + 1, self.cursor)?;
        let indent = self.auto_indent(&cx.text.line_text(l));
        let at = if above { l } else { l + 1 };
        cx.text.insert_line(at, &indent)?;
        self.marks.adjust(at, 1);
        self.cursor = Position::new(at, indent.len());
        self.prep_insert_redo(cap.count1, if above { "O" } else { "o" });
        self.request_insert(InsertSession::opening(cap.count1, Direction::Forward));
        Ok(())
    }

    /// `R` and `gR`; in Visual mode `R` changes whole lines.
    pub(super) fn nv_replace_mode(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if self.visual.active {
            cap.cmdchar = Key::from_char('c');
            cap.nchar = Key::NUL;
            self.force_linewise_visual();
            return self.nv_operator(cx, cap);
        }
        self.check_clear_opq()?;
        if !cx.text.is_modifiable() {
            return Err(CommandError::NotAllowedInContext);
        }
        self.prep_insert_redo(cap.count1, "R");
        self.request_insert(InsertSession::replacing(cap.count1));
        Ok(())
    }

    /// `CTRL-A` / `CTRL-X`: add or subtract `count` to the number at or
    /// after the cursor.
    pub(super) fn nv_addsub(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if self.visual.active {
            return Err(CommandError::NotAllowedInContext);
        }
        if self.oap.op.is_some() {
            self.clearop();
            return Err(CommandError::NotAllowedInContext);
        }
        let l = self.cursor.line;
        let line = cx.text.line_text(l);
        let number = find_number(&line, self.cursor.byte).ok_or(CommandError::OutOfRangeMotion)?;
        let subtract = cap.cmdchar == Key::ctrl('x');
        let replacement = number.adjusted(&line, cap.count1 as u64, subtract);
        self.redo.prep(self.oap.regname, cap.count0, &[cap.cmdchar]);
        save_undo(cx.text, l..l + 1, self.cursor)?;
        replace_bytes(cx.text, l, number.start..number.end, &replacement)?;
        let end = number.start + replacement.len();
        self.cursor.byte = end.saturating_sub(1);
        self.set_curswant = true;
        self.marks.change_start = Some(Position::new(l, number.start));
        self.marks.change_end = Some(self.cursor);
        self.marks.last_change = Some(self.cursor);
        Ok(())
    }
}

/// A number found by [`find_number`]: `start..end` covers the sign or the
/// `0x` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Number {
    start: usize,
    end: usize,
    hex: bool,
}

fn find_number(line: &str, cursor: usize) -> Option<Number> {
    let bytes = line.as_bytes();
    let cursor = cursor.min(line.len());
    // On a hex number, possibly on its `0x`.
    let mut s = cursor;
    while s > 0 && bytes[s - 1].is_ascii_hexdigit() {
        s -= 1;
    }
    let hex_at = |p: usize| {
        bytes.get(p) == Some(&b'0')
            && matches!(bytes.get(p + 1), Some(b'x' | b'X'))
            && bytes.get(p + 2).is_some_and(u8::is_ascii_hexdigit)
    };
    let hex_start = [s.checked_sub(2), Some(cursor), cursor.checked_sub(1)]
        .into_iter()
        .flatten()
        .find(|&p| hex_at(p) && p <= cursor);
    if let Some(p) = hex_start {
        let mut e = p + 2;
        while e < bytes.len() && bytes[e].is_ascii_hexdigit() {
            e += 1;
        }
        if cursor < e {
            return Some(Number { start: p, end: e, hex: true });
        }
    }
    // Decimal under the cursor, else the first one after it.
    let mut d = cursor;
    if bytes.get(d).is_some_and(u8::is_ascii_digit) {
        while d > 0 && bytes[d - 1].is_ascii_digit() {
            d -= 1;
        }
    } else {
        d = (cursor..bytes.len()).find(|&i| bytes[i].is_ascii_digit())?;
        if hex_at(d) {
            let mut e = d + 2;
            while e < bytes.len() && bytes[e].is_ascii_hexdigit() {
                e += 1;
            }
            return Some(Number { start: d, end: e, hex: true });
        }
    }
    let mut e = d;
    while e < bytes.len() && bytes[e].is_ascii_digit() {
        e += 1;
    }
    let start = if d > 0 && bytes[d - 1] == b'-' { d - 1 } else { d };
    Some(Number { start, end: e, hex: false })
}

impl Number {
    fn adjusted(&self, line: &str, amount: u64, subtract: bool) -> String {
        let text = &line[self.start..self.end];
        if self.hex {
            let digits = &text[2..];
            let value = u64::from_str_radix(digits, 16).unwrap_or(u64::MAX);
            let value = if subtract {
                value.wrapping_sub(amount)
            } else {
                value.wrapping_add(amount)
            };
            let upper = digits
                .chars()
                .rev()
                .find(char::is_ascii_alphabetic)
                .is_some_and(|c| c.is_ascii_uppercase());
            let width = digits.len();
            let formatted = if upper {
                format!("{value:0width$X}")
            } else {
                format!("{value:0width$x}")
            };
            return format!("{}{formatted}", &text[..2]);
        }
        let negative = text.starts_with('-');
        let digits = text.trim_start_matches('-');
        let magnitude = digits.parse::<i128>().unwrap_or(i128::from(u64::MAX));
        let value = if negative { -magnitude } else { magnitude };
        let delta = i128::from(amount);
        let value = (if subtract { value - delta } else { value + delta })
            .clamp(i128::from(i64::MIN), i128::from(i64::MAX));
        let keep_width = digits.len() > 1 && digits.starts_with('0');
        let abs = value.unsigned_abs();
        let body = if keep_width {
            format!("{abs:0width$}", width = digits.len())
        } else {
            abs.to_string()
        };
        if value < 0 { format!("-{body}") } else { body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bump(line: &str, cursor: usize, amount: u64, subtract: bool) -> Option<String> {
        let n = find_number(line, cursor)?;
        let new = n.adjusted(line, amount, subtract);
        Some(format!("{}{new}{}", &line[..n.start], &line[n.end..]))
    }

    #[test]
    fn decimal_after_cursor() {
        assert_eq!(bump("x = 41;", 0, 1, false).as_deref(), Some("x = 42;"));
        assert_eq!(bump("abc", 0, 1, false), None);
    }

    #[test]
    fn negative_numbers_cross_zero() {
        assert_eq!(bump("-1", 0, 2, false).as_deref(), Some("1"));
        assert_eq!(bump("val 3", 0, 5, true).as_deref(), Some("val -2"));
    }

    #[test]
    fn leading_zeros_keep_width() {
        assert_eq!(bump("007", 0, 1, false).as_deref(), Some("008"));
        assert_eq!(bump("010", 2, 1, true).as_deref(), Some("009"));
    }

    #[test]
    fn hex_keeps_case_and_width() {
        assert_eq!(bump("0x0fe", 0, 1, false).as_deref(), Some("0x0ff"));
        assert_eq!(bump("0xFF", 3, 1, false).as_deref(), Some("0x100"));
        assert_eq!(bump("0x0A", 1, 1, false).as_deref(), Some("0x0B"));
    }
}
