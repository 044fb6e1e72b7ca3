//! Operator bodies. [`Engine::do_pending_operator`] has already settled the
//! range in `self.oap` and put the cursor at its start.

use std::ops::Range;

use core_keymap::arg;
use core_state::{RegisterContent, RegisterKind, TextStore};
use core_text::motion::decl;
use core_text::{Position, column, grapheme};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::buffer_ops::{delete_chars, get_chars, save_undo};
use crate::engine::{BlockInsert, Engine, EngineContext, InsertSession};
use crate::error::CommandError;
use crate::host::OperatorFunctionCall;
use crate::registers::{normalize, store_delete, store_yank};
use crate::span_resolver::range_end;
use crate::state::{CommandArg, CommandResult, MAXCOL, MotionType, OperatorKind};

/// The part of one line covered by a block, in bytes and cells.
///
/// A cluster that straddles a block edge (a tab, a wide character) is split
/// into spaces: `pad_*` cells lie outside the block, `spaces_*` cells inside.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct BlockSegment {
    /// First byte of the first cluster touching the block.
    pub start: usize,
    /// Byte after the last cluster touching the block.
    pub end: usize,
    /// Clusters entirely inside the block.
    pub inner: Range<usize>,
    pub pad_before: usize,
    pub pad_after: usize,
    pub spaces_lead: usize,
    pub spaces_tail: usize,
    /// The line ends before the block starts.
    pub short: bool,
}

impl BlockSegment {
    /// Text inside the block.
    pub(crate) fn text(&self, line: &str) -> String {
        let mut s = " ".repeat(self.spaces_lead);
        s.push_str(&line[self.inner.clone()]);
        s.push_str(&" ".repeat(self.spaces_tail));
        s
    }

    /// The line without the block.
    pub(crate) fn remove(&self, line: &str) -> String {
        let mut s = line[..self.start].to_string();
        s.push_str(&" ".repeat(self.pad_before + self.pad_after));
        s.push_str(&line[self.end..]);
        s
    }
}

/// Cells `first..=last` of `line`; `last` of `None` runs to the end of the
/// line.
pub(crate) fn block_segment(line: &str, first: usize, last: Option<usize>, tabstop: usize) -> BlockSegment {
    let mut seg = BlockSegment {
        start: line.len(),
        end: line.len(),
        inner: line.len()..line.len(),
        short: true,
        ..BlockSegment::default()
    };
    let mut vcol = 0;
    for (idx, g) in line.grapheme_indices(true) {
        if last.is_some_and(|l| vcol > l) {
            break;
        }
        let next = vcol + column::cells(g, vcol, tabstop);
        if next <= first {
            vcol = next;
            continue;
        }
        let split_left = vcol < first;
        if seg.short {
            seg.short = false;
            seg.start = idx;
            seg.pad_before = first.saturating_sub(vcol);
            seg.inner = if split_left { idx + g.len()..idx + g.len() } else { idx..idx };
        }
        seg.end = idx + g.len();
        if let Some(l) = last.filter(|&l| next > l + 1) {
            seg.pad_after = next - (l + 1);
            let inside = l + 1 - vcol.max(first);
            if split_left {
                seg.spaces_lead = inside;
            } else {
                seg.spaces_tail = inside;
            }
            break;
        }
        if split_left {
            seg.spaces_lead = next - first;
        } else {
            seg.inner.end = seg.end;
        }
        vcol = next;
    }
    seg
}

/// Case mapping for `~`, `g~`, `gu`, `gU` and `g?`. Characters whose
/// mapping is more than one character stay as they are.
pub(crate) fn map_case(op: OperatorKind, s: &str) -> String {
    fn single(mut it: impl Iterator<Item = char>) -> Option<char> {
        let c = it.next()?;
        it.next().is_none().then_some(c)
    }
    s.chars()
        .map(|c| match op {
            OperatorKind::Upper => single(c.to_uppercase()).unwrap_or(c),
            OperatorKind::Lower => single(c.to_lowercase()).unwrap_or(c),
            OperatorKind::Rot13 => match c {
                'a'..='z' => (b'a' + (c as u8 - b'a' + 13) % 26) as char,
                'A'..='Z' => (b'A' + (c as u8 - b'A' + 13) % 26) as char,
                _ => c,
            },
            _ if c.is_lowercase() => single(c.to_uppercase()).unwrap_or(c),
            _ if c.is_uppercase() => single(c.to_lowercase()).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Rewrap paragraphs to `width` cells. Blank lines separate paragraphs and
/// are kept; later lines take the indent of a paragraph's second line.
pub(crate) fn format_paragraphs(lines: &[String], width: usize, tabstop: usize, joinspaces: bool) -> Vec<String> {
    let blank = |s: &str| s.trim().is_empty();
    let indent = |s: &str| s[..column::first_nonblank(s)].to_string();
    let mut out = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if blank(&lines[i]) {
            out.push(lines[i].clone());
            i += 1;
            continue;
        }
        let first = i;
        while i < lines.len() && !blank(&lines[i]) {
            i += 1;
        }
        let para = &lines[first..i];
        let lead = indent(&para[0]);
        let rest = para.get(1).map_or_else(|| lead.clone(), |l| indent(l));
        let mut cur = lead;
        let mut started = false;
        let mut sentence_end = false;
        for word in para.iter().flat_map(|l| l.split_whitespace()) {
            if started {
                let sep = if joinspaces && sentence_end { 2 } else { 1 };
                let need = column::line_width(&cur, tabstop) + sep + column::line_width(word, tabstop);
                if width > 0 && need > width {
                    out.push(std::mem::replace(&mut cur, rest.clone()));
                } else {
                    cur.push_str(&" ".repeat(sep));
                }
            }
            cur.push_str(word);
            started = true;
            sentence_end = word.ends_with(['.', '?', '!']);
        }
        out.push(cur);
    }
    out
}

/// Comment or uncomment lines with a `'commentstring'` like `/* %s */`.
/// When every non-blank line is already commented the comments go.
pub(crate) fn toggle_comment(lines: &[String], commentstring: &str) -> Vec<String> {
    let (left, right) = commentstring.split_once("%s").unwrap_or((commentstring, ""));
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() {
        return lines.to_vec();
    }
    let commented = |l: &str| {
        let t = l.trim();
        t.starts_with(left) && (right.is_empty() || (t.len() >= left.len() + right.len() && t.ends_with(right)))
    };
    let mut nonblank = lines.iter().filter(|l| !l.trim().is_empty()).peekable();
    if nonblank.peek().is_none() {
        return lines.to_vec();
    }
    let uncomment = nonblank.clone().all(|l| commented(l));
    let min_indent = nonblank.map(|l| column::first_nonblank(l)).min().unwrap_or(0);
    lines
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                return l.clone();
            }
            if uncomment {
                let at = column::first_nonblank(l);
                let mut body = &l[at + left.len()..];
                body = body.strip_prefix(' ').unwrap_or(body);
                if !right.is_empty() {
                    body = body.trim_end();
                    body = body.strip_suffix(right).unwrap_or(body);
                    body = body.strip_suffix(' ').unwrap_or(body);
                }
                format!("{}{body}", &l[..at])
            } else {
                let (head, body) = l.split_at(min_indent);
                if right.is_empty() {
                    format!("{head}{left} {body}")
                } else {
                    format!("{head}{left} {body} {right}")
                }
            }
        })
        .collect()
}

impl Engine {
    pub(crate) fn apply_operator(
        &mut self,
        cx: &mut EngineContext<'_>,
        op: OperatorKind,
        cap: &mut CommandArg,
    ) -> Result<(), CommandError> {
        match op {
            OperatorKind::ShiftLeft | OperatorKind::ShiftRight => {
                let amount = if self.oap.is_visual { cap.count1 } else { 1 };
                self.op_shift(cx, op == OperatorKind::ShiftLeft, amount)
            }
            OperatorKind::Join => self.op_join(cx, true),
            OperatorKind::JoinNoSpace => self.op_join(cx, false),
            OperatorKind::Delete => self.op_delete(cx),
            OperatorKind::Yank => self.op_yank(cx, true),
            OperatorKind::Change => self.op_change(cx, cap),
            OperatorKind::Tilde | OperatorKind::Upper | OperatorKind::Lower | OperatorKind::Rot13 => {
                self.op_tilde(cx, op)
            }
            OperatorKind::Format => self.op_format(cx, false),
            OperatorKind::FormatKeep => self.op_format(cx, true),
            OperatorKind::Function => self.op_function(cx),
            OperatorKind::Comment => self.op_comment(cx),
            OperatorKind::Replace => self.op_replace(cx, cap),
            OperatorKind::Insert => self.op_insert(cx, cap, false),
            OperatorKind::Append => self.op_insert(cx, cap, true),
        }
    }

    fn block_last_vcol(&self) -> Option<usize> {
        (self.curswant != MAXCOL).then_some(self.oap.end_vcol)
    }

    fn block_segment_of(&self, line: &str) -> BlockSegment {
        block_segment(line, self.oap.start_vcol, self.block_last_vcol(), self.options.tabstop)
    }

    /// Text the operator covers, shaped for a register.
    fn operated_content(&self, text: &dyn TextStore) -> RegisterContent {
        let (start, end) = (self.oap.start, self.oap.end);
        match self.oap.motion_type {
            MotionType::Line => RegisterContent::linewise((start.line..=end.line).map(|l| text.line_text(l))),
            MotionType::Block => {
                let lines: Vec<String> = (start.line..=end.line)
                    .map(|l| self.block_segment_of(&text.line_text(l)).text(&text.line_text(l)))
                    .collect();
                let width = match self.block_last_vcol() {
                    Some(last) => last + 1 - self.oap.start_vcol.min(last + 1),
                    None => lines
                        .iter()
                        .map(|l| column::line_width(l, self.options.tabstop))
                        .max()
                        .unwrap_or(0),
                };
                RegisterContent::new(lines, RegisterKind::Block(width))
            }
            MotionType::Char => {
                RegisterContent::new(get_chars(text, start, range_end(text, &self.oap)), RegisterKind::Char)
            }
        }
    }

    /// `'[` and `']` after an operator that left the lines in place.
    fn mark_changed(&mut self, text: &dyn TextStore) {
        let (start, end) = (self.oap.start, self.oap.end);
        let end = match self.oap.motion_type {
            MotionType::Line => Position::new(end.line, text.line_len(end.line).saturating_sub(1)),
            MotionType::Char if !self.oap.inclusive && end.byte > 0 => {
                let line = text.line_text(end.line);
                Position::new(end.line, grapheme::prev_boundary(&line, end.byte.min(line.len())))
            }
            _ => end,
        };
        let start = if self.oap.motion_type == MotionType::Line {
            Position::new(start.line, 0)
        } else {
            start
        };
        self.marks.change_start = Some(start);
        self.marks.change_end = Some(end);
    }

    pub(crate) fn op_delete(&mut self, cx: &mut EngineContext<'_>) -> Result<(), CommandError> {
        if self.oap.empty {
            return Ok(());
        }
        if !cx.text.is_modifiable() {
            return Err(CommandError::NotAllowedInContext);
        }
        let is_delete = self.oap.op == Some(OperatorKind::Delete);
        let text = &*cx.text;

        // Vi: a multi-line characterwise delete from within the indent to a
        // position followed only by blanks deletes whole lines.
        if self.oap.motion_type == MotionType::Char
            && !self.oap.is_visual
            && !self.oap.block_mode
            && self.oap.motion_force.is_none()
            && self.oap.line_count > 1
            && is_delete
        {
            let end_line = text.line_text(self.oap.end.line);
            let after = range_end(text, &self.oap).byte.min(end_line.len());
            if end_line[after..].trim_start_matches([' ', '\t']).is_empty() && self.in_indent(text) {
                self.oap.motion_type = MotionType::Line;
            }
        }

        if self.oap.motion_type == MotionType::Char
            && self.oap.line_count == 1
            && is_delete
            && text.line_is_empty(self.oap.start.line)
        {
            if self.options.cpo('E') {
                cx.host.bell();
            }
            return Ok(());
        }

        let content = self.operated_content(text);
        let numbered = self.oap.motion_type == MotionType::Line || self.oap.line_count > 1 || self.oap.use_reg_one;
        store_delete(cx.registers, self.oap.regname, content, numbered)?;

        let (start, end) = (self.oap.start, self.oap.end);
        let old_count = cx.text.line_count();
        save_undo(cx.text, start.line..end.line + 1, self.cursor)?;
        match self.oap.motion_type {
            MotionType::Block => {
                let mut cursor_byte = None;
                for l in start.line..=end.line {
                    let line = cx.text.line_text(l);
                    let seg = self.block_segment_of(&line);
                    if l == start.line {
                        cursor_byte = Some(seg.start + seg.pad_before);
                    }
                    if !seg.short {
                        cx.text.replace_line(l, &seg.remove(&line))?;
                    }
                }
                self.cursor = Position::new(start.line, cursor_byte.unwrap_or(start.byte));
            }
            MotionType::Line if self.oap.op == Some(OperatorKind::Change) => {
                if end.line > start.line {
                    cx.text.delete_lines(start.line + 1..end.line + 1)?;
                    self.marks.adjust(start.line + 1, -((end.line - start.line) as isize));
                }
                let first = cx.text.line_text(start.line);
                let keep = if self.options.autoindent {
                    &first[..column::first_nonblank(&first)]
                } else {
                    ""
                };
                cx.text.replace_line(start.line, keep)?;
                self.cursor = Position::new(start.line, keep.len());
            }
            MotionType::Line => {
                cx.text.delete_lines(start.line..end.line + 1)?;
                self.marks.adjust(start.line, -(self.oap.line_count as isize));
                self.cursor.line = start.line.min(cx.text.line_count().saturating_sub(1));
                self.beginline(&*cx.text, arg::BL_WHITE | arg::BL_FIX);
            }
            MotionType::Char => {
                let to = range_end(&*cx.text, &self.oap);
                delete_chars(cx.text, start, to)?;
                let joined = to.line.min(old_count - 1) - start.line;
                if joined > 0 {
                    self.marks.adjust(start.line + 1, -(joined as isize));
                }
                self.cursor = start;
            }
        }
        self.set_curswant = true;
        let removed = old_count.saturating_sub(cx.text.line_count());
        self.report_lines(cx, removed, "fewer lines");

        let change_start = if self.oap.motion_type == MotionType::Line {
            Position::new(start.line.min(cx.text.line_count().saturating_sub(1)), 0)
        } else {
            self.cursor
        };
        self.marks.change_start = Some(change_start);
        self.marks.change_end = Some(if self.oap.block_mode {
            Position::new(end.line, self.cursor.byte)
        } else {
            change_start
        });
        self.marks.last_change = Some(change_start);
        debug!(
            target: "engine.operator",
            motion = ?self.oap.motion_type,
            lines = self.oap.line_count,
            removed,
            "delete"
        );
        Ok(())
    }

    pub(crate) fn op_yank(&mut self, cx: &mut EngineContext<'_>, message: bool) -> Result<(), CommandError> {
        if normalize(self.oap.regname) == Some('_') {
            return Ok(());
        }
        let content = self.operated_content(&*cx.text);
        store_yank(cx.registers, self.oap.regname, content)?;
        let mut yanked = self.oap.line_count;
        if self.oap.motion_type == MotionType::Char && yanked == 1 {
            yanked = 0;
        }
        if message && yanked > self.options.report {
            let msg = if self.oap.block_mode {
                format!("block of {yanked} lines yanked")
            } else if yanked == 1 {
                "1 line yanked".to_string()
            } else {
                format!("{yanked} lines yanked")
            };
            cx.host.message(&msg);
        }
        self.mark_changed(&*cx.text);
        Ok(())
    }

    fn op_change(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let (start, end) = (self.oap.start, self.oap.end);
        let block_mode = self.oap.block_mode;
        self.op_delete(cx)?;
        let block = block_mode.then(|| {
            let line = cx.text.line_text(start.line);
            self.cursor = Position::new(
                start.line,
                column::byte_at_vcol(&line, self.oap.start_vcol, self.options.tabstop),
            );
            BlockInsert {
                first_line: start.line,
                last_line: end.line,
                vcol: self.oap.start_vcol,
                append: false,
                to_eol: false,
            }
        });
        self.request_insert(InsertSession {
            block,
            ..InsertSession::new(1)
        });
        cap.retval |= CommandResult::COMMAND_BUSY;
        Ok(())
    }

    fn op_shift(&mut self, cx: &mut EngineContext<'_>, left: bool, amount: usize) -> Result<(), CommandError> {
        let (start, end) = (self.oap.start, self.oap.end);
        let ts = self.options.tabstop;
        let sw = self.options.effective_shiftwidth();
        save_undo(cx.text, start.line..end.line + 1, self.cursor)?;
        for l in start.line..=end.line {
            let line = cx.text.line_text(l);
            if line.is_empty() {
                continue;
            }
            let updated = if self.oap.block_mode {
                match shift_block(&line, self.oap.start_vcol, left, sw * amount, ts) {
                    Some(s) => s,
                    None => continue,
                }
            } else {
                let width = shifted_indent(column::indent_width(&line, ts), left, amount, sw, self.options.shiftround);
                column::set_indent(&line, width, ts, self.options.expandtab)
            };
            if updated != line {
                cx.text.replace_line(l, &updated)?;
            }
        }

        if self.oap.block_mode {
            let line = cx.text.line_text(start.line);
            self.cursor = Position::new(start.line, column::byte_at_vcol(&line, self.oap.start_vcol, ts));
            self.set_curswant = true;
        } else {
            self.cursor.line = start.line;
            self.beginline(&*cx.text, arg::BL_SOL | arg::BL_FIX);
        }

        let n = self.oap.line_count;
        if n > self.options.report {
            let lines = if n == 1 { "1 line".to_string() } else { format!("{n} lines") };
            let times = if amount == 1 { "1 time".to_string() } else { format!("{amount} times") };
            let dir = if left { '<' } else { '>' };
            cx.host.message(&format!("{lines} {dir}ed {times}"));
        }
        self.marks.change_start = Some(Position::new(start.line, 0));
        self.marks.change_end = Some(Position::new(end.line, cx.text.line_len(end.line).saturating_sub(1)));
        self.marks.last_change = self.marks.change_start;
        debug!(target: "engine.operator", left, amount, lines = n, "shift");
        Ok(())
    }

    fn op_tilde(&mut self, cx: &mut EngineContext<'_>, op: OperatorKind) -> Result<(), CommandError> {
        let (start, end) = (self.oap.start, self.oap.end);
        let stop = range_end(&*cx.text, &self.oap);
        save_undo(cx.text, start.line..end.line + 1, self.cursor)?;
        for l in start.line..=end.line {
            let line = cx.text.line_text(l);
            let span = match self.oap.motion_type {
                MotionType::Line => 0..line.len(),
                MotionType::Block => {
                    let seg = self.block_segment_of(&line);
                    if seg.short {
                        continue;
                    }
                    seg.start..seg.end
                }
                MotionType::Char => {
                    let from = if l == start.line { start.byte.min(line.len()) } else { 0 };
                    let to = if l == stop.line { stop.byte.min(line.len()) } else { line.len() };
                    from..to.max(from)
                }
            };
            let mapped = map_case(op, &line[span.clone()]);
            if mapped != line[span.clone()] {
                let mut updated = line.clone();
                updated.replace_range(span, &mapped);
                cx.text.replace_line(l, &updated)?;
            }
        }
        let n = self.oap.line_count;
        if n > self.options.report {
            let msg = if n == 1 { "1 line changed".to_string() } else { format!("{n} lines changed") };
            cx.host.message(&msg);
        }
        if !self.oap.block_mode {
            self.cursor = start;
        }
        self.mark_changed(&*cx.text);
        self.marks.last_change = Some(start);
        debug!(target: "engine.operator", ?op, lines = n, "case");
        Ok(())
    }

    fn op_join(&mut self, cx: &mut EngineContext<'_>, insert_space: bool) -> Result<(), CommandError> {
        let first = self.oap.start.line;
        let count = self.oap.line_count.max(2);
        if first + count > cx.text.line_count() {
            return Err(CommandError::OutOfRangeMotion);
        }
        self.do_join(cx, first, count, insert_space)
    }

    /// Replace lines `first..first + old` with `new`, keeping marks in step.
    fn replace_lines(
        &mut self,
        cx: &mut EngineContext<'_>,
        first: usize,
        old: usize,
        new: &[String],
    ) -> Result<(), CommandError> {
        let common = old.min(new.len());
        for (i, s) in new[..common].iter().enumerate() {
            cx.text.replace_line(first + i, s)?;
        }
        if new.len() > old {
            for (i, s) in new[common..].iter().enumerate() {
                cx.text.insert_line(first + common + i, s)?;
            }
            self.marks.adjust(first + old, (new.len() - old) as isize);
        } else if old > new.len() {
            cx.text.delete_lines(first + common..first + old)?;
            self.marks.adjust(first + common, -((old - common) as isize));
        }
        Ok(())
    }

    fn op_format(&mut self, cx: &mut EngineContext<'_>, keep_cursor: bool) -> Result<(), CommandError> {
        let (first, last) = (self.oap.start.line, self.oap.end.line);
        let lines: Vec<String> = (first..=last).map(|l| cx.text.line_text(l)).collect();
        let width = self.options.effective_textwidth();
        let mut formatted = cx.host.format_lines(&lines, width).unwrap_or_else(|| {
            format_paragraphs(&lines, width, self.options.tabstop, self.options.joinspaces)
        });
        if formatted.is_empty() {
            formatted.push(String::new());
        }
        save_undo(cx.text, first..last + 1, self.cursor)?;
        self.replace_lines(cx, first, lines.len(), &formatted)?;

        let new_last = first + formatted.len() - 1;
        let line_count = cx.text.line_count();
        if keep_cursor {
            let line = self.oap.cursor_start.line.min(line_count - 1);
            let byte = self.oap.cursor_start.byte.min(cx.text.line_len(line));
            self.cursor = Position::new(line, byte);
            self.set_curswant = true;
        } else {
            self.cursor.line = new_last;
            if self.oap.end_adjusted && new_last + 1 < line_count {
                self.cursor.line += 1;
            }
            self.beginline(&*cx.text, arg::BL_WHITE | arg::BL_FIX);
        }
        if formatted.len() > lines.len() {
            self.report_lines(cx, formatted.len() - lines.len(), "more lines");
        } else {
            self.report_lines(cx, lines.len() - formatted.len(), "fewer lines");
        }
        self.marks.change_start = Some(Position::new(first, 0));
        self.marks.change_end = Some(Position::new(new_last, 0));
        self.marks.last_change = self.marks.change_start;
        debug!(target: "engine.operator", first, old = lines.len(), new = formatted.len(), width, "format");
        Ok(())
    }

    fn op_function(&mut self, cx: &mut EngineContext<'_>) -> Result<(), CommandError> {
        let start = self.oap.start;
        let mut end = self.oap.end;
        if self.oap.motion_type != MotionType::Line && !self.oap.inclusive {
            decl(&*cx.text, &mut end);
        }
        self.marks.change_start = Some(start);
        self.marks.change_end = Some(end);
        let call = OperatorFunctionCall {
            motion_type: self.oap.motion_type,
            start,
            end,
        };
        debug!(target: "engine.operator", motion = ?call.motion_type, "operator_function");
        if !cx.host.operator_function(call) {
            return Err(CommandError::NoOperatorFunction);
        }
        Ok(())
    }

    fn op_comment(&mut self, cx: &mut EngineContext<'_>) -> Result<(), CommandError> {
        let (first, last) = (self.oap.start.line, self.oap.end.line);
        let lines: Vec<String> = (first..=last).map(|l| cx.text.line_text(l)).collect();
        let toggled = cx
            .host
            .toggle_comment(&lines)
            .unwrap_or_else(|| toggle_comment(&lines, &self.options.commentstring));
        if toggled == lines {
            return Ok(());
        }
        save_undo(cx.text, first..last + 1, self.cursor)?;
        self.replace_lines(cx, first, lines.len(), &toggled)?;
        self.cursor.line = first.min(cx.text.line_count() - 1);
        self.cursor.byte = self.cursor.byte.min(cx.text.line_len(self.cursor.line));
        self.marks.change_start = Some(Position::new(first, 0));
        self.marks.change_end = Some(Position::new(first + toggled.len().saturating_sub(1), 0));
        self.marks.last_change = self.marks.change_start;
        debug!(target: "engine.operator", first, lines = lines.len(), "comment");
        Ok(())
    }

    /// Visual `r{char}`: every character of the area becomes `{char}`.
    fn op_replace(&mut self, cx: &mut EngineContext<'_>, cap: &CommandArg) -> Result<(), CommandError> {
        let c = cap
            .nchar_text()
            .filter(|s| !s.chars().any(char::is_control))
            .ok_or(CommandError::NotAllowedInContext)?;
        let ts = self.options.tabstop;
        let (start, end) = (self.oap.start, self.oap.end);
        let stop = range_end(&*cx.text, &self.oap);
        save_undo(cx.text, start.line..end.line + 1, self.cursor)?;
        for l in start.line..=end.line {
            let line = cx.text.line_text(l);
            let updated = if self.oap.motion_type == MotionType::Block {
                let seg = self.block_segment_of(&line);
                if seg.short {
                    continue;
                }
                let width = column::line_width(&line, ts);
                let last = match self.block_last_vcol() {
                    Some(v) => v.min(width.saturating_sub(1)),
                    None => width.saturating_sub(1),
                };
                let cells = (last + 1).saturating_sub(self.oap.start_vcol);
                let cw = grapheme::cluster_width(&c).max(1);
                format!(
                    "{}{}{}{}{}",
                    &line[..seg.start],
                    " ".repeat(seg.pad_before),
                    c.repeat(cells / cw),
                    " ".repeat(cells % cw + seg.pad_after),
                    &line[seg.end..]
                )
            } else {
                let from = if l == start.line && self.oap.motion_type == MotionType::Char {
                    start.byte.min(line.len())
                } else {
                    0
                };
                let to = if l == stop.line && self.oap.motion_type == MotionType::Char {
                    stop.byte.min(line.len())
                } else {
                    line.len()
                };
                let to = to.max(from);
                let n = line[from..to].graphemes(true).count();
                format!("{}{}{}", &line[..from], c.repeat(n), &line[to..])
            };
            if updated != line {
                cx.text.replace_line(l, &updated)?;
            }
        }
        self.cursor = start;
        self.set_curswant = true;
        self.mark_changed(&*cx.text);
        self.marks.last_change = Some(start);
        debug!(target: "engine.operator", replacement = %c, lines = self.oap.line_count, "replace");
        Ok(())
    }

    /// Visual `I` and `A`. In block mode the typed text is copied to every
    /// line of the block when Insert mode ends.
    fn op_insert(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg, append: bool) -> Result<(), CommandError> {
        let ts = self.options.tabstop;
        let (start, end) = (self.oap.start, self.oap.end);
        let mut session = InsertSession::new(cap.count1);
        if self.oap.block_mode {
            let to_eol = append && self.curswant == MAXCOL;
            let vcol = if append { self.oap.end_vcol + 1 } else { self.oap.start_vcol };
            save_undo(cx.text, start.line..end.line + 1, self.cursor)?;
            let mut line = cx.text.line_text(start.line);
            let byte = if to_eol {
                line.len()
            } else {
                let width = column::line_width(&line, ts);
                if append && width < vcol {
                    line.push_str(&" ".repeat(vcol - width));
                    cx.text.replace_line(start.line, &line)?;
                }
                column::byte_at_vcol(&line, vcol, ts)
            };
            self.cursor = Position::new(start.line, byte);
            session = InsertSession {
                block: Some(BlockInsert {
                    first_line: start.line,
                    last_line: end.line,
                    vcol,
                    append,
                    to_eol,
                }),
                ..InsertSession::new(1)
            };
        } else if append {
            self.cursor = match self.oap.motion_type {
                MotionType::Line => Position::new(end.line, cx.text.line_len(end.line)),
                _ => range_end(&*cx.text, &self.oap),
            };
        } else {
            self.cursor = match self.oap.motion_type {
                MotionType::Line => Position::new(start.line, 0),
                _ => start,
            };
        }
        self.set_curswant = true;
        self.request_insert(session);
        cap.retval |= CommandResult::COMMAND_BUSY;
        Ok(())
    }
}

/// New indent width after shifting `amount` times.
fn shifted_indent(width: usize, left: bool, amount: usize, sw: usize, round: bool) -> usize {
    if round {
        let (mut i, rem) = (width / sw, width % sw);
        if left {
            let amount = if rem > 0 { amount - 1 } else { amount };
            i = i.saturating_sub(amount);
        } else {
            i += amount;
        }
        i * sw
    } else if left {
        width.saturating_sub(sw * amount)
    } else {
        width + sw * amount
    }
}

/// Shift the text of a block line right by `total` cells (inserting
/// spaces) or left (eating blanks at the block start). `None` when the line
/// does not reach the block.
fn shift_block(line: &str, vcol: usize, left: bool, total: usize, tabstop: usize) -> Option<String> {
    if column::line_width(line, tabstop) <= vcol {
        return None;
    }
    let at = column::byte_at_vcol(line, vcol, tabstop);
    if !left {
        return Some(format!("{}{}{}", &line[..at], " ".repeat(total), &line[at..]));
    }
    let ws_end = at + line[at..].len() - line[at..].trim_start_matches([' ', '\t']).len();
    let from = column::vcol_of(line, at, tabstop);
    let to = column::vcol_of(line, ws_end, tabstop);
    let keep = (to - from).saturating_sub(total);
    Some(format!("{}{}{}", &line[..at], " ".repeat(keep), &line[ws_end..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn block_splits_a_tab_into_spaces() {
        // The tab covers cells 1..=7; the block is cells 3..=5.
        let line = "a\tb";
        let seg = block_segment(line, 3, Some(5), 8);
        assert_eq!(seg.start, 1);
        assert_eq!(seg.end, 2);
        assert_eq!(seg.pad_before, 2);
        assert_eq!(seg.pad_after, 2);
        assert_eq!(seg.text(line), "   ");
        assert_eq!(seg.remove(line), "a    b");
    }

    #[test]
    fn block_of_plain_text_and_short_lines() {
        let seg = block_segment("abcdef", 1, Some(3), 8);
        assert_eq!(seg.text("abcdef"), "bcd");
        assert_eq!(seg.remove("abcdef"), "aef");
        assert!(block_segment("ab", 4, Some(6), 8).short);
        let to_eol = block_segment("abcdef", 2, None, 8);
        assert_eq!(to_eol.text("abcdef"), "cdef");
    }

    #[test]
    fn case_mapping() {
        assert_eq!(map_case(OperatorKind::Tilde, "aB-ß"), "Ab-ß");
        assert_eq!(map_case(OperatorKind::Upper, "straße"), "STRAßE");
        assert_eq!(map_case(OperatorKind::Lower, "ÀB"), "àb");
        assert_eq!(map_case(OperatorKind::Rot13, "Hello, z"), "Uryyb, m");
    }

    #[test]
    fn formats_paragraphs_keeping_blank_lines() {
        let lines: Vec<String> = ["  one two three", "four five", "", "six"].map(String::from).to_vec();
        let out = format_paragraphs(&lines, 12, 8, false);
        assert_eq!(out, vec!["  one two", "three four", "five", "", "six"]);
    }

    #[test]
    fn joinspaces_puts_two_spaces_after_a_period() {
        let lines = vec!["end.".to_string(), "next".to_string()];
        assert_eq!(format_paragraphs(&lines, 79, 8, true), vec!["end.  next"]);
    }

    #[test]
    fn comment_toggles_at_common_indent() {
        let lines: Vec<String> = ["  a", "", "    b"].map(String::from).to_vec();
        let on = toggle_comment(&lines, "/* %s */");
        assert_eq!(on, vec!["  /* a */", "", "  /*   b */"]);
        assert_eq!(toggle_comment(&on, "/* %s */"), lines);
        assert_eq!(toggle_comment(&["x".to_string()], "# %s"), vec!["# x"]);
    }

    #[test]
    fn shiftround_snaps_to_multiples() {
        assert_eq!(shifted_indent(5, false, 1, 4, true), 8);
        assert_eq!(shifted_indent(5, true, 1, 4, true), 4);
        assert_eq!(shifted_indent(5, true, 1, 4, false), 1);
        assert_eq!(shifted_indent(2, true, 3, 4, false), 0);
    }

    #[test]
    fn block_shift_eats_only_blanks() {
        assert_eq!(shift_block("ab   cd", 2, true, 2, 8), Some("ab cd".to_string()));
        assert_eq!(shift_block("abcd", 2, false, 2, 8), Some("ab  cd".to_string()));
        assert_eq!(shift_block("a", 2, false, 2, 8), None);
    }
}
