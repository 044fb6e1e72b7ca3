//! Cursor motions, plus the `g` and `z` prefixes.
//!
//! A motion sets `oap.motion_type` and `oap.inclusive` so a pending operator
//! knows how to treat the range it spans.

use core_events::Key;
use core_keymap::arg;
use core_text::motion::{self as tm, Direction};
use core_text::{Position, grapheme};
use tracing::trace;

use crate::engine::{CharSearch, Engine, EngineContext};
use crate::error::CommandError;
use crate::host::{ScreenLineQuery, ScreenRow, ScrollPlace};
use crate::state::{CommandArg, CommandResult, MAXCOL, MotionType, OperatorKind};

fn dir_of(arg: i64) -> Direction {
    if arg == arg::BACKWARD {
        Direction::Backward
    } else {
        Direction::Forward
    }
}

impl Engine {
    pub(super) fn nv_left(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let text = &*cx.text;
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = false;
        let wraps = cap.cmdchar == Key::BS || cap.cmdchar == Key::K_BS;
        for n in (1..=cap.count1).rev() {
            if self.cursor.byte == 0 {
                if wraps && self.cursor.line > 0 {
                    self.cursor.line -= 1;
                    self.coladvance(text, MAXCOL);
                    self.set_curswant = true;
                    // Deleting the line break: stop after the last character.
                    let deleting = matches!(self.oap.op, Some(OperatorKind::Delete | OperatorKind::Change));
                    if deleting && !text.line_is_empty(self.cursor.line) {
                        self.cursor.byte = text.line_len(self.cursor.line);
                        cap.retval |= CommandResult::NO_ADJ_OP_END;
                    }
                    continue;
                }
                if self.oap.op.is_none() && n == cap.count1 {
                    return Err(CommandError::OutOfRangeMotion);
                }
                break;
            }
            let line = text.line_text(self.cursor.line);
            self.cursor.byte = grapheme::prev_boundary(&line, self.cursor.byte.min(line.len()));
            self.set_curswant = true;
        }
        Ok(())
    }

    pub(super) fn nv_right(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let text = &*cx.text;
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = false;
        let past_line = self.past_line_allowed();
        for n in (1..=cap.count1).rev() {
            let line = text.line_text(self.cursor.line);
            let byte = self.cursor.byte.min(line.len());
            let next = grapheme::next_boundary(&line, byte);
            let stuck = if past_line {
                byte >= line.len()
            } else {
                byte >= line.len() || next >= line.len()
            };
            if !stuck {
                self.cursor.byte = next;
                self.set_curswant = true;
                continue;
            }
            if cap.cmdchar == Key::SPACE && self.cursor.line + 1 < text.line_count() {
                // The line break counts as a character for an operator.
                if self.oap.op.is_some() && !self.oap.inclusive && !line.is_empty() {
                    self.oap.inclusive = true;
                } else {
                    self.cursor = Position::new(self.cursor.line + 1, 0);
                    self.set_curswant = true;
                    self.oap.inclusive = false;
                }
                continue;
            }
            if self.oap.op.is_none() {
                if n == cap.count1 {
                    return Err(CommandError::OutOfRangeMotion);
                }
            } else if !line.is_empty() {
                self.oap.inclusive = true;
            }
            break;
        }
        Ok(())
    }

    pub(super) fn nv_up(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Line;
        self.cursor_up(&*cx.text, cap.count1)?;
        if cap.arg != 0 {
            self.beginline(&*cx.text, arg::BL_WHITE | arg::BL_FIX);
        }
        Ok(())
    }

    pub(super) fn nv_down(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Line;
        self.cursor_down(&*cx.text, cap.count1)?;
        if cap.arg != 0 {
            self.beginline(&*cx.text, arg::BL_WHITE | arg::BL_FIX);
        }
        Ok(())
    }

    pub(super) fn nv_dollar(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = true;
        self.curswant = MAXCOL;
        self.set_curswant = false;
        self.cursor_down(&*cx.text, cap.count1 - 1)
    }

    pub(super) fn nv_home(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        cap.count0 = 1;
        self.nv_pipe(cx, cap)
    }

    pub(super) fn nv_end(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if cap.arg != 0 {
            self.nv_goto(cx, cap)?;
            cap.count1 = 1;
        }
        self.nv_dollar(cx, cap)
    }

    pub(super) fn nv_beginline(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = false;
        self.beginline(&*cx.text, cap.arg);
        Ok(())
    }

    /// `|`: to screen column `count`.
    pub(super) fn nv_pipe(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = false;
        self.beginline(&*cx.text, 0);
        self.curswant = cap.count0.saturating_sub(1);
        self.set_curswant = false;
        self.coladvance(&*cx.text, self.curswant);
        Ok(())
    }

    /// `G`, `gg`, `<C-Home>`.
    pub(super) fn nv_goto(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let last = cx.text.line_count().saturating_sub(1);
        let mut line = if cap.arg != 0 { last } else { 0 };
        self.oap.motion_type = MotionType::Line;
        self.setpcmark();
        if cap.count0 != 0 {
            line = (cap.count0 - 1).min(last);
        }
        self.cursor.line = line;
        self.beginline(&*cx.text, arg::BL_SOL | arg::BL_FIX);
        Ok(())
    }

    /// `%` jumps to the matching bracket; `{count}%` to that percentage of
    /// the buffer.
    pub(super) fn nv_percent(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let text = &*cx.text;
        self.oap.inclusive = true;
        if cap.count0 != 0 {
            if cap.count0 > 100 {
                return Err(CommandError::OutOfRangeMotion);
            }
            self.oap.motion_type = MotionType::Line;
            self.setpcmark();
            let n = text.line_count();
            let target = (cap.count0 * n + 99) / 100;
            self.cursor.line = target.clamp(1, n.max(1)) - 1;
            self.beginline(text, arg::BL_SOL | arg::BL_FIX);
            return Ok(());
        }
        self.oap.motion_type = MotionType::Char;
        self.oap.use_reg_one = true;
        let pos = tm::match_pair(text, self.cursor).ok_or(CommandError::OutOfRangeMotion)?;
        self.setpcmark();
        self.cursor = pos;
        self.set_curswant = true;
        self.adjust_for_sel(text);
        Ok(())
    }

    /// `{` and `}`.
    pub(super) fn nv_findpar(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = false;
        self.oap.use_reg_one = true;
        self.set_curswant = true;
        let (pos, inclusive) = tm::paragraph(&*cx.text, self.cursor, cap.count1, dir_of(cap.arg), None, false)
            .ok_or(CommandError::OutOfRangeMotion)?;
        self.setpcmark();
        self.cursor = pos;
        self.oap.inclusive = inclusive;
        Ok(())
    }

    /// `w`, `W`, `e`, `E` and the shifted/control arrow forms.
    pub(super) fn nv_wordcmd(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let text = &*cx.text;
        let mut word_end = cap.cmd_is('e') || cap.cmd_is('E');
        let bigword = cap.arg != 0;
        let mut stop = false;
        self.oap.inclusive = word_end;

        if !word_end && self.oap.op == Some(OperatorKind::Change) {
            let c = grapheme::char_at(&text.line_text(self.cursor.line), self.cursor.byte);
            match c {
                Some(c) if grapheme::is_blank(c) => {
                    // `cw` on a blank changes one character when 'cpoptions' has `w`.
                    if cap.count1 == 1 && self.options.cpo('w') {
                        self.oap.inclusive = true;
                        self.oap.motion_type = MotionType::Char;
                        return Ok(());
                    }
                }
                Some(_) => {
                    // `cw` acts like `ce` when on a non-blank.
                    self.oap.inclusive = true;
                    word_end = true;
                    stop = true;
                }
                None => {}
            }
        }

        self.oap.motion_type = MotionType::Char;
        self.set_curswant = true;
        let start = self.cursor;
        let ok = if word_end {
            tm::end_word(text, &mut self.cursor, cap.count1, bigword, stop, false)
        } else {
            tm::fwd_word(text, &mut self.cursor, cap.count1, bigword, self.oap.op.is_some())
        };
        if start < self.cursor {
            self.adjust_cursor(text);
        }
        if !ok && self.oap.op.is_none() {
            return Err(CommandError::OutOfRangeMotion);
        }
        self.adjust_for_sel(text);
        Ok(())
    }

    /// `b`, `B`.
    pub(super) fn nv_bck_word(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = false;
        self.set_curswant = true;
        if !tm::bck_word(&*cx.text, &mut self.cursor, cap.count1, cap.arg != 0, false) {
            return Err(CommandError::OutOfRangeMotion);
        }
        Ok(())
    }

    /// `f`, `F`, `t`, `T`, `;` and `,`.
    pub(super) fn nv_csearch(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let text = &*cx.text;
        self.oap.motion_type = MotionType::Char;
        let repeat = cap.cmd_is(';') || cap.cmd_is(',');
        let (target, dir, till, skip_adjacent) = if repeat {
            let last = self.char_search.clone().ok_or(CommandError::OutOfRangeMotion)?;
            let dir = if cap.arg != 0 { last.dir.reversed() } else { last.dir };
            let skip = !self.options.cpo(';') && cap.count1 == 1 && last.till;
            (last.target, dir, last.till, skip)
        } else {
            if cap.nchar.is_special() {
                return Err(CommandError::OutOfRangeMotion);
            }
            let target = cap.nchar_text().ok_or(CommandError::OutOfRangeMotion)?;
            let till = cap.cmd_is('t') || cap.cmd_is('T');
            let dir = dir_of(cap.arg);
            if !self.key_stuffed {
                self.char_search = Some(CharSearch { target: target.clone(), dir, till });
            }
            (target, dir, till, false)
        };
        self.oap.inclusive = dir == Direction::Forward;
        let line = text.line_text(self.cursor.line);
        let byte = tm::find_char(&line, self.cursor.byte, &target, dir, till, cap.count1, skip_adjacent)
            .ok_or(CommandError::OutOfRangeMotion)?;
        trace!(target: "engine.motion", target = %target, ?dir, till, byte, "char_search");
        self.cursor.byte = byte;
        self.set_curswant = true;
        self.adjust_for_sel(text);
        Ok(())
    }

    /// `'x`, `` `x ``, `g'x`, `` g`x ``.
    pub(super) fn nv_gomark(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let text = &*cx.text;
        let key = if cap.cmd_is('g') { cap.extra_char } else { cap.nchar };
        let name = key.as_char().ok_or(CommandError::OutOfRangeMotion)?;
        let linewise = cap.arg != 0;
        let pos = self.marks.get(name).ok_or(CommandError::MarkNotSet(name))?;
        if pos.line >= text.line_count() {
            return Err(CommandError::MarkNotSet(name));
        }
        if cap.cmd_is('\'') || cap.cmd_is('`') {
            self.setpcmark();
        }
        self.cursor = pos;
        if linewise {
            self.beginline(text, arg::BL_WHITE | arg::BL_FIX);
        } else {
            let len = text.line_len(pos.line);
            self.cursor.byte = pos.byte.min(len);
        }
        self.oap.motion_type = if linewise { MotionType::Line } else { MotionType::Char };
        if cap.cmd_is('`') {
            self.oap.use_reg_one = true;
        }
        self.oap.inclusive = false;
        self.set_curswant = true;
        Ok(())
    }

    /// `m{a-zA-Z'`[]<>}`.
    pub(super) fn nv_mark(&mut self, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_op()?;
        let name = cap.nchar.as_char().ok_or(CommandError::NotAllowedInContext)?;
        if !self.marks.set(name, self.cursor) {
            return Err(CommandError::NotAllowedInContext);
        }
        Ok(())
    }

    /// `H`, `M`, `L`.
    pub(super) fn nv_scroll(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Line;
        self.setpcmark();
        let row = if cap.cmd_is('L') {
            ScreenRow::Bottom
        } else if cap.cmd_is('M') {
            ScreenRow::Middle
        } else {
            ScreenRow::Top
        };
        let offset = cap.count1 - 1;
        let last = cx.text.line_count().saturating_sub(1);
        let line = cx
            .host
            .screen_line(ScreenLineQuery { row, offset, cursor: self.cursor })
            .unwrap_or(match row {
                ScreenRow::Top => offset,
                ScreenRow::Middle => last / 2,
                ScreenRow::Bottom => last.saturating_sub(offset),
            });
        self.cursor.line = line.min(last);
        self.beginline(&*cx.text, arg::BL_SOL | arg::BL_FIX);
        Ok(())
    }

    /// `CTRL-E` and `CTRL-Y`.
    pub(super) fn nv_scroll_line(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_op()?;
        let n = cap.count1 as isize;
        let delta = if cap.arg != 0 { n } else { -n };
        if let Some(pos) = cx.host.scroll_lines(delta, self.cursor) {
            self.cursor = pos;
            self.coladvance(&*cx.text, self.curswant);
        }
        Ok(())
    }

    fn viewport_height(&self, cx: &EngineContext<'_>) -> usize {
        cx.host
            .viewport_height()
            .unwrap_or(self.options.viewport_height)
            .max(1)
    }

    /// `CTRL-F`, `CTRL-B`, `<PageDown>`, `<PageUp>`.
    pub(super) fn nv_page(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_op()?;
        let last = cx.text.line_count().saturating_sub(1);
        let step = self.viewport_height(cx).saturating_sub(2).max(1).saturating_mul(cap.count1);
        let line = self.cursor.line;
        self.cursor.line = match dir_of(cap.arg) {
            Direction::Forward if line >= last => return Err(CommandError::OutOfRangeMotion),
            Direction::Forward => line.saturating_add(step).min(last),
            Direction::Backward if line == 0 => return Err(CommandError::OutOfRangeMotion),
            Direction::Backward => line.saturating_sub(step),
        };
        self.beginline(&*cx.text, arg::BL_SOL | arg::BL_FIX);
        Ok(())
    }

    /// `CTRL-D` and `CTRL-U`; a count sets the amount for later uses.
    pub(super) fn nv_halfpage(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let down = cap.cmdchar == Key::ctrl('d');
        let last = cx.text.line_count().saturating_sub(1);
        if (!down && self.cursor.line == 0) || (down && self.cursor.line >= last) {
            return Err(CommandError::OutOfRangeMotion);
        }
        self.check_clear_op()?;
        let height = self.viewport_height(cx);
        if cap.count0 > 0 {
            self.scroll_amount = cap.count0.min(height);
        }
        let n = if self.scroll_amount > 0 {
            self.scroll_amount
        } else {
            (height / 2).max(1)
        };
        self.cursor.line = if down {
            self.cursor.line.saturating_add(n).min(last)
        } else {
            self.cursor.line.saturating_sub(n)
        };
        self.beginline(&*cx.text, arg::BL_SOL | arg::BL_FIX);
        Ok(())
    }

    /// `z` commands: place the cursor line on screen, or scroll sideways.
    pub(super) fn nv_zet(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_op()?;
        let nchar = cap.nchar;
        let width = cx.host.viewport_width().unwrap_or(80);
        let place = if nchar == Key::CR || nchar == Key::NL {
            Some((ScrollPlace::Top, true))
        } else {
            match nchar.as_char() {
                Some('t') => Some((ScrollPlace::Top, false)),
                Some('.') => Some((ScrollPlace::Center, true)),
                Some('z') => Some((ScrollPlace::Center, false)),
                Some('-') => Some((ScrollPlace::Bottom, true)),
                Some('b') => Some((ScrollPlace::Bottom, false)),
                _ => None,
            }
        };
        if let Some((place, to_nonblank)) = place {
            if cap.count0 > 0 {
                self.setpcmark();
                self.cursor.line = (cap.count0 - 1).min(cx.text.line_count().saturating_sub(1));
                self.coladvance(&*cx.text, self.curswant);
            }
            if to_nonblank {
                self.beginline(&*cx.text, arg::BL_WHITE | arg::BL_FIX);
            }
            cx.host.scroll_cursor_to(place, self.cursor.line);
            return Ok(());
        }
        let n = cap.count1 as isize;
        let half = (width / 2) as isize;
        let delta = if nchar == Key::LEFT {
            -n
        } else if nchar == Key::RIGHT {
            n
        } else {
            match nchar.as_char() {
                Some('h') => -n,
                Some('l') => n,
                Some('H') => -n * half,
                Some('L') => n * half,
                _ => return Err(CommandError::UnknownCommand(nchar)),
            }
        };
        cx.host.scroll_columns(delta);
        Ok(())
    }

    /// `CTRL-O` and `CTRL-I` (`<Tab>`): walk the jump list. In Select mode
    /// `CTRL-O` runs one Visual mode command instead.
    pub(super) fn nv_jumplist(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let back = cap.arg == arg::BACKWARD;
        if back && self.visual.active && self.visual.select_mode {
            self.visual.select_mode = false;
            self.restart_select = 2;
            return Ok(());
        }
        self.check_clear_opq()?;
        let n = cap.count1 as isize;
        let pos = self
            .marks
            .jump(if back { -n } else { n }, self.cursor)
            .ok_or(CommandError::OutOfRangeMotion)?;
        if pos.line >= cx.text.line_count() {
            return Err(CommandError::OutOfRangeMotion);
        }
        self.cursor = Position::new(pos.line, pos.byte.min(cx.text.line_len(pos.line)));
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = false;
        self.set_curswant = true;
        Ok(())
    }

    /// `gj` / `gk`: lines are never wrapped, so these move by buffer lines
    /// but stay characterwise.
    fn nv_screengo(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg, down: bool) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = self.curswant == MAXCOL;
        if down {
            self.cursor_down(&*cx.text, cap.count1)
        } else {
            self.cursor_up(&*cx.text, cap.count1)
        }
    }

    /// `g0`, `g^`, `gm`, `g<Home>`.
    fn nv_g_home(&mut self, cx: &mut EngineContext<'_>, nchar: Key) -> Result<(), CommandError> {
        let text = &*cx.text;
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = false;
        let col = if nchar == Key::from_char('m') {
            cx.host.viewport_width().unwrap_or(80) / 2
        } else {
            0
        };
        self.coladvance(text, col);
        if nchar == Key::from_char('^') {
            let line = text.line_text(self.cursor.line);
            while let Some(c) = grapheme::char_at(&line, self.cursor.byte) {
                let next = grapheme::next_boundary(&line, self.cursor.byte);
                if !grapheme::is_blank(c) || next >= line.len() {
                    break;
                }
                self.cursor.byte = next;
            }
        }
        self.set_curswant = true;
        Ok(())
    }

    /// `g$`, `g<End>`: last character visible without horizontal scrolling.
    fn nv_g_end(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = true;
        if cap.count1 > 1 {
            self.cursor_down(&*cx.text, cap.count1 - 1)?;
        }
        let width = cx.host.viewport_width().unwrap_or(80).max(1);
        self.coladvance(&*cx.text, width - 1);
        self.set_curswant = true;
        self.update_curswant(&*cx.text);
        Ok(())
    }

    /// `g_`: last non-blank, `count - 1` lines down.
    fn nv_g_underscore(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let text = &*cx.text;
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = true;
        self.curswant = MAXCOL;
        self.set_curswant = false;
        self.cursor_down(text, cap.count1 - 1)?;
        let line = text.line_text(self.cursor.line);
        if self.cursor.byte > 0 && self.cursor.byte >= line.len() {
            self.cursor.byte = grapheme::prev_boundary(&line, line.len());
        }
        while self.cursor.byte > 0
            && grapheme::char_at(&line, self.cursor.byte).is_some_and(grapheme::is_blank)
        {
            self.cursor.byte = grapheme::prev_boundary(&line, self.cursor.byte);
        }
        self.set_curswant = true;
        self.adjust_for_sel(text);
        Ok(())
    }

    /// `ge`, `gE`.
    fn nv_g_bckend(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Char;
        self.set_curswant = true;
        self.oap.inclusive = true;
        if !tm::bckend_word(&*cx.text, &mut self.cursor, cap.count1, cap.nchar_is('E'), false) {
            return Err(CommandError::OutOfRangeMotion);
        }
        Ok(())
    }

    /// Commands starting with `g`.
    pub(super) fn nv_g_cmd(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let nchar = cap.nchar;
        if nchar == Key::ctrl('h') {
            cap.cmdchar = Key::ctrl('v');
            cap.arg = 1;
            return self.nv_visual(cx, cap);
        }
        if nchar == Key::ctrl(']') {
            return self.nv_ctrl_bracket(cx, cap);
        }
        if nchar == Key::HOME {
            return self.nv_g_home(cx, Key::from_char('0'));
        }
        if nchar == Key::END {
            return self.nv_g_end(cx, cap);
        }
        if nchar == Key::UP || nchar == Key::DOWN {
            return self.nv_screengo(cx, cap, nchar == Key::DOWN);
        }
        let Some(c) = nchar.as_char() else {
            return Err(CommandError::UnknownCommand(nchar));
        };
        match c {
            'h' | 'H' => {
                cap.cmdchar = Key::from_char(if c == 'h' { 'v' } else { 'V' });
                cap.arg = 1;
                self.nv_visual(cx, cap)
            }
            'v' => self.nv_gv(cx, cap),
            'j' | 'k' => self.nv_screengo(cx, cap, c == 'j'),
            'J' => self.nv_join(cx, cap),
            '0' | '^' | 'm' => self.nv_g_home(cx, nchar),
            '_' => self.nv_g_underscore(cx, cap),
            '$' => self.nv_g_end(cx, cap),
            'g' => {
                cap.arg = 0;
                self.nv_goto(cx, cap)
            }
            '*' | '#' => self.nv_ident(cx, cap),
            'e' | 'E' => self.nv_g_bckend(cx, cap),
            'i' => {
                if let Some(pos) = self.marks.last_insert {
                    let last = cx.text.line_count().saturating_sub(1);
                    let line = pos.line.min(last);
                    self.cursor = Position::new(line, pos.byte.min(cx.text.line_len(line)));
                }
                cap.cmdchar = Key::from_char('i');
                self.nv_edit(cx, cap)
            }
            'I' => {
                self.beginline(&*cx.text, 0);
                self.check_clear_opq()?;
                self.start_insert_command(cx, cap, "gI")
            }
            'p' | 'P' => self.nv_put(cx, cap),
            'q' | 'w' | '~' | 'u' | 'U' | '?' | '@' | 'c' => self.nv_operator(cx, cap),
            '\'' => {
                cap.arg = 1;
                self.nv_gomark(cx, cap)
            }
            '`' => {
                cap.arg = 0;
                self.nv_gomark(cx, cap)
            }
            'r' => {
                cap.cmdchar = Key::from_char('r');
                cap.nchar = cap.extra_char;
                self.nv_replace(cx, cap)
            }
            'R' => {
                cap.arg = 0;
                self.nv_replace_mode(cx, cap)
            }
            'd' | 'D' => self.nv_gd(cx, cap, c == 'D'),
            'a' => {
                self.check_clear_op()?;
                let line = cx.text.line_text(self.cursor.line);
                let msg = match grapheme::char_at(&line, self.cursor.byte) {
                    Some(ch) => {
                        let v = ch as u32;
                        format!("<{ch}> {v}, Hex {v:02x}, Oct {v:03o}")
                    }
                    None => "NUL".to_string(),
                };
                cx.host.message(&msg);
                Ok(())
            }
            _ => Err(CommandError::UnknownCommand(nchar)),
        }
    }
}
