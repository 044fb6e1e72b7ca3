//! Visual and Select mode, `<Esc>`, `CTRL-\ CTRL-N`, `CTRL-G`.

use core_config::{SelectModeTrigger, Selection};
use core_events::Key;
use core_text::{LineAccess, Position, column, grapheme};
use tracing::debug;

use crate::engine::{Engine, EngineContext};
use crate::error::CommandError;
use crate::state::{CommandArg, MAXCOL, SavedVisual, VisualKind};

impl Engine {
    /// Select mode instead of Visual mode when `'selectmode'` has
    /// `trigger` and the command was typed.
    fn may_start_select(&mut self, trigger: SelectModeTrigger) {
        self.visual.select_mode = self.key_typed && !self.key_stuffed && self.options.select_on(trigger);
    }

    fn start_visual(&mut self, kind: VisualKind) {
        self.visual.active = true;
        self.visual.kind = kind;
        self.visual.anchor = self.cursor;
        self.visual.mode_before_override = None;
        debug!(target: "engine.visual", ?kind, select = self.visual.select_mode, "visual_start");
    }

    /// A shifted special key with `'keymodel'` containing `startsel`.
    pub(crate) fn start_selection(&mut self, _cx: &mut EngineContext<'_>) {
        self.may_start_select(SelectModeTrigger::Key);
        self.start_visual(VisualKind::Char);
    }

    /// Leave Visual mode, remembering the area for `gv` and the `'<` `'>`
    /// marks.
    pub(crate) fn end_visual_mode(&mut self, cx: &mut EngineContext<'_>) {
        let kind = self.visual.mode_before_override.unwrap_or(self.visual.kind);
        self.save_visual_area();
        self.visual.active = false;
        self.visual.select_mode = false;
        let line = cx.text.line_text(self.cursor.line);
        if self.cursor.byte > 0 && self.cursor.byte >= line.len() {
            self.cursor.byte = grapheme::prev_boundary(&line, line.len());
        }
        debug!(target: "engine.visual", ?kind, "visual_end");
    }

    /// `v`, `V`, `CTRL-V` (and `gh`, `gH`, `g CTRL-H` for Select mode).
    pub(super) fn nv_visual(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if cap.cmdchar == Key::ctrl('q') {
            cap.cmdchar = Key::ctrl('v');
        }
        let kind = VisualKind::from_key(cap.cmdchar).ok_or(CommandError::UnknownCommand(cap.cmdchar))?;
        if self.oap.op.is_some() {
            // `dv`, `dV`, `d CTRL-V`: force the motion type.
            self.oap.motion_force = Some(kind);
            self.finish_op = false;
            return Ok(());
        }
        self.visual.select_mode = cap.arg != 0;
        if self.visual.active {
            if self.visual.kind == kind {
                self.end_visual_mode(cx);
            } else {
                self.visual.kind = kind;
                debug!(target: "engine.visual", ?kind, "visual_switch");
            }
            return Ok(());
        }
        if cap.count0 > 0
            && let Some(resel) = self.resel
        {
            self.reselect(cx, cap, resel);
            return Ok(());
        }
        if cap.arg == 0 {
            self.may_start_select(SelectModeTrigger::Cmd);
        }
        self.start_visual(kind);
        if kind != VisualKind::Line && self.options.selection == Selection::Exclusive {
            cap.count1 += 1;
        }
        if cap.count0 > 0 && cap.count1 > 1 {
            cap.count1 -= 1;
            match kind {
                VisualKind::Line => self.nv_down(cx, cap)?,
                _ => self.nv_right(cx, cap)?,
            }
        }
        Ok(())
    }

    /// `{count}v`: select `count` times the area of the last Visual
    /// operation, starting at the cursor.
    fn reselect(&mut self, cx: &mut EngineContext<'_>, cap: &CommandArg, resel: crate::state::Reselect) {
        let text = &*cx.text;
        self.visual.anchor = self.cursor;
        self.visual.active = true;
        self.visual.mode_before_override = None;
        if cap.arg == 0 {
            self.may_start_select(SelectModeTrigger::Cmd);
        }
        let count = cap.count0;
        if resel.kind != VisualKind::Char || resel.line_count > 1 {
            let last = text.line_count().saturating_sub(1);
            let down = (resel.line_count * count).saturating_sub(1);
            self.cursor.line = self.cursor.line.saturating_add(down).min(last);
        }
        self.visual.kind = resel.kind;
        let ts = self.options.tabstop;
        if resel.kind == VisualKind::Char {
            if resel.line_count <= 1 {
                let line = text.line_text(self.cursor.line);
                self.curswant = column::vcol_of(&line, self.cursor.byte, ts) + resel.vcol * count;
                if self.options.selection != Selection::Exclusive {
                    self.curswant = self.curswant.saturating_sub(1);
                }
            } else {
                self.curswant = resel.vcol;
            }
            self.coladvance(text, self.curswant);
        }
        if resel.vcol == MAXCOL {
            self.curswant = MAXCOL;
            self.coladvance(text, MAXCOL);
        } else if resel.kind == VisualKind::Block {
            let anchor_line = text.line_text(self.visual.anchor.line);
            let base = column::vcol_of(&anchor_line, self.visual.anchor.byte, ts);
            self.curswant = (base + resel.vcol * count).saturating_sub(1);
            self.coladvance(text, self.curswant);
        } else {
            self.set_curswant = true;
        }
        debug!(target: "engine.visual", kind = ?resel.kind, count, "visual_reselect");
    }

    /// `gv`: back to the previous Visual area, or swap with it.
    pub(super) fn nv_gv(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_op()?;
        let saved = self.saved_visual.ok_or(CommandError::OutOfRangeMotion)?;
        let count = cx.text.line_count();
        if saved.start.line >= count || saved.end.line >= count {
            return Err(CommandError::OutOfRangeMotion);
        }
        if self.visual.active {
            self.saved_visual = Some(SavedVisual {
                kind: self.visual.kind,
                start: self.visual.anchor,
                end: self.cursor,
                curswant: self.curswant,
            });
        }
        self.visual.kind = saved.kind;
        self.visual.mode_before_override = None;
        self.curswant = saved.curswant;
        self.set_curswant = false;
        self.visual.active = true;
        self.visual.anchor = clamp(cx, saved.start);
        self.cursor = clamp(cx, saved.end);
        if cap.arg != 0 {
            self.visual.select_mode = true;
        } else {
            self.may_start_select(SelectModeTrigger::Cmd);
        }
        debug!(target: "engine.visual", kind = ?saved.kind, "visual_restore");
        Ok(())
    }

    /// `o` / `O` in Visual mode: go to the other end. In block mode `O`
    /// goes to the other end of the same line.
    pub(super) fn v_swap_corners(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let text = &*cx.text;
        if !(cap.cmd_is('O') && self.visual.kind == VisualKind::Block) {
            std::mem::swap(&mut self.cursor, &mut self.visual.anchor);
            self.set_curswant = true;
            return Ok(());
        }
        let ts = self.options.tabstop;
        let exclusive = self.options.selection == Selection::Exclusive;
        let old = self.cursor;
        let anchor = self.visual.anchor;
        let (left, mut right) = block_cols(text, old, anchor, ts);
        self.cursor.line = anchor.line;
        self.coladvance(text, left);
        self.visual.anchor = self.cursor;
        self.cursor.line = old.line;
        self.curswant = right;
        if old.line >= anchor.line && exclusive {
            self.curswant += 1;
        }
        self.coladvance(text, self.curswant);
        if self.cursor.byte == old.byte {
            self.cursor.line = anchor.line;
            if old.line <= anchor.line && exclusive {
                right += 1;
            }
            self.coladvance(text, right);
            self.visual.anchor = self.cursor;
            self.cursor.line = old.line;
            self.coladvance(text, left);
            self.curswant = left;
        }
        self.set_curswant = false;
        Ok(())
    }

    /// `<Esc>` and `CTRL-C`.
    pub(super) fn nv_esc(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let no_reason = self.oap.op.is_none() && cap.opcount == 0 && cap.count0 == 0 && self.oap.regname.is_none();
        if cap.arg != 0 && !self.visual.active && no_reason {
            cx.host.message("Type  :qa!  and press <Enter> to abandon all changes and exit");
        }
        if self.visual.active {
            self.end_visual_mode(cx);
            self.set_curswant = true;
        } else if no_reason {
            cx.host.bell();
        }
        self.clearop();
        Ok(())
    }

    /// `CTRL-\ CTRL-N` and `CTRL-\ CTRL-G`: back to Normal mode.
    pub(super) fn nv_normal(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if cap.nchar != Key::ctrl('n') && cap.nchar != Key::ctrl('g') {
            self.clearop();
            return Err(CommandError::UnknownCommand(cap.nchar));
        }
        self.clearop();
        if self.visual.active {
            self.end_visual_mode(cx);
        }
        Ok(())
    }

    /// `CTRL-H` deletes the selection in Select mode, else moves left.
    pub(super) fn nv_ctrlh(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if self.visual.active && self.visual.select_mode {
            cap.cmdchar = Key::from_char('x');
            return self.v_visop(cx, cap);
        }
        self.nv_left(cx, cap)
    }

    /// `CTRL-G`: toggle between Visual and Select mode, else show the
    /// buffer position.
    pub(super) fn nv_ctrlg(&mut self, cx: &mut EngineContext<'_>, _cap: &mut CommandArg) -> Result<(), CommandError> {
        if self.visual.active {
            self.visual.select_mode = !self.visual.select_mode;
            return Ok(());
        }
        self.check_clear_op()?;
        let lines = cx.text.line_count();
        let pct = (self.cursor.line + 1) * 100 / lines.max(1);
        let plural = if lines == 1 { "" } else { "s" };
        cx.host.message(&format!("{lines} line{plural} --{pct}%--"));
        Ok(())
    }
}

fn clamp(cx: &EngineContext<'_>, pos: Position) -> Position {
    let last = cx.text.line_count().saturating_sub(1);
    let line = pos.line.min(last);
    Position::new(line, pos.byte.min(cx.text.line_len(line)))
}

/// Leftmost and rightmost screen column covered by two block corners.
fn block_cols<L: LineAccess + ?Sized>(text: &L, a: Position, b: Position, ts: usize) -> (usize, usize) {
    let la = text.line_text(a.line);
    let lb = text.line_text(b.line);
    let (a0, a1) = column::vcol_range(&la, a.byte, ts);
    let (b0, b1) = column::vcol_range(&lb, b.byte, ts);
    (a0.min(b0), a1.max(b1))
}
