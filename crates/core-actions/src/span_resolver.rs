//! Turning a pending operator plus its motion (or the Visual selection)
//! into the range the operator works on.
//!
//! Order of work:
//! * `v`, `V`, `CTRL-V` typed after the operator change the motion type.
//! * The redo buffer gets the command, unless the operator is a yank.
//! * A Visual selection becomes the range; its shape is remembered for
//!   `gv`, `1v` and for repeating with `.`.
//! * Start and end are ordered and the cursor goes to the start.
//! * Inclusive ends and the exclusive-at-column-0 rule are settled, then
//!   the operator runs (see [`crate::operators`]).

use core_config::Selection;
use core_events::Key;
use core_state::TextStore;
use core_text::{LineAccess, Position, column, grapheme};
use tracing::debug;

use crate::engine::{Engine, EngineContext};
use crate::error::CommandError;
use crate::state::{
    CommandArg, CommandResult, MAXCOL, MotionType, OperatorKind, OperatorPending, RedoVisual, Reselect, SavedVisual, VisualKind,
};

impl Engine {
    /// Apply the pending operator, if the current command completed it.
    pub(crate) fn do_pending_operator(
        &mut self,
        cx: &mut EngineContext<'_>,
        cap: &mut CommandArg,
    ) -> Result<(), CommandError> {
        let Some(op) = self.oap.op else {
            return Ok(());
        };
        if !self.finish_op && !self.visual.active {
            return Ok(());
        }
        let redo_yank = self.options.cpo('y');
        self.oap.is_visual = self.visual.active;
        self.apply_motion_force();
        if self.visual.active {
            self.update_curswant(&*cx.text);
        }

        if (redo_yank || op != OperatorKind::Yank) && (!self.visual.active || self.oap.motion_force.is_some()) {
            self.prep_operator_redo(op, cap);
        }

        let busy = self.redo_visual_busy;
        let mut include_line_break = false;
        if let Some(rv) = self.redo_visual.filter(|_| busy) {
            self.resize_for_redo(&*cx.text, rv, cap);
        } else if self.visual.active {
            self.save_visual_area();
            if self.visual.select_mode && self.visual.kind == VisualKind::Line && op != OperatorKind::Delete {
                // Select mode operates on a linewise selection characterwise.
                let text = &*cx.text;
                if self.visual.anchor < self.cursor {
                    self.visual.anchor.byte = 0;
                    self.cursor.byte = text.line_len(self.cursor.line);
                } else {
                    self.cursor.byte = 0;
                    self.visual.anchor.byte = text.line_len(self.visual.anchor.line);
                }
                self.visual.kind = VisualKind::Char;
            } else if self.visual.kind == VisualKind::Char {
                include_line_break = self.unadjust_for_sel(&*cx.text);
            }
            self.oap.start = self.visual.anchor;
            if self.visual.kind == VisualKind::Line {
                self.oap.start.byte = 0;
            }
        }

        if self.oap.start < self.cursor {
            self.oap.end = self.cursor;
            self.cursor = self.oap.start;
        } else {
            self.oap.end = self.oap.start;
            self.oap.start = self.cursor;
        }
        self.oap.line_count = self.oap.end.line - self.oap.start.line + 1;
        self.oap.block_mode = false;

        if self.visual.active {
            self.close_visual(&*cx.text, op, cap, busy, redo_yank, include_line_break);
        }

        self.set_curswant = true;
        let text = &*cx.text;
        let end_line = text.line_text(self.oap.end.line);
        let at_nul = self.oap.end.byte >= end_line.len();
        self.oap.empty = self.oap.motion_type == MotionType::Char
            && (!self.oap.inclusive || (op == OperatorKind::Yank && at_nul))
            && self.oap.start == self.oap.end;
        let empty_region_error = self.oap.empty && self.options.cpo('E');

        self.oap.end_adjusted = false;
        if self.oap.motion_type == MotionType::Char
            && !self.oap.inclusive
            && !cap.retval.contains(CommandResult::NO_ADJ_OP_END)
            && self.oap.end.byte == 0
            && (!self.oap.is_visual || self.options.selection == Selection::Old)
            && self.oap.line_count > 1
        {
            // An exclusive motion ending in column 0 stops at the end of the
            // previous line; from within the indent it becomes linewise.
            self.oap.end_adjusted = true;
            self.oap.line_count -= 1;
            self.oap.end.line -= 1;
            if self.in_indent(text) {
                self.oap.motion_type = MotionType::Line;
            } else {
                let line = text.line_text(self.oap.end.line);
                self.oap.end.byte = line.len();
                if !line.is_empty() {
                    self.oap.end.byte = grapheme::prev_boundary(&line, line.len());
                    self.oap.inclusive = true;
                }
            }
        }

        debug!(
            target: "engine.operator",
            ?op,
            start_line = self.oap.start.line,
            start_byte = self.oap.start.byte,
            end_line = self.oap.end.line,
            end_byte = self.oap.end.byte,
            motion = ?self.oap.motion_type,
            inclusive = self.oap.inclusive,
            visual = self.oap.is_visual,
            "apply_operator"
        );

        let rejects_empty = !matches!(
            op,
            OperatorKind::ShiftLeft
                | OperatorKind::ShiftRight
                | OperatorKind::Join
                | OperatorKind::JoinNoSpace
                | OperatorKind::Format
                | OperatorKind::FormatKeep
                | OperatorKind::Function
                | OperatorKind::Comment
        );
        let result = if empty_region_error && rejects_empty {
            self.redo.cancel();
            Err(CommandError::EmptyRegionRejected)
        } else {
            self.apply_operator(cx, op, cap)
        };

        if result.is_ok()
            && !self.options.startofline
            && self.oap.motion_type == MotionType::Line
            && !self.oap.end_adjusted
            && matches!(op, OperatorKind::ShiftLeft | OperatorKind::ShiftRight | OperatorKind::Delete)
        {
            self.curswant = self.old_col;
            self.coladvance(&*cx.text, self.old_col);
            self.set_curswant = false;
        }
        self.oap.block_mode = false;
        self.clearop();
        result
    }

    fn apply_motion_force(&mut self) {
        match self.oap.motion_force {
            Some(VisualKind::Line) => self.oap.motion_type = MotionType::Line,
            Some(VisualKind::Char) => {
                match self.oap.motion_type {
                    MotionType::Line => self.oap.inclusive = false,
                    MotionType::Char => self.oap.inclusive = !self.oap.inclusive,
                    MotionType::Block => {}
                }
                self.oap.motion_type = MotionType::Char;
            }
            Some(VisualKind::Block) => {
                if !self.visual.active {
                    self.visual.active = true;
                    self.visual.anchor = self.oap.start;
                }
                self.visual.kind = VisualKind::Block;
                self.visual.select_mode = false;
            }
            None => {}
        }
    }

    fn prep_operator_redo(&mut self, op: OperatorKind, cap: &CommandArg) {
        let (c1, c2) = op.keys();
        let force = self.oap.motion_force.map_or(Key::NUL, VisualKind::key);
        self.redo.prep(
            self.oap.regname,
            cap.count0,
            &[
                Key::from_char(c1),
                c2.map_or(Key::NUL, Key::from_char),
                force,
                cap.cmdchar,
                cap.nchar,
                cap.extra_char,
            ],
        );
        let line_input = cap.cmd_is('/') || cap.cmd_is('?') || cap.cmd_is(':');
        if line_input && let Some(s) = &cap.searchbuf {
            self.redo.append_str(s);
            self.redo.append_key(Key::NL);
        }
    }

    /// `.` of a Visual operation: select an area the size of the original
    /// one, starting at the cursor.
    fn resize_for_redo(&mut self, text: &dyn TextStore, rv: RedoVisual, cap: &mut CommandArg) {
        self.oap.start = self.cursor;
        let last = text.line_count().saturating_sub(1);
        self.cursor.line = (self.cursor.line + rv.line_count.saturating_sub(1)).min(last);
        self.visual.kind = rv.kind;
        self.visual.mode_before_override = None;
        if rv.vcol == MAXCOL || rv.kind == VisualKind::Char {
            self.curswant = if rv.kind != VisualKind::Char {
                MAXCOL
            } else if rv.line_count <= 1 {
                let line = text.line_text(self.cursor.line);
                (column::vcol_of(&line, self.cursor.byte, self.options.tabstop) + rv.vcol).saturating_sub(1)
            } else {
                rv.vcol
            };
            self.coladvance(text, self.curswant);
        }
        cap.count0 = rv.count;
        cap.count1 = rv.count.max(1);
    }

    /// Remember the selection for `gv` and the `'<` `'>` marks.
    pub(crate) fn save_visual_area(&mut self) {
        let kind = self.visual.mode_before_override.take().unwrap_or(self.visual.kind);
        self.saved_visual = Some(SavedVisual {
            kind,
            start: self.visual.anchor,
            end: self.cursor,
            curswant: self.curswant,
        });
        let (lo, hi) = if self.visual.anchor <= self.cursor {
            (self.visual.anchor, self.cursor)
        } else {
            (self.cursor, self.visual.anchor)
        };
        self.marks.visual_start = Some(lo);
        self.marks.visual_end = Some(hi);
    }

    /// With `'selection'` exclusive the last character is not part of the
    /// selection: step back over it. Returns true when that crossed a line
    /// break, which is then included.
    fn unadjust_for_sel(&mut self, text: &dyn TextStore) -> bool {
        if self.options.selection != Selection::Exclusive || self.visual.anchor == self.cursor {
            return false;
        }
        let later = if self.visual.anchor < self.cursor {
            &mut self.cursor
        } else {
            &mut self.visual.anchor
        };
        if later.byte > 0 {
            let line = text.line_text(later.line);
            later.byte = grapheme::prev_boundary(&line, later.byte.min(line.len()));
            false
        } else if later.line > 0 {
            later.line -= 1;
            later.byte = text.line_len(later.line);
            true
        } else {
            false
        }
    }

    /// Block corners, reselect and redo memory, then leave Visual mode.
    fn close_visual(
        &mut self,
        text: &dyn TextStore,
        op: OperatorKind,
        cap: &CommandArg,
        busy: bool,
        redo_yank: bool,
        include_line_break: bool,
    ) {
        let kind = self.visual.kind;
        let ts = self.options.tabstop;
        if kind == VisualKind::Block {
            let redo_vcol = self.redo_visual.filter(|_| busy).map(|rv| rv.vcol);
            self.block_corners(text, redo_vcol);
        }

        if !busy {
            let vcol = if self.curswant == MAXCOL {
                MAXCOL
            } else {
                let end_line = text.line_text(self.oap.end.line);
                let end_vcol = if kind == VisualKind::Block {
                    self.oap.end_vcol
                } else {
                    column::vcol_range(&end_line, self.oap.end.byte, ts).1
                };
                if kind == VisualKind::Block || self.oap.line_count <= 1 {
                    let start_vcol = if kind == VisualKind::Block {
                        self.oap.start_vcol
                    } else {
                        column::vcol_of(&text.line_text(self.oap.start.line), self.oap.start.byte, ts)
                    };
                    end_vcol.saturating_sub(start_vcol) + 1
                } else {
                    end_vcol
                }
            };
            self.resel = Some(Reselect {
                kind,
                line_count: self.oap.line_count,
                vcol,
            });
        }

        if (redo_yank || op != OperatorKind::Yank) && self.oap.motion_force.is_none() {
            let (c1, c2) = op.keys();
            let nchar = if op == OperatorKind::Replace { cap.nchar } else { Key::NUL };
            self.redo.prep(
                self.oap.regname,
                0,
                &[Key::from_char('v'), Key::from_char(c1), c2.map_or(Key::NUL, Key::from_char), nchar],
            );
            if !busy && let Some(resel) = self.resel {
                self.redo_visual = Some(RedoVisual {
                    kind: resel.kind,
                    line_count: resel.line_count,
                    vcol: resel.vcol,
                    count: cap.count0,
                });
            }
        }

        if self.oap.motion_force.is_none() || self.oap.motion_type == MotionType::Line {
            self.oap.inclusive = true;
        }
        match kind {
            VisualKind::Line => self.oap.motion_type = MotionType::Line,
            VisualKind::Block => self.oap.motion_type = MotionType::Block,
            VisualKind::Char => {
                self.oap.motion_type = MotionType::Char;
                let end_len = text.line_len(self.oap.end.line);
                if self.oap.end.byte >= end_len || include_line_break {
                    // Ending on the NUL selects the line break.
                    self.oap.inclusive = false;
                    if self.options.selection != Selection::Old
                        && !op.on_lines()
                        && self.oap.end.line + 1 < text.line_count()
                    {
                        self.oap.end = Position::new(self.oap.end.line + 1, 0);
                        self.oap.line_count += 1;
                    }
                }
            }
        }
        self.redo_visual_busy = false;
        self.visual.active = false;
        self.visual.select_mode = false;
        self.visual.mode_before_override = None;
    }

    /// Upper-left and lower-right corner of the block, and its columns.
    fn block_corners(&mut self, text: &dyn TextStore, redo_vcol: Option<usize>) {
        let ts = self.options.tabstop;
        self.oap.block_mode = true;
        let start_line = text.line_text(self.oap.start.line);
        let end_line = text.line_text(self.oap.end.line);
        let (mut first, mut last) = column::vcol_range(&start_line, self.oap.start.byte, ts);
        let (e0, e1) = column::vcol_range(&end_line, self.oap.end.byte, ts);
        first = first.min(e0);
        if e1 > last {
            last = if self.options.selection == Selection::Exclusive && e0 >= 1 && e0 - 1 >= last {
                e0 - 1
            } else {
                e1
            };
        }
        if self.curswant == MAXCOL {
            last = (self.oap.start.line..=self.oap.end.line)
                .map(|l| column::line_width(&text.line_text(l), ts))
                .max()
                .unwrap_or(0)
                .saturating_sub(1)
                .max(first);
        } else if let Some(v) = redo_vcol {
            last = (first + v).saturating_sub(1);
        }
        self.oap.start_vcol = first;
        self.oap.end_vcol = last;
        self.oap.end.byte = column::byte_at_vcol(&end_line, last, ts);
        self.oap.start.byte = column::byte_at_vcol(&start_line, first, ts);
        self.cursor = self.oap.start;
    }
}

/// Exclusive end of a characterwise range: one cluster past an inclusive
/// end, but never past the line break.
pub(crate) fn range_end<L: LineAccess + ?Sized>(text: &L, oap: &OperatorPending) -> Position {
    if !oap.inclusive {
        return oap.end;
    }
    let line = text.line_text(oap.end.line);
    if oap.end.byte >= line.len() {
        Position::new(oap.end.line, line.len())
    } else {
        Position::new(oap.end.line, grapheme::next_boundary(&line, oap.end.byte))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn inclusive_end_covers_the_whole_cluster() {
        let lines = vec!["añb".to_string()];
        let oap = OperatorPending {
            end: Position::new(0, 1),
            inclusive: true,
            ..OperatorPending::default()
        };
        assert_eq!(range_end(lines.as_slice(), &oap), Position::new(0, 3));
        let at_nul = OperatorPending {
            end: Position::new(0, 4),
            inclusive: true,
            ..OperatorPending::default()
        };
        assert_eq!(range_end(lines.as_slice(), &at_nul), Position::new(0, 4));
    }
}
