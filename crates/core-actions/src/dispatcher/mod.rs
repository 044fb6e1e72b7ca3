//! Dispatcher: runs the handler a command resolved to.
//!
//! Handlers are grouped by concern:
//! * `motion`   - cursor movement, the `g` and `z` prefixes
//! * `search`   - `/`, `?`, `n`, `N`, `*`, `#` and definition lookup
//! * `operator` - starting operators and the doubled (linewise) form
//! * `edit`     - simple changes: `x`, `r`, `~`, `J`, Insert entry, `CTRL-A`
//! * `put`      - `p`, `P`, `gp`, `gP`, also over a Visual selection
//! * `mode`     - Visual and Select mode, `<Esc>`
//! * `command`  - `.`, registers, macros, `:` and other commands
//! * `undo`     - `u`, `U`, `CTRL-R`
//!
//! A handler either moves the cursor (leaving a pending operator to act on
//! the motion afterwards), changes text, or requests a sub-mode. Failing
//! handlers return an error; the caller rings the bell and drops the
//! operator.

use core_config::Selection;
use core_events::Key;
use core_keymap::{Handler, arg};
use core_state::TextStore;
use core_text::motion::{first_nonblank, inc};
use core_text::{column, grapheme};
use tracing::debug;

use crate::engine::{Engine, EngineContext};
use crate::error::CommandError;
use crate::state::{CommandArg, MAXCOL};

mod command;
mod edit;
mod mode;
mod motion;
mod operator;
mod put;
mod search;
mod undo;

impl Engine {
    pub(crate) fn run_handler(
        &mut self,
        cx: &mut EngineContext<'_>,
        cap: &mut CommandArg,
        handler: Handler,
    ) -> Result<(), CommandError> {
        if self.doubles_pending_operator(cap) {
            return self.nv_lineop(cx, cap);
        }
        match handler {
            Handler::Error => Err(CommandError::UnknownCommand(cap.cmdchar)),
            Handler::Ignore | Handler::Nop => Ok(()),
            Handler::Esc => self.nv_esc(cx, cap),
            Handler::Normal => self.nv_normal(cx, cap),
            Handler::Left => self.nv_left(cx, cap),
            Handler::Right => self.nv_right(cx, cap),
            Handler::Up => self.nv_up(cx, cap),
            Handler::Down => self.nv_down(cx, cap),
            Handler::CtrlH => self.nv_ctrlh(cx, cap),
            Handler::Dollar => self.nv_dollar(cx, cap),
            Handler::Home => self.nv_home(cx, cap),
            Handler::End => self.nv_end(cx, cap),
            Handler::BeginLine => self.nv_beginline(cx, cap),
            Handler::Pipe => self.nv_pipe(cx, cap),
            Handler::Goto => self.nv_goto(cx, cap),
            Handler::Percent => self.nv_percent(cx, cap),
            Handler::FindParagraph => self.nv_findpar(cx, cap),
            Handler::WordForward => self.nv_wordcmd(cx, cap),
            Handler::WordBackward => self.nv_bck_word(cx, cap),
            Handler::CharSearch => self.nv_csearch(cx, cap),
            Handler::GoMark => self.nv_gomark(cx, cap),
            Handler::SetMark => self.nv_mark(cap),
            Handler::Search => self.nv_search(cx, cap),
            Handler::SearchNext => self.nv_next(cx, cap),
            Handler::Ident => self.nv_ident(cx, cap),
            Handler::ScreenRow => self.nv_scroll(cx, cap),
            Handler::ScrollLine => self.nv_scroll_line(cx, cap),
            Handler::Page => self.nv_page(cx, cap),
            Handler::HalfPage => self.nv_halfpage(cx, cap),
            Handler::Zet => self.nv_zet(cx, cap),
            Handler::Operator => self.nv_operator(cx, cap),
            Handler::LineOperator => self.nv_lineop(cx, cap),
            Handler::Abbreviation => self.nv_abbrev(cx, cap),
            Handler::Replace => self.nv_replace(cx, cap),
            Handler::Tilde => self.nv_tilde(cx, cap),
            Handler::Join => self.nv_join(cx, cap),
            Handler::Put => self.nv_put(cx, cap),
            Handler::Edit => self.nv_edit(cx, cap),
            Handler::Open => self.nv_open(cx, cap),
            Handler::ReplaceMode => self.nv_replace_mode(cx, cap),
            Handler::Undo => self.nv_undo(cx, cap),
            Handler::UndoLine => self.nv_undo_line(cx, cap),
            Handler::Redo => self.nv_redo(cx, cap),
            Handler::Dot => self.nv_dot(cx, cap),
            Handler::RegisterName => self.nv_regname(cap),
            Handler::Record => self.nv_record(cx, cap),
            Handler::Execute => self.nv_at(cx, cap),
            Handler::Colon => self.nv_colon(cx, cap),
            Handler::Visual => self.nv_visual(cx, cap),
            Handler::Window => self.nv_window(cx, cap),
            Handler::GPrefix => self.nv_g_cmd(cx, cap),
            Handler::AddSub => self.nv_addsub(cx, cap),
            Handler::Redraw => {
                self.check_clear_op()?;
                cx.host.redraw(true);
                Ok(())
            }
            Handler::FileInfo => self.nv_ctrlg(cx, cap),
            Handler::GotoDefinition => self.nv_ctrl_bracket(cx, cap),
            Handler::JumpList => self.nv_jumplist(cx, cap),
        }
    }

    /// `dd`, `>>`, `gUU`, `gqq`: the key that completes a pending operator
    /// repeats it, and the operator then works on whole lines.
    fn doubles_pending_operator(&self, cap: &CommandArg) -> bool {
        let Some(op) = self.oap.op else {
            return false;
        };
        if self.visual.active || cap.cmd_is('g') {
            return false;
        }
        let (c1, c2) = op.keys();
        cap.cmdchar == Key::from_char(c2.unwrap_or(c1))
    }

    /// Fails when an operator is pending.
    pub(crate) fn check_clear_op(&self) -> Result<(), CommandError> {
        if self.oap.op.is_some() {
            return Err(CommandError::NotAllowedInContext);
        }
        Ok(())
    }

    /// Fails when an operator is pending or Visual mode is active.
    pub(crate) fn check_clear_opq(&self) -> Result<(), CommandError> {
        if self.oap.op.is_some() || self.visual.active {
            return Err(CommandError::NotAllowedInContext);
        }
        Ok(())
    }

    pub(crate) fn setpcmark(&mut self) {
        self.marks.set_pcmark(self.cursor);
    }

    /// The cursor may sit on the NUL past the last character.
    pub(crate) fn past_line_allowed(&self) -> bool {
        self.visual.active && self.options.selection != Selection::Old
    }

    pub(crate) fn update_curswant(&mut self, text: &dyn TextStore) {
        if self.set_curswant {
            let line = text.line_text(self.cursor.line);
            self.curswant = column::vcol_of(&line, self.cursor.byte, self.options.tabstop);
            self.set_curswant = false;
        }
    }

    /// Move to virtual column `want` on the cursor line. [`MAXCOL`] means
    /// the end of the line.
    pub(crate) fn coladvance(&mut self, text: &dyn TextStore, want: usize) {
        let line = text.line_text(self.cursor.line);
        let past_end = self.past_line_allowed();
        self.cursor.byte = if want == MAXCOL {
            if past_end { line.len() } else { grapheme::last_start(&line) }
        } else {
            let b = column::byte_at_vcol(&line, want, self.options.tabstop);
            if b >= line.len() && !past_end {
                grapheme::last_start(&line)
            } else {
                b
            }
        };
    }

    pub(crate) fn cursor_up(&mut self, text: &dyn TextStore, n: usize) -> Result<(), CommandError> {
        self.update_curswant(text);
        if n > 0 {
            let line = self.cursor.line;
            if line == 0 || (n > line && self.options.cpo('-')) {
                return Err(CommandError::OutOfRangeMotion);
            }
            self.cursor.line = line.saturating_sub(n);
        }
        self.coladvance(text, self.curswant);
        Ok(())
    }

    pub(crate) fn cursor_down(&mut self, text: &dyn TextStore, n: usize) -> Result<(), CommandError> {
        self.update_curswant(text);
        if n > 0 {
            let last = text.line_count().saturating_sub(1);
            let line = self.cursor.line;
            if line >= last || (n > last - line && self.options.cpo('-')) {
                return Err(CommandError::OutOfRangeMotion);
            }
            self.cursor.line = line.saturating_add(n).min(last);
        }
        self.coladvance(text, self.curswant);
        Ok(())
    }

    /// Cursor to the start of the line, or its first non-blank, per the
    /// `BL_*` flags.
    pub(crate) fn beginline(&mut self, text: &dyn TextStore, flags: i64) {
        if flags & arg::BL_SOL != 0 && !self.options.startofline {
            self.coladvance(text, self.curswant);
            return;
        }
        let line = text.line_text(self.cursor.line);
        self.cursor.byte = if flags & (arg::BL_WHITE | arg::BL_SOL) != 0 {
            first_nonblank(&line, flags & arg::BL_FIX != 0)
        } else {
            0
        };
        self.set_curswant = true;
    }

    /// A word motion that ended on the NUL steps back onto the last
    /// character and becomes inclusive.
    pub(crate) fn adjust_cursor(&mut self, text: &dyn TextStore) {
        let line = text.line_text(self.cursor.line);
        if self.cursor.byte > 0
            && self.cursor.byte >= line.len()
            && (!self.visual.active || self.options.selection == Selection::Old)
        {
            self.cursor.byte = grapheme::prev_boundary(&line, line.len());
            self.oap.inclusive = true;
        }
    }

    /// With `'selection'` exclusive an inclusive motion in Visual mode
    /// moves one further.
    pub(crate) fn adjust_for_sel(&mut self, text: &dyn TextStore) {
        if self.visual.active
            && self.oap.inclusive
            && self.options.selection == Selection::Exclusive
            && self.visual.anchor < self.cursor
        {
            let line = text.line_text(self.cursor.line);
            if self.cursor.byte < line.len() {
                inc(text, &mut self.cursor);
                self.oap.inclusive = false;
            }
        }
    }

    /// Keep the cursor on a character: within the buffer, on a cluster
    /// boundary, and off the NUL unless Visual mode allows it.
    pub(crate) fn adjust_cursor_for_normal(&mut self, cx: &mut EngineContext<'_>) {
        let text = &*cx.text;
        let count = text.line_count();
        if self.cursor.line >= count {
            self.cursor.line = count.saturating_sub(1);
        }
        let line = text.line_text(self.cursor.line);
        let mut b = grapheme::floor_boundary(&line, self.cursor.byte.min(line.len()));
        if b >= line.len() && !line.is_empty() && self.oap.op.is_none() && !self.past_line_allowed() {
            b = grapheme::last_start(&line);
        }
        if b != self.cursor.byte {
            debug!(target: "engine.fsm", from = self.cursor.byte, to = b, "cursor_adjusted");
        }
        self.cursor.byte = b;
    }

    /// "3 fewer lines" and friends, above the `'report'` threshold.
    pub(crate) fn report_lines(&self, cx: &mut EngineContext<'_>, n: usize, what: &str) {
        if n > self.options.report {
            cx.host.message(&format!("{n} {what}"));
        }
    }

    /// Only blanks precede the cursor on its line.
    pub(crate) fn in_indent(&self, text: &dyn TextStore) -> bool {
        let line = text.line_text(self.cursor.line);
        let upto = self.cursor.byte.min(line.len());
        line[..upto].chars().all(|c| c == ' ' || c == '\t')
    }
}
