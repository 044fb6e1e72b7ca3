//! `u`, `U` and `CTRL-R`. In Visual mode `u` and `U` change case instead.

use core_events::Key;
use tracing::trace;

use crate::engine::{Engine, EngineContext};
use crate::error::CommandError;
use crate::state::CommandArg;

impl Engine {
    pub(super) fn nv_undo(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if self.visual.active {
            return self.visual_case(cx, cap, 'u');
        }
        self.check_clear_opq()?;
        let mut steps = 0;
        for _ in 0..cap.count1 {
            match cx.text.undo(self.cursor) {
                Some(pos) => {
                    self.cursor = pos;
                    steps += 1;
                }
                None => break,
            }
        }
        trace!(target: "engine.undo", requested = cap.count1, steps, "undo");
        if steps == 0 {
            cx.host.message("Already at oldest change");
            cx.host.bell();
        }
        self.set_curswant = true;
        Ok(())
    }

    pub(super) fn nv_undo_line(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if self.visual.active {
            return self.visual_case(cx, cap, 'U');
        }
        self.check_clear_opq()?;
        match cx.text.undo_line(self.cursor) {
            Some(pos) => self.cursor = pos,
            None => cx.host.bell(),
        }
        self.set_curswant = true;
        Ok(())
    }

    pub(super) fn nv_redo(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_opq()?;
        let mut steps = 0;
        for _ in 0..cap.count1 {
            match cx.text.redo(self.cursor) {
                Some(pos) => {
                    self.cursor = pos;
                    steps += 1;
                }
                None => break,
            }
        }
        trace!(target: "engine.undo", requested = cap.count1, steps, "redo");
        if steps == 0 {
            cx.host.message("Already at newest change");
            cx.host.bell();
        }
        self.set_curswant = true;
        Ok(())
    }

    /// Visual `u` / `U` run as `gu` / `gU`.
    fn visual_case(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg, c: char) -> Result<(), CommandError> {
        cap.cmdchar = Key::from_char('g');
        cap.nchar = Key::from_char(c);
        self.nv_operator(cx, cap)
    }
}
