//! Starting an operator, and the linewise form (`dd`, `cc`, `_`).

use core_keymap::arg;
use tracing::trace;

use crate::engine::{Engine, EngineContext};
use crate::error::CommandError;
use crate::state::{CommandArg, MotionType, OperatorKind, VisualKind};

impl Engine {
    /// An operator key. Typed again while the same operator is pending it
    /// works on lines instead.
    pub(super) fn nv_operator(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let op = OperatorKind::from_keys(cap.cmdchar, cap.nchar).ok_or(CommandError::UnknownCommand(cap.cmdchar))?;
        if self.oap.op == Some(op) {
            return self.nv_lineop(cx, cap);
        }
        self.check_clear_op()?;
        trace!(target: "engine.operator", ?op, "operator_pending");
        self.oap.start = self.cursor;
        self.oap.cursor_start = self.cursor;
        self.oap.op = Some(op);
        Ok(())
    }

    /// `_`, and a doubled operator: `count - 1` lines down, linewise.
    pub(super) fn nv_lineop(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let text = &*cx.text;
        self.oap.motion_type = MotionType::Line;
        self.cursor_down(text, cap.count1 - 1)?;
        let forced_char = matches!(self.oap.motion_force, Some(VisualKind::Char | VisualKind::Block));
        match self.oap.op {
            Some(OperatorKind::Delete) if !forced_char => self.beginline(text, arg::BL_SOL | arg::BL_FIX),
            Some(OperatorKind::ShiftLeft | OperatorKind::ShiftRight) => {
                self.beginline(text, arg::BL_SOL | arg::BL_FIX)
            }
            Some(OperatorKind::Yank) => {}
            _ => self.beginline(text, arg::BL_WHITE | arg::BL_FIX),
        }
        Ok(())
    }
}
