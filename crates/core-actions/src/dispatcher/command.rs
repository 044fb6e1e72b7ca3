//! `.`, `"x`, `q`, `@`, `:` and `CTRL-W`.
//!
//! `:` suspends the engine while the host reads the command line;
//! [`Engine::finish_command_line`] picks the command up again, for `/` and
//! `?` as well.

use core_events::{Key, keys_from_register, keys_to_register};
use core_state::{RegisterContent, RegisterKind, is_valid_register};
use core_text::Position;
use tracing::{debug, info};

use crate::engine::{DispatchStatus, Engine, EngineContext, SubModeKind, SubModeStart};
use crate::error::CommandError;
use crate::host::WindowCommand;
use crate::registers::read_register;
use crate::state::{CommandArg, MotionType};

impl Engine {
    /// `.`: feed the last change again, with a new count if one was typed.
    pub(super) fn nv_dot(&mut self, _cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_opq()?;
        let count = (cap.count0 > 0).then_some(cap.count0);
        let replay = self.redo.replay(count).ok_or(CommandError::NotAllowedInContext)?;
        if replay.visual {
            let shape = self.redo_visual.ok_or(CommandError::NotAllowedInContext)?;
            self.visual.active = true;
            self.visual.select_mode = false;
            self.visual.kind = shape.kind;
            self.visual.anchor = self.cursor;
            self.visual.mode_before_override = None;
            self.redo_visual_busy = true;
        }
        debug!(target: "engine.redo", keys = %core_events::format_keys(&replay.keys), visual = replay.visual, "dot_repeat");
        self.stuff_keys(replay.keys);
        Ok(())
    }

    /// `"x`: use register `x` for the next delete, yank or put. The count
    /// typed before it carries over.
    pub(super) fn nv_regname(&mut self, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_op()?;
        let c = cap.nchar.as_char().ok_or(CommandError::UnknownCommand(cap.nchar))?;
        if c == '=' || !is_valid_register(c, false) {
            return Err(CommandError::InvalidRegister(c));
        }
        self.oap.regname = Some(c);
        cap.opcount = cap.count0;
        Ok(())
    }

    /// `q{reg}` starts recording typed keys, `q` stops.
    pub(super) fn nv_record(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        if let Some(reg) = self.recording.take() {
            // The `q` that stopped the recording was recorded too.
            self.record_buf.pop();
            let keys = std::mem::take(&mut self.record_buf);
            let text = keys_to_register(&keys);
            cx.registers.set_register(reg, RegisterContent::charwise(&text))?;
            info!(target: "engine.macro", register = %reg, keys = keys.len(), "recording_stopped");
            return Ok(());
        }
        self.check_clear_op()?;
        let reg = cap.nchar.as_char().ok_or(CommandError::UnknownCommand(cap.nchar))?;
        if !(reg.is_ascii_alphanumeric() || reg == '"') {
            return Err(CommandError::InvalidRegister(reg));
        }
        self.record_buf.clear();
        self.recording = Some(reg);
        info!(target: "engine.macro", register = %reg, "recording_started");
        Ok(())
    }

    /// `@{reg}`: run a register as keys, `count` times. `@@` repeats the
    /// last one, `@:` the last command line.
    pub(super) fn nv_at(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_op()?;
        let mut reg = cap.nchar.as_char().ok_or(CommandError::UnknownCommand(cap.nchar))?;
        if reg == '@' {
            reg = self.last_exec_register.ok_or(CommandError::NoPreviousRegister)?;
        }
        let keys = if reg == ':' {
            let line = cx
                .registers
                .get_register(':')
                .filter(|c| !c.is_empty())
                .ok_or(CommandError::EmptyRegister(':'))?;
            let mut keys = vec![Key::from_char(':')];
            keys.extend(keys_from_register(&line.text()));
            keys.push(Key::CR);
            keys
        } else {
            let content = read_register(&*cx.registers, Some(reg))?;
            let mut keys = Vec::new();
            for (i, line) in content.lines.iter().enumerate() {
                keys.extend(keys_from_register(line));
                if content.kind == RegisterKind::Line || i + 1 < content.lines.len() {
                    keys.push(Key::NL);
                }
            }
            keys
        };
        let mut all = Vec::with_capacity(keys.len() * cap.count1);
        for _ in 0..cap.count1 {
            all.extend_from_slice(&keys);
        }
        debug!(target: "engine.macro", register = %reg, count = cap.count1, keys = all.len(), "execute_register");
        self.insert_typeahead_front(&all);
        self.last_exec_register = Some(reg);
        Ok(())
    }

    /// `:`. A count becomes a line range; in Visual mode the range is the
    /// selection. After an operator the command is an exclusive motion.
    pub(super) fn nv_colon(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let mut initial = String::new();
        if self.visual.active {
            self.end_visual_mode(cx);
            initial.push_str("'<,'>");
        } else if self.oap.op.is_some() {
            self.oap.motion_type = MotionType::Char;
            self.oap.inclusive = false;
        } else if cap.count0 > 0 {
            initial.push('.');
            if cap.count0 > 1 {
                initial.push_str(&format!(",.+{}", cap.count0 - 1));
            }
        }
        self.start_request = Some(SubModeStart::CommandLine {
            kind: SubModeKind::CommandLine,
            initial,
        });
        Ok(())
    }

    /// The host finished reading a `:`, `/` or `?` line; `None` means it was
    /// cancelled.
    pub(crate) fn finish_command_line(
        &mut self,
        cx: &mut EngineContext<'_>,
        kind: SubModeKind,
        mut cap: CommandArg,
        keep_register: bool,
        snapshot: Position,
        line: Option<String>,
    ) -> DispatchStatus {
        let Some(line) = line.filter(|l| kind != SubModeKind::CommandLine || !l.is_empty()) else {
            debug!(target: "engine.fsm", ?kind, "command_line_cancelled");
            self.cursor = snapshot;
            self.clearop();
            return self.normal_end(cx, cap);
        };
        match kind {
            SubModeKind::Search(dir) => {
                if let Err(e) = self.search_entered(cx, &mut cap, dir, &line) {
                    return self.abort_with(cx, cap, e);
                }
            }
            _ => {
                cap.searchbuf = Some(line.clone());
                if let Err(e) = cx.registers.set_read_only(':', RegisterContent::charwise(&line)) {
                    return self.abort_with(cx, cap, e.into());
                }
                let line_count = cx.text.line_count();
                match cx.host.run_command_line(&line, self.cursor, line_count) {
                    Ok(Some(pos)) => {
                        self.setpcmark();
                        self.cursor = pos;
                        self.set_curswant = true;
                    }
                    Ok(None) => {}
                    Err(msg) => {
                        debug!(target: "engine.fsm", line = %line, error = %msg, "command_line_failed");
                        cx.host.message(&msg);
                        cx.host.bell();
                        self.clearop();
                        self.flush_generated_input();
                        return self.normal_end(cx, cap);
                    }
                }
            }
        }
        self.finish_command(cx, cap, keep_register)
    }

    /// `CTRL-W {char}`: window commands belong to the host.
    pub(super) fn nv_window(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_op()?;
        let cmd = WindowCommand {
            key: cap.nchar,
            count: cap.count0,
        };
        if !cx.host.window_command(cmd) {
            return Err(CommandError::UnknownCommand(cap.nchar));
        }
        Ok(())
    }
}
