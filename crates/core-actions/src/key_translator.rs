//! Key translator: turns raw keys into a complete command.
//!
//! Phases of one command:
//! * Count: digits `1`-`9` start a count; `0` and `<Del>` only continue
//!   one. `CTRL-W` without a pending operator moves the count aside and reads
//!   another one for the window command.
//! * First char: counts are multiplied with the count typed before the
//!   operator, the command is looked up, and `'keymodel'`, `'rightleft'` and
//!   Select mode may rewrite it.
//! * Second / third char: argument characters (`f{c}`, `g?`, `gr{c}`).
//!   Text arguments skip `'langmap'` and may pick up composing characters
//!   that are already queued.
//! * Execute: the handler runs, then any pending operator is applied.
//!
//! Counts are clamped to 999999999.

use core_config::KeyModel;
use core_events::Key;
use core_keymap::CommandFlags;
use core_text::grapheme;
use tracing::debug;

use crate::engine::{
    DispatchStatus, Engine, EngineContext, Phase, SubModeRequest, SubModeStart, Suspension,
};
use crate::error::CommandError;
use crate::state::{COUNT_MAX, CommandArg, CommandResult};

impl Engine {
    /// Returns `None` while the command still needs keys.
    pub(crate) fn process_key(
        &mut self,
        cx: &mut EngineContext<'_>,
        key: Key,
        typed: bool,
    ) -> Option<DispatchStatus> {
        match self.phase {
            Phase::Initial => self.start_command(cx, key, typed),
            Phase::Count => {
                let key = self.langmap.adjust(key);
                self.showcmd.push(key);
                self.count_step(cx, key)
            }
            Phase::SecondChar => self.second_char(cx, key),
            Phase::ThirdChar => self.third_char(cx, key),
            Phase::CtrlBackslash => self.ctrl_backslash(cx, key, typed),
            Phase::Suspended => {
                self.unget_key(key, typed);
                None
            }
        }
    }

    fn start_command(&mut self, cx: &mut EngineContext<'_>, key: Key, typed: bool) -> Option<DispatchStatus> {
        if typed {
            cx.text.sync_undo();
        }
        self.cap = CommandArg {
            opcount: self.opcount,
            ..CommandArg::default()
        };
        self.finish_op = self.oap.op.is_some();
        if !self.finish_op && self.oap.regname.is_none() {
            self.cap.opcount = 0;
        }
        if self.oap.prev_opcount > 0 || self.oap.prev_count0 > 0 {
            self.cap.opcount = self.oap.prev_opcount;
            self.cap.count0 = self.oap.prev_count0;
            self.oap.prev_opcount = 0;
            self.oap.prev_count0 = 0;
        }
        self.old_col = self.curswant;
        self.ctrl_w = false;
        self.key_typed = typed;
        if !self.finish_op && self.oap.regname.is_none() {
            self.showcmd.clear();
        }

        let select = self.visual.active && self.visual.select_mode;
        let mut key = if select { key } else { self.langmap.adjust(key) };
        if select && (key.is_printable() || key == Key::NL || key == Key::CR) {
            // Typed text replaces the selection and is then inserted.
            self.unget_key(key, typed);
            key = Key::from_char('c');
        }
        self.showcmd.push(key);
        if select {
            return self.first_char(cx, key);
        }
        self.count_step(cx, key)
    }

    fn count_step(&mut self, cx: &mut EngineContext<'_>, key: Key) -> Option<DispatchStatus> {
        let digit = key.digit();
        let counting = matches!(digit, Some(1..=9))
            || (self.cap.count0 != 0 && (key == Key::DEL || digit == Some(0)));
        if counting {
            let c = &mut self.cap;
            if key == Key::DEL {
                c.count0 /= 10;
                self.showcmd.pop();
                self.showcmd.pop();
            } else if c.count0 > COUNT_MAX / 10 {
                c.count0 = COUNT_MAX;
            } else {
                c.count0 = c.count0 * 10 + digit.unwrap_or(0) as usize;
            }
            self.phase = Phase::Count;
            return None;
        }
        if key == Key::ctrl('w') && !self.ctrl_w && self.oap.op.is_none() {
            self.ctrl_w = true;
            self.cap.opcount = self.cap.count0;
            self.cap.count0 = 0;
            self.phase = Phase::Count;
            return None;
        }
        self.first_char(cx, key)
    }

    fn first_char(&mut self, cx: &mut EngineContext<'_>, key: Key) -> Option<DispatchStatus> {
        if key == Key::IGNORE {
            self.oap.prev_opcount = self.cap.opcount;
            self.oap.prev_count0 = self.cap.count0;
        } else if self.cap.opcount != 0 {
            self.cap.count0 = if self.cap.count0 != 0 {
                self.cap.count0.saturating_mul(self.cap.opcount).min(COUNT_MAX)
            } else {
                self.cap.opcount
            };
        }
        self.cap.opcount = self.cap.count0;
        self.cap.count1 = self.cap.count0.max(1);
        if self.ctrl_w {
            self.cap.nchar = key;
            self.cap.cmdchar = Key::ctrl('w');
        } else {
            self.cap.cmdchar = key;
        }

        let Some(mut idx) = self.index.find(self.cap.cmdchar) else {
            return Some(self.abort(cx, CommandError::UnknownCommand(self.cap.cmdchar)));
        };
        let mut flags = self.flags_of(idx);
        if flags.contains(CommandFlags::NOT_IN_CMDWIN) && self.text_locked {
            return Some(self.abort(cx, CommandError::NotAllowedInContext));
        }

        let startsel = self.options.keymodel_has(KeyModel::StartSel);
        if !self.visual.active && startsel && flags.contains(CommandFlags::START_SELECTION) {
            self.start_selection(cx);
            match self.unshift_command() {
                Some(i) => idx = i,
                None => return Some(self.abort(cx, CommandError::UnknownCommand(self.cap.cmdchar))),
            }
        } else if self.visual.active {
            if self.options.keymodel_has(KeyModel::StopSel) && flags.contains(CommandFlags::STOP_SELECTION) {
                self.end_visual_mode(cx);
            }
            if startsel && flags.contains(CommandFlags::START_SELECTION) {
                match self.unshift_command() {
                    Some(i) => idx = i,
                    None => return Some(self.abort(cx, CommandError::UnknownCommand(self.cap.cmdchar))),
                }
            }
        }
        flags = self.flags_of(idx);

        if self.options.rightleft
            && self.key_typed
            && !self.key_stuffed
            && flags.contains(CommandFlags::RIGHT_LEFT)
            && let Some(mirrored) = mirror_horizontal(self.cap.cmdchar)
        {
            self.cap.cmdchar = mirrored;
            if let Some(i) = self.index.find(mirrored) {
                idx = i;
                flags = self.flags_of(idx);
            }
        }
        self.idx = Some(idx);

        if self.needs_more_chars(flags) {
            self.phase = Phase::SecondChar;
            return None;
        }
        Some(self.after_chars(cx))
    }

    fn flags_of(&self, idx: usize) -> CommandFlags {
        self.index
            .get(idx)
            .map_or(CommandFlags::empty(), |d| d.flags)
    }

    fn unshift_command(&mut self) -> Option<usize> {
        self.cap.cmdchar = self.cap.cmdchar.unshifted();
        self.index.find(self.cap.cmdchar)
    }

    fn needs_more_chars(&self, flags: CommandFlags) -> bool {
        let no_op = self.oap.op.is_none();
        let executing = !self.key_typed && !self.key_stuffed;
        let c = &self.cap;
        flags.contains(CommandFlags::SECOND_CHAR)
            && ((flags.contains(CommandFlags::SECOND_CHAR_NO_OP) && no_op)
                || flags.contains(CommandFlags::SECOND_CHAR_ALWAYS)
                || (c.cmd_is('q') && no_op && self.recording.is_none() && !executing)
                || ((c.cmd_is('a') || c.cmd_is('i')) && (!no_op || self.visual.active)))
    }

    fn second_char(&mut self, cx: &mut EngineContext<'_>, key: Key) -> Option<DispatchStatus> {
        self.showcmd.push(key);
        let flags = self.idx.map_or(CommandFlags::empty(), |i| self.flags_of(i));
        if self.cap.cmd_is('g') {
            let key = self.langmap.adjust(key);
            self.cap.nchar = key;
            let wants_third = key == Key::ctrl('\\')
                || key.as_char().is_some_and(|c| matches!(c, 'r' | '\'' | '`'));
            if wants_third {
                self.third_literal = !self.cap.nchar_is('r');
                self.phase = Phase::ThirdChar;
                return None;
            }
            return Some(self.after_chars(cx));
        }
        let lang = self.cap.cmd_is('r') || flags.contains(CommandFlags::LANG);
        let key = if lang { key } else { self.langmap.adjust(key) };
        self.cap.nchar = key;
        if key == Key::ctrl('\\') {
            self.phase = Phase::CtrlBackslash;
            return None;
        }
        if lang {
            self.take_composing();
        }
        Some(self.after_chars(cx))
    }

    fn third_char(&mut self, cx: &mut EngineContext<'_>, key: Key) -> Option<DispatchStatus> {
        self.showcmd.push(key);
        let key = if self.third_literal { self.langmap.adjust(key) } else { key };
        self.cap.extra_char = key;
        if key == Key::ctrl('\\') {
            self.phase = Phase::CtrlBackslash;
            return None;
        }
        Some(self.after_chars(cx))
    }

    /// `CTRL-\ CTRL-N` and `CTRL-\ CTRL-G` end any command; other keys are
    /// put back and the `CTRL-\` stays the argument.
    fn ctrl_backslash(&mut self, cx: &mut EngineContext<'_>, key: Key, typed: bool) -> Option<DispatchStatus> {
        if key == Key::ctrl('n') || key == Key::ctrl('g') {
            self.cap.cmdchar = Key::ctrl('\\');
            self.cap.nchar = key;
            self.idx = self.index.find(self.cap.cmdchar);
        } else {
            self.unget_key(key, typed);
        }
        Some(self.after_chars(cx))
    }

    /// Composing characters following a text argument, only if already queued.
    fn take_composing(&mut self) {
        for slot in 0..2 {
            let Some(c) = self
                .peek_key()
                .and_then(Key::as_char)
                .filter(|&c| grapheme::is_composing(c))
            else {
                break;
            };
            self.next_key();
            if slot == 0 {
                self.cap.nchar_c1 = Some(c);
            } else {
                self.cap.nchar_c2 = Some(c);
            }
        }
    }

    fn after_chars(&mut self, cx: &mut EngineContext<'_>) -> DispatchStatus {
        self.phase = Phase::Initial;
        if self.cap.nchar == Key::ESC || self.cap.extra_char == Key::ESC {
            debug!(target: "engine.fsm", cmd = %self.cap.cmdchar, "escape_argument");
            self.clearop();
            let cap = std::mem::take(&mut self.cap);
            return self.normal_end(cx, cap);
        }
        self.execute(cx)
    }

    fn execute(&mut self, cx: &mut EngineContext<'_>) -> DispatchStatus {
        let Some(desc) = self.idx.and_then(|i| self.index.get(i)).copied() else {
            return self.abort(cx, CommandError::UnknownCommand(self.cap.cmdchar));
        };
        let mut cap = std::mem::take(&mut self.cap);
        cap.arg = desc.static_arg;
        debug!(
            target: "engine.fsm",
            cmd = %cap.cmdchar,
            nchar = %cap.nchar,
            count0 = cap.count0,
            opcount = cap.opcount,
            handler = ?desc.handler,
            "execute"
        );
        if let Err(e) = self.run_handler(cx, &mut cap, desc.handler) {
            return self.abort_with(cx, cap, e);
        }
        let keep_register = desc.flags.contains(CommandFlags::KEEP_REGISTER);
        if let Some(SubModeStart::CommandLine { kind, initial }) = self.take_command_line_request() {
            let request = SubModeRequest {
                kind,
                token: self.new_token(),
                initial_text: initial,
            };
            debug!(target: "engine.fsm", kind = ?kind, "suspend_command_line");
            self.suspended = Some(Suspension::CommandLine {
                request: request.clone(),
                cap,
                keep_register,
                snapshot: self.cursor,
            });
            self.phase = Phase::Suspended;
            return DispatchStatus::EnteredSubMode(request);
        }
        self.finish_command(cx, cap, keep_register)
    }

    fn take_command_line_request(&mut self) -> Option<SubModeStart> {
        match self.start_request {
            Some(SubModeStart::CommandLine { .. }) => self.start_request.take(),
            _ => None,
        }
    }

    /// Everything after the handler: register reset, the pending operator
    /// and the end-of-command bookkeeping.
    pub(crate) fn finish_command(
        &mut self,
        cx: &mut EngineContext<'_>,
        mut cap: CommandArg,
        keep_register: bool,
    ) -> DispatchStatus {
        if !self.finish_op && self.oap.op.is_none() && !keep_register {
            self.clearop();
        }
        if cap.cmdchar != Key::IGNORE
            && let Err(e) = self.do_pending_operator(cx, &mut cap)
        {
            return self.abort_with(cx, cap, e);
        }
        self.normal_end(cx, cap)
    }

    pub(crate) fn normal_end(&mut self, cx: &mut EngineContext<'_>, cap: CommandArg) -> DispatchStatus {
        self.phase = Phase::Initial;
        self.idx = None;
        if self.oap.op.is_none() && self.oap.regname.is_none() {
            self.showcmd.clear();
        }
        if self.oap.op.is_none()
            && self.restart_select == 1
            && !cap.retval.contains(CommandResult::COMMAND_BUSY)
            && self.stuff.is_empty()
            && self.oap.regname.is_none()
        {
            if self.visual.active {
                self.visual.select_mode = true;
            }
            self.restart_select = 0;
        }
        if self.restart_select == 2 {
            self.restart_select = 1;
        }
        self.opcount = cap.opcount;
        self.ctrl_w = false;
        match self.start_request.take() {
            Some(SubModeStart::Insert(session)) => self.enter_insert(session),
            _ => {
                self.adjust_cursor_for_normal(cx);
                DispatchStatus::Complete
            }
        }
    }

    pub(crate) fn clearop(&mut self) {
        self.oap.clear();
    }

    pub(crate) fn abort(&mut self, cx: &mut EngineContext<'_>, err: CommandError) -> DispatchStatus {
        let cap = std::mem::take(&mut self.cap);
        self.abort_with(cx, cap, err)
    }

    /// Drop the command, ring the bell and stop any macro or repeat.
    pub(crate) fn abort_with(&mut self, cx: &mut EngineContext<'_>, cap: CommandArg, err: CommandError) -> DispatchStatus {
        debug!(target: "engine.fsm", cmd = %cap.cmdchar, error = %err, "command_aborted");
        self.clearop();
        self.flush_generated_input();
        self.start_request = None;
        if !err.is_silent() {
            cx.host.message(&err.to_string());
        }
        cx.host.bell();
        self.normal_end(cx, cap);
        DispatchStatus::Aborted(err)
    }
}

/// `'rightleft'` swaps horizontal commands typed by the user.
fn mirror_horizontal(key: Key) -> Option<Key> {
    let pairs = [
        (Key::from_char('h'), Key::from_char('l')),
        (Key::LEFT, Key::RIGHT),
        (Key::S_LEFT, Key::S_RIGHT),
        (Key::C_LEFT, Key::C_RIGHT),
        (Key::from_char('<'), Key::from_char('>')),
    ];
    pairs.iter().find_map(|&(a, b)| {
        if key == a {
            Some(b)
        } else if key == b {
            Some(a)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrored_pairs() {
        assert_eq!(mirror_horizontal(Key::from_char('l')), Some(Key::from_char('h')));
        assert_eq!(mirror_horizontal(Key::C_LEFT), Some(Key::C_RIGHT));
        assert_eq!(mirror_horizontal(Key::from_char('>')), Some(Key::from_char('<')));
        assert_eq!(mirror_horizontal(Key::from_char('w')), None);
    }
}
