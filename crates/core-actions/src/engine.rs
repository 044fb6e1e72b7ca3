//! The per-context command engine.
//!
//! One [`Engine`] exists per editing context (view). It owns the operator
//! state, the command being assembled, Visual mode, the redo buffer, marks,
//! search state, macro recording and the input queues. Text, registers and
//! host callbacks are lent to it for the duration of each call through an
//! [`EngineContext`].
//!
//! Input queues, read in this order:
//! * `stuff`: keys generated by the engine itself (`x` -> `dl`, `.`).
//! * `typeahead`: keys fed by the host plus executed registers, which are
//!   inserted at the front. Each entry remembers whether the user typed it;
//!   only typed keys are recorded by `q` and inverted by `'rightleft'`.

use std::collections::VecDeque;

use core_config::EngineOptions;
use core_events::Key;
use core_keymap::{CommandIndex, LangMap};
use core_state::{RegisterStore, TextStore};
use core_text::Position;
use core_text::motion::Direction;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::error::{CommandError, ResumeError};
use crate::host::Host;
use crate::marks::Marks;
use crate::redo::RedoBuffer;
use crate::search::SearchState;
use crate::state::{
    CommandArg, OperatorPending, RedoVisual, Reselect, SavedVisual, VisualSelection,
};

/// Everything the engine borrows from its embedder for one call.
pub struct EngineContext<'a> {
    pub text: &'a mut dyn TextStore,
    pub registers: &'a mut dyn RegisterStore,
    pub host: &'a mut dyn Host,
}

/// Result of feeding input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    /// A command is partially typed.
    NeedsMoreInput,
    /// The last command finished.
    Complete,
    /// The last command failed; the bell was rung.
    Aborted(CommandError),
    /// The host must run a sub-mode and then call [`Engine::resume`].
    EnteredSubMode(SubModeRequest),
}

/// Ties a [`Engine::resume`] call to the sub-mode it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResumeToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubModeKind {
    Insert,
    Replace,
    /// `:`
    CommandLine,
    /// `/` or `?`
    Search(Direction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubModeRequest {
    pub kind: SubModeKind,
    pub token: ResumeToken,
    /// Text the command line starts with (`:.,.+2`, `:'<,'>`).
    pub initial_text: String,
}

/// How a sub-mode ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubModeOutcome {
    /// Keys typed in Insert or Replace mode, without the final `<Esc>`.
    Inserted(Vec<Key>),
    /// Command line text; `None` when it was cancelled.
    CommandLine(Option<String>),
    Cancelled,
}

/// Where the key translator is within a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Initial,
    /// Digits of a count.
    Count,
    SecondChar,
    ThirdChar,
    /// `CTRL-\` was read as an argument; waiting to see if `CTRL-N` follows.
    CtrlBackslash,
    /// Waiting for [`Engine::resume`].
    Suspended,
}

/// Last `f`, `F`, `t` or `T`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharSearch {
    pub target: String,
    pub dir: Direction,
    pub till: bool,
}

/// Blockwise Insert repeated on the following lines when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockInsert {
    pub first_line: usize,
    pub last_line: usize,
    pub vcol: usize,
    pub append: bool,
    pub to_eol: bool,
}

/// Insert or Replace mode started by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InsertSession {
    pub replace: bool,
    /// Repeat the typed text this many times.
    pub count: usize,
    /// `o` / `O`: each repetition opens another line.
    pub open_line: Option<Direction>,
    pub block: Option<BlockInsert>,
}

/// Requested by a handler, acted on once the handler returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SubModeStart {
    CommandLine { kind: SubModeKind, initial: String },
    Insert(InsertSession),
}

#[derive(Debug, Clone)]
pub(crate) enum Suspension {
    /// `:`, `/` or `?` is collecting a line; the command continues on resume.
    CommandLine {
        request: SubModeRequest,
        cap: CommandArg,
        keep_register: bool,
        snapshot: Position,
    },
    Insert {
        request: SubModeRequest,
        session: InsertSession,
        /// Cursor when Insert mode started.
        start: Position,
    },
}

impl Suspension {
    pub(crate) fn request(&self) -> &SubModeRequest {
        match self {
            Suspension::CommandLine { request, .. } | Suspension::Insert { request, .. } => request,
        }
    }
}

pub struct Engine {
    pub(crate) options: EngineOptions,
    pub(crate) langmap: LangMap,
    pub(crate) index: &'static CommandIndex,
    pub(crate) cursor: Position,
    /// Column vertical motions try to keep.
    pub(crate) curswant: usize,
    /// Recompute `curswant` from the cursor before the next vertical motion.
    pub(crate) set_curswant: bool,
    pub(crate) phase: Phase,
    pub(crate) cap: CommandArg,
    /// Resolved table entry while more characters are read.
    pub(crate) idx: Option<usize>,
    /// Third character is taken literally (no langmap).
    pub(crate) third_literal: bool,
    pub(crate) oap: OperatorPending,
    /// An operator was pending when the current command started.
    pub(crate) finish_op: bool,
    /// Count typed before an operator, carried to the next command.
    pub(crate) opcount: usize,
    /// Reading the argument of `CTRL-W`.
    pub(crate) ctrl_w: bool,
    /// `curswant` when the command started.
    pub(crate) old_col: usize,
    pub(crate) visual: VisualSelection,
    pub(crate) saved_visual: Option<SavedVisual>,
    pub(crate) resel: Option<Reselect>,
    pub(crate) redo_visual: Option<RedoVisual>,
    pub(crate) redo_visual_busy: bool,
    /// Select mode comes back after this many commands (`CTRL-O` in Select).
    pub(crate) restart_select: u8,
    pub(crate) redo: RedoBuffer,
    pub(crate) marks: Marks,
    pub(crate) search: SearchState,
    pub(crate) char_search: Option<CharSearch>,
    pub(crate) recording: Option<char>,
    pub(crate) record_buf: Vec<Key>,
    pub(crate) last_exec_register: Option<char>,
    pub(crate) stuff: VecDeque<Key>,
    pub(crate) typeahead: VecDeque<(Key, bool)>,
    /// The command character was typed by the user.
    pub(crate) key_typed: bool,
    /// The last key came from the engine's own queue.
    pub(crate) key_stuffed: bool,
    pub(crate) showcmd: SmallVec<[Key; 8]>,
    pub(crate) start_request: Option<SubModeStart>,
    pub(crate) suspended: Option<Suspension>,
    next_token: u64,
    /// Lines moved by `CTRL-D`/`CTRL-U`; zero means half the viewport.
    pub(crate) scroll_amount: usize,
    pub(crate) text_locked: bool,
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        let langmap = match LangMap::parse(&options.langmap) {
            Ok(m) => m,
            Err(e) => {
                warn!(target: "engine.fsm", error = %e, "langmap_invalid_ignored");
                LangMap::default()
            }
        };
        Self {
            options,
            langmap,
            index: CommandIndex::global(),
            cursor: Position::origin(),
            curswant: 0,
            set_curswant: true,
            phase: Phase::Initial,
            cap: CommandArg::default(),
            idx: None,
            third_literal: false,
            oap: OperatorPending::default(),
            finish_op: false,
            opcount: 0,
            ctrl_w: false,
            old_col: 0,
            visual: VisualSelection::default(),
            saved_visual: None,
            resel: None,
            redo_visual: None,
            redo_visual_busy: false,
            restart_select: 0,
            redo: RedoBuffer::new(),
            marks: Marks::new(),
            search: SearchState::default(),
            char_search: None,
            recording: None,
            record_buf: Vec::new(),
            last_exec_register: None,
            stuff: VecDeque::new(),
            typeahead: VecDeque::new(),
            key_typed: false,
            key_stuffed: false,
            showcmd: SmallVec::new(),
            start_request: None,
            suspended: None,
            next_token: 1,
            scroll_amount: 0,
            text_locked: false,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: EngineOptions) {
        if let Ok(m) = LangMap::parse(&options.langmap) {
            self.langmap = m;
        }
        self.options = options;
    }

    /// Feed one key and process everything it makes runnable.
    pub fn feed(&mut self, cx: &mut EngineContext<'_>, key: Key) -> DispatchStatus {
        trace!(target: "engine.fsm", key = %key, phase = ?self.phase, "feed");
        self.typeahead.push_back((key, true));
        self.run(cx)
    }

    /// Feed a key script, as if typed.
    pub fn feed_keys(&mut self, cx: &mut EngineContext<'_>, keys: &[Key]) -> DispatchStatus {
        self.typeahead.extend(keys.iter().map(|&k| (k, true)));
        self.run(cx)
    }

    /// Next queued key for a running sub-mode.
    pub fn pop_stuffed(&mut self) -> Option<Key> {
        self.next_key().map(|(k, _)| k)
    }

    /// Finish a sub-mode started by [`DispatchStatus::EnteredSubMode`].
    pub fn resume(
        &mut self,
        cx: &mut EngineContext<'_>,
        token: ResumeToken,
        outcome: SubModeOutcome,
    ) -> Result<DispatchStatus, ResumeError> {
        let Some(suspension) = self.suspended.take() else {
            return Err(ResumeError::NotSuspended);
        };
        if suspension.request().token != token {
            self.suspended = Some(suspension);
            return Err(ResumeError::StaleToken);
        }
        debug!(target: "engine.fsm", kind = ?suspension.request().kind, "resume");
        let status = match (suspension, outcome) {
            (Suspension::CommandLine { request, cap, keep_register, snapshot }, outcome) => {
                let line = match outcome {
                    SubModeOutcome::CommandLine(line) => line,
                    SubModeOutcome::Cancelled => None,
                    other @ SubModeOutcome::Inserted(_) => {
                        self.suspended = Some(Suspension::CommandLine { request, cap, keep_register, snapshot });
                        debug!(target: "engine.fsm", outcome = ?other, "resume_outcome_mismatch");
                        return Err(ResumeError::OutcomeMismatch);
                    }
                };
                self.phase = Phase::Initial;
                self.finish_command_line(cx, request.kind, cap, keep_register, snapshot, line)
            }
            (Suspension::Insert { request, session, start }, outcome) => {
                let keys = match outcome {
                    SubModeOutcome::Inserted(keys) => keys,
                    SubModeOutcome::Cancelled => Vec::new(),
                    other @ SubModeOutcome::CommandLine(_) => {
                        self.suspended = Some(Suspension::Insert { request, session, start });
                        debug!(target: "engine.fsm", outcome = ?other, "resume_outcome_mismatch");
                        return Err(ResumeError::OutcomeMismatch);
                    }
                };
                self.phase = Phase::Initial;
                self.finish_insert(cx, session, start, &keys)
            }
        };
        if let DispatchStatus::EnteredSubMode(_) = status {
            return Ok(status);
        }
        if self.has_queued_input() {
            return Ok(self.run(cx));
        }
        Ok(status)
    }

    pub fn cursor(&self) -> Position {
        self.cursor
    }

    /// Move the cursor from outside (view switch, host jump).
    pub fn set_cursor(&mut self, pos: Position) {
        self.cursor = pos;
        self.set_curswant = true;
    }

    pub fn visual(&self) -> &VisualSelection {
        &self.visual
    }

    pub fn operator_pending(&self) -> &OperatorPending {
        &self.oap
    }

    /// Register selected with `"x` and not consumed yet.
    pub fn pending_register(&self) -> Option<char> {
        self.oap.regname
    }

    /// Keys of the partially typed command.
    pub fn pending_keys(&self) -> &[Key] {
        &self.showcmd
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.is_some()
    }

    /// Sub-mode the host still has to finish.
    pub fn pending_sub_mode(&self) -> Option<&SubModeRequest> {
        self.suspended.as_ref().map(Suspension::request)
    }

    /// Register being recorded into with `q`.
    pub fn recording(&self) -> Option<char> {
        self.recording
    }

    pub fn mark(&self, name: char) -> Option<Position> {
        self.marks.get(name)
    }

    pub fn redo_keys(&self) -> &[Key] {
        self.redo.keys()
    }

    pub fn last_search(&self) -> Option<&str> {
        self.search.last_pattern.as_deref()
    }

    /// Disable commands flagged as not allowed while text is locked.
    pub fn set_text_locked(&mut self, locked: bool) {
        self.text_locked = locked;
    }

    pub(crate) fn has_queued_input(&self) -> bool {
        !self.stuff.is_empty() || !self.typeahead.is_empty()
    }

    fn run(&mut self, cx: &mut EngineContext<'_>) -> DispatchStatus {
        if let Some(s) = &self.suspended {
            return DispatchStatus::EnteredSubMode(s.request().clone());
        }
        let mut last = if self.phase == Phase::Initial {
            DispatchStatus::Complete
        } else {
            DispatchStatus::NeedsMoreInput
        };
        while self.suspended.is_none() {
            let Some((key, typed)) = self.next_key() else {
                break;
            };
            last = self
                .process_key(cx, key, typed)
                .unwrap_or(DispatchStatus::NeedsMoreInput);
        }
        last
    }

    pub(crate) fn next_key(&mut self) -> Option<(Key, bool)> {
        let (key, typed) = match self.stuff.pop_front() {
            Some(k) => {
                self.key_stuffed = true;
                (k, false)
            }
            None => {
                let entry = self.typeahead.pop_front()?;
                self.key_stuffed = false;
                entry
            }
        };
        if typed && self.recording.is_some() {
            self.record_buf.push(key);
        }
        Some((key, typed))
    }

    pub(crate) fn peek_key(&self) -> Option<Key> {
        self.stuff
            .front()
            .copied()
            .or_else(|| self.typeahead.front().map(|&(k, _)| k))
    }

    /// Put back a key that was read too early.
    pub(crate) fn unget_key(&mut self, key: Key, typed: bool) {
        if typed {
            if self.recording.is_some() {
                self.record_buf.pop();
            }
            self.typeahead.push_front((key, true));
        } else {
            self.stuff.push_front(key);
        }
    }

    pub(crate) fn stuff_keys<I: IntoIterator<Item = Key>>(&mut self, keys: I) {
        self.stuff.extend(keys);
    }

    pub(crate) fn stuff_str(&mut self, s: &str) {
        self.stuff.extend(s.chars().map(Key::from_char));
    }

    /// Keys from an executed register go in front of the pending typeahead.
    pub(crate) fn insert_typeahead_front(&mut self, keys: &[Key]) {
        for &k in keys.iter().rev() {
            self.typeahead.push_front((k, false));
        }
    }

    /// Drop engine-generated input after an error, so a failing macro or
    /// repeat stops.
    pub(crate) fn flush_generated_input(&mut self) {
        self.stuff.clear();
        self.typeahead.retain(|&(_, typed)| typed);
    }

    pub(crate) fn new_token(&mut self) -> ResumeToken {
        let t = ResumeToken(self.next_token);
        self.next_token += 1;
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NullHost;
    use core_events::parse_keys;
    use core_state::{EditorState, Registers};
    use core_text::LineAccess;

    #[test]
    fn resume_without_sub_mode_is_an_error() {
        let mut st = EditorState::from_text("t", "abc").unwrap();
        let mut regs = Registers::new();
        let mut host = NullHost;
        let mut cx = EngineContext { text: &mut st, registers: &mut regs, host: &mut host };
        let mut e = Engine::new(EngineOptions::default());
        let r = e.resume(&mut cx, ResumeToken(7), SubModeOutcome::Cancelled);
        assert_eq!(r, Err(ResumeError::NotSuspended));
    }

    #[test]
    fn stale_token_keeps_engine_suspended() {
        let mut st = EditorState::from_text("t", "abc").unwrap();
        let mut regs = Registers::new();
        let mut host = NullHost;
        let mut cx = EngineContext { text: &mut st, registers: &mut regs, host: &mut host };
        let mut e = Engine::new(EngineOptions::default());
        let status = e.feed_keys(&mut cx, &parse_keys("i").unwrap());
        let DispatchStatus::EnteredSubMode(req) = status else {
            panic!("expected sub-mode, got {status:?}");
        };
        assert_eq!(req.kind, SubModeKind::Insert);
        let wrong = ResumeToken(req.token.0 + 1);
        assert_eq!(
            e.resume(&mut cx, wrong, SubModeOutcome::Cancelled),
            Err(ResumeError::StaleToken)
        );
        assert!(e.is_suspended());
        assert_eq!(
            e.resume(&mut cx, req.token, SubModeOutcome::CommandLine(None)),
            Err(ResumeError::OutcomeMismatch)
        );
        let done = e.resume(&mut cx, req.token, SubModeOutcome::Inserted(parse_keys("xy").unwrap()));
        assert_eq!(done, Ok(DispatchStatus::Complete));
        assert_eq!(st.line_text(0), "xyabc");
    }
}
