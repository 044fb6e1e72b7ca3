//! Per-command and per-operator state.
//!
//! * [`CommandArg`] (`cap`) is rebuilt for every top-level command.
//! * [`OperatorPending`] (`oap`) lives across commands while an operator
//!   waits for its motion, and carries a register selected with `"x` into the
//!   next command.
//! * [`VisualSelection`] plus the remembered shapes ([`SavedVisual`],
//!   [`Reselect`], [`RedoVisual`]) drive Visual mode.

use bitflags::bitflags;
use core_events::Key;
use core_text::Position;

/// Column value meaning "end of line" (`$`).
pub const MAXCOL: usize = usize::MAX;

/// Largest count accepted before clamping.
pub const COUNT_MAX: usize = 999_999_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Delete,
    Yank,
    Change,
    ShiftLeft,
    ShiftRight,
    Tilde,
    Upper,
    Lower,
    Rot13,
    /// `gq`
    Format,
    /// `gw`: format and keep the cursor.
    FormatKeep,
    Join,
    JoinNoSpace,
    /// Visual `r`.
    Replace,
    /// Visual `I`.
    Insert,
    /// Visual `A`.
    Append,
    /// `g@`
    Function,
    /// `gc`
    Comment,
}

impl OperatorKind {
    /// Operator started by `c1` (and `c2` after `g`).
    pub fn from_keys(c1: Key, c2: Key) -> Option<Self> {
        let c1 = c1.as_char()?;
        let c2 = c2.as_char().unwrap_or('\0');
        Some(match (c1, c2) {
            ('r', _) => OperatorKind::Replace,
            ('~', _) => OperatorKind::Tilde,
            ('d', _) => OperatorKind::Delete,
            ('y', _) => OperatorKind::Yank,
            ('c', _) => OperatorKind::Change,
            ('<', _) => OperatorKind::ShiftLeft,
            ('>', _) => OperatorKind::ShiftRight,
            ('J', _) => OperatorKind::Join,
            ('I', _) => OperatorKind::Insert,
            ('A', _) => OperatorKind::Append,
            ('g', '~') => OperatorKind::Tilde,
            ('g', 'u') => OperatorKind::Lower,
            ('g', 'U') => OperatorKind::Upper,
            ('g', '?') => OperatorKind::Rot13,
            ('g', 'q') => OperatorKind::Format,
            ('g', 'w') => OperatorKind::FormatKeep,
            ('g', 'J') => OperatorKind::JoinNoSpace,
            ('g', '@') => OperatorKind::Function,
            ('g', 'c') => OperatorKind::Comment,
            _ => return None,
        })
    }

    /// Keys that start this operator, for the redo buffer.
    pub fn keys(self) -> (char, Option<char>) {
        match self {
            OperatorKind::Delete => ('d', None),
            OperatorKind::Yank => ('y', None),
            OperatorKind::Change => ('c', None),
            OperatorKind::ShiftLeft => ('<', None),
            OperatorKind::ShiftRight => ('>', None),
            OperatorKind::Tilde => ('g', Some('~')),
            OperatorKind::Upper => ('g', Some('U')),
            OperatorKind::Lower => ('g', Some('u')),
            OperatorKind::Rot13 => ('g', Some('?')),
            OperatorKind::Format => ('g', Some('q')),
            OperatorKind::FormatKeep => ('g', Some('w')),
            OperatorKind::Join => ('J', None),
            OperatorKind::JoinNoSpace => ('g', Some('J')),
            OperatorKind::Replace => ('r', None),
            OperatorKind::Insert => ('I', None),
            OperatorKind::Append => ('A', None),
            OperatorKind::Function => ('g', Some('@')),
            OperatorKind::Comment => ('g', Some('c')),
        }
    }

    /// Works on whole lines even after a characterwise motion.
    pub fn on_lines(self) -> bool {
        matches!(
            self,
            OperatorKind::ShiftLeft
                | OperatorKind::ShiftRight
                | OperatorKind::Format
                | OperatorKind::FormatKeep
                | OperatorKind::Join
                | OperatorKind::JoinNoSpace
                | OperatorKind::Comment
        )
    }

    /// Modifies the buffer.
    pub fn is_change(self) -> bool {
        !matches!(self, OperatorKind::Yank)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionType {
    #[default]
    Char,
    Line,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualKind {
    #[default]
    Char,
    Line,
    Block,
}

impl VisualKind {
    pub fn from_key(key: Key) -> Option<Self> {
        if key == Key::ctrl('v') || key == Key::ctrl('q') {
            return Some(VisualKind::Block);
        }
        match key.as_char()? {
            'v' => Some(VisualKind::Char),
            'V' => Some(VisualKind::Line),
            _ => None,
        }
    }

    pub fn key(self) -> Key {
        match self {
            VisualKind::Char => Key::from_char('v'),
            VisualKind::Line => Key::from_char('V'),
            VisualKind::Block => Key::ctrl('v'),
        }
    }
}

/// Operator waiting for (or executing with) its motion.
#[derive(Debug, Clone, Default)]
pub struct OperatorPending {
    pub op: Option<OperatorKind>,
    /// Register from `"x`, kept until the operator finishes.
    pub regname: Option<char>,
    pub motion_type: MotionType,
    /// `v`, `V` or `CTRL-V` typed after the operator.
    pub motion_force: Option<VisualKind>,
    /// Delete goes to register 1 even when it is within one line.
    pub use_reg_one: bool,
    pub inclusive: bool,
    /// The end was moved back from column 0 of the following line.
    pub end_adjusted: bool,
    pub start: Position,
    pub end: Position,
    pub line_count: usize,
    pub empty: bool,
    pub is_visual: bool,
    pub block_mode: bool,
    pub start_vcol: usize,
    pub end_vcol: usize,
    /// Cursor when the operator was typed; `gw` returns to it.
    pub cursor_start: Position,
    /// Counts saved by an ignored key so a partial count survives it.
    pub prev_opcount: usize,
    pub prev_count0: usize,
}

impl OperatorPending {
    /// Forget the operator and register; saved counts survive.
    pub fn clear(&mut self) {
        self.op = None;
        self.regname = None;
        self.motion_force = None;
        self.use_reg_one = false;
        self.motion_type = MotionType::Char;
    }
}

bitflags! {
    /// Handler results that change what happens after the handler returns.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CommandResult: u8 {
        /// The command started something that is still running.
        const COMMAND_BUSY = 0x01;
        /// Do not apply the exclusive-at-column-0 adjustment.
        const NO_ADJ_OP_END = 0x02;
    }
}

/// Arguments of the command being assembled or executed.
#[derive(Debug, Clone)]
pub struct CommandArg {
    pub cmdchar: Key,
    pub nchar: Key,
    /// Composing characters typed after `nchar`.
    pub nchar_c1: Option<char>,
    pub nchar_c2: Option<char>,
    /// Third key, after `g r`, `g'`, `` g` ``.
    pub extra_char: Key,
    /// Count typed before the operator.
    pub opcount: usize,
    /// Count as typed, zero when none.
    pub count0: usize,
    /// Count, at least one.
    pub count1: usize,
    pub arg: i64,
    pub retval: CommandResult,
    pub searchbuf: Option<String>,
}

impl Default for CommandArg {
    fn default() -> Self {
        Self {
            cmdchar: Key::NUL,
            nchar: Key::NUL,
            nchar_c1: None,
            nchar_c2: None,
            extra_char: Key::NUL,
            opcount: 0,
            count0: 0,
            count1: 1,
            arg: 0,
            retval: CommandResult::empty(),
            searchbuf: None,
        }
    }
}

impl CommandArg {
    pub fn cmd_is(&self, c: char) -> bool {
        self.cmdchar == Key::from_char(c)
    }

    pub fn nchar_is(&self, c: char) -> bool {
        self.nchar == Key::from_char(c)
    }

    /// `nchar` plus composing characters, as the text to search for.
    pub fn nchar_text(&self) -> Option<String> {
        let mut s = String::new();
        s.push(self.nchar.as_char()?);
        s.extend(self.nchar_c1);
        s.extend(self.nchar_c2);
        Some(s)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VisualSelection {
    pub active: bool,
    pub select_mode: bool,
    pub kind: VisualKind,
    pub anchor: Position,
    /// Kind chosen by the user before an uppercase command (`D`, `Y`, `R`...)
    /// forced linewise; `gv` restores it.
    pub mode_before_override: Option<VisualKind>,
}

/// Last selection, for `gv` and the `'<` `'>` marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedVisual {
    pub kind: VisualKind,
    pub start: Position,
    pub end: Position,
    pub curswant: usize,
}

/// Shape of the last operated selection, reused by `1v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reselect {
    pub kind: VisualKind,
    pub line_count: usize,
    /// Width in columns, [`MAXCOL`] after `$`, or the end column for
    /// multi-line characterwise selections.
    pub vcol: usize,
}

/// Shape and count used when `.` repeats a Visual operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedoVisual {
    pub kind: VisualKind,
    pub line_count: usize,
    pub vcol: usize,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_keys_round_trip() {
        let all = [
            OperatorKind::Delete,
            OperatorKind::Yank,
            OperatorKind::Change,
            OperatorKind::ShiftLeft,
            OperatorKind::ShiftRight,
            OperatorKind::Tilde,
            OperatorKind::Upper,
            OperatorKind::Lower,
            OperatorKind::Rot13,
            OperatorKind::Format,
            OperatorKind::FormatKeep,
            OperatorKind::Join,
            OperatorKind::JoinNoSpace,
            OperatorKind::Replace,
            OperatorKind::Insert,
            OperatorKind::Append,
            OperatorKind::Function,
            OperatorKind::Comment,
        ];
        for op in all {
            let (c1, c2) = op.keys();
            let c2 = c2.map(Key::from_char).unwrap_or(Key::NUL);
            assert_eq!(OperatorKind::from_keys(Key::from_char(c1), c2), Some(op));
        }
    }

    #[test]
    fn clear_keeps_saved_counts() {
        let mut oap = OperatorPending {
            op: Some(OperatorKind::Delete),
            regname: Some('a'),
            prev_count0: 3,
            ..OperatorPending::default()
        };
        oap.clear();
        assert!(oap.op.is_none() && oap.regname.is_none());
        assert_eq!(oap.prev_count0, 3);
    }

    #[test]
    fn visual_kind_keys() {
        assert_eq!(VisualKind::from_key(Key::ctrl('q')), Some(VisualKind::Block));
        assert_eq!(VisualKind::from_key(VisualKind::Line.key()), Some(VisualKind::Line));
        assert_eq!(VisualKind::from_key(Key::from_char('x')), None);
    }
}
