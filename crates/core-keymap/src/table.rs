//! Static command descriptors.

use core_events::Key;

bitflags::bitflags! {
    /// Capability flags of a command.
    ///
    /// The two "second char" variants include the plain [`CommandFlags::SECOND_CHAR`]
    /// bit, so `flags.contains(SECOND_CHAR_NO_OP)` only holds for commands that
    /// declared exactly that requirement.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CommandFlags: u16 {
        /// May need a second character; the exact rule depends on the trigger.
        const SECOND_CHAR = 0x001;
        /// Needs a second character only when no operator is pending.
        const SECOND_CHAR_NO_OP = 0x002 | 0x001;
        /// Always needs a second character.
        const SECOND_CHAR_ALWAYS = 0x004 | 0x001;
        /// The second character is text (`f`, `t`, `r`): no langmap, may carry composing chars.
        const LANG = 0x008;
        /// A shifted cursor key that may start a selection (`'keymodel'` startsel).
        const START_SELECTION = 0x010;
        /// An unshifted cursor key that may stop a selection (`'keymodel'` stopsel).
        const STOP_SELECTION = 0x040;
        /// Horizontal command inverted under `'rightleft'`.
        const RIGHT_LEFT = 0x080;
        /// Keep a register selected with `"x` alive for the next command.
        const KEEP_REGISTER = 0x100;
        /// Not allowed while text is locked (command-line window, expression evaluation).
        const NOT_IN_CMDWIN = 0x200;
    }
}

/// Command family invoked for a trigger. The engine matches on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    Error,
    Ignore,
    Nop,
    Esc,
    /// `CTRL-\ CTRL-N` / `CTRL-\ CTRL-G`.
    Normal,
    Left,
    Right,
    Up,
    Down,
    CtrlH,
    Dollar,
    Home,
    End,
    BeginLine,
    Pipe,
    Goto,
    Percent,
    FindParagraph,
    WordForward,
    WordBackward,
    CharSearch,
    GoMark,
    SetMark,
    Search,
    SearchNext,
    Ident,
    ScreenRow,
    ScrollLine,
    Page,
    HalfPage,
    Zet,
    Operator,
    LineOperator,
    Abbreviation,
    Replace,
    Tilde,
    Join,
    Put,
    Edit,
    Open,
    ReplaceMode,
    Undo,
    UndoLine,
    Redo,
    Dot,
    RegisterName,
    Record,
    Execute,
    Colon,
    Visual,
    Window,
    GPrefix,
    AddSub,
    Redraw,
    FileInfo,
    GotoDefinition,
    JumpList,
}

/// Static argument values shared by several handlers.
pub mod arg {
    pub const FORWARD: i64 = 1;
    pub const BACKWARD: i64 = -1;
    /// Cursor to first non-blank.
    pub const BL_WHITE: i64 = 1;
    /// Cursor to first non-blank when 'startofline' is set, else keep column.
    pub const BL_SOL: i64 = 2;
    /// Don't leave the cursor on a NUL.
    pub const BL_FIX: i64 = 4;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub trigger: Key,
    pub handler: Handler,
    pub flags: CommandFlags,
    pub static_arg: i64,
}

const fn c(ch: char) -> Key {
    Key::from_char(ch)
}

const fn ctl(ch: char) -> Key {
    Key::ctrl(ch)
}

const fn cmd(trigger: Key, handler: Handler, flags: CommandFlags, static_arg: i64) -> CommandDescriptor {
    CommandDescriptor {
        trigger,
        handler,
        flags,
        static_arg,
    }
}

type F = CommandFlags;
use Handler as H;
use arg::{BACKWARD, BL_FIX, BL_WHITE, FORWARD};

const NONE: F = F::empty();
const NCH: F = F::SECOND_CHAR;
const NCH_NOP: F = F::SECOND_CHAR_NO_OP;
const NCH_ALW: F = F::SECOND_CHAR_ALWAYS;
const KEEPREG: F = F::KEEP_REGISTER;
const RL: F = F::RIGHT_LEFT;
const NCW: F = F::NOT_IN_CMDWIN;
const STS: F = F::STOP_SELECTION;
const SS: F = F::START_SELECTION;

/// The command table. Order is irrelevant; [`crate::CommandIndex`] sorts it.
pub static COMMANDS: &[CommandDescriptor] = &[
    cmd(Key::NUL, H::Error, NONE, 0),
    cmd(ctl('a'), H::AddSub, NONE, 0),
    cmd(ctl('b'), H::Page, STS, BACKWARD),
    cmd(ctl('c'), H::Esc, NONE, 1),
    cmd(ctl('d'), H::HalfPage, NONE, 0),
    cmd(ctl('e'), H::ScrollLine, NONE, 1),
    cmd(ctl('f'), H::Page, STS, FORWARD),
    cmd(ctl('g'), H::FileInfo, NONE, 0),
    cmd(ctl('h'), H::CtrlH, NONE, 0),
    cmd(ctl('i'), H::JumpList, NONE, FORWARD),
    cmd(ctl('j'), H::Down, NONE, 0),
    cmd(ctl('k'), H::Error, NONE, 0),
    cmd(ctl('l'), H::Redraw, NONE, 0),
    cmd(ctl('m'), H::Down, NONE, 1),
    cmd(ctl('n'), H::Down, NONE, 0),
    cmd(ctl('o'), H::JumpList, NONE, BACKWARD),
    cmd(ctl('p'), H::Up, NONE, 0),
    cmd(ctl('q'), H::Visual, NONE, 0),
    cmd(ctl('r'), H::Redo, NONE, 0),
    cmd(ctl('s'), H::Ignore, NONE, 0),
    cmd(ctl('t'), H::Error, NONE, 0),
    cmd(ctl('u'), H::HalfPage, NONE, 0),
    cmd(ctl('v'), H::Visual, NONE, 0),
    cmd(ctl('w'), H::Window, NONE, 0),
    cmd(ctl('x'), H::AddSub, NONE, 0),
    cmd(ctl('y'), H::ScrollLine, NONE, 0),
    cmd(ctl('z'), H::Nop, NCW, 0),
    cmd(Key::ESC, H::Esc, NONE, 0),
    cmd(ctl('\\'), H::Normal, NCH_ALW, 0),
    cmd(ctl(']'), H::GotoDefinition, NCW, 0),
    cmd(ctl('^'), H::Error, NCW, 0),
    cmd(ctl('_'), H::Error, NONE, 0),
    cmd(c(' '), H::Right, NONE, 0),
    cmd(c('!'), H::Error, NONE, 0),
    cmd(c('"'), H::RegisterName, NCH_NOP.union(KEEPREG), 0),
    cmd(c('#'), H::Ident, NONE, 0),
    cmd(c('$'), H::Dollar, NONE, 0),
    cmd(c('%'), H::Percent, NONE, 0),
    cmd(c('&'), H::Error, NONE, 0),
    cmd(c('\''), H::GoMark, NCH_ALW, 1),
    cmd(c('('), H::Error, NONE, 0),
    cmd(c(')'), H::Error, NONE, 0),
    cmd(c('*'), H::Ident, NONE, 0),
    cmd(c('+'), H::Down, NONE, 1),
    cmd(c(','), H::CharSearch, NONE, 1),
    cmd(c('-'), H::Up, NONE, 1),
    cmd(c('.'), H::Dot, KEEPREG, 0),
    cmd(c('/'), H::Search, NONE, FORWARD),
    cmd(c('0'), H::BeginLine, NONE, 0),
    cmd(c('1'), H::Ignore, NONE, 0),
    cmd(c('2'), H::Ignore, NONE, 0),
    cmd(c('3'), H::Ignore, NONE, 0),
    cmd(c('4'), H::Ignore, NONE, 0),
    cmd(c('5'), H::Ignore, NONE, 0),
    cmd(c('6'), H::Ignore, NONE, 0),
    cmd(c('7'), H::Ignore, NONE, 0),
    cmd(c('8'), H::Ignore, NONE, 0),
    cmd(c('9'), H::Ignore, NONE, 0),
    cmd(c(':'), H::Colon, NONE, 0),
    cmd(c(';'), H::CharSearch, NONE, 0),
    cmd(c('<'), H::Operator, RL, 0),
    cmd(c('='), H::Error, NONE, 0),
    cmd(c('>'), H::Operator, RL, 0),
    cmd(c('?'), H::Search, NONE, BACKWARD),
    cmd(c('@'), H::Execute, NCH_NOP, 0),
    cmd(c('A'), H::Edit, NONE, 0),
    cmd(c('B'), H::WordBackward, NONE, 1),
    cmd(c('C'), H::Abbreviation, KEEPREG, 0),
    cmd(c('D'), H::Abbreviation, KEEPREG, 0),
    cmd(c('E'), H::WordForward, NONE, 1),
    cmd(c('F'), H::CharSearch, NCH_ALW.union(F::LANG), BACKWARD),
    cmd(c('G'), H::Goto, NONE, 1),
    cmd(c('H'), H::ScreenRow, NONE, 0),
    cmd(c('I'), H::Edit, NONE, 0),
    cmd(c('J'), H::Join, NONE, 0),
    cmd(c('K'), H::Error, NONE, 0),
    cmd(c('L'), H::ScreenRow, NONE, 0),
    cmd(c('M'), H::ScreenRow, NONE, 0),
    cmd(c('N'), H::SearchNext, NONE, 1),
    cmd(c('O'), H::Open, NONE, 0),
    cmd(c('P'), H::Put, NONE, 0),
    cmd(c('Q'), H::Error, NONE, 0),
    cmd(c('R'), H::ReplaceMode, NONE, 0),
    cmd(c('S'), H::Abbreviation, KEEPREG, 0),
    cmd(c('T'), H::CharSearch, NCH_ALW.union(F::LANG), BACKWARD),
    cmd(c('U'), H::UndoLine, NONE, 0),
    cmd(c('V'), H::Visual, NONE, 0),
    cmd(c('W'), H::WordForward, NONE, 1),
    cmd(c('X'), H::Abbreviation, KEEPREG, 0),
    cmd(c('Y'), H::Abbreviation, KEEPREG, 0),
    cmd(c('Z'), H::Error, NCW, 0),
    cmd(c('['), H::Error, NONE, 0),
    cmd(c('\\'), H::Error, NONE, 0),
    cmd(c(']'), H::Error, NONE, 0),
    cmd(c('^'), H::BeginLine, NONE, BL_WHITE | BL_FIX),
    cmd(c('_'), H::LineOperator, NONE, 0),
    cmd(c('`'), H::GoMark, NCH_ALW, 0),
    cmd(c('a'), H::Edit, NCH, 0),
    cmd(c('b'), H::WordBackward, NONE, 0),
    cmd(c('c'), H::Operator, NONE, 0),
    cmd(c('d'), H::Operator, NONE, 0),
    cmd(c('e'), H::WordForward, NONE, 0),
    cmd(c('f'), H::CharSearch, NCH_ALW.union(F::LANG), FORWARD),
    cmd(c('g'), H::GPrefix, NCH_ALW, 0),
    cmd(c('h'), H::Left, RL, 0),
    cmd(c('i'), H::Edit, NCH, 0),
    cmd(c('j'), H::Down, NONE, 0),
    cmd(c('k'), H::Up, NONE, 0),
    cmd(c('l'), H::Right, RL, 0),
    cmd(c('m'), H::SetMark, NCH_NOP, 0),
    cmd(c('n'), H::SearchNext, NONE, 0),
    cmd(c('o'), H::Open, NONE, 0),
    cmd(c('p'), H::Put, NONE, 0),
    cmd(c('q'), H::Record, NCH, 0),
    cmd(c('r'), H::Replace, NCH_NOP.union(F::LANG), 0),
    cmd(c('s'), H::Abbreviation, KEEPREG, 0),
    cmd(c('t'), H::CharSearch, NCH_ALW.union(F::LANG), FORWARD),
    cmd(c('u'), H::Undo, NONE, 0),
    cmd(c('v'), H::Visual, NONE, 0),
    cmd(c('w'), H::WordForward, NONE, 0),
    cmd(c('x'), H::Abbreviation, KEEPREG, 0),
    cmd(c('y'), H::Operator, NONE, 0),
    cmd(c('z'), H::Zet, NCH_ALW, 0),
    cmd(c('{'), H::FindParagraph, NONE, BACKWARD),
    cmd(c('|'), H::Pipe, NONE, 0),
    cmd(c('}'), H::FindParagraph, NONE, FORWARD),
    cmd(c('~'), H::Tilde, NONE, 0),
    cmd(Key::DEL_CHAR, H::Abbreviation, NONE, 0),
    // Special keys, sorted after every character by absolute value.
    cmd(Key::UP, H::Up, STS, 0),
    cmd(Key::DOWN, H::Down, STS, 0),
    cmd(Key::LEFT, H::Left, STS.union(RL), 0),
    cmd(Key::RIGHT, H::Right, STS.union(RL), 0),
    cmd(Key::HOME, H::Home, STS, 0),
    cmd(Key::END, H::End, STS, 0),
    cmd(Key::S_UP, H::Page, SS, BACKWARD),
    cmd(Key::S_DOWN, H::Page, SS, FORWARD),
    cmd(Key::S_LEFT, H::WordBackward, SS.union(RL), 0),
    cmd(Key::S_RIGHT, H::WordForward, SS.union(RL), 0),
    cmd(Key::S_HOME, H::Home, SS, 0),
    cmd(Key::S_END, H::End, SS, 0),
    cmd(Key::C_LEFT, H::WordBackward, STS.union(RL), 1),
    cmd(Key::C_RIGHT, H::WordForward, STS.union(RL), 1),
    cmd(Key::C_HOME, H::Goto, STS, 0),
    cmd(Key::C_END, H::End, STS, 1),
    cmd(Key::DEL, H::Abbreviation, NONE, 0),
    cmd(Key::K_BS, H::CtrlH, NONE, 0),
    cmd(Key::INSERT, H::Edit, NONE, 0),
    cmd(Key::PAGE_UP, H::Page, STS, BACKWARD),
    cmd(Key::PAGE_DOWN, H::Page, STS, FORWARD),
    cmd(Key::IGNORE, H::Ignore, KEEPREG, 0),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn triggers_are_unique() {
        let mut seen = HashSet::new();
        for d in COMMANDS {
            assert!(seen.insert(d.trigger), "duplicate trigger {:?}", d.trigger);
        }
    }

    #[test]
    fn second_char_variants_imply_base_flag() {
        assert!(F::SECOND_CHAR_ALWAYS.contains(F::SECOND_CHAR));
        assert!(F::SECOND_CHAR_NO_OP.contains(F::SECOND_CHAR));
        assert!(!F::SECOND_CHAR_NO_OP.contains(F::SECOND_CHAR_ALWAYS));
        let m = COMMANDS
            .iter()
            .find(|d| d.trigger == Key::from_char('m'))
            .unwrap();
        assert!(m.flags.contains(F::SECOND_CHAR_NO_OP));
        assert!(!m.flags.contains(F::SECOND_CHAR_ALWAYS));
    }

    #[test]
    fn every_ascii_char_has_an_entry() {
        for v in 0u32..0x80 {
            let key = Key::from_char(char::from_u32(v).unwrap());
            assert!(
                COMMANDS.iter().any(|d| d.trigger == key),
                "missing entry for {v:#x}"
            );
        }
    }
}
