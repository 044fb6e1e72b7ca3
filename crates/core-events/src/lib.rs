//! Key values consumed by the command engine.
//!
//! A [`Key`] is a single signed integer so that plain characters, control
//! characters and out-of-band special keys (arrows, function keys, shifted
//! cursor keys) share one ordered space:
//!
//! * `0 ..= 0x10FFFF` is a Unicode scalar value (control characters included).
//! * Negative values are special keys. Their absolute value is always
//!   `>= SPECIAL_BASE`, which is past every scalar value, so sorting a command
//!   table by absolute value places every special key after every character.
//!
//! Hosts that receive terminal-style events convert them with
//! `Key::from(KeyEvent)`; scripts and tests use the `<Esc>`-style notation
//! understood by [`parse_keys`].

use std::fmt;

mod notation;

pub use notation::{KeyNotationError, format_keys, keys_from_register, keys_to_register, parse_keys};

/// Absolute value of the first special key. One past the last Unicode scalar value.
pub const SPECIAL_BASE: i32 = 0x11_0000;

/// Base of the private-use plane used to carry special keys inside register text.
pub(crate) const REGISTER_SPECIAL_BASE: u32 = 0xF_0000;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(i32);

/// Named special keys. The discriminant is the offset from [`SPECIAL_BASE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Special {
    Up = 1,
    Down,
    Left,
    Right,
    Home,
    End,
    ShiftUp,
    ShiftDown,
    ShiftLeft,
    ShiftRight,
    ShiftHome,
    ShiftEnd,
    CtrlLeft,
    CtrlRight,
    CtrlHome,
    CtrlEnd,
    Del,
    Backspace,
    Insert,
    PageUp,
    PageDown,
    /// No-op key delivered by hosts (idle ticks). Preserves a partially typed count.
    Ignore,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl Special {
    pub(crate) const ALL: [Special; 34] = [
        Special::Up,
        Special::Down,
        Special::Left,
        Special::Right,
        Special::Home,
        Special::End,
        Special::ShiftUp,
        Special::ShiftDown,
        Special::ShiftLeft,
        Special::ShiftRight,
        Special::ShiftHome,
        Special::ShiftEnd,
        Special::CtrlLeft,
        Special::CtrlRight,
        Special::CtrlHome,
        Special::CtrlEnd,
        Special::Del,
        Special::Backspace,
        Special::Insert,
        Special::PageUp,
        Special::PageDown,
        Special::Ignore,
        Special::F1,
        Special::F2,
        Special::F3,
        Special::F4,
        Special::F5,
        Special::F6,
        Special::F7,
        Special::F8,
        Special::F9,
        Special::F10,
        Special::F11,
        Special::F12,
    ];

    pub(crate) fn offset(self) -> i32 {
        self as i32
    }

    pub(crate) fn from_offset(offset: i32) -> Option<Special> {
        Self::ALL.iter().copied().find(|s| s.offset() == offset)
    }

    /// Notation name used between angle brackets (`<S-Left>`).
    pub fn name(self) -> &'static str {
        match self {
            Special::Up => "Up",
            Special::Down => "Down",
            Special::Left => "Left",
            Special::Right => "Right",
            Special::Home => "Home",
            Special::End => "End",
            Special::ShiftUp => "S-Up",
            Special::ShiftDown => "S-Down",
            Special::ShiftLeft => "S-Left",
            Special::ShiftRight => "S-Right",
            Special::ShiftHome => "S-Home",
            Special::ShiftEnd => "S-End",
            Special::CtrlLeft => "C-Left",
            Special::CtrlRight => "C-Right",
            Special::CtrlHome => "C-Home",
            Special::CtrlEnd => "C-End",
            Special::Del => "Del",
            Special::Backspace => "BS",
            Special::Insert => "Insert",
            Special::PageUp => "PageUp",
            Special::PageDown => "PageDown",
            Special::Ignore => "Ignore",
            Special::F1 => "F1",
            Special::F2 => "F2",
            Special::F3 => "F3",
            Special::F4 => "F4",
            Special::F5 => "F5",
            Special::F6 => "F6",
            Special::F7 => "F7",
            Special::F8 => "F8",
            Special::F9 => "F9",
            Special::F10 => "F10",
            Special::F11 => "F11",
            Special::F12 => "F12",
        }
    }
}

impl Key {
    pub const NUL: Key = Key(0x00);
    pub const BS: Key = Key(0x08);
    pub const TAB: Key = Key(0x09);
    pub const NL: Key = Key(0x0a);
    pub const CR: Key = Key(0x0d);
    pub const ESC: Key = Key(0x1b);
    pub const SPACE: Key = Key(0x20);
    pub const DEL_CHAR: Key = Key(0x7f);

    pub const UP: Key = Key::special(Special::Up);
    pub const DOWN: Key = Key::special(Special::Down);
    pub const LEFT: Key = Key::special(Special::Left);
    pub const RIGHT: Key = Key::special(Special::Right);
    pub const HOME: Key = Key::special(Special::Home);
    pub const END: Key = Key::special(Special::End);
    pub const S_UP: Key = Key::special(Special::ShiftUp);
    pub const S_DOWN: Key = Key::special(Special::ShiftDown);
    pub const S_LEFT: Key = Key::special(Special::ShiftLeft);
    pub const S_RIGHT: Key = Key::special(Special::ShiftRight);
    pub const S_HOME: Key = Key::special(Special::ShiftHome);
    pub const S_END: Key = Key::special(Special::ShiftEnd);
    pub const C_LEFT: Key = Key::special(Special::CtrlLeft);
    pub const C_RIGHT: Key = Key::special(Special::CtrlRight);
    pub const C_HOME: Key = Key::special(Special::CtrlHome);
    pub const C_END: Key = Key::special(Special::CtrlEnd);
    pub const DEL: Key = Key::special(Special::Del);
    pub const K_BS: Key = Key::special(Special::Backspace);
    pub const INSERT: Key = Key::special(Special::Insert);
    pub const PAGE_UP: Key = Key::special(Special::PageUp);
    pub const PAGE_DOWN: Key = Key::special(Special::PageDown);
    pub const IGNORE: Key = Key::special(Special::Ignore);

    pub const fn special(s: Special) -> Key {
        Key(-(SPECIAL_BASE + s as i32))
    }

    pub const fn from_char(c: char) -> Key {
        Key(c as i32)
    }

    /// Control character for `c` (`ctrl('w')` is 0x17). Letters are case-insensitive.
    pub const fn ctrl(c: char) -> Key {
        let upper = if c.is_ascii_lowercase() {
            c.to_ascii_uppercase()
        } else {
            c
        };
        Key((upper as i32) & 0x1f)
    }

    /// Raw signed value.
    pub const fn value(self) -> i32 {
        self.0
    }

    /// Absolute value used to order the command table.
    pub const fn abs_value(self) -> u32 {
        self.0.unsigned_abs()
    }

    pub const fn is_special(self) -> bool {
        self.0 < 0
    }

    pub fn as_special(self) -> Option<Special> {
        if self.is_special() {
            Special::from_offset(-self.0 - SPECIAL_BASE)
        } else {
            None
        }
    }

    pub fn as_char(self) -> Option<char> {
        if self.is_special() {
            None
        } else {
            char::from_u32(self.0 as u32)
        }
    }

    /// True for a character that displays as itself (no control chars, no specials).
    pub fn is_printable(self) -> bool {
        self.as_char().is_some_and(|c| !c.is_control())
    }

    /// True for `'0'..='9'`.
    pub fn digit(self) -> Option<u32> {
        self.as_char().and_then(|c| c.to_digit(10)).filter(|_| self.0 < 0x80)
    }

    /// Multibyte characters (>= 0x100) are never commands. Special keys are exempt.
    pub const fn is_multibyte(self) -> bool {
        self.0 >= 0x100
    }

    /// Map a shifted cursor key to its unshifted form (`<S-Left>` -> `<Left>`).
    pub fn unshifted(self) -> Key {
        match self.as_special() {
            Some(Special::ShiftUp) => Key::UP,
            Some(Special::ShiftDown) => Key::DOWN,
            Some(Special::ShiftLeft) => Key::LEFT,
            Some(Special::ShiftRight) => Key::RIGHT,
            Some(Special::ShiftHome) => Key::HOME,
            Some(Special::ShiftEnd) => Key::END,
            _ => self,
        }
    }
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Key::from_char(c)
    }
}

impl From<Special> for Key {
    fn from(s: Special) -> Self {
        Key::special(s)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", format_keys(&[*self]))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_keys(&[*self]))
    }
}

// -------------------------------------------------------------------------------------------------
// Host key events
// -------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode, mods: KeyModifiers) -> Self {
        Self { code, mods }
    }

    pub fn plain(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Logical key reported by a terminal or GUI front end.
pub enum KeyCode {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Delete,
    Insert,
    PageUp,
    PageDown,
    F(u8),
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const CTRL = 0b0000_0001;
        const ALT  = 0b0000_0010;
        const SHIFT= 0b0000_0100;
    }
}

impl From<KeyEvent> for Key {
    fn from(ev: KeyEvent) -> Self {
        let shift = ev.mods.contains(KeyModifiers::SHIFT);
        let ctrl = ev.mods.contains(KeyModifiers::CTRL);
        match ev.code {
            KeyCode::Char(c) if ctrl && (c.is_ascii_alphabetic() || ('@'..='_').contains(&c)) => {
                Key::ctrl(c)
            }
            KeyCode::Char(c) => Key::from_char(c),
            KeyCode::Enter => Key::CR,
            KeyCode::Esc => Key::ESC,
            KeyCode::Backspace => Key::K_BS,
            KeyCode::Tab => Key::TAB,
            KeyCode::Up if shift => Key::S_UP,
            KeyCode::Down if shift => Key::S_DOWN,
            KeyCode::Left if shift => Key::S_LEFT,
            KeyCode::Right if shift => Key::S_RIGHT,
            KeyCode::Home if shift => Key::S_HOME,
            KeyCode::End if shift => Key::S_END,
            KeyCode::Left if ctrl => Key::C_LEFT,
            KeyCode::Right if ctrl => Key::C_RIGHT,
            KeyCode::Home if ctrl => Key::C_HOME,
            KeyCode::End if ctrl => Key::C_END,
            KeyCode::Up => Key::UP,
            KeyCode::Down => Key::DOWN,
            KeyCode::Left => Key::LEFT,
            KeyCode::Right => Key::RIGHT,
            KeyCode::Home => Key::HOME,
            KeyCode::End => Key::END,
            KeyCode::Delete => Key::DEL,
            KeyCode::Insert => Key::INSERT,
            KeyCode::PageUp => Key::PAGE_UP,
            KeyCode::PageDown => Key::PAGE_DOWN,
            KeyCode::F(n) => match n {
                1 => Key::special(Special::F1),
                2 => Key::special(Special::F2),
                3 => Key::special(Special::F3),
                4 => Key::special(Special::F4),
                5 => Key::special(Special::F5),
                6 => Key::special(Special::F6),
                7 => Key::special(Special::F7),
                8 => Key::special(Special::F8),
                9 => Key::special(Special::F9),
                10 => Key::special(Special::F10),
                11 => Key::special(Special::F11),
                12 => Key::special(Special::F12),
                _ => Key::IGNORE,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specials_sort_after_every_char() {
        let max_char = Key::from_char(char::MAX);
        for s in Special::ALL {
            let k = Key::special(s);
            assert!(k.is_special());
            assert!(k.abs_value() > max_char.abs_value(), "{s:?}");
            assert_eq!(k.as_special(), Some(s));
        }
    }

    #[test]
    fn ctrl_letters_fold_case() {
        assert_eq!(Key::ctrl('w'), Key::ctrl('W'));
        assert_eq!(Key::ctrl('w').value(), 0x17);
        assert_eq!(Key::ctrl('['), Key::ESC);
        assert_eq!(Key::ctrl('\\').value(), 0x1c);
    }

    #[test]
    fn digits_only_ascii() {
        assert_eq!(Key::from_char('7').digit(), Some(7));
        assert_eq!(Key::from_char('٣').digit(), None);
        assert_eq!(Key::LEFT.digit(), None);
    }

    #[test]
    fn multibyte_boundary() {
        assert!(!Key::from_char('ÿ').is_multibyte());
        assert!(Key::from_char('Ā').is_multibyte());
        assert!(!Key::LEFT.is_multibyte());
    }

    #[test]
    fn key_event_conversion() {
        let ev = KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CTRL);
        assert_eq!(Key::from(ev), Key::ctrl('w'));
        let ev = KeyEvent::new(KeyCode::Left, KeyModifiers::SHIFT);
        assert_eq!(Key::from(ev), Key::S_LEFT);
        assert_eq!(Key::from(KeyEvent::plain('x')), Key::from_char('x'));
        assert_eq!(Key::from(KeyEvent::new(KeyCode::Enter, KeyModifiers::empty())), Key::CR);
    }

    #[test]
    fn unshift_maps_cursor_keys_only() {
        assert_eq!(Key::S_END.unshifted(), Key::END);
        assert_eq!(Key::from_char('a').unshifted(), Key::from_char('a'));
        assert_eq!(Key::C_LEFT.unshifted(), Key::C_LEFT);
    }
}
