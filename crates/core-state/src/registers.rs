//! Register storage.
//!
//! Names follow Vi: `"` unnamed, `0`–`9` numbered (0 = last yank, 1–9 the
//! delete history), `-` small delete, `a`–`z` named (uppercase appends),
//! `_` black hole, and the read-only `.` (last inserted text), `:` (last
//! command line) and `/` (last search pattern).

use thiserror::Error;
use tracing::trace;

/// How register text is put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    Char,
    Line,
    /// Blockwise with the display width of the widest line.
    Block(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterContent {
    pub lines: Vec<String>,
    pub kind: RegisterKind,
}

impl RegisterContent {
    pub fn new(lines: Vec<String>, kind: RegisterKind) -> Self {
        Self { lines, kind }
    }

    pub fn charwise(text: &str) -> Self {
        Self {
            lines: text.split('\n').map(str::to_string).collect(),
            kind: RegisterKind::Char,
        }
    }

    pub fn linewise<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            kind: RegisterKind::Line,
        }
    }

    /// Text joined with newlines; linewise content ends with one.
    pub fn text(&self) -> String {
        let mut s = self.lines.join("\n");
        if self.kind == RegisterKind::Line {
            s.push('\n');
        }
        s
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(String::is_empty) && self.kind == RegisterKind::Char
    }

    /// Append `other`, as an uppercase register name does.
    pub fn append(&mut self, other: RegisterContent) {
        match (self.kind, other.kind) {
            (RegisterKind::Char, RegisterKind::Char) => {
                let mut rest = other.lines.into_iter();
                if let (Some(last), Some(first)) = (self.lines.last_mut(), rest.next()) {
                    last.push_str(&first);
                }
                self.lines.extend(rest);
            }
            (_, other_kind) => {
                self.lines.extend(other.lines);
                self.kind = match (self.kind, other_kind) {
                    (RegisterKind::Block(a), RegisterKind::Block(b)) => RegisterKind::Block(a.max(b)),
                    (RegisterKind::Block(a), _) => RegisterKind::Block(a),
                    _ => RegisterKind::Line,
                };
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid register name: '{0}'")]
    Invalid(char),
    #[error("register '{0}' is read-only")]
    ReadOnly(char),
}

/// Whether `name` may be used as a register, for writing or reading.
pub fn is_valid_register(name: char, writing: bool) -> bool {
    name.is_ascii_alphanumeric()
        || matches!(name, '"' | '-' | '_')
        || (!writing && matches!(name, '.' | ':' | '/'))
}

/// Register storage consumed by the command engine.
pub trait RegisterStore {
    fn get_register(&self, name: char) -> Option<RegisterContent>;

    /// Write a register. Uppercase names append to their lowercase register.
    fn set_register(&mut self, name: char, content: RegisterContent) -> Result<(), RegisterError>;

    /// Write one of the read-only registers (`.`, `:`, `/`).
    fn set_read_only(&mut self, name: char, content: RegisterContent) -> Result<(), RegisterError>;

    /// Shift `1`..`8` into `2`..`9` and store `content` in `1`.
    fn rotate_numbered(&mut self, content: RegisterContent) -> Result<(), RegisterError> {
        for n in (1..9u32).rev() {
            let (Some(from), Some(to)) = (char::from_digit(n, 10), char::from_digit(n + 1, 10)) else {
                continue;
            };
            if let Some(c) = self.get_register(from) {
                self.set_register(to, c)?;
            }
        }
        self.set_register('1', content)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Registers {
    unnamed: Option<RegisterContent>,
    numbered: [Option<RegisterContent>; 10],
    small_delete: Option<RegisterContent>,
    named: [Option<RegisterContent>; 26],
    last_inserted: Option<RegisterContent>,
    last_command: Option<RegisterContent>,
    last_search: Option<RegisterContent>,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    fn named_index(c: char) -> Option<usize> {
        c.is_ascii_alphabetic()
            .then(|| (c.to_ascii_lowercase() as u8 - b'a') as usize)
    }

    /// Non-empty registers in display order, for `:registers`-style dumps.
    pub fn snapshot(&self) -> Vec<(char, RegisterContent)> {
        let names = std::iter::once('"')
            .chain('0'..='9')
            .chain(std::iter::once('-'))
            .chain('a'..='z')
            .chain(['.', ':', '/']);
        names
            .filter_map(|n| self.get_register(n).map(|c| (n, c)))
            .collect()
    }
}

impl RegisterStore for Registers {
    fn get_register(&self, name: char) -> Option<RegisterContent> {
        let slot = match name {
            '"' => &self.unnamed,
            '-' => &self.small_delete,
            '.' => &self.last_inserted,
            ':' => &self.last_command,
            '/' => &self.last_search,
            '0'..='9' => &self.numbered[name as usize - '0' as usize],
            c => match Self::named_index(c) {
                Some(i) => &self.named[i],
                None => return None,
            },
        };
        slot.clone()
    }

    fn set_register(&mut self, name: char, content: RegisterContent) -> Result<(), RegisterError> {
        trace!(target: "state.registers", register = %name, lines = content.lines.len(), kind = ?content.kind, "set_register");
        match name {
            '_' => {}
            '"' => self.unnamed = Some(content),
            '-' => self.small_delete = Some(content),
            '.' | ':' | '/' => return Err(RegisterError::ReadOnly(name)),
            '0'..='9' => self.numbered[name as usize - '0' as usize] = Some(content),
            c if c.is_ascii_uppercase() => {
                let slot = &mut self.named[(c as u8 - b'A') as usize];
                match slot {
                    Some(existing) => existing.append(content),
                    None => *slot = Some(content),
                }
            }
            c => match Self::named_index(c) {
                Some(i) => self.named[i] = Some(content),
                None => return Err(RegisterError::Invalid(c)),
            },
        }
        Ok(())
    }

    fn set_read_only(&mut self, name: char, content: RegisterContent) -> Result<(), RegisterError> {
        let slot = match name {
            '.' => &mut self.last_inserted,
            ':' => &mut self.last_command,
            '/' => &mut self.last_search,
            c => return Err(RegisterError::Invalid(c)),
        };
        *slot = Some(content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn uppercase_appends_charwise() {
        let mut r = Registers::new();
        r.set_register('a', RegisterContent::charwise("foo")).unwrap();
        r.set_register('A', RegisterContent::charwise("bar")).unwrap();
        assert_eq!(r.get_register('a').unwrap().text(), "foobar");
    }

    #[test]
    fn appending_lines_to_chars_becomes_linewise() {
        let mut r = Registers::new();
        r.set_register('q', RegisterContent::charwise("x")).unwrap();
        r.set_register('Q', RegisterContent::linewise(["y"])).unwrap();
        let c = r.get_register('q').unwrap();
        assert_eq!(c.kind, RegisterKind::Line);
        assert_eq!(c.lines, ["x", "y"]);
    }

    #[test]
    fn numbered_rotation_shifts_history() {
        let mut r = Registers::new();
        for t in ["one", "two", "three"] {
            r.rotate_numbered(RegisterContent::linewise([t])).unwrap();
        }
        assert_eq!(r.get_register('1').unwrap().lines, ["three"]);
        assert_eq!(r.get_register('3').unwrap().lines, ["one"]);
        for i in 0..10 {
            r.rotate_numbered(RegisterContent::linewise([i.to_string()])).unwrap();
        }
        assert_eq!(r.get_register('9').unwrap().lines, ["1"]);
    }

    #[test]
    fn black_hole_and_read_only() {
        let mut r = Registers::new();
        r.set_register('_', RegisterContent::charwise("gone")).unwrap();
        assert!(r.get_register('_').is_none());
        assert_eq!(
            r.set_register('.', RegisterContent::charwise("x")),
            Err(RegisterError::ReadOnly('.'))
        );
        r.set_read_only('.', RegisterContent::charwise("typed")).unwrap();
        assert_eq!(r.get_register('.').unwrap().text(), "typed");
    }

    #[test]
    fn validity() {
        assert!(is_valid_register('a', true));
        assert!(is_valid_register('"', true));
        assert!(!is_valid_register('.', true));
        assert!(is_valid_register('.', false));
        assert!(!is_valid_register('!', false));
    }

    #[test]
    fn snapshot_lists_non_empty_registers() {
        let mut r = Registers::new();
        r.set_register('"', RegisterContent::charwise("u")).unwrap();
        r.set_register('z', RegisterContent::charwise("z")).unwrap();
        let names: Vec<char> = r.snapshot().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, ['"', 'z']);
    }
}
