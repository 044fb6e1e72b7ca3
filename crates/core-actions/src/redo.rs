//! Redo buffer for `.`.
//!
//! The last change is kept as the keys that would type it again. Layout:
//! an optional `"x`, an optional `v` marker (the change was a Visual
//! operation; the selection is rebuilt from [`crate::state::RedoVisual`]),
//! the count digits, then the command keys and any inserted text ending
//! with `<Esc>`.

use core_events::Key;
use tracing::trace;

#[derive(Debug, Default, Clone)]
pub struct RedoBuffer {
    keys: Vec<Key>,
    /// Previous contents, restored by [`RedoBuffer::cancel`].
    old: Vec<Key>,
}

/// What `.` feeds back into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub keys: Vec<Key>,
    /// Re-create the Visual selection before running `keys`.
    pub visual: bool,
}

impl RedoBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start recording a new change.
    pub fn reset(&mut self) {
        self.old = std::mem::take(&mut self.keys);
    }

    /// Drop the change being recorded and restore the previous one.
    pub fn cancel(&mut self) {
        self.keys = std::mem::take(&mut self.old);
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn append_key(&mut self, key: Key) {
        self.keys.push(key);
    }

    pub fn append(&mut self, keys: &[Key]) {
        self.keys.extend_from_slice(keys);
    }

    pub fn append_str(&mut self, s: &str) {
        self.keys.extend(s.chars().map(Key::from_char));
    }

    pub fn append_number(&mut self, n: usize) {
        self.append_str(&n.to_string());
    }

    /// Record a command: `"reg`, count, then the non-NUL keys.
    pub fn prep(&mut self, regname: Option<char>, count: usize, cmds: &[Key]) {
        self.reset();
        if let Some(r) = regname {
            self.append_key(Key::from_char('"'));
            self.append_key(Key::from_char(r));
        }
        if count > 0 {
            self.append_number(count);
        }
        for &k in cmds {
            if k != Key::NUL {
                self.append_key(k);
            }
        }
        trace!(target: "engine.redo", keys = %core_events::format_keys(&self.keys), "redo_prepared");
    }

    /// Keys for `.`. A `count` replaces the recorded count; a numbered
    /// register `"1`..`"8` advances to the next one. Executing the replay
    /// records it again, so repeated `.` walks the delete history.
    pub fn replay(&self, count: Option<usize>) -> Option<Replay> {
        if self.keys.is_empty() {
            return None;
        }
        let mut out = Vec::with_capacity(self.keys.len() + 4);
        let mut rest = &self.keys[..];
        if rest.len() >= 2 && rest[0] == Key::from_char('"') {
            let mut reg = rest[1];
            if let Some(d) = reg.digit()
                && (1..9).contains(&d)
                && let Some(next) = char::from_digit(d + 1, 10)
            {
                reg = Key::from_char(next);
            }
            out.push(rest[0]);
            out.push(reg);
            rest = &self.keys[2..];
        }
        let visual = rest.first() == Some(&Key::from_char('v'));
        if visual {
            rest = &rest[1..];
        }
        let digits = rest.iter().take_while(|k| k.digit().is_some()).count();
        match count {
            Some(n) => out.extend(n.to_string().chars().map(Key::from_char)),
            None => out.extend_from_slice(&rest[..digits]),
        }
        out.extend_from_slice(&rest[digits..]);
        trace!(target: "engine.redo", keys = %core_events::format_keys(&out), visual, "redo_replay");
        Some(Replay { keys: out, visual })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::parse_keys;
    use pretty_assertions::assert_eq;

    fn keys(s: &str) -> Vec<Key> {
        parse_keys(s).unwrap()
    }

    #[test]
    fn count_is_replaced() {
        let mut r = RedoBuffer::new();
        r.prep(None, 2, &keys("dw"));
        assert_eq!(r.replay(None).unwrap().keys, keys("2dw"));
        assert_eq!(r.replay(Some(5)).unwrap().keys, keys("5dw"));
    }

    #[test]
    fn cancel_restores_previous_change() {
        let mut r = RedoBuffer::new();
        r.prep(None, 0, &keys("x"));
        r.prep(Some('a'), 0, &keys("dd"));
        r.cancel();
        assert_eq!(r.keys(), keys("x").as_slice());
    }

    #[test]
    fn numbered_register_advances() {
        let mut r = RedoBuffer::new();
        r.prep(Some('1'), 0, &keys("p"));
        assert_eq!(r.replay(None).unwrap().keys, keys("\"2p"));
        r.prep(Some('8'), 0, &keys("p"));
        assert_eq!(r.replay(None).unwrap().keys, keys("\"9p"));
        r.prep(Some('9'), 0, &keys("p"));
        assert_eq!(r.replay(None).unwrap().keys, keys("\"9p"));
    }

    #[test]
    fn visual_marker_is_stripped() {
        let mut r = RedoBuffer::new();
        r.prep(None, 0, &keys("v>"));
        let replay = r.replay(Some(3)).unwrap();
        assert!(replay.visual);
        assert_eq!(replay.keys, keys("3>"));
    }

    #[test]
    fn inserted_text_is_kept() {
        let mut r = RedoBuffer::new();
        r.prep(None, 0, &keys("cw"));
        r.append(&keys("new<Esc>"));
        assert_eq!(r.replay(None).unwrap().keys, keys("cwnew<Esc>"));
        assert!(RedoBuffer::new().replay(None).is_none());
    }
}
