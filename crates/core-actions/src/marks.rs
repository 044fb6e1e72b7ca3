//! Marks and the jump list.

use std::collections::HashMap;

use core_text::Position;
use tracing::trace;

const JUMPLIST_MAX: usize = 100;

#[derive(Debug, Default, Clone)]
pub struct Marks {
    named: HashMap<char, Position>,
    /// `''` / ``` `` ```: position before the latest jump.
    pcmark: Option<Position>,
    /// `'[` and `']`: last changed or yanked text.
    pub change_start: Option<Position>,
    pub change_end: Option<Position>,
    /// `'<` and `'>`.
    pub visual_start: Option<Position>,
    pub visual_end: Option<Position>,
    /// `'.`: last change.
    pub last_change: Option<Position>,
    /// `'^`: where Insert mode was last left.
    pub last_insert: Option<Position>,
    jumps: Vec<Position>,
    jump_idx: usize,
}

impl Marks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `m{c}`. Returns false for names that cannot be set.
    pub fn set(&mut self, name: char, pos: Position) -> bool {
        match name {
            'a'..='z' | 'A'..='Z' => {
                self.named.insert(name, pos);
            }
            '\'' | '`' => self.set_pcmark(pos),
            '[' => self.change_start = Some(pos),
            ']' => self.change_end = Some(pos),
            '<' => self.visual_start = Some(pos),
            '>' => self.visual_end = Some(pos),
            _ => return false,
        }
        trace!(target: "engine.marks", mark = %name, line = pos.line, byte = pos.byte, "mark_set");
        true
    }

    pub fn get(&self, name: char) -> Option<Position> {
        match name {
            'a'..='z' | 'A'..='Z' => self.named.get(&name).copied(),
            '\'' | '`' => self.pcmark,
            '[' => self.change_start,
            ']' => self.change_end,
            '<' => self.visual_start,
            '>' => self.visual_end,
            '.' => self.last_change,
            '^' => self.last_insert,
            _ => None,
        }
    }

    /// Remember `pos` before a jump: it becomes `''` and the newest jump
    /// list entry.
    pub fn set_pcmark(&mut self, pos: Position) {
        self.pcmark = Some(pos);
        self.jumps.retain(|p| p.line != pos.line);
        self.jumps.push(pos);
        if self.jumps.len() > JUMPLIST_MAX {
            self.jumps.remove(0);
        }
        self.jump_idx = self.jumps.len();
    }

    /// `CTRL-O` (negative `count`) and `CTRL-I`.
    pub fn jump(&mut self, count: isize, cursor: Position) -> Option<Position> {
        if self.jumps.is_empty() {
            return None;
        }
        if self.jump_idx == self.jumps.len() && count < 0 {
            self.set_pcmark(cursor);
            self.jump_idx = self.jumps.len() - 1;
        }
        let target = self.jump_idx as isize + count;
        if target < 0 || target as usize >= self.jumps.len() {
            return None;
        }
        self.jump_idx = target as usize;
        Some(self.jumps[self.jump_idx])
    }

    /// Shift marks after `removed` lines starting at `line` were deleted
    /// (negative) or inserted (positive).
    pub fn adjust(&mut self, line: usize, delta: isize) {
        let fix = |p: &mut Position| {
            if p.line < line {
                return;
            }
            if delta < 0 {
                let gone = delta.unsigned_abs();
                p.line = if p.line < line + gone { line } else { p.line - gone };
            } else {
                p.line += delta as usize;
            }
        };
        self.named.values_mut().for_each(fix);
        self.jumps.iter_mut().for_each(fix);
        for slot in [
            &mut self.pcmark,
            &mut self.change_start,
            &mut self.change_end,
            &mut self.visual_start,
            &mut self.visual_end,
            &mut self.last_change,
            &mut self.last_insert,
        ] {
            if let Some(p) = slot.as_mut() {
                fix(p);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_and_special_marks() {
        let mut m = Marks::new();
        assert!(m.set('a', Position::new(3, 1)));
        assert!(!m.set('!', Position::origin()));
        assert_eq!(m.get('a'), Some(Position::new(3, 1)));
        assert_eq!(m.get('b'), None);
        m.set_pcmark(Position::new(7, 0));
        assert_eq!(m.get('\''), Some(Position::new(7, 0)));
    }

    #[test]
    fn jump_back_and_forward() {
        let mut m = Marks::new();
        m.set_pcmark(Position::new(1, 0));
        m.set_pcmark(Position::new(5, 0));
        let back = m.jump(-1, Position::new(9, 0)).unwrap();
        assert_eq!(back, Position::new(5, 0));
        assert_eq!(m.jump(-1, back), Some(Position::new(1, 0)));
        assert_eq!(m.jump(-1, Position::origin()), None);
        assert_eq!(m.jump(2, Position::origin()), Some(Position::new(9, 0)));
    }

    #[test]
    fn deleting_lines_moves_marks_up() {
        let mut m = Marks::new();
        m.set('a', Position::new(10, 2));
        m.set('b', Position::new(4, 0));
        m.set('c', Position::new(2, 0));
        m.adjust(3, -3);
        assert_eq!(m.get('a'), Some(Position::new(7, 2)));
        assert_eq!(m.get('b'), Some(Position::new(3, 0)));
        assert_eq!(m.get('c'), Some(Position::new(2, 0)));
        m.adjust(0, 2);
        assert_eq!(m.get('c'), Some(Position::new(4, 0)));
    }
}
