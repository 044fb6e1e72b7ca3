use core_text::{Buffer, Position};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use tracing::trace;

/// Maximum number of snapshots retained in undo history.
pub const UNDO_HISTORY_MAX: usize = 200;

/// Buffer contents plus the cursor to restore with them.
#[derive(Clone)]
pub struct EditSnapshot {
    pub buffer: Buffer,
    pub position: Position,
    pub hash: u64,
}

/// Snapshot based undo history.
///
/// Edits are grouped into steps. [`UndoEngine::sync`] opens a new step and
/// the first [`UndoEngine::save`] inside it captures the pre-edit buffer;
/// further saves in the same step are no-ops, so one command (including the
/// Insert session it may start) undoes as a unit.
pub struct UndoEngine {
    undo_stack: Vec<EditSnapshot>,
    redo_stack: Vec<EditSnapshot>,
    step_open: bool,
    snapshots_skipped: u64,
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoEngine {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            step_open: true,
            snapshots_skipped: 0,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn snapshots_skipped(&self) -> u64 {
        self.snapshots_skipped
    }

    /// Start a new undo step.
    pub fn sync(&mut self) {
        self.step_open = true;
    }

    /// Record the state before the first change of the current step.
    pub fn save(&mut self, cursor: Position, buffer: &Buffer) {
        if !self.step_open {
            return;
        }
        self.step_open = false;
        let current_hash = buffer_hash(buffer);
        if let Some(last) = self.undo_stack.last()
            && last.hash == current_hash
            && self.redo_stack.is_empty()
        {
            self.snapshots_skipped += 1;
            trace!(target: "state.undo", undo_depth = self.undo_stack.len(), hash = current_hash, "snapshot_dedupe_skip");
            return;
        }
        self.undo_stack.push(EditSnapshot {
            buffer: buffer.clone(),
            position: cursor,
            hash: current_hash,
        });
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), lines = buffer.line_count(), hash = current_hash, "push_snapshot");
        if self.undo_stack.len() > UNDO_HISTORY_MAX {
            self.undo_stack.remove(0);
            trace!(target: "state.undo", "undo_stack_trimmed");
        }
        if !self.redo_stack.is_empty() {
            self.redo_stack.clear();
            trace!(target: "state.undo", "redo_stack_cleared_on_new_edit");
        }
    }

    /// Swap the buffer with the newest undo snapshot. Returns the cursor to restore.
    pub fn undo(&mut self, cursor: Position, buffer: &mut Buffer) -> Option<Position> {
        let last = self.undo_stack.pop()?;
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "undo_pop");
        self.redo_stack.push(EditSnapshot {
            buffer: buffer.clone(),
            position: cursor,
            hash: buffer_hash(buffer),
        });
        *buffer = last.buffer;
        self.step_open = true;
        Some(last.position)
    }

    pub fn redo(&mut self, cursor: Position, buffer: &mut Buffer) -> Option<Position> {
        let next = self.redo_stack.pop()?;
        trace!(target: "state.undo", redo_depth = self.redo_stack.len(), undo_depth = self.undo_stack.len(), "redo_pop");
        self.undo_stack.push(EditSnapshot {
            buffer: buffer.clone(),
            position: cursor,
            hash: buffer_hash(buffer),
        });
        *buffer = next.buffer;
        self.step_open = true;
        Some(next.position)
    }
}

fn buffer_hash(buf: &Buffer) -> u64 {
    let mut h = DefaultHasher::new();
    for l in buf.lines() {
        h.write(l.as_bytes());
        h.write_u8(b'\n');
    }
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_snapshot_per_step() {
        let mut buf = Buffer::from_str("t", "a").unwrap();
        let mut u = UndoEngine::new();
        u.save(Position::origin(), &buf);
        buf.replace_line(0, "b").unwrap();
        u.save(Position::origin(), &buf);
        buf.replace_line(0, "c").unwrap();
        assert_eq!(u.undo_depth(), 1);
        u.sync();
        u.save(Position::origin(), &buf);
        buf.replace_line(0, "d").unwrap();
        assert_eq!(u.undo_depth(), 2);
        u.undo(Position::origin(), &mut buf).unwrap();
        assert_eq!(buf.line(0).unwrap(), "c");
        u.undo(Position::origin(), &mut buf).unwrap();
        assert_eq!(buf.line(0).unwrap(), "a");
        assert!(u.undo(Position::origin(), &mut buf).is_none());
        u.redo(Position::origin(), &mut buf).unwrap();
        assert_eq!(buf.line(0).unwrap(), "c");
    }

    #[test]
    fn new_edit_clears_redo() {
        let mut buf = Buffer::from_str("t", "a").unwrap();
        let mut u = UndoEngine::new();
        u.save(Position::origin(), &buf);
        buf.replace_line(0, "b").unwrap();
        u.undo(Position::origin(), &mut buf);
        assert_eq!(u.redo_depth(), 1);
        u.sync();
        u.save(Position::origin(), &buf);
        assert_eq!(u.redo_depth(), 0);
    }

    #[test]
    fn history_is_capped() {
        let mut buf = Buffer::from_str("t", "").unwrap();
        let mut u = UndoEngine::new();
        for i in 0..UNDO_HISTORY_MAX + 5 {
            u.sync();
            u.save(Position::origin(), &buf);
            buf.replace_line(0, &i.to_string()).unwrap();
        }
        assert_eq!(u.undo_depth(), UNDO_HISTORY_MAX);
    }
}
