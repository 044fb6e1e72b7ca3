//! Text and register services used by the command engine.
//!
//! The engine never touches a [`Buffer`] directly. It talks to a
//! [`TextStore`] (line edits plus undo) and a [`RegisterStore`]; this crate
//! defines both contracts and ships the concrete implementations used by the
//! editor model: [`EditorState`] and [`Registers`].
//!
//! Undo model:
//! - The engine calls [`TextStore::sync_undo`] when a new top-level command
//!   starts. The first [`TextStore::save_for_undo`] after that captures a
//!   snapshot, so every command (and the Insert session it may open) is one
//!   undo step.
//! - `U` restores the most recently changed line to its state before the
//!   changes on it began, and is itself undoable.

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use core_text::{Buffer, LineAccess, Position};
use thiserror::Error;
use tracing::{debug, trace};

mod line_ending;
pub mod registers;
pub mod undo;

pub use line_ending::{LineEnding, NormalizedText, normalize_line_endings};
pub use registers::{
    RegisterContent, RegisterError, RegisterKind, RegisterStore, Registers, is_valid_register,
};
pub use undo::{UNDO_HISTORY_MAX, UndoEngine};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextError {
    #[error("line {line} out of range (buffer has {count} lines)")]
    LineOutOfRange { line: usize, count: usize },
    #[error("cannot make changes, buffer is not modifiable")]
    NotModifiable,
}

/// Line-level text service with undo.
pub trait TextStore: LineAccess {
    /// Announce that lines in `range` are about to change.
    fn save_for_undo(&mut self, range: Range<usize>, cursor: Position) -> Result<(), TextError>;

    fn replace_line(&mut self, idx: usize, text: &str) -> Result<(), TextError>;

    /// Insert `text` as a new line with index `at` (`at == line_count` appends).
    fn insert_line(&mut self, at: usize, text: &str) -> Result<(), TextError>;

    /// Delete whole lines; deleting every line leaves one empty line.
    fn delete_lines(&mut self, range: Range<usize>) -> Result<(), TextError>;

    fn is_modifiable(&self) -> bool;

    /// Close the current undo step.
    fn sync_undo(&mut self);

    /// Undo one step; returns the cursor to restore.
    fn undo(&mut self, cursor: Position) -> Option<Position>;

    fn redo(&mut self, cursor: Position) -> Option<Position>;

    /// `U`: restore the last changed line.
    fn undo_line(&mut self, cursor: Position) -> Option<Position>;
}

#[derive(Debug, Clone)]
struct LineUndo {
    line: usize,
    text: String,
}

/// A buffer with snapshot undo: the store each view edits.
pub struct EditorState {
    buffer: Buffer,
    undo: UndoEngine,
    modifiable: bool,
    line_undo: Option<LineUndo>,
    pub file_name: Option<PathBuf>,
    pub original_line_ending: LineEnding,
    pub dirty: bool,
}

impl EditorState {
    pub fn new(buffer: Buffer) -> Self {
        Self {
            buffer,
            undo: UndoEngine::new(),
            modifiable: true,
            line_undo: None,
            file_name: None,
            original_line_ending: LineEnding::Lf,
            dirty: false,
        }
    }

    pub fn from_text(name: &str, text: &str) -> Result<Self> {
        let norm = normalize_line_endings(text);
        let buffer = Buffer::from_str(name, &norm.normalized)?;
        let mut st = Self::new(buffer);
        st.original_line_ending = norm.original;
        Ok(st)
    }

    /// Load a file, normalizing its line endings.
    pub fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("buffer");
        let mut st = Self::from_text(name, &content)?;
        st.file_name = Some(path.to_path_buf());
        debug!(target: "state", file = %path.display(), lines = st.buffer.line_count(), "buffer_opened");
        Ok(st)
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn set_modifiable(&mut self, modifiable: bool) {
        self.modifiable = modifiable;
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.undo.redo_depth()
    }

    /// Buffer text written back with the original line ending style.
    pub fn contents(&self) -> String {
        let text = self.buffer.contents();
        match self.original_line_ending {
            LineEnding::Lf => text,
            other => text.replace('\n', other.as_str()),
        }
    }

    fn check_line(&self, line: usize) -> Result<(), TextError> {
        let count = self.buffer.line_count();
        if line >= count {
            return Err(TextError::LineOutOfRange { line, count });
        }
        Ok(())
    }

    fn check_modifiable(&self) -> Result<(), TextError> {
        if self.modifiable {
            Ok(())
        } else {
            Err(TextError::NotModifiable)
        }
    }
}

impl LineAccess for EditorState {
    fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    fn line_text(&self, idx: usize) -> String {
        self.buffer.line(idx).unwrap_or_default()
    }

    fn line_len(&self, idx: usize) -> usize {
        self.buffer.line_byte_len(idx)
    }
}

impl TextStore for EditorState {
    fn save_for_undo(&mut self, range: Range<usize>, cursor: Position) -> Result<(), TextError> {
        self.check_modifiable()?;
        let count = self.buffer.line_count();
        if range.start > count {
            return Err(TextError::LineOutOfRange {
                line: range.start,
                count,
            });
        }
        self.undo.save(cursor, &self.buffer);
        if range.len() == 1 && self.line_undo.as_ref().is_none_or(|u| u.line != range.start) {
            self.line_undo = Some(LineUndo {
                line: range.start,
                text: self.line_text(range.start),
            });
        } else if range.len() != 1 {
            self.line_undo = None;
        }
        self.dirty = true;
        Ok(())
    }

    fn replace_line(&mut self, idx: usize, text: &str) -> Result<(), TextError> {
        self.check_modifiable()?;
        self.check_line(idx)?;
        trace!(target: "state.text", line = idx, "replace_line");
        self.buffer
            .replace_line(idx, text)
            .map_err(|_| TextError::LineOutOfRange {
                line: idx,
                count: self.buffer.line_count(),
            })
    }

    fn insert_line(&mut self, at: usize, text: &str) -> Result<(), TextError> {
        self.check_modifiable()?;
        let count = self.buffer.line_count();
        if at > count {
            return Err(TextError::LineOutOfRange { line: at, count });
        }
        trace!(target: "state.text", line = at, "insert_line");
        self.buffer
            .insert_line(at, text)
            .map_err(|_| TextError::LineOutOfRange { line: at, count })
    }

    fn delete_lines(&mut self, range: Range<usize>) -> Result<(), TextError> {
        self.check_modifiable()?;
        let count = self.buffer.line_count();
        if range.end > count || range.start > range.end {
            return Err(TextError::LineOutOfRange {
                line: range.end,
                count,
            });
        }
        trace!(target: "state.text", start = range.start, end = range.end, "delete_lines");
        self.buffer
            .delete_lines(range.clone())
            .map(|_| ())
            .map_err(|_| TextError::LineOutOfRange {
                line: range.end,
                count,
            })
    }

    fn is_modifiable(&self) -> bool {
        self.modifiable
    }

    fn sync_undo(&mut self) {
        self.undo.sync();
    }

    fn undo(&mut self, cursor: Position) -> Option<Position> {
        self.line_undo = None;
        self.undo.undo(cursor, &mut self.buffer)
    }

    fn redo(&mut self, cursor: Position) -> Option<Position> {
        self.line_undo = None;
        self.undo.redo(cursor, &mut self.buffer)
    }

    fn undo_line(&mut self, cursor: Position) -> Option<Position> {
        let saved = self.line_undo.clone()?;
        if saved.line >= self.buffer.line_count() || !self.modifiable {
            return None;
        }
        self.undo.sync();
        self.undo.save(cursor, &self.buffer);
        let current = self.line_text(saved.line);
        self.buffer.replace_line(saved.line, &saved.text).ok()?;
        self.line_undo = Some(LineUndo {
            line: saved.line,
            text: current,
        });
        self.undo.sync();
        Some(Position::new(saved.line, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn state(text: &str) -> EditorState {
        EditorState::from_text("t", text).unwrap()
    }

    #[test]
    fn edits_and_undo_step() {
        let mut st = state("one\ntwo");
        st.sync_undo();
        st.save_for_undo(0..1, Position::origin()).unwrap();
        st.replace_line(0, "ONE").unwrap();
        st.insert_line(2, "three").unwrap();
        assert_eq!(st.buffer().lines().collect::<Vec<_>>(), ["ONE", "two", "three"]);
        let cur = st.undo(Position::new(2, 0)).unwrap();
        assert_eq!(cur, Position::origin());
        assert_eq!(st.buffer().contents(), "one\ntwo");
        st.redo(Position::origin()).unwrap();
        assert_eq!(st.line_count(), 3);
    }

    #[test]
    fn not_modifiable_rejects_changes() {
        let mut st = state("x");
        st.set_modifiable(false);
        assert_eq!(
            st.save_for_undo(0..1, Position::origin()),
            Err(TextError::NotModifiable)
        );
        assert_eq!(st.replace_line(0, "y"), Err(TextError::NotModifiable));
    }

    #[test]
    fn out_of_range_is_reported() {
        let mut st = state("x");
        assert!(matches!(
            st.replace_line(4, "y"),
            Err(TextError::LineOutOfRange { line: 4, count: 1 })
        ));
        assert!(st.delete_lines(0..2).is_err());
    }

    #[test]
    fn undo_line_toggles() {
        let mut st = state("abc\nxyz");
        st.sync_undo();
        st.save_for_undo(0..1, Position::origin()).unwrap();
        st.replace_line(0, "ab").unwrap();
        st.sync_undo();
        st.save_for_undo(0..1, Position::origin()).unwrap();
        st.replace_line(0, "a").unwrap();
        st.undo_line(Position::origin()).unwrap();
        assert_eq!(st.line_text(0), "abc");
        st.undo_line(Position::origin()).unwrap();
        assert_eq!(st.line_text(0), "a");
    }

    #[test]
    fn open_normalizes_and_round_trips_crlf() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "a\r\nb\r\n").unwrap();
        let st = EditorState::open(f.path()).unwrap();
        assert_eq!(st.line_count(), 2);
        assert_eq!(st.line_text(1), "b");
        assert_eq!(st.contents(), "a\r\nb\r\n");
        assert!(st.file_name.is_some());
    }

    #[test]
    fn open_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EditorState::open(&dir.path().join("missing.txt")).is_err());
    }
}
