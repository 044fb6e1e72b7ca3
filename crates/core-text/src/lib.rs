//! Rope-based line buffer and pure text helpers.
//!
//! The buffer is line oriented: every line is stored newline terminated so
//! there is always at least one (possibly empty) line. Whether the loaded text
//! ended with a newline is remembered and restored by [`Buffer::contents`].
//!
//! Anything that only needs to read lines (motions, column math, text objects)
//! is written against [`LineAccess`] so it can run on the buffer or on any
//! store layered above it.

use std::ops::Range;

use anyhow::{Result, ensure};
use ropey::Rope;

pub mod column;
pub mod motion;
pub mod width;

pub use width::egc_width;

/// Read-only, line indexed view of text. Lines never include their newline.
pub trait LineAccess {
    fn line_count(&self) -> usize;

    /// Text of line `idx`; empty for an index past the end.
    fn line_text(&self, idx: usize) -> String;

    fn line_len(&self, idx: usize) -> usize {
        self.line_text(idx).len()
    }

    fn line_is_empty(&self, idx: usize) -> bool {
        self.line_len(idx) == 0
    }
}

/// A text buffer backed by a `ropey::Rope`.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
    trailing_newline: bool,
}

/// A position inside a buffer expressed as (line index, byte offset within that line).
///
/// `byte == line_len` is the position of the line's terminating NUL, which
/// only the Insert-like states and exclusive span ends may occupy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub byte: usize,
}

impl Position {
    pub fn new(line: usize, byte: usize) -> Self {
        Self { line, byte }
    }

    pub fn origin() -> Self {
        Self { line: 0, byte: 0 }
    }

    pub fn clamp_to<F>(&mut self, line_count: usize, mut line_len_fn: F)
    where
        F: FnMut(usize) -> usize,
    {
        if line_count == 0 {
            self.line = 0;
            self.byte = 0;
            return;
        }
        if self.line >= line_count {
            self.line = line_count - 1;
        }
        let max_len = line_len_fn(self.line);
        if self.byte > max_len {
            self.byte = max_len;
        }
    }
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice.
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self> {
        let trailing_newline = content.ends_with('\n');
        let mut rope = Rope::from_str(content);
        if !trailing_newline {
            rope.insert(rope.len_chars(), "\n");
        }
        Ok(Self {
            rope,
            name: name.into(),
            trailing_newline,
        })
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            rope: Rope::from_str("\n"),
            name: name.into(),
            trailing_newline: false,
        }
    }

    /// Total number of lines in the buffer (at least one).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines().saturating_sub(1).max(1)
    }

    /// Return the requested line without its newline.
    pub fn line(&self, idx: usize) -> Option<String> {
        if idx >= self.line_count() {
            return None;
        }
        let mut s = self.rope.line(idx).to_string();
        if s.ends_with('\n') {
            s.pop();
        }
        Some(s)
    }

    /// Byte length of a line (excluding the newline).
    pub fn line_byte_len(&self, idx: usize) -> usize {
        if idx >= self.line_count() {
            return 0;
        }
        self.rope.line(idx).len_bytes().saturating_sub(1)
    }

    pub fn has_trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// Iterate line contents.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.line_count()).filter_map(|i| self.line(i))
    }

    /// Full text, restoring the trailing newline state of the loaded content.
    pub fn contents(&self) -> String {
        let mut s = self.rope.to_string();
        if !self.trailing_newline && s.ends_with('\n') {
            s.pop();
        }
        s
    }

    /// Replace the content of line `idx`.
    pub fn replace_line(&mut self, idx: usize, text: &str) -> Result<()> {
        ensure!(idx < self.line_count(), "line {idx} out of range");
        ensure!(!text.contains('\n'), "line text may not contain a newline");
        let start = self.rope.line_to_char(idx);
        let end = self.rope.line_to_char(idx + 1) - 1;
        self.rope.remove(start..end);
        self.rope.insert(start, text);
        Ok(())
    }

    /// Insert a new line so that it becomes line `at`.
    pub fn insert_line(&mut self, at: usize, text: &str) -> Result<()> {
        ensure!(at <= self.line_count(), "insert position {at} out of range");
        ensure!(!text.contains('\n'), "line text may not contain a newline");
        let char_idx = self.rope.line_to_char(at);
        self.rope.insert(char_idx, &format!("{text}\n"));
        Ok(())
    }

    /// Remove whole lines, returning their text. Removing every line leaves a
    /// single empty line behind.
    pub fn delete_lines(&mut self, range: Range<usize>) -> Result<Vec<String>> {
        let count = self.line_count();
        ensure!(
            range.start <= range.end && range.end <= count,
            "line range {range:?} out of range"
        );
        let removed: Vec<String> = range.clone().filter_map(|i| self.line(i)).collect();
        let start = self.rope.line_to_char(range.start);
        let end = self.rope.line_to_char(range.end);
        self.rope.remove(start..end);
        if self.rope.len_chars() == 0 {
            self.rope.insert(0, "\n");
        }
        Ok(removed)
    }
}

impl LineAccess for Buffer {
    fn line_count(&self) -> usize {
        Buffer::line_count(self)
    }

    fn line_text(&self, idx: usize) -> String {
        self.line(idx).unwrap_or_default()
    }

    fn line_len(&self, idx: usize) -> usize {
        self.line_byte_len(idx)
    }
}

impl LineAccess for [String] {
    fn line_count(&self) -> usize {
        self.len().max(1)
    }

    fn line_text(&self, idx: usize) -> String {
        self.get(idx).cloned().unwrap_or_default()
    }
}

/// Grapheme helpers operating on a single line.
pub mod grapheme {
    use crate::egc_width;
    use unicode_segmentation::UnicodeSegmentation;

    /// Iterate grapheme clusters in a line.
    pub fn iter(line: &str) -> impl Iterator<Item = &str> {
        line.graphemes(true)
    }

    /// Previous grapheme boundary (returns 0 if already at or below 1st boundary).
    pub fn prev_boundary(line: &str, byte: usize) -> usize {
        if byte == 0 || byte > line.len() {
            return 0;
        }
        let mut last = 0;
        for (idx, _) in line.grapheme_indices(true) {
            if idx >= byte {
                break;
            }
            last = idx;
        }
        last
    }

    /// Next grapheme boundary (returns line.len() if at or beyond end).
    pub fn next_boundary(line: &str, byte: usize) -> usize {
        if byte >= line.len() {
            return line.len();
        }
        for (idx, _) in line.grapheme_indices(true) {
            if idx > byte {
                return idx;
            }
        }
        line.len()
    }

    /// Start of the cluster containing `byte`.
    pub fn floor_boundary(line: &str, byte: usize) -> usize {
        if byte >= line.len() {
            return line.len();
        }
        let mut last = 0;
        for (idx, _) in line.grapheme_indices(true) {
            if idx > byte {
                break;
            }
            last = idx;
        }
        last
    }

    /// Cluster starting at `byte`, empty at or past the end.
    pub fn cluster_at(line: &str, byte: usize) -> &str {
        if byte >= line.len() {
            return "";
        }
        &line[byte..next_boundary(line, byte)]
    }

    /// First scalar of the cluster at `byte`.
    pub fn char_at(line: &str, byte: usize) -> Option<char> {
        line.get(byte..).and_then(|s| s.chars().next())
    }

    /// Byte offset of the last cluster, or 0 for an empty line.
    pub fn last_start(line: &str) -> usize {
        prev_boundary(line, line.len())
    }

    /// Compute visual column (terminal cells) up to (but not including) byte offset.
    pub fn visual_col(line: &str, byte: usize) -> usize {
        let mut col = 0;
        for (idx, g) in line.grapheme_indices(true) {
            if idx >= byte {
                break;
            }
            col += egc_width(g) as usize;
        }
        col
    }

    /// Width in terminal cells of this grapheme cluster.
    pub fn cluster_width(g: &str) -> usize {
        egc_width(g) as usize
    }

    /// Word character: alphanumeric or underscore.
    pub fn is_word(g: &str) -> bool {
        g.chars()
            .next()
            .map(|c| c == '_' || c.is_alphanumeric())
            .unwrap_or(false)
    }

    pub fn is_blank(c: char) -> bool {
        c == ' ' || c == '\t'
    }

    /// Combining character that attaches to the preceding one.
    pub fn is_composing(c: char) -> bool {
        unicode_normalization::char::is_combining_mark(c)
    }
}

#[cfg(test)]
mod tests {
    use super::grapheme;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn create_buffer_and_read_line() {
        let b = Buffer::from_str("test", "hello\nworld").unwrap();
        assert_eq!(b.line_count(), 2);
        assert_eq!(b.line(0).unwrap(), "hello");
        assert_eq!(b.line(1).unwrap(), "world");
        assert_eq!(b.line(2), None);
        assert_eq!(b.contents(), "hello\nworld");
    }

    #[test]
    fn trailing_newline_is_not_an_extra_line() {
        let b = Buffer::from_str("t", "a\nb\n").unwrap();
        assert_eq!(b.line_count(), 2);
        assert_eq!(b.contents(), "a\nb\n");
        let e = Buffer::from_str("t", "").unwrap();
        assert_eq!(e.line_count(), 1);
        assert_eq!(e.line(0).unwrap(), "");
    }

    #[test]
    fn replace_insert_delete_lines() {
        let mut b = Buffer::from_str("t", "one\ntwo\nthree").unwrap();
        b.replace_line(1, "TWO").unwrap();
        b.insert_line(0, "zero").unwrap();
        b.insert_line(4, "four").unwrap();
        assert_eq!(b.lines().collect::<Vec<_>>(), ["zero", "one", "TWO", "three", "four"]);
        let gone = b.delete_lines(1..3).unwrap();
        assert_eq!(gone, ["one", "TWO"]);
        assert_eq!(b.lines().collect::<Vec<_>>(), ["zero", "three", "four"]);
    }

    #[test]
    fn deleting_every_line_leaves_one_empty_line() {
        let mut b = Buffer::from_str("t", "a\nb").unwrap();
        b.delete_lines(0..2).unwrap();
        assert_eq!(b.line_count(), 1);
        assert_eq!(b.line(0).unwrap(), "");
    }

    #[test]
    fn out_of_range_edits_fail() {
        let mut b = Buffer::from_str("t", "a").unwrap();
        assert!(b.replace_line(3, "x").is_err());
        assert!(b.insert_line(5, "x").is_err());
        assert!(b.delete_lines(0..4).is_err());
        assert!(b.replace_line(0, "x\ny").is_err());
    }

    #[test]
    fn grapheme_combining_mark() {
        let s = "e\u{301}x";
        let nb = grapheme::next_boundary(s, 0);
        assert_eq!(nb, 3);
        assert_eq!(grapheme::prev_boundary(s, nb), 0);
        assert_eq!(grapheme::floor_boundary(s, 1), 0);
        assert!(grapheme::is_composing('\u{301}'));
        assert!(!grapheme::is_composing('e'));
    }

    #[test]
    fn grapheme_cjk() {
        let s = "漢字";
        let first = grapheme::next_boundary(s, 0);
        let second = grapheme::next_boundary(s, first);
        assert_eq!(second, s.len());
        assert_eq!(grapheme::prev_boundary(s, second), first);
        assert_eq!(grapheme::visual_col(s, second), 4);
    }

    #[test]
    fn cluster_lookup() {
        let s = "ab";
        assert_eq!(grapheme::cluster_at(s, 1), "b");
        assert_eq!(grapheme::cluster_at(s, 2), "");
        assert_eq!(grapheme::last_start(s), 1);
        assert_eq!(grapheme::last_start(""), 0);
    }

    #[test]
    fn slice_line_access() {
        let lines = vec!["x".to_string(), "yy".to_string()];
        assert_eq!(lines.as_slice().line_count(), 2);
        assert_eq!(lines.as_slice().line_len(1), 2);
        assert_eq!(lines.as_slice().line_text(9), "");
    }
}
