//! Callbacks into the embedding host.
//!
//! The engine calls these synchronously and continues with the answer. Every
//! method has a default so a headless host only implements what it cares
//! about; the engine falls back to buffer-only behavior where a default
//! returns `None` or `false`:
//! * `screen_line` -> the whole buffer is treated as the screen (`H M L`).
//! * `viewport_height` -> `EngineOptions::viewport_height`.
//! * `format_lines` -> internal paragraph formatting with `'textwidth'`.
//! * `toggle_comment` -> internal toggling with `'commentstring'`.
//! * `goto_definition` -> `gd`/`gD` search the buffer; `CTRL-]` fails.

use core_events::Key;
use core_text::Position;

use crate::state::MotionType;

/// Which definition lookup was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionScope {
    /// `gd`: local declaration.
    Local,
    /// `gD`: first occurrence in the file.
    Global,
    /// `CTRL-]`: tag lookup.
    Tag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionQuery<'a> {
    pub ident: &'a str,
    pub scope: DefinitionScope,
    pub cursor: Position,
}

/// Target of `H`, `M` and `L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenRow {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLineQuery {
    pub row: ScreenRow,
    /// Lines away from the top or bottom (`count - 1`).
    pub offset: usize,
    pub cursor: Position,
}

/// Where `zt`, `zz` and `zb` put the cursor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPlace {
    Top,
    Center,
    Bottom,
}

/// Argument for `g@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorFunctionCall {
    pub motion_type: MotionType,
    pub start: Position,
    pub end: Position,
}

/// `CTRL-W {count} {char}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCommand {
    pub key: Key,
    pub count: usize,
}

pub trait Host {
    fn bell(&mut self) {}

    fn message(&mut self, _text: &str) {}

    fn redraw(&mut self, _clear: bool) {}

    fn goto_definition(&mut self, _query: DefinitionQuery<'_>) -> Option<Position> {
        None
    }

    /// `CTRL-E` / `CTRL-Y`. Returns the cursor when scrolling moved it.
    fn scroll_lines(&mut self, _delta: isize, _cursor: Position) -> Option<Position> {
        None
    }

    /// `zh` / `zl`.
    fn scroll_columns(&mut self, _delta: isize) {}

    fn scroll_cursor_to(&mut self, _place: ScrollPlace, _line: usize) {}

    /// Buffer line shown at the requested screen row.
    fn screen_line(&mut self, _query: ScreenLineQuery) -> Option<usize> {
        None
    }

    fn viewport_height(&self) -> Option<usize> {
        None
    }

    fn viewport_width(&self) -> Option<usize> {
        None
    }

    /// `gq` with an external formatter: replacement lines for `lines`.
    fn format_lines(&mut self, _lines: &[String], _width: usize) -> Option<Vec<String>> {
        None
    }

    /// `gc`: replacement lines with comments toggled.
    fn toggle_comment(&mut self, _lines: &[String]) -> Option<Vec<String>> {
        None
    }

    /// `g@`. Returns false when no operator function is set.
    fn operator_function(&mut self, _call: OperatorFunctionCall) -> bool {
        false
    }

    /// Returns false for window commands the host does not know.
    fn window_command(&mut self, _cmd: WindowCommand) -> bool {
        false
    }

    /// Execute an Ex command line. `Ok(Some(pos))` moves the cursor.
    fn run_command_line(
        &mut self,
        line: &str,
        _cursor: Position,
        _line_count: usize,
    ) -> Result<Option<Position>, String> {
        Err(format!("not an editor command: {line}"))
    }
}

/// Host that accepts every callback and does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {}
