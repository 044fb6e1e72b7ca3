//! The headless host the model lends to each engine call.
//!
//! It answers screen questions from the active view's viewport, collects
//! bells and messages, queues window commands for the model to apply once
//! the engine returns, and understands a handful of Ex commands.

use core_actions::{Host, OperatorFunctionCall, ScreenLineQuery, ScreenRow, ScrollPlace, WindowCommand};
use core_text::Position;
use tracing::{debug, trace};

/// `CTRL-W` commands the model knows how to apply.
const WINDOW_KEYS: &str = "wWjkptbnsvcqo";

#[derive(Debug)]
pub struct SessionHost {
    pub bells: usize,
    pub messages: Vec<String>,
    /// Calls made through `g@` while an operator function is set.
    pub opfunc_calls: Vec<(String, OperatorFunctionCall)>,
    opfunc: Option<String>,
    pub(crate) window_requests: Vec<WindowCommand>,
    pub(crate) viewport_first_line: usize,
    pub(crate) left_column: usize,
    pub(crate) line_count: usize,
    height: usize,
    width: usize,
}

impl SessionHost {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            bells: 0,
            messages: Vec::new(),
            opfunc_calls: Vec::new(),
            opfunc: None,
            window_requests: Vec::new(),
            viewport_first_line: 0,
            left_column: 0,
            line_count: 1,
            height: height.max(1),
            width: width.max(1),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    fn last_visible(&self) -> usize {
        let last = self.line_count.saturating_sub(1);
        (self.viewport_first_line + self.height - 1).min(last)
    }

    fn set_first(&mut self, first: usize) {
        self.viewport_first_line = first.min(self.line_count.saturating_sub(1));
        trace!(target: "model.session", first = self.viewport_first_line, "viewport_moved");
    }
}

impl Host for SessionHost {
    fn bell(&mut self) {
        self.bells += 1;
        trace!(target: "model.session", "bell");
    }

    fn message(&mut self, text: &str) {
        debug!(target: "model.session", text, "message");
        self.messages.push(text.to_string());
    }

    fn scroll_lines(&mut self, delta: isize, cursor: Position) -> Option<Position> {
        let first = self.viewport_first_line.saturating_add_signed(delta);
        self.set_first(first);
        let (top, bottom) = (self.viewport_first_line, self.last_visible());
        let line = cursor.line.clamp(top, bottom);
        (line != cursor.line).then(|| Position::new(line, cursor.byte))
    }

    fn scroll_columns(&mut self, delta: isize) {
        self.left_column = self.left_column.saturating_add_signed(delta);
    }

    fn scroll_cursor_to(&mut self, place: ScrollPlace, line: usize) {
        let first = match place {
            ScrollPlace::Top => line,
            ScrollPlace::Center => line.saturating_sub(self.height / 2),
            ScrollPlace::Bottom => (line + 1).saturating_sub(self.height),
        };
        self.set_first(first);
    }

    fn screen_line(&mut self, query: ScreenLineQuery) -> Option<usize> {
        let (top, bottom) = (self.viewport_first_line, self.last_visible());
        Some(match query.row {
            ScreenRow::Top => (top + query.offset).min(bottom),
            ScreenRow::Middle => top + (bottom - top) / 2,
            ScreenRow::Bottom => bottom.saturating_sub(query.offset).max(top),
        })
    }

    fn viewport_height(&self) -> Option<usize> {
        Some(self.height)
    }

    fn viewport_width(&self) -> Option<usize> {
        Some(self.width)
    }

    fn operator_function(&mut self, call: OperatorFunctionCall) -> bool {
        let Some(name) = self.opfunc.clone() else {
            return false;
        };
        debug!(target: "model.session", function = %name, ?call, "operator_function");
        self.opfunc_calls.push((name, call));
        true
    }

    fn window_command(&mut self, cmd: WindowCommand) -> bool {
        let known = cmd.key.as_char().is_some_and(|c| WINDOW_KEYS.contains(c));
        if known {
            self.window_requests.push(cmd);
        }
        known
    }

    fn run_command_line(&mut self, line: &str, _cursor: Position, line_count: usize) -> Result<Option<Position>, String> {
        let cmd = line.trim_start_matches([':', ' ']).trim_end();
        let last = line_count.saturating_sub(1);
        debug!(target: "model.session", command = cmd, "ex_command");
        if cmd.is_empty() {
            return Ok(None);
        }
        if cmd == "$" {
            return Ok(Some(Position::new(last, 0)));
        }
        if let Ok(n) = cmd.parse::<usize>() {
            return Ok(Some(Position::new(n.saturating_sub(1).min(last), 0)));
        }
        if let Some(text) = cmd.strip_prefix("echo ") {
            self.message(text.trim_matches('"'));
            return Ok(None);
        }
        if let Some(name) = cmd
            .strip_prefix("set operatorfunc=")
            .or_else(|| cmd.strip_prefix("set opfunc="))
        {
            self.opfunc = (!name.is_empty()).then(|| name.to_string());
            return Ok(None);
        }
        if matches!(cmd, "noh" | "nohlsearch") {
            return Ok(None);
        }
        Err(format!("E492: Not an editor command: {cmd}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn host(lines: usize) -> SessionHost {
        let mut h = SessionHost::new(5, 40);
        h.line_count = lines;
        h
    }

    #[test]
    fn screen_rows_follow_the_viewport() {
        let mut h = host(20);
        h.viewport_first_line = 10;
        let q = |row, offset| ScreenLineQuery { row, offset, cursor: Position::origin() };
        assert_eq!(h.screen_line(q(ScreenRow::Top, 0)), Some(10));
        assert_eq!(h.screen_line(q(ScreenRow::Middle, 0)), Some(12));
        assert_eq!(h.screen_line(q(ScreenRow::Bottom, 1)), Some(13));
        assert_eq!(h.screen_line(q(ScreenRow::Top, 9)), Some(14));
    }

    #[test]
    fn short_buffer_bottom_row_is_last_line() {
        let mut h = host(3);
        let q = ScreenLineQuery { row: ScreenRow::Bottom, offset: 0, cursor: Position::origin() };
        assert_eq!(h.screen_line(q), Some(2));
    }

    #[test]
    fn scrolling_drags_the_cursor_into_view() {
        let mut h = host(20);
        assert_eq!(h.scroll_lines(3, Position::new(1, 2)), Some(Position::new(3, 2)));
        assert_eq!(h.viewport_first_line, 3);
        assert_eq!(h.scroll_lines(-1, Position::new(3, 0)), None);
        assert_eq!(h.scroll_lines(-10, Position::new(3, 0)), None);
        assert_eq!(h.viewport_first_line, 0);
    }

    #[test]
    fn zt_zz_zb_place_the_line() {
        let mut h = host(50);
        h.scroll_cursor_to(ScrollPlace::Top, 20);
        assert_eq!(h.viewport_first_line, 20);
        h.scroll_cursor_to(ScrollPlace::Center, 20);
        assert_eq!(h.viewport_first_line, 18);
        h.scroll_cursor_to(ScrollPlace::Bottom, 20);
        assert_eq!(h.viewport_first_line, 16);
    }

    #[test]
    fn ex_commands() {
        let mut h = host(10);
        assert_eq!(h.run_command_line("4", Position::origin(), 10), Ok(Some(Position::new(3, 0))));
        assert_eq!(h.run_command_line("99", Position::origin(), 10), Ok(Some(Position::new(9, 0))));
        assert_eq!(h.run_command_line("$", Position::origin(), 10), Ok(Some(Position::new(9, 0))));
        assert_eq!(h.run_command_line("echo \"hi\"", Position::origin(), 10), Ok(None));
        assert_eq!(h.messages, vec!["hi".to_string()]);
        assert_eq!(
            h.run_command_line("frob", Position::origin(), 10),
            Err("E492: Not an editor command: frob".to_string())
        );
    }

    #[test]
    fn unknown_window_keys_are_refused() {
        let mut h = host(1);
        assert!(!h.window_command(WindowCommand { key: core_events::Key::from_char('z'), count: 0 }));
        assert!(h.window_command(WindowCommand { key: core_events::Key::from_char('w'), count: 0 }));
        assert_eq!(h.window_requests.len(), 1);
    }
}
