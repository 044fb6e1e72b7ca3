//! The editor model: several views sharing one register set.
//!
//! Each [`View`] owns an [`Engine`](core_actions::Engine) and the text it
//! edits. Registers are process-wide, so a yank in one view can be put in
//! another. [`EditorModel::feed`] hands keys to the active view one at a
//! time, runs Insert and command-line sub-modes from the keys that follow,
//! and applies `CTRL-W` commands between keys so the next key already goes to
//! the newly focused view.
//!
//! Keys an engine generates for itself (an executed register, `.`) stay in
//! that engine; a `CTRL-W` inside a macro switches views only after the
//! macro finishes.

use std::path::Path;

use anyhow::{Context, Result};
use core_actions::{DispatchStatus, EngineContext, Host, WindowCommand};
use core_config::EngineOptions;
use core_events::{Key, parse_keys};
use core_state::{EditorState, Registers};
use core_text::LineAccess;
use tracing::{debug, info, warn};

mod session;
mod view;

pub use session::SessionHost;
pub use view::{View, ViewId, ViewManager, compute_scroll_intent};

/// Lines kept between the cursor and the viewport edge.
const SCROLL_MARGIN: usize = 0;

pub struct EditorModel {
    views: ViewManager,
    registers: Registers,
    host: SessionHost,
    options: EngineOptions,
}

impl EditorModel {
    pub fn new(text: EditorState, options: EngineOptions) -> Self {
        let host = SessionHost::new(options.viewport_height, 80);
        Self {
            views: ViewManager::new(text, options.clone()),
            registers: Registers::new(),
            host,
            options,
        }
    }

    pub fn open(path: &Path, options: EngineOptions) -> Result<Self> {
        let text = EditorState::open(path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Self::new(text, options))
    }

    pub fn views(&self) -> &ViewManager {
        &self.views
    }

    pub fn active(&self) -> &View {
        self.views.active()
    }

    pub fn active_mut(&mut self) -> &mut View {
        self.views.active_mut()
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn host(&self) -> &SessionHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut SessionHost {
        &mut self.host
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// New options for every view.
    pub fn set_options(&mut self, options: EngineOptions) {
        for view in self.views.iter_mut() {
            view.engine.set_options(options.clone());
        }
        self.options = options;
    }

    /// Feed keys in key notation (`"d2w<Esc>"`).
    pub fn feed_notation(&mut self, script: &str) -> Result<DispatchStatus> {
        let keys = parse_keys(script).with_context(|| format!("parsing key script {script:?}"))?;
        Ok(self.feed(&keys))
    }

    /// Feed keys as if typed. Returns the status after the last key.
    pub fn feed(&mut self, keys: &[Key]) -> DispatchStatus {
        let mut status = DispatchStatus::Complete;
        for &key in keys {
            status = self.feed_key(key);
        }
        status
    }

    fn feed_key(&mut self, key: Key) -> DispatchStatus {
        let height = self.host.height();
        let view = self.views.active_mut();
        self.host.viewport_first_line = view.viewport_first_line;
        self.host.line_count = view.text.line_count();
        let mut cx = EngineContext {
            text: &mut view.text,
            registers: &mut self.registers,
            host: &mut self.host,
        };
        let mut status = view.engine.feed(&mut cx, key);
        while let DispatchStatus::EnteredSubMode(request) = &status {
            let token = request.token;
            // Waits for more keys until the sub-mode's terminating key arrives.
            let Some(outcome) = view.engine.complete_from_queue() else {
                break;
            };
            match view.engine.resume(&mut cx, token, outcome) {
                Ok(next) => status = next,
                Err(e) => {
                    warn!(target: "model.session", error = %e, "resume_failed");
                    break;
                }
            }
        }
        view.viewport_first_line = self.host.viewport_first_line;
        view.auto_scroll(height, SCROLL_MARGIN);
        if let DispatchStatus::Aborted(err) = &status {
            debug!(target: "model.session", view = view.id.0, error = %err, "command_aborted");
        }
        self.apply_window_commands();
        status
    }

    fn apply_window_commands(&mut self) {
        for cmd in std::mem::take(&mut self.host.window_requests) {
            self.apply_window_command(cmd);
        }
    }

    fn apply_window_command(&mut self, cmd: WindowCommand) {
        let Some(c) = cmd.key.as_char() else {
            return;
        };
        let last = self.views.len() - 1;
        let active = self.views.active_index();
        let n = cmd.count.max(1);
        match c {
            'w' | 'W' if cmd.count > 0 => self.views.focus(cmd.count - 1),
            'w' => self.views.cycle(1),
            'W' => self.views.cycle(-1),
            'j' => self.views.focus((active + n).min(last)),
            'k' => self.views.focus(active.saturating_sub(n)),
            't' => self.views.focus(0),
            'b' => self.views.focus(last),
            'p' => {
                if !self.views.focus_previous() {
                    self.host.bell();
                }
            }
            'n' => {
                let text = EditorState::new(core_text::Buffer::empty("[No Name]"));
                self.views.open(text, self.options.clone());
            }
            's' | 'v' => self.split(),
            'c' | 'q' => {
                if !self.views.close_active() {
                    self.host.messages.push("E444: Cannot close last window".to_string());
                    self.host.bell();
                }
            }
            'o' => {
                if self.views.close_others() == 0 {
                    self.host.messages.push("Already only one window".to_string());
                }
            }
            _ => return,
        }
        info!(
            target: "model.session",
            command = %c,
            count = cmd.count,
            active = self.views.active().id.0,
            views = self.views.len(),
            "window_command"
        );
    }

    /// A new view on a copy of the active text, with the same cursor.
    fn split(&mut self) {
        let current = self.views.active();
        let cursor = current.engine.cursor();
        let first = current.viewport_first_line;
        let contents = current.text.contents();
        let name = current
            .text
            .file_name
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or("split")
            .to_string();
        match EditorState::from_text(&name, &contents) {
            Ok(mut text) => {
                text.file_name = current.text.file_name.clone();
                self.views.open(text, self.options.clone());
                let view = self.views.active_mut();
                view.engine.set_cursor(cursor);
                view.viewport_first_line = first;
            }
            Err(e) => {
                warn!(target: "model.session", error = %e, "split_failed");
                self.host.bell();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn model(text: &str) -> EditorModel {
        EditorModel::new(EditorState::from_text("t", text).unwrap(), EngineOptions::default())
    }

    #[test]
    fn registers_are_shared_between_views() {
        let mut m = model("alpha beta");
        m.feed_notation("yiw<C-w>n").unwrap();
        assert_eq!(m.views().len(), 2);
        m.feed_notation("p").unwrap();
        assert_eq!(m.active().text.contents(), "alpha");
        m.feed_notation("<C-w>p").unwrap();
        assert_eq!(m.active().text.contents(), "alpha beta");
    }

    #[test]
    fn insert_spans_several_feed_calls() {
        let mut m = model("x");
        m.feed_notation("ione ").unwrap();
        assert!(m.active().engine.is_suspended());
        m.feed_notation("two<Esc>").unwrap();
        assert!(!m.active().engine.is_suspended());
        assert_eq!(m.active().text.contents(), "one twox");
    }

    #[test]
    fn split_copies_text_and_cursor() {
        let mut m = model("a\nb\nc");
        m.feed_notation("j<C-w>s").unwrap();
        assert_eq!(m.views().len(), 2);
        assert_eq!(m.active().engine.cursor().line, 1);
        m.feed_notation("dd").unwrap();
        assert_eq!(m.active().text.contents(), "a\nc");
        m.feed_notation("<C-w>w").unwrap();
        assert_eq!(m.active().text.contents(), "a\nb\nc");
    }

    #[test]
    fn closing_the_last_view_is_refused() {
        let mut m = model("a");
        m.feed_notation("<C-w>c").unwrap();
        assert_eq!(m.views().len(), 1);
        assert_eq!(m.host().messages, vec!["E444: Cannot close last window".to_string()]);
        assert_eq!(m.host().bells, 1);
    }

    #[test]
    fn unknown_window_command_aborts() {
        let mut m = model("a");
        let status = m.feed_notation("<C-w>z").unwrap();
        assert!(matches!(status, DispatchStatus::Aborted(_)));
    }

    #[test]
    fn counted_ctrl_w_w_focuses_by_number() {
        let mut m = model("a");
        m.feed_notation("<C-w>n<C-w>n").unwrap();
        assert_eq!(m.views().active_index(), 2);
        m.feed_notation("1<C-w>w").unwrap();
        assert_eq!(m.views().active_index(), 0);
    }

    #[test]
    fn cursor_below_viewport_scrolls_it() {
        let options = EngineOptions { viewport_height: 3, ..EngineOptions::default() };
        let text = (0..10).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let mut m = EditorModel::new(EditorState::from_text("t", &text).unwrap(), options);
        m.feed_notation("5j").unwrap();
        assert_eq!(m.active().viewport_first_line, 3);
        m.feed_notation("L").unwrap();
        assert_eq!(m.active().engine.cursor().line, 5);
        m.feed_notation("H").unwrap();
        assert_eq!(m.active().engine.cursor().line, 3);
    }
}
