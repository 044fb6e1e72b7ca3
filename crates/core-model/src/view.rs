//! Views and the manager that keeps them.
//!
//! Invariants after every public call:
//! * `views` is never empty.
//! * `active < views.len()`.
//! * `previous`, when set, names a different live view.

use core_actions::Engine;
use core_config::EngineOptions;
use core_state::EditorState;
use core_text::LineAccess;

/// Stable identifier for a [`View`]. Never reused after the view closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(pub usize);

/// One editing context: its own engine and text.
pub struct View {
    pub id: ViewId,
    pub engine: Engine,
    pub text: EditorState,
    pub viewport_first_line: usize,
}

impl View {
    pub fn new(id: ViewId, text: EditorState, options: EngineOptions) -> Self {
        Self {
            id,
            engine: Engine::new(options),
            text,
            viewport_first_line: 0,
        }
    }

    /// Keep the cursor on screen. Returns true when the first visible line
    /// changed.
    pub fn auto_scroll(&mut self, text_height: usize, margin: usize) -> bool {
        let last = self.text.line_count().saturating_sub(1);
        let cursor_line = self.engine.cursor().line.min(last);
        match compute_scroll_intent(self.viewport_first_line, cursor_line, text_height, margin) {
            Some(first) => {
                self.viewport_first_line = first;
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("cursor", &self.engine.cursor())
            .field("lines", &self.text.line_count())
            .field("viewport_first_line", &self.viewport_first_line)
            .finish()
    }
}

/// New first visible line that keeps `cursor_line` inside the viewport with
/// `margin` rows above and below it (clamped to half the height), or `None`
/// when no scroll is needed.
pub fn compute_scroll_intent(first: usize, cursor_line: usize, text_height: usize, margin: usize) -> Option<usize> {
    if text_height == 0 {
        return None;
    }
    let m = margin.min(text_height / 2);
    let new_first = if cursor_line < first + m {
        cursor_line.saturating_sub(m)
    } else if cursor_line + m >= first + text_height {
        cursor_line + m + 1 - text_height
    } else {
        return None;
    };
    (new_first != first).then_some(new_first)
}

/// Owns the views, in window order, and tracks focus.
#[derive(Debug)]
pub struct ViewManager {
    views: Vec<View>,
    active: usize,
    previous: Option<ViewId>,
    next_id: usize,
}

impl ViewManager {
    pub fn new(text: EditorState, options: EngineOptions) -> Self {
        Self {
            views: vec![View::new(ViewId(0), text, options)],
            active: 0,
            previous: None,
            next_id: 1,
        }
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut View> {
        self.views.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> &View {
        &self.views[self.active]
    }

    pub fn active_mut(&mut self) -> &mut View {
        &mut self.views[self.active]
    }

    pub fn get(&self, id: ViewId) -> Option<&View> {
        self.views.iter().find(|v| v.id == id)
    }

    /// Focus the view at `index`; out-of-range indexes are clamped.
    pub fn focus(&mut self, index: usize) {
        let index = index.min(self.views.len() - 1);
        if index != self.active {
            self.previous = Some(self.views[self.active].id);
            self.active = index;
        }
    }

    /// Focus `n` views further on, wrapping around. Negative goes back.
    pub fn cycle(&mut self, n: isize) {
        let len = self.views.len() as isize;
        let index = (self.active as isize + n).rem_euclid(len);
        self.focus(index as usize);
    }

    /// Back to the previously focused view. Returns false when there is none.
    pub fn focus_previous(&mut self) -> bool {
        let Some(index) = self.previous.and_then(|id| self.views.iter().position(|v| v.id == id)) else {
            return false;
        };
        self.focus(index);
        true
    }

    /// Open a view after the active one and focus it.
    pub fn open(&mut self, text: EditorState, options: EngineOptions) -> ViewId {
        let id = ViewId(self.next_id);
        self.next_id += 1;
        self.views.insert(self.active + 1, View::new(id, text, options));
        self.focus(self.active + 1);
        id
    }

    /// Close the active view. The last view cannot be closed.
    pub fn close_active(&mut self) -> bool {
        if self.views.len() == 1 {
            return false;
        }
        let closed = self.views.remove(self.active);
        if self.previous == Some(closed.id) {
            self.previous = None;
        }
        let target = self
            .previous
            .and_then(|id| self.views.iter().position(|v| v.id == id))
            .unwrap_or(self.active.saturating_sub(1));
        self.active = target.min(self.views.len() - 1);
        self.previous = None;
        true
    }

    /// Close every view but the active one. Returns how many were closed.
    pub fn close_others(&mut self) -> usize {
        let keep = self.views.swap_remove(self.active);
        let closed = self.views.len();
        self.views = vec![keep];
        self.active = 0;
        self.previous = None;
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn manager(n: usize) -> ViewManager {
        let mut m = ViewManager::new(EditorState::from_text("0", "zero").unwrap(), EngineOptions::default());
        for i in 1..n {
            m.open(EditorState::from_text("v", &i.to_string()).unwrap(), EngineOptions::default());
        }
        m
    }

    fn ids(m: &ViewManager) -> Vec<usize> {
        m.views().iter().map(|v| v.id.0).collect()
    }

    #[test]
    fn open_inserts_after_active_and_focuses() {
        let mut m = manager(2);
        m.focus(0);
        let id = m.open(EditorState::from_text("n", "").unwrap(), EngineOptions::default());
        assert_eq!(ids(&m), vec![0, 2, 1]);
        assert_eq!(m.active().id, id);
    }

    #[test]
    fn cycle_wraps_both_ways() {
        let mut m = manager(3);
        m.focus(0);
        m.cycle(1);
        assert_eq!(m.active_index(), 1);
        m.cycle(-2);
        assert_eq!(m.active_index(), 2);
        m.cycle(1);
        assert_eq!(m.active_index(), 0);
    }

    #[test]
    fn previous_toggles() {
        let mut m = manager(3);
        m.focus(0);
        m.focus(2);
        assert!(m.focus_previous());
        assert_eq!(m.active_index(), 0);
        assert!(m.focus_previous());
        assert_eq!(m.active_index(), 2);
    }

    #[test]
    fn last_view_survives_close() {
        let mut m = manager(1);
        assert!(!m.close_active());
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn close_returns_to_previous_view() {
        let mut m = manager(3);
        m.focus(0);
        m.focus(2);
        assert!(m.close_active());
        assert_eq!(ids(&m), vec![0, 1]);
        assert_eq!(m.active().id, ViewId(0));
    }

    #[test]
    fn only_keeps_the_active_view() {
        let mut m = manager(4);
        m.focus(2);
        assert_eq!(m.close_others(), 3);
        assert_eq!(ids(&m), vec![2]);
        assert_eq!(m.active_index(), 0);
    }

    #[test]
    fn scroll_intent_respects_margin() {
        assert_eq!(compute_scroll_intent(0, 3, 10, 2), None);
        assert_eq!(compute_scroll_intent(0, 9, 10, 2), Some(2));
        assert_eq!(compute_scroll_intent(10, 11, 6, 2), Some(9));
        assert_eq!(compute_scroll_intent(0, 2, 4, 10), Some(1));
        assert_eq!(compute_scroll_intent(5, 0, 0, 0), None);
    }
}
