//! `/`, `?`, `n`, `N`, `*`, `#`, `g*`, `g#`, `gd`, `gD`, `CTRL-]`.

use core_keymap::arg;
use core_state::RegisterContent;
use core_text::motion::{self as tm, Direction};
use core_text::Position;
use tracing::debug;

use crate::engine::{Engine, EngineContext, SubModeKind, SubModeStart};
use crate::error::CommandError;
use crate::host::{DefinitionQuery, DefinitionScope};
use crate::search::{self, ident_under_cursor};
use crate::state::{CommandArg, MotionType};

impl Engine {
    /// `/` and `?`: the pattern is read by the host.
    pub(super) fn nv_search(&mut self, _cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let dir = if cap.arg == arg::BACKWARD {
            Direction::Backward
        } else {
            Direction::Forward
        };
        self.start_request = Some(SubModeStart::CommandLine {
            kind: SubModeKind::Search(dir),
            initial: String::new(),
        });
        Ok(())
    }

    /// The host finished reading a `/` or `?` pattern. An empty pattern
    /// repeats the last one.
    pub(crate) fn search_entered(
        &mut self,
        cx: &mut EngineContext<'_>,
        cap: &mut CommandArg,
        dir: Direction,
        line: &str,
    ) -> Result<(), CommandError> {
        let pattern = if line.is_empty() {
            self.search.last_pattern.clone().ok_or(CommandError::NoPreviousPattern)?
        } else {
            line.to_string()
        };
        self.search.last_pattern = Some(pattern.clone());
        self.search.last_dir = dir;
        cx.registers.set_read_only('/', RegisterContent::charwise(&pattern))?;
        cap.searchbuf = Some(line.to_string());
        self.normal_search(cx, &pattern, dir, cap.count1)
    }

    /// Move to the `count`-th match of `pattern`. Characterwise exclusive.
    fn normal_search(
        &mut self,
        cx: &mut EngineContext<'_>,
        pattern: &str,
        dir: Direction,
        count: usize,
    ) -> Result<(), CommandError> {
        self.oap.motion_type = MotionType::Char;
        self.oap.inclusive = false;
        self.oap.use_reg_one = true;
        self.set_curswant = true;
        let re = search::compile(pattern, self.options.ignorecase, self.options.smartcase)?;
        let found = search::find(&*cx.text, &re, self.cursor, dir, count, self.options.wrapscan)
            .ok_or_else(|| CommandError::PatternNotFound(pattern.to_string()))?;
        if found.wrapped {
            let msg = match dir {
                Direction::Forward => "search hit BOTTOM, continuing at TOP",
                Direction::Backward => "search hit TOP, continuing at BOTTOM",
            };
            cx.host.message(msg);
        }
        self.setpcmark();
        self.cursor = found.pos;
        Ok(())
    }

    /// `n` and `N`.
    pub(super) fn nv_next(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let pattern = self.search.last_pattern.clone().ok_or(CommandError::NoPreviousPattern)?;
        let dir = if cap.arg != 0 {
            self.search.last_dir.reversed()
        } else {
            self.search.last_dir
        };
        self.normal_search(cx, &pattern, dir, cap.count1)
    }

    /// `*`, `#`, `g*`, `g#`: search for the identifier under the cursor.
    pub(super) fn nv_ident(&mut self, cx: &mut EngineContext<'_>, cap: &mut CommandArg) -> Result<(), CommandError> {
        let (prefix_g, key) = if cap.cmd_is('g') {
            (true, cap.nchar)
        } else {
            (false, cap.cmdchar)
        };
        let line = cx.text.line_text(self.cursor.line);
        let (ident, keyword) = ident_under_cursor(&line, self.cursor.byte).ok_or(CommandError::NoIdentifier)?;
        let escaped = regex::escape(&ident);
        let pattern = if keyword && !prefix_g {
            format!("\\<{escaped}\\>")
        } else {
            escaped
        };
        let dir = if key.as_char() == Some('#') {
            Direction::Backward
        } else {
            Direction::Forward
        };
        // Start the search from the identifier itself, so `#` skips it.
        if let Some(start) = ident_start(&line, &ident, self.cursor.byte) {
            self.cursor.byte = start;
        }
        debug!(target: "engine.search", pattern = %pattern, ?dir, "search_identifier");
        self.search.last_pattern = Some(pattern.clone());
        self.search.last_dir = dir;
        cx.registers.set_read_only('/', RegisterContent::charwise(&pattern))?;
        self.normal_search(cx, &pattern, dir, cap.count1)
    }

    /// `gd` and `gD`: the host resolves the definition; otherwise the first
    /// whole-word match from the start of the paragraph (`gd`) or the
    /// buffer (`gD`).
    pub(super) fn nv_gd(&mut self, cx: &mut EngineContext<'_>, _cap: &mut CommandArg, global: bool) -> Result<(), CommandError> {
        self.check_clear_op()?;
        let line = cx.text.line_text(self.cursor.line);
        let (ident, keyword) = ident_under_cursor(&line, self.cursor.byte).ok_or(CommandError::NoIdentifier)?;
        let scope = if global {
            DefinitionScope::Global
        } else {
            DefinitionScope::Local
        };
        let query = DefinitionQuery { ident: &ident, scope, cursor: self.cursor };
        if let Some(pos) = cx.host.goto_definition(query) {
            self.setpcmark();
            self.cursor = pos;
            self.set_curswant = true;
            return Ok(());
        }
        let escaped = regex::escape(&ident);
        let pattern = if keyword {
            format!("\\<{escaped}\\>")
        } else {
            escaped
        };
        let re = search::compile(&pattern, self.options.ignorecase, self.options.smartcase)?;
        let from = if global {
            Position::origin()
        } else {
            tm::paragraph(&*cx.text, self.cursor, 1, Direction::Backward, None, false)
                .map(|(p, _)| Position::new(p.line, 0))
                .unwrap_or_default()
        };
        let text = &*cx.text;
        let first = (from.line..text.line_count()).find_map(|l| {
            let s = text.line_text(l);
            re.find(&s).map(|m| Position::new(l, m.start()))
        });
        let pos = first.ok_or(CommandError::DefinitionNotFound(ident.clone()))?;
        self.search.last_pattern = Some(pattern.clone());
        self.search.last_dir = Direction::Forward;
        cx.registers.set_read_only('/', RegisterContent::charwise(&pattern))?;
        self.setpcmark();
        self.cursor = pos;
        self.set_curswant = true;
        Ok(())
    }

    /// `CTRL-]`: only the host can resolve tags.
    pub(super) fn nv_ctrl_bracket(&mut self, cx: &mut EngineContext<'_>, _cap: &mut CommandArg) -> Result<(), CommandError> {
        self.check_clear_op()?;
        let line = cx.text.line_text(self.cursor.line);
        let (ident, _) = ident_under_cursor(&line, self.cursor.byte).ok_or(CommandError::NoIdentifier)?;
        let query = DefinitionQuery { ident: &ident, scope: DefinitionScope::Tag, cursor: self.cursor };
        let pos = cx
            .host
            .goto_definition(query)
            .ok_or_else(|| CommandError::DefinitionNotFound(ident.clone()))?;
        self.setpcmark();
        self.cursor = pos;
        self.set_curswant = true;
        Ok(())
    }
}

/// Byte where the occurrence of `ident` under or after `byte` starts.
fn ident_start(line: &str, ident: &str, byte: usize) -> Option<usize> {
    line.match_indices(ident)
        .map(|(s, _)| s)
        .find(|&s| s + ident.len() > byte)
}

#[cfg(test)]
mod tests {
    use super::ident_start;

    #[test]
    fn ident_start_under_and_after_cursor() {
        assert_eq!(ident_start("foo bar foo", "foo", 9), Some(8));
        assert_eq!(ident_start("foo bar foo", "bar", 0), Some(4));
        assert_eq!(ident_start("foo", "zap", 0), None);
    }
}
