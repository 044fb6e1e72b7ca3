//! Configuration loading and parsing.
//!
//! Parses `oxvi.toml` (or an override path provided by the binary). The only
//! section consumed today is `[editor]`, which carries the Vi options the
//! command engine consults. Every field is optional; absent fields keep Vi
//! defaults. Unknown fields are ignored so newer config files still load.
//!
//! A missing file or a file that fails to parse yields the defaults. Parse
//! failures are logged under the `config` target; they never abort startup.
//! Out-of-range numeric values are clamped by [`Config::effective_options`]
//! and the clamp is logged.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

/// Behavior of the last character of a Visual selection (`'selection'`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    #[default]
    Inclusive,
    Exclusive,
    /// Inclusive, and the cursor may not rest past the end of a line.
    Old,
}

/// Events that start Select mode instead of Visual mode (`'selectmode'`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectModeTrigger {
    Mouse,
    Key,
    Cmd,
}

/// `'keymodel'` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyModel {
    /// Shifted special keys start a selection.
    StartSel,
    /// Unshifted special keys stop a selection.
    StopSel,
}

/// Options read by the command engine. Tests construct this directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub startofline: bool,
    pub shiftwidth: usize,
    pub tabstop: usize,
    pub expandtab: bool,
    pub shiftround: bool,
    pub autoindent: bool,
    pub tildeop: bool,
    pub wrapscan: bool,
    pub ignorecase: bool,
    pub smartcase: bool,
    pub joinspaces: bool,
    pub textwidth: usize,
    pub report: usize,
    pub selection: Selection,
    pub selectmode: Vec<SelectModeTrigger>,
    pub keymodel: Vec<KeyModel>,
    pub cpoptions: String,
    pub rightleft: bool,
    pub langmap: String,
    pub commentstring: String,
    pub viewport_height: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            startofline: true,
            shiftwidth: 8,
            tabstop: 8,
            expandtab: false,
            shiftround: false,
            autoindent: false,
            tildeop: false,
            wrapscan: true,
            ignorecase: false,
            smartcase: false,
            joinspaces: false,
            textwidth: 0,
            report: 2,
            selection: Selection::Inclusive,
            selectmode: Vec::new(),
            keymodel: Vec::new(),
            cpoptions: String::new(),
            rightleft: false,
            langmap: String::new(),
            commentstring: "# %s".to_string(),
            viewport_height: 24,
        }
    }
}

impl EngineOptions {
    /// Whether flag `c` is in `'cpoptions'`.
    pub fn cpo(&self, c: char) -> bool {
        self.cpoptions.contains(c)
    }

    pub fn select_on(&self, trigger: SelectModeTrigger) -> bool {
        self.selectmode.contains(&trigger)
    }

    pub fn keymodel_has(&self, flag: KeyModel) -> bool {
        self.keymodel.contains(&flag)
    }

    /// Shift width in cells; zero means "use tabstop".
    pub fn effective_shiftwidth(&self) -> usize {
        if self.shiftwidth == 0 {
            self.tabstop.max(1)
        } else {
            self.shiftwidth
        }
    }

    /// Line width used by internal formatting (`gq`).
    pub fn effective_textwidth(&self) -> usize {
        if self.textwidth == 0 { 79 } else { self.textwidth }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub editor: EngineOptions,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Original file text, when one was read.
    pub raw: Option<String>,
    pub file: ConfigFile,
}

/// Best-effort config path: `./oxvi.toml`, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("oxvi.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("oxvi").join("oxvi.toml");
    }
    PathBuf::from("oxvi.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(Config {
            raw: Some(content),
            file,
        }),
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Options with out-of-range values clamped.
    pub fn effective_options(&self) -> EngineOptions {
        let mut opts = self.file.editor.clone();
        if opts.tabstop == 0 || opts.tabstop > 9999 {
            let clamped = opts.tabstop.clamp(1, 9999);
            info!(target: "config", raw = opts.tabstop, clamped, "tabstop_clamped");
            opts.tabstop = clamped;
        }
        if opts.viewport_height < 2 {
            info!(target: "config", raw = opts.viewport_height, clamped = 2, "viewport_height_clamped");
            opts.viewport_height = 2;
        }
        if !opts.commentstring.contains("%s") {
            warn!(target: "config", commentstring = %opts.commentstring, "commentstring_without_placeholder");
            opts.commentstring = EngineOptions::default().commentstring;
        }
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), text).unwrap();
        tmp
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert!(cfg.raw.is_none());
        assert_eq!(cfg.file.editor, EngineOptions::default());
        assert!(cfg.file.editor.startofline);
        assert_eq!(cfg.file.editor.shiftwidth, 8);
    }

    #[test]
    fn parses_editor_section() {
        let tmp = write_config(
            "[editor]\nshiftwidth = 4\nexpandtab = true\nselection = \"exclusive\"\n\
             selectmode = [\"key\", \"cmd\"]\nkeymodel = [\"startsel\"]\ncpoptions = \"Ey\"\n",
        );
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let o = cfg.effective_options();
        assert_eq!(o.shiftwidth, 4);
        assert!(o.expandtab);
        assert_eq!(o.selection, Selection::Exclusive);
        assert!(o.select_on(SelectModeTrigger::Cmd));
        assert!(!o.select_on(SelectModeTrigger::Mouse));
        assert!(o.keymodel_has(KeyModel::StartSel));
        assert!(o.cpo('E') && o.cpo('y') && !o.cpo('r'));
        assert_eq!(o.tabstop, 8);
    }

    #[test]
    fn derived_widths() {
        let o = EngineOptions {
            shiftwidth: 0,
            tabstop: 4,
            ..EngineOptions::default()
        };
        assert_eq!(o.effective_shiftwidth(), 4);
        assert_eq!(o.effective_textwidth(), 79);
    }

    #[test]
    fn invalid_toml_falls_back_and_warns() {
        let tmp = write_config("[editor\nshiftwidth = ");
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();
        let cfg = with_default(subscriber, || load_from(Some(tmp.path().to_path_buf())).unwrap());
        assert_eq!(cfg.file.editor, EngineOptions::default());
        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("WARN config:"));
        assert!(log_output.contains("config_parse_failed_using_defaults"));
    }

    #[test]
    fn clamps_zero_tabstop_and_logs() {
        let tmp = write_config("[editor]\ntabstop = 0\nviewport_height = 1\ncommentstring = \"//\"\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();
        let o = with_default(subscriber, || cfg.effective_options());
        assert_eq!(o.tabstop, 1);
        assert_eq!(o.viewport_height, 2);
        assert_eq!(o.commentstring, "# %s");
        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("tabstop_clamped"));
    }

    #[test]
    fn unknown_sections_are_ignored() {
        let tmp = write_config("[scroll.margin]\nvertical = 3\n[editor]\nwrapscan = false\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(!cfg.file.editor.wrapscan);
    }
}
