//! `oxvi`: run a Vi key script against a file and print the result.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::{Context, Result, bail};
use clap::Parser;
use core_actions::DispatchStatus;
use core_config::load_from;
use core_events::Key;
use core_model::EditorModel;
use core_state::{EditorState, RegisterKind, Registers};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "oxvi", version, about = "Run Vi normal-mode key scripts")]
struct Args {
    /// File to edit; `-` reads the text from stdin.
    pub path: Option<PathBuf>,
    /// Key script in key notation, e.g. `d2w` or `ciwnew<Esc>`.
    #[arg(short = 'k', long = "keys", conflicts_with = "keys_file")]
    pub keys: Option<String>,
    /// Read the key script from a file.
    #[arg(long = "keys-file")]
    pub keys_file: Option<PathBuf>,
    /// Optional configuration file path (overrides discovery of `oxvi.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Write the result back to the file instead of printing it.
    #[arg(short = 'i', long = "in-place")]
    pub in_place: bool,
    /// Print the non-empty registers to stderr afterwards.
    #[arg(long = "registers")]
    pub registers: bool,
    /// Log file (default `./oxvi.log`); the filter comes from `RUST_LOG`.
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

fn configure_logging(path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let path = path.unwrap_or(Path::new("oxvi.log"));
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = path.file_name().context("log file path has no file name")?;
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(()) => Ok(Some(guard)),
        // A global subscriber is already installed; dropping the guard stops the writer.
        Err(_) => Ok(None),
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn load_text(path: Option<&Path>) -> Result<EditorState> {
    match path {
        Some(p) if p == Path::new("-") => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("reading stdin")?;
            EditorState::from_text("[stdin]", &text)
        }
        Some(p) => EditorState::open(p),
        None => EditorState::from_text("[No Name]", ""),
    }
}

fn load_script(args: &Args) -> Result<String> {
    if let Some(keys) = &args.keys {
        return Ok(keys.clone());
    }
    if let Some(path) = &args.keys_file {
        let script = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        // A trailing newline is the file's, not a typed <NL>.
        return Ok(script.strip_suffix('\n').unwrap_or(&script).to_string());
    }
    Ok(String::new())
}

/// One line per non-empty register: name, kind, and its text with line
/// breaks shown as `^J`.
fn format_registers(registers: &Registers) -> Vec<String> {
    registers
        .snapshot()
        .into_iter()
        .filter(|(_, content)| !content.is_empty())
        .map(|(name, content)| {
            let kind = match content.kind {
                RegisterKind::Char => "c",
                RegisterKind::Line => "l",
                RegisterKind::Block(_) => "b",
            };
            let text = content.text().replace('\n', "^J");
            format!("  {kind}  \"{name}   {text}")
        })
        .collect()
}

fn run(args: &Args) -> Result<()> {
    let config = load_from(args.config.clone())?;
    let options = config.effective_options();
    let text = load_text(args.path.as_deref())?;
    let mut model = EditorModel::new(text, options);
    let script = load_script(args)?;
    let mut status = model.feed_notation(&script)?;
    if model.active().engine.is_suspended() {
        warn!(target: "runtime", "script_ended_in_sub_mode");
        status = model.feed(&[Key::ESC]);
    }
    let view = model.active();
    let cursor = view.engine.cursor();
    info!(target: "runtime", ?status, line = cursor.line, byte = cursor.byte, "script_finished");
    for message in &model.host().messages {
        eprintln!("{message}");
    }
    if let DispatchStatus::Aborted(err) = &status {
        eprintln!("oxvi: last command failed: {err}");
    }
    if args.registers {
        for line in format_registers(model.registers()) {
            eprintln!("{line}");
        }
    }
    let contents = view.text.contents();
    if args.in_place {
        let Some(path) = args.path.as_deref().filter(|p| *p != Path::new("-")) else {
            bail!("--in-place needs a file path");
        };
        std::fs::write(path, &contents).with_context(|| format!("writing {}", path.display()))?;
        info!(target: "runtime", file = %path.display(), bytes = contents.len(), "file_written");
    } else {
        print!("{contents}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging(args.log_file.as_deref())?;
    install_panic_hook();
    info!(target: "runtime", path = ?args.path, "startup");
    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::RegisterStore;
    use pretty_assertions::assert_eq;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["oxvi"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn keys_and_keys_file_conflict() {
        let err = Args::try_parse_from(["oxvi", "-k", "x", "--keys-file", "s.txt"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn script_file_drops_final_newline() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut f, b"dd\n").unwrap();
        let a = args(&["--keys-file", f.path().to_str().unwrap()]);
        assert_eq!(load_script(&a).unwrap(), "dd");
    }

    #[test]
    fn register_listing_marks_kinds() {
        let mut r = Registers::new();
        r.set_register('a', core_state::RegisterContent::charwise("foo")).unwrap();
        r.set_register('b', core_state::RegisterContent::linewise(["x", "y"])).unwrap();
        assert_eq!(format_registers(&r), vec!["  c  \"a   foo".to_string(), "  l  \"b   x^Jy^J".to_string()]);
    }

    #[test]
    fn in_place_rewrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.txt");
        std::fs::write(&path, "one two\n").unwrap();
        let config = dir.path().join("missing.toml");
        let a = args(&[
            path.to_str().unwrap(),
            "-k",
            "dwAend<Esc>",
            "-i",
            "--config",
            config.to_str().unwrap(),
        ]);
        run(&a).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "twoend\n");
    }

    #[test]
    fn in_place_without_a_file_is_an_error() {
        let a = args(&["-k", "x", "-i"]);
        assert!(run(&a).is_err());
    }
}
