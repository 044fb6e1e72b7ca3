#![allow(dead_code)] // Shared across many integration tests; each test binary uses a subset of helpers.

use core_actions::{DispatchStatus, Engine, EngineContext, Host, ScrollPlace};
use core_config::EngineOptions;
use core_events::parse_keys;
use core_state::{EditorState, RegisterContent, RegisterStore, Registers};
use core_text::Position;

/// Host that remembers what the engine told it.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub bells: usize,
    pub messages: Vec<String>,
    pub commands: Vec<String>,
    pub scrolled: Vec<(ScrollPlace, usize)>,
}

impl Host for RecordingHost {
    fn bell(&mut self) {
        self.bells += 1;
    }

    fn message(&mut self, text: &str) {
        self.messages.push(text.to_string());
    }

    fn scroll_cursor_to(&mut self, place: ScrollPlace, line: usize) {
        self.scrolled.push((place, line));
    }

    fn run_command_line(&mut self, line: &str, _cursor: Position, line_count: usize) -> Result<Option<Position>, String> {
        self.commands.push(line.to_string());
        // A bare line number jumps there.
        match line.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Ok(Some(Position::new((n - 1).min(line_count.saturating_sub(1)), 0))),
            _ if line == "nop" => Ok(None),
            _ => Err(format!("not an editor command: {line}")),
        }
    }
}

/// An engine with its text, registers and host.
pub struct Session {
    pub engine: Engine,
    pub text: EditorState,
    pub registers: Registers,
    pub host: RecordingHost,
}

impl Session {
    pub fn new(text: &str) -> Self {
        Self::with_options(text, EngineOptions::default())
    }

    pub fn with_options(text: &str, options: EngineOptions) -> Self {
        Self {
            engine: Engine::new(options),
            text: EditorState::from_text("test", text).unwrap(),
            registers: Registers::new(),
            host: RecordingHost::default(),
        }
    }

    pub fn at(mut self, line: usize, byte: usize) -> Self {
        self.engine.set_cursor(Position::new(line, byte));
        self
    }

    /// Feed a key script. Insert mode and command lines are completed from
    /// the keys that follow in the same script.
    pub fn keys(&mut self, script: &str) -> DispatchStatus {
        let keys = parse_keys(script).unwrap();
        let mut cx = EngineContext {
            text: &mut self.text,
            registers: &mut self.registers,
            host: &mut self.host,
        };
        let mut status = self.engine.feed_keys(&mut cx, &keys);
        while let DispatchStatus::EnteredSubMode(request) = &status {
            let token = request.token;
            let Some(outcome) = self.engine.complete_from_queue() else {
                break;
            };
            status = self.engine.resume(&mut cx, token, outcome).unwrap();
        }
        status
    }

    pub fn contents(&self) -> String {
        self.text.contents()
    }

    pub fn cursor(&self) -> (usize, usize) {
        let c = self.engine.cursor();
        (c.line, c.byte)
    }

    pub fn register(&self, name: char) -> Option<RegisterContent> {
        self.registers.get_register(name)
    }

    pub fn register_text(&self, name: char) -> String {
        self.register(name).map(|c| c.text()).unwrap_or_default()
    }
}

/// Run `script` on `text` with the cursor at the start; return the text and
/// cursor afterwards.
pub fn run(text: &str, script: &str) -> (String, (usize, usize)) {
    let mut s = Session::new(text);
    s.keys(script);
    (s.contents(), s.cursor())
}
