mod common;

use common::*;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::Level;
use tracing::subscriber::with_default;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone)]
struct BufferWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

struct LockedWriter<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
}

impl Write for LockedWriter<'_> {
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

fn capture(level: Level, f: impl FnOnce()) -> String {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .without_time()
        .with_writer(BufferWriter { inner: buffer.clone() })
        .finish();
    with_default(subscriber, f);
    let bytes = buffer.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

#[test]
fn operator_application_is_logged() {
    let out = capture(Level::DEBUG, || {
        let mut s = Session::new("one two");
        s.keys("dw");
    });
    assert!(out.contains("engine.operator"), "{out}");
    assert!(out.contains("apply_operator"), "{out}");
    assert!(out.contains("delete"), "{out}");
}

#[test]
fn macro_recording_logs_at_info() {
    let out = capture(Level::INFO, || {
        let mut s = Session::new("x");
        s.keys("qaq");
    });
    assert!(out.contains("recording_started"), "{out}");
    assert!(out.contains("recording_stopped"), "{out}");
    assert!(!out.contains("apply_operator"), "{out}");
}
