use core_actions::{DispatchStatus, MotionType};
use core_config::EngineOptions;
use core_model::EditorModel;
use core_state::RegisterStore;
use pretty_assertions::assert_eq;
use std::io::Write;

#[test]
fn open_edit_and_read_back_a_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "first\r\nsecond\r\nthird\r\n").unwrap();
    let mut m = EditorModel::open(file.path(), EngineOptions::default()).unwrap();
    m.feed_notation("jddp").unwrap();
    assert_eq!(m.active().text.contents(), "first\r\nthird\r\nsecond\r\n");
    assert_eq!(m.active().text.file_name.as_deref(), Some(file.path()));
}

#[test]
fn opening_a_missing_file_fails_with_context() {
    let err = EditorModel::open(std::path::Path::new("/nonexistent/oxvi/file.txt"), EngineOptions::default())
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("opening /nonexistent/oxvi/file.txt"));
}

#[test]
fn operator_function_receives_the_region() {
    let mut m = EditorModel::new(
        core_state::EditorState::from_text("t", "one two").unwrap(),
        EngineOptions::default(),
    );
    m.feed_notation(":set opfunc=Count<CR>").unwrap();
    m.feed_notation("wg@iw").unwrap();
    let calls = &m.host().opfunc_calls;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "Count");
    assert_eq!(calls[0].1.motion_type, MotionType::Char);
    assert_eq!((calls[0].1.start.byte, calls[0].1.end.byte), (4, 6));
}

#[test]
fn g_at_without_function_fails() {
    let mut m = EditorModel::new(core_state::EditorState::from_text("t", "abc").unwrap(), EngineOptions::default());
    let status = m.feed_notation("g@l").unwrap();
    assert!(matches!(status, DispatchStatus::Aborted(_)));
}

#[test]
fn bad_ex_command_reports_and_rings() {
    let mut m = EditorModel::new(core_state::EditorState::from_text("t", "abc").unwrap(), EngineOptions::default());
    m.feed_notation(":frob<CR>").unwrap();
    assert_eq!(m.host().messages, vec!["E492: Not an editor command: frob".to_string()]);
    assert_eq!(m.host().bells, 1);
    assert_eq!(m.registers().get_register(':').map(|r| r.text()), Some("frob".to_string()));
}

#[test]
fn colon_line_number_jumps() {
    let mut m = EditorModel::new(
        core_state::EditorState::from_text("t", "a\nb\nc\nd").unwrap(),
        EngineOptions::default(),
    );
    m.feed_notation(":3<CR>").unwrap();
    assert_eq!(m.active().engine.cursor().line, 2);
    m.feed_notation("``").unwrap();
    assert_eq!(m.active().engine.cursor().line, 0);
}
