mod common;

use common::*;
use core_actions::{CommandError, DispatchStatus};
use core_config::EngineOptions;
use pretty_assertions::assert_eq;

#[test]
fn delete_counted_words_fills_unnamed_register() {
    let mut s = Session::new("one two three");
    s.keys("d2w");
    assert_eq!(s.contents(), "three");
    assert_eq!(s.register_text('"'), "one two ");
    assert_eq!(s.cursor(), (0, 0));
}

#[test]
fn counted_dd_reports_fewer_lines() {
    let mut s = Session::new("a\nb\nc\nd");
    s.keys("3dd");
    assert_eq!(s.contents(), "d");
    assert_eq!(s.host.messages, vec!["3 fewer lines".to_string()]);
    assert_eq!(s.register_text('1'), "a\nb\nc\n");
}

#[test]
fn x_deletes_under_cursor() {
    let (text, cursor) = run("abc", "lx");
    assert_eq!(text, "ac");
    assert_eq!(cursor, (0, 1));
}

#[test]
fn d_dollar_from_middle_of_line() {
    let (text, cursor) = run("hello world", "wD");
    assert_eq!(text, "hello ");
    assert_eq!(cursor, (0, 5));
}

#[test]
fn change_word_enters_insert_and_replaces() {
    let (text, _) = run("foo bar", "cwbaz<Esc>");
    assert_eq!(text, "baz bar");
}

#[test]
fn change_inner_parens() {
    let mut s = Session::new("f(a, b)").at(0, 3);
    s.keys("ci(x<Esc>");
    assert_eq!(s.contents(), "f(x)");
}

#[test]
fn delete_inner_word_keeps_surrounding_blanks() {
    let mut s = Session::new("one two three").at(0, 5);
    s.keys("diw");
    assert_eq!(s.contents(), "one  three");
}

#[test]
fn delete_a_paragraph_takes_trailing_blank_line() {
    let (text, _) = run("a\nb\n\nc", "dap");
    assert_eq!(text, "c");
}

#[test]
fn shift_right_with_expandtab() {
    let options = EngineOptions {
        shiftwidth: 4,
        expandtab: true,
        ..EngineOptions::default()
    };
    let mut s = Session::with_options("a", options);
    s.keys(">>");
    assert_eq!(s.contents(), "    a");
}

#[test]
fn empty_region_is_rejected_when_cpoptions_has_e() {
    let options = EngineOptions {
        cpoptions: "E".to_string(),
        ..EngineOptions::default()
    };
    let mut s = Session::with_options("abc", options);
    let status = s.keys("y0");
    assert_eq!(status, DispatchStatus::Aborted(CommandError::EmptyRegionRejected));
    assert_eq!(s.host.bells, 1);
}

#[test]
fn unknown_motion_cancels_the_operator() {
    let mut s = Session::new("abc");
    s.keys("d<C-a>");
    assert!(s.engine.operator_pending().op.is_none());
    assert_eq!(s.contents(), "abc");
}

#[test]
fn undo_and_redo_restore_text() {
    let mut s = Session::new("abc");
    s.keys("xx");
    assert_eq!(s.contents(), "c");
    s.keys("u");
    assert_eq!(s.contents(), "bc");
    s.keys("<C-r>");
    assert_eq!(s.contents(), "c");
    s.keys("uu");
    assert_eq!(s.contents(), "abc");
    s.keys("u");
    assert_eq!(s.host.messages.last().map(String::as_str), Some("Already at oldest change"));
    assert_eq!(s.host.bells, 1);
}

#[test]
fn colon_motion_after_operator_is_exclusive_linewise_jump() {
    let mut s = Session::new("a\nb\nc\nd");
    s.keys("d:3<CR>");
    assert_eq!(s.host.commands, vec!["3".to_string()]);
    assert_eq!(s.contents(), "c\nd");
}

#[test]
fn ctrl_a_adds_count_and_dot_repeats_it() {
    let mut s = Session::new("x 41 y");
    s.keys("5<C-a>");
    assert_eq!(s.contents(), "x 46 y");
    assert_eq!(s.cursor(), (0, 3));
    s.keys(".");
    assert_eq!(s.contents(), "x 51 y");
}

#[test]
fn three_dd_on_five_lines_keeps_the_last_two() {
    let mut s = Session::new("1\n2\n3\n4\n5");
    s.keys("3dd");
    assert_eq!(s.contents(), "4\n5");
    assert_eq!(s.cursor(), (0, 0));
}

#[test]
fn motion_that_cannot_move_at_end_of_buffer_changes_nothing() {
    let mut s = Session::new("a\nb").at(1, 0);
    let status = s.keys("dj");
    assert_eq!(status, DispatchStatus::Aborted(CommandError::OutOfRangeMotion));
    assert_eq!(s.contents(), "a\nb");
    assert!(s.engine.operator_pending().op.is_none());
}

#[test]
fn exclusive_motion_ending_in_column_zero_becomes_inclusive() {
    // `w` from inside a word onto the next line stops before the line break.
    let mut s = Session::new("ab cd\nef").at(0, 3);
    s.keys("dw");
    assert_eq!(s.contents(), "ab \nef");
}

#[test]
fn cancelled_command_line_after_operator_restores_cursor() {
    let mut s = Session::new("abc def ghi").at(0, 4);
    let status = s.keys("d:<Esc>");
    assert_eq!(status, DispatchStatus::Complete);
    assert!(s.engine.operator_pending().op.is_none());
    assert_eq!(s.contents(), "abc def ghi");
    assert_eq!(s.cursor(), (0, 4));
}

#[test]
fn empty_search_after_operator_needs_a_previous_pattern() {
    let mut s = Session::new("abc def");
    let status = s.keys("d/<CR>");
    assert_eq!(status, DispatchStatus::Aborted(CommandError::NoPreviousPattern));
    assert!(s.engine.operator_pending().op.is_none());
    assert_eq!(s.contents(), "abc def");
    assert_eq!(s.host.bells, 1);
}

#[test]
fn empty_search_after_operator_reuses_last_pattern() {
    let mut s = Session::new("abc def");
    s.keys("/def<CR>");
    assert_eq!(s.cursor(), (0, 4));
    s.keys("0d/<CR>");
    assert_eq!(s.contents(), "def");
    assert_eq!(s.register_text('-'), "abc ");
    assert_eq!(s.cursor(), (0, 0));
}
