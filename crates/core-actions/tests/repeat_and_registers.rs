mod common;

use common::*;
use core_actions::{CommandError, DispatchStatus};
use pretty_assertions::assert_eq;

#[test]
fn named_register_yank_and_put() {
    let (text, _) = run("foo bar", "\"ayiw$\"ap");
    assert_eq!(text, "foo barfoo");
}

#[test]
fn uppercase_register_appends() {
    let mut s = Session::new("foo bar");
    s.keys("\"ayiww\"Ayiw");
    assert_eq!(s.register_text('a'), "foobar");
}

#[test]
fn dot_repeats_word_delete() {
    let (text, _) = run("a b c d", "dw..");
    assert_eq!(text, "d");
}

#[test]
fn dot_repeats_change_with_inserted_text() {
    let (text, _) = run("foo bar", "cwX<Esc>w.");
    assert_eq!(text, "X X");
}

#[test]
fn dot_with_count_replaces_the_old_count() {
    let (text, _) = run("a b c d e f", "2dw3.");
    assert_eq!(text, "f");
}

#[test]
fn recorded_macro_runs_with_count() {
    let mut s = Session::new("1\n2\n3");
    s.keys("qaA!<Esc>jq");
    assert_eq!(s.engine.recording(), None);
    s.keys("2@a");
    assert_eq!(s.contents(), "1!\n2!\n3!");
}

#[test]
fn at_at_repeats_last_register() {
    let mut s = Session::new("1\n2\n3");
    s.keys("qbA.<Esc>jq@b@@");
    assert_eq!(s.contents(), "1.\n2.\n3.");
}

#[test]
fn numbered_registers_shift_on_line_deletes() {
    let mut s = Session::new("a\nb\nc");
    s.keys("dddd");
    assert_eq!(s.register_text('1'), "b\n");
    assert_eq!(s.register_text('2'), "a\n");
}

#[test]
fn small_delete_goes_to_minus_register() {
    let mut s = Session::new("abc def");
    s.keys("dw");
    assert_eq!(s.register_text('-'), "abc ");
    assert_eq!(s.register_text('1'), "");
}

#[test]
fn invalid_register_is_reported() {
    let mut s = Session::new("abc");
    s.keys("\"!x");
    assert_eq!(s.host.bells, 1);
}

#[test]
fn huge_put_count_is_refused_without_touching_text() {
    let line = "x".repeat(72);
    let mut s = Session::new(&line);
    s.keys("y$");
    let status = s.keys("999999999P");
    assert_eq!(status, DispatchStatus::Aborted(CommandError::TextTooLong));
    assert_eq!(s.contents(), line);
    assert_eq!(s.host.bells, 1);
    assert_eq!(s.host.messages, vec!["resulting text too long".to_string()]);

    let mut s = Session::new("a\nb");
    s.keys("yl");
    let status = s.keys("999999999p");
    assert_eq!(status, DispatchStatus::Aborted(CommandError::TextTooLong));
    s.keys("3p");
    assert_eq!(s.contents(), "aaaa\nb");
}

#[test]
fn huge_linewise_put_count_is_refused() {
    let mut s = Session::new("a\nb");
    s.keys("yy");
    let status = s.keys("999999999p");
    assert_eq!(status, DispatchStatus::Aborted(CommandError::TextTooLong));
    assert_eq!(s.contents(), "a\nb");
}

#[test]
fn huge_put_count_keeps_the_visual_selection_text() {
    let mut s = Session::new("one two");
    s.keys("yiww");
    let status = s.keys("v999999999p");
    assert!(matches!(status, DispatchStatus::Aborted(CommandError::TextTooLong)));
    assert_eq!(s.contents(), "one two");
}
