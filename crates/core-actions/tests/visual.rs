mod common;

use common::*;
use pretty_assertions::assert_eq;

#[test]
fn linewise_yank_reports_and_returns_to_start() {
    let mut s = Session::new("a\nb\nc\nd");
    s.keys("Vjjy");
    assert_eq!(s.register_text('0'), "a\nb\nc\n");
    assert_eq!(s.host.messages, vec!["3 lines yanked".to_string()]);
    assert_eq!(s.cursor(), (0, 0));
    assert!(!s.engine.visual().active);
}

#[test]
fn charwise_delete_spans_lines_inclusively() {
    let mut s = Session::new("abc\ndef").at(0, 1);
    s.keys("vjd");
    assert_eq!(s.contents(), "af");
    assert_eq!(s.cursor(), (0, 1));
}

#[test]
fn block_delete_removes_a_column() {
    let mut s = Session::new("abcd\nefgh\nijkl");
    s.keys("l<C-v>jjld");
    assert_eq!(s.contents(), "ad\neh\nil");
    assert_eq!(s.cursor(), (0, 1));
}

#[test]
fn visual_upper_case_of_inner_word() {
    let (text, _) = run("foo bar", "viwU");
    assert_eq!(text, "FOO bar");
}

#[test]
fn gv_reselects_the_last_area() {
    let mut s = Session::new("abcd");
    s.keys("vl<Esc>");
    assert!(!s.engine.visual().active);
    s.keys("gvd");
    assert_eq!(s.contents(), "cd");
}

#[test]
fn escape_leaves_visual_without_changes() {
    let mut s = Session::new("abc\ndef");
    s.keys("vj<Esc>");
    assert!(!s.engine.visual().active);
    assert_eq!(s.contents(), "abc\ndef");
    assert_eq!(s.engine.mark('<').map(|p| (p.line, p.byte)), Some((0, 0)));
    assert_eq!(s.engine.mark('>').map(|p| (p.line, p.byte)), Some((1, 0)));
}

#[test]
fn toggling_visual_twice_changes_nothing() {
    let mut s = Session::new("abc\ndef").at(1, 1);
    s.keys("vv");
    assert!(!s.engine.visual().active);
    assert_eq!(s.contents(), "abc\ndef");
    assert_eq!(s.cursor(), (1, 1));
}

#[test]
fn counted_v_reselects_scaled_charwise_area() {
    let mut s = Session::new("abcdef\nabcdef");
    s.keys("vly");
    s.keys("j02vd");
    assert_eq!(s.contents(), "abcdef\nef");
}

#[test]
fn counted_v_reselects_scaled_linewise_area() {
    let mut s = Session::new("a\nb\nc\nd\ne\nf");
    s.keys("Vjy");
    assert_eq!(s.cursor(), (0, 0));
    s.keys("2vd");
    assert_eq!(s.contents(), "e\nf");
}
