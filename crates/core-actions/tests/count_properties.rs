mod common;

use common::*;
use proptest::prelude::*;

proptest! {
    #[test]
    fn counted_x_deletes_at_most_to_line_end(line in "[a-z]{1,20}", n in 1usize..30) {
        let mut s = Session::new(&line);
        s.keys(&format!("{n}x"));
        prop_assert_eq!(s.contents(), line[n.min(line.len())..].to_string());
    }

    #[test]
    fn counted_dd_removes_leading_lines(lines in prop::collection::vec("[a-z]{1,5}", 1..8), n in 1usize..10) {
        let text = lines.join("\n");
        let mut s = Session::new(&text);
        s.keys(&format!("{n}dd"));
        // A count reaching past the end stops at the last line, unless the
        // cursor is already there.
        let expected = if lines.len() == 1 && n > 1 {
            text.clone()
        } else if n >= lines.len() {
            String::new()
        } else {
            lines[n..].join("\n")
        };
        prop_assert_eq!(s.contents(), expected);
    }

    #[test]
    fn yank_never_changes_text(text in "[a-z ]{0,12}(\n[a-z ]{0,12}){0,3}", motion in prop::sample::select(vec!["w", "e", "$", "j", "G", "iw", "ap", "l"])) {
        let mut s = Session::new(&text);
        let before = s.contents();
        s.keys(&format!("y{motion}"));
        prop_assert_eq!(s.contents(), before);
    }

    #[test]
    fn operator_and_motion_counts_multiply(words in prop::collection::vec("[a-z]{1,4}", 1..12), m in 1usize..4, n in 1usize..4) {
        let text = words.join(" ");
        let mut split = Session::new(&text);
        split.keys(&format!("{m}d{n}w"));
        let mut once = Session::new(&text);
        once.keys(&format!("d{}w", m * n));
        prop_assert_eq!(split.contents(), once.contents());
        prop_assert_eq!(split.register_text('"'), once.register_text('"'));
    }

    #[test]
    fn dot_matches_typing_the_change_again(line in "[a-z]{1,12}", n in 1usize..6) {
        let mut repeated = Session::new(&line);
        repeated.keys(&format!("x{}", ".".repeat(n)));
        let mut typed = Session::new(&line);
        typed.keys(&"x".repeat(n + 1));
        prop_assert_eq!(repeated.contents(), typed.contents());
        prop_assert_eq!(repeated.cursor(), typed.cursor());
    }
}
