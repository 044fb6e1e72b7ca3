//! `<Esc>`-style key notation and register encoding.

use crate::{Key, REGISTER_SPECIAL_BASE, Special};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyNotationError {
    #[error("unknown key name <{0}>")]
    UnknownName(String),
    #[error("invalid control key <C-{0}>")]
    InvalidControl(String),
}

fn named_char(name: &str) -> Option<Key> {
    let key = match name.to_ascii_lowercase().as_str() {
        "esc" => Key::ESC,
        "cr" | "enter" | "return" => Key::CR,
        "nl" | "lf" | "linefeed" => Key::NL,
        "tab" => Key::TAB,
        "space" => Key::SPACE,
        "lt" => Key::from_char('<'),
        "bar" => Key::from_char('|'),
        "bslash" => Key::from_char('\\'),
        "nul" => Key::NUL,
        _ => return None,
    };
    Some(key)
}

fn named_special(name: &str) -> Option<Key> {
    Special::ALL
        .iter()
        .copied()
        .find(|s| s.name().eq_ignore_ascii_case(name))
        .map(Key::special)
        .or_else(|| match name.to_ascii_lowercase().as_str() {
            "backspace" => Some(Key::K_BS),
            "delete" => Some(Key::DEL),
            "pageup" => Some(Key::PAGE_UP),
            "pagedown" => Some(Key::PAGE_DOWN),
            _ => None,
        })
}

fn parse_name(name: &str) -> Result<Key, KeyNotationError> {
    if let Some(k) = named_char(name).or_else(|| named_special(name)) {
        return Ok(k);
    }
    if let Some(rest) = name.strip_prefix("C-").or_else(|| name.strip_prefix("c-")) {
        let mut chars = rest.chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() || ('@'..='_').contains(&c) => {
                Ok(Key::ctrl(c))
            }
            (Some('?'), None) => Ok(Key::DEL_CHAR),
            _ => Err(KeyNotationError::InvalidControl(rest.to_string())),
        };
    }
    Err(KeyNotationError::UnknownName(name.to_string()))
}

/// Parse a key script such as `"3d2w"`, `"ihello<Esc>"` or `"<C-w>j"`.
///
/// A `<` that does not start a complete `<name>` is taken literally.
pub fn parse_keys(input: &str) -> Result<Vec<Key>, KeyNotationError> {
    let mut out = Vec::with_capacity(input.len());
    let mut rest = input;
    while let Some(c) = rest.chars().next() {
        if c == '<'
            && let Some(close) = rest[1..].find('>')
            && close > 0
            && !rest[1..1 + close].contains('<')
        {
            let name = &rest[1..1 + close];
            out.push(parse_name(name)?);
            rest = &rest[close + 2..];
            continue;
        }
        out.push(Key::from_char(c));
        rest = &rest[c.len_utf8()..];
    }
    Ok(out)
}

fn control_name(v: i32) -> Option<&'static str> {
    Some(match v {
        0x00 => "Nul",
        0x09 => "Tab",
        0x0a => "NL",
        0x0d => "CR",
        0x1b => "Esc",
        _ => return None,
    })
}

/// Render keys back into notation (the inverse of [`parse_keys`]).
pub fn format_keys(keys: &[Key]) -> String {
    let mut out = String::new();
    for &k in keys {
        if let Some(s) = k.as_special() {
            out.push('<');
            out.push_str(s.name());
            out.push('>');
            continue;
        }
        match k.as_char() {
            Some('<') => out.push_str("<lt>"),
            Some(' ') => out.push(' '),
            Some(c) if (c as u32) < 0x20 => match control_name(c as i32) {
                Some(name) => {
                    out.push('<');
                    out.push_str(name);
                    out.push('>');
                }
                None => {
                    out.push_str("<C-");
                    out.push(char::from((c as u8) | 0x40));
                    out.push('>');
                }
            },
            Some('\u{7f}') => out.push_str("<C-?>"),
            Some(c) => out.push(c),
            None => out.push_str("<?>"),
        }
    }
    out
}

/// Encode keys as register text. Characters are stored as themselves and
/// special keys as code points in a private-use plane, so recorded macros
/// survive being yanked and put back like any other register text.
pub fn keys_to_register(keys: &[Key]) -> String {
    keys.iter()
        .filter_map(|k| match k.as_special() {
            Some(s) => char::from_u32(REGISTER_SPECIAL_BASE + s.offset() as u32),
            None => k.as_char(),
        })
        .collect()
}

/// Decode register text produced by [`keys_to_register`] (or plain typed text).
pub fn keys_from_register(text: &str) -> Vec<Key> {
    text.chars()
        .map(|c| {
            let v = c as u32;
            if v > REGISTER_SPECIAL_BASE
                && let Some(s) = Special::from_offset((v - REGISTER_SPECIAL_BASE) as i32)
            {
                return Key::special(s);
            }
            Key::from_char(c)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_plain_and_named() {
        let keys = parse_keys("d2w<Esc>").unwrap();
        assert_eq!(
            keys,
            vec![
                Key::from_char('d'),
                Key::from_char('2'),
                Key::from_char('w'),
                Key::ESC
            ]
        );
    }

    #[test]
    fn parses_control_and_shifted() {
        let keys = parse_keys("<C-w>j<S-Left><C-\\><C-n>").unwrap();
        assert_eq!(
            keys,
            vec![
                Key::ctrl('w'),
                Key::from_char('j'),
                Key::S_LEFT,
                Key::ctrl('\\'),
                Key::ctrl('n')
            ]
        );
    }

    #[test]
    fn lone_angle_is_literal() {
        let keys = parse_keys("<<").unwrap();
        assert_eq!(keys, vec![Key::from_char('<'), Key::from_char('<')]);
        let keys = parse_keys("a<b").unwrap();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn unknown_name_is_error() {
        assert_eq!(
            parse_keys("<Nope>"),
            Err(KeyNotationError::UnknownName("Nope".into()))
        );
        assert!(matches!(
            parse_keys("<C-1>"),
            Err(KeyNotationError::InvalidControl(_))
        ));
    }

    #[test]
    fn format_uses_lt_for_angle() {
        let keys = parse_keys("i<lt>x<Esc>").unwrap();
        assert_eq!(format_keys(&keys), "i<lt>x<Esc>");
        assert_eq!(format_keys(&[Key::ctrl('w')]), "<C-W>");
    }

    #[test]
    fn register_encoding_keeps_specials() {
        let keys = vec![Key::from_char('i'), Key::LEFT, Key::ESC];
        let text = keys_to_register(&keys);
        assert_eq!(text.chars().count(), 3);
        assert_eq!(keys_from_register(&text), keys);
    }

    proptest! {
        #[test]
        fn notation_reparses(s in "[a-z0-9<> ]{0,24}") {
            let keys = parse_keys(&s.replace('<', "<lt>")).unwrap();
            let again = parse_keys(&format_keys(&keys)).unwrap();
            prop_assert_eq!(keys, again);
        }
    }
}
