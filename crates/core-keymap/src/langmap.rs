//! `'langmap'` translation of command characters.
//!
//! The option is a comma-separated list of parts. Each part is either a run of
//! `from`/`to` pairs (`aA`) or two equally long strings separated by a
//! semicolon (`ABC;abc`). A backslash escapes `,`, `;` and itself.

use std::collections::HashMap;

use core_events::Key;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LangMapError {
    #[error("langmap: mismatched lengths in part {0:?}")]
    MismatchedLength(String),
    #[error("langmap: character {0:?} has no mapping in part {1:?}")]
    Unpaired(char, String),
    #[error("langmap: more than one ';' in part {0:?}")]
    ExtraSemicolon(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LangMap {
    map: HashMap<char, char>,
}

/// Split on unescaped `sep`, keeping escapes in place.
fn split_unescaped(s: &str, sep: char) -> Vec<String> {
    let mut parts = vec![String::new()];
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            parts.last_mut().into_iter().for_each(|p| p.push(c));
            if let Some(n) = chars.next() {
                parts.last_mut().into_iter().for_each(|p| p.push(n));
            }
        } else if c == sep {
            parts.push(String::new());
        } else {
            parts.last_mut().into_iter().for_each(|p| p.push(c));
        }
    }
    parts
}

fn unescape(s: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(n) => out.push(n),
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl LangMap {
    pub fn parse(spec: &str) -> Result<Self, LangMapError> {
        let mut map = HashMap::new();
        for part in split_unescaped(spec, ',') {
            if part.is_empty() {
                continue;
            }
            let halves = split_unescaped(&part, ';');
            match halves.as_slice() {
                [pairs] => {
                    let chars = unescape(pairs);
                    let mut it = chars.chunks_exact(2);
                    for pair in it.by_ref() {
                        map.insert(pair[0], pair[1]);
                    }
                    if let [lonely] = it.remainder() {
                        return Err(LangMapError::Unpaired(*lonely, part.clone()));
                    }
                }
                [from, to] => {
                    let from = unescape(from);
                    let to = unescape(to);
                    if from.len() != to.len() {
                        return Err(LangMapError::MismatchedLength(part.clone()));
                    }
                    map.extend(from.into_iter().zip(to));
                }
                _ => return Err(LangMapError::ExtraSemicolon(part.clone())),
            }
        }
        Ok(Self { map })
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Translate a typed key. Special keys and unmapped characters pass through.
    pub fn adjust(&self, key: Key) -> Key {
        if self.map.is_empty() {
            return key;
        }
        key.as_char()
            .and_then(|c| self.map.get(&c))
            .map(|&c| Key::from_char(c))
            .unwrap_or(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn k(c: char) -> Key {
        Key::from_char(c)
    }

    #[test]
    fn semicolon_form() {
        let lm = LangMap::parse("ΑΒΓ;abc").unwrap();
        assert_eq!(lm.adjust(k('Β')), k('b'));
        assert_eq!(lm.adjust(k('x')), k('x'));
    }

    #[test]
    fn pair_form_and_mixed_parts() {
        let lm = LangMap::parse("jh,hj,ΑΒ;ab").unwrap();
        assert_eq!(lm.adjust(k('j')), k('h'));
        assert_eq!(lm.adjust(k('h')), k('j'));
        assert_eq!(lm.adjust(k('Α')), k('a'));
    }

    #[test]
    fn escapes_protect_separators() {
        let lm = LangMap::parse(r"\;x,\,y,\\z").unwrap();
        assert_eq!(lm.adjust(k(';')), k('x'));
        assert_eq!(lm.adjust(k(',')), k('y'));
        assert_eq!(lm.adjust(k('\\')), k('z'));
    }

    #[test]
    fn specials_pass_through() {
        let lm = LangMap::parse("ab").unwrap();
        assert_eq!(lm.adjust(Key::LEFT), Key::LEFT);
    }

    #[test]
    fn malformed_parts_are_rejected() {
        assert!(matches!(
            LangMap::parse("abc;de"),
            Err(LangMapError::MismatchedLength(_))
        ));
        assert!(matches!(LangMap::parse("abc"), Err(LangMapError::Unpaired('c', _))));
        assert!(matches!(
            LangMap::parse("a;b;c"),
            Err(LangMapError::ExtraSemicolon(_))
        ));
    }

    #[test]
    fn empty_spec_is_identity() {
        let lm = LangMap::parse("").unwrap();
        assert!(lm.is_empty());
        assert_eq!(lm.adjust(k('q')), k('q'));
    }
}
