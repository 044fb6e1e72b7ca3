//! Sorted lookup over the command table.

use std::sync::OnceLock;

use core_events::Key;
use tracing::debug;

use crate::table::{COMMANDS, CommandDescriptor};

/// Lookup index over a command table.
///
/// Built once; read-only afterwards. `max_linear` is the last position `i`
/// for which `sorted[i]` has trigger absolute value `i`, or `None` when even
/// position 0 breaks the pattern.
#[derive(Debug)]
pub struct CommandIndex {
    sorted: Vec<CommandDescriptor>,
    max_linear: Option<usize>,
}

static GLOBAL: OnceLock<CommandIndex> = OnceLock::new();

impl CommandIndex {
    /// Sort `table` by absolute trigger value and compute the direct-access prefix.
    pub fn build(table: &[CommandDescriptor]) -> Self {
        let mut sorted = table.to_vec();
        sorted.sort_by_key(|d| d.trigger.abs_value());
        let linear_len = sorted
            .iter()
            .enumerate()
            .take_while(|(i, d)| d.trigger.abs_value() as usize == *i)
            .count();
        let max_linear = linear_len.checked_sub(1);
        debug!(
            target: "keymap",
            commands = sorted.len(),
            ?max_linear,
            "command index built"
        );
        Self { sorted, max_linear }
    }

    /// The process-wide index over [`COMMANDS`].
    pub fn global() -> &'static CommandIndex {
        GLOBAL.get_or_init(|| CommandIndex::build(COMMANDS))
    }

    pub fn max_linear(&self) -> Option<usize> {
        self.max_linear
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Position of `key` in the sorted table.
    ///
    /// Multibyte characters are never commands. Special keys are looked up by
    /// absolute value.
    pub fn find(&self, key: Key) -> Option<usize> {
        if key.is_multibyte() {
            return None;
        }
        let abs = key.abs_value();
        if let Some(max) = self.max_linear
            && abs as usize <= max
        {
            return Some(abs as usize);
        }
        self.sorted
            .binary_search_by_key(&abs, |d| d.trigger.abs_value())
            .ok()
    }

    pub fn lookup(&self, key: Key) -> Option<&CommandDescriptor> {
        self.find(key).map(|i| &self.sorted[i])
    }

    pub fn get(&self, idx: usize) -> Option<&CommandDescriptor> {
        self.sorted.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{CommandFlags, Handler};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn global_index_is_dense_over_ascii() {
        let idx = CommandIndex::global();
        assert_eq!(idx.max_linear(), Some(0x7f));
        assert_eq!(idx.len(), COMMANDS.len());
    }

    #[test]
    fn resolves_chars_and_specials() {
        let idx = CommandIndex::global();
        assert_eq!(idx.lookup(Key::from_char('d')).unwrap().handler, Handler::Operator);
        assert_eq!(idx.lookup(Key::S_LEFT).unwrap().handler, Handler::WordBackward);
        assert_eq!(idx.lookup(Key::IGNORE).unwrap().handler, Handler::Ignore);
        let g = idx.lookup(Key::from_char('g')).unwrap();
        assert!(g.flags.contains(CommandFlags::SECOND_CHAR_ALWAYS));
    }

    #[test]
    fn multibyte_and_unlisted_are_absent() {
        let idx = CommandIndex::global();
        assert_eq!(idx.find(Key::from_char('é')), None);
        assert_eq!(idx.find(Key::from_char('Ā')), None);
        assert_eq!(idx.find(Key::special(core_events::Special::F5)), None);
    }

    #[test]
    fn sparse_table_has_no_linear_prefix() {
        let table = [
            CommandDescriptor {
                trigger: Key::from_char('x'),
                handler: Handler::Nop,
                flags: CommandFlags::empty(),
                static_arg: 0,
            },
            CommandDescriptor {
                trigger: Key::from_char('a'),
                handler: Handler::Error,
                flags: CommandFlags::empty(),
                static_arg: 0,
            },
        ];
        let idx = CommandIndex::build(&table);
        assert_eq!(idx.max_linear(), None);
        assert_eq!(idx.lookup(Key::from_char('x')).unwrap().handler, Handler::Nop);
        assert_eq!(idx.lookup(Key::from_char('a')).unwrap().handler, Handler::Error);
        assert!(idx.lookup(Key::from_char('b')).is_none());
    }

    proptest! {
        #[test]
        fn agrees_with_linear_scan(v in 0u32..0x200) {
            let key = Key::from_char(char::from_u32(v).unwrap());
            let idx = CommandIndex::global();
            let expected = if key.is_multibyte() {
                None
            } else {
                COMMANDS.iter().find(|d| d.trigger == key)
            };
            prop_assert_eq!(idx.lookup(key), expected);
        }
    }
}
