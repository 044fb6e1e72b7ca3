//! core-keymap: Normal-mode command table and lookup index.
//!
//! The table is a static list of [`CommandDescriptor`]s, one per trigger key,
//! mapping the key to a [`Handler`] family, a capability flag set and a static
//! argument. It is compiled in and never mutated.
//!
//! [`CommandIndex`] is built once per process. It sorts the descriptors by the
//! absolute value of their trigger and records the longest prefix of the sorted
//! order in which position `i` holds trigger `i`. Triggers inside that prefix
//! resolve with a direct array access; everything else goes through a binary
//! search on absolute values, which is what lets negative special keys sort
//! together with plain characters.
//!
//! [`LangMap`] implements the `'langmap'` translation applied to command
//! characters and to non-literal second characters.

mod index;
mod langmap;
mod table;

pub use index::CommandIndex;
pub use langmap::{LangMap, LangMapError};
pub use table::{COMMANDS, CommandDescriptor, CommandFlags, Handler, arg};
