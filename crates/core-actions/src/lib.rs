//! The command engine: Normal, Visual and operator-pending mode.
//!
//! An [`Engine`] consumes keys one at a time and edits text through the
//! [`EngineContext`] it is handed on every call. The engine never blocks:
//! when a command needs more keys it returns
//! [`DispatchStatus::NeedsMoreInput`], and when it needs Insert mode or a
//! command line it suspends with [`DispatchStatus::EnteredSubMode`] until the
//! host calls [`Engine::resume`].
//!
//! Layout:
//! - `key_translator`: the per-command state machine (register, counts,
//!   command key, operator, argument keys).
//! - `dispatcher`: one handler per command family.
//! - `span_resolver` and `operators`: the operator range and its effect.
//! - `text_object`, `insert`, `search`, `marks`, `redo`, `registers`.

mod buffer_ops;
mod dispatcher;
mod engine;
mod error;
mod host;
mod insert;
mod key_translator;
mod marks;
mod operators;
mod redo;
mod registers;
pub mod search;
mod span_resolver;
pub mod state;
mod text_object;

pub use engine::{
    CharSearch, DispatchStatus, Engine, EngineContext, Phase, ResumeToken, SubModeKind, SubModeOutcome,
    SubModeRequest,
};
pub use error::{CommandError, ResumeError};
pub use host::{
    DefinitionQuery, DefinitionScope, Host, NullHost, OperatorFunctionCall, ScreenLineQuery, ScreenRow,
    ScrollPlace, WindowCommand,
};
pub use marks::Marks;
pub use redo::{RedoBuffer, Replay};
pub use search::SearchState;
pub use state::{MotionType, OperatorKind, VisualKind, VisualSelection};
