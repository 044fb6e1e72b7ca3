use core_events::Key;
use core_state::{RegisterError, TextError};
use thiserror::Error;

/// Why a command was abandoned.
///
/// Every variant is recoverable: the engine clears the pending operator,
/// rings the bell and returns to its initial state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(Key),
    #[error("invalid register name: '{0}'")]
    InvalidRegister(char),
    #[error("empty region")]
    EmptyRegionRejected,
    #[error("motion out of range")]
    OutOfRangeMotion,
    #[error("not allowed here")]
    NotAllowedInContext,
    #[error("pattern not found: {0}")]
    PatternNotFound(String),
    #[error("no previous regular expression")]
    NoPreviousPattern,
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("nothing in register {0}")]
    EmptyRegister(char),
    #[error("mark not set: '{0}'")]
    MarkNotSet(char),
    #[error("no operator function")]
    NoOperatorFunction,
    #[error("definition not found: {0}")]
    DefinitionNotFound(String),
    #[error("no previously used register")]
    NoPreviousRegister,
    #[error("no identifier under cursor")]
    NoIdentifier,
    #[error("resulting text too long")]
    TextTooLong,
}

impl CommandError {
    /// Failures reported with the bell only, no message.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            CommandError::UnknownCommand(_)
                | CommandError::EmptyRegionRejected
                | CommandError::OutOfRangeMotion
                | CommandError::NotAllowedInContext
        )
    }
}

impl From<TextError> for CommandError {
    fn from(e: TextError) -> Self {
        match e {
            TextError::NotModifiable => CommandError::NotAllowedInContext,
            TextError::LineOutOfRange { .. } => CommandError::OutOfRangeMotion,
        }
    }
}

impl From<RegisterError> for CommandError {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::Invalid(c) | RegisterError::ReadOnly(c) => CommandError::InvalidRegister(c),
        }
    }
}

/// Misuse of [`crate::Engine::resume`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResumeError {
    #[error("engine is not waiting for a sub-mode")]
    NotSuspended,
    #[error("resume token does not match the pending sub-mode")]
    StaleToken,
    #[error("outcome does not fit the pending sub-mode")]
    OutcomeMismatch,
}
