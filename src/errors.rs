use thiserror::Error;

use crate::core::automaton::{InputId, MachineKind, StateId};

/// Errors produced while editing, loading, or saving a machine.
///
/// Query operations never return this type; they report failure through the
/// `WRONG_STATE` / `WRONG_OUTPUT` sentinels instead. Mutating operations
/// either apply fully or return an error with the machine unchanged.
#[derive(Debug, Error)]
pub enum FsmError {
    /// An id or symbol is out of range or refers to a cleared id slot.
    #[error("{entity} {value} is not a valid identifier here")]
    InvalidIdentifier { entity: &'static str, value: u32 },

    /// A transition was required where none is defined.
    #[error("no transition from state {state} on input {input}")]
    UndefinedTransition { state: StateId, input: InputId },

    /// The write would break a structural invariant of the machine.
    #[error("{0}")]
    InvariantViolation(String),

    /// The operation is not supported by this machine variant.
    #[error("{operation} is not supported by {kind} machines")]
    Capability {
        kind: MachineKind,
        operation: &'static str,
    },

    /// Reading or writing a model file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A model file violated the serialization grammar or its invariants.
    #[error("malformed model file: {0}")]
    Parse(String),
}

impl FsmError {
    /// Shorthand for an [`FsmError::InvariantViolation`] with a formatted message.
    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}
