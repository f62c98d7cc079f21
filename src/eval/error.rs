use crate::vm::{IndexError, Word};
use thiserror::Error;

/// Problems with an expression the user asked to evaluate.
///
/// None of these disturb the paused program; the session reports the
/// message and keeps prompting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("program is not running.")]
    NotRunning,

    #[error("unknown variable '{0}' (or no debug information available).")]
    UnknownVariable(String),

    #[error("array dimension mismatch.")]
    DimensionMismatch,

    #[error("array index out of bounds.")]
    IndexOutOfBounds,

    #[error("array index must be an integer value.")]
    NonIntegerIndex,

    #[error("modulus operation requires integer values.")]
    ModulusRequiresIntegers,

    #[error("division by zero.")]
    DivisionByZero,

    /// Index or field access applied to a scalar
    #[error("cannot reference scalar variable '{0}'")]
    ScalarReference(String),

    #[error("current object reference is Nil")]
    NilReference,

    #[error("current array value is Nil")]
    NilArray,

    #[error("unable to de-reference empty frame.")]
    EmptyFrame,

    /// Pointer word that does not address a live block of the expected shape
    #[error("invalid memory reference {0:#x}")]
    InvalidPointer(Word),
}

impl From<IndexError> for EvalError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::DimensionMismatch => EvalError::DimensionMismatch,
            IndexError::OutOfBounds => EvalError::IndexOutOfBounds,
        }
    }
}
