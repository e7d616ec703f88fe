use std::fmt;

use thiserror::Error;

/// Which neighbor of an operator failed to parse as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSide {
    Left,
    Right,
}

impl fmt::Display for OperandSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandSide::Left => "left".fmt(f),
            OperandSide::Right => "right".fmt(f),
        }
    }
}

/// Evaluator errors. All of these are terminal for the task: the worker
/// persists `error` status and the poller never routes the task again.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("invalid character in expression: {0:?}")]
    InvalidCharacter(char),

    /// `text` is the offending token, empty when the operand is missing
    /// entirely (e.g. a trailing operator).
    #[error("invalid {side} operand: {text:?}")]
    InvalidOperand { side: OperandSide, text: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("malformed expression")]
    MalformedExpression,
}

/// Store I/O failure. Never terminal: the caller logs it, drops the current
/// cycle/operation, and the task is retried on a later poll.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("task store unavailable: {0}")]
    Unavailable(String),
}

/// Submission-path errors.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("expression contains characters outside digits, + - * / . and whitespace")]
    InvalidExpression,

    #[error(transparent)]
    Store(#[from] StoreError),
}
