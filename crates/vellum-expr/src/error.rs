//! Errors from parsing and evaluating expressions.

/// A syntax error, with the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// A failure while evaluating a well-formed expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// An identifier that is not bound in the scope.
    #[error("`{name}` is not defined")]
    UnknownIdentifier { name: String },
    /// Property or index access on `undefined` or `null`.
    #[error("cannot read `{property}` of {target}")]
    NullAccess {
        property: String,
        target: &'static str,
    },
}

/// Either kind of expression failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}
