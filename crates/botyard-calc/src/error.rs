//! Evaluator errors.

use thiserror::Error;

use crate::ast::Construct;

/// Why an expression was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A call names a function outside the allow-list.
    #[error("Function {name} not allowed")]
    DisallowedFunction {
        /// Called name.
        name: String,
    },

    /// A bare name is not an allowed constant.
    #[error("Name {name} is not allowed")]
    DisallowedName {
        /// Referenced name.
        name: String,
    },

    /// The expression uses syntax outside the arithmetic grammar.
    #[error("Unsupported expression: {construct}")]
    UnsupportedExpression {
        /// The rejected construct.
        construct: Construct,
    },

    /// The input could not be tokenized or parsed.
    #[error("Could not parse expression at position {position}: {reason}")]
    ParseFailure {
        /// Character offset of the failure.
        position: usize,
        /// What was wrong.
        reason: String,
    },

    /// An allowed function got the wrong number or kind of arguments.
    #[error("Invalid arguments for {name}(): {reason}")]
    InvalidArguments {
        /// Function name.
        name: String,
        /// What was wrong.
        reason: String,
    },
}

/// Flat classification of [`EvalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvalErrorKind {
    DisallowedFunction,
    DisallowedName,
    UnsupportedExpression,
    ParseFailure,
    InvalidArguments,
}

impl EvalError {
    /// Returns the error's kind.
    pub fn kind(&self) -> EvalErrorKind {
        match self {
            Self::DisallowedFunction { .. } => EvalErrorKind::DisallowedFunction,
            Self::DisallowedName { .. } => EvalErrorKind::DisallowedName,
            Self::UnsupportedExpression { .. } => EvalErrorKind::UnsupportedExpression,
            Self::ParseFailure { .. } => EvalErrorKind::ParseFailure,
            Self::InvalidArguments { .. } => EvalErrorKind::InvalidArguments,
        }
    }

    pub(crate) fn parse(position: usize, reason: impl Into<String>) -> Self {
        Self::ParseFailure {
            position,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_args(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for evaluation.
pub type EvalResult<T> = Result<T, EvalError>;
