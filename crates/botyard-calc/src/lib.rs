//! # Botyard Calc
//!
//! A small, sandboxed arithmetic evaluator.
//!
//! Input is parsed into an [`Expr`] tree and walked recursively. Only
//! numeric literals, `+ - * / % ^` (`**` is accepted for `^`), unary signs,
//! parentheses, calls to allow-listed functions and allow-listed constants
//! evaluate; every other recognised construct is rejected with
//! [`EvalError::UnsupportedExpression`] naming it.
//!
//! ```
//! use botyard_calc::{evaluate, format_number};
//!
//! assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
//! assert_eq!(evaluate("-2^2").unwrap(), -4.0);
//! assert_eq!(format_number(evaluate("sqrt(16)").unwrap()), "4.0");
//! assert!(evaluate("__import__('os')").is_err());
//! ```
//!
//! The evaluator holds no state and is safe to call from any number of
//! tasks at once.

pub mod ast;
pub mod error;
pub mod eval;
pub mod format;
mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Construct, Expr, UnaryOp};
pub use error::{EvalError, EvalErrorKind, EvalResult};
pub use eval::{constant, eval, function, function_names};
pub use format::format_number;
pub use parser::{MAX_INPUT_CHARS, MAX_NESTING, parse};

/// Parses and evaluates `input`.
pub fn evaluate(input: &str) -> EvalResult<f64> {
    eval(&parse(input)?)
}
