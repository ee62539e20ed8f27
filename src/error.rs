//! Error types for parsing and evaluation.
//!
//! Non-local control flow (`break` / `continue` / `return`) travels the same
//! road as real errors: the evaluator short-circuits on the corresponding
//! [`EvalError`] variants, and the enclosing loop or procedure call catches
//! them.  A signal that reaches the surface without being caught is reported
//! as a plain error.

use std::fmt;

use crate::value::Value;

// ── ParseError ────────────────────────────────────────────────────────────────

/// A syntax error, with a 1-based source position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        ParseError {
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

// ── EvalError ─────────────────────────────────────────────────────────────────

/// Any failure produced while evaluating a script.
///
/// `Break`, `Continue`, and `Return` are control signals rather than true
/// failures; they never reach host code when used inside their designated
/// constructs.  `Halt` unwinds the whole evaluation and is converted to a
/// nil result by [`Instance::eval`](crate::Instance::eval).
#[derive(Debug, Clone)]
pub enum EvalError {
    /// Malformed source text.
    Parse(ParseError),
    /// A name that resolves to neither a command, a macro, nor the
    /// missing-command handler.
    UnknownCommand(String),
    /// Wrong number or shape of arguments, or a failed host bind.
    Arg(String),
    /// A value lacks a capability required by the operation.
    Type(String),
    /// An error returned by a host builtin, passed through verbatim.
    Host(String),
    /// Control signal: unwind to the nearest enclosing loop.
    Break(Value),
    /// Control signal: skip to the next loop iteration.
    Continue,
    /// Control signal: unwind to the nearest enclosing procedure call.
    Return(Value),
    /// Unwind the entire evaluation; the top-level entry point yields nil.
    Halt,
}

impl EvalError {
    /// Short kind label, suitable for `kind: message` reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::Parse(_) => "parse error",
            EvalError::UnknownCommand(_) => "name error",
            EvalError::Arg(_) => "arg error",
            EvalError::Type(_) => "type error",
            EvalError::Host(_) => "host error",
            EvalError::Break(_) => "break",
            EvalError::Continue => "continue",
            EvalError::Return(_) => "return",
            EvalError::Halt => "halt",
        }
    }

    pub(crate) fn arg(message: impl Into<String>) -> Self {
        EvalError::Arg(message.into())
    }

    pub(crate) fn type_err(message: impl Into<String>) -> Self {
        EvalError::Type(message.into())
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Parse(e) => write!(f, "{e}"),
            EvalError::UnknownCommand(name) => write!(f, "unknown command \"{name}\""),
            EvalError::Arg(msg) => write!(f, "{msg}"),
            EvalError::Type(msg) => write!(f, "{msg}"),
            EvalError::Host(msg) => write!(f, "{msg}"),
            EvalError::Break(_) => write!(f, "unexpected break outside of a loop"),
            EvalError::Continue => write!(f, "unexpected continue outside of a loop"),
            EvalError::Return(_) => write!(f, "unexpected return outside of a procedure"),
            EvalError::Halt => write!(f, "halted"),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<ParseError> for EvalError {
    fn from(e: ParseError) -> Self {
        EvalError::Parse(e)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_position() {
        let e = ParseError::new("unexpected token", 3, 14);
        assert_eq!(e.to_string(), "3:14: unexpected token");
    }

    #[test]
    fn kinds() {
        assert_eq!(EvalError::UnknownCommand("x".into()).kind(), "name error");
        assert_eq!(EvalError::arg("nope").kind(), "arg error");
        assert_eq!(EvalError::Halt.kind(), "halt");
    }

    #[test]
    fn uncaught_signals_read_as_errors() {
        assert_eq!(
            EvalError::Break(Value::Nil).to_string(),
            "unexpected break outside of a loop"
        );
        assert_eq!(
            EvalError::Return(Value::Nil).to_string(),
            "unexpected return outside of a procedure"
        );
    }
}
