//! Error types shared by the tokenizer, parser and compiler.

use thiserror::Error;

/// Why a run of input could not be turned into a token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("invalid token found: '{0}'")]
    InvalidToken(String),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid duration: '{0}'")]
    InvalidDuration(String),

    #[error("invalid number: '{0}'")]
    InvalidNumber(String),
}

/// A failure while tokenizing or parsing a query. Positions are byte offsets into the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{kind} at position {position}")]
    Lex { kind: LexErrorKind, position: usize },

    #[error("expected {expected}, found {found} at position {position}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("expected {expected}, found end of input at position {position}")]
    UnexpectedEndOfInput { expected: String, position: usize },

    #[error("unknown {field} operator: '{operator}' at position {position}")]
    UnknownOperator {
        field: String,
        operator: String,
        position: usize,
    },

    #[error("invalid {field} value: {value} at position {position}")]
    InvalidFieldValue {
        field: String,
        value: String,
        position: usize,
    },

    #[error("unknown field '{name}' at position {position}")]
    UnknownField { name: String, position: usize },

    #[error("conditions nested more than {limit} deep at position {position}")]
    NestingTooDeep { limit: usize, position: usize },
}

impl ParseError {
    /// Byte offset the error points at.
    pub fn position(&self) -> usize {
        match self {
            ParseError::Lex { position, .. }
            | ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEndOfInput { position, .. }
            | ParseError::UnknownOperator { position, .. }
            | ParseError::InvalidFieldValue { position, .. }
            | ParseError::UnknownField { position, .. }
            | ParseError::NestingTooDeep { position, .. } => *position,
        }
    }
}

/// A failure while turning a condition tree into SQL.
///
/// Trees produced by the parser always compile; these cover trees assembled by hand.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("unknown {field} operator: '{operator}'")]
    UnknownOperator { field: String, operator: String },
}

/// Either stage of [`crate::compile_query`] failing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpQlError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}
