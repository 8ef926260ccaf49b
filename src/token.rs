//! The token definition for the request query language.

use std::fmt;
use std::time::Duration;

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    Keyword(Keyword),
    OrderOp(OrderOp),
    LogicalOp(LogicalOp),
    Paren(Paren),
    Dot,
    Exists,
    Contains,
    IContains,

    // Literals
    Identifier(&'a str),
    HeaderName(&'a str),
    Uuid(&'a str),
    Duration(Duration),
    String(&'a str), // Contents only, quotes stripped
    Number(i64),

    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Query,
    Requests,
    Where,
    Ago,
}

/// Ordering comparison, shared by the timestamp, id and status fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderOp {
    Eq, // =
    Gt, // >
    Ge, // >=
    Lt, // <
    Le, // <=
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paren {
    Open,
    Close,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Query => "query",
            Keyword::Requests => "requests",
            Keyword::Where => "where",
            Keyword::Ago => "ago",
        }
    }
}

impl OrderOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderOp::Eq => "=",
            OrderOp::Gt => ">",
            OrderOp::Ge => ">=",
            OrderOp::Lt => "<",
            OrderOp::Le => "<=",
        }
    }
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
            LogicalOp::Not => "not",
        }
    }
}

impl fmt::Display for OrderOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Keyword(k) => write!(f, "'{}'", k.as_str()),
            TokenKind::OrderOp(op) => write!(f, "'{}'", op.as_str()),
            TokenKind::LogicalOp(op) => write!(f, "'{}'", op.as_str()),
            TokenKind::Paren(Paren::Open) => f.write_str("'('"),
            TokenKind::Paren(Paren::Close) => f.write_str("')'"),
            TokenKind::Dot => f.write_str("'.'"),
            TokenKind::Exists => f.write_str("'exists'"),
            TokenKind::Contains => f.write_str("'contains'"),
            TokenKind::IContains => f.write_str("'icontains'"),
            TokenKind::Identifier(s) => write!(f, "identifier '{}'", s),
            TokenKind::HeaderName(s) => write!(f, "header name '{}'", s),
            TokenKind::Uuid(s) => write!(f, "uuid '{}'", s),
            TokenKind::Duration(d) => write!(f, "duration {}s", d.as_secs()),
            TokenKind::String(s) => write!(f, "string '{}'", s),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
