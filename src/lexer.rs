//! Tokenizer for the request query language.
//!
//! The tokenizer is pulled by the parser one token at a time. Its only state is a byte
//! cursor into the input, which the parser can save and restore to backtrack.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::{LexErrorKind, ParseError};
use crate::token::{Keyword, LogicalOp, OrderOp, Paren, Span, Token, TokenKind};

// Classifiers run against the lower-cased run.
static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_]+$").expect("static regex"));
static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]*[mshd]$").expect("static regex"));
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("static regex")
});
static HEADER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").expect("static regex"));
static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0|[1-9][0-9]*)$").expect("static regex"));

/// Characters that end a run of non-whitespace input.
const RUN_TERMINATORS: &[char] = &['.', '(', ')', '"', '\'', '=', '<', '>'];

/// A saved tokenizer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(usize);

pub struct Tokenizer<'a> {
    input: &'a str,
    /// Current byte offset into the input
    position: usize,
    /// Set once the iterator has yielded end of input or an error
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            input,
            position: 0,
            finished: false,
        }
    }

    pub fn cursor(&self) -> Cursor {
        Cursor(self.position)
    }

    pub fn restore(&mut self, cursor: Cursor) {
        self.position = cursor.0;
    }

    /// Source text covered by a span.
    pub fn text(&self, span: Span) -> &'a str {
        &self.input[span.start..span.end]
    }

    /// Returns the next token without advancing.
    pub fn peek_token(&self) -> Result<Token<'a>, ParseError> {
        self.scan_at(self.position)
    }

    /// Returns the next token and advances past it. On error the cursor does not move.
    pub fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        let token = self.scan_at(self.position)?;
        self.position = token.span.end;
        Ok(token)
    }

    /// Consumes the next token if it equals `expected`, otherwise leaves the cursor untouched.
    pub fn assert_next(&mut self, expected: &TokenKind<'a>) -> Result<Token<'a>, ParseError> {
        let cursor = self.cursor();
        let token = self.next_token()?;
        if token.kind == *expected {
            return Ok(token);
        }

        self.restore(cursor);
        Err(unexpected_token(expected.to_string(), &token))
    }

    /// Tries each alternative in order and returns the first match, or the last failure.
    pub fn assert_next_one_of(
        &mut self,
        alternatives: &[TokenKind<'a>],
    ) -> Result<Token<'a>, ParseError> {
        let mut last_error = None;
        for alternative in alternatives {
            match self.assert_next(alternative) {
                Ok(token) => return Ok(token),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ParseError::UnexpectedToken {
            expected: "one of no alternatives".to_string(),
            found: "any token".to_string(),
            position: self.position,
        }))
    }

    /// Consumes the next token if `extract` accepts it. Otherwise the cursor is restored and
    /// the error names `expected` and the token actually found.
    pub fn next_matching<T>(
        &mut self,
        expected: &str,
        extract: impl FnOnce(&TokenKind<'a>) -> Option<T>,
    ) -> Result<T, ParseError> {
        let cursor = self.cursor();
        let token = self.next_token()?;
        match extract(&token.kind) {
            Some(value) => Ok(value),
            None => {
                self.restore(cursor);
                Err(unexpected_token(expected, &token))
            }
        }
    }

    pub fn next_string(&mut self) -> Result<&'a str, ParseError> {
        self.next_matching("a string", |kind| match kind {
            TokenKind::String(s) => Some(*s),
            _ => None,
        })
    }

    pub fn next_number(&mut self) -> Result<i64, ParseError> {
        self.next_matching("a number", |kind| match kind {
            TokenKind::Number(n) => Some(*n),
            _ => None,
        })
    }

    pub fn next_uuid(&mut self) -> Result<&'a str, ParseError> {
        self.next_matching("a uuid", |kind| match kind {
            TokenKind::Uuid(s) => Some(*s),
            _ => None,
        })
    }

    pub fn next_duration(&mut self) -> Result<Duration, ParseError> {
        self.next_matching("a duration", |kind| match kind {
            TokenKind::Duration(d) => Some(*d),
            _ => None,
        })
    }

    pub fn next_order_op(&mut self) -> Result<OrderOp, ParseError> {
        self.next_matching("an order operator", |kind| match kind {
            TokenKind::OrderOp(op) => Some(*op),
            _ => None,
        })
    }

    /// Scans one token starting at `from`, skipping leading whitespace.
    fn scan_at(&self, from: usize) -> Result<Token<'a>, ParseError> {
        let rest = &self.input[from..];
        let start = from + (rest.len() - rest.trim_start().len());

        let mut chars = self.input[start..].chars();
        let Some(c) = chars.next() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                span: Span::new(start, start),
            });
        };

        let single = |kind: TokenKind<'a>| Token {
            kind,
            span: Span::new(start, start + 1),
        };

        let token = match c {
            '.' => single(TokenKind::Dot),
            '(' => single(TokenKind::Paren(Paren::Open)),
            ')' => single(TokenKind::Paren(Paren::Close)),
            '=' => single(TokenKind::OrderOp(OrderOp::Eq)),
            '<' | '>' => {
                let or_equal = chars.next() == Some('=');
                let op = match (c, or_equal) {
                    ('<', true) => OrderOp::Le,
                    ('<', false) => OrderOp::Lt,
                    (_, true) => OrderOp::Ge,
                    (_, false) => OrderOp::Gt,
                };
                let len = if or_equal { 2 } else { 1 };
                Token {
                    kind: TokenKind::OrderOp(op),
                    span: Span::new(start, start + len),
                }
            }
            '"' | '\'' => self.scan_string(start, c)?,
            _ => self.scan_run(start)?,
        };
        Ok(token)
    }

    /// Reads a quoted string. There is no escape processing: the string ends at the next
    /// occurrence of the opening quote character.
    fn scan_string(&self, start: usize, quote: char) -> Result<Token<'a>, ParseError> {
        let content_start = start + quote.len_utf8();
        let Some(len) = self.input[content_start..].find(quote) else {
            return Err(ParseError::Lex {
                kind: LexErrorKind::UnterminatedString,
                position: start,
            });
        };

        let content_end = content_start + len;
        Ok(Token {
            kind: TokenKind::String(&self.input[content_start..content_end]),
            span: Span::new(start, content_end + quote.len_utf8()),
        })
    }

    /// Reads a run of non-whitespace characters and classifies it.
    fn scan_run(&self, start: usize) -> Result<Token<'a>, ParseError> {
        let rest = &self.input[start..];
        let len = rest
            .find(|c: char| c.is_whitespace() || RUN_TERMINATORS.contains(&c))
            .unwrap_or(rest.len());
        let text = &rest[..len];
        let span = Span::new(start, start + len);

        let kind = classify(text).map_err(|kind| ParseError::Lex {
            kind,
            position: start,
        })?;
        Ok(Token { kind, span })
    }
}

/// Matches a run against the keyword table and then the literal patterns, in priority order.
fn classify(text: &str) -> Result<TokenKind<'_>, LexErrorKind> {
    let lowered = text.to_lowercase();
    let kind = match lowered.as_str() {
        "query" => TokenKind::Keyword(Keyword::Query),
        "requests" => TokenKind::Keyword(Keyword::Requests),
        "where" => TokenKind::Keyword(Keyword::Where),
        "ago" => TokenKind::Keyword(Keyword::Ago),
        "exists" => TokenKind::Exists,
        "contains" => TokenKind::Contains,
        "icontains" => TokenKind::IContains,
        "and" => TokenKind::LogicalOp(LogicalOp::And),
        "or" => TokenKind::LogicalOp(LogicalOp::Or),
        "not" => TokenKind::LogicalOp(LogicalOp::Not),
        s if IDENTIFIER_RE.is_match(s) => TokenKind::Identifier(text),
        s if DURATION_RE.is_match(s) => TokenKind::Duration(parse_duration(s)?),
        s if UUID_RE.is_match(s) => TokenKind::Uuid(text),
        s if HEADER_NAME_RE.is_match(s) => TokenKind::HeaderName(text),
        s if NUMBER_RE.is_match(s) => TokenKind::Number(
            s.parse::<i64>()
                .map_err(|_| LexErrorKind::InvalidNumber(text.to_string()))?,
        ),
        _ => return Err(LexErrorKind::InvalidToken(text.to_string())),
    };
    Ok(kind)
}

/// Converts a literal such as `10m` into a time span. The caller has already checked the
/// shape, so only overflow can fail here.
fn parse_duration(s: &str) -> Result<Duration, LexErrorKind> {
    let invalid = || LexErrorKind::InvalidDuration(s.to_string());
    let (digits, unit) = s.split_at(s.len() - 1);
    let amount: u64 = digits.parse().map_err(|_| invalid())?;
    let unit_seconds = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(invalid()),
    };
    let seconds = amount.checked_mul(unit_seconds).ok_or_else(invalid)?;
    Ok(Duration::from_secs(seconds))
}

/// Builds the error for a token that is not the one the grammar needed.
pub(crate) fn unexpected_token(expected: impl Into<String>, token: &Token<'_>) -> ParseError {
    match token.kind {
        TokenKind::Eof => ParseError::UnexpectedEndOfInput {
            expected: expected.into(),
            position: token.span.start,
        },
        _ => ParseError::UnexpectedToken {
            expected: expected.into(),
            found: token.kind.to_string(),
            position: token.span.start,
        },
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_token() {
            Ok(Token {
                kind: TokenKind::Eof,
                ..
            }) => {
                self.finished = true;
                None
            }
            Ok(token) => Some(Ok(token)),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
