//! Parser for the request query language.
//!
//! ## Parsing flow
//!
//! ```text
//! parse()
//!   ├─ expect 'query' 'requests' 'where'
//!   ├─ parse_condition()
//!   │    ├─ parse_operand()
//!   │    │    ├─ 'not'*                 (each binds the one operand after it)
//!   │    │    ├─ '(' → parse_condition(), expect ')'
//!   │    │    └─ identifier → parse_field_condition()
//!   │    │         ├─ timestamp / id / method / header / body / path / raw
//!   │    │         └─ resp | response → '.' status / header / body / raw
//!   │    │
//!   │    ├─ while next is 'and' | 'or' → parse_operand()
//!   │    └─ fold the operands from the right
//!   └─ expect end of input
//! ```
//!
//! `and` and `or` share one precedence level and associate to the right, so
//! `A and B or C` is `A and (B or C)`.
//!
//! Chains and `not` prefixes are read in loops. Parentheses and each switch between `and`
//! and `or` inside a chain add a level to the generated expression; more than
//! [`MAX_NESTING_DEPTH`] levels is an error.
//!
//! ## Field conditions
//!
//! ```text
//! timestamp <op> <duration> ago          op: = > >= < <=
//! id = <uuid | number | string>
//! method = <identifier | string>          GET POST PUT PATCH DELETE CONNECT HEAD OPTION
//! header.<name> exists
//! header.<name> (= | contains | icontains) <string>
//! body (contains | icontains) <string>
//! path (= | contains | icontains) <string>
//! raw contains <string>
//! resp.status <op> <number>
//! resp.header.<name> ...                  same as header
//! resp.body ...                           same as body
//! resp.raw contains <string>
//! ```
//!
//! ## Examples
//!
//! ```text
//! query requests where method = GET and path contains '/admin'
//! query requests where timestamp > 10m ago and not (resp.status >= 400)
//! query requests where header.Content-Type icontains 'json' or resp.raw contains 'token'
//! ```

use std::str::FromStr;

use tracing::{debug, trace};

use crate::ast::{Condition, HeaderMatch, Method, Query, TextMatch, UniqueId};
use crate::error::ParseError;
use crate::lexer::{unexpected_token, Tokenizer};
use crate::token::{Keyword, LogicalOp, OrderOp, Paren, TokenKind};

/// Operators a field condition may be followed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldOp {
    Order(OrderOp),
    Exists,
    Contains,
    IContains,
}

const ORDER_OPS: &[FieldOp] = &[
    FieldOp::Order(OrderOp::Eq),
    FieldOp::Order(OrderOp::Gt),
    FieldOp::Order(OrderOp::Ge),
    FieldOp::Order(OrderOp::Lt),
    FieldOp::Order(OrderOp::Le),
];
const EQ_ONLY: &[FieldOp] = &[FieldOp::Order(OrderOp::Eq)];
const CONTAINS_ONLY: &[FieldOp] = &[FieldOp::Contains];
const BODY_OPS: &[FieldOp] = &[FieldOp::Contains, FieldOp::IContains];
const PATH_OPS: &[FieldOp] = &[
    FieldOp::Order(OrderOp::Eq),
    FieldOp::Contains,
    FieldOp::IContains,
];
const HEADER_OPS: &[FieldOp] = &[
    FieldOp::Exists,
    FieldOp::Order(OrderOp::Eq),
    FieldOp::Contains,
    FieldOp::IContains,
];

/// Which side of the transaction a header or raw condition looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Request,
    Response,
}

/// Deepest nesting of parentheses and `and`/`or` switches a query may have.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Parses one query string. A parser is consumed by [`Parser::parse`].
pub struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            tokenizer: Tokenizer::new(input),
            depth: 0,
        }
    }

    pub fn parse(mut self) -> Result<Query, ParseError> {
        self.tokenizer.assert_next(&TokenKind::Keyword(Keyword::Query))?;
        self.tokenizer
            .assert_next(&TokenKind::Keyword(Keyword::Requests))?;
        self.tokenizer.assert_next(&TokenKind::Keyword(Keyword::Where))?;

        let root = self.parse_condition()?;
        self.tokenizer.assert_next(&TokenKind::Eof)?;

        let query = Query::get(root);
        debug!(operation = ?query.operation, "parsed query");
        Ok(query)
    }

    /// Parses operands joined by `and`/`or` and folds them to the right.
    fn parse_condition(&mut self) -> Result<Condition, ParseError> {
        let base_depth = self.depth;
        let result = self.parse_chain();
        self.depth = base_depth;
        result
    }

    fn parse_chain(&mut self) -> Result<Condition, ParseError> {
        let first = self.parse_operand()?;
        let mut rest: Vec<(LogicalOp, Condition)> = Vec::new();

        loop {
            let token = self.tokenizer.peek_token()?;
            let op = match token.kind {
                TokenKind::LogicalOp(op @ (LogicalOp::And | LogicalOp::Or)) => op,
                _ => break,
            };
            if rest.last().is_some_and(|(last, _)| *last != op) {
                self.descend(token.span.start)?;
            }
            self.tokenizer.next_token()?;
            rest.push((op, self.parse_operand()?));
        }

        let Some((mut op, mut condition)) = rest.pop() else {
            return Ok(first);
        };
        while let Some((previous, left)) = rest.pop() {
            condition = combine(op, left, condition);
            op = previous;
        }
        Ok(combine(op, first, condition))
    }

    /// One field condition or parenthesized group, with any number of `not` in front.
    fn parse_operand(&mut self) -> Result<Condition, ParseError> {
        let mut negations = 0usize;
        while self.tokenizer.peek_token()?.kind == TokenKind::LogicalOp(LogicalOp::Not) {
            self.tokenizer.next_token()?;
            negations += 1;
        }

        let token = self.tokenizer.peek_token()?;
        let condition = match token.kind {
            TokenKind::Paren(Paren::Open) => {
                self.tokenizer.next_token()?;
                self.descend(token.span.start)?;
                let inner = self.parse_condition()?;
                self.depth -= 1;
                self.tokenizer
                    .assert_next(&TokenKind::Paren(Paren::Close))?;
                inner
            }
            TokenKind::Identifier(name) => {
                self.tokenizer.next_token()?;
                self.parse_field_condition(name, token.span.start)?
            }
            _ => return Err(unexpected_token("a request condition", &token)),
        };

        Ok((0..negations).fold(condition, |inner, _| Condition::not(inner)))
    }

    fn descend(&mut self, position: usize) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
                position,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Dispatches on the field name, which has already been consumed.
    fn parse_field_condition(&mut self, name: &str, start: usize) -> Result<Condition, ParseError> {
        let id = UniqueId(start);
        match name.to_ascii_lowercase().as_str() {
            "timestamp" => self.parse_timestamp_condition(),
            "id" => self.parse_id_condition(),
            "method" => self.parse_method_condition(),
            "header" => self.parse_header_condition(id, Side::Request),
            "body" => Ok(Condition::Body(self.parse_text_match("body", BODY_OPS)?)),
            "path" => Ok(Condition::Path(self.parse_text_match("path", PATH_OPS)?)),
            "raw" => self.parse_raw_condition(id, Side::Request),
            "resp" | "response" => self.parse_response_condition(id),
            _ => Err(ParseError::UnknownField {
                name: name.to_string(),
                position: start,
            }),
        }
    }

    fn parse_timestamp_condition(&mut self) -> Result<Condition, ParseError> {
        let op = self.expect_order_op("timestamp", ORDER_OPS)?;
        let ago = self.tokenizer.next_duration()?;
        self.tokenizer.assert_next(&TokenKind::Keyword(Keyword::Ago))?;
        Ok(Condition::Timestamp { op, ago })
    }

    /// The value is tried as a UUID, then a number, then a string.
    fn parse_id_condition(&mut self) -> Result<Condition, ParseError> {
        let op = self.expect_order_op("id", EQ_ONLY)?;

        let value = match self.tokenizer.next_uuid() {
            Ok(uuid) => uuid.to_string(),
            Err(_) => {
                trace!("id value is not a uuid, trying a number");
                match self.tokenizer.next_number() {
                    Ok(n) => n.to_string(),
                    Err(_) => {
                        trace!("id value is not a number, trying a string");
                        self.tokenizer
                            .next_string()
                            .map_err(|e| invalid_value("id", e))?
                            .to_string()
                    }
                }
            }
        };

        Ok(Condition::Id { op, value })
    }

    fn parse_method_condition(&mut self) -> Result<Condition, ParseError> {
        self.expect_operator("method", EQ_ONLY)?;

        let token = self.tokenizer.next_token()?;
        let text = match token.kind {
            TokenKind::Identifier(s) | TokenKind::String(s) => s,
            TokenKind::Eof => return Err(unexpected_token("a request method", &token)),
            ref other => {
                return Err(ParseError::InvalidFieldValue {
                    field: "method".to_string(),
                    value: other.to_string(),
                    position: token.span.start,
                })
            }
        };

        let method = Method::from_str(text).map_err(|()| ParseError::InvalidFieldValue {
            field: "method".to_string(),
            value: format!("'{}'", text.to_ascii_uppercase()),
            position: token.span.start,
        })?;
        Ok(Condition::Method(method))
    }

    /// `.<name>` followed by `exists` or a value comparison.
    fn parse_header_condition(&mut self, id: UniqueId, side: Side) -> Result<Condition, ParseError> {
        let field = match side {
            Side::Request => "header",
            Side::Response => "resp.header",
        };

        self.tokenizer.assert_next(&TokenKind::Dot)?;
        let name = self
            .tokenizer
            .next_matching("a header name", |kind| match kind {
                TokenKind::HeaderName(s) | TokenKind::Identifier(s) => Some(*s),
                _ => None,
            })?
            .to_string();

        let matcher = match self.expect_operator(field, HEADER_OPS)? {
            FieldOp::Exists => HeaderMatch::Exists,
            op => HeaderMatch::Value(text_match(op, self.tokenizer.next_string()?)),
        };

        Ok(match side {
            Side::Request => Condition::Header { id, name, matcher },
            Side::Response => Condition::ResponseHeader { id, name, matcher },
        })
    }

    fn parse_raw_condition(&mut self, id: UniqueId, side: Side) -> Result<Condition, ParseError> {
        let field = match side {
            Side::Request => "raw",
            Side::Response => "resp.raw",
        };

        self.expect_operator(field, CONTAINS_ONLY)?;
        let value = self.tokenizer.next_string()?.to_string();

        Ok(match side {
            Side::Request => Condition::Raw { id, value },
            Side::Response => Condition::ResponseRaw { id, value },
        })
    }

    /// `resp` or `response` has been consumed; expects `.` and a response field.
    fn parse_response_condition(&mut self, id: UniqueId) -> Result<Condition, ParseError> {
        self.tokenizer.assert_next(&TokenKind::Dot)?;

        let token = self.tokenizer.next_token()?;
        let TokenKind::Identifier(field) = token.kind else {
            return Err(unexpected_token("a response field", &token));
        };

        match field.to_ascii_lowercase().as_str() {
            "status" => {
                let op = self.expect_order_op("resp.status", ORDER_OPS)?;
                let value = self.tokenizer.next_number()?;
                Ok(Condition::ResponseStatus { op, value })
            }
            "header" => self.parse_header_condition(id, Side::Response),
            "body" => Ok(Condition::ResponseBody(
                self.parse_text_match("resp.body", BODY_OPS)?,
            )),
            "raw" => self.parse_raw_condition(id, Side::Response),
            _ => Err(ParseError::UnknownField {
                name: format!("resp.{}", field),
                position: token.span.start,
            }),
        }
    }

    fn parse_text_match(&mut self, field: &str, allowed: &[FieldOp]) -> Result<TextMatch, ParseError> {
        let op = self.expect_operator(field, allowed)?;
        let value = self.tokenizer.next_string()?;
        Ok(text_match(op, value))
    }

    /// Consumes the operator after a field. An operator that exists in the language but is
    /// not in `allowed` is reported as unknown for that field.
    fn expect_operator(&mut self, field: &str, allowed: &[FieldOp]) -> Result<FieldOp, ParseError> {
        let token = self.tokenizer.next_token()?;
        let op = match token.kind {
            TokenKind::OrderOp(op) => FieldOp::Order(op),
            TokenKind::Exists => FieldOp::Exists,
            TokenKind::Contains => FieldOp::Contains,
            TokenKind::IContains => FieldOp::IContains,
            _ => return Err(unexpected_token(format!("a {} operator", field), &token)),
        };

        if !allowed.contains(&op) {
            return Err(ParseError::UnknownOperator {
                field: field.to_string(),
                operator: self.tokenizer.text(token.span).to_string(),
                position: token.span.start,
            });
        }
        Ok(op)
    }

    fn expect_order_op(&mut self, field: &str, allowed: &[FieldOp]) -> Result<OrderOp, ParseError> {
        let token = self.tokenizer.peek_token()?;
        match self.expect_operator(field, allowed)? {
            FieldOp::Order(op) => Ok(op),
            _ => Err(unexpected_token("an order operator", &token)),
        }
    }
}

fn combine(op: LogicalOp, left: Condition, right: Condition) -> Condition {
    match op {
        LogicalOp::And => Condition::and(left, right),
        _ => Condition::or(left, right),
    }
}

fn text_match(op: FieldOp, value: &str) -> TextMatch {
    let value = value.to_string();
    match op {
        FieldOp::Contains => TextMatch::Contains(value),
        FieldOp::IContains => TextMatch::IContains(value),
        FieldOp::Order(_) | FieldOp::Exists => TextMatch::Equals(value),
    }
}

/// A wrong kind of literal where a field value belongs.
fn invalid_value(field: &str, err: ParseError) -> ParseError {
    match err {
        ParseError::UnexpectedToken { found, position, .. } => ParseError::InvalidFieldValue {
            field: field.to_string(),
            value: found,
            position,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LexErrorKind;
    use std::time::Duration;

    fn parse_string(input: &str) -> Result<Query, ParseError> {
        Parser::new(input).parse()
    }

    fn parse_root(condition: &str) -> Condition {
        parse_string(&format!("query requests where {}", condition))
            .unwrap()
            .root
    }

    fn parse_err(condition: &str) -> ParseError {
        parse_string(&format!("query requests where {}", condition)).unwrap_err()
    }

    #[test]
    fn test_simple_method_condition() {
        let query = parse_string("query requests where method = GET").unwrap();
        assert_eq!(query.operation, crate::ast::Operation::Get);
        assert_eq!(query.root, Condition::Method(Method::Get));
    }

    #[test]
    fn test_method_is_upper_cased() {
        assert_eq!(parse_root("method = 'delete'"), Condition::Method(Method::Delete));
        assert_eq!(parse_root("method = patch"), Condition::Method(Method::Patch));
        assert_eq!(parse_root("method = OPTION"), Condition::Method(Method::Option));
    }

    #[test]
    fn test_invalid_method() {
        let err = parse_err("method = FETCH");
        assert_eq!(
            err,
            ParseError::InvalidFieldValue {
                field: "method".to_string(),
                value: "'FETCH'".to_string(),
                position: 30,
            }
        );
        assert!(matches!(
            parse_err("method = OPTIONS"),
            ParseError::InvalidFieldValue { .. }
        ));
        assert!(matches!(
            parse_err("method = 42"),
            ParseError::InvalidFieldValue { .. }
        ));
    }

    #[test]
    fn test_method_requires_equals() {
        assert!(matches!(
            parse_err("method contains 'GET'"),
            ParseError::UnknownOperator { .. }
        ));
    }

    #[test]
    fn test_keywords_and_fields_are_case_insensitive() {
        let query = parse_string("QUERY Requests WHERE Method = get AND PATH contains '/a'").unwrap();
        assert_eq!(
            query.root,
            Condition::and(
                Condition::Method(Method::Get),
                Condition::Path(TextMatch::Contains("/a".to_string())),
            )
        );
    }

    #[test]
    fn test_timestamp_condition() {
        assert_eq!(
            parse_root("timestamp > 10m ago"),
            Condition::Timestamp {
                op: OrderOp::Gt,
                ago: Duration::from_secs(600),
            }
        );
        assert_eq!(
            parse_root("timestamp <= 1d ago"),
            Condition::Timestamp {
                op: OrderOp::Le,
                ago: Duration::from_secs(86400),
            }
        );
    }

    #[test]
    fn test_timestamp_requires_ago() {
        assert!(matches!(
            parse_err("timestamp > 2h"),
            ParseError::UnexpectedEndOfInput { .. }
        ));
    }

    #[test]
    fn test_timestamp_bad_duration() {
        assert_eq!(
            parse_err("timestamp > 10x ago"),
            ParseError::Lex {
                kind: LexErrorKind::InvalidToken("10x".to_string()),
                position: 33,
            }
        );
    }

    #[test]
    fn test_id_value_try_order() {
        let uuid = "0f8fad5b-d9cb-469f-a165-70867728950e";
        assert_eq!(
            parse_root(&format!("id = {}", uuid)),
            Condition::Id {
                op: OrderOp::Eq,
                value: uuid.to_string(),
            }
        );
        assert_eq!(
            parse_root("id = 42"),
            Condition::Id {
                op: OrderOp::Eq,
                value: "42".to_string(),
            }
        );
        assert_eq!(
            parse_root("id = 'custom-id'"),
            Condition::Id {
                op: OrderOp::Eq,
                value: "custom-id".to_string(),
            }
        );
    }

    #[test]
    fn test_id_only_accepts_eq() {
        for op in [">", ">=", "<", "<="] {
            let err = parse_err(&format!("id {} 42", op));
            assert_eq!(
                err,
                ParseError::UnknownOperator {
                    field: "id".to_string(),
                    operator: op.to_string(),
                    position: 24,
                }
            );
        }
    }

    #[test]
    fn test_id_rejects_other_literals() {
        assert!(matches!(
            parse_err("id = abc"),
            ParseError::InvalidFieldValue { .. }
        ));
        assert!(matches!(
            parse_err("id ="),
            ParseError::UnexpectedEndOfInput { .. }
        ));
    }

    #[test]
    fn test_header_conditions() {
        assert_eq!(
            parse_root("header.Content-Type exists"),
            Condition::Header {
                id: UniqueId(21),
                name: "Content-Type".to_string(),
                matcher: HeaderMatch::Exists,
            }
        );
        assert_eq!(
            parse_root("header.host = 'example.com'"),
            Condition::Header {
                id: UniqueId(21),
                name: "host".to_string(),
                matcher: HeaderMatch::Value(TextMatch::Equals("example.com".to_string())),
            }
        );
        assert_eq!(
            parse_root("header.Accept icontains \"JSON\""),
            Condition::Header {
                id: UniqueId(21),
                name: "Accept".to_string(),
                matcher: HeaderMatch::Value(TextMatch::IContains("JSON".to_string())),
            }
        );
    }

    #[test]
    fn test_header_ids_are_unique() {
        let root = parse_root("header.a exists and header.b exists");
        let Condition::And(left, right) = root else {
            panic!("Expected AND condition");
        };
        match (left.as_ref(), right.as_ref()) {
            (Condition::Header { id: a, .. }, Condition::Header { id: b, .. }) => {
                assert_ne!(a, b)
            }
            other => panic!("Expected two header conditions, got {:?}", other),
        }
    }

    #[test]
    fn test_header_rejects_order_ops() {
        assert!(matches!(
            parse_err("header.host > 'a'"),
            ParseError::UnknownOperator { .. }
        ));
    }

    #[test]
    fn test_body_and_path() {
        assert_eq!(
            parse_root("body contains 'password'"),
            Condition::Body(TextMatch::Contains("password".to_string()))
        );
        assert_eq!(
            parse_root("path = '/login'"),
            Condition::Path(TextMatch::Equals("/login".to_string()))
        );
        assert_eq!(
            parse_root("path icontains '/Admin'"),
            Condition::Path(TextMatch::IContains("/Admin".to_string()))
        );
    }

    #[test]
    fn test_body_rejects_equals() {
        assert_eq!(
            parse_err("body = 'x'"),
            ParseError::UnknownOperator {
                field: "body".to_string(),
                operator: "=".to_string(),
                position: 26,
            }
        );
    }

    #[test]
    fn test_raw_condition() {
        assert_eq!(
            parse_root("raw contains 'secret'"),
            Condition::Raw {
                id: UniqueId(21),
                value: "secret".to_string(),
            }
        );
        assert!(matches!(
            parse_err("raw icontains 'secret'"),
            ParseError::UnknownOperator { .. }
        ));
    }

    #[test]
    fn test_response_conditions() {
        assert_eq!(
            parse_root("resp.status > 499"),
            Condition::ResponseStatus {
                op: OrderOp::Gt,
                value: 499,
            }
        );
        assert_eq!(
            parse_root("response.body icontains 'error'"),
            Condition::ResponseBody(TextMatch::IContains("error".to_string()))
        );
        assert_eq!(
            parse_root("resp.header.Set-Cookie exists"),
            Condition::ResponseHeader {
                id: UniqueId(21),
                name: "Set-Cookie".to_string(),
                matcher: HeaderMatch::Exists,
            }
        );
        assert_eq!(
            parse_root("resp.raw contains 'token'"),
            Condition::ResponseRaw {
                id: UniqueId(21),
                value: "token".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_response_field() {
        assert_eq!(
            parse_err("resp.latency > 5"),
            ParseError::UnknownField {
                name: "resp.latency".to_string(),
                position: 26,
            }
        );
    }

    #[test]
    fn test_unknown_field() {
        assert_eq!(
            parse_err("host = 'x'"),
            ParseError::UnknownField {
                name: "host".to_string(),
                position: 21,
            }
        );
    }

    #[test]
    fn test_missing_condition() {
        assert!(matches!(
            parse_string("query requests where"),
            Err(ParseError::UnexpectedEndOfInput { .. })
        ));
    }

    #[test]
    fn test_missing_requests_keyword() {
        assert!(matches!(
            parse_string("query where method = GET"),
            Err(ParseError::UnexpectedToken { position: 6, .. })
        ));
        assert!(matches!(
            parse_string("query"),
            Err(ParseError::UnexpectedEndOfInput { .. })
        ));
    }

    #[test]
    fn test_trailing_tokens_are_rejected() {
        assert!(matches!(
            parse_err("method = GET method = POST"),
            ParseError::UnexpectedToken { .. }
        ));
    }

    #[test]
    fn test_and_or_are_right_associative() {
        let root = parse_root("method = GET and path contains '/a' or path contains '/b'");
        assert_eq!(
            root,
            Condition::and(
                Condition::Method(Method::Get),
                Condition::or(
                    Condition::Path(TextMatch::Contains("/a".to_string())),
                    Condition::Path(TextMatch::Contains("/b".to_string())),
                ),
            )
        );
    }

    #[test]
    fn test_or_then_and() {
        let root = parse_root("method = GET or method = POST and resp.status = 200");
        assert_eq!(
            root,
            Condition::or(
                Condition::Method(Method::Get),
                Condition::and(
                    Condition::Method(Method::Post),
                    Condition::ResponseStatus {
                        op: OrderOp::Eq,
                        value: 200,
                    },
                ),
            )
        );
    }

    #[test]
    fn test_not_binds_single_condition() {
        let root = parse_root("not method = GET and path = '/'");
        assert_eq!(
            root,
            Condition::and(
                Condition::not(Condition::Method(Method::Get)),
                Condition::Path(TextMatch::Equals("/".to_string())),
            )
        );
    }

    #[test]
    fn test_not_with_group() {
        let root = parse_root("not (method = GET or method = HEAD)");
        assert_eq!(
            root,
            Condition::not(Condition::or(
                Condition::Method(Method::Get),
                Condition::Method(Method::Head),
            ))
        );
    }

    #[test]
    fn test_grouping_is_transparent() {
        assert_eq!(parse_root("(method = GET)"), parse_root("method = GET"));
        assert_eq!(parse_root("((method = GET))"), parse_root("method = GET"));
    }

    #[test]
    fn test_group_followed_by_and() {
        let root = parse_root("(method = GET or method = PUT) and path = '/x'");
        assert_eq!(
            root,
            Condition::and(
                Condition::or(
                    Condition::Method(Method::Get),
                    Condition::Method(Method::Put),
                ),
                Condition::Path(TextMatch::Equals("/x".to_string())),
            )
        );
    }

    #[test]
    fn test_unclosed_group() {
        assert!(matches!(
            parse_err("(method = GET"),
            ParseError::UnexpectedEndOfInput { .. }
        ));
    }

    #[test]
    fn test_dangling_and() {
        assert!(matches!(
            parse_err("method = GET and"),
            ParseError::UnexpectedEndOfInput { .. }
        ));
    }

    #[test]
    fn test_condition_must_start_with_field() {
        assert!(matches!(
            parse_err("'GET' = method"),
            ParseError::UnexpectedToken { position: 21, .. }
        ));
    }

    #[test]
    fn test_long_chain_is_right_folded() {
        let input = format!("{}method = GET", "method = GET and ".repeat(3000));
        let mut node = parse_root(&input);
        let mut links = 0;
        while let Condition::And(left, right) = node {
            assert_eq!(*left, Condition::Method(Method::Get));
            node = *right;
            links += 1;
        }
        assert_eq!(links, 3000);
        assert_eq!(node, Condition::Method(Method::Get));
    }

    #[test]
    fn test_repeated_not() {
        let mut node = parse_root(&format!("{}method = GET", "not ".repeat(1000)));
        let mut negations = 0;
        while let Condition::Not(inner) = node {
            node = *inner;
            negations += 1;
        }
        assert_eq!(negations, 1000);
        assert_eq!(node, Condition::Method(Method::Get));
    }

    #[test]
    fn test_group_nesting_limit() {
        let nested = |levels: usize| {
            format!(
                "{}method = GET{}",
                "(".repeat(levels),
                ")".repeat(levels)
            )
        };
        assert_eq!(
            parse_root(&nested(MAX_NESTING_DEPTH)),
            Condition::Method(Method::Get)
        );
        assert_eq!(
            parse_err(&nested(MAX_NESTING_DEPTH + 1)),
            ParseError::NestingTooDeep {
                limit: MAX_NESTING_DEPTH,
                position: 21 + MAX_NESTING_DEPTH,
            }
        );
    }

    #[test]
    fn test_alternating_chain_limit() {
        let alternating = |pairs: usize| {
            format!(
                "{}method = GET",
                "method = GET and method = PUT or ".repeat(pairs)
            )
        };
        assert!(parse_string(&format!("query requests where {}", alternating(50))).is_ok());
        assert!(matches!(
            parse_err(&alternating(MAX_NESTING_DEPTH)),
            ParseError::NestingTooDeep { .. }
        ));
    }
}
