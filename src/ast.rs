//! Syntax tree produced by the parser and consumed by the SQL compiler.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use crate::token::OrderOp;

/// The root of the AST, a complete query statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub operation: Operation,
    pub root: Condition,
}

/// What the query returns for the matching transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// The matching rows, newest first
    Get,
    /// Only how many transactions match
    Count,
}

impl Query {
    pub fn get(root: Condition) -> Self {
        Self {
            operation: Operation::Get,
            root,
        }
    }

    pub fn count(root: Condition) -> Self {
        Self {
            operation: Operation::Count,
            root,
        }
    }
}

/// Distinguishes conditions that join their own copy of a table.
///
/// The parser uses the byte offset at which the condition starts, so two conditions of the
/// same query never share a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqueId(pub usize);

impl fmt::Display for UniqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A predicate over one captured request/response pair.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `timestamp <op> <duration> ago`
    Timestamp { op: OrderOp, ago: Duration },
    /// `id = <value>`; only `Eq` compiles
    Id { op: OrderOp, value: String },
    /// `method = GET`
    Method(Method),
    /// `header.<name> ...`
    Header {
        id: UniqueId,
        name: String,
        matcher: HeaderMatch,
    },
    /// `body contains|icontains '<value>'`
    Body(TextMatch),
    /// `path =|contains|icontains '<value>'`
    Path(TextMatch),
    /// `raw contains '<value>'`, matched against url, method, body and headers
    Raw { id: UniqueId, value: String },
    ResponseHeader {
        id: UniqueId,
        name: String,
        matcher: HeaderMatch,
    },
    ResponseBody(TextMatch),
    ResponseStatus { op: OrderOp, value: i64 },
    /// `resp.raw contains '<value>'`, matched against body and headers
    ResponseRaw { id: UniqueId, value: String },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn and(left: Condition, right: Condition) -> Self {
        Condition::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Condition, right: Condition) -> Self {
        Condition::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: Condition) -> Self {
        Condition::Not(Box::new(inner))
    }
}

/// String comparison against a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextMatch {
    Equals(String),
    Contains(String),
    IContains(String),
}

/// How a header condition matches: by presence alone or by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderMatch {
    Exists,
    Value(TextMatch),
}

/// HTTP methods accepted by the `method` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Connect,
    Head,
    /// Spelled `OPTION`, not `OPTIONS`, in the accepted set
    Option,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Head => "HEAD",
            Method::Option => "OPTION",
        }
    }
}

impl FromStr for Method {
    type Err = ();

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "CONNECT" => Ok(Method::Connect),
            "HEAD" => Ok(Method::Head),
            "OPTION" => Ok(Method::Option),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
