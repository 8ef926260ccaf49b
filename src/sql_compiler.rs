//! SQL compiler that turns a parsed query into a parameterized SQLite statement using sea-query.
//!
//! Every condition renders a boolean expression whose bound values sea-query collects in
//! left-to-right order. Header and raw conditions also need their own copy of the headers
//! table, joined under an alias derived from the condition's [`UniqueId`].

use sea_query::{
    Alias, Asterisk, Expr, Func, Iden, JoinType, LikeExpr, Order, SelectStatement, SimpleExpr,
    SqliteQueryBuilder, Values,
};
use tracing::debug;

use crate::ast::{Condition, HeaderMatch, Operation, OrderOp, Query as AstQuery, TextMatch, UniqueId};
use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::token::LogicalOp;

/// Escape character used in `LIKE ... ESCAPE` clauses.
const LIKE_ESCAPE: char = '!';

/// Table aliases used in the generated statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAlias {
    Request,
    Response,
    Header(UniqueId),
}

impl Iden for TableAlias {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        match self {
            TableAlias::Request => write!(s, "req").unwrap(),
            TableAlias::Response => write!(s, "resp").unwrap(),
            TableAlias::Header(id) => write!(s, "h{}", id).unwrap(),
        }
    }
}

/// Columns of the transaction log tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Timestamp,
    RequestId,
    ResponseId,
    Method,
    Url,
    Body,
    StatusCode,
    Name,
    Value,
}

impl Iden for Column {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let name = match self {
            Column::Timestamp => "timestamp",
            Column::RequestId => "request_id",
            Column::ResponseId => "response_id",
            Column::Method => "method",
            Column::Url => "url",
            Column::Body => "body",
            Column::StatusCode => "status_code",
            Column::Name => "name",
            Column::Value => "value",
        };
        write!(s, "{}", name).unwrap();
    }
}

/// Which side of the transaction a joined headers table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinSide {
    Request,
    Response,
}

/// One `INNER JOIN headers <alias>` needed by a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderJoin {
    pub alias: TableAlias,
    pub side: JoinSide,
}

/// A statement ready to hand to the storage layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    /// Bound values, in placeholder order
    pub values: Values,
}

/// SQL Compiler that converts the query AST to SQL
#[derive(Debug, Clone, Default)]
pub struct SqlCompiler {
    config: CompilerConfig,
}

impl SqlCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Compiles a query into SQL text and its bound values.
    pub fn compile(&self, query: &AstQuery) -> Result<CompiledQuery, CompileError> {
        let predicate = self.predicate(&query.root)?;
        let mut joins = Vec::new();
        collect_joins(&query.root, &mut joins);

        let mut select = SelectStatement::new();
        select
            .distinct()
            .columns([
                (TableAlias::Request, Column::Timestamp),
                (TableAlias::Request, Column::RequestId),
                (TableAlias::Request, Column::Method),
                (TableAlias::Response, Column::StatusCode),
                (TableAlias::Request, Column::Url),
            ])
            .from_as(Alias::new(self.config.tables.requests.as_str()), TableAlias::Request)
            .join_as(
                JoinType::InnerJoin,
                Alias::new(self.config.tables.responses.as_str()),
                TableAlias::Response,
                Expr::col((TableAlias::Request, Column::RequestId))
                    .equals((TableAlias::Response, Column::ResponseId)),
            );

        for join in &joins {
            let (link, owner, owner_column) = match join.side {
                JoinSide::Request => (Column::RequestId, TableAlias::Request, Column::RequestId),
                JoinSide::Response => {
                    (Column::ResponseId, TableAlias::Response, Column::ResponseId)
                }
            };
            select.join_as(
                JoinType::InnerJoin,
                Alias::new(self.config.tables.headers.as_str()),
                join.alias,
                Expr::col((join.alias, link)).equals((owner, owner_column)),
            );
        }

        select.and_where(predicate);

        let statement = match query.operation {
            Operation::Get => {
                select.order_by((TableAlias::Request, Column::Timestamp), Order::Desc);
                select
            }
            Operation::Count => {
                let mut count = SelectStatement::new();
                count
                    .expr(Func::count(Expr::col(Asterisk)))
                    .from_subquery(select, Alias::new("matched"));
                count
            }
        };

        let (sql, values) = statement.build(SqliteQueryBuilder);
        debug!(
            %sql,
            params = values.0.len(),
            joins = joins.len(),
            operation = ?query.operation,
            "compiled query"
        );
        Ok(CompiledQuery { sql, values })
    }

    /// Renders the boolean expression for a condition tree.
    fn predicate(&self, condition: &Condition) -> Result<SimpleExpr, CompileError> {
        let expr = match condition {
            Condition::Timestamp { op, ago } => compare(
                col(TableAlias::Request, Column::Timestamp),
                *op,
                Expr::cust(format!("datetime('now', '-{} seconds')", ago.as_secs())),
            ),
            Condition::Id { op, value } => {
                if *op != OrderOp::Eq {
                    return Err(CompileError::UnknownOperator {
                        field: "id".to_string(),
                        operator: op.to_string(),
                    });
                }
                col(TableAlias::Request, Column::RequestId).eq(value.as_str())
            }
            Condition::Method(method) => col(TableAlias::Request, Column::Method).eq(method.as_str()),
            Condition::Header { id, name, matcher }
            | Condition::ResponseHeader { id, name, matcher } => {
                self.header_predicate(TableAlias::Header(*id), name, matcher)
            }
            Condition::Body(matcher) => {
                self.text_predicate(col(TableAlias::Request, Column::Body), matcher)
            }
            Condition::Path(matcher) => {
                self.text_predicate(col(TableAlias::Request, Column::Url), matcher)
            }
            Condition::Raw { id, value } => {
                let header = TableAlias::Header(*id);
                self.any_contains(
                    col(TableAlias::Request, Column::Url),
                    [
                        col(TableAlias::Request, Column::Method),
                        col(TableAlias::Request, Column::Body),
                        col(header, Column::Value),
                        col(header, Column::Name),
                    ],
                    value,
                )
            }
            Condition::ResponseBody(matcher) => {
                self.text_predicate(col(TableAlias::Response, Column::Body), matcher)
            }
            Condition::ResponseStatus { op, value } => {
                compare(col(TableAlias::Response, Column::StatusCode), *op, *value)
            }
            Condition::ResponseRaw { id, value } => {
                let header = TableAlias::Header(*id);
                self.any_contains(
                    col(TableAlias::Response, Column::Body),
                    [col(header, Column::Value), col(header, Column::Name)],
                    value,
                )
            }
            Condition::And(..) => self.chain_predicate(condition, LogicalOp::And)?,
            Condition::Or(..) => self.chain_predicate(condition, LogicalOp::Or)?,
            Condition::Not(_) => {
                let mut inner = condition;
                let mut negated = false;
                while let Condition::Not(next) = inner {
                    negated = !negated;
                    inner = &**next;
                }
                let expr = self.predicate(inner)?;
                if negated {
                    expr.not()
                } else {
                    expr
                }
            }
        };
        Ok(expr)
    }

    /// Flattens a run of `op` nodes into its operands, left to right, and joins them as a
    /// balanced tree so the rendered expression stays shallow for long chains.
    fn chain_predicate(
        &self,
        condition: &Condition,
        op: LogicalOp,
    ) -> Result<SimpleExpr, CompileError> {
        let mut operands = Vec::new();
        let mut pending = vec![condition];
        while let Some(node) = pending.pop() {
            match (node, op) {
                (Condition::And(left, right), LogicalOp::And)
                | (Condition::Or(left, right), LogicalOp::Or) => {
                    pending.push(&**right);
                    pending.push(&**left);
                }
                _ => operands.push(self.predicate(node)?),
            }
        }

        while operands.len() > 1 {
            let mut paired = Vec::with_capacity(operands.len().div_ceil(2));
            let mut level = operands.into_iter();
            while let Some(left) = level.next() {
                paired.push(match level.next() {
                    Some(right) if op == LogicalOp::And => left.and(right),
                    Some(right) => left.or(right),
                    None => left,
                });
            }
            operands = paired;
        }
        Ok(operands
            .pop()
            .unwrap_or_else(|| Expr::value(op == LogicalOp::And)))
    }

    /// Header names compare case-insensitively; the value follows the matcher.
    fn header_predicate(&self, alias: TableAlias, name: &str, matcher: &HeaderMatch) -> SimpleExpr {
        let name_matches = Expr::expr(Func::lower(col(alias, Column::Name)))
            .eq(Func::lower(Expr::val(name)));

        match matcher {
            HeaderMatch::Exists => name_matches,
            HeaderMatch::Value(text) => {
                name_matches.and(self.text_predicate(col(alias, Column::Value), text))
            }
        }
    }

    fn text_predicate(&self, column: Expr, matcher: &TextMatch) -> SimpleExpr {
        match matcher {
            TextMatch::Equals(value) => column.eq(value.as_str()),
            TextMatch::Contains(value) => column.like(self.contains_pattern(value, false)),
            TextMatch::IContains(value) => {
                Expr::expr(Func::lower(column)).like(self.contains_pattern(value, true))
            }
        }
    }

    /// `first LIKE p OR rest[0] LIKE p OR ...`
    fn any_contains<I>(&self, first: Expr, rest: I, value: &str) -> SimpleExpr
    where
        I: IntoIterator<Item = Expr>,
    {
        rest.into_iter().fold(
            first.like(self.contains_pattern(value, false)),
            |acc, column| acc.or(column.like(self.contains_pattern(value, false))),
        )
    }

    /// `%value%`, with the value's own wildcards escaped when configured. `fold` lower-cases
    /// the value the way SQLite's `LOWER` folds the column (ASCII only).
    fn contains_pattern(&self, value: &str, fold: bool) -> LikeExpr {
        let value = if fold {
            value.to_ascii_lowercase()
        } else {
            value.to_string()
        };

        if self.config.escape_like_wildcards {
            LikeExpr::new(format!("%{}%", escape_like(&value))).escape(LIKE_ESCAPE)
        } else {
            LikeExpr::new(format!("%{}%", value))
        }
    }
}

fn col(table: TableAlias, column: Column) -> Expr {
    Expr::col((table, column))
}

fn compare<V>(left: Expr, op: OrderOp, right: V) -> SimpleExpr
where
    V: Into<SimpleExpr>,
{
    match op {
        OrderOp::Eq => left.eq(right),
        OrderOp::Gt => left.gt(right),
        OrderOp::Ge => left.gte(right),
        OrderOp::Lt => left.lt(right),
        OrderOp::Le => left.lte(right),
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// Headers-table joins needed by a condition tree, in left-to-right order. Repeated joins
/// are kept as they are.
pub fn collect_joins(condition: &Condition, joins: &mut Vec<HeaderJoin>) {
    let mut pending = vec![condition];
    while let Some(node) = pending.pop() {
        match node {
            Condition::Header { id, .. } | Condition::Raw { id, .. } => joins.push(HeaderJoin {
                alias: TableAlias::Header(*id),
                side: JoinSide::Request,
            }),
            Condition::ResponseHeader { id, .. } | Condition::ResponseRaw { id, .. } => {
                joins.push(HeaderJoin {
                    alias: TableAlias::Header(*id),
                    side: JoinSide::Response,
                })
            }
            Condition::And(left, right) | Condition::Or(left, right) => {
                pending.push(&**right);
                pending.push(&**left);
            }
            Condition::Not(inner) => pending.push(&**inner),
            Condition::Timestamp { .. }
            | Condition::Id { .. }
            | Condition::Method(_)
            | Condition::Body(_)
            | Condition::Path(_)
            | Condition::ResponseBody(_)
            | Condition::ResponseStatus { .. } => {}
        }
    }
}
