//! A query language for filtering captured HTTP transactions.
//!
//! ```text
//! query requests where method = GET and path contains '/admin'
//! ```
//!
//! [`parser::Parser`] turns the text into an [`ast::Query`], and
//! [`sql_compiler::SqlCompiler`] turns that into a parameterized SQLite `SELECT` plus its
//! bound values. Running the statement is up to the caller.

pub mod ast;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod sql_compiler;
pub mod token;

pub use error::{CompileError, HttpQlError, LexErrorKind, ParseError};
pub use sql_compiler::{CompiledQuery, SqlCompiler};

/// Parses and compiles `input` with the default compiler configuration.
pub fn compile_query(input: &str) -> Result<CompiledQuery, HttpQlError> {
    let query = parser::Parser::new(input).parse()?;
    Ok(SqlCompiler::new().compile(&query)?)
}
