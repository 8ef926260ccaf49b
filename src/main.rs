use std::env;

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use sea_query::Value;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use httpql::config::{CompilerConfig, ConfigError};
use httpql::parser::Parser;
use httpql::{CompiledQuery, ParseError, SqlCompiler};

const DEFAULT_CONFIG_FILE: &str = "httpql.json";
const CONFIG_ENV: &str = "HTTPQL_CONFIG";

/// JSON shape printed with `--json`.
#[derive(Serialize)]
struct JsonOutput<'a> {
    sql: &'a str,
    params: Vec<serde_json::Value>,
}

/// Loads the compiler configuration, preferring `$HTTPQL_CONFIG`, then `httpql.json`, then
/// the defaults.
fn load_config() -> Result<CompilerConfig> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        let config = CompilerConfig::from_json_file(&path)
            .with_context(|| format!("loading config named by {}", CONFIG_ENV))?;
        info!(%path, "loaded compiler config");
        return Ok(config);
    }

    match CompilerConfig::from_json_file(DEFAULT_CONFIG_FILE) {
        Ok(config) => {
            info!(path = DEFAULT_CONFIG_FILE, "loaded compiler config");
            Ok(config)
        }
        Err(ConfigError::NotFound(_)) => Ok(CompilerConfig::default()),
        Err(error) => {
            warn!(%error, "ignoring config file, using defaults");
            Ok(CompilerConfig::default())
        }
    }
}

fn param_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(Some(s)) => serde_json::Value::from(s.as_str()),
        Value::BigInt(Some(n)) => serde_json::Value::from(*n),
        Value::Int(Some(n)) => serde_json::Value::from(*n),
        other => serde_json::Value::from(format!("{:?}", other)),
    }
}

fn param_to_text(value: &Value) -> String {
    match value {
        Value::String(Some(s)) => format!("'{}'", s),
        Value::BigInt(Some(n)) => n.to_string(),
        Value::Int(Some(n)) => n.to_string(),
        other => format!("{:?}", other),
    }
}

fn print_compiled(compiled: &CompiledQuery, json: bool) -> Result<()> {
    if json {
        let output = JsonOutput {
            sql: &compiled.sql,
            params: compiled.values.0.iter().map(param_to_json).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", compiled.sql);
    for (i, value) in compiled.values.0.iter().enumerate() {
        println!("  ?{} = {}", i + 1, param_to_text(value));
    }
    Ok(())
}

fn run_query(compiler: &SqlCompiler, input: &str, json: bool) -> Result<()> {
    let query = Parser::new(input).parse().context("parse failed")?;
    let compiled = compiler.compile(&query).context("compile failed")?;
    print_compiled(&compiled, json)
}

/// A line with `^` under the character at byte offset `position` of `input`.
fn caret_under(input: &str, position: usize) -> String {
    let column = input
        .get(..position)
        .map_or(position, |prefix| prefix.chars().count());
    format!("{}^", " ".repeat(column))
}

fn repl(compiler: &SqlCompiler, json: bool) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("httpql: enter a query such as `query requests where method = GET`, or `exit`");

    loop {
        match editor.readline("httpql> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                    break;
                }
                editor.add_history_entry(line)?;

                if let Err(e) = run_query(compiler, line, json) {
                    if let Some(parse_error) = e.downcast_ref::<ParseError>() {
                        println!("  {}", line);
                        println!("  {}", caret_under(line, parse_error.position()));
                    }
                    println!("error: {:#}", e);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let json = args.first().map(|a| a == "--json").unwrap_or(false);
    if json {
        args.remove(0);
    }

    let compiler = SqlCompiler::from_config(load_config()?);

    if args.is_empty() {
        repl(&compiler, json)
    } else {
        run_query(&compiler, &args.join(" "), json)
    }
}
