use duckdb::types::Value;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{
    rows_to_json, run_demo, table_schema, ConnectionOptions, DatabaseTarget, DuckDbConnection,
    EngineError, EngineResult,
};

/// Prefix that forces a parameter to bind as text, e.g. `str:007`.
const TEXT_PARAM_PREFIX: &str = "str:";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Query {
        target: DatabaseTarget,
        sql: String,
        params: Vec<Value>,
    },
    Schema {
        target: DatabaseTarget,
        table_name: String,
    },
    Demo {
        target: DatabaseTarget,
    },
}

#[derive(Debug, Serialize)]
struct QueryOutput {
    status: &'static str,
    database: DatabaseTarget,
    row_count: usize,
    rows: JsonValue,
}

/// Parse and run a whitespace-separated command line, returning JSON.
pub fn execute_command(command: &str) -> EngineResult<String> {
    execute_command_with(command, &ConnectionOptions::default())
}

pub fn execute_command_with(command: &str, options: &ConnectionOptions) -> EngineResult<String> {
    let tokens = tokenize(command)?;
    execute_args_with(&tokens, options)
}

/// Run an already split command, returning JSON.
pub fn execute_args(args: &[String]) -> EngineResult<String> {
    execute_args_with(args, &ConnectionOptions::default())
}

/// Run an already split command, opening every connection with `options`.
pub fn execute_args_with(args: &[String], options: &ConnectionOptions) -> EngineResult<String> {
    let open = |target: DatabaseTarget| DuckDbConnection::with_options(target, options.clone());
    match parse_command(args)? {
        Command::Query {
            target,
            sql,
            params,
        } => {
            let mut db = open(target.clone());
            let rows = db.with_connection(|db| db.execute_query_with_params(&sql, &params))?;
            let output = QueryOutput {
                status: "ok",
                database: target,
                row_count: rows.len(),
                rows: rows_to_json(&rows),
            };
            Ok(serde_json::to_string(&output)?)
        }
        Command::Schema { target, table_name } => {
            let mut db = open(target);
            let schema = db.with_connection(|db| table_schema(db, &table_name))?;
            Ok(serde_json::to_string(&schema)?)
        }
        Command::Demo { target } => {
            let mut db = open(target.clone());
            let rows = run_demo(&mut db)?;
            let output = QueryOutput {
                status: "ok",
                database: target,
                row_count: rows.len(),
                rows: rows_to_json(&rows),
            };
            Ok(serde_json::to_string(&output)?)
        }
    }
}

fn parse_command(tokens: &[String]) -> EngineResult<Command> {
    let Some(name) = tokens.first().map(String::as_str) else {
        return Err(EngineError::InvalidCommand("Command cannot be empty".into()));
    };

    match name {
        "query" => parse_query(tokens),
        "schema" => parse_schema(tokens),
        "demo" => parse_demo(tokens),
        _ => Err(EngineError::InvalidCommand(format!("Unknown command: {name}"))),
    }
}

fn parse_query(tokens: &[String]) -> EngineResult<Command> {
    if tokens.len() < 3 {
        return Err(usage("query <db_path> <sql> [param ...]"));
    }
    Ok(Command::Query {
        target: tokens[1].parse()?,
        sql: tokens[2].clone(),
        params: tokens[3..].iter().map(|token| parse_param(token)).collect(),
    })
}

fn parse_schema(tokens: &[String]) -> EngineResult<Command> {
    if tokens.len() != 3 {
        return Err(usage("schema <db_path> <table_name>"));
    }
    Ok(Command::Schema {
        target: tokens[1].parse()?,
        table_name: tokens[2].clone(),
    })
}

fn parse_demo(tokens: &[String]) -> EngineResult<Command> {
    if tokens.len() > 2 {
        return Err(usage("demo [db_path]"));
    }
    let target = match tokens.get(1) {
        Some(path) => path.parse()?,
        None => DatabaseTarget::InMemory,
    };
    Ok(Command::Demo { target })
}

fn usage(form: &str) -> EngineError {
    EngineError::InvalidCommand(format!("Usage: {form}"))
}

/// Turn a command-line literal into a bind value.
fn parse_param(token: &str) -> Value {
    if let Some(text) = token.strip_prefix(TEXT_PARAM_PREFIX) {
        return Value::Text(text.to_string());
    }
    if token.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if token.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(int) = token.parse::<i64>() {
        return Value::BigInt(int);
    }
    if token.contains(['.', 'e', 'E']) {
        if let Ok(float) = token.parse::<f64>() {
            if float.is_finite() {
                return Value::Double(float);
            }
        }
    }
    Value::Text(token.to_string())
}

fn tokenize(command: &str) -> EngineResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quote: Option<char> = None;
    let mut chars = command.chars().peekable();

    while let Some(ch) = chars.next() {
        match in_quote {
            Some('"') if ch == '\\' => match chars.peek() {
                Some(&next @ ('"' | '\\')) => {
                    current.push(next);
                    chars.next();
                }
                _ => current.push(ch),
            },
            Some(quote) => {
                if ch == quote {
                    in_quote = None;
                } else {
                    current.push(ch);
                }
            }
            None => {
                if ch == '"' || ch == '\'' {
                    in_quote = Some(ch);
                    in_token = true;
                } else if ch.is_whitespace() {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                } else {
                    current.push(ch);
                    in_token = true;
                }
            }
        }
    }

    if in_quote.is_some() {
        return Err(EngineError::InvalidCommand(
            "Unterminated quoted string".into(),
        ));
    }

    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}
