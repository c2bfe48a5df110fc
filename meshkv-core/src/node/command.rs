/*
    command.rs - Client command parsing

    Lines are tokenized shell-style (quoted arguments supported); the
    first token is the case-insensitive verb. Argument counts are
    exact; violations never reach the store.
*/

use crate::index::SearchMode;
use crate::node::protocol::ProtocolError;
use serde_json::Value;

/// Default result count for SEMANTIC
pub const DEFAULT_TOP_K: usize = 10;

/// A fully parsed client command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
    CreateIndex { name: String, field_path: String },
    Search { index: String, value: Value },
    RangeSearch { index: String, min: f64, max: f64 },
    Fulltext { query: String, mode: SearchMode },
    Semantic { query: String, top_k: usize },
    Status,
    Ping,
    Shutdown,
}

/// Parse one command line into a Command
pub fn parse(line: &str) -> Result<Command, ProtocolError> {
    let tokens = shlex::split(line).ok_or(ProtocolError::MalformedQuoting)?;
    let Some((verb, args)) = tokens.split_first() else {
        return Err(ProtocolError::EmptyCommand);
    };

    match verb.to_uppercase().as_str() {
        "SET" => match args {
            [key, value] => Ok(Command::Set {
                key: key.clone(),
                value: json_or_string(value),
            }),
            _ => Err(arity("SET", "a key and a value")),
        },
        "GET" => match args {
            [key] => Ok(Command::Get { key: key.clone() }),
            _ => Err(arity("GET", "a key")),
        },
        "DELETE" => match args {
            [key] => Ok(Command::Delete { key: key.clone() }),
            _ => Err(arity("DELETE", "a key")),
        },
        "CREATE_INDEX" => match args {
            [name, field_path] => Ok(Command::CreateIndex {
                name: name.clone(),
                field_path: field_path.clone(),
            }),
            _ => Err(arity("CREATE_INDEX", "an index name and a field path")),
        },
        "SEARCH" => match args {
            [index, value] => Ok(Command::Search {
                index: index.clone(),
                value: json_or_string(value),
            }),
            _ => Err(arity("SEARCH", "an index name and a value")),
        },
        "RANGE_SEARCH" => match args {
            [index, min, max] => Ok(Command::RangeSearch {
                index: index.clone(),
                min: numeric(min)?,
                max: numeric(max)?,
            }),
            _ => Err(arity("RANGE_SEARCH", "an index name, a minimum and a maximum")),
        },
        "FULLTEXT" => match args {
            [query] => Ok(Command::Fulltext {
                query: query.clone(),
                mode: SearchMode::Or,
            }),
            [query, mode] => Ok(Command::Fulltext {
                query: query.clone(),
                mode: mode
                    .parse()
                    .map_err(ProtocolError::InvalidArgument)?,
            }),
            _ => Err(arity("FULLTEXT", "a query and an optional mode")),
        },
        "SEMANTIC" => match args {
            [query] => Ok(Command::Semantic {
                query: query.clone(),
                top_k: DEFAULT_TOP_K,
            }),
            [query, top_k] => Ok(Command::Semantic {
                query: query.clone(),
                top_k: top_k.parse().map_err(|_| {
                    ProtocolError::InvalidArgument(format!("Invalid topK: {}", top_k))
                })?,
            }),
            _ => Err(arity("SEMANTIC", "a query and an optional topK")),
        },
        "STATUS" if args.is_empty() => Ok(Command::Status),
        "PING" if args.is_empty() => Ok(Command::Ping),
        "SHUTDOWN" if args.is_empty() => Ok(Command::Shutdown),
        other => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

fn arity(command: &'static str, expected: &'static str) -> ProtocolError {
    ProtocolError::WrongArity { command, expected }
}

/// Arguments parse as JSON where possible and fall back to bare strings
fn json_or_string(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn numeric(raw: &str) -> Result<f64, ProtocolError> {
    json_or_string(raw)
        .as_f64()
        .ok_or_else(|| ProtocolError::InvalidArgument(format!("Range bound must be numeric: {}", raw)))
}
