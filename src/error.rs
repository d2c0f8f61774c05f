//! Error types for query handling.

use crate::parser::ParseError;
use crate::sql_compiler::CompileError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("query is {len} bytes long, the limit is {max}")]
    QueryTooLong { len: usize, max: usize },

    #[error("query nests {depth} levels deep, the limit is {max}")]
    QueryTooDeep { depth: usize, max: usize },

    #[error("invalid query: {}", join_messages(.0))]
    Syntax(Vec<ParseError>),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

fn join_messages(errors: &[ParseError]) -> String {
    errors.iter().map(|e| e.message.as_str()).collect::<Vec<_>>().join("; ")
}

pub type Result<T> = std::result::Result<T, Error>;
