//! Ticket query language: a lexer, a Pratt parser and compilers that lower
//! `field op value` expressions joined by `AND`/`OR`, with trailing `ORDER_BY` and
//! `LIMIT` modifiers, into storage filters.
//!
//! ```text
//! &str ──Lexer──▶ Token* ──Parser──▶ Ast ──FilterCompiler──▶ FilterPredicate
//!                                      └────SqlCompiler────▶ SQL
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod filter;
pub mod lexer;
pub mod parser;
pub mod sql_compiler;
pub mod token;

pub use ast::Ast;
pub use config::{QueryConfig, QueryLimits};
pub use error::{Error, Result};
pub use filter::{FilterCompiler, FilterPredicate};
pub use lexer::Lexer;
pub use parser::{ParseError, Parser};
pub use sql_compiler::SqlCompiler;

/// Parses a query the way a request handler should: the input is bounded before it is
/// lexed, any parse error rejects the whole query, and the resulting tree is bounded
/// in depth.
pub fn parse_query(input: &str, limits: &QueryLimits) -> Result<Ast> {
    if input.len() > limits.max_query_length {
        return Err(Error::QueryTooLong {
            len: input.len(),
            max: limits.max_query_length,
        });
    }

    let mut parser = Parser::new(Lexer::new(input));
    let ast = parser.parse();
    let errors = parser.into_errors();
    if !errors.is_empty() {
        return Err(Error::Syntax(errors));
    }

    if let Some(expression) = &ast.query.expression {
        let depth = expression.depth();
        if depth > limits.max_depth {
            return Err(Error::QueryTooDeep {
                depth,
                max: limits.max_depth,
            });
        }
    }

    Ok(ast)
}
