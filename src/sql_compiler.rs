//! SQL compiler that turns a parsed query into a PostgreSQL `SELECT` using sea-query.
//!
//! The `WHERE` clause is built from the [`FilterPredicate`] the filter compiler produces;
//! `ORDER_BY` and `LIMIT` modifiers become the matching SQL clauses. Dotted storage paths
//! map to `_`-joined column names (`status.name` -> `status_name`), and custom fields are
//! looked up in a JSONB array column holding `{ "name": ..., "value": ... }` objects.
//!
//! `~` is a plain substring match: `%`, `_` and `\` in the value are escaped before the
//! value is wrapped in `%...%`, relying on PostgreSQL's default `\` escape character.

use crate::ast::{Ast, Expression, Value as LiteralValue};
use crate::config::QueryConfig;
use crate::filter::{FilterCompiler, FilterOp, FilterPredicate};
use sea_query::extension::postgres::PgExpr;
use sea_query::{
    Alias, Asterisk, Expr, Order, PostgresQueryBuilder, SelectStatement, SimpleExpr, Value,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("query must be a boolean expression, got {0}")]
    NotBoolean(String),

    #[error("cannot order by custom field {0}")]
    UnsupportedOrdering(String),

    #[error("LIMIT must not be negative, got {0}")]
    NegativeLimit(i64),
}

/// Result of SQL compilation
#[derive(Debug)]
pub struct CompileResult {
    pub sql: String,
    /// The predicate behind the `WHERE` clause; `None` for a query without conditions
    pub predicate: Option<FilterPredicate>,
}

/// SQL Compiler that converts AST to SQL queries
pub struct SqlCompiler {
    filter: FilterCompiler,
}

impl Default for SqlCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlCompiler {
    pub fn new() -> Self {
        Self {
            filter: FilterCompiler::new(),
        }
    }

    pub fn with_config(config: QueryConfig) -> Self {
        Self {
            filter: FilterCompiler::with_config(config),
        }
    }

    fn config(&self) -> &QueryConfig {
        self.filter.config()
    }

    /// Compile a query AST into SQL. The AST must come from an error-free parse.
    pub fn compile(&self, ast: &Ast) -> Result<CompileResult, CompileError> {
        let predicate = self.filter.compile(ast);
        if predicate.is_none() {
            if let Some(expression) = &ast.query.expression {
                if !matches!(expression, Expression::Infix(_)) {
                    return Err(CompileError::NotBoolean(expression.to_string()));
                }
            }
        }

        let mut select = SelectStatement::new();
        select.from(Alias::new(self.config().table.as_str()));
        select.column(Asterisk);

        if let Some(predicate) = &predicate {
            select.and_where(self.compile_predicate(predicate));
        }

        if let Some(field) = ast.order_by() {
            let column = match self.config().resolve_path(field.name()) {
                Some(path) => column_name(path),
                None if field.is_custom_field() => {
                    return Err(CompileError::UnsupportedOrdering(field.name().to_string()));
                }
                None => column_name(field.name()),
            };
            select.order_by(Alias::new(column), Order::Asc);
        }

        if let Some(limit) = ast.limit() {
            let limit = u64::try_from(limit).map_err(|_| CompileError::NegativeLimit(limit))?;
            select.limit(limit);
        }

        Ok(CompileResult {
            sql: select.to_string(PostgresQueryBuilder),
            predicate,
        })
    }

    fn compile_predicate(&self, predicate: &FilterPredicate) -> SimpleExpr {
        match predicate {
            FilterPredicate::And(children) => self.combine(children, |acc, expr| acc.and(expr)),
            FilterPredicate::Or(children) => self.combine(children, |acc, expr| acc.or(expr)),
            FilterPredicate::Compare { path, op, value } => {
                self.compile_comparison(&column_name(path), *op, value)
            }
            FilterPredicate::CustomField { collection, name, op, value } => {
                self.compile_custom_field(collection, name, *op, value)
            }
        }
    }

    /// An empty combinator places no constraint on the result.
    fn combine<F>(&self, children: &[FilterPredicate], join: F) -> SimpleExpr
    where
        F: Fn(SimpleExpr, SimpleExpr) -> SimpleExpr,
    {
        children
            .iter()
            .map(|child| self.compile_predicate(child))
            .reduce(join)
            .unwrap_or_else(|| Expr::val(true).into())
    }

    fn compile_comparison(&self, column: &str, op: FilterOp, value: &LiteralValue) -> SimpleExpr {
        let col = Expr::col(Alias::new(column));

        match op {
            FilterOp::Like => {
                let pattern = like_pattern(value);
                if self.config().case_insensitive_like {
                    col.ilike(pattern)
                } else {
                    col.like(pattern)
                }
            }
            FilterOp::Eq => col.eq(sql_value(value)),
            FilterOp::Ne => col.ne(sql_value(value)),
            FilterOp::Lt => col.lt(sql_value(value)),
            FilterOp::Gt => col.gt(sql_value(value)),
            FilterOp::Lte => col.lte(sql_value(value)),
            FilterOp::Gte => col.gte(sql_value(value)),
        }
    }

    /// `EXISTS` over the elements of the JSONB collection, matching the element's name
    /// and comparing its value.
    ///
    /// PostgreSQL may evaluate `AND` operands in any order, so the numeric cast sits
    /// inside a `CASE` that only reaches it for a numeric value of the named element.
    fn compile_custom_field(
        &self,
        collection: &str,
        name: &str,
        op: FilterOp,
        value: &LiteralValue,
    ) -> SimpleExpr {
        let condition = match (op, value) {
            (FilterOp::Like, _) => {
                let operator = if self.config().case_insensitive_like { "ILIKE" } else { "LIKE" };
                format!("cf->>'name' = $1 AND cf->>'value' {} $2", operator)
            }
            (_, LiteralValue::Integer(_)) => format!(
                "CASE WHEN cf->>'name' = $1 AND jsonb_typeof(cf->'value') = 'number' \
                 THEN CAST(cf->>'value' AS numeric) END {} $2",
                sql_operator(op)
            ),
            _ => format!("cf->>'name' = $1 AND cf->>'value' {} $2", sql_operator(op)),
        };
        let operand = match op {
            FilterOp::Like => Value::from(like_pattern(value)),
            _ => sql_value(value),
        };

        Expr::cust_with_values(
            format!(
                "EXISTS (SELECT 1 FROM jsonb_array_elements({}) AS cf WHERE {})",
                quote_identifier(collection),
                condition,
            ),
            [Value::from(name.to_string()), operand],
        )
    }
}

fn sql_operator(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "=",
        FilterOp::Ne => "<>",
        FilterOp::Lt => "<",
        FilterOp::Gt => ">",
        FilterOp::Lte => "<=",
        FilterOp::Gte => ">=",
        FilterOp::Like => "LIKE",
    }
}

fn column_name(path: &str) -> String {
    path.replace('.', "_")
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Convert a literal value to a sea-query Value
fn sql_value(value: &LiteralValue) -> Value {
    match value {
        LiteralValue::Integer(n) => Value::BigInt(Some(*n)),
        LiteralValue::String(s) => Value::String(Some(Box::new(s.clone()))),
        LiteralValue::Date(d) => Value::String(Some(Box::new(d.to_rfc3339()))),
    }
}

/// `~` is a substring match in SQL
fn like_pattern(value: &LiteralValue) -> String {
    let text = match value {
        LiteralValue::String(s) => s.clone(),
        LiteralValue::Integer(n) => n.to_string(),
        LiteralValue::Date(d) => d.to_rfc3339(),
    };
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
