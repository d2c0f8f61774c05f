//! Syntax tree of a ticket query.
//!
//! Every node renders through `Display` in a fully parenthesised canonical form, which is
//! what diagnostics print and what the parser tests compare against.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;

/// Fields every ticket carries. Anything else lives in the ticket's custom-field collection.
pub const DEFAULT_FIELDS: [&str; 11] = [
    "createddate",
    "updateddate",
    "key",
    "summary",
    "description",
    "status",
    "reporter",
    "assignee",
    "type",
    "labels",
    "project",
];

/// Root of the AST: one boolean expression plus the trailing modifiers in source order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ast {
    pub query: ExpressionStatement,
    pub modifiers: Vec<ModifierStatement>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpressionStatement {
    /// `None` when nothing parsed; check the parser's errors before trusting it
    pub expression: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Infix(InfixExpression),
    Integer(i64),
    String(String),
    Date(DateTime<Utc>),
    Field(FieldLiteral),
}

/// A binary node. Comparisons and the AND/OR combinators share this shape.
#[derive(Debug, Clone, PartialEq)]
pub struct InfixExpression {
    pub operator: Operator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,   // =
    Ne,   // !=
    Lt,   // <
    Gt,   // >
    Lte,  // <=
    Gte,  // >=
    Like, // ~
    And,
    Or,
}

/// A bare identifier naming a ticket field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldLiteral(pub String);

#[derive(Debug, Clone, PartialEq)]
pub struct ModifierStatement {
    pub modifier: ModifierKind,
    /// A `Field` for `ORDER_BY`, an `Integer` for `LIMIT`
    pub value: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    OrderBy,
    Limit,
}

/// The dynamic value carried by a literal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    String(String),
    Date(DateTime<Utc>),
}

impl Ast {
    /// The last `ORDER_BY` field, if any
    pub fn order_by(&self) -> Option<&FieldLiteral> {
        self.modifiers.iter().rev().find_map(|m| match (m.modifier, &m.value) {
            (ModifierKind::OrderBy, Expression::Field(field)) => Some(field),
            _ => None,
        })
    }

    /// The last `LIMIT` value, if any
    pub fn limit(&self) -> Option<i64> {
        self.modifiers.iter().rev().find_map(|m| match (m.modifier, &m.value) {
            (ModifierKind::Limit, Expression::Integer(n)) => Some(*n),
            _ => None,
        })
    }
}

impl Expression {
    /// Builds an infix node, boxing both operands.
    pub fn infix(operator: Operator, left: Expression, right: Expression) -> Self {
        Expression::Infix(InfixExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn field(name: impl Into<String>) -> Self {
        Expression::Field(FieldLiteral(name.into()))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::String(value.into())
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Expression::Integer(_) | Expression::String(_) | Expression::Date(_)
        )
    }

    /// The literal's value; `None` for fields and infix nodes.
    pub fn value(&self) -> Option<Value> {
        match self {
            Expression::Integer(n) => Some(Value::Integer(*n)),
            Expression::String(s) => Some(Value::String(s.clone())),
            Expression::Date(d) => Some(Value::Date(*d)),
            Expression::Infix(_) | Expression::Field(_) => None,
        }
    }

    /// Nesting depth: 1 for a leaf, one more than the deeper operand for an infix node.
    pub fn depth(&self) -> usize {
        match self {
            Expression::Infix(infix) => 1 + infix.left.depth().max(infix.right.depth()),
            _ => 1,
        }
    }
}

impl Operator {
    pub fn is_comparison(self) -> bool {
        !self.is_logical()
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Operator::And | Operator::Or)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Like => "~",
            Operator::And => "AND",
            Operator::Or => "OR",
        }
    }
}

impl FieldLiteral {
    pub fn name(&self) -> &str {
        &self.0
    }

    /// True unless the lower-cased name is one of [`DEFAULT_FIELDS`].
    pub fn is_custom_field(&self) -> bool {
        let lower = self.0.to_lowercase();
        !DEFAULT_FIELDS.contains(&lower.as_str())
    }
}

impl ModifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModifierKind::OrderBy => "ORDER_BY",
            ModifierKind::Limit => "LIMIT",
        }
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.query)?;
        for modifier in &self.modifiers {
            write!(f, " {}", modifier)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExpressionStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expression {
            Some(expression) => write!(f, "{}", expression),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Infix(infix) => write!(f, "{}", infix),
            Expression::Integer(n) => write!(f, "{}", n),
            Expression::String(s) => write!(f, "\"{}\"", s),
            Expression::Date(d) => {
                write!(f, "\"{}\"", d.to_rfc3339_opts(SecondsFormat::Secs, true))
            }
            Expression::Field(field) => write!(f, "{}", field),
        }
    }
}

impl fmt::Display for InfixExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.left, self.operator, self.right)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for FieldLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ModifierStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.modifier.as_str(), self.value)
    }
}
