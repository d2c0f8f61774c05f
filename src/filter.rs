//! Lowers a parsed query into a backend-neutral filter predicate.
//!
//! The predicate keeps the shape of the expression tree: every AND/OR node in the AST
//! becomes its own combinator node, so `a AND b AND c` lowers to `And[And[a, b], c]`
//! rather than a single flat `And[a, b, c]`. Comparison leaves carry the resolved
//! storage path, the operator and the literal's value.

use serde::Serialize;
use serde_json::json;

use crate::ast::{Ast, Expression, InfixExpression, Operator, Value};
use crate::config::QueryConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPredicate {
    And(Vec<FilterPredicate>),
    Or(Vec<FilterPredicate>),
    /// A field stored directly on the ticket, addressed by its storage path
    Compare {
        path: String,
        op: FilterOp,
        value: Value,
    },
    /// A field held in the ticket's custom-field collection, matched as an element
    /// `{ name, value }` of that collection
    CustomField {
        collection: String,
        name: String,
        op: FilterOp,
        value: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    /// Substring / regular expression match
    Like,
}

impl FilterOp {
    fn from_operator(operator: Operator) -> Option<Self> {
        match operator {
            Operator::Eq => Some(FilterOp::Eq),
            Operator::Ne => Some(FilterOp::Ne),
            Operator::Lt => Some(FilterOp::Lt),
            Operator::Gt => Some(FilterOp::Gt),
            Operator::Lte => Some(FilterOp::Lte),
            Operator::Gte => Some(FilterOp::Gte),
            Operator::Like => Some(FilterOp::Like),
            Operator::And | Operator::Or => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Lt => "lt",
            FilterOp::Gt => "gt",
            FilterOp::Lte => "lte",
            FilterOp::Gte => "gte",
            FilterOp::Like => "like",
        }
    }
}

pub struct FilterCompiler {
    config: QueryConfig,
}

impl Default for FilterCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCompiler {
    pub fn new() -> Self {
        Self {
            config: QueryConfig::default(),
        }
    }

    pub fn with_config(config: QueryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Returns `None` unless the query is a boolean (infix) expression.
    ///
    /// Only call this on an AST whose parse produced no errors.
    pub fn compile(&self, ast: &Ast) -> Option<FilterPredicate> {
        match &ast.query.expression {
            Some(Expression::Infix(infix)) => self.lower(infix),
            _ => None,
        }
    }

    fn lower(&self, infix: &InfixExpression) -> Option<FilterPredicate> {
        match infix.operator {
            Operator::And | Operator::Or => {
                let children: Vec<_> = [infix.left.as_ref(), infix.right.as_ref()]
                    .into_iter()
                    .filter_map(|side| match side {
                        Expression::Infix(inner) => self.lower(inner),
                        _ => None,
                    })
                    .collect();

                Some(if infix.operator == Operator::And {
                    FilterPredicate::And(children)
                } else {
                    FilterPredicate::Or(children)
                })
            }
            operator => self.lower_comparison(operator, &infix.left, &infix.right),
        }
    }

    /// A leaf whose sides are not `field op literal` is dropped.
    fn lower_comparison(
        &self,
        operator: Operator,
        left: &Expression,
        right: &Expression,
    ) -> Option<FilterPredicate> {
        let op = FilterOp::from_operator(operator)?;
        let Expression::Field(field) = left else {
            return None;
        };
        let value = right.value()?;

        if let Some(path) = self.config.resolve_path(field.name()) {
            return Some(FilterPredicate::Compare {
                path: path.to_string(),
                op,
                value,
            });
        }

        if field.is_custom_field() {
            return Some(FilterPredicate::CustomField {
                collection: self.config.custom_field_collection.clone(),
                name: field.name().to_string(),
                op,
                value,
            });
        }

        Some(FilterPredicate::Compare {
            path: field.name().to_string(),
            op,
            value,
        })
    }
}

impl FilterPredicate {
    /// Renders the predicate as a MongoDB-style filter document.
    pub fn to_document(&self, case_insensitive_like: bool) -> serde_json::Value {
        match self {
            FilterPredicate::And(children) => {
                json!({ "$and": documents(children, case_insensitive_like) })
            }
            FilterPredicate::Or(children) => {
                json!({ "$or": documents(children, case_insensitive_like) })
            }
            FilterPredicate::Compare { path, op, value } => {
                let mut doc = serde_json::Map::new();
                doc.insert(path.clone(), document_condition(*op, value, case_insensitive_like));
                serde_json::Value::Object(doc)
            }
            FilterPredicate::CustomField { collection, name, op, value } => {
                let mut doc = serde_json::Map::new();
                doc.insert(
                    collection.clone(),
                    json!({
                        "$elemMatch": {
                            "name": name,
                            "value": document_condition(*op, value, case_insensitive_like)
                        }
                    }),
                );
                serde_json::Value::Object(doc)
            }
        }
    }
}

fn documents(children: &[FilterPredicate], case_insensitive_like: bool) -> Vec<serde_json::Value> {
    children
        .iter()
        .map(|child| child.to_document(case_insensitive_like))
        .collect()
}

fn document_condition(
    op: FilterOp,
    value: &Value,
    case_insensitive_like: bool,
) -> serde_json::Value {
    match op {
        FilterOp::Like => {
            let pattern = match value {
                Value::String(s) => s.clone(),
                Value::Integer(n) => n.to_string(),
                Value::Date(d) => d.to_rfc3339(),
            };
            if case_insensitive_like {
                json!({ "$regex": pattern, "$options": "i" })
            } else {
                json!({ "$regex": pattern })
            }
        }
        _ => {
            let mut doc = serde_json::Map::new();
            doc.insert(format!("${}", op.as_str()), json!(value));
            serde_json::Value::Object(doc)
        }
    }
}
