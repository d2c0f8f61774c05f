//! Parser for the ticket query language.
//!
//! ## Parse flow
//!
//! ```text
//! parse()
//!   ├─ ORDER_BY / LIMIT → parse_modifier_statement()
//!   │                       ├─ ORDER_BY → expect IDENT → FieldLiteral
//!   │                       └─ LIMIT    → expect INT   → IntegerLiteral
//!   │
//!   └─ anything else → parse_expression_statement()   (last one wins)
//!                        └─ parse_expression(LOWEST)
//!                             ├─ prefix: IDENT / STRING / INT / "(" grouped
//!                             └─ while peek binds tighter than the caller:
//!                                  ├─ = != < > <= >= ~ → parse_comparison()
//!                                  └─ AND / OR         → parse_logic()
//! ```
//!
//! ## Precedence (lowest to highest)
//!
//! 1. `LOWEST`
//! 2. `AND`, `OR` (one shared level, left-associative)
//! 3. comparisons `=`, `!=`, `<`, `>`, `<=`, `>=`, `~`
//!
//! ## Examples
//!
//! ```text
//! summary = "x" OR project = "TEST" AND key = "TEST-1"
//!   → (((summary = "x") OR (project = "TEST")) AND (key = "TEST-1"))
//!
//! status = "Open" ORDER_BY createdDate LIMIT 20
//! ```
//!
//! The parser never stops at the first problem. Every error is recorded and parsing
//! carries on, so a single pass reports everything that is wrong with a query.

use crate::ast::{Ast, Expression, ExpressionStatement, ModifierKind, ModifierStatement, Operator};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Option<Span>,
}

impl ParseError {
    fn at_position(message: String, span: Span) -> Self {
        Self { message, span: Some(span) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    AndOr,
    Comparison,
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::And | TokenKind::Or => Precedence::AndOr,
        TokenKind::Eq
        | TokenKind::Ne
        | TokenKind::Lt
        | TokenKind::Gt
        | TokenKind::Lte
        | TokenKind::Gte
        | TokenKind::Like => Precedence::Comparison,
        _ => Precedence::Lowest,
    }
}

fn comparison_operator(kind: TokenKind) -> Option<Operator> {
    match kind {
        TokenKind::Eq => Some(Operator::Eq),
        TokenKind::Ne => Some(Operator::Ne),
        TokenKind::Lt => Some(Operator::Lt),
        TokenKind::Gt => Some(Operator::Gt),
        TokenKind::Lte => Some(Operator::Lte),
        TokenKind::Gte => Some(Operator::Gte),
        TokenKind::Like => Some(Operator::Like),
        _ => None,
    }
}

/// How a token is named in diagnostics: its text, or `EOF`
fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => TokenKind::Eof.to_string(),
        _ => token.literal.to_string(),
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
    peek: Token<'a>,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Self {
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Self {
            lexer,
            current,
            peek,
            errors: Vec::new(),
        }
    }

    /// Errors recorded so far, in the order they were found
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// Parses the whole input. Always returns an AST; check [`Parser::errors`] before using it.
    pub fn parse(&mut self) -> Ast {
        let mut ast = Ast::default();

        while self.current.kind != TokenKind::Eof {
            match self.current.kind {
                TokenKind::OrderBy | TokenKind::Limit => {
                    if let Some(modifier) = self.parse_modifier_statement() {
                        ast.modifiers.push(modifier);
                    }
                }
                _ => ast.query = self.parse_expression_statement(),
            }
            self.next_token();
        }

        ast
    }

    fn next_token(&mut self) {
        self.current = self.peek;
        self.peek = self.lexer.next_token();
    }

    fn error(&mut self, message: String, span: Span) {
        self.errors.push(ParseError::at_position(message, span));
    }

    /// Advances if the next token has the expected kind, otherwise records an error
    fn expect_peek(&mut self, expected: TokenKind) -> bool {
        if self.peek.kind == expected {
            self.next_token();
            true
        } else {
            self.error(
                format!("expected next token to be {}, got {} instead", expected, self.peek.kind),
                self.peek.span,
            );
            false
        }
    }

    fn peek_precedence(&self) -> Precedence {
        precedence_of(self.peek.kind)
    }

    fn peek_ends_expression(&self) -> bool {
        matches!(self.peek.kind, TokenKind::Eof | TokenKind::OrderBy | TokenKind::Limit)
    }

    fn parse_modifier_statement(&mut self) -> Option<ModifierStatement> {
        let (modifier, expected, message) = match self.current.kind {
            TokenKind::OrderBy => (
                ModifierKind::OrderBy,
                TokenKind::Ident,
                "ORDER_BY must be followed by a field name",
            ),
            TokenKind::Limit => (
                ModifierKind::Limit,
                TokenKind::Int,
                "LIMIT must be followed by a number",
            ),
            _ => return None,
        };

        if self.peek.kind != expected {
            self.error(message.to_string(), self.peek.span);
            // Drop the offending token so it is not re-read as the query, unless it
            // starts something the main loop can still use.
            if !self.peek_ends_expression() {
                self.next_token();
            }
            return None;
        }
        self.next_token();

        let value = match modifier {
            ModifierKind::OrderBy => Expression::field(self.current.literal),
            ModifierKind::Limit => self.parse_integer()?,
        };
        Some(ModifierStatement { modifier, value })
    }

    fn parse_expression_statement(&mut self) -> ExpressionStatement {
        ExpressionStatement {
            expression: self.parse_expression(Precedence::Lowest),
        }
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let mut left = self.parse_prefix();

        while !self.peek_ends_expression() && precedence < self.peek_precedence() {
            self.next_token();
            left = match self.current.kind {
                TokenKind::And | TokenKind::Or => self.parse_logic(left),
                _ => self.parse_comparison(left),
            };
        }

        left
    }

    fn parse_prefix(&mut self) -> Option<Expression> {
        match self.current.kind {
            TokenKind::Ident => Some(Expression::field(self.current.literal)),
            TokenKind::String => Some(Expression::string(self.current.literal)),
            TokenKind::Int => self.parse_integer(),
            TokenKind::LParen => self.parse_grouped(),
            _ => {
                self.error(
                    format!("{} not allowed in comparison expression", describe(&self.current)),
                    self.current.span,
                );
                None
            }
        }
    }

    fn parse_integer(&mut self) -> Option<Expression> {
        match self.current.literal.parse::<i64>() {
            Ok(n) => Some(Expression::Integer(n)),
            Err(_) => {
                self.error(
                    format!("could not parse {:?} as integer", self.current.literal),
                    self.current.span,
                );
                None
            }
        }
    }

    fn parse_grouped(&mut self) -> Option<Expression> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest);
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        expression
    }

    /// `field op literal`. The right side must be a literal, the left side a field.
    fn parse_comparison(&mut self, left: Option<Expression>) -> Option<Expression> {
        let operator = comparison_operator(self.current.kind)?;
        let operator_span = self.current.span;
        self.next_token();
        let right = self.parse_expression(Precedence::Comparison)?;

        match &right {
            Expression::Field(field) => {
                self.error(format!("missing quotes around string: {}", field), self.current.span);
                return None;
            }
            Expression::Infix(_) => {
                let message = format!("{} not allowed in comparison expression", right);
                self.error(message, operator_span);
                return None;
            }
            _ => {}
        }

        let left = left?;
        if !matches!(left, Expression::Field(_)) {
            self.error(format!("{} not allowed in comparison expression", left), operator_span);
            return None;
        }

        Some(Expression::infix(operator, left, right))
    }

    /// `infix AND infix`, `infix OR infix`
    fn parse_logic(&mut self, left: Option<Expression>) -> Option<Expression> {
        let operator = match self.current.kind {
            TokenKind::And => Operator::And,
            _ => Operator::Or,
        };
        let operator_span = self.current.span;
        self.next_token();
        let right = self.parse_expression(Precedence::AndOr);

        // A missing side has already been reported by whatever failed to parse it.
        if matches!(left, Some(ref l) if !matches!(l, Expression::Infix(_))) {
            self.error(
                "logic operators (AND/OR) must be preceded by a comparison expression".to_string(),
                operator_span,
            );
        }
        if matches!(right, Some(ref r) if !matches!(r, Expression::Infix(_))) {
            self.error(
                "logic operators (AND/OR) must be followed by a comparison expression".to_string(),
                operator_span,
            );
        }

        match (left, right) {
            (Some(left @ Expression::Infix(_)), Some(right @ Expression::Infix(_))) => {
                Some(Expression::infix(operator, left, right))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FieldLiteral;

    fn parse_string(input: &str) -> (Ast, Vec<ParseError>) {
        let mut parser = Parser::new(Lexer::new(input));
        let ast = parser.parse();
        (ast, parser.into_errors())
    }

    fn render(input: &str) -> String {
        let (ast, errors) = parse_string(input);
        assert!(errors.is_empty(), "unexpected errors for {}: {:?}", input, errors);
        ast.query.to_string()
    }

    fn messages(errors: &[ParseError]) -> Vec<String> {
        errors.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_simple_comparison() {
        let (ast, errors) = parse_string(r#"summary = "test""#);
        assert!(errors.is_empty());
        assert_eq!(
            ast.query.expression,
            Some(Expression::infix(
                Operator::Eq,
                Expression::field("summary"),
                Expression::string("test"),
            ))
        );
        assert!(ast.modifiers.is_empty());
    }

    #[test]
    fn test_every_comparison_operator() {
        for op in ["=", "!=", "<", ">", "<=", ">=", "~"] {
            let input = format!("points {} 5", op);
            assert_eq!(render(&input), format!("(points {} 5)", op));
        }
    }

    #[test]
    fn test_or_is_left_associative() {
        assert_eq!(
            render(r#"summary = "test this parser" OR project = "TEST""#),
            r#"((summary = "test this parser") OR (project = "TEST"))"#
        );
    }

    #[test]
    fn test_explicit_grouping_preserved() {
        let input = r#"((summary = "test this parser") AND (project = "TEST"))"#;
        assert_eq!(render(input), input);
    }

    #[test]
    fn test_mixed_precedence_nested() {
        assert_eq!(
            render(r#"summary = "test this parser" OR (project = "TEST" AND (key = "TEST-1"))"#),
            r#"((summary = "test this parser") OR ((project = "TEST") AND (key = "TEST-1")))"#
        );
    }

    #[test]
    fn test_and_or_share_one_level() {
        assert_eq!(
            render(r#"summary = "x" OR project = "TEST" AND key = "TEST-1""#),
            r#"(((summary = "x") OR (project = "TEST")) AND (key = "TEST-1"))"#
        );
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let input = r#"status = "Open" and (labels ~ "ui" or points >= 3)"#;
        let first = render(input);
        assert_eq!(first, r#"((status = "Open") AND ((labels ~ "ui") OR (points >= 3)))"#);
        assert_eq!(render(&first), first);
    }

    #[test]
    fn test_modifiers() {
        let (ast, errors) = parse_string(r#"status = "Open" ORDER_BY createdDate LIMIT 20"#);
        assert!(errors.is_empty());
        assert_eq!(ast.query.to_string(), r#"(status = "Open")"#);
        assert_eq!(
            ast.modifiers,
            vec![
                ModifierStatement {
                    modifier: ModifierKind::OrderBy,
                    value: Expression::Field(FieldLiteral("createdDate".into())),
                },
                ModifierStatement { modifier: ModifierKind::Limit, value: Expression::Integer(20) },
            ]
        );
        assert_eq!(ast.to_string(), r#"(status = "Open") ORDER_BY createdDate LIMIT 20"#);
    }

    #[test]
    fn test_duplicate_modifiers_are_kept_in_order() {
        let (ast, errors) = parse_string("LIMIT 5 LIMIT 10");
        assert!(errors.is_empty());
        assert_eq!(ast.modifiers.len(), 2);
        assert_eq!(ast.limit(), Some(10));
        assert_eq!(ast.query.expression, None);
    }

    #[test]
    fn test_last_expression_statement_wins() {
        let (ast, errors) = parse_string(r#"key = "A" key = "B""#);
        assert!(errors.is_empty());
        assert_eq!(ast.query.to_string(), r#"(key = "B")"#);
    }

    #[test]
    fn test_missing_quotes_is_reported() {
        let (ast, errors) = parse_string("summary = foo ORDER_BY key");
        assert_eq!(messages(&errors), vec!["missing quotes around string: foo"]);
        assert_eq!(errors[0].span, Some(Span::new(10, 13)));
        assert_eq!(ast.query.expression, None);
        // the rest of the query is still parsed
        assert_eq!(ast.order_by().map(FieldLiteral::name), Some("key"));
    }

    #[test]
    fn test_errors_accumulate() {
        let (_, errors) = parse_string("summary = foo AND key = bar");
        assert_eq!(
            messages(&errors),
            vec![
                "missing quotes around string: foo",
                "missing quotes around string: bar",
            ]
        );
    }

    #[test]
    fn test_logic_operator_needs_comparisons() {
        let (ast, errors) = parse_string(r#"summary AND key = "A""#);
        assert_eq!(
            messages(&errors),
            vec!["logic operators (AND/OR) must be preceded by a comparison expression"]
        );
        assert_eq!(ast.query.expression, None);

        let (_, errors) = parse_string(r#"key = "A" OR "B""#);
        assert_eq!(
            messages(&errors),
            vec!["logic operators (AND/OR) must be followed by a comparison expression"]
        );
    }

    #[test]
    fn test_unclosed_group() {
        let (_, errors) = parse_string(r#"(key = "A""#);
        assert_eq!(messages(&errors), vec!["expected next token to be ), got EOF instead"]);
    }

    #[test]
    fn test_missing_comparison_operand() {
        let (_, errors) = parse_string("summary = ");
        assert_eq!(messages(&errors), vec!["EOF not allowed in comparison expression"]);

        let (_, errors) = parse_string(r#"key = AND"#);
        assert_eq!(messages(&errors)[0], "AND not allowed in comparison expression");
    }

    #[test]
    fn test_illegal_token_is_rejected() {
        let (_, errors) = parse_string(r#"key ! "A""#);
        assert_eq!(messages(&errors)[0], "! not allowed in comparison expression");
    }

    #[test]
    fn test_comparison_sides_are_checked() {
        let (_, errors) = parse_string(r#"5 = "five""#);
        assert_eq!(messages(&errors), vec!["5 not allowed in comparison expression"]);

        let (_, errors) = parse_string(r#"key = (summary = "x")"#);
        assert_eq!(
            messages(&errors),
            vec![r#"(summary = "x") not allowed in comparison expression"#]
        );
    }

    #[test]
    fn test_malformed_modifiers() {
        let (ast, errors) = parse_string(r#"key = "A" ORDER_BY 5 LIMIT summary"#);
        assert_eq!(
            messages(&errors),
            vec![
                "ORDER_BY must be followed by a field name",
                "LIMIT must be followed by a number",
            ]
        );
        assert!(ast.modifiers.is_empty());
        assert_eq!(ast.query.to_string(), r#"(key = "A")"#);

        let (_, errors) = parse_string("ORDER_BY LIMIT 3");
        assert_eq!(messages(&errors), vec!["ORDER_BY must be followed by a field name"]);
    }

    #[test]
    fn test_integer_overflow() {
        let (_, errors) = parse_string("points = 99999999999999999999");
        assert_eq!(
            messages(&errors),
            vec![r#"could not parse "99999999999999999999" as integer"#]
        );
    }

    #[test]
    fn test_empty_input() {
        let (ast, errors) = parse_string("   ");
        assert!(errors.is_empty());
        assert_eq!(ast, Ast::default());
    }
}
