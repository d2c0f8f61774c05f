//! The token definition for the ticket query language.

use std::fmt;

/// A token is a single unit of the language: its kind, the source text it was read
/// from, and where that text sits in the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// The raw text. Quotes are stripped from strings, `EOF` carries `""`.
    pub literal: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, literal: &'a str, span: Span) -> Self {
        Self { kind, literal, span }
    }
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Illegal, // An illegal/unknown character
    Eof,     // End of input

    // Literals
    Ident,
    Int,
    String,

    // Punctuation
    Comma,  // ,
    LParen, // (
    RParen, // )

    // Operators
    Lt,   // <
    Gt,   // >
    Lte,  // <=
    Gte,  // >=
    Eq,   // =
    Ne,   // !=
    Like, // ~

    // Keywords
    And,     // "AND"
    Or,      // "OR"
    OrderBy, // "ORDER_BY"
    Limit,   // "LIMIT"
}

impl TokenKind {
    /// Looks up a keyword, case-insensitively. Anything else is an identifier.
    pub fn lookup_ident(ident: &str) -> TokenKind {
        match ident.to_ascii_lowercase().as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "order_by" => TokenKind::OrderBy,
            "limit" => TokenKind::Limit,
            _ => TokenKind::Ident,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Illegal => "ILLEGAL",
            TokenKind::Eof => "EOF",
            TokenKind::Ident => "IDENT",
            TokenKind::Int => "INT",
            TokenKind::String => "STRING",
            TokenKind::Comma => ",",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Lte => "<=",
            TokenKind::Gte => ">=",
            TokenKind::Eq => "=",
            TokenKind::Ne => "!=",
            TokenKind::Like => "~",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::OrderBy => "ORDER_BY",
            TokenKind::Limit => "LIMIT",
        };
        f.pad(s)
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup_is_case_insensitive() {
        assert_eq!(TokenKind::lookup_ident("AND"), TokenKind::And);
        assert_eq!(TokenKind::lookup_ident("oR"), TokenKind::Or);
        assert_eq!(TokenKind::lookup_ident("Order_By"), TokenKind::OrderBy);
        assert_eq!(TokenKind::lookup_ident("limit"), TokenKind::Limit);
        assert_eq!(TokenKind::lookup_ident("orderby"), TokenKind::Ident);
        assert_eq!(TokenKind::lookup_ident("summary"), TokenKind::Ident);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(TokenKind::Ne.to_string(), "!=");
        assert_eq!(TokenKind::OrderBy.to_string(), "ORDER_BY");
        assert_eq!(TokenKind::Eof.to_string(), "EOF");
    }
}
