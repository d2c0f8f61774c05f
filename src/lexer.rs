//! Lexer for the ticket query language.

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// Current position in the input (byte index)
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// Returns the next token. Once the input is exhausted this keeps returning `EOF`.
    pub fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace();
        let start = self.position;

        let Some(c) = self.bump() else {
            return Token::new(TokenKind::Eof, "", Span::new(start, start));
        };

        match c {
            '=' => self.token(TokenKind::Eq, start),
            '~' => self.token(TokenKind::Like, start),
            ',' => self.token(TokenKind::Comma, start),
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Lte, start)
                } else {
                    self.token(TokenKind::Lt, start)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Gte, start)
                } else {
                    self.token(TokenKind::Gt, start)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Ne, start)
                } else {
                    self.token(TokenKind::Illegal, start)
                }
            }
            '"' => self.read_string(start),
            c if c.is_ascii_digit() => self.read_number(start),
            c if is_ident_char(c) => self.read_identifier(start),
            _ => self.token(TokenKind::Illegal, start),
        }
    }

    /// Returns the character at the current position without advancing
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// Advances one character and returns it
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Builds a token whose literal is the source text from `start` to the current position
    fn token(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token::new(kind, &self.input[start..self.position], Span::new(start, self.position))
    }

    fn read_number(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
        self.token(TokenKind::Int, start)
    }

    /// Reads a double-quoted string. The opening quote has already been consumed.
    /// There are no escapes; an unterminated string runs to the end of the input.
    fn read_string(&mut self, start: usize) -> Token<'a> {
        let content_start = self.position;
        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            self.bump();
        }
        let content_end = self.position;
        self.bump(); // closing quote, if any

        Token::new(
            TokenKind::String,
            &self.input[content_start..content_end],
            Span::new(start, self.position),
        )
    }

    /// Reads an identifier or keyword made of letters, underscores and dashes
    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        self.token(TokenKind::lookup_ident(literal), start)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '-'
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    /// Yields every token up to, but not including, `EOF`.
    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_literals(input: &str) -> Vec<(TokenKind, &str)> {
        Lexer::new(input).map(|t| (t.kind, t.literal)).collect()
    }

    #[test]
    fn test_simple_comparison() {
        assert_eq!(
            kinds_and_literals(r#"summary = "test""#),
            vec![
                (TokenKind::Ident, "summary"),
                (TokenKind::Eq, "="),
                (TokenKind::String, "test"),
            ]
        );
    }

    #[test]
    fn test_all_operators_and_punctuation() {
        let input = "!= = > < >= <= ~ ( ) ,";
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Ne,
                TokenKind::Eq,
                TokenKind::Gt,
                TokenKind::Lt,
                TokenKind::Gte,
                TokenKind::Lte,
                TokenKind::Like,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Comma,
            ]
        );
    }

    #[test]
    fn test_tabs_and_newlines_are_whitespace() {
        assert_eq!(
            kinds_and_literals("summary\t=\n\"x\"\r\n  AND\tkey = \"A\""),
            vec![
                (TokenKind::Ident, "summary"),
                (TokenKind::Eq, "="),
                (TokenKind::String, "x"),
                (TokenKind::And, "AND"),
                (TokenKind::Ident, "key"),
                (TokenKind::Eq, "="),
                (TokenKind::String, "A"),
            ]
        );
        let spans: Vec<_> = Lexer::new("a\t\n=").map(|t| t.span).collect();
        assert_eq!(spans, vec![Span::new(0, 1), Span::new(3, 4)]);
    }

    #[test]
    fn test_operators_without_whitespace() {
        let kinds: Vec<_> = Lexer::new("points>=5").map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::Gte, TokenKind::Int]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let input = "AND or Order_By limit my-field_name statusCategory";
        assert_eq!(
            kinds_and_literals(input),
            vec![
                (TokenKind::And, "AND"),
                (TokenKind::Or, "or"),
                (TokenKind::OrderBy, "Order_By"),
                (TokenKind::Limit, "limit"),
                (TokenKind::Ident, "my-field_name"),
                (TokenKind::Ident, "statusCategory"),
            ]
        );
    }

    #[test]
    fn test_numbers_and_strings() {
        let input = r#"12345 "hello world" "TEST-1""#;
        assert_eq!(
            kinds_and_literals(input),
            vec![
                (TokenKind::Int, "12345"),
                (TokenKind::String, "hello world"),
                (TokenKind::String, "TEST-1"),
            ]
        );
    }

    #[test]
    fn test_digits_end_an_identifier() {
        assert_eq!(
            kinds_and_literals("abc123"),
            vec![(TokenKind::Ident, "abc"), (TokenKind::Int, "123")]
        );
    }

    #[test]
    fn test_bang_without_equals_is_illegal() {
        assert_eq!(
            kinds_and_literals("! ="),
            vec![(TokenKind::Illegal, "!"), (TokenKind::Eq, "=")]
        );
    }

    #[test]
    fn test_unknown_characters_are_illegal_tokens() {
        assert_eq!(
            kinds_and_literals("a ; é"),
            vec![
                (TokenKind::Ident, "a"),
                (TokenKind::Illegal, ";"),
                (TokenKind::Ident, "é"),
            ]
        );
        assert_eq!(kinds_and_literals("#"), vec![(TokenKind::Illegal, "#")]);
    }

    #[test]
    fn test_unterminated_string_reads_to_end() {
        let tokens: Vec<_> = Lexer::new(r#"summary = "open ended"#).collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].literal, "open ended");
    }

    #[test]
    fn test_eof_is_idempotent() {
        let mut lexer = Lexer::new("  key ");
        assert_eq!(lexer.next_token().kind, TokenKind::Ident);
        for _ in 0..3 {
            let token = lexer.next_token();
            assert_eq!(token.kind, TokenKind::Eof);
            assert_eq!(token.literal, "");
        }
    }

    #[test]
    fn test_spans_cover_quotes() {
        let tokens: Vec<_> = Lexer::new(r#"key = "A""#).collect();
        assert_eq!(tokens[0].span, Span::new(0, 3));
        assert_eq!(tokens[1].span, Span::new(4, 5));
        assert_eq!(tokens[2].span, Span::new(6, 9));
    }

    #[test]
    fn test_complex_query() {
        let input = r#"(summary ~ "crash" OR labels = "bug") AND points > 3 ORDER_BY createdDate LIMIT 10"#;
        let kinds: Vec<_> = Lexer::new(input).map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LParen,
                TokenKind::Ident,
                TokenKind::Like,
                TokenKind::String,
                TokenKind::Or,
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::String,
                TokenKind::RParen,
                TokenKind::And,
                TokenKind::Ident,
                TokenKind::Gt,
                TokenKind::Int,
                TokenKind::OrderBy,
                TokenKind::Ident,
                TokenKind::Limit,
                TokenKind::Int,
            ]
        );
    }
}
