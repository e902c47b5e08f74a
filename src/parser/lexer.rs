//! Lexer for YANG source text
//!
//! Produces a flat [`Token`] stream. Quoted strings are returned raw, with
//! escapes untouched: escape handling depends on the language version, which
//! is not known until the whole module has been parsed.

use crate::error::{Result, YangError};
use crate::source::SourceRef;
use std::fmt;
use std::sync::Arc;

/// Line and column of a token; lines one-based, columns zero-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare word: keyword, unquoted argument or a `+` operator
    Unquoted(String),
    SingleQuoted(String),
    /// Raw double-quoted text; `quote_column` is the column of the opening quote
    DoubleQuoted { text: String, quote_column: usize },
    LBrace,
    RBrace,
    Semicolon,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Unquoted(s) => write!(f, "'{}'", s),
            TokenKind::SingleQuoted(s) => write!(f, "single-quoted string '{}'", s),
            TokenKind::DoubleQuoted { text, .. } => write!(f, "double-quoted string \"{}\"", text),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

/// Lexer for one YANG source
pub struct Lexer {
    file: Arc<str>,
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(file: Arc<str>, input: &str) -> Self {
        Self {
            file,
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 0,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace_and_comments()?;

            let position = self.current_position();
            let Some(ch) = self.peek() else {
                tokens.push(Token { kind: TokenKind::Eof, position });
                break;
            };

            let kind = match ch {
                '{' => {
                    self.advance();
                    TokenKind::LBrace
                }
                '}' => {
                    self.advance();
                    TokenKind::RBrace
                }
                ';' => {
                    self.advance();
                    TokenKind::Semicolon
                }
                '"' => self.double_quoted()?,
                '\'' => self.single_quoted()?,
                _ => self.unquoted(),
            };
            tokens.push(Token { kind, position });
        }

        Ok(tokens)
    }

    fn double_quoted(&mut self) -> Result<TokenKind> {
        let start = self.current_position();
        self.advance();
        let mut text = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error_at("Unterminated double-quoted string", start)),
                Some('"') => break,
                Some('\\') => {
                    // Escapes are decoded later; keep the pair verbatim so the
                    // escaped quote does not terminate the string.
                    text.push('\\');
                    match self.advance() {
                        Some(next) => text.push(next),
                        None => {
                            return Err(self.error_at("Unterminated double-quoted string", start))
                        }
                    }
                }
                Some(c) => text.push(c),
            }
        }
        Ok(TokenKind::DoubleQuoted { text, quote_column: start.column })
    }

    fn single_quoted(&mut self) -> Result<TokenKind> {
        let start = self.current_position();
        self.advance();
        let mut text = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error_at("Unterminated single-quoted string", start)),
                Some('\'') => break,
                Some(c) => text.push(c),
            }
        }
        Ok(TokenKind::SingleQuoted(text))
    }

    fn unquoted(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() || matches!(ch, ';' | '{' | '}') || self.at_comment_start() {
                break;
            }
            text.push(ch);
            self.advance();
        }
        TokenKind::Unquoted(text)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.current_position();
                    self.advance();
                    self.advance();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            (Some(_), _) => {
                                self.advance();
                            }
                            (None, _) => {
                                return Err(self.error_at("Unterminated block comment", start))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn at_comment_start(&self) -> bool {
        matches!((self.peek(), self.peek_at(1)), (Some('/'), Some('/' | '*')))
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn current_position(&self) -> Position {
        Position { line: self.line, column: self.column }
    }

    fn error_at(&self, message: &str, at: Position) -> YangError {
        YangError::syntax(message, SourceRef::new(self.file.clone(), at.line, at.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new("test.yang".into(), input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_statement() {
        assert_eq!(
            kinds("leaf foo { type string; }"),
            vec![
                TokenKind::Unquoted("leaf".into()),
                TokenKind::Unquoted("foo".into()),
                TokenKind::LBrace,
                TokenKind::Unquoted("type".into()),
                TokenKind::Unquoted("string".into()),
                TokenKind::Semicolon,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("// line\nfoo /* block\n */ bar;"),
            vec![
                TokenKind::Unquoted("foo".into()),
                TokenKind::Unquoted("bar".into()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_escaped_quote_does_not_terminate() {
        let tokens = kinds(r#"  "a\"b" + 'c'"#);
        assert_eq!(
            tokens[0],
            TokenKind::DoubleQuoted { text: r#"a\"b"#.into(), quote_column: 2 }
        );
        assert_eq!(tokens[1], TokenKind::Unquoted("+".into()));
        assert_eq!(tokens[2], TokenKind::SingleQuoted("c".into()));
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("t".into(), "a\n  b;").tokenize().unwrap();
        assert_eq!(tokens[1].position, Position { line: 2, column: 2 });
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("t.yang".into(), "description \"oops").tokenize().unwrap_err();
        assert_eq!(err.to_string(), "Unterminated double-quoted string [at t.yang:1:12]");
    }
}
