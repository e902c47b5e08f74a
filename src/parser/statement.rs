//! Recursive-descent statement parser
//!
//! Grammar:
//! ```text
//! file      := statement EOF
//! statement := keyword argument? (';' | '{' statement* '}')
//! keyword   := identifier | identifier ':' identifier
//! argument  := unquoted | quoted ('+' quoted)*
//! ```

use super::ir::{IrArgument, IrKeyword, IrSource, IrStatement};
use super::lexer::{Lexer, Position, Token, TokenKind};
use crate::error::{Result, YangError};
use crate::source::{SourceRef, YangTextSource};
use std::sync::Arc;

/// Parse one YANG source into its IR tree
pub fn parse_source(source: &YangTextSource) -> Result<IrSource> {
    let tokens = Lexer::new(source.name().clone(), source.text()).tokenize()?;
    let mut parser = StatementParser { file: source.name().clone(), tokens, pos: 0 };
    let root = parser.parse_statement()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(parser.error(
            format!("Unexpected {} after the end of the root statement", trailing.kind),
            trailing.position,
        ));
    }
    tracing::trace!(file = %source.name(), keyword = %root.keyword, "parsed source");
    Ok(IrSource { file: source.name().clone(), root })
}

struct StatementParser {
    file: Arc<str>,
    tokens: Vec<Token>,
    pos: usize,
}

impl StatementParser {
    fn parse_statement(&mut self) -> Result<IrStatement> {
        let token = self.advance();
        let keyword = match &token.kind {
            TokenKind::Unquoted(word) => self.parse_keyword(word, token.position)?,
            other => {
                return Err(self.error(format!("Expected a statement keyword, found {}", other), token.position))
            }
        };

        let argument = self.parse_argument()?;

        let next = self.advance();
        let statements = match next.kind {
            TokenKind::Semicolon => Vec::new(),
            TokenKind::LBrace => {
                let mut children = Vec::new();
                loop {
                    match self.peek().kind {
                        TokenKind::RBrace => {
                            self.advance();
                            break;
                        }
                        TokenKind::Eof => {
                            let at = self.peek().position;
                            return Err(self.error(format!("Missing '}}' closing statement '{}'", keyword), at));
                        }
                        _ => children.push(self.parse_statement()?),
                    }
                }
                children
            }
            other => {
                return Err(self.error(
                    format!("Expected ';' or '{{' after statement '{}', found {}", keyword, other),
                    next.position,
                ))
            }
        };

        Ok(IrStatement {
            keyword,
            argument,
            statements,
            line: token.position.line,
            column: token.position.column,
        })
    }

    fn parse_keyword(&self, word: &str, at: Position) -> Result<IrKeyword> {
        match word.split_once(':') {
            None if is_identifier(word) => Ok(IrKeyword::Unqualified(word.to_string())),
            Some((prefix, identifier)) if is_identifier(prefix) && is_identifier(identifier) => {
                Ok(IrKeyword::Qualified {
                    prefix: prefix.to_string(),
                    identifier: identifier.to_string(),
                })
            }
            _ => Err(self.error(format!("Invalid statement keyword '{}'", word), at)),
        }
    }

    fn parse_argument(&mut self) -> Result<Option<IrArgument>> {
        let token = self.peek().clone();
        let first = match token.kind {
            TokenKind::Unquoted(word) => {
                self.advance();
                return Ok(Some(IrArgument::Unquoted(word)));
            }
            TokenKind::SingleQuoted(text) => IrArgument::SingleQuoted(text),
            TokenKind::DoubleQuoted { text, quote_column } => IrArgument::DoubleQuoted { text, quote_column },
            _ => return Ok(None),
        };
        self.advance();

        let mut parts = vec![first];
        while matches!(&self.peek().kind, TokenKind::Unquoted(w) if w == "+") {
            let plus = self.advance();
            let next = self.advance();
            match next.kind {
                TokenKind::SingleQuoted(text) => parts.push(IrArgument::SingleQuoted(text)),
                TokenKind::DoubleQuoted { text, quote_column } => {
                    parts.push(IrArgument::DoubleQuoted { text, quote_column })
                }
                other => {
                    return Err(self.error(
                        format!("Expected a quoted string after '+', found {}", other),
                        plus.position,
                    ))
                }
            }
        }

        Ok(Some(if parts.len() == 1 {
            parts.remove(0)
        } else {
            IrArgument::Concatenation(parts)
        }))
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: String, at: Position) -> YangError {
        YangError::syntax(message, SourceRef::new(self.file.clone(), at.line, at.column))
    }
}

/// YANG identifier: `[A-Za-z_][A-Za-z0-9_.-]*`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<IrSource> {
        parse_source(&YangTextSource::new("test.yang", text))
    }

    #[test]
    fn test_parse_nested_statements() {
        let ir = parse("module foo { namespace \"urn:foo\"; container c { leaf l { type string; } } }").unwrap();
        assert_eq!(ir.root.keyword, IrKeyword::Unqualified("module".into()));
        assert_eq!(ir.root.raw_argument().as_deref(), Some("foo"));
        assert_eq!(ir.root.statements.len(), 2);
        let container = &ir.root.statements[1];
        assert_eq!(container.statements[0].statements[0].raw_argument().as_deref(), Some("string"));
    }

    #[test]
    fn test_parse_qualified_keyword_and_concatenation() {
        let ir = parse("module foo { ex:ext 'a' + \"b\" + 'c'; }").unwrap();
        let ext = &ir.root.statements[0];
        assert_eq!(ext.keyword.prefix(), Some("ex"));
        assert_eq!(ext.keyword.identifier(), "ext");
        assert!(matches!(&ext.argument, Some(IrArgument::Concatenation(parts)) if parts.len() == 3));
    }

    #[test]
    fn test_statement_position() {
        let ir = parse("module foo {\n  yang-version 1.1;\n}").unwrap();
        let stmt = &ir.root.statements[0];
        assert_eq!((stmt.line, stmt.column), (2, 2));
    }

    #[test]
    fn test_unbalanced_braces() {
        let err = parse("module foo {\n  container c {\n}").unwrap_err();
        assert!(matches!(err, YangError::Syntax { .. }));
        assert!(err.to_string().starts_with("Missing '}' closing statement 'module'"));
    }

    #[test]
    fn test_missing_terminator() {
        let err = parse("module foo { leaf bar }").unwrap_err();
        assert!(err.to_string().contains("Expected ';' or '{'"));
        assert!(err.to_string().ends_with("[at test.yang:1:22]"));
    }

    #[test]
    fn test_trailing_content() {
        let err = parse("module foo { } module bar { }").unwrap_err();
        assert!(err.to_string().starts_with("Unexpected 'module' after the end"));
    }

    #[test]
    fn test_invalid_keyword() {
        let err = parse("module foo { 1leaf x; }").unwrap_err();
        assert!(err.to_string().starts_with("Invalid statement keyword '1leaf'"));
    }
}
