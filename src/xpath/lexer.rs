//! XPath tokenizer
//!
//! Applies the XPath 1.0 disambiguation rule: when the previous token is
//! not one of `@`, `::`, `(`, `[`, `,` or an operator, `*` is the
//! multiplication operator and `and`, `or`, `div`, `mod` are operator names.

use super::{XPathError, XPathResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    DotDot,
    At,
    Comma,
    ColonColon,
    Slash,
    DoubleSlash,
    Pipe,
    Plus,
    Minus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// `*` as multiplication
    Multiply,
    /// `*` as a name test
    Star,
    And,
    Or,
    Div,
    Mod,
    Dollar,
    Literal(String),
    Number(String),
    /// NCName or QName
    Name { prefix: Option<String>, local: String },
    /// `prefix:*`
    PrefixStar(String),
    Eof,
}

impl Tok {
    /// Whether a following `*` or operator name must be read as an operator
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Tok::RParen
                | Tok::RBracket
                | Tok::Dot
                | Tok::DotDot
                | Tok::Literal(_)
                | Tok::Number(_)
                | Tok::Name { .. }
                | Tok::PrefixStar(_)
                | Tok::Star
        )
    }
}

pub fn tokenize(input: &str) -> XPathResult<Vec<Tok>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens: Vec<Tok> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let next = chars.get(i + 1).copied();
        let operator_context = tokens.last().map_or(false, Tok::ends_operand);

        let tok = match c {
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '[' => Tok::LBracket,
            ']' => Tok::RBracket,
            '@' => Tok::At,
            ',' => Tok::Comma,
            '|' => Tok::Pipe,
            '+' => Tok::Plus,
            '-' => Tok::Minus,
            '=' => Tok::Eq,
            '$' => Tok::Dollar,
            '*' if operator_context => Tok::Multiply,
            '*' => Tok::Star,
            ':' if next == Some(':') => {
                i += 1;
                Tok::ColonColon
            }
            '/' if next == Some('/') => {
                i += 1;
                Tok::DoubleSlash
            }
            '/' => Tok::Slash,
            '!' if next == Some('=') => {
                i += 1;
                Tok::Ne
            }
            '<' if next == Some('=') => {
                i += 1;
                Tok::Le
            }
            '<' => Tok::Lt,
            '>' if next == Some('=') => {
                i += 1;
                Tok::Ge
            }
            '>' => Tok::Gt,
            '"' | '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| XPathError::new(format!("Unterminated string literal in '{}'", input)))?;
                let text: String = chars[i + 1..i + 1 + end].iter().collect();
                i += end + 1;
                Tok::Literal(text)
            }
            '.' if next == Some('.') => {
                i += 1;
                Tok::DotDot
            }
            '.' if next.map_or(false, |n| n.is_ascii_digit()) => {
                let (text, len) = scan_number(&chars[i..]);
                i += len - 1;
                Tok::Number(text)
            }
            '.' => Tok::Dot,
            d if d.is_ascii_digit() => {
                let (text, len) = scan_number(&chars[i..]);
                i += len - 1;
                Tok::Number(text)
            }
            s if is_name_start(s) => {
                let (local, len) = scan_ncname(&chars[i..]);
                i += len - 1;
                if operator_context {
                    match local.as_str() {
                        "and" => Tok::And,
                        "or" => Tok::Or,
                        "div" => Tok::Div,
                        "mod" => Tok::Mod,
                        _ => qualify(&chars, &mut i, local),
                    }
                } else {
                    qualify(&chars, &mut i, local)
                }
            }
            other => {
                return Err(XPathError::new(format!(
                    "Unexpected character '{}' at offset {} in '{}'",
                    other, i, input
                )))
            }
        };
        tokens.push(tok);
        i += 1;
    }

    tokens.push(Tok::Eof);
    Ok(tokens)
}

/// Extend an NCName ending at `*i` into a QName or `prefix:*` when a single
/// colon follows.
fn qualify(chars: &[char], i: &mut usize, local: String) -> Tok {
    let colon = *i + 1;
    if chars.get(colon) != Some(&':') || chars.get(colon + 1) == Some(&':') {
        return Tok::Name { prefix: None, local };
    }
    match chars.get(colon + 1) {
        Some('*') => {
            *i = colon + 1;
            Tok::PrefixStar(local)
        }
        Some(&c) if is_name_start(c) => {
            let (name, len) = scan_ncname(&chars[colon + 1..]);
            *i = colon + len;
            Tok::Name { prefix: Some(local), local: name }
        }
        _ => Tok::Name { prefix: None, local },
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn scan_ncname(chars: &[char]) -> (String, usize) {
    let len = chars.iter().take_while(|&&c| is_name_char(c)).count();
    (chars[..len].iter().collect(), len)
}

fn scan_number(chars: &[char]) -> (String, usize) {
    let mut len = chars.iter().take_while(|c| c.is_ascii_digit()).count();
    if chars.get(len) == Some(&'.') {
        len += 1;
        len += chars[len..].iter().take_while(|c| c.is_ascii_digit()).count();
    }
    (chars[..len].iter().collect(), len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(local: &str) -> Tok {
        Tok::Name { prefix: None, local: local.into() }
    }

    #[test]
    fn test_star_disambiguation() {
        assert_eq!(tokenize("*").unwrap(), vec![Tok::Star, Tok::Eof]);
        assert_eq!(
            tokenize("2 * 3").unwrap(),
            vec![Tok::Number("2".into()), Tok::Multiply, Tok::Number("3".into()), Tok::Eof]
        );
        assert_eq!(
            tokenize("a/*").unwrap(),
            vec![name("a"), Tok::Slash, Tok::Star, Tok::Eof]
        );
    }

    #[test]
    fn test_operator_names() {
        assert_eq!(
            tokenize("and and or").unwrap(),
            vec![name("and"), Tok::And, name("or"), Tok::Eof]
        );
        assert_eq!(tokenize("a div b").unwrap()[1], Tok::Div);
    }

    #[test]
    fn test_qualified_names_and_axes() {
        assert_eq!(
            tokenize("child::p:x/q:*").unwrap(),
            vec![
                name("child"),
                Tok::ColonColon,
                Tok::Name { prefix: Some("p".into()), local: "x".into() },
                Tok::Slash,
                Tok::PrefixStar("q".into()),
                Tok::Eof
            ]
        );
    }

    #[test]
    fn test_names_with_dashes_and_numbers() {
        assert_eq!(
            tokenize("../if-name != .5").unwrap(),
            vec![Tok::DotDot, Tok::Slash, name("if-name"), Tok::Ne, Tok::Number(".5".into()), Tok::Eof]
        );
    }

    #[test]
    fn test_unterminated_literal() {
        let err = tokenize("'abc").unwrap_err();
        assert!(err.message.starts_with("Unterminated string literal"));
    }
}
