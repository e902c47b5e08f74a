//! `instance-identifier` values
//!
//! ```text
//! instance-identifier := ('/' node-identifier predicate*)+
//! predicate           := '[' (node-identifier '=' quoted | '.' '=' quoted | positive-integer) ']'
//! ```
//!
//! Lexed with the XPath tokenizer, so quoting follows the XPath rules.

use super::ast::QNameRef;
use super::lexer::{tokenize, Tok};
use super::parser::QNameStrategy;
use super::{XPathError, XPathResult};

/// One step of an instance identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathArgument {
    Node(QNameRef),
    /// List entry selected by key values
    NodeWithKeys { node: QNameRef, keys: Vec<(QNameRef, String)> },
    /// Leaf-list entry selected by value
    LeafListEntry { node: QNameRef, value: String },
    /// Entry selected by one-based position
    Position { node: QNameRef, position: u64 },
}

impl PathArgument {
    pub fn node(&self) -> &QNameRef {
        match self {
            Self::Node(node)
            | Self::NodeWithKeys { node, .. }
            | Self::LeafListEntry { node, .. }
            | Self::Position { node, .. } => node,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIdentifier {
    pub path: Vec<PathArgument>,
}

#[derive(Debug, Clone, Default)]
pub struct InstanceIdentifierParser {
    strategy: QNameStrategy,
}

impl InstanceIdentifierParser {
    pub fn new(strategy: QNameStrategy) -> Self {
        Self { strategy }
    }

    pub fn parse(&self, input: &str) -> XPathResult<InstanceIdentifier> {
        let tokens = tokenize(input)?;
        let err = |message: String| XPathError::new(format!("{} in instance-identifier '{}'", message, input));
        let mut pos = 0;
        let mut path = Vec::new();

        while tokens[pos] != Tok::Eof {
            if tokens[pos] != Tok::Slash {
                return Err(err(format!("Expected '/' but found {:?}", tokens[pos])));
            }
            pos += 1;

            let node = match &tokens[pos] {
                Tok::Name { prefix: Some(prefix), local } => self.strategy.resolve(Some(prefix), local)?,
                Tok::Name { prefix: None, local } => {
                    return Err(err(format!("Node name {} is not qualified", local)))
                }
                other => return Err(err(format!("Expected a node name but found {:?}", other))),
            };
            pos += 1;

            let mut keys: Vec<(QNameRef, String)> = Vec::new();
            let mut selector: Option<PathArgument> = None;
            while tokens[pos] == Tok::LBracket {
                if selector.is_some() {
                    return Err(err("Positional and value predicates cannot be combined".to_string()));
                }
                pos += 1;
                match (&tokens[pos], tokens.get(pos + 1), tokens.get(pos + 2)) {
                    (Tok::Number(n), _, _) => {
                        let position = n
                            .parse::<u64>()
                            .ok()
                            .filter(|p| *p > 0)
                            .ok_or_else(|| err(format!("Invalid position {}", n)))?;
                        selector = Some(PathArgument::Position { node: node.clone(), position });
                        pos += 1;
                    }
                    (Tok::Dot, Some(Tok::Eq), Some(Tok::Literal(value))) => {
                        selector = Some(PathArgument::LeafListEntry { node: node.clone(), value: value.clone() });
                        pos += 3;
                    }
                    (Tok::Name { prefix, local }, Some(Tok::Eq), Some(Tok::Literal(value))) => {
                        let key = self.strategy.resolve(prefix.as_deref(), local)?;
                        if keys.iter().any(|(k, _)| *k == key) {
                            return Err(err(format!("Duplicate key predicate {}", key)));
                        }
                        keys.push((key, value.clone()));
                        pos += 3;
                    }
                    (other, _, _) => return Err(err(format!("Invalid predicate starting with {:?}", other))),
                }
                if selector.is_some() && !keys.is_empty() {
                    return Err(err("Positional and value predicates cannot be combined".to_string()));
                }
                if tokens[pos] != Tok::RBracket {
                    return Err(err(format!("Expected ']' but found {:?}", tokens[pos])));
                }
                pos += 1;
            }

            path.push(match selector {
                Some(arg) => arg,
                None if keys.is_empty() => PathArgument::Node(node),
                None => PathArgument::NodeWithKeys { node, keys },
            });
        }

        if path.is_empty() {
            return Err(err("Empty path".to_string()));
        }
        Ok(InstanceIdentifier { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unresolved(prefix: &str, local: &str) -> QNameRef {
        QNameRef::Unresolved { prefix: Some(prefix.into()), local_name: local.into() }
    }

    #[test]
    fn test_keyed_path() {
        let id = InstanceIdentifierParser::default()
            .parse("/ex:system/ex:server[ex:ip='192.0.2.1'][ex:port=\"80\"]/ex:name")
            .unwrap();
        assert_eq!(id.path.len(), 3);
        assert_eq!(id.path[0], PathArgument::Node(unresolved("ex", "system")));
        assert_eq!(
            id.path[1],
            PathArgument::NodeWithKeys {
                node: unresolved("ex", "server"),
                keys: vec![
                    (unresolved("ex", "ip"), "192.0.2.1".into()),
                    (unresolved("ex", "port"), "80".into()),
                ],
            }
        );
    }

    #[test]
    fn test_leaf_list_and_position() {
        let parser = InstanceIdentifierParser::default();
        let id = parser.parse("/ex:user[.='fred']").unwrap();
        assert!(matches!(&id.path[0], PathArgument::LeafListEntry { value, .. } if value == "fred"));
        let id = parser.parse("/ex:stats/ex:port[3]").unwrap();
        assert!(matches!(id.path[1], PathArgument::Position { position: 3, .. }));
    }

    #[test]
    fn test_invalid_instance_identifiers() {
        let parser = InstanceIdentifierParser::default();
        assert!(parser.parse("").is_err());
        assert!(parser.parse("ex:a").is_err());
        assert!(parser.parse("/a").unwrap_err().message.starts_with("Node name a is not qualified"));
        assert!(parser.parse("/ex:a[0]").is_err());
        assert!(parser.parse("/ex:a[ex:k='1'][ex:k='2']").unwrap_err().message.contains("Duplicate key"));
        assert!(parser.parse("/ex:a[ex:k='1'][2]").is_err());
    }
}
