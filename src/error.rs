//! Error types for the YANG compiler

use crate::source::{SourceIdentifier, SourceRef};
use crate::xpath::XPathError;
use thiserror::Error;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, YangError>;

/// Compiler errors
///
/// Every variant is terminal: a build that produces one of these never
/// exposes a partial effective model.
#[derive(Error, Debug)]
pub enum YangError {
    /// Malformed token or unbalanced structure in a source file
    #[error("{message} [at {location}]")]
    Syntax { message: String, location: SourceRef },

    /// Semantic error attributed to a statement
    #[error("{message} [at {location}]")]
    Source { message: String, location: SourceRef },

    /// Cardinality or cross-version substatement violation
    #[error("{message} [at {location}]")]
    InvalidSubstatement { message: String, location: SourceRef },

    /// Reference that never resolved before the reactor stopped making progress
    #[error("{message} [at {location}]")]
    Inference { message: String, location: SourceRef },

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Source {0} is already registered")]
    DuplicateSource(SourceIdentifier),

    #[error("Imported module [{name}] was not found. [at {location}]")]
    MissingSource { name: String, location: SourceRef },

    #[error("Found circular dependency between modules {0} and {1}")]
    CircularDependency(String, String),

    #[error(transparent)]
    Expression(#[from] XPathError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl YangError {
    pub fn syntax(message: impl Into<String>, location: SourceRef) -> Self {
        Self::Syntax { message: message.into(), location }
    }

    pub fn source(message: impl Into<String>, location: SourceRef) -> Self {
        Self::Source { message: message.into(), location }
    }

    pub fn substatement(message: impl Into<String>, location: SourceRef) -> Self {
        Self::InvalidSubstatement { message: message.into(), location }
    }

    pub fn inference(message: impl Into<String>, location: SourceRef) -> Self {
        Self::Inference { message: message.into(), location }
    }

    /// Location of the offending statement, if this error carries one
    pub fn location(&self) -> Option<&SourceRef> {
        match self {
            Self::Syntax { location, .. }
            | Self::Source { location, .. }
            | Self::InvalidSubstatement { location, .. }
            | Self::Inference { location, .. }
            | Self::MissingSource { location, .. } => Some(location),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_carries_location() {
        let err = YangError::source("boom", SourceRef::new("foo.yang", 3, 7));
        assert_eq!(err.to_string(), "boom [at foo.yang:3:7]");
        assert_eq!(err.location().map(|l| l.line), Some(3));
    }

    #[test]
    fn test_circular_dependency_message() {
        let err = YangError::CircularDependency("a".into(), "b".into());
        assert_eq!(err.to_string(), "Found circular dependency between modules a and b");
    }
}
