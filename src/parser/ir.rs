//! Intermediate representation of parsed statements
//!
//! The IR is version-agnostic: arguments keep their quoting so that the
//! decoder can apply the escape rules of whichever `yang-version` the module
//! declares.

use std::fmt;
use std::sync::Arc;

/// Statement keyword, optionally qualified by an extension prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrKeyword {
    Unqualified(String),
    Qualified { prefix: String, identifier: String },
}

impl IrKeyword {
    pub fn identifier(&self) -> &str {
        match self {
            Self::Unqualified(id) => id,
            Self::Qualified { identifier, .. } => identifier,
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::Unqualified(_) => None,
            Self::Qualified { prefix, .. } => Some(prefix),
        }
    }
}

impl fmt::Display for IrKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unqualified(id) => f.write_str(id),
            Self::Qualified { prefix, identifier } => write!(f, "{}:{}", prefix, identifier),
        }
    }
}

/// Raw statement argument
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IrArgument {
    Unquoted(String),
    SingleQuoted(String),
    /// Raw text between the quotes plus the zero-based column of the opening quote
    DoubleQuoted { text: String, quote_column: usize },
    /// Two or more quoted fragments joined with `+`
    Concatenation(Vec<IrArgument>),
}

/// One parsed statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrStatement {
    pub keyword: IrKeyword,
    pub argument: Option<IrArgument>,
    pub statements: Vec<IrStatement>,
    pub line: usize,
    pub column: usize,
}

impl IrStatement {
    /// Direct children with the given unqualified keyword
    pub fn children_named<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a IrStatement> {
        self.statements
            .iter()
            .filter(move |s| matches!(&s.keyword, IrKeyword::Unqualified(k) if k == keyword))
    }

    /// Argument text without escape processing; enough for identifiers and dates
    pub fn raw_argument(&self) -> Option<String> {
        self.argument.as_ref().map(raw_text)
    }
}

fn raw_text(arg: &IrArgument) -> String {
    match arg {
        IrArgument::Unquoted(s) | IrArgument::SingleQuoted(s) => s.clone(),
        IrArgument::DoubleQuoted { text, .. } => text.clone(),
        IrArgument::Concatenation(parts) => parts.iter().map(raw_text).collect(),
    }
}

/// A parsed source file: its diagnostic name and root statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrSource {
    pub file: Arc<str>,
    pub root: IrStatement,
}
