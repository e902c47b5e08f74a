//! XPath expressions used by `must`, `when`, leafref `path` and
//! `instance-identifier` values.
//!
//! ## Pipeline
//!
//! [`lexer`] tokenizes, [`parser`] runs a recursive-descent precedence parser
//! that folds constant subexpressions as it goes, [`functions`] validates
//! function arity and folds calls with constant arguments, and [`math`]
//! supplies the arithmetic used for folding. [`instance_id`] is a separate,
//! smaller parser for instance-identifier values sharing the same lexer.

pub mod ast;
pub mod functions;
pub mod instance_id;
pub mod lexer;
pub mod math;
pub mod parser;

pub use ast::{Axis, BinaryOp, Expr, LocationPath, NaryOp, NodeTest, QNameRef, Step, XPathNumber};
pub use functions::YangFunction;
pub use instance_id::{InstanceIdentifier, InstanceIdentifierParser, PathArgument};
pub use math::MathMode;
pub use parser::{ParsedXPath, QNameStrategy, XPathParser};

use thiserror::Error;

/// Failure to parse an XPath expression or instance-identifier.
///
/// Lexer and grammar errors are captured here with the offending input;
/// nothing is written to any console.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct XPathError {
    pub message: String,
}

impl XPathError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

pub type XPathResult<T> = std::result::Result<T, XPathError>;
