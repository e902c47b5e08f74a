//! Expression tree
//!
//! Nodes are immutable values compared structurally. Constant subtrees never
//! appear here: the parser folds them into [`Expr::Number`],
//! [`Expr::Literal`] or [`Expr::Boolean`] while building.

use super::functions::YangFunction;
use crate::model::qname::QName;
use rust_decimal::Decimal;
use std::fmt;

/// Numeric literal in the representation chosen by the math mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XPathNumber {
    Double(f64),
    Decimal(Decimal),
}

impl fmt::Display for XPathNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double(d) => write!(f, "{}", d),
            Self::Decimal(d) => write!(f, "{}", d.normalize()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Mul => "*",
            Self::Div => "div",
            Self::Mod => "mod",
        }
    }
}

/// Operators whose same-precedence chains are kept flat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NaryOp {
    Or,
    And,
    Union,
}

impl NaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Union => "|",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

impl Axis {
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "attribute" => Self::Attribute,
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "following" => Self::Following,
            "following-sibling" => Self::FollowingSibling,
            "namespace" => Self::Namespace,
            "parent" => Self::Parent,
            "preceding" => Self::Preceding,
            "preceding-sibling" => Self::PrecedingSibling,
            "self" => Self::SelfAxis,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ancestor => "ancestor",
            Self::AncestorOrSelf => "ancestor-or-self",
            Self::Attribute => "attribute",
            Self::Child => "child",
            Self::Descendant => "descendant",
            Self::DescendantOrSelf => "descendant-or-self",
            Self::Following => "following",
            Self::FollowingSibling => "following-sibling",
            Self::Namespace => "namespace",
            Self::Parent => "parent",
            Self::Preceding => "preceding",
            Self::PrecedingSibling => "preceding-sibling",
            Self::SelfAxis => "self",
        }
    }
}

/// A name as written, or bound to a namespace by the resolution strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QNameRef {
    Unresolved { prefix: Option<String>, local_name: String },
    Resolved(QName),
}

impl QNameRef {
    pub fn local_name(&self) -> &str {
        match self {
            Self::Unresolved { local_name, .. } => local_name,
            Self::Resolved(qname) => qname.local_name(),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        match self {
            Self::Unresolved { prefix, .. } => prefix.as_deref(),
            Self::Resolved(_) => None,
        }
    }
}

impl fmt::Display for QNameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved { prefix: Some(p), local_name } => write!(f, "{}:{}", p, local_name),
            Self::Unresolved { prefix: None, local_name } => f.write_str(local_name),
            Self::Resolved(qname) => write!(f, "{}", qname),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeTest {
    Name(QNameRef),
    /// `*`
    Wildcard,
    /// `prefix:*`
    PrefixWildcard(String),
    Node,
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        Self { axis, test, predicates: Vec::new() }
    }

    /// `..`
    pub fn is_parent(&self) -> bool {
        self.axis == Axis::Parent && self.test == NodeTest::Node && self.predicates.is_empty()
    }

    /// `.`
    pub fn is_self(&self) -> bool {
        self.axis == Axis::SelfAxis && self.test == NodeTest::Node && self.predicates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

/// Function being called
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionName {
    /// One of the XPath 1.0 or YANG functions
    Yang(YangFunction),
    /// Prefixed extension function, left uninterpreted
    Other(QNameRef),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Location(LocationPath),
    Function { name: FunctionName, args: Vec<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Nary { op: NaryOp, operands: Vec<Expr> },
    Literal(String),
    Number(XPathNumber),
    Boolean(bool),
    Variable(QNameRef),
    Negate(Box<Expr>),
    Filter { expr: Box<Expr>, predicates: Vec<Expr> },
    /// Filter expression followed by a relative location path
    Path { filter: Box<Expr>, path: LocationPath },
}

impl Expr {
    pub fn is_constant(&self) -> bool {
        matches!(self, Expr::Literal(_) | Expr::Number(_) | Expr::Boolean(_))
    }

    /// Location path if this expression is a bare path
    pub fn as_location(&self) -> Option<&LocationPath> {
        match self {
            Expr::Location(path) => Some(path),
            _ => None,
        }
    }
}
