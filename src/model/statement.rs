//! Effective statements
//!
//! One tagged type covers every statement: [`StatementKind`] says which
//! statement it is and [`Argument`] carries the validated, typed argument.
//! Derived views are computed by walking the tree, never cached on it.

use super::qname::QName;
use super::types::TypeDefinition;
use crate::reactor::definitions::YangStmt;
use crate::source::SourceRef;
use crate::version::{Revision, YangVersion};
use crate::xpath::ParsedXPath;
use std::sync::Arc;

/// How a statement came to be where it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementOrigin {
    Declared,
    AddedByUses,
    AddedByAugment,
    /// Implicit `case` around a shorthand choice member
    Implicit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Yang(YangStmt),
    Extension(QName),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Current,
    Deprecated,
    Obsolete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderedBy {
    System,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviateKind {
    NotSupported,
    Add,
    Replace,
    Delete,
}

/// Typed argument of an effective statement
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    None,
    String(String),
    Boolean(bool),
    QName(QName),
    Integer(i64),
    Unsigned(u64),
    /// `max-elements`; `None` is `unbounded`
    MaxElements(Option<u64>),
    Version(YangVersion),
    Revision(Revision),
    Status(Status),
    OrderedBy(OrderedBy),
    Deviate(DeviateKind),
    /// Absolute schema node identifier
    SchemaNodeId(Vec<QName>),
    XPath(Arc<ParsedXPath>),
    Type(Box<TypeDefinition>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveStatement {
    pub kind: StatementKind,
    pub argument: Argument,
    pub substatements: Vec<EffectiveStatement>,
    pub origin: StatementOrigin,
    /// Schema path from the module root for schema nodes, groupings and typedefs
    pub path: Vec<QName>,
    pub location: SourceRef,
}

impl EffectiveStatement {
    pub fn yang(&self) -> Option<YangStmt> {
        match &self.kind {
            StatementKind::Yang(stmt) => Some(*stmt),
            StatementKind::Extension(_) => None,
        }
    }

    pub fn is(&self, stmt: YangStmt) -> bool {
        self.yang() == Some(stmt)
    }

    pub fn qname(&self) -> Option<&QName> {
        match &self.argument {
            Argument::QName(qname) => Some(qname),
            _ => None,
        }
    }

    pub fn string_argument(&self) -> Option<&str> {
        match &self.argument {
            Argument::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn find_first(&self, stmt: YangStmt) -> Option<&EffectiveStatement> {
        self.substatements.iter().find(|s| s.is(stmt))
    }

    pub fn all(&self, stmt: YangStmt) -> impl Iterator<Item = &EffectiveStatement> {
        self.substatements.iter().filter(move |s| s.is(stmt))
    }

    pub fn type_definition(&self) -> Option<&TypeDefinition> {
        self.find_first(YangStmt::Type).and_then(|t| match &t.argument {
            Argument::Type(def) => Some(def.as_ref()),
            _ => None,
        })
    }

    /// Schema node children in declaration order
    pub fn schema_children(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.substatements
            .iter()
            .filter(|s| s.yang().map_or(false, |y| y.is_schema_node()))
    }

    pub fn schema_child(&self, name: &QName) -> Option<&EffectiveStatement> {
        self.schema_children().find(|s| s.qname() == Some(name))
    }

    /// Data child by name, looking through `choice` and `case`
    pub fn data_child(&self, name: &QName) -> Option<&EffectiveStatement> {
        for child in self.schema_children() {
            if child.is(YangStmt::Choice) || child.is(YangStmt::Case) {
                if let Some(found) = child.data_child(name) {
                    return Some(found);
                }
            } else if child.qname() == Some(name) {
                return Some(child);
            }
        }
        None
    }

    pub fn is_mandatory(&self) -> bool {
        matches!(
            self.find_first(YangStmt::Mandatory).map(|m| &m.argument),
            Some(Argument::Boolean(true))
        )
    }

    /// This statement and all descendants, breadth first
    pub fn walk(&self) -> Vec<&EffectiveStatement> {
        let mut out = vec![self];
        let mut i = 0;
        while i < out.len() {
            let current = out[i];
            out.extend(current.substatements.iter());
            i += 1;
        }
        out
    }
}
