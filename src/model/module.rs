//! Effective modules

use super::qname::{QName, QNameModule};
use super::statement::EffectiveStatement;
use crate::checksum::Checksum;
use crate::reactor::definitions::YangStmt;
use crate::source::SourceIdentifier;
use crate::version::{Revision, YangVersion};
use semver::Version;
use std::collections::HashMap;

/// A compiled module with its submodules merged in
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleEffective {
    pub name: String,
    pub revision: Option<Revision>,
    pub semver: Option<Version>,
    pub namespace: QNameModule,
    pub prefix: String,
    pub yang_version: YangVersion,
    /// Submodules whose statements were merged into [`Self::statement`]
    pub submodules: Vec<SourceIdentifier>,
    /// The `module` statement
    pub statement: EffectiveStatement,
    /// Fingerprint of the module text
    pub checksum: Checksum,
    /// Prefixes usable in this module's own text
    pub prefixes: HashMap<String, QNameModule>,
}

impl ModuleEffective {
    pub fn identifier(&self) -> SourceIdentifier {
        SourceIdentifier::new(self.name.clone(), self.revision.clone()).with_semver(self.semver.clone())
    }

    /// Schema tree child by a path of names from the module root. Choice
    /// and case nodes are part of the path.
    pub fn find_schema_tree_child(&self, path: &[QName]) -> Option<&EffectiveStatement> {
        let (first, rest) = path.split_first()?;
        rest.iter().try_fold(self.statement.schema_child(first)?, |node, name| node.schema_child(name))
    }

    /// Data tree child by a path of names; choice and case are skipped
    pub fn find_data_tree_child(&self, path: &[QName]) -> Option<&EffectiveStatement> {
        let (first, rest) = path.split_first()?;
        rest.iter().try_fold(self.statement.data_child(first)?, |node, name| node.data_child(name))
    }

    pub fn groupings(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.statement.all(YangStmt::Grouping)
    }

    pub fn typedefs(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.statement.all(YangStmt::Typedef)
    }

    pub fn identities(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.statement.all(YangStmt::Identity)
    }

    pub fn features(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.statement.all(YangStmt::Feature)
    }

    pub fn extensions(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.statement.all(YangStmt::Extension)
    }

    pub fn augments(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.statement.all(YangStmt::Augment)
    }

    pub fn deviations(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.statement.all(YangStmt::Deviation)
    }
}
