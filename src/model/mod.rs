//! The effective model
//!
//! Immutable output of a build. Nothing here has mutation methods; derived
//! views such as [`EffectiveModel::runtime_types`] or
//! [`EffectiveModel::derived_identities`] are computed on every call.

pub mod module;
pub mod qname;
pub mod runtime;
pub mod statement;
pub mod types;

pub use module::ModuleEffective;
pub use qname::{QName, QNameModule};
pub use runtime::RuntimeTypes;
pub use statement::{Argument, EffectiveStatement, StatementKind, StatementOrigin};
pub use types::{BuiltinType, TypeDefinition};

use crate::checksum::Checksum;
use crate::error::{Result, YangError};
use crate::reactor::definitions::YangStmt;
use crate::version::Revision;
use crate::xpath::{MathMode, ParsedXPath, QNameStrategy, XPathParser};
use std::collections::{HashSet, VecDeque};

/// All modules of one successful build
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveModel {
    modules: Vec<ModuleEffective>,
    bundle_hash: Checksum,
    math_mode: MathMode,
}

impl EffectiveModel {
    pub fn new(modules: Vec<ModuleEffective>, bundle_hash: Checksum, math_mode: MathMode) -> Self {
        Self { modules, bundle_hash, math_mode }
    }

    pub fn modules(&self) -> &[ModuleEffective] {
        &self.modules
    }

    /// Module by name and revision; without a revision the latest one
    pub fn find_module(&self, name: &str, revision: Option<&Revision>) -> Option<&ModuleEffective> {
        let mut candidates = self.modules.iter().filter(|m| m.name == name);
        match revision {
            Some(rev) => candidates.find(|m| m.revision.as_ref() == Some(rev)),
            None => candidates.max_by(|a, b| a.revision.cmp(&b.revision)),
        }
    }

    pub fn find_module_by_namespace(&self, namespace: &QNameModule) -> Option<&ModuleEffective> {
        self.modules.iter().find(|m| m.namespace == *namespace)
    }

    /// Schema tree node by its path from the data tree root. The first
    /// name selects the module.
    pub fn find_schema_tree_child(&self, path: &[QName]) -> Option<&EffectiveStatement> {
        self.find_module_by_namespace(&path.first()?.module)?.find_schema_tree_child(path)
    }

    /// Like [`Self::find_schema_tree_child`], looking through choice and case
    pub fn find_data_tree_child(&self, path: &[QName]) -> Option<&EffectiveStatement> {
        self.find_module_by_namespace(&path.first()?.module)?.find_data_tree_child(path)
    }

    pub fn groupings(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.modules.iter().flat_map(|m| m.groupings())
    }

    pub fn typedefs(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.modules.iter().flat_map(|m| m.typedefs())
    }

    pub fn identities(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.modules.iter().flat_map(|m| m.identities())
    }

    pub fn features(&self) -> impl Iterator<Item = &EffectiveStatement> {
        self.modules.iter().flat_map(|m| m.features())
    }

    /// Every identity derived from `base`, directly or through other
    /// identities, in discovery order
    pub fn derived_identities(&self, base: &QName) -> Vec<QName> {
        let mut found: Vec<QName> = Vec::new();
        let mut seen: HashSet<QName> = HashSet::new();
        let mut queue: VecDeque<QName> = VecDeque::from([base.clone()]);
        while let Some(current) = queue.pop_front() {
            for identity in self.identities() {
                let derives = identity.all(YangStmt::Base).any(|b| b.qname() == Some(&current));
                let Some(name) = identity.qname() else {
                    continue;
                };
                if derives && seen.insert(name.clone()) {
                    found.push(name.clone());
                    queue.push_back(name.clone());
                }
            }
        }
        found
    }

    /// Which groupings and typedefs the instantiated schema reaches
    pub fn runtime_types(&self) -> RuntimeTypes {
        RuntimeTypes::compute(self)
    }

    /// Fingerprint of every source that went into the build
    pub fn bundle_hash(&self) -> &Checksum {
        &self.bundle_hash
    }

    pub fn math_mode(&self) -> MathMode {
        self.math_mode
    }

    /// Parse an expression as if written in `module`: its prefixes apply
    /// and unprefixed names bind to its namespace
    pub fn parse_expression(&self, module: &str, text: &str) -> Result<ParsedXPath> {
        let module = self
            .find_module(module, None)
            .ok_or_else(|| YangError::IllegalArgument(format!("Module {} is not part of the model", module)))?;
        let strategy = QNameStrategy::Unqualified { default: module.namespace.clone(), prefixes: module.prefixes.clone() };
        Ok(XPathParser::new(self.math_mode, strategy).parse(text)?)
    }
}
