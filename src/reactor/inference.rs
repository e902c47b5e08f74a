//! Inference over the fully declared tree
//!
//! Type derivation, identity base chains, leafref targets, list keys and
//! expression parsing. All of it needs every `uses` and `augment` expanded,
//! so it runs while the effective model is built.

use super::context::StmtId;
use super::definitions::YangStmt;
use super::namespace::split_prefix;
use super::BuildContext;
use crate::error::{Result, YangError};
use crate::model::qname::QName;
use crate::model::types::{BuiltinType, PatternConstraint, TypeDefinition};
use crate::version::YangVersion;
use crate::xpath::ast::FunctionName;
use crate::xpath::{Expr, NodeTest, ParsedXPath, QNameRef, XPathParser, YangFunction};
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{trace, warn};

pub struct Inference<'a, 'c> {
    ctx: &'a BuildContext<'c>,
    /// Resolved typedefs
    typedefs: HashMap<StmtId, TypeDefinition>,
    /// Typedefs on the current resolution stack
    resolving: HashSet<StmtId>,
    /// Schema path of each leafref's target, by leaf
    leafref_targets: HashMap<StmtId, Vec<QName>>,
}

impl<'a, 'c> Inference<'a, 'c> {
    pub fn new(ctx: &'a BuildContext<'c>) -> Self {
        Self { ctx, typedefs: HashMap::new(), resolving: HashSet::new(), leafref_targets: HashMap::new() }
    }

    /// Whether a context is part of the instantiated schema tree, as
    /// opposed to a grouping, an augment or refine body, or a pruned node
    pub fn is_instantiated(&self, id: StmtId) -> bool {
        let tree = &self.ctx.tree;
        !tree.get(id).removed
            && !tree.ancestors(id).any(|a| {
                let node = tree.get(a);
                node.removed
                    || matches!(
                        node.yang(),
                        Some(
                            YangStmt::Grouping
                                | YangStmt::Uses
                                | YangStmt::Augment
                                | YangStmt::Deviation
                                | YangStmt::Refine
                                | YangStmt::Typedef
                        )
                    )
            })
    }

    fn error(&self, id: StmtId, message: String) -> YangError {
        YangError::source(message, self.ctx.tree.get(id).location.clone())
    }

    /// Resolve a `type` statement to its definition
    pub fn resolve_type(&mut self, type_stmt: StmtId) -> Result<TypeDefinition> {
        let node = self.ctx.tree.get(type_stmt);
        let reference = node.argument().to_string();
        let (prefix, name) = split_prefix(&reference);

        let builtin = prefix.is_none().then(|| BuiltinType::lookup(name)).flatten();
        let mut def = match builtin {
            Some(base) => TypeDefinition::builtin(base),
            None => {
                if self.ctx.prefix_module(node.source, prefix).is_none() {
                    return Err(self.error(type_stmt, format!("Prefix {} is not bound", prefix.unwrap_or(""))));
                }
                let typedef = self
                    .ctx
                    .find_definition(type_stmt, YangStmt::Typedef, &reference)
                    .ok_or_else(|| self.error(type_stmt, format!("Type '{}' was not found", reference)))?;
                self.typedef_definition(typedef)?
            }
        };
        self.restrict(&mut def, type_stmt, builtin.is_some())?;
        Ok(def)
    }

    fn typedef_definition(&mut self, typedef: StmtId) -> Result<TypeDefinition> {
        if let Some(def) = self.typedefs.get(&typedef) {
            return Ok(def.clone());
        }
        let tree = &self.ctx.tree;
        let node = tree.get(typedef);
        let qname = QName::new(node.namespace.clone(), node.argument());
        if !self.resolving.insert(typedef) {
            return Err(self.error(typedef, format!("Type {} is derived from itself", qname)));
        }
        let type_stmt = tree
            .first_child(typedef, YangStmt::Type)
            .ok_or_else(|| self.error(typedef, format!("Typedef {} has no type", qname)))?;

        let mut def = self.resolve_type(type_stmt)?;
        self.resolving.remove(&typedef);

        let tree = &self.ctx.tree;
        def.derived_from.insert(0, qname.clone());
        def.name = qname;
        if let Some(default) = tree.child_argument(typedef, YangStmt::Default) {
            def.default = Some(default.to_string());
        }
        if let Some(units) = tree.child_argument(typedef, YangStmt::Units) {
            def.units = Some(units.to_string());
        }
        trace!(typedef = %def.name, base = def.base.name(), "Resolved typedef");
        self.typedefs.insert(typedef, def.clone());
        Ok(def)
    }

    /// Apply the restrictions written under a `type` statement
    fn restrict(&mut self, def: &mut TypeDefinition, type_stmt: StmtId, builtin: bool) -> Result<()> {
        let ctx = self.ctx;
        let source = ctx.tree.get(type_stmt).source;
        let version = ctx.sources[source].version;
        let children: Vec<StmtId> = self
            .ctx
            .tree
            .children(type_stmt)
            .iter()
            .copied()
            .filter(|c| !ctx.tree.get(*c).removed)
            .collect();

        let mut enums: Vec<(String, Option<i64>, StmtId)> = Vec::new();
        let mut bits: Vec<(String, Option<u64>, StmtId)> = Vec::new();
        for child in children {
            let node = ctx.tree.get(child);
            let Some(stmt) = node.yang() else {
                continue;
            };
            let arg = node.argument().to_string();
            let base = def.base;
            let type_name = def.name.to_string();
            let invalid = || {
                YangError::source(
                    format!("Restriction {} is not valid for type {}", stmt.keyword(), type_name),
                    node.location.clone(),
                )
            };
            match stmt {
                YangStmt::Range => {
                    if !(base.is_integer() || base == BuiltinType::Decimal64) {
                        return Err(invalid());
                    }
                    let parent = def
                        .numeric_bounds()
                        .ok_or_else(|| self.error(child, "fraction-digits is required for decimal64".to_string()))?;
                    let range = parent
                        .restrict(&arg, base.is_integer())
                        .map_err(|e| self.error(child, format!("Invalid range constraint '{}': {}", arg, e)))?;
                    def.range = Some(range);
                }
                YangStmt::Length => {
                    if !matches!(base, BuiltinType::String | BuiltinType::Binary) {
                        return Err(invalid());
                    }
                    let parent = def.length.clone().unwrap_or_else(BuiltinType::length_bounds);
                    let length = parent
                        .restrict(&arg, true)
                        .map_err(|e| self.error(child, format!("Invalid length constraint '{}': {}", arg, e)))?;
                    def.length = Some(length);
                }
                YangStmt::Pattern => {
                    if base != BuiltinType::String {
                        return Err(invalid());
                    }
                    let inverted = ctx.tree.child_argument(child, YangStmt::Modifier) == Some("invert-match");
                    if let Err(e) = regex::Regex::new(&format!("^(?:{})$", arg)) {
                        warn!(pattern = %arg, error = %e, at = %node.location, "Pattern is not supported by the regex engine");
                    }
                    def.patterns.push(PatternConstraint { regex: arg, inverted });
                }
                YangStmt::Enum => {
                    if base != BuiltinType::Enumeration {
                        return Err(invalid());
                    }
                    let value = match ctx.tree.first_child(child, YangStmt::Value) {
                        Some(v) => Some(self.parse_number::<i64>(v, i64::from(i32::MIN), i64::from(i32::MAX))?),
                        None => None,
                    };
                    enums.push((arg, value, child));
                }
                YangStmt::Bit => {
                    if base != BuiltinType::Bits {
                        return Err(invalid());
                    }
                    let position = match ctx.tree.first_child(child, YangStmt::Position) {
                        Some(p) => Some(self.parse_number::<u64>(p, 0, u64::from(u32::MAX))?),
                        None => None,
                    };
                    bits.push((arg, position, child));
                }
                YangStmt::FractionDigits => {
                    if base != BuiltinType::Decimal64 {
                        return Err(invalid());
                    }
                    if !builtin {
                        return Err(self.error(child, "fraction-digits cannot be changed by a derived type".to_string()));
                    }
                    let digits = self.parse_number::<u8>(child, 1, 18)?;
                    def.fraction_digits = Some(digits);
                }
                YangStmt::Path => {
                    if base != BuiltinType::Leafref || !builtin {
                        return Err(invalid());
                    }
                    let parser = XPathParser::new(ctx.config.xpath.math_mode, ctx.qualified_strategy(source));
                    let parsed = parser
                        .parse(&arg)
                        .map_err(|e| self.error(child, format!("Invalid leafref path '{}': {}", arg, e)))?;
                    def.leafref_path = Some(Arc::new(parsed));
                }
                YangStmt::RequireInstance => {
                    let allowed = base == BuiltinType::InstanceIdentifier
                        || (base == BuiltinType::Leafref && version == YangVersion::V1_1);
                    if !allowed {
                        return Err(invalid());
                    }
                    def.require_instance = Some(arg == "true");
                }
                YangStmt::Base => {
                    if base != BuiltinType::Identityref || !builtin {
                        return Err(invalid());
                    }
                    let identity = ctx.parse_qname(source, &arg, &node.location)?;
                    if self.find_identity(&identity).is_none() {
                        return Err(self.error(child, format!("Identity '{}' was not found", arg)));
                    }
                    def.identity_bases.push(identity);
                }
                YangStmt::Type => {
                    if base != BuiltinType::Union || !builtin {
                        return Err(invalid());
                    }
                    let member = self.resolve_type(child)?;
                    if version == YangVersion::V1_0 && matches!(member.base, BuiltinType::Empty | BuiltinType::Leafref) {
                        return Err(self.error(
                            child,
                            format!("Union member type {} is not allowed in YANG 1.0", member.base.name()),
                        ));
                    }
                    def.union_members.push(member);
                }
                _ => {}
            }
        }

        if !enums.is_empty() {
            def.enums = self.derive_members(&def.enums, enums, builtin, version, "enumeration", "Enum")?;
        }
        if !bits.is_empty() {
            def.bits = self.derive_members(&def.bits, bits, builtin, version, "bits", "Bit")?;
        }

        if builtin {
            let missing = match def.base {
                BuiltinType::Enumeration if def.enums.is_empty() => Some("enum is required for enumeration"),
                BuiltinType::Bits if def.bits.is_empty() => Some("bit is required for bits"),
                BuiltinType::Decimal64 if def.fraction_digits.is_none() => Some("fraction-digits is required for decimal64"),
                BuiltinType::Leafref if def.leafref_path.is_none() => Some("path is required for leafref"),
                BuiltinType::Identityref if def.identity_bases.is_empty() => Some("base is required for identityref"),
                BuiltinType::Union if def.union_members.is_empty() => Some("type is required for union"),
                _ => None,
            };
            if let Some(message) = missing {
                return Err(self.error(type_stmt, message.to_string()));
            }
        }
        Ok(())
    }

    /// Assign values to declared enums or bits, or check a restriction
    /// against the parent's members
    fn derive_members<T>(
        &self,
        parent: &[(String, T)],
        declared: Vec<(String, Option<T>, StmtId)>,
        builtin: bool,
        version: YangVersion,
        type_name: &str,
        member: &str,
    ) -> Result<Vec<(String, T)>>
    where
        T: Copy + Ord + std::fmt::Display + num_like::Successor,
    {
        let mut result: Vec<(String, T)> = Vec::with_capacity(declared.len());
        if !builtin && version == YangVersion::V1_0 {
            return Err(self.error(
                declared[0].2,
                format!("Restricted {} type is allowed only in YANG 1.1 version.", type_name),
            ));
        }
        for (name, explicit, id) in declared {
            if result.iter().any(|(n, _)| *n == name) {
                return Err(self.error(id, format!("{} '{}' is defined more than once", member, name)));
            }
            let value = if builtin {
                match explicit {
                    Some(v) => v,
                    None => match result.iter().map(|(_, v)| *v).max() {
                        Some(max) => max
                            .successor()
                            .ok_or_else(|| self.error(id, format!("{} '{}' has no value left to assign", member, name)))?,
                        None => T::first(),
                    },
                }
            } else {
                let inherited = parent
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, v)| *v)
                    .ok_or_else(|| self.error(id, format!("{} '{}' is not a member of the base type", member, name)))?;
                if explicit.map_or(false, |v| v != inherited) {
                    return Err(self.error(
                        id,
                        format!("{} '{}' must keep the value {} of the base type", member, name, inherited),
                    ));
                }
                inherited
            };
            if result.iter().any(|(_, v)| *v == value) {
                return Err(self.error(id, format!("{} value {} is used more than once", member, value)));
            }
            result.push((name, value));
        }
        Ok(result)
    }

    fn parse_number<T>(&self, id: StmtId, min: T, max: T) -> Result<T>
    where
        T: std::str::FromStr + PartialOrd + std::fmt::Display,
    {
        let node = self.ctx.tree.get(id);
        let text = node.argument();
        match text.parse::<T>() {
            Ok(value) if value >= min && value <= max => Ok(value),
            _ => Err(self.error(
                id,
                format!(
                    "Invalid {} argument '{}', expected a number in {}..{}",
                    node.yang().map_or("", |s| s.keyword()),
                    text,
                    min,
                    max
                ),
            )),
        }
    }

    /// Top-level identity statement for a name
    pub fn find_identity(&self, qname: &QName) -> Option<StmtId> {
        let module = self.ctx.module_by_namespace(&qname.module)?;
        self.ctx.find_top_level(module, YangStmt::Identity, qname.local_name())
    }

    /// Bases of an identity as names
    pub fn identity_bases(&self, identity: StmtId) -> Result<Vec<QName>> {
        let tree = &self.ctx.tree;
        tree.children_of(identity, YangStmt::Base)
            .map(|base| {
                let node = tree.get(base);
                let qname = self.ctx.parse_qname(node.source, node.argument(), &node.location)?;
                match self.find_identity(&qname) {
                    Some(_) => Ok(qname),
                    None => Err(self.error(base, format!("Identity '{}' was not found", node.argument()))),
                }
            })
            .collect()
    }

    /// Every base must exist and no identity may derive from itself
    pub fn check_identities(&self) -> Result<()> {
        let tree = &self.ctx.tree;
        let mut graph: DiGraph<StmtId, ()> = DiGraph::new();
        let mut nodes: HashMap<StmtId, NodeIndex> = HashMap::new();
        let identities: Vec<StmtId> = self
            .ctx
            .sources
            .iter()
            .flat_map(|s| tree.children_of(s.root, YangStmt::Identity).collect::<Vec<_>>())
            .collect();
        for identity in &identities {
            nodes.insert(*identity, graph.add_node(*identity));
        }
        for identity in &identities {
            for base in self.identity_bases(*identity)? {
                if let Some(target) = self.find_identity(&base) {
                    graph.add_edge(nodes[identity], nodes[&target], ());
                }
            }
        }
        for scc in kosaraju_scc(&graph) {
            let cyclic = scc.len() > 1 || scc.iter().any(|n| graph.contains_edge(*n, *n));
            if cyclic {
                let Some(first) = scc.iter().map(|n| graph[*n]).min() else {
                    continue;
                };
                let node = tree.get(first);
                let qname = QName::new(node.namespace.clone(), node.argument());
                return Err(self.error(first, format!("Identity {} is derived from itself", qname)));
            }
        }
        Ok(())
    }

    /// Every key must name a leaf of its list; configuration lists need keys
    pub fn check_list_keys(&self) -> Result<()> {
        let tree = &self.ctx.tree;
        for id in tree.ids() {
            if !tree.get(id).is(YangStmt::List) || !self.is_instantiated(id) {
                continue;
            }
            let node = tree.get(id);
            let qname = QName::new(node.namespace.clone(), node.argument());
            let Some(keys) = tree.child_argument(id, YangStmt::Key) else {
                if self.is_config(id) {
                    return Err(self.error(id, format!("Missing key in LIST {}", qname)));
                }
                continue;
            };
            let mut seen = HashSet::new();
            for key in keys.split_whitespace() {
                if !seen.insert(key) {
                    return Err(self.error(id, format!("Key '{}' is listed more than once in list {}", key, qname)));
                }
                let (_, local) = split_prefix(key);
                let leaf = tree
                    .find_schema_child(id, &QName::new(node.namespace.clone(), local))
                    .filter(|c| tree.get(*c).is(YangStmt::Leaf));
                if leaf.is_none() {
                    return Err(self.error(id, format!("Key '{}' of list {} is not a leaf of the list", key, qname)));
                }
            }
        }
        Ok(())
    }

    /// Whether a node holds configuration: not below an operation or
    /// notification, and no `config false` on it or above it
    fn is_config(&self, id: StmtId) -> bool {
        let tree = &self.ctx.tree;
        std::iter::once(id).chain(tree.ancestors(id)).all(|a| {
            let node = tree.get(a);
            !matches!(node.yang(), Some(YangStmt::Rpc | YangStmt::Action | YangStmt::Notification))
                && tree.child_argument(a, YangStmt::Config) != Some("false")
        })
    }

    /// Parse a `must`, `when` or `path` argument
    pub fn parse_xpath(&self, id: StmtId) -> Result<ParsedXPath> {
        let node = self.ctx.tree.get(id);
        let parser = XPathParser::new(self.ctx.config.xpath.math_mode, self.ctx.strategy(node.source));
        let parsed = parser
            .parse(node.argument())
            .map_err(|e| self.error(id, format!("Invalid expression '{}': {}", node.argument(), e)))?;
        let version = self.ctx.sources[node.source].version;
        if parsed.min_version > version {
            warn!(
                expression = %parsed.original,
                required = %parsed.min_version,
                declared = %version,
                at = %node.location,
                "Expression needs a newer YANG version than its module declares"
            );
        }
        Ok(parsed)
    }

    /// Resolve the target of every instantiated leafref and reject loops
    pub fn resolve_leafrefs(&mut self) -> Result<()> {
        let leaves: Vec<StmtId> = self
            .ctx
            .tree
            .ids()
            .filter(|id| matches!(self.ctx.tree.get(*id).yang(), Some(YangStmt::Leaf | YangStmt::LeafList)))
            .filter(|id| self.is_instantiated(*id))
            .collect();

        let mut direct: HashMap<StmtId, StmtId> = HashMap::new();
        for leaf in &leaves {
            let Some(type_stmt) = self.ctx.tree.first_child(*leaf, YangStmt::Type) else {
                continue;
            };
            let def = self.resolve_type(type_stmt)?;
            let mut paths = Vec::new();
            collect_leafref_paths(&def, &mut paths);
            for path in paths {
                let Some(target) = self.follow_path(*leaf, &path)? else {
                    continue;
                };
                direct.entry(*leaf).or_insert(target);
                let target_path = self.ctx.tree.schema_path(target);
                self.leafref_targets.entry(*leaf).or_insert(target_path);
            }
        }

        for leaf in &leaves {
            let mut visited = HashSet::new();
            let mut current = *leaf;
            while let Some(next) = direct.get(&current) {
                if *next == *leaf {
                    let path = self.leaf_path_text(*leaf);
                    return Err(self.loop_error(*leaf, &path));
                }
                if !visited.insert(*next) {
                    break;
                }
                current = *next;
            }
        }
        Ok(())
    }

    /// Schema path of a leafref's target
    pub fn leafref_target(&self, leaf: StmtId) -> Option<&Vec<QName>> {
        self.leafref_targets.get(&leaf)
    }

    fn leaf_qname(&self, leaf: StmtId) -> QName {
        let node = self.ctx.tree.get(leaf);
        QName::new(node.namespace.clone(), node.argument())
    }

    fn leaf_path_text(&self, leaf: StmtId) -> String {
        let tree = &self.ctx.tree;
        tree.first_child(leaf, YangStmt::Type)
            .and_then(|t| self.find_path_text(t))
            .unwrap_or_default()
    }

    fn find_path_text(&self, type_stmt: StmtId) -> Option<String> {
        let tree = &self.ctx.tree;
        if let Some(path) = tree.child_argument(type_stmt, YangStmt::Path) {
            return Some(path.to_string());
        }
        let reference = tree.get(type_stmt).argument();
        let typedef = self.ctx.find_definition(type_stmt, YangStmt::Typedef, reference);
        typedef
            .and_then(|t| tree.first_child(t, YangStmt::Type))
            .and_then(|t| self.find_path_text(t))
            .or_else(|| tree.children_of(type_stmt, YangStmt::Type).find_map(|m| self.find_path_text(m)))
    }

    fn loop_error(&self, leaf: StmtId, path: &str) -> YangError {
        self.error(
            leaf,
            format!("Leafref {} resolution loops back onto itself via {}", self.leaf_qname(leaf), path),
        )
    }

    /// Walk a leafref path from its leaf. `None` for paths that cannot be
    /// followed statically, such as `deref()`.
    fn follow_path(&self, leaf: StmtId, path: &ParsedXPath) -> Result<Option<StmtId>> {
        let tree = &self.ctx.tree;
        let Some(location) = path.expr.as_location() else {
            if is_deref(&path.expr) {
                return Ok(None);
            }
            return Err(self.error(
                leaf,
                format!("Leafref {} path '{}' is not a location path", self.leaf_qname(leaf), path.original),
            ));
        };

        let unresolved = || {
            self.error(
                leaf,
                format!("Leafref {} path '{}' cannot be resolved", self.leaf_qname(leaf), path.original),
            )
        };
        let default_namespace = tree.get(leaf).namespace.clone();
        let mut current = if location.absolute { None } else { Some(leaf) };
        for step in &location.steps {
            if step.is_self() {
                continue;
            }
            if step.is_parent() {
                let Some(node) = current else {
                    return Err(unresolved());
                };
                current = tree.data_parent(node).filter(|p| tree.get(*p).parent.is_some());
                continue;
            }
            let qname = match &step.test {
                NodeTest::Name(QNameRef::Resolved(qname)) => qname.clone(),
                NodeTest::Name(QNameRef::Unresolved { prefix: None, local_name }) => {
                    QName::new(default_namespace.clone(), local_name.as_str())
                }
                _ => return Err(unresolved()),
            };
            let next = match current {
                Some(node) => tree.find_data_child(node, &qname),
                None => self.ctx.module_by_namespace(&qname.module).and_then(|m| {
                    self.ctx.module_roots(m).into_iter().find_map(|root| tree.find_data_child(root, &qname))
                }),
            };
            current = Some(next.ok_or_else(unresolved)?);
        }

        let target = current.ok_or_else(unresolved)?;
        if target == leaf {
            return Err(self.loop_error(leaf, &path.original));
        }
        if !matches!(tree.get(target).yang(), Some(YangStmt::Leaf | YangStmt::LeafList)) {
            return Err(self.error(
                leaf,
                format!(
                    "Leafref {} path '{}' does not point to a leaf or leaf-list",
                    self.leaf_qname(leaf),
                    path.original
                ),
            ));
        }
        Ok(Some(target))
    }
}

fn collect_leafref_paths(def: &TypeDefinition, out: &mut Vec<Arc<ParsedXPath>>) {
    if let Some(path) = &def.leafref_path {
        out.push(path.clone());
    }
    for member in &def.union_members {
        collect_leafref_paths(member, out);
    }
}

fn is_deref(expr: &Expr) -> bool {
    match expr {
        Expr::Function { name: FunctionName::Yang(YangFunction::Deref), .. } => true,
        Expr::Path { filter, .. } | Expr::Filter { expr: filter, .. } => is_deref(filter),
        _ => false,
    }
}

/// Value assignment for enums and bits
mod num_like {
    pub trait Successor: Sized {
        fn first() -> Self;
        fn successor(&self) -> Option<Self>;
    }

    impl Successor for i64 {
        fn first() -> Self {
            0
        }

        fn successor(&self) -> Option<Self> {
            self.checked_add(1).filter(|v| *v <= i64::from(i32::MAX))
        }
    }

    impl Successor for u64 {
        fn first() -> Self {
            0
        }

        fn successor(&self) -> Option<Self> {
            self.checked_add(1).filter(|v| *v <= u64::from(u32::MAX))
        }
    }
}
