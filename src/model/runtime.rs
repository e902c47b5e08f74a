//! Runtime types
//!
//! Which groupings and typedefs the instantiated schema actually reaches.
//! A generator uses this to skip dead groupings. Reachability runs over a
//! petgraph graph: module roots point at the groupings their `uses` name
//! and the typedefs their `type` statements derive from, groupings and
//! typedefs point at whatever they use in turn.

use super::qname::QName;
use super::statement::{Argument, EffectiveStatement};
use super::EffectiveModel;
use crate::reactor::definitions::YangStmt;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::HashMap;

// =============================================================================
// Result
// =============================================================================

/// Derived reachability summary of an effective model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeTypes {
    /// Groupings reachable from instantiated schema, by path
    pub used_groupings: Vec<Vec<QName>>,
    pub unused_groupings: Vec<Vec<QName>>,
    pub used_typedefs: Vec<Vec<QName>>,
    pub unused_typedefs: Vec<Vec<QName>>,
    /// Every instantiated schema node, by path
    pub schema_nodes: Vec<Vec<QName>>,
}

impl RuntimeTypes {
    pub fn is_grouping_used(&self, path: &[QName]) -> bool {
        self.used_groupings.iter().any(|p| p == path)
    }

    pub fn is_typedef_used(&self, path: &[QName]) -> bool {
        self.used_typedefs.iter().any(|p| p == path)
    }

    /// Compute the summary for a model
    pub fn compute(model: &EffectiveModel) -> Self {
        let mut collector = Collector::default();
        for module in model.modules() {
            let root = collector.graph.add_node(Owner::Root);
            collector.roots.push(root);
            collector.index(&module.statement);
        }
        for (i, module) in model.modules().iter().enumerate() {
            let root = collector.roots[i];
            let mut scopes = vec![&module.statement];
            collector.link(model, &module.statement, root, &mut scopes, false);
        }
        collector.finish()
    }
}

// =============================================================================
// Graph construction
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Owner {
    Root,
    Grouping(Vec<QName>),
    Typedef(Vec<QName>),
}

#[derive(Default)]
struct Collector {
    graph: DiGraph<Owner, ()>,
    roots: Vec<NodeIndex>,
    groupings: HashMap<Vec<QName>, NodeIndex>,
    typedefs: HashMap<Vec<QName>, NodeIndex>,
    schema_nodes: Vec<Vec<QName>>,
}

impl Collector {
    /// Add a node for every grouping and typedef, nested ones included
    fn index(&mut self, stmt: &EffectiveStatement) {
        for child in &stmt.substatements {
            if child.is(YangStmt::Grouping) && !self.groupings.contains_key(&child.path) {
                let node = self.graph.add_node(Owner::Grouping(child.path.clone()));
                self.groupings.insert(child.path.clone(), node);
            } else if child.is(YangStmt::Typedef) && !self.typedefs.contains_key(&child.path) {
                let node = self.graph.add_node(Owner::Typedef(child.path.clone()));
                self.typedefs.insert(child.path.clone(), node);
            }
            self.index(child);
        }
    }

    /// Add edges from `owner` to whatever `stmt`'s descendants use. Nested
    /// groupings and typedefs become owners of their own bodies.
    fn link<'m>(
        &mut self,
        model: &'m EffectiveModel,
        stmt: &'m EffectiveStatement,
        owner: NodeIndex,
        scopes: &mut Vec<&'m EffectiveStatement>,
        in_definition: bool,
    ) {
        for child in &stmt.substatements {
            let mut child_owner = owner;
            let mut child_in_definition = in_definition;
            match child.yang() {
                Some(YangStmt::Grouping) => {
                    child_owner = self.groupings[&child.path];
                    child_in_definition = true;
                }
                Some(YangStmt::Typedef) => {
                    child_owner = self.typedefs[&child.path];
                    child_in_definition = true;
                }
                Some(YangStmt::Augment | YangStmt::Deviation) => child_in_definition = true,
                Some(YangStmt::Uses) => {
                    if let Some(target) = child.qname().and_then(|q| self.lookup(model, scopes, q, YangStmt::Grouping)) {
                        self.graph.update_edge(owner, target, ());
                    }
                }
                Some(YangStmt::Type) => {
                    if let Argument::Type(def) = &child.argument {
                        if let Some(typedef) =
                            def.derived_from.first().and_then(|q| self.lookup(model, scopes, q, YangStmt::Typedef))
                        {
                            self.graph.update_edge(owner, typedef, ());
                        }
                    }
                }
                Some(stmt) if stmt.is_schema_node() && !in_definition => {
                    self.schema_nodes.push(child.path.clone());
                }
                _ => {}
            }
            scopes.push(child);
            self.link(model, child, child_owner, scopes, child_in_definition);
            scopes.pop();
        }
    }

    /// Find the grouping or typedef a name refers to: innermost enclosing
    /// scope first, then the defining module's top level, then anywhere
    fn lookup(
        &self,
        model: &EffectiveModel,
        scopes: &[&EffectiveStatement],
        name: &QName,
        stmt: YangStmt,
    ) -> Option<NodeIndex> {
        let table = if stmt == YangStmt::Grouping { &self.groupings } else { &self.typedefs };
        let lexical = scopes
            .iter()
            .rev()
            .find_map(|scope| scope.all(stmt).find(|d| d.qname() == Some(name)))
            .or_else(|| {
                model
                    .find_module_by_namespace(&name.module)
                    .and_then(|m| m.statement.all(stmt).find(|d| d.qname() == Some(name)))
            });
        match lexical {
            Some(def) => table.get(&def.path).copied(),
            None => table
                .iter()
                .filter(|(path, _)| path.last() == Some(name))
                .min_by(|a, b| a.0.cmp(b.0))
                .map(|(_, node)| *node),
        }
    }

    fn finish(self) -> RuntimeTypes {
        let mut reachable = vec![false; self.graph.node_count()];
        for root in &self.roots {
            let mut dfs = Dfs::new(&self.graph, *root);
            while let Some(node) = dfs.next(&self.graph) {
                reachable[node.index()] = true;
            }
        }

        let mut result = RuntimeTypes { schema_nodes: self.schema_nodes, ..RuntimeTypes::default() };
        for node in self.graph.node_indices() {
            let used = reachable[node.index()];
            match &self.graph[node] {
                Owner::Root => {}
                Owner::Grouping(path) if used => result.used_groupings.push(path.clone()),
                Owner::Grouping(path) => result.unused_groupings.push(path.clone()),
                Owner::Typedef(path) if used => result.used_typedefs.push(path.clone()),
                Owner::Typedef(path) => result.unused_typedefs.push(path.clone()),
            }
        }
        for list in [
            &mut result.used_groupings,
            &mut result.unused_groupings,
            &mut result.used_typedefs,
            &mut result.unused_typedefs,
        ] {
            list.sort();
        }
        result
    }
}
