//! Module dependency graph
//!
//! Nodes are registered sources, edges point from a unit to the units it
//! imports or includes. Used to bind every `import`/`include` to a concrete
//! source, to reject cycles and to order the reactor's work so that
//! dependencies come first.

use crate::dependency::{DependencyInfo, ModuleImport, UnitKind};
use crate::error::{Result, YangError};
use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::fmt;

/// Why one unit depends on another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Import,
    Include,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Import => f.write_str("import"),
            Self::Include => f.write_str("include"),
        }
    }
}

/// Import and include graph over a set of sources
#[derive(Debug)]
pub struct ModuleGraph {
    graph: DiGraph<String, EdgeKind>,
    nodes: Vec<NodeIndex>,
    /// Resolved source index of every import, aligned with `DependencyInfo::imports`
    imports: Vec<Vec<usize>>,
    /// Resolved source index of every include, aligned with `DependencyInfo::includes`
    includes: Vec<Vec<usize>>,
}

impl ModuleGraph {
    /// Build the graph, binding each import and include to a loaded source.
    pub fn build(infos: &[DependencyInfo]) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(infos.len(), infos.len() * 2);
        let nodes: Vec<NodeIndex> = infos.iter().map(|info| graph.add_node(info.identifier().to_string())).collect();

        let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, info) in infos.iter().enumerate() {
            by_name.entry(info.name.as_str()).or_default().push(idx);
        }

        let mut imports = Vec::with_capacity(infos.len());
        let mut includes = Vec::with_capacity(infos.len());
        for (idx, info) in infos.iter().enumerate() {
            let mut resolved_imports = Vec::with_capacity(info.imports.len());
            for import in &info.imports {
                let target = select_import(infos, by_name.get(import.name.as_str()), import).ok_or_else(|| {
                    YangError::MissingSource { name: import.name.clone(), location: import.location.clone() }
                })?;
                graph.add_edge(nodes[idx], nodes[target], EdgeKind::Import);
                resolved_imports.push(target);
            }

            let mut resolved_includes = Vec::with_capacity(info.includes.len());
            for include in &info.includes {
                let candidates = by_name.get(include.name.as_str()).into_iter().flatten().copied();
                let target = candidates
                    .filter(|c| infos[*c].is_submodule())
                    .filter(|c| include.revision.is_none() || infos[*c].revision == include.revision)
                    .max_by(|a, b| infos[*a].revision.cmp(&infos[*b].revision))
                    .ok_or_else(|| YangError::MissingSource {
                        name: include.name.clone(),
                        location: include.location.clone(),
                    })?;
                graph.add_edge(nodes[idx], nodes[target], EdgeKind::Include);
                resolved_includes.push(target);
            }

            imports.push(resolved_imports);
            includes.push(resolved_includes);
        }

        let module_graph = Self { graph, nodes, imports, includes };
        module_graph.check_cycles(infos)?;
        Ok(module_graph)
    }

    fn check_cycles(&self, infos: &[DependencyInfo]) -> Result<()> {
        for scc in kosaraju_scc(&self.graph) {
            let mut members: Vec<usize> = scc.iter().map(|n| n.index()).collect();
            members.sort_unstable();
            match members.as_slice() {
                [single] => {
                    let node = self.nodes[*single];
                    if self.graph.contains_edge(node, node) {
                        let name = infos[*single].name.clone();
                        return Err(YangError::CircularDependency(name.clone(), name));
                    }
                }
                [first, second, ..] => {
                    return Err(YangError::CircularDependency(
                        infos[*first].name.clone(),
                        infos[*second].name.clone(),
                    ));
                }
                [] => {}
            }
        }
        Ok(())
    }

    /// Source indices with every dependency before its dependents
    pub fn order(&self) -> Vec<usize> {
        match toposort(&self.graph, None) {
            Ok(sorted) => sorted.into_iter().rev().map(|n| n.index()).collect(),
            // Cycles were rejected in `build`
            Err(_) => (0..self.nodes.len()).collect(),
        }
    }

    /// Resolved import targets of a source
    pub fn imports(&self, source: usize) -> &[usize] {
        &self.imports[source]
    }

    /// Resolved include targets of a source
    pub fn includes(&self, source: usize) -> &[usize] {
        &self.includes[source]
    }

    /// Sources that import or include `source`
    pub fn dependents(&self, source: usize) -> Vec<usize> {
        self.graph
            .neighbors_directed(self.nodes[source], petgraph::Direction::Incoming)
            .map(|n| n.index())
            .collect()
    }

    /// Graphviz rendering of the graph; includes are dashed
    pub fn to_dot(&self) -> String {
        let dot = Dot::with_attr_getters(
            &self.graph,
            &[DotConfig::EdgeNoLabel],
            &|_, edge| match edge.weight() {
                EdgeKind::Import => String::new(),
                EdgeKind::Include => "style = dashed".to_string(),
            },
            &|_, _| String::new(),
        );
        format!("{}", dot)
    }
}

/// Pick the module an import refers to: the exact revision when one is
/// given, a compatible semantic version when one is given, else the latest.
fn select_import(infos: &[DependencyInfo], candidates: Option<&Vec<usize>>, import: &ModuleImport) -> Option<usize> {
    candidates?
        .iter()
        .copied()
        .filter(|c| matches!(infos[*c].kind, UnitKind::Module))
        .filter(|c| import.revision.is_none() || infos[*c].revision == import.revision)
        .filter(|c| match (&import.semver, &infos[*c].semver) {
            (Some(wanted), Some(found)) => found.major == wanted.major && found >= wanted,
            (Some(_), None) => false,
            (None, _) => true,
        })
        .max_by(|a, b| infos[*a].revision.cmp(&infos[*b].revision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::source::YangTextSource;

    fn info(text: &str) -> DependencyInfo {
        let ir = parse_source(&YangTextSource::new("test.yang", text)).unwrap();
        DependencyInfo::from_ir(&ir).unwrap()
    }

    #[test]
    fn test_order_puts_imports_first() {
        let infos = vec![
            info("module b { namespace urn:b; prefix b; import a { prefix a; } }"),
            info("module a { namespace urn:a; prefix a; }"),
        ];
        let graph = ModuleGraph::build(&infos).unwrap();
        assert_eq!(graph.order(), vec![1, 0]);
        assert_eq!(graph.imports(0), &[1]);
        assert_eq!(graph.dependents(1), vec![0]);
        assert!(graph.to_dot().contains("digraph"));
    }

    #[test]
    fn test_dot_marks_includes() {
        let infos = vec![
            info("module m { namespace urn:m; prefix m; include s; }"),
            info("submodule s { belongs-to m { prefix m; } }"),
        ];
        let dot = ModuleGraph::build(&infos).unwrap().to_dot();
        assert!(dot.contains("style = dashed"));
    }

    #[test]
    fn test_latest_revision_wins() {
        let infos = vec![
            info("module b { namespace urn:b; prefix b; import a { prefix a; } }"),
            info("module a { namespace urn:a; prefix a; revision 2019-01-01; }"),
            info("module a { namespace urn:a; prefix a; revision 2021-06-30; }"),
        ];
        let graph = ModuleGraph::build(&infos).unwrap();
        assert_eq!(graph.imports(0), &[2]);
    }

    #[test]
    fn test_missing_import() {
        let infos = vec![info("module b { namespace urn:b; prefix b; import zz { prefix z; } }")];
        let err = ModuleGraph::build(&infos).unwrap_err();
        assert!(err.to_string().starts_with("Imported module [zz] was not found."));
    }

    #[test]
    fn test_import_cycle() {
        let infos = vec![
            info("module a { namespace urn:a; prefix a; import b { prefix b; } }"),
            info("module b { namespace urn:b; prefix b; import a { prefix a; } }"),
        ];
        let err = ModuleGraph::build(&infos).unwrap_err();
        assert_eq!(err.to_string(), "Found circular dependency between modules a and b");
    }
}
