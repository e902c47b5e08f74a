//! Source registration, pre-linkage and linkage
//!
//! Pre-linkage binds every source to its module and namespace and writes the
//! header statements (`import`, `include`, `belongs-to`, `revision`) into
//! the context tree. Linkage builds each source's prefix table and turns the
//! rest of its IR into contexts with resolved keywords and decoded
//! arguments.

use super::context::{ContextTree, StmtContext, StmtId, StmtKeyword};
use super::definitions::YangStmt;
use super::{BuildContext, Phase};
use crate::config::CompilerConfig;
use crate::dependency::DependencyInfo;
use crate::error::{Result, YangError};
use crate::graph::ModuleGraph;
use crate::model::qname::{QName, QNameModule};
use crate::model::statement::StatementOrigin;
use crate::parser::{decode_argument, IrKeyword, IrSource, IrStatement};
use crate::source::{SourceRef, YangTextSource};
use crate::version::YangVersion;
use crate::xpath::QNameStrategy;
use std::collections::HashMap;
use tracing::{debug, trace};

const HEADER_STATEMENTS: [&str; 4] = ["import", "include", "belongs-to", "revision"];

/// Per-source build state
#[derive(Debug)]
pub struct SourceState {
    pub text: YangTextSource,
    pub ir: IrSource,
    pub info: DependencyInfo,
    pub version: YangVersion,
    /// Index of the module this source is, or belongs to
    pub module: usize,
    pub namespace: QNameModule,
    /// Prefix the source uses for its own module
    pub prefix: String,
    /// Prefix table: prefix to module source index
    pub prefixes: HashMap<String, usize>,
    pub root: StmtId,
    /// Header contexts created before linkage, by IR child index
    header: HashMap<usize, StmtId>,
}

impl SourceState {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn file(&self) -> &str {
        self.text.name()
    }

    fn location(&self, stmt: &IrStatement) -> SourceRef {
        SourceRef::new(self.text.name().clone(), stmt.line, stmt.column)
    }
}

/// Bind sources to modules and namespaces, resolve imports through the
/// module graph and create the header contexts.
pub fn pre_link<'c>(
    config: &'c CompilerConfig,
    registered: Vec<(YangTextSource, IrSource, DependencyInfo)>,
) -> Result<BuildContext<'c>> {
    let infos: Vec<DependencyInfo> = registered.iter().map(|(_, _, info)| info.clone()).collect();
    let graph = ModuleGraph::build(&infos)?;

    let modules: Vec<usize> = (0..infos.len())
        .map(|idx| owning_module(&infos, &graph, idx, &registered[idx].1))
        .collect::<Result<_>>()?;

    let mut tree = ContextTree::default();
    let mut sources = Vec::with_capacity(registered.len());
    for (idx, (text, ir, info)) in registered.into_iter().enumerate() {
        let module = modules[idx];
        let root_location = SourceRef::new(text.name().clone(), ir.root.line, ir.root.column);
        if infos[module].yang_version != info.yang_version {
            return Err(YangError::source(
                format!(
                    "Submodule {} has yang-version {} but module {} has yang-version {}",
                    info.name, info.yang_version, infos[module].name, infos[module].yang_version
                ),
                root_location,
            ));
        }

        let placeholder = QNameModule::new("", None);
        let root = tree.push(StmtContext {
            keyword: StmtKeyword::Yang(if info.is_submodule() { YangStmt::Submodule } else { YangStmt::Module }),
            argument: Some(info.name.clone()),
            parent: None,
            children: Vec::new(),
            source: idx,
            namespace: placeholder.clone(),
            location: root_location,
            origin: StatementOrigin::Declared,
            completed: Phase::SourceRegistration,
            original: None,
            target: None,
            removed: false,
        });

        let mut prefixes = HashMap::new();
        for (pos, import) in info.imports.iter().enumerate() {
            if let Some(prefix) = &import.prefix {
                if prefixes.insert(prefix.clone(), graph.imports(idx)[pos]).is_some() {
                    return Err(YangError::source(
                        format!("Prefix {} is bound more than once in {}", prefix, info.name),
                        import.location.clone(),
                    ));
                }
            }
        }

        sources.push(SourceState {
            version: info.yang_version,
            module,
            namespace: placeholder,
            prefix: String::new(),
            prefixes,
            root,
            header: HashMap::new(),
            text,
            ir,
            info,
        });
    }

    // Namespaces and own prefixes need the owning module's IR.
    for idx in 0..sources.len() {
        let module = sources[idx].module;
        let namespace = module_namespace(&sources[module])?;
        let own_prefix = own_prefix(&sources[idx])?;
        let state = &mut sources[idx];
        if let Some(prefix) = &own_prefix {
            if state.prefixes.insert(prefix.clone(), module).is_some() {
                return Err(YangError::source(
                    format!("Prefix {} is bound more than once in {}", prefix, state.info.name),
                    tree.get(state.root).location.clone(),
                ));
            }
        }
        state.prefix = own_prefix.unwrap_or_default();
        state.namespace = namespace.clone();
        tree.get_mut(state.root).namespace = namespace;
    }

    for idx in 0..sources.len() {
        let root = sources[idx].root;
        let mut header = HashMap::new();
        for (pos, stmt) in sources[idx].ir.root.statements.iter().enumerate() {
            let is_header = matches!(&stmt.keyword, IrKeyword::Unqualified(k) if HEADER_STATEMENTS.contains(&k.as_str()));
            if is_header {
                header.insert(pos, create_context(&mut tree, &sources, idx, stmt, root)?);
            }
        }
        sources[idx].header = header;
    }

    Ok(BuildContext { config, sources, graph, tree, phase: Phase::SourceRegistration })
}

/// Turn the remaining IR of every source into contexts
pub fn link(ctx: &mut BuildContext<'_>) -> Result<()> {
    let order = ctx.graph.order();
    let BuildContext { sources, tree, .. } = ctx;
    for idx in order {
        let state = &sources[idx];
        let root = state.root;
        let mut ordered = Vec::with_capacity(state.ir.root.statements.len());
        for (pos, stmt) in state.ir.root.statements.iter().enumerate() {
            let id = match state.header.get(&pos) {
                Some(id) => *id,
                None => create_context(tree, sources, idx, stmt, root)?,
            };
            ordered.push(id);
        }
        tree.get_mut(root).children = ordered;
        debug!(source = %state.file(), module = %state.name(), "Linked source");
    }
    Ok(())
}

fn create_context(
    tree: &mut ContextTree,
    sources: &[SourceState],
    source: usize,
    stmt: &IrStatement,
    parent: StmtId,
) -> Result<StmtId> {
    let state = &sources[source];
    let location = state.location(stmt);
    let keyword = match &stmt.keyword {
        IrKeyword::Unqualified(k) => StmtKeyword::Yang(YangStmt::lookup(k).ok_or_else(|| {
            YangError::source(format!("{} is not a YANG statement or use of extension", k), location.clone())
        })?),
        IrKeyword::Qualified { prefix, identifier } => {
            let module = *state.prefixes.get(prefix.as_str()).ok_or_else(|| {
                YangError::source(format!("Prefix {} is not bound", prefix), location.clone())
            })?;
            StmtKeyword::Extension { prefix: prefix.clone(), name: identifier.clone(), module }
        }
    };
    let argument = stmt
        .argument
        .as_ref()
        .map(|arg| decode_argument(arg, state.version, &location))
        .transpose()?;

    trace!(keyword = %stmt.keyword, at = %location, "Creating context");
    let id = tree.push(StmtContext {
        keyword,
        argument,
        parent: Some(parent),
        children: Vec::with_capacity(stmt.statements.len()),
        source,
        namespace: state.namespace.clone(),
        location,
        origin: StatementOrigin::Declared,
        completed: Phase::SourceRegistration,
        original: None,
        target: None,
        removed: false,
    });
    for child in &stmt.statements {
        create_context(tree, sources, source, child, id)?;
    }
    Ok(id)
}

/// The module a source belongs to: itself for modules, the including module
/// (or the latest module of the `belongs-to` name) for submodules.
fn owning_module(infos: &[DependencyInfo], graph: &ModuleGraph, idx: usize, ir: &IrSource) -> Result<usize> {
    let Some(parent) = infos[idx].belongs_to() else {
        return Ok(idx);
    };
    let candidates: Vec<usize> =
        (0..infos.len()).filter(|c| !infos[*c].is_submodule() && infos[*c].name == parent).collect();
    let including = graph.dependents(idx).into_iter().find(|d| candidates.contains(d));
    including
        .or_else(|| candidates.iter().copied().max_by(|a, b| infos[*a].revision.cmp(&infos[*b].revision)))
        .ok_or_else(|| YangError::MissingSource {
            name: parent.to_string(),
            location: SourceRef::new(ir.file.clone(), ir.root.line, ir.root.column),
        })
}

fn module_namespace(module: &SourceState) -> Result<QNameModule> {
    let root = &module.ir.root;
    let stmt = root.children_named("namespace").next().ok_or_else(|| {
        YangError::substatement(
            "Minimal count of NAMESPACE for MODULE is 1, detected 0.",
            module.location(root),
        )
    })?;
    let location = module.location(stmt);
    let arg = stmt
        .argument
        .as_ref()
        .ok_or_else(|| YangError::source("namespace statement requires an argument", location.clone()))?;
    let uri = decode_argument(arg, module.version, &location)?;
    Ok(QNameModule::new(uri, module.info.revision.clone()))
}

fn own_prefix(state: &SourceState) -> Result<Option<String>> {
    let root = &state.ir.root;
    let holder = if state.info.is_submodule() { root.children_named("belongs-to").next() } else { Some(root) };
    let Some(stmt) = holder.and_then(|h| h.children_named("prefix").next()) else {
        return Ok(None);
    };
    let location = state.location(stmt);
    stmt.argument
        .as_ref()
        .map(|arg| decode_argument(arg, state.version, &location))
        .transpose()
}

impl<'c> BuildContext<'c> {
    /// Sources that make up a module: the module and its submodules
    pub fn module_sources(&self, module: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.sources.len()).filter(move |s| self.sources[*s].module == module)
    }

    /// Root contexts of a module and its submodules
    pub fn module_roots(&self, module: usize) -> Vec<StmtId> {
        self.module_sources(module).map(|s| self.sources[s].root).collect()
    }

    /// Module source index for a namespace
    pub fn module_by_namespace(&self, namespace: &QNameModule) -> Option<usize> {
        (0..self.sources.len()).find(|s| !self.sources[*s].info.is_submodule() && self.sources[*s].namespace == *namespace)
    }

    /// Module a prefix refers to in a source; no prefix means the source's own module
    pub fn prefix_module(&self, source: usize, prefix: Option<&str>) -> Option<usize> {
        match prefix {
            None => Some(self.sources[source].module),
            Some(p) => self.sources[source].prefixes.get(p).copied(),
        }
    }

    /// Resolve a possibly prefixed name written in `source`
    pub fn parse_qname(&self, source: usize, text: &str, location: &SourceRef) -> Result<QName> {
        let (prefix, local) = split_prefix(text);
        let module = self
            .prefix_module(source, prefix)
            .ok_or_else(|| YangError::source(format!("Prefix {} is not bound", prefix.unwrap_or("")), location.clone()))?;
        Ok(QName::new(self.sources[module].namespace.clone(), local))
    }

    /// Expression name resolution for a source
    pub fn strategy(&self, source: usize) -> QNameStrategy {
        let state = &self.sources[source];
        QNameStrategy::Unqualified { default: state.namespace.clone(), prefixes: self.prefix_namespaces(source) }
    }

    /// Name resolution that keeps unprefixed names unresolved
    pub fn qualified_strategy(&self, source: usize) -> QNameStrategy {
        QNameStrategy::Qualified { prefixes: self.prefix_namespaces(source) }
    }

    fn prefix_namespaces(&self, source: usize) -> HashMap<String, QNameModule> {
        self.sources[source]
            .prefixes
            .iter()
            .map(|(p, m)| (p.clone(), self.sources[*m].namespace.clone()))
            .collect()
    }

    /// Top-level statement of a module with the given keyword and argument
    pub fn find_top_level(&self, module: usize, stmt: YangStmt, name: &str) -> Option<StmtId> {
        self.module_roots(module)
            .into_iter()
            .flat_map(|root| self.tree.children_of(root, stmt).collect::<Vec<_>>())
            .find(|id| self.tree.get(*id).argument.as_deref() == Some(name))
    }

    /// Find a definition (`grouping`, `typedef`) by name as seen from `from`:
    /// lexically enclosing scopes first, then the module top level, or the
    /// top level of the module the prefix names.
    pub fn find_definition(&self, from: StmtId, stmt: YangStmt, reference: &str) -> Option<StmtId> {
        let declared = self.tree.declared(from);
        let source = self.tree.get(declared).source;
        let (prefix, name) = split_prefix(reference);
        let module = self.prefix_module(source, prefix)?;
        if module == self.sources[source].module {
            for scope in self.tree.ancestors(declared) {
                if self.tree.get(scope).parent.is_none() {
                    break;
                }
                let found = self
                    .tree
                    .children_of(scope, stmt)
                    .find(|id| self.tree.get(*id).argument.as_deref() == Some(name));
                if found.is_some() {
                    return found;
                }
            }
        }
        self.find_top_level(module, stmt, name)
    }

    /// Top-level schema child of a module by name
    pub fn find_top_level_node(&self, module: usize, name: &QName) -> Option<StmtId> {
        self.module_roots(module).into_iter().find_map(|root| self.tree.find_schema_child(root, name))
    }

    /// Resolve a schema node identifier written in `source`. Absolute
    /// identifiers start at a module root; descendant identifiers start
    /// among `scope`'s schema children. `None` means some step does not
    /// exist (yet).
    pub fn resolve_schema_node_id(
        &self,
        source: usize,
        text: &str,
        scope: &[StmtId],
        location: &SourceRef,
    ) -> Result<Option<StmtId>> {
        let trimmed = text.trim();
        let absolute = trimmed.starts_with('/');
        let steps: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        if steps.is_empty() {
            return Err(YangError::source(format!("Invalid schema node identifier '{}'", text), location.clone()));
        }

        let mut current: Option<StmtId> = None;
        for (i, step) in steps.iter().enumerate() {
            let qname = self.parse_qname(source, step, location)?;
            let next = match current {
                Some(node) => self.tree.find_schema_child(node, &qname),
                None if absolute => {
                    let Some(module) = self.module_by_namespace(&qname.module) else {
                        return Ok(None);
                    };
                    self.find_top_level_node(module, &qname)
                }
                None => scope.iter().copied().find(|id| {
                    let ctx = self.tree.get(*id);
                    !ctx.removed && self.tree.schema_qname(*id).as_ref() == Some(&qname)
                }),
            };
            match next {
                Some(id) => current = Some(id),
                None => {
                    trace!(identifier = %text, step = i, "Schema node identifier step not found");
                    return Ok(None);
                }
            }
        }
        Ok(current)
    }
}

/// Split `prefix:name` into its parts
pub fn split_prefix(text: &str) -> (Option<&str>, &str) {
    match text.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn register(texts: &[&str]) -> Vec<(YangTextSource, IrSource, DependencyInfo)> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let source = YangTextSource::new(format!("s{}.yang", i), *text);
                let ir = parse_source(&source).unwrap();
                let info = DependencyInfo::from_ir(&ir).unwrap();
                (source, ir, info)
            })
            .collect()
    }

    #[test]
    fn test_prefixes_are_source_local() {
        let config = CompilerConfig::default();
        let registered = register(&[
            "module a { namespace urn:a; prefix x; import b { prefix y; } container top; }",
            "module b { namespace urn:b; prefix y; import a { prefix other; revision-date 2020-01-01; } }",
        ]);
        // b imports an absent revision of a
        assert!(pre_link(&config, registered).is_err());

        let registered = register(&[
            "module a { namespace urn:a; prefix x; import b { prefix y; } container top; }",
            "module b { namespace urn:b; prefix y; }",
        ]);
        let mut ctx = pre_link(&config, registered).unwrap();
        link(&mut ctx).unwrap();
        let a = &ctx.sources[0];
        assert_eq!(a.prefixes["x"], 0);
        assert_eq!(a.prefixes["y"], 1);
        assert_eq!(ctx.sources[1].namespace, QNameModule::new("urn:b", None));

        let top = QName::new(QNameModule::new("urn:a", None), "top");
        assert!(ctx.find_top_level_node(0, &top).is_some());
        let at = SourceRef::new("s0.yang", 1, 0);
        assert_eq!(ctx.resolve_schema_node_id(0, "/x:top", &[], &at).unwrap(), ctx.find_top_level_node(0, &top));
        assert!(ctx.parse_qname(0, "zz:top", &at).is_err());
    }

    #[test]
    fn test_submodule_shares_module_namespace() {
        let config = CompilerConfig::default();
        let registered = register(&[
            "module a { namespace urn:a; prefix a; include sub; }",
            "submodule sub { belongs-to a { prefix a; } leaf l { type string; } }",
        ]);
        let mut ctx = pre_link(&config, registered).unwrap();
        link(&mut ctx).unwrap();
        assert_eq!(ctx.sources[1].module, 0);
        assert_eq!(ctx.sources[1].namespace, QNameModule::new("urn:a", None));
        assert_eq!(ctx.module_roots(0).len(), 2);
    }

    #[test]
    fn test_unknown_keyword_and_prefix() {
        let config = CompilerConfig::default();
        let mut ctx = pre_link(&config, register(&["module a { namespace urn:a; prefix a; frob x; }"])).unwrap();
        let err = link(&mut ctx).unwrap_err();
        assert!(err.to_string().starts_with("frob is not a YANG statement or use of extension"));

        let mut ctx = pre_link(&config, register(&["module a { namespace urn:a; prefix a; q:ext x; }"])).unwrap();
        let err = link(&mut ctx).unwrap_err();
        assert!(err.to_string().starts_with("Prefix q is not bound"));
    }
}
