//! Build-time statement contexts
//!
//! Contexts live in a single arena and refer to each other by [`StmtId`].
//! A parent link is a lookup, not ownership. Instantiating a grouping or
//! applying an augment copies a range of the arena into fresh indices and
//! rewrites the internal references of the copy, so two instantiations never
//! share a node.

use super::definitions::YangStmt;
use super::Phase;
use crate::model::qname::{QName, QNameModule};
use crate::model::statement::StatementOrigin;
use crate::source::SourceRef;
use std::collections::HashMap;

/// Index of a context in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(usize);

impl StmtId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Resolved statement identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKeyword {
    Yang(YangStmt),
    /// Use of an extension; `module` is the defining module's index
    Extension { prefix: String, name: String, module: usize },
}

impl StmtKeyword {
    pub fn yang(&self) -> Option<YangStmt> {
        match self {
            Self::Yang(stmt) => Some(*stmt),
            Self::Extension { .. } => None,
        }
    }

    pub fn is(&self, stmt: YangStmt) -> bool {
        self.yang() == Some(stmt)
    }
}

#[derive(Debug, Clone)]
pub struct StmtContext {
    pub keyword: StmtKeyword,
    pub argument: Option<String>,
    pub parent: Option<StmtId>,
    pub children: Vec<StmtId>,
    /// Source whose prefix table governs this statement's arguments
    pub source: usize,
    /// Module namespace the statement's schema name is bound to
    pub namespace: QNameModule,
    pub location: SourceRef,
    pub origin: StatementOrigin,
    /// Last phase this context completed
    pub completed: Phase,
    /// Context this one was copied from
    pub original: Option<StmtId>,
    /// Context this statement was resolved against (grouping for `uses`,
    /// target for `augment`)
    pub target: Option<StmtId>,
    /// Pruned by a deviation or an unsupported feature
    pub removed: bool,
}

impl StmtContext {
    pub fn yang(&self) -> Option<YangStmt> {
        self.keyword.yang()
    }

    pub fn is(&self, stmt: YangStmt) -> bool {
        self.keyword.is(stmt)
    }

    pub fn argument(&self) -> &str {
        self.argument.as_deref().unwrap_or("")
    }
}

/// The arena of all contexts of one build
#[derive(Debug, Default)]
pub struct ContextTree {
    nodes: Vec<StmtContext>,
}

impl ContextTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: StmtId) -> &StmtContext {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: StmtId) -> &mut StmtContext {
        &mut self.nodes[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = StmtId> {
        (0..self.nodes.len()).map(StmtId)
    }

    /// Add a context, appending it to its parent's children
    pub fn push(&mut self, ctx: StmtContext) -> StmtId {
        let id = StmtId(self.nodes.len());
        let parent = ctx.parent;
        self.nodes.push(ctx);
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub fn children(&self, id: StmtId) -> &[StmtId] {
        &self.nodes[id.0].children
    }

    /// Children with the given core keyword that are still in the tree
    pub fn children_of(&self, id: StmtId, stmt: YangStmt) -> impl Iterator<Item = StmtId> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(move |c| self.nodes[c.0].is(stmt) && !self.nodes[c.0].removed)
    }

    pub fn first_child(&self, id: StmtId, stmt: YangStmt) -> Option<StmtId> {
        self.children_of(id, stmt).next()
    }

    pub fn child_argument(&self, id: StmtId, stmt: YangStmt) -> Option<&str> {
        self.first_child(id, stmt).and_then(|c| self.nodes[c.0].argument.as_deref())
    }

    pub fn ancestors(&self, id: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        std::iter::successors(self.nodes[id.0].parent, move |p| self.nodes[p.0].parent)
    }

    /// The context a copy was ultimately made from
    pub fn declared(&self, mut id: StmtId) -> StmtId {
        while let Some(original) = self.nodes[id.0].original {
            id = original;
        }
        id
    }

    /// Whether the context sits inside a grouping definition
    pub fn in_grouping(&self, id: StmtId) -> bool {
        self.ancestors(id).any(|a| self.nodes[a.0].is(YangStmt::Grouping))
    }

    /// Schema node name of a context, if it has one
    pub fn schema_qname(&self, id: StmtId) -> Option<QName> {
        let ctx = &self.nodes[id.0];
        let stmt = ctx.yang()?;
        if !stmt.is_schema_node() {
            return None;
        }
        let local = if stmt.is_argumentless() { stmt.keyword() } else { ctx.argument.as_deref()? };
        Some(QName::new(ctx.namespace.clone(), local))
    }

    /// Direct schema children, looking through `uses` which contributes
    /// its copies as siblings
    pub fn schema_children(&self, id: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        self.nodes[id.0].children.iter().copied().filter(move |c| {
            let ctx = &self.nodes[c.0];
            !ctx.removed && ctx.yang().map_or(false, |s| s.is_schema_node())
        })
    }

    pub fn find_schema_child(&self, id: StmtId, name: &QName) -> Option<StmtId> {
        self.schema_children(id).find(|c| self.schema_qname(*c).as_ref() == Some(name))
    }

    /// Find a data child, looking through `choice` and `case`
    pub fn find_data_child(&self, id: StmtId, name: &QName) -> Option<StmtId> {
        for child in self.schema_children(id) {
            let ctx = &self.nodes[child.0];
            if matches!(ctx.yang(), Some(YangStmt::Choice | YangStmt::Case)) {
                if let Some(found) = self.find_data_child(child, name) {
                    return Some(found);
                }
            } else if self.schema_qname(child).as_ref() == Some(name) {
                return Some(child);
            }
        }
        None
    }

    /// Nearest ancestor that is a data node, an operation or a module
    pub fn data_parent(&self, id: StmtId) -> Option<StmtId> {
        self.ancestors(id).find(|a| {
            !matches!(
                self.nodes[a.0].yang(),
                Some(YangStmt::Choice | YangStmt::Case | YangStmt::Uses | YangStmt::Augment)
            )
        })
    }

    /// Copy the subtree rooted at `src` under `new_parent`, inserting it at
    /// `position` among the parent's children. Descendants for which `keep`
    /// returns false are left out. Returns the new root and the mapping from
    /// original to copied indices.
    pub fn copy_subtree(
        &mut self,
        src: StmtId,
        new_parent: StmtId,
        position: usize,
        origin: StatementOrigin,
        namespace: Option<&QNameModule>,
        keep: &dyn Fn(&StmtContext) -> bool,
    ) -> (StmtId, HashMap<StmtId, StmtId>) {
        let mut mapping = HashMap::new();
        let root = self.copy_node(src, new_parent, origin, namespace, keep, &mut mapping);

        // `copy_node` appended the root; move it into place.
        let siblings = &mut self.nodes[new_parent.0].children;
        if let Some(last) = siblings.pop() {
            let at = position.min(siblings.len());
            siblings.insert(at, last);
        }

        for copied in mapping.values() {
            if let Some(target) = self.nodes[copied.0].target {
                if let Some(rewritten) = mapping.get(&target) {
                    self.nodes[copied.0].target = Some(*rewritten);
                }
            }
        }
        (root, mapping)
    }

    fn copy_node(
        &mut self,
        src: StmtId,
        parent: StmtId,
        origin: StatementOrigin,
        namespace: Option<&QNameModule>,
        keep: &dyn Fn(&StmtContext) -> bool,
        mapping: &mut HashMap<StmtId, StmtId>,
    ) -> StmtId {
        let template = &self.nodes[src.0];
        let children: Vec<StmtId> =
            template.children.iter().copied().filter(|c| keep(&self.nodes[c.0])).collect();
        let copy = StmtContext {
            keyword: template.keyword.clone(),
            argument: template.argument.clone(),
            parent: Some(parent),
            children: Vec::with_capacity(children.len()),
            source: template.source,
            namespace: namespace.cloned().unwrap_or_else(|| template.namespace.clone()),
            location: template.location.clone(),
            origin: if template.origin == StatementOrigin::Declared { origin } else { template.origin },
            completed: template.completed,
            original: Some(src),
            target: template.target,
            removed: template.removed,
        };
        let id = self.push(copy);
        mapping.insert(src, id);
        for child in children {
            self.copy_node(child, id, origin, namespace, keep, mapping);
        }
        id
    }

    /// Put `id` under a new parent created from `wrapper`, which takes the
    /// place of `id` among its siblings.
    pub fn wrap(&mut self, id: StmtId, mut wrapper: StmtContext) -> StmtId {
        let parent = self.nodes[id.0].parent;
        wrapper.parent = parent;
        wrapper.children = vec![id];
        let wrapper_id = StmtId(self.nodes.len());
        self.nodes.push(wrapper);
        if let Some(parent) = parent {
            for child in self.nodes[parent.0].children.iter_mut() {
                if *child == id {
                    *child = wrapper_id;
                }
            }
        }
        self.nodes[id.0].parent = Some(wrapper_id);
        wrapper_id
    }

    /// Schema node identifier of a context: the names of all schema node
    /// ancestors, groupings and typedefs from the module root down.
    pub fn schema_path(&self, id: StmtId) -> Vec<QName> {
        let mut path: Vec<QName> = std::iter::once(id)
            .chain(self.ancestors(id))
            .filter_map(|a| self.path_segment(a))
            .collect();
        path.reverse();
        path
    }

    fn path_segment(&self, id: StmtId) -> Option<QName> {
        let ctx = &self.nodes[id.0];
        match ctx.yang()? {
            YangStmt::Grouping | YangStmt::Typedef => {
                Some(QName::new(ctx.namespace.clone(), ctx.argument.as_deref()?))
            }
            _ => self.schema_qname(id),
        }
    }

    /// Remove a child from its parent's list; the arena slot stays allocated
    pub fn detach(&mut self, id: StmtId) {
        if let Some(parent) = self.nodes[id.0].parent {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
        self.nodes[id.0].removed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(stmt: YangStmt, arg: Option<&str>, parent: Option<StmtId>, ns: &QNameModule) -> StmtContext {
        StmtContext {
            keyword: StmtKeyword::Yang(stmt),
            argument: arg.map(str::to_string),
            parent,
            children: Vec::new(),
            source: 0,
            namespace: ns.clone(),
            location: SourceRef::new("t.yang", 1, 0),
            origin: StatementOrigin::Declared,
            completed: Phase::Linkage,
            original: None,
            target: None,
            removed: false,
        }
    }

    #[test]
    fn test_copy_is_independent_and_rewrites_targets() {
        let a = QNameModule::new("urn:a", None);
        let b = QNameModule::new("urn:b", None);
        let mut tree = ContextTree::default();
        let module = tree.push(ctx(YangStmt::Module, Some("m"), None, &a));
        let grouping = tree.push(ctx(YangStmt::Grouping, Some("g"), Some(module), &a));
        let leaf = tree.push(ctx(YangStmt::Leaf, Some("l"), Some(grouping), &a));
        let uses = tree.push(ctx(YangStmt::Uses, Some("x"), Some(grouping), &a));
        tree.get_mut(uses).target = Some(leaf);
        let container = tree.push(ctx(YangStmt::Container, Some("c"), Some(module), &a));

        let all = |_: &StmtContext| true;
        let (copy, mapping) = tree.copy_subtree(leaf, container, 0, StatementOrigin::AddedByUses, Some(&b), &all);
        assert_ne!(copy, leaf);
        assert_eq!(tree.get(copy).origin, StatementOrigin::AddedByUses);
        assert_eq!(tree.declared(copy), leaf);
        assert_eq!(tree.schema_qname(copy), Some(QName::new(b.clone(), "l")));
        assert_eq!(mapping.get(&leaf), Some(&copy));

        let (group_copy, mapping) = tree.copy_subtree(grouping, container, 0, StatementOrigin::AddedByUses, None, &all);
        let copied_uses = mapping[&uses];
        assert_eq!(tree.get(copied_uses).target, Some(mapping[&leaf]));
        assert_eq!(tree.children(container)[0], group_copy);

        tree.get_mut(mapping[&leaf]).argument = Some("changed".into());
        assert_eq!(tree.get(leaf).argument.as_deref(), Some("l"));
    }

    #[test]
    fn test_copy_filter_and_wrap() {
        let a = QNameModule::new("urn:a", None);
        let mut tree = ContextTree::default();
        let module = tree.push(ctx(YangStmt::Module, Some("m"), None, &a));
        let grouping = tree.push(ctx(YangStmt::Grouping, Some("g"), Some(module), &a));
        tree.push(ctx(YangStmt::Typedef, Some("t"), Some(grouping), &a));
        let leaf = tree.push(ctx(YangStmt::Leaf, Some("l"), Some(grouping), &a));
        let choice = tree.push(ctx(YangStmt::Choice, Some("ch"), Some(module), &a));

        let no_typedefs = |c: &StmtContext| !c.is(YangStmt::Typedef);
        let (copy, _) = tree.copy_subtree(grouping, module, 0, StatementOrigin::AddedByUses, None, &no_typedefs);
        assert_eq!(tree.children(copy).len(), 1);

        let (moved, _) = tree.copy_subtree(leaf, choice, 0, StatementOrigin::AddedByUses, None, &no_typedefs);
        let mut case = ctx(YangStmt::Case, Some("l"), None, &a);
        case.origin = StatementOrigin::Implicit;
        let case = tree.wrap(moved, case);
        assert_eq!(tree.children(choice), &[case]);
        assert_eq!(tree.get(moved).parent, Some(case));
        assert_eq!(
            tree.schema_path(moved),
            vec![QName::new(a.clone(), "ch"), QName::new(a.clone(), "l"), QName::new(a.clone(), "l")]
        );
        assert_eq!(tree.schema_path(leaf), vec![QName::new(a.clone(), "g"), QName::new(a, "l")]);
    }
}
