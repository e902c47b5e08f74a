//! Statement definition and full declaration
//!
//! Full declaration runs a worklist over every `uses`, top-level `augment`
//! and extension use. An item either resolves or is deferred with a reason;
//! a pass that resolves nothing while items remain ends the build with an
//! inference error. Deviations are applied once the worklist is drained.

use super::context::{StmtContext, StmtId, StmtKeyword};
use super::definitions::{substatement_rules, validate_substatements, YangStmt};
use super::namespace::split_prefix;
use super::BuildContext;
use crate::error::{Result, YangError};
use crate::model::statement::StatementOrigin;
use crate::source::SourceRef;
use crate::version::YangVersion;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

/// Validate argument presence and substatement cardinality of every context
pub fn define_statements(ctx: &BuildContext<'_>) -> Result<()> {
    for id in ctx.tree.ids() {
        let node = ctx.tree.get(id);
        let Some(stmt) = node.yang() else {
            continue;
        };
        let state = &ctx.sources[node.source];
        match (&node.argument, stmt.is_argumentless()) {
            (Some(_), true) => {
                return Err(YangError::source(
                    format!("{} statement does not take an argument", stmt.keyword()),
                    node.location.clone(),
                ))
            }
            (None, false) => {
                return Err(YangError::source(
                    format!("{} statement requires an argument", stmt.keyword()),
                    node.location.clone(),
                ))
            }
            _ => {}
        }

        let children: Vec<(YangStmt, SourceRef)> = ctx
            .tree
            .children(id)
            .iter()
            .filter_map(|c| {
                let child = ctx.tree.get(*c);
                child.yang().map(|s| (s, child.location.clone()))
            })
            .collect();
        validate_substatements(
            stmt,
            node.argument.as_deref(),
            state.version,
            state.name(),
            &children,
            &node.location,
        )?;
    }
    Ok(())
}

/// Prune by feature, expand `uses` and `augment`, resolve extensions and
/// apply deviations
pub fn declare(ctx: &mut BuildContext<'_>) -> Result<()> {
    let mut declarer = Declarer { ctx, expanded: HashSet::new(), features: HashMap::new() };
    declarer.prune_features()?;
    declarer.wrap_all_shorthand();
    declarer.run_worklist()?;
    declarer.apply_deviations()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Uses(StmtId),
    Augment(StmtId),
    Extension(StmtId),
}

impl Pending {
    fn id(&self) -> StmtId {
        match self {
            Self::Uses(id) | Self::Augment(id) | Self::Extension(id) => *id,
        }
    }
}

enum Resolution {
    Done,
    Deferred(String),
}

struct Declarer<'a, 'c> {
    ctx: &'a mut BuildContext<'c>,
    /// `uses` statements whose grouping has been instantiated
    expanded: HashSet<StmtId>,
    /// Memoized feature support
    features: HashMap<StmtId, bool>,
}

/// Filter for copied subtrees: nested `uses` were already expanded in place
/// and scoped definitions are looked up at their declaration site.
fn copy_filter(c: &StmtContext) -> bool {
    !c.removed && !matches!(c.yang(), Some(YangStmt::Uses | YangStmt::Grouping | YangStmt::Typedef))
}

fn copy_all(c: &StmtContext) -> bool {
    !c.removed
}

impl<'a, 'c> Declarer<'a, 'c> {
    fn run_worklist(&mut self) -> Result<()> {
        let mut pending: VecDeque<Pending> = self
            .ctx
            .tree
            .ids()
            .filter(|id| !self.is_pruned(*id))
            .filter_map(|id| {
                let node = self.ctx.tree.get(id);
                match &node.keyword {
                    StmtKeyword::Yang(YangStmt::Uses) => Some(Pending::Uses(id)),
                    StmtKeyword::Yang(YangStmt::Augment) => {
                        let top_level = node.parent.map_or(false, |p| self.ctx.tree.get(p).parent.is_none());
                        top_level.then_some(Pending::Augment(id))
                    }
                    StmtKeyword::Extension { .. } => Some(Pending::Extension(id)),
                    StmtKeyword::Yang(_) => None,
                }
            })
            .collect();

        let bound = self.ctx.config.reactor.max_iterations.unwrap_or(self.ctx.tree.len() + 1);
        debug!(items = pending.len(), bound, "Starting declaration worklist");

        let mut iteration = 0;
        while !pending.is_empty() {
            iteration += 1;
            let mut progress = false;
            let mut deferred: Vec<(Pending, String)> = Vec::new();
            for item in pending.drain(..) {
                let outcome = match item {
                    Pending::Uses(id) => self.try_uses(id)?,
                    Pending::Augment(id) => self.try_augment(id)?,
                    Pending::Extension(id) => self.try_extension(id)?,
                };
                match outcome {
                    Resolution::Done => {
                        trace!(item = ?item, iteration, "Resolved");
                        progress = true;
                    }
                    Resolution::Deferred(reason) => deferred.push((item, reason)),
                }
            }

            if deferred.is_empty() {
                break;
            }
            if !progress || iteration >= bound {
                let (first, reason) = &deferred[0];
                let others = deferred.len() - 1;
                let mut message = format!("Failed to resolve {} statement(s): {}", deferred.len(), reason);
                if others > 0 {
                    message.push_str(&format!(" (and {} more)", others));
                }
                return Err(YangError::inference(message, self.ctx.tree.get(first.id()).location.clone()));
            }
            pending = deferred.into_iter().map(|(item, _)| item).collect();
        }
        debug!(iterations = iteration, "Declaration worklist drained");
        Ok(())
    }

    fn is_pruned(&self, id: StmtId) -> bool {
        let tree = &self.ctx.tree;
        tree.get(id).removed || tree.ancestors(id).any(|a| tree.get(a).removed)
    }

    /// Whether the subtree under `root` still contains a `uses` to expand
    fn has_unexpanded_uses(&self, root: StmtId) -> bool {
        let tree = &self.ctx.tree;
        let mut stack: Vec<StmtId> = tree.children(root).to_vec();
        while let Some(id) = stack.pop() {
            let node = tree.get(id);
            if node.removed {
                continue;
            }
            if node.is(YangStmt::Uses) && !self.expanded.contains(&id) {
                return true;
            }
            stack.extend_from_slice(tree.children(id));
        }
        false
    }

    /// Splice copies of the grouping's schema nodes next to `uses`. A `when`
    /// on the `uses` is not copied onto them; consumers read the condition
    /// from the `uses` statement.
    fn try_uses(&mut self, uses: StmtId) -> Result<Resolution> {
        let node = self.ctx.tree.get(uses);
        let reference = node.argument().to_string();
        let location = node.location.clone();
        let namespace = node.namespace.clone();
        let Some(parent) = node.parent else {
            return Ok(Resolution::Deferred(format!("uses '{}' has no parent", reference)));
        };

        let Some(grouping) = self.ctx.find_definition(uses, YangStmt::Grouping, &reference) else {
            return Ok(Resolution::Deferred(format!("Grouping '{}' was not found", reference)));
        };
        if self.has_unexpanded_uses(grouping) {
            return Ok(Resolution::Deferred(format!("Grouping '{}' is not fully expanded", reference)));
        }
        let augments: Vec<StmtId> = self.ctx.tree.children_of(uses, YangStmt::Augment).collect();
        if augments.iter().any(|a| self.has_unexpanded_uses(*a)) {
            return Ok(Resolution::Deferred(format!("Augments of uses '{}' are not fully expanded", reference)));
        }

        let tree = &mut self.ctx.tree;
        let mut position = tree.children(parent).iter().position(|c| *c == uses).map_or(0, |p| p + 1);
        let nodes: Vec<StmtId> = tree
            .children(grouping)
            .iter()
            .copied()
            .filter(|c| {
                let child = tree.get(*c);
                !child.removed && child.yang().map_or(false, |s| s.is_schema_node())
            })
            .collect();
        let mut copies = Vec::with_capacity(nodes.len());
        for template in nodes {
            let (copy, _) =
                tree.copy_subtree(template, parent, position, StatementOrigin::AddedByUses, Some(&namespace), &copy_filter);
            copies.push(copy);
            position += 1;
        }

        let refines: Vec<StmtId> = self.ctx.tree.children_of(uses, YangStmt::Refine).collect();
        for refine in refines {
            let (source, arg, at) = self.describe(refine);
            let target = self
                .ctx
                .resolve_schema_node_id(source, &arg, &copies, &at)?
                .ok_or_else(|| YangError::source(format!("Refine target '{}' was not found", arg), at.clone()))?;
            self.apply_refine(refine, target)?;
        }

        for augment in augments {
            let (source, arg, at) = self.describe(augment);
            let target = self
                .ctx
                .resolve_schema_node_id(source, &arg, &copies, &at)?
                .ok_or_else(|| YangError::source(format!("Augment target '{}' was not found", arg), at.clone()))?;
            self.apply_augment(augment, target, false)?;
        }

        self.ctx.tree.get_mut(uses).target = Some(grouping);
        self.expanded.insert(uses);
        trace!(grouping = %reference, at = %location, copies = copies.len(), "Instantiated grouping");
        Ok(Resolution::Done)
    }

    fn try_augment(&mut self, augment: StmtId) -> Result<Resolution> {
        let (source, arg, at) = self.describe(augment);
        if self.has_unexpanded_uses(augment) {
            return Ok(Resolution::Deferred(format!("Augment '{}' is not fully expanded", arg)));
        }
        if !arg.trim_start().starts_with('/') {
            return Err(YangError::source(
                format!("Augment target '{}' must be an absolute schema node identifier", arg),
                at,
            ));
        }
        match self.ctx.resolve_schema_node_id(source, &arg, &[], &at)? {
            Some(target) => {
                self.apply_augment(augment, target, true)?;
                Ok(Resolution::Done)
            }
            None => Ok(Resolution::Deferred(format!("Augment target '{}' not found", arg))),
        }
    }

    fn try_extension(&mut self, id: StmtId) -> Result<Resolution> {
        let node = self.ctx.tree.get(id);
        let StmtKeyword::Extension { prefix, name, module } = &node.keyword else {
            return Ok(Resolution::Done);
        };
        match self.ctx.find_top_level(*module, YangStmt::Extension, name) {
            Some(definition) => {
                self.ctx.tree.get_mut(id).target = Some(definition);
                Ok(Resolution::Done)
            }
            None => Err(YangError::source(
                format!(
                    "Extension {}:{} is not defined in module {}",
                    prefix,
                    name,
                    self.ctx.sources[*module].name()
                ),
                node.location.clone(),
            )),
        }
    }

    fn describe(&self, id: StmtId) -> (usize, String, SourceRef) {
        let node = self.ctx.tree.get(id);
        (node.source, node.argument().to_string(), node.location.clone())
    }

    fn apply_refine(&mut self, refine: StmtId, target: StmtId) -> Result<()> {
        let tree = &self.ctx.tree;
        let target_stmt = tree.get(target).yang().unwrap_or(YangStmt::Container);
        let version = self.ctx.sources[tree.get(refine).source].version;
        let allowed = substatement_rules(target_stmt, version, None);
        let properties: Vec<StmtId> = tree.children(refine).iter().copied().filter(|c| !tree.get(*c).removed).collect();

        for property in properties {
            let tree = &mut self.ctx.tree;
            if let Some(stmt) = tree.get(property).yang() {
                if !allowed.iter().any(|(s, _)| *s == stmt) {
                    return Err(YangError::source(
                        format!("{} cannot be refined on {} {}", stmt.keyword(), target_stmt.keyword(), tree.get(target).argument()),
                        tree.get(property).location.clone(),
                    ));
                }
                if !matches!(stmt, YangStmt::Must | YangStmt::IfFeature) {
                    let existing: Vec<StmtId> = tree.children_of(target, stmt).collect();
                    for old in existing {
                        tree.detach(old);
                    }
                }
            }
            tree.copy_subtree(property, target, usize::MAX, StatementOrigin::AddedByUses, None, &copy_all);
            if tree.get(property).is(YangStmt::IfFeature) && !self.if_feature_holds(property)? {
                self.ctx.tree.get_mut(target).removed = true;
            }
        }
        Ok(())
    }

    fn apply_augment(&mut self, augment: StmtId, target: StmtId, top_level: bool) -> Result<()> {
        let (source, arg, at) = self.describe(augment);
        let tree = &self.ctx.tree;
        let target_stmt = tree.get(target).yang();
        if !matches!(
            target_stmt,
            Some(
                YangStmt::Container
                    | YangStmt::List
                    | YangStmt::Choice
                    | YangStmt::Case
                    | YangStmt::Input
                    | YangStmt::Output
                    | YangStmt::Notification
            )
        ) {
            let kind = target_stmt.map_or("extension", |s| s.keyword());
            return Err(YangError::source(format!("Augment target '{}' is a {} and cannot be augmented", arg, kind), at));
        }

        let version = self.ctx.sources[source].version;
        let foreign = tree.get(target).namespace != tree.get(augment).namespace;
        let conditional = version == YangVersion::V1_1 && tree.first_child(augment, YangStmt::When).is_some();
        let nodes: Vec<StmtId> = tree
            .children(augment)
            .iter()
            .copied()
            .filter(|c| {
                let child = tree.get(*c);
                !child.removed && child.yang().map_or(false, |s| s.is_schema_node())
            })
            .collect();

        for node in nodes {
            let tree = &self.ctx.tree;
            let Some(qname) = tree.schema_qname(node) else {
                continue;
            };
            let location = tree.get(node).location.clone();
            if top_level && foreign && !conditional && self.is_mandatory_node(node) {
                return Err(YangError::source(
                    format!(
                        "An augment cannot add node '{}' because it is mandatory and in module different than target",
                        qname.local_name()
                    ),
                    location,
                ));
            }
            if tree.find_schema_child(target, &qname).is_some() {
                return Err(YangError::source(
                    format!(
                        "An augment cannot add node named '{}' because this name is already used in target",
                        qname.local_name()
                    ),
                    location,
                ));
            }
            let tree = &mut self.ctx.tree;
            let (copy, _) = tree.copy_subtree(node, target, usize::MAX, StatementOrigin::AddedByAugment, None, &copy_filter);
            if target_stmt == Some(YangStmt::Choice) {
                self.wrap_shorthand(copy);
            }
        }
        self.ctx.tree.get_mut(augment).target = Some(target);
        trace!(target = %arg, "Applied augment");
        Ok(())
    }

    /// Nodes an instance document must contain
    fn is_mandatory_node(&self, id: StmtId) -> bool {
        let tree = &self.ctx.tree;
        let node = tree.get(id);
        match node.yang() {
            Some(YangStmt::Leaf | YangStmt::Choice | YangStmt::Anyxml | YangStmt::Anydata) => {
                tree.child_argument(id, YangStmt::Mandatory) == Some("true")
            }
            Some(YangStmt::List | YangStmt::LeafList) => tree
                .child_argument(id, YangStmt::MinElements)
                .and_then(|m| m.parse::<u64>().ok())
                .map_or(false, |m| m > 0),
            Some(YangStmt::Container) => {
                tree.first_child(id, YangStmt::Presence).is_none()
                    && tree.schema_children(id).any(|c| self.is_mandatory_node(c))
            }
            _ => false,
        }
    }

    fn wrap_all_shorthand(&mut self) {
        let choices: Vec<StmtId> = self.ctx.tree.ids().filter(|id| self.ctx.tree.get(*id).is(YangStmt::Choice)).collect();
        for choice in choices {
            let members: Vec<StmtId> = self.ctx.tree.children(choice).to_vec();
            for member in members {
                self.wrap_shorthand(member);
            }
        }
    }

    /// Put a data definition directly under a `choice` into an implicit `case`
    fn wrap_shorthand(&mut self, member: StmtId) {
        let tree = &mut self.ctx.tree;
        let node = tree.get(member);
        if !node.yang().map_or(false, |s| s.is_data_definition()) {
            return;
        }
        let case = StmtContext {
            keyword: StmtKeyword::Yang(YangStmt::Case),
            argument: node.argument.clone(),
            parent: None,
            children: Vec::new(),
            source: node.source,
            namespace: node.namespace.clone(),
            location: node.location.clone(),
            origin: StatementOrigin::Implicit,
            completed: node.completed,
            original: None,
            target: None,
            removed: false,
        };
        tree.wrap(member, case);
    }

    fn apply_deviations(&mut self) -> Result<()> {
        let deviations: Vec<StmtId> = self
            .ctx
            .sources
            .iter()
            .flat_map(|s| self.ctx.tree.children_of(s.root, YangStmt::Deviation).collect::<Vec<_>>())
            .collect();

        for deviation in deviations {
            let (source, arg, at) = self.describe(deviation);
            let target = self
                .ctx
                .resolve_schema_node_id(source, &arg, &[], &at)?
                .ok_or_else(|| YangError::source(format!("Deviation target '{}' was not found", arg), at.clone()))?;
            let deviates: Vec<StmtId> = self.ctx.tree.children_of(deviation, YangStmt::Deviate).collect();
            for deviate in deviates {
                let kind = self.ctx.tree.get(deviate).argument().to_string();
                match kind.as_str() {
                    "not-supported" => self.ctx.tree.get_mut(target).removed = true,
                    "add" | "replace" | "delete" => self.apply_deviate(&kind, deviate, target)?,
                    other => {
                        return Err(YangError::source(
                            format!("Invalid deviate argument '{}'", other),
                            self.ctx.tree.get(deviate).location.clone(),
                        ))
                    }
                }
            }
            self.ctx.tree.get_mut(deviation).target = Some(target);
            debug!(target = %arg, "Applied deviation");
        }
        Ok(())
    }

    fn apply_deviate(&mut self, kind: &str, deviate: StmtId, target: StmtId) -> Result<()> {
        let tree = &self.ctx.tree;
        let target_stmt = tree.get(target).yang().unwrap_or(YangStmt::Container);
        let target_name = tree.schema_qname(target).map(|q| q.to_string()).unwrap_or_default();
        let version = self.ctx.sources[tree.get(target).source].version;
        let allowed = substatement_rules(target_stmt, version, None);
        let properties: Vec<StmtId> = tree.children(deviate).to_vec();

        for property in properties {
            let tree = &mut self.ctx.tree;
            let node = tree.get(property);
            let Some(stmt) = node.yang() else {
                tree.copy_subtree(property, target, usize::MAX, StatementOrigin::Declared, None, &copy_all);
                continue;
            };
            let location = node.location.clone();
            let argument = node.argument.clone();
            let rule = allowed.iter().find(|(s, _)| *s == stmt).map(|(_, card)| *card);
            let Some(card) = rule else {
                return Err(YangError::source(
                    format!("Deviation {} of {} is not valid for target {}", kind, stmt.keyword(), target_name),
                    location,
                ));
            };
            let existing: Vec<StmtId> = tree.children_of(target, stmt).collect();

            match kind {
                "add" => {
                    if card.max == 1 && !existing.is_empty() {
                        return Err(YangError::source(
                            format!(
                                "Deviation cannot add property '{}' because it already exists in target {}",
                                stmt.keyword(),
                                target_name
                            ),
                            location,
                        ));
                    }
                }
                "replace" => {
                    if existing.is_empty() {
                        return Err(YangError::source(
                            format!(
                                "Deviation cannot replace property '{}' because it does not exist in target {}",
                                stmt.keyword(),
                                target_name
                            ),
                            location,
                        ));
                    }
                    for old in existing {
                        tree.detach(old);
                    }
                }
                _ => {
                    let matching = existing.into_iter().find(|e| tree.get(*e).argument == argument);
                    match matching {
                        Some(old) => tree.detach(old),
                        None => {
                            return Err(YangError::source(
                                format!(
                                    "Deviation cannot delete property '{}' with argument '{}' because it does not exist in target {}",
                                    stmt.keyword(),
                                    argument.unwrap_or_default(),
                                    target_name
                                ),
                                location,
                            ))
                        }
                    }
                    continue;
                }
            }
            tree.copy_subtree(property, target, usize::MAX, StatementOrigin::Declared, None, &copy_all);
        }
        Ok(())
    }

    /// Remove statements whose `if-feature` condition is not met. A no-op
    /// unless the configuration restricts supported features.
    fn prune_features(&mut self) -> Result<()> {
        if self.ctx.config.reactor.supported_features.is_none() {
            return Ok(());
        }
        let conditions: Vec<StmtId> =
            self.ctx.tree.ids().filter(|id| self.ctx.tree.get(*id).is(YangStmt::IfFeature)).collect();
        let mut pruned = 0usize;
        for condition in conditions {
            let Some(parent) = self.ctx.tree.get(condition).parent else {
                continue;
            };
            if self.ctx.tree.get(parent).is(YangStmt::Feature) {
                continue;
            }
            if !self.if_feature_holds(condition)? {
                self.ctx.tree.get_mut(parent).removed = true;
                pruned += 1;
            }
        }
        debug!(pruned, "Applied feature pruning");
        Ok(())
    }

    /// Evaluate an `if-feature` statement
    fn if_feature_holds(&mut self, condition: StmtId) -> Result<bool> {
        if self.ctx.config.reactor.supported_features.is_none() {
            return Ok(true);
        }
        let node = self.ctx.tree.get(condition);
        let (source, text, location) = (node.source, node.argument().to_string(), node.location.clone());
        let tokens = tokenize_if_feature(&text);
        if self.ctx.sources[source].version == YangVersion::V1_0 && tokens.len() != 1 {
            return Err(YangError::source(
                format!("if-feature '{}' must name a single feature in YANG 1.0", text),
                location,
            ));
        }
        let mut parser = IfFeatureParser { tokens: &tokens, pos: 0, source, location: &location, text: &text };
        let mut visiting = HashSet::new();
        let value = parser.expr(self, &mut visiting)?;
        if parser.pos != tokens.len() {
            return Err(YangError::source(format!("Invalid if-feature expression '{}'", text), location));
        }
        Ok(value)
    }

    fn feature_supported(
        &mut self,
        source: usize,
        reference: &str,
        location: &SourceRef,
        visiting: &mut HashSet<StmtId>,
    ) -> Result<bool> {
        let (prefix, name) = split_prefix(reference);
        let module = self
            .ctx
            .prefix_module(source, prefix)
            .ok_or_else(|| YangError::source(format!("Prefix {} is not bound", prefix.unwrap_or("")), location.clone()))?;
        let feature = self
            .ctx
            .find_top_level(module, YangStmt::Feature, name)
            .ok_or_else(|| YangError::source(format!("Feature '{}' was not found", reference), location.clone()))?;
        if let Some(known) = self.features.get(&feature) {
            return Ok(*known);
        }
        if !visiting.insert(feature) {
            return Err(YangError::source(format!("Feature '{}' depends on itself", reference), location.clone()));
        }

        let mut supported = self.ctx.config.feature_supported(self.ctx.sources[module].name(), name);
        let conditions: Vec<StmtId> = self.ctx.tree.children_of(feature, YangStmt::IfFeature).collect();
        for condition in conditions {
            if !supported {
                break;
            }
            let node = self.ctx.tree.get(condition);
            let (cond_source, text, at) = (node.source, node.argument().to_string(), node.location.clone());
            let tokens = tokenize_if_feature(&text);
            let mut parser = IfFeatureParser { tokens: &tokens, pos: 0, source: cond_source, location: &at, text: &text };
            supported = parser.expr(self, visiting)?;
        }
        visiting.remove(&feature);
        self.features.insert(feature, supported);
        Ok(supported)
    }
}

fn tokenize_if_feature(text: &str) -> Vec<String> {
    text.replace('(', " ( ").replace(')', " ) ").split_whitespace().map(str::to_string).collect()
}

/// `if-feature` expressions: `or` binds loosest, then `and`, then `not`
struct IfFeatureParser<'t> {
    tokens: &'t [String],
    pos: usize,
    source: usize,
    location: &'t SourceRef,
    text: &'t str,
}

impl<'t> IfFeatureParser<'t> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn error(&self) -> YangError {
        YangError::source(format!("Invalid if-feature expression '{}'", self.text), self.location.clone())
    }

    fn expr(&mut self, declarer: &mut Declarer<'_, '_>, visiting: &mut HashSet<StmtId>) -> Result<bool> {
        let mut value = self.term(declarer, visiting)?;
        while self.peek() == Some("or") {
            self.pos += 1;
            let rhs = self.term(declarer, visiting)?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn term(&mut self, declarer: &mut Declarer<'_, '_>, visiting: &mut HashSet<StmtId>) -> Result<bool> {
        let mut value = self.factor(declarer, visiting)?;
        while self.peek() == Some("and") {
            self.pos += 1;
            let rhs = self.factor(declarer, visiting)?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn factor(&mut self, declarer: &mut Declarer<'_, '_>, visiting: &mut HashSet<StmtId>) -> Result<bool> {
        match self.peek() {
            Some("not") => {
                self.pos += 1;
                Ok(!self.factor(declarer, visiting)?)
            }
            Some("(") => {
                self.pos += 1;
                let value = self.expr(declarer, visiting)?;
                if self.peek() != Some(")") {
                    return Err(self.error());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(")") | Some("and") | Some("or") | None => Err(self.error()),
            Some(reference) => {
                let reference = reference.to_string();
                self.pos += 1;
                declarer.feature_supported(self.source, &reference, self.location, visiting)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_if_feature_tokens() {
        assert_eq!(tokenize_if_feature("not (a:x or y)"), vec!["not", "(", "a:x", "or", "y", ")"]);
        assert_eq!(tokenize_if_feature("x"), vec!["x"]);
    }

    #[test]
    fn test_copy_filter_skips_expanded_statements() {
        let ctx = |stmt: YangStmt| StmtContext {
            keyword: StmtKeyword::Yang(stmt),
            argument: Some("x".into()),
            parent: None,
            children: Vec::new(),
            source: 0,
            namespace: crate::model::qname::QNameModule::new("urn:x", None),
            location: SourceRef::builtin(),
            origin: StatementOrigin::Declared,
            completed: super::super::Phase::Linkage,
            original: None,
            target: None,
            removed: false,
        };
        assert!(!copy_filter(&ctx(YangStmt::Uses)));
        assert!(!copy_filter(&ctx(YangStmt::Typedef)));
        assert!(copy_filter(&ctx(YangStmt::Leaf)));
        let mut removed = ctx(YangStmt::Leaf);
        removed.removed = true;
        assert!(!copy_filter(&removed));
        assert!(!copy_all(&removed));
    }
}
