//! Effective model build
//!
//! Runs the checks that need a fully declared tree, then converts every
//! surviving context into an immutable [`EffectiveStatement`] bottom-up.
//! Submodule bodies are merged into their module's statement.

use super::context::{StmtId, StmtKeyword};
use super::definitions::YangStmt;
use super::inference::Inference;
use super::BuildContext;
use crate::checksum::Checksum;
use crate::error::{Result, YangError};
use crate::model::module::ModuleEffective;
use crate::model::qname::QName;
use crate::model::statement::{Argument, DeviateKind, EffectiveStatement, OrderedBy, StatementKind, Status};
use crate::model::EffectiveModel;
use crate::parser::statement::is_identifier;
use crate::version::{Revision, YangVersion};
use std::sync::Arc;
use tracing::debug;

/// Run inference over the declared tree and build the effective model
pub fn build_model(ctx: &BuildContext<'_>) -> Result<EffectiveModel> {
    let mut inference = Inference::new(ctx);
    inference.check_identities()?;
    inference.check_list_keys()?;
    inference.resolve_leafrefs()?;

    let mut builder = Builder { ctx, inference };
    let mut modules = Vec::new();
    for idx in 0..ctx.sources.len() {
        if !ctx.sources[idx].info.is_submodule() {
            modules.push(builder.module(idx)?);
        }
    }

    let bundle = Checksum::bundle(ctx.sources.iter().map(|s| s.text.text()));
    debug!(modules = modules.len(), bundle = %bundle.as_str(), "Built effective modules");
    Ok(EffectiveModel::new(modules, bundle, ctx.config.xpath.math_mode))
}

struct Builder<'a, 'c> {
    ctx: &'a BuildContext<'c>,
    inference: Inference<'a, 'c>,
}

/// Top-level statements a submodule contributes to its module
fn is_body_statement(stmt: YangStmt) -> bool {
    stmt.is_schema_node()
        || matches!(
            stmt,
            YangStmt::Typedef
                | YangStmt::Grouping
                | YangStmt::Identity
                | YangStmt::Feature
                | YangStmt::Extension
                | YangStmt::Augment
                | YangStmt::Deviation
                | YangStmt::Uses
        )
}

impl<'a, 'c> Builder<'a, 'c> {
    fn module(&mut self, idx: usize) -> Result<ModuleEffective> {
        let ctx = self.ctx;
        let state = &ctx.sources[idx];
        let mut statement = self.statement(state.root)?;

        let mut submodules = Vec::new();
        for sub in ctx.module_sources(idx).filter(|s| *s != idx) {
            let sub_state = &ctx.sources[sub];
            for child in ctx.tree.children(sub_state.root) {
                let node = ctx.tree.get(*child);
                if node.removed || !node.yang().map_or(false, is_body_statement) {
                    continue;
                }
                statement.substatements.push(self.statement(*child)?);
            }
            submodules.push(sub_state.info.identifier());
        }

        let prefixes = state
            .prefixes
            .iter()
            .map(|(prefix, module)| (prefix.clone(), ctx.sources[*module].namespace.clone()))
            .collect();

        debug!(module = %state.name(), submodules = submodules.len(), "Built module");
        Ok(ModuleEffective {
            name: state.info.name.clone(),
            revision: state.info.revision.clone(),
            semver: state.info.semver.clone(),
            namespace: state.namespace.clone(),
            prefix: state.prefix.clone(),
            yang_version: state.version,
            submodules,
            statement,
            checksum: state.text.checksum(),
            prefixes,
        })
    }

    fn statement(&mut self, id: StmtId) -> Result<EffectiveStatement> {
        let ctx = self.ctx;
        let node = ctx.tree.get(id);
        let kind = match &node.keyword {
            StmtKeyword::Yang(stmt) => StatementKind::Yang(*stmt),
            StmtKeyword::Extension { name, module, .. } => {
                StatementKind::Extension(QName::new(ctx.sources[*module].namespace.clone(), name.as_str()))
            }
        };
        let argument = self.argument(id)?;

        let mut substatements = Vec::with_capacity(node.children.len());
        for child in &node.children {
            if !ctx.tree.get(*child).removed {
                substatements.push(self.statement(*child)?);
            }
        }

        let has_path = node
            .yang()
            .map_or(false, |s| s.is_schema_node() || matches!(s, YangStmt::Grouping | YangStmt::Typedef));
        Ok(EffectiveStatement {
            kind,
            argument,
            substatements,
            origin: node.origin,
            path: if has_path { ctx.tree.schema_path(id) } else { Vec::new() },
            location: node.location.clone(),
        })
    }

    /// Validate and convert a statement's argument
    fn argument(&mut self, id: StmtId) -> Result<Argument> {
        let ctx = self.ctx;
        let node = ctx.tree.get(id);
        let Some(stmt) = node.yang() else {
            return Ok(node.argument.clone().map_or(Argument::None, Argument::String));
        };
        let arg = node.argument();
        let invalid = |what: &str| {
            YangError::source(format!("Invalid {} argument '{}': {}", stmt.keyword(), arg, what), node.location.clone())
        };

        let value = match stmt {
            YangStmt::Input | YangStmt::Output => Argument::QName(QName::new(node.namespace.clone(), stmt.keyword())),
            YangStmt::Module
            | YangStmt::Submodule
            | YangStmt::Container
            | YangStmt::Leaf
            | YangStmt::LeafList
            | YangStmt::List
            | YangStmt::Choice
            | YangStmt::Case
            | YangStmt::Anydata
            | YangStmt::Anyxml
            | YangStmt::Grouping
            | YangStmt::Typedef
            | YangStmt::Identity
            | YangStmt::Feature
            | YangStmt::Extension
            | YangStmt::Argument
            | YangStmt::Rpc
            | YangStmt::Action
            | YangStmt::Notification => {
                if !is_identifier(arg) {
                    return Err(invalid("not a valid identifier"));
                }
                Argument::QName(QName::new(node.namespace.clone(), arg))
            }
            YangStmt::Uses => match node.target {
                Some(grouping) => {
                    let target = ctx.tree.get(grouping);
                    Argument::QName(QName::new(target.namespace.clone(), target.argument()))
                }
                None => Argument::QName(ctx.parse_qname(node.source, arg, &node.location)?),
            },
            YangStmt::Base => Argument::QName(ctx.parse_qname(node.source, arg, &node.location)?),
            YangStmt::Config | YangStmt::Mandatory | YangStmt::RequireInstance | YangStmt::YinElement => {
                match arg {
                    "true" => Argument::Boolean(true),
                    "false" => Argument::Boolean(false),
                    _ => return Err(invalid("expected true or false")),
                }
            }
            YangStmt::Value => Argument::Integer(arg.parse().map_err(|_| invalid("expected an integer"))?),
            YangStmt::Position | YangStmt::MinElements | YangStmt::FractionDigits => {
                Argument::Unsigned(arg.parse().map_err(|_| invalid("expected a non-negative integer"))?)
            }
            YangStmt::MaxElements => match arg {
                "unbounded" => Argument::MaxElements(None),
                _ => match arg.parse::<u64>() {
                    Ok(n) if n > 0 => Argument::MaxElements(Some(n)),
                    _ => return Err(invalid("expected a positive integer or unbounded")),
                },
            },
            YangStmt::YangVersion => {
                Argument::Version(YangVersion::parse(arg).ok_or_else(|| invalid("expected 1 or 1.1"))?)
            }
            YangStmt::Revision | YangStmt::RevisionDate => {
                Argument::Revision(Revision::parse(arg).map_err(|e| invalid(&e))?)
            }
            YangStmt::Status => Argument::Status(match arg {
                "current" => Status::Current,
                "deprecated" => Status::Deprecated,
                "obsolete" => Status::Obsolete,
                _ => return Err(invalid("expected current, deprecated or obsolete")),
            }),
            YangStmt::OrderedBy => Argument::OrderedBy(match arg {
                "system" => OrderedBy::System,
                "user" => OrderedBy::User,
                _ => return Err(invalid("expected system or user")),
            }),
            YangStmt::Deviate => Argument::Deviate(match arg {
                "not-supported" => DeviateKind::NotSupported,
                "add" => DeviateKind::Add,
                "replace" => DeviateKind::Replace,
                "delete" => DeviateKind::Delete,
                _ => return Err(invalid("expected not-supported, add, replace or delete")),
            }),
            YangStmt::Augment | YangStmt::Deviation | YangStmt::Refine => match node.target {
                Some(target) if stmt != YangStmt::Refine => Argument::SchemaNodeId(ctx.tree.schema_path(target)),
                _ => Argument::SchemaNodeId(
                    arg.split('/')
                        .filter(|s| !s.is_empty())
                        .map(|step| ctx.parse_qname(node.source, step.trim(), &node.location))
                        .collect::<Result<_>>()?,
                ),
            },
            YangStmt::Must | YangStmt::When | YangStmt::Path => {
                Argument::XPath(Arc::new(self.inference.parse_xpath(id)?))
            }
            YangStmt::Type => {
                let mut def = self.inference.resolve_type(id)?;
                let leaf = node.parent.filter(|p| {
                    matches!(ctx.tree.get(*p).yang(), Some(YangStmt::Leaf | YangStmt::LeafList))
                });
                if let Some(target) = leaf.and_then(|l| self.inference.leafref_target(l)) {
                    def.leafref_target = Some(target.clone());
                }
                Argument::Type(Box::new(def))
            }
            _ => node.argument.clone().map_or(Argument::None, Argument::String),
        };
        Ok(value)
    }
}
