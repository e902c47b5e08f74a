//! The reactor: turns a set of YANG sources into an effective model
//!
//! Sources advance through [`Phase`]s in lockstep. Every phase is a barrier:
//! no source starts phase N+1 before all sources finished phase N, since
//! prefix binding, `uses` and `augment` need every other module's contexts.
//!
//! ```text
//! SourceRegistration   parse, extract dependencies, reject duplicates
//! PreLinkage           module graph, namespaces, header statements
//! Linkage              prefix tables, keyword resolution, argument decoding
//! StatementDefinition  substatement cardinality per YANG version
//! FullDeclaration      feature pruning, uses/augment/extension worklist, deviations
//! EffectiveModel       types, identities, leafrefs, immutable statements
//! ```
//!
//! All state of one build lives in a [`BuildContext`]; nothing is global,
//! so independent builds can run concurrently.

pub mod build;
pub mod context;
pub mod declaration;
pub mod definitions;
pub mod inference;
pub mod namespace;

use crate::config::CompilerConfig;
use crate::dependency::DependencyInfo;
use crate::error::{Result, YangError};
use crate::graph::ModuleGraph;
use crate::model::EffectiveModel;
use crate::parser::{parse_source, IrSource};
use crate::source::{SourceIdentifier, YangTextSource};
use context::ContextTree;
use namespace::SourceState;
use std::collections::HashSet;
use tracing::debug;

/// Build phases, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    SourceRegistration,
    PreLinkage,
    Linkage,
    StatementDefinition,
    FullDeclaration,
    EffectiveModel,
}

/// Everything one build reads and mutates
pub struct BuildContext<'c> {
    pub config: &'c CompilerConfig,
    pub sources: Vec<SourceState>,
    pub graph: ModuleGraph,
    pub tree: ContextTree,
    pub phase: Phase,
}

impl<'c> BuildContext<'c> {
    /// Mark every context as having completed `phase`
    fn finish_phase(&mut self, phase: Phase) {
        for id in self.tree.ids().collect::<Vec<_>>() {
            self.tree.get_mut(id).completed = phase;
        }
        self.phase = phase;
        debug!(phase = ?phase, contexts = self.tree.len(), "Phase completed");
    }
}

/// Entry point of a build
#[derive(Debug, Clone, Default)]
pub struct Reactor {
    config: CompilerConfig,
    sources: Vec<YangTextSource>,
}

impl Reactor {
    pub fn new(config: &CompilerConfig) -> Self {
        Self { config: config.clone(), sources: Vec::new() }
    }

    pub fn add_source(&mut self, source: YangTextSource) -> &mut Self {
        self.sources.push(source);
        self
    }

    pub fn add_sources(&mut self, sources: impl IntoIterator<Item = YangTextSource>) -> &mut Self {
        self.sources.extend(sources);
        self
    }

    /// Run every phase and return the effective model. The first terminal
    /// error aborts the build.
    pub fn build(&self) -> Result<EffectiveModel> {
        let registered = self.register_sources()?;
        debug!(sources = registered.len(), "Sources registered");

        let mut ctx = namespace::pre_link(&self.config, registered)?;
        ctx.finish_phase(Phase::PreLinkage);

        namespace::link(&mut ctx)?;
        ctx.finish_phase(Phase::Linkage);

        declaration::define_statements(&ctx)?;
        ctx.finish_phase(Phase::StatementDefinition);

        declaration::declare(&mut ctx)?;
        ctx.finish_phase(Phase::FullDeclaration);

        let model = build::build_model(&ctx)?;
        debug!(modules = model.modules().len(), "Effective model built");
        Ok(model)
    }

    /// Parse every source and extract its dependency information,
    /// rejecting duplicate identifiers
    fn register_sources(&self) -> Result<Vec<(YangTextSource, IrSource, DependencyInfo)>> {
        let parsed = if self.config.parser.parallel && self.sources.len() > 1 {
            self.parse_parallel()
        } else {
            self.sources.iter().map(parse_one).collect()
        };

        let mut seen: HashSet<SourceIdentifier> = HashSet::new();
        let mut registered = Vec::with_capacity(self.sources.len());
        for (source, result) in self.sources.iter().zip(parsed) {
            let (ir, info) = result?;
            let identifier = info.identifier();
            if !seen.insert(identifier.clone()) {
                return Err(YangError::DuplicateSource(identifier));
            }
            debug!(source = %source.name(), identifier = %identifier, "Registered source");
            registered.push((source.clone(), ir, info));
        }
        Ok(registered)
    }

    fn parse_parallel(&self) -> Vec<Result<(IrSource, DependencyInfo)>> {
        let threads = self.config.parser.max_threads.max(1);
        let chunk = self.sources.len().div_ceil(threads);
        std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .sources
                .chunks(chunk)
                .map(|batch| scope.spawn(move || batch.iter().map(parse_one).collect::<Vec<_>>()))
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}

fn parse_one(source: &YangTextSource) -> Result<(IrSource, DependencyInfo)> {
    let ir = parse_source(source)?;
    let info = DependencyInfo::from_ir(&ir)?;
    Ok((ir, info))
}
