//! YANG Compiler
//!
//! Turns YANG module sources into a validated, cross-referenced, immutable
//! effective model for code generators and data-tree validators.
//!
//! ## Features
//!
//! - **Version-aware parsing**: YANG 1.0 and 1.1 quoting, escaping and cardinality rules
//! - **Multi-phase reactor**: prefixes, groupings, augments and deviations resolved across modules
//! - **XPath**: `must`, `when` and leafref paths parsed and constant-folded
//! - **Effective model**: typed arguments, resolved types, identities and leafref targets
//! - **Checksum Validation**: SHA256 fingerprints per source and per build
//!
//! ## Architecture
//!
//! ```text
//! text ─► parser ─► IR ─► dependency ─► graph
//!                              │
//!                              ▼
//!                reactor (context tree, worklist)
//!                              │
//!                              ▼
//!                      model::EffectiveModel
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use yang_compiler::{CompilerConfig, Reactor, YangTextSource};
//!
//! let source = YangTextSource::new("example.yang", "module example { namespace urn:example; prefix ex; }");
//! let model = Reactor::new(&CompilerConfig::default()).add_source(source).build()?;
//! assert!(model.find_module("example", None).is_some());
//! # Ok::<(), yang_compiler::YangError>(())
//! ```

pub mod checksum;
pub mod config;
pub mod dependency;
pub mod error;
pub mod graph;
pub mod loader;
pub mod model;
pub mod parser;
pub mod reactor;
pub mod source;
pub mod version;
pub mod xpath;

pub use checksum::Checksum;
pub use config::CompilerConfig;
pub use dependency::DependencyInfo;
pub use error::{Result, YangError};
pub use graph::ModuleGraph;
pub use model::{EffectiveModel, EffectiveStatement, ModuleEffective, QName, QNameModule};
pub use reactor::definitions::YangStmt;
pub use reactor::Reactor;
pub use source::{SourceIdentifier, SourceRef, YangTextSource};
pub use version::{Revision, YangVersion};
pub use xpath::{MathMode, ParsedXPath, QNameStrategy, XPathError, XPathParser};
