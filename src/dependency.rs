//! Dependency extraction
//!
//! Reads just enough of an IR tree to learn what a source is and what it
//! needs: name, latest revision, `belongs-to`, imports and includes. Runs
//! before any reactor exists, so it never interprets extension statements
//! beyond recognizing `*:openconfig-version`.

use crate::error::{Result, YangError};
use crate::parser::ir::{IrKeyword, IrSource, IrStatement};
use crate::source::{SourceIdentifier, SourceRef};
use crate::version::{Revision, YangVersion};
use semver::Version;
use std::sync::Arc;

const OPENCONFIG_VERSION: &str = "openconfig-version";

/// Kind of compilation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    Module,
    Submodule { belongs_to: String },
}

/// An `import` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleImport {
    pub name: String,
    pub prefix: Option<String>,
    pub revision: Option<Revision>,
    pub semver: Option<Version>,
    pub location: SourceRef,
}

/// An `include` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInclude {
    pub name: String,
    pub revision: Option<Revision>,
    pub location: SourceRef,
}

/// What a source is and which other sources it depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    pub name: String,
    pub kind: UnitKind,
    pub revision: Option<Revision>,
    pub semver: Option<Version>,
    pub yang_version: YangVersion,
    pub imports: Vec<ModuleImport>,
    pub includes: Vec<ModuleInclude>,
}

impl DependencyInfo {
    /// Extract dependency information from a parsed source
    pub fn from_ir(source: &IrSource) -> Result<Self> {
        let root = &source.root;
        let is_submodule = match &root.keyword {
            IrKeyword::Unqualified(k) if k == "module" => false,
            IrKeyword::Unqualified(k) if k == "submodule" => true,
            _ => {
                return Err(YangError::IllegalArgument(
                    "Root of parsed AST must be either module or submodule".to_string(),
                ))
            }
        };
        let at = |stmt: &IrStatement| SourceRef::new(source.file.clone(), stmt.line, stmt.column);
        let name = required_argument(root, &source.file)?;

        let kind = if is_submodule {
            let belongs = root.children_named("belongs-to").next().ok_or_else(|| {
                YangError::IllegalArgument(format!("Missing belongs-to statement in submodule {} [at {}]", name, at(root)))
            })?;
            UnitKind::Submodule { belongs_to: required_argument(belongs, &source.file)? }
        } else {
            UnitKind::Module
        };

        let mut latest: Option<String> = None;
        for rev in root.children_named("revision") {
            let current = required_argument(rev, &source.file)?;
            if latest.as_ref().map_or(true, |l| *l < current) {
                latest = Some(current);
            }
        }
        let revision = latest.map(|r| parse_revision(&r, &at(root))).transpose()?;

        let yang_version = match root.children_named("yang-version").next() {
            Some(stmt) => {
                let arg = required_argument(stmt, &source.file)?;
                YangVersion::parse(&arg).ok_or_else(|| {
                    YangError::IllegalArgument(format!("Unsupported yang-version '{}' [at {}]", arg, at(stmt)))
                })?
            }
            None => YangVersion::V1_0,
        };

        let mut imports = Vec::new();
        for stmt in root.children_named("import") {
            imports.push(ModuleImport {
                name: required_argument(stmt, &source.file)?,
                prefix: stmt.children_named("prefix").next().and_then(IrStatement::raw_argument),
                revision: revision_date(stmt, &source.file)?,
                semver: openconfig_version(stmt, &source.file)?,
                location: at(stmt),
            });
        }

        let mut includes = Vec::new();
        for stmt in root.children_named("include") {
            includes.push(ModuleInclude {
                name: required_argument(stmt, &source.file)?,
                revision: revision_date(stmt, &source.file)?,
                location: at(stmt),
            });
        }

        Ok(Self {
            name,
            kind,
            revision,
            semver: openconfig_version(root, &source.file)?,
            yang_version,
            imports,
            includes,
        })
    }

    pub fn identifier(&self) -> SourceIdentifier {
        SourceIdentifier::new(self.name.clone(), self.revision.clone()).with_semver(self.semver.clone())
    }

    pub fn is_submodule(&self) -> bool {
        matches!(self.kind, UnitKind::Submodule { .. })
    }

    pub fn belongs_to(&self) -> Option<&str> {
        match &self.kind {
            UnitKind::Submodule { belongs_to } => Some(belongs_to),
            UnitKind::Module => None,
        }
    }
}

fn required_argument(stmt: &IrStatement, file: &Arc<str>) -> Result<String> {
    stmt.raw_argument().ok_or_else(|| {
        YangError::IllegalArgument(format!(
            "Missing argument to {} statement [at {}]",
            stmt.keyword,
            SourceRef::new(file.clone(), stmt.line, stmt.column)
        ))
    })
}

fn parse_revision(arg: &str, at: &SourceRef) -> Result<Revision> {
    Revision::parse(arg).map_err(|e| YangError::IllegalArgument(format!("{} [at {}]", e, at)))
}

fn revision_date(stmt: &IrStatement, file: &Arc<str>) -> Result<Option<Revision>> {
    match stmt.children_named("revision-date").next() {
        Some(date) => {
            let arg = required_argument(date, file)?;
            parse_revision(&arg, &SourceRef::new(file.clone(), date.line, date.column)).map(Some)
        }
        None => Ok(None),
    }
}

fn openconfig_version(stmt: &IrStatement, file: &Arc<str>) -> Result<Option<Version>> {
    let Some(found) = stmt.statements.iter().find(|s| {
        matches!(&s.keyword, IrKeyword::Qualified { identifier, .. } if identifier == OPENCONFIG_VERSION)
    }) else {
        return Ok(None);
    };
    let arg = required_argument(found, file)?;
    Version::parse(&arg).map(Some).map_err(|e| {
        YangError::IllegalArgument(format!(
            "Invalid semantic version '{}': {} [at {}]",
            arg,
            e,
            SourceRef::new(file.clone(), found.line, found.column)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::source::YangTextSource;

    fn info(text: &str) -> Result<DependencyInfo> {
        DependencyInfo::from_ir(&parse_source(&YangTextSource::new("t.yang", text)).unwrap())
    }

    #[test]
    fn test_module_dependencies() {
        let dep = info(
            r#"module foo {
                yang-version 1.1;
                namespace "urn:foo";
                prefix f;
                import bar { prefix b; revision-date 2020-01-01; }
                import baz { prefix z; oc-ext:openconfig-version "1.2.3"; }
                include foo-sub;
                revision 2019-05-01;
                revision 2021-03-04;
                revision 2020-12-31;
            }"#,
        )
        .unwrap();
        assert_eq!(dep.name, "foo");
        assert_eq!(dep.kind, UnitKind::Module);
        assert_eq!(dep.yang_version, YangVersion::V1_1);
        assert_eq!(dep.revision.as_ref().map(Revision::as_str), Some("2021-03-04"));
        assert_eq!(dep.imports.len(), 2);
        assert_eq!(dep.imports[0].revision.as_ref().map(Revision::as_str), Some("2020-01-01"));
        assert_eq!(dep.imports[0].prefix.as_deref(), Some("b"));
        assert_eq!(dep.imports[1].semver, Some(Version::new(1, 2, 3)));
        assert_eq!(dep.includes[0].name, "foo-sub");
        assert_eq!(dep.identifier().to_string(), "foo@2021-03-04");
    }

    #[test]
    fn test_submodule_belongs_to() {
        let dep = info("submodule foo-sub { belongs-to foo { prefix f; } }").unwrap();
        assert!(dep.is_submodule());
        assert_eq!(dep.belongs_to(), Some("foo"));
        assert_eq!(dep.revision, None);
    }

    #[test]
    fn test_bad_root() {
        let err = info("container foo { }").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Illegal argument: Root of parsed AST must be either module or submodule"
        );
    }

    #[test]
    fn test_missing_module_name() {
        let err = info("module { }").unwrap_err();
        assert!(matches!(err, YangError::IllegalArgument(msg) if msg.starts_with("Missing argument to module")));
    }
}
