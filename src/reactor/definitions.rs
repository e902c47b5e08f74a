//! Statement definitions and substatement cardinality
//!
//! Every YANG keyword maps to a [`YangStmt`]. The allowed substatements of
//! each statement, with their minimum and maximum counts, depend on the
//! language version; [`validate_substatements`] enforces them.

use crate::error::{Result, YangError};
use crate::source::SourceRef;
use crate::version::YangVersion;
use std::collections::HashMap;

macro_rules! yang_statements {
    ($($variant:ident => $keyword:literal),+ $(,)?) => {
        /// A core YANG statement
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum YangStmt {
            $($variant),+
        }

        impl YangStmt {
            pub fn lookup(keyword: &str) -> Option<Self> {
                match keyword {
                    $($keyword => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn keyword(&self) -> &'static str {
                match self {
                    $(Self::$variant => $keyword),+
                }
            }
        }
    };
}

yang_statements! {
    Action => "action",
    Anydata => "anydata",
    Anyxml => "anyxml",
    Argument => "argument",
    Augment => "augment",
    Base => "base",
    BelongsTo => "belongs-to",
    Bit => "bit",
    Case => "case",
    Choice => "choice",
    Config => "config",
    Contact => "contact",
    Container => "container",
    Default => "default",
    Description => "description",
    Deviate => "deviate",
    Deviation => "deviation",
    Enum => "enum",
    ErrorAppTag => "error-app-tag",
    ErrorMessage => "error-message",
    Extension => "extension",
    Feature => "feature",
    FractionDigits => "fraction-digits",
    Grouping => "grouping",
    Identity => "identity",
    IfFeature => "if-feature",
    Import => "import",
    Include => "include",
    Input => "input",
    Key => "key",
    Leaf => "leaf",
    LeafList => "leaf-list",
    Length => "length",
    List => "list",
    Mandatory => "mandatory",
    MaxElements => "max-elements",
    MinElements => "min-elements",
    Modifier => "modifier",
    Module => "module",
    Must => "must",
    Namespace => "namespace",
    Notification => "notification",
    OrderedBy => "ordered-by",
    Organization => "organization",
    Output => "output",
    Path => "path",
    Pattern => "pattern",
    Position => "position",
    Prefix => "prefix",
    Presence => "presence",
    Range => "range",
    Reference => "reference",
    Refine => "refine",
    RequireInstance => "require-instance",
    Revision => "revision",
    RevisionDate => "revision-date",
    Rpc => "rpc",
    Status => "status",
    Submodule => "submodule",
    Type => "type",
    Typedef => "typedef",
    Unique => "unique",
    Units => "units",
    Uses => "uses",
    Value => "value",
    When => "when",
    YangVersion => "yang-version",
    YinElement => "yin-element",
}

impl YangStmt {
    /// Upper-case constant name used in diagnostics, e.g. `IF_FEATURE`
    pub fn const_name(&self) -> String {
        self.keyword().to_ascii_uppercase().replace('-', "_")
    }

    /// Statements introduced by YANG 1.1
    pub fn since(&self) -> YangVersion {
        match self {
            Self::Action | Self::Anydata | Self::Modifier => YangVersion::V1_1,
            _ => YangVersion::V1_0,
        }
    }

    /// Whether the statement takes no argument
    pub fn is_argumentless(&self) -> bool {
        matches!(self, Self::Input | Self::Output)
    }

    /// Nodes addressable by a schema node identifier
    pub fn is_schema_node(&self) -> bool {
        matches!(
            self,
            Self::Action
                | Self::Anydata
                | Self::Anyxml
                | Self::Case
                | Self::Choice
                | Self::Container
                | Self::Input
                | Self::Leaf
                | Self::LeafList
                | Self::List
                | Self::Notification
                | Self::Output
                | Self::Rpc
        )
    }

    /// Nodes that appear in instance data
    pub fn is_data_node(&self) -> bool {
        matches!(
            self,
            Self::Anydata | Self::Anyxml | Self::Container | Self::Leaf | Self::LeafList | Self::List
        )
    }

    /// Data definition statements, which `choice` accepts as shorthand cases
    pub fn is_data_definition(&self) -> bool {
        self.is_data_node() || *self == Self::Choice
    }
}

const UNBOUNDED: u32 = u32::MAX;

/// Allowed occurrence range of one substatement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    pub min: u32,
    pub max: u32,
}

const fn opt() -> Cardinality {
    Cardinality { min: 0, max: 1 }
}

const fn one() -> Cardinality {
    Cardinality { min: 1, max: 1 }
}

const fn many() -> Cardinality {
    Cardinality { min: 0, max: UNBOUNDED }
}

const fn some() -> Cardinality {
    Cardinality { min: 1, max: UNBOUNDED }
}

use YangStmt as S;

const DOC: [(YangStmt, Cardinality); 2] = [(S::Description, opt()), (S::Reference, opt())];

const DATA_DEFS: [YangStmt; 6] = [S::Anyxml, S::Choice, S::Container, S::Leaf, S::LeafList, S::List];

fn data_defs(rules: &mut Vec<(YangStmt, Cardinality)>, version: YangVersion) {
    rules.extend(DATA_DEFS.iter().map(|s| (*s, many())));
    if version == YangVersion::V1_1 {
        rules.push((S::Anydata, many()));
    }
}

/// Substatement rules of `parent` for a version. `argument` is the parent's
/// argument, which only matters for `deviate`.
pub fn substatement_rules(
    parent: YangStmt,
    version: YangVersion,
    argument: Option<&str>,
) -> Vec<(YangStmt, Cardinality)> {
    let v11 = version == YangVersion::V1_1;
    let mut rules: Vec<(YangStmt, Cardinality)> = Vec::new();
    match parent {
        S::Module | S::Submodule => {
            data_defs(&mut rules, version);
            rules.extend([
                (S::Augment, many()),
                (S::Contact, opt()),
                (S::Deviation, many()),
                (S::Extension, many()),
                (S::Feature, many()),
                (S::Grouping, many()),
                (S::Identity, many()),
                (S::Import, many()),
                (S::Include, many()),
                (S::Notification, many()),
                (S::Organization, opt()),
                (S::Revision, many()),
                (S::Rpc, many()),
                (S::Typedef, many()),
                (S::Uses, many()),
                (S::YangVersion, opt()),
            ]);
            rules.extend(DOC);
            if parent == S::Module {
                rules.extend([(S::Namespace, one()), (S::Prefix, one())]);
            } else {
                rules.push((S::BelongsTo, one()));
            }
        }
        S::Import => {
            rules.extend([(S::Prefix, one()), (S::RevisionDate, opt())]);
            if v11 {
                rules.extend(DOC);
            }
        }
        S::Include => {
            rules.push((S::RevisionDate, opt()));
            if v11 {
                rules.extend(DOC);
            }
        }
        S::BelongsTo => rules.push((S::Prefix, one())),
        S::Revision | S::When => rules.extend(DOC),
        S::Extension => {
            rules.extend([(S::Argument, opt()), (S::Status, opt())]);
            rules.extend(DOC);
        }
        S::Argument => rules.push((S::YinElement, opt())),
        S::Identity => {
            rules.push((S::Base, if v11 { many() } else { opt() }));
            rules.push((S::Status, opt()));
            rules.extend(DOC);
            if v11 {
                rules.push((S::IfFeature, many()));
            }
        }
        S::Feature => {
            rules.extend([(S::IfFeature, many()), (S::Status, opt())]);
            rules.extend(DOC);
        }
        S::Typedef => {
            rules.extend([(S::Default, opt()), (S::Status, opt()), (S::Type, one()), (S::Units, opt())]);
            rules.extend(DOC);
        }
        S::Type => rules.extend([
            (S::Base, if v11 { many() } else { opt() }),
            (S::Bit, many()),
            (S::Enum, many()),
            (S::FractionDigits, opt()),
            (S::Length, opt()),
            (S::Path, opt()),
            (S::Pattern, many()),
            (S::Range, opt()),
            (S::RequireInstance, opt()),
            (S::Type, many()),
        ]),
        S::Container | S::List => {
            data_defs(&mut rules, version);
            rules.extend([
                (S::Config, opt()),
                (S::Grouping, many()),
                (S::IfFeature, many()),
                (S::Must, many()),
                (S::Status, opt()),
                (S::Typedef, many()),
                (S::Uses, many()),
                (S::When, opt()),
            ]);
            rules.extend(DOC);
            if parent == S::Container {
                rules.push((S::Presence, opt()));
            } else {
                rules.extend([
                    (S::Key, opt()),
                    (S::MaxElements, opt()),
                    (S::MinElements, opt()),
                    (S::OrderedBy, opt()),
                    (S::Unique, many()),
                ]);
            }
            if v11 {
                rules.extend([(S::Action, many()), (S::Notification, many())]);
            }
        }
        S::Must | S::Range | S::Length => {
            rules.extend([(S::ErrorAppTag, opt()), (S::ErrorMessage, opt())]);
            rules.extend(DOC);
        }
        S::Pattern => {
            rules.extend([(S::ErrorAppTag, opt()), (S::ErrorMessage, opt())]);
            rules.extend(DOC);
            if v11 {
                rules.push((S::Modifier, opt()));
            }
        }
        S::Leaf | S::LeafList => {
            rules.extend([
                (S::Config, opt()),
                (S::IfFeature, many()),
                (S::Must, many()),
                (S::Status, opt()),
                (S::Type, one()),
                (S::Units, opt()),
                (S::When, opt()),
            ]);
            rules.extend(DOC);
            if parent == S::Leaf {
                rules.extend([(S::Default, opt()), (S::Mandatory, opt())]);
            } else {
                rules.extend([
                    (S::Default, if v11 { many() } else { Cardinality { min: 0, max: 0 } }),
                    (S::MaxElements, opt()),
                    (S::MinElements, opt()),
                    (S::OrderedBy, opt()),
                ]);
            }
        }
        S::Choice => {
            rules.extend([
                (S::Anyxml, many()),
                (S::Case, many()),
                (S::Config, opt()),
                (S::Container, many()),
                (S::Default, opt()),
                (S::IfFeature, many()),
                (S::Leaf, many()),
                (S::LeafList, many()),
                (S::List, many()),
                (S::Mandatory, opt()),
                (S::Status, opt()),
                (S::When, opt()),
            ]);
            rules.extend(DOC);
            if v11 {
                rules.extend([(S::Anydata, many()), (S::Choice, many())]);
            }
        }
        S::Case => {
            data_defs(&mut rules, version);
            rules.extend([(S::IfFeature, many()), (S::Status, opt()), (S::Uses, many()), (S::When, opt())]);
            rules.extend(DOC);
        }
        S::Anydata | S::Anyxml => {
            rules.extend([
                (S::Config, opt()),
                (S::IfFeature, many()),
                (S::Mandatory, opt()),
                (S::Must, many()),
                (S::Status, opt()),
                (S::When, opt()),
            ]);
            rules.extend(DOC);
        }
        S::Grouping => {
            data_defs(&mut rules, version);
            rules.extend([(S::Grouping, many()), (S::Status, opt()), (S::Typedef, many()), (S::Uses, many())]);
            rules.extend(DOC);
            if v11 {
                rules.extend([(S::Action, many()), (S::Notification, many())]);
            }
        }
        S::Uses => {
            rules.extend([
                (S::Augment, many()),
                (S::IfFeature, many()),
                (S::Refine, many()),
                (S::Status, opt()),
                (S::When, opt()),
            ]);
            rules.extend(DOC);
        }
        S::Refine => {
            rules.extend([
                (S::Config, opt()),
                (S::Default, if v11 { many() } else { opt() }),
                (S::Mandatory, opt()),
                (S::MaxElements, opt()),
                (S::MinElements, opt()),
                (S::Must, many()),
                (S::Presence, opt()),
            ]);
            rules.extend(DOC);
            if v11 {
                rules.push((S::IfFeature, many()));
            }
        }
        S::Augment => {
            data_defs(&mut rules, version);
            rules.extend([
                (S::Case, many()),
                (S::IfFeature, many()),
                (S::Status, opt()),
                (S::Uses, many()),
                (S::When, opt()),
            ]);
            rules.extend(DOC);
            if v11 {
                rules.extend([(S::Action, many()), (S::Notification, many())]);
            }
        }
        S::Rpc | S::Action => {
            rules.extend([
                (S::Grouping, many()),
                (S::IfFeature, many()),
                (S::Input, opt()),
                (S::Output, opt()),
                (S::Status, opt()),
                (S::Typedef, many()),
            ]);
            rules.extend(DOC);
        }
        S::Input | S::Output => {
            data_defs(&mut rules, version);
            rules.extend([(S::Grouping, many()), (S::Typedef, many()), (S::Uses, many())]);
            if v11 {
                rules.push((S::Must, many()));
            }
        }
        S::Notification => {
            data_defs(&mut rules, version);
            rules.extend([
                (S::Grouping, many()),
                (S::IfFeature, many()),
                (S::Status, opt()),
                (S::Typedef, many()),
                (S::Uses, many()),
            ]);
            rules.extend(DOC);
            if v11 {
                rules.push((S::Must, many()));
            }
        }
        S::Deviation => {
            rules.push((S::Deviate, some()));
            rules.extend(DOC);
        }
        S::Deviate => {
            let default = if v11 { many() } else { opt() };
            match argument {
                Some("add") => rules.extend([
                    (S::Config, opt()),
                    (S::Default, default),
                    (S::Mandatory, opt()),
                    (S::MaxElements, opt()),
                    (S::MinElements, opt()),
                    (S::Must, many()),
                    (S::Unique, many()),
                    (S::Units, opt()),
                ]),
                Some("replace") => rules.extend([
                    (S::Config, opt()),
                    (S::Default, default),
                    (S::Mandatory, opt()),
                    (S::MaxElements, opt()),
                    (S::MinElements, opt()),
                    (S::Type, opt()),
                    (S::Units, opt()),
                ]),
                Some("delete") => rules.extend([
                    (S::Default, default),
                    (S::Must, many()),
                    (S::Unique, many()),
                    (S::Units, opt()),
                ]),
                _ => {}
            }
        }
        S::Enum => {
            rules.extend([(S::Status, opt()), (S::Value, opt())]);
            rules.extend(DOC);
            if v11 {
                rules.push((S::IfFeature, many()));
            }
        }
        S::Bit => {
            rules.extend([(S::Position, opt()), (S::Status, opt())]);
            rules.extend(DOC);
            if v11 {
                rules.push((S::IfFeature, many()));
            }
        }
        _ => {}
    }
    rules.retain(|(_, card)| card.max > 0);
    rules
}

/// Validate the core substatements of one statement.
///
/// `children` lists the core keyword of each substatement with its location;
/// extension statements are never restricted and must not be passed in.
pub fn validate_substatements(
    parent: YangStmt,
    parent_argument: Option<&str>,
    version: YangVersion,
    module: &str,
    children: &[(YangStmt, SourceRef)],
    location: &SourceRef,
) -> Result<()> {
    let rules = substatement_rules(parent, version, parent_argument);
    let allowed: HashMap<YangStmt, Cardinality> = rules.iter().copied().collect();

    let mut counts: HashMap<YangStmt, u32> = HashMap::new();
    for (child, at) in children {
        if !allowed.contains_key(child) {
            let other = match version {
                YangVersion::V1_0 => YangVersion::V1_1,
                YangVersion::V1_1 => YangVersion::V1_0,
            };
            let legal_elsewhere = substatement_rules(parent, other, parent_argument)
                .iter()
                .any(|(s, _)| s == child);
            let message = if legal_elsewhere {
                format!("{} statement does not allow {} substatements", parent.keyword(), child.keyword())
            } else {
                format!(
                    "{} is not valid for {}. Error in module {}",
                    child.const_name(),
                    parent.const_name(),
                    module
                )
            };
            return Err(YangError::substatement(message, at.clone()));
        }
        *counts.entry(*child).or_default() += 1;
    }

    for (stmt, card) in &rules {
        let count = counts.get(stmt).copied().unwrap_or(0);
        if count < card.min {
            return Err(YangError::substatement(
                format!(
                    "Minimal count of {} for {} is {}, detected {}.",
                    stmt.const_name(),
                    parent.const_name(),
                    card.min,
                    count
                ),
                location.clone(),
            ));
        }
        if count > card.max {
            return Err(YangError::substatement(
                format!(
                    "Maximal count of {} for {} is {}, detected {}.",
                    stmt.const_name(),
                    parent.const_name(),
                    card.max,
                    count
                ),
                location.clone(),
            ));
        }
    }
    Ok(())
}
