//! Reactor Tests
//!
//! End-to-end builds from YANG text to the effective model.

use std::path::Path;

use yang_compiler::config::ReactorConfig;
use yang_compiler::model::statement::{Argument, StatementKind, StatementOrigin};
use yang_compiler::model::types::BuiltinType;
use yang_compiler::{
    loader, CompilerConfig, EffectiveModel, QName, QNameModule, Reactor, Revision, YangError, YangStmt,
    YangTextSource,
};

fn fixtures_path() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").leak()
}

fn build_with(config: &CompilerConfig, texts: &[&str]) -> yang_compiler::Result<EffectiveModel> {
    let mut reactor = Reactor::new(config);
    for (i, text) in texts.iter().enumerate() {
        reactor.add_source(YangTextSource::new(format!("test{}.yang", i), *text));
    }
    reactor.build()
}

fn build(texts: &[&str]) -> yang_compiler::Result<EffectiveModel> {
    build_with(&CompilerConfig::default(), texts)
}

fn build_err(texts: &[&str]) -> String {
    build(texts).unwrap_err().to_string()
}

fn topo() -> EffectiveModel {
    let sources = loader::load_from_directory(fixtures_path(), &Default::default()).unwrap();
    Reactor::new(&CompilerConfig::default()).add_sources(sources).build().unwrap()
}

fn q(ns: &str, revision: Option<&str>, local: &str) -> QName {
    QName::new(QNameModule::new(ns, revision.map(|r| Revision::parse(r).unwrap())), local)
}

fn topo_q(local: &str) -> QName {
    q("urn:example:topo", Some("2024-03-01"), local)
}

// =============================================================================
// Fixture build
// =============================================================================

#[test]
fn test_fixture_directory_compiles() {
    let model = topo();
    assert_eq!(model.modules().len(), 2);

    let module = model.find_module("topo", None).unwrap();
    assert_eq!(module.prefix, "t");
    assert_eq!(module.submodules.len(), 1);
    assert_eq!(module.submodules[0].name, "topo-types");
    assert!(module.typedefs().any(|t| t.qname() == Some(&topo_q("node-name"))));
    assert!(!model.bundle_hash().as_str().is_empty());
}

#[test]
fn test_typedef_chain_and_restrictions() {
    let model = topo();
    let name = model
        .find_data_tree_child(&[topo_q("nodes"), topo_q("node"), topo_q("name")])
        .unwrap();
    let def = name.type_definition().unwrap();
    assert_eq!(def.base, BuiltinType::String);
    assert_eq!(def.derived_from, vec![topo_q("node-name")]);
    assert_eq!(def.length.as_ref().unwrap().to_string(), "1..64");
    assert_eq!(def.patterns.len(), 1);

    let port = model
        .find_data_tree_child(&[topo_q("links"), topo_q("link"), topo_q("source"), topo_q("port")])
        .unwrap();
    let def = port.type_definition().unwrap();
    assert_eq!(def.base, BuiltinType::Uint16);
    assert_eq!(def.range.as_ref().unwrap().to_string(), "1..4096");
}

#[test]
fn test_leafref_target_is_recorded() {
    let model = topo();
    let node_ref = model
        .find_data_tree_child(&[topo_q("links"), topo_q("link"), topo_q("destination"), topo_q("node-ref")])
        .unwrap();
    let def = node_ref.type_definition().unwrap();
    assert_eq!(def.base, BuiltinType::Leafref);
    assert_eq!(def.leafref_target, Some(vec![topo_q("nodes"), topo_q("node"), topo_q("name")]));
}

#[test]
fn test_choice_shorthand_gets_implicit_case() {
    let model = topo();
    let link = [topo_q("links"), topo_q("link")];
    let case = model
        .find_schema_tree_child(&[link[0].clone(), link[1].clone(), topo_q("medium"), topo_q("fiber")])
        .unwrap();
    assert!(case.is(YangStmt::Case));
    assert_eq!(case.origin, StatementOrigin::Implicit);
    let fiber = model.find_data_tree_child(&[link[0].clone(), link[1].clone(), topo_q("fiber")]).unwrap();
    assert!(fiber.is(YangStmt::Leaf));
    assert_eq!(fiber.path.len(), 5);
}

#[test]
fn test_cross_module_augment_is_merged() {
    let model = topo();
    let latency = model
        .find_data_tree_child(&[
            topo_q("links"),
            topo_q("link"),
            q("urn:example:topo-ext", None, "latency"),
        ])
        .unwrap();
    assert_eq!(latency.origin, StatementOrigin::AddedByAugment);
    let def = latency.type_definition().unwrap();
    assert_eq!(def.fraction_digits, Some(3));
}

#[test]
fn test_identities_and_runtime_types() {
    let model = topo();
    let derived = model.derived_identities(&topo_q("link-kind"));
    assert_eq!(derived, vec![topo_q("ethernet"), topo_q("gigabit")]);

    let runtime = model.runtime_types();
    assert!(runtime.is_grouping_used(&[topo_q("endpoint")]));
    assert_eq!(runtime.unused_groupings, vec![vec![topo_q("unused-stats")]]);
    assert!(runtime.is_typedef_used(&[topo_q("port-number")]));
    assert!(runtime.is_typedef_used(&[topo_q("node-name")]));
    assert!(runtime.schema_nodes.contains(&vec![topo_q("links"), topo_q("link"), topo_q("id")]));
}

#[test]
fn test_build_is_idempotent() {
    assert_eq!(topo(), topo());
}

// =============================================================================
// Version-dependent substatements
// =============================================================================

const NOTIFICATION_MUST: &str = r#"
    notification alarm {
      must "severity > 2";
      leaf severity { type uint8; }
    }
"#;

#[test]
fn test_must_under_notification_needs_yang_1_1() {
    let v11 = format!("module n {{ yang-version 1.1; namespace urn:n; prefix n; {} }}", NOTIFICATION_MUST);
    let model = build(&[&v11]).unwrap();
    let alarm = model.find_schema_tree_child(&[q("urn:n", None, "alarm")]).unwrap();
    assert!(matches!(alarm.find_first(YangStmt::Must).unwrap().argument, Argument::XPath(_)));

    let v10 = format!("module n {{ namespace urn:n; prefix n; {} }}", NOTIFICATION_MUST);
    let err = build(&[&v10]).unwrap_err();
    assert!(matches!(err, YangError::InvalidSubstatement { .. }));
    assert!(err.to_string().starts_with("notification statement does not allow must substatements"));
}

#[test]
fn test_must_under_input_needs_yang_1_1() {
    let text = r#"module r {
      namespace urn:r;
      prefix r;
      rpc reset {
        input {
          must "force";
          leaf force { type boolean; }
        }
      }
    }"#;
    assert!(build_err(&[text]).starts_with("input statement does not allow must substatements"));
}

#[test]
fn test_unknown_substatement() {
    let text = "module u { namespace urn:u; prefix u; container c { key x; } }";
    assert!(build_err(&[text]).starts_with("KEY is not valid for CONTAINER. Error in module u"));
}

// =============================================================================
// Leafref loops
// =============================================================================

fn lrr(path: &str) -> String {
    format!(
        r#"module lrr {{
          namespace "urn:xml:ns:yang:lrr";
          prefix lrr;
          revision 2015-02-25;
          container neighbors {{
            list neighbor {{
              key "neighbor-id";
              leaf neighbor-id {{
                type leafref {{
                  path "{}";
                }}
              }}
            }}
          }}
        }}"#,
        path
    )
}

#[test]
fn test_relative_self_referencing_leafref() {
    let err = build(&[&lrr("../neighbor-id")]).unwrap_err();
    assert!(matches!(err, YangError::Source { .. }));
    assert!(err.to_string().contains("(urn:xml:ns:yang:lrr?revision=2015-02-25)neighbor-id"));
}

#[test]
fn test_absolute_self_referencing_leafref() {
    let err = build_err(&[&lrr("/lrr:neighbors/lrr:neighbor/lrr:neighbor-id")]);
    assert!(err.contains("Leafref (urn:xml:ns:yang:lrr?revision=2015-02-25)neighbor-id resolution loops back onto itself"));
}

#[test]
fn test_transitive_leafref_loop() {
    let text = r#"module loop {
      namespace urn:loop;
      prefix l;
      container c {
        leaf a { type leafref { path "../b"; } }
        leaf b { type leafref { path "../a"; } }
      }
    }"#;
    assert!(build_err(&[text]).contains("(urn:loop)a resolution loops back onto itself via ../b"));
}

#[test]
fn test_unresolvable_leafref() {
    let text = r#"module bad {
      namespace urn:bad;
      prefix b;
      leaf a { type leafref { path "/b:missing"; } }
    }"#;
    assert!(build_err(&[text]).contains("path '/b:missing' cannot be resolved"));
}

// =============================================================================
// Groupings, refine, augment
// =============================================================================

#[test]
fn test_grouping_used_twice_yields_independent_copies() {
    let text = r#"module g {
      namespace urn:g;
      prefix g;
      grouping address {
        leaf ip { type string; }
        leaf port { type uint16; }
      }
      container primary { uses address; }
      container backup { uses address; }
    }"#;
    let model = build(&[text]).unwrap();
    let ns = |l: &str| q("urn:g", None, l);
    let first = model.find_schema_tree_child(&[ns("primary"), ns("ip")]).unwrap();
    let second = model.find_schema_tree_child(&[ns("backup"), ns("ip")]).unwrap();

    assert_eq!(first.kind, second.kind);
    assert_eq!(first.argument, second.argument);
    assert_eq!(first.substatements, second.substatements);
    assert_eq!(first.origin, StatementOrigin::AddedByUses);
    assert_ne!(first.path, second.path);
    assert_eq!(first.path, vec![ns("primary"), ns("ip")]);

    let uses = model.find_schema_tree_child(&[ns("primary")]).unwrap().find_first(YangStmt::Uses).unwrap();
    assert_eq!(uses.qname(), Some(&ns("address")));
}

#[test]
fn test_refine_and_uses_augment() {
    let text = r#"module rf {
      namespace urn:rf;
      prefix rf;
      grouping g {
        leaf name { type string; }
        container inner;
      }
      container top {
        uses g {
          refine name {
            mandatory true;
            description "Refined.";
          }
          augment "inner" {
            leaf added { type string; }
          }
        }
      }
    }"#;
    let model = build(&[text]).unwrap();
    let ns = |l: &str| q("urn:rf", None, l);
    let name = model.find_schema_tree_child(&[ns("top"), ns("name")]).unwrap();
    assert!(name.is_mandatory());
    assert!(name.find_first(YangStmt::Description).is_some());
    let added = model.find_schema_tree_child(&[ns("top"), ns("inner"), ns("added")]).unwrap();
    assert_eq!(added.origin, StatementOrigin::AddedByAugment);
}

#[test]
fn test_missing_refine_target() {
    let text = r#"module rf {
      namespace urn:rf;
      prefix rf;
      grouping g { leaf name { type string; } }
      container top { uses g { refine nope { mandatory true; } } }
    }"#;
    assert!(build_err(&[text]).starts_with("Refine target 'nope' was not found"));
}

#[test]
fn test_unresolved_grouping_fails_to_converge() {
    let text = "module m { namespace urn:m; prefix m; container c { uses missing; } }";
    let err = build(&[text]).unwrap_err();
    assert!(matches!(err, YangError::Inference { .. }));
    assert!(err.to_string().starts_with("Failed to resolve 1 statement(s): Grouping 'missing' was not found"));
}

#[test]
fn test_groupings_declared_out_of_order() {
    let text = r#"module o {
      namespace urn:o;
      prefix o;
      container c { uses outer; }
      grouping outer { uses inner; }
      grouping inner { leaf x { type string; } }
    }"#;
    let model = build(&[text]).unwrap();
    assert!(model.find_schema_tree_child(&[q("urn:o", None, "c"), q("urn:o", None, "x")]).is_some());
}

const BASE_MODULE: &str = r#"module a {
  namespace urn:a;
  prefix a;
  container top;
}"#;

fn augmenting(version: &str, body: &str) -> String {
    format!(
        r#"module b {{
          {}
          namespace urn:b;
          prefix b;
          import a {{ prefix a; }}
          augment "/a:top" {{
            {}
            leaf m {{ type string; mandatory true; }}
          }}
        }}"#,
        version, body
    )
}

#[test]
fn test_cross_module_mandatory_augment() {
    let expected = "An augment cannot add node 'm' because it is mandatory and in module different than target";
    assert!(build_err(&[BASE_MODULE, &augmenting("", "")]).starts_with(expected));
    assert!(build_err(&[BASE_MODULE, &augmenting("yang-version 1.1;", "")]).starts_with(expected));
    assert!(build(&[BASE_MODULE, &augmenting("yang-version 1.1;", "when \"../a:enabled\";")]).is_ok());
}

#[test]
fn test_same_module_mandatory_augment() {
    let text = r#"module c {
      namespace urn:c;
      prefix c;
      container top;
      augment "/c:top" {
        leaf m { type string; mandatory true; }
      }
    }"#;
    let model = build(&[text]).unwrap();
    let m = model.find_schema_tree_child(&[q("urn:c", None, "top"), q("urn:c", None, "m")]).unwrap();
    assert!(m.is_mandatory());
}

#[test]
fn test_augment_name_clash() {
    let text = r#"module c {
      namespace urn:c;
      prefix c;
      container top { leaf x { type string; } }
      augment "/c:top" { leaf x { type string; } }
    }"#;
    assert!(build_err(&[text]).starts_with("An augment cannot add node named 'x' because this name is already used in target"));
}

// =============================================================================
// Deviations and features
// =============================================================================

#[test]
fn test_deviations() {
    let text = r#"module d {
      namespace urn:d;
      prefix d;
      container c {
        leaf x { type string; }
        leaf y { type string; }
      }
      deviation "/c/y" { deviate not-supported; }
      deviation "/c/x" {
        deviate replace { type uint8; }
        deviate add { units "s"; }
      }
    }"#;
    let model = build(&[text]).unwrap();
    let ns = |l: &str| q("urn:d", None, l);
    assert!(model.find_schema_tree_child(&[ns("c"), ns("y")]).is_none());
    let x = model.find_schema_tree_child(&[ns("c"), ns("x")]).unwrap();
    assert_eq!(x.type_definition().unwrap().base, BuiltinType::Uint8);
    assert_eq!(x.find_first(YangStmt::Units).unwrap().string_argument(), Some("s"));
}

#[test]
fn test_invalid_deviation() {
    let text = r#"module d {
      namespace urn:d;
      prefix d;
      leaf x { type string; }
      deviation "/x" { deviate replace { units "s"; } }
    }"#;
    assert!(build_err(&[text]).starts_with("Deviation cannot replace property 'units' because it does not exist in target"));
}

const FEATURES: &str = r#"module f {
  namespace urn:f;
  prefix f;
  feature fast;
  feature slow;
  container c {
    leaf a { if-feature fast; type string; }
    leaf b { if-feature slow; type string; }
  }
}"#;

#[test]
fn test_feature_pruning() {
    let ns = |l: &str| q("urn:f", None, l);
    let all = build(&[FEATURES]).unwrap();
    assert!(all.find_schema_tree_child(&[ns("c"), ns("b")]).is_some());

    let config = CompilerConfig {
        reactor: ReactorConfig { supported_features: Some(vec!["f:fast".into()]), ..Default::default() },
        ..Default::default()
    };
    let pruned = build_with(&config, &[FEATURES]).unwrap();
    assert!(pruned.find_schema_tree_child(&[ns("c"), ns("a")]).is_some());
    assert!(pruned.find_schema_tree_child(&[ns("c"), ns("b")]).is_none());
}

#[test]
fn test_if_feature_expression_needs_yang_1_1() {
    let text = FEATURES.replace("if-feature fast;", "if-feature \"fast or slow\";");
    let config = CompilerConfig {
        reactor: ReactorConfig { supported_features: Some(vec![]), ..Default::default() },
        ..Default::default()
    };
    let err = build_with(&config, &[&text]).unwrap_err().to_string();
    assert!(err.starts_with("if-feature 'fast or slow' must name a single feature in YANG 1.0"));
}

// =============================================================================
// Module graph and sources
// =============================================================================

#[test]
fn test_missing_import() {
    let text = "module b { namespace urn:b; prefix b; import nope { prefix n; } }";
    let err = build(&[text]).unwrap_err();
    assert!(matches!(err, YangError::MissingSource { .. }));
    assert!(err.to_string().starts_with("Imported module [nope] was not found."));
}

#[test]
fn test_circular_imports() {
    let a = "module a { namespace urn:a; prefix a; import b { prefix b; } }";
    let b = "module b { namespace urn:b; prefix b; import a { prefix a; } }";
    assert!(build_err(&[a, b]).starts_with("Found circular dependency between modules"));
}

#[test]
fn test_duplicate_source() {
    assert!(matches!(build(&[BASE_MODULE, BASE_MODULE]).unwrap_err(), YangError::DuplicateSource(_)));
}

#[test]
fn test_unbound_prefix() {
    let text = "module p { namespace urn:p; prefix p; leaf x { type q:thing; } }";
    assert!(build_err(&[text]).starts_with("Prefix q is not bound"));
}

#[test]
fn test_import_prefix_clashes_with_own_prefix() {
    let a = "module a { namespace urn:a; prefix a; container c { leaf z { type string; } } }";
    let b = r#"
module b {
  namespace urn:b;
  prefix b;
  import a { prefix b; }
  leaf r { type leafref { path "/b:c/b:z"; } }
}
"#;
    let err = build(&[a, b]).unwrap_err();
    assert!(matches!(err, YangError::Source { .. }));
    assert!(err.to_string().starts_with("Prefix b is bound more than once in b"), "{}", err);
}

// =============================================================================
// Types, identities, keys, extensions
// =============================================================================

#[test]
fn test_enumeration_values() {
    let text = r#"module e {
      namespace urn:e;
      prefix e;
      leaf color {
        type enumeration {
          enum red;
          enum green { value 10; }
          enum blue;
        }
      }
    }"#;
    let model = build(&[text]).unwrap();
    let color = model.find_schema_tree_child(&[q("urn:e", None, "color")]).unwrap();
    let enums = &color.type_definition().unwrap().enums;
    assert_eq!(enums, &vec![("red".to_string(), 0), ("green".to_string(), 10), ("blue".to_string(), 11)]);
}

#[test]
fn test_restricted_enumeration_needs_yang_1_1() {
    let text = r#"module e {
      namespace urn:e;
      prefix e;
      typedef color { type enumeration { enum red; enum green; } }
      leaf c { type color { enum red; } }
    }"#;
    assert!(build_err(&[text]).starts_with("Restricted enumeration type is allowed only in YANG 1.1 version."));
}

#[test]
fn test_decimal64_requires_fraction_digits() {
    let text = "module d { namespace urn:d; prefix d; leaf x { type decimal64; } }";
    assert!(build_err(&[text]).starts_with("fraction-digits is required for decimal64"));
}

#[test]
fn test_range_must_narrow_base_type() {
    let text = "module d { namespace urn:d; prefix d; leaf x { type uint8 { range \"1..300\"; } } }";
    assert!(build_err(&[text]).starts_with("Invalid range constraint '1..300'"));
}

#[test]
fn test_identity_cycle() {
    let text = r#"module i {
      namespace urn:i;
      prefix i;
      identity x { base y; }
      identity y { base x; }
    }"#;
    assert!(build_err(&[text]).contains("is derived from itself"));
}

#[test]
fn test_list_keys() {
    let missing = "module k { namespace urn:k; prefix k; list l { leaf a { type string; } } }";
    assert!(build_err(&[missing]).starts_with("Missing key in LIST (urn:k)l"));

    let wrong = "module k { namespace urn:k; prefix k; list l { key b; leaf a { type string; } } }";
    assert!(build_err(&[wrong]).starts_with("Key 'b' of list (urn:k)l is not a leaf of the list"));

    let state = "module k { namespace urn:k; prefix k; list l { config false; leaf a { type string; } } }";
    assert!(build(&[state]).is_ok());
}

#[test]
fn test_extension_statements() {
    let text = r#"module x {
      namespace urn:x;
      prefix x;
      extension annotation { argument name; }
      container c { x:annotation "tagged"; }
    }"#;
    let model = build(&[text]).unwrap();
    let c = model.find_schema_tree_child(&[q("urn:x", None, "c")]).unwrap();
    let ext = &c.substatements[0];
    assert_eq!(ext.kind, StatementKind::Extension(q("urn:x", None, "annotation")));
    assert_eq!(ext.string_argument(), Some("tagged"));

    let undefined = text.replace("x:annotation", "x:missing");
    assert!(build_err(&[&undefined]).starts_with("Extension x:missing is not defined in module x"));
}
