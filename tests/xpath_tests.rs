//! XPath Tests
//!
//! Expression parsing through the public API and through compiled models.

use rust_decimal::Decimal;
use yang_compiler::model::statement::Argument;
use yang_compiler::xpath::{
    ast::FunctionName, Expr, InstanceIdentifierParser, NodeTest, PathArgument, QNameRef, XPathNumber, YangFunction,
};
use yang_compiler::{
    CompilerConfig, EffectiveModel, MathMode, QName, QNameModule, QNameStrategy, Reactor, YangError, YangStmt,
    YangTextSource, YangVersion, XPathParser,
};

fn parse(text: &str) -> yang_compiler::xpath::ParsedXPath {
    XPathParser::default().parse(text).unwrap()
}

fn build(config: &CompilerConfig, text: &str) -> EffectiveModel {
    Reactor::new(config).add_source(YangTextSource::new("acl.yang", text)).build().unwrap()
}

const ACL: &str = r#"
module acl {
  yang-version 1.1;
  namespace "urn:example:acl";
  prefix acl;

  container acls {
    must "count(acl) <= 10 * 2";
    list acl {
      key name;
      leaf name { type string; }
      leaf priority {
        type uint8;
        must ". >= 1 + 1";
      }
    }
  }
}
"#;

// =============================================================================
// Standalone parsing
// =============================================================================

#[test]
fn test_constant_folding() {
    assert_eq!(parse("1 + 2").expr, Expr::Number(XPathNumber::Double(3.0)));
    assert_eq!(parse("\"a\" = \"a\"").expr, Expr::Boolean(true));
    assert_eq!(parse("10 div 4").expr, Expr::Number(XPathNumber::Double(2.5)));
    assert_eq!(parse("3 > 2").expr, Expr::Boolean(true));
}

#[test]
fn test_exact_math_mode() {
    let parser = XPathParser::new(MathMode::Exact, QNameStrategy::Unresolved);
    let parsed = parser.parse("0.1 + 0.2").unwrap();
    assert_eq!(parsed.expr, Expr::Number(XPathNumber::Decimal(Decimal::new(3, 1))));
}

#[test]
fn test_paths_are_not_folded() {
    let parsed = parse("../name = 'eth0'");
    assert!(!parsed.expr.is_constant());
    assert_eq!(parsed.original, "../name = 'eth0'");
}

#[test]
fn test_function_errors() {
    let err = XPathParser::default().parse("frob(1)").unwrap_err();
    assert_eq!(err.message, "Unknown default function frob");

    let err = XPathParser::default().parse("contains('a')").unwrap_err();
    assert_eq!(err.message, "contains(string, string) takes two arguments");
}

#[test]
fn test_yang_functions_raise_version() {
    let parsed = parse("derived-from-or-self(type, 'ianaift:ethernetCsmacd')");
    assert_eq!(parsed.min_version, YangVersion::V1_1);
    assert!(matches!(
        parsed.expr,
        Expr::Function { name: FunctionName::Yang(YangFunction::DerivedFromOrSelf), .. }
    ));
    assert_eq!(parse("current()").min_version, YangVersion::V1_0);
}

#[test]
fn test_qualified_strategy_resolves_prefixes() {
    let module = QNameModule::new("urn:example:if", None);
    let strategy = QNameStrategy::Qualified { prefixes: [("if".to_string(), module.clone())].into() };
    let parser = XPathParser::new(MathMode::Ieee754, strategy);

    let parsed = parser.parse("/if:interfaces/if:interface").unwrap();
    let path = parsed.expr.as_location().unwrap();
    assert!(path.absolute);
    assert_eq!(path.steps[1].test, NodeTest::Name(QNameRef::Resolved(QName::new(module, "interface"))));

    let err = parser.parse("/ip:address").unwrap_err();
    assert_eq!(err.message, "Prefix ip is not bound");
}

#[test]
fn test_instance_identifier() {
    let module = QNameModule::new("urn:example:sys", None);
    let strategy = QNameStrategy::Qualified { prefixes: [("sys".to_string(), module.clone())].into() };
    let id = InstanceIdentifierParser::new(strategy)
        .parse("/sys:system/sys:user[sys:name='admin']")
        .unwrap();

    assert_eq!(id.path.len(), 2);
    assert_eq!(id.path[0].node(), &QNameRef::Resolved(QName::new(module.clone(), "system")));
    match &id.path[1] {
        PathArgument::NodeWithKeys { keys, .. } => {
            assert_eq!(keys[0], (QNameRef::Resolved(QName::new(module, "name")), "admin".to_string()));
        }
        other => panic!("unexpected path argument {:?}", other),
    }
}

// =============================================================================
// Expressions in compiled models
// =============================================================================

#[test]
fn test_must_is_stored_folded() {
    let model = build(&CompilerConfig::default(), ACL);
    let module = model.find_module("acl", None).unwrap();
    let ns = module.namespace.clone();

    let priority = model
        .find_schema_tree_child(&[
            QName::new(ns.clone(), "acls"),
            QName::new(ns.clone(), "acl"),
            QName::new(ns.clone(), "priority"),
        ])
        .unwrap();
    let must = priority.find_first(YangStmt::Must).unwrap();
    let Argument::XPath(parsed) = &must.argument else {
        panic!("must argument is not an expression: {:?}", must.argument);
    };
    assert_eq!(parsed.original, ". >= 1 + 1");
    match &parsed.expr {
        Expr::Binary { right, .. } => assert_eq!(**right, Expr::Number(XPathNumber::Double(2.0))),
        other => panic!("unexpected expression {:?}", other),
    }
}

#[test]
fn test_model_math_mode_follows_config() {
    let mut config = CompilerConfig::default();
    config.xpath.math_mode = MathMode::Exact;
    let model = build(&config, ACL);
    assert_eq!(model.math_mode(), MathMode::Exact);

    let parsed = model.parse_expression("acl", "2 * 3").unwrap();
    assert_eq!(parsed.expr, Expr::Number(XPathNumber::Decimal(Decimal::from(6))));
}

#[test]
fn test_parse_expression_binds_module_namespace() {
    let model = build(&CompilerConfig::default(), ACL);
    let ns = model.find_module("acl", None).unwrap().namespace.clone();

    let parsed = model.parse_expression("acl", "acls/acl").unwrap();
    let path = parsed.expr.as_location().unwrap();
    assert_eq!(path.steps[0].test, NodeTest::Name(QNameRef::Resolved(QName::new(ns.clone(), "acls"))));

    let parsed = model.parse_expression("acl", "/acl:acls").unwrap();
    let path = parsed.expr.as_location().unwrap();
    assert_eq!(path.steps[0].test, NodeTest::Name(QNameRef::Resolved(QName::new(ns, "acls"))));
}

#[test]
fn test_parse_expression_unknown_module() {
    let model = build(&CompilerConfig::default(), ACL);
    let err = model.parse_expression("nope", "a").unwrap_err();
    assert!(matches!(err, YangError::IllegalArgument(_)));
}

#[test]
fn test_invalid_must_fails_build() {
    let text = r#"
module bad {
  namespace "urn:example:bad";
  prefix b;
  leaf x { type string; must "frob(.)"; }
}
"#;
    let err = Reactor::new(&CompilerConfig::default())
        .add_source(YangTextSource::new("bad.yang", text))
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("Unknown default function frob"), "{}", err);
}
