//! Recursive-descent XPath parser with eager constant folding
//!
//! Precedence, lowest first: `or`, `and`, equality, relational, additive,
//! multiplicative, unary minus, union, path, filter, primary. `or`, `and`
//! and `|` chains become a single [`Expr::Nary`] node; other operators are
//! left-associated [`Expr::Binary`] nodes.

use super::ast::{Axis, BinaryOp, Expr, FunctionName, LocationPath, NaryOp, NodeTest, QNameRef, Step};
use super::functions::YangFunction;
use super::lexer::{tokenize, Tok};
use super::math::MathMode;
use super::{XPathError, XPathResult};
use crate::model::qname::QNameModule;
use crate::version::YangVersion;
use std::collections::HashMap;

/// How prefixed and unprefixed names are bound to namespaces
#[derive(Debug, Clone, Default)]
pub enum QNameStrategy {
    /// Keep names exactly as written
    #[default]
    Unresolved,
    /// Resolve prefixed names; unprefixed names stay unresolved
    Qualified { prefixes: HashMap<String, QNameModule> },
    /// Resolve prefixed names; unprefixed names bind to `default`
    Unqualified { default: QNameModule, prefixes: HashMap<String, QNameModule> },
}

impl QNameStrategy {
    pub fn resolve(&self, prefix: Option<&str>, local_name: &str) -> XPathResult<QNameRef> {
        let unresolved = || QNameRef::Unresolved {
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
        };
        let (prefixes, default) = match self {
            Self::Unresolved => return Ok(unresolved()),
            Self::Qualified { prefixes } => (prefixes, None),
            Self::Unqualified { default, prefixes } => (prefixes, Some(default)),
        };
        let module = match prefix {
            Some(p) => prefixes
                .get(p)
                .ok_or_else(|| XPathError::new(format!("Prefix {} is not bound", p)))?,
            None => match default {
                Some(module) => module,
                None => return Ok(unresolved()),
            },
        };
        Ok(QNameRef::Resolved(crate::model::qname::QName::new(module.clone(), local_name)))
    }
}

/// A parsed expression plus the minimum YANG version it requires
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedXPath {
    pub expr: Expr,
    pub min_version: YangVersion,
    pub original: String,
}

/// XPath parser configured with a math mode and name resolution strategy
#[derive(Debug, Clone, Default)]
pub struct XPathParser {
    math: MathMode,
    strategy: QNameStrategy,
}

impl XPathParser {
    pub fn new(math: MathMode, strategy: QNameStrategy) -> Self {
        Self { math, strategy }
    }

    pub fn math(&self) -> MathMode {
        self.math
    }

    pub fn strategy(&self) -> &QNameStrategy {
        &self.strategy
    }

    pub fn parse(&self, input: &str) -> XPathResult<ParsedXPath> {
        let tokens = tokenize(input)?;
        let mut state = ParseState {
            parser: self,
            input,
            tokens,
            pos: 0,
            min_version: YangVersion::V1_0,
        };
        let expr = state.expr()?;
        if *state.peek() != Tok::Eof {
            return Err(state.unexpected());
        }
        Ok(ParsedXPath { expr, min_version: state.min_version, original: input.to_string() })
    }
}

struct ParseState<'a> {
    parser: &'a XPathParser,
    input: &'a str,
    tokens: Vec<Tok>,
    pos: usize,
    min_version: YangVersion,
}

impl<'a> ParseState<'a> {
    fn expr(&mut self) -> XPathResult<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> XPathResult<Expr> {
        let mut operands = vec![self.and_expr()?];
        while self.eat(&Tok::Or) {
            operands.push(self.and_expr()?);
        }
        Ok(fold_logical(NaryOp::Or, operands))
    }

    fn and_expr(&mut self) -> XPathResult<Expr> {
        let mut operands = vec![self.equality_expr()?];
        while self.eat(&Tok::And) {
            operands.push(self.equality_expr()?);
        }
        Ok(fold_logical(NaryOp::And, operands))
    }

    fn equality_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.relational_expr()?;
        loop {
            let op = match self.peek() {
                Tok::Eq => BinaryOp::Eq,
                Tok::Ne => BinaryOp::Ne,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.relational_expr()?;
            left = self.fold_binary(op, left, right);
        }
    }

    fn relational_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.additive_expr()?;
        loop {
            let op = match self.peek() {
                Tok::Lt => BinaryOp::Lt,
                Tok::Le => BinaryOp::Le,
                Tok::Gt => BinaryOp::Gt,
                Tok::Ge => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.additive_expr()?;
            left = self.fold_binary(op, left, right);
        }
    }

    fn additive_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Tok::Plus => BinaryOp::Plus,
                Tok::Minus => BinaryOp::Minus,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.multiplicative_expr()?;
            left = self.fold_binary(op, left, right);
        }
    }

    fn multiplicative_expr(&mut self) -> XPathResult<Expr> {
        let mut left = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Tok::Multiply => BinaryOp::Mul,
                Tok::Div => BinaryOp::Div,
                Tok::Mod => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary_expr()?;
            left = self.fold_binary(op, left, right);
        }
    }

    fn unary_expr(&mut self) -> XPathResult<Expr> {
        let mut negations = 0usize;
        while self.eat(&Tok::Minus) {
            negations += 1;
        }
        let expr = self.union_expr()?;
        if negations % 2 == 0 {
            return Ok(expr);
        }
        Ok(match expr {
            Expr::Number(n) => Expr::Number(self.parser.math.negate(n)),
            other => Expr::Negate(Box::new(other)),
        })
    }

    fn union_expr(&mut self) -> XPathResult<Expr> {
        let mut operands = vec![self.path_expr()?];
        while self.eat(&Tok::Pipe) {
            let next = self.path_expr()?;
            if !operands.contains(&next) {
                operands.push(next);
            }
        }
        Ok(if operands.len() == 1 {
            operands.remove(0)
        } else {
            Expr::Nary { op: NaryOp::Union, operands }
        })
    }

    fn path_expr(&mut self) -> XPathResult<Expr> {
        let starts_filter = match self.peek() {
            Tok::Dollar | Tok::LParen | Tok::Literal(_) | Tok::Number(_) => true,
            Tok::Name { prefix, local } => {
                self.peek_at(1) == &Tok::LParen && !(prefix.is_none() && is_node_type(local))
            }
            _ => false,
        };
        if !starts_filter {
            return Ok(Expr::Location(self.location_path()?));
        }

        let primary = self.primary_expr()?;
        let predicates = self.predicates()?;
        let filter = if predicates.is_empty() {
            primary
        } else {
            Expr::Filter { expr: Box::new(primary), predicates }
        };

        let mut steps = Vec::new();
        match self.peek() {
            Tok::Slash => {
                self.advance();
            }
            Tok::DoubleSlash => {
                self.advance();
                steps.push(descendant_or_self());
            }
            _ => return Ok(filter),
        }
        steps.extend(self.relative_steps()?);
        Ok(Expr::Path {
            filter: Box::new(filter),
            path: LocationPath { absolute: false, steps: drop_self_steps(steps, false) },
        })
    }

    fn location_path(&mut self) -> XPathResult<LocationPath> {
        let (absolute, mut steps) = match self.peek() {
            Tok::Slash => {
                self.advance();
                if !starts_step(self.peek()) {
                    return Ok(LocationPath { absolute: true, steps: Vec::new() });
                }
                (true, Vec::new())
            }
            Tok::DoubleSlash => {
                self.advance();
                (true, vec![descendant_or_self()])
            }
            _ => (false, Vec::new()),
        };
        steps.extend(self.relative_steps()?);
        Ok(LocationPath { absolute, steps: drop_self_steps(steps, absolute) })
    }

    fn relative_steps(&mut self) -> XPathResult<Vec<Step>> {
        let mut steps = vec![self.step()?];
        loop {
            match self.peek() {
                Tok::Slash => {
                    self.advance();
                }
                Tok::DoubleSlash => {
                    self.advance();
                    steps.push(descendant_or_self());
                }
                _ => return Ok(steps),
            }
            steps.push(self.step()?);
        }
    }

    fn step(&mut self) -> XPathResult<Step> {
        if self.eat(&Tok::Dot) {
            return Ok(Step::new(Axis::SelfAxis, NodeTest::Node));
        }
        if self.eat(&Tok::DotDot) {
            return Ok(Step::new(Axis::Parent, NodeTest::Node));
        }

        let mut axis = Axis::Child;
        if self.eat(&Tok::At) {
            axis = Axis::Attribute;
        } else if let (Tok::Name { prefix: None, local }, Tok::ColonColon) = (self.peek(), self.peek_at(1)) {
            axis = Axis::lookup(local).ok_or_else(|| self.error(format!("Unknown axis '{}'", local)))?;
            self.advance();
            self.advance();
        }

        let test = match self.advance() {
            Tok::Star => NodeTest::Wildcard,
            Tok::PrefixStar(prefix) => NodeTest::PrefixWildcard(prefix),
            Tok::Name { prefix: None, local } if is_node_type(&local) && self.peek() == &Tok::LParen => {
                self.advance();
                let test = match local.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => match self.peek().clone() {
                        Tok::Literal(target) => {
                            self.advance();
                            NodeTest::ProcessingInstruction(Some(target))
                        }
                        _ => NodeTest::ProcessingInstruction(None),
                    },
                };
                self.expect(&Tok::RParen)?;
                test
            }
            Tok::Name { prefix, local } => NodeTest::Name(self.resolve(prefix.as_deref(), &local)?),
            _ => {
                self.pos -= 1;
                return Err(self.unexpected());
            }
        };

        let predicates = self.predicates()?;
        Ok(Step { axis, test, predicates })
    }

    fn predicates(&mut self) -> XPathResult<Vec<Expr>> {
        let mut predicates = Vec::new();
        while self.eat(&Tok::LBracket) {
            predicates.push(self.expr()?);
            self.expect(&Tok::RBracket)?;
        }
        Ok(predicates)
    }

    fn primary_expr(&mut self) -> XPathResult<Expr> {
        match self.advance() {
            Tok::Dollar => match self.advance() {
                Tok::Name { prefix, local } => Ok(Expr::Variable(self.resolve(prefix.as_deref(), &local)?)),
                _ => {
                    self.pos -= 1;
                    Err(self.unexpected())
                }
            },
            Tok::LParen => {
                let expr = self.expr()?;
                self.expect(&Tok::RParen)?;
                Ok(expr)
            }
            Tok::Literal(text) => Ok(Expr::Literal(text)),
            Tok::Number(text) => Ok(Expr::Number(self.parser.math.parse_number(&text)?)),
            Tok::Name { prefix, local } => self.function_call(prefix, local),
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }

    fn function_call(&mut self, prefix: Option<String>, local: String) -> XPathResult<Expr> {
        self.expect(&Tok::LParen)?;
        let mut args = Vec::new();
        if !self.eat(&Tok::RParen) {
            loop {
                args.push(self.expr()?);
                if self.eat(&Tok::RParen) {
                    break;
                }
                self.expect(&Tok::Comma)?;
            }
        }

        if prefix.is_some() {
            let name = self.resolve(prefix.as_deref(), &local)?;
            return Ok(Expr::Function { name: FunctionName::Other(name), args });
        }

        let func = YangFunction::lookup(&local)
            .ok_or_else(|| XPathError::new(format!("Unknown default function {}", local)))?;
        self.min_version = self.min_version.max(func.min_version());
        func.call(args, self.parser.math)
    }

    fn fold_binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        if let (Expr::Number(l), Expr::Number(r)) = (&left, &right) {
            if let Some(folded) = self.parser.math.evaluate(op, *l, *r) {
                return folded;
            }
        }
        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            if left == right {
                return Expr::Boolean(op == BinaryOp::Eq);
            }
            if let (Expr::Literal(_), Expr::Literal(_)) = (&left, &right) {
                return Expr::Boolean(op == BinaryOp::Ne);
            }
        }
        Expr::Binary { op, left: Box::new(left), right: Box::new(right) }
    }

    fn resolve(&self, prefix: Option<&str>, local: &str) -> XPathResult<QNameRef> {
        self.parser.strategy.resolve(prefix, local)
    }

    fn peek(&self) -> &Tok {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        self.tokens.get(self.pos + offset).unwrap_or(&Tok::Eof)
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Tok) -> XPathResult<()> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> XPathError {
        self.error(format!("Unexpected token {:?}", self.peek()))
    }

    fn error(&self, message: String) -> XPathError {
        XPathError::new(format!("{} in expression '{}'", message, self.input))
    }
}

/// Fold `or`/`and` chains whose operands are all constants
fn fold_logical(op: NaryOp, mut operands: Vec<Expr>) -> Expr {
    if operands.len() == 1 {
        return operands.remove(0);
    }
    let constants: Option<Vec<bool>> = operands
        .iter()
        .map(|e| match e {
            Expr::Boolean(b) => Some(*b),
            _ => None,
        })
        .collect();
    match constants {
        Some(values) if op == NaryOp::Or => Expr::Boolean(values.into_iter().any(|b| b)),
        Some(values) => Expr::Boolean(values.into_iter().all(|b| b)),
        None => Expr::Nary { op, operands },
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(name, "node" | "text" | "comment" | "processing-instruction")
}

fn starts_step(tok: &Tok) -> bool {
    matches!(
        tok,
        Tok::Dot | Tok::DotDot | Tok::At | Tok::Star | Tok::PrefixStar(_) | Tok::Name { .. }
    )
}

fn descendant_or_self() -> Step {
    Step::new(Axis::DescendantOrSelf, NodeTest::Node)
}

/// `.` steps select the context node and add nothing to a longer path
fn drop_self_steps(steps: Vec<Step>, absolute: bool) -> Vec<Step> {
    let only_self = steps.iter().all(Step::is_self);
    if only_self && !absolute {
        return steps.into_iter().take(1).collect();
    }
    steps.into_iter().filter(|s| !s.is_self()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xpath::ast::XPathNumber;

    fn parse(input: &str) -> XPathResult<ParsedXPath> {
        XPathParser::default().parse(input)
    }

    fn name(local: &str) -> NodeTest {
        NodeTest::Name(QNameRef::Unresolved { prefix: None, local_name: local.into() })
    }

    #[test]
    fn test_arithmetic_is_folded() {
        assert_eq!(parse("1 + 2").unwrap().expr, Expr::Number(XPathNumber::Double(3.0)));
        assert_eq!(parse("2 * 3 - 1").unwrap().expr, Expr::Number(XPathNumber::Double(5.0)));
        assert_eq!(parse("--4").unwrap().expr, Expr::Number(XPathNumber::Double(4.0)));
        assert_eq!(parse("-4").unwrap().expr, Expr::Number(XPathNumber::Double(-4.0)));
        assert_eq!(parse("1 < 2").unwrap().expr, Expr::Boolean(true));
    }

    #[test]
    fn test_equality_is_folded() {
        assert_eq!(parse("\"a\" = \"a\"").unwrap().expr, Expr::Boolean(true));
        assert_eq!(parse("'a' != 'a'").unwrap().expr, Expr::Boolean(false));
        assert_eq!(parse("'a' = 'b'").unwrap().expr, Expr::Boolean(false));
        assert_eq!(parse("foo = foo").unwrap().expr, Expr::Boolean(true));
        assert!(matches!(parse("foo = bar").unwrap().expr, Expr::Binary { op: BinaryOp::Eq, .. }));
    }

    #[test]
    fn test_nary_chains() {
        let parsed = parse("a or b or c").unwrap();
        assert!(matches!(parsed.expr, Expr::Nary { op: NaryOp::Or, ref operands } if operands.len() == 3));
        assert_eq!(parse("true() and false()").unwrap().expr, Expr::Boolean(false));
        let union = parse("a | b | a").unwrap();
        assert!(matches!(union.expr, Expr::Nary { op: NaryOp::Union, ref operands } if operands.len() == 2));
    }

    #[test]
    fn test_negated_path() {
        assert!(matches!(parse("-a").unwrap().expr, Expr::Negate(_)));
    }

    #[test]
    fn test_relative_path_with_parent_steps() {
        let parsed = parse("../../interface/name").unwrap();
        let path = parsed.expr.as_location().unwrap();
        assert!(!path.absolute);
        assert_eq!(path.steps.len(), 4);
        assert!(path.steps[0].is_parent());
        assert_eq!(path.steps[3].test, name("name"));
    }

    #[test]
    fn test_absolute_path_with_predicate() {
        let parsed = parse("/if:interfaces/if:interface[if:name = current()/../ifname]/if:type").unwrap();
        let path = parsed.expr.as_location().unwrap();
        assert!(path.absolute);
        assert_eq!(path.steps.len(), 3);
        assert_eq!(path.steps[1].predicates.len(), 1);
        assert!(matches!(
            &path.steps[1].predicates[0],
            Expr::Binary { op: BinaryOp::Eq, right, .. } if matches!(**right, Expr::Path { .. })
        ));
    }

    #[test]
    fn test_self_steps_dropped() {
        let parsed = parse("./a/./b").unwrap();
        let path = parsed.expr.as_location().unwrap();
        assert_eq!(path.steps.len(), 2);
        let dot = parse(".").unwrap();
        assert_eq!(dot.expr.as_location().unwrap().steps.len(), 1);
    }

    #[test]
    fn test_double_slash_and_axes() {
        let parsed = parse("//a/ancestor::b/@c").unwrap();
        let path = parsed.expr.as_location().unwrap();
        assert_eq!(path.steps[0].axis, Axis::DescendantOrSelf);
        assert_eq!(path.steps[2].axis, Axis::Ancestor);
        assert_eq!(path.steps[3].axis, Axis::Attribute);
        assert_eq!(parse("/").unwrap().expr.as_location().unwrap().steps.len(), 0);
    }

    #[test]
    fn test_function_version_floor() {
        assert_eq!(parse("count(a) > 0").unwrap().min_version, YangVersion::V1_0);
        assert_eq!(parse("derived-from(., 'x:y')").unwrap().min_version, YangVersion::V1_1);
        assert_eq!(parse("re-match(a, '[a-z]+')").unwrap().min_version, YangVersion::V1_1);
    }

    #[test]
    fn test_unknown_and_prefixed_functions() {
        let err = parse("frob(1)").unwrap_err();
        assert_eq!(err.message, "Unknown default function frob");
        assert!(matches!(
            parse("ext:frob(1)").unwrap().expr,
            Expr::Function { name: FunctionName::Other(_), .. }
        ));
    }

    #[test]
    fn test_wrong_arity() {
        let err = parse("contains('a')").unwrap_err();
        assert_eq!(err.message, "contains(string, string) takes two arguments");
    }

    #[test]
    fn test_grammar_error_is_captured() {
        let err = parse("a +").unwrap_err();
        assert!(err.message.starts_with("Unexpected token Eof in expression 'a +'"));
        assert!(parse("(1").is_err());
        assert!(parse("a b").is_err());
    }

    #[test]
    fn test_qualified_strategy() {
        let module = QNameModule::new("urn:if", None);
        let strategy = QNameStrategy::Unqualified {
            default: QNameModule::new("urn:local", None),
            prefixes: HashMap::from([("if".to_string(), module.clone())]),
        };
        let parser = XPathParser::new(MathMode::Ieee754, strategy);
        let parsed = parser.parse("/if:interfaces/leaf").unwrap();
        let path = parsed.expr.as_location().unwrap();
        match &path.steps[0].test {
            NodeTest::Name(QNameRef::Resolved(q)) => assert_eq!(q.module, module),
            other => panic!("unexpected {:?}", other),
        }
        match &path.steps[1].test {
            NodeTest::Name(QNameRef::Resolved(q)) => assert_eq!(&*q.module.namespace, "urn:local"),
            other => panic!("unexpected {:?}", other),
        }
        let err = parser.parse("/nope:x").unwrap_err();
        assert_eq!(err.message, "Prefix nope is not bound");
    }

    #[test]
    fn test_exact_math_mode() {
        let parser = XPathParser::new(MathMode::Exact, QNameStrategy::Unresolved);
        let parsed = parser.parse("0.1 + 0.2 = 0.3").unwrap();
        assert_eq!(parsed.expr, Expr::Boolean(true));
    }
}
