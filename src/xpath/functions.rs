//! Well-known functions: arity validation and constant folding
//!
//! Arity is checked at parse time even for functions whose effect depends
//! on the schema (`deref`, `derived-from`, ...); those are only folded when
//! their result does not depend on a context node.

use super::ast::{Expr, FunctionName, XPathNumber};
use super::math::MathMode;
use super::{XPathError, XPathResult};
use crate::version::YangVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YangFunction {
    BitIsSet,
    Boolean,
    Ceiling,
    Concat,
    Contains,
    Count,
    Current,
    Deref,
    DerivedFrom,
    DerivedFromOrSelf,
    EnumValue,
    False,
    Floor,
    Id,
    Lang,
    Last,
    LocalName,
    Name,
    NamespaceUri,
    NormalizeSpace,
    Not,
    Number,
    Position,
    ReMatch,
    Round,
    StartsWith,
    String,
    StringLength,
    Substring,
    SubstringAfter,
    SubstringBefore,
    Sum,
    Translate,
    True,
}

/// Accepted argument counts and the message reported when violated
struct Arity {
    min: usize,
    max: Option<usize>,
    message: &'static str,
}

const fn arity(min: usize, max: Option<usize>, message: &'static str) -> Arity {
    Arity { min, max, message }
}

impl YangFunction {
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "bit-is-set" => Self::BitIsSet,
            "boolean" => Self::Boolean,
            "ceiling" => Self::Ceiling,
            "concat" => Self::Concat,
            "contains" => Self::Contains,
            "count" => Self::Count,
            "current" => Self::Current,
            "deref" => Self::Deref,
            "derived-from" => Self::DerivedFrom,
            "derived-from-or-self" => Self::DerivedFromOrSelf,
            "enum-value" => Self::EnumValue,
            "false" => Self::False,
            "floor" => Self::Floor,
            "id" => Self::Id,
            "lang" => Self::Lang,
            "last" => Self::Last,
            "local-name" => Self::LocalName,
            "name" => Self::Name,
            "namespace-uri" => Self::NamespaceUri,
            "normalize-space" => Self::NormalizeSpace,
            "not" => Self::Not,
            "number" => Self::Number,
            "position" => Self::Position,
            "re-match" => Self::ReMatch,
            "round" => Self::Round,
            "starts-with" => Self::StartsWith,
            "string" => Self::String,
            "string-length" => Self::StringLength,
            "substring" => Self::Substring,
            "substring-after" => Self::SubstringAfter,
            "substring-before" => Self::SubstringBefore,
            "sum" => Self::Sum,
            "translate" => Self::Translate,
            "true" => Self::True,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::BitIsSet => "bit-is-set",
            Self::Boolean => "boolean",
            Self::Ceiling => "ceiling",
            Self::Concat => "concat",
            Self::Contains => "contains",
            Self::Count => "count",
            Self::Current => "current",
            Self::Deref => "deref",
            Self::DerivedFrom => "derived-from",
            Self::DerivedFromOrSelf => "derived-from-or-self",
            Self::EnumValue => "enum-value",
            Self::False => "false",
            Self::Floor => "floor",
            Self::Id => "id",
            Self::Lang => "lang",
            Self::Last => "last",
            Self::LocalName => "local-name",
            Self::Name => "name",
            Self::NamespaceUri => "namespace-uri",
            Self::NormalizeSpace => "normalize-space",
            Self::Not => "not",
            Self::Number => "number",
            Self::Position => "position",
            Self::ReMatch => "re-match",
            Self::Round => "round",
            Self::StartsWith => "starts-with",
            Self::String => "string",
            Self::StringLength => "string-length",
            Self::Substring => "substring",
            Self::SubstringAfter => "substring-after",
            Self::SubstringBefore => "substring-before",
            Self::Sum => "sum",
            Self::Translate => "translate",
            Self::True => "true",
        }
    }

    /// First YANG version defining this function
    pub fn min_version(&self) -> YangVersion {
        match self {
            Self::BitIsSet
            | Self::Deref
            | Self::DerivedFrom
            | Self::DerivedFromOrSelf
            | Self::EnumValue
            | Self::ReMatch => YangVersion::V1_1,
            _ => YangVersion::V1_0,
        }
    }

    fn arity(&self) -> Arity {
        match self {
            Self::BitIsSet => arity(2, Some(2), "bit-is-set(node-set, string) takes two arguments"),
            Self::Boolean => arity(1, Some(1), "boolean(object) takes one argument"),
            Self::Ceiling => arity(1, Some(1), "ceiling(number) takes one argument"),
            Self::Concat => arity(2, None, "concat(string, string, string*) takes at least two arguments"),
            Self::Contains => arity(2, Some(2), "contains(string, string) takes two arguments"),
            Self::Count => arity(1, Some(1), "count(node-set) takes one argument"),
            Self::Current => arity(0, Some(0), "current() does not take any arguments"),
            Self::Deref => arity(1, Some(1), "deref(node-set) takes one argument"),
            Self::DerivedFrom => arity(2, Some(2), "derived-from(node-set, string) takes two arguments"),
            Self::DerivedFromOrSelf => {
                arity(2, Some(2), "derived-from-or-self(node-set, string) takes two arguments")
            }
            Self::EnumValue => arity(1, Some(1), "enum-value(node-set) takes one argument"),
            Self::False => arity(0, Some(0), "false() does not take any arguments"),
            Self::Floor => arity(1, Some(1), "floor(number) takes one argument"),
            Self::Id => arity(1, Some(1), "id(object) takes one argument"),
            Self::Lang => arity(1, Some(1), "lang(string) takes one argument"),
            Self::Last => arity(0, Some(0), "last() does not take any arguments"),
            Self::LocalName => arity(0, Some(1), "local-name(node-set?) takes at most one argument"),
            Self::Name => arity(0, Some(1), "name(node-set?) takes at most one argument"),
            Self::NamespaceUri => arity(0, Some(1), "namespace-uri(node-set?) takes at most one argument"),
            Self::NormalizeSpace => arity(0, Some(1), "normalize-space(object?) takes at most one argument"),
            Self::Not => arity(1, Some(1), "not(boolean) takes one argument"),
            Self::Number => arity(0, Some(1), "number(object?) takes at most one argument"),
            Self::Position => arity(0, Some(0), "position() does not take any arguments"),
            Self::ReMatch => arity(2, Some(2), "re-match(string, string) takes two arguments"),
            Self::Round => arity(1, Some(1), "round(number) takes one argument"),
            Self::StartsWith => arity(2, Some(2), "starts-with(string, string) takes two arguments"),
            Self::String => arity(0, Some(1), "string(object?) takes at most one argument"),
            Self::StringLength => arity(0, Some(1), "string-length(object?) takes at most one argument"),
            Self::Substring => {
                arity(2, Some(3), "substring(string, number, number?) takes two or three arguments")
            }
            Self::SubstringAfter => arity(2, Some(2), "substring-after(string, string) takes two arguments"),
            Self::SubstringBefore => arity(2, Some(2), "substring-before(string, string) takes two arguments"),
            Self::Sum => arity(1, Some(1), "sum(node-set) takes one argument"),
            Self::Translate => arity(3, Some(3), "translate(string, string, string) takes three arguments"),
            Self::True => arity(0, Some(0), "true() does not take any arguments"),
        }
    }

    pub fn check_arity(&self, count: usize) -> XPathResult<()> {
        let arity = self.arity();
        if count < arity.min || arity.max.map_or(false, |max| count > max) {
            return Err(XPathError::new(arity.message));
        }
        Ok(())
    }

    /// Build a call, folding it when every input is a constant
    pub fn call(self, args: Vec<Expr>, math: MathMode) -> XPathResult<Expr> {
        self.check_arity(args.len())?;
        Ok(fold(self, &args, math).unwrap_or(Expr::Function { name: FunctionName::Yang(self), args }))
    }
}

fn fold(func: YangFunction, args: &[Expr], math: MathMode) -> Option<Expr> {
    match (func, args) {
        (YangFunction::True, []) => Some(Expr::Boolean(true)),
        (YangFunction::False, []) => Some(Expr::Boolean(false)),
        (YangFunction::Boolean, [arg]) => to_boolean(arg).map(Expr::Boolean),
        (YangFunction::Not, [arg]) => to_boolean(arg).map(|b| Expr::Boolean(!b)),
        (YangFunction::String, [Expr::Literal(s)]) => Some(Expr::Literal(s.clone())),
        (YangFunction::String, [Expr::Boolean(b)]) => Some(Expr::Literal(b.to_string())),
        (YangFunction::StringLength, [arg]) => {
            to_constant_string(arg).map(|s| Expr::Number(math.from_usize(s.chars().count())))
        }
        (YangFunction::Number, [Expr::Number(n)]) => Some(Expr::Number(*n)),
        (YangFunction::Number, [Expr::Boolean(b)]) => Some(Expr::Number(math.from_usize(usize::from(*b)))),
        (YangFunction::Number, [Expr::Literal(s)]) => math.string_to_number(s).map(Expr::Number),
        (YangFunction::Contains, [Expr::Literal(haystack), Expr::Literal(needle)]) => {
            Some(Expr::Boolean(haystack.contains(needle.as_str())))
        }
        (YangFunction::StartsWith, [Expr::Literal(s), Expr::Literal(prefix)]) => {
            Some(Expr::Boolean(s.starts_with(prefix.as_str())))
        }
        _ => None,
    }
}

fn to_boolean(expr: &Expr) -> Option<bool> {
    match expr {
        Expr::Boolean(b) => Some(*b),
        Expr::Literal(s) => Some(!s.is_empty()),
        Expr::Number(XPathNumber::Double(d)) => Some(*d != 0.0 && !d.is_nan()),
        Expr::Number(XPathNumber::Decimal(d)) => Some(!d.is_zero()),
        _ => None,
    }
}

fn to_constant_string(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Literal(s) => Some(s.clone()),
        Expr::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_round_trips_names() {
        for name in ["re-match", "derived-from-or-self", "string-length", "true"] {
            assert_eq!(YangFunction::lookup(name).map(|f| f.name()), Some(name));
        }
        assert_eq!(YangFunction::lookup("frobnicate"), None);
    }

    #[test]
    fn test_arity_messages() {
        let err = YangFunction::Concat.call(vec![Expr::Literal("a".into())], MathMode::Ieee754).unwrap_err();
        assert_eq!(err.message, "concat(string, string, string*) takes at least two arguments");
        let err = YangFunction::Current.call(vec![Expr::Boolean(true)], MathMode::Ieee754).unwrap_err();
        assert_eq!(err.message, "current() does not take any arguments");
        assert!(YangFunction::Substring.check_arity(3).is_ok());
        assert!(YangFunction::Substring.check_arity(4).is_err());
    }

    #[test]
    fn test_folding() {
        let math = MathMode::Ieee754;
        assert_eq!(YangFunction::True.call(vec![], math).unwrap(), Expr::Boolean(true));
        assert_eq!(
            YangFunction::Not.call(vec![Expr::Literal(String::new())], math).unwrap(),
            Expr::Boolean(true)
        );
        assert_eq!(
            YangFunction::StringLength.call(vec![Expr::Literal("abc".into())], math).unwrap(),
            Expr::Number(XPathNumber::Double(3.0))
        );
        assert_eq!(
            YangFunction::Number.call(vec![Expr::Boolean(true)], math).unwrap(),
            Expr::Number(XPathNumber::Double(1.0))
        );
    }

    #[test]
    fn test_schema_dependent_call_is_kept() {
        let call = YangFunction::Current.call(vec![], MathMode::Ieee754).unwrap();
        assert_eq!(call, Expr::Function { name: FunctionName::Yang(YangFunction::Current), args: vec![] });
        assert_eq!(YangFunction::Deref.min_version(), YangVersion::V1_1);
    }
}
