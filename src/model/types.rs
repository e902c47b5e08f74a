//! Resolved type definitions
//!
//! A [`TypeDefinition`] is the flattened result of a `type` statement after
//! its typedef chain has been walked down to a builtin type, with every
//! restriction along the way merged in.

use super::qname::{QName, QNameModule};
use crate::xpath::ParsedXPath;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Namespace of builtin types and statements
pub const YANG_NAMESPACE: &str = "urn:ietf:params:xml:ns:yang:1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Binary,
    Bits,
    Boolean,
    Decimal64,
    Empty,
    Enumeration,
    Identityref,
    InstanceIdentifier,
    Int8,
    Int16,
    Int32,
    Int64,
    Leafref,
    String,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Union,
}

impl BuiltinType {
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "binary" => Self::Binary,
            "bits" => Self::Bits,
            "boolean" => Self::Boolean,
            "decimal64" => Self::Decimal64,
            "empty" => Self::Empty,
            "enumeration" => Self::Enumeration,
            "identityref" => Self::Identityref,
            "instance-identifier" => Self::InstanceIdentifier,
            "int8" => Self::Int8,
            "int16" => Self::Int16,
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "leafref" => Self::Leafref,
            "string" => Self::String,
            "uint8" => Self::Uint8,
            "uint16" => Self::Uint16,
            "uint32" => Self::Uint32,
            "uint64" => Self::Uint64,
            "union" => Self::Union,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Bits => "bits",
            Self::Boolean => "boolean",
            Self::Decimal64 => "decimal64",
            Self::Empty => "empty",
            Self::Enumeration => "enumeration",
            Self::Identityref => "identityref",
            Self::InstanceIdentifier => "instance-identifier",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Leafref => "leafref",
            Self::String => "string",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Union => "union",
        }
    }

    pub fn qname(&self) -> QName {
        QName::new(QNameModule::new(YANG_NAMESPACE, None), self.name())
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64
        )
    }

    /// Value space of an integer type
    pub fn integer_bounds(&self) -> Option<RangeSet> {
        let (min, max) = match self {
            Self::Int8 => (Decimal::from(i8::MIN), Decimal::from(i8::MAX)),
            Self::Int16 => (Decimal::from(i16::MIN), Decimal::from(i16::MAX)),
            Self::Int32 => (Decimal::from(i32::MIN), Decimal::from(i32::MAX)),
            Self::Int64 => (Decimal::from(i64::MIN), Decimal::from(i64::MAX)),
            Self::Uint8 => (Decimal::ZERO, Decimal::from(u8::MAX)),
            Self::Uint16 => (Decimal::ZERO, Decimal::from(u16::MAX)),
            Self::Uint32 => (Decimal::ZERO, Decimal::from(u32::MAX)),
            Self::Uint64 => (Decimal::ZERO, Decimal::from(u64::MAX)),
            _ => return None,
        };
        Some(RangeSet(vec![Interval { min, max }]))
    }

    /// Value space of decimal64 with the given fraction digits
    pub fn decimal64_bounds(fraction_digits: u8) -> RangeSet {
        let scale = u32::from(fraction_digits);
        RangeSet(vec![Interval {
            min: Decimal::new(i64::MIN, scale),
            max: Decimal::new(i64::MAX, scale),
        }])
    }

    /// Value space of `length` restrictions
    pub fn length_bounds() -> RangeSet {
        RangeSet(vec![Interval { min: Decimal::ZERO, max: Decimal::from(u64::MAX) }])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub min: Decimal,
    pub max: Decimal,
}

/// Ordered, disjoint set of closed intervals from a `range` or `length`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSet(pub Vec<Interval>);

impl RangeSet {
    /// Parse a restriction against the value space of the parent type.
    /// `min` and `max` refer to the parent's bounds, and every interval must
    /// lie within one of the parent's intervals.
    pub fn restrict(&self, text: &str, integral: bool) -> Result<RangeSet, String> {
        let (Some(first), Some(last)) = (self.0.first(), self.0.last()) else {
            return Err("Parent value space is empty".to_string());
        };
        let bound = |s: &str| -> Result<Decimal, String> {
            let value = match s.trim() {
                "min" => first.min,
                "max" => last.max,
                other => Decimal::from_str(other).map_err(|e| format!("Invalid bound '{}': {}", other, e))?,
            };
            if integral && !value.fract().is_zero() {
                return Err(format!("Bound '{}' is not an integer", s.trim()));
            }
            Ok(value)
        };

        let mut intervals: Vec<Interval> = Vec::new();
        for part in text.split('|') {
            let interval = match part.split_once("..") {
                Some((lo, hi)) => Interval { min: bound(lo)?, max: bound(hi)? },
                None => {
                    let v = bound(part)?;
                    Interval { min: v, max: v }
                }
            };
            if interval.min > interval.max {
                return Err(format!("Interval '{}' has its lower bound above its upper bound", part.trim()));
            }
            if let Some(prev) = intervals.last() {
                if interval.min <= prev.max {
                    return Err(format!("Intervals of '{}' are not in ascending order", text));
                }
            }
            if !self.0.iter().any(|p| p.min <= interval.min && interval.max <= p.max) {
                return Err(format!("'{}' is not a subset of parent value space {}", part.trim(), self));
            }
            intervals.push(interval);
        }
        Ok(RangeSet(intervals))
    }

    pub fn contains(&self, value: Decimal) -> bool {
        self.0.iter().any(|i| i.min <= value && value <= i.max)
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, interval) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            if interval.min == interval.max {
                write!(f, "{}", interval.min)?;
            } else {
                write!(f, "{}..{}", interval.min, interval.max)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternConstraint {
    pub regex: String,
    /// `modifier invert-match`
    pub inverted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    /// Name as referenced: a builtin or a typedef
    pub name: QName,
    pub base: BuiltinType,
    /// Typedef chain from the referenced type towards the builtin
    pub derived_from: Vec<QName>,
    pub range: Option<RangeSet>,
    pub length: Option<RangeSet>,
    pub patterns: Vec<PatternConstraint>,
    pub enums: Vec<(String, i64)>,
    pub bits: Vec<(String, u64)>,
    pub fraction_digits: Option<u8>,
    pub leafref_path: Option<Arc<ParsedXPath>>,
    /// Schema path of the leaf a leafref points to, once resolved
    pub leafref_target: Option<Vec<QName>>,
    pub require_instance: Option<bool>,
    pub identity_bases: Vec<QName>,
    pub union_members: Vec<TypeDefinition>,
    pub default: Option<String>,
    pub units: Option<String>,
}

impl TypeDefinition {
    pub fn builtin(base: BuiltinType) -> Self {
        Self {
            name: base.qname(),
            base,
            derived_from: Vec::new(),
            range: None,
            length: None,
            patterns: Vec::new(),
            enums: Vec::new(),
            bits: Vec::new(),
            fraction_digits: None,
            leafref_path: None,
            leafref_target: None,
            require_instance: None,
            identity_bases: Vec::new(),
            union_members: Vec::new(),
            default: None,
            units: None,
        }
    }

    /// Current value space of a numeric type
    pub fn numeric_bounds(&self) -> Option<RangeSet> {
        if let Some(range) = &self.range {
            return Some(range.clone());
        }
        match self.base {
            BuiltinType::Decimal64 => self.fraction_digits.map(BuiltinType::decimal64_bounds),
            other => other.integer_bounds(),
        }
    }
}
