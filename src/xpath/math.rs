//! Arithmetic strategies for constant folding

use super::ast::{BinaryOp, Expr, XPathNumber};
use super::{XPathError, XPathResult};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How numeric literals are represented and evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathMode {
    /// IEEE 754 binary64, the XPath 1.0 number model
    #[default]
    Ieee754,
    /// Exact decimal arithmetic; operations that overflow or divide by zero
    /// are left unfolded
    Exact,
}

impl MathMode {
    pub fn parse_number(&self, text: &str) -> XPathResult<XPathNumber> {
        match self {
            Self::Ieee754 => f64::from_str(text)
                .map(XPathNumber::Double)
                .map_err(|e| XPathError::new(format!("Invalid number '{}': {}", text, e))),
            Self::Exact => Decimal::from_str(text)
                .map(XPathNumber::Decimal)
                .map_err(|e| XPathError::new(format!("Invalid number '{}': {}", text, e))),
        }
    }

    pub fn from_usize(&self, value: usize) -> XPathNumber {
        match self {
            Self::Ieee754 => XPathNumber::Double(value as f64),
            Self::Exact => XPathNumber::Decimal(Decimal::from(value)),
        }
    }

    /// Convert a string the way `number()` does, if representable
    pub fn string_to_number(&self, text: &str) -> Option<XPathNumber> {
        let trimmed = text.trim();
        match self {
            Self::Ieee754 => Some(XPathNumber::Double(
                trimmed.parse::<f64>().ok().filter(|_| is_xpath_number(trimmed)).unwrap_or(f64::NAN),
            )),
            Self::Exact if is_xpath_number(trimmed) => Decimal::from_str(trimmed).ok().map(XPathNumber::Decimal),
            Self::Exact => None,
        }
    }

    pub fn negate(&self, number: XPathNumber) -> XPathNumber {
        match number {
            XPathNumber::Double(d) => XPathNumber::Double(-d),
            XPathNumber::Decimal(d) => XPathNumber::Decimal(-d),
        }
    }

    /// Evaluate a binary operation over two numeric constants. Comparisons
    /// produce a boolean constant; `None` means the result is left unfolded.
    pub fn evaluate(&self, op: BinaryOp, left: XPathNumber, right: XPathNumber) -> Option<Expr> {
        match (self.coerce(left)?, self.coerce(right)?) {
            (XPathNumber::Double(l), XPathNumber::Double(r)) => Some(match op {
                BinaryOp::Eq => Expr::Boolean(l == r),
                BinaryOp::Ne => Expr::Boolean(l != r),
                BinaryOp::Lt => Expr::Boolean(l < r),
                BinaryOp::Le => Expr::Boolean(l <= r),
                BinaryOp::Gt => Expr::Boolean(l > r),
                BinaryOp::Ge => Expr::Boolean(l >= r),
                BinaryOp::Plus => Expr::Number(XPathNumber::Double(l + r)),
                BinaryOp::Minus => Expr::Number(XPathNumber::Double(l - r)),
                BinaryOp::Mul => Expr::Number(XPathNumber::Double(l * r)),
                BinaryOp::Div => Expr::Number(XPathNumber::Double(l / r)),
                BinaryOp::Mod => Expr::Number(XPathNumber::Double(l % r)),
            }),
            (XPathNumber::Decimal(l), XPathNumber::Decimal(r)) => Some(match op {
                BinaryOp::Eq => Expr::Boolean(l == r),
                BinaryOp::Ne => Expr::Boolean(l != r),
                BinaryOp::Lt => Expr::Boolean(l < r),
                BinaryOp::Le => Expr::Boolean(l <= r),
                BinaryOp::Gt => Expr::Boolean(l > r),
                BinaryOp::Ge => Expr::Boolean(l >= r),
                BinaryOp::Plus => Expr::Number(XPathNumber::Decimal(l.checked_add(r)?)),
                BinaryOp::Minus => Expr::Number(XPathNumber::Decimal(l.checked_sub(r)?)),
                BinaryOp::Mul => Expr::Number(XPathNumber::Decimal(l.checked_mul(r)?)),
                BinaryOp::Div => Expr::Number(XPathNumber::Decimal(l.checked_div(r)?)),
                BinaryOp::Mod => Expr::Number(XPathNumber::Decimal(l.checked_rem(r)?)),
            }),
            _ => None,
        }
    }

    fn coerce(&self, number: XPathNumber) -> Option<XPathNumber> {
        match (self, number) {
            (Self::Ieee754, XPathNumber::Decimal(d)) => d.to_f64().map(XPathNumber::Double),
            (Self::Exact, XPathNumber::Double(d)) => Decimal::from_f64(d).map(XPathNumber::Decimal),
            (_, n) => Some(n),
        }
    }
}

/// XPath 1.0 `Number` production, optionally signed
fn is_xpath_number(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int, frac) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    match frac {
        Some(f) => all_digits(int) && all_digits(f) && !(int.is_empty() && f.is_empty()),
        None => !int.is_empty() && all_digits(int),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ieee754_arithmetic() {
        let mode = MathMode::Ieee754;
        let one = mode.parse_number("1").unwrap();
        let two = mode.parse_number("2").unwrap();
        assert_eq!(mode.evaluate(BinaryOp::Plus, one, two), Some(Expr::Number(XPathNumber::Double(3.0))));
        assert_eq!(mode.evaluate(BinaryOp::Lt, one, two), Some(Expr::Boolean(true)));
        assert!(matches!(
            mode.evaluate(BinaryOp::Div, one, mode.from_usize(0)),
            Some(Expr::Number(XPathNumber::Double(d))) if d.is_infinite()
        ));
    }

    #[test]
    fn test_exact_arithmetic() {
        let mode = MathMode::Exact;
        let a = mode.parse_number("0.1").unwrap();
        let b = mode.parse_number("0.2").unwrap();
        assert_eq!(
            mode.evaluate(BinaryOp::Plus, a, b),
            Some(Expr::Number(mode.parse_number("0.3").unwrap()))
        );
        assert_eq!(mode.evaluate(BinaryOp::Div, a, mode.from_usize(0)), None);
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(MathMode::Ieee754.string_to_number(" 12 "), Some(XPathNumber::Double(12.0)));
        assert!(matches!(
            MathMode::Ieee754.string_to_number("1e3"),
            Some(XPathNumber::Double(d)) if d.is_nan()
        ));
        assert_eq!(MathMode::Exact.string_to_number("abc"), None);
    }
}
