//! SAS-101: Value model and coercion rules.
//!
//! A SAS variable is either numeric or character. Both may be *missing*,
//! which is distinct from zero and from empty text and propagates through
//! arithmetic.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EvalError;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// Runtime value of a SAS variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Numeric value (SAS numerics are 8-byte floats).
    Number(f64),
    /// Character value.
    Text(String),
    /// Missing value (`.` in listings).
    Missing,
}

impl Value {
    /// Build a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Returns `true` for [`Value::Missing`].
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Returns `true` for [`Value::Number`].
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Returns `true` for [`Value::Text`].
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// Numeric coercion. Text that does not parse and missing values yield `None`.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Missing => None,
        }
    }

    /// Numeric coercion that keeps the SAS distinction between a number and missing.
    pub fn to_numeric_value(&self) -> Value {
        self.to_number().map_or(Value::Missing, Value::Number)
    }

    /// Text rendering. Missing becomes empty text.
    pub fn to_text(&self) -> String {
        match self {
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
            Self::Missing => String::new(),
        }
    }

    /// Truthiness used by IF and DO WHILE/UNTIL: present and non-zero after
    /// numeric coercion.
    pub fn is_true(&self) -> bool {
        matches!(self.to_number(), Some(n) if n != 0.0)
    }

    /// Short description of the variant for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "numeric",
            Self::Text(_) => "character",
            Self::Missing => "missing",
        }
    }

    /// Total ordering used by SORT and MERGE: missing < numbers < text.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Self::Missing, Self::Missing) => Ordering::Equal,
            (Self::Missing, _) => Ordering::Less,
            (_, Self::Missing) => Ordering::Greater,
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }

    /// Render for a listing, using `missing` for missing values.
    pub fn display_with(&self, missing: &str) -> String {
        match self {
            Self::Missing => missing.to_string(),
            other => other.to_text(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_with("."))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Render a number with at most six decimals and no trailing zeros.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let mut s = format!("{n:.6}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Binary operators accepted by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    And,
    Or,
}

impl BinaryOperator {
    /// Map an operator token to its operator. Tokens are matched
    /// case-insensitively so `AND` and `and` are equivalent.
    pub fn from_token(token: &str) -> Result<Self, EvalError> {
        let op = match token.to_ascii_lowercase().as_str() {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "and" => Self::And,
            "or" => Self::Or,
            _ => {
                return Err(EvalError::UnsupportedOperator {
                    op: token.to_string(),
                })
            }
        };
        Ok(op)
    }

    /// Apply the operator to two already-evaluated operands.
    ///
    /// Operands are coerced to numbers first. Arithmetic involving a missing
    /// operand is missing, as is division by zero. Comparisons treat missing
    /// as smaller than every number.
    pub fn apply(self, left: &Value, right: &Value) -> Value {
        let l = left.to_number();
        let r = right.to_number();
        match self {
            Self::Add => arith(l, r, |a, b| a + b),
            Self::Sub => arith(l, r, |a, b| a - b),
            Self::Mul => arith(l, r, |a, b| a * b),
            Self::Div => match (l, r) {
                (Some(_), Some(b)) if b == 0.0 => Value::Missing,
                _ => arith(l, r, |a, b| a / b),
            },
            Self::Gt => flag(cmp_missing(l, r) == Ordering::Greater),
            Self::Lt => flag(cmp_missing(l, r) == Ordering::Less),
            Self::Ge => flag(cmp_missing(l, r) != Ordering::Less),
            Self::Le => flag(cmp_missing(l, r) != Ordering::Greater),
            Self::Eq => flag(cmp_missing(l, r) == Ordering::Equal),
            Self::Ne => flag(cmp_missing(l, r) != Ordering::Equal),
            Self::And => flag(truthy(l) && truthy(r)),
            Self::Or => flag(truthy(l) || truthy(r)),
        }
    }
}

fn arith(l: Option<f64>, r: Option<f64>, f: impl Fn(f64, f64) -> f64) -> Value {
    match (l, r) {
        (Some(a), Some(b)) => Value::Number(f(a, b)),
        _ => Value::Missing,
    }
}

fn cmp_missing(l: Option<f64>, r: Option<f64>) -> Ordering {
    match (l, r) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn truthy(n: Option<f64>) -> bool {
    matches!(n, Some(v) if v != 0.0)
}

fn flag(b: bool) -> Value {
    Value::Number(if b { 1.0 } else { 0.0 })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_number() {
        assert_eq!(Value::Number(2.5).to_number(), Some(2.5));
        assert_eq!(Value::text(" 42 ").to_number(), Some(42.0));
        assert_eq!(Value::text("abc").to_number(), None);
        assert_eq!(Value::Missing.to_number(), None);
    }

    #[test]
    fn test_to_text() {
        assert_eq!(Value::Number(10.0).to_text(), "10");
        assert_eq!(Value::Number(3.4011973817).to_text(), "3.401197");
        assert_eq!(Value::Number(0.5).to_text(), "0.5");
        assert_eq!(Value::text("Low").to_text(), "Low");
        assert_eq!(Value::Missing.to_text(), "");
        assert_eq!(Value::Missing.to_string(), ".");
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Number(1.0).is_true());
        assert!(Value::Number(-0.5).is_true());
        assert!(!Value::Number(0.0).is_true());
        assert!(!Value::Missing.is_true());
        assert!(Value::text("7").is_true());
        assert!(!Value::text("yes").is_true());
    }

    #[test]
    fn test_division_by_zero_is_missing() {
        let v = BinaryOperator::Div.apply(&Value::Number(1.0), &Value::Number(0.0));
        assert_eq!(v, Value::Missing);
    }

    #[test]
    fn test_arithmetic_propagates_missing() {
        let v = BinaryOperator::Add.apply(&Value::Missing, &Value::Number(1.0));
        assert_eq!(v, Value::Missing);
        let v = BinaryOperator::Mul.apply(&Value::text("x"), &Value::Number(2.0));
        assert_eq!(v, Value::Missing);
        let v = BinaryOperator::Sub.apply(&Value::text("5"), &Value::Number(2.0));
        assert_eq!(v, Value::Number(3.0));
    }

    #[test]
    fn test_comparisons_yield_flags() {
        let three = Value::Number(3.0);
        let four = Value::Number(4.0);
        assert_eq!(BinaryOperator::Gt.apply(&four, &three), Value::Number(1.0));
        assert_eq!(BinaryOperator::Le.apply(&four, &three), Value::Number(0.0));
        assert_eq!(BinaryOperator::Ne.apply(&four, &three), Value::Number(1.0));
        assert_eq!(BinaryOperator::Lt.apply(&Value::Missing, &three), Value::Number(1.0));
        assert_eq!(BinaryOperator::Eq.apply(&Value::Missing, &Value::Missing), Value::Number(1.0));
    }

    #[test]
    fn test_logical_operators() {
        let t = Value::Number(1.0);
        let f = Value::Number(0.0);
        assert_eq!(BinaryOperator::And.apply(&t, &f), Value::Number(0.0));
        assert_eq!(BinaryOperator::Or.apply(&t, &f), Value::Number(1.0));
        assert_eq!(BinaryOperator::Or.apply(&Value::Missing, &f), Value::Number(0.0));
    }

    #[test]
    fn test_operator_tokens() {
        assert_eq!(BinaryOperator::from_token("AND").unwrap(), BinaryOperator::And);
        assert_eq!(BinaryOperator::from_token(">=").unwrap(), BinaryOperator::Ge);
        assert!(matches!(
            BinaryOperator::from_token("**"),
            Err(EvalError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn test_compare_ordering() {
        assert_eq!(Value::Missing.compare(&Value::Number(-1e9)), Ordering::Less);
        assert_eq!(Value::Number(2.0).compare(&Value::Number(10.0)), Ordering::Less);
        assert_eq!(Value::Number(2.0).compare(&Value::text("a")), Ordering::Less);
        assert_eq!(Value::text("b").compare(&Value::text("a")), Ordering::Greater);
    }
}
