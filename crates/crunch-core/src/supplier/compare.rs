use std::cmp::Ordering;

use orion_error::StructError;
use regex::Regex;

use super::{Operand, Supplier, zip_with};
use crate::error::{CoreReason, CoreResult};

/// A string operand: either a literal or a supplier.
#[derive(Debug, Clone)]
pub enum TextOperand {
    Literal(String),
    Supplier(Supplier<String>),
}

impl TextOperand {
    fn into_supplier(self) -> Supplier<String> {
        match self {
            TextOperand::Literal(s) => Supplier::constant(format!("{s:?}"), s),
            TextOperand::Supplier(s) => s,
        }
    }
}

impl From<&str> for TextOperand {
    fn from(s: &str) -> Self {
        TextOperand::Literal(s.to_string())
    }
}

impl From<String> for TextOperand {
    fn from(s: String) -> Self {
        TextOperand::Literal(s)
    }
}

impl From<Supplier<String>> for TextOperand {
    fn from(s: Supplier<String>) -> Self {
        TextOperand::Supplier(s)
    }
}

// ---------------------------------------------------------------------------
// String comparisons
// ---------------------------------------------------------------------------

pub fn equal(a: impl Into<TextOperand>, b: impl Into<TextOperand>) -> Supplier<bool> {
    let (a, b) = (a.into().into_supplier(), b.into().into_supplier());
    let id = format!("equal({},{})", a.identifier(), b.identifier());
    zip_with(id, a, b, |x, y| Some(x? == y?))
}

/// Whether the whole of `value` matches `pattern`.
///
/// Fails when `pattern` is not a valid regular expression.
pub fn matches(pattern: &str, value: Supplier<String>) -> CoreResult<Supplier<bool>> {
    let anchored = format!("^(?:{pattern})$");
    let re = Regex::new(&anchored).map_err(|e| {
        StructError::from(CoreReason::Configuration)
            .with_detail(format!("invalid pattern {pattern:?}: {e}"))
    })?;
    let id = format!("match({pattern:?},{})", value.identifier());
    Ok(value.map(id, move |s| Some(re.is_match(&s))))
}

/// Whether `value` contains `needle`.
pub fn contains(needle: impl Into<TextOperand>, value: Supplier<String>) -> Supplier<bool> {
    let needle = needle.into().into_supplier();
    let id = format!("contains({},{})", needle.identifier(), value.identifier());
    zip_with(id, needle, value, |n, v| Some(v?.contains(n?.as_str())))
}

/// Length in characters.
pub fn length(value: Supplier<String>) -> Supplier<i64> {
    let id = format!("length({})", value.identifier());
    value.map(id, |s| i64::try_from(s.chars().count()).ok())
}

// ---------------------------------------------------------------------------
// Numeric comparisons
// ---------------------------------------------------------------------------

/// `-1`, `0` or `1` as `a` is lower than, equal to or greater than `b`.
/// Absent when either side is absent or the comparison is undefined (NaN).
pub fn compare(a: impl Into<Operand>, b: impl Into<Operand>) -> Supplier<i64> {
    let (a, b) = (a.into().into_supplier(), b.into().into_supplier());
    let id = format!("compare({},{})", a.identifier(), b.identifier());
    zip_with(id, a, b, |x, y| {
        x?.partial_cmp(&y?).map(|o| match o {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        })
    })
}

fn compare_with(
    op: &str,
    a: Operand,
    b: Operand,
    accept: fn(i64) -> bool,
) -> Supplier<bool> {
    let cmp = compare(a, b);
    let id = cmp.identifier().replacen("compare", op, 1);
    cmp.map(id, move |c| Some(accept(c)))
}

pub fn number_equal(a: impl Into<Operand>, b: impl Into<Operand>) -> Supplier<bool> {
    compare_with("number_equal", a.into(), b.into(), |c| c == 0)
}

pub fn lower_than(a: impl Into<Operand>, b: impl Into<Operand>) -> Supplier<bool> {
    compare_with("lower_than", a.into(), b.into(), |c| c < 0)
}

pub fn lower_than_equals(a: impl Into<Operand>, b: impl Into<Operand>) -> Supplier<bool> {
    compare_with("lower_than_equals", a.into(), b.into(), |c| c <= 0)
}

pub fn greater_than(a: impl Into<Operand>, b: impl Into<Operand>) -> Supplier<bool> {
    compare_with("greater_than", a.into(), b.into(), |c| c > 0)
}

pub fn greater_than_equals(a: impl Into<Operand>, b: impl Into<Operand>) -> Supplier<bool> {
    compare_with("greater_than_equals", a.into(), b.into(), |c| c >= 0)
}
