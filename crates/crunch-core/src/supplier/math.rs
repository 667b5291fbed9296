use super::{Supplier, zip_with};

/// A numeric operand: either a literal or a supplier. Long suppliers are
/// widened to double.
#[derive(Debug, Clone)]
pub enum Operand {
    Literal(f64),
    Supplier(Supplier<f64>),
}

impl Operand {
    pub(crate) fn into_supplier(self) -> Supplier<f64> {
        match self {
            Operand::Literal(v) => Supplier::constant(v.to_string(), v),
            Operand::Supplier(s) => s,
        }
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Literal(v)
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Literal(v as f64)
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Literal(f64::from(v))
    }
}

impl From<Supplier<f64>> for Operand {
    fn from(s: Supplier<f64>) -> Self {
        Operand::Supplier(s)
    }
}

impl From<Supplier<i64>> for Operand {
    fn from(s: Supplier<i64>) -> Self {
        let id = s.identifier().to_string();
        Operand::Supplier(s.map(id, |n| Some(n as f64)))
    }
}

fn arithmetic(
    op: &str,
    a: Operand,
    b: Operand,
    f: fn(f64, f64) -> f64,
) -> Supplier<f64> {
    let (a, b) = (a.into_supplier(), b.into_supplier());
    let id = format!("{op}({},{})", a.identifier(), b.identifier());
    zip_with(id, a, b, move |x, y| Some(f(x?, y?)))
}

pub fn add(a: impl Into<Operand>, b: impl Into<Operand>) -> Supplier<f64> {
    arithmetic("add", a.into(), b.into(), |x, y| x + y)
}

pub fn subtract(a: impl Into<Operand>, b: impl Into<Operand>) -> Supplier<f64> {
    arithmetic("subtract", a.into(), b.into(), |x, y| x - y)
}

pub fn multiply(a: impl Into<Operand>, b: impl Into<Operand>) -> Supplier<f64> {
    arithmetic("multiply", a.into(), b.into(), |x, y| x * y)
}

/// IEEE division: a zero divisor yields an infinite or NaN result, not absence.
pub fn divide(a: impl Into<Operand>, b: impl Into<Operand>) -> Supplier<f64> {
    arithmetic("divide", a.into(), b.into(), |x, y| x / y)
}
