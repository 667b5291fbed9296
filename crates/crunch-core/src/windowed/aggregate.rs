//! Value aggregations and the arithmetic they are built on.

use std::cmp::Ordering;

use crate::value::Value;

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

/// Order two values.
///
/// Numbers compare as doubles, dates by instant, strings lexically. A string
/// against any other scalar compares the textual forms. `None` when the
/// values are not comparable.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Str(_), _) | (_, Value::Str(_)) => Some(a.to_string().cmp(&b.to_string())),
        _ => a.as_double()?.partial_cmp(&b.as_double()?),
    }
}

pub fn add(a: &Value, b: &Value) -> Option<f64> {
    Some(a.as_double()? + b.as_double()?)
}

pub fn subtract(a: &Value, b: &Value) -> Option<f64> {
    Some(a.as_double()? - b.as_double()?)
}

pub fn multiply(a: &Value, b: &Value) -> Option<f64> {
    Some(a.as_double()? * b.as_double()?)
}

pub fn divide(a: &Value, b: &Value) -> Option<f64> {
    Some(a.as_double()? / b.as_double()?)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Stateful fold over the values seen in one window.
pub trait Aggregation: Send {
    fn identifier(&self) -> &str;

    fn aggregate(&mut self, value: &Value);

    /// `None` until a usable value has been aggregated (except `count`).
    fn result(&self) -> Option<Value>;
}

struct Extreme {
    keep: Ordering,
    current: Option<Value>,
}

impl Aggregation for Extreme {
    fn identifier(&self) -> &str {
        if self.keep == Ordering::Greater { "max" } else { "min" }
    }

    fn aggregate(&mut self, value: &Value) {
        let replace = match &self.current {
            None => true,
            Some(cur) => compare(value, cur) == Some(self.keep),
        };
        if replace {
            self.current = Some(value.clone());
        }
    }

    fn result(&self) -> Option<Value> {
        self.current.clone()
    }
}

#[derive(Default)]
struct Sum {
    total: Option<f64>,
}

impl Aggregation for Sum {
    fn identifier(&self) -> &str {
        "sum"
    }

    fn aggregate(&mut self, value: &Value) {
        if let Some(v) = value.as_double() {
            self.total = Some(self.total.unwrap_or(0.0) + v);
        }
    }

    fn result(&self) -> Option<Value> {
        self.total.map(Value::Double)
    }
}

#[derive(Default)]
struct Avg {
    total: f64,
    n: u64,
}

impl Aggregation for Avg {
    fn identifier(&self) -> &str {
        "avg"
    }

    fn aggregate(&mut self, value: &Value) {
        if let Some(v) = value.as_double() {
            self.total += v;
            self.n += 1;
        }
    }

    fn result(&self) -> Option<Value> {
        (self.n > 0).then(|| Value::Double(self.total / self.n as f64))
    }
}

#[derive(Default)]
struct Count {
    n: i64,
}

impl Aggregation for Count {
    fn identifier(&self) -> &str {
        "count"
    }

    fn aggregate(&mut self, _value: &Value) {
        self.n += 1;
    }

    fn result(&self) -> Option<Value> {
        Some(Value::Long(self.n))
    }
}

struct Pick {
    first: bool,
    current: Option<Value>,
}

impl Aggregation for Pick {
    fn identifier(&self) -> &str {
        if self.first { "first" } else { "last" }
    }

    fn aggregate(&mut self, value: &Value) {
        if !self.first || self.current.is_none() {
            self.current = Some(value.clone());
        }
    }

    fn result(&self) -> Option<Value> {
        self.current.clone()
    }
}

pub fn max() -> Box<dyn Aggregation> {
    Box::new(Extreme {
        keep: Ordering::Greater,
        current: None,
    })
}

pub fn min() -> Box<dyn Aggregation> {
    Box::new(Extreme {
        keep: Ordering::Less,
        current: None,
    })
}

pub fn sum() -> Box<dyn Aggregation> {
    Box::new(Sum::default())
}

pub fn avg() -> Box<dyn Aggregation> {
    Box::new(Avg::default())
}

pub fn count() -> Box<dyn Aggregation> {
    Box::new(Count::default())
}

pub fn first() -> Box<dyn Aggregation> {
    Box::new(Pick {
        first: true,
        current: None,
    })
}

pub fn last() -> Box<dyn Aggregation> {
    Box::new(Pick {
        first: false,
        current: None,
    })
}
