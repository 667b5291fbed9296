use super::Supplier;
use crate::value::Value;

pub fn cast_to_long<T: Into<Value> + 'static>(value: Supplier<T>) -> Supplier<i64> {
    let id = format!("cast_to_long({})", value.identifier());
    value.map(id, |v| v.into().cast_long())
}

pub fn cast_to_double<T: Into<Value> + 'static>(value: Supplier<T>) -> Supplier<f64> {
    let id = format!("cast_to_double({})", value.identifier());
    value.map(id, |v| v.into().cast_double())
}

pub fn cast_to_string<T: Into<Value> + 'static>(value: Supplier<T>) -> Supplier<String> {
    let id = format!("cast_to_string({})", value.identifier());
    value.map(id, |v| Some(v.into().cast_string()))
}

/// Parse the text of a string channel; absent when it is not an integer.
pub fn parse_long(value: Supplier<String>) -> Supplier<i64> {
    let id = format!("parse_long({})", value.identifier());
    value.map(id, |s| s.trim().parse().ok())
}

/// Parse the text of a string channel; absent when it is not a number.
pub fn parse_double(value: Supplier<String>) -> Supplier<f64> {
    let id = format!("parse_double({})", value.identifier());
    value.map(id, |s| s.trim().parse().ok())
}
