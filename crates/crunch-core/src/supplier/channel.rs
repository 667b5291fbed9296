use chrono::{DateTime, Utc};

use super::Supplier;
use crate::record::channel_set;
use crate::value::Value;

/// The raw typed value of channel `name`.
pub fn channel(name: impl Into<String>) -> Supplier<Value> {
    let name = name.into();
    let key = name.clone();
    Supplier::new(name.clone(), channel_set([name]), move |r| r.value(&key))
}

pub fn boolean_channel(name: impl Into<String>) -> Supplier<bool> {
    let name = name.into();
    let key = name.clone();
    Supplier::new(name.clone(), channel_set([name]), move |r| r.get_bool(&key))
}

pub fn long_channel(name: impl Into<String>) -> Supplier<i64> {
    let name = name.into();
    let key = name.clone();
    Supplier::new(name.clone(), channel_set([name]), move |r| r.get_long(&key))
}

/// Doubles, and longs widened to double.
pub fn double_channel(name: impl Into<String>) -> Supplier<f64> {
    let name = name.into();
    let key = name.clone();
    Supplier::new(name.clone(), channel_set([name]), move |r| {
        r.get_double(&key)
    })
}

pub fn string_channel(name: impl Into<String>) -> Supplier<String> {
    let name = name.into();
    let key = name.clone();
    Supplier::new(name.clone(), channel_set([name]), move |r| {
        r.get_string(&key)
    })
}

pub fn date_channel(name: impl Into<String>) -> Supplier<DateTime<Utc>> {
    let name = name.into();
    let key = name.clone();
    Supplier::new(name.clone(), channel_set([name]), move |r| r.get_date(&key))
}
