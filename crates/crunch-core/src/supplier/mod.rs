//! Composable, declarative functions over a record.
//!
//! A [`Supplier`] extracts an optional value from an [`MRecord`] and declares
//! which channels it reads. Every combinator propagates absence: a missing
//! operand yields a missing result unless the combinator says otherwise
//! (three-valued `and` / `or`).

mod channel;
mod compare;
mod convert;
mod logic;
mod math;

use std::fmt;
use std::sync::Arc;

use crate::record::{ChannelSet, MRecord};
use crate::value::Value;

pub use channel::{
    boolean_channel, channel, date_channel, double_channel, long_channel, string_channel,
};
pub use compare::{
    TextOperand, compare, contains, equal, greater_than, greater_than_equals, length,
    lower_than, lower_than_equals, matches, number_equal,
};
pub use convert::{cast_to_double, cast_to_long, cast_to_string, parse_double, parse_long};
pub use logic::{and, not, or};
pub use math::{Operand, add, divide, multiply, subtract};

type ExtractFn<T> = dyn Fn(&dyn MRecord) -> Option<T> + Send + Sync;

/// A named, channel-declaring extraction from a record.
pub struct Supplier<T> {
    identifier: String,
    extract: Arc<ExtractFn<T>>,
    channels: ChannelSet,
}

impl<T> Clone for Supplier<T> {
    fn clone(&self) -> Self {
        Self {
            identifier: self.identifier.clone(),
            extract: Arc::clone(&self.extract),
            channels: self.channels.clone(),
        }
    }
}

impl<T> fmt::Debug for Supplier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supplier")
            .field("identifier", &self.identifier)
            .field("channels", &self.channels)
            .finish()
    }
}

impl<T: 'static> Supplier<T> {
    pub fn new<F>(identifier: impl Into<String>, channels: ChannelSet, extract: F) -> Self
    where
        F: Fn(&dyn MRecord) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            identifier: identifier.into(),
            extract: Arc::new(extract),
            channels,
        }
    }

    /// A supplier that ignores the record and always yields `value`.
    pub fn constant(identifier: impl Into<String>, value: T) -> Self
    where
        T: Clone + Send + Sync,
    {
        Self::new(identifier, ChannelSet::new(), move |_| Some(value.clone()))
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn extract(&self, record: &dyn MRecord) -> Option<T> {
        (self.extract)(record)
    }

    /// Derive a new supplier reading the same channels.
    pub fn map<U, F>(self, identifier: impl Into<String>, f: F) -> Supplier<U>
    where
        U: 'static,
        F: Fn(T) -> Option<U> + Send + Sync + 'static,
    {
        let inner = self.extract;
        Supplier::new(identifier, self.channels, move |r| inner(r).and_then(&f))
    }
}

impl<T: Into<Value> + 'static> Supplier<T> {
    /// Widen to a [`Value`] supplier with the same identifier and channels.
    pub fn into_value(self) -> Supplier<Value> {
        let id = self.identifier.clone();
        self.map(id, |v| Some(v.into()))
    }
}

/// Combine two suppliers; the result reads the union of both channel sets.
/// `f` sees both operands, absent or not, so it decides how absence
/// propagates.
pub(crate) fn zip_with<A, B, R, F>(
    identifier: String,
    a: Supplier<A>,
    b: Supplier<B>,
    f: F,
) -> Supplier<R>
where
    A: 'static,
    B: 'static,
    R: 'static,
    F: Fn(Option<A>, Option<B>) -> Option<R> + Send + Sync + 'static,
{
    let channels = a.channels.union(&b.channels).cloned().collect();
    let (ea, eb) = (a.extract, b.extract);
    Supplier::new(identifier, channels, move |r| f(ea(r), eb(r)))
}
