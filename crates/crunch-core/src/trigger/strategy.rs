use crate::record::{ChannelSet, MRecord};
use crate::supplier::Supplier;

/// Decides, per record, whether a trigger fires.
///
/// Strategies may remember earlier decision bases (edge detection), so they
/// take `&mut self`.
pub trait TriggerStrategy: Send {
    fn is_to_be_triggered(&mut self, record: &dyn MRecord) -> bool;

    fn channels(&self) -> ChannelSet;
}

// ---------------------------------------------------------------------------
// Level strategies
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct OnValue {
    supplier: Supplier<bool>,
    expected: bool,
}

impl TriggerStrategy for OnValue {
    fn is_to_be_triggered(&mut self, record: &dyn MRecord) -> bool {
        self.supplier.extract(record) == Some(self.expected)
    }

    fn channels(&self) -> ChannelSet {
        self.supplier.channels().clone()
    }
}

/// Fires on every record where `supplier` is `true`.
pub fn on_true(supplier: Supplier<bool>) -> OnValue {
    OnValue {
        supplier,
        expected: true,
    }
}

/// Fires on every record where `supplier` is `false`.
pub fn on_false(supplier: Supplier<bool>) -> OnValue {
    OnValue {
        supplier,
        expected: false,
    }
}

// ---------------------------------------------------------------------------
// Edge strategies
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct OnBecome {
    supplier: Supplier<bool>,
    expected: bool,
    last: Option<bool>,
}

impl TriggerStrategy for OnBecome {
    fn is_to_be_triggered(&mut self, record: &dyn MRecord) -> bool {
        let current = self.supplier.extract(record);
        let fired = self.last == Some(!self.expected) && current == Some(self.expected);
        self.last = current;
        fired
    }

    fn channels(&self) -> ChannelSet {
        self.supplier.channels().clone()
    }
}

/// Fires when `supplier` goes from `false` to `true` between consecutive
/// records.
pub fn on_become_true(supplier: Supplier<bool>) -> OnBecome {
    OnBecome {
        supplier,
        expected: true,
        last: None,
    }
}

/// Fires when `supplier` goes from `true` to `false` between consecutive
/// records.
pub fn on_become_false(supplier: Supplier<bool>) -> OnBecome {
    OnBecome {
        supplier,
        expected: false,
        last: None,
    }
}

#[derive(Debug)]
pub struct OnChange<T> {
    supplier: Supplier<T>,
    last: Option<T>,
}

impl<T: PartialEq + Send + 'static> TriggerStrategy for OnChange<T> {
    fn is_to_be_triggered(&mut self, record: &dyn MRecord) -> bool {
        // absence neither fires nor forgets the last known value
        let Some(current) = self.supplier.extract(record) else {
            return false;
        };
        let fired = self.last.as_ref().is_some_and(|last| *last != current);
        self.last = Some(current);
        fired
    }

    fn channels(&self) -> ChannelSet {
        self.supplier.channels().clone()
    }
}

/// Fires when the value of `supplier` differs from its last known value.
pub fn on_change<T: PartialEq + Send + 'static>(supplier: Supplier<T>) -> OnChange<T> {
    OnChange {
        supplier,
        last: None,
    }
}

// ---------------------------------------------------------------------------
// Presence strategies
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct OnPresence<T> {
    supplier: Supplier<T>,
    present: bool,
}

impl<T: Send + 'static> TriggerStrategy for OnPresence<T> {
    fn is_to_be_triggered(&mut self, record: &dyn MRecord) -> bool {
        self.supplier.extract(record).is_some() == self.present
    }

    fn channels(&self) -> ChannelSet {
        self.supplier.channels().clone()
    }
}

/// Fires when `supplier` is absent.
pub fn on_null<T: Send + 'static>(supplier: Supplier<T>) -> OnPresence<T> {
    OnPresence {
        supplier,
        present: false,
    }
}

/// Fires when `supplier` yields a value.
pub fn on_not_null<T: Send + 'static>(supplier: Supplier<T>) -> OnPresence<T> {
    OnPresence {
        supplier,
        present: true,
    }
}

// ---------------------------------------------------------------------------
// Closure strategy
// ---------------------------------------------------------------------------

pub struct FnStrategy<F> {
    f: F,
    channels: ChannelSet,
}

impl<F> FnStrategy<F> {
    /// Declare the channels the closure reads.
    pub fn reading(mut self, channels: ChannelSet) -> Self {
        self.channels = channels;
        self
    }
}

impl<F> TriggerStrategy for FnStrategy<F>
where
    F: FnMut(&dyn MRecord) -> bool + Send,
{
    fn is_to_be_triggered(&mut self, record: &dyn MRecord) -> bool {
        (self.f)(record)
    }

    fn channels(&self) -> ChannelSet {
        self.channels.clone()
    }
}

/// A strategy backed by a closure; reads no channels unless declared with
/// [`FnStrategy::reading`].
pub fn strategy_fn<F>(f: F) -> FnStrategy<F>
where
    F: FnMut(&dyn MRecord) -> bool + Send,
{
    FnStrategy {
        f,
        channels: ChannelSet::new(),
    }
}
