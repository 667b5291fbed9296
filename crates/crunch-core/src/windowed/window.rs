use crate::record::{ChannelSet, MRecord};
use crate::supplier::Supplier;

/// Decides whether a record lies inside the current window.
pub trait RecordWindow: Send {
    fn in_window(&mut self, record: &dyn MRecord) -> bool;

    fn channels(&self) -> ChannelSet;
}

#[derive(Debug)]
pub struct BitWindow {
    supplier: Supplier<bool>,
    active_when: bool,
}

impl RecordWindow for BitWindow {
    fn in_window(&mut self, record: &dyn MRecord) -> bool {
        self.supplier.extract(record) == Some(self.active_when)
    }

    fn channels(&self) -> ChannelSet {
        self.supplier.channels().clone()
    }
}

/// Window open while `supplier` is `true`; absence closes it.
pub fn bit_active(supplier: Supplier<bool>) -> BitWindow {
    BitWindow {
        supplier,
        active_when: true,
    }
}

/// Window open while `supplier` is `false`; absence closes it.
pub fn bit_not_active(supplier: Supplier<bool>) -> BitWindow {
    BitWindow {
        supplier,
        active_when: false,
    }
}

pub struct FnWindow<F> {
    f: F,
    channels: ChannelSet,
}

impl<F> FnWindow<F> {
    /// Declare the channels the closure reads.
    pub fn reading(mut self, channels: ChannelSet) -> Self {
        self.channels = channels;
        self
    }
}

impl<F> RecordWindow for FnWindow<F>
where
    F: FnMut(&dyn MRecord) -> bool + Send,
{
    fn in_window(&mut self, record: &dyn MRecord) -> bool {
        (self.f)(record)
    }

    fn channels(&self) -> ChannelSet {
        self.channels.clone()
    }
}

pub fn window_fn<F>(f: F) -> FnWindow<F>
where
    F: FnMut(&dyn MRecord) -> bool + Send,
{
    FnWindow {
        f,
        channels: ChannelSet::new(),
    }
}
