use crate::event::Event;
use crate::pipe::EvaluationContext;
use crate::record::{ChannelSet, MRecord};
use crate::supplier::Supplier;

/// Decides whether a candidate event reaches the output collector.
pub trait EventFilter: Send {
    fn apply(&mut self, event: &Event, record: &dyn MRecord) -> bool;

    fn channels(&self) -> ChannelSet;
}

/// Forward every candidate that passes all `filters` into `ctx`.
pub(crate) fn forward_filtered(
    filters: &mut [Box<dyn EventFilter>],
    candidates: Vec<Event>,
    ctx: &mut dyn EvaluationContext,
) {
    for event in candidates {
        let keep = filters.iter_mut().all(|f| f.apply(&event, ctx.get()));
        if keep {
            ctx.collect(event);
        } else {
            log::trace!("event {:?} filtered out", event.name());
        }
    }
}

// ---------------------------------------------------------------------------
// OnValueChanged
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct OnValueChanged<T> {
    supplier: Supplier<T>,
    last: Option<Option<T>>,
}

impl<T: PartialEq + Send + 'static> EventFilter for OnValueChanged<T> {
    fn apply(&mut self, _event: &Event, record: &dyn MRecord) -> bool {
        let current = self.supplier.extract(record);
        let keep = match &self.last {
            None => false,
            Some(last) => *last != current,
        };
        self.last = Some(current);
        keep
    }

    fn channels(&self) -> ChannelSet {
        self.supplier.channels().clone()
    }
}

/// Keeps an event only when `supplier` changed since the previous candidate.
/// The first candidate never passes.
pub fn on_value_changed<T: PartialEq + Send + 'static>(supplier: Supplier<T>) -> OnValueChanged<T> {
    OnValueChanged {
        supplier,
        last: None,
    }
}

// ---------------------------------------------------------------------------
// Closure filter
// ---------------------------------------------------------------------------

pub struct FnFilter<F> {
    f: F,
    channels: ChannelSet,
}

impl<F> FnFilter<F> {
    /// Declare the channels the closure reads.
    pub fn reading(mut self, channels: ChannelSet) -> Self {
        self.channels = channels;
        self
    }
}

impl<F> EventFilter for FnFilter<F>
where
    F: FnMut(&Event, &dyn MRecord) -> bool + Send,
{
    fn apply(&mut self, event: &Event, record: &dyn MRecord) -> bool {
        (self.f)(event, record)
    }

    fn channels(&self) -> ChannelSet {
        self.channels.clone()
    }
}

pub fn filter_fn<F>(f: F) -> FnFilter<F>
where
    F: FnMut(&Event, &dyn MRecord) -> bool + Send,
{
    FnFilter {
        f,
        channels: ChannelSet::new(),
    }
}
