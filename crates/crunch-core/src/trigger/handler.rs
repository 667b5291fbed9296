use std::collections::BTreeMap;

use crate::event::Event;
use crate::pipe::EvaluationContext;
use crate::record::{ChannelSet, MRecord};
use crate::supplier::Supplier;
use crate::value::Value;

/// Produces candidate events once a trigger fires.
pub trait TriggerHandler: Send {
    fn handle(&mut self, ctx: &mut dyn EvaluationContext);

    fn channels(&self) -> ChannelSet {
        ChannelSet::new()
    }
}

// ---------------------------------------------------------------------------
// Map extractors
// ---------------------------------------------------------------------------

/// Pulls a set of named values out of the current record.
pub trait MapExtractor: Send {
    fn extract(&mut self, record: &dyn MRecord) -> BTreeMap<String, Value>;

    fn channels(&self) -> ChannelSet;
}

/// Extracts one entry per supplier. Absent values are left out.
#[derive(Debug)]
pub struct ChannelMapExtractor {
    entries: Vec<(Supplier<Value>, String)>,
}

impl ChannelMapExtractor {
    /// Key each value by its supplier's identifier.
    pub fn new(suppliers: impl IntoIterator<Item = Supplier<Value>>) -> Self {
        Self {
            entries: suppliers
                .into_iter()
                .map(|s| {
                    let key = s.identifier().to_string();
                    (s, key)
                })
                .collect(),
        }
    }

    /// Key each value by an explicit name.
    pub fn with_mapping<K: Into<String>>(
        mapping: impl IntoIterator<Item = (Supplier<Value>, K)>,
    ) -> Self {
        Self {
            entries: mapping.into_iter().map(|(s, k)| (s, k.into())).collect(),
        }
    }
}

impl MapExtractor for ChannelMapExtractor {
    fn extract(&mut self, record: &dyn MRecord) -> BTreeMap<String, Value> {
        self.entries
            .iter()
            .filter_map(|(s, key)| s.extract(record).map(|v| (key.clone(), v)))
            .collect()
    }

    fn channels(&self) -> ChannelSet {
        self.entries
            .iter()
            .flat_map(|(s, _)| s.channels().iter().cloned())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ExtractorTriggerHandler
// ---------------------------------------------------------------------------

/// Emits one event named `event_name` whose parameters are the union of all
/// extractor results. Later extractors win on key collision.
pub struct ExtractorTriggerHandler {
    event_name: String,
    extractors: Vec<Box<dyn MapExtractor>>,
}

impl ExtractorTriggerHandler {
    pub fn new(event_name: impl Into<String>) -> Self {
        Self {
            event_name: event_name.into(),
            extractors: Vec::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: impl MapExtractor + 'static) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }
}

impl TriggerHandler for ExtractorTriggerHandler {
    fn handle(&mut self, ctx: &mut dyn EvaluationContext) {
        let record = ctx.get();
        let mut parameters = BTreeMap::new();
        for extractor in &mut self.extractors {
            parameters.extend(extractor.extract(record));
        }
        let event = Event::new(record.timestamp(), self.event_name.clone(), record.source())
            .with_parameters(parameters);
        ctx.collect(event);
    }

    fn channels(&self) -> ChannelSet {
        self.extractors.iter().flat_map(|e| e.channels()).collect()
    }
}

// ---------------------------------------------------------------------------
// Closure handler
// ---------------------------------------------------------------------------

pub struct FnHandler<F> {
    f: F,
    channels: ChannelSet,
}

impl<F> FnHandler<F> {
    /// Declare the channels the closure reads.
    pub fn reading(mut self, channels: ChannelSet) -> Self {
        self.channels = channels;
        self
    }
}

impl<F> TriggerHandler for FnHandler<F>
where
    F: FnMut(&mut dyn EvaluationContext) + Send,
{
    fn handle(&mut self, ctx: &mut dyn EvaluationContext) {
        (self.f)(ctx)
    }

    fn channels(&self) -> ChannelSet {
        self.channels.clone()
    }
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: FnMut(&mut dyn EvaluationContext) + Send,
{
    FnHandler {
        f,
        channels: ChannelSet::new(),
    }
}
