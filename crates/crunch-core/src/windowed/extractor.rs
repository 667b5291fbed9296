use std::collections::BTreeMap;

use super::aggregate::Aggregation;
use crate::error::{CoreResult, config_error};
use crate::event::Event;
use crate::pipe::EvaluationContext;
use crate::record::{ChannelSet, MRecord};
use crate::supplier::Supplier;
use crate::value::Value;

/// Accumulates records while a window is open and emits the result when it
/// closes. One instance lives for exactly one window.
pub trait WindowExtractor: Send {
    fn apply(&mut self, record: &dyn MRecord);

    /// Called once, on the record that closes the window.
    fn finish(&mut self, ctx: &mut dyn EvaluationContext);

    fn channels(&self) -> ChannelSet {
        ChannelSet::new()
    }
}

// ---------------------------------------------------------------------------
// Group finalizers
// ---------------------------------------------------------------------------

/// Turns the aggregated values of a closed window into events.
pub trait GroupFinalizer: Send {
    fn finish(&mut self, aggregated: &BTreeMap<String, Value>, ctx: &mut dyn EvaluationContext);
}

/// Emits one `GROUP_<timestamp>` event carrying every aggregated value.
#[derive(Debug, Default)]
pub struct DefaultGroupFinalizer;

impl GroupFinalizer for DefaultGroupFinalizer {
    fn finish(&mut self, aggregated: &BTreeMap<String, Value>, ctx: &mut dyn EvaluationContext) {
        let record = ctx.get();
        let event = Event::new(
            record.timestamp(),
            format!("GROUP_{}", record.timestamp()),
            record.source(),
        )
        .with_parameters(aggregated.clone());
        ctx.collect(event);
    }
}

// ---------------------------------------------------------------------------
// GroupByExtractor
// ---------------------------------------------------------------------------

struct Slot {
    name: String,
    supplier: Supplier<Value>,
    aggregation: Box<dyn Aggregation>,
}

/// Runs a set of named aggregations over the window and hands the results
/// to a [`GroupFinalizer`].
pub struct GroupByExtractor {
    slots: Vec<Slot>,
    finalizer: Box<dyn GroupFinalizer>,
}

impl GroupByExtractor {
    pub fn builder() -> GroupByExtractorBuilder {
        GroupByExtractorBuilder {
            slots: Vec::new(),
            finalizer: None,
        }
    }
}

impl WindowExtractor for GroupByExtractor {
    fn apply(&mut self, record: &dyn MRecord) {
        for slot in &mut self.slots {
            if let Some(v) = slot.supplier.extract(record) {
                slot.aggregation.aggregate(&v);
            }
        }
    }

    fn finish(&mut self, ctx: &mut dyn EvaluationContext) {
        let aggregated: BTreeMap<String, Value> = self
            .slots
            .iter()
            .filter_map(|s| s.aggregation.result().map(|v| (s.name.clone(), v)))
            .collect();
        self.finalizer.finish(&aggregated, ctx);
    }

    fn channels(&self) -> ChannelSet {
        self.slots
            .iter()
            .flat_map(|s| s.supplier.channels().iter().cloned())
            .collect()
    }
}

pub struct GroupByExtractorBuilder {
    slots: Vec<Slot>,
    finalizer: Option<Box<dyn GroupFinalizer>>,
}

impl GroupByExtractorBuilder {
    /// Aggregate `supplier` under the key `<aggregation>.<supplier>`.
    pub fn aggregate<T: Into<Value> + 'static>(
        self,
        aggregation: Box<dyn Aggregation>,
        supplier: Supplier<T>,
    ) -> Self {
        let name = format!("{}.{}", aggregation.identifier(), supplier.identifier());
        self.aggregate_as(name, aggregation, supplier)
    }

    /// Aggregate `supplier` under an explicit key.
    pub fn aggregate_as<T: Into<Value> + 'static>(
        mut self,
        name: impl Into<String>,
        aggregation: Box<dyn Aggregation>,
        supplier: Supplier<T>,
    ) -> Self {
        self.slots.push(Slot {
            name: name.into(),
            supplier: supplier.into_value(),
            aggregation,
        });
        self
    }

    /// Defaults to [`DefaultGroupFinalizer`].
    pub fn finalizer(mut self, finalizer: impl GroupFinalizer + 'static) -> Self {
        self.finalizer = Some(Box::new(finalizer));
        self
    }

    pub fn build(self) -> CoreResult<GroupByExtractor> {
        if self.slots.is_empty() {
            return Err(config_error("group-by extractor requires at least one aggregation"));
        }
        let mut names: Vec<&str> = self.slots.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        if let Some(w) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(config_error(format!("duplicate aggregation name {:?}", w[0])));
        }
        Ok(GroupByExtractor {
            slots: self.slots,
            finalizer: self
                .finalizer
                .unwrap_or_else(|| Box::new(DefaultGroupFinalizer)),
        })
    }
}
