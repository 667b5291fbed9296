//! Trigger-based emission: a strategy decides, a handler produces candidate
//! events, filters decide which candidates are kept.

mod filter;
mod handler;
mod strategy;

pub use filter::{EventFilter, FnFilter, OnValueChanged, filter_fn, on_value_changed};
pub(crate) use filter::forward_filtered;
pub use handler::{
    ChannelMapExtractor, ExtractorTriggerHandler, FnHandler, MapExtractor, TriggerHandler,
    handler_fn,
};
pub use strategy::{
    FnStrategy, OnBecome, OnChange, OnPresence, OnValue, TriggerStrategy, on_become_false,
    on_become_true, on_change, on_false, on_not_null, on_null, on_true, strategy_fn,
};

use crate::error::{CoreResult, config_error};
use crate::pipe::{EvaluationContext, EvaluationFunction, SimpleEvaluationContext};
use crate::record::ChannelSet;

pub struct TriggerEvaluationFunction {
    strategy: Box<dyn TriggerStrategy>,
    handler: Box<dyn TriggerHandler>,
    filters: Vec<Box<dyn EventFilter>>,
}

impl TriggerEvaluationFunction {
    pub fn builder() -> TriggerEvaluationFunctionBuilder {
        TriggerEvaluationFunctionBuilder::default()
    }
}

impl EvaluationFunction for TriggerEvaluationFunction {
    fn eval(&mut self, ctx: &mut dyn EvaluationContext) -> CoreResult<()> {
        if !self.strategy.is_to_be_triggered(ctx.get()) {
            return Ok(());
        }

        let candidates = {
            let mut inner = SimpleEvaluationContext::new(ctx.get());
            self.handler.handle(&mut inner);
            inner.into_events()
        };
        forward_filtered(&mut self.filters, candidates, ctx);
        Ok(())
    }

    fn channels(&self) -> ChannelSet {
        let mut channels = self.strategy.channels();
        channels.extend(self.handler.channels());
        for f in &self.filters {
            channels.extend(f.channels());
        }
        channels
    }
}

#[derive(Default)]
pub struct TriggerEvaluationFunctionBuilder {
    strategy: Option<Box<dyn TriggerStrategy>>,
    handler: Option<Box<dyn TriggerHandler>>,
    filters: Vec<Box<dyn EventFilter>>,
}

impl TriggerEvaluationFunctionBuilder {
    pub fn strategy(mut self, strategy: impl TriggerStrategy + 'static) -> Self {
        self.strategy = Some(Box::new(strategy));
        self
    }

    pub fn handler(mut self, handler: impl TriggerHandler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn filter(mut self, filter: impl EventFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn build(self) -> CoreResult<TriggerEvaluationFunction> {
        let strategy = self
            .strategy
            .ok_or_else(|| config_error("trigger function requires a strategy"))?;
        let handler = self
            .handler
            .ok_or_else(|| config_error("trigger function requires a handler"))?;
        Ok(TriggerEvaluationFunction {
            strategy,
            handler,
            filters: self.filters,
        })
    }
}
