use std::collections::BTreeMap;

use super::failure::StepFailure;
use crate::event::Event;
use crate::pipe::EvaluationContext;
use crate::record::ChannelSet;

/// Step results keyed by step alias.
pub type StepResults = BTreeMap<String, Event>;

/// Called with whatever partial results exist when a pass fails.
pub trait ErrorExtractor: Send {
    fn process(
        &mut self,
        results: &StepResults,
        failure: &StepFailure,
        ctx: &mut dyn EvaluationContext,
    );

    fn channels(&self) -> ChannelSet {
        ChannelSet::new()
    }
}

/// Called with the full results once the last step produced its result.
pub trait CompletionExtractor: Send {
    fn process(&mut self, results: &StepResults, ctx: &mut dyn EvaluationContext);

    fn channels(&self) -> ChannelSet {
        ChannelSet::new()
    }
}

pub struct FnErrorExtractor<F> {
    f: F,
    channels: ChannelSet,
}

impl<F> FnErrorExtractor<F> {
    pub fn reading(mut self, channels: ChannelSet) -> Self {
        self.channels = channels;
        self
    }
}

impl<F> ErrorExtractor for FnErrorExtractor<F>
where
    F: FnMut(&StepResults, &StepFailure, &mut dyn EvaluationContext) + Send,
{
    fn process(
        &mut self,
        results: &StepResults,
        failure: &StepFailure,
        ctx: &mut dyn EvaluationContext,
    ) {
        (self.f)(results, failure, ctx)
    }

    fn channels(&self) -> ChannelSet {
        self.channels.clone()
    }
}

pub fn error_extractor_fn<F>(f: F) -> FnErrorExtractor<F>
where
    F: FnMut(&StepResults, &StepFailure, &mut dyn EvaluationContext) + Send,
{
    FnErrorExtractor {
        f,
        channels: ChannelSet::new(),
    }
}

pub struct FnCompletionExtractor<F> {
    f: F,
    channels: ChannelSet,
}

impl<F> FnCompletionExtractor<F> {
    pub fn reading(mut self, channels: ChannelSet) -> Self {
        self.channels = channels;
        self
    }
}

impl<F> CompletionExtractor for FnCompletionExtractor<F>
where
    F: FnMut(&StepResults, &mut dyn EvaluationContext) + Send,
{
    fn process(&mut self, results: &StepResults, ctx: &mut dyn EvaluationContext) {
        (self.f)(results, ctx)
    }

    fn channels(&self) -> ChannelSet {
        self.channels.clone()
    }
}

pub fn completion_extractor_fn<F>(f: F) -> FnCompletionExtractor<F>
where
    F: FnMut(&StepResults, &mut dyn EvaluationContext) + Send,
{
    FnCompletionExtractor {
        f,
        channels: ChannelSet::new(),
    }
}
