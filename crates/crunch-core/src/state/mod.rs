//! Multi-step evaluation: a linear, timeout-guarded chain of evaluation
//! functions.
//!
//! Each step wraps an arbitrary [`EvaluationFunction`]. The first event a
//! step emits is stored under the step's alias and moves the chain on; the
//! last step's result hands the complete map to the completion extractor.
//! Deadlines are event-time only and are checked when a record arrives, so
//! a stalled stream never times out on its own.

mod extractor;
mod failure;

pub use extractor::{
    CompletionExtractor, ErrorExtractor, FnCompletionExtractor, FnErrorExtractor, StepResults,
    completion_extractor_fn, error_extractor_fn,
};
pub use failure::{FailureKind, StepFailure};

use std::collections::BTreeSet;

use crate::error::{CoreResult, config_error};
use crate::event::Event;
use crate::pipe::{EvaluationContext, EvaluationFunction, EvaluationFunctionDef};
use crate::record::{ChannelSet, MRecord};

/// Step and overall timeout used when none is given: one hour.
pub const DEFAULT_TIMEOUT_MS: i64 = 3_600_000;

#[derive(Debug, Clone)]
struct Step {
    alias: String,
    def: EvaluationFunctionDef,
    timeout_ms: i64,
}

// ---------------------------------------------------------------------------
// StepContext — inner context handed to the active step
// ---------------------------------------------------------------------------

/// Binds the current record to the active step's alias: every collected
/// event is stored in the result map under that alias.
struct StepContext<'a> {
    record: &'a dyn MRecord,
    alias: &'a str,
    results: &'a mut StepResults,
    produced: usize,
}

impl EvaluationContext for StepContext<'_> {
    fn get(&self) -> &dyn MRecord {
        self.record
    }

    fn collect(&mut self, event: Event) {
        self.results.insert(self.alias.to_string(), event);
        self.produced += 1;
    }
}

// ---------------------------------------------------------------------------
// MultiStepEvaluationFunction
// ---------------------------------------------------------------------------

pub struct MultiStepEvaluationFunction {
    steps: Vec<Step>,
    overall_timeout_ms: i64,
    error_extractor: Box<dyn ErrorExtractor>,
    completion_extractor: Box<dyn CompletionExtractor>,
    channels: ChannelSet,

    current_step: usize,
    active: Box<dyn EvaluationFunction>,
    results: StepResults,
    results_seen: usize,
    overall_deadline: Option<i64>,
    step_deadline: Option<i64>,
    /// Set while `active` is closed and step 0 still has to be recreated.
    rebuild_pending: bool,
}

impl MultiStepEvaluationFunction {
    pub fn builder() -> MultiStepEvaluationFunctionBuilder {
        MultiStepEvaluationFunctionBuilder::default()
    }

    /// Index of the active step, 0-based.
    pub fn current_step(&self) -> usize {
        self.current_step
    }

    /// Steps completed in the current pass.
    pub fn results_seen(&self) -> usize {
        self.results_seen
    }

    pub fn results(&self) -> &StepResults {
        &self.results
    }

    pub fn step_deadline(&self) -> Option<i64> {
        self.step_deadline
    }

    pub fn overall_deadline(&self) -> Option<i64> {
        self.overall_deadline
    }

    fn check_deadlines(&self, timestamp: i64) -> Result<(), StepFailure> {
        if self.step_deadline.is_some_and(|d| d <= timestamp) {
            return Err(StepFailure::StepTimeout);
        }
        if self.overall_deadline.is_some_and(|d| d <= timestamp) {
            return Err(StepFailure::OverallTimeout);
        }
        Ok(())
    }

    /// One transition. Every failure is returned, never handled here.
    fn advance(&mut self, ctx: &mut dyn EvaluationContext) -> Result<(), StepFailure> {
        let timestamp = ctx.get().timestamp();
        self.check_deadlines(timestamp)?;

        let produced = {
            let mut inner = StepContext {
                record: ctx.get(),
                alias: &self.steps[self.current_step].alias,
                results: &mut self.results,
                produced: 0,
            };
            self.active
                .eval(&mut inner)
                .map_err(StepFailure::Evaluation)?;
            inner.produced
        };
        if produced == 0 {
            return Ok(());
        }

        self.results_seen += 1;
        if self.overall_deadline.is_none() {
            self.overall_deadline = Some(timestamp.saturating_add(self.overall_timeout_ms));
        }

        let next = self.current_step + 1;
        if next == self.steps.len() {
            log::debug!("multi-step complete with {} results", self.results.len());
            self.completion_extractor.process(&self.results, ctx);
            self.reset().map_err(StepFailure::Evaluation)?;
        } else {
            log::debug!(
                "multi-step advancing from {:?} to {:?}",
                self.steps[self.current_step].alias,
                self.steps[next].alias
            );
            self.step_deadline = Some(timestamp.saturating_add(self.steps[next].timeout_ms));
            self.active.close();
            self.active = self.steps[next].def.create().map_err(StepFailure::Evaluation)?;
            self.active.init();
            self.current_step = next;
        }
        Ok(())
    }

    /// Back to step 0 with no results and no deadlines, then a fresh step 0
    /// instance. The state is cleared even if the instance cannot be built;
    /// the next record retries the build.
    fn reset(&mut self) -> CoreResult<()> {
        self.current_step = 0;
        self.results.clear();
        self.results_seen = 0;
        self.overall_deadline = None;
        self.step_deadline = None;
        self.active.close();
        self.rebuild_pending = true;
        self.rebuild_first_step()
    }

    fn rebuild_first_step(&mut self) -> CoreResult<()> {
        self.active = self.steps[0].def.create()?;
        self.active.init();
        self.rebuild_pending = false;
        Ok(())
    }
}

impl EvaluationFunction for MultiStepEvaluationFunction {
    fn init(&mut self) {
        self.active.init();
    }

    fn eval(&mut self, ctx: &mut dyn EvaluationContext) -> CoreResult<()> {
        if self.rebuild_pending {
            self.rebuild_first_step()?;
        }
        if let Err(failure) = self.advance(ctx) {
            log::debug!(
                "multi-step failed at step {} ({failure}); resetting",
                self.current_step
            );
            self.error_extractor.process(&self.results, &failure, ctx);
            self.reset()?;
        }
        Ok(())
    }

    fn close(&mut self) {
        if !self.rebuild_pending {
            self.active.close();
        }
    }

    fn channels(&self) -> ChannelSet {
        self.channels.clone()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct MultiStepEvaluationFunctionBuilder {
    steps: Vec<Step>,
    overall_timeout_ms: i64,
    error_extractor: Option<Box<dyn ErrorExtractor>>,
    completion_extractor: Option<Box<dyn CompletionExtractor>>,
}

impl Default for MultiStepEvaluationFunctionBuilder {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            overall_timeout_ms: DEFAULT_TIMEOUT_MS,
            error_extractor: None,
            completion_extractor: None,
        }
    }
}

impl MultiStepEvaluationFunctionBuilder {
    /// Append a step with the default one-hour timeout.
    pub fn add_step(self, def: EvaluationFunctionDef, alias: impl Into<String>) -> Self {
        self.add_step_with_timeout(def, alias, DEFAULT_TIMEOUT_MS)
    }

    /// Append a step. `timeout_ms` bounds the time between the previous
    /// step's result and this step's result.
    pub fn add_step_with_timeout(
        mut self,
        def: EvaluationFunctionDef,
        alias: impl Into<String>,
        timeout_ms: i64,
    ) -> Self {
        self.steps.push(Step {
            alias: alias.into(),
            def,
            timeout_ms,
        });
        self
    }

    pub fn with_overall_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.overall_timeout_ms = timeout_ms;
        self
    }

    pub fn error_extractor(mut self, extractor: impl ErrorExtractor + 'static) -> Self {
        self.error_extractor = Some(Box::new(extractor));
        self
    }

    pub fn error_extractor_fn<F>(self, f: F) -> Self
    where
        F: FnMut(&StepResults, &StepFailure, &mut dyn EvaluationContext) + Send + 'static,
    {
        self.error_extractor(error_extractor_fn(f))
    }

    pub fn completion_extractor(mut self, extractor: impl CompletionExtractor + 'static) -> Self {
        self.completion_extractor = Some(Box::new(extractor));
        self
    }

    pub fn completion_extractor_fn<F>(self, f: F) -> Self
    where
        F: FnMut(&StepResults, &mut dyn EvaluationContext) + Send + 'static,
    {
        self.completion_extractor(completion_extractor_fn(f))
    }

    /// Validate and build. Every step definition is instantiated once to
    /// collect its channels, so broken definitions fail here.
    pub fn build(self) -> CoreResult<MultiStepEvaluationFunction> {
        if self.steps.is_empty() {
            return Err(config_error("multi-step function requires at least one step"));
        }
        let error_extractor = self
            .error_extractor
            .ok_or_else(|| config_error("multi-step function requires an error extractor"))?;
        let completion_extractor = self.completion_extractor.ok_or_else(|| {
            config_error("multi-step function requires a completion extractor")
        })?;

        let mut aliases = BTreeSet::new();
        for step in &self.steps {
            if !aliases.insert(step.alias.as_str()) {
                return Err(config_error(format!("duplicate step alias {:?}", step.alias)));
            }
            if step.timeout_ms < 0 {
                return Err(config_error(format!(
                    "step {:?}: timeout must be >= 0, got {}",
                    step.alias, step.timeout_ms
                )));
            }
        }
        if self.overall_timeout_ms < 0 {
            return Err(config_error(format!(
                "overall timeout must be >= 0, got {}",
                self.overall_timeout_ms
            )));
        }

        let mut channels = error_extractor.channels();
        channels.extend(completion_extractor.channels());
        for step in &self.steps {
            channels.extend(step.def.channels()?);
        }

        let active = self.steps[0].def.create()?;
        Ok(MultiStepEvaluationFunction {
            steps: self.steps,
            overall_timeout_ms: self.overall_timeout_ms,
            error_extractor,
            completion_extractor,
            channels,
            current_step: 0,
            active,
            results: StepResults::new(),
            results_seen: 0,
            rebuild_pending: false,
            overall_deadline: None,
            step_deadline: None,
        })
    }
}

#[cfg(test)]
mod tests;
