use std::fmt;
use std::sync::Arc;

use super::context::EvaluationContext;
use crate::error::CoreResult;
use crate::record::ChannelSet;

/// The unit of stream logic.
///
/// `eval` is called once per record, strictly sequentially, never
/// reentrantly. Implementations own their accumulation state exclusively.
pub trait EvaluationFunction: Send {
    /// Called once before the first `eval`.
    fn init(&mut self) {}

    fn eval(&mut self, ctx: &mut dyn EvaluationContext) -> CoreResult<()>;

    /// Called once after the last `eval`.
    fn close(&mut self) {}

    /// Channels this function reads. An empty set means "reads nothing",
    /// never "unknown".
    fn channels(&self) -> ChannelSet;
}

type Factory = dyn Fn() -> CoreResult<Box<dyn EvaluationFunction>> + Send + Sync;

/// A recipe for fresh [`EvaluationFunction`] instances.
///
/// Every call to [`create`](Self::create) builds a new instance with its own
/// state, so two streams built from the same definition never share
/// anything mutable.
#[derive(Clone)]
pub struct EvaluationFunctionDef {
    name: String,
    factory: Arc<Factory>,
}

impl EvaluationFunctionDef {
    pub fn new<F, E>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> CoreResult<E> + Send + Sync + 'static,
        E: EvaluationFunction + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(move || {
                factory().map(|f| Box::new(f) as Box<dyn EvaluationFunction>)
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create(&self) -> CoreResult<Box<dyn EvaluationFunction>> {
        (self.factory)()
    }

    /// Channels declared by a fresh instance.
    pub fn channels(&self) -> CoreResult<ChannelSet> {
        Ok(self.create()?.channels())
    }
}

impl fmt::Debug for EvaluationFunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationFunctionDef")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
