//! Windowed aggregation: accumulate while a record window is open, emit when
//! it closes.

pub mod aggregate;
mod extractor;
mod window;

use std::sync::Arc;

pub use extractor::{
    DefaultGroupFinalizer, GroupByExtractor, GroupByExtractorBuilder, GroupFinalizer,
    WindowExtractor,
};
pub use window::{BitWindow, FnWindow, RecordWindow, bit_active, bit_not_active, window_fn};

use crate::error::{CoreResult, config_error};
use crate::pipe::{EvaluationContext, EvaluationFunction, SimpleEvaluationContext};
use crate::record::ChannelSet;
use crate::trigger::{EventFilter, forward_filtered};

type ExtractorFactory = Arc<dyn Fn() -> CoreResult<Box<dyn WindowExtractor>> + Send + Sync>;

/// Two-state machine over a [`RecordWindow`].
///
/// Closed→Open when the window predicate turns true: a fresh extractor is
/// built and sees the opening record. Open→Closed when it turns false: the
/// extractor's `finish` runs once against the closing record. A window that
/// is still open when the stream ends emits nothing.
pub struct WindowedEvaluationFunction {
    window: Box<dyn RecordWindow>,
    extractor_factory: ExtractorFactory,
    extractor_channels: ChannelSet,
    open: Option<Box<dyn WindowExtractor>>,
    filters: Vec<Box<dyn EventFilter>>,
}

impl WindowedEvaluationFunction {
    pub fn builder() -> WindowedEvaluationFunctionBuilder {
        WindowedEvaluationFunctionBuilder::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

impl EvaluationFunction for WindowedEvaluationFunction {
    fn eval(&mut self, ctx: &mut dyn EvaluationContext) -> CoreResult<()> {
        let in_window = self.window.in_window(ctx.get());

        match (self.open.take(), in_window) {
            (None, true) => {
                log::debug!("window opened at {}", ctx.get().timestamp());
                let mut extractor = (self.extractor_factory)()?;
                extractor.apply(ctx.get());
                self.open = Some(extractor);
            }
            (Some(mut extractor), true) => {
                extractor.apply(ctx.get());
                self.open = Some(extractor);
            }
            (Some(mut extractor), false) => {
                log::debug!("window closed at {}", ctx.get().timestamp());
                let candidates = {
                    let mut inner = SimpleEvaluationContext::new(ctx.get());
                    extractor.finish(&mut inner);
                    inner.into_events()
                };
                forward_filtered(&mut self.filters, candidates, ctx);
            }
            (None, false) => {}
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.open.take().is_some() {
            log::debug!("window still open at close; discarding accumulated state");
        }
    }

    fn channels(&self) -> ChannelSet {
        let mut channels = self.window.channels();
        channels.extend(self.extractor_channels.iter().cloned());
        for f in &self.filters {
            channels.extend(f.channels());
        }
        channels
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct WindowedEvaluationFunctionBuilder {
    window: Option<Box<dyn RecordWindow>>,
    extractor_factory: Option<ExtractorFactory>,
    filters: Vec<Box<dyn EventFilter>>,
}

impl WindowedEvaluationFunctionBuilder {
    pub fn record_window(mut self, window: impl RecordWindow + 'static) -> Self {
        self.window = Some(Box::new(window));
        self
    }

    /// `factory` is called for every Closed→Open transition.
    pub fn extractor<F, E>(mut self, factory: F) -> Self
    where
        F: Fn() -> E + Send + Sync + 'static,
        E: WindowExtractor + 'static,
    {
        self.extractor_factory = Some(Arc::new(move || {
            Ok(Box::new(factory()) as Box<dyn WindowExtractor>)
        }));
        self
    }

    /// Like [`extractor`](Self::extractor) for factories that validate, such
    /// as [`GroupByExtractorBuilder::build`].
    pub fn try_extractor<F, E>(mut self, factory: F) -> Self
    where
        F: Fn() -> CoreResult<E> + Send + Sync + 'static,
        E: WindowExtractor + 'static,
    {
        self.extractor_factory = Some(Arc::new(move || {
            factory().map(|e| Box::new(e) as Box<dyn WindowExtractor>)
        }));
        self
    }

    pub fn filter(mut self, filter: impl EventFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn build(self) -> CoreResult<WindowedEvaluationFunction> {
        let window = self
            .window
            .ok_or_else(|| config_error("windowed function requires a record window"))?;
        let extractor_factory = self
            .extractor_factory
            .ok_or_else(|| config_error("windowed function requires an extractor"))?;
        let extractor_channels = extractor_factory()?.channels();
        Ok(WindowedEvaluationFunction {
            window,
            extractor_factory,
            extractor_channels,
            open: None,
            filters: self.filters,
        })
    }
}
