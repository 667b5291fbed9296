use std::sync::Arc;

use crunch_core::pipe::{
    EvaluationFunction, RecordHandler, SimpleEvaluationContext, SubStream,
};
use crunch_core::stream::{ChannelFilter, RecordMerger, SortBuffer};
use crunch_core::{CoreResult, Event, MRecord};

// ---------------------------------------------------------------------------
// StreamRunner — one live instance of a sub-stream
// ---------------------------------------------------------------------------

/// Owns the mutable state of one sub-stream instance and moves records
/// through it:
///
/// predicate → record handlers → channel filter → reorder → merge → functions
///
/// Callers check [`accepts`](Self::accepts) before [`offer`](Self::offer).
pub struct StreamRunner {
    sub_stream: SubStream,
    handlers: Vec<Box<dyn RecordHandler>>,
    filter: Option<ChannelFilter>,
    sort: SortBuffer<Arc<dyn MRecord>>,
    merger: Option<RecordMerger>,
    functions: Vec<Box<dyn EvaluationFunction>>,
    filtered: u64,
    finished: bool,
}

impl StreamRunner {
    /// Instantiate fresh functions and handlers for `sub_stream` and
    /// initialise them.
    pub fn new(sub_stream: &SubStream) -> CoreResult<Self> {
        let mut functions = sub_stream.instantiate_functions()?;
        for f in &mut functions {
            f.init();
        }
        let mut handlers = sub_stream.instantiate_handlers();
        for h in &mut handlers {
            h.init();
        }
        let filter = sub_stream
            .channel_filter()
            .then(|| ChannelFilter::new(sub_stream.channels().clone()));
        let merger = sub_stream.merge_channels().then(RecordMerger::new);

        Ok(Self {
            sub_stream: sub_stream.clone(),
            handlers,
            filter,
            sort: SortBuffer::new(sub_stream.sort_window_ms(), sub_stream.late_policy()),
            merger,
            functions,
            filtered: 0,
            finished: false,
        })
    }

    pub fn identifier(&self) -> &str {
        self.sub_stream.identifier()
    }

    pub fn accepts(&self, record: &dyn MRecord) -> bool {
        self.sub_stream.accepts(record)
    }

    /// Records rejected by the channel filter so far.
    pub fn filtered(&self) -> u64 {
        self.filtered
    }

    /// Records held back by the reordering stage.
    pub fn buffered(&self) -> usize {
        self.sort.len()
    }

    /// Feed one accepted record; returns the events it released.
    pub fn offer(&mut self, record: Arc<dyn MRecord>) -> Vec<Event> {
        for h in &mut self.handlers {
            h.apply(record.as_ref());
        }
        if let Some(filter) = &self.filter
            && !filter.accepts(record.as_ref())
        {
            self.filtered += 1;
            crunch_trace!(
                pipe,
                stream = self.sub_stream.identifier(),
                ts = record.timestamp(),
                "record lacks every channel the stream reads"
            );
            return Vec::new();
        }

        let mut out = Vec::new();
        for released in self.sort.push(record) {
            self.merge_and_eval(released.as_ref(), &mut out);
        }
        out
    }

    /// Drain the reordering and merge stages, then close every function and
    /// handler. Calling it again returns nothing.
    pub fn finish(&mut self) -> Vec<Event> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;

        let mut out = Vec::new();
        for released in self.sort.flush() {
            self.merge_and_eval(released.as_ref(), &mut out);
        }
        if let Some(merger) = &mut self.merger {
            for merged in merger.flush() {
                eval_all(&mut self.functions, self.sub_stream.identifier(), &merged, &mut out);
            }
        }

        for f in &mut self.functions {
            f.close();
        }
        for h in &mut self.handlers {
            h.close();
        }
        crunch_debug!(
            pipe,
            stream = self.sub_stream.identifier(),
            filtered = self.filtered,
            late_dropped = self.sort.late_dropped(),
            "stream finished"
        );
        out
    }

    fn merge_and_eval(&mut self, record: &dyn MRecord, out: &mut Vec<Event>) {
        let id = self.sub_stream.identifier();
        let Some(merger) = &mut self.merger else {
            eval_all(&mut self.functions, id, record, out);
            return;
        };
        match merger.push(record) {
            Ok(Some(merged)) => eval_all(&mut self.functions, id, &merged, out),
            Ok(None) => {}
            Err(e) => {
                crunch_warn!(pipe, stream = id, error = %e, "record merge rejected");
            }
        }
    }
}

/// Run every function on `record`. A failing function is logged and the
/// others still see the record.
fn eval_all(
    functions: &mut [Box<dyn EvaluationFunction>],
    stream: &str,
    record: &dyn MRecord,
    out: &mut Vec<Event>,
) {
    for f in functions.iter_mut() {
        let mut ctx = SimpleEvaluationContext::new(record);
        if let Err(e) = f.eval(&mut ctx) {
            crunch_warn!(
                pipe,
                stream,
                ts = record.timestamp(),
                error = %e,
                "evaluation failed"
            );
        }
        out.extend(ctx.into_events());
    }
}
