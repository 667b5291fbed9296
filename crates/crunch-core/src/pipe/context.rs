use crate::event::Event;
use crate::record::MRecord;

/// The current record plus an output collector.
pub trait EvaluationContext {
    fn get(&self) -> &dyn MRecord;

    fn collect(&mut self, event: Event);
}

/// Context over one record that buffers every collected event.
#[derive(Debug)]
pub struct SimpleEvaluationContext<'a> {
    record: &'a dyn MRecord,
    events: Vec<Event>,
}

impl<'a> SimpleEvaluationContext<'a> {
    pub fn new(record: &'a dyn MRecord) -> Self {
        Self {
            record,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events
    }
}

impl EvaluationContext for SimpleEvaluationContext<'_> {
    fn get(&self) -> &dyn MRecord {
        self.record
    }

    fn collect(&mut self, event: Event) {
        self.events.push(event);
    }
}
