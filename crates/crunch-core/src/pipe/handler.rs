use std::sync::Arc;

use crate::record::MRecord;

/// An observing hook invoked for every record that passes a sub-stream's
/// predicate. Handlers see records before channel filtering and reordering
/// and cannot emit events.
pub trait RecordHandler: Send {
    fn init(&mut self) {}

    fn apply(&mut self, record: &dyn MRecord);

    fn close(&mut self) {}
}

/// Builds a fresh handler for every stream instance.
pub type RecordHandlerFactory = Arc<dyn Fn() -> Box<dyn RecordHandler> + Send + Sync>;
