mod context;
mod function;
mod handler;
mod sub_stream;

pub use context::{EvaluationContext, SimpleEvaluationContext};
pub use function::{EvaluationFunction, EvaluationFunctionDef};
pub use handler::{RecordHandler, RecordHandlerFactory};
pub use sub_stream::{RecordPredicate, SubStream, SubStreamBuilder};
