//! Drives evaluation pipelines: pulls records from a [`RecordSource`],
//! runs them through per-stream runners and pushes events to an
//! [`EventSink`].
//!
//! [`RecordSource`]: source::RecordSource
//! [`EventSink`]: sink::EventSink

#[macro_use]
mod log_macros;

pub mod error;
pub mod executor;
pub mod pipeline;
pub mod runner;
pub mod sink;
pub mod source;
pub mod tracing_init;

pub use error::{RuntimeError, RuntimeReason, RuntimeResult, sink_error, source_error};
pub use executor::{ExecutionStats, Executor, PartitionedExecutor};
pub use pipeline::{EvaluationPipeline, PipelineInstance};
pub use runner::StreamRunner;
pub use sink::{ChannelSink, CollectingSink, EventSink, JsonLinesSink};
pub use source::{ChannelSource, RecordSource, VecSource};
