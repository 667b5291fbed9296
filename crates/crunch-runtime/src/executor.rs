use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crunch_config::EngineConfig;
use crunch_core::{Event, MRecord};
use orion_error::op_context;
use orion_error::prelude::*;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeReason, RuntimeResult, sink_error};
use crate::pipeline::{EvaluationPipeline, PipelineInstance};
use crate::sink::EventSink;
use crate::source::RecordSource;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    pub records: u64,
    /// Polls where the source had nothing to offer.
    pub idle_polls: u64,
    pub events: u64,
    /// Distinct record sources seen (partitioned execution only).
    pub partitions: usize,
}

// ---------------------------------------------------------------------------
// Executor — one pipeline instance, records in arrival order
// ---------------------------------------------------------------------------

/// Runs a single pipeline instance over a source, strictly sequentially.
///
/// Cancellation stops pulling; buffered records are still drained through
/// the functions before the run returns.
pub struct Executor {
    pipeline: EvaluationPipeline,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(pipeline: EvaluationPipeline) -> Self {
        Self {
            pipeline,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn shutdown(&self) {
        crunch_info!(sys, pipeline = self.pipeline.identifier(), "shutdown requested");
        self.cancel.cancel();
    }

    #[tracing::instrument(name = "executor.run", skip_all, fields(pipeline = %self.pipeline.identifier()))]
    pub async fn run<S, K>(&self, source: &mut S, sink: &mut K) -> RuntimeResult<ExecutionStats>
    where
        S: RecordSource + ?Sized,
        K: EventSink + ?Sized,
    {
        let mut instance = self.pipeline.instantiate().err_conv()?;
        source.init().await?;
        crunch_info!(sys, "executor started");

        let result = self.drive(&mut instance, source, sink).await;
        source.close().await;
        let stats = result?;

        crunch_info!(
            sys,
            records = stats.records,
            events = stats.events,
            "executor finished"
        );
        Ok(stats)
    }

    async fn drive<S, K>(
        &self,
        instance: &mut PipelineInstance,
        source: &mut S,
        sink: &mut K,
    ) -> RuntimeResult<ExecutionStats>
    where
        S: RecordSource + ?Sized,
        K: EventSink + ?Sized,
    {
        let mut stats = ExecutionStats::default();
        while let Some(record) = next_record(source, &self.cancel, &mut stats).await? {
            for event in instance.offer(record) {
                sink.send(event).await?;
                stats.events += 1;
            }
        }
        for event in instance.finish() {
            sink.send(event).await?;
            stats.events += 1;
        }
        sink.flush().await?;
        Ok(stats)
    }
}

// ---------------------------------------------------------------------------
// PartitionedExecutor — one task and one pipeline instance per source
// ---------------------------------------------------------------------------

/// Splits the record flow by record source. Each source gets its own tokio
/// task owning a fresh pipeline instance, so no function state is shared
/// between sources. Events from all partitions are merged through one
/// bounded channel into the sink; ordering holds within a source only.
pub struct PartitionedExecutor {
    pipeline: Arc<EvaluationPipeline>,
    capacity: usize,
    cancel: CancellationToken,
}

impl PartitionedExecutor {
    /// `capacity` bounds both the per-partition record queues and the shared
    /// event channel.
    pub fn new(pipeline: EvaluationPipeline, capacity: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            capacity: capacity.max(1),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(pipeline: EvaluationPipeline, config: &EngineConfig) -> Self {
        Self::new(pipeline, config.engine.channel_capacity)
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn shutdown(&self) {
        crunch_info!(sys, pipeline = self.pipeline.identifier(), "shutdown requested");
        self.cancel.cancel();
    }

    pub async fn run<S, K>(&self, source: &mut S, sink: &mut K) -> RuntimeResult<ExecutionStats>
    where
        S: RecordSource + ?Sized,
        K: EventSink + ?Sized,
    {
        let mut op = op_context!("partitioned-run").with_auto_log();
        op.record("pipeline", self.pipeline.identifier());

        source.init().await?;
        let (event_tx, event_rx) = mpsc::channel::<Event>(self.capacity);
        let result = tokio::try_join!(self.dispatch(source, event_tx), deliver(event_rx, sink));
        let result = match result {
            Ok((mut stats, delivered)) => {
                stats.events = delivered;
                sink.flush().await.map(|()| stats)
            }
            Err(e) => Err(e),
        };
        source.close().await;
        let stats = result?;

        crunch_info!(
            sys,
            pipeline = self.pipeline.identifier(),
            partitions = stats.partitions,
            records = stats.records,
            events = stats.events,
            "partitioned run finished"
        );
        op.mark_suc();
        Ok(stats)
    }

    /// Pull records and hand each to its source's partition, spawning
    /// partitions on first sight. Returns once every partition has drained.
    async fn dispatch<S>(
        &self,
        source: &mut S,
        event_tx: mpsc::Sender<Event>,
    ) -> RuntimeResult<ExecutionStats>
    where
        S: RecordSource + ?Sized,
    {
        let mut partitions: HashMap<String, Partition> = HashMap::new();
        let mut stats = ExecutionStats::default();

        while let Some(record) = next_record(source, &self.cancel, &mut stats).await? {
            let partition = match partitions.entry(record.source().to_string()) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let instance = self.pipeline.instantiate().err_conv()?;
                    crunch_debug!(pipe, source = %e.key(), "partition started");
                    let partition = Partition::spawn(
                        e.key().clone(),
                        instance,
                        self.capacity,
                        event_tx.clone(),
                    );
                    e.insert(partition)
                }
            };
            if partition.tx.send(record).await.is_err() {
                // the partition task ended early; its join result says why
                break;
            }
        }
        drop(event_tx);

        stats.partitions = partitions.len();
        for (source, partition) in partitions {
            partition.join(&source).await?;
        }
        Ok(stats)
    }
}

struct Partition {
    tx: mpsc::Sender<Arc<dyn MRecord>>,
    handle: JoinHandle<RuntimeResult<()>>,
}

impl Partition {
    fn spawn(
        source: String,
        instance: PipelineInstance,
        capacity: usize,
        events: mpsc::Sender<Event>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(run_partition(source, instance, rx, events));
        Self { tx, handle }
    }

    /// Close the record queue and wait for the task to drain.
    async fn join(self, source: &str) -> RuntimeResult<()> {
        drop(self.tx);
        let result = self.handle.await.map_err(|e| {
            StructError::from(RuntimeReason::Shutdown)
                .with_detail(format!("partition {source:?} join error: {e}"))
        })?;
        if let Err(e) = &result {
            crunch_error!(pipe, source, error = %e, "partition failed");
        }
        result
    }
}

async fn run_partition(
    source: String,
    mut instance: PipelineInstance,
    mut rx: mpsc::Receiver<Arc<dyn MRecord>>,
    events: mpsc::Sender<Event>,
) -> RuntimeResult<()> {
    let mut records = 0u64;
    while let Some(record) = rx.recv().await {
        records += 1;
        forward(&events, instance.offer(record)).await?;
    }
    forward(&events, instance.finish()).await?;
    crunch_debug!(pipe, source = %source, records, "partition finished");
    Ok(())
}

async fn forward(events: &mpsc::Sender<Event>, batch: Vec<Event>) -> RuntimeResult<()> {
    for event in batch {
        events
            .send(event)
            .await
            .map_err(|_| sink_error("event channel closed"))?;
    }
    Ok(())
}

async fn deliver<K>(mut rx: mpsc::Receiver<Event>, sink: &mut K) -> RuntimeResult<u64>
where
    K: EventSink + ?Sized,
{
    let mut delivered = 0;
    while let Some(event) = rx.recv().await {
        sink.send(event).await?;
        delivered += 1;
    }
    Ok(delivered)
}

/// Next record from `source`, or `None` at end of stream or once
/// cancelled. Idle polls are counted and skipped.
async fn next_record<S>(
    source: &mut S,
    cancel: &CancellationToken,
    stats: &mut ExecutionStats,
) -> RuntimeResult<Option<Arc<dyn MRecord>>>
where
    S: RecordSource + ?Sized,
{
    loop {
        if cancel.is_cancelled() {
            crunch_info!(sys, records = stats.records, "cancelled; draining");
            return Ok(None);
        }
        if !source.has_remaining().await {
            return Ok(None);
        }
        let polled = tokio::select! {
            biased;
            _ = cancel.cancelled() => continue,
            polled = source.get() => polled?,
        };
        match polled {
            Some(record) => {
                stats.records += 1;
                return Ok(Some(Arc::from(record)));
            }
            None => {
                stats.idle_polls += 1;
                tokio::task::yield_now().await;
            }
        }
    }
}
