use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use crunch_core::Event;
use orion_error::ErrorOwe;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use crate::error::{RuntimeResult, sink_error};

/// Receives completed events for downstream delivery.
#[async_trait]
pub trait EventSink: Send {
    async fn send(&mut self, event: Event) -> RuntimeResult<()>;

    /// Called once after the last event of a run.
    async fn flush(&mut self) -> RuntimeResult<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CollectingSink — shared in-memory buffer
// ---------------------------------------------------------------------------

/// Keeps every event in memory. Clones share the same buffer, so a clone
/// kept by the caller observes what the executor delivered.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn send(&mut self, event: Event) -> RuntimeResult<()> {
        self.events
            .lock()
            .map_err(|_| sink_error("collecting sink lock poisoned"))?
            .push(event);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ChannelSink — forward into a bounded channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Event>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn send(&mut self, event: Event) -> RuntimeResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| sink_error("event receiver dropped"))
    }
}

// ---------------------------------------------------------------------------
// JsonLinesSink — one JSON event per line
// ---------------------------------------------------------------------------

/// Appends events to a file as JSON Lines, in the event wire shape.
pub struct JsonLinesSink {
    writer: tokio::io::BufWriter<tokio::fs::File>,
}

impl JsonLinesSink {
    pub async fn open(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.owe_sys()?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .owe_sys()?;
        crunch_debug!(res, path = %path.display(), "json lines sink opened");
        Ok(Self {
            writer: tokio::io::BufWriter::new(file),
        })
    }
}

#[async_trait]
impl EventSink for JsonLinesSink {
    async fn send(&mut self, event: Event) -> RuntimeResult<()> {
        let mut line = serde_json::to_vec(&event)
            .map_err(|e| sink_error(format!("event serialize error: {e}")))?;
        line.push(b'\n');
        self.writer.write_all(&line).await.owe_sys()?;
        Ok(())
    }

    async fn flush(&mut self) -> RuntimeResult<()> {
        self.writer.flush().await.owe_sys()?;
        Ok(())
    }
}
