use std::collections::VecDeque;

use async_trait::async_trait;
use crunch_core::MRecord;
use tokio::sync::mpsc;

use crate::error::RuntimeResult;

/// Pull-based record delivery.
///
/// `get` returning `Ok(None)` means "nothing yet", not end of stream: the
/// executor keeps polling until `has_remaining` turns false.
#[async_trait]
pub trait RecordSource: Send {
    async fn init(&mut self) -> RuntimeResult<()> {
        Ok(())
    }

    async fn has_remaining(&mut self) -> bool;

    async fn get(&mut self) -> RuntimeResult<Option<Box<dyn MRecord>>>;

    async fn close(&mut self) {}
}

// ---------------------------------------------------------------------------
// VecSource — a fixed, in-memory sequence
// ---------------------------------------------------------------------------

/// Replays a fixed sequence. `None` slots model an idle poll.
#[derive(Debug, Default)]
pub struct VecSource {
    slots: VecDeque<Option<Box<dyn MRecord>>>,
}

impl VecSource {
    pub fn new<R, I>(records: I) -> Self
    where
        R: MRecord + 'static,
        I: IntoIterator<Item = R>,
    {
        Self {
            slots: records
                .into_iter()
                .map(|r| Some(Box::new(r) as Box<dyn MRecord>))
                .collect(),
        }
    }

    pub fn push(&mut self, record: impl MRecord + 'static) {
        self.slots.push_back(Some(Box::new(record)));
    }

    /// Queue an empty poll.
    pub fn push_idle(&mut self) {
        self.slots.push_back(None);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[async_trait]
impl RecordSource for VecSource {
    async fn has_remaining(&mut self) -> bool {
        !self.slots.is_empty()
    }

    async fn get(&mut self) -> RuntimeResult<Option<Box<dyn MRecord>>> {
        Ok(self.slots.pop_front().flatten())
    }
}

// ---------------------------------------------------------------------------
// ChannelSource — records pushed by another task
// ---------------------------------------------------------------------------

/// Reads records from a bounded channel. The stream ends once every sender
/// is dropped and the buffer is drained.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::Receiver<Box<dyn MRecord>>,
    open: bool,
}

impl ChannelSource {
    pub fn new(rx: mpsc::Receiver<Box<dyn MRecord>>) -> Self {
        Self { rx, open: true }
    }

    /// A source plus the sender that feeds it.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Box<dyn MRecord>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl RecordSource for ChannelSource {
    async fn has_remaining(&mut self) -> bool {
        self.open
    }

    async fn get(&mut self) -> RuntimeResult<Option<Box<dyn MRecord>>> {
        let record = self.rx.recv().await;
        if record.is_none() {
            crunch_debug!(res, "channel source closed");
            self.open = false;
        }
        Ok(record)
    }

    async fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crunch_core::TypedRecord;

    #[tokio::test]
    async fn vec_source_reports_idle_polls() {
        let mut src = VecSource::new([TypedRecord::new("a", 1)]);
        src.push_idle();
        src.push(TypedRecord::new("a", 2));
        assert_eq!(src.len(), 3);

        assert_eq!(src.get().await.unwrap().map(|r| r.timestamp()), Some(1));
        assert!(src.has_remaining().await);
        assert!(src.get().await.unwrap().is_none());
        assert!(src.has_remaining().await);
        assert_eq!(src.get().await.unwrap().map(|r| r.timestamp()), Some(2));
        assert!(!src.has_remaining().await);
    }

    #[tokio::test]
    async fn channel_source_ends_when_senders_drop() {
        let (tx, mut src) = ChannelSource::channel(4);
        tx.send(Box::new(TypedRecord::new("a", 7))).await.unwrap();
        drop(tx);

        assert_eq!(src.get().await.unwrap().map(|r| r.timestamp()), Some(7));
        assert!(src.has_remaining().await);
        assert!(src.get().await.unwrap().is_none());
        assert!(!src.has_remaining().await);
    }
}
