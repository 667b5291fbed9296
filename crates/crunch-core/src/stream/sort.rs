use std::collections::BTreeMap;

use crunch_config::LatePolicy;

use crate::record::MRecord;

/// Bounded reordering stage.
///
/// Buffers records ordered by timestamp and releases every record at or
/// below `high_watermark - window_ms`. Records with equal timestamps keep
/// their arrival order.
#[derive(Debug)]
pub struct SortBuffer<R> {
    window_ms: i64,
    late_policy: LatePolicy,
    buffer: BTreeMap<(i64, u64), R>,
    seq: u64,
    high_watermark: Option<i64>,
    last_emitted: Option<i64>,
    late_dropped: u64,
}

impl<R: MRecord> SortBuffer<R> {
    pub fn new(window_ms: i64, late_policy: LatePolicy) -> Self {
        Self {
            window_ms: window_ms.max(0),
            late_policy,
            buffer: BTreeMap::new(),
            seq: 0,
            high_watermark: None,
            last_emitted: None,
            late_dropped: 0,
        }
    }

    /// Insert `record` and return every record that is now safe to release,
    /// in timestamp order.
    pub fn push(&mut self, record: R) -> Vec<R> {
        let ts = record.timestamp();

        // Lateness is judged against what was already released, before this
        // record moves the high watermark.
        if self.late_policy == LatePolicy::Drop
            && let Some(last) = self.last_emitted
            && ts < last
        {
            self.late_dropped += 1;
            log::debug!(
                "dropping late record from {:?}: ts {ts} < last emitted {last}",
                record.source()
            );
            return Vec::new();
        }

        let hi = self.high_watermark.map_or(ts, |hi| hi.max(ts));
        self.high_watermark = Some(hi);
        self.buffer.insert((ts, self.seq), record);
        self.seq += 1;

        let cutoff = hi.saturating_sub(self.window_ms);
        let rest = self.buffer.split_off(&(cutoff.saturating_add(1), 0));
        let ready = std::mem::replace(&mut self.buffer, rest);
        self.release(ready)
    }

    /// Release everything still buffered, in timestamp order.
    pub fn flush(&mut self) -> Vec<R> {
        let ready = std::mem::take(&mut self.buffer);
        self.release(ready)
    }

    fn release(&mut self, ready: BTreeMap<(i64, u64), R>) -> Vec<R> {
        if let Some(((ts, _), _)) = ready.last_key_value() {
            self.last_emitted = Some(self.last_emitted.map_or(*ts, |l| l.max(*ts)));
        }
        ready.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn high_watermark(&self) -> Option<i64> {
        self.high_watermark
    }

    /// Records discarded under [`LatePolicy::Drop`].
    pub fn late_dropped(&self) -> u64 {
        self.late_dropped
    }
}
