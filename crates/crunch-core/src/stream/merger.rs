use std::collections::BTreeMap;

use crate::error::CoreResult;
use crate::record::{MRecord, TypedRecord};

/// Coalesces records into the last-known channel state, per source.
///
/// Records with the same timestamp are folded together; the accumulated
/// state is released once a strictly newer timestamp arrives for that
/// source, and again at [`flush`](Self::flush).
#[derive(Debug, Default)]
pub struct RecordMerger {
    state: BTreeMap<String, TypedRecord>,
    pending: BTreeMap<String, bool>,
}

impl RecordMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `record` into its source's state. Returns the previous state when
    /// `record` starts a newer timestamp.
    ///
    /// Fails when `record` is older than the accumulated state.
    pub fn push(&mut self, record: &dyn MRecord) -> CoreResult<Option<TypedRecord>> {
        let incoming = TypedRecord::from_record(record);
        let source = incoming.source().to_string();

        let Some(current) = self.state.get(&source) else {
            self.state.insert(source.clone(), incoming);
            self.pending.insert(source, true);
            return Ok(None);
        };

        let newer = incoming.timestamp() > current.timestamp();
        let merged = current.merge(&incoming)?;
        let released = if newer && self.pending.get(&source).copied().unwrap_or(false) {
            Some(current.clone())
        } else {
            None
        };
        self.state.insert(source.clone(), merged);
        self.pending.insert(source, true);
        Ok(released)
    }

    /// Release the accumulated state of every source that has not been
    /// released since its last update.
    pub fn flush(&mut self) -> Vec<TypedRecord> {
        let mut out = Vec::new();
        for (source, pending) in self.pending.iter_mut() {
            if *pending && let Some(state) = self.state.get(source) {
                out.push(state.clone());
            }
            *pending = false;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn releases_state_on_newer_timestamp() {
        let mut m = RecordMerger::new();
        assert!(m.push(&TypedRecord::new("s", 1).with("a", 1i64)).unwrap().is_none());
        assert!(m.push(&TypedRecord::new("s", 1).with("b", 2i64)).unwrap().is_none());

        let out = m
            .push(&TypedRecord::new("s", 2).with("a", 5i64))
            .unwrap()
            .unwrap();
        assert_eq!(out.timestamp(), 1);
        assert_eq!(out.get_long("a"), Some(1));
        assert_eq!(out.get_long("b"), Some(2));

        let flushed = m.flush();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].timestamp(), 2);
        // last-known state carries forward
        assert_eq!(flushed[0].get_long("a"), Some(5));
        assert_eq!(flushed[0].get_long("b"), Some(2));
        assert!(m.flush().is_empty());
    }

    #[test]
    fn sources_are_independent() {
        let mut m = RecordMerger::new();
        m.push(&TypedRecord::new("x", 5)).unwrap();
        assert!(m.push(&TypedRecord::new("y", 1)).unwrap().is_none());
        assert_eq!(m.flush().len(), 2);
    }

    #[test]
    fn older_record_fails() {
        let mut m = RecordMerger::new();
        m.push(&TypedRecord::new("s", 5)).unwrap();
        assert!(m.push(&TypedRecord::new("s", 4)).is_err());
    }
}
