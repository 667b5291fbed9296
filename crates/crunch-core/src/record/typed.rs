use std::collections::BTreeMap;

use orion_error::StructError;
use serde::{Deserialize, Serialize};

use super::{ChannelSet, MRecord};
use crate::error::{CoreReason, CoreResult};
use crate::value::Value;

/// A record whose channels already carry typed [`Value`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedRecord {
    source: String,
    timestamp: i64,
    #[serde(default)]
    values: BTreeMap<String, Value>,
}

impl TypedRecord {
    pub fn new(source: impl Into<String>, timestamp: i64) -> Self {
        Self {
            source: source.into(),
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn with_values(
        source: impl Into<String>,
        timestamp: i64,
        values: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            source: source.into(),
            timestamp,
            values,
        }
    }

    /// Builder-style channel insertion.
    pub fn with(mut self, channel: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(channel.into(), value.into());
        self
    }

    pub fn insert(&mut self, channel: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(channel.into(), value.into());
    }

    /// Snapshot any record into an owned typed record.
    pub fn from_record(record: &dyn MRecord) -> Self {
        let values = record
            .channels()
            .into_iter()
            .filter_map(|ch| record.value(&ch).map(|v| (ch, v)))
            .collect();
        Self {
            source: record.source().to_string(),
            timestamp: record.timestamp(),
            values,
        }
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Combine with a later record of the same source.
    ///
    /// The result carries `other`'s timestamp; on key collision `other`'s
    /// value wins.
    pub fn merge(&self, other: &TypedRecord) -> CoreResult<TypedRecord> {
        if other.source != self.source {
            return Err(StructError::from(CoreReason::IncompatibleMerge).with_detail(format!(
                "source mismatch: {:?} vs {:?}",
                self.source, other.source
            )));
        }
        if other.timestamp < self.timestamp {
            return Err(StructError::from(CoreReason::IncompatibleMerge).with_detail(format!(
                "timestamp {} is older than {}",
                other.timestamp, self.timestamp
            )));
        }
        let mut values = self.values.clone();
        values.extend(other.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(TypedRecord {
            source: self.source.clone(),
            timestamp: other.timestamp,
            values,
        })
    }

    /// Copy retaining only the channels named in `keep`.
    pub fn filter_channels(&self, keep: &ChannelSet) -> TypedRecord {
        TypedRecord {
            source: self.source.clone(),
            timestamp: self.timestamp,
            values: self
                .values
                .iter()
                .filter(|(k, _)| keep.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl MRecord for TypedRecord {
    fn source(&self) -> &str {
        &self.source
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn channels(&self) -> ChannelSet {
        self.values.keys().cloned().collect()
    }

    fn value(&self, channel: &str) -> Option<Value> {
        self.values.get(channel).cloned()
    }

    fn has_channel(&self, channel: &str) -> bool {
        self.values.contains_key(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::channel_set;

    fn rec(ts: i64) -> TypedRecord {
        TypedRecord::new("press-1", ts)
            .with("a", 1i64)
            .with("b", "x")
    }

    #[test]
    fn merge_keeps_later_timestamp_and_overwrites() {
        let r1 = rec(10);
        let r2 = TypedRecord::new("press-1", 20)
            .with("b", "y")
            .with("c", true);
        let merged = r1.merge(&r2).unwrap();
        assert_eq!(merged.timestamp(), 20);
        assert_eq!(merged.get_long("a"), Some(1));
        assert_eq!(merged.get_string("b").as_deref(), Some("y"));
        assert_eq!(merged.get_bool("c"), Some(true));
    }

    #[test]
    fn merge_equal_timestamp_allowed() {
        let merged = rec(10).merge(&TypedRecord::new("press-1", 10).with("a", 2i64));
        assert_eq!(merged.unwrap().get_long("a"), Some(2));
    }

    #[test]
    fn merge_rejects_source_mismatch() {
        let other = TypedRecord::new("press-2", 20);
        assert!(rec(10).merge(&other).is_err());
    }

    #[test]
    fn merge_rejects_older_record() {
        let other = TypedRecord::new("press-1", 9);
        assert!(rec(10).merge(&other).is_err());
    }

    #[test]
    fn filter_channels_keeps_subset() {
        let r = rec(10).with("c", 3.5);
        let f = r.filter_channels(&channel_set(["a", "b"]));
        assert_eq!(f.channels(), channel_set(["a", "b"]));
        assert_eq!(f.source(), "press-1");
        assert_eq!(f.timestamp(), 10);
    }

    #[test]
    fn typed_getters_are_absence_tolerant() {
        let r = rec(1);
        assert_eq!(r.get_double("a"), Some(1.0));
        assert_eq!(r.get_bool("a"), None);
        assert_eq!(r.get_long("missing"), None);
        assert!(r.has_channel("b"));
        assert!(!r.is_empty());
        assert!(TypedRecord::new("s", 0).is_empty());
    }

    #[test]
    fn from_record_snapshots_view() {
        let boxed: Box<dyn MRecord> = Box::new(rec(7));
        let snap = TypedRecord::from_record(&boxed);
        assert_eq!(snap, rec(7));
    }
}
