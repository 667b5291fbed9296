use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ChannelSet, MRecord, TypedRecord};
use crate::value::Value;

/// A record as delivered by a connector: untyped JSON scalars plus a channel
/// name prefix that is applied when the record is typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    source: String,
    timestamp: i64,
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    values: BTreeMap<String, serde_json::Value>,
}

impl RawRecord {
    pub fn new(source: impl Into<String>, timestamp: i64, prefix: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            timestamp,
            prefix: prefix.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, channel: impl Into<String>, value: serde_json::Value) -> Self {
        self.values.insert(channel.into(), value);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn raw_values(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Channel name as seen by evaluation: `prefix_name` when the prefix is
    /// non-empty.
    fn qualified(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", self.prefix, name)
        }
    }

    /// Inverse of [`qualified`](Self::qualified).
    fn unqualified<'a>(&self, channel: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            return Some(channel);
        }
        channel
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('_'))
    }

    /// Typed copy of this record under the qualified channel names; values
    /// without a typed counterpart are skipped.
    pub fn to_typed(&self) -> TypedRecord {
        let mut typed = TypedRecord::new(self.source.clone(), self.timestamp);
        for (name, raw) in &self.values {
            let Some(value) = Value::from_json(raw) else {
                log::debug!(
                    "skipping untyped channel {name:?} of source {:?}",
                    self.source
                );
                continue;
            };
            typed.insert(self.qualified(name), value);
        }
        typed
    }

    /// Copy retaining only the channels named in `keep`, given by their
    /// qualified names.
    pub fn filter_channels(&self, keep: &ChannelSet) -> RawRecord {
        RawRecord {
            source: self.source.clone(),
            timestamp: self.timestamp,
            prefix: self.prefix.clone(),
            values: self
                .values
                .iter()
                .filter(|(k, _)| keep.contains(&self.qualified(k)))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl MRecord for RawRecord {
    fn source(&self) -> &str {
        &self.source
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn channels(&self) -> ChannelSet {
        self.values
            .iter()
            .filter(|(_, raw)| Value::from_json(raw).is_some())
            .map(|(name, _)| self.qualified(name))
            .collect()
    }

    fn value(&self, channel: &str) -> Option<Value> {
        let name = self.unqualified(channel)?;
        self.values.get(name).and_then(Value::from_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::channel_set;
    use serde_json::json;

    #[test]
    fn to_typed_applies_prefix() {
        let raw = RawRecord::new("plc", 5, "line1")
            .with("temp", json!(21.5))
            .with("on", json!(true));
        let typed = raw.to_typed();
        assert_eq!(typed.channels(), channel_set(["line1_on", "line1_temp"]));
        assert_eq!(typed.get_double("line1_temp"), Some(21.5));
        assert_eq!(typed.source(), "plc");
        assert_eq!(typed.timestamp(), 5);
    }

    #[test]
    fn to_typed_without_prefix_keeps_names() {
        let raw = RawRecord::new("plc", 5, "").with("count", json!(3));
        assert_eq!(raw.to_typed().get_long("count"), Some(3));
    }

    #[test]
    fn to_typed_skips_structured_values() {
        let raw = RawRecord::new("plc", 5, "")
            .with("list", json!([1, 2]))
            .with("n", json!(1));
        assert_eq!(raw.to_typed().channels(), channel_set(["n"]));
    }

    #[test]
    fn filter_channels_keeps_subset() {
        let raw = RawRecord::new("plc", 9, "p")
            .with("a", json!(1))
            .with("b", json!(2))
            .with("c", json!(3));
        let f = raw.filter_channels(&channel_set(["p_a", "p_b"]));
        assert_eq!(f.channels(), channel_set(["p_a", "p_b"]));
        assert_eq!(f.source(), "plc");
        assert_eq!(f.timestamp(), 9);
        assert_eq!(f.prefix(), "p");
    }

    #[test]
    fn view_matches_typed_copy() {
        let raw = RawRecord::new("plc", 3, "line1")
            .with("alarm", json!(true))
            .with("list", json!([1]));
        assert_eq!(raw.channels(), raw.to_typed().channels());
        assert_eq!(raw.get_bool("line1_alarm"), Some(true));
        assert!(raw.has_channel("line1_alarm"));
        assert_eq!(raw.get_bool("alarm"), None);
        assert_eq!(raw.get_bool("line1alarm"), None);
    }

    #[test]
    fn raw_view_reads_typed_values() {
        let raw = RawRecord::new("plc", 1, "").with("s", json!("on"));
        assert_eq!(raw.get_string("s").as_deref(), Some("on"));
        assert_eq!(raw.get_long("s"), None);
        assert!(!raw.is_empty());
    }
}
