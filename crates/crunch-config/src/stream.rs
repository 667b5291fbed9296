use serde::{Deserialize, Serialize};

use crate::types::{HumanDuration, LatePolicy};

// ---------------------------------------------------------------------------
// StreamDefaults — deserialized from [stream_defaults]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamDefaults {
    /// Bounded reordering horizon.
    pub sort_window: HumanDuration,
    pub late_policy: LatePolicy,
    /// Drop records that carry none of the channels a sub-stream reads.
    pub channel_filter: bool,
    /// Coalesce records into the last-known channel state before evaluation.
    pub merge_channels: bool,
}

impl Default for StreamDefaults {
    fn default() -> Self {
        Self {
            sort_window: HumanDuration::ZERO,
            late_policy: LatePolicy::Emit,
            channel_filter: true,
            merge_channels: false,
        }
    }
}

// ---------------------------------------------------------------------------
// StreamOverride — deserialized from [stream.<name>]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamOverride {
    pub sort_window: Option<HumanDuration>,
    pub late_policy: Option<LatePolicy>,
    pub channel_filter: Option<bool>,
    pub merge_channels: Option<bool>,
}

// ---------------------------------------------------------------------------
// StreamConfig — fully resolved per-stream configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub name: String,
    pub sort_window: HumanDuration,
    pub late_policy: LatePolicy,
    pub channel_filter: bool,
    pub merge_channels: bool,
}

impl StreamConfig {
    /// A config named `name` carrying every default unchanged.
    pub fn from_defaults(name: impl Into<String>, defaults: &StreamDefaults) -> Self {
        StreamOverride::default().resolve(name.into(), defaults)
    }

    /// Reordering horizon in event-time milliseconds.
    pub fn sort_window_ms(&self) -> i64 {
        self.sort_window.as_millis_i64()
    }
}

impl StreamOverride {
    /// Resolve this override against `defaults`, producing a fully populated [`StreamConfig`].
    pub fn resolve(self, name: String, defaults: &StreamDefaults) -> StreamConfig {
        StreamConfig {
            name,
            sort_window: self.sort_window.unwrap_or(defaults.sort_window),
            late_policy: self.late_policy.unwrap_or(defaults.late_policy),
            channel_filter: self.channel_filter.unwrap_or(defaults.channel_filter),
            merge_channels: self.merge_channels.unwrap_or(defaults.merge_channels),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
