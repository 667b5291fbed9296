use crate::record::{ChannelSet, MRecord};

/// Drops records that carry none of the channels a sub-stream reads.
///
/// An empty channel set means the sub-stream reads nothing specific, so
/// every record passes.
#[derive(Debug, Clone, Default)]
pub struct ChannelFilter {
    channels: ChannelSet,
}

impl ChannelFilter {
    pub fn new(channels: ChannelSet) -> Self {
        Self { channels }
    }

    pub fn accepts(&self, record: &dyn MRecord) -> bool {
        self.channels.is_empty() || self.channels.iter().any(|c| record.has_channel(c))
    }
}
