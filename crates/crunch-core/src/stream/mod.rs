//! Per-stream record stages that run ahead of the evaluation functions.

mod channel_filter;
mod merger;
mod sort;

pub use channel_filter::ChannelFilter;
pub use merger::RecordMerger;
pub use sort::SortBuffer;
