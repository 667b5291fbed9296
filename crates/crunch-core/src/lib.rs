pub mod error;
pub mod event;
pub mod pipe;
pub mod record;
pub mod state;
pub mod stream;
pub mod supplier;
pub mod trigger;
pub mod value;
pub mod windowed;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{CoreError, CoreReason, CoreResult};
pub use event::Event;
pub use record::{ChannelSet, MRecord, RawRecord, TypedRecord};
pub use value::Value;
