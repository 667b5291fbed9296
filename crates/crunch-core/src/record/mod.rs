mod raw;
mod typed;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::value::Value;

pub use raw::RawRecord;
pub use typed::TypedRecord;

/// Names of the channels a record carries or a component reads.
pub type ChannelSet = BTreeSet<String>;

/// Build a [`ChannelSet`] from anything string-like.
pub fn channel_set<I, S>(names: I) -> ChannelSet
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

// ---------------------------------------------------------------------------
// MRecord — read-only view every evaluation component works against
// ---------------------------------------------------------------------------

/// One timestamped snapshot of channel values from one source.
///
/// Every getter is absence-tolerant: a missing channel and a channel of the
/// wrong type both read as `None`.
pub trait MRecord: Send + Sync + fmt::Debug {
    fn source(&self) -> &str;

    /// Event time in epoch milliseconds.
    fn timestamp(&self) -> i64;

    fn channels(&self) -> ChannelSet;

    fn value(&self, channel: &str) -> Option<Value>;

    fn has_channel(&self, channel: &str) -> bool {
        self.value(channel).is_some()
    }

    fn get_bool(&self, channel: &str) -> Option<bool> {
        self.value(channel)?.as_bool()
    }

    fn get_long(&self, channel: &str) -> Option<i64> {
        self.value(channel)?.as_long()
    }

    fn get_double(&self, channel: &str) -> Option<f64> {
        self.value(channel)?.as_double()
    }

    fn get_string(&self, channel: &str) -> Option<String> {
        match self.value(channel)? {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    fn get_date(&self, channel: &str) -> Option<DateTime<Utc>> {
        self.value(channel)?.as_date()
    }
}

macro_rules! forward_mrecord {
    ($ptr:ident) => {
        impl<T: MRecord + ?Sized> MRecord for $ptr<T> {
            fn source(&self) -> &str {
                (**self).source()
            }

            fn timestamp(&self) -> i64 {
                (**self).timestamp()
            }

            fn channels(&self) -> ChannelSet {
                (**self).channels()
            }

            fn value(&self, channel: &str) -> Option<Value> {
                (**self).value(channel)
            }

            fn has_channel(&self, channel: &str) -> bool {
                (**self).has_channel(channel)
            }
        }
    };
}

forward_mrecord!(Box);
forward_mrecord!(Arc);
