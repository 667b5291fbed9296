use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// HumanDuration
// ---------------------------------------------------------------------------

/// Suffixes understood by [`HumanDuration`], largest unit first.
const UNITS: [(&str, u64); 5] = [
    ("d", 86_400_000),
    ("h", 3_600_000),
    ("m", 60_000),
    ("s", 1_000),
    ("ms", 1),
];

/// An event-time span written as `<integer><unit>`: `"250ms"`, `"30s"`,
/// `"5m"`, `"1h"`, `"2d"`. Held as whole milliseconds, the unit of record
/// timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HumanDuration {
    millis: u64,
}

impl HumanDuration {
    pub const ZERO: Self = Self { millis: 0 };

    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.millis)
    }

    /// Saturates at `i64::MAX`.
    pub fn as_millis_i64(&self) -> i64 {
        i64::try_from(self.millis).unwrap_or(i64::MAX)
    }
}

impl From<HumanDuration> for Duration {
    fn from(hd: HumanDuration) -> Self {
        hd.as_duration()
    }
}

impl From<Duration> for HumanDuration {
    fn from(d: Duration) -> Self {
        Self::from_millis(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}

impl FromStr for HumanDuration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let text = s.trim();
        let digits = text.bytes().take_while(u8::is_ascii_digit).count();
        let (amount, unit) = text.split_at(digits);
        if amount.is_empty() {
            anyhow::bail!("duration {s:?} must start with a number");
        }
        let per_unit = UNITS
            .iter()
            .find(|(suffix, _)| *suffix == unit)
            .map(|(_, ms)| *ms)
            .ok_or_else(|| anyhow::anyhow!("duration {s:?}: unit must be one of ms, s, m, h, d"))?;
        let amount: u64 = amount.parse()?;
        let millis = amount
            .checked_mul(per_unit)
            .ok_or_else(|| anyhow::anyhow!("duration {s:?} overflows"))?;
        Ok(Self::from_millis(millis))
    }
}

/// Renders in the largest unit that divides the value exactly.
impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis == 0 {
            return f.write_str("0s");
        }
        let (suffix, per_unit) = UNITS
            .iter()
            .find(|(_, ms)| self.millis % ms == 0)
            .copied()
            .unwrap_or(("ms", 1));
        write!(f, "{}{suffix}", self.millis / per_unit)
    }
}

impl Serialize for HumanDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HumanDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// LatePolicy
// ---------------------------------------------------------------------------

/// What the reordering stage does with a record that arrives after a newer
/// record has already been released downstream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatePolicy {
    /// Release it immediately, out of order.
    #[default]
    Emit,
    /// Discard it.
    Drop,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
