use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::logging::LoggingConfig;
use crate::stream::{StreamConfig, StreamDefaults, StreamOverride};
use crate::validate;

// ---------------------------------------------------------------------------
// [engine]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Capacity of the bounded event channel used by partitioned execution.
    pub channel_capacity: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// Raw TOML structure (intermediate representation)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EngineConfigRaw {
    #[serde(default)]
    engine: EngineSection,
    #[serde(default)]
    stream_defaults: StreamDefaults,
    #[serde(default)]
    stream: HashMap<String, StreamOverride>,
    #[serde(default)]
    logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// EngineConfig (resolved, validated)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub engine: EngineSection,
    pub stream_defaults: StreamDefaults,
    /// Resolved per-stream overrides, sorted by name.
    pub streams: Vec<StreamConfig>,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Read and parse a `crunch.toml` file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.as_ref().display()))?;
        content.parse()
    }

    /// The resolved config for stream `name`, falling back to the defaults
    /// when no `[stream.<name>]` section exists.
    pub fn stream(&self, name: &str) -> StreamConfig {
        self.streams
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .unwrap_or_else(|| StreamConfig::from_defaults(name, &self.stream_defaults))
    }
}

impl FromStr for EngineConfig {
    type Err = anyhow::Error;

    /// Parse a TOML string into a resolved, validated [`EngineConfig`].
    fn from_str(toml_str: &str) -> anyhow::Result<Self> {
        let raw: EngineConfigRaw = toml::from_str(toml_str)?;

        let mut streams: Vec<StreamConfig> = raw
            .stream
            .into_iter()
            .map(|(name, ovr)| ovr.resolve(name, &raw.stream_defaults))
            .collect();
        streams.sort_by(|a, b| a.name.cmp(&b.name));

        let config = EngineConfig {
            engine: raw.engine,
            stream_defaults: raw.stream_defaults,
            streams,
            logging: raw.logging,
        };

        validate::validate(&config)?;

        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;
    use crate::types::LatePolicy;

    const FULL_TOML: &str = r#"
[engine]
channel_capacity = 64

[stream_defaults]
sort_window    = "500ms"
late_policy    = "drop"
channel_filter = true
merge_channels = false

[stream.press_line]
sort_window = "2s"

[stream.oven]
merge_channels = true
late_policy = "emit"

[logging]
level = "debug"
format = "json"
file = "logs/crunch.log"
"#;

    #[test]
    fn load_full_toml() {
        let cfg: EngineConfig = FULL_TOML.parse().unwrap();

        assert_eq!(cfg.engine.channel_capacity, 64);
        assert_eq!(cfg.stream_defaults.sort_window.as_millis_i64(), 500);

        // sorted by name
        assert_eq!(cfg.streams.len(), 2);
        assert_eq!(cfg.streams[0].name, "oven");
        assert!(cfg.streams[0].merge_channels);
        assert_eq!(cfg.streams[0].late_policy, LatePolicy::Emit);
        assert_eq!(cfg.streams[0].sort_window_ms(), 500);

        assert_eq!(cfg.streams[1].name, "press_line");
        assert_eq!(cfg.streams[1].sort_window_ms(), 2_000);
        assert_eq!(cfg.streams[1].late_policy, LatePolicy::Drop);

        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert!(cfg.logging.file.is_some());
    }

    #[test]
    fn unknown_stream_falls_back_to_defaults() {
        let cfg: EngineConfig = FULL_TOML.parse().unwrap();
        let sc = cfg.stream("conveyor");
        assert_eq!(sc.name, "conveyor");
        assert_eq!(sc.sort_window_ms(), 500);
        assert_eq!(sc.late_policy, LatePolicy::Drop);
    }

    #[test]
    fn empty_toml_is_valid() {
        let cfg: EngineConfig = "".parse().unwrap();
        assert_eq!(cfg.engine.channel_capacity, 1024);
        assert!(cfg.streams.is_empty());
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = "[engine]\nchannel_capacity = 0\n"
            .parse::<EngineConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("channel_capacity"));
    }

    #[test]
    fn bad_duration_rejected() {
        let r = "[stream_defaults]\nsort_window = \"soon\"\n".parse::<EngineConfig>();
        assert!(r.is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crunch.toml");
        std::fs::write(&path, FULL_TOML).unwrap();
        let cfg = EngineConfig::load(&path).unwrap();
        assert_eq!(cfg.engine.channel_capacity, 64);

        assert!(EngineConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
