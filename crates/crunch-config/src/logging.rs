use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Logging configuration. All fields have defaults so the entire `[logging]`
/// section may be omitted from `crunch.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level filter (e.g. `"info"`, `"debug"`).
    pub level: String,
    /// Per-module level overrides, e.g. `{ "crunch_core::state" = "debug" }`.
    pub modules: HashMap<String, String>,
    /// Optional file path for log output. Relative paths are resolved against
    /// the config file's parent directory.
    pub file: Option<PathBuf>,
    /// Output format: `plain` (human-readable) or `json` (structured).
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            modules: HashMap::new(),
            file: None,
            format: LogFormat::Plain,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn missing_section_uses_defaults() {
        let w: Wrapper = toml::from_str("").unwrap();
        assert_eq!(w.logging.level, "info");
        assert_eq!(w.logging.format, LogFormat::Plain);
        assert!(w.logging.file.is_none());
        assert!(w.logging.modules.is_empty());
    }

    #[test]
    fn partial_section() {
        let w: Wrapper = toml::from_str(
            r#"
[logging]
format = "json"
modules = { "crunch_core::state" = "debug" }
"#,
        )
        .unwrap();
        assert_eq!(w.logging.level, "info");
        assert_eq!(w.logging.format, LogFormat::Json);
        assert_eq!(w.logging.modules["crunch_core::state"], "debug");
    }

    #[test]
    fn unknown_format_rejected() {
        let r: Result<Wrapper, _> = toml::from_str("[logging]\nformat = \"xml\"\n");
        assert!(r.is_err());
    }
}
