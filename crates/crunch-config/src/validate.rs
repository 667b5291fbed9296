use crate::engine::EngineConfig;

/// Internal validation, called automatically during `EngineConfig::from_str` / `load`.
pub(crate) fn validate(config: &EngineConfig) -> anyhow::Result<()> {
    if config.engine.channel_capacity == 0 {
        anyhow::bail!("engine.channel_capacity must be > 0");
    }

    for s in &config.streams {
        if s.name.is_empty() {
            anyhow::bail!("stream section with empty name");
        }
    }

    Ok(())
}
