mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Accepted range for `engine.load_timeout_secs`
const LOAD_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=600;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./gifsmith.toml",
        "~/.config/gifsmith/config.toml",
        "/etc/gifsmith/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.server.max_artifacts == 0 {
        anyhow::bail!("server.max_artifacts must be at least 1");
    }

    if let Some(ref dir) = config.server.static_dir {
        if !dir.is_dir() {
            tracing::warn!("Static directory does not exist: {:?}", dir);
        }
    }

    if config.intake.max_payload_bytes == 0 {
        anyhow::bail!("intake.max_payload_bytes must be greater than 0");
    }

    let engine = &config.engine;
    if !LOAD_TIMEOUT_RANGE.contains(&engine.load_timeout_secs) {
        anyhow::bail!(
            "engine.load_timeout_secs must be between {} and {} (got {})",
            LOAD_TIMEOUT_RANGE.start(),
            LOAD_TIMEOUT_RANGE.end(),
            engine.load_timeout_secs
        );
    }

    if engine.load_rounds == 0 {
        anyhow::bail!("engine.load_rounds must be at least 1");
    }

    if engine.invoke_timeout_secs == 0 {
        anyhow::bail!("engine.invoke_timeout_secs must be greater than 0");
    }

    for mirror in &engine.mirrors {
        let url = reqwest::Url::parse(mirror)
            .with_context(|| format!("Invalid engine mirror URL: {}", mirror))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Engine mirror must be an http(s) URL: {}", mirror);
        }
    }

    if let Some(ref path) = engine.ffmpeg_path {
        if !path.exists() {
            tracing::warn!("Configured ffmpeg path does not exist: {:?}", path);
        }
    }

    config
        .defaults
        .params()
        .validate()
        .context("Invalid [defaults] section")?;

    Ok(())
}
