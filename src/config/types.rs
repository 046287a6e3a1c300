use gifsmith_common::QualityTier;
use gifsmith_engine::{FfmpegConfig, LoaderConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::conversion::ConversionParams;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub intake: IntakeConfig,

    #[serde(default)]
    pub defaults: ConversionDefaults,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory with static UI assets, served as the fallback route
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Maximum number of finished conversions kept for download
    #[serde(default = "default_max_artifacts")]
    pub max_artifacts: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            max_artifacts: default_max_artifacts(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_artifacts() -> usize {
    16
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Locally installed ffmpeg, tried before PATH and the mirrors
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Download locations for the ffmpeg binary, tried in order
    #[serde(default)]
    pub mirrors: Vec<String>,

    /// Where a downloaded binary is kept (supports `~`)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,

    #[serde(default = "default_load_rounds")]
    pub load_rounds: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_invoke_timeout_secs")]
    pub invoke_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            mirrors: Vec::new(),
            cache_dir: None,
            load_timeout_secs: default_load_timeout_secs(),
            load_rounds: default_load_rounds(),
            retry_delay_secs: default_retry_delay_secs(),
            invoke_timeout_secs: default_invoke_timeout_secs(),
        }
    }
}

fn default_load_timeout_secs() -> u64 {
    45
}

fn default_load_rounds() -> u32 {
    2
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_invoke_timeout_secs() -> u64 {
    300
}

impl EngineConfig {
    /// Settings for the native ffmpeg driver.
    pub fn to_ffmpeg_config(&self) -> FfmpegConfig {
        let mut loader = LoaderConfig {
            mirrors: self.mirrors.clone(),
            attempt_timeout: Duration::from_secs(self.load_timeout_secs),
            rounds: self.load_rounds,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            ..LoaderConfig::default()
        };
        if let Some(ref dir) = self.cache_dir {
            let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
            loader.cache_dir = PathBuf::from(expanded);
        }

        FfmpegConfig {
            ffmpeg_path: self.ffmpeg_path.clone(),
            loader,
            invoke_timeout: Duration::from_secs(self.invoke_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntakeConfig {
    /// Largest accepted source payload in bytes
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

fn default_max_payload_bytes() -> u64 {
    50 * 1024 * 1024
}

/// Parameters used when a request leaves one out.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionDefaults {
    #[serde(default)]
    pub quality: QualityTier,

    #[serde(default)]
    pub start_time: f64,

    #[serde(default = "default_duration")]
    pub duration: f64,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
}

impl Default for ConversionDefaults {
    fn default() -> Self {
        Self {
            quality: QualityTier::default(),
            start_time: 0.0,
            duration: default_duration(),
            frame_rate: default_frame_rate(),
        }
    }
}

fn default_duration() -> f64 {
    5.0
}

fn default_frame_rate() -> f64 {
    10.0
}

impl ConversionDefaults {
    pub fn params(&self) -> ConversionParams {
        ConversionParams {
            quality: self.quality,
            start_time: self.start_time,
            duration: self.duration,
            frame_rate: self.frame_rate,
        }
    }
}
