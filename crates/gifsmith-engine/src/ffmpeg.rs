//! Native ffmpeg driver.
//!
//! [`FfmpegEngine`] runs an `ffmpeg` executable with a private [`Scratch`]
//! directory as its working directory, so the argument list can refer to the
//! staged files by their bare names.
//!
//! The executable is resolved in this order: configured path, `PATH`, a binary
//! cached by an earlier download, then the mirror list.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;

use crate::command::ToolCommand;
use crate::engine::Engine;
use crate::loader::{LoaderConfig, MirrorLoader};
use crate::progress::ProgressReporter;
use crate::scratch::Scratch;
use crate::tools::{require_tool, verify_ffmpeg};
use crate::{Error, Result};

/// Default upper bound for a single transcode.
pub const DEFAULT_INVOKE_TIMEOUT: Duration = Duration::from_secs(300);

/// Options placed before the caller's arguments on every invocation.
const GLOBAL_ARGS: &[&str] = &[
    "-hide_banner",
    "-loglevel",
    "error",
    "-nostats",
    "-progress",
    "pipe:1",
    "-y",
];

/// Settings for [`FfmpegEngine`].
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    /// Explicit ffmpeg location. Ignored if it does not exist.
    pub ffmpeg_path: Option<PathBuf>,
    /// Download fallback.
    pub loader: LoaderConfig,
    /// Upper bound for a single transcode.
    pub invoke_timeout: Duration,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            loader: LoaderConfig::default(),
            invoke_timeout: DEFAULT_INVOKE_TIMEOUT,
        }
    }
}

/// Engine backed by a native ffmpeg executable.
#[derive(Debug)]
pub struct FfmpegEngine {
    config: FfmpegConfig,
    loader: MirrorLoader,
    binary: RwLock<Option<PathBuf>>,
    scratch: Scratch,
}

impl FfmpegEngine {
    /// Create the driver and its scratch directory. Nothing is resolved yet.
    pub fn new(config: FfmpegConfig) -> Result<Self> {
        Ok(Self {
            loader: MirrorLoader::new(config.loader.clone()),
            config,
            binary: RwLock::new(None),
            scratch: Scratch::new()?,
        })
    }

    /// The resolved executable, once loaded.
    pub fn binary(&self) -> Option<PathBuf> {
        self.binary.read().clone()
    }

    /// The scratch directory invocations run in.
    pub fn scratch(&self) -> &Scratch {
        &self.scratch
    }

    fn local_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(ref path) = self.config.ffmpeg_path {
            if path.exists() {
                candidates.push(path.clone());
            } else {
                tracing::warn!("Configured ffmpeg path {:?} does not exist", path);
            }
        }
        match require_tool("ffmpeg") {
            Ok(path) => candidates.push(path),
            Err(e) => tracing::debug!("{}", e),
        }
        let cached = self.loader.cached_binary();
        if cached.exists() {
            candidates.push(cached);
        }
        candidates
    }
}

/// Value following `-t` in an argument list, in seconds.
fn clip_duration(args: &[String]) -> Option<f64> {
    args.iter()
        .position(|a| a == "-t")
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|d| *d > 0.0)
}

/// Percentage for an `out_time_us=` progress line.
fn progress_percent(line: &str, duration_secs: f64) -> Option<u8> {
    let micros = line.strip_prefix("out_time_us=")?.trim().parse::<i64>().ok()?;
    let elapsed = micros.max(0) as f64 / 1_000_000.0;
    // 100% is only reported once the output has been read back.
    Some(((elapsed / duration_secs).clamp(0.0, 0.99) * 100.0) as u8)
}

#[async_trait]
impl Engine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn load(&self, progress: &ProgressReporter) -> Result<()> {
        let verify_timeout = self.config.loader.attempt_timeout;

        let mut local_attempts = 0u32;
        let mut local_error = None;

        for candidate in self.local_candidates() {
            local_attempts += 1;
            match verify_ffmpeg(&candidate, verify_timeout).await {
                Ok(banner) => {
                    tracing::info!("Using {} at {:?}", banner, candidate);
                    *self.binary.write() = Some(candidate);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Skipping ffmpeg candidate {:?}: {}", candidate, e);
                    local_error = Some(format!("{}: {}", candidate.display(), e));
                }
            }
        }

        match self.loader.fetch(progress).await {
            Ok(path) => {
                *self.binary.write() = Some(path);
                Ok(())
            }
            Err(Error::LoadExhausted { attempts, message }) => Err(Error::LoadExhausted {
                attempts: attempts + local_attempts,
                // With no mirror tried, the local failure is the only useful one.
                message: match local_error {
                    Some(local) if attempts == 0 => local,
                    _ => message,
                },
            }),
            Err(e) => Err(e),
        }
    }

    async fn write_input(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.scratch.clear().await?;
        self.scratch.write(name, bytes).await
    }

    async fn invoke(&self, args: &[String], progress: &ProgressReporter) -> Result<()> {
        let binary = self.binary().ok_or(Error::NotLoaded)?;
        let duration = clip_duration(args);

        tracing::debug!("ffmpeg {}", args.join(" "));

        let mut cmd = ToolCommand::new(binary);
        cmd.current_dir(self.scratch.path());
        cmd.timeout(self.config.invoke_timeout);
        cmd.args(GLOBAL_ARGS.iter().copied());
        cmd.args(args.iter().cloned());

        cmd.execute_streaming(|line| {
            if let Some(pct) = duration.and_then(|d| progress_percent(line, d)) {
                progress.report(pct);
            }
        })
        .await?;

        Ok(())
    }

    async fn read_output(&self, name: &str) -> Result<Bytes> {
        self.scratch.read(name).await
    }
}
