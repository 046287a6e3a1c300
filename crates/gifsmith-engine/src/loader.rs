//! Engine download with mirror fallback.
//!
//! When no local ffmpeg can be found, the engine binary is fetched from an
//! ordered list of mirrors. Mirrors are tried one after another, each attempt
//! bounded by a timeout, and the first one that yields a working binary wins.
//! The whole pass is repeated for a configured number of rounds before the
//! load is reported as failed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use gifsmith_common::units::{format_bytes, percent};
use tokio::io::AsyncWriteExt;

use crate::progress::ProgressReporter;
use crate::tools::verify_ffmpeg;
use crate::{Error, Result};

/// Default per-attempt timeout.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(45);

/// Default number of passes over the mirror list.
pub const DEFAULT_ROUNDS: u32 = 2;

/// Default pause between passes.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Size assumed for progress when a mirror sends no `Content-Length`.
const ASSUMED_ENGINE_SIZE: u64 = 25 * 1024 * 1024;

/// Settings for [`MirrorLoader`].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Download locations, in order of preference.
    pub mirrors: Vec<String>,
    /// Directory the downloaded binary is stored in.
    pub cache_dir: PathBuf,
    /// Upper bound for a single download + verification attempt.
    pub attempt_timeout: Duration,
    /// How many times the full mirror list is tried.
    pub rounds: u32,
    /// Pause between two rounds.
    pub retry_delay: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            mirrors: Vec::new(),
            cache_dir: std::env::temp_dir().join("gifsmith").join("engine"),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            rounds: DEFAULT_ROUNDS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Fetches the engine binary from the first mirror that works.
#[derive(Debug, Clone)]
pub struct MirrorLoader {
    client: reqwest::Client,
    config: LoaderConfig,
}

impl MirrorLoader {
    /// Create a loader with the given settings.
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Loader settings.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Where the downloaded binary lives once fetched.
    pub fn cached_binary(&self) -> PathBuf {
        let name = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
        self.config.cache_dir.join(name)
    }

    /// Try every mirror, round after round, until one yields a verified binary.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LoadExhausted`] with the total number of attempts and
    /// the last failure once every mirror has failed in every round.
    pub async fn fetch(&self, progress: &ProgressReporter) -> Result<PathBuf> {
        let mirrors = &self.config.mirrors;
        if mirrors.is_empty() {
            return Err(Error::LoadExhausted {
                attempts: 0,
                message: "no engine mirrors configured".to_string(),
            });
        }

        let rounds = self.config.rounds.max(1);
        let mut attempts = 0u32;
        let mut last_error = String::new();

        for round in 1..=rounds {
            if round > 1 {
                tracing::info!(
                    "Retrying engine download ({}/{}) in {:?}",
                    round - 1,
                    rounds - 1,
                    self.config.retry_delay
                );
                tokio::time::sleep(self.config.retry_delay).await;
            }

            for (i, url) in mirrors.iter().enumerate() {
                attempts += 1;
                if i > 0 {
                    tracing::info!(
                        "Trying alternative source ({}/{}): {}",
                        i + 1,
                        mirrors.len(),
                        url
                    );
                } else {
                    tracing::info!("Downloading engine from {}", url);
                }

                let attempt = self.attempt(url, progress);
                match tokio::time::timeout(self.config.attempt_timeout, attempt).await {
                    Ok(Ok(path)) => {
                        tracing::info!("Engine ready from {} ({} attempt(s))", url, attempts);
                        return Ok(path);
                    }
                    Ok(Err(e)) => {
                        tracing::warn!("Mirror {} failed: {}", url, e);
                        last_error = e.to_string();
                    }
                    Err(_) => {
                        let e = Error::timeout(
                            format!("download from {url}"),
                            self.config.attempt_timeout,
                        );
                        tracing::warn!("Mirror {} failed: {}", url, e);
                        last_error = e.to_string();
                    }
                }
            }
        }

        Err(Error::LoadExhausted {
            attempts,
            message: last_error,
        })
    }

    async fn attempt(&self, url: &str, progress: &ProgressReporter) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.config.cache_dir).await?;
        let partial = self.config.cache_dir.join("ffmpeg.part");

        self.download(url, &partial, progress).await?;
        make_executable(&partial).await?;

        if let Err(e) = verify_ffmpeg(&partial, self.config.attempt_timeout).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(Error::download(url, e.to_string()));
        }

        let dest = self.cached_binary();
        tokio::fs::rename(&partial, &dest).await?;
        Ok(dest)
    }

    async fn download(&self, url: &str, dest: &Path, progress: &ProgressReporter) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::download(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::download(url, format!("HTTP {status}")));
        }

        let total = response.content_length().unwrap_or(ASSUMED_ENGINE_SIZE);
        let mut file = tokio::fs::File::create(dest).await?;
        let mut body = response.bytes_stream();
        let mut received = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| Error::download(url, e.to_string()))?;
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;

            let pct = percent(received, total);
            if progress.report(pct) {
                tracing::debug!(
                    "Downloading: {}% ({}/{})",
                    pct,
                    format_bytes(received),
                    format_bytes(total)
                );
            }
        }
        file.flush().await?;
        // The handle must be closed before the binary is executed.
        drop(file);

        if received == 0 {
            return Err(Error::download(url, "empty response body"));
        }
        Ok(())
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
