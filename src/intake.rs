//! Source clip intake.
//!
//! Builds [`SourcePayload`]s from files and uploads, rejecting anything that is
//! not declared as video or exceeds the size ceiling.

use std::path::Path;

use bytes::Bytes;
use gifsmith_common::paths::{essence, is_video_media_type, media_type_for_path, video_extensions};
use gifsmith_common::{Error, Result};

use crate::config::IntakeConfig;
use crate::conversion::SourcePayload;

/// Media type and size checks for incoming clips.
#[derive(Debug, Clone, Copy)]
pub struct Intake {
    max_payload_bytes: u64,
}

impl Intake {
    pub fn new(max_payload_bytes: u64) -> Self {
        Self { max_payload_bytes }
    }

    pub fn from_config(config: &IntakeConfig) -> Self {
        Self::new(config.max_payload_bytes)
    }

    pub fn max_payload_bytes(&self) -> u64 {
        self.max_payload_bytes
    }

    /// Check a declared media type and payload size.
    ///
    /// A payload of exactly the ceiling is accepted.
    pub fn check(&self, media_type: &str, size: u64) -> Result<()> {
        if !is_video_media_type(media_type) {
            return Err(Error::unsupported_media_type(media_type));
        }
        if size > self.max_payload_bytes {
            return Err(Error::PayloadTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
        }
        Ok(())
    }

    /// Accept an uploaded buffer with its `Content-Type`.
    pub fn accept_bytes(
        &self,
        bytes: Bytes,
        media_type: &str,
        file_name: Option<String>,
    ) -> Result<SourcePayload> {
        self.check(media_type, bytes.len() as u64)?;
        Ok(SourcePayload {
            bytes,
            media_type: essence(media_type),
            file_name,
        })
    }

    /// Check a file without reading it. Returns its media type and size.
    pub async fn inspect_file(&self, path: &Path) -> Result<(&'static str, u64)> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found(format!("input file {:?}", path))
            } else {
                Error::Io(e)
            }
        })?;
        if !metadata.is_file() {
            return Err(Error::invalid_parameter(format!(
                "{:?} is not a regular file",
                path
            )));
        }

        let media_type = media_type_for_path(path);
        if !is_video_media_type(media_type) {
            return Err(Error::unsupported_media_type(format!(
                "{} (supported extensions: {})",
                media_type,
                video_extensions().join(", ")
            )));
        }
        self.check(media_type, metadata.len())?;
        Ok((media_type, metadata.len()))
    }

    /// Read a clip from disk, guessing its media type from the extension.
    pub async fn accept_file(&self, path: &Path) -> Result<SourcePayload> {
        let (media_type, _) = self.inspect_file(path).await?;
        let bytes = tokio::fs::read(path).await?;
        tracing::debug!("Read {} bytes from {:?}", bytes.len(), path);

        // The file may have grown since it was inspected.
        self.check(media_type, bytes.len() as u64)?;

        Ok(SourcePayload {
            bytes: Bytes::from(bytes),
            media_type: media_type.to_string(),
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
        })
    }
}

impl Default for Intake {
    fn default() -> Self {
        Self::from_config(&IntakeConfig::default())
    }
}
