use bytes::Bytes;
use gifsmith_common::{Error, QualityTier, Result};
use serde::{Deserialize, Serialize};

/// User-chosen conversion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionParams {
    pub quality: QualityTier,
    /// Offset into the clip, in seconds.
    pub start_time: f64,
    /// Length of the converted window, in seconds.
    pub duration: f64,
    /// Requested output frame rate. Checked, but the filter always decimates
    /// to the quality tier's rate.
    pub frame_rate: f64,
}

impl Default for ConversionParams {
    fn default() -> Self {
        Self {
            quality: QualityTier::Medium,
            start_time: 0.0,
            duration: 5.0,
            frame_rate: 10.0,
        }
    }
}

impl ConversionParams {
    /// Check the numeric parameters.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "duration must be greater than zero (got {})",
                self.duration
            )));
        }
        if !self.start_time.is_finite() || self.start_time < 0.0 {
            return Err(Error::invalid_parameter(format!(
                "start_time must not be negative (got {})",
                self.start_time
            )));
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(Error::invalid_parameter(format!(
                "frame_rate must be greater than zero (got {})",
                self.frame_rate
            )));
        }
        Ok(())
    }
}

/// Caller-supplied values laid over a base set of parameters.
///
/// Unset fields keep the base value. Nothing is validated here; that happens
/// when the result is planned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamOverrides {
    pub quality: Option<String>,
    pub start_time: Option<f64>,
    pub duration: Option<f64>,
    pub frame_rate: Option<f64>,
}

impl ParamOverrides {
    /// Apply the overrides to `base`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] for an unknown quality name.
    pub fn apply(&self, base: ConversionParams) -> Result<ConversionParams> {
        let mut params = base;
        if let Some(quality) = self.quality.as_deref() {
            params.quality = quality.parse()?;
        }
        if let Some(start_time) = self.start_time {
            params.start_time = start_time;
        }
        if let Some(duration) = self.duration {
            params.duration = duration;
        }
        if let Some(frame_rate) = self.frame_rate {
            params.frame_rate = frame_rate;
        }
        Ok(params)
    }
}

/// A source clip as received from a file or an upload.
#[derive(Debug, Clone)]
pub struct SourcePayload {
    pub bytes: Bytes,
    /// Declared media type, e.g. `video/mp4`.
    pub media_type: String,
    pub file_name: Option<String>,
}

impl SourcePayload {
    pub fn new(bytes: impl Into<Bytes>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One conversion: a source clip plus its parameters.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub source: SourcePayload,
    pub params: ConversionParams,
}

impl ConversionRequest {
    pub fn new(source: SourcePayload, params: ConversionParams) -> Self {
        Self { source, params }
    }
}
