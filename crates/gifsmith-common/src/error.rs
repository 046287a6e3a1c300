//! Unified error type for gifsmith.
//!
//! Every failure a conversion can hit is funneled into [`Error`], which
//! carries enough context for the HTTP layer to derive a status code via
//! [`Error::http_status`] and a stable machine-readable tag via
//! [`Error::kind`]. None of these errors is fatal to the process.

/// Hints shown to the user when the engine cannot be loaded.
pub const ENGINE_LOAD_REMEDIATION: &[&str] = &[
    "Check your network connection",
    "Set engine.ffmpeg_path to a locally installed ffmpeg",
    "Retry loading the engine",
];

/// Unified error type covering all failure modes in gifsmith.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Every configured engine location failed to load.
    #[error("Engine load failed after {attempts} attempt(s): {message}")]
    EngineLoadFailed {
        /// Number of individual load attempts that were made.
        attempts: u32,
        /// The last failure reported by the loader.
        message: String,
    },

    /// A request parameter (duration, start time, frame rate, quality) is invalid.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The uploaded payload does not declare a video media type.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// The uploaded payload exceeds the configured size ceiling.
    #[error("Payload too large: {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Size of the rejected payload in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },

    /// The engine failed while transcoding. The message is the engine's own.
    #[error("Conversion failed: {0}")]
    ConversionFailed(String),

    /// Another conversion is still running on the engine.
    #[error("A conversion is already in progress")]
    Busy,

    /// The requested artifact could not be found.
    #[error("{0} not found")]
    NotFound(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::EngineLoadFailed { .. } => 503,
            Error::InvalidParameter(_) => 400,
            Error::UnsupportedMediaType(_) => 415,
            Error::PayloadTooLarge { .. } => 413,
            Error::ConversionFailed(_) => 502,
            Error::Busy => 409,
            Error::NotFound(_) => 404,
            Error::Io(_) => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Stable snake_case tag for this error, used in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::EngineLoadFailed { .. } => "engine_load_failed",
            Error::InvalidParameter(_) => "invalid_parameter",
            Error::UnsupportedMediaType(_) => "unsupported_media_type",
            Error::PayloadTooLarge { .. } => "payload_too_large",
            Error::ConversionFailed(_) => "conversion_failed",
            Error::Busy => "busy",
            Error::NotFound(_) => "not_found",
            Error::Io(_) => "io",
            Error::Internal(_) => "internal",
        }
    }

    /// Whether the error was raised before the engine was touched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidParameter(_)
                | Error::UnsupportedMediaType(_)
                | Error::PayloadTooLarge { .. }
                | Error::Busy
        )
    }

    /// Convenience constructor for [`Error::InvalidParameter`].
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Convenience constructor for [`Error::UnsupportedMediaType`].
    pub fn unsupported_media_type<S: Into<String>>(media_type: S) -> Self {
        Self::UnsupportedMediaType(media_type.into())
    }

    /// Convenience constructor for [`Error::ConversionFailed`].
    pub fn conversion_failed<S: Into<String>>(msg: S) -> Self {
        Self::ConversionFailed(msg.into())
    }

    /// Convenience constructor for [`Error::EngineLoadFailed`].
    pub fn engine_load_failed<S: Into<String>>(attempts: u32, msg: S) -> Self {
        Self::EngineLoadFailed {
            attempts,
            message: msg.into(),
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found<S: Into<String>>(what: S) -> Self {
        Self::NotFound(what.into())
    }

    /// Convenience constructor for [`Error::Internal`].
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
