//! Error types for gifsmith-engine.

use std::time::Duration;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or driving the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// An external tool failed to execute.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// An operation did not finish in time.
    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },

    /// Fetching the engine from a location failed.
    #[error("download from {url} failed: {message}")]
    Download { url: String, message: String },

    /// Every configured location was tried and none produced a usable engine.
    #[error("no engine location succeeded after {attempts} attempt(s): {message}")]
    LoadExhausted { attempts: u32, message: String },

    /// A file expected in the scratch storage is absent.
    #[error("file not found in scratch storage: {name}")]
    MissingFile { name: String },

    /// The engine was used before it was loaded.
    #[error("engine is not loaded")]
    NotLoaded,

    /// Another invocation currently owns the engine.
    #[error("engine is busy with another invocation")]
    Busy,

    /// A scratch storage name or layout problem.
    #[error("scratch error: {0}")]
    Scratch(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }

    /// Create a tool execution failed error.
    pub fn tool_failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(what: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            what: what.into(),
            after,
        }
    }

    /// Create a download error.
    pub fn download(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a missing file error.
    pub fn missing_file(name: impl Into<String>) -> Self {
        Self::MissingFile { name: name.into() }
    }

    /// Number of load attempts this error accounts for.
    pub fn attempts(&self) -> u32 {
        match self {
            Error::LoadExhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}
