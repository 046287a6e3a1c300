//! External tool detection.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::command::ToolCommand;
use crate::{Error, Result};

/// Information about an external tool.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool is available.
    pub available: bool,
    /// Version string if available.
    pub version: Option<String>,
    /// Path to the tool executable.
    pub path: Option<PathBuf>,
}

/// Check if ffmpeg (or a compatible build at `program`) runs, and get its
/// version line.
///
/// # Example
///
/// ```no_run
/// use gifsmith_engine::check_tool;
/// use std::path::Path;
///
/// let info = check_tool(Path::new("ffmpeg"));
/// if info.available {
///     println!("ffmpeg version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(program: &Path) -> ToolInfo {
    let name = program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string());

    match Command::new(program).arg("-version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            let path = if program.components().count() > 1 {
                Some(program.to_path_buf())
            } else {
                which::which(program).ok()
            };

            ToolInfo {
                name,
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name,
            available: false,
            version: None,
            path: None,
        },
    }
}

/// Require that a tool is on `PATH`, returning its location.
///
/// # Errors
///
/// Returns an error if the tool is not found.
pub fn require_tool(name: &str) -> Result<PathBuf> {
    which::which(name).map_err(|_| Error::tool_not_found(name))
}

/// Confirm that `path` is a working ffmpeg build by running `-version`.
///
/// Returns the first line of the version banner.
pub async fn verify_ffmpeg(path: &Path, timeout: Duration) -> Result<String> {
    let output = ToolCommand::new(path.to_path_buf())
        .arg("-version")
        .timeout(timeout)
        .execute()
        .await?;

    let banner = output.stdout.lines().next().unwrap_or_default().trim().to_string();
    if !banner.to_lowercase().contains("ffmpeg") {
        return Err(Error::tool_failed(
            path.display().to_string(),
            format!("unexpected version banner: {banner:?}"),
        ));
    }
    Ok(banner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_tool_not_found() {
        let info = check_tool(Path::new("nonexistent_tool_12345"));
        assert!(!info.available);
        assert!(info.version.is_none());
        assert!(info.path.is_none());
    }

    #[test]
    fn test_require_tool_missing() {
        assert!(matches!(
            require_tool("nonexistent_tool_12345"),
            Err(Error::ToolNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_verify_rejects_non_ffmpeg() {
        let err = verify_ffmpeg(Path::new("true"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unexpected version banner"));
    }
}
