//! Staged scratch storage for engine invocations.
//!
//! A [`Scratch`] is the engine's private filesystem: input buffers are written
//! into it under fixed names, the engine runs with it as the working
//! directory, and output buffers are read back from it. Contents are
//! ephemeral and may be overwritten on every call.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::TempDir;

use crate::{Error, Result};

/// Private temporary directory holding staged engine files.
///
/// # Example
///
/// ```no_run
/// use gifsmith_engine::Scratch;
///
/// # async fn example() -> gifsmith_engine::Result<()> {
/// let scratch = Scratch::new()?;
/// scratch.write("input.mp4", b"...").await?;
/// // ... run the engine with scratch.path() as its working directory ...
/// let gif = scratch.read("output.gif").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Scratch {
    temp_dir: TempDir,
}

impl Scratch {
    /// Create a new, empty scratch directory under the system temp dir.
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("gifsmith-")
            .tempdir()
            .map_err(|e| Error::Scratch(format!("failed to create temp dir: {e}")))?;
        Ok(Self { temp_dir })
    }

    /// Path to the scratch directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Resolve a staged file name to its path inside the scratch directory.
    ///
    /// Only plain file names are accepted; anything that could escape the
    /// directory is rejected.
    pub fn file(&self, name: &str) -> Result<PathBuf> {
        let candidate = Path::new(name);
        let is_plain = !name.is_empty()
            && name != "."
            && name != ".."
            && candidate.file_name().map(|f| f == candidate.as_os_str()) == Some(true);
        if !is_plain {
            return Err(Error::Scratch(format!("invalid staged file name: {name:?}")));
        }
        Ok(self.temp_dir.path().join(name))
    }

    /// Stage `bytes` under `name`, replacing any previous content.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.file(name)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    /// Read back a staged file.
    pub async fn read(&self, name: &str) -> Result<Bytes> {
        let path = self.file(name)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::missing_file(name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a staged file exists.
    pub fn contains(&self, name: &str) -> bool {
        self.file(name).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Remove every staged file.
    pub async fn clear(&self) -> Result<()> {
        let mut entries = tokio::fs::read_dir(self.temp_dir.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}
