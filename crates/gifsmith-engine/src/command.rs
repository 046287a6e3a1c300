//! Builder for executing external tool commands with timeout support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::{Error, Result};

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use gifsmith_engine::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> gifsmith_engine::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-hide_banner")
///     .arg("-version")
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    current_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            current_dir: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Run the process with `dir` as its working directory.
    pub fn current_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// The arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`Error::Timeout`] if the process does not finish in time.
    ///   The child is killed.
    /// - Returns [`Error::ToolFailed`] if the process exits with a non-zero
    ///   status (message is the trimmed stderr).
    /// - Returns [`Error::ToolFailed`] if spawning the process fails.
    pub async fn execute(&self) -> Result<ToolOutput> {
        self.execute_streaming(|_| {}).await
    }

    /// Execute the command, handing every stdout line to `on_line` as it
    /// arrives. Output is still captured in full.
    pub async fn execute_streaming(&self, mut on_line: impl FnMut(&str)) -> Result<ToolOutput> {
        let program_name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            Error::tool_failed(program_name.clone(), format!("failed to spawn: {e}"))
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Drain stderr concurrently so a chatty child cannot block on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf).await;
            }
            buf
        });

        let run = async {
            let mut collected = String::new();
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Some(line) = lines.next_line().await? {
                    on_line(&line);
                    collected.push_str(&line);
                    collected.push('\n');
                }
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, collected))
        };

        match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok((status, stdout))) => {
                let stderr = stderr_task.await.unwrap_or_default();
                let output = ToolOutput {
                    status,
                    stdout,
                    stderr: String::from_utf8_lossy(&stderr).to_string(),
                };

                if !status.success() {
                    return Err(Error::tool_failed(
                        program_name,
                        format!("exited with status {}: {}", status, output.stderr.trim()),
                    ));
                }

                Ok(output)
            }
            Ok(Err(e)) => Err(Error::tool_failed(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => {
                let _ = child.start_kill();
                stderr_task.abort();
                Err(Error::timeout(program_name, self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn execute_echo() {
        // `echo` should be universally available.
        let output = ToolCommand::new(PathBuf::from("echo"))
            .arg("hello")
            .execute()
            .await;

        match output {
            Ok(out) => {
                assert!(out.status.success());
                assert!(out.stdout.trim().contains("hello"));
            }
            Err(_) => {
                // On some minimal environments echo may not exist; skip.
            }
        }
    }

    #[tokio::test]
    async fn execute_nonexistent_tool() {
        let result = ToolCommand::new(PathBuf::from("nonexistent_tool_xyz_12345"))
            .execute()
            .await;
        assert!(matches!(result, Err(Error::ToolFailed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_fires() {
        // `sleep 10` should be killed well before 10 seconds.
        let result = ToolCommand::new(PathBuf::from("sleep"))
            .arg("10")
            .timeout(Duration::from_millis(100))
            .execute()
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(err.to_string().contains("timed out"), "unexpected error: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streaming_sees_every_line() {
        let mut seen = Vec::new();
        let output = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "printf 'a=1\\nb=2\\nprogress=end\\n'"])
            .execute_streaming(|line| seen.push(line.to_string()))
            .await
            .unwrap();
        assert_eq!(seen, vec!["a=1", "b=2", "progress=end"]);
        assert_eq!(output.stdout, "a=1\nb=2\nprogress=end\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failure_carries_stderr() {
        let err = ToolCommand::new(PathBuf::from("sh"))
            .args(["-c", "echo 'Invalid data found when processing input' >&2; exit 1"])
            .execute()
            .await
            .unwrap_err();
        assert!(
            err.to_string()
                .contains("Invalid data found when processing input"),
            "unexpected error: {err}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), b"x").unwrap();
        let output = ToolCommand::new(PathBuf::from("ls"))
            .current_dir(dir.path())
            .execute()
            .await
            .unwrap();
        assert!(output.stdout.contains("marker.txt"));
    }
}
