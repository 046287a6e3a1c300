//! In-memory engine.
//!
//! [`MemoryEngine`] keeps its staged filesystem in a map and delegates the
//! actual transcode to a closure. It follows the same protocol as the native
//! driver: the input name is the argument after `-i`, the output name is the
//! last argument.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;

use crate::engine::Engine;
use crate::progress::ProgressReporter;
use crate::{Error, Result};

/// Transcoder closure: receives the argument list and the staged input,
/// returns the output bytes or an engine-style error message.
pub type Transcoder =
    dyn Fn(&[String], &Bytes) -> std::result::Result<Bytes, String> + Send + Sync;

/// GIF89a signature used by [`MemoryEngine::echo`].
const GIF_SIGNATURE: &[u8] = b"GIF89a";

/// Engine whose staged storage and transcoder live in memory.
pub struct MemoryEngine {
    files: Mutex<HashMap<String, Bytes>>,
    transcoder: Box<Transcoder>,
    invocations: Mutex<Vec<Vec<String>>>,
    loads: AtomicU32,
    failing_loads: AtomicU32,
    delay: Option<Duration>,
    load_delay: Option<Duration>,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("files", &self.files.lock().keys().cloned().collect::<Vec<_>>())
            .field("invocations", &self.invocations.lock().len())
            .finish_non_exhaustive()
    }
}

impl MemoryEngine {
    /// Create an engine around `transcoder`.
    pub fn new<F>(transcoder: F) -> Self
    where
        F: Fn(&[String], &Bytes) -> std::result::Result<Bytes, String> + Send + Sync + 'static,
    {
        Self {
            files: Mutex::new(HashMap::new()),
            transcoder: Box::new(transcoder),
            invocations: Mutex::new(Vec::new()),
            loads: AtomicU32::new(0),
            failing_loads: AtomicU32::new(0),
            delay: None,
            load_delay: None,
        }
    }

    /// Engine that answers every invocation with a GIF signature followed by
    /// the input bytes.
    pub fn echo() -> Self {
        Self::new(|_args, input| {
            let mut out = BytesMut::with_capacity(GIF_SIGNATURE.len() + input.len());
            out.put_slice(GIF_SIGNATURE);
            out.put_slice(input);
            Ok(out.freeze())
        })
    }

    /// Engine whose every invocation fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(move |_args, _input| Err(message.clone()))
    }

    /// Make the first `n` loads fail.
    pub fn failing_loads(self, n: u32) -> Self {
        self.failing_loads.store(n, Ordering::SeqCst);
        self
    }

    /// Make every invocation take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every load take at least `delay`.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = Some(delay);
        self
    }

    /// Number of times `load` was called.
    pub fn load_count(&self) -> u32 {
        self.loads.load(Ordering::SeqCst)
    }

    /// Argument lists of every invocation so far.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        self.invocations.lock().clone()
    }

    /// Names currently staged.
    pub fn staged(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

fn input_name(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|a| a == "-i")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[async_trait]
impl Engine for MemoryEngine {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, progress: &ProgressReporter) -> Result<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.load_delay {
            tokio::time::sleep(delay).await;
        }
        let remaining = self.failing_loads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_loads.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::LoadExhausted {
                attempts: 1,
                message: "memory engine configured to fail loading".to_string(),
            });
        }
        progress.finish();
        Ok(())
    }

    async fn write_input(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let mut files = self.files.lock();
        files.clear();
        files.insert(name.to_string(), Bytes::copy_from_slice(bytes));
        Ok(())
    }

    async fn invoke(&self, args: &[String], progress: &ProgressReporter) -> Result<()> {
        self.invocations.lock().push(args.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let input_name = input_name(args)
            .ok_or_else(|| Error::tool_failed("memory", "no input given (-i missing)"))?;
        let output_name = args
            .last()
            .ok_or_else(|| Error::tool_failed("memory", "no output given"))?;

        let input = self
            .files
            .lock()
            .get(input_name)
            .cloned()
            .ok_or_else(|| {
                Error::tool_failed("memory", format!("{input_name}: No such file or directory"))
            })?;

        progress.report(50);
        let output = (self.transcoder)(args, &input).map_err(|m| Error::tool_failed("memory", m))?;
        self.files.lock().insert(output_name.clone(), output);
        progress.report(99);
        Ok(())
    }

    async fn read_output(&self, name: &str) -> Result<Bytes> {
        self.files
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::missing_file(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_echo_round() {
        let engine = MemoryEngine::echo();
        let progress = ProgressReporter::new();
        engine.write_input("input.mp4", b"frames").await.unwrap();
        engine
            .invoke(&args(&["-i", "input.mp4", "-f", "gif", "output.gif"]), &progress)
            .await
            .unwrap();
        let out = engine.read_output("output.gif").await.unwrap();
        assert_eq!(&out[..], b"GIF89aframes");
        assert_eq!(engine.invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_write_input_discards_previous_output() {
        let engine = MemoryEngine::echo();
        let progress = ProgressReporter::new();
        engine.write_input("input.mp4", b"a").await.unwrap();
        engine
            .invoke(&args(&["-i", "input.mp4", "output.gif"]), &progress)
            .await
            .unwrap();
        engine.write_input("input.mp4", b"b").await.unwrap();
        assert_eq!(engine.staged(), vec!["input.mp4"]);
        assert!(matches!(
            engine.read_output("output.gif").await,
            Err(Error::MissingFile { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_input_fails_like_a_tool() {
        let engine = MemoryEngine::echo();
        let err = engine
            .invoke(&args(&["-i", "input.mp4", "output.gif"]), &ProgressReporter::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolFailed { .. }));
    }

    #[tokio::test]
    async fn test_failing_transcoder_message_is_kept() {
        let engine = MemoryEngine::failing("Invalid data found when processing input");
        engine.write_input("input.mp4", b"junk").await.unwrap();
        let err = engine
            .invoke(&args(&["-i", "input.mp4", "output.gif"]), &ProgressReporter::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid data found when processing input"));
    }
}
