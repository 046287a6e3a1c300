//! The engine capability and its process-wide lifecycle.
//!
//! An [`Engine`] is the opaque transcoder. It is used through a staged
//! filesystem protocol: write the input under a fixed name, invoke with a flat
//! argument list, read the output back under a second fixed name.
//!
//! [`EngineHandle`] owns the one engine instance of the process and tracks its
//! lifecycle (`unloaded -> loading -> ready | failed`). Invocations go through
//! a [`Session`], and at most one session can exist at a time.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::progress::ProgressReporter;
use crate::{Error, Result};

/// The transcoding engine capability.
///
/// Implementations are not required to support concurrent invocations;
/// [`EngineHandle`] guarantees they never see one.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Short name used in logs and status output.
    fn name(&self) -> &str;

    /// Make the engine usable. Called until it succeeds once.
    async fn load(&self, progress: &ProgressReporter) -> Result<()>;

    /// Stage an input buffer under `name`.
    ///
    /// Staging an input discards everything previously staged or produced.
    async fn write_input(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Run the engine with `args`, reporting completion percentages.
    async fn invoke(&self, args: &[String], progress: &ProgressReporter) -> Result<()>;

    /// Read back the output produced under `name`.
    async fn read_output(&self, name: &str) -> Result<Bytes>;
}

/// Lifecycle state of the engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum EngineState {
    /// No load attempted yet.
    Unloaded,
    /// A load is in progress.
    Loading,
    /// The engine accepts invocations.
    Ready,
    /// The last load failed. Another load may be attempted.
    Failed(String),
}

impl EngineState {
    /// Lowercase label for status output.
    pub fn label(&self) -> &'static str {
        match self {
            EngineState::Unloaded => "unloaded",
            EngineState::Loading => "loading",
            EngineState::Ready => "ready",
            EngineState::Failed(_) => "failed",
        }
    }
}

/// Process-wide owner of the engine instance.
pub struct EngineHandle {
    engine: Arc<dyn Engine>,
    state: RwLock<EngineState>,
    load_lock: Mutex<()>,
    in_flight: Mutex<()>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("engine", &self.engine.name())
            .field("state", &*self.state.read())
            .finish()
    }
}

impl EngineHandle {
    /// Wrap an engine instance. Nothing is loaded yet.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            state: RwLock::new(EngineState::Unloaded),
            load_lock: Mutex::new(()),
            in_flight: Mutex::new(()),
        }
    }

    /// Name of the wrapped engine.
    pub fn name(&self) -> &str {
        self.engine.name()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state.read().clone()
    }

    /// Whether the engine is ready for invocations.
    pub fn is_ready(&self) -> bool {
        *self.state.read() == EngineState::Ready
    }

    /// Whether an invocation currently holds the engine.
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Load the engine unless it is already ready.
    ///
    /// Concurrent callers wait for a single load. A failed load leaves the
    /// handle in [`EngineState::Failed`], and the next call tries again.
    pub async fn ensure_loaded(&self, progress: &ProgressReporter) -> Result<()> {
        if self.is_ready() {
            return Ok(());
        }

        let _guard = self.load_lock.lock().await;
        if self.is_ready() {
            return Ok(());
        }

        *self.state.write() = EngineState::Loading;
        tracing::info!("Loading engine '{}'", self.engine.name());

        match self.engine.load(progress).await {
            Ok(()) => {
                *self.state.write() = EngineState::Ready;
                progress.finish();
                tracing::info!("Engine '{}' ready", self.engine.name());
                Ok(())
            }
            Err(e) => {
                tracing::error!("Engine '{}' failed to load: {}", self.engine.name(), e);
                *self.state.write() = EngineState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Force a fresh load, even if the engine is ready.
    ///
    /// The engine is claimed like an invocation for the whole reload, so a
    /// running session is never pulled out from under its caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] immediately if a session is alive.
    pub async fn reload(&self, progress: &ProgressReporter) -> Result<()> {
        let _claim = self.in_flight.try_lock().map_err(|_| Error::Busy)?;
        {
            let _guard = self.load_lock.lock().await;
            *self.state.write() = EngineState::Unloaded;
        }
        self.ensure_loaded(progress).await
    }

    /// Claim the engine for one invocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Busy`] immediately if another session is alive.
    pub fn try_begin(&self) -> Result<Session<'_>> {
        let guard = self.in_flight.try_lock().map_err(|_| Error::Busy)?;
        Ok(Session {
            _guard: guard,
            handle: self,
        })
    }
}

/// Exclusive access to the engine for one staged invocation.
pub struct Session<'a> {
    _guard: MutexGuard<'a, ()>,
    handle: &'a EngineHandle,
}

impl Session<'_> {
    fn ready(&self) -> Result<&dyn Engine> {
        if self.handle.is_ready() {
            Ok(self.handle.engine.as_ref())
        } else {
            Err(Error::NotLoaded)
        }
    }

    /// See [`Engine::write_input`].
    pub async fn write_input(&self, name: &str, bytes: &[u8]) -> Result<()> {
        self.ready()?.write_input(name, bytes).await
    }

    /// See [`Engine::invoke`].
    pub async fn invoke(&self, args: &[String], progress: &ProgressReporter) -> Result<()> {
        self.ready()?.invoke(args, progress).await
    }

    /// See [`Engine::read_output`].
    pub async fn read_output(&self, name: &str) -> Result<Bytes> {
        self.ready()?.read_output(name).await
    }
}
