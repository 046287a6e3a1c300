//! # gifsmith-engine
//!
//! The transcoding engine seam for gifsmith.
//!
//! The engine is an opaque black box: it receives a staged input file, a flat
//! argument list, and leaves an output file behind in its own scratch storage.
//! This crate provides:
//!
//! - **Engine seam** ([`Engine`], [`EngineHandle`]) -- the capability trait and
//!   the init-once / load-failed / ready lifecycle around a single instance,
//!   including the single in-flight invocation guard.
//! - **Native driver** ([`FfmpegEngine`]) -- runs an `ffmpeg` executable inside
//!   a private [`Scratch`] directory.
//! - **In-memory driver** ([`MemoryEngine`]) -- a substitute engine with a
//!   pluggable transcoder, for embedding and tests.
//! - **Engine loading** ([`MirrorLoader`]) -- sequential fallback over an
//!   ordered list of download locations, bounded by a per-attempt timeout.
//! - **Command execution** ([`ToolCommand`]) -- async process builder with
//!   timeout support and line-by-line stdout streaming.
//! - **Progress** ([`progress`]) -- monotonically non-decreasing percentage
//!   streams.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gifsmith_engine::{EngineHandle, FfmpegConfig, FfmpegEngine, ProgressReporter};
//!
//! # async fn example() -> gifsmith_engine::Result<()> {
//! let engine = FfmpegEngine::new(FfmpegConfig::default())?;
//! let handle = EngineHandle::new(Arc::new(engine));
//! handle.ensure_loaded(&ProgressReporter::new()).await?;
//! assert!(handle.is_ready());
//! # Ok(())
//! # }
//! ```

mod error;
pub mod command;
pub mod engine;
pub mod ffmpeg;
pub mod loader;
pub mod memory;
pub mod progress;
pub mod scratch;
pub mod tools;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use engine::{Engine, EngineHandle, EngineState, Session};
pub use error::{Error, Result};
pub use ffmpeg::{FfmpegConfig, FfmpegEngine};
pub use loader::{LoaderConfig, MirrorLoader};
pub use memory::MemoryEngine;
pub use progress::{ProgressReporter, ProgressStream};
pub use scratch::Scratch;
pub use tools::{check_tool, ToolInfo};
