//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires a [`MemoryEngine`], a default config
//! and a full [`AppContext`]. The [`TestHarness::with_server`] constructor
//! starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use gifsmith::config::Config;
use gifsmith::server::{create_router, AppContext};
use gifsmith_engine::{EngineHandle, MemoryEngine};

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory engine.
pub struct TestHarness {
    pub ctx: AppContext,
    pub engine: Arc<MemoryEngine>,
}

impl TestHarness {
    /// Create a new harness with default configuration and an echoing engine.
    pub fn new() -> Self {
        Self::with(Config::default(), MemoryEngine::echo())
    }

    pub fn with_engine(engine: MemoryEngine) -> Self {
        Self::with(Config::default(), engine)
    }

    pub fn with_config(config: Config) -> Self {
        Self::with(config, MemoryEngine::echo())
    }

    pub fn with(config: Config, engine: MemoryEngine) -> Self {
        let engine = Arc::new(engine);
        let handle = Arc::new(EngineHandle::new(engine.clone()));
        let ctx = AppContext::new(config, handle);
        Self { ctx, engine }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone(), None)
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }
}

/// A few bytes standing in for an MP4 clip.
pub fn sample_clip() -> Vec<u8> {
    let mut clip = b"\x00\x00\x00\x18ftypmp42".to_vec();
    clip.extend_from_slice(&[0u8; 64]);
    clip
}
