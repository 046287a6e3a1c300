use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::conversion::ConversionRequestBuilder;
use crate::intake::Intake;
use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use gifsmith_engine::{EngineHandle, FfmpegEngine, ProgressReporter};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

mod error;
pub mod routes_api;
pub mod routes_sse;

pub use error::ApiError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub builder: Arc<ConversionRequestBuilder>,
    pub artifacts: Arc<ArtifactStore>,
    /// Reporter of the most recent engine load or conversion
    pub progress: Arc<RwLock<ProgressReporter>>,
}

impl AppContext {
    pub fn new(config: Config, engine: Arc<EngineHandle>) -> Self {
        let builder = ConversionRequestBuilder::new(engine, Intake::from_config(&config.intake));
        Self {
            artifacts: Arc::new(ArtifactStore::new(config.server.max_artifacts)),
            builder: Arc::new(builder),
            progress: Arc::new(RwLock::new(ProgressReporter::new())),
            config: Arc::new(config),
        }
    }

    pub fn engine(&self) -> &Arc<EngineHandle> {
        self.builder.engine()
    }

    /// Replace the published reporter with a fresh one and return it.
    pub fn begin_progress(&self) -> ProgressReporter {
        let reporter = ProgressReporter::new();
        *self.progress.write() = reporter.clone();
        reporter
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    // One byte of slack so the intake check, not the extractor, reports an
    // upload that is exactly one byte over the ceiling.
    let body_limit = usize::try_from(ctx.config.intake.max_payload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(1);

    let api = routes_api::api_routes()
        .merge(routes_sse::sse_routes())
        .layer(DefaultBodyLimit::max(body_limit));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Serve static files if directory is provided
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        }
    }

    app
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
///
/// The engine starts loading in the background right away, so the first
/// conversion does not pay for the download.
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let engine = FfmpegEngine::new(config.engine.to_ffmpeg_config())
        .context("Failed to prepare the ffmpeg engine")?;
    let engine = Arc::new(EngineHandle::new(Arc::new(engine)));

    let static_dir = config.server.static_dir.clone();
    let ctx = AppContext::new(config, engine);

    let preload = ctx.clone();
    tokio::spawn(async move {
        let reporter = preload.begin_progress();
        if let Err(e) = preload.engine().ensure_loaded(&reporter).await {
            tracing::warn!("Engine preload failed, will retry on demand: {}", e);
        }
    });

    let app = create_router(ctx, static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
