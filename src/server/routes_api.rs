use crate::artifacts::ArtifactSummary;
use crate::artifacts::Artifact;
use crate::config::ConversionDefaults;
use crate::conversion::{ConversionParams, ConversionRequest, ParamOverrides};
use crate::server::{ApiError, AppContext};
use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use gifsmith_common::paths::UNKNOWN_MEDIA_TYPE;
use gifsmith_common::{Error, QualityTier};
use serde::Deserialize;
use uuid::Uuid;

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/engine", get(engine_status))
        .route("/engine/load", post(load_engine))
        .route("/conversions", get(list_conversions).post(create_conversion))
        .route(
            "/conversions/:id",
            get(get_conversion).delete(delete_conversion),
        )
        .route("/qualities", get(list_qualities))
}

async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "engine": ctx.engine().state().label(),
        "busy": ctx.engine().is_busy(),
        "artifacts": ctx.artifacts.len(),
    }))
}

async fn engine_status(State(ctx): State<AppContext>) -> impl IntoResponse {
    let engine = ctx.engine();
    Json(serde_json::json!({
        "name": engine.name(),
        "status": engine.state(),
        "busy": engine.is_busy(),
    }))
}

async fn load_engine(State(ctx): State<AppContext>) -> Result<impl IntoResponse, ApiError> {
    // A running conversion keeps both the engine and the published progress.
    if ctx.engine().is_busy() {
        return Err(Error::Busy.into());
    }

    let reporter = ctx.begin_progress();
    ctx.engine().reload(&reporter).await.map_err(|e| match e {
        gifsmith_engine::Error::Busy => Error::Busy,
        e => Error::engine_load_failed(e.attempts(), e.to_string()),
    })?;

    Ok(Json(serde_json::json!({
        "name": ctx.engine().name(),
        "status": ctx.engine().state(),
    })))
}

async fn list_qualities() -> impl IntoResponse {
    let tiers: Vec<_> = QualityTier::ALL
        .iter()
        .map(|tier| {
            serde_json::json!({
                "quality": tier,
                "profile": tier.profile(),
            })
        })
        .collect();
    Json(tiers)
}

#[derive(Debug, Default, Deserialize)]
struct ConvertQuery {
    quality: Option<String>,
    start_time: Option<f64>,
    duration: Option<f64>,
    frame_rate: Option<f64>,
    filename: Option<String>,
}

impl ConvertQuery {
    fn params(&self, defaults: &ConversionDefaults) -> Result<ConversionParams, Error> {
        ParamOverrides {
            quality: self.quality.clone(),
            start_time: self.start_time,
            duration: self.duration,
            frame_rate: self.frame_rate,
        }
        .apply(defaults.params())
    }
}

async fn create_conversion(
    State(ctx): State<AppContext>,
    Query(query): Query<ConvertQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let params = query.params(&ctx.config.defaults)?;
    ctx.builder.plan(&params)?;

    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(UNKNOWN_MEDIA_TYPE);
    let source = ctx
        .builder
        .intake()
        .accept_bytes(body, media_type, query.filename.clone())?;

    if ctx.engine().is_busy() {
        return Err(Error::Busy.into());
    }

    let reporter = ctx.begin_progress();
    let result = ctx
        .builder
        .execute_with_progress(ConversionRequest::new(source, params), &reporter)
        .await?;

    let artifact = Artifact::from_result(result);
    let summary = artifact.summary();
    ctx.artifacts.insert(artifact);

    tracing::info!("Stored conversion {} ({} bytes)", summary.id, summary.size);
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn list_conversions(State(ctx): State<AppContext>) -> Json<Vec<ArtifactSummary>> {
    Json(ctx.artifacts.list())
}

#[derive(Debug, Default, Deserialize)]
struct DownloadQuery {
    #[serde(default)]
    download: bool,
}

async fn get_conversion(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let artifact = ctx
        .artifacts
        .get(&id)
        .ok_or_else(|| Error::not_found(format!("Conversion {}", id)))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(artifact.mime_type),
    );
    if query.download {
        let disposition = format!("attachment; filename=\"{}\"", artifact.download_name);
        let value = HeaderValue::from_str(&disposition)
            .map_err(|e| Error::internal(format!("invalid download name: {}", e)))?;
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((headers, Body::from(artifact.bytes)).into_response())
}

async fn delete_conversion(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    if ctx.artifacts.remove(&id).is_some() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
