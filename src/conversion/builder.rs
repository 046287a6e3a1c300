//! Conversion execution against the shared engine.

use std::sync::Arc;

use bytes::Bytes;
use gifsmith_common::paths::GIF_MEDIA_TYPE;
use gifsmith_common::units::format_bytes;
use gifsmith_common::{Error, Result};
use gifsmith_engine::{EngineHandle, ProgressReporter};

use super::instructions::{plan, Instructions};
use super::request::{ConversionParams, ConversionRequest};
use crate::intake::Intake;

/// Name the source clip is staged under.
pub const INPUT_NAME: &str = "input.mp4";

/// Name the engine writes the GIF to.
pub const OUTPUT_NAME: &str = "output.gif";

/// Share of the progress range given to an on-demand engine load.
const LOAD_SHARE: u8 = 50;

/// A finished conversion.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub bytes: Bytes,
    pub mime_type: &'static str,
}

impl ConversionResult {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Turns conversion requests into engine invocations.
///
/// The builder holds the process-wide [`EngineHandle`] explicitly; only one
/// conversion runs at a time and a second concurrent call gets
/// [`Error::Busy`].
#[derive(Debug, Clone)]
pub struct ConversionRequestBuilder {
    engine: Arc<EngineHandle>,
    intake: Intake,
}

impl ConversionRequestBuilder {
    pub fn new(engine: Arc<EngineHandle>, intake: Intake) -> Self {
        Self { engine, intake }
    }

    pub fn engine(&self) -> &Arc<EngineHandle> {
        &self.engine
    }

    pub fn intake(&self) -> &Intake {
        &self.intake
    }

    /// Validate `params` and assemble the argument list without running it.
    pub fn plan(&self, params: &ConversionParams) -> Result<Instructions> {
        plan(params)
    }

    /// Run a conversion, discarding progress.
    pub async fn execute(&self, request: ConversionRequest) -> Result<ConversionResult> {
        self.execute_with_progress(request, &ProgressReporter::new())
            .await
    }

    /// Run a conversion, reporting percentages to `progress`.
    ///
    /// Parameters and the source payload are checked before the engine is
    /// touched. The engine is loaded on first use; that load then reports
    /// through the first half of `progress` and the conversion through the
    /// second.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`], [`Error::UnsupportedMediaType`] or
    ///   [`Error::PayloadTooLarge`] for rejected requests
    /// - [`Error::Busy`] if another conversion holds the engine
    /// - [`Error::EngineLoadFailed`] if the engine cannot be loaded
    /// - [`Error::ConversionFailed`] with the engine's message otherwise
    pub async fn execute_with_progress(
        &self,
        request: ConversionRequest,
        progress: &ProgressReporter,
    ) -> Result<ConversionResult> {
        let instructions = self.plan(&request.params)?;
        self.intake
            .check(&request.source.media_type, request.source.len())?;

        let session = self.engine.try_begin().map_err(|_| Error::Busy)?;

        let run_progress = if self.engine.is_ready() {
            progress.clone()
        } else {
            self.engine
                .ensure_loaded(&progress.span(0, LOAD_SHARE))
                .await
                .map_err(load_failed)?;
            progress.span(LOAD_SHARE, 100)
        };

        tracing::info!(
            "Converting {} ({}) at {} quality, estimated at most {}",
            request.source.file_name.as_deref().unwrap_or("upload"),
            format_bytes(request.source.len()),
            request.params.quality,
            format_bytes(instructions.estimated_max_bytes())
        );

        session
            .write_input(INPUT_NAME, &request.source.bytes)
            .await
            .map_err(conversion_failed)?;
        session
            .invoke(&instructions.to_args(), &run_progress)
            .await
            .map_err(conversion_failed)?;
        let bytes = session
            .read_output(OUTPUT_NAME)
            .await
            .map_err(conversion_failed)?;

        if bytes.is_empty() {
            return Err(Error::conversion_failed("engine produced an empty output"));
        }

        progress.finish();
        tracing::info!("Conversion complete: {}", format_bytes(bytes.len() as u64));

        Ok(ConversionResult {
            bytes,
            mime_type: GIF_MEDIA_TYPE,
        })
    }
}

fn load_failed(err: gifsmith_engine::Error) -> Error {
    match err {
        gifsmith_engine::Error::LoadExhausted { attempts, message } => {
            Error::engine_load_failed(attempts, message)
        }
        other => Error::engine_load_failed(other.attempts(), other.to_string()),
    }
}

fn conversion_failed(err: gifsmith_engine::Error) -> Error {
    tracing::warn!("Engine invocation failed: {}", err);
    Error::conversion_failed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::SourcePayload;
    use assert_matches::assert_matches;
    use gifsmith_common::QualityTier;
    use gifsmith_engine::MemoryEngine;

    fn builder(engine: Arc<MemoryEngine>) -> ConversionRequestBuilder {
        ConversionRequestBuilder::new(Arc::new(EngineHandle::new(engine)), Intake::new(1024))
    }

    fn request(bytes: &[u8], media_type: &str, params: ConversionParams) -> ConversionRequest {
        ConversionRequest::new(SourcePayload::new(bytes.to_vec(), media_type), params)
    }

    #[tokio::test]
    async fn test_execute_returns_gif() {
        let engine = Arc::new(MemoryEngine::echo());
        let result = builder(engine.clone())
            .execute(request(b"clip", "video/mp4", ConversionParams::default()))
            .await
            .unwrap();

        assert_eq!(result.mime_type, "image/gif");
        assert_eq!(&result.bytes[..], b"GIF89aclip");
        assert_eq!(engine.invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_duration_never_reaches_engine() {
        let engine = Arc::new(MemoryEngine::echo());
        let params = ConversionParams {
            duration: 0.0,
            ..ConversionParams::default()
        };
        let err = builder(engine.clone())
            .execute(request(b"clip", "video/mp4", params))
            .await
            .unwrap_err();

        assert_matches!(err, Error::InvalidParameter(_));
        assert_eq!(engine.load_count(), 0);
        assert!(engine.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_non_video_rejected_before_engine() {
        let engine = Arc::new(MemoryEngine::echo());
        let err = builder(engine.clone())
            .execute(request(b"hello", "text/plain", ConversionParams::default()))
            .await
            .unwrap_err();

        assert_matches!(err, Error::UnsupportedMediaType(_));
        assert_eq!(engine.load_count(), 0);
    }

    #[tokio::test]
    async fn test_engine_failure_is_conversion_failed_verbatim() {
        let engine = Arc::new(MemoryEngine::failing("moov atom not found"));
        let err = builder(engine)
            .execute(request(b"clip", "video/mp4", ConversionParams::default()))
            .await
            .unwrap_err();

        assert_matches!(err, Error::ConversionFailed(msg) if msg.contains("moov atom not found"));
    }

    #[tokio::test]
    async fn test_empty_output_is_a_failure() {
        let engine = Arc::new(MemoryEngine::new(|_args, _input| Ok(Bytes::new())));
        let err = builder(engine)
            .execute(request(b"clip", "video/mp4", ConversionParams::default()))
            .await
            .unwrap_err();

        assert_matches!(err, Error::ConversionFailed(_));
    }

    #[tokio::test]
    async fn test_load_failure_reports_attempts() {
        let engine = Arc::new(MemoryEngine::echo().failing_loads(1));
        let b = builder(engine.clone());

        let err = b
            .execute(request(b"clip", "video/mp4", ConversionParams::default()))
            .await
            .unwrap_err();
        assert_matches!(err, Error::EngineLoadFailed { attempts: 1, .. });

        // The failed load is retried on the next request.
        b.execute(request(b"clip", "video/mp4", ConversionParams::default()))
            .await
            .unwrap();
        assert_eq!(engine.load_count(), 2);
    }

    #[tokio::test]
    async fn test_progress_reaches_100() {
        let engine = Arc::new(MemoryEngine::echo());
        let progress = ProgressReporter::new();
        builder(engine)
            .execute_with_progress(
                request(b"clip", "video/mp4", ConversionParams::default()),
                &progress,
            )
            .await
            .unwrap();
        assert_eq!(progress.current(), 100);
    }

    #[tokio::test]
    async fn test_on_demand_load_is_reported() {
        use futures::StreamExt;
        use std::time::Duration;

        // The delay keeps the engine on the post-load value long enough to be
        // observed.
        let engine = Arc::new(MemoryEngine::echo().with_delay(Duration::from_millis(200)));
        let (progress, updates) = gifsmith_engine::progress::channel();
        let collector = tokio::spawn(updates.collect::<Vec<u8>>());

        builder(engine)
            .execute_with_progress(
                request(b"clip", "video/mp4", ConversionParams::default()),
                &progress,
            )
            .await
            .unwrap();
        drop(progress);

        let seen = collector.await.unwrap();
        assert!(seen.contains(&LOAD_SHARE), "{seen:?}");
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
        assert_eq!(seen.last(), Some(&100));
    }

    #[tokio::test]
    async fn test_engine_receives_tier_parameters() {
        let engine = Arc::new(MemoryEngine::echo());
        let params = ConversionParams {
            quality: QualityTier::Low,
            ..ConversionParams::default()
        };
        builder(engine.clone())
            .execute(request(b"clip", "video/mp4", params))
            .await
            .unwrap();

        let args = &engine.invocations()[0];
        let chain = &args[args.iter().position(|a| a == "-vf").unwrap() + 1];
        assert!(chain.starts_with("fps=8,scale=320:-1"), "{chain}");
    }
}
