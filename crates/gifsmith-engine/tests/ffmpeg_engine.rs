//! Native driver tests against a scripted stand-in for ffmpeg.
//!
//! The script honours the staged-file protocol: it reads `input.mp4` from its
//! working directory, prints `-progress` style lines, and writes its output to
//! the last argument.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use gifsmith_engine::{
    progress, Engine, EngineHandle, Error, FfmpegConfig, FfmpegEngine, ProgressReporter,
};

const SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-version" ]; then
  echo "ffmpeg version 6.1-scripted"
  exit 0
fi
for last; do :; done
if grep -q corrupt input.mp4; then
  echo "input.mp4: Invalid data found when processing input" >&2
  exit 1
fi
echo "out_time_us=1000000"
echo "progress=continue"
echo "out_time_us=4000000"
echo "progress=continue"
printf 'GIF89a' > "$last"
cat input.mp4 >> "$last"
echo "progress=end"
"#;

const BROKEN_SCRIPT: &str = r#"#!/bin/sh
echo "libavcodec.so.60: cannot open shared object file" >&2
exit 127
"#;

fn install_script(dir: &Path) -> PathBuf {
    let path = dir.join("ffmpeg-scripted");
    std::fs::write(&path, SCRIPT).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn args() -> Vec<String> {
    ["-ss", "0", "-t", "5", "-i", "input.mp4", "-f", "gif", "output.gif"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

async fn loaded_handle(dir: &Path) -> EngineHandle {
    let engine = FfmpegEngine::new(FfmpegConfig {
        ffmpeg_path: Some(install_script(dir)),
        ..FfmpegConfig::default()
    })
    .unwrap();
    let handle = EngineHandle::new(Arc::new(engine));
    handle.ensure_loaded(&ProgressReporter::new()).await.unwrap();
    handle
}

#[tokio::test]
async fn test_staged_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let handle = loaded_handle(dir.path()).await;

    let session = handle.try_begin().unwrap();
    session.write_input("input.mp4", b"clip-bytes").await.unwrap();
    session.invoke(&args(), &ProgressReporter::new()).await.unwrap();
    let out = session.read_output("output.gif").await.unwrap();

    assert_eq!(&out[..], b"GIF89aclip-bytes");
}

#[tokio::test]
async fn test_progress_follows_out_time() {
    let dir = tempfile::tempdir().unwrap();
    let handle = loaded_handle(dir.path()).await;

    let (reporter, stream) = progress::channel();
    let session = handle.try_begin().unwrap();
    session.write_input("input.mp4", b"clip").await.unwrap();
    session.invoke(&args(), &reporter).await.unwrap();

    assert_eq!(reporter.current(), 80);
    drop(reporter);
    let seen: Vec<u8> = stream.collect().await;
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
}

#[tokio::test]
async fn test_engine_failure_message_is_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let handle = loaded_handle(dir.path()).await;

    let session = handle.try_begin().unwrap();
    session.write_input("input.mp4", b"corrupt").await.unwrap();
    let err = session.invoke(&args(), &ProgressReporter::new()).await.unwrap_err();

    assert!(matches!(err, Error::ToolFailed { .. }));
    assert!(err
        .to_string()
        .contains("Invalid data found when processing input"));
    assert!(matches!(
        session.read_output("output.gif").await,
        Err(Error::MissingFile { .. })
    ));
}

#[tokio::test]
async fn test_second_run_does_not_see_first_output() {
    let dir = tempfile::tempdir().unwrap();
    let engine = FfmpegEngine::new(FfmpegConfig {
        ffmpeg_path: Some(install_script(dir.path())),
        ..FfmpegConfig::default()
    })
    .unwrap();
    engine.load(&ProgressReporter::new()).await.unwrap();

    engine.write_input("input.mp4", b"one").await.unwrap();
    engine.invoke(&args(), &ProgressReporter::new()).await.unwrap();
    let first = engine.read_output("output.gif").await.unwrap();

    engine.write_input("input.mp4", b"corrupt").await.unwrap();
    assert!(engine.invoke(&args(), &ProgressReporter::new()).await.is_err());
    assert!(engine.read_output("output.gif").await.is_err());
    assert_eq!(&first[..], b"GIF89aone");
}

#[tokio::test]
async fn test_broken_local_binary_is_reported_without_mirrors() {
    // A working ffmpeg on PATH would be picked up instead.
    if which::which("ffmpeg").is_ok() {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("ffmpeg-broken");
    std::fs::write(&broken, BROKEN_SCRIPT).unwrap();
    std::fs::set_permissions(&broken, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut config = FfmpegConfig {
        ffmpeg_path: Some(broken),
        ..FfmpegConfig::default()
    };
    config.loader.cache_dir = dir.path().join("cache");
    let engine = FfmpegEngine::new(config).unwrap();

    match engine.load(&ProgressReporter::new()).await {
        Err(Error::LoadExhausted { attempts, message }) => {
            assert_eq!(attempts, 1);
            assert!(message.contains("cannot open shared object file"), "{message}");
        }
        other => panic!("expected LoadExhausted, got {other:?}"),
    }
}
