//! Integration tests for configuration loading and validation.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use gifsmith::config::{load_config, load_config_or_default, validate_config, Config};
use gifsmith_common::QualityTier;
use tempfile::tempdir;

fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn defaults_are_valid() {
    let config = Config::default();
    validate_config(&config).unwrap();

    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.max_artifacts, 16);
    assert_eq!(config.intake.max_payload_bytes, 52_428_800);
    assert_eq!(config.engine.load_timeout_secs, 45);
    assert_eq!(config.engine.load_rounds, 2);
    assert_eq!(config.defaults.quality, QualityTier::Medium);
    assert_eq!(config.defaults.duration, 5.0);
    assert_eq!(config.defaults.frame_rate, 10.0);
}

#[test]
fn full_config_round_trips_into_engine_settings() {
    let (_dir, path) = write_config(
        r#"
[server]
host = "127.0.0.1"
port = 9000
max_artifacts = 4

[engine]
ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
mirrors = [
    "https://primary.example.com/ffmpeg",
    "https://backup.example.com/ffmpeg",
]
cache_dir = "/var/cache/gifsmith"
load_timeout_secs = 30
load_rounds = 3
retry_delay_secs = 1
invoke_timeout_secs = 120

[intake]
max_payload_bytes = 1048576

[defaults]
quality = "high"
start_time = 1.5
duration = 3
frame_rate = 12
"#,
    );

    let config = load_config(&path).unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.max_artifacts, 4);
    assert_eq!(config.intake.max_payload_bytes, 1_048_576);
    assert_eq!(config.defaults.quality, QualityTier::High);
    assert_eq!(config.defaults.duration, 3.0);

    let ffmpeg = config.engine.to_ffmpeg_config();
    assert_eq!(
        ffmpeg.ffmpeg_path,
        Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg"))
    );
    assert_eq!(ffmpeg.loader.mirrors.len(), 2);
    assert_eq!(ffmpeg.loader.cache_dir, PathBuf::from("/var/cache/gifsmith"));
    assert_eq!(ffmpeg.loader.attempt_timeout, Duration::from_secs(30));
    assert_eq!(ffmpeg.loader.rounds, 3);
    assert_eq!(ffmpeg.loader.retry_delay, Duration::from_secs(1));
    assert_eq!(ffmpeg.invoke_timeout, Duration::from_secs(120));
}

#[test]
fn partial_config_keeps_defaults() {
    let (_dir, path) = write_config("[server]\nport = 3000\n");
    let config = load_config(&path).unwrap();

    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.engine.load_rounds, 2);
    assert_eq!(config.defaults.quality, QualityTier::Medium);
}

#[test]
fn explicit_path_wins() {
    let (_dir, path) = write_config("[server]\nport = 4321\n");
    let config = load_config_or_default(Some(&path)).unwrap();
    assert_eq!(config.server.port, 4321);
}

#[test]
fn rejects_port_zero() {
    let (_dir, path) = write_config("[server]\nport = 0\n");
    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("port"));
}

#[test]
fn rejects_zero_payload_ceiling() {
    let (_dir, path) = write_config("[intake]\nmax_payload_bytes = 0\n");
    assert!(load_config(&path).is_err());
}

#[test]
fn rejects_out_of_range_load_timeout() {
    for timeout in ["0", "601"] {
        let (_dir, path) = write_config(&format!("[engine]\nload_timeout_secs = {timeout}\n"));
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("load_timeout_secs"), "{err}");
    }
}

#[test]
fn rejects_zero_rounds() {
    let (_dir, path) = write_config("[engine]\nload_rounds = 0\n");
    assert!(load_config(&path).is_err());
}

#[test]
fn rejects_non_http_mirror() {
    let (_dir, path) = write_config("[engine]\nmirrors = [\"ftp://example.com/ffmpeg\"]\n");
    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("http"));

    let (_dir, path) = write_config("[engine]\nmirrors = [\"not a url\"]\n");
    assert!(load_config(&path).is_err());
}

#[test]
fn rejects_unknown_quality() {
    let (_dir, path) = write_config("[defaults]\nquality = \"ultra\"\n");
    assert!(load_config(&path).is_err());
}

#[test]
fn rejects_invalid_default_duration() {
    let (_dir, path) = write_config("[defaults]\nduration = 0\n");
    let err = load_config(&path).unwrap_err();
    assert!(format!("{err:#}").contains("duration"));
}

#[test]
fn malformed_toml_is_reported() {
    let (_dir, path) = write_config("[server\nport = 1");
    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}
