// Tests for configuration loading and its mapping onto session settings

use std::fs;
use tempfile::TempDir;
use voiceline::Config;

#[test]
fn test_load_config_from_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("voiceline.toml");
    fs::write(
        &path,
        r#"
[service]
name = "voiceline"

[audio]
sample_rate = 16000
channels = 1
frame_size = 4096

[server]
stream_url = "ws://example.test/ws/audio-stream-native"
api_base_url = "http://example.test"
max_reconnect_attempts = 5
reconnect_backoff_ms = 1000
"#,
    )
    .unwrap();

    let base = dir.path().join("voiceline");
    let config = Config::load(base.to_str().unwrap()).unwrap();

    assert_eq!(config.service.name, "voiceline");
    assert_eq!(config.audio.sample_rate, 16000);
    assert_eq!(config.server.max_reconnect_attempts, 5);
}

#[test]
fn test_session_config_mapping() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("voiceline.toml");
    fs::write(
        &path,
        r#"
[service]
name = "voiceline"

[audio]
sample_rate = 8000
channels = 1
frame_size = 2048

[server]
stream_url = "ws://example.test/ws/audio-stream-native"
api_base_url = "http://example.test"
max_reconnect_attempts = 3
reconnect_backoff_ms = 500
"#,
    )
    .unwrap();

    let base = dir.path().join("voiceline");
    let config = Config::load(base.to_str().unwrap()).unwrap();
    let session = config.session_config();

    assert_eq!(session.sample_rate, 8000);
    assert_eq!(session.frame_size, 2048);

    let stream = session.stream_config();
    assert_eq!(stream.url, "ws://example.test/ws/audio-stream-native");
    assert_eq!(stream.max_reconnect_attempts, 3);
    assert_eq!(stream.reconnect_backoff.as_millis(), 500);

    let capture = session.capture_config();
    assert_eq!(capture.sample_rate, 8000);
    assert_eq!(capture.frame_size, 2048);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("does-not-exist");
    assert!(Config::load(base.to_str().unwrap()).is_err());
}
