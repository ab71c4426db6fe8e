// Test module - relaxed lint rules
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::uninlined_format_args)]
#![allow(missing_docs)]

use aiclip::config::{load_config_file, validate_config};
use aiclip::{ConfigBuilder, ErrorCode, MAX_PARALLELISM};
use std::path::PathBuf;

#[test]
fn json_and_yaml_files_load_the_same_config() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("aiclip.json");
    let yaml = dir.path().join("aiclip.yaml");
    std::fs::write(
        &json,
        r#"{"allowed_roots":["/srv/media"],"tool":{"program":"/usr/bin/ffmpeg"},"defaults":{"compress_crf":23},"execution":{"timeout_ms":5000,"max_parallelism":3}}"#,
    )
    .unwrap();
    std::fs::write(
        &yaml,
        "allowed_roots:\n  - /srv/media\ntool:\n  program: /usr/bin/ffmpeg\ndefaults:\n  compress_crf: 23\nexecution:\n  timeout_ms: 5000\n  max_parallelism: 3\n",
    )
    .unwrap();

    let from_json = load_config_file(&json).unwrap();
    let from_yaml = load_config_file(&yaml).unwrap();
    assert_eq!(from_json, from_yaml);
    assert_eq!(from_json.defaults.compress_crf, 23);
    assert_eq!(from_json.defaults.video_codec, "libx264");
    assert_eq!(from_json.execution.capture_bytes, 64 * 1024);
}

#[test]
fn malformed_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aiclip.json");
    std::fs::write(&path, "{ not json").unwrap();
    let err = load_config_file(&path).unwrap_err();
    assert_eq!(err.code, ErrorCode::Config);

    let err = load_config_file(&dir.path().join("missing.json")).unwrap_err();
    assert_eq!(err.code, ErrorCode::Config);
}

#[cfg(unix)]
#[test]
fn validation_canonicalizes_roots_and_clamps_parallelism() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("media");
    std::fs::create_dir(&nested).unwrap();
    let config = ConfigBuilder::new()
        .allowed_root(dir.path().join("media/../media"))
        .tool(PathBuf::from("/bin/echo"))
        .build();
    let mut config = config;
    config.execution.max_parallelism = 64;

    let config = validate_config(config).unwrap();
    assert_eq!(
        config.allowed_roots,
        vec![std::fs::canonicalize(&nested).unwrap()]
    );
    assert_eq!(config.execution.max_parallelism, MAX_PARALLELISM);
    assert!(config.tool.program.is_absolute());
}

#[test]
fn missing_root_is_rejected() {
    let config = ConfigBuilder::new()
        .allowed_root(PathBuf::from("/nonexistent/aiclip/media"))
        .tool(PathBuf::from("/bin/echo"))
        .build();
    let err = validate_config(config).unwrap_err();
    assert_eq!(err.code, ErrorCode::Config);
}

#[cfg(unix)]
#[test]
fn shell_interpreter_cannot_be_the_tool() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigBuilder::new()
        .allowed_root(dir.path().to_path_buf())
        .tool(PathBuf::from("/bin/sh"))
        .build();
    let err = validate_config(config).unwrap_err();
    assert_eq!(err.code, ErrorCode::Config);
    assert!(err.message.contains("shell"));
}

#[test]
fn zero_timeout_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigBuilder::new()
        .allowed_root(dir.path().to_path_buf())
        .tool(PathBuf::from("/bin/echo"))
        .timeout_ms(0)
        .build();
    let err = validate_config(config).unwrap_err();
    assert!(err.message.contains("timeout"));
}
