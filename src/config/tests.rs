use super::*;
use std::collections::HashMap;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = EngineConfig::default();
    assert_eq!(config.git_binary, "git");
    assert_eq!(config.datalad_binary, "datalad");
    assert_eq!(config.command_timeout, Duration::from_secs(300));
    assert_eq!(config.create_timeout, Duration::from_secs(60));
    assert_eq!(config.probe_timeout, Duration::from_secs(10));
    assert_eq!(config.run_timeout, Duration::from_secs(600));
    assert!(config.extra_stages.is_empty());
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = EngineConfig::from_toml_str(
        r#"
datalad_binary = "/opt/datalad/bin/datalad"
command_timeout = "2m"
extra_stages = ["models"]
"#,
    )
    .unwrap();

    assert_eq!(config.datalad_binary, "/opt/datalad/bin/datalad");
    assert_eq!(config.command_timeout, Duration::from_secs(120));
    assert_eq!(config.extra_stages, vec!["models"]);
    assert_eq!(config.git_binary, "git");
    assert_eq!(config.probe_timeout, DEFAULT_PROBE_TIMEOUT);
}

#[test]
fn test_unknown_key_is_a_parse_error() {
    let err = EngineConfig::from_toml_str("retries = 3").unwrap_err();
    assert_eq!(err.code(), ErrorCode::CONFIG_PARSE_ERROR);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_env_overrides() {
    let mut config = EngineConfig::default();
    config
        .merge_from(env(&[
            ("SCITRACE_LOG_LEVEL", "debug"),
            ("SCITRACE_GIT", "/usr/local/bin/git"),
            ("SCITRACE_COMMAND_TIMEOUT", "45"),
        ]))
        .unwrap();

    assert_eq!(config.log_level.as_deref(), Some("debug"));
    assert_eq!(config.git_binary, "/usr/local/bin/git");
    assert_eq!(config.datalad_binary, "datalad");
    assert_eq!(config.command_timeout, Duration::from_secs(45));
}

#[test]
fn test_env_timeout_rejects_garbage() {
    let mut config = EngineConfig::default();
    let err = config
        .merge_from(env(&[("SCITRACE_COMMAND_TIMEOUT", "soon")]))
        .unwrap_err();
    assert!(err.to_string().contains("SCITRACE_COMMAND_TIMEOUT"));

    let err = config
        .merge_from(env(&[("SCITRACE_COMMAND_TIMEOUT", "0")]))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::CONFIG_GENERIC);
}

#[test]
fn test_load_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scitrace.toml");
    std::fs::write(&path, "git_binary = \"git2.45\"\nprobe_timeout = \"3s\"\n").unwrap();

    let config = EngineConfig::from_file(&path).unwrap();
    assert_eq!(config.git_binary, "git2.45");
    assert_eq!(config.probe_timeout, Duration::from_secs(3));
}

#[test]
fn test_load_missing_explicit_file() {
    let err = EngineConfig::load(Some(Path::new("/nonexistent/scitrace.toml"))).unwrap_err();
    assert_eq!(err.code(), ErrorCode::CONFIG_NOT_FOUND);
}

#[test]
fn test_tools_follow_configured_binaries() {
    let config = EngineConfig {
        datalad_binary: "dl".to_string(),
        ..EngineConfig::default()
    };
    let tools = config.tools();
    assert_eq!(tools.datalad_status()[0], "dl");
    assert_eq!(tools.git_status_porcelain()[0], "git");
}
