use super::*;

#[test]
fn test_parse_full_config() {
    let toml_str = r#"
[server]
listen = "127.0.0.1:9090"

[refinement]
max_iterations = 5
max_iterations_limit = 8
quality_threshold = 7.5
default_style = "concise"
use_learned_defaults = false

[selection]
exploration_rate = 0.25
variants = 4
max_variants = 6

[ledger]
data_dir = "/var/lib/quill"

[logging]
level = "debug"
format = "pretty"

[generator]
id = "writer"
base_url = "https://api.openai.com"
api_key = "sk-xxxxx"
spec = "openai-chat"
model = "gpt-4o-mini"
temperature = 0.9
max_tokens = 4096
timeout_ms = 30000

[reviewer]
id = "critic"
base_url = "http://100.64.0.1:11434"
spec = "ollama"
model = "llama3"
"#;

    let config: AppConfig = toml::from_str(toml_str).unwrap();

    assert_eq!(config.server.listen, "127.0.0.1:9090");

    assert_eq!(config.refinement.max_iterations, 5);
    assert_eq!(config.refinement.max_iterations_limit, 8);
    assert_eq!(config.refinement.quality_threshold, 7.5);
    assert_eq!(config.refinement.default_style, "concise");
    assert!(!config.refinement.use_learned_defaults);

    assert_eq!(config.selection.exploration_rate, 0.25);
    assert_eq!(config.selection.variants, 4);
    assert_eq!(config.selection.max_variants, 6);

    assert_eq!(config.ledger.data_dir, PathBuf::from("/var/lib/quill"));

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormatConfig::Pretty);

    assert_eq!(config.generator.id, "writer");
    assert_eq!(config.generator.spec, BackendSpecConfig::OpenaiChat);
    assert_eq!(config.generator.api_key.as_deref(), Some("sk-xxxxx"));
    assert_eq!(config.generator.temperature, 0.9);
    assert_eq!(config.generator.max_tokens, Some(4096));
    assert_eq!(config.generator.timeout_ms, 30_000);

    assert_eq!(config.reviewer.id, "critic");
    assert_eq!(config.reviewer.spec, BackendSpecConfig::Ollama);
    assert!(config.reviewer.api_key.is_none());
    assert_eq!(config.reviewer.temperature, 0.7);
    assert_eq!(config.reviewer.max_tokens, None);
    assert_eq!(config.reviewer.timeout_ms, 60_000);
}

#[test]
fn test_empty_config_uses_defaults() {
    let config: AppConfig = toml::from_str("").unwrap();

    assert_eq!(config.server.listen, "0.0.0.0:8080");
    assert_eq!(config.refinement.max_iterations, 3);
    assert_eq!(config.refinement.quality_threshold, 8.0);
    assert_eq!(config.refinement.default_style, "engaging");
    assert!(config.refinement.use_learned_defaults);
    assert_eq!(config.selection.exploration_rate, 0.1);
    assert_eq!(config.selection.variants, 3);
    assert_eq!(config.ledger.data_dir, PathBuf::from("./reward_data"));
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormatConfig::Json);
    assert_eq!(config.generator.id, "generator");
    assert_eq!(config.reviewer.id, "reviewer");
    assert_eq!(config.generator.spec, BackendSpecConfig::Ollama);
}

#[test]
fn test_partial_section_keeps_other_defaults() {
    let toml_str = r#"
[refinement]
quality_threshold = 9.0
"#;

    let config: AppConfig = toml::from_str(toml_str).unwrap();

    assert_eq!(config.refinement.quality_threshold, 9.0);
    assert_eq!(config.refinement.max_iterations, 3);
    assert_eq!(config.refinement.default_style, "engaging");
}

#[test]
fn test_backend_requires_spec() {
    let toml_str = r#"
[generator]
id = "g"
base_url = "http://localhost:8000"
model = "m"
"#;

    let result: Result<AppConfig, _> = toml::from_str(toml_str);
    assert!(result.is_err());
}

#[test]
fn test_unknown_backend_spec_rejected() {
    let toml_str = r#"
[generator]
id = "g"
base_url = "http://localhost:8000"
spec = "grpc"
model = "m"
"#;

    let result: Result<AppConfig, _> = toml::from_str(toml_str);
    assert!(result.is_err());
}

#[test]
fn test_unknown_log_format_rejected() {
    let result: Result<AppConfig, _> = toml::from_str("[logging]\nformat = \"xml\"\n");
    assert!(result.is_err());
}

#[test]
fn test_from_file_reads_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quill.toml");
    std::fs::write(&path, "[server]\nlisten = \"127.0.0.1:7000\"\n").unwrap();

    let config = AppConfig::from_file(&path).unwrap();
    assert_eq!(config.server.listen, "127.0.0.1:7000");
}

#[test]
fn test_from_file_missing_path_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(AppConfig::from_file(&dir.path().join("absent.toml")).is_err());
}
