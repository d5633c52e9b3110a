use std::path::PathBuf;

use anyhow::ensure;
use ql_core::core::{RefinementPolicy, Style};

use crate::config::{AppConfig, BackendConfig, BackendSpecConfig, LogFormatConfig};
use crate::logging::LogFormat;
use crate::outbound::BackendSpec;

pub const GENERATOR_MAX_TOKENS: u32 = 8192;
pub const REVIEWER_MAX_TOKENS: u32 = 2048;

// ---------------------------------------------------------------------------
// BackendInfo — one validated chat backend
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct BackendInfo {
    pub id: String,
    pub spec: BackendSpec,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

// ---------------------------------------------------------------------------
// RuntimeConfig — fully validated runtime configuration
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub listen_addr: String,
    pub policy: RefinementPolicy,
    pub max_iterations_limit: u32,
    pub default_style: Style,
    pub use_learned_defaults: bool,
    pub exploration_rate: f64,
    pub variants: usize,
    pub max_variants: usize,
    pub data_dir: PathBuf,
    pub log_level: String,
    pub log_format: LogFormat,
    pub generator: BackendInfo,
    pub reviewer: BackendInfo,
}

// ---------------------------------------------------------------------------
// into_runtime — converts raw AppConfig into validated RuntimeConfig
// ---------------------------------------------------------------------------

pub fn into_runtime(config: AppConfig) -> Result<RuntimeConfig, anyhow::Error> {
    let refinement = &config.refinement;
    ensure!(
        refinement.max_iterations >= 1,
        "refinement.max_iterations must be at least 1"
    );
    ensure!(
        refinement.max_iterations <= refinement.max_iterations_limit,
        "refinement.max_iterations ({}) must not exceed refinement.max_iterations_limit ({})",
        refinement.max_iterations,
        refinement.max_iterations_limit
    );
    ensure!(
        (1.0..=10.0).contains(&refinement.quality_threshold),
        "refinement.quality_threshold must be within 1..=10, got {}",
        refinement.quality_threshold
    );
    ensure!(
        !refinement.default_style.trim().is_empty(),
        "refinement.default_style must not be empty"
    );
    ensure!(
        (0.0..=1.0).contains(&config.selection.exploration_rate),
        "selection.exploration_rate must be within [0, 1], got {}",
        config.selection.exploration_rate
    );
    ensure!(
        config.selection.variants >= 1,
        "selection.variants must be at least 1"
    );
    ensure!(
        config.selection.variants <= config.selection.max_variants,
        "selection.variants ({}) must not exceed selection.max_variants ({})",
        config.selection.variants,
        config.selection.max_variants
    );
    ensure!(
        !config.ledger.data_dir.as_os_str().is_empty(),
        "ledger.data_dir must not be empty"
    );

    let policy = RefinementPolicy {
        max_iterations: refinement.max_iterations,
        quality_threshold: refinement.quality_threshold,
    };
    let default_style = Style::new(refinement.default_style.trim());
    let use_learned_defaults = refinement.use_learned_defaults;
    let max_iterations_limit = refinement.max_iterations_limit;

    let generator = convert_backend("generator", config.generator, GENERATOR_MAX_TOKENS)?;
    let reviewer = convert_backend("reviewer", config.reviewer, REVIEWER_MAX_TOKENS)?;

    let log_format = match config.logging.format {
        LogFormatConfig::Json => LogFormat::Json,
        LogFormatConfig::Pretty => LogFormat::Pretty,
    };

    Ok(RuntimeConfig {
        listen_addr: config.server.listen,
        policy,
        max_iterations_limit,
        default_style,
        use_learned_defaults,
        exploration_rate: config.selection.exploration_rate,
        variants: config.selection.variants,
        max_variants: config.selection.max_variants,
        data_dir: config.ledger.data_dir,
        log_level: config.logging.level,
        log_format,
        generator,
        reviewer,
    })
}

fn convert_backend(
    section: &str,
    backend: BackendConfig,
    default_max_tokens: u32,
) -> Result<BackendInfo, anyhow::Error> {
    ensure!(!backend.id.is_empty(), "{section}.id must not be empty");
    ensure!(
        !backend.base_url.trim().is_empty(),
        "{section}.base_url must not be empty"
    );
    ensure!(
        !backend.model.trim().is_empty(),
        "{section}.model must not be empty"
    );
    ensure!(
        backend.temperature.is_finite() && backend.temperature >= 0.0,
        "{section}.temperature must be a non-negative number"
    );
    ensure!(backend.timeout_ms > 0, "{section}.timeout_ms must be positive");
    let max_tokens = backend.max_tokens.unwrap_or(default_max_tokens);
    ensure!(max_tokens > 0, "{section}.max_tokens must be positive");

    Ok(BackendInfo {
        id: backend.id,
        spec: match backend.spec {
            BackendSpecConfig::OpenaiChat => BackendSpec::OpenAiChat,
            BackendSpecConfig::Ollama => BackendSpec::Ollama,
        },
        base_url: backend.base_url.trim_end_matches('/').to_owned(),
        api_key: backend.api_key,
        model: backend.model,
        temperature: backend.temperature,
        max_tokens,
        timeout_ms: backend.timeout_ms,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.generator = BackendConfig {
            id: "writer".to_owned(),
            base_url: "http://100.64.0.1:8000/".to_owned(),
            api_key: Some("sk-local".to_owned()),
            spec: BackendSpecConfig::OpenaiChat,
            model: "gpt-4o-mini".to_owned(),
            temperature: 0.7,
            max_tokens: None,
            timeout_ms: 60_000,
        };
        config
    }

    fn expect_error(config: AppConfig, fragment: &str) {
        match into_runtime(config) {
            Err(e) => assert!(
                e.to_string().contains(fragment),
                "error {e:?} should mention {fragment}"
            ),
            Ok(_) => panic!("expected error mentioning {fragment}"),
        }
    }

    #[test]
    fn test_valid_config_conversion() {
        let runtime = into_runtime(make_config()).expect("valid config should convert");

        assert_eq!(runtime.listen_addr, "0.0.0.0:8080");
        assert_eq!(runtime.policy, RefinementPolicy::default());
        assert_eq!(runtime.default_style, Style::new("engaging"));
        assert!(runtime.use_learned_defaults);
        assert_eq!(runtime.exploration_rate, 0.1);
        assert_eq!(runtime.variants, 3);
        assert_eq!(runtime.max_iterations_limit, 5);
        assert_eq!(runtime.max_variants, 10);
        assert_eq!(runtime.log_format, LogFormat::Json);

        assert_eq!(runtime.generator.spec, BackendSpec::OpenAiChat);
        assert_eq!(runtime.generator.base_url, "http://100.64.0.1:8000");
        assert_eq!(runtime.generator.max_tokens, GENERATOR_MAX_TOKENS);
        assert_eq!(runtime.reviewer.spec, BackendSpec::Ollama);
        assert_eq!(runtime.reviewer.max_tokens, REVIEWER_MAX_TOKENS);
    }

    #[test]
    fn test_explicit_max_tokens_kept() {
        let mut config = make_config();
        config.reviewer.max_tokens = Some(512);

        let runtime = into_runtime(config).unwrap();
        assert_eq!(runtime.reviewer.max_tokens, 512);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut config = make_config();
        config.refinement.max_iterations = 0;
        expect_error(config, "max_iterations");
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        for threshold in [0.5, 10.5, f64::NAN] {
            let mut config = make_config();
            config.refinement.quality_threshold = threshold;
            expect_error(config, "quality_threshold");
        }
    }

    #[test]
    fn test_threshold_bounds_accepted() {
        for threshold in [1.0, 10.0] {
            let mut config = make_config();
            config.refinement.quality_threshold = threshold;
            assert!(into_runtime(config).is_ok());
        }
    }

    #[test]
    fn test_exploration_rate_out_of_range_rejected() {
        for rate in [-0.1, 1.1, f64::NAN] {
            let mut config = make_config();
            config.selection.exploration_rate = rate;
            expect_error(config, "exploration_rate");
        }
    }

    #[test]
    fn test_zero_variants_rejected() {
        let mut config = make_config();
        config.selection.variants = 0;
        expect_error(config, "variants");
    }

    #[test]
    fn test_iterations_above_limit_rejected() {
        let mut config = make_config();
        config.refinement.max_iterations = 6;
        expect_error(config, "max_iterations_limit");
    }

    #[test]
    fn test_variants_above_limit_rejected() {
        let mut config = make_config();
        config.selection.max_variants = 2;
        expect_error(config, "selection.max_variants");
    }

    #[test]
    fn test_blank_default_style_rejected() {
        let mut config = make_config();
        config.refinement.default_style = "  ".to_owned();
        expect_error(config, "default_style");
    }

    #[test]
    fn test_blank_backend_url_rejected() {
        let mut config = make_config();
        config.reviewer.base_url = String::new();
        expect_error(config, "reviewer.base_url");
    }

    #[test]
    fn test_blank_model_rejected() {
        let mut config = make_config();
        config.generator.model = " ".to_owned();
        expect_error(config, "generator.model");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = make_config();
        config.generator.timeout_ms = 0;
        expect_error(config, "generator.timeout_ms");
    }
}
