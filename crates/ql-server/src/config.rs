use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub refinement: RefinementConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "BackendConfig::default_generator")]
    pub generator: BackendConfig,
    #[serde(default = "BackendConfig::default_reviewer")]
    pub reviewer: BackendConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            refinement: RefinementConfig::default(),
            selection: SelectionConfig::default(),
            ledger: LedgerConfig::default(),
            logging: LoggingConfig::default(),
            generator: BackendConfig::default_generator(),
            reviewer: BackendConfig::default_reviewer(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    pub max_iterations: u32,
    /// Largest budget a request may ask for.
    pub max_iterations_limit: u32,
    pub quality_threshold: f64,
    pub default_style: String,
    /// Fill a request's missing style or budget from the learned best
    /// parameters.
    pub use_learned_defaults: bool,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            max_iterations_limit: 5,
            quality_threshold: 8.0,
            default_style: "engaging".to_owned(),
            use_learned_defaults: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub exploration_rate: f64,
    pub variants: usize,
    /// Largest variant count a request may ask for.
    pub max_variants: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            exploration_rate: 0.1,
            variants: 3,
            max_variants: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub data_dir: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./reward_data"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormatConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormatConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormatConfig {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub id: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub spec: BackendSpecConfig,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl BackendConfig {
    fn local(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            base_url: "http://127.0.0.1:11434".to_owned(),
            api_key: None,
            spec: BackendSpecConfig::Ollama,
            model: "llama3".to_owned(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_ms: default_timeout_ms(),
        }
    }

    pub fn default_generator() -> Self {
        Self::local("generator")
    }

    pub fn default_reviewer() -> Self {
        Self::local("reviewer")
    }
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BackendSpecConfig {
    OpenaiChat,
    Ollama,
}

#[cfg(test)]
mod tests;
