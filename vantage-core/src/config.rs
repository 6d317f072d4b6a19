//! Configuration system for Vantage.
//!
//! Uses `figment` for layered configuration: defaults -> `vantage.toml` ->
//! `VANTAGE_`-prefixed environment variables.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VantageConfig {
    pub research: ResearchConfig,
    pub llm: LlmConfig,
}

/// Research pipeline defaults and cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Subjects researched when a request does not name any.
    pub default_subjects: Vec<String>,
    /// Topic applied uniformly across subjects when none is given.
    pub research_focus: String,
    /// Cache entry lifetime in days.
    pub max_age_days: u32,
    /// Source-count threshold below which an artifact is flagged.
    pub min_sources: usize,
    /// Directory holding cache entry files.
    pub cache_dir: PathBuf,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            default_subjects: vec![
                "Accenture".into(),
                "IBM".into(),
                "Infosys".into(),
                "Cognizant".into(),
                "Capgemini".into(),
                "Wipro".into(),
                "HCLTech".into(),
                "Deloitte".into(),
            ],
            research_focus: "AI narrative and strategic initiatives".into(),
            max_age_days: 60,
            min_sources: 3,
            cache_dir: PathBuf::from("data/cache"),
        }
    }
}

/// Model and endpoint settings for the provider layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub base_url: String,
    /// Model used for the primary deep-research call.
    pub research_model: String,
    /// Model used for synthesis completions.
    pub synthesis_model: String,
    /// Model used when the primary research call fails.
    pub fallback_model: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".into(),
            base_url: "https://api.openai.com/v1".into(),
            research_model: "gpt-5".into(),
            synthesis_model: "gpt-5-mini".into(),
            fallback_model: "gpt-4o".into(),
            request_timeout_secs: 120,
        }
    }
}

/// Load configuration, optionally merging a TOML file over the defaults.
pub fn load_config(config_path: Option<&Path>) -> Result<VantageConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(VantageConfig::default()));

    match config_path {
        Some(path) => figment = figment.merge(Toml::file(path)),
        None => {
            let default_path = Path::new("vantage.toml");
            if default_path.exists() {
                figment = figment.merge(Toml::file(default_path));
            }
        }
    }

    figment = figment.merge(Env::prefixed("VANTAGE_").split("__"));

    figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VantageConfig::default();
        assert_eq!(config.research.max_age_days, 60);
        assert_eq!(config.research.min_sources, 3);
        assert_eq!(config.research.default_subjects.len(), 8);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_load_config_merges_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vantage.toml");
        std::fs::write(
            &path,
            "[research]\nmax_age_days = 14\n\n[llm]\nsynthesis_model = \"gpt-5-nano\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.research.max_age_days, 14);
        assert_eq!(config.llm.synthesis_model, "gpt-5-nano");
        // Untouched sections keep their defaults.
        assert_eq!(config.research.min_sources, 3);
    }
}
