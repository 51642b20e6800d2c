//! Configuration management
//!
//! Manages provider settings and per-stage model assignments, loaded from a
//! TOML file under the platform config directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Generation provider API settings
    #[serde(default)]
    pub provider: ProviderSettings,
    /// Model assignments per generation role
    #[serde(default)]
    pub models: ModelsConfig,
    /// Storage settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Generation provider API settings (OpenAI-compatible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Base URL for the chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl ProviderSettings {
    /// Resolve the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .with_context(|| format!("API key not set; export {}", self.api_key_env))
    }
}

/// Model assignments for the generation stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model for strategy generation
    #[serde(default = "default_text_model")]
    pub strategy: String,
    /// Model for concept generation
    #[serde(default = "default_text_model")]
    pub concept: String,
    /// Model for script generation
    #[serde(default = "default_text_model")]
    pub script: String,
    /// Model for storyboard frame descriptions
    #[serde(default = "default_text_model")]
    pub storyboard: String,
    /// Model for storyboard image rendering
    #[serde(default = "default_image_model")]
    pub image: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            strategy: default_text_model(),
            concept: default_text_model(),
            script: default_text_model(),
            storyboard: default_text_model(),
            image: default_image_model(),
        }
    }
}

impl ModelsConfig {
    /// Model assigned to a pipeline stage
    pub fn for_stage(&self, stage: crate::types::Stage) -> &str {
        use crate::types::Stage;
        match stage {
            Stage::Strategy => &self.strategy,
            Stage::Concept => &self.concept,
            Stage::Script => &self.script,
            Stage::Storyboard => &self.storyboard,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Override for the data directory (defaults to the platform data dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_api_key_env() -> String {
    "STORYLOOP_API_KEY".to_string()
}

fn default_text_model() -> String {
    "anthropic/claude-sonnet-4.5".to_string()
}

fn default_image_model() -> String {
    "google/gemini-2.5-flash-image".to_string()
}

impl Config {
    /// Load configuration, creating the default file on first run
    pub fn load() -> Result<Self> {
        let config_path = config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let config: Config = toml::from_str(&contents)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = config_path()?;
        let parent = config_path
            .parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent).context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Resolve the data directory, honoring the configured override
    pub fn resolved_data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => data_dir(),
        }
    }
}

/// Path to the config file
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "storyloop", "storyloop")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Default data directory
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "storyloop", "storyloop")
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}
