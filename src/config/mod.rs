use crate::core::error::AibudError;
use crate::session::SessionDefaults;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GOOSEAI_BASE_URL: &str = "https://api.goose.ai/v1";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable read when `api_key` is not set.
    pub api_key_env: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl ProviderConfig {
    fn hosted(base_url: &str, api_key_env: &str) -> Self {
        Self {
            base_url: Some(base_url.to_string()),
            api_key: None,
            api_key_env: Some(api_key_env.to_string()),
            headers: HashMap::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(OPENAI_BASE_URL)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Enables the `<@id>` mention trigger and self-message filtering.
    pub bot_user_id: Option<String>,
    /// Only handle messages from this guild when set.
    pub guild_id: Option<String>,
}

fn default_providers() -> IndexMap<String, ProviderConfig> {
    let mut providers = IndexMap::new();
    providers.insert(
        "GPT3".to_string(),
        ProviderConfig::hosted(OPENAI_BASE_URL, "OPENAI_API_KEY"),
    );
    providers.insert(
        "GPTJ".to_string(),
        ProviderConfig::hosted(GOOSEAI_BASE_URL, "GOOSEAI_API_KEY"),
    );
    providers.insert(
        "GPTNeoX".to_string(),
        ProviderConfig::hosted(GOOSEAI_BASE_URL, "GOOSEAI_API_KEY"),
    );
    providers
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_persona: String,
    pub default_model: String,
    pub default_engine: String,
    pub assistant_label: String,
    /// JSON persona catalog; the builtin one is used when unset.
    pub prompts_path: Option<PathBuf>,
    pub discord: DiscordConfig,
    /// Model family name -> completion endpoint.
    pub providers: IndexMap<String, ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let defaults = SessionDefaults::default();
        Self {
            default_persona: defaults.persona,
            default_model: defaults.model,
            default_engine: defaults.engine,
            assistant_label: "AiBud".to_string(),
            prompts_path: None,
            discord: DiscordConfig::default(),
            providers: default_providers(),
        }
    }
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".aibud")
    }

    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    /// Load `path`, or the default location when `None`. A missing default
    /// file is created with default values; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Config, AibudError> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(AibudError::Config(format!(
                        "Config file {} not found",
                        path.display()
                    )));
                }
                Self::read(path)?
            }
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::read(&path)?
                } else {
                    let config = Config::default();
                    if let Err(e) = config.save(&path) {
                        tracing::warn!("Could not write default config {}: {}", path.display(), e);
                    }
                    config
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Config, AibudError> {
        let contents = fs::read_to_string(path)?;
        serde_yml::from_str::<Config>(&contents)
            .map_err(|e| AibudError::Config(format!("Parse {}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<(), AibudError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }

    /// Fill credentials from the environment. Values already in the file win
    /// for provider keys; `DISCORD_*` variables override the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("DISCORD_BOT_TOKEN") {
            self.discord.token = Some(token);
        }
        if let Some(id) = lookup("DISCORD_BOT_USER_ID") {
            self.discord.bot_user_id = Some(id);
        }

        for provider in self.providers.values_mut() {
            if provider.api_key.is_none() {
                if let Some(var) = &provider.api_key_env {
                    provider.api_key = lookup(var).filter(|key| !key.is_empty());
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), AibudError> {
        if self.providers.is_empty() {
            return Err(AibudError::Config("No providers configured".to_string()));
        }
        if self.provider(&self.default_model).is_none() {
            return Err(AibudError::Config(format!(
                "Default model '{}' has no provider entry",
                self.default_model
            )));
        }
        if self.assistant_label.trim().is_empty() {
            return Err(AibudError::Config("assistant_label is empty".to_string()));
        }
        Ok(())
    }

    /// Provider entry for a model family, matched case-insensitively.
    pub fn provider(&self, family: &str) -> Option<&ProviderConfig> {
        self.providers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(family))
            .map(|(_, provider)| provider)
    }

    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            persona: self.default_persona.clone(),
            model: self.default_model.clone(),
            engine: self.default_engine.clone(),
        }
    }
}
