use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::agent::AgentConfig;
use crate::history::{DEFAULT_MAX_ENTRIES, DEFAULT_STORAGE_KEY};

/// Environment variable selecting the agent base URL
pub const API_URL_ENV: &str = "SKYWAY_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub api_url: Option<String>,
    pub history_storage_key: Option<String>,
    pub history_max_entries: Option<usize>,
    pub conversation_id: Option<Uuid>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Start a fresh backend conversation and remember its id for later runs.
    pub fn save_new_conversation_id() -> Result<Uuid> {
        Self::save_new_conversation_id_to(&Self::get_config_path()?)
    }

    /// An unreadable file is left untouched rather than replaced.
    pub fn save_new_conversation_id_to(config_path: &Path) -> Result<Uuid> {
        let mut config = Self::load_from(config_path).with_context(|| {
            format!(
                "not saving a new conversation id: {} is unreadable",
                config_path.display()
            )
        })?;
        let id = Uuid::new_v4();
        config.conversation_id = Some(id);
        config.save_to(config_path)?;
        Ok(id)
    }

    /// Overlay a value taken from the environment. Empty strings count as unset.
    pub fn with_env_api_url(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|u| !u.is_empty()) {
            self.api_url = Some(url);
        }
        self
    }

    /// Overlay command-line values, which win over everything else.
    pub fn with_overrides(mut self, api_url: Option<String>, conversation_id: Option<Uuid>) -> Self {
        if api_url.is_some() {
            self.api_url = api_url;
        }
        if conversation_id.is_some() {
            self.conversation_id = conversation_id;
        }
        self
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            base_url: self.api_url.clone().unwrap_or_default(),
            conversation_id: self.conversation_id,
        }
    }

    pub fn storage_key(&self) -> &str {
        self.history_storage_key
            .as_deref()
            .unwrap_or(DEFAULT_STORAGE_KEY)
    }

    pub fn max_history_entries(&self) -> usize {
        self.history_max_entries.unwrap_or(DEFAULT_MAX_ENTRIES)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("skyway").join("config.json"))
    }
}
