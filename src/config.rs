use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const API_KEY_ENV: &str = "LOVEMATCH_AGENT_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub data_dir: PathBuf,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub polling: PollConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub compatibility_agent_id: String,
    pub prediction_agent_id: String,
    pub chat_agent_id: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/v3/inference/chat/".to_string(),
            api_key: None,
            timeout_secs: 30,
            compatibility_agent_id: "6995c39b4ceab2f8e142b743".to_string(),
            prediction_agent_id: "6995c39b7137f607943cfd12".to_string(),
            chat_agent_id: "6995c39c30dee8e278c88eb0".to_string(),
        }
    }
}

/// Re-read intervals, in milliseconds, for each view that watches shared state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub ai_flag_ms: u64,
    pub admin_ms: u64,
    pub chat_ms: u64,
    pub dashboard_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            ai_flag_ms: 3000,
            admin_ms: 5000,
            chat_ms: 3000,
            dashboard_ms: 4000,
        }
    }
}

impl PollConfig {
    pub fn ai_flag(&self) -> Duration {
        Duration::from_millis(self.ai_flag_ms.max(1))
    }

    pub fn admin(&self) -> Duration {
        Duration::from_millis(self.admin_ms.max(1))
    }

    pub fn chat(&self) -> Duration {
        Duration::from_millis(self.chat_ms.max(1))
    }

    pub fn dashboard(&self) -> Duration {
        Duration::from_millis(self.dashboard_ms.max(1))
    }
}

/// Fixed admin login. Compared as plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "FAIRIN".to_string(),
            password: "123456123456".to_string(),
        }
    }
}

fn default_key_prefix() -> String {
    "lovematch_".to_string()
}

impl Config {
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lovematch")
        });

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        let config_path = data_dir.join("config.json");
        let mut config = if config_path.exists() {
            let config_str =
                std::fs::read_to_string(&config_path).context("Failed to read config.json")?;
            match serde_json::from_str::<Config>(&config_str) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %config_path.display(), error = %e, "config.json is invalid, using defaults");
                    Self::default_config()
                }
            }
        } else {
            let mut config = Self::default_config();
            config.data_dir = data_dir.clone();
            config.save().context("Failed to write default config.json")?;
            info!(path = %config_path.display(), "wrote default config");
            config
        };

        config.data_dir = data_dir;
        if config.agent.api_key.as_ref().map_or(true, |key| key.is_empty()) {
            config.agent.api_key = std::env::var(API_KEY_ENV).ok();
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = self.data_dir.join("config.json");
        let json_str = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, json_str).context("Failed to write config.json")?;
        Ok(())
    }

    fn default_config() -> Self {
        Config {
            data_dir: PathBuf::new(),
            key_prefix: default_key_prefix(),
            agent: AgentConfig::default(),
            polling: PollConfig::default(),
            admin: AdminConfig::default(),
        }
    }

    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }
}
