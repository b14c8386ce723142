//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tars_agent::Mode;

/// Configuration for tars
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gemini model id
    pub model: Option<String>,
    /// API key (alternative to GEMINI_API_KEY / GOOGLE_API_KEY)
    pub api_key: Option<String>,
    /// Starting mode; when unset the REPL asks
    pub mode: Option<Mode>,
    /// Window budget for the conversation section
    pub max_context_tokens: Option<u32>,
    /// Timeout for shell_command
    pub shell_timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tars")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("TARS_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            model: Some(tars_ai::providers::google::DEFAULT_MODEL.to_string()),
            mode: Some(Mode::Agent),
            max_context_tokens: Some(tars_agent::DEFAULT_MAX_TOKENS),
            ..Default::default()
        };

        default_config.save()?;
        Ok(path)
    }

    /// API key from config, then environment
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(tars_ai::providers::google::api_key_from_env)
    }

    pub fn shell_timeout(&self) -> Option<Duration> {
        self.shell_timeout_secs.map(Duration::from_secs)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# tars configuration file
# Place at ~/.config/tars/config.toml (Linux) or set TARS_CONFIG_PATH

# Gemini model to use
model = "gemini-2.5-flash"

# Starting mode (agent, planning, ask). Leave unset to be asked at startup.
mode = "agent"

# Token budget for the recent-conversation window
max_context_tokens = 20000

# Seconds before shell_command is killed
shell_timeout_secs = 30

# API key (optional - GEMINI_API_KEY or GOOGLE_API_KEY also work)
# It's recommended to use environment variables instead for security
# api_key = "..."
"#
}
