//! Configuration file support

use docent_core::{PaceConfig, ScrollConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Backend used when neither the flag, the environment nor the config name one
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// User id sent with every query unless configured
pub const DEFAULT_USER_ID: Uuid = Uuid::from_u128(0x11111111_1111_1111_1111_111111111111);

/// Configuration for docent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the doc-eval backend
    pub api_url: Option<String>,
    /// User id sent with queries and uploads
    pub user_id: Option<Uuid>,
    /// Greeting shown in a fresh transcript
    pub welcome: Option<String>,
    /// Whether to use TUI mode by default
    pub tui: Option<bool>,
    /// Color theme (dark, light)
    pub theme: Option<String>,
    pub pacing: PacingSettings,
    pub scroll: ScrollSettings,
}

/// Reply reveal cadence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    pub slice_chars: Option<usize>,
    pub delay_ms: Option<u64>,
}

impl PacingSettings {
    pub fn to_pace_config(&self) -> PaceConfig {
        let defaults = PaceConfig::default();
        PaceConfig {
            slice_chars: self.slice_chars.unwrap_or(defaults.slice_chars),
            delay: self
                .delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.delay),
        }
    }
}

/// Auto-scroll tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollSettings {
    /// Rows from the bottom that still count as "at the bottom"
    pub threshold_rows: Option<usize>,
    /// Quiet period that ends a scroll gesture
    pub idle_ms: Option<u64>,
}

impl ScrollSettings {
    pub fn to_scroll_config(&self) -> ScrollConfig {
        let defaults = ScrollConfig::default();
        ScrollConfig {
            threshold: self.threshold_rows.unwrap_or(defaults.threshold),
            idle: self
                .idle_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.idle),
        }
    }
}

impl Config {
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docent")
    }

    /// Config file path, `DOCENT_CONFIG_PATH` first
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("DOCENT_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file; problems are reported and defaults used
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Self::default()
            }),
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

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
            api_url: Some(DEFAULT_API_URL.to_string()),
            user_id: Some(DEFAULT_USER_ID),
            tui: Some(true),
            ..Default::default()
        };
        default_config.save()?;
        Ok(path)
    }

    /// Backend URL: flag, then `DOCENT_API_URL`, then config, then default
    pub fn api_url(&self, flag: Option<String>) -> String {
        flag.or_else(|| std::env::var("DOCENT_API_URL").ok())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn user_id(&self, flag: Option<Uuid>) -> Uuid {
        flag.or(self.user_id).unwrap_or(DEFAULT_USER_ID)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# docent configuration file
# Place at ~/.config/docent/config.toml (Linux/Mac) or %APPDATA%\docent\config.toml (Windows)
# Override the location with DOCENT_CONFIG_PATH.

# Base URL of the doc-eval backend (DOCENT_API_URL and --api-url take precedence)
api_url = "http://localhost:8000"

# User id sent with queries and uploads
user_id = "11111111-1111-1111-1111-111111111111"

# Whether to use TUI mode by default
tui = true

# Color theme (dark, light)
# theme = "dark"

# Greeting shown in a fresh transcript
# welcome = "Ask me about your documents."

# How replies are revealed
[pacing]
# slice_chars = 2
# delay_ms = 4

# When the transcript follows new content
[scroll]
# threshold_rows = 2
# idle_ms = 500
"#
}
