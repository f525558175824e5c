use std::path::{Path, PathBuf};
use anyhow::{Result, Context, bail};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// General settings
    pub general: GeneralConfig,

    /// Backend connection
    pub server: ServerConfig,

    /// Terminal appearance
    pub terminal: TerminalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    pub log_level: String,

    /// Log file; the terminal itself is never used for diagnostics
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the console backend
    pub base_url: String,

    /// Path of the command execution endpoint
    pub execute_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Title line printed on open and after `clear`
    pub banner: String,

    /// Prompt printed before each input line
    pub prompt: String,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            banner: "AI Model Console Terminal".to_string(),
            prompt: "$ ".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            execute_path: "/api/terminal/execute".to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Get the default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        Ok(home.join(".model-console").join("config.toml"))
    }

    /// Create default configuration
    pub fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let console_dir = home.join(".model-console");

        Self {
            general: GeneralConfig {
                log_level: "info".to_string(),
                log_file: Some(console_dir.join("console.log")),
            },
            server: ServerConfig::default(),
            terminal: TerminalConfig::default(),
        }
    }

    /// Merge with command-line overrides
    pub fn merge_overrides(&mut self, overrides: Vec<(String, String)>) -> Result<()> {
        for (key, value) in overrides {
            match key.as_str() {
                "server" => self.server.base_url = value,
                "execute_path" => self.server.execute_path = value,
                "log_level" => self.general.log_level = value,
                "log_file" => self.general.log_file = Some(PathBuf::from(value)),
                "prompt" => self.terminal.prompt = value,
                "banner" => self.terminal.banner = value,
                _ => bail!("Unknown config key: {}", key),
            }
        }
        Ok(())
    }

    /// Check values that would otherwise only fail once the console is running
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.server.base_url)
            .with_context(|| format!("Invalid server URL: {}", self.server.base_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("Server URL must use http or https: {}", self.server.base_url);
        }

        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<tracing::Level> {
        self.general.log_level.parse::<tracing::Level>()
            .with_context(|| format!("Invalid log level: {}", self.general.log_level))
    }
}

/// Load or create configuration
pub fn load_or_create_config(path: Option<&Path>) -> Result<ConsoleConfig> {
    let config_path = if let Some(p) = path {
        p.to_path_buf()
    } else {
        ConsoleConfig::default_path()?
    };

    if config_path.exists() {
        ConsoleConfig::load(&config_path)
    } else {
        let config = ConsoleConfig::default();
        config.save(&config_path)?;
        Ok(config)
    }
}
