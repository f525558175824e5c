use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing::info;

mod commands;
mod config;
mod console;
mod executor;
mod render;
mod session;
mod surface;
mod terminal;

use config::ConsoleConfig;

/// Terminal session for the local AI-model management console.
#[derive(Debug, Parser)]
#[command(name = "model-console", version, about)]
struct Cli {
    /// Path to the config file (default: ~/.model-console/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://127.0.0.1:5000
    #[arg(long)]
    server: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Override a config value, e.g. --set prompt="> "
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    overrides: Vec<(String, String)>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    Ok((key.trim().to_string(), value.to_string()))
}

impl Cli {
    fn into_overrides(self) -> Vec<(String, String)> {
        let mut overrides = self.overrides;
        if let Some(server) = self.server {
            overrides.push(("server".to_string(), server));
        }
        if let Some(level) = self.log_level {
            overrides.push(("log_level".to_string(), level));
        }
        overrides
    }
}

// The terminal is in raw mode while the session runs, so logs go to a file.
fn init_logging(config: &ConsoleConfig) -> anyhow::Result<()> {
    let level = config.log_level()?;

    let Some(path) = &config.general.log_file else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone();

    let mut config = config::load_or_create_config(config_path.as_deref())?;
    config.merge_overrides(cli.into_overrides())?;
    config.validate()?;

    init_logging(&config)?;
    info!(server = %config.server.base_url, "starting model console");

    terminal::run_console(&config).await
}
