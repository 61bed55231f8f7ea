//! Server configuration from environment variables.

use anyhow::Context;
use match3_core::{GameConfig, Objective};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TICK_MS: u64 = 16;
const DEFAULT_SUGGESTION_TIMEOUT_MS: u64 = 2000;

/// Runtime settings for the server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Interval between session ticks
    pub tick: Duration,
    /// WebSocket URL of a suggestion service; answered in-process when unset
    pub suggestion_url: Option<String>,
    pub suggestion_timeout: Duration,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            tick: Duration::from_millis(DEFAULT_TICK_MS),
            suggestion_url: None,
            suggestion_timeout: Duration::from_millis(DEFAULT_SUGGESTION_TIMEOUT_MS),
            game: GameConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr: SocketAddr = lookup("SERVER_ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.into())
            .parse()
            .context("SERVER_ADDR is not a socket address")?;

        let tick = millis(&lookup, "TICK_MS", DEFAULT_TICK_MS)?;
        if tick.is_zero() {
            anyhow::bail!("TICK_MS must be positive");
        }
        let suggestion_timeout = millis(
            &lookup,
            "SUGGESTION_TIMEOUT_MS",
            DEFAULT_SUGGESTION_TIMEOUT_MS,
        )?;

        let suggestion_url = lookup("SUGGESTION_URL").filter(|url| !url.trim().is_empty());

        let mut game = GameConfig::default();
        if let Some(path) = lookup("LEVELS_FILE") {
            game.levels = load_levels(Path::new(&path))?;
        }
        game.validate()?;

        Ok(Self {
            addr,
            tick,
            suggestion_url,
            suggestion_timeout,
            game,
        })
    }
}

fn millis<F>(lookup: &F, key: &str, default: u64) -> anyhow::Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let ms = match lookup(key) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{} must be a whole number of milliseconds", key))?,
        None => default,
    };
    Ok(Duration::from_millis(ms))
}

/// Read an objective table from a JSON array
pub fn load_levels(path: &Path) -> anyhow::Result<Vec<Objective>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read levels file {}", path.display()))?;
    let levels: Vec<Objective> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid levels file {}", path.display()))?;
    Ok(levels)
}
