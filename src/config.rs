use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub lists: ListsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListsConfig {
    /// How many entries `recents` and `favorites` return when the caller
    /// does not say.
    #[serde(default = "default_count")]
    pub default_count: i64,
}

impl Default for ListsConfig {
    fn default() -> Self {
        Self {
            default_count: default_count(),
        }
    }
}

fn default_count() -> i64 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Lifetime of the session cookie issued after a successful bearer-token
    /// authentication.
    #[serde(default = "default_cookie_max_age")]
    pub cookie_max_age_secs: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_max_age_secs: default_cookie_max_age(),
        }
    }
}

fn default_cookie_max_age() -> u32 {
    // 30 days
    2_592_000
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.lists.default_count < 1 {
        anyhow::bail!("lists.default_count must be >= 1");
    }

    if config.auth.cookie_max_age_secs == 0 {
        anyhow::bail!("auth.cookie_max_age_secs must be > 0");
    }

    Ok(config)
}
