//! Optional TOML configuration for the `occur` CLI.
//!
//! ```toml
//! log_level = "debug"
//! default_window_days = 14
//! week_starts_on = "sunday"
//! ```

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Window length used by `materialize` when `--to` is omitted.
    pub default_window_days: u32,

    /// First day of the week for `materialize --week`.
    pub week_starts_on: WeekStart,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            default_window_days: 7,
            week_starts_on: WeekStart::Monday,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    Monday,
    Sunday,
}

impl From<WeekStart> for Weekday {
    fn from(start: WeekStart) -> Self {
        match start {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }
}

/// Load the config file at `path`, or the defaults when no path is given.
pub fn load_config(path: Option<&str>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path))?;
    let config: Config = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse config file: {}", path))?;

    if config.default_window_days == 0 {
        anyhow::bail!("default_window_days must be at least 1 (in {})", path);
    }
    Ok(config)
}
