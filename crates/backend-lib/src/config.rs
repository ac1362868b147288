// ============================
// crates/backend-lib/src/config.rs
// ============================
//! Configuration management.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Data directory path
    pub data_dir: PathBuf,
    /// Log level
    pub log_level: String,
    /// How long a room may sit empty before its in-memory caches are dropped
    pub empty_room_ttl_secs: u64,
    /// How often the idle-room sweep runs
    pub sweep_interval_secs: u64,
}

impl Settings {
    pub fn empty_room_ttl(&self) -> Duration {
        Duration::from_secs(self.empty_room_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            data_dir: PathBuf::from("data"),
            log_level: "info".to_string(),
            empty_room_ttl_secs: 60 * 60, // 1 hour
            sweep_interval_secs: 5 * 60,
        }
    }
}

/// Load settings from an optional `config.toml` plus `WATCHPARTY_`-prefixed
/// environment variables, on top of the defaults.
pub fn load_settings() -> Result<Settings> {
    let defaults = Settings::default();
    let settings = Config::builder()
        .set_default("bind_addr", defaults.bind_addr.to_string())?
        .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
        .set_default("log_level", defaults.log_level)?
        .set_default("empty_room_ttl_secs", defaults.empty_room_ttl_secs)?
        .set_default("sweep_interval_secs", defaults.sweep_interval_secs)?
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::with_prefix("WATCHPARTY"))
        .build()?
        .try_deserialize()?;
    Ok(settings)
}
