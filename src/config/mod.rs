//! # Configuration Management Module
//!
//! Process-wide settings for the BBS, read once at startup from a TOML file and
//! never mutated by the serving process. Only the administrative CLI subcommands
//! (`init`, `sysop-password`) write the file back.
//!
//! ## Configuration Structure
//!
//! - [`BbsConfig`] - Board identity (name, sysop) and registration policy
//! - [`ServerConfig`] - Listener address, port and per-prompt read deadline
//! - [`AssetsConfig`] - Folders holding renderable asset files, one per display mode
//! - [`StorageConfig`] - SQLite database location and message limits
//! - [`LoggingConfig`] - Default log level
//! - [`SecurityConfig`] - Optional Argon2 tuning
//!
//! ## Usage
//!
//! ```rust,no_run
//! use amisbbs::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("BBS Name: {}", config.bbs.name);
//!     println!("Port: {}", config.server.port);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [bbs]
//! name = "AMIS BBS"
//! sysop = "sysop"
//! allow_new_users = true
//!
//! [server]
//! bind_address = "0.0.0.0"
//! port = 2323
//! read_timeout_secs = 300
//!
//! [assets]
//! ascii_folder = "./assets/ascii"
//! atascii_folder = "./assets/atascii"
//! ansi_folder = "./assets/ansi"
//! menus_folder = "./assets/menus"
//! executables_folder = "./assets/bin"
//!
//! [storage]
//! database = "./bbs.db"
//! max_message_size = 1024
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BbsConfig {
    pub name: String,
    pub sysop: String,
    #[serde(default = "default_allow_new_users")]
    pub allow_new_users: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sysop_password_hash: Option<String>,
}

fn default_allow_new_users() -> bool { true }

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bbs: BbsConfig,
    pub server: ServerConfig,
    pub assets: AssetsConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: Option<SecurityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Seconds a caller may sit on a single prompt; 0 disables the deadline
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_read_timeout() -> u64 { 300 }

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        if self.read_timeout_secs == 0 { None } else { Some(Duration::from_secs(self.read_timeout_secs)) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    pub ascii_folder: String,
    pub atascii_folder: String,
    pub ansi_folder: String,
    #[serde(default)]
    pub menus_folder: String,
    #[serde(default)]
    pub executables_folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database: String,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

fn default_max_message_size() -> usize { 1024 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Argon2Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_kib: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_cost: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argon2: Option<Argon2Config>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Write this configuration to `path`, replacing any existing file
    pub async fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        fs::write(path, content).await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        Config::default().save(path).await
    }

    fn validate(&self) -> Result<()> {
        if self.bbs.name.trim().is_empty() {
            return Err(anyhow!("bbs.name must not be empty"));
        }
        if self.storage.database.trim().is_empty() {
            return Err(anyhow!("storage.database must not be empty"));
        }
        if self.storage.max_message_size == 0 {
            return Err(anyhow!("storage.max_message_size must be greater than zero"));
        }
        Ok(())
    }

    /// Argon2 tuning, if any was configured
    pub fn argon2(&self) -> Option<&Argon2Config> {
        self.security.as_ref().and_then(|s| s.argon2.as_ref())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bbs: BbsConfig {
                name: "AMIS BBS".to_string(),
                sysop: "sysop".to_string(),
                allow_new_users: true,
                sysop_password_hash: None,
            },
            server: ServerConfig {
                bind_address: "0.0.0.0".to_string(),
                port: 2323,
                read_timeout_secs: 300,
            },
            assets: AssetsConfig {
                ascii_folder: "./assets/ascii".to_string(),
                atascii_folder: "./assets/atascii".to_string(),
                ansi_folder: "./assets/ansi".to_string(),
                menus_folder: "./assets/menus".to_string(),
                executables_folder: "./assets/bin".to_string(),
            },
            storage: StorageConfig {
                database: "./bbs.db".to_string(),
                max_message_size: 1024,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            security: Some(SecurityConfig::default()),
        }
    }
}
