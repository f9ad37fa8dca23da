use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/handlerswap.toml";

/// Immutable host settings, loaded once at startup and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    pub plesk_bin: PathBuf,
    pub handler_prefix: String,
    pub query_timeout_secs: u64,
    pub mutation_timeout_secs: u64,
    pub state_dir: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            plesk_bin: PathBuf::from("/usr/sbin/plesk"),
            handler_prefix: "plesk-php".to_string(),
            query_timeout_secs: 60,
            mutation_timeout_secs: 300,
            state_dir: PathBuf::from("/root/handlerswap"),
        }
    }
}

impl HostConfig {
    /// Loads `path` when given (it must exist), otherwise the default config
    /// file when present, otherwise built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read config file: {}", path.display()));
            }
        };

        Self::parse(&raw)
            .with_context(|| format!("failed parsing config file: {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("invalid handlerswap config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.handler_prefix.trim().is_empty() {
            return Err(anyhow!("handler_prefix must not be empty"));
        }
        if self.query_timeout_secs == 0 || self.mutation_timeout_secs == 0 {
            return Err(anyhow!("host command timeouts must be at least one second"));
        }
        if !self.plesk_bin.is_absolute() {
            return Err(anyhow!(
                "plesk_bin must be an absolute path: {}",
                self.plesk_bin.display()
            ));
        }
        Ok(())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn mutation_timeout(&self) -> Duration {
        Duration::from_secs(self.mutation_timeout_secs)
    }
}
