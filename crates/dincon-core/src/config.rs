//! User configuration and session token storage
//!
//! Files live under ~/.dincon unless another directory is given:
//! - config.json: `{email, name}`
//! - token.txt: raw session token

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::io::{atomic_write, read_optional};

pub const CONFIG_DIR_NAME: &str = ".dincon";
pub const CONFIG_FILE: &str = "config.json";
pub const TOKEN_FILE: &str = "token.txt";

/// Identity recorded by `setup`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub email: String,
    pub name: String,
}

/// File-backed store for the user config and session token
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at ~/.dincon
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(Self::new(home.join(CONFIG_DIR_NAME)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }

    /// Overwrite the user config wholesale
    pub fn save(&self, config: &UserConfig) -> Result<PathBuf> {
        let path = self.config_path();
        let json = serde_json::to_string(config).context("Failed to serialize config")?;

        atomic_write(&path, json.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(path = %path.display(), "Saved user config");
        Ok(path)
    }

    /// Load the user config, `None` if `setup` has never run
    pub fn load(&self) -> Result<Option<UserConfig>> {
        let path = self.config_path();
        let Some(content) = read_optional(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?
        else {
            return Ok(None);
        };

        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn save_token(&self, token: &str) -> Result<PathBuf> {
        let path = self.token_path();
        atomic_write(&path, token.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(path = %path.display(), "Saved session token");
        Ok(path)
    }

    pub fn load_token(&self) -> Result<Option<String>> {
        let path = self.token_path();
        read_optional(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Remove the token file. Returns false when there was no session.
    pub fn delete_token(&self) -> Result<bool> {
        let path = self.token_path();
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Removed session token");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No token file to remove");
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}
