use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::{Result, SessionError};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a directory lookup for one mention set stays fresh.
    pub directory_stale_secs: u64,
    /// Digits compared when matching a mentioned number against contacts.
    pub phone_suffix_len: usize,
    pub page_size: u32,
    /// Distance from the top of the timeline under which an older page is fetched.
    pub prefetch_threshold_px: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            directory_stale_secs: 300,
            phone_suffix_len: 8,
            page_size: 50,
            prefetch_threshold_px: 200.0,
        }
    }
}

impl EngineConfig {
    /// Reads `config.json` from the platform config dir, defaults when absent.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        tracing::info!("Config loaded from: {}", path.display());
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com.br", "trama", "trama").ok_or(SessionError::NoProjectDirs)?;
        Ok(dirs.config_dir().join("config.json"))
    }

    pub fn directory_stale_time(&self) -> Duration {
        Duration::from_secs(self.directory_stale_secs)
    }
}
