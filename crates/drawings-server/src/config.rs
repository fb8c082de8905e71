use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use drawings_core::DrawingsConfig;
use drawings_kv::{KvConfig, SyncMode};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Name of the journal file inside `data_dir`.
pub const JOURNAL_FILE: &str = "drawings.wal";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Where the journal lives. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub sync_mode: SyncMode,
    /// How often expired rate-limit markers are purged.
    pub sweep_interval_ms: u64,
    pub drawings: DrawingsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            data_dir: None,
            sync_mode: SyncMode::default(),
            sweep_interval_ms: 60_000,
            drawings: DrawingsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.sweep_interval_ms == 0 {
            return Err(ServerError::Config("sweep_interval_ms must be positive".into()));
        }
        if self.drawings.gallery_limit == 0 {
            return Err(ServerError::Config("drawings.gallery_limit must be positive".into()));
        }
        let canvas = self.drawings.canvas();
        if canvas.pixel_count() == 0 || canvas.pixel_count() % 2 != 0 {
            return Err(ServerError::Config(format!(
                "canvas {}x{} must have a positive, even pixel count",
                canvas.width, canvas.height
            )));
        }
        Ok(())
    }

    pub fn journal_path(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(JOURNAL_FILE))
    }

    pub fn kv_config(&self) -> KvConfig {
        KvConfig {
            sync_mode: self.sync_mode,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}
