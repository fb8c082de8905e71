use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use drawings_kv::SyncMode;
use drawings_server::ServerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "drawings",
    about = "Share drawings anonymously in public galleries",
    version
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Directory holding the journal
    #[arg(long, conflicts_with = "in_memory")]
    pub data_dir: Option<PathBuf>,

    /// Keep all data in memory, ignoring any configured data_dir
    #[arg(long)]
    pub in_memory: bool,

    /// fsync the journal after every commit
    #[arg(long)]
    pub sync_every_write: bool,
}

impl Cli {
    /// Load the config file, if any, and apply flag overrides.
    pub fn load_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        if self.in_memory {
            config.data_dir = None;
        }
        if self.sync_every_write {
            config.sync_mode = SyncMode::EveryWrite;
        }
        Ok(config)
    }
}
