use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use drawings_core::Drawings;
use drawings_kv::{Clock, KvEngine, KvStore, SystemClock};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::AppState;
use crate::png::PngEncoder;
use crate::router::build_router;

/// Drawings HTTP server.
pub struct DrawingsServer {
    config: ServerConfig,
    state: AppState,
}

impl DrawingsServer {
    /// Open the store described by `config`, replaying its journal if any.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: ServerConfig, clock: Arc<dyn Clock>) -> ServerResult<Self> {
        config.validate()?;
        let engine = match config.journal_path() {
            Some(path) => KvEngine::open(&path, config.kv_config(), Arc::clone(&clock))?,
            None => {
                warn!("no data_dir configured; drawings are kept in memory only");
                KvEngine::in_memory(Arc::clone(&clock))
            }
        };
        let drawings = Drawings::new(Arc::new(engine), clock, config.drawings.clone());
        let state = AppState {
            drawings,
            encoder: Arc::new(PngEncoder),
        };
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<KvEngine> {
        self.state.drawings.store()
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Serve until ctrl-c, then compact the journal.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!("drawings server listening on {}", self.config.bind_addr);

        let store = Arc::clone(self.store());
        let sweeper = spawn_sweeper(Arc::clone(&store), self.config.sweep_interval());
        let app = self.router();
        let served = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;
        sweeper.abort();
        served?;

        store.compact()?;
        info!("drawings server stopped");
        Ok(())
    }
}

/// Periodically purge expired keys from `store`.
pub fn spawn_sweeper<S>(store: Arc<S>, every: Duration) -> JoinHandle<()>
where
    S: KvStore + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match store.purge_expired() {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "expired keys purged"),
                Err(e) => warn!(error = %e, "expiry sweep failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
