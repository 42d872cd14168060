use std::sync::Arc;

use hoard_config::HoardConfig;
use hoard_proxy::{CachingProxy, HttpOrigin, Origin};
use tokio::net::TcpListener;
use tracing::instrument;

mod accept;
mod startup;

use accept::{accept_loop, bind_listener};

/// Owns the listening socket and hands accepted connections to workers.
pub struct Master<O = HttpOrigin> {
    cfg: Arc<HoardConfig>,
    proxy: Arc<CachingProxy<O>>,
}

impl<O: Origin> Master<O> {
    pub fn new(cfg: HoardConfig, proxy: CachingProxy<O>) -> Self {
        Self {
            cfg: Arc::new(cfg),
            proxy: Arc::new(proxy),
        }
    }

    /// Binds the configured address and serves until the listener fails.
    #[instrument(skip(self), fields(
        worker_connections = %self.cfg.global.worker_connections,
        log_level = %self.cfg.global.log_level,
    ))]
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = bind_listener(&self.cfg.http.listen_addr()).await?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let listen = listener.local_addr()?.to_string();
        self.log_startup(&listen);
        let semaphore = self.init_semaphore();

        accept_loop(listener, listen, semaphore, self.proxy, self.cfg).await
    }
}
