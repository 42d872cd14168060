use std::sync::Arc;

use hoard_proxy::Origin;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::Master;

impl<O: Origin> Master<O> {
    pub(super) fn log_startup(&self, listen: &str) {
        info!(target: "hoard::master", "Starting HOARD caching proxy");
        info!(
            target: "hoard::master",
            listen = %listen,
            origin = self.cfg.proxy.origin().unwrap_or("-"),
            worker_connections = self.cfg.global.worker_connections,
            log_level = %self.cfg.global.log_level,
            "Configuration loaded"
        );
    }

    pub(super) fn init_semaphore(&self) -> Arc<Semaphore> {
        let configured = self.cfg.global.worker_connections;
        let max_conns = configured.min(Semaphore::MAX_PERMITS);
        if max_conns < configured {
            warn!(
                target: "hoard::master",
                configured,
                max_conns,
                "worker_connections above the semaphore limit, clamped"
            );
        }
        let semaphore = Arc::new(Semaphore::new(max_conns));
        info!(
            target: "hoard::master",
            max_conns,
            "Global connection semaphore initialized"
        );
        semaphore
    }
}
