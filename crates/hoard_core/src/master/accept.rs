use std::sync::Arc;

use anyhow::Context;
use hoard_config::HoardConfig;
use hoard_proxy::{CachingProxy, Origin};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, instrument, warn, Instrument};

use crate::worker::handle_connection;

pub(crate) async fn bind_listener(listen_addr: &str) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;

    info!(target: "hoard::master", listen = %listen_addr, "Listener bound");
    Ok(listener)
}

/// Accepts clients forever, one task per connection.
///
/// A permit is taken before `accept()`, so at most `worker_connections`
/// clients are served at once and the rest wait in the kernel backlog.
/// Per-connection accept errors (client reset, fd exhaustion) are logged and
/// the loop keeps going; only a closed semaphore ends it.
#[instrument(
    skip_all,
    fields(listen = %listen_addr)
)]
pub(crate) async fn accept_loop<O: Origin>(
    listener: TcpListener,
    listen_addr: String,
    semaphore: Arc<Semaphore>,
    proxy: Arc<CachingProxy<O>>,
    cfg: Arc<HoardConfig>,
) -> anyhow::Result<()> {
    info!(target: "hoard::master", "Accepting connections");

    loop {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .context("connection semaphore closed")?;

        let (stream, client_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(target: "hoard::master", error = %e, "accept() failed");
                // Avoid spinning while the process is out of file descriptors.
                sleep(Duration::from_millis(50)).await;
                continue;
            }
        };

        debug!(
            target: "hoard::master",
            client_addr = %client_addr,
            available_permits = semaphore.available_permits(),
            "Connection accepted"
        );

        let span = tracing::info_span!("connection", client_addr = %client_addr);
        let proxy = Arc::clone(&proxy);
        let cfg = Arc::clone(&cfg);

        tokio::spawn(
            async move {
                // Released when the connection task ends.
                let _permit = permit;

                match handle_connection(stream, client_addr, proxy, cfg).await {
                    Ok(()) => debug!(target: "hoard::worker", "Connection closed"),
                    Err(e) => warn!(target: "hoard::worker", error = ?e, "Connection ended with error"),
                }
            }
            .instrument(span),
        );
    }
}
