//! Per-connection HTTP/1 handler.
//!
//! hyper parses requests off the client socket; every request is handed to
//! the shared `CachingProxy`, which always produces a complete response.

use std::convert::Infallible;
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use hoard_config::HoardConfig;
use hoard_proxy::{CachingProxy, Origin};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Duration;
use tracing::{debug, instrument};

/// Entry point for a "logical worker" that handles a single connection.
#[instrument(
    skip(stream, proxy, cfg),
    fields(
        client = %client_addr,
    )
)]
pub async fn handle_connection<S, O>(
    stream: S,
    client_addr: SocketAddr,
    proxy: Arc<CachingProxy<O>>,
    cfg: Arc<HoardConfig>,
) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    O: Origin,
{
    debug!(target: "hoard::worker", "Handling new client connection");

    let service = service_fn(move |req: Request<Incoming>| {
        let proxy = Arc::clone(&proxy);
        async move { Ok::<_, Infallible>(proxy.handle(req, Some(client_addr)).await) }
    });

    http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(Duration::from_secs(cfg.http.header_read_timeout_secs()))
        .keep_alive(cfg.http.keepalive())
        .serve_connection(TokioIo::new(stream), service)
        .await
        .context("HTTP/1 connection error")?;

    Ok(())
}
