//! Outbound HTTP/1.1 client for the origin server.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use http::uri::{PathAndQuery, Scheme};
use http::{Request, Response, Uri};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::BodyExt;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_rustls::TlsConnector;
use tracing::{debug, info, instrument};

use crate::error::{BoxError, ProxyError};

/// Body type flowing through the pipeline in both directions.
pub type ProxyBody = UnsyncBoxBody<Bytes, BoxError>;

/// Something that can perform the origin round trip.
///
/// The request URI is absolute (scheme + authority already rewritten by the
/// director). The response body is returned unread.
pub trait Origin: Send + Sync + 'static {
    fn send(
        &self,
        req: Request<ProxyBody>,
    ) -> impl Future<Output = Result<Response<ProxyBody>, ProxyError>> + Send;
}

/// Opens one connection per request, plain TCP or TLS depending on the scheme.
pub struct HttpOrigin {
    connect_timeout: Duration,
    tls: TlsConnector,
}

impl HttpOrigin {
    pub fn new(connect_timeout: Duration) -> Result<Self, ProxyError> {
        let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

        Ok(Self {
            connect_timeout,
            tls: TlsConnector::from(Arc::new(tls)),
        })
    }
}

impl Origin for HttpOrigin {
    #[instrument(skip(self, req), fields(uri = %req.uri()))]
    async fn send(&self, mut req: Request<ProxyBody>) -> Result<Response<ProxyBody>, ProxyError> {
        let uri = req.uri().clone();
        let host = uri
            .host()
            .ok_or_else(|| ProxyError::InvalidRequest(format!("no origin host in '{uri}'")))?;
        let https = uri.scheme() == Some(&Scheme::HTTPS);
        let port = uri.port_u16().unwrap_or(if https { 443 } else { 80 });
        let addr = format!("{host}:{port}");

        // HTTP/1.1 origin-form on the wire; the Host header carries the authority.
        let path = uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        *req.uri_mut() = Uri::from(path);

        info!(target: "hoard::proxy", upstream = %addr, "Creating new origin connection");
        let stream = connect_with_timeout(&addr, self.connect_timeout).await?;

        if https {
            let server_name = ServerName::try_from(host.trim_matches(['[', ']']).to_string())
                .map_err(ProxyError::upstream)?;
            let tls = self
                .tls
                .connect(server_name, stream)
                .await
                .map_err(ProxyError::upstream)?;
            send_over(tls, req, addr).await
        } else {
            send_over(stream, req, addr).await
        }
    }
}

/// HTTP/1.1 handshake on an established stream, then a single request.
async fn send_over<S>(
    io: S,
    req: Request<ProxyBody>,
    addr: String,
) -> Result<Response<ProxyBody>, ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = http1::handshake(TokioIo::new(io))
        .await
        .map_err(ProxyError::upstream)?;

    // Drives the connection until the response body has been read.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(target: "hoard::proxy", upstream = %addr, error = ?e, "Origin connection closed with error");
        }
    });

    let resp = sender.send_request(req).await.map_err(ProxyError::upstream)?;
    Ok(resp.map(|body| body.map_err(BoxError::from).boxed_unsync()))
}

/// Connect to the origin with a timeout.
async fn connect_with_timeout(addr: &str, timeout_dur: Duration) -> Result<TcpStream, ProxyError> {
    match timeout(timeout_dur, TcpStream::connect(addr)).await {
        Ok(res) => res.map_err(ProxyError::upstream),
        Err(_) => Err(ProxyError::upstream(format!(
            "origin connect timeout to {addr}"
        ))),
    }
}
