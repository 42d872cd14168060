use std::net::IpAddr;

use http::uri::{Authority, Parts, PathAndQuery, Scheme};
use http::{header, HeaderValue, Request, Uri, Version};
use tracing::debug;
use url::Url;

use super::headers;
use super::status::X_CACHE;
use crate::error::ProxyError;

/// Pre-send step: points a client request at the origin.
///
/// - scheme and authority of the URI become the origin's; path and query stay
/// - `Host` becomes the origin authority (virtual hosting)
/// - inbound `X-Cache` and hop-by-hop headers are dropped
/// - the client address is appended to `X-Forwarded-For`
#[derive(Debug, Clone)]
pub(crate) struct Director {
    scheme: Scheme,
    authority: Authority,
    host: HeaderValue,
}

impl Director {
    pub(crate) fn new(origin: &Url) -> Result<Self, ProxyError> {
        let scheme = match origin.scheme() {
            "https" => Scheme::HTTPS,
            _ => Scheme::HTTP,
        };

        let host = origin
            .host_str()
            .ok_or_else(|| ProxyError::InvalidRequest(format!("origin '{origin}' has no host")))?;
        // `port()` is None when it is the scheme default.
        let authority = match origin.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            scheme,
            authority: Authority::try_from(authority.as_str())
                .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?,
            host: HeaderValue::from_str(&authority)
                .map_err(|e| ProxyError::InvalidRequest(e.to_string()))?,
        })
    }

    pub(crate) fn direct<B>(
        &self,
        req: Request<B>,
        client_ip: Option<IpAddr>,
    ) -> Result<Request<B>, ProxyError> {
        let (mut parts, body) = req.into_parts();

        let mut uri = Parts::default();
        uri.scheme = Some(self.scheme.clone());
        uri.authority = Some(self.authority.clone());
        uri.path_and_query = Some(
            parts
                .uri
                .path_and_query()
                .cloned()
                .unwrap_or_else(|| PathAndQuery::from_static("/")),
        );
        parts.uri = Uri::from_parts(uri).map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;
        parts.version = Version::HTTP_11;

        headers::strip_hop_by_hop(&mut parts.headers);
        parts.headers.remove(X_CACHE);
        parts.headers.insert(header::HOST, self.host.clone());
        if let Some(ip) = client_ip {
            headers::append_forwarded_for(&mut parts.headers, ip);
        }

        debug!(
            target: "hoard::proxy",
            method = %parts.method,
            uri = %parts.uri,
            "Forwarding request to origin"
        );

        Ok(Request::from_parts(parts, body))
    }
}
