use std::net::IpAddr;

use bytes::Bytes;
use hoard_cache::CacheKey;
use http::{Request, Response};
use tracing::instrument;

use super::director::Director;
use super::intercept::Interceptor;
use super::origin::{Origin, ProxyBody};
use crate::error::ProxyError;

/// Forwarding driver: director → origin round trip → interception.
///
/// Runs for every request that reaches the origin, cacheable or not. No step
/// holds the cache lock while the origin is being awaited.
pub(crate) struct Pipeline<O> {
    director: Director,
    interceptor: Interceptor,
    origin: O,
}

impl<O: Origin> Pipeline<O> {
    pub(crate) fn new(director: Director, interceptor: Interceptor, origin: O) -> Self {
        Self {
            director,
            interceptor,
            origin,
        }
    }

    #[instrument(
        skip_all,
        fields(method = %req.method(), uri = %req.uri())
    )]
    pub(crate) async fn forward(
        &self,
        req: Request<ProxyBody>,
        key: Option<&CacheKey>,
        client_ip: Option<IpAddr>,
    ) -> Result<Response<Bytes>, ProxyError> {
        let outbound = self.director.direct(req, client_ip)?;
        let resp = self.origin.send(outbound).await?;
        self.interceptor.intercept(key, resp).await
    }
}
