use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use hoard_cache::{CacheKey, CachePolicy, CacheStore, CachedResponse};
use http::Response;
use http_body_util::BodyExt;
use tracing::{debug, info, warn};

use super::headers;
use super::origin::ProxyBody;
use crate::error::ProxyError;

/// Post-receive step: buffers the origin body and stores qualifying responses.
///
/// The origin stream is consumed exactly once; the returned response carries
/// the buffered copy. The store is written only after the whole body was read,
/// so a failed read never leaves a partial entry behind.
pub(crate) struct Interceptor {
    store: Arc<CacheStore>,
    max_body: Option<usize>,
}

impl Interceptor {
    pub(crate) fn new(store: Arc<CacheStore>, max_body: Option<usize>) -> Self {
        Self { store, max_body }
    }

    /// `key` is the key of the request as the client sent it; `None` means
    /// the response must not be stored (non-GET).
    pub(crate) async fn intercept(
        &self,
        key: Option<&CacheKey>,
        resp: Response<ProxyBody>,
    ) -> Result<Response<Bytes>, ProxyError> {
        let (mut parts, body) = resp.into_parts();
        headers::strip_hop_by_hop(&mut parts.headers);

        let body = match self.buffer(body).await {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    target: "hoard::proxy",
                    cache_key = key.map(CacheKey::as_str),
                    error = %e,
                    "Failed to read origin response body"
                );
                return Err(e);
            }
        };

        if let Some(key) = key {
            if CachePolicy::is_storable(parts.status) {
                self.store.put(
                    key.clone(),
                    CachedResponse::new(parts.status, parts.headers.clone(), body.clone()),
                );
                info!(
                    target: "hoard::proxy",
                    cache_key = %key,
                    status = parts.status.as_u16(),
                    bytes = body.len(),
                    "Cached origin response"
                );
            } else {
                debug!(
                    target: "hoard::proxy",
                    cache_key = %key,
                    status = parts.status.as_u16(),
                    "Not caching response (not a 2xx success)"
                );
            }
        }

        Ok(Response::from_parts(parts, body))
    }

    async fn buffer(&self, mut body: ProxyBody) -> Result<Bytes, ProxyError> {
        let Some(limit) = self.max_body else {
            let collected = body.collect().await.map_err(ProxyError::BodyRead)?;
            return Ok(collected.to_bytes());
        };

        // Frames are checked as they arrive so an oversized body is never
        // held in full.
        let mut buf = BytesMut::new();
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(ProxyError::BodyRead)?;
            if let Ok(data) = frame.into_data() {
                if buf.len() + data.len() > limit {
                    return Err(ProxyError::BodyTooLarge { limit });
                }
                buf.extend_from_slice(&data);
            }
        }
        Ok(buf.freeze())
    }
}
