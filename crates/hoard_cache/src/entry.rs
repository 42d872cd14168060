use std::time::SystemTime;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// One stored origin response.
///
/// Cloning is cheap: the body is reference counted.
#[derive(Clone, Debug)]
pub struct CachedResponse {
    pub body: Bytes,
    pub status: StatusCode,
    /// Headers as returned by the origin. Filtering happens when serving.
    pub headers: HeaderMap,
    /// When the entry was stored. Not used for expiration.
    pub timestamp: SystemTime,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            body,
            status,
            headers,
            timestamp: SystemTime::now(),
        }
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}
