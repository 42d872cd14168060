use std::fmt;

use http::{HeaderMap, HeaderName, HeaderValue};

/// Marker header present on every response hoard produces.
pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Outcome of a request against the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// Method not eligible for caching; forwarded untouched.
    Bypass,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }

    /// Sets `X-Cache`, replacing any value the origin sent.
    pub fn mark(self, headers: &mut HeaderMap) {
        headers.insert(X_CACHE, HeaderValue::from_static(self.as_str()));
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
