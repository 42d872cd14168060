use http::{Method, StatusCode};

pub struct CachePolicy;

impl CachePolicy {
    /// Only GET requests are looked up in, or written to, the cache.
    pub fn is_cacheable(method: &Method) -> bool {
        *method == Method::GET
    }

    /// Only successful (2xx) origin responses are stored.
    pub fn is_storable(status: StatusCode) -> bool {
        status.is_success()
    }
}
