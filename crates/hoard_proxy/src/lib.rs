//! Caching reverse proxy.
//!
//! Every inbound request is classified (HIT / MISS / BYPASS), answered from the
//! cache when possible, and otherwise driven through the forwarding pipeline:
//! director → origin → response interception.

mod error;
mod proxy;

pub use error::{BoxError, ProxyError};
pub use proxy::origin::{HttpOrigin, Origin, ProxyBody};
pub use proxy::status::{CacheStatus, X_CACHE};
pub use proxy::CachingProxy;
