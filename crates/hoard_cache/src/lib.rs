//! In-memory response cache for the proxy.
//!
//! - `key`: normalized cache keys derived from a request
//! - `entry`: a stored origin response
//! - `store`: the shared, lock-protected map
//! - `policy`: which requests are looked up and which responses are stored

pub mod entry;
pub mod key;
pub mod policy;
pub mod store;

pub use entry::CachedResponse;
pub use key::CacheKey;
pub use policy::CachePolicy;
pub use store::CacheStore;
