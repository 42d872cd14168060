mod global;
mod hoard;
mod http;
mod proxy;
mod validation;

pub use global::GlobalConfig;
pub use hoard::{CliOverrides, HoardConfig};
pub use http::HttpConfig;
pub use proxy::{OriginError, ProxyConfig};
pub use validation::{validate, ConfigReport};
