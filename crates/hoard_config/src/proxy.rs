use serde::Deserialize;
use thiserror::Error;
use url::Url;

// =======================================================
// PROXY (ORIGIN) CONFIG + DEFAULTS
// =======================================================
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Origin server URL, e.g. "http://localhost:3000".
    /// Only scheme, host and port are used.
    pub origin: Option<String>,

    /// Timeout for opening a connection to the origin (seconds).
    pub connect_timeout_secs: u64,

    /// Largest origin body the proxy buffers (bytes). 0 = unlimited.
    pub max_response_body_bytes: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            origin: None,
            connect_timeout_secs: 5,
            max_response_body_bytes: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum OriginError {
    #[error("--origin URL is required")]
    Missing,
    #[error("invalid origin URL '{url}': {source}")]
    Invalid {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported origin scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),
    #[error("origin URL '{0}' has no host")]
    MissingHost(String),
}

impl ProxyConfig {
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref().filter(|o| !o.trim().is_empty())
    }

    pub fn connect_timeout_secs(&self) -> u64 {
        self.connect_timeout_secs
    }

    pub fn max_response_body_bytes(&self) -> Option<usize> {
        match self.max_response_body_bytes {
            0 => None,
            n => Some(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }

    /// Parses and checks the configured origin.
    pub fn origin_url(&self) -> Result<Url, OriginError> {
        let raw = self.origin().ok_or(OriginError::Missing)?.trim();

        let url = Url::parse(raw).map_err(|source| OriginError::Invalid {
            url: raw.to_string(),
            source,
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(OriginError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(OriginError::MissingHost(raw.to_string()));
        }

        Ok(url)
    }

    pub(crate) fn apply_defaults_from(&mut self, defaults: &ProxyConfig) {
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = defaults.connect_timeout_secs;
        }
    }
}
