use hoard_config::OriginError;
use hoard_http::{responses, HttpResponse};
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Origin unreachable, TLS failure, or a broken exchange before the body.
    #[error("origin request failed: {0}")]
    Upstream(#[source] BoxError),

    /// The origin body could not be read to the end.
    #[error("failed to read origin response body: {0}")]
    BodyRead(#[source] BoxError),

    #[error("origin response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("cannot forward request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Config(#[from] OriginError),

    #[error("TLS client setup failed: {0}")]
    Tls(#[from] rustls::Error),
}

impl ProxyError {
    pub(crate) fn upstream(err: impl Into<BoxError>) -> Self {
        Self::Upstream(err.into())
    }

    /// Response written to the client when forwarding fails.
    pub fn to_response(&self) -> HttpResponse {
        match self {
            Self::InvalidRequest(_) => responses::bad_request(),
            _ => responses::bad_gateway(),
        }
    }
}
