use serde::Deserialize;

// =======================================================
// HTTP (LISTENER) CONFIG + DEFAULTS
// =======================================================
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub listen_host: String,
    pub port: u16,

    /// Time allowed for a client to send a full request head (seconds).
    pub header_read_timeout_secs: u64,
    /// Keep client connections open between requests.
    pub keepalive: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".into(),
            port: 8080,
            header_read_timeout_secs: 15,
            keepalive: true,
        }
    }
}

impl HttpConfig {
    /// "host:port" string handed to the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.port)
    }

    pub fn header_read_timeout_secs(&self) -> u64 {
        self.header_read_timeout_secs
    }

    pub fn keepalive(&self) -> bool {
        self.keepalive
    }

    pub(crate) fn apply_defaults_from(&mut self, defaults: &HttpConfig) {
        if self.listen_host.is_empty() {
            self.listen_host = defaults.listen_host.clone();
        }
        if self.header_read_timeout_secs == 0 {
            self.header_read_timeout_secs = defaults.header_read_timeout_secs;
        }
    }
}
