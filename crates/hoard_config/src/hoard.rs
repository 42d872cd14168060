use serde::Deserialize;

use crate::validation::{validate, ConfigReport};
use crate::{GlobalConfig, HttpConfig, ProxyConfig};

/// Environment variables override the file: HOARD_PROXY__ORIGIN, HOARD_HTTP__PORT, ...
const ENV_PREFIX: &str = "HOARD";

// =======================================================
// HOARD CONFIG — main config
// =======================================================
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HoardConfig {
    #[serde(default)]
    pub global: GlobalConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,
}

/// Values given on the command line. They win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub origin: Option<String>,
}

impl HoardConfig {
    /// Checks a configuration about to serve; clear-cache mode skips this.
    pub fn validate(&self) -> ConfigReport {
        validate(self)
    }

    pub fn from_file(file_name: &str) -> Result<Self, config::ConfigError> {
        let built = config::Config::builder()
            .add_source(config::File::new(file_name, config::FileFormat::Ini).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: HoardConfig = built.try_deserialize()?;

        cfg.apply_defaults();
        Ok(cfg)
    }

    /// Like `from_file`, but an unreadable file is reported and replaced by defaults.
    pub fn from_file_or_default(file_name: &str) -> Self {
        match Self::from_file(file_name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("⚠️  Error reading config '{file_name}': {e}");
                eprintln!("➡️  Using default config (in-memory)...");
                HoardConfig::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.port {
            self.http.port = port;
        }
        if let Some(origin) = overrides.origin {
            self.proxy.origin = Some(origin);
        }
    }

    fn apply_defaults(&mut self) {
        self.global.apply_defaults_from(&GlobalConfig::default());
        self.http.apply_defaults_from(&HttpConfig::default());
        self.proxy.apply_defaults_from(&ProxyConfig::default());
    }

    pub fn print(&self) {
        println!("================ HOARD CONFIG ================");
        println!("\n[global]");
        println!("  worker_connections   = {}", self.global.worker_connections);
        println!("  log_level            = {}", self.global.log_level);

        println!("\n[http]");
        println!("  listen               = {}", self.http.listen_addr());
        println!(
            "  header_read_timeout_secs = {}",
            self.http.header_read_timeout_secs
        );
        println!("  keepalive            = {}", self.http.keepalive);

        println!("\n[proxy]");
        println!("  origin               = {:?}", self.proxy.origin);
        println!(
            "  connect_timeout_secs = {}",
            self.proxy.connect_timeout_secs
        );
        println!(
            "  max_response_body_bytes = {}",
            self.proxy.max_response_body_bytes
        );
        println!("==============================================");
    }
}
