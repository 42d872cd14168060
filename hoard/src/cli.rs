use clap::Parser;
use hoard_config::CliOverrides;

/// HTTP caching proxy: answers repeated GETs from memory and marks every
/// response with `X-Cache: HIT | MISS | BYPASS`.
#[derive(Debug, Parser)]
#[command(name = "hoard", version, about)]
pub struct Cli {
    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Origin server base URL, e.g. http://dummyjson.com
    #[arg(long)]
    pub origin: Option<String>,

    /// Clear the cache and exit
    #[arg(long)]
    pub clear_cache: bool,

    /// Configuration file (INI); missing or unreadable files fall back to defaults
    #[arg(long, default_value = "hoard.conf")]
    pub config: String,
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            port: self.port,
            origin: self.origin.clone(),
        }
    }
}
