use std::sync::Arc;

use clap::Parser;
use hoard_cache::CacheStore;
use hoard_config::HoardConfig;
use hoard_core::master::Master;
use hoard_proxy::CachingProxy;
use tracing::{info, warn};
use utils::init_tracing;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = HoardConfig::from_file_or_default(&cli.config);
    cfg.apply_overrides(cli.overrides());
    init_tracing(cfg.global.log_level());

    let store = Arc::new(CacheStore::new());

    if cli.clear_cache {
        println!("Clearing cache...");
        store.clear();
        println!("Cache cleared successfully.");
        return Ok(());
    }

    let report = cfg.validate();
    if report.has_errors() {
        eprint!("{report}");
        anyhow::bail!("invalid configuration");
    }
    for warning in report.warnings() {
        warn!(target: "hoard::master", "{warning}");
    }
    cfg.print();

    let proxy = CachingProxy::from_config(&cfg, store)?;
    let master = Master::new(cfg, proxy);

    tokio::select! {
        res = master.run() => res?,
        _ = tokio::signal::ctrl_c() => {
            info!(target: "hoard::master", "Shutdown signal received, exiting");
        }
    }

    Ok(())
}
