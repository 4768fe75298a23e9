mod args;
mod payload;
mod settings;
mod workload;

use anyhow::{Context, bail};
use args::Cli;
use clap::Parser;
use sos_logger::{LevelFilter, Logger};
use sos_store::ObjectStore;
use std::fs;
use std::time::Instant;
use tracing::info;
use workload::Workload;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let _logger = Logger::builder().name(env!("CARGO_PKG_NAME")).level(level).init()?;

    let mut config = settings::load(cli.config.as_deref())
        .context("Critical: Configuration is malformed")?
        .store;
    if let Some(root) = cli.root {
        config.root = root;
    }

    let store = ObjectStore::builder().config(config).connect().context("Failed to open store")?;
    let workload = Workload {
        keys: cli.keys,
        writers: cli.writers,
        readers: cli.readers,
        deleters: cli.deleters,
        iterations: cli.iterations,
        value_size: cli.value_size,
    };

    info!(root = %store.root().display(), instance = store.instance_id(), ?workload, "Stress run started");
    let started = Instant::now();
    let report = workload::run(&store, &workload);
    info!(elapsed = ?started.elapsed(), %report, "Stress run finished");

    let leftover = fs::read_dir(store.root().join(".tmp"))
        .context("Failed to inspect scratch directory")?
        .count();

    if !cli.keep {
        store.destroy().context("Failed to destroy store")?;
    }

    if !report.is_clean() {
        bail!("stress run failed: {report}");
    }
    if leftover > 0 {
        bail!("{leftover} scratch file(s) left behind");
    }

    Ok(())
}
