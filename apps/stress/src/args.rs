//! # CLI Argument Definitions

use clap::Parser;
use std::path::PathBuf;

/// Hammers one store root from many threads and verifies every value read back.
#[derive(Debug, Parser)]
#[command(name = "sos-stress")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Concurrency stress test for a shared object store root")]
pub(crate) struct Cli {
    /// Store root; overrides `root` from the config file and `SOS__STORE__ROOT`
    #[arg(short, long)]
    pub(crate) root: Option<PathBuf>,

    /// Optional TOML/YAML/JSON file with a `[store]` section
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,

    /// Number of distinct keys the workers contend on
    #[arg(short, long, default_value_t = 16, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) keys: u32,

    /// Writer threads
    #[arg(short, long, default_value_t = 4)]
    pub(crate) writers: u32,

    /// Reader threads
    #[arg(long, default_value_t = 4)]
    pub(crate) readers: u32,

    /// Deleter threads
    #[arg(short, long, default_value_t = 0)]
    pub(crate) deleters: u32,

    /// Operations per thread
    #[arg(short, long, default_value_t = 1000)]
    pub(crate) iterations: u32,

    /// Maximum payload size in bytes; sizes vary between half of it and all of it
    #[arg(long, default_value_t = 4096)]
    pub(crate) value_size: usize,

    /// Leave the store on disk instead of destroying it after the run
    #[arg(long)]
    pub(crate) keep: bool,

    /// Log every store operation
    #[arg(short, long)]
    pub(crate) verbose: bool,
}
