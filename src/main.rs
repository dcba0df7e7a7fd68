//! swapbench - coordinated block-exchange latency benchmark.
//!
//! A run is a fleet of instances: one provider and any number of requestors.
//! Instances coordinate through a sync server and exchange blocks directly.
//!
//! # Usage
//!
//! ```bash
//! # Whole fleet in one process
//! swapbench local --requestors 3 --size 1MiB --count 20
//!
//! # Separate processes
//! swapbench sync-server --listen 0.0.0.0:5050
//! swapbench run --group providers  --instance-count 3 --sync-addr host:5050
//! swapbench run --group requestors --instance-count 3 --sync-addr host:5050 --ordinal 1
//! swapbench run --group requestors --instance-count 3 --sync-addr host:5050 --ordinal 2
//!
//! # JSON report for scripting
//! swapbench --json --quiet local --requestors 2 | jq '.instances[1].outcome.total_ms'
//! ```
//!
//! Every option can also be given as a `SWAPBENCH_*` environment variable.

mod cli;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

/// Initialize tracing subscriber with environment-based filtering.
///
/// - `quiet`: Suppress all logging output (for scripting)
/// - `verbose`: Enable debug-level logging
fn init_tracing(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.global.is_quiet, cli.global.is_verbose);

    cli.run().await
}
