//! CLI argument parsing and command dispatch.
//!
//! Uses clap derive macros with `SWAPBENCH_*` environment variable fallbacks,
//! so instances launched by an orchestrator can be configured without flags.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use swapbench_exchange::TcpNode;
use swapbench_plan::CountMode;
use swapbench_plan::FetchPolicy;
use swapbench_plan::InstanceContext;
use swapbench_plan::InstanceInfo;
use swapbench_plan::LocalFleet;
use swapbench_plan::RunParams;
use swapbench_plan::TestCase;
use swapbench_plan::constants::DEFAULT_BLOCK_COUNT;
use swapbench_plan::parse_size;
use swapbench_plan::run_instance;
use swapbench_sync::RemoteSyncClient;
use swapbench_sync::SyncHandle;
use swapbench_sync::SyncServer;
use swapbench_sync::constants::DEFAULT_SYNC_ADDR;
use tracing::info;

use crate::output::InstanceOutput;
use crate::output::print_output;

/// Coordinated block-exchange latency benchmark.
#[derive(Parser)]
#[command(name = "swapbench")]
#[command(version)]
#[command(about = "Coordinated block-exchange latency benchmark")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global options available to all commands.
#[derive(Args, Clone)]
pub struct GlobalOptions {
    /// Output JSON instead of human-readable format.
    #[arg(long = "json", global = true)]
    pub is_json: bool,

    /// Enable verbose logging.
    #[arg(short = 'v', long = "verbose", global = true)]
    pub is_verbose: bool,

    /// Suppress all logging output.
    ///
    /// Useful when parsing JSON output.
    #[arg(short = 'q', long = "quiet", global = true)]
    pub is_quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Host the coordination service for a fleet of separate processes.
    SyncServer(SyncServerArgs),

    /// Run one instance of a test case against a sync server.
    Run(RunArgs),

    /// Run a provider and N requestors in this process.
    Local(LocalArgs),
}

#[derive(Args, Clone)]
pub struct SyncServerArgs {
    /// Address to listen on.
    #[arg(long, env = "SWAPBENCH_SYNC_LISTEN", default_value = DEFAULT_SYNC_ADDR)]
    pub listen: String,
}

/// Parameters every instance of a run must agree on.
#[derive(Args, Clone)]
pub struct PlanArgs {
    /// Test case to run (speed-test, rendezvous).
    #[arg(long = "case", env = "SWAPBENCH_CASE", default_value = "speed-test")]
    pub case: TestCase,

    /// Block size, e.g. 1024, 1KiB, 4MB.
    #[arg(long, env = "SWAPBENCH_SIZE", default_value = "1MiB", value_parser = parse_size)]
    pub size: u64,

    /// Number of blocks, interpreted by --count-mode.
    #[arg(long, env = "SWAPBENCH_COUNT", default_value_t = DEFAULT_BLOCK_COUNT)]
    pub count: u64,

    /// exact: `count` blocks; inclusive: `count + 1` blocks.
    #[arg(long, env = "SWAPBENCH_COUNT_MODE", default_value = "exact")]
    pub count_mode: CountMode,

    /// strict: abort on the first failed fetch; lenient: record and continue.
    #[arg(long, env = "SWAPBENCH_FETCH_POLICY", default_value = "strict")]
    pub fetch_policy: FetchPolicy,

    /// Bound on each block fetch, in milliseconds.
    #[arg(long = "fetch-timeout-ms", env = "SWAPBENCH_FETCH_TIMEOUT_MS")]
    pub fetch_timeout_ms: Option<u64>,

    /// Bound on waiting for each block identifier, in milliseconds.
    #[arg(long = "announce-timeout-ms", env = "SWAPBENCH_ANNOUNCE_TIMEOUT_MS")]
    pub announce_timeout_ms: Option<u64>,

    /// Seed for payload generation.
    #[arg(long, env = "SWAPBENCH_SEED")]
    pub seed: Option<u64>,
}

impl PlanArgs {
    fn params(&self) -> RunParams {
        RunParams {
            size: self.size,
            count: self.count,
            count_mode: self.count_mode,
            fetch_policy: self.fetch_policy,
            fetch_timeout: self.fetch_timeout_ms.map(Duration::from_millis),
            announce_timeout: self.announce_timeout_ms.map(Duration::from_millis),
            seed: self.seed,
        }
    }
}

#[derive(Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Test group of this instance (providers, requestors).
    #[arg(long, env = "SWAPBENCH_GROUP")]
    pub group: String,

    /// Total number of instances in the fleet.
    #[arg(long, env = "SWAPBENCH_INSTANCE_COUNT")]
    pub instance_count: u64,

    /// Position of this instance in the fleet.
    #[arg(long, env = "SWAPBENCH_ORDINAL", default_value_t = 0)]
    pub ordinal: u64,

    /// Address of the sync server.
    #[arg(long, env = "SWAPBENCH_SYNC_ADDR", default_value = DEFAULT_SYNC_ADDR)]
    pub sync_addr: String,

    /// Address the block exchange listens on.
    #[arg(long, env = "SWAPBENCH_LISTEN", default_value = "127.0.0.1:0")]
    pub listen: String,

    /// Host other instances should dial, when listening on an unspecified address.
    #[arg(long, env = "SWAPBENCH_ADVERTISE_HOST")]
    pub advertise_host: Option<String>,
}

#[derive(Args, Clone)]
pub struct LocalArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Number of requestors alongside the single provider.
    #[arg(long, env = "SWAPBENCH_REQUESTORS", default_value_t = 1)]
    pub requestors: u64,
}

impl Cli {
    /// Execute the parsed command.
    pub async fn run(self) -> Result<()> {
        let is_json = self.global.is_json;
        match self.command {
            Commands::SyncServer(args) => run_sync_server(args).await,
            Commands::Run(args) => run_single(args, is_json).await,
            Commands::Local(args) => run_local(args, is_json).await,
        }
    }
}

async fn run_sync_server(args: SyncServerArgs) -> Result<()> {
    let server = SyncServer::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind sync server on {}", args.listen))?
        .spawn()
        .context("failed to start sync server")?;
    info!(addr = %server.addr(), "sync server ready, press ctrl-c to stop");

    tokio::signal::ctrl_c().await.context("failed to wait for ctrl-c")?;
    server.shutdown().await;
    Ok(())
}

async fn run_single(args: RunArgs, is_json: bool) -> Result<()> {
    let case = args.plan.case;
    let instance = InstanceInfo::new(&args.group, args.instance_count, args.ordinal)?;

    let client = RemoteSyncClient::connect(args.sync_addr.clone())
        .await
        .with_context(|| format!("failed to connect to sync server at {}", args.sync_addr))?;
    let node = TcpNode::bind(&args.listen, args.advertise_host.as_deref())
        .await
        .with_context(|| format!("failed to start block exchange on {}", args.listen))?;

    let ctx = InstanceContext::new(instance, args.plan.params(), SyncHandle::new(Arc::new(client)));
    let outcome = run_instance(case, &ctx, &node)
        .await
        .with_context(|| format!("{} instance {} failed", instance.role, instance.ordinal))?;
    node.shutdown();

    print_output(
        &InstanceOutput {
            case,
            instance,
            outcome,
        },
        is_json,
    );
    Ok(())
}

async fn run_local(args: LocalArgs, is_json: bool) -> Result<()> {
    let report = LocalFleet::new(args.plan.case, args.plan.params(), args.requestors)
        .run()
        .await
        .context("local fleet failed")?;
    print_output(&report, is_json);
    Ok(())
}
