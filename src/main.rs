//! Task fabric binary
//!
//! `taskfabric coordinator` dials the configured workers and dispatches
//! tasks; `taskfabric worker` receives tasks and relays the results.

use clap::Parser;
use tracing::info;

use taskfabric::cli::{Cli, Commands, ConfigSubcommand, CoordinatorArgs, WorkerArgs};
use taskfabric::config::{self, FabricConfig, Role};
use taskfabric::error::{Error, Result};
use taskfabric::{logging, version, Coordinator, WorkerNode};

fn main() {
    if let Err(e) = run() {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments first (before logging, so we know verbosity)
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            version::print_version();
            Ok(())
        }
        Commands::Config { subcommand } => handle_config_command(subcommand),
        Commands::Coordinator(args) => {
            let config = load_coordinator_config(&args)?;
            let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;
            log_startup("coordinator");
            build_runtime()?.block_on(run_coordinator(config))
        }
        Commands::Worker(args) => {
            let config = load_worker_config(&args)?;
            let _log_guards = logging::init_logging(&config.logging, cli.verbose, cli.quiet)?;
            log_startup("worker");
            build_runtime()?.block_on(run_worker(config))
        }
    }
}

/// Config file and env, then CLI flags on top, then role checks
fn load_coordinator_config(args: &CoordinatorArgs) -> Result<FabricConfig> {
    let mut config = FabricConfig::resolve(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate_for(Role::Coordinator)?;
    Ok(config)
}

fn load_worker_config(args: &WorkerArgs) -> Result<FabricConfig> {
    let mut config = FabricConfig::resolve(args.config.as_deref())?;
    args.apply_to(&mut config);
    config.validate_for(Role::Worker)?;
    Ok(config)
}

fn log_startup(role: &str) {
    let build = version::build_info();
    info!(
        role,
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting taskfabric"
    );
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(num_cpus::get().clamp(2, 8))
        .thread_name("taskfabric")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))
}

async fn run_coordinator(config: FabricConfig) -> Result<()> {
    let workers = config.resolved_workers()?;
    let coordinator = Coordinator::bind(&config).await?;
    let runtime = coordinator.start(workers);

    wait_for_shutdown().await;
    runtime.shutdown();
    Ok(())
}

async fn run_worker(config: FabricConfig) -> Result<()> {
    let node = WorkerNode::bind(&config).await?;
    let runtime = node.start();

    wait_for_shutdown().await;
    runtime.shutdown();
    Ok(())
}

async fn wait_for_shutdown() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}

fn handle_config_command(subcommand: ConfigSubcommand) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = FabricConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration file created: {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            let cfg = FabricConfig::load(config.as_deref())?;
            cfg.validate_for(Role::Worker)?;
            cfg.validate_for(Role::Coordinator)?;
            let workers = cfg.resolved_workers()?;
            println!("Configuration is valid ({} workers).", workers.len());
        }
    }

    Ok(())
}
