//! CLI argument parsing using clap v4

use clap::{Args, Parser, Subcommand};

use crate::config::FabricConfig;

/// Task fabric: random dispatch of tasks from a coordinator to TCP workers
///
/// A coordinator dials a fixed set of workers and forwards every task to one
/// of them at random. Workers uppercase what they receive and may relay the
/// result back to the coordinator.
#[derive(Parser, Debug)]
#[command(name = "taskfabric")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the coordinator (dials workers and dispatches tasks)
    Coordinator(CoordinatorArgs),

    /// Run a worker (receives tasks and relays results)
    Worker(WorkerArgs),

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct CoordinatorArgs {
    /// Path to configuration file
    #[arg(short, long, env = "FABRIC_CONFIG")]
    pub config: Option<String>,

    /// Address to receive worker results on (e.g. :3000)
    #[arg(short, long)]
    pub listen: Option<String>,

    /// YAML file listing the workers to dial
    #[arg(short, long)]
    pub workers_file: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WorkerArgs {
    /// Path to configuration file
    #[arg(short, long, env = "FABRIC_CONFIG")]
    pub config: Option<String>,

    /// Address to receive tasks on (e.g. :3333)
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Coordinator address to relay results to (e.g. :3000)
    #[arg(short = 's', long)]
    pub coordinator: Option<String>,

    /// Worker name used in logs
    #[arg(short, long)]
    pub name: Option<String>,
}

impl CoordinatorArgs {
    /// Override config values with the flags that were given
    pub fn apply_to(&self, config: &mut FabricConfig) {
        if let Some(ref listen) = self.listen {
            config.coordinator.listen_addr = listen.clone();
        }
        if let Some(ref file) = self.workers_file {
            config.coordinator.workers_file = Some(shellexpand::tilde(file).into_owned());
        }
    }
}

impl WorkerArgs {
    /// Override config values with the flags that were given
    pub fn apply_to(&self, config: &mut FabricConfig) {
        if let Some(ref listen) = self.listen {
            config.worker.listen_addr = listen.clone();
        }
        if let Some(ref coordinator) = self.coordinator {
            config.worker.coordinator_addr = Some(coordinator.clone());
        }
        if let Some(ref name) = self.name {
            config.worker.name = Some(name.clone());
        }
    }
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the effective configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}
