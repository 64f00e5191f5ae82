//! tidbctl
//!
//! Command-line access to member health probes and PD clients

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tidbctl_common::{ClusterDescriptor, MemberRole};
use tidbctl_controller::pd::client::PdClient;
use tidbctl_controller::{
    get_pd_client, ControllerConfig, DefaultPdControl, DefaultTidbControl, Shutdown, TidbControl,
};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every member of a role and print the health report
    Health {
        /// Cluster namespace
        #[arg(short, long)]
        namespace: String,
        /// Cluster name
        #[arg(long)]
        name: String,
        /// Declared replica count of the role
        #[arg(short, long, allow_negative_numbers = true)]
        replicas: i32,
        /// Member role (pd, tikv, tidb)
        #[arg(long, default_value = "tidb")]
        role: MemberRole,
    },
    /// Query the PD service of a cluster
    Pd {
        /// Cluster namespace
        #[arg(short, long)]
        namespace: String,
        /// Cluster name
        #[arg(long)]
        name: String,
        /// Also list PD members
        #[arg(long)]
        members: bool,
    },
    /// Print a sample configuration file
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = ControllerConfig::load_from_file(path)?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => ControllerConfig::load()?,
    };

    let _log_guard = config
        .logging
        .init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    match cli.command {
        Commands::Health {
            namespace,
            name,
            replicas,
            role,
        } => {
            let control = DefaultTidbControl::new(config.probe.clone())?.with_role(role);
            let tc = ClusterDescriptor::new(namespace, name).with_replicas(role, replicas);

            let shutdown = Shutdown::new();
            let signal = shutdown.subscribe();
            let signal_task = {
                let shutdown = shutdown.clone();
                tokio::spawn(async move { shutdown.wait_for_signal().await })
            };

            let report = control.get_health_until(&tc, signal).await;
            signal_task.abort();

            let sorted: BTreeMap<String, bool> = report?.into_iter().collect();
            println!("{}", serde_json::to_string_pretty(&sorted)?);
        }
        Commands::Pd {
            namespace,
            name,
            members,
        } => {
            let control = DefaultPdControl::new(config.pd.clone())?;
            let tc = ClusterDescriptor::new(namespace, name);

            let client = get_pd_client(&control, &tc).await?;
            info!(url = %client.url(), "Querying PD");

            let health = client.get_health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);

            if members {
                let members = client.get_members().await?;
                println!("{}", serde_json::to_string_pretty(&members)?);
            }
        }
        Commands::Config => {
            println!("{}", ControllerConfig::generate_sample());
        }
    }

    Ok(())
}
