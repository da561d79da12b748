use clap::Parser;
use mage_config::{ConfigLoader, SettingsOverrides};
use std::path::PathBuf;

mod commands;
mod logging;

use commands::{CommandContext, Commands};

#[derive(Parser)]
#[command(name = "mage")]
#[command(about = "Probe tenant routing of the mage connector", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON configuration file (also read from MAGE_CONNECTOR_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON topology seeding the in-memory cluster; a single `test` tenant if omitted
    #[arg(long, global = true, value_name = "FILE")]
    topology: Option<PathBuf>,

    /// Admin cluster name
    #[arg(long, global = true)]
    cluster_name: Option<String>,

    /// Admin contact points, comma separated
    #[arg(long, global = true)]
    contact_points: Option<String>,

    /// Port used for the admin cluster and every tenant cluster
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Admin keyspace holding the tenants table
    #[arg(long, global = true)]
    keyspace: Option<String>,

    /// Consistency level for reads, writes and deletes
    #[arg(long, global = true)]
    consistency: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            cluster_name: self.cluster_name.clone(),
            contact_points: self.contact_points.clone(),
            port: self.port,
            keyspace: self.keyspace.clone(),
            consistency: self.consistency.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    logging::init()?;

    let cli = Cli::parse();

    let mut loader = ConfigLoader::new().overrides(cli.overrides());
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    let loaded = loader.load()?;
    tracing::debug!(layers = loaded.sources.len(), "settings loaded");

    let context = CommandContext {
        loaded,
        topology: cli.topology,
    };
    cli.command.execute(&context).await
}
