use clap::Subcommand;
use mage_config::LoadedSettings;
use mage_connector::Connector;
use mage_testing::{MemoryDriver, Topology};
use std::path::PathBuf;
use std::sync::Arc;

pub mod config;
pub mod probe;
pub mod route;

/// Inputs shared by every command
pub struct CommandContext {
    pub loaded: LoadedSettings,
    pub topology: Option<PathBuf>,
}

impl CommandContext {
    /// Seed the in-memory cluster and build a connector over it
    pub async fn connect(&self, touch_admin_session: bool) -> eyre::Result<(MemoryDriver, Connector)> {
        let topology = match &self.topology {
            Some(path) => Topology::from_file(path)?,
            None => Topology::standard()?,
        };
        let driver = topology.build_driver()?;

        let connector = Connector::builder(self.loaded.settings.clone())
            .driver(Arc::new(driver.clone()))
            .touch_admin_session(touch_admin_session)
            .build()
            .await?;
        Ok((driver, connector))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the admin session and report what was built
    Probe,

    /// Resolve a tenant and open its session
    Route {
        /// Tenant identifier
        tenant: String,

        /// Also fetch this key from the given table in the tenant keyspace
        #[arg(long, value_name = "TABLE:KEY")]
        fetch: Option<String>,
    },

    /// Print the effective settings and where they came from
    Config,
}

impl Commands {
    pub async fn execute(self, context: &CommandContext) -> eyre::Result<()> {
        match self {
            Commands::Probe => probe::execute(context).await,
            Commands::Route { tenant, fetch } => route::execute(context, &tenant, fetch.as_deref()).await,
            Commands::Config => config::execute(context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mage_config::ConfigLoader;
    use mage_core::Error;

    fn context(topology: Option<PathBuf>) -> CommandContext {
        CommandContext {
            loaded: ConfigLoader::new().without_env().load().unwrap(),
            topology,
        }
    }

    #[tokio::test]
    async fn test_demo_topology_routes_tenants() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/topology.json");
        let (_driver, connector) = context(Some(path)).connect(true).await.unwrap();
        let provider = connector.provider();

        let acme = provider.tenant_session("acme").await.unwrap();
        assert_eq!(acme.keyspace().as_str(), "acme_prod");

        let offline = provider.tenant_session("offline").await.unwrap_err();
        assert!(matches!(offline, Error::Connectivity { .. }));

        connector.shutdown().await;
    }

    #[tokio::test]
    async fn test_standard_topology_when_none_given() {
        let (driver, connector) = context(None).connect(false).await.unwrap();
        assert_eq!(driver.counters().connects, 0);

        let session = connector.provider().tenant_session("test").await.unwrap();
        assert_eq!(session.keyspace().as_str(), "mage_test");
    }
}
