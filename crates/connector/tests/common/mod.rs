//! Shared fixture for connector integration tests
#![allow(dead_code)]

use mage_config::ConnectorSettings;
use mage_connector::{Connector, Entity};
use mage_testing::{MemoryDriver, Topology};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Row of the `samples` table in a tenant keyspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEntity {
    pub identifier: String,
    pub content: String,
}

impl SampleEntity {
    pub fn new(identifier: &str, content: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            content: content.to_string(),
        }
    }
}

impl Entity for SampleEntity {
    const TABLE: &'static str = "samples";

    fn primary_key(&self) -> String {
        self.identifier.clone()
    }
}

/// An entity whose table exists in no keyspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanEntity {
    pub identifier: String,
}

impl Entity for OrphanEntity {
    const TABLE: &'static str = "orphans";

    fn primary_key(&self) -> String {
        self.identifier.clone()
    }
}

pub struct TestConnector {
    pub driver: MemoryDriver,
    pub connector: Connector,
}

/// A connector with default settings over the standard topology
pub async fn connector() -> TestConnector {
    connector_with(ConnectorSettings::default()).await
}

pub async fn connector_with(settings: ConnectorSettings) -> TestConnector {
    let driver = Topology::standard()
        .and_then(|topology| topology.build_driver())
        .expect("standard topology");
    let connector = Connector::builder(settings)
        .driver(Arc::new(driver.clone()))
        .touch_admin_session(false)
        .build()
        .await
        .expect("connector");
    TestConnector { driver, connector }
}
