//! Contracts for the clustered database driver.
//!
//! The connector never talks to the wire itself. It asks a [`ClusterDriver`]
//! for cluster handles, asks a [`Cluster`] for keyspace-bound [`Session`]s, and
//! hands sessions to the mapping layer, which needs nothing beyond the
//! single-row calls declared here.

use crate::errors::Result;
use crate::types::{ClusterName, ContactPoints, Keyspace, Port, StatementOptions};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// A stored row, column name to value
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Everything needed to build a cluster handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    pub name: ClusterName,
    pub contact_points: ContactPoints,
    pub port: Port,
}

impl ClusterSpec {
    pub fn new(name: ClusterName, contact_points: ContactPoints, port: Port) -> Self {
        Self {
            name,
            contact_points,
            port,
        }
    }
}

/// Builds cluster handles
#[async_trait]
pub trait ClusterDriver: Send + Sync {
    /// Build a handle for the given cluster.
    ///
    /// Failures are reported as [`crate::Error::Connectivity`].
    async fn build_cluster(&self, spec: &ClusterSpec) -> Result<Arc<dyn Cluster>>;
}

/// A reusable client-side handle on one database cluster
#[async_trait]
pub trait Cluster: Send + Sync + fmt::Debug {
    /// Parameters the handle was built with
    fn spec(&self) -> &ClusterSpec;

    /// Open a session bound to `keyspace`.
    ///
    /// A missing or invalid keyspace is reported as
    /// [`crate::Error::KeyspaceUnavailable`].
    async fn connect(&self, keyspace: &Keyspace) -> Result<Arc<dyn Session>>;

    async fn close(&self);

    fn is_closed(&self) -> bool;
}

/// A live, keyspace-bound connection handle
#[async_trait]
pub trait Session: Send + Sync + fmt::Debug {
    fn keyspace(&self) -> &Keyspace;

    /// Whether `table` exists in this session's keyspace
    async fn has_table(&self, table: &str) -> Result<bool>;

    /// Read the row stored under `key`, if any
    async fn fetch(&self, table: &str, key: &str, options: StatementOptions) -> Result<Option<Row>>;

    /// Insert or replace the row stored under `key`
    async fn upsert(&self, table: &str, key: &str, row: Row, options: StatementOptions) -> Result<()>;

    /// Delete the row stored under `key`, returning whether it existed
    async fn remove(&self, table: &str, key: &str, options: StatementOptions) -> Result<bool>;

    async fn close(&self);

    fn is_closed(&self) -> bool;
}
