//! In-memory cluster driver
//!
//! Keyspaces and tables live in process memory and are shared by every
//! cluster handle the driver builds, so two handles with different names see
//! the same data. Contact points only matter for reachability.

use async_trait::async_trait;
use dashmap::DashMap;
use mage_core::{
    Cluster, ClusterDriver, ClusterSpec, ConsistencyLevel, Error, Keyspace, Result, Row, Session,
    StatementOptions, TenantRecord, TENANTS_TABLE,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

type Table = BTreeMap<String, Row>;

#[derive(Debug, Default)]
struct Store {
    keyspaces: RwLock<HashMap<String, HashMap<String, Table>>>,
    unreachable: RwLock<HashSet<String>>,
    latency: Mutex<Option<Duration>>,
    cluster_builds: AtomicUsize,
    connects: AtomicUsize,
    connects_by_keyspace: DashMap<String, usize>,
    cluster_closes: AtomicUsize,
    session_closes: AtomicUsize,
    statements: Mutex<Vec<Statement>>,
}

/// Construction and teardown counts observed by a [`MemoryDriver`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverCounters {
    pub cluster_builds: usize,
    pub connects: usize,
    pub cluster_closes: usize,
    pub session_closes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Fetch,
    Upsert,
    Remove,
}

/// One row-level call a session executed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    pub keyspace: String,
    pub table: String,
    pub key: String,
    pub consistency: ConsistencyLevel,
}

/// Counting driver backed by process memory.
///
/// Cloning is cheap and every clone shares the same store and counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    store: Arc<Store>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty keyspace; existing keyspaces are left untouched
    pub fn create_keyspace(&self, keyspace: &str) {
        self.store
            .keyspaces
            .write()
            .entry(keyspace.to_string())
            .or_default();
    }

    /// Create an empty table, creating its keyspace if needed
    pub fn create_table(&self, keyspace: &str, table: &str) {
        self.store
            .keyspaces
            .write()
            .entry(keyspace.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default();
    }

    pub fn drop_keyspace(&self, keyspace: &str) {
        self.store.keyspaces.write().remove(keyspace);
    }

    /// Store a row, creating its keyspace and table if needed
    pub fn insert_row(&self, keyspace: &str, table: &str, key: &str, row: Row) {
        self.store
            .keyspaces
            .write()
            .entry(keyspace.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), row);
    }

    pub fn row(&self, keyspace: &str, table: &str, key: &str) -> Option<Row> {
        self.store
            .keyspaces
            .read()
            .get(keyspace)
            .and_then(|tables| tables.get(table))
            .and_then(|rows| rows.get(key))
            .cloned()
    }

    /// Register a tenant in the admin keyspace and create its keyspace
    pub fn add_tenant(&self, admin_keyspace: &str, record: &TenantRecord) -> Result<()> {
        let row = match serde_json::to_value(record) {
            Ok(serde_json::Value::Object(row)) => row,
            Ok(_) => return Err(Error::mapping("TenantRecord", "not a row")),
            Err(e) => return Err(Error::mapping("TenantRecord", e.to_string())),
        };
        self.insert_row(admin_keyspace, TENANTS_TABLE, record.identifier.as_str(), row);
        self.create_keyspace(record.keyspace.as_str());
        Ok(())
    }

    /// Make builds whose contact points include only unreachable hosts fail
    pub fn set_unreachable(&self, host: &str) {
        self.store.unreachable.write().insert(host.to_string());
    }

    pub fn set_reachable(&self, host: &str) {
        self.store.unreachable.write().remove(host);
    }

    /// Delay every cluster build and session connect
    pub fn set_connect_latency(&self, latency: Duration) {
        *self.store.latency.lock() = Some(latency);
    }

    pub fn counters(&self) -> DriverCounters {
        DriverCounters {
            cluster_builds: self.store.cluster_builds.load(Ordering::SeqCst),
            connects: self.store.connects.load(Ordering::SeqCst),
            cluster_closes: self.store.cluster_closes.load(Ordering::SeqCst),
            session_closes: self.store.session_closes.load(Ordering::SeqCst),
        }
    }

    /// Connect attempts made for one keyspace
    pub fn connects_to(&self, keyspace: &str) -> usize {
        self.store
            .connects_by_keyspace
            .get(keyspace)
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Every row-level statement executed so far, oldest first
    pub fn statements(&self) -> Vec<Statement> {
        self.store.statements.lock().clone()
    }

    async fn delay(&self) {
        let latency = *self.store.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ClusterDriver for MemoryDriver {
    async fn build_cluster(&self, spec: &ClusterSpec) -> Result<Arc<dyn Cluster>> {
        self.store.cluster_builds.fetch_add(1, Ordering::SeqCst);
        self.delay().await;

        let reachable = {
            let unreachable = self.store.unreachable.read();
            spec.contact_points
                .hosts()
                .iter()
                .any(|host| !unreachable.contains(host))
        };
        if !reachable {
            return Err(Error::connectivity(
                spec.name.as_str(),
                format!("no contact point reachable in [{}]", spec.contact_points),
            ));
        }

        let cluster = MemoryCluster {
            id: Uuid::new_v4(),
            spec: spec.clone(),
            driver: self.clone(),
            closed: AtomicBool::new(false),
        };
        tracing::debug!(cluster = %spec.name, id = %cluster.id, "built in-memory cluster");
        Ok(Arc::new(cluster))
    }
}

#[derive(Debug)]
struct MemoryCluster {
    id: Uuid,
    spec: ClusterSpec,
    driver: MemoryDriver,
    closed: AtomicBool,
}

#[async_trait]
impl Cluster for MemoryCluster {
    fn spec(&self) -> &ClusterSpec {
        &self.spec
    }

    async fn connect(&self, keyspace: &Keyspace) -> Result<Arc<dyn Session>> {
        let store = &self.driver.store;
        store.connects.fetch_add(1, Ordering::SeqCst);
        *store
            .connects_by_keyspace
            .entry(keyspace.to_string())
            .or_insert(0) += 1;
        self.driver.delay().await;

        if self.is_closed() {
            return Err(Error::connectivity(self.spec.name.as_str(), "cluster is closed"));
        }
        if !store.keyspaces.read().contains_key(keyspace.as_str()) {
            return Err(Error::keyspace_unavailable(keyspace.as_str(), "keyspace does not exist"));
        }

        Ok(Arc::new(MemorySession {
            id: Uuid::new_v4(),
            keyspace: keyspace.clone(),
            driver: self.driver.clone(),
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.driver.store.cluster_closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct MemorySession {
    id: Uuid,
    keyspace: Keyspace,
    driver: MemoryDriver,
    closed: AtomicBool,
}

impl MemorySession {
    fn execute<T>(
        &self,
        kind: StatementKind,
        table: &str,
        key: &str,
        options: StatementOptions,
        op: impl FnOnce(&mut Table) -> T,
    ) -> Result<T> {
        let operation = match kind {
            StatementKind::Fetch => "fetch",
            StatementKind::Upsert => "upsert",
            StatementKind::Remove => "remove",
        };
        if self.is_closed() {
            return Err(Error::query(operation, format!("session {} is closed", self.id)));
        }

        let mut keyspaces = self.driver.store.keyspaces.write();
        let rows = keyspaces
            .get_mut(self.keyspace.as_str())
            .and_then(|tables| tables.get_mut(table))
            .ok_or_else(|| {
                Error::query(
                    operation,
                    format!("table {}.{} does not exist", self.keyspace, table),
                )
            })?;

        self.driver.store.statements.lock().push(Statement {
            kind,
            keyspace: self.keyspace.to_string(),
            table: table.to_string(),
            key: key.to_string(),
            consistency: options.consistency_or_default(),
        });
        Ok(op(rows))
    }
}

#[async_trait]
impl Session for MemorySession {
    fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    async fn has_table(&self, table: &str) -> Result<bool> {
        Ok(self
            .driver
            .store
            .keyspaces
            .read()
            .get(self.keyspace.as_str())
            .is_some_and(|tables| tables.contains_key(table)))
    }

    async fn fetch(&self, table: &str, key: &str, options: StatementOptions) -> Result<Option<Row>> {
        self.execute(StatementKind::Fetch, table, key, options, |rows| {
            rows.get(key).cloned()
        })
    }

    async fn upsert(&self, table: &str, key: &str, row: Row, options: StatementOptions) -> Result<()> {
        self.execute(StatementKind::Upsert, table, key, options, |rows| {
            rows.insert(key.to_string(), row);
        })
    }

    async fn remove(&self, table: &str, key: &str, options: StatementOptions) -> Result<bool> {
        self.execute(StatementKind::Remove, table, key, options, |rows| {
            rows.remove(key).is_some()
        })
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.driver.store.session_closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mage_core::{ClusterName, ContactPoints, Port};
    use serde_json::json;

    fn spec(points: &str) -> ClusterSpec {
        ClusterSpec::new(
            ClusterName::new("mage_staging_cluster").unwrap(),
            ContactPoints::new(points).unwrap(),
            Port::new(9042).unwrap(),
        )
    }

    fn row(value: serde_json::Value) -> Row {
        match value {
            serde_json::Value::Object(row) => row,
            other => panic!("not an object: {other}"),
        }
    }

    #[tokio::test]
    async fn test_connect_requires_existing_keyspace() {
        let driver = MemoryDriver::new();
        driver.create_keyspace("mage_system");
        let cluster = driver.build_cluster(&spec("127.0.0.1")).await.unwrap();

        assert!(cluster.connect(&Keyspace::new("mage_system").unwrap()).await.is_ok());
        let err = cluster
            .connect(&Keyspace::new("unknown_keyspace").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::KeyspaceUnavailable { .. }));
        assert_eq!(driver.counters().connects, 2);
        assert_eq!(driver.connects_to("unknown_keyspace"), 1);
    }

    #[tokio::test]
    async fn test_unreachable_only_when_every_host_is_down() {
        let driver = MemoryDriver::new();
        driver.set_unreachable("127.0.0.1");

        assert!(driver.build_cluster(&spec("127.0.0.1,127.0.0.2")).await.is_ok());
        let err = driver.build_cluster(&spec("127.0.0.1")).await.unwrap_err();
        assert!(matches!(err, Error::Connectivity { .. }));

        driver.set_reachable("127.0.0.1");
        assert!(driver.build_cluster(&spec("127.0.0.1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_rows_round_trip_through_a_session() {
        let driver = MemoryDriver::new();
        driver.create_table("mage_test", "samples");
        let cluster = driver.build_cluster(&spec("127.0.0.1")).await.unwrap();
        let session = cluster.connect(&Keyspace::new("mage_test").unwrap()).await.unwrap();
        let one = StatementOptions::default().with_consistency(ConsistencyLevel::One);

        let stored = row(json!({"identifier": "a", "content": "hello"}));
        session.upsert("samples", "a", stored.clone(), one).await.unwrap();

        assert_eq!(session.fetch("samples", "a", one).await.unwrap(), Some(stored));
        assert!(session.remove("samples", "a", one).await.unwrap());
        assert!(!session.remove("samples", "a", one).await.unwrap());
        assert_eq!(session.fetch("samples", "a", one).await.unwrap(), None);

        let statements = driver.statements();
        assert_eq!(statements.len(), 5);
        assert!(statements.iter().all(|s| s.consistency == ConsistencyLevel::One));
    }

    #[tokio::test]
    async fn test_missing_table_is_a_query_error() {
        let driver = MemoryDriver::new();
        driver.create_keyspace("mage_test");
        let cluster = driver.build_cluster(&spec("127.0.0.1")).await.unwrap();
        let session = cluster.connect(&Keyspace::new("mage_test").unwrap()).await.unwrap();

        assert!(!session.has_table("samples").await.unwrap());
        let err = session
            .fetch("samples", "a", StatementOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Query { .. }));
    }

    #[tokio::test]
    async fn test_close_is_counted_once() {
        let driver = MemoryDriver::new();
        driver.create_keyspace("mage_test");
        let cluster = driver.build_cluster(&spec("127.0.0.1")).await.unwrap();
        let session = cluster.connect(&Keyspace::new("mage_test").unwrap()).await.unwrap();

        session.close().await;
        session.close().await;
        cluster.close().await;
        cluster.close().await;

        assert_eq!(driver.counters().session_closes, 1);
        assert_eq!(driver.counters().cluster_closes, 1);
        assert!(cluster
            .connect(&Keyspace::new("mage_test").unwrap())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_add_tenant_writes_registry_row() {
        let driver = MemoryDriver::new();
        let record: TenantRecord = serde_json::from_value(json!({
            "identifier": "test",
            "cluster_name": "mage_staging_cluster",
            "contact_points": "127.0.0.1,127.0.0.2,127.0.0.3",
            "keyspace_name": "mage_test",
        }))
        .unwrap();

        driver.add_tenant("mage_system", &record).unwrap();

        let stored = driver.row("mage_system", TENANTS_TABLE, "test").unwrap();
        assert_eq!(stored["keyspace_name"], "mage_test");
        let cluster = driver.build_cluster(&spec("127.0.0.1")).await.unwrap();
        assert!(cluster.connect(&Keyspace::new("mage_test").unwrap()).await.is_ok());
    }
}
