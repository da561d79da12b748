//! Cluster handle cache

use crate::once_map::{Init, OnceMap};
use crate::stats::StatsSnapshot;
use mage_core::{Cluster, ClusterDriver, ClusterName, ClusterSpec, ContactPoints, Error, Port, Result};
use std::sync::Arc;

/// Maps a cluster name to exactly one lazily-built cluster handle.
///
/// The first caller for a name decides the handle's contact points and port.
/// Later callers get that handle back even when they pass different
/// parameters; the mismatch is logged but not rejected.
pub struct ClusterConnectionCache {
    driver: Arc<dyn ClusterDriver>,
    clusters: OnceMap<ClusterName, Arc<dyn Cluster>>,
}

impl ClusterConnectionCache {
    pub fn new(driver: Arc<dyn ClusterDriver>) -> Self {
        Self {
            driver,
            clusters: OnceMap::new(),
        }
    }

    /// Return the handle for `name`, building it on first use.
    ///
    /// A handle whose construction overlapped [`Self::close_all`] is closed
    /// and built again, so no handle outlives the cache that built it.
    pub async fn get_or_create(
        &self,
        name: &ClusterName,
        contact_points: &ContactPoints,
        port: Port,
    ) -> Result<Arc<dyn Cluster>> {
        let cluster = loop {
            let built = self
                .clusters
                .try_init(name, || async {
                    tracing::info!(
                        cluster = %name,
                        contact_points = %contact_points,
                        port = %port,
                        "building cluster handle"
                    );
                    let spec = ClusterSpec::new(name.clone(), contact_points.clone(), port);
                    self.driver.build_cluster(&spec).await.map_err(|e| match e {
                        Error::Connectivity { .. } => e,
                        other => Error::connectivity_with_source(
                            name.as_str(),
                            "cluster construction failed",
                            other,
                        ),
                    })
                })
                .await
                .inspect_err(|e| tracing::warn!(cluster = %name, error = %e, "cluster handle unavailable"))?;

            match built {
                Init::Stored(cluster) => break cluster,
                Init::Orphaned(cluster) => {
                    tracing::warn!(cluster = %name, "cluster handle built during shutdown, closing it");
                    cluster.close().await;
                }
            }
        };

        let spec = cluster.spec();
        if spec.contact_points != *contact_points || spec.port != port {
            tracing::warn!(
                cluster = %name,
                cached_contact_points = %spec.contact_points,
                cached_port = %spec.port,
                requested_contact_points = %contact_points,
                requested_port = %port,
                "cluster already built with different parameters, keeping the first"
            );
        }

        Ok(cluster)
    }

    /// The handle for `name`, if one was built
    pub fn get(&self, name: &ClusterName) -> Option<Arc<dyn Cluster>> {
        self.clusters.get(name)
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.clusters.stats().snapshot()
    }

    /// Close every cached handle and empty the cache.
    ///
    /// Sessions must be closed first; see `SessionCache::close_all`.
    pub async fn close_all(&self) -> usize {
        let clusters = self.clusters.drain();
        for (name, cluster) in &clusters {
            tracing::debug!(cluster = %name, "closing cluster handle");
            cluster.close().await;
        }
        clusters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mage_testing::MemoryDriver;

    fn cache(driver: &MemoryDriver) -> ClusterConnectionCache {
        ClusterConnectionCache::new(Arc::new(driver.clone()))
    }

    fn name(value: &str) -> ClusterName {
        ClusterName::new(value).unwrap()
    }

    fn points(value: &str) -> ContactPoints {
        ContactPoints::new(value).unwrap()
    }

    fn port(value: u16) -> Port {
        Port::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_same_name_returns_same_handle() {
        let driver = MemoryDriver::new();
        let clusters = cache(&driver);

        let first = clusters
            .get_or_create(&name("mage_staging_cluster"), &points("127.0.0.1"), port(9042))
            .await
            .unwrap();
        let second = clusters
            .get_or_create(&name("mage_staging_cluster"), &points("127.0.0.1"), port(9042))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(driver.counters().cluster_builds, 1);
        assert_eq!(clusters.len(), 1);
    }

    #[tokio::test]
    async fn test_first_writer_wins_on_parameter_mismatch() {
        let driver = MemoryDriver::new();
        let clusters = cache(&driver);

        let first = clusters
            .get_or_create(&name("mage_staging_cluster"), &points("127.0.0.1"), port(9042))
            .await
            .unwrap();
        let second = clusters
            .get_or_create(&name("mage_staging_cluster"), &points("10.0.0.9, 10.0.0.10"), port(9142))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.spec().contact_points.hosts(), ["127.0.0.1"]);
        assert_eq!(second.spec().port.get(), 9042);
        assert_eq!(driver.counters().cluster_builds, 1);
    }

    #[tokio::test]
    async fn test_distinct_names_get_distinct_handles() {
        let driver = MemoryDriver::new();
        let clusters = cache(&driver);

        let a = clusters
            .get_or_create(&name("a"), &points("127.0.0.1"), port(9042))
            .await
            .unwrap();
        let b = clusters
            .get_or_create(&name("b"), &points("127.0.0.1"), port(9042))
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(driver.counters().cluster_builds, 2);
    }

    #[tokio::test]
    async fn test_failed_build_is_not_cached() {
        let driver = MemoryDriver::new();
        driver.set_unreachable("127.1.1.1");
        let clusters = cache(&driver);

        let err = clusters
            .get_or_create(&name("mage_staging_cluster"), &points("127.1.1.1"), port(9042))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connectivity { .. }));
        assert!(clusters.is_empty());

        clusters
            .get_or_create(&name("mage_staging_cluster"), &points("127.0.0.1"), port(9042))
            .await
            .unwrap();
        assert_eq!(clusters.len(), 1);
    }

    #[tokio::test]
    async fn test_close_all_closes_and_clears() {
        let driver = MemoryDriver::new();
        let clusters = cache(&driver);
        let handle = clusters
            .get_or_create(&name("a"), &points("127.0.0.1"), port(9042))
            .await
            .unwrap();

        assert_eq!(clusters.close_all().await, 1);
        assert!(handle.is_closed());
        assert!(clusters.is_empty());
        assert_eq!(clusters.close_all().await, 0);
        assert_eq!(driver.counters().cluster_closes, 1);
    }
}
