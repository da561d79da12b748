//! Keyspace-bound session cache

use crate::cluster::ClusterConnectionCache;
use crate::once_map::{Init, OnceMap};
use crate::stats::StatsSnapshot;
use mage_core::{ClusterName, ContactPoints, Error, Keyspace, Port, Result, Session};
use std::sync::Arc;

/// Maps a keyspace name to at most one live session.
///
/// A session stays bound to the cluster handle it was opened through, even if
/// a later caller names another cluster for the same keyspace.
pub struct SessionCache {
    clusters: Arc<ClusterConnectionCache>,
    sessions: OnceMap<Keyspace, Arc<dyn Session>>,
}

impl SessionCache {
    pub fn new(clusters: Arc<ClusterConnectionCache>) -> Self {
        Self {
            clusters,
            sessions: OnceMap::new(),
        }
    }

    /// Return the session for `keyspace`, connecting it on first use.
    ///
    /// Waiters on a failed connect all receive the same
    /// [`Error::KeyspaceUnavailable`]; nothing is cached for them. A session
    /// connected while [`Self::close_all`] ran is closed and connected again.
    pub async fn get_or_create(
        &self,
        cluster_name: &ClusterName,
        contact_points: &ContactPoints,
        port: Port,
        keyspace: &Keyspace,
    ) -> Result<Arc<dyn Session>> {
        if let Some(session) = self.sessions.get(keyspace) {
            tracing::trace!(keyspace = %keyspace, "session cache hit");
            return Ok(session);
        }

        loop {
            let connected = self
                .sessions
                .try_init(keyspace, || async {
                    let cluster = self
                        .clusters
                        .get_or_create(cluster_name, contact_points, port)
                        .await?;

                    tracing::info!(cluster = %cluster_name, keyspace = %keyspace, "connecting session");
                    cluster.connect(keyspace).await.map_err(|e| match e {
                        Error::KeyspaceUnavailable { .. } => e,
                        other => Error::keyspace_unavailable_with_source(
                            keyspace.as_str(),
                            "session connect failed",
                            other,
                        ),
                    })
                })
                .await
                .inspect_err(|e| tracing::warn!(keyspace = %keyspace, error = %e, "session unavailable"))?;

            match connected {
                Init::Stored(session) => return Ok(session),
                Init::Orphaned(session) => {
                    tracing::warn!(keyspace = %keyspace, "session connected during shutdown, closing it");
                    session.close().await;
                }
            }
        }
    }

    /// The session for `keyspace`, if one is connected
    pub fn get(&self, keyspace: &Keyspace) -> Option<Arc<dyn Session>> {
        self.sessions.get(keyspace)
    }

    pub fn clusters(&self) -> &Arc<ClusterConnectionCache> {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.sessions.stats().snapshot()
    }

    /// Close every cached session and empty the cache
    pub async fn close_all(&self) -> usize {
        let sessions = self.sessions.drain();
        for (keyspace, session) in &sessions {
            tracing::debug!(keyspace = %keyspace, "closing session");
            session.close().await;
        }
        sessions.len()
    }
}
