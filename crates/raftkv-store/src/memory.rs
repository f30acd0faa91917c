use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::traits::Store;

/// In-memory, single-node implementation of [`Store`].
///
/// The node is always its own leader, so every write is applied immediately.
/// Joined peers are only recorded; nothing is replicated to them. Data is lost
/// when the store is dropped.
pub struct InMemoryStore {
    node_id: String,
    addr: String,
    data: RwLock<HashMap<String, String>>,
    peers: RwLock<BTreeMap<String, String>>,
}

impl InMemoryStore {
    /// Create an empty store for the node `node_id` reachable at `addr`.
    pub fn new(node_id: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            addr: addr.into(),
            data: RwLock::new(HashMap::new()),
            peers: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or_default()
    }

    /// Returns `true` if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Joined peers as `(node_id, addr)`, sorted by node id.
    pub fn peers(&self) -> Vec<(String, String)> {
        self.peers
            .read()
            .map(|p| p.iter().map(|(id, addr)| (id.clone(), addr.clone())).collect())
            .unwrap_or_default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get(&self, key: &str) -> StoreResult<String> {
        let data = self.data.read().map_err(poisoned)?;
        // Absent keys read as the empty string, the same as a Raft FSM lookup.
        Ok(data.get(key).cloned().unwrap_or_default())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut data = self.data.write().map_err(poisoned)?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut data = self.data.write().map_err(poisoned)?;
        data.remove(key);
        Ok(())
    }

    async fn join(&self, node_id: &str, addr: &str) -> StoreResult<()> {
        let mut peers = self.peers.write().map_err(poisoned)?;

        if node_id == self.node_id || addr == self.addr {
            if node_id == self.node_id && addr == self.addr {
                debug!(node_id, addr, "node is already the leader, ignoring join");
                return Ok(());
            }
            return Err(StoreError::Membership(format!(
                "{node_id} at {addr} conflicts with local node {} at {}",
                self.node_id, self.addr
            )));
        }

        for (existing_id, existing_addr) in peers.iter() {
            if existing_id == node_id && existing_addr == addr {
                debug!(node_id, addr, "node already member of cluster, ignoring join");
                return Ok(());
            }
            if existing_id == node_id || existing_addr == addr {
                return Err(StoreError::Membership(format!(
                    "{node_id} at {addr} conflicts with member {existing_id} at {existing_addr}"
                )));
            }
        }

        peers.insert(node_id.to_string(), addr.to_string());
        info!(node_id, addr, "node joined");
        Ok(())
    }

    async fn status(&self) -> String {
        let keys = self.len();
        let peers: BTreeMap<String, String> = self.peers().into_iter().collect();
        json!({
            "node_id": self.node_id,
            "addr": self.addr,
            "leader": self.addr,
            "peers": peers,
            "keys": keys,
        })
        .to_string()
    }
}

impl std::fmt::Debug for InMemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("node_id", &self.node_id)
            .field("addr", &self.addr)
            .field("key_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryStore {
        InMemoryStore::new("node0", "127.0.0.1:12000")
    }

    // -----------------------------------------------------------------------
    // Key-value operations
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn set_then_get() {
        let s = store();
        s.set("k", "v").await.unwrap();
        assert_eq!(s.get("k").await.unwrap(), "v");
        assert_eq!(s.len(), 1);
    }

    #[tokio::test]
    async fn missing_key_reads_empty() {
        let s = store();
        assert_eq!(s.get("nope").await.unwrap(), "");
        assert_eq!(s.get("").await.unwrap(), "");
    }

    #[tokio::test]
    async fn set_overwrites() {
        let s = store();
        s.set("k", "a").await.unwrap();
        s.set("k", "b").await.unwrap();
        assert_eq!(s.get("k").await.unwrap(), "b");
        assert_eq!(s.len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_and_is_idempotent() {
        let s = store();
        s.set("k", "v").await.unwrap();
        s.delete("k").await.unwrap();
        assert!(s.is_empty());
        s.delete("k").await.unwrap();
        assert_eq!(s.get("k").await.unwrap(), "");
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn join_records_peer() {
        let s = store();
        s.join("node1", "127.0.0.1:12001").await.unwrap();
        s.join("node2", "127.0.0.1:12002").await.unwrap();
        assert_eq!(
            s.peers(),
            vec![
                ("node1".to_string(), "127.0.0.1:12001".to_string()),
                ("node2".to_string(), "127.0.0.1:12002".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn rejoin_same_identity_is_noop() {
        let s = store();
        s.join("node1", "127.0.0.1:12001").await.unwrap();
        s.join("node1", "127.0.0.1:12001").await.unwrap();
        assert_eq!(s.peers().len(), 1);
    }

    #[tokio::test]
    async fn join_self_is_noop() {
        let s = store();
        s.join("node0", "127.0.0.1:12000").await.unwrap();
        assert!(s.peers().is_empty());
    }

    #[tokio::test]
    async fn join_conflicting_addr_rejected() {
        let s = store();
        s.join("node1", "127.0.0.1:12001").await.unwrap();
        let err = s.join("node9", "127.0.0.1:12001").await.unwrap_err();
        assert!(matches!(err, StoreError::Membership(_)));
        let err = s.join("node1", "127.0.0.1:19999").await.unwrap_err();
        assert!(matches!(err, StoreError::Membership(_)));
        let err = s.join("other", "127.0.0.1:12000").await.unwrap_err();
        assert!(matches!(err, StoreError::Membership(_)));
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn status_describes_node() {
        let s = store();
        s.set("a", "1").await.unwrap();
        s.join("node1", "127.0.0.1:12001").await.unwrap();

        let status: serde_json::Value = serde_json::from_str(&s.status().await).unwrap();
        assert_eq!(status["node_id"], "node0");
        assert_eq!(status["leader"], "127.0.0.1:12000");
        assert_eq!(status["keys"], 1);
        assert_eq!(status["peers"]["node1"], "127.0.0.1:12001");
    }

    #[tokio::test]
    async fn concurrent_writes() {
        let s = std::sync::Arc::new(store());
        let mut handles = Vec::new();
        for i in 0..16 {
            let s = s.clone();
            handles.push(tokio::spawn(async move {
                s.set(&format!("k{i}"), &format!("v{i}")).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(s.len(), 16);
    }

    #[test]
    fn debug_format() {
        let s = store();
        let dbg = format!("{s:?}");
        assert!(dbg.contains("InMemoryStore"));
        assert!(dbg.contains("node0"));
    }
}
