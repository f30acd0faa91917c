use async_trait::async_trait;

use crate::error::StoreResult;

/// Key-value store backed by a consensus mechanism.
///
/// All implementations must satisfy these invariants:
/// - Safe for concurrent calls from many request handlers.
/// - `set` and `delete` are durable once they return `Ok`, to whatever degree
///   the backend defines durability.
/// - `status` never fails; a backend that cannot describe itself returns a
///   best-effort string.
#[async_trait]
pub trait Store: Send + Sync {
    /// Return the value for `key`.
    async fn get(&self, key: &str) -> StoreResult<String>;

    /// Set the value for `key`, via distributed consensus.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove `key`, via distributed consensus.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Admit the node identified by `node_id`, reachable at `addr`, to the
    /// cluster.
    async fn join(&self, node_id: &str, addr: &str) -> StoreResult<()>;

    /// Human-readable consensus status.
    async fn status(&self) -> String;
}
