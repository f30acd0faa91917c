//! Store capability for the raftkv key-value service.
//!
//! The HTTP front door never talks to the consensus engine directly. It holds
//! an `Arc<dyn Store>` and calls the five operations of the [`Store`] trait;
//! whatever sits behind it (a Raft state machine, a test double) owns
//! consistency, replication and membership bookkeeping.
//!
//! # Backends
//!
//! - [`InMemoryStore`] -- single-node `HashMap` store for tests and for
//!   running the daemon without a cluster
//!
//! # Contract
//!
//! 1. Implementations are `Send + Sync`; handlers call them concurrently.
//! 2. Errors are opaque to HTTP clients. The front door maps every
//!    [`StoreError`] to a 500 and never forwards the message.
//! 3. No call carries a deadline. A store that hangs holds its request.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use traits::Store;
