//! HTTP front door for the raftkv store.
//!
//! Translates HTTP requests into [`Store`](raftkv_store::Store) operations:
//!
//! - `/key/<name>` -- GET, POST and DELETE of keys, instrumented with latency
//!   and error metrics
//! - `/join` -- admit a node to the cluster
//! - `/status` -- raw consensus status
//!
//! Every other path is a 404. Store failures surface only as a 500; no error
//! detail reaches the client.

pub mod config;
pub mod error;
pub mod handler;
pub mod instrument;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use router::{build_router, endpoints, key_from_path, Route};
pub use server::Service;
