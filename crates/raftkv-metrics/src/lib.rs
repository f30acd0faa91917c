//! Request metrics for the raftkv HTTP front door.
//!
//! Two metric families describe the key-access endpoint:
//!
//! - `http_requests` -- latency of every request, in nanoseconds, labelled by
//!   `endpoint` and `method`
//! - `http_request_errors` -- failed requests, labelled by `endpoint`,
//!   `method` and `status`
//!
//! [`HttpMetrics`] owns both families and can be registered into any
//! `prometheus::Registry`. The process-wide instance lives in the global
//! registry and is created once through [`init`]; [`serve`] exposes that
//! registry at `/metrics` on its own port.

pub mod collectors;
pub mod error;
pub mod registry;
pub mod server;

pub use collectors::HttpMetrics;
pub use error::{MetricsError, MetricsResult};
pub use registry::{encode_metrics, init, registry};
pub use server::{bind, metrics_router, serve, serve_listener, DEFAULT_METRICS_ADDR};
