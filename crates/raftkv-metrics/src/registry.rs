//! Process-wide registry and the singleton [`HttpMetrics`] registered in it.

use once_cell::sync::{Lazy, OnceCell};
use prometheus::{Encoder, Registry, TextEncoder};

use crate::collectors::HttpMetrics;
use crate::error::{MetricsError, MetricsResult};

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static HTTP_METRICS: OnceCell<HttpMetrics> = OnceCell::new();

/// Return the global registry.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Create and register the process-wide [`HttpMetrics`].
///
/// The first call registers the families in the global registry; every later
/// call returns the same instance without registering again.
pub fn init() -> MetricsResult<&'static HttpMetrics> {
    HTTP_METRICS.get_or_try_init(|| {
        let metrics = HttpMetrics::new()?;
        metrics.register(&REGISTRY)?;
        tracing::debug!("http metrics registered");
        Ok(metrics)
    })
}

/// Encode every metric in `registry` into the Prometheus text exposition
/// format.
pub fn encode_metrics(registry: &Registry) -> MetricsResult<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| MetricsError::Encode(e.to_string()))
}
