//! Metric families for the key-access endpoint.

use prometheus::{exponential_buckets, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

use crate::error::MetricsResult;

pub const REQUESTS_NAME: &str = "http_requests";
pub const REQUESTS_HELP: &str = "HTTP requests to the raftkv service";
pub const ERRORS_NAME: &str = "http_request_errors";
pub const ERRORS_HELP: &str = "Failed HTTP requests to the raftkv service";

/// Latency buckets in nanoseconds: 1us up to roughly 67s.
const LATENCY_START_NS: f64 = 1_000.0;
const LATENCY_FACTOR: f64 = 4.0;
const LATENCY_BUCKETS: usize = 14;

/// Latency distribution and error counter for HTTP requests.
///
/// Cloning is cheap: both families are reference-counted handles, so a clone
/// records into the same series.
#[derive(Clone)]
pub struct HttpMetrics {
    requests: HistogramVec,
    errors: IntCounterVec,
}

impl HttpMetrics {
    /// Build both families without registering them anywhere.
    pub fn new() -> MetricsResult<Self> {
        let requests = HistogramVec::new(
            HistogramOpts::new(REQUESTS_NAME, REQUESTS_HELP).buckets(exponential_buckets(
                LATENCY_START_NS,
                LATENCY_FACTOR,
                LATENCY_BUCKETS,
            )?),
            &["endpoint", "method"],
        )?;
        let errors = IntCounterVec::new(
            Opts::new(ERRORS_NAME, ERRORS_HELP),
            &["endpoint", "method", "status"],
        )?;
        Ok(Self { requests, errors })
    }

    /// Register both families into `registry`.
    ///
    /// Fails with `prometheus::Error::AlreadyReg` if a family with the same
    /// identity is already present.
    pub fn register(&self, registry: &Registry) -> MetricsResult<()> {
        registry.register(Box::new(self.requests.clone()))?;
        registry.register(Box::new(self.errors.clone()))?;
        Ok(())
    }

    /// Record one request latency in nanoseconds.
    pub fn observe_latency(&self, endpoint: &str, method: &str, nanos: f64) {
        self.requests
            .with_label_values(&[endpoint, method])
            .observe(nanos);
    }

    /// Count one failed request.
    pub fn inc_error(&self, endpoint: &str, method: &str, status: u16) {
        self.errors
            .with_label_values(&[endpoint, method, &status.to_string()])
            .inc();
    }

    /// Number of latency observations recorded for `(endpoint, method)`.
    pub fn request_count(&self, endpoint: &str, method: &str) -> u64 {
        self.requests
            .with_label_values(&[endpoint, method])
            .get_sample_count()
    }

    /// Number of errors recorded for `(endpoint, method, status)`.
    pub fn error_count(&self, endpoint: &str, method: &str, status: u16) -> u64 {
        self.errors
            .with_label_values(&[endpoint, method, &status.to_string()])
            .get()
    }
}

impl std::fmt::Debug for HttpMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetrics")
            .field("requests", &REQUESTS_NAME)
            .field("errors", &ERRORS_NAME)
            .finish()
    }
}
