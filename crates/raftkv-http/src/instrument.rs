//! Latency and error recording around the key-access handler.

use std::time::Instant;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use raftkv_metrics::HttpMetrics;

use crate::router::endpoints;

/// Per-request recorder for the key endpoint.
///
/// The latency observation is made when the recorder is dropped, so it is
/// recorded on every exit path. The first status passed to [`fail`] becomes
/// the response status; later failures are still counted but do not change
/// what the client sees.
///
/// [`fail`]: Instrumented::fail
pub struct Instrumented<'a> {
    metrics: &'a HttpMetrics,
    method: Method,
    started: Instant,
    status: Option<StatusCode>,
}

impl<'a> Instrumented<'a> {
    pub fn start(metrics: &'a HttpMetrics, method: Method) -> Self {
        Self {
            metrics,
            method,
            started: Instant::now(),
            status: None,
        }
    }

    /// Count an error with `status` and latch it as the response status if
    /// none is set yet.
    pub fn fail(&mut self, status: StatusCode) {
        self.metrics
            .inc_error(endpoints::KEY, self.method.as_str(), status.as_u16());
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    /// Status the response will carry.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Finish with an empty body.
    pub fn respond(self) -> Response {
        self.status().into_response()
    }

    /// Finish with `body`, keeping the latched status.
    pub fn respond_with(self, body: impl IntoResponse) -> Response {
        (self.status(), body).into_response()
    }
}

impl Drop for Instrumented<'_> {
    fn drop(&mut self) {
        let nanos = self.started.elapsed().as_nanos() as f64;
        self.metrics
            .observe_latency(endpoints::KEY, self.method.as_str(), nanos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_recorded_on_drop() {
        let metrics = HttpMetrics::new().unwrap();
        {
            let _rec = Instrumented::start(&metrics, Method::GET);
            assert_eq!(metrics.request_count("/key", "GET"), 0);
        }
        assert_eq!(metrics.request_count("/key", "GET"), 1);
    }

    #[test]
    fn first_failure_wins() {
        let metrics = HttpMetrics::new().unwrap();
        let mut rec = Instrumented::start(&metrics, Method::GET);
        rec.fail(StatusCode::BAD_REQUEST);
        rec.fail(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rec.status(), StatusCode::BAD_REQUEST);

        let response = rec.respond();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(metrics.error_count("/key", "GET", 400), 1);
        assert_eq!(metrics.error_count("/key", "GET", 500), 1);
        assert_eq!(metrics.request_count("/key", "GET"), 1);
    }

    #[test]
    fn success_records_no_error() {
        let metrics = HttpMetrics::new().unwrap();
        let rec = Instrumented::start(&metrics, Method::DELETE);
        assert_eq!(rec.respond_with("done").status(), StatusCode::OK);
        assert_eq!(metrics.error_count("/key", "DELETE", 200), 0);
        assert_eq!(metrics.request_count("/key", "DELETE"), 1);
    }

    #[test]
    fn extension_methods_use_their_name() {
        let metrics = HttpMetrics::new().unwrap();
        let method = Method::from_bytes(b"PURGE").unwrap();
        let mut rec = Instrumented::start(&metrics, method);
        rec.fail(StatusCode::METHOD_NOT_ALLOWED);
        drop(rec);
        assert_eq!(metrics.error_count("/key", "PURGE", 405), 1);
        assert_eq!(metrics.request_count("/key", "PURGE"), 1);
    }
}
