use std::net::SocketAddr;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use prometheus::{Registry, TEXT_FORMAT};
use tokio::net::TcpListener;

use crate::error::MetricsResult;
use crate::registry::encode_metrics;

/// Port the scrape endpoint binds when nothing else is configured.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9100";

/// Router serving `registry` at `GET /metrics`.
pub fn metrics_router(registry: Registry) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry)
}

async fn metrics_handler(State(registry): State<Registry>) -> Response {
    match encode_metrics(&registry) {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Bind the scrape listener. Callers that must fail fast on a taken port bind
/// first and hand the listener to [`serve_listener`].
pub async fn bind(addr: SocketAddr) -> MetricsResult<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("metrics exposed on {}", listener.local_addr()?);
    Ok(listener)
}

/// Serve `registry` on an already bound listener until the task is dropped.
pub async fn serve_listener(listener: TcpListener, registry: Registry) -> MetricsResult<()> {
    axum::serve(listener, metrics_router(registry)).await?;
    Ok(())
}

/// Bind `addr` and serve `registry` until the task is dropped.
pub async fn serve(addr: SocketAddr, registry: Registry) -> MetricsResult<()> {
    serve_listener(bind(addr).await?, registry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HttpMetrics, MetricsError};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn metrics_endpoint_renders_registry() {
        let registry = Registry::new();
        let m = HttpMetrics::new().unwrap();
        m.register(&registry).unwrap();
        m.observe_latency("/key", "GET", 42.0);

        let response = metrics_router(registry)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()[header::CONTENT_TYPE], TEXT_FORMAT);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("http_requests_count{endpoint=\"/key\",method=\"GET\"} 1"));
    }

    #[tokio::test]
    async fn other_paths_not_found() {
        let response = metrics_router(Registry::new())
            .oneshot(Request::builder().uri("/key").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn bind_taken_port_is_io_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let err = bind(addr).await.unwrap_err();
        assert!(matches!(err, MetricsError::Io(_)));
        let err = serve(addr, Registry::new()).await.unwrap_err();
        assert!(matches!(err, MetricsError::Io(_)));
    }

    #[tokio::test]
    async fn serve_listener_answers_scrapes() {
        let registry = Registry::new();
        let m = HttpMetrics::new().unwrap();
        m.register(&registry).unwrap();
        m.inc_error("/key", "DELETE", 500);

        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(serve_listener(listener, registry));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        assert!(reply.starts_with("HTTP/1.1 200"));
        assert!(reply.contains("http_request_errors{endpoint=\"/key\",method=\"DELETE\",status=\"500\"} 1"));

        task.abort();
    }

    #[test]
    fn default_addr_parses() {
        let addr: SocketAddr = DEFAULT_METRICS_ADDR.parse().unwrap();
        assert_eq!(addr.port(), 9100);
    }
}
