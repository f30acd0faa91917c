use std::net::SocketAddr;
use std::sync::Arc;

use raftkv_metrics::HttpMetrics;
use raftkv_store::Store;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::build_router;

/// HTTP service in front of a [`Store`].
///
/// [`start`](Service::start) binds the listener and serves in a background
/// task; every connection runs on its own tokio task. [`close`](Service::close)
/// releases the listener. Connections already accepted run to completion.
pub struct Service {
    addr: SocketAddr,
    state: AppState,
    local_addr: Option<SocketAddr>,
    task: Option<JoinHandle<()>>,
}

impl Service {
    /// Service recording into the process-wide metrics.
    pub fn new(addr: SocketAddr, store: Arc<dyn Store>) -> ServerResult<Self> {
        let metrics = raftkv_metrics::init()?.clone();
        Ok(Self::with_metrics(addr, store, metrics))
    }

    /// Service recording into `metrics`.
    pub fn with_metrics(addr: SocketAddr, store: Arc<dyn Store>, metrics: HttpMetrics) -> Self {
        Self {
            addr,
            state: AppState::new(store, metrics),
            local_addr: None,
            task: None,
        }
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    pub fn metrics(&self) -> &HttpMetrics {
        self.state.metrics()
    }

    /// Bind the listener and start serving without blocking the caller.
    pub async fn start(&mut self) -> ServerResult<()> {
        if let Some(addr) = self.local_addr {
            return Err(ServerError::AlreadyStarted(addr));
        }

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        let app = self.router();

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("HTTP serve on {} failed: {}", local_addr, e);
            }
        });

        tracing::info!("raftkv HTTP service listening on {}", local_addr);
        self.local_addr = Some(local_addr);
        self.task = Some(task);
        Ok(())
    }

    /// Address the listener is bound to, once started.
    pub fn addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Stop accepting connections and release the listener.
    pub async fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        if let Some(addr) = self.local_addr.take() {
            tracing::info!("raftkv HTTP service on {} closed", addr);
        }
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
