use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("service already started on {0}")]
    AlreadyStarted(std::net::SocketAddr),

    #[error("metrics error: {0}")]
    Metrics(#[from] raftkv_metrics::MetricsError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;
