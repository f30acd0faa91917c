/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A join request conflicts with the current membership.
    #[error("membership conflict: {0}")]
    Membership(String),

    /// The store cannot serve the request right now (lost leadership,
    /// poisoned state, backend down).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
