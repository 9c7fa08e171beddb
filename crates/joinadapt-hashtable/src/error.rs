use thiserror::Error;

/// Result type local to joinadapt-hashtable.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The table's own bookkeeping is broken (missing bucket, dangling arena
    /// address, poisoned lock). Not recoverable; the join must abort.
    #[error("hash table invariant violated: {0}")]
    Invariant(String),

    #[error("unsupported hash table operation: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Core(#[from] joinadapt_core::Error),
}
