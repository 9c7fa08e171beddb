use thiserror::Error;

/// Result type local to joinadapt-adaptor.
pub type Result<T> = std::result::Result<T, AdaptError>;

#[derive(Debug, Error)]
pub enum AdaptError {
    /// Setup is wrong (unknown adaptor name, partial mapping). Fatal.
    #[error("adaptor configuration error: {0}")]
    Config(String),

    #[error("parameter sampling failed: {0}")]
    Param(String),

    #[error("statistics catalog query failed: {0}")]
    Catalog(String),

    /// A component was wired to the wrong kind of peer.
    #[error("type mismatch: {0}")]
    Mismatch(String),

    #[error(transparent)]
    Table(#[from] joinadapt_hashtable::Error),

    #[error(transparent)]
    Core(#[from] joinadapt_core::Error),
}

impl AdaptError {
    /// Errors caused by the runtime inputs of one decision. A caller can
    /// recover from these by falling back to the default strategy.
    pub fn is_input_error(&self) -> bool {
        matches!(self, AdaptError::Param(_) | AdaptError::Catalog(_))
    }
}
