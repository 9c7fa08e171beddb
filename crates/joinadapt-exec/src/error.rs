use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("adaptation error: {0}")]
    Adapt(#[from] joinadapt_adaptor::AdaptError),

    #[error("hash table error: {0}")]
    Table(#[from] joinadapt_hashtable::Error),

    #[error("core error: {0}")]
    Core(#[from] joinadapt_core::Error),

    #[error("execution error: {0}")]
    Exec(String),
}
