use thiserror::Error;

#[derive(Debug, Error)]
pub enum DfmError {
    #[error("unknown manufacturing process '{0}'")]
    UnknownProcess(String),

    #[error(transparent)]
    Core(#[from] dg_core::Error),
}

pub type Result<T> = std::result::Result<T, DfmError>;
