use thiserror::Error;

#[derive(Debug, Error)]
pub enum DimensionError {
    #[error("unknown placement side '{0}'")]
    UnknownSide(String),

    #[error(transparent)]
    Core(#[from] dg_core::Error),
}

pub type Result<T> = std::result::Result<T, DimensionError>;
