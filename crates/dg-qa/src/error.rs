use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaError {
    #[error("unknown stroke profile '{0}'")]
    UnknownProfile(String),

    #[error(transparent)]
    Core(#[from] dg_core::Error),
}

pub type Result<T> = std::result::Result<T, QaError>;
