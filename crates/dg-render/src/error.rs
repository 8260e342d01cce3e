use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown view name '{0}'")]
    UnknownView(String),

    #[error(transparent)]
    Standards(#[from] dg_standards::StandardsError),

    #[error(transparent)]
    Core(#[from] dg_core::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
