use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    Core(#[from] dg_core::Error),

    #[error("unknown operation type encountered during feature inference: {0}")]
    UnknownOperation(String),

    #[error("template parse error: {0}")]
    TemplateParse(String),

    #[error("template not found for part type '{0}'")]
    TemplateNotFound(String),

    #[error("plan validation failed: {0}")]
    Validation(#[from] crate::validate::ValidationError),
}

pub type Result<T> = std::result::Result<T, ModelError>;
