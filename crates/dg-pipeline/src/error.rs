use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] dg_core::Error),

    #[error(transparent)]
    Model(#[from] dg_model::ModelError),

    #[error(transparent)]
    Render(#[from] dg_render::RenderError),

    #[error(transparent)]
    Dimension(#[from] dg_dimension::DimensionError),

    #[error(transparent)]
    Qa(#[from] dg_qa::QaError),

    #[error(transparent)]
    Dfm(#[from] dg_dfm::DfmError),

    #[error("geometry JSON parse error: {0}")]
    GeometryParse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no geometry supplied for required view '{0}'")]
    MissingViewGeometry(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
