pub mod baseline;
pub mod chain;
pub mod common;
pub mod error;
pub mod plan;

pub use baseline::{render_baseline_dimensions, render_ordinate_dimensions, select_dimension_strategy, Axis, BaselineFeature};
pub use chain::{render_chain_dimensions, ChainTolerances, Stacks};
pub use common::{Arc, AutoDimRecord, Circle, ConflictRecord, DedupeState, DimStyleConfig, DimensionTelemetry, PlanDimRecord, ViewTransform};
pub use error::{DimensionError, Result};
pub use plan::render_plan_dimensions;
