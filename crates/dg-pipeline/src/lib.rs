//! Orchestration driver: compiles a plan, composes the drawing, runs the
//! post-process/score/repair loop, and runs the DFM analyzer over the
//! same compiled plan. No stage here re-derives geometry or features;
//! it only sequences the crates that do.

pub mod document;
pub mod driver;
pub mod error;

pub use document::{assemble, DocumentOptions};
pub use driver::{run, PipelineOutcome, RepairLog, RunOptions};
pub use error::PipelineError;
