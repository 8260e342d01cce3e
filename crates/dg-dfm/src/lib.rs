//! Design-for-manufacturability analyzer: process-aware checks (DFM-01..09)
//! over the raw config, driven by constraint tables keyed on manufacturing
//! process plus an optional shop tool profile.

pub mod checks;
pub mod error;

pub use checks::{run_checks, DfmCheck, DfmReport, DfmSummary, ProcessConstraints, Severity, ShopProfile};
pub use error::{DfmError, Result};
