pub mod error;
pub mod ks;
pub mod tolerance;

pub use error::StandardsError;
pub use tolerance::{get_fit, get_tolerance, recommend_fit, FitResult, FitType};
