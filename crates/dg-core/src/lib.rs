pub mod config;
pub mod error;
pub mod geometry;
pub mod svg;
pub mod viewcell;

pub use config::{Config, ManufacturingConfig, NotesConfig, Operation, Shape, ShapeKind};
pub use error::Error;
pub use geometry::{BBox, Point2, Point3};
pub use svg::Node;
pub use viewcell::View;
