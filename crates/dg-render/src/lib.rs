//! View and annotation composer: renders per-view edge geometry, center
//! marks and symmetry axes, GD&T frames, surface-finish symbols,
//! general notes, the revision table, and the title block/BOM.

pub mod error;
pub mod gdt;
pub mod notes;
pub mod revision;
pub mod surface_finish;
pub mod titleblock;
pub mod view;

pub use error::{RenderError, Result};
pub use gdt::{assign_tolerances, render_fcf, select_datums, Axis3, Datum, DatumKind, GdtAssignment, GdtKind, Modifier};
pub use notes::{build_category_notes, render_general_notes};
pub use revision::{newest_first, render_revision_table, RevisionEntry};
pub use surface_finish::{render_default_symbol, render_face_symbol};
pub use titleblock::{extract_bom, render as render_title_block, render_bom, BomRow};
pub use view::{auto_scale, projection_symbol, render_view, view_transform, ArcDef, Edge, ViewGeometry, HIDDEN_GROUPS, RENDER_ORDER};
