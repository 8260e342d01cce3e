//! The fixed A3-landscape 2x2 view-cell grid. No dynamic relayout: every
//! cell's bounds are compile-time constants.

use crate::geometry::BBox;
use serde::{Deserialize, Serialize};

pub const PAGE_WIDTH_MM: f64 = 420.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;
pub const TITLE_BLOCK_HEIGHT_MM: f64 = 35.0;
pub const DRAWABLE_HEIGHT_MM: f64 = PAGE_HEIGHT_MM - TITLE_BLOCK_HEIGHT_MM;
pub const CELL_WIDTH_MM: f64 = PAGE_WIDTH_MM / 2.0;
pub const CELL_HEIGHT_MM: f64 = DRAWABLE_HEIGHT_MM / 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Top,
    Front,
    Right,
    Iso,
}

impl View {
    pub fn name(self) -> &'static str {
        match self {
            View::Top => "top",
            View::Front => "front",
            View::Right => "right",
            View::Iso => "iso",
        }
    }

    pub fn from_name(s: &str) -> Option<View> {
        match s {
            "top" => Some(View::Top),
            "front" => Some(View::Front),
            "right" => Some(View::Right),
            "iso" => Some(View::Iso),
            _ => None,
        }
    }

    pub fn all() -> [View; 4] {
        [View::Top, View::Front, View::Right, View::Iso]
    }

    /// Fixed page cell this view occupies: top-left=top, top-right=iso,
    /// bottom-left=front, bottom-right=right.
    pub fn cell(self) -> BBox {
        match self {
            View::Top => BBox::new(0.0, 0.0, CELL_WIDTH_MM, CELL_HEIGHT_MM),
            View::Iso => BBox::new(CELL_WIDTH_MM, 0.0, PAGE_WIDTH_MM, CELL_HEIGHT_MM),
            View::Front => BBox::new(0.0, CELL_HEIGHT_MM, CELL_WIDTH_MM, DRAWABLE_HEIGHT_MM),
            View::Right => BBox::new(CELL_WIDTH_MM, CELL_HEIGHT_MM, PAGE_WIDTH_MM, DRAWABLE_HEIGHT_MM),
        }
    }

    pub fn center(self) -> (f64, f64) {
        self.cell().center()
    }
}

/// Find the view whose cell contains a page-space point, if any.
pub fn view_at_point(x: f64, y: f64) -> Option<View> {
    View::all().into_iter().find(|v| v.cell().contains_point(x, y))
}

pub fn title_block_zone() -> BBox {
    BBox::new(0.0, DRAWABLE_HEIGHT_MM, PAGE_WIDTH_MM, PAGE_HEIGHT_MM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_tile_the_page_without_gaps() {
        assert_eq!(View::Top.cell().x_max, View::Iso.cell().x_min);
        assert_eq!(View::Front.cell().y_min, View::Top.cell().y_max);
        assert_eq!(View::Iso.cell().x_max, PAGE_WIDTH_MM);
        assert_eq!(View::Right.cell().y_max, DRAWABLE_HEIGHT_MM);
    }

    #[test]
    fn view_at_point_resolves_quadrants() {
        assert_eq!(view_at_point(10.0, 10.0), Some(View::Top));
        assert_eq!(view_at_point(300.0, 10.0), Some(View::Iso));
        assert_eq!(view_at_point(10.0, 200.0), Some(View::Front));
        assert_eq!(view_at_point(300.0, 200.0), Some(View::Right));
    }
}
