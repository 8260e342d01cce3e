//! Title-block strip at the page bottom: part name, scale, bounding
//! box, and a BOM excerpt in assembly mode.

use dg_core::config::{Config, ShapeKind};
use dg_core::svg::Node;
use dg_core::BBox;

const STRIP_Y: f64 = 262.0;
const FONT_SIZE_MM: f64 = 2.6;
const BOM_ROW_HEIGHT_MM: f64 = 4.0;
const BOM_MAX_ROWS: usize = 4;

fn label(x: f64, y: f64, content: &str, size: f64) -> Node {
    Node::new("text")
        .with_attr("x", format!("{:.2}", x))
        .with_attr("y", format!("{:.2}", y))
        .with_attr("font-size", format!("{:.2}", size))
        .with_attr("fill", "#000")
        .with_text(content)
}

/// Render the fixed-height title strip: border, part name, scale,
/// bounding box, and the 3rd-angle projection symbol placeholder slot.
pub fn render(part_name: &str, scale: f64, bounds: &BBox) -> Node {
    let mut g = Node::new("g").with_attr("class", "title-block");
    g.push_child(
        Node::new("rect")
            .with_attr("x", "0")
            .with_attr("y", format!("{:.2}", STRIP_Y))
            .with_attr("width", "420")
            .with_attr("height", "35")
            .with_attr("fill", "none")
            .with_attr("stroke", "#000")
            .with_attr("stroke-width", "0.3"),
    );
    g.push_child(label(5.0, STRIP_Y + 8.0, &format!("PART: {}", part_name), FONT_SIZE_MM));
    g.push_child(label(5.0, STRIP_Y + 14.0, &format!("SCALE: {:.2}:1", scale), FONT_SIZE_MM));
    g.push_child(label(
        5.0,
        STRIP_Y + 20.0,
        &format!("BBOX: {:.1} x {:.1} mm", bounds.width(), bounds.height()),
        FONT_SIZE_MM,
    ));
    g
}

#[derive(Debug, Clone)]
pub struct BomRow {
    pub label: String,
    pub material: String,
    pub extent: Option<[f64; 3]>,
}

fn part_extent(shapes: &[dg_core::config::Shape]) -> Option<[f64; 3]> {
    match shapes.first()?.kind {
        ShapeKind::Box { size } => Some(size),
        _ => None,
    }
}

/// Extract BOM rows from the parts table. Only used in assembly mode;
/// single-part drawings have no BOM.
pub fn extract_bom(config: &Config) -> Vec<BomRow> {
    config
        .parts
        .iter()
        .map(|p| BomRow {
            label: p.label.clone(),
            material: p.material.clone().unwrap_or_else(|| "-".to_string()),
            extent: part_extent(&p.shapes),
        })
        .collect()
}

/// Render up to `BOM_MAX_ROWS` rows, with a "+N more" indicator for the
/// remainder.
pub fn render_bom(rows: &[BomRow], x: f64, y_top: f64) -> Node {
    let mut g = Node::new("g").with_attr("class", "bom");
    g.push_child(label(x, y_top, "ITEM  MATERIAL          SIZE", 2.0));
    let shown = rows.iter().take(BOM_MAX_ROWS);
    for (i, row) in shown.enumerate() {
        let y = y_top + (i as f64 + 1.0) * BOM_ROW_HEIGHT_MM;
        let size = row
            .extent
            .map(|[w, d, h]| format!("{:.1}x{:.1}x{:.1}", w, d, h))
            .unwrap_or_else(|| "-".to_string());
        g.push_child(label(x, y, &format!("{:<5} {:<16} {}", row.label, row.material, size), 2.0));
    }
    if rows.len() > BOM_MAX_ROWS {
        let y = y_top + (BOM_MAX_ROWS as f64 + 1.0) * BOM_ROW_HEIGHT_MM;
        g.push_child(label(x, y, &format!("+{} more", rows.len() - BOM_MAX_ROWS), 2.0));
    }
    g
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_part_name_and_scale() {
        let node = render("Bracket", 1.0, &BBox::new(0.0, 0.0, 50.0, 30.0));
        let mut found_name = false;
        let mut found_scale = false;
        node.walk(&mut |n| {
            if let Some(t) = &n.text {
                if t.contains("Bracket") {
                    found_name = true;
                }
                if t.contains("SCALE") {
                    found_scale = true;
                }
            }
        });
        assert!(found_name && found_scale);
    }

    #[test]
    fn bom_caps_at_four_rows_with_overflow_indicator() {
        let rows: Vec<BomRow> = (0..6)
            .map(|i| BomRow { label: format!("P{i}"), material: "Steel".to_string(), extent: None })
            .collect();
        let node = render_bom(&rows, 300.0, 265.0);
        let mut found_overflow = false;
        node.walk(&mut |n| {
            if n.text.as_deref().map(|t| t.contains("+2 more")).unwrap_or(false) {
                found_overflow = true;
            }
        });
        assert!(found_overflow);
    }

    #[test]
    fn bom_without_overflow_has_no_more_indicator() {
        let rows = vec![BomRow { label: "P0".to_string(), material: "Steel".to_string(), extent: Some([10.0, 20.0, 5.0]) }];
        let node = render_bom(&rows, 300.0, 265.0);
        let mut found_overflow = false;
        node.walk(&mut |n| {
            if n.text.as_deref().map(|t| t.contains("more")).unwrap_or(false) {
                found_overflow = true;
            }
        });
        assert!(!found_overflow);
    }
}
