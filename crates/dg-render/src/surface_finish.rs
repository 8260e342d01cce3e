//! ISO 1302 surface-finish symbols: a 60°-vertex check mark plus a
//! horizontal bar, with value/method/lay/allowance text in fixed slots.

use dg_core::svg::Node;
use dg_layout::AnnotationPlanner;
use dg_standards::ks::format_surface_finish_full;
use dg_standards::StandardsError;

const SYMBOL_HEIGHT_MM: f64 = 5.0;
const BAR_LENGTH_MM: f64 = 8.0;
const FONT_SIZE_MM: f64 = 2.2;

/// Slot `a` sits above-left of the bar, `b` above-right, `c`/`d`/`e` stack
/// below the bar, left to right.
fn symbol_node(slots: &[(char, String); 5]) -> Node {
    let mut g = Node::new("g").with_attr("class", "surface-finish-symbol");
    let vx = SYMBOL_HEIGHT_MM * (60f64.to_radians() / 2.0).tan();
    g.push_child(
        Node::new("polyline")
            .with_attr("points", format!("0,0 {:.2},{:.2} {:.2},{:.2}", vx, -SYMBOL_HEIGHT_MM, BAR_LENGTH_MM, -SYMBOL_HEIGHT_MM))
            .with_attr("fill", "none")
            .with_attr("stroke", "#000")
            .with_attr("stroke-width", "0.25"),
    );
    g.push_child(
        Node::new("line")
            .with_attr("x1", format!("{:.2}", vx))
            .with_attr("y1", format!("{:.2}", -SYMBOL_HEIGHT_MM))
            .with_attr("x2", format!("{:.2}", BAR_LENGTH_MM))
            .with_attr("y2", format!("{:.2}", -SYMBOL_HEIGHT_MM))
            .with_attr("stroke", "#000")
            .with_attr("stroke-width", "0.25"),
    );

    let a = slots.iter().find(|(k, _)| *k == 'a').map(|(_, v)| v.as_str()).unwrap_or("");
    let c = slots.iter().find(|(k, _)| *k == 'c').map(|(_, v)| v.as_str()).unwrap_or("");
    let d = slots.iter().find(|(k, _)| *k == 'd').map(|(_, v)| v.as_str()).unwrap_or("");
    let e = slots.iter().find(|(k, _)| *k == 'e').map(|(_, v)| v.as_str()).unwrap_or("");

    g.push_child(text(vx + 0.5, -SYMBOL_HEIGHT_MM - 1.0, a));
    if !c.is_empty() {
        g.push_child(text(vx + 0.5, -SYMBOL_HEIGHT_MM + FONT_SIZE_MM + 0.5, c));
    }
    if !d.is_empty() {
        g.push_child(text(vx + 0.5, -SYMBOL_HEIGHT_MM + 2.0 * FONT_SIZE_MM + 0.5, d));
    }
    if !e.is_empty() {
        g.push_child(text(vx + 0.5, -SYMBOL_HEIGHT_MM + 3.0 * FONT_SIZE_MM + 0.5, e));
    }
    g
}

fn text(x: f64, y: f64, content: &str) -> Node {
    Node::new("text")
        .with_attr("x", format!("{:.2}", x))
        .with_attr("y", format!("{:.2}", y))
        .with_attr("font-size", format!("{:.2}", FONT_SIZE_MM))
        .with_attr("fill", "#000")
        .with_text(content)
}

/// The default/blanket surface-finish symbol placed above the title
/// block, at a fixed page position.
pub fn render_default_symbol(ra: f64, process: Option<&str>, x: f64, y: f64) -> Result<Node, StandardsError> {
    let slots = format_surface_finish_full(ra, process, None, None)?;
    let mut g = symbol_node(&slots);
    g.set_attr("transform", format!("translate({:.2},{:.2})", x, y));
    Ok(g)
}

const LEADER_CANDIDATE_OFFSETS: [(f64, f64); 4] = [(12.0, -8.0), (-12.0, -8.0), (12.0, 8.0), (-12.0, 8.0)];

/// A face-specific symbol attached to `(target_x, target_y)` by a leader
/// and arrow, placed at the first of four direction candidates that
/// doesn't overlap anything already registered with `planner`.
pub fn render_face_symbol(ra: f64, process: Option<&str>, lay: Option<&str>, allowance: Option<f64>, target_x: f64, target_y: f64, planner: &mut AnnotationPlanner) -> Result<Node, StandardsError> {
    let slots = format_surface_finish_full(ra, process, lay, allowance)?;
    let box_w = BAR_LENGTH_MM + 6.0;
    let box_h = SYMBOL_HEIGHT_MM + 3.0 * FONT_SIZE_MM + 2.0;

    let candidates: Vec<(f64, f64)> = LEADER_CANDIDATE_OFFSETS.iter().map(|&(dx, dy)| (target_x + dx, target_y + dy)).collect();
    let (sym_x, sym_y) = planner.register_and_pick(&candidates, box_w, box_h).map(|b| b.center()).unwrap_or((target_x + 12.0, target_y - 8.0));

    let mut g = Node::new("g").with_attr("class", "surface-finish");
    g.push_child(
        Node::new("line")
            .with_attr("x1", format!("{:.2}", target_x))
            .with_attr("y1", format!("{:.2}", target_y))
            .with_attr("x2", format!("{:.2}", sym_x))
            .with_attr("y2", format!("{:.2}", sym_y))
            .with_attr("stroke", "#000")
            .with_attr("stroke-width", "0.2"),
    );
    g.push_child(dg_core::svg::arrowhead(target_x, target_y, (target_y - sym_y).atan2(target_x - sym_x), "#000"));
    let mut sym = symbol_node(&slots);
    sym.set_attr("transform", format!("translate({:.2},{:.2})", sym_x, sym_y));
    g.push_child(sym);
    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::BBox;

    #[test]
    fn default_symbol_includes_ra_value_text() {
        let node = render_default_symbol(1.6, Some("milling"), 300.0, 280.0).unwrap();
        let mut found = false;
        node.walk(&mut |n| {
            if n.tag == "text" && n.text.as_deref().map(|t| t.contains("Ra 1.6")).unwrap_or(false) {
                found = true;
            }
        });
        assert!(found);
    }

    #[test]
    fn face_symbol_avoids_registered_boxes() {
        let mut planner = AnnotationPlanner::new();
        planner.register(BBox::new(0.0, -20.0, 14.0, -8.0));
        let node = render_face_symbol(3.2, Some("turning"), None, None, 0.0, 0.0, &mut planner).unwrap();
        assert_eq!(node.tag, "g");
        assert_eq!(planner.placed().len(), 2);
    }

    #[test]
    fn unknown_process_is_an_error() {
        let mut planner = AnnotationPlanner::new();
        assert!(render_face_symbol(3.2, Some("bogus"), None, None, 0.0, 0.0, &mut planner).is_err());
    }
}
