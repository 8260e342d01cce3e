//! Per-view edge rendering: fixed back-to-front draw order, hidden-group
//! dashing, ISO simplification, center marks and symmetry-axis detection.

use dg_core::svg::Node;
use dg_core::viewcell::View;
use dg_core::BBox;
use dg_dimension::ViewTransform;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One raw edge in view (u, v) space, as handed down by the projection
/// kernel upstream of this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Edge {
    Polyline(Vec<(f64, f64)>),
    Circle { cu: f64, cv: f64, r: f64 },
}

/// A fillet/round arc with its owning edge group, used for center-mark
/// and symmetry detection as well as downstream radius dimensioning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcDef {
    pub cu: f64,
    pub cv: f64,
    pub r: f64,
    pub mu: f64,
    pub mv: f64,
    pub group: u8,
}

/// The per-view geometry handed down by the projection kernel: a
/// model-space bounding box, ten numbered ISO-128 edge groups, and the
/// raw arc list. Kernel geometry is read by `dg-pipeline` as JSON, not
/// TOML: `serde_json` coerces integer map keys to strings on the wire,
/// which plain TOML tables cannot do, so `groups` stays a `HashMap<u8, _>`
/// in memory without a separate DTO layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewGeometry {
    pub bounds: BBox,
    #[serde(default)]
    pub groups: HashMap<u8, Vec<Edge>>,
    #[serde(default)]
    pub arcs: Vec<ArcDef>,
}

/// Edge groups rendered with dashed hidden-line styling.
pub const HIDDEN_GROUPS: &[u8] = &[1, 3, 6, 9];

/// Back-to-front draw order. Groups 4 and 7 are reserved by the
/// projection kernel's interface and never populated in practice.
pub const RENDER_ORDER: [u8; 8] = [9, 6, 3, 1, 8, 5, 2, 0];

const ISO_DENSE_GROUP: u8 = 5;
const ISO_DENSE_THRESHOLD: usize = 50;
const CENTER_MARK_OVERSHOOT_MM: f64 = 2.0;
const CENTER_MARK_INSET_MM: f64 = 3.0;
const SYMMETRY_MATCH_RATIO: f64 = 0.8;

fn group_class(group: u8) -> &'static str {
    match group {
        0 => "visible-outline",
        1 => "hidden-outline",
        2 => "visible-feature",
        3 => "hidden-feature",
        5 => "visible-center",
        6 => "hidden-thread",
        8 => "iso-visible",
        9 => "iso-hidden",
        _ => "edge-other",
    }
}

fn style_for(group: u8) -> (&'static str, &'static str) {
    if HIDDEN_GROUPS.contains(&group) {
        ("0.18", "2,1")
    } else {
        ("0.35", "none")
    }
}

/// Auto-fit scale for `bounds` inside `cell`, honoring `[scale_min,
/// scale_max]` and leaving `margin_mm` of drawable border on each side.
pub fn auto_scale(bounds: BBox, cell: BBox, margin_mm: f64, scale_min: f64, scale_max: f64) -> f64 {
    let avail_w = (cell.width() - 2.0 * margin_mm).max(1.0);
    let avail_h = (cell.height() - 2.0 * margin_mm).max(1.0);
    let model_w = bounds.width().max(1e-6);
    let model_h = bounds.height().max(1e-6);
    let fit = (avail_w / model_w).min(avail_h / model_h);
    fit.clamp(scale_min, scale_max)
}

/// Build the model-to-page transform centering `bounds` in `view`'s cell.
pub fn view_transform(view: View, bounds: BBox, scale: f64) -> ViewTransform {
    let (cx, cy) = view.center();
    ViewTransform::new(bounds, cx, cy, scale)
}

fn polyline_node(pts: &[(f64, f64)], vt: &ViewTransform, group: u8) -> Option<Node> {
    if pts.len() < 2 {
        return None;
    }
    let (sw, dash) = style_for(group);
    let points: Vec<String> = pts.iter().map(|&(u, v)| {
        let (x, y) = vt.project(u, v);
        format!("{:.2},{:.2}", x, y)
    }).collect();
    Some(
        Node::new("polyline")
            .with_attr("points", points.join(" "))
            .with_attr("fill", "none")
            .with_attr("stroke", "#000")
            .with_attr("stroke-width", sw)
            .with_attr("stroke-dasharray", dash),
    )
}

fn circle_node(cu: f64, cv: f64, r: f64, vt: &ViewTransform, group: u8) -> Node {
    let (x, y) = vt.project(cu, cv);
    let (sw, dash) = style_for(group);
    Node::new("circle")
        .with_attr("cx", format!("{:.2}", x))
        .with_attr("cy", format!("{:.2}", y))
        .with_attr("r", format!("{:.2}", r * vt.scale))
        .with_attr("fill", "none")
        .with_attr("stroke", "#000")
        .with_attr("stroke-width", sw)
        .with_attr("stroke-dasharray", dash)
}

/// Render every edge group of `geom` for `view` in back-to-front order,
/// plus center marks and a symmetry axis when one is detected. `iso_
/// simplify` applies the ISO-cell-only simplification rules (dropping
/// groups 8/9 entirely, and group 5 when it is too dense) for the iso
/// view only.
pub fn render_view(view: View, geom: &ViewGeometry, vt: &ViewTransform, iso_simplify: bool) -> Node {
    let mut root = Node::new("g").with_attr("class", format!("view-{}", view.name()));

    for &group in RENDER_ORDER.iter() {
        let Some(edges) = geom.groups.get(&group) else { continue };
        if iso_simplify && view == View::Iso && (group == 8 || group == 9) {
            continue;
        }
        if iso_simplify && view == View::Iso && group == ISO_DENSE_GROUP && edges.len() > ISO_DENSE_THRESHOLD {
            continue;
        }
        let mut g = Node::new("g").with_attr("class", format!("edges-{}-{}", view.name(), group_class(group)));
        for edge in edges {
            match edge {
                Edge::Polyline(pts) => {
                    if let Some(n) = polyline_node(pts, vt, group) {
                        g.push_child(n);
                    }
                }
                Edge::Circle { cu, cv, r } => {
                    g.push_child(circle_node(*cu, *cv, *r, vt, group));
                }
            }
        }
        root.push_child(g);
    }

    root.push_child(center_marks(geom, vt, view.cell()));
    if let Some(axis) = symmetry_axis(geom, vt, view.cell()) {
        root.push_child(axis);
    }

    root
}

fn center_marks(geom: &ViewGeometry, vt: &ViewTransform, cell: BBox) -> Node {
    let mut g = Node::new("g").with_attr("class", "centerlines");
    let inset = cell.inset(CENTER_MARK_INSET_MM);
    let mut seen: HashSet<(i64, i64)> = HashSet::new();

    let mut circles: Vec<(f64, f64, f64)> = Vec::new();
    for edges in geom.groups.values() {
        for e in edges {
            if let Edge::Circle { cu, cv, r } = e {
                circles.push((*cu, *cv, *r));
            }
        }
    }

    for (cu, cv, r) in circles {
        let (x, y) = vt.project(cu, cv);
        let key = ((x / 0.5).round() as i64, (y / 0.5).round() as i64);
        if !seen.insert(key) {
            continue;
        }
        let arm = (r * vt.scale + CENTER_MARK_OVERSHOOT_MM).max(CENTER_MARK_OVERSHOOT_MM);
        let x1 = (x - arm).max(inset.x_min);
        let x2 = (x + arm).min(inset.x_max);
        let y1 = (y - arm).max(inset.y_min);
        let y2 = (y + arm).min(inset.y_max);
        g.push_child(chain_line(x1, y, x2, y));
        g.push_child(chain_line(x, y1, x, y2));
    }
    g
}

fn chain_line(x1: f64, y1: f64, x2: f64, y2: f64) -> Node {
    Node::new("line")
        .with_attr("x1", format!("{:.2}", x1))
        .with_attr("y1", format!("{:.2}", y1))
        .with_attr("x2", format!("{:.2}", x2))
        .with_attr("y2", format!("{:.2}", y2))
        .with_attr("stroke", "#000")
        .with_attr("stroke-width", "0.15")
        .with_attr("stroke-dasharray", "6,1,1,1")
}

fn sample_points(geom: &ViewGeometry) -> Vec<(f64, f64)> {
    let mut pts = Vec::new();
    for edges in geom.groups.values() {
        for e in edges {
            match e {
                Edge::Polyline(p) => pts.extend(p.iter().copied()),
                Edge::Circle { cu, cv, .. } => pts.push((*cu, *cv)),
            }
        }
    }
    pts
}

/// A vertical or horizontal centerline across the cell when at least
/// `SYMMETRY_MATCH_RATIO` of sampled points mirror onto another sampled
/// point about the corresponding midline, within a grid tolerance of 1%
/// of the model's largest dimension.
fn symmetry_axis(geom: &ViewGeometry, vt: &ViewTransform, cell: BBox) -> Option<Node> {
    let pts = sample_points(geom);
    if pts.len() < 4 {
        return None;
    }
    let (bcx, bcy) = geom.bounds.center();
    let max_dim = geom.bounds.width().max(geom.bounds.height()).max(1e-6);
    let tol = max_dim * 0.01;

    let grid_key = |u: f64, v: f64| -> (i64, i64) {
        ((u / tol).round() as i64, (v / tol).round() as i64)
    };
    let present: HashSet<(i64, i64)> = pts.iter().map(|&(u, v)| grid_key(u, v)).collect();

    let matches = |mirror: &dyn Fn(f64, f64) -> (f64, f64)| -> f64 {
        let hit = pts.iter().filter(|&&(u, v)| present.contains(&grid_key_of(mirror(u, v), tol))).count();
        hit as f64 / pts.len() as f64
    };

    fn grid_key_of((u, v): (f64, f64), tol: f64) -> (i64, i64) {
        ((u / tol).round() as i64, (v / tol).round() as i64)
    }

    let vertical_ratio = matches(&|u, v| (2.0 * bcx - u, v));
    let horizontal_ratio = matches(&|u, v| (u, 2.0 * bcy - v));

    if vertical_ratio >= SYMMETRY_MATCH_RATIO {
        let (x, _) = vt.project(bcx, 0.0);
        let inset = cell.inset(CENTER_MARK_INSET_MM);
        return Some(Node::new("g").with_attr("class", "symmetry-axis").with_child(chain_line(x, inset.y_min, x, inset.y_max)));
    }
    if horizontal_ratio >= SYMMETRY_MATCH_RATIO {
        let (_, y) = vt.project(0.0, bcy);
        let inset = cell.inset(CENTER_MARK_INSET_MM);
        return Some(Node::new("g").with_attr("class", "symmetry-axis").with_child(chain_line(inset.x_min, y, inset.x_max, y)));
    }
    None
}

/// The ISO-128 third-angle-projection glyph: a truncated cone beside a
/// circle, rendered once near the title block.
pub fn projection_symbol(x: f64, y: f64) -> Node {
    let mut g = Node::new("g").with_attr("class", "projection-symbol").with_attr("transform", format!("translate({:.2},{:.2})", x, y));
    g.push_child(
        Node::new("polygon")
            .with_attr("points", "0,0 10,3 10,-3")
            .with_attr("fill", "none")
            .with_attr("stroke", "#000")
            .with_attr("stroke-width", "0.25"),
    );
    g.push_child(
        Node::new("circle")
            .with_attr("cx", "14")
            .with_attr("cy", "0")
            .with_attr("r", "2.5")
            .with_attr("fill", "none")
            .with_attr("stroke", "#000")
            .with_attr("stroke-width", "0.25"),
    );
    g
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom_with_two_holes() -> ViewGeometry {
        let mut groups = HashMap::new();
        groups.insert(0u8, vec![Edge::Polyline(vec![(-20.0, -10.0), (20.0, -10.0), (20.0, 10.0), (-20.0, 10.0), (-20.0, -10.0)])]);
        groups.insert(2u8, vec![
            Edge::Circle { cu: -10.0, cv: 0.0, r: 2.0 },
            Edge::Circle { cu: 10.0, cv: 0.0, r: 2.0 },
        ]);
        ViewGeometry { bounds: BBox::new(-20.0, -10.0, 20.0, 10.0), groups, arcs: Vec::new() }
    }

    #[test]
    fn render_view_emits_one_group_per_populated_class() {
        let geom = geom_with_two_holes();
        let vt = view_transform(View::Front, geom.bounds, 1.0);
        let node = render_view(View::Front, &geom, &vt, false);
        assert!(node.find_group_by_class("edges-front-visible-outline").is_some());
        assert!(node.find_group_by_class("edges-front-visible-feature").is_some());
    }

    #[test]
    fn iso_simplify_drops_iso_visible_and_hidden_groups() {
        let mut groups = HashMap::new();
        groups.insert(8u8, vec![Edge::Polyline(vec![(0.0, 0.0), (1.0, 1.0)])]);
        groups.insert(9u8, vec![Edge::Polyline(vec![(0.0, 0.0), (1.0, 1.0)])]);
        let geom = ViewGeometry { bounds: BBox::new(0.0, 0.0, 10.0, 10.0), groups, arcs: Vec::new() };
        let vt = view_transform(View::Iso, geom.bounds, 1.0);
        let node = render_view(View::Iso, &geom, &vt, true);
        assert!(node.find_group_by_class("edges-iso-iso-visible").is_none());
        assert!(node.find_group_by_class("edges-iso-iso-hidden").is_none());
    }

    #[test]
    fn center_marks_deduplicate_coincident_circles() {
        let geom = geom_with_two_holes();
        let vt = view_transform(View::Front, geom.bounds, 1.0);
        let node = render_view(View::Front, &geom, &vt, false);
        let centerlines = node.find_group_by_class("centerlines").unwrap();
        // Two distinct hole centers -> 2 cross arms -> 4 lines.
        assert_eq!(centerlines.children.len(), 4);
    }

    #[test]
    fn mirror_symmetric_holes_produce_a_symmetry_axis() {
        // Outline plus two holes placed symmetrically about u=0: every
        // sampled point has a mirror partner, so the ratio hits 100%.
        let geom = geom_with_two_holes();
        let vt = view_transform(View::Front, geom.bounds, 1.0);
        let node = render_view(View::Front, &geom, &vt, false);
        assert!(node.find_group_by_class("symmetry-axis").is_some());
    }

    #[test]
    fn asymmetric_geometry_gets_no_symmetry_axis() {
        let mut groups = HashMap::new();
        groups.insert(
            0u8,
            vec![Edge::Polyline(vec![(-20.0, -10.0), (5.0, -10.0), (28.0, -3.0), (9.0, 12.0), (-15.0, 6.0)])],
        );
        let geom = ViewGeometry { bounds: BBox::new(-20.0, -10.0, 28.0, 12.0), groups, arcs: Vec::new() };
        let vt = view_transform(View::Front, geom.bounds, 1.0);
        let node = render_view(View::Front, &geom, &vt, false);
        assert!(node.find_group_by_class("symmetry-axis").is_none());
    }
}
