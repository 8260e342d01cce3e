//! Datum-referenced baseline and ordinate dimensioning, and the strategy
//! selector that picks between baseline/ordinate/chain for a part.

use crate::common::ViewTransform;
use dg_model::{FeatureKind, GroupPattern};
use dg_core::svg::{arrowhead, Node};
use std::f64::consts::{FRAC_PI_2, PI};

const DIM_LINE_W: &str = "0.18";
const DIM_FONT_SIZE: f64 = 3.0;
const DIM_GAP: f64 = 2.0;
const BASELINE_ROW_SPACING: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// A point to dimension from the baseline origin, with an optional label
/// and tolerance annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineFeature {
    pub position: (f64, f64),
    pub label: String,
    pub tolerance: String,
}

fn line(x1: f64, y1: f64, x2: f64, y2: f64) -> Node {
    Node::new("line")
        .with_attr("x1", format!("{:.2}", x1))
        .with_attr("y1", format!("{:.2}", y1))
        .with_attr("x2", format!("{:.2}", x2))
        .with_attr("y2", format!("{:.2}", y2))
        .with_attr("stroke", "#000")
        .with_attr("stroke-width", DIM_LINE_W)
}

fn arrow_h(x: f64, y: f64, right: bool) -> Node {
    arrowhead(x, y, if right { 0.0 } else { PI }, "#000")
}

fn arrow_v(x: f64, y: f64, down: bool) -> Node {
    arrowhead(x, y, if down { FRAC_PI_2 } else { -FRAC_PI_2 }, "#000")
}

fn format_value(v: f64) -> String {
    if v == v.trunc() {
        format!("{}", v as i64)
    } else {
        format!("{:.1}", v)
    }
}

/// Render baseline dimensions: every feature's distance from `origin` along
/// `axis`, stacked at a fixed row pitch. A feature within 0.1mm of the
/// origin along the measured axis is skipped (it *is* the datum).
pub fn render_baseline_dimensions(features: &[BaselineFeature], origin: (f64, f64), axis: Axis, vt: &ViewTransform, row_spacing: Option<f64>) -> Vec<Node> {
    if features.is_empty() {
        return Vec::new();
    }
    let row_spacing = row_spacing.unwrap_or(BASELINE_ROW_SPACING);
    let (ox, oy) = vt.project(origin.0, origin.1);
    let mut out = Vec::new();

    match axis {
        Axis::Horizontal => {
            let mut sorted: Vec<&BaselineFeature> = features.iter().collect();
            sorted.sort_by(|a, b| (a.position.0 - origin.0).abs().partial_cmp(&(b.position.0 - origin.0).abs()).unwrap());
            let base_y = oy + DIM_GAP * vt.scale + 10.0;
            let mut i = 0usize;
            for feat in sorted {
                let dist = (feat.position.0 - origin.0).abs();
                if dist < 0.1 {
                    continue;
                }
                let (fx, fy) = vt.project(feat.position.0, feat.position.1);
                let dim_y = base_y + i as f64 * row_spacing;
                out.push(line(ox, oy, ox, dim_y + 2.0));
                out.push(line(fx, fy, fx, dim_y + 2.0));
                let x_left = ox.min(fx);
                let x_right = ox.max(fx);
                out.push(line(x_left, dim_y, x_right, dim_y));
                out.push(arrow_h(x_left, dim_y, true));
                out.push(arrow_h(x_right, dim_y, false));
                let label = if feat.tolerance.is_empty() { format_value(dist) } else { format!("{}{}", format_value(dist), feat.tolerance) };
                out.push(
                    Node::new("text")
                        .with_attr("x", format!("{:.2}", (x_left + x_right) / 2.0))
                        .with_attr("y", format!("{:.2}", dim_y - 1.2))
                        .with_attr("text-anchor", "middle")
                        .with_attr("font-size", format!("{:.2}", DIM_FONT_SIZE))
                        .with_attr("fill", "#000")
                        .with_text(label),
                );
                i += 1;
            }
        }
        Axis::Vertical => {
            let mut sorted: Vec<&BaselineFeature> = features.iter().collect();
            sorted.sort_by(|a, b| (a.position.1 - origin.1).abs().partial_cmp(&(b.position.1 - origin.1).abs()).unwrap());
            let base_x = ox + DIM_GAP * vt.scale + 10.0;
            let mut i = 0usize;
            for feat in sorted {
                let dist = (feat.position.1 - origin.1).abs();
                if dist < 0.1 {
                    continue;
                }
                let (fx, fy) = vt.project(feat.position.0, feat.position.1);
                let dim_x = base_x + i as f64 * row_spacing;
                out.push(line(ox, oy, dim_x + 2.0, oy));
                out.push(line(fx, fy, dim_x + 2.0, fy));
                let y_top = oy.min(fy);
                let y_bot = oy.max(fy);
                out.push(line(dim_x, y_top, dim_x, y_bot));
                out.push(arrow_v(dim_x, y_top, true));
                out.push(arrow_v(dim_x, y_bot, false));
                let label = if feat.tolerance.is_empty() { format_value(dist) } else { format!("{}{}", format_value(dist), feat.tolerance) };
                let tx = dim_x + 1.5;
                let ty = (y_top + y_bot) / 2.0 + 1.0;
                out.push(
                    Node::new("text")
                        .with_attr("x", format!("{:.2}", tx))
                        .with_attr("y", format!("{:.2}", ty))
                        .with_attr("text-anchor", "start")
                        .with_attr("font-size", format!("{:.2}", DIM_FONT_SIZE))
                        .with_attr("fill", "#000")
                        .with_attr("transform", format!("rotate(-90,{:.2},{:.2})", tx, ty))
                        .with_text(label),
                );
                i += 1;
            }
        }
    }

    out
}

/// Ordinate (coordinate) dimensions: a table-style distance list with no
/// dimension lines, just an extension line per feature and the signed
/// offset value at its end.
pub fn render_ordinate_dimensions(features: &[BaselineFeature], origin: (f64, f64), axis: Axis, vt: &ViewTransform) -> Vec<Node> {
    if features.is_empty() {
        return Vec::new();
    }
    let (ox, oy) = vt.project(origin.0, origin.1);
    let mut out = vec![
        Node::new("circle")
            .with_attr("cx", format!("{:.2}", ox))
            .with_attr("cy", format!("{:.2}", oy))
            .with_attr("r", "1.5")
            .with_attr("fill", "none")
            .with_attr("stroke", "#000")
            .with_attr("stroke-width", "0.25"),
        Node::new("text")
            .with_attr("x", format!("{:.2}", ox + 2.0))
            .with_attr("y", format!("{:.2}", oy - 2.0))
            .with_attr("font-size", "2.5")
            .with_attr("fill", "#000")
            .with_attr("font-weight", "bold")
            .with_text("0"),
    ];

    match axis {
        Axis::Horizontal => {
            let ext_y = oy + 15.0;
            let mut sorted: Vec<&BaselineFeature> = features.iter().collect();
            sorted.sort_by(|a, b| a.position.0.partial_cmp(&b.position.0).unwrap());
            for feat in sorted {
                let dist = feat.position.0 - origin.0;
                if dist.abs() < 0.1 {
                    continue;
                }
                let (fx, fy) = vt.project(feat.position.0, feat.position.1);
                out.push(line(fx, fy, fx, ext_y));
                out.push(
                    Node::new("text")
                        .with_attr("x", format!("{:.2}", fx))
                        .with_attr("y", format!("{:.2}", ext_y + 3.0))
                        .with_attr("text-anchor", "middle")
                        .with_attr("font-size", format!("{:.2}", DIM_FONT_SIZE))
                        .with_attr("fill", "#000")
                        .with_text(format_value(dist)),
                );
            }
        }
        Axis::Vertical => {
            let ext_x = ox + 15.0;
            let mut sorted: Vec<&BaselineFeature> = features.iter().collect();
            sorted.sort_by(|a, b| a.position.1.partial_cmp(&b.position.1).unwrap());
            for feat in sorted {
                let dist = feat.position.1 - origin.1;
                if dist.abs() < 0.1 {
                    continue;
                }
                let (fx, fy) = vt.project(feat.position.0, feat.position.1);
                out.push(line(fx, fy, ext_x, fy));
                out.push(
                    Node::new("text")
                        .with_attr("x", format!("{:.2}", ext_x + 2.0))
                        .with_attr("y", format!("{:.2}", fy + 1.0))
                        .with_attr("text-anchor", "start")
                        .with_attr("font-size", format!("{:.2}", DIM_FONT_SIZE))
                        .with_attr("fill", "#000")
                        .with_text(format_value(dist)),
                );
            }
        }
    }

    out
}

/// `select_dimension_strategy`: ordinate for bolt/hole/linear-array groups,
/// baseline when both bores and holes exist, chain otherwise.
pub fn select_dimension_strategy(graph: &dg_model::FeatureGraph) -> &'static str {
    for grp in graph.groups() {
        if matches!(grp.pattern, GroupPattern::BoltCircle | GroupPattern::HolePattern) {
            return "ordinate";
        }
    }
    let holes = graph.by_type(FeatureKind::Hole);
    let bores = graph.by_type(FeatureKind::Bore);
    if !holes.is_empty() && !bores.is_empty() {
        return "baseline";
    }
    "chain"
}

#[cfg(test)]
mod tests {
    use super::*;
    use dg_core::BBox;

    fn vt() -> ViewTransform {
        ViewTransform::new(BBox::new(-25.0, -25.0, 25.0, 25.0), 100.0, 100.0, 1.0)
    }

    #[test]
    fn feature_at_origin_is_skipped() {
        let feats = vec![
            BaselineFeature { position: (0.0, 0.0), label: "datum".into(), tolerance: String::new() },
            BaselineFeature { position: (20.0, 0.0), label: "A".into(), tolerance: String::new() },
        ];
        let nodes = render_baseline_dimensions(&feats, (0.0, 0.0), Axis::Horizontal, &vt(), None);
        // Exactly one dimensioned feature -> 2 ext lines + 1 dim line + 2 arrows + 1 text = 6 nodes.
        assert_eq!(nodes.len(), 6);
    }

    #[test]
    fn ordinate_row_of_four_holes_outputs_four_extension_lines_and_values() {
        let feats: Vec<BaselineFeature> = (0..4)
            .map(|i| BaselineFeature { position: (10.0 * (i as f64 + 1.0), 0.0), label: format!("H{i}"), tolerance: String::new() })
            .collect();
        let nodes = render_ordinate_dimensions(&feats, (0.0, 0.0), Axis::Horizontal, &vt());
        let line_count = nodes.iter().filter(|n| n.tag == "line").count();
        let text_count = nodes.iter().filter(|n| n.tag == "text").count();
        assert_eq!(line_count, 4);
        // 4 value texts plus the origin "0" label.
        assert_eq!(text_count, 5);
    }

    #[test]
    fn ordinate_skips_feature_within_tolerance_of_origin() {
        let feats = vec![
            BaselineFeature { position: (0.05, 0.0), label: "near origin".into(), tolerance: String::new() },
            BaselineFeature { position: (30.0, 0.0), label: "far".into(), tolerance: String::new() },
        ];
        let nodes = render_ordinate_dimensions(&feats, (0.0, 0.0), Axis::Horizontal, &vt());
        let line_count = nodes.iter().filter(|n| n.tag == "line").count();
        assert_eq!(line_count, 1);
    }
}
