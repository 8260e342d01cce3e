//! The QA scorer: collects a fixed set of metrics from the current SVG
//! tree and applies weighted deductions from a start of 100.

use dg_core::geometry::count_high_precision_floats;
use dg_core::svg::Node;
use dg_core::viewcell::View;
use dg_core::BBox;

use crate::postprocess::{count_drawables, group_center, leader_length, profile_for, DRAWABLE_TAGS};

/// Whole-ISO-cell path-count threshold for the `dense_iso` metric.
/// Distinct from the post-processor's 600-path simplification trigger.
const DENSE_ISO_PATH_THRESHOLD: usize = 800;
const TEXT_OVERLAP_IOU: f64 = 0.10;
const DIM_OVERLAP_IOU: f64 = 0.15;
const NOTES_OVERFLOW_Y: f64 = 270.0;
const OVERFLOW_MARGIN_MM: f64 = 2.0;
const FLOAT_PRECISION_MIN_DECIMALS: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct Metrics {
    pub iso_hidden_count: usize,
    pub overflow_count: usize,
    pub text_overlap_pairs: usize,
    pub dim_overlap_pairs: usize,
    pub notes_overflow: bool,
    pub gdt_unanchored: usize,
    pub dense_iso: bool,
    pub stroke_violations: usize,
    pub float_precision: usize,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QaReport {
    pub score: f64,
    pub metrics: Metrics,
    /// Non-zero deductions only, in metric-evaluation order.
    pub deductions: Vec<(&'static str, f64)>,
}

fn iso_hidden_count(root: &Node) -> usize {
    const HIDDEN_SUFFIXES: &[&str] = &["hidden-outline", "hidden-feature", "hidden-thread", "iso-hidden"];
    let iso_cell = View::Iso.cell();
    let mut count = 0;
    root.walk(&mut |n| {
        if n.tag != "g" {
            return;
        }
        let Some(class) = n.get_attr("class") else { return };
        if !HIDDEN_SUFFIXES.iter().any(|s| class.ends_with(s)) {
            return;
        }
        if let Some((cx, cy)) = group_center(n) {
            if iso_cell.contains_point(cx, cy) {
                count += 1;
            }
        }
    });
    count
}

fn overflow_count(root: &Node) -> usize {
    let mut count = 0;
    for view in View::all() {
        let class = format!("view-{}", view.name());
        let Some(view_group) = root.find_group_by_class(&class) else { continue };
        let cell = view.cell();
        for child in &view_group.children {
            if child.tag != "g" || !child.class_starts_with("edges-") {
                continue;
            }
            if let Some(b) = child.bbox() {
                if b.overflows(&cell, OVERFLOW_MARGIN_MM) {
                    count += 1;
                }
            }
        }
    }
    count
}

fn collect_texts_by_view(root: &Node) -> Vec<(View, BBox)> {
    let mut out = Vec::new();
    for view in View::all() {
        let class = format!("view-{}", view.name());
        let Some(view_group) = root.find_group_by_class(&class) else { continue };
        view_group.walk(&mut |n| {
            if n.tag == "text" {
                if let Some(b) = n.bbox() {
                    out.push((view, b));
                }
            }
        });
    }
    out
}

fn text_overlap_pairs(texts: &[(View, BBox)]) -> usize {
    let mut count = 0;
    for i in 0..texts.len() {
        for j in (i + 1)..texts.len() {
            if texts[i].0 == texts[j].0 && texts[i].1.iou(&texts[j].1) > TEXT_OVERLAP_IOU {
                count += 1;
            }
        }
    }
    count
}

fn dim_overlap_pairs(root: &Node, texts: &[(View, BBox)]) -> usize {
    let mut geometry_boxes = Vec::new();
    root.walk(&mut |n| {
        if DRAWABLE_TAGS.contains(&n.tag.as_str()) && !n.class_starts_with("dimensions-") {
            if let Some(b) = n.bbox() {
                geometry_boxes.push(b);
            }
        }
    });
    let mut count = 0;
    for (_, text_bbox) in texts {
        if geometry_boxes.iter().any(|g| text_bbox.iou(g) > DIM_OVERLAP_IOU) {
            count += 1;
        }
    }
    count
}

fn notes_overflow(root: &Node) -> bool {
    let mut overflow = false;
    if let Some(group) = root.find_group_by_class("general-notes") {
        group.walk(&mut |n| {
            if n.tag == "text" {
                if let Some(y) = n.get_attr_f64("y") {
                    if y > NOTES_OVERFLOW_Y {
                        overflow = true;
                    }
                }
            }
        });
    }
    overflow
}

fn gdt_unanchored(root: &Node) -> usize {
    let mut unanchored = 0;
    root.walk(&mut |n| {
        if n.tag != "g" || !n.has_class("gdt-frame") {
            return;
        }
        let anchored = n
            .children
            .iter()
            .find(|c| c.tag == "polyline" || c.tag == "line")
            .map(|leader| leader_length(leader) >= 1.0)
            .unwrap_or(false);
        if !anchored {
            unanchored += 1;
        }
    });
    unanchored
}

fn dense_iso(root: &Node) -> bool {
    root.find_group_by_class("view-iso").map(count_drawables).unwrap_or(0) > DENSE_ISO_PATH_THRESHOLD
}

fn stroke_violations(root: &Node) -> usize {
    let mut violations = 0;
    root.walk(&mut |n| {
        if n.tag != "g" {
            return;
        }
        let Some(class) = n.get_attr("class") else { return };
        let Some(style) = profile_for(class) else { return };
        let mismatched = n.get_attr("stroke") != Some(style.stroke)
            || n.get_attr("stroke-width") != Some(style.stroke_width)
            || n.get_attr("stroke-dasharray") != Some(style.dasharray);
        if mismatched {
            violations += 1;
        }
    });
    violations
}

fn float_precision_occurrences(root: &Node) -> usize {
    const ATTRS: &[&str] = &["x", "y", "x1", "y1", "x2", "y2", "cx", "cy", "r", "width", "height", "d", "points"];
    let mut count = 0;
    root.walk(&mut |n| {
        for attr in ATTRS {
            if let Some(v) = n.get_attr(attr) {
                count += count_high_precision_floats(v, FLOAT_PRECISION_MIN_DECIMALS);
            }
        }
    });
    count
}

fn collect_metrics(root: &Node) -> Metrics {
    let texts = collect_texts_by_view(root);
    Metrics {
        iso_hidden_count: iso_hidden_count(root),
        overflow_count: overflow_count(root),
        text_overlap_pairs: text_overlap_pairs(&texts),
        dim_overlap_pairs: dim_overlap_pairs(root, &texts),
        notes_overflow: notes_overflow(root),
        gdt_unanchored: gdt_unanchored(root),
        dense_iso: dense_iso(root),
        stroke_violations: stroke_violations(root),
        float_precision: float_precision_occurrences(root),
    }
}

/// Start at 100 and subtract each non-zero weighted deduction in fixed
/// metric order; clamp the final score to `[0, 100]`.
pub fn compute(root: &Node) -> QaReport {
    let m = collect_metrics(root);
    let mut deductions = Vec::new();
    let mut deduct = |name: &'static str, amount: f64| {
        if amount > 0.0 {
            deductions.push((name, amount));
        }
    };

    deduct("iso_hidden_count", m.iso_hidden_count as f64 * 5.0);
    deduct("overflow_count", m.overflow_count as f64 * 10.0);
    deduct("text_overlap_pairs", m.text_overlap_pairs as f64 * 2.0);
    deduct("dim_overlap_pairs", m.dim_overlap_pairs as f64 * 2.0);
    deduct("notes_overflow", if m.notes_overflow { 15.0 } else { 0.0 });
    deduct("gdt_unanchored", m.gdt_unanchored as f64 * 3.0);
    deduct("dense_iso", if m.dense_iso { 5.0 } else { 0.0 });
    deduct("stroke_violations", m.stroke_violations as f64 * 1.0);
    deduct("float_precision", ((m.float_precision / 10) as f64 * 1.0).min(5.0));

    let total: f64 = deductions.iter().map(|(_, v)| v).sum();
    let score = (100.0 - total).clamp(0.0, 100.0);

    QaReport { score, metrics: m, deductions }
}

/// A score is hard-failing if any of the gate-worthy metrics is
/// non-zero, regardless of the composite score.
pub fn is_hard_fail(metrics: &Metrics) -> bool {
    metrics.overflow_count > 0 || metrics.notes_overflow
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_tree_scores_100() {
        let root = Node::new("svg");
        let report = compute(&root);
        assert_eq!(report.score, 100.0);
        assert!(report.deductions.is_empty());
    }

    #[test]
    fn notes_overflow_deducts_fifteen() {
        let mut notes = Node::new("g").with_attr("class", "general-notes");
        notes.push_child(Node::new("text").with_attr("x", "5").with_attr("y", "275"));
        let mut root = Node::new("svg");
        root.push_child(notes);
        let report = compute(&root);
        assert_eq!(report.score, 85.0);
        assert!(report.deductions.contains(&("notes_overflow", 15.0)));
    }

    #[test]
    fn float_precision_deduction_caps_at_five() {
        let mut root = Node::new("svg");
        for _ in 0..200 {
            root.push_child(Node::new("circle").with_attr("cx", "1.23456").with_attr("cy", "0").with_attr("r", "1"));
        }
        let report = compute(&root);
        let (_, amount) = report.deductions.iter().find(|(n, _)| *n == "float_precision").unwrap();
        assert_eq!(*amount, 5.0);
    }
}
