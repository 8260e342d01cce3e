//! The post-processor rule pipeline: each rule is a named, independently
//! fallible pass over the mutable SVG tree. A failing rule is recorded
//! in the report and does not abort the remaining rules.

use dg_core::geometry::{parse_points, round_floats_in_string};
use dg_core::svg::{polyline_length, Node};
use dg_core::viewcell::View;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub stroke: &'static str,
    pub stroke_width: &'static str,
    pub dasharray: &'static str,
}

/// KS-default stroke profile: (class-prefix, style). `dimensions-` is a
/// wildcard prefix covering every per-view dimension group.
const KS_PROFILE: &[(&str, StrokeStyle)] = &[
    ("edges-", StrokeStyle { stroke: "#000", stroke_width: "0.35", dasharray: "none" }),
    ("dimensions-", StrokeStyle { stroke: "#000", stroke_width: "0.18", dasharray: "none" }),
    ("centerlines", StrokeStyle { stroke: "#000", stroke_width: "0.13", dasharray: "6,1,1,1" }),
];

pub(crate) fn profile_for(class: &str) -> Option<StrokeStyle> {
    KS_PROFILE.iter().find(|(prefix, _)| class.starts_with(prefix)).map(|(_, s)| *s)
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PostProcessReport {
    pub rule_results: Vec<(String, usize)>,
    pub errors: Vec<(String, String)>,
}

type Rule = (&'static str, fn(&mut Node) -> Result<usize>);

const RULES: &[Rule] = &[
    ("remove_iso_hidden", remove_iso_hidden),
    ("normalize_strokes", normalize_strokes),
    ("rewrap_notes", rewrap_notes),
    ("round_coordinates", round_coordinates),
    ("simplify_iso", simplify_iso),
    ("audit_gdt", audit_gdt),
];

/// Run every rule in order, accumulating a count or an error per rule.
/// No rule's failure prevents the next from running.
pub fn run(root: &mut Node) -> PostProcessReport {
    let mut report = PostProcessReport::default();
    for (name, rule) in RULES {
        match rule(root) {
            Ok(count) => report.rule_results.push((name.to_string(), count)),
            Err(e) => report.errors.push((name.to_string(), e.to_string())),
        }
    }
    report
}

pub(crate) fn group_center(node: &Node) -> Option<(f64, f64)> {
    let first_drawable = node.children.iter().find(|c| c.tag != "g")?;
    first_drawable.bbox().map(|b| b.center())
}

/// Suffixes of edge-group classes whose numeric group is in
/// [`HIDDEN_GROUPS`], keyed off `dg_render::view`'s `group_class` naming.
const HIDDEN_GROUP_SUFFIXES: &[&str] = &["hidden-outline", "hidden-feature", "hidden-thread", "iso-hidden"];

fn remove_iso_hidden(root: &mut Node) -> Result<usize> {
    let iso_cell = View::Iso.cell();
    let mut removed = 0;
    root.walk_mut(&mut |n| {
        n.children.retain(|child| {
            if child.tag != "g" {
                return true;
            }
            let Some(class) = child.get_attr("class") else { return true };
            let in_hidden = HIDDEN_GROUP_SUFFIXES.iter().any(|suffix| class.ends_with(suffix));
            if !in_hidden {
                return true;
            }
            let keep = match group_center(child) {
                Some((cx, cy)) => !iso_cell.contains_point(cx, cy),
                None => true,
            };
            if !keep {
                removed += 1;
            }
            keep
        });
    });
    Ok(removed)
}

fn normalize_strokes(root: &mut Node) -> Result<usize> {
    let mut fixed = 0;
    root.walk_mut(&mut |n| {
        if n.tag != "g" {
            return;
        }
        let Some(class) = n.get_attr("class").map(str::to_string) else { return };
        let Some(style) = profile_for(&class) else { return };
        let mut changed = false;
        if n.get_attr("stroke") != Some(style.stroke) {
            n.set_attr("stroke", style.stroke);
            changed = true;
        }
        if n.get_attr("stroke-width") != Some(style.stroke_width) {
            n.set_attr("stroke-width", style.stroke_width);
            changed = true;
        }
        if n.get_attr("stroke-dasharray") != Some(style.dasharray) {
            n.set_attr("stroke-dasharray", style.dasharray);
            changed = true;
        }
        if changed {
            fixed += 1;
        }
    });
    Ok(fixed)
}

fn rewrap_notes(root: &mut Node) -> Result<usize> {
    let budget = dg_render::notes::char_budget(dg_render::notes::NOTES_MAX_WIDTH_MM, dg_render::notes::NOTES_FONT_SIZE_MM);
    let mut rewrapped = 0;
    if let Some(group) = root.find_group_by_class_mut("general-notes") {
        for text_node in group.children.iter_mut().filter(|c| c.tag == "text") {
            if let Some(content) = text_node.text.clone() {
                if content.len() > budget {
                    let wrapped = dg_render::notes::word_wrap(&content, budget);
                    if let Some(first) = wrapped.first() {
                        text_node.text = Some(first.clone());
                        rewrapped += 1;
                    }
                }
            }
        }
    }
    Ok(rewrapped)
}

const ROUND_ATTRS: &[&str] = &["x", "y", "x1", "y1", "x2", "y2", "cx", "cy", "r", "width", "height"];

fn round_coordinates(root: &mut Node) -> Result<usize> {
    let mut rounded = 0;
    root.walk_mut(&mut |n| {
        for attr in ROUND_ATTRS {
            if let Some(v) = n.get_attr(attr) {
                if let Ok(f) = v.parse::<f64>() {
                    let r = format!("{:.2}", f);
                    if r.len() < v.len() {
                        n.set_attr(attr, r);
                        rounded += 1;
                    }
                }
            }
        }
        for attr in ["d", "points"] {
            if let Some(v) = n.get_attr(attr) {
                let r = round_floats_in_string(v, 2);
                if r != v {
                    n.set_attr(attr, r);
                    rounded += 1;
                }
            }
        }
    });
    Ok(rounded)
}

/// Whole-ISO-cell path-count threshold above which the dense center-mark
/// group is also dropped. Kept distinct from `dg-render`'s per-group
/// 50-edge render-time threshold; see DESIGN.md.
const POST_ISO_DENSE_PATH_THRESHOLD: usize = 600;
pub(crate) const DRAWABLE_TAGS: &[&str] = &["line", "circle", "polyline", "path"];

pub(crate) fn count_drawables(node: &Node) -> usize {
    let mut count = if DRAWABLE_TAGS.contains(&node.tag.as_str()) { 1 } else { 0 };
    for child in &node.children {
        count += count_drawables(child);
    }
    count
}

fn simplify_iso(root: &mut Node) -> Result<usize> {
    let Some(iso_view) = root.find_group_by_class_mut("view-iso") else { return Ok(0) };
    let total_paths = count_drawables(iso_view);
    let mut removed = 0;
    iso_view.children.retain(|child| {
        if child.tag == "g" && child.has_class("edges-iso-iso-visible") {
            removed += count_drawables(child);
            return false;
        }
        if child.tag == "g" && child.has_class("edges-iso-visible-center") && total_paths > POST_ISO_DENSE_PATH_THRESHOLD {
            removed += count_drawables(child);
            return false;
        }
        true
    });
    Ok(removed)
}

pub(crate) fn leader_length(node: &Node) -> f64 {
    if node.tag == "polyline" {
        node.get_attr("points").map(|p| polyline_length(&parse_points(p))).unwrap_or(0.0)
    } else if node.tag == "line" {
        let x1 = node.get_attr_f64("x1").unwrap_or(0.0);
        let y1 = node.get_attr_f64("y1").unwrap_or(0.0);
        let x2 = node.get_attr_f64("x2").unwrap_or(0.0);
        let y2 = node.get_attr_f64("y2").unwrap_or(0.0);
        ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
    } else {
        0.0
    }
}

fn audit_gdt(root: &mut Node) -> Result<usize> {
    let mut anchored = 0;
    let cells: Vec<_> = View::all().iter().map(|v| v.cell()).collect();
    for group in root.find_groups_by_class("gdt-frame") {
        let Some(leader) = group.children.iter().find(|c| c.tag == "polyline" || c.tag == "line") else { continue };
        if leader_length(leader) >= 1.0 {
            if let Some(b) = group.bbox() {
                let (cx, cy) = b.center();
                if cells.iter().any(|c| c.contains_point(cx, cy)) {
                    anchored += 1;
                }
            }
        }
    }
    Ok(anchored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strokes_fixes_mismatched_edges_group() {
        let mut root = Node::new("svg");
        root.push_child(
            Node::new("g")
                .with_attr("class", "edges-top-visible-outline")
                .with_attr("stroke", "red")
                .with_child(Node::new("line").with_attr("x1", "0").with_attr("y1", "0").with_attr("x2", "1").with_attr("y2", "1")),
        );
        let count = normalize_strokes(&mut root).unwrap();
        assert_eq!(count, 1);
        let g = &root.children[0];
        assert_eq!(g.get_attr("stroke"), Some("#000"));
    }

    #[test]
    fn round_coordinates_shortens_long_float_text() {
        let mut root = Node::new("circle").with_attr("cx", "12.123456").with_attr("r", "3");
        let count = round_coordinates(&mut root).unwrap();
        assert_eq!(count, 1);
        assert_eq!(root.get_attr("cx"), Some("12.12"));
    }

    #[test]
    fn run_collects_a_result_per_rule() {
        let mut root = Node::new("svg");
        let report = run(&mut root);
        assert_eq!(report.rule_results.len(), RULES.len());
        assert!(report.errors.is_empty());
    }
}
