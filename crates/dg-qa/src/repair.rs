//! Repair passes: last-resort fixes applied when the QA score falls
//! below the gate or a hard-fail metric is non-zero. Each pass mutates
//! the SVG tree in place and returns a small report of what it did.

use dg_core::config::Config;
use dg_core::svg::Node;
use dg_core::viewcell::{view_at_point, View};
use dg_core::BBox;
use dg_render::notes::{
    build_category_notes, char_budget, render_general_notes, word_wrap, NOTES_FONT_SIZE_MM, NOTES_LINE_PITCH_MM, NOTES_MAX_WIDTH_MM,
    NOTES_MAX_Y_MM, NOTES_START_Y_MM,
};

const TITLE_BLOCK_Y: f64 = 262.0;
const DIM_PARENT_PREFIXES: &[&str] = &["dimensions-", "plan-dimensions-", "gdt-", "surface-finish", "callouts"];
const OVERLAP_IOU_THRESHOLD: f64 = 0.10;
const NUDGE_Y_MM: f64 = 2.5;
const NUDGE_Y_SATURATION_MM: f64 = 18.0;
const MAX_PASSES: usize = 40;
const LOG_CAP: usize = 30;
const TOTAL_MOVE_RISK_MM: f64 = 12.0;
const OVERFLOW_SAFETY_MM: f64 = 3.0;
const OVERFLOW_MIN_SCALE: f64 = 0.80;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotesRepairLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NotesRepair {
    pub level: NotesRepairLevel,
    pub message: String,
}

/// Rebuild the `general-notes` group from scratch at a fixed starting
/// position, word-wrapping at the standard character budget. Flags a
/// warning when the category notes don't all fit before the title
/// block, info otherwise.
pub fn rebuild_notes(root: &mut Node, config: &Config, standard: &str, grade: &str) -> NotesRepair {
    let notes = build_category_notes(config, standard, grade);
    let budget = char_budget(NOTES_MAX_WIDTH_MM, NOTES_FONT_SIZE_MM);
    let total_lines: usize = notes.iter().map(|n| word_wrap(n, budget.saturating_sub(4)).len()).sum();
    let max_lines = ((NOTES_MAX_Y_MM - NOTES_START_Y_MM) / NOTES_LINE_PITCH_MM).floor() as usize;
    let rendered = render_general_notes(&notes, 5.0, NOTES_START_Y_MM);

    if let Some(existing) = root.find_group_by_class_mut("general-notes") {
        *existing = rendered;
    } else {
        root.push_child(rendered);
    }

    if total_lines > max_lines {
        NotesRepair { level: NotesRepairLevel::Warning, message: format!("notes truncated: {total_lines} lines wrap to {max_lines}") }
    } else {
        NotesRepair { level: NotesRepairLevel::Info, message: format!("notes reflowed: {total_lines} lines") }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TextOverlapLogEntry {
    pub element: String,
    pub dx: f64,
    pub dy: f64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TextOverlapReport {
    pub log: Vec<TextOverlapLogEntry>,
    pub risks: Vec<String>,
}

#[derive(Clone)]
struct TextInfo {
    path: Vec<usize>,
    bbox: BBox,
    priority: u8,
    view: Option<View>,
    total_moved: f64,
    shift_y: f64,
}

fn priority_for(node: &Node, ancestor_priority: Option<u8>) -> u8 {
    if node.get_attr_f64("y").map(|y| y > TITLE_BLOCK_Y).unwrap_or(false) || node.get_attr("font-family") == Some("monospace") {
        return 0;
    }
    ancestor_priority.unwrap_or(2)
}

fn collect_texts(node: &Node, path: &mut Vec<usize>, ancestor_priority: Option<u8>, out: &mut Vec<TextInfo>) {
    let is_dim_parent = node.tag == "g" && node.get_attr("class").map(|c| DIM_PARENT_PREFIXES.iter().any(|p| c.starts_with(p))).unwrap_or(false);
    let next_ancestor = if is_dim_parent { Some(1) } else { ancestor_priority };

    if node.tag == "text" {
        if let Some(bbox) = node.bbox() {
            let (cx, cy) = bbox.center();
            out.push(TextInfo {
                path: path.clone(),
                bbox,
                priority: priority_for(node, ancestor_priority),
                view: view_at_point(cx, cy),
                total_moved: 0.0,
                shift_y: 0.0,
            });
        }
    }
    for (i, child) in node.children.iter().enumerate() {
        path.push(i);
        collect_texts(child, path, next_ancestor, out);
        path.pop();
    }
}

fn get_mut_by_path<'a>(root: &'a mut Node, path: &[usize]) -> &'a mut Node {
    let mut current = root;
    for &i in path {
        current = &mut current.children[i];
    }
    current
}

fn element_label(path: &[usize]) -> String {
    format!("text@{}", path.iter().map(|i| i.to_string()).collect::<Vec<_>>().join("."))
}

/// Nudge overlapping text pairs apart: the lower-priority element of
/// each overlapping pair moves first, along +y until its shift
/// saturates, then along +x, clamped to its own view cell.
pub fn repair_text_overlaps(root: &mut Node) -> TextOverlapReport {
    let mut texts = Vec::new();
    collect_texts(root, &mut Vec::new(), None, &mut texts);

    let mut report = TextOverlapReport::default();

    for _pass in 0..MAX_PASSES {
        let mut resolved_any = false;
        let n = texts.len();
        for i in 0..n {
            for j in (i + 1)..n {
                if texts[i].bbox.iou(&texts[j].bbox) <= OVERLAP_IOU_THRESHOLD {
                    continue;
                }
                let mover = if texts[i].priority >= texts[j].priority { i } else { j };
                let cell = texts[mover].view.map(|v| v.cell()).unwrap_or(BBox::new(0.0, 0.0, 420.0, 297.0));

                let (dx, dy) = if texts[mover].shift_y < NUDGE_Y_SATURATION_MM {
                    texts[mover].shift_y += NUDGE_Y_MM;
                    (0.0, NUDGE_Y_MM)
                } else {
                    (NUDGE_Y_MM, 0.0)
                };

                let moved = texts[mover].bbox.translate(dx, dy);
                let clamped_x = moved.x_min.max(cell.x_min).min(cell.x_max - moved.width().max(0.0));
                let clamped_y = moved.y_min.max(cell.y_min).min(cell.y_max - moved.height().max(0.0));
                let actual_dx = clamped_x - texts[mover].bbox.x_min;
                let actual_dy = clamped_y - texts[mover].bbox.y_min;

                texts[mover].bbox = texts[mover].bbox.translate(actual_dx, actual_dy);
                texts[mover].total_moved += (actual_dx.powi(2) + actual_dy.powi(2)).sqrt();

                if let Some(x) = get_mut_by_path(root, &texts[mover].path.clone()).get_attr_f64("x") {
                    get_mut_by_path(root, &texts[mover].path.clone()).set_attr("x", format!("{:.2}", x + actual_dx));
                }
                if let Some(y) = get_mut_by_path(root, &texts[mover].path.clone()).get_attr_f64("y") {
                    get_mut_by_path(root, &texts[mover].path.clone()).set_attr("y", format!("{:.2}", y + actual_dy));
                }

                if report.log.len() < LOG_CAP {
                    report.log.push(TextOverlapLogEntry { element: element_label(&texts[mover].path), dx: actual_dx, dy: actual_dy });
                }
                resolved_any = true;
            }
        }
        if !resolved_any {
            break;
        }
    }

    for t in &texts {
        if t.total_moved > TOTAL_MOVE_RISK_MM {
            report.risks.push(format!("dimension_association_uncertain: {}", element_label(&t.path)));
        }
    }

    report
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OverflowScaleEntry {
    pub view: String,
    pub scale: f64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct OverflowReport {
    pub scaled: Vec<OverflowScaleEntry>,
    pub risk: Option<String>,
}

/// Per view, if the union bbox of geometry groups exceeds the padded
/// cell, wrap those groups in a uniform scale-down transform about the
/// cell center. Dimensions are not rescaled, so this carries a risk.
pub fn repair_overflow(root: &mut Node) -> OverflowReport {
    let mut report = OverflowReport::default();

    for view in View::all() {
        let class = format!("view-{}", view.name());
        let cell = view.cell();
        let padded = cell.inset(OVERFLOW_SAFETY_MM);

        let Some(view_group) = root.find_group_by_class_mut(&class) else { continue };
        let geometry_boxes: Vec<BBox> = view_group
            .children
            .iter()
            .filter(|c| c.tag == "g" && c.class_starts_with("edges-"))
            .filter_map(|c| c.bbox())
            .collect();
        if geometry_boxes.is_empty() {
            continue;
        }
        let Some(union) = BBox::union_all(&geometry_boxes) else { continue };
        if !union.overflows(&padded, 0.0) {
            continue;
        }

        let k = (padded.width() / union.width().max(1e-6)).min(padded.height() / union.height().max(1e-6)).clamp(OVERFLOW_MIN_SCALE, 1.0);
        if k >= 0.999 {
            continue;
        }

        let (cx, cy) = padded.center();
        let mut wrapper = Node::new("g")
            .with_attr("class", format!("viewcell-{}", view.name()))
            .with_attr("transform", format!("translate({cx:.2},{cy:.2}) scale({k:.3}) translate({:.2},{:.2})", -cx, -cy));
        view_group.children.retain(|c| {
            if c.tag == "g" && c.class_starts_with("edges-") {
                wrapper.push_child(c.clone());
                false
            } else {
                true
            }
        });
        view_group.push_child(wrapper);

        report.scaled.push(OverflowScaleEntry { view: view.name().to_string(), scale: k });
    }

    if !report.scaled.is_empty() {
        report.risk = Some("semantic_may_shift".to_string());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_notes_replaces_existing_group() {
        let mut root = Node::new("svg");
        root.push_child(Node::new("g").with_attr("class", "general-notes").with_child(Node::new("text").with_text("stale")));
        let config = Config::parse("[[shapes]]\nid=\"s1\"\ntype=\"box\"\nposition=[0,0,0]\nsize=[1,1,1]\n").unwrap();
        let repair = rebuild_notes(&mut root, &config, "KS B 0412", "m");
        assert_eq!(repair.level, NotesRepairLevel::Info);
        let group = root.find_group_by_class("general-notes").unwrap();
        let mut found_stale = false;
        group.walk(&mut |n| {
            if n.text.as_deref() == Some("stale") {
                found_stale = true;
            }
        });
        assert!(!found_stale);
    }

    #[test]
    fn repair_text_overlaps_separates_coincident_texts() {
        let mut root = Node::new("svg");
        root.push_child(Node::new("text").with_attr("x", "50").with_attr("y", "50").with_text("A"));
        root.push_child(Node::new("text").with_attr("x", "50.1").with_attr("y", "50.1").with_text("B"));
        let report = repair_text_overlaps(&mut root);
        assert!(!report.log.is_empty());
    }

    #[test]
    fn repair_overflow_skips_views_within_bounds() {
        let mut root = Node::new("svg");
        let mut view_group = Node::new("g").with_attr("class", "view-top");
        view_group.push_child(Node::new("g").with_attr("class", "edges-top-visible-outline").with_child(Node::new("circle").with_attr("cx", "20").with_attr("cy", "20").with_attr("r", "5")));
        root.push_child(view_group);
        let report = repair_overflow(&mut root);
        assert!(report.scaled.is_empty());
    }
}
