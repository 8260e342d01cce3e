//! Shared geometry, style and telemetry types used by the chain, baseline
//! and plan dimensioning engines, so the constants and primitives each
//! engine needs live in one place instead of three.

use dg_core::svg::{arrowhead, Node};
use dg_core::BBox;
use std::f64::consts::PI;

/// A circular feature in model (u, v) coordinates, radius in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub cu: f64,
    pub cv: f64,
    pub cr: f64,
}

/// A fillet/round arc: center, radius, a point on the arc (for leader
/// direction), and the edge-group index it belongs to (hidden groups are
/// skipped by radius dimensioning).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub cu: f64,
    pub cv: f64,
    pub r: f64,
    pub mu: f64,
    pub mv: f64,
    pub group: u8,
}

pub const HIDDEN_GROUPS: [u8; 4] = [1, 3, 6, 9];

/// Affine model-to-page transform for one view: `u -> cx + (u-bcx)*scale`,
/// `v -> cy - (v-bcy)*scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub bounds: BBox,
    pub cx: f64,
    pub cy: f64,
    pub scale: f64,
}

impl ViewTransform {
    pub fn new(bounds: BBox, cx: f64, cy: f64, scale: f64) -> Self {
        Self { bounds, cx, cy, scale }
    }

    fn bcenter(&self) -> (f64, f64) {
        self.bounds.center()
    }

    pub fn project(&self, u: f64, v: f64) -> (f64, f64) {
        let (bcx, bcy) = self.bcenter();
        (self.cx + (u - bcx) * self.scale, self.cy - (v - bcy) * self.scale)
    }

    pub fn width_mm(&self) -> f64 {
        self.bounds.width()
    }

    pub fn height_mm(&self) -> f64 {
        self.bounds.height()
    }
}

/// Spacing constants common to every dimensioning engine, each overridable
/// via the drawing plan's `style` table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimStyleConfig {
    pub dim_gap: f64,
    pub dim_offset: f64,
    pub dim_ext_overshoot: f64,
    pub feat_dim_stack: f64,
}

impl Default for DimStyleConfig {
    fn default() -> Self {
        DimStyleConfig { dim_gap: 2.0, dim_offset: 8.0, dim_ext_overshoot: 1.5, feat_dim_stack: 7.0 }
    }
}

pub const DIM_FONT_SIZE: f64 = 3.0;
pub const DIM_COLOR: &str = "#000";
pub const REVIEW_COLOR: &str = "#D00";

/// Format a dimension value: integers print bare,
/// everything else gets one decimal.
pub fn format_value(value_mm: f64) -> String {
    if value_mm == value_mm.trunc() {
        format!("{}", value_mm as i64)
    } else {
        format!("{:.1}", value_mm)
    }
}

fn dim_line(x1: f64, y1: f64, x2: f64, y2: f64) -> Node {
    Node::new("line")
        .with_attr("x1", format!("{:.2}", x1))
        .with_attr("y1", format!("{:.2}", y1))
        .with_attr("x2", format!("{:.2}", x2))
        .with_attr("y2", format!("{:.2}", y2))
}

fn dim_text(x: f64, y: f64, content: &str, anchor: &str, font_size: f64, rotate_about: Option<(f64, f64)>) -> Node {
    let mut n = Node::new("text")
        .with_attr("x", format!("{:.2}", x))
        .with_attr("y", format!("{:.2}", y))
        .with_attr("text-anchor", anchor)
        .with_attr("font-size", format!("{:.2}", font_size))
        .with_attr("fill", DIM_COLOR)
        .with_text(content);
    if let Some((rx, ry)) = rotate_about {
        n.set_attr("transform", format!("rotate(-90,{:.2},{:.2})", rx, ry));
    }
    n
}

/// Horizontal dimension: extension lines + dimension line + arrows + text,
/// optional tolerance annotation below the value and `data-dim-id` tag.
#[allow(clippy::too_many_arguments)]
pub fn dim_horizontal(x1: f64, x2: f64, y_base: f64, y_dim: f64, value_mm: f64, tol_text: &str, dim_id: &str, overshoot: f64, gap: f64) -> Vec<Node> {
    let mut out = Vec::new();
    let (ext_near, ext_far) = if y_dim < y_base { (y_base - gap, y_dim + overshoot) } else { (y_base + gap, y_dim - overshoot) };
    out.push(dim_line(x1, ext_near, x1, ext_far));
    out.push(dim_line(x2, ext_near, x2, ext_far));
    out.push(dim_line(x1, y_dim, x2, y_dim));
    out.push(arrowhead(x1, y_dim, 0.0, DIM_COLOR));
    out.push(arrowhead(x2, y_dim, PI, DIM_COLOR));
    let tx = (x1 + x2) / 2.0;
    let ty = y_dim - 1.0;
    let mut text = dim_text(tx, ty, &format_value(value_mm), "middle", DIM_FONT_SIZE, None);
    if !dim_id.is_empty() {
        text.set_attr("data-dim-id", dim_id);
        text.set_attr("data-value-mm", format!("{}", value_mm));
    }
    out.push(text);
    if !tol_text.is_empty() {
        out.push(dim_text(tx, ty + 3.2, tol_text, "middle", 2.0, None));
    }
    out
}

/// Vertical dimension, rotated-text analogue of `dim_horizontal`.
#[allow(clippy::too_many_arguments)]
pub fn dim_vertical(y1: f64, y2: f64, x_base: f64, x_dim: f64, value_mm: f64, tol_text: &str, dim_id: &str, overshoot: f64, gap: f64) -> Vec<Node> {
    let mut out = Vec::new();
    out.push(dim_line(x_base - gap, y1, x_dim + overshoot, y1));
    out.push(dim_line(x_base - gap, y2, x_dim + overshoot, y2));
    out.push(dim_line(x_dim, y1, x_dim, y2));
    out.push(arrowhead(x_dim, y1, PI / 2.0, DIM_COLOR));
    out.push(arrowhead(x_dim, y2, -PI / 2.0, DIM_COLOR));
    let tx = x_dim - 1.5;
    let ty = (y1 + y2) / 2.0;
    let mut text = dim_text(tx, ty, &format_value(value_mm), "middle", DIM_FONT_SIZE, Some((tx, ty)));
    if !dim_id.is_empty() {
        text.set_attr("data-dim-id", dim_id);
        text.set_attr("data-value-mm", format!("{}", value_mm));
    }
    out.push(text);
    if !tol_text.is_empty() {
        let ttx = x_dim - 4.5;
        out.push(dim_text(ttx, ty, tol_text, "middle", 2.0, Some((ttx, ty))));
    }
    out
}

/// Diameter leader + shelf + arrow + Ø text, optionally angle-optimized to
/// stay inside `cell_bounds` via a 24-step (15°) angular search weighted by
/// out-of-cell overshoot.
#[allow(clippy::too_many_arguments)]
pub fn dim_diameter(px: f64, py: f64, radius_scaled: f64, radius_mm: f64, angle_deg: f64, tol_text: &str, cell_bounds: Option<BBox>, dim_id: &str) -> Vec<Node> {
    let leader_len = (radius_scaled * 0.8).clamp(6.0, 20.0);
    let shelf_len = 8.0;

    let angle = if let Some(cb) = cell_bounds {
        let margin = shelf_len + 4.0;
        let _ = margin;
        let mut best_angle = angle_deg.to_radians();
        let mut best_score = f64::INFINITY;
        let mut step = 0;
        while step < 360 {
            let a = (step as f64).to_radians();
            let sx_c = px + radius_scaled * a.cos();
            let sy_c = py - radius_scaled * a.sin();
            let ex_c = sx_c + leader_len * a.cos();
            let ey_c = sy_c - leader_len * a.sin();
            let s_dir = if a.cos() >= 0.0 { 1.0 } else { -1.0 };
            let shx_c = ex_c + s_dir * shelf_len;
            let mut overshoot = 0.0;
            for xx in [sx_c, ex_c, shx_c] {
                overshoot += (cb.x_min - xx).max(0.0) + (xx - cb.x_max).max(0.0);
            }
            for yy in [sy_c, ey_c] {
                overshoot += (cb.y_min - yy).max(0.0) + (yy - cb.y_max).max(0.0);
            }
            let angle_diff = (((step as f64 - angle_deg + 180.0) % 360.0) - 180.0).abs();
            let score = overshoot * 100.0 + angle_diff * 0.1;
            if score < best_score {
                best_score = score;
                best_angle = a;
            }
            step += 15;
        }
        best_angle
    } else {
        angle_deg.to_radians()
    };

    let sx = px + radius_scaled * angle.cos();
    let sy = py - radius_scaled * angle.sin();
    let ex = sx + leader_len * angle.cos();
    let ey = sy - leader_len * angle.sin();

    let mut out = Vec::new();
    out.push(dim_line(sx, sy, ex, ey));
    let shelf_dir = if angle.cos() >= 0.0 { 1.0 } else { -1.0 };
    let shx = ex + shelf_dir * shelf_len;
    out.push(dim_line(ex, ey, shx, ey));
    out.push(arrowhead(sx, sy, angle + PI, DIM_COLOR));

    let d_mm = radius_mm * 2.0;
    let mut text = format!("\u{2300}{}", format_value(d_mm));
    if !tol_text.is_empty() {
        text.push(' ');
        text.push_str(tol_text);
    }
    let tx = (ex + shx) / 2.0;
    let ty = ey - 1.2;
    let mut node = dim_text(tx, ty, &text, "middle", DIM_FONT_SIZE, None);
    if !dim_id.is_empty() {
        node.set_attr("data-dim-id", dim_id);
        node.set_attr("data-value-mm", format!("{}", d_mm));
    }
    out.push(node);
    out
}

/// Radius leader from arc surface outward + `R{value}` text.
pub fn dim_radius(cx_pg: f64, cy_pg: f64, mx_pg: f64, my_pg: f64, radius_scaled: f64, radius_mm: f64) -> Vec<Node> {
    let dx = mx_pg - cx_pg;
    let dy = my_pg - cy_pg;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < 0.1 {
        return Vec::new();
    }
    let (ndx, ndy) = (dx / dist, dy / dist);
    let ax = cx_pg + ndx * radius_scaled;
    let ay = cy_pg + ndy * radius_scaled;
    let leader_len = (radius_scaled * 0.6).max(5.0);
    let ex = ax + ndx * leader_len;
    let ey = ay + ndy * leader_len;

    let mut out = Vec::new();
    out.push(dim_line(ax, ay, ex, ey));
    let arr_angle = (-ndy).atan2(-ndx);
    out.push(arrowhead(ax, ay, arr_angle, DIM_COLOR));

    let text = format!("R{}", format_value(radius_mm));
    let anchor = if ndx >= 0.0 { "start" } else { "end" };
    let tx = ex + 1.5 * ndx;
    let ty = ey + 1.5 * ndy + 1.0;
    out.push(dim_text(tx, ty, &text, anchor, DIM_FONT_SIZE, None));
    out
}

/// One emitted auto-dimension, recorded for cross-view dedupe and for plan
/// dims to check against (`dim_id = auto_{view}_{NNN}`).
#[derive(Debug, Clone, PartialEq)]
pub struct AutoDimRecord {
    pub dim_id: String,
    pub view: String,
    pub category: String,
    pub value_mm: f64,
    pub drawing_object_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConflictRecord {
    pub view: String,
    pub category: String,
    pub reason: String,
    pub severity: String,
    pub value_mm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanDimRecord {
    pub dim_id: String,
    pub feature: String,
    pub view: String,
    pub style: String,
    pub required: bool,
    pub value_mm: Option<f64>,
    pub status: String,
    pub rendered: bool,
    pub reason: Option<String>,
}

/// Machine-readable trace of every dimension decision, mirroring the
/// source's `_record_dim`/`_record_conflict` closures turned into an owned
/// accumulator (Rust has no convenient outer-mutable-state closure idiom
/// here).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimensionTelemetry {
    pub auto_dimensions: Vec<AutoDimRecord>,
    pub conflicts: Vec<ConflictRecord>,
    pub plan_dimensions: Vec<PlanDimRecord>,
}

impl DimensionTelemetry {
    pub fn record_auto(&mut self, view: &str, category: &str, value_mm: f64) -> String {
        let idx = self.auto_dimensions.len() + 1;
        let dim_id = format!("auto_{}_{:03}", view, idx);
        let drawing_object_id = format!("svg:dimensions-{}:{}", view, dim_id);
        self.auto_dimensions.push(AutoDimRecord {
            dim_id: dim_id.clone(),
            view: view.to_string(),
            category: category.to_string(),
            value_mm,
            drawing_object_id,
        });
        dim_id
    }

    pub fn record_conflict(&mut self, view: &str, category: &str, reason: &str, severity: &str, value_mm: Option<f64>) {
        self.conflicts.push(ConflictRecord {
            view: view.to_string(),
            category: category.to_string(),
            reason: reason.to_string(),
            severity: severity.to_string(),
            value_mm,
        });
    }

    pub fn record_plan(&mut self, feature: &str, view: &str, style: &str, required: bool, value_mm: Option<f64>, dim_id: &str, status: &str, rendered: bool, reason: Option<&str>) {
        self.plan_dimensions.push(PlanDimRecord {
            dim_id: dim_id.to_string(),
            feature: feature.to_string(),
            view: view.to_string(),
            style: style.to_string(),
            required,
            value_mm,
            status: status.to_string(),
            rendered,
            reason: reason.map(str::to_string),
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SeenValue {
    family: String,
    value_mm: f64,
}

/// Cross-view-redundancy tracker threaded across all view renders of one
/// document, keyed by dimension family (`linear_h`, `linear_v`, `diameter`,
/// `radius`).
#[derive(Debug, Clone, PartialEq)]
pub struct DedupeState {
    pub enabled: bool,
    pub tol_mm: f64,
    seen: Vec<SeenValue>,
}

impl DedupeState {
    pub fn new(enabled: bool, tol_mm: f64) -> Self {
        DedupeState { enabled, tol_mm, seen: Vec::new() }
    }

    /// Returns true (and records the value) if a value already seen in this
    /// family is within `max(tol_mm, 0.002*|value|)`. Skips recording on a
    /// hit so the first-seen view stays the reference.
    pub fn is_redundant(&mut self, family: &str, value_mm: f64) -> bool {
        if !self.enabled {
            return false;
        }
        let tol = self.tol_mm.max(0.002 * value_mm.abs());
        for sv in &self.seen {
            if sv.family == family && (sv.value_mm - value_mm).abs() <= tol {
                return true;
            }
        }
        self.seen.push(SeenValue { family: family.to_string(), value_mm });
        false
    }
}
